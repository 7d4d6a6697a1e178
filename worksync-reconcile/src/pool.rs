//! Bounded retrieval of full work records.
//!
//! A fixed set of worker threads pulls summaries from a job channel, fetches
//! the full record through the [`Transport`] and sends one result per
//! put-code back on a result channel. [`RetrievalPool::join`] collects those
//! results up to a deadline and resets the pool for the next batch.
//!
//! With `threaded: false` the same per-summary logic runs inline inside
//! [`RetrievalPool::schedule`], in the order given.

use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use worksync_core::{PutCode, SyncConfig, Work, WorkSummary};

use crate::error::TransportError;
use crate::transport::Transport;

type FetchResult = Result<Work, TransportError>;

/// Results of one retrieval batch, keyed by put-code.
#[derive(Debug, Default)]
pub struct FetchBatch {
    /// Every scheduled unit reported back before the deadline.
    pub complete: bool,
    pub works: HashMap<PutCode, FetchResult>,
}

impl FetchBatch {
    pub fn successes(&self) -> impl Iterator<Item = (&PutCode, &Work)> {
        self.works
            .iter()
            .filter_map(|(k, v)| v.as_ref().ok().map(|w| (k, w)))
    }

    pub fn failures(&self) -> impl Iterator<Item = (&PutCode, &TransportError)> {
        self.works
            .iter()
            .filter_map(|(k, v)| v.as_ref().err().map(|e| (k, e)))
    }
}

/// Fetch the full record behind `summary` and reconcile it with the summary.
///
/// The summary's identifiers replace the fetched ones (it reflects the merged
/// group view) and the put-code is cleared.
pub(crate) fn fetch_full_work<T: Transport + ?Sized>(
    transport: &T,
    put_code: PutCode,
    summary: &WorkSummary,
) -> FetchResult {
    tracing::debug!("[getFullWork] {put_code}");
    let work = transport.fetch_work(put_code)?;
    Ok(Work {
        put_code: None,
        external_identifiers: summary.external_identifiers.clone(),
        ..work
    })
}

struct Job {
    put_code: PutCode,
    summary: WorkSummary,
}

/// Fixed-size worker pool for full-work retrieval.
pub struct RetrievalPool<T: Transport + 'static> {
    transport: Arc<T>,
    threaded: bool,
    size: usize,
    jobs: Option<Sender<Job>>,
    results_tx: Sender<(PutCode, FetchResult)>,
    results_rx: Receiver<(PutCode, FetchResult)>,
    workers: Vec<JoinHandle<()>>,
    scheduled: usize,
    inline: HashMap<PutCode, FetchResult>,
}

impl<T: Transport + 'static> RetrievalPool<T> {
    pub fn new(transport: Arc<T>, config: &SyncConfig) -> Self {
        Self::with_mode(transport, config.threaded, config.pool_size.max(1))
    }

    fn with_mode(transport: Arc<T>, threaded: bool, size: usize) -> Self {
        let (results_tx, results_rx) = mpsc::channel();
        let mut pool = Self {
            transport,
            threaded,
            size,
            jobs: None,
            results_tx,
            results_rx,
            workers: Vec::new(),
            scheduled: 0,
            inline: HashMap::new(),
        };
        if threaded {
            pool.spawn_workers();
        }
        pool
    }

    fn spawn_workers(&mut self) {
        let (jobs_tx, jobs_rx) = mpsc::channel::<Job>();
        let jobs_rx = Arc::new(Mutex::new(jobs_rx));
        for worker_id in 0..self.size {
            let jobs_rx = Arc::clone(&jobs_rx);
            let results_tx = self.results_tx.clone();
            let transport = Arc::clone(&self.transport);
            self.workers.push(thread::spawn(move || {
                Self::worker_loop(worker_id, jobs_rx, results_tx, transport);
            }));
        }
        self.jobs = Some(jobs_tx);
    }

    fn worker_loop(
        worker_id: usize,
        jobs: Arc<Mutex<Receiver<Job>>>,
        results: Sender<(PutCode, FetchResult)>,
        transport: Arc<T>,
    ) {
        loop {
            let job = {
                let guard = jobs.lock().unwrap_or_else(|e| e.into_inner());
                guard.recv()
            };
            let Ok(job) = job else {
                break;
            };
            let result = fetch_full_work(transport.as_ref(), job.put_code, &job.summary);
            if let Err(err) = &result {
                tracing::warn!("worker {worker_id}: fetch of {} failed: {err}", job.put_code);
            }
            // The receiver is gone once a timed-out batch has been abandoned.
            if results.send((job.put_code, result)).is_err() {
                tracing::debug!("worker {worker_id}: batch abandoned, dropping {}", job.put_code);
            }
        }
    }

    pub fn is_threaded(&self) -> bool {
        self.threaded
    }

    /// Number of units scheduled in the current batch.
    pub fn scheduled(&self) -> usize {
        self.scheduled
    }

    /// Queue one summary for retrieval. Summaries without a put-code cannot
    /// be fetched and are skipped.
    pub fn schedule(&mut self, summary: &WorkSummary) {
        let Some(put_code) = summary.put_code else {
            tracing::warn!("skipping retrieval of a summary without put-code");
            return;
        };

        if !self.threaded {
            let result = fetch_full_work(self.transport.as_ref(), put_code, summary);
            if let Err(err) = &result {
                tracing::warn!("fetch of {put_code} failed: {err}");
            }
            self.inline.insert(put_code, result);
            self.scheduled += 1;
            return;
        }

        let job = Job {
            put_code,
            summary: summary.clone(),
        };
        match self.jobs.as_ref().map(|tx| tx.send(job)) {
            Some(Ok(())) => self.scheduled += 1,
            _ => {
                // Every worker has died; record the unit as failed rather than losing it.
                self.inline.insert(
                    put_code,
                    Err(TransportError::Unavailable(
                        "retrieval workers are not running".to_string(),
                    )),
                );
            }
        }
    }

    /// Wait up to `timeout` for every scheduled unit, then reset the pool.
    ///
    /// On timeout the returned batch is partial (`complete == false`); units
    /// still in flight run to completion but their results are discarded.
    pub fn join(&mut self, timeout: Duration) -> FetchBatch {
        let fresh = Self::with_mode(Arc::clone(&self.transport), self.threaded, self.size);
        let mut old = std::mem::replace(self, fresh);

        let mut works = std::mem::take(&mut old.inline);
        if !old.threaded {
            return FetchBatch {
                complete: true,
                works,
            };
        }

        // Closing the job channel lets idle workers exit once the queue drains.
        old.jobs = None;
        // A timeout past the clock's range waits without a deadline.
        let deadline = Instant::now().checked_add(timeout);
        let mut received = 0;
        while received < old.scheduled {
            let next = match deadline {
                Some(deadline) => old
                    .results_rx
                    .recv_timeout(deadline.saturating_duration_since(Instant::now()))
                    .ok(),
                None => old.results_rx.recv().ok(),
            };
            match next {
                Some((put_code, result)) => {
                    works.insert(put_code, result);
                    received += 1;
                }
                None => break,
            }
        }

        let complete = received == old.scheduled;
        if complete {
            for handle in old.workers.drain(..) {
                if handle.join().is_err() {
                    tracing::warn!("retrieval worker panicked");
                }
            }
        } else {
            tracing::warn!(
                "retrieval join timed out after {:?}: {received}/{} units finished",
                timeout,
                old.scheduled
            );
        }

        FetchBatch { complete, works }
    }

    /// Schedule every summary and join.
    pub fn fetch_all(&mut self, summaries: &[WorkSummary], timeout: Duration) -> FetchBatch {
        for summary in summaries {
            self.schedule(summary);
        }
        self.join(timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryTransport;
    use worksync_core::{ExternalIdType, ExternalIdentifier, WorkRecord, WorkTitle};

    fn seeded(n: u64) -> (Arc<MemoryTransport>, Vec<WorkSummary>) {
        let transport = Arc::new(MemoryTransport::new("APP-1"));
        let mut summaries = Vec::new();
        for i in 0..n {
            let work = Work {
                title: Some(WorkTitle::from(format!("work {i}").as_str())),
                external_identifiers: Some(
                    vec![ExternalIdentifier::own(ExternalIdType::Doi, format!("10.1/{i}"))]
                        .into(),
                ),
                ..Work::default()
            };
            let put_code = transport.insert_work(work, None);
            summaries.push(WorkSummary {
                put_code: Some(put_code),
                external_identifiers: Some(
                    vec![ExternalIdentifier::own(ExternalIdType::Eid, format!("e{i}"))].into(),
                ),
                ..WorkSummary::default()
            });
        }
        (transport, summaries)
    }

    #[test]
    fn threaded_batch_has_one_entry_per_put_code() {
        let (transport, summaries) = seeded(25);
        let config = SyncConfig {
            pool_size: 4,
            ..SyncConfig::default()
        };
        let mut pool = RetrievalPool::new(transport, &config);
        let batch = pool.fetch_all(&summaries, Duration::from_secs(10));
        assert!(batch.complete);
        assert_eq!(batch.works.len(), 25);
        assert_eq!(batch.failures().count(), 0);
    }

    #[test]
    fn fetched_work_takes_summary_identifiers_and_loses_put_code() {
        let (transport, summaries) = seeded(1);
        let mut pool = RetrievalPool::new(transport, &SyncConfig::sequential());
        let batch = pool.fetch_all(&summaries, Duration::from_secs(1));
        let work = batch.works[&summaries[0].put_code.unwrap()]
            .as_ref()
            .expect("fetched");
        assert_eq!(work.put_code, None);
        assert_eq!(work.external_identifiers, summaries[0].external_identifiers);
        assert_eq!(work.title_text(), Some("work 0"));
    }

    #[test]
    fn pool_accepts_a_new_batch_after_join() {
        let (transport, summaries) = seeded(3);
        let mut pool = RetrievalPool::new(transport, &SyncConfig::default());
        let first = pool.fetch_all(&summaries[..1], Duration::from_secs(10));
        assert_eq!(first.works.len(), 1);
        assert_eq!(pool.scheduled(), 0);
        let second = pool.fetch_all(&summaries[1..], Duration::from_secs(10));
        assert!(second.complete);
        assert_eq!(second.works.len(), 2);
    }

    #[test]
    fn summary_without_put_code_is_skipped() {
        let (transport, _) = seeded(0);
        let mut pool = RetrievalPool::new(transport, &SyncConfig::default());
        pool.schedule(&WorkSummary::default());
        assert_eq!(pool.scheduled(), 0);
        let batch = pool.join(Duration::from_millis(10));
        assert!(batch.complete);
        assert!(batch.works.is_empty());
    }

    #[test]
    fn unbounded_join_timeout_waits_for_every_unit() {
        let (transport, summaries) = seeded(5);
        let config = SyncConfig {
            pool_size: 2,
            join_timeout_secs: u64::MAX,
            ..SyncConfig::default()
        };
        let mut pool = RetrievalPool::new(transport, &config);
        let batch = pool.fetch_all(&summaries, config.join_timeout());
        assert!(batch.complete);
        assert_eq!(batch.works.len(), 5);
    }

    #[test]
    fn join_timeout_reports_partial_batch_and_resets() {
        let (transport, summaries) = seeded(3);
        transport.set_latency(Duration::from_millis(300));
        let config = SyncConfig {
            pool_size: 1,
            ..SyncConfig::default()
        };
        let mut pool = RetrievalPool::new(Arc::clone(&transport), &config);
        let batch = pool.fetch_all(&summaries, Duration::from_millis(50));
        assert!(!batch.complete);
        assert!(batch.works.len() < 3);

        transport.set_latency(Duration::ZERO);
        let again = pool.fetch_all(&summaries[..1], Duration::from_secs(10));
        assert!(again.complete);
        assert_eq!(again.works.len(), 1);
    }
}
