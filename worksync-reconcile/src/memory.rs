//! In-memory remote profile.
//!
//! Implements [`Transport`] over a map of stored works so the engine can be
//! driven without a network. The profile can be loaded from and saved to a
//! YAML snapshot, which is what the `worksync` binary operates on.
//!
//! Grouping follows the remote service: works sharing any `self` identifier
//! end up in one group whose identifier list is the union of its members'
//! `self` identifiers, with the type upper-cased.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use worksync_core::{
    ActivitiesSummary, ExternalIdentifier, GroupIdentifier, PutCode, Relationship, Source, Work,
    WorkGroup, WorkRecord, WorkSummary,
};

use crate::error::{io_err, ReconcileError, RemoteError, TransportError};
use crate::transport::Transport;

/// Kind of remote call, used for the call log and failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    FetchWork,
    AddWork,
    UpdateWork,
    DeleteWork,
    FetchActivities,
}

/// One recorded remote call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub operation: Operation,
    pub put_code: Option<PutCode>,
}

/// Serialized form of a profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileSnapshot {
    pub source_identity: String,
    #[serde(default = "first_put_code")]
    pub next_put_code: u64,
    #[serde(default)]
    pub works: Vec<Work>,
}

fn first_put_code() -> u64 {
    1
}

#[derive(Debug)]
struct InjectedFailure {
    operation: Operation,
    ordinal: usize,
    error: RemoteError,
}

#[derive(Debug)]
struct State {
    works: BTreeMap<PutCode, Work>,
    next_put_code: u64,
    calls: Vec<Call>,
    counts: HashMap<Operation, usize>,
    failures: Vec<InjectedFailure>,
    latency: Duration,
}

/// A remote profile held in memory.
#[derive(Debug)]
pub struct MemoryTransport {
    source_identity: String,
    state: Mutex<State>,
}

impl MemoryTransport {
    /// Empty profile whose writes are attributed to `source_identity`.
    pub fn new(source_identity: impl Into<String>) -> Self {
        Self::from_snapshot(ProfileSnapshot {
            source_identity: source_identity.into(),
            next_put_code: first_put_code(),
            works: Vec::new(),
        })
    }

    /// Rebuild a profile from its snapshot. Works without a put-code are
    /// assigned one. When two works share a put-code the first is kept.
    pub fn from_snapshot(snapshot: ProfileSnapshot) -> Self {
        let mut state = State {
            works: BTreeMap::new(),
            next_put_code: snapshot.next_put_code.max(first_put_code()),
            calls: Vec::new(),
            counts: HashMap::new(),
            failures: Vec::new(),
            latency: Duration::ZERO,
        };
        for work in snapshot.works {
            match work.put_code {
                Some(pc) => {
                    state.next_put_code = state.next_put_code.max(pc.0 + 1);
                    if state.works.contains_key(&pc) {
                        tracing::warn!("snapshot repeats put-code {pc}; keeping the first work");
                        continue;
                    }
                    state.works.insert(pc, work);
                }
                None => {
                    let pc = PutCode(state.next_put_code);
                    state.next_put_code += 1;
                    state.works.insert(pc, work.with_put_code(Some(pc)));
                }
            }
        }
        Self {
            source_identity: snapshot.source_identity,
            state: Mutex::new(state),
        }
    }

    pub fn snapshot(&self) -> ProfileSnapshot {
        let state = self.lock();
        ProfileSnapshot {
            source_identity: self.source_identity.clone(),
            next_put_code: state.next_put_code,
            works: state.works.values().cloned().collect(),
        }
    }

    /// Load a profile from a YAML snapshot file.
    pub fn load(path: &Path) -> Result<Self, ReconcileError> {
        let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
        let snapshot: ProfileSnapshot =
            serde_yaml::from_str(&contents).map_err(|e| ReconcileError::Snapshot {
                path: path.to_path_buf(),
                source: e,
            })?;
        Ok(Self::from_snapshot(snapshot))
    }

    /// Atomically write the profile to `path` (`.tmp` sibling, then rename).
    pub fn save(&self, path: &Path) -> Result<(), ReconcileError> {
        let yaml = serde_yaml::to_string(&self.snapshot())?;
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = std::path::PathBuf::from(tmp);
        std::fs::write(&tmp, yaml).map_err(|e| io_err(&tmp, e))?;
        std::fs::rename(&tmp, path).map_err(|e| io_err(path, e))?;
        Ok(())
    }

    /// Store a work directly, bypassing the call log. `source` of `None`
    /// models an entry added by the profile owner.
    pub fn insert_work(&self, work: Work, source: Option<Source>) -> PutCode {
        let mut state = self.lock();
        let pc = PutCode(state.next_put_code);
        state.next_put_code += 1;
        let now = Utc::now();
        state.works.insert(
            pc,
            Work {
                put_code: Some(pc),
                source,
                created_date: Some(now),
                last_modified_date: Some(now),
                ..work
            },
        );
        pc
    }

    /// Make the `ordinal`-th (1-based) call of `operation` fail with `error`.
    pub fn fail_on(&self, operation: Operation, ordinal: usize, error: RemoteError) {
        self.lock().failures.push(InjectedFailure {
            operation,
            ordinal,
            error,
        });
    }

    /// Delay every subsequent call by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        self.lock().latency = latency;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn calls_of(&self, operation: Operation) -> Vec<Call> {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.operation == operation)
            .cloned()
            .collect()
    }

    pub fn works(&self) -> Vec<Work> {
        self.lock().works.values().cloned().collect()
    }

    pub fn get(&self, put_code: PutCode) -> Option<Work> {
        self.lock().works.get(&put_code).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Log the call, apply latency and injected failures.
    fn enter(&self, operation: Operation, put_code: Option<PutCode>) -> Result<(), TransportError> {
        let (latency, injected) = {
            let mut state = self.lock();
            state.calls.push(Call {
                operation,
                put_code,
            });
            let count = state.counts.entry(operation).or_insert(0);
            *count += 1;
            let ordinal = *count;
            let injected = state
                .failures
                .iter()
                .find(|f| f.operation == operation && f.ordinal == ordinal)
                .map(|f| f.error.clone());
            (state.latency, injected)
        };
        if !latency.is_zero() {
            std::thread::sleep(latency);
        }
        match injected {
            Some(error) => Err(TransportError::Remote(error)),
            None => Ok(()),
        }
    }

    fn is_ours(&self, work: &Work) -> bool {
        work.source
            .as_ref()
            .and_then(|s| s.client_id.as_deref())
            .map(|id| id == self.source_identity)
            .unwrap_or(false)
    }

    fn owned_entry<'a>(
        &self,
        state: &'a mut State,
        put_code: PutCode,
    ) -> Result<&'a mut Work, TransportError> {
        let Some(existing) = state.works.get_mut(&put_code) else {
            return Err(not_found(put_code));
        };
        if !self.is_ours(existing) {
            return Err(TransportError::Remote(RemoteError::new(
                403,
                format!("work {put_code} belongs to another source"),
            )));
        }
        Ok(existing)
    }
}

fn not_found(put_code: PutCode) -> TransportError {
    TransportError::Remote(RemoteError::new(404, format!("no work with put-code {put_code}")))
}

fn own_identifiers<'a, W: WorkRecord>(
    work: &'a W,
) -> impl Iterator<Item = &'a ExternalIdentifier> + 'a {
    work.identifiers()
        .iter()
        .filter(|id| id.relationship == Relationship::Own)
}

impl Transport for MemoryTransport {
    fn source_identity(&self) -> &str {
        &self.source_identity
    }

    fn fetch_work(&self, put_code: PutCode) -> Result<Work, TransportError> {
        self.enter(Operation::FetchWork, Some(put_code))?;
        self.get(put_code).ok_or_else(|| not_found(put_code))
    }

    fn add_work(&self, work: &Work) -> Result<PutCode, TransportError> {
        self.enter(Operation::AddWork, None)?;
        if work.put_code.is_some() {
            return Err(TransportError::Remote(RemoteError::new(
                400,
                "put-code must be absent when creating a work",
            )));
        }

        let mut state = self.lock();
        let duplicate = state.works.values().any(|existing| {
            self.is_ours(existing)
                && own_identifiers(existing).any(|a| own_identifiers(work).any(|b| a == b))
        });
        if duplicate {
            return Err(TransportError::Remote(RemoteError::new(
                409,
                "a work from this source already has one of these identifiers",
            )));
        }

        let pc = PutCode(state.next_put_code);
        state.next_put_code += 1;
        let now = Utc::now();
        state.works.insert(
            pc,
            Work {
                put_code: Some(pc),
                source: Some(Source {
                    client_id: Some(self.source_identity.clone()),
                    name: None,
                }),
                created_date: Some(now),
                last_modified_date: Some(now),
                ..work.clone()
            },
        );
        Ok(pc)
    }

    fn update_work(&self, put_code: PutCode, work: &Work) -> Result<(), TransportError> {
        self.enter(Operation::UpdateWork, Some(put_code))?;
        if work.put_code != Some(put_code) {
            return Err(TransportError::Remote(RemoteError::new(
                400,
                format!("work put-code does not match {put_code}"),
            )));
        }

        let mut state = self.lock();
        let existing = self.owned_entry(&mut state, put_code)?;
        *existing = Work {
            source: existing.source.clone(),
            created_date: existing.created_date,
            last_modified_date: Some(Utc::now()),
            ..work.clone()
        };
        Ok(())
    }

    fn delete_work(&self, put_code: PutCode) -> Result<(), TransportError> {
        self.enter(Operation::DeleteWork, Some(put_code))?;
        let mut state = self.lock();
        self.owned_entry(&mut state, put_code)?;
        state.works.remove(&put_code);
        Ok(())
    }

    fn fetch_activities(&self) -> Result<ActivitiesSummary, TransportError> {
        self.enter(Operation::FetchActivities, None)?;
        let state = self.lock();

        // Each cluster is a list of member summaries; works are visited in
        // put-code order, so members and clusters stay ordered by put-code.
        let mut clusters: Vec<Vec<WorkSummary>> = Vec::new();
        for work in state.works.values() {
            let own: Vec<&ExternalIdentifier> = own_identifiers(work).collect();
            let mut joined = vec![work.summary()];
            // Existing clusters never share identifiers with each other, so
            // only the new work can bridge them.
            let mut idx = 0;
            while idx < clusters.len() {
                let shares = clusters[idx]
                    .iter()
                    .any(|member| own_identifiers(member).any(|id| own.contains(&id)));
                if shares {
                    joined.append(&mut clusters.remove(idx));
                } else {
                    idx += 1;
                }
            }
            joined.sort_by_key(|s| s.put_code);
            clusters.push(joined);
        }
        clusters.sort_by_key(|c| c.first().and_then(|s| s.put_code));

        let groups = clusters
            .into_iter()
            .map(|summaries| {
                let mut identifiers: Vec<GroupIdentifier> = Vec::new();
                for id in summaries.iter().flat_map(|s| own_identifiers(s)) {
                    let gid = GroupIdentifier {
                        id_type: id.id_type.as_str().to_uppercase(),
                        id: id.id.clone(),
                    };
                    if !identifiers.contains(&gid) {
                        identifiers.push(gid);
                    }
                }
                WorkGroup {
                    last_modified_date: summaries.iter().filter_map(|s| s.last_modified_date).max(),
                    identifiers,
                    summaries,
                }
            })
            .collect::<Vec<_>>();

        Ok(ActivitiesSummary {
            last_modified_date: groups.iter().filter_map(|g| g.last_modified_date).max(),
            groups,
        })
    }
}
