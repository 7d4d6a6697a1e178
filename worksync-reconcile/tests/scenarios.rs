use std::collections::BTreeSet;
use std::sync::Arc;

use rstest::rstest;
use worksync_core::{
    ExternalIdType, ExternalIdentifier, PublicationDate, PutCode, QualityViolation, Source,
    SyncConfig, Work, WorkRecord, WorkTitle, WorkType,
};
use worksync_reconcile::{
    MemoryTransport, Operation, Orchestrator, ReconcileError, RemoteError, SyncStatus,
};

const APP: &str = "APP-0001";

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn doi(value: &str) -> ExternalIdentifier {
    ExternalIdentifier::own(ExternalIdType::Doi, value)
}

fn eid(value: &str) -> ExternalIdentifier {
    ExternalIdentifier::own(ExternalIdType::Eid, value)
}

fn article(title: &str, year: i32, ids: Vec<ExternalIdentifier>) -> Work {
    Work {
        title: Some(WorkTitle::from(title)),
        publication_date: Some(PublicationDate::year(year)),
        work_type: Some(WorkType::JournalArticle),
        external_identifiers: Some(ids.into()),
        ..Work::default()
    }
}

fn source(client_id: &str) -> Option<Source> {
    Some(Source {
        client_id: Some(client_id.to_string()),
        name: None,
    })
}

fn setup(config: SyncConfig) -> (Arc<MemoryTransport>, Orchestrator<MemoryTransport>) {
    init_logging();
    let transport = Arc::new(MemoryTransport::new(APP));
    let orchestrator = Orchestrator::new(Arc::clone(&transport), config).expect("orchestrator");
    (transport, orchestrator)
}

#[test]
fn zero_pool_size_is_rejected() {
    let transport = Arc::new(MemoryTransport::new(APP));
    let config = SyncConfig {
        pool_size: 0,
        ..SyncConfig::default()
    };
    match Orchestrator::new(transport, config) {
        Err(ReconcileError::Config(_)) => {}
        Err(other) => panic!("expected config error, got {other:?}"),
        Ok(_) => panic!("expected config error"),
    }
}

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

#[test]
fn sourced_listing_excludes_unsourced_and_foreign_works() {
    let (transport, orchestrator) = setup(SyncConfig::default());
    let ours = transport.insert_work(article("ours", 2020, vec![doi("10.1/a")]), source(APP));
    transport.insert_work(article("owner", 2020, vec![doi("10.1/b")]), None);
    transport.insert_work(article("foreign", 2020, vec![doi("10.1/c")]), source("APP-OTHER"));

    let sourced = orchestrator.list_sourced_works().expect("list sourced");
    assert_eq!(sourced.len(), 1);
    assert_eq!(sourced[0].put_code, Some(ours));

    let all = orchestrator.list_all_works().expect("list all");
    assert_eq!(all.len(), 3);
}

#[test]
fn grouped_works_merge_into_one_summary() {
    let (transport, orchestrator) = setup(SyncConfig::default());
    let first = transport.insert_work(
        article("Preferred title", 2019, vec![doi("10.2/y"), eid("E1")]),
        source("APP-OTHER"),
    );
    transport.insert_work(article("Other title", 2019, vec![doi("10.2/y")]), None);

    let all = orchestrator.list_all_works().expect("list all");
    assert_eq!(all.len(), 1);
    let merged = &all[0];
    assert_eq!(merged.put_code, Some(first));
    assert_eq!(merged.title_text(), Some("Preferred title"));
    assert_eq!(merged.identifiers(), &[doi("10.2/y"), eid("E1")]);
}

#[test]
fn summary_put_codes_cover_every_member() {
    let (transport, orchestrator) = setup(SyncConfig::default());
    let a = transport.insert_work(article("a", 2020, vec![doi("10.1/a")]), source(APP));
    let b = transport.insert_work(article("b", 2020, vec![doi("10.1/a")]), None);
    let c = transport.insert_work(article("c", 2020, vec![doi("10.1/c")]), source("APP-OTHER"));

    let codes = orchestrator.summary_put_codes().expect("put codes");
    assert_eq!(codes, vec![a, b, c]);
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

#[test]
fn delete_all_stops_at_first_failure() {
    let (transport, orchestrator) = setup(SyncConfig::default());
    let pcs: Vec<PutCode> = (0..3)
        .map(|i| {
            transport.insert_work(
                article(&format!("w{i}"), 2020, vec![doi(&format!("10.1/{i}"))]),
                source(APP),
            )
        })
        .collect();
    let foreign = transport.insert_work(article("f", 2020, vec![doi("10.9/f")]), None);
    transport.fail_on(Operation::DeleteWork, 2, RemoteError::new(500, "boom"));

    let err = orchestrator
        .delete_all_sourced_works()
        .expect_err("second delete fails");
    assert_eq!(err.response_code(), Some(500));

    assert!(transport.get(pcs[0]).is_none(), "first delete went through");
    assert!(transport.get(pcs[1]).is_some());
    assert!(transport.get(pcs[2]).is_some(), "third delete never attempted");
    assert!(transport.get(foreign).is_some());
    assert_eq!(transport.calls_of(Operation::DeleteWork).len(), 2);
}

#[test]
fn delete_all_leaves_foreign_works() {
    let (transport, orchestrator) = setup(SyncConfig::default());
    transport.insert_work(article("a", 2020, vec![doi("10.1/a")]), source(APP));
    transport.insert_work(article("b", 2020, vec![doi("10.1/b")]), source(APP));
    let foreign = transport.insert_work(article("f", 2020, vec![doi("10.9/f")]), source("X"));

    let deleted = orchestrator.delete_all_sourced_works().expect("delete all");
    assert_eq!(deleted.len(), 2);
    assert_eq!(transport.works().len(), 1);
    assert!(transport.get(foreign).is_some());
}

#[test]
fn add_strips_the_callers_put_code() {
    let (transport, orchestrator) = setup(SyncConfig::default());
    let local = Work {
        put_code: Some(PutCode(999)),
        ..article("new", 2021, vec![doi("10.1/new")])
    };

    let assigned = orchestrator.add_work(&local).expect("add");
    assert_ne!(assigned, PutCode(999));
    assert_eq!(local.put_code, Some(PutCode(999)));
    let stored = transport.get(assigned).expect("stored");
    assert_eq!(stored.summary().source_client_id(), Some(APP));
}

#[test]
fn update_leaves_the_callers_work_untouched() {
    let (transport, orchestrator) = setup(SyncConfig::default());
    let pc = orchestrator
        .add_work(&article("before", 2021, vec![doi("10.1/u")]))
        .expect("add");
    let local = article("after", 2021, vec![doi("10.1/u")]);

    orchestrator.update_work(pc, &local).expect("update");
    assert_eq!(local.put_code, None);
    let stored = transport.get(pc).expect("stored");
    assert_eq!(stored.put_code, Some(pc));
    assert_eq!(stored.title_text(), Some("after"));
}

#[test]
fn duplicate_add_surfaces_conflict_payload() {
    let (_transport, orchestrator) = setup(SyncConfig::default());
    orchestrator
        .add_work(&article("a", 2021, vec![doi("10.1/dup")]))
        .expect("first add");
    let err = orchestrator
        .add_work(&article("b", 2021, vec![doi("10.1/dup")]))
        .expect_err("duplicate");
    match &err {
        ReconcileError::Transport(t) => assert!(t.is_conflict()),
        other => panic!("expected transport error, got {other:?}"),
    }
    assert_eq!(err.response_code(), Some(409));
}

// ---------------------------------------------------------------------------
// Retrieval
// ---------------------------------------------------------------------------

#[rstest]
#[case::threaded(SyncConfig::default())]
#[case::sequential(SyncConfig::sequential())]
fn batch_of_n_yields_n_entries(#[case] config: SyncConfig) {
    let (transport, mut orchestrator) = setup(config);
    for i in 0..12 {
        transport.insert_work(
            article(&format!("w{i}"), 2020, vec![doi(&format!("10.5/{i}"))]),
            None,
        );
    }
    let summaries = orchestrator.list_all_works().expect("list");
    let batch = orchestrator.get_full_works(&summaries);
    assert!(batch.complete);
    assert_eq!(batch.works.len(), 12);
    assert_eq!(batch.successes().count(), 12);
}

#[test]
fn single_fetch_takes_summary_identifiers() {
    let (transport, orchestrator) = setup(SyncConfig::default());
    let pc = transport.insert_work(
        article("Shared", 2019, vec![doi("10.2/y"), eid("E1")]),
        None,
    );
    transport.insert_work(article("Shared", 2019, vec![doi("10.2/y"), eid("E2")]), None);

    let merged = orchestrator.list_all_works().expect("list").remove(0);
    let work = orchestrator.get_full_work_for(&merged).expect("fetch");
    assert_eq!(work.put_code, None);
    assert_eq!(work.identifiers(), &[doi("10.2/y"), eid("E1"), eid("E2")]);
    assert_eq!(orchestrator.get_full_work(pc).expect("raw").put_code, Some(pc));

    let missing = orchestrator.get_full_work_for(&Default::default());
    assert!(matches!(missing, Err(ReconcileError::MissingPutCode)));
}

#[test]
fn failed_fetch_is_reported_per_identity() {
    let (transport, mut orchestrator) = setup(SyncConfig::default());
    for i in 0..3 {
        transport.insert_work(
            article(&format!("w{i}"), 2020, vec![doi(&format!("10.6/{i}"))]),
            None,
        );
    }
    transport.fail_on(Operation::FetchWork, 2, RemoteError::new(500, "flaky"));

    let summaries = orchestrator.list_all_works().expect("list");
    let batch = orchestrator.get_full_works(&summaries);
    assert!(batch.complete);
    assert_eq!(batch.works.len(), 3);
    assert_eq!(batch.failures().count(), 1);
}

// ---------------------------------------------------------------------------
// Batch flows
// ---------------------------------------------------------------------------

#[test]
fn export_reports_a_status_per_work() {
    let (transport, orchestrator) = setup(SyncConfig::default());
    let a = transport.insert_work(article("A", 2020, vec![doi("10.1/a")]), source(APP));
    let b = transport.insert_work(article("B", 2020, vec![doi("10.1/b")]), source(APP));
    let stale = transport.insert_work(article("Z", 2020, vec![doi("10.1/z")]), source(APP));
    let foreign = transport.insert_work(article("F", 2020, vec![doi("10.9/f")]), source("X"));

    let local = vec![
        article("A", 2020, vec![doi("10.1/a")]),
        article("B revised", 2020, vec![doi("10.1/b")]),
        article("C", 2022, vec![doi("10.1/c")]),
        Work {
            title: None,
            ..article("", 2022, vec![doi("10.1/d")])
        },
        article("A again", 2020, vec![doi("10.1/a")]),
    ];

    let report = orchestrator.export(&local).expect("export");
    let statuses: Vec<SyncStatus> = report.outcomes.iter().map(|o| o.status).collect();
    assert_eq!(
        statuses,
        vec![
            SyncStatus::UpToDate,
            SyncStatus::UpdateOk,
            SyncStatus::AddOk,
            SyncStatus::Invalid,
            SyncStatus::Conflict,
        ]
    );
    assert_eq!(report.deleted, vec![stale]);

    assert_eq!(report.outcomes[0].put_code, Some(a));
    assert_eq!(report.outcomes[1].put_code, Some(b));
    assert_eq!(
        report.outcomes[3].violations,
        BTreeSet::from([QualityViolation::TitleMissing])
    );
    assert!(report.outcomes[4].error.is_some());

    assert_eq!(
        transport.get(b).expect("b").title_text(),
        Some("B revised")
    );
    assert!(transport.get(stale).is_none());
    assert!(transport.get(foreign).is_some());
    assert_eq!(transport.calls_of(Operation::AddWork).len(), 2);
    assert_eq!(transport.calls_of(Operation::UpdateWork).len(), 1);
}

#[test]
fn export_aborts_when_a_stale_delete_fails() {
    let (transport, orchestrator) = setup(SyncConfig::default());
    transport.insert_work(article("Z", 2020, vec![doi("10.1/z")]), source(APP));
    transport.fail_on(Operation::DeleteWork, 1, RemoteError::new(500, "down"));

    let err = orchestrator
        .export(&[article("C", 2022, vec![doi("10.1/c")])])
        .expect_err("delete fails");
    assert_eq!(err.response_code(), Some(500));
    assert!(transport.calls_of(Operation::AddWork).is_empty());
}

#[test]
fn second_export_is_up_to_date() {
    let (_transport, orchestrator) = setup(SyncConfig::default());
    let local = vec![
        article("A", 2020, vec![doi("10.1/a")]),
        article("B", 2021, vec![doi("10.1/b"), eid("E-B")]),
    ];
    let first = orchestrator.export(&local).expect("first export");
    assert_eq!(first.count(SyncStatus::AddOk), 2);

    let second = orchestrator.export(&local).expect("second export");
    assert_eq!(second.count(SyncStatus::UpToDate), 2);
    assert!(second.deleted.is_empty());
}

#[test]
fn changed_unlisted_type_is_exported_as_update() {
    let (transport, orchestrator) = setup(SyncConfig::default());
    let typed = |t: &str| Work {
        work_type: Some(WorkType::Other(t.to_string())),
        ..article("Talk", 2019, vec![doi("10.1/talk")])
    };
    let put_code = transport.insert_work(typed("lecture-speech"), source(APP));

    let report = orchestrator.export(&[typed("patent")]).expect("export");
    assert_eq!(report.outcomes[0].status, SyncStatus::UpdateOk);
    let stored = transport.get(put_code).expect("stored");
    assert_eq!(stored.work_type, Some(WorkType::Other("patent".to_string())));
}

#[test]
fn import_proposes_new_identifiers_for_matched_work() {
    let (transport, mut orchestrator) = setup(SyncConfig::default());
    transport.insert_work(
        article("Shared", 2019, vec![doi("10.2/y"), eid("E1")]),
        source("APP-OTHER"),
    );
    transport.insert_work(article("Shared", 2019, vec![doi("10.2/y")]), None);

    let local = vec![article("Shared", 2019, vec![doi("10.2/y")])];
    let report = orchestrator.import(&local).expect("import");

    assert_eq!(report.updates.len(), 1);
    assert_eq!(report.updates[0].local_index, 0);
    assert_eq!(report.updates[0].identifiers, vec![eid("E1")]);
    assert!(report.creations.is_empty());
    assert!(transport.calls_of(Operation::FetchWork).is_empty());
}

#[test]
fn import_skips_matches_without_new_identifiers() {
    let (transport, mut orchestrator) = setup(SyncConfig::default());
    transport.insert_work(article("Known", 2019, vec![doi("10.2/k")]), None);

    let local = vec![article("Known", 2019, vec![doi("10.2/k"), eid("E9")])];
    let report = orchestrator.import(&local).expect("import");
    assert!(report.updates.is_empty());
    assert!(report.creations.is_empty());
}

#[test]
fn import_splits_unmatched_works_by_quality() {
    let (transport, mut orchestrator) = setup(SyncConfig::default());
    let good = transport.insert_work(article("New", 2023, vec![doi("10.3/new")]), None);
    let undated = transport.insert_work(
        Work {
            publication_date: None,
            ..article("Undated", 2023, vec![doi("10.3/undated")])
        },
        None,
    );

    let report = orchestrator.import(&[]).expect("import");
    assert!(report.complete);
    assert_eq!(report.creations.len(), 1);
    assert_eq!(report.creations[0].title_text(), Some("New"));
    assert_eq!(report.creations[0].put_code, None);
    assert_eq!(report.creations[0].identifiers(), &[doi("10.3/new")]);

    assert_eq!(report.invalid.len(), 1);
    assert_eq!(report.invalid[0].put_code, undated);
    assert_eq!(
        report.invalid[0].violations,
        BTreeSet::from([QualityViolation::PublicationDateMissing])
    );
    assert_ne!(good, undated);
}

#[test]
fn import_reports_fetch_failures() {
    let (transport, mut orchestrator) = setup(SyncConfig::default());
    let pc = transport.insert_work(article("New", 2023, vec![doi("10.3/new")]), None);
    transport.fail_on(Operation::FetchWork, 1, RemoteError::new(500, "flaky"));

    let report = orchestrator.import(&[]).expect("import");
    assert!(report.creations.is_empty());
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].put_code, pc);
}
