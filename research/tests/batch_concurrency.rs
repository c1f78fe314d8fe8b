//! Batch fan-out: concurrency cap, ordering and failure isolation.

use std::sync::Arc;
use std::time::Duration;

use research::batch::{EntryOutcome, EntryStatus, run_batch};
use research::io::components::load_components;
use research::test_support::{ComponentsFile, ConfidentOracle, LatencySearch, researcher};

fn names(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("component-{i}")).collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn in_flight_sessions_never_exceed_cap() {
    let search = Arc::new(LatencySearch::new(Duration::from_millis(20)));
    let researcher = Arc::new(researcher(search.clone(), Arc::new(ConfidentOracle)));

    let report = run_batch(researcher, names(9), 3).await.expect("batch");

    assert_eq!(report.results.len(), 9);
    assert_eq!(search.max_in_flight(), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn results_follow_input_order() {
    let search = Arc::new(LatencySearch::new(Duration::from_millis(5)));
    let researcher = Arc::new(researcher(search, Arc::new(ConfidentOracle)));
    let components = names(6);

    let report = run_batch(researcher, components.clone(), 4).await.expect("batch");

    let order: Vec<&str> = report.results.iter().map(|entry| entry.component()).collect();
    assert_eq!(order, components.iter().map(String::as_str).collect::<Vec<_>>());
    assert_eq!(report.batch_metadata.total_components, 6);
    assert_eq!(report.batch_metadata.successful, 6);
    assert_eq!(report.batch_metadata.failed, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn failing_session_does_not_affect_others() {
    let search = Arc::new(LatencySearch::new(Duration::from_millis(5)).failing_on("component-1"));
    let researcher = Arc::new(researcher(search, Arc::new(ConfidentOracle)));

    let report = run_batch(researcher, names(3), 2).await.expect("batch");

    // A collaborator error still yields a record, so the entry completes.
    let failed = &report.results[1];
    assert_eq!(failed.status, EntryStatus::Completed);
    let EntryOutcome::Completed(record) = &failed.outcome else {
        panic!("expected a result record");
    };
    assert_eq!(record.active_date.as_deref(), Some("Unknown"));
    assert!(
        record
            .error
            .as_deref()
            .is_some_and(|error| error.starts_with("error:request failed"))
    );

    for index in [0, 2] {
        let EntryOutcome::Completed(record) = &report.results[index].outcome else {
            panic!("expected a result record");
        };
        assert_eq!(record.active_date.as_deref(), Some("2022-04-27"));
        assert!(record.error.is_none());
    }
}

#[tokio::test]
async fn components_file_feeds_batch() {
    let file = ComponentsFile::new(&["Redis 7.0", "", "nginx 1.24"]).expect("components file");
    let components = load_components(&file.path).expect("load");
    let researcher = Arc::new(researcher(
        Arc::new(LatencySearch::new(Duration::ZERO)),
        Arc::new(ConfidentOracle),
    ));

    let report = run_batch(researcher, components, 1).await.expect("batch");

    assert_eq!(report.results.len(), 2);
    assert_eq!(report.results[1].component(), "nginx 1.24");
}
