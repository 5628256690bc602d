use claimer_core::{NoLogin, Orchestrator, PersistentHistory, Summary, TracingRunReporter};
use tokio_util::sync::CancellationToken;

use crate::common::{StaticFetcher, StoreFrontLauncher, quick_config, sale_page};

const SALE: &str = "https://itch.io/s/30/weekend";

#[tokio::test]
async fn second_run_reuses_stored_listings() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("claimer.history.json");
    let fetcher = StaticFetcher::new(&[(SALE, sale_page(&["https://paid.itch.io/game"]))]);
    let launcher = StoreFrontLauncher::default();
    let orchestrator = Orchestrator::new(
        quick_config(&path, &[SALE]),
        fetcher.clone(),
        launcher.clone(),
        NoLogin,
    );
    let cancel = CancellationToken::new();

    let mut store = PersistentHistory::open(&path).unwrap();
    let report = orchestrator
        .run(&mut store, &cancel, &TracingRunReporter)
        .await
        .unwrap();
    assert_eq!(report.classified, 1);
    let history = store.close().unwrap();
    assert!(history.buy.contains("https://paid.itch.io/game"));

    let mut store = PersistentHistory::open(&path).unwrap();
    let report = orchestrator
        .run(&mut store, &cancel, &TracingRunReporter)
        .await
        .unwrap();
    assert!(report.discovery.is_none());
    assert!(!report.renderer_launched);
    assert_eq!(fetcher.hits(), 1);

    let summary = Summary::from_history(
        store.path(),
        true,
        store.history(),
        orchestrator.patterns(),
        orchestrator.config().sources.len(),
    );
    assert_eq!(summary.unclassified(), 0);
    assert!(summary.to_string().contains("1 listings are not free"));
    store.close().unwrap();

    assert_eq!(
        launcher.renderer.visited(),
        vec!["https://itch.io/login", "https://paid.itch.io/game"]
    );
}
