use claimer_core::{
    Discovery, DiscoveryPlan, History, Pacer, SourcePatterns, ThrottleConfig, TracingRunReporter,
};
use tokio_util::sync::CancellationToken;

use crate::common::{StaticFetcher, sale_page};

#[tokio::test]
async fn discovered_history_survives_a_round_trip() {
    let fetcher = StaticFetcher::new(&[
        (
            "https://itch.io/s/10/spring",
            sale_page(&["https://one.itch.io/a?from=sale", "https://two.itch.io/b"]),
        ),
        (
            "https://itch.io/c/20/picks?page=1",
            sale_page(&["https://three.itch.io/c"]),
        ),
    ]);
    let discovery = Discovery::new(
        fetcher.clone(),
        SourcePatterns::default(),
        Pacer::new(ThrottleConfig::none()),
        None,
    );
    let sources = vec![
        "https://itch.io/s/10/spring".to_string(),
        "https://itch.io/c/20/picks".to_string(),
    ];
    let mut history = History::default();
    discovery
        .discover(
            &mut history,
            DiscoveryPlan {
                sources: &sources,
                recheck_sources: true,
                recheck_groups: false,
            },
            &CancellationToken::new(),
            &TracingRunReporter,
        )
        .await
        .unwrap();

    assert_eq!(
        history.urls.iter().collect::<Vec<_>>(),
        vec![
            "https://one.itch.io/a",
            "https://three.itch.io/c",
            "https://two.itch.io/b",
        ]
    );
    // one sale page, two collection pages (the second is a 404)
    assert_eq!(fetcher.hits(), 3);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.json");
    history.save(&path).unwrap();
    assert_eq!(History::load(&path).unwrap(), history);
}
