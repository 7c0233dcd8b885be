//! End-to-end refresh behaviour against the in-memory store

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;

use dbconf_core::{
    build_snapshot, CancellationToken, ConfigurationProvider, EngineState, KeyValueStore,
    MemoryKeyValueStore, MemoryLogger, RefreshOptions, RefreshOutcome, SourceError,
    SourceOptions,
};

const INTERVAL: Duration = Duration::from_secs(10);

fn seeded_store() -> Arc<MemoryKeyValueStore> {
    Arc::new(MemoryKeyValueStore::with_entries([
        ("App:Sentinel", "1"),
        ("App:Banner", "hello"),
        ("App:Color", "blue"),
        ("Other:Key", "x"),
    ]))
}

fn options(refresh: RefreshOptions) -> SourceOptions {
    SourceOptions::new()
        .select("App:*")
        .unwrap()
        .trim_key_prefix("App:")
        .unwrap()
        .configure_refresh(refresh.set_cache_expiration(INTERVAL).unwrap())
        .unwrap()
}

fn sentinel_options() -> SourceOptions {
    options(RefreshOptions::new().register("App:Sentinel", true))
}

async fn loaded(
    options: SourceOptions,
    store: Arc<MemoryKeyValueStore>,
) -> Arc<ConfigurationProvider> {
    let provider = Arc::new(ConfigurationProvider::with_store(options, store));
    provider.load().await.unwrap();
    provider
}

#[tokio::test(start_paused = true)]
async fn concurrent_refreshes_perform_io_once() {
    let store = seeded_store();
    let provider = loaded(sentinel_options(), store.clone()).await;
    tokio::time::advance(INTERVAL).await;
    store.set_delay(Some(Duration::from_secs(1)));
    let baseline = store.total_fetches();

    let in_flight = {
        let provider = Arc::clone(&provider);
        tokio::spawn(async move { provider.refresh(&CancellationToken::new()).await })
    };
    while provider.state() != EngineState::Refreshing {
        tokio::task::yield_now().await;
    }

    let token = CancellationToken::new();
    let losers = join_all((0..10).map(|_| provider.refresh(&token))).await;
    for outcome in losers {
        assert_eq!(outcome.unwrap(), RefreshOutcome::Skipped);
    }
    assert!(join_all((0..5).map(|_| provider.try_refresh(&token)))
        .await
        .into_iter()
        .all(|ok| ok));

    let winner = in_flight.await.unwrap().unwrap();
    assert_eq!(
        winner,
        RefreshOutcome::Completed {
            checked: 1,
            reloaded: false
        }
    );
    assert_eq!(store.total_fetches() - baseline, 1);
    assert_eq!(provider.state(), EngineState::Idle);
}

#[tokio::test(start_paused = true)]
async fn watched_key_is_not_fetched_before_its_interval() {
    let store = seeded_store();
    let provider = loaded(sentinel_options(), store.clone()).await;
    let token = CancellationToken::new();

    for _ in 0..3 {
        let outcome = provider.refresh(&token).await.unwrap();
        assert_eq!(
            outcome,
            RefreshOutcome::Completed {
                checked: 0,
                reloaded: false
            }
        );
    }
    tokio::time::advance(Duration::from_secs(5)).await;
    provider.refresh(&token).await.unwrap();
    tokio::time::advance(Duration::from_millis(4_999)).await;
    provider.refresh(&token).await.unwrap();
    assert_eq!(store.value_fetches(), 0);

    tokio::time::advance(Duration::from_millis(1)).await;
    provider.refresh(&token).await.unwrap();
    assert_eq!(store.value_fetches(), 1);

    // Checked again only after another full interval
    provider.refresh(&token).await.unwrap();
    tokio::time::advance(Duration::from_secs(9)).await;
    provider.refresh(&token).await.unwrap();
    assert_eq!(store.value_fetches(), 1);
}

#[tokio::test(start_paused = true)]
async fn changed_sentinel_rebuilds_whole_snapshot() {
    let store = seeded_store();
    let provider = loaded(sentinel_options(), store.clone()).await;

    store.set("App:Color", "red");
    store.set("App:Size", "L");
    store.remove("App:Banner");
    store.set("App:Sentinel", "2");
    tokio::time::advance(INTERVAL).await;

    let outcome = provider.refresh(&CancellationToken::new()).await.unwrap();
    assert_eq!(
        outcome,
        RefreshOutcome::Completed {
            checked: 1,
            reloaded: true
        }
    );

    let filter = sentinel_options().key_filter();
    let rows = store.fetch_rows(&filter).await.unwrap();
    let watched: HashSet<String> = ["App:Sentinel".to_string()].into_iter().collect();
    let expected = build_snapshot(rows, &watched, sentinel_options().trim_prefixes()).unwrap();

    assert_eq!(*provider.snapshot(), expected);
    assert_eq!(provider.get("Color"), Some("red".to_string()));
    assert_eq!(provider.get("Banner"), None);
    assert_eq!(provider.get("App:Sentinel"), Some("2".to_string()));
}

#[tokio::test(start_paused = true)]
async fn unchanged_sentinel_does_not_reload() {
    let store = seeded_store();
    let provider = loaded(sentinel_options(), store.clone()).await;

    store.set("App:Color", "red");
    tokio::time::advance(INTERVAL).await;

    let outcome = provider.refresh(&CancellationToken::new()).await.unwrap();

    assert_eq!(
        outcome,
        RefreshOutcome::Completed {
            checked: 1,
            reloaded: false
        }
    );
    assert_eq!(store.row_fetches(), 1);
    assert_eq!(provider.get("Color"), Some("blue".to_string()));
}

#[tokio::test(start_paused = true)]
async fn deleted_sentinel_counts_as_a_change() {
    let store = seeded_store();
    let provider = loaded(sentinel_options(), store.clone()).await;

    store.remove("App:Sentinel");
    tokio::time::advance(INTERVAL).await;

    let outcome = provider.refresh(&CancellationToken::new()).await.unwrap();

    assert!(matches!(outcome, RefreshOutcome::Completed { reloaded: true, .. }));
    assert_eq!(provider.get("App:Sentinel"), None);
    assert_eq!(store.row_fetches(), 2);
}

#[tokio::test(start_paused = true)]
async fn single_key_watch_patches_only_that_key() {
    let store = seeded_store();
    let provider = loaded(
        options(RefreshOptions::new().register("App:Banner", false)),
        store.clone(),
    )
    .await;
    assert_eq!(provider.get("App:Banner"), Some("hello".to_string()));

    store.set("App:Banner", "goodbye");
    store.set("App:Color", "red");
    tokio::time::advance(INTERVAL).await;

    provider.refresh(&CancellationToken::new()).await.unwrap();

    assert_eq!(provider.get("App:Banner"), Some("goodbye".to_string()));
    assert_eq!(provider.get("Banner"), None);
    assert_eq!(provider.get("Color"), Some("blue".to_string()));
    assert_eq!(store.row_fetches(), 1);
}

#[tokio::test(start_paused = true)]
async fn sentinel_reload_stops_the_pass() {
    let store = seeded_store();
    let provider = loaded(
        options(
            RefreshOptions::new()
                .register("App:Sentinel", true)
                .register("App:Banner", false),
        ),
        store.clone(),
    )
    .await;

    store.set("App:Sentinel", "2");
    tokio::time::advance(INTERVAL).await;
    provider.refresh(&CancellationToken::new()).await.unwrap();

    // Banner was not reached and stays due for the next pass
    assert_eq!(store.value_fetches(), 1);
    let banner = provider
        .watched_keys()
        .into_iter()
        .find(|w| w.key == "App:Banner")
        .unwrap();
    assert!(banner.is_due(tokio::time::Instant::now()));

    let outcome = provider.refresh(&CancellationToken::new()).await.unwrap();
    assert_eq!(
        outcome,
        RefreshOutcome::Completed {
            checked: 1,
            reloaded: false
        }
    );
    assert_eq!(store.value_fetches(), 2);
}

#[tokio::test(start_paused = true)]
async fn failed_refresh_is_reported_and_retried_after_interval() {
    let store = seeded_store();
    let logger = Arc::new(MemoryLogger::new());
    let provider = ConfigurationProvider::new(sentinel_options(), store.clone(), logger.clone());
    provider.load().await.unwrap();
    tokio::time::advance(INTERVAL).await;
    let token = CancellationToken::new();

    store.fail_next(1);
    assert!(matches!(
        provider.refresh(&token).await,
        Err(SourceError::Backend(_))
    ));
    assert_eq!(provider.state(), EngineState::Idle);
    assert_eq!(logger.warnings().len(), 1);
    assert!(logger.warnings()[0].starts_with("A refresh operation failed"));

    // The failed key waits out its interval like any other
    store.set("App:Sentinel", "2");
    for _ in 0..5 {
        assert!(provider.try_refresh(&token).await);
    }
    assert_eq!(store.value_fetches(), 1);
    assert_eq!(provider.get("App:Sentinel"), Some("1".to_string()));

    tokio::time::advance(INTERVAL).await;
    assert!(provider.try_refresh(&token).await);
    assert_eq!(store.value_fetches(), 2);
    assert_eq!(provider.get("App:Sentinel"), Some("2".to_string()));
}

fn overlapping_options() -> SourceOptions {
    SourceOptions::new()
        .select("App:*")
        .unwrap()
        .select("Other:*")
        .unwrap()
        .trim_key_prefix("App:")
        .unwrap()
        .configure_refresh(
            RefreshOptions::new()
                .register("App:Sentinel", true)
                .set_cache_expiration(INTERVAL)
                .unwrap(),
        )
        .unwrap()
}

#[tokio::test(start_paused = true)]
async fn duplicate_key_during_reload_keeps_previous_snapshot() {
    let store = seeded_store();
    let logger = Arc::new(MemoryLogger::new());
    let provider =
        ConfigurationProvider::new(overlapping_options(), store.clone(), logger.clone());
    provider.load().await.unwrap();
    let before = provider.snapshot();
    assert_eq!(provider.get("Color"), Some("blue".to_string()));

    // "Other:App:Color" trims to the same exposed key as "App:Color"
    store.set("Other:App:Color", "green");
    store.set("App:Sentinel", "2");
    tokio::time::advance(INTERVAL).await;
    let token = CancellationToken::new();

    let value_fetches = store.value_fetches();
    let row_fetches = store.row_fetches();
    let results = join_all((0..5).map(|_| provider.try_refresh(&token))).await;

    assert_eq!(results.iter().filter(|ok| !**ok).count(), 1);
    assert_eq!(store.value_fetches() - value_fetches, 1);
    assert_eq!(store.row_fetches() - row_fetches, 1);
    assert_eq!(logger.warnings().len(), 1);
    assert!(logger.warnings()[0].contains("Color"));
    assert_eq!(provider.snapshot(), before);
    assert_eq!(provider.state(), EngineState::Idle);

    // Later calls at the same instant leave the store alone
    for _ in 0..5 {
        assert!(provider.try_refresh(&token).await);
    }
    assert_eq!(store.value_fetches() - value_fetches, 1);
    let sentinel = provider
        .watched_keys()
        .into_iter()
        .find(|w| w.key == "App:Sentinel")
        .unwrap();
    assert!(!sentinel.is_due(tokio::time::Instant::now()));

    // The change is still detected once the interval has passed
    store.remove("Other:App:Color");
    tokio::time::advance(INTERVAL).await;
    let outcome = provider.refresh(&token).await.unwrap();
    assert!(matches!(outcome, RefreshOutcome::Completed { reloaded: true, .. }));
    assert_eq!(provider.get("App:Sentinel"), Some("2".to_string()));
}

#[tokio::test(start_paused = true)]
async fn duplicate_key_fails_required_startup() {
    let store = seeded_store();
    store.set("Other:App:Color", "green");
    let provider = ConfigurationProvider::with_store(overlapping_options(), store);

    let err = provider.load().await.unwrap_err();

    assert!(matches!(
        &err,
        SourceError::InitialLoad(inner)
            if matches!(**inner, SourceError::DuplicateKey { ref key, .. } if key == "Color")
    ));
    assert!(provider.snapshot().is_empty());
}

#[tokio::test(start_paused = true)]
async fn cancelled_refresh_releases_the_guard() {
    let store = seeded_store();
    let provider = loaded(sentinel_options(), store.clone()).await;
    tokio::time::advance(INTERVAL).await;
    store.set_delay(Some(Duration::from_secs(60)));

    let token = CancellationToken::new();
    let in_flight = {
        let provider = Arc::clone(&provider);
        let token = token.clone();
        tokio::spawn(async move { provider.refresh(&token).await })
    };
    while provider.state() != EngineState::Refreshing {
        tokio::task::yield_now().await;
    }

    token.cancel();
    let result = in_flight.await.unwrap();

    assert!(matches!(result, Err(SourceError::Cancelled)));
    assert_eq!(provider.state(), EngineState::Idle);

    store.set_delay(None);
    assert!(provider.try_refresh(&CancellationToken::new()).await);
}

#[tokio::test]
async fn empty_selector_set_issues_no_fetch() {
    let store = seeded_store();
    let provider = ConfigurationProvider::with_store(
        SourceOptions::new()
            .configure_refresh(RefreshOptions::new().register("App:Sentinel", true))
            .unwrap(),
        store.clone(),
    );

    provider.load().await.unwrap();

    assert!(provider.snapshot().is_empty());
    assert_eq!(store.total_fetches(), 0);
}

#[test]
fn sub_second_interval_is_rejected() {
    let result = RefreshOptions::new()
        .register("App:Sentinel", true)
        .set_cache_expiration(Duration::from_millis(500));

    let err = result.unwrap_err();
    assert!(err.is_validation());
    assert!(matches!(err, SourceError::CacheExpirationOutOfRange { .. }));
}
