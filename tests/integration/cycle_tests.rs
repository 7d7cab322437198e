use super::*;
use restock_watcher::monitor::EventKind;
use restock_watcher::plugins::trackers::StockStatus;
use restock_watcher::{CycleOutcome, CycleReport, Event, TrackingCoordinator};
use std::time::{Duration, Instant};

fn completed(outcome: CycleOutcome) -> CycleReport {
    match outcome {
        CycleOutcome::Completed(report) => report,
        CycleOutcome::Skipped => panic!("cycle was skipped"),
    }
}

fn kinds(report: &CycleReport) -> Vec<(String, EventKind)> {
    report
        .events
        .iter()
        .map(|event| (event.source().name.clone(), event.kind()))
        .collect()
}

fn coordinator(
    config: &AppConfig,
    fetcher: &Arc<ScriptedFetcher>,
    notifier: &Arc<RecordingNotifier>,
) -> TrackingCoordinator {
    TrackingCoordinator::new(config, fetcher.clone(), notifier.clone())
}

#[tokio::test]
async fn test_three_cycle_scenario() -> anyhow::Result<()> {
    let fetcher = Arc::new(ScriptedFetcher::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let mut config = get_test_config();
    config.sources.truncate(1);

    fetcher.push(BESTBUY_URL, page("Add to Cart", "$799.00"));
    fetcher.push(BESTBUY_URL, page("Sold Out", "$799.00"));
    fetcher.push(BESTBUY_URL, page("Sold Out", "$749.00"));

    let coordinator = coordinator(&config, &fetcher, &notifier);

    let first = completed(coordinator.run_cycle().await);
    assert_eq!(kinds(&first), vec![("BestBuy".to_string(), EventKind::Baseline)]);

    let second = completed(coordinator.run_cycle().await);
    assert_eq!(kinds(&second), vec![("BestBuy".to_string(), EventKind::StockOut)]);

    let third = completed(coordinator.run_cycle().await);
    assert_eq!(kinds(&third), vec![("BestBuy".to_string(), EventKind::PriceDown)]);
    match &third.events[0] {
        Event::PriceChanged { new_price, old_price, .. } => {
            assert_eq!(new_price.to_string(), "$749.00");
            assert_eq!(old_price.to_string(), "$799.00");
        }
        other => panic!("unexpected event: {:?}", other),
    }

    let messages = notifier.messages();
    assert_eq!(messages.len(), 3);
    assert!(messages[0].contains("Initial Check"));
    assert!(messages[1].contains("NOW OUT OF STOCK"));
    assert!(messages[2].contains("Price Decrease"));
    assert!(messages.iter().all(|m| m.contains(BESTBUY_URL)));

    Ok(())
}

#[tokio::test]
async fn test_sources_checked_in_configured_order() {
    let fetcher = Arc::new(ScriptedFetcher::default());
    let notifier = Arc::new(RecordingNotifier::default());

    fetcher.push(BESTBUY_URL, page("Add to Cart", "$799.00"));
    fetcher.push(BAMBU_URL, page("Add to Cart", "$699.00"));

    let coordinator = coordinator(&get_test_config(), &fetcher, &notifier);
    let report = completed(coordinator.run_cycle().await);

    assert_eq!(fetcher.fetched(), vec![BESTBUY_URL.to_string(), BAMBU_URL.to_string()]);
    assert_eq!(
        kinds(&report),
        vec![
            ("BestBuy".to_string(), EventKind::Baseline),
            ("Bambu Lab".to_string(), EventKind::Baseline),
        ]
    );
}

#[tokio::test]
async fn test_one_failing_source_does_not_block_the_other() {
    let fetcher = Arc::new(ScriptedFetcher::default());
    let notifier = Arc::new(RecordingNotifier::default());

    fetcher.push(BESTBUY_URL, timeout(".add-to-cart-button"));
    fetcher.push(BAMBU_URL, page("Add to Cart", "$699.00"));
    fetcher.push(BESTBUY_URL, page("Sold Out", "$799.00"));
    fetcher.push(BAMBU_URL, page("Add to Cart", "$699.00"));

    let coordinator = coordinator(&get_test_config(), &fetcher, &notifier);

    let first = completed(coordinator.run_cycle().await);
    assert_eq!(first.sources_checked, 2);
    assert_eq!(first.sources_failed, 1);
    assert!(!first.source_results[0].success);
    assert!(first.source_results[1].success);
    assert_eq!(kinds(&first), vec![("Bambu Lab".to_string(), EventKind::Baseline)]);

    let states = coordinator.source_states().await;
    assert_eq!(states[0].last_status(), None);
    assert!(!states[0].has_announced_baseline());

    // The failed source is treated as a first observation once it recovers.
    let second = completed(coordinator.run_cycle().await);
    assert_eq!(kinds(&second), vec![("BestBuy".to_string(), EventKind::Baseline)]);
    assert_eq!(coordinator.source_states().await[0].last_status(), Some(StockStatus::Out));
}

#[tokio::test]
async fn test_fully_failed_cycle_produces_no_events() {
    let fetcher = Arc::new(ScriptedFetcher::default());
    let notifier = Arc::new(RecordingNotifier::default());

    let coordinator = coordinator(&get_test_config(), &fetcher, &notifier);
    let report = completed(coordinator.run_cycle().await);

    assert_eq!(report.sources_failed, 2);
    assert!(report.events.is_empty());
    assert!(notifier.messages().is_empty());
}

#[tokio::test]
async fn test_session_is_released_every_cycle() {
    let fetcher = Arc::new(ScriptedFetcher::default());
    let notifier = Arc::new(RecordingNotifier::default());

    fetcher.push(BESTBUY_URL, page("Add to Cart", "$799.00"));
    fetcher.push(BAMBU_URL, timeout("form button"));

    let coordinator = coordinator(&get_test_config(), &fetcher, &notifier);

    completed(coordinator.run_cycle().await);
    assert_eq!(fetcher.sessions_opened(), 1);
    assert_eq!(fetcher.sessions_released(), 1);

    completed(coordinator.run_cycle().await);
    assert_eq!(fetcher.sessions_opened(), 2);
    assert_eq!(fetcher.sessions_released(), 2);
}

#[tokio::test]
async fn test_pacing_delay_between_sources() {
    let fetcher = Arc::new(ScriptedFetcher::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let mut config = get_test_config();
    config.scraper.pacing_delay_ms = 150;

    fetcher.push(BESTBUY_URL, page("Add to Cart", "$799.00"));
    fetcher.push(BAMBU_URL, page("Add to Cart", "$699.00"));

    let coordinator = coordinator(&config, &fetcher, &notifier);

    let start = Instant::now();
    completed(coordinator.run_cycle().await);
    assert!(start.elapsed() >= Duration::from_millis(150));
}

#[tokio::test]
async fn test_delivery_failure_does_not_reemit() {
    let fetcher = Arc::new(ScriptedFetcher::default());
    let notifier = Arc::new(RecordingNotifier::failing());
    let mut config = get_test_config();
    config.sources.truncate(1);

    fetcher.push(BESTBUY_URL, page("Add to Cart", "$799.00"));
    fetcher.push(BESTBUY_URL, page("Add to Cart", "$799.00"));

    let coordinator = coordinator(&config, &fetcher, &notifier);

    let first = completed(coordinator.run_cycle().await);
    assert_eq!(first.notifications_failed, 1);
    assert_eq!(first.notifications_sent, 0);

    let second = completed(coordinator.run_cycle().await);
    assert!(second.events.is_empty());
    assert_eq!(notifier.messages().len(), 1);
}

#[tokio::test]
async fn test_unknown_price_is_ignored() {
    let fetcher = Arc::new(ScriptedFetcher::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let mut config = get_test_config();
    config.sources.truncate(1);

    fetcher.push(BESTBUY_URL, page("Add to Cart", "$799.00"));
    fetcher.push(BESTBUY_URL, page("Add to Cart", "Price hidden"));
    fetcher.push(BESTBUY_URL, page("Add to Cart", "$799.00"));

    let coordinator = coordinator(&config, &fetcher, &notifier);

    completed(coordinator.run_cycle().await);
    assert!(completed(coordinator.run_cycle().await).events.is_empty());
    assert!(completed(coordinator.run_cycle().await).events.is_empty());

    let last_price = coordinator.source_states().await[0].last_price().unwrap();
    assert_eq!(last_price.to_string(), "$799.00");
}

#[tokio::test]
async fn test_restart_reannounces_baseline() {
    let fetcher = Arc::new(ScriptedFetcher::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let mut config = get_test_config();
    config.sources.truncate(1);

    fetcher.push(BESTBUY_URL, page("Add to Cart", "$799.00"));
    fetcher.push(BESTBUY_URL, page("Sold Out", "$749.00"));

    let before = coordinator(&config, &fetcher, &notifier);
    completed(before.run_cycle().await);
    drop(before);

    let after = coordinator(&config, &fetcher, &notifier);
    let report = completed(after.run_cycle().await);
    assert_eq!(kinds(&report), vec![("BestBuy".to_string(), EventKind::Baseline)]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_overlapping_cycle_is_skipped() {
    let gate = Gate::default();
    let fetcher = Arc::new(ScriptedFetcher::with_gate(gate.clone()));
    let notifier = Arc::new(RecordingNotifier::default());
    let mut config = get_test_config();
    config.sources.truncate(1);

    fetcher.push(BESTBUY_URL, page("Add to Cart", "$799.00"));

    let coordinator = Arc::new(coordinator(&config, &fetcher, &notifier));

    let first = tokio::spawn({
        let coordinator = Arc::clone(&coordinator);
        async move { coordinator.run_cycle().await }
    });

    gate.entered.notified().await;
    let second = coordinator.run_cycle().await;
    assert!(matches!(second, CycleOutcome::Skipped));

    gate.release.notify_one();
    let first = completed(first.await.unwrap());
    assert_eq!(first.events.len(), 1);

    assert_eq!(fetcher.fetched().len(), 1);
    assert_eq!(notifier.messages().len(), 1);
}
