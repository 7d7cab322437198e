use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::config::{AppConfig, SourceConfig};
use crate::monitor::{Event, SourceIdentity, SourceMonitor, SourceState};
use crate::plugins::notifiers::message;
use crate::plugins::traits::{FetchRequest, FetchSession, NotifierPlugin, PageFetcher};
use crate::plugins::trackers::StockStatus;
use crate::Result;

/// Result of checking one source within a cycle.
#[derive(Debug, Clone, Serialize)]
pub struct SourceCheckResult {
    pub source: String,
    pub success: bool,
    pub status: Option<StockStatus>,
    pub events_detected: usize,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub started_at: DateTime<Utc>,
    pub sources_checked: usize,
    pub sources_failed: usize,
    pub events: Vec<Event>,
    pub notifications_sent: usize,
    pub notifications_failed: usize,
    pub source_results: Vec<SourceCheckResult>,
    pub total_time_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CycleOutcome {
    Completed(CycleReport),
    /// A previous cycle still held the sources; nothing was done.
    Skipped,
}

struct TrackedSource {
    config: SourceConfig,
    monitor: SourceMonitor,
}

/// Drives one pass over every configured source.
///
/// All per-source state lives in the monitors behind `sources`; the lock is
/// taken with `try_lock` so a trigger that arrives mid-cycle is dropped rather
/// than queued behind it.
pub struct TrackingCoordinator {
    item_name: String,
    sources: Mutex<Vec<TrackedSource>>,
    fetcher: Arc<dyn PageFetcher>,
    notifier: Arc<dyn NotifierPlugin>,
    element_timeout: Duration,
    pacing_delay: Duration,
}

impl TrackingCoordinator {
    pub fn new(
        config: &AppConfig,
        fetcher: Arc<dyn PageFetcher>,
        notifier: Arc<dyn NotifierPlugin>,
    ) -> Self {
        let sources = config
            .sources
            .iter()
            .map(|source| TrackedSource {
                config: source.clone(),
                monitor: SourceMonitor::new(SourceIdentity {
                    name: source.name.clone(),
                    url: source.url.clone(),
                }),
            })
            .collect();

        Self {
            item_name: config.item_name.clone(),
            sources: Mutex::new(sources),
            fetcher,
            notifier,
            element_timeout: config.scraper.element_timeout(),
            pacing_delay: config.scraper.pacing_delay(),
        }
    }

    /// Copies of the current per-source state, in check order. Waits for any
    /// running cycle to finish.
    pub async fn source_states(&self) -> Vec<SourceState> {
        let sources = self.sources.lock().await;
        sources.iter().map(|source| source.monitor.state().clone()).collect()
    }

    pub async fn run_cycle(&self) -> CycleOutcome {
        let Ok(mut sources) = self.sources.try_lock() else {
            tracing::warn!("Previous cycle still running, skipping this trigger");
            metrics::counter!("watcher_cycles_total", "outcome" => "skipped").increment(1);
            return CycleOutcome::Skipped;
        };

        let start_time = tokio::time::Instant::now();
        let mut report = CycleReport {
            started_at: Utc::now(),
            sources_checked: 0,
            sources_failed: 0,
            events: Vec::new(),
            notifications_sent: 0,
            notifications_failed: 0,
            source_results: Vec::new(),
            total_time_ms: 0,
        };

        tracing::debug!("Starting cycle over {} sources", sources.len());

        match self.fetcher.open_session().await {
            Ok(mut session) => {
                for (index, source) in sources.iter_mut().enumerate() {
                    if index > 0 && !self.pacing_delay.is_zero() {
                        tracing::debug!(
                            "Waiting {}ms before checking {}",
                            self.pacing_delay.as_millis(),
                            source.config.name
                        );
                        tokio::time::sleep(self.pacing_delay).await;
                    }

                    let result = self.check_source(session.as_mut(), source, &mut report).await;
                    report.source_results.push(result);
                }
                // Releasing a browser blocks on the DevTools connection, so it
                // happens on the blocking pool; still finished before the cycle returns.
                if let Err(e) = tokio::task::spawn_blocking(move || drop(session)).await {
                    tracing::warn!("Fetch session release did not complete: {}", e);
                }
            }
            Err(e) => {
                tracing::error!("Could not open fetch session: {}", e);
                for source in sources.iter() {
                    metrics::counter!("watcher_source_failures_total", "source" => source.config.name.clone())
                        .increment(1);
                    report.source_results.push(SourceCheckResult {
                        source: source.config.name.clone(),
                        success: false,
                        status: None,
                        events_detected: 0,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        report.sources_checked = report.source_results.len();
        report.sources_failed = report.source_results.iter().filter(|r| !r.success).count();
        report.total_time_ms = start_time.elapsed().as_millis() as u64;

        let outcome = if report.sources_failed == report.sources_checked {
            "failed"
        } else {
            "completed"
        };
        metrics::counter!("watcher_cycles_total", "outcome" => outcome).increment(1);

        tracing::info!(
            "Cycle finished: {} sources checked, {} failed, {} events, {} notifications sent, {} failed in {}ms",
            report.sources_checked,
            report.sources_failed,
            report.events.len(),
            report.notifications_sent,
            report.notifications_failed,
            report.total_time_ms
        );

        CycleOutcome::Completed(report)
    }

    /// fetch → classify/parse → compare → notify, for one source.
    ///
    /// A fetch failure leaves the monitor untouched. Notification failures are
    /// logged and not retried; the monitor has already moved on.
    async fn check_source(
        &self,
        session: &mut dyn FetchSession,
        source: &mut TrackedSource,
        report: &mut CycleReport,
    ) -> SourceCheckResult {
        let name = source.config.name.clone();
        let request = FetchRequest {
            url: source.config.url.clone(),
            price_selector: source.config.price_selector.clone(),
            stock_selector: source.config.stock_selector.clone(),
            timeout_ms: self.element_timeout.as_millis() as u64,
        };

        let snapshot = match session.fetch(&request).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(source = %name, "Check failed, skipping source this cycle: {}", e);
                metrics::counter!("watcher_source_failures_total", "source" => name.clone()).increment(1);
                return SourceCheckResult {
                    source: name,
                    success: false,
                    status: None,
                    events_detected: 0,
                    error: Some(e.to_string()),
                };
            }
        };

        let status = StockStatus::from_button_text(&snapshot.stock_text, &source.config.in_stock_phrase);
        let events = source.monitor.observe(status, &snapshot.price_text);

        if events.is_empty() {
            tracing::debug!(source = %name, "No change (stock {}, price text {:?})", status, snapshot.price_text);
        }

        for event in &events {
            metrics::counter!("watcher_events_total", "kind" => event.kind().as_str()).increment(1);

            match self.notify(event).await {
                Ok(()) => {
                    report.notifications_sent += 1;
                    tracing::info!(source = %name, kind = event.kind().as_str(), "Alert sent");
                }
                Err(e) => {
                    report.notifications_failed += 1;
                    metrics::counter!("watcher_notify_failures_total").increment(1);
                    tracing::error!(source = %name, kind = event.kind().as_str(), "Alert delivery failed: {}", e);
                }
            }
        }

        let events_detected = events.len();
        report.events.extend(events);

        SourceCheckResult {
            source: name,
            success: true,
            status: Some(status),
            events_detected,
            error: None,
        }
    }

    async fn notify(&self, event: &Event) -> Result<()> {
        let message = message::render(event, &self.item_name);
        self.notifier.send(&message).await
    }
}
