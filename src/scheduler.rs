use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_cron_scheduler::{Job, JobScheduler};
use uuid::Uuid;

use crate::config::{is_valid_cron, SchedulerConfig};
use crate::coordinator::{CycleOutcome, TrackingCoordinator};

#[derive(Debug, Clone, Default, Serialize)]
pub struct SchedulerStats {
    pub completed_runs: u64,
    pub skipped_runs: u64,
    /// Cycles in which every source failed.
    pub failed_runs: u64,
    pub events_emitted: u64,
    pub last_run: Option<DateTime<Utc>>,
    pub uptime_seconds: u64,
}

/// Fires the coordinator's cycle on a cron schedule, plus once at start-up.
///
/// Overlap protection lives in the coordinator: a tick that lands while a
/// cycle is still running comes back as `CycleOutcome::Skipped` and is only
/// counted here.
pub struct CycleScheduler {
    scheduler: JobScheduler,
    coordinator: Arc<TrackingCoordinator>,
    config: SchedulerConfig,
    stats: Arc<RwLock<SchedulerStats>>,
    job_id: Option<Uuid>,
    start_time: DateTime<Utc>,
}

impl CycleScheduler {
    pub async fn new(coordinator: Arc<TrackingCoordinator>, config: SchedulerConfig) -> Result<Self> {
        let scheduler = JobScheduler::new().await?;

        Ok(Self {
            scheduler,
            coordinator,
            config,
            stats: Arc::new(RwLock::new(SchedulerStats::default())),
            job_id: None,
            start_time: Utc::now(),
        })
    }

    pub async fn start(&mut self) -> Result<()> {
        let schedule = match job_schedule(&self.config.cron) {
            Some(schedule) if is_valid_cron(&self.config.cron) => schedule,
            _ => return Err(anyhow::anyhow!("Invalid cron expression: {}", self.config.cron)),
        };
        let coordinator = Arc::clone(&self.coordinator);
        let stats = Arc::clone(&self.stats);

        let job = Job::new_async(schedule.as_str(), move |_uuid, _l| {
            let coordinator = Arc::clone(&coordinator);
            let stats = Arc::clone(&stats);

            Box::pin(async move {
                Self::execute_cycle(coordinator, stats).await;
            })
        })?;

        self.job_id = Some(self.scheduler.add(job).await?);
        self.scheduler.start().await?;
        tracing::info!("Cycle scheduler started with schedule: {}", self.config.cron);

        if self.config.run_on_start {
            let coordinator = Arc::clone(&self.coordinator);
            let stats = Arc::clone(&self.stats);
            tokio::spawn(async move {
                Self::execute_cycle(coordinator, stats).await;
            });
        }

        Ok(())
    }

    pub async fn shutdown(&mut self) -> Result<()> {
        if let Some(job_id) = self.job_id.take() {
            self.scheduler.remove(&job_id).await?;
        }

        self.scheduler.shutdown().await?;
        tracing::info!("Cycle scheduler shutdown");
        Ok(())
    }

    pub async fn stats(&self) -> SchedulerStats {
        let mut stats = self.stats.read().await.clone();
        let uptime = Utc::now().signed_duration_since(self.start_time);
        stats.uptime_seconds = uptime.num_seconds().max(0) as u64;
        stats
    }

    async fn execute_cycle(coordinator: Arc<TrackingCoordinator>, stats: Arc<RwLock<SchedulerStats>>) {
        let outcome = coordinator.run_cycle().await;

        let mut stats = stats.write().await;
        match outcome {
            CycleOutcome::Completed(report) => {
                stats.completed_runs += 1;
                stats.events_emitted += report.events.len() as u64;
                stats.last_run = Some(report.started_at);
                if report.sources_checked > 0 && report.sources_failed == report.sources_checked {
                    stats.failed_runs += 1;
                }
            }
            CycleOutcome::Skipped => {
                stats.skipped_runs += 1;
            }
        }
    }
}

/// Translate a standard cron expression into the job scheduler's dialect.
///
/// The scheduler wants a leading seconds field (5-field expressions fire at
/// second 0) and numbers weekdays 1=Sun..7=Sat, where standard cron uses
/// 0=Sun..6=Sat with 7 as a second Sunday. Returns `None` when the expression
/// has the wrong shape or an out-of-range weekday.
pub fn job_schedule(cron_expr: &str) -> Option<String> {
    let mut fields: Vec<String> = cron_expr.split_whitespace().map(str::to_string).collect();
    match fields.len() {
        5 => fields.insert(0, "0".to_string()),
        6 => {}
        _ => return None,
    }

    fields[5] = scheduler_weekdays(&fields[5])?;
    Some(fields.join(" "))
}

fn scheduler_weekdays(field: &str) -> Option<String> {
    if field == "*" {
        return Some(field.to_string());
    }

    let mut days = BTreeSet::new();
    for item in field.split(',') {
        days.extend(standard_weekdays(item)?);
    }

    Some(
        days.into_iter()
            .map(|day| (day + 1).to_string())
            .collect::<Vec<_>>()
            .join(","),
    )
}

/// Days (0=Sun..6=Sat) named by one list item: `*`, `n`, `a-b`, with an
/// optional `/step`.
fn standard_weekdays(item: &str) -> Option<Vec<u8>> {
    let (range, step) = match item.split_once('/') {
        Some((range, step)) => (range, Some(step.parse::<usize>().ok().filter(|step| *step > 0)?)),
        None => (item, None),
    };

    let (start, end) = match range {
        "*" => (0, 6),
        _ => match range.split_once('-') {
            Some((start, end)) => (start.parse::<u8>().ok()?, end.parse::<u8>().ok()?),
            None => {
                let day = range.parse::<u8>().ok()?;
                (day, if step.is_some() { 6 } else { day })
            }
        },
    };

    if start > end || end > 7 {
        return None;
    }

    Some(
        (start..=end)
            .step_by(step.unwrap_or(1))
            .map(|day| day % 7)
            .collect(),
    )
}
