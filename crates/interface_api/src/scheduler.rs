//! Daily renewal scheduler
//!
//! One tokio task wakes every minute and runs the renewal jobs once per
//! business date, at the configured local hour. Both jobs run sequentially
//! inside the task so runs never overlap.

use std::sync::Arc;

use chrono::{NaiveDate, Timelike, Utc};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{error, info};

use core_kernel::Timezone;
use domain_renewal::RenewalJobs;

const TICK: Duration = Duration::from_secs(60);

pub struct RenewalScheduler {
    jobs: RenewalJobs,
    timezone: Timezone,
    hour: u32,
    shutdown: Arc<Notify>,
}

impl RenewalScheduler {
    pub fn new(jobs: RenewalJobs, timezone: Timezone, hour: u32, shutdown: Arc<Notify>) -> Self {
        Self {
            jobs,
            timezone,
            hour,
            shutdown,
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(self) {
        info!(hour = self.hour, timezone = self.timezone.name(), "Renewal scheduler started");
        let mut ticker = interval(TICK);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut last_run: Option<NaiveDate> = None;

        loop {
            tokio::select! {
                _ = self.shutdown.notified() => {
                    info!("Renewal scheduler stopping");
                    break;
                }
                _ = ticker.tick() => {
                    let local = self.timezone.to_local(Utc::now());
                    let today = local.date_naive();
                    if !is_due(local.hour(), today, last_run, self.hour) {
                        continue;
                    }
                    last_run = Some(today);
                    match self.jobs.run_daily(today).await {
                        Ok(summary) => info!(
                            %today,
                            created = summary.created,
                            refreshed = summary.refreshed,
                            expired = summary.expired,
                            "Scheduled renewal run finished"
                        ),
                        Err(e) => error!(%today, error = %e, "Scheduled renewal run failed"),
                    }
                }
            }
        }
    }
}

/// Whether the daily run should fire now
///
/// Fires on the first tick at or after the configured hour that has not
/// already run today, so a late start still runs the same day.
pub fn is_due(local_hour: u32, today: NaiveDate, last_run: Option<NaiveDate>, hour: u32) -> bool {
    local_hour >= hour && last_run.map_or(true, |last| last < today)
}
