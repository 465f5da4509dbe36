use std::sync::Arc;

use chrono::Utc;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{info, warn};

use super::{SweepReport, SweepRunner};

pub(super) async fn run_schedule(runner: Arc<SweepRunner>, mut shutdown: watch::Receiver<bool>) {
    let period = runner.config.interval;
    let now = Instant::now();
    let first_tick = if runner.config.run_on_start {
        now
    } else {
        let Some(first_tick) = now.checked_add(period) else {
            warn!(
                interval_secs = period.as_secs(),
                "retention sweep interval is out of range, scheduler not started"
            );
            return;
        };
        first_tick
    };

    let mut ticker = tokio::time::interval_at(first_tick, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => {
                let report = runner.sweep_at(Utc::now()).await;
                log_sweep_report(&report);
            }
        }
    }

    info!("retention sweeper stopped");
}

fn log_sweep_report(report: &SweepReport) {
    for target in &report.targets {
        info!(
            target_name = target.target.as_str(),
            deleted_count = target.deleted,
            batches = target.batches,
            "retention sweep target finished"
        );
    }

    if report.is_partial() {
        warn!(
            cutoff = %report.cutoff,
            deleted_count = report.total_deleted(),
            "retention sweep completed partially"
        );
    } else {
        info!(
            cutoff = %report.cutoff,
            deleted_count = report.total_deleted(),
            "retention sweep completed"
        );
    }
}
