use std::future::Future;

use chrono::{DateTime, Local, NaiveTime, TimeZone};
use tokio::{signal, time};

/// First instant strictly after `now` whose local time of day is `at`.
///
/// Days on which `at` does not exist (DST gap) are skipped.
pub fn next_run_after<Tz: TimeZone>(now: &DateTime<Tz>, at: NaiveTime) -> DateTime<Tz> {
    let tz = now.timezone();
    let mut day = now.date_naive();
    loop {
        if let Some(candidate) = day.and_time(at).and_local_timezone(tz.clone()).earliest() {
            if candidate > *now {
                return candidate;
            }
        }
        day = match day.succ_opt() {
            Some(next) => next,
            None => return now.clone(),
        };
    }
}

/// Runs `batch` every day at `at` until Ctrl-C.
///
/// Batches never overlap, a failed batch is logged and the next one is
/// still scheduled.
pub async fn run_daily<F, Fut>(at: NaiveTime, mut batch: F) -> anyhow::Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<()>>,
{
    log::info!("Scheduler started, running every day at {}", at.format("%H:%M"));
    loop {
        let now = Local::now();
        let next = next_run_after(&now, at);
        let wait = (next - now).to_std().unwrap_or_default();
        log::info!("Next batch at {}", next.format("%Y-%m-%d %H:%M"));

        tokio::select! {
            _ = time::sleep(wait) => {}
            _ = signal::ctrl_c() => {
                log::info!("Interrupted, stopping scheduler");
                return Ok(());
            }
        }

        log::info!("Scheduled batch starting");
        tokio::select! {
            res = batch() => match res {
                Ok(()) => log::info!("Scheduled batch done"),
                Err(e) => log::error!("Scheduled batch failed: {e:#}"),
            },
            _ = signal::ctrl_c() => {
                log::info!("Interrupted during batch, stopping scheduler");
                return Ok(());
            }
        }
    }
}
