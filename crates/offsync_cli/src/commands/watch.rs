//! Watch command: runs the sync scheduler in the foreground.

use crate::context::Context;
use crate::Format;
use offsync_engine::{SyncReport, SyncScheduler};
use std::error::Error;
use tracing::info;

/// Runs the scheduler for the current user until Ctrl-C.
///
/// The runtime is built here rather than in `main`: the blocking HTTP client
/// must be created and dropped outside of it.
pub fn run(ctx: Context) -> Result<(), Box<dyn Error>> {
    let owner = ctx.current_user()?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let scheduler = SyncScheduler::new(ctx.engine.clone());
        let mut reports = scheduler.subscribe();
        scheduler.start(owner)?;
        info!(
            interval_secs = ctx.settings.engine.sync_interval.as_secs(),
            "watching; press Ctrl-C to stop"
        );

        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);
        loop {
            tokio::select! {
                _ = &mut ctrl_c => break,
                changed = reports.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let report = reports.borrow_and_update().clone();
                    if let Some(report) = report {
                        print_report(ctx.format, &report)?;
                    }
                }
            }
        }

        scheduler.stop();
        Ok::<(), Box<dyn Error>>(())
    })?;

    drop(runtime);
    Ok(())
}

fn print_report(format: Format, report: &SyncReport) -> Result<(), Box<dyn Error>> {
    match format {
        Format::Json => println!("{}", serde_json::to_string(report)?),
        Format::Text => {
            let outcome = match (&report.last_sync, &report.error) {
                (_, Some(error)) => format!("error: {error}"),
                (Some(sync), None) => sync.summary(),
                (None, None) => "offline, changes saved locally".to_string(),
            };
            println!(
                "[{}] {outcome} (pending {})",
                report.attempt, report.status.total_pending
            );
        }
    }
    Ok(())
}
