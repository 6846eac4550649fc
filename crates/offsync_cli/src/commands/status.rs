//! Status command.

use crate::context::Context;
use offsync_core::{StoreStats, Table};
use offsync_engine::SyncStatusSnapshot;
use serde::Serialize;
use std::error::Error;

/// Everything `status` reports.
#[derive(Debug, Serialize)]
pub struct StatusView {
    /// Connectivity and pending counts.
    #[serde(flatten)]
    pub sync: SyncStatusSnapshot,
    /// Whether remote parameters are set at all.
    pub remote_configured: bool,
    /// Local store counters.
    pub store: StoreStats,
}

/// Runs the status command.
pub fn run(ctx: &Context) -> Result<(), Box<dyn Error>> {
    let view = StatusView {
        sync: ctx.engine.sync_status(),
        remote_configured: ctx.engine.connector().is_configured(),
        store: ctx.engine.store().stats()?,
    };
    ctx.emit(&view, render)
}

fn render(view: &StatusView) -> String {
    let remote = match (view.remote_configured, view.sync.is_online) {
        (false, _) => "local only (remote not configured)",
        (true, true) => "online",
        (true, false) => "offline",
    };
    let mut lines = vec![format!("remote:         {remote}")];
    for table in Table::ALL {
        lines.push(format!(
            "pending {:<7} {}",
            format!("{table}:"),
            view.sync.pending_for(table)
        ));
    }
    lines.push(format!("total pending:  {}", view.sync.total_pending));
    lines.push(format!(
        "log:            {} frames, {} bytes",
        view.store.log_frames, view.store.log_bytes
    ));
    lines.join("\n")
}
