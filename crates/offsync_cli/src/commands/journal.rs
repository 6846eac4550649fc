//! Journal command.

use crate::context::{parse_id, Context};
use offsync_core::JournalEntry;
use std::error::Error;

/// Prints journal entries in append order.
pub fn run(ctx: &Context, record: Option<&str>, unsynced_only: bool) -> Result<(), Box<dyn Error>> {
    let record = record.map(parse_id).transpose()?;
    let entries: Vec<JournalEntry> = ctx
        .engine
        .store()
        .journal(record)
        .into_iter()
        .filter(|e| !unsynced_only || !e.synced)
        .collect();

    ctx.emit(&entries, |entries| {
        if entries.is_empty() {
            return "journal is empty".to_string();
        }
        entries
            .iter()
            .map(|e| {
                format!(
                    "{}  {:<6} {:<5} {}  {}",
                    e.timestamp.format("%Y-%m-%d %H:%M:%S%.3f"),
                    e.operation.as_str(),
                    e.table.as_str(),
                    e.record_id,
                    if e.synced { "synced" } else { "pending" }
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    })
}
