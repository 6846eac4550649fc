//! Compact command.

use crate::context::Context;
use serde::Serialize;
use std::error::Error;

/// Log size before and after compaction.
#[derive(Debug, Serialize)]
pub struct CompactStats {
    /// Frames before.
    pub frames_before: u64,
    /// Frames after.
    pub frames_after: u64,
    /// Bytes before.
    pub bytes_before: u64,
    /// Bytes after.
    pub bytes_after: u64,
}

/// Rewrites the record log as a snapshot.
pub fn run(ctx: &Context) -> Result<(), Box<dyn Error>> {
    let store = ctx.engine.store();
    let before = store.stats()?;
    store.compact()?;
    let after = store.stats()?;

    let stats = CompactStats {
        frames_before: before.log_frames,
        frames_after: after.log_frames,
        bytes_before: before.log_bytes,
        bytes_after: after.log_bytes,
    };
    ctx.emit(&stats, |s| {
        format!(
            "Compacted {} -> {} frames, {} -> {} bytes",
            s.frames_before, s.frames_after, s.bytes_before, s.bytes_after
        )
    })
}
