//! Sync command.

use crate::context::Context;
use std::error::Error;

/// Runs one full sync for the current user and prints the summary.
pub fn run(ctx: &Context) -> Result<(), Box<dyn Error>> {
    let owner = ctx.current_user()?;
    let report = ctx.engine.sync_now(owner)?;
    ctx.emit(&report, |report| report.summary())
}
