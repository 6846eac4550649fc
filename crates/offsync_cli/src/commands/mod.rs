//! CLI command implementations.

pub mod account;
pub mod compact;
pub mod journal;
pub mod pet;
pub mod status;
pub mod sync;
pub mod watch;
