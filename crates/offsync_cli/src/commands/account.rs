//! Account commands.

use crate::context::{parse_id, Context};
use chrono::{DateTime, Utc};
use clap::Subcommand;
use offsync_core::{NewAccount, Record, RecordId, SyncStatus};
use serde::Serialize;
use std::error::Error;

/// Account subcommands.
#[derive(Subcommand)]
pub enum AccountCommand {
    /// Create an account
    Create {
        /// Login name, at least three characters
        username: String,

        /// Credential hash produced by the authentication layer
        #[arg(long)]
        password_hash: String,
    },

    /// Show an account (defaults to --user)
    Show {
        /// Account id
        id: Option<String>,
    },

    /// Look up an account by username
    Find {
        /// Login name
        username: String,
    },
}

/// Account as printed; the credential hash is never shown.
#[derive(Debug, Serialize)]
pub struct AccountView {
    /// Account id.
    pub id: RecordId,
    /// Login name.
    pub username: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last change.
    pub updated_at: DateTime<Utc>,
    /// Local sync state.
    pub sync_status: SyncStatus,
}

impl AccountView {
    fn from_record(record: &Record) -> Option<Self> {
        let account = record.account()?;
        Some(Self {
            id: record.id,
            username: account.username.clone(),
            created_at: record.created_at,
            updated_at: record.updated_at,
            sync_status: record.sync_status,
        })
    }

    fn render(&self) -> String {
        format!(
            "{}  {}  ({}, updated {})",
            self.id,
            self.username,
            self.sync_status,
            self.updated_at.format("%Y-%m-%d %H:%M:%S")
        )
    }
}

/// Runs an account command.
pub fn run(ctx: &Context, command: AccountCommand) -> Result<(), Box<dyn Error>> {
    match command {
        AccountCommand::Create {
            username,
            password_hash,
        } => {
            let id = ctx
                .engine
                .create_account(NewAccount::new(username, password_hash))?;
            show(ctx, id)
        }
        AccountCommand::Show { id } => {
            let id = match id {
                Some(raw) => parse_id(&raw)?,
                None => ctx.current_user()?,
            };
            show(ctx, id)
        }
        AccountCommand::Find { username } => {
            let record = ctx
                .engine
                .find_account(&username)
                .ok_or_else(|| format!("no local account named {username:?}"))?;
            show(ctx, record.id)
        }
    }
}

fn show(ctx: &Context, id: RecordId) -> Result<(), Box<dyn Error>> {
    let view = ctx
        .engine
        .get_account(id)
        .as_ref()
        .and_then(AccountView::from_record)
        .ok_or_else(|| format!("account {id} not found"))?;
    ctx.emit(&view, AccountView::render)
}
