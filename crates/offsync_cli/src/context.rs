//! Shared state for every command: the engine, settings and output format.

use crate::Format;
use offsync_core::{LocalStore, RecordId, StoreConfig};
use offsync_engine::{Settings, SyncEngine};
use offsync_remote::{HttpRemote, RemoteConnector, RemoteStore, ReqwestClient};
use serde::Serialize;
use std::error::Error;
use std::sync::Arc;
use tracing::debug;

/// Remote used by the CLI: HTTP when configured, nothing otherwise.
pub type Remote = Box<dyn RemoteStore>;

/// Engine used by the CLI.
pub type Engine = SyncEngine<Remote>;

/// Command context.
pub struct Context {
    /// The sync engine over the local store.
    pub engine: Arc<Engine>,
    /// Settings in effect.
    pub settings: Settings,
    /// Output format.
    pub format: Format,
    user: Option<String>,
}

impl Context {
    /// Opens the local store and connects to the remote if configured.
    pub fn open(
        settings: Settings,
        user: Option<String>,
        format: Format,
    ) -> Result<Self, Box<dyn Error>> {
        std::fs::create_dir_all(&settings.data_dir)?;
        let store = LocalStore::open(&settings.data_dir, StoreConfig::default())?;

        let connector = match (&settings.remote.url, &settings.remote.credential) {
            (Some(url), Some(credential)) if settings.remote.is_configured() => {
                let client = ReqwestClient::new(settings.remote.timeout)?;
                let remote: Remote = Box::new(HttpRemote::new(url.as_str(), credential.as_str(), client));
                RemoteConnector::new(settings.remote.clone(), remote)
            }
            _ => RemoteConnector::local_only(),
        };

        let engine = SyncEngine::new(Arc::new(store), connector, settings.engine.clone());
        if engine.connector().is_configured() {
            let online = engine.refresh_connectivity();
            debug!(online, "initial connectivity check");
        }

        Ok(Self {
            engine: Arc::new(engine),
            settings,
            format,
            user,
        })
    }

    /// Resolves `--user` to an account id.
    ///
    /// A uuid is taken as is, so a fresh device can pull an account's rows
    /// before the account itself is known locally. Anything else must be the
    /// username of a local account.
    pub fn current_user(&self) -> Result<RecordId, Box<dyn Error>> {
        let user = self
            .user
            .as_deref()
            .ok_or("--user is required for this command")?;
        if let Ok(id) = user.parse::<RecordId>() {
            return Ok(id);
        }
        self.engine
            .find_account(user)
            .map(|account| account.id)
            .ok_or_else(|| format!("no local account named {user:?}").into())
    }

    /// Prints `value` as JSON, or as the text `render` produces.
    pub fn emit<T, F>(&self, value: &T, render: F) -> Result<(), Box<dyn Error>>
    where
        T: Serialize + ?Sized,
        F: FnOnce(&T) -> String,
    {
        match self.format {
            Format::Json => println!("{}", serde_json::to_string_pretty(value)?),
            Format::Text => println!("{}", render(value)),
        }
        Ok(())
    }
}

/// Parses a record id argument.
pub fn parse_id(raw: &str) -> Result<RecordId, Box<dyn Error>> {
    raw.trim()
        .parse()
        .map_err(|e| format!("invalid id {raw:?}: {e}").into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use offsync_core::NewAccount;

    fn open(dir: &std::path::Path, user: Option<&str>) -> Context {
        let settings = Settings {
            data_dir: dir.to_path_buf(),
            ..Settings::default()
        };
        Context::open(settings, user.map(String::from), Format::Text).unwrap()
    }

    #[test]
    fn local_only_without_remote_settings() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = open(dir.path(), None);
        assert!(!ctx.engine.connector().is_configured());
        assert!(ctx.current_user().is_err());
    }

    #[test]
    fn user_resolves_by_name_or_id() {
        let dir = tempfile::tempdir().unwrap();
        let id = {
            let ctx = open(dir.path(), None);
            let id = ctx
                .engine
                .create_account(NewAccount::new("alice", "hash"))
                .unwrap();
            id
        };

        let by_name = open(dir.path(), Some("alice"));
        assert_eq!(by_name.current_user().unwrap(), id);
        drop(by_name);

        let foreign = RecordId::new();
        let by_id = open(dir.path(), Some(&foreign.to_string()));
        assert_eq!(by_id.current_user().unwrap(), foreign);
        drop(by_id);

        let unknown = open(dir.path(), Some("bob"));
        assert!(unknown.current_user().is_err());
    }

    #[test]
    fn ids_are_validated() {
        assert!(parse_id("not-a-uuid").is_err());
        let id = RecordId::new();
        assert_eq!(parse_id(&format!(" {id} ")).unwrap(), id);
    }
}
