pub mod config;
pub mod run;
pub mod settings;
pub mod status;

use std::sync::Arc;

use pomotick_core::error::Result;
use pomotick_core::storage::ReadOnly;
use pomotick_core::{
    Config, CoreError, Database, EventBus, HttpSettingsStore, LocalPersistence, SystemClock,
    TimerSession, TracingSink,
};
use serde::Serialize;
use tracing::info;

pub type CliResult = Result<()>;

/// How a session may treat the local database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    ReadWrite,
    /// Recovery may read a stored deadline but never rewrites or clears it.
    ReadOnly,
}

/// The configured settings store, or `None` when no session token is set.
pub fn settings_store(config: &Config) -> Result<Option<Arc<HttpSettingsStore>>> {
    if config.server.identity().is_none() {
        return Ok(None);
    }
    Ok(Some(Arc::new(HttpSettingsStore::from_config(&config.server)?)))
}

/// Like [`settings_store`], but a missing token is an error.
pub fn require_store(config: &Config) -> Result<Arc<HttpSettingsStore>> {
    settings_store(config)?.ok_or(CoreError::NoIdentity)
}

/// Bootstrap a session backed by the local database and the wall clock.
pub async fn open_session(config: &Config, access: Access) -> Result<TimerSession> {
    let store = settings_store(config)?;
    if store.is_none() {
        info!("no session token configured, running on default settings");
    }
    let db = Database::open()?;
    let persistence: Box<dyn LocalPersistence> = match access {
        Access::ReadWrite => Box::new(db),
        Access::ReadOnly => Box::new(ReadOnly::new(db)),
    };
    Ok(TimerSession::open(
        &config.timer,
        store,
        persistence,
        Arc::new(SystemClock),
        Arc::new(TracingSink),
        EventBus::new(),
    )
    .await)
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
