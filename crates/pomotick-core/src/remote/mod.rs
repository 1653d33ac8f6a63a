//! Server-side settings persistence.
//!
//! The timer reads its settings and the completed-session count once at
//! start-up and writes back without waiting on the answer. Only the shape
//! of the exchange lives here; [`http`] speaks it over HTTP.

pub mod http;

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::timer::Settings;

pub use http::HttpSettingsStore;

/// Body of `GET settings`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteState {
    pub settings: Settings,
    pub focus_sessions: u64,
}

pub trait SettingsStore: Send + Sync {
    /// Load settings and the completed focus session count.
    fn fetch(&self) -> impl Future<Output = Result<RemoteState, StoreError>> + Send;

    fn save(&self, settings: Settings) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Add one to the server-side completed focus session count.
    fn increment_session(&self) -> impl Future<Output = Result<(), StoreError>> + Send;
}
