//! Fire-and-forget delivery of server writes.
//!
//! The engine drops [`SyncRequest`]s into an unbounded channel and moves
//! on. The worker performs them one at a time, in the order they were
//! issued, so the server never ends up with an older settings write on
//! top of a newer one. The outcome only ever becomes a notice, never a
//! change to timer state. Nothing is retried.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::notify::{Notice, NotificationSink};
use crate::remote::SettingsStore;
use crate::timer::Settings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncRequest {
    SaveSettings(Settings),
    IncrementSession,
}

pub struct SyncWorker<S> {
    store: Arc<S>,
    sink: Arc<dyn NotificationSink>,
}

impl<S: SettingsStore + 'static> SyncWorker<S> {
    pub fn new(store: Arc<S>, sink: Arc<dyn NotificationSink>) -> Self {
        Self { store, sink }
    }

    /// Drain requests in order until every sender is gone.
    pub async fn run(self, mut requests: mpsc::UnboundedReceiver<SyncRequest>) {
        info!("sync worker started");
        while let Some(request) = requests.recv().await {
            perform(self.store.as_ref(), self.sink.as_ref(), request).await;
        }
        debug!("sync worker stopped");
    }
}

/// Execute one request and report the outcome.
pub async fn perform<S: SettingsStore>(store: &S, sink: &dyn NotificationSink, request: SyncRequest) {
    match request {
        SyncRequest::SaveSettings(settings) => match store.save(settings).await {
            Ok(()) => {
                info!("settings saved to server");
                sink.notify(Notice::success("Settings saved"));
            }
            Err(e) => {
                warn!("failed to save settings: {e}");
                sink.notify(Notice::error(
                    "Could not save your settings. They will apply on this device only.",
                ));
            }
        },
        SyncRequest::IncrementSession => match store.increment_session().await {
            Ok(()) => debug!("session count incremented on server"),
            Err(e) => {
                warn!("failed to record completed session: {e}");
                sink.notify(Notice::warning("Could not sync your completed session."));
            }
        },
    }
}
