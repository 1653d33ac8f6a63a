//! Session driver: owns one engine and feeds it ticks, user actions and
//! bus commands from a single task.
//!
//! ```text
//! TimerHandle --Action--> [ TimerSession loop ] --watch--> TimerSnapshot
//! EventBus --Command----^        |  ^                  --broadcast--> Event
//!                                v  | tick
//!                          CountdownEngine --SyncRequest--> SyncWorker
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::bus::EventBus;
use crate::error::{CoreError, Result};
use crate::events::Event;
use crate::notify::{Notice, NotificationSink};
use crate::remote::SettingsStore;
use crate::storage::{LocalPersistence, TimerConfig};
use crate::sync::SyncWorker;
use crate::timer::{Clock, CountdownEngine, EngineContext, Mode, Settings, TimerSnapshot};

const ACTION_CAPACITY: usize = 32;
const EVENT_CAPACITY: usize = 64;

/// User-initiated operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Start,
    Pause,
    Reset,
    ResetRound,
    SwitchMode(Mode),
    SaveSettings(Settings),
}

/// Run the load sequence against the settings store.
///
/// With no store (no user identity) the engine keeps its defaults and
/// nothing is recovered. A failed fetch falls back to the defaults and
/// warns; it never fails the session.
pub async fn bootstrap<S: SettingsStore>(
    engine: &mut CountdownEngine,
    store: Option<&S>,
) -> Option<Event> {
    let store = store?;

    match store.fetch().await {
        Ok(remote) => {
            if !remote.settings.is_clamped() {
                debug!(settings = ?remote.settings, "server sent out-of-range settings");
            }
            engine.load_remote(remote.settings, remote.focus_sessions);
            info!(
                settings = ?engine.settings(),
                focus_sessions = remote.focus_sessions,
                "settings loaded"
            );
        }
        Err(e) => {
            warn!("failed to load settings, using defaults: {e}");
            engine.load_remote(Settings::default(), 0);
            engine.notify(Notice::warning(
                "Could not load your timer settings. Using defaults.",
            ));
        }
    }

    engine.recover()
}

/// Narrow read/command interface to a running session.
#[derive(Debug, Clone)]
pub struct TimerHandle {
    actions: mpsc::Sender<Action>,
    snapshots: watch::Receiver<TimerSnapshot>,
    events: broadcast::Sender<Event>,
    bus: EventBus,
}

impl TimerHandle {
    pub async fn send(&self, action: Action) -> Result<()> {
        self.actions
            .send(action)
            .await
            .map_err(|_| CoreError::SessionClosed)
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<TimerSnapshot> {
        self.snapshots.clone()
    }

    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }
}

pub struct TimerSession {
    engine: CountdownEngine,
    bus: EventBus,
    tick_interval: Duration,
    snapshots: watch::Sender<TimerSnapshot>,
    events: broadcast::Sender<Event>,
    initial_events: Vec<Event>,
}

impl TimerSession {
    /// Wire an engine to its collaborators and run the load sequence.
    ///
    /// When `store` is given a [`SyncWorker`] is spawned for server writes,
    /// so this must be called inside a tokio runtime.
    pub async fn open<S: SettingsStore + 'static>(
        config: &TimerConfig,
        store: Option<Arc<S>>,
        persistence: Box<dyn LocalPersistence>,
        clock: Arc<dyn Clock>,
        sink: Arc<dyn NotificationSink>,
        bus: EventBus,
    ) -> Self {
        let (sync_tx, sync_rx) = mpsc::unbounded_channel();
        if let Some(store) = &store {
            let worker = SyncWorker::new(Arc::clone(store), Arc::clone(&sink));
            tokio::spawn(worker.run(sync_rx));
        }

        let mut engine = CountdownEngine::new(EngineContext {
            clock,
            persistence,
            bus: bus.clone(),
            sink,
            sync: sync_tx,
            transition_delay: config.transition_delay(),
        });
        let recovered = bootstrap(&mut engine, store.as_deref()).await;

        let (snapshots, _) = watch::channel(engine.snapshot());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            engine,
            bus,
            tick_interval: config.tick_interval(),
            snapshots,
            events,
            initial_events: recovered.into_iter().collect(),
        }
    }

    pub fn engine(&self) -> &CountdownEngine {
        &self.engine
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        self.engine.snapshot()
    }

    /// Move the loop onto its own task.
    pub fn spawn(self) -> (TimerHandle, JoinHandle<CountdownEngine>) {
        let (tx, rx) = mpsc::channel(ACTION_CAPACITY);
        let handle = TimerHandle {
            actions: tx,
            snapshots: self.snapshots.subscribe(),
            events: self.events.clone(),
            bus: self.bus.clone(),
        };
        (handle, tokio::spawn(self.run(rx)))
    }

    /// Drive the engine until every action sender is dropped, then hand it
    /// back.
    pub async fn run(mut self, mut actions: mpsc::Receiver<Action>) -> CountdownEngine {
        let mut interval = tokio::time::interval(self.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(tick_ms = self.tick_interval.as_millis() as u64, "timer session running");

        let initial = std::mem::take(&mut self.initial_events);
        self.emit(initial);
        let queued = self.drain_commands();
        self.emit(queued);

        loop {
            let events = tokio::select! {
                _ = interval.tick() => {
                    if self.engine.needs_tick() {
                        self.engine.tick()
                    } else {
                        Vec::new()
                    }
                }
                _ = self.bus.command_posted() => self.drain_commands(),
                action = actions.recv() => match action {
                    Some(action) => self.apply(action).into_iter().collect(),
                    None => break,
                },
            };
            self.emit(events);
        }

        info!("timer session stopped");
        self.engine
    }

    fn apply(&mut self, action: Action) -> Option<Event> {
        debug!(?action, "applying action");
        match action {
            Action::Start => self.engine.start(),
            Action::Pause => self.engine.pause(),
            Action::Reset => self.engine.reset(),
            Action::ResetRound => self.engine.reset_round(),
            Action::SwitchMode(mode) => self.engine.switch_mode(mode),
            Action::SaveSettings(settings) => self.engine.save_settings(settings),
        }
    }

    fn drain_commands(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        while let Some(command) = self.bus.take_command() {
            events.extend(self.engine.handle_command(command));
        }
        events
    }

    fn emit(&mut self, events: Vec<Event>) {
        for event in events {
            // No subscribers is fine.
            let _ = self.events.send(event);
        }
        let snapshot = self.engine.snapshot();
        self.snapshots.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });
    }
}
