//! Cross-feature command/event channel.
//!
//! Other parts of the application post [`Command`]s for the timer; each one
//! is consumed exactly once by [`EventBus::take_command`]. The timer in
//! turn announces [`BusEvent`]s to any number of subscribers.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{broadcast, Notify};
use tracing::debug;

use crate::events::{BusEvent, Command};

const EVENT_CAPACITY: usize = 64;

#[derive(Debug)]
struct BusInner {
    commands: Mutex<VecDeque<Command>>,
    command_posted: Notify,
    events: broadcast::Sender<BusEvent>,
}

/// Cheaply cloneable handle; all clones share the same queue.
#[derive(Debug, Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl EventBus {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(BusInner {
                commands: Mutex::new(VecDeque::new()),
                command_posted: Notify::new(),
                events,
            }),
        }
    }

    /// Queue a command for the timer.
    pub fn post(&self, command: Command) {
        debug!(?command, "command posted");
        self.queue().push_back(command);
        self.inner.command_posted.notify_one();
    }

    /// Remove and return the oldest pending command.
    pub fn take_command(&self) -> Option<Command> {
        self.queue().pop_front()
    }

    pub fn pending_commands(&self) -> usize {
        self.queue().len()
    }

    /// Resolves once a command has been posted since the last wake-up.
    /// A post that happens before this is awaited is not lost.
    pub async fn command_posted(&self) {
        self.inner.command_posted.notified().await;
    }

    /// Announce an event. Returns how many subscribers received it;
    /// having none is not an error.
    pub fn publish(&self, event: BusEvent) -> usize {
        let delivered = self.inner.events.send(event).unwrap_or(0);
        debug!(?event, delivered, "bus event published");
        delivered
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BusEvent> {
        self.inner.events.subscribe()
    }

    fn queue(&self) -> MutexGuard<'_, VecDeque<Command>> {
        self.inner
            .commands
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
