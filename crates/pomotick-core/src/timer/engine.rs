//! Countdown engine.
//!
//! The engine is a deadline-based state machine. It does not use internal
//! threads - the caller is responsible for calling `tick()` periodically.
//! Remaining time is always derived from an absolute deadline, so missed,
//! late or out-of-order ticks cannot make it drift.
//!
//! ## State Transitions
//!
//! ```text
//! (Focus | ShortBreak | LongBreak) x (Paused | Active)
//!
//! Paused --start--> Active --pause--> Paused
//! Active --expiry--> Paused --(delay)--> next mode, Paused
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = CountdownEngine::new(ctx);
//! engine.start();
//! // In a loop:
//! engine.tick(); // Returns events when a countdown completes
//! ```

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::clock::Clock;
use super::settings::{Mode, Settings};
use crate::bus::EventBus;
use crate::events::{BusEvent, Command, Event};
use crate::notify::{Notice, NotificationSink, TracingSink};
use crate::storage::{LocalPersistence, MemoryPersistence, DEADLINE_KEY, MODE_KEY};
use crate::sync::SyncRequest;

/// Collaborators the engine talks to.
pub struct EngineContext {
    pub clock: Arc<dyn Clock>,
    pub persistence: Box<dyn LocalPersistence>,
    pub bus: EventBus,
    pub sink: Arc<dyn NotificationSink>,
    /// Outbound server writes. Sending never waits for the result.
    pub sync: mpsc::UnboundedSender<SyncRequest>,
    /// Pause between a countdown reaching zero and the next mode taking over.
    pub transition_delay: Duration,
}

impl EngineContext {
    /// In-memory persistence, a private bus, log-only notices and no
    /// server sync.
    pub fn detached(clock: Arc<dyn Clock>) -> Self {
        let (sync, _) = mpsc::unbounded_channel();
        Self {
            clock,
            persistence: Box::new(MemoryPersistence::new()),
            bus: EventBus::new(),
            sink: Arc::new(TracingSink),
            sync,
            transition_delay: Duration::ZERO,
        }
    }
}

/// A completion transition waiting for its delay to pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingTransition {
    from: Mode,
    to: Mode,
    due_ms: u64,
}

/// Point-in-time view of the engine for renderers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerSnapshot {
    pub mode: Mode,
    pub remaining_secs: u64,
    pub total_secs: u64,
    pub is_active: bool,
    pub deadline_ms: Option<u64>,
    pub completed_focus_sessions: u64,
    pub settings: Settings,
    /// Mode about to take over after a completion, if any.
    pub pending_mode: Option<Mode>,
}

pub struct CountdownEngine {
    settings: Settings,
    mode: Mode,
    /// Epoch ms at which the running countdown hits zero. `None` while paused.
    deadline_ms: Option<u64>,
    /// Frozen value while paused; last computed value while running.
    remaining_secs: u64,
    completed_focus_sessions: u64,
    pending: Option<PendingTransition>,
    transition_delay_ms: u64,
    clock: Arc<dyn Clock>,
    persistence: Box<dyn LocalPersistence>,
    bus: EventBus,
    sink: Arc<dyn NotificationSink>,
    sync: mpsc::UnboundedSender<SyncRequest>,
}

impl CountdownEngine {
    /// Create an engine in `Focus`, paused, with default settings.
    pub fn new(ctx: EngineContext) -> Self {
        let settings = Settings::default();
        Self {
            settings,
            mode: Mode::Focus,
            deadline_ms: None,
            remaining_secs: settings.duration_secs(Mode::Focus),
            completed_focus_sessions: 0,
            pending: None,
            transition_delay_ms: ctx.transition_delay.as_millis() as u64,
            clock: ctx.clock,
            persistence: ctx.persistence,
            bus: ctx.bus,
            sink: ctx.sink,
            sync: ctx.sync,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn settings(&self) -> Settings {
        self.settings
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn deadline_ms(&self) -> Option<u64> {
        self.deadline_ms
    }

    pub fn completed_focus_sessions(&self) -> u64 {
        self.completed_focus_sessions
    }

    /// Whole seconds left, recomputed from the deadline while running.
    pub fn remaining_secs(&self) -> u64 {
        match self.deadline_ms {
            Some(deadline) => remaining_from(deadline, self.clock.now_ms()),
            None => self.remaining_secs,
        }
    }

    /// True only while a deadline is armed and still in the future.
    pub fn is_active(&self) -> bool {
        self.deadline_ms
            .is_some_and(|deadline| deadline > self.clock.now_ms())
    }

    pub fn pending_mode(&self) -> Option<Mode> {
        self.pending.map(|p| p.to)
    }

    /// Whether `tick()` has anything to do.
    pub fn needs_tick(&self) -> bool {
        self.deadline_ms.is_some() || self.pending.is_some()
    }

    pub fn persistence(&self) -> &dyn LocalPersistence {
        self.persistence.as_ref()
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            mode: self.mode,
            remaining_secs: self.remaining_secs(),
            total_secs: self.settings.duration_secs(self.mode),
            is_active: self.is_active(),
            deadline_ms: self.deadline_ms,
            completed_focus_sessions: self.completed_focus_sessions,
            settings: self.settings,
            pending_mode: self.pending_mode(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn start(&mut self) -> Option<Event> {
        self.catch_up();
        if self.is_active() {
            return None;
        }
        Some(self.arm())
    }

    /// Freeze the countdown. Calling it again while paused does nothing.
    pub fn pause(&mut self) -> Option<Event> {
        self.catch_up();
        if self.deadline_ms.is_none() {
            return None;
        }
        self.halt();
        info!(mode = %self.mode, remaining = self.remaining_secs, "timer paused");
        Some(Event::TimerPaused {
            mode: self.mode,
            remaining_secs: self.remaining_secs,
            at: self.at(),
        })
    }

    /// Pause and reload the full duration of the current mode.
    pub fn reset(&mut self) -> Option<Event> {
        self.catch_up();
        self.halt();
        self.remaining_secs = self.settings.duration_secs(self.mode);
        Some(Event::TimerReset {
            mode: self.mode,
            remaining_secs: self.remaining_secs,
            at: self.at(),
        })
    }

    /// Zero the session counter and go back to a fresh Focus countdown.
    pub fn reset_round(&mut self) -> Option<Event> {
        self.catch_up();
        self.completed_focus_sessions = 0;
        self.halt();
        self.mode = Mode::Focus;
        self.remaining_secs = self.settings.duration_secs(Mode::Focus);
        info!("round reset");
        Some(Event::RoundReset { at: self.at() })
    }

    /// Pause and load `target`'s full duration. Never auto-starts.
    pub fn switch_mode(&mut self, target: Mode) -> Option<Event> {
        self.catch_up();
        if target == self.mode {
            return None;
        }
        Some(self.enter(target))
    }

    /// Replace settings with their clamped form and queue a server save.
    ///
    /// The local change is kept whatever the server says.
    pub fn save_settings(&mut self, settings: Settings) -> Option<Event> {
        self.catch_up();
        let settings = settings.clamped();
        self.settings = settings;
        self.halt();
        self.remaining_secs = settings.duration_secs(self.mode);
        info!(?settings, "settings changed");
        self.dispatch(SyncRequest::SaveSettings(settings));
        Some(Event::SettingsChanged {
            settings,
            at: self.at(),
        })
    }

    /// Apply a command taken off the bus. Unlike `switch_mode`, switching
    /// here starts the new countdown straight away.
    pub fn handle_command(&mut self, command: Command) -> Option<Event> {
        self.catch_up();
        let (in_target, target) = match command {
            Command::StartBreak => (self.mode.is_break(), Mode::ShortBreak),
            Command::StartFocus => (self.mode == Mode::Focus, Mode::Focus),
        };
        debug!(?command, mode = %self.mode, "handling bus command");

        if !in_target {
            self.enter(target);
        } else if self.is_active() {
            return None;
        }
        Some(self.arm())
    }

    /// Call periodically. Returns `TimerCompleted` when a countdown reaches
    /// zero and `ModeAdvanced` once the completion delay has passed; a
    /// single late tick can return both.
    pub fn tick(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        let now = self.clock.now_ms();

        if let Some(deadline) = self.deadline_ms {
            self.remaining_secs = remaining_from(deadline, now);
            if self.remaining_secs == 0 {
                events.push(self.complete(deadline));
            }
        }

        if let Some(pending) = self.pending {
            if now >= pending.due_ms {
                self.pending = None;
                events.push(self.advance(pending));
            }
        }

        events
    }

    // ── Loading ──────────────────────────────────────────────────────

    /// Adopt settings and the session count fetched from the server.
    pub fn load_remote(&mut self, settings: Settings, focus_sessions: u64) {
        self.settings = settings.clamped();
        self.completed_focus_sessions = focus_sessions;
        self.pending = None;
        self.deadline_ms = None;
        self.remaining_secs = self.settings.duration_secs(self.mode);
    }

    /// Resume a countdown left in local persistence by an earlier run.
    ///
    /// Returns `None` and stays paused when nothing usable is stored. A
    /// stale or unreadable deadline is removed.
    pub fn recover(&mut self) -> Option<Event> {
        let raw = match self.persistence.get(DEADLINE_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!("could not read stored deadline: {e}");
                return None;
            }
        };

        let Ok(stored) = raw.trim().parse::<u64>() else {
            warn!(value = %raw, "ignoring malformed stored deadline");
            self.forget_deadline();
            return None;
        };

        let now = self.clock.now_ms();
        if stored <= now {
            debug!(stored, now, "stored deadline already passed");
            self.forget_deadline();
            return None;
        }

        let mode = match self.persistence.get(MODE_KEY) {
            Ok(Some(m)) => Mode::parse(&m).unwrap_or(Mode::Focus),
            _ => Mode::Focus,
        };
        let longest = now + self.settings.duration_secs(mode) * 1000;
        let deadline = stored.min(longest);

        self.mode = mode;
        self.pending = None;
        self.deadline_ms = Some(deadline);
        self.remaining_secs = remaining_from(deadline, now);
        if deadline != stored {
            self.persist_deadline(deadline);
        }
        info!(mode = %mode, remaining = self.remaining_secs, "recovered running countdown");

        Some(Event::TimerRecovered {
            mode,
            remaining_secs: self.remaining_secs,
            deadline_ms: deadline,
            at: self.at(),
        })
    }

    pub(crate) fn notify(&self, notice: Notice) {
        self.sink.notify(notice);
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// Process an overdue expiry and settle a pending transition before
    /// acting on user input.
    fn catch_up(&mut self) {
        for event in self.tick() {
            debug!(?event, "caught up before command");
        }
        if let Some(pending) = self.pending.take() {
            let event = self.advance(pending);
            debug!(?event, "pending transition settled early");
        }
    }

    fn arm(&mut self) -> Event {
        if self.remaining_secs == 0 {
            self.remaining_secs = self.settings.duration_secs(self.mode);
        }
        let deadline = self.clock.now_ms() + self.remaining_secs * 1000;
        self.deadline_ms = Some(deadline);
        self.persist_deadline(deadline);
        info!(mode = %self.mode, remaining = self.remaining_secs, "timer started");
        Event::TimerStarted {
            mode: self.mode,
            remaining_secs: self.remaining_secs,
            deadline_ms: deadline,
            at: self.at(),
        }
    }

    /// Disarm the deadline, freezing remaining at its current value.
    fn halt(&mut self) {
        if let Some(deadline) = self.deadline_ms.take() {
            self.remaining_secs = remaining_from(deadline, self.clock.now_ms());
            self.forget_deadline();
        }
    }

    fn enter(&mut self, target: Mode) -> Event {
        let from = self.mode;
        self.halt();
        self.mode = target;
        self.remaining_secs = self.settings.duration_secs(target);
        info!(%from, to = %target, "mode switched");
        Event::ModeSwitched {
            from,
            to: target,
            remaining_secs: self.remaining_secs,
            at: self.at(),
        }
    }

    fn complete(&mut self, deadline: u64) -> Event {
        self.deadline_ms = None;
        self.remaining_secs = 0;
        self.forget_deadline();

        let finished = self.mode;
        let next = if finished == Mode::Focus {
            self.completed_focus_sessions += 1;
            let next = self.settings.break_after(self.completed_focus_sessions);
            self.notify(Notice::success(format!(
                "Focus session complete! Time for a {}.",
                next.label().to_lowercase()
            )));
            self.bus.publish(BusEvent::FocusSessionFinished);
            self.dispatch(SyncRequest::IncrementSession);
            next
        } else {
            self.notify(Notice::info("Break is over. Ready to focus?"));
            Mode::Focus
        };

        info!(
            mode = %finished,
            next = %next,
            completed = self.completed_focus_sessions,
            "countdown completed"
        );
        self.pending = Some(PendingTransition {
            from: finished,
            to: next,
            due_ms: deadline + self.transition_delay_ms,
        });

        Event::TimerCompleted {
            mode: finished,
            next_mode: next,
            completed_focus_sessions: self.completed_focus_sessions,
            at: self.at(),
        }
    }

    fn advance(&mut self, pending: PendingTransition) -> Event {
        self.mode = pending.to;
        self.remaining_secs = self.settings.duration_secs(pending.to);
        Event::ModeAdvanced {
            from: pending.from,
            to: pending.to,
            remaining_secs: self.remaining_secs,
            at: self.at(),
        }
    }

    fn dispatch(&self, request: SyncRequest) {
        if self.sync.send(request).is_err() {
            debug!(?request, "no sync worker attached; request dropped");
        }
    }

    fn persist_deadline(&mut self, deadline: u64) {
        let result = self
            .persistence
            .set(DEADLINE_KEY, &deadline.to_string())
            .and_then(|_| self.persistence.set(MODE_KEY, self.mode.as_str()));
        if let Err(e) = result {
            warn!("could not persist deadline: {e}");
        }
    }

    fn forget_deadline(&mut self) {
        let result = self
            .persistence
            .remove(DEADLINE_KEY)
            .and_then(|_| self.persistence.remove(MODE_KEY));
        if let Err(e) = result {
            warn!("could not clear stored deadline: {e}");
        }
    }

    fn at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.clock.now_ms() as i64).unwrap_or_default()
    }
}

fn remaining_from(deadline_ms: u64, now_ms: u64) -> u64 {
    deadline_ms.saturating_sub(now_ms) / 1000
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::{MemorySink, NoticeLevel};
    use crate::timer::ManualClock;
    use proptest::prelude::*;

    const T0: u64 = 1_700_000_000_000;

    struct Rig {
        engine: CountdownEngine,
        clock: Arc<ManualClock>,
        sink: Arc<MemorySink>,
        sync_rx: mpsc::UnboundedReceiver<SyncRequest>,
    }

    fn rig_with(persistence: MemoryPersistence, delay_ms: u64) -> Rig {
        let clock = Arc::new(ManualClock::new(T0));
        let sink = Arc::new(MemorySink::new());
        let (sync, sync_rx) = mpsc::unbounded_channel();
        let engine = CountdownEngine::new(EngineContext {
            clock: clock.clone(),
            persistence: Box::new(persistence),
            bus: EventBus::new(),
            sink: sink.clone(),
            sync,
            transition_delay: Duration::from_millis(delay_ms),
        });
        Rig {
            engine,
            clock,
            sink,
            sync_rx,
        }
    }

    fn rig() -> Rig {
        rig_with(MemoryPersistence::new(), 0)
    }

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[test]
    fn initial_state_is_focus_paused() {
        let r = rig();
        assert_eq!(r.engine.mode(), Mode::Focus);
        assert!(!r.engine.is_active());
        assert_eq!(r.engine.deadline_ms(), None);
        assert_eq!(r.engine.remaining_secs(), 1500);
        assert_eq!(r.engine.completed_focus_sessions(), 0);
    }

    #[test]
    fn start_arms_deadline_and_persists_it() {
        let mut r = rig();
        let ev = r.engine.start().unwrap();
        assert!(matches!(ev, Event::TimerStarted { deadline_ms, .. } if deadline_ms == T0 + 1_500_000));
        assert!(r.engine.is_active());
        assert_eq!(
            r.engine.persistence().get(DEADLINE_KEY).unwrap().as_deref(),
            Some("1700001500000")
        );
        assert_eq!(
            r.engine.persistence().get(MODE_KEY).unwrap().as_deref(),
            Some("focus")
        );
        // Already active.
        assert!(r.engine.start().is_none());
    }

    #[test]
    fn remaining_follows_wall_clock_without_ticks() {
        let mut r = rig();
        r.engine.start();
        r.clock.advance(secs(600));
        assert_eq!(r.engine.remaining_secs(), 900);
        r.clock.advance(Duration::from_millis(500));
        assert_eq!(r.engine.remaining_secs(), 899);
    }

    #[test]
    fn pause_freezes_and_clears_persisted_deadline() {
        let mut r = rig();
        r.engine.start();
        r.clock.advance(secs(100));
        let ev = r.engine.pause().unwrap();
        assert!(matches!(ev, Event::TimerPaused { remaining_secs: 1400, .. }));
        r.clock.advance(secs(100));
        assert_eq!(r.engine.remaining_secs(), 1400);
        assert!(!r.engine.is_active());
        assert!(r.engine.persistence().get(DEADLINE_KEY).unwrap().is_none());
    }

    #[test]
    fn pause_is_idempotent() {
        let mut r = rig();
        r.engine.start();
        r.clock.advance(secs(10));
        r.engine.pause();
        let once = r.engine.snapshot();
        assert!(r.engine.pause().is_none());
        assert_eq!(r.engine.snapshot(), once);
    }

    #[test]
    fn resume_after_pause_continues_from_frozen_value() {
        let mut r = rig();
        r.engine.start();
        r.clock.advance(secs(100));
        r.engine.pause();
        r.clock.advance(secs(3600));
        r.engine.start();
        assert_eq!(r.engine.remaining_secs(), 1400);
    }

    #[test]
    fn reset_reloads_duration_and_keeps_mode_and_count() {
        let mut r = rig();
        r.engine.switch_mode(Mode::LongBreak);
        r.engine.start();
        r.clock.advance(secs(30));
        r.engine.reset();
        assert_eq!(r.engine.mode(), Mode::LongBreak);
        assert_eq!(r.engine.remaining_secs(), 900);
        assert!(!r.engine.is_active());
    }

    #[test]
    fn switch_mode_while_active_pauses_and_loads_target() {
        let mut r = rig();
        r.engine.start();
        r.clock.advance(secs(600));
        assert_eq!(r.engine.remaining_secs(), 900);

        let ev = r.engine.switch_mode(Mode::ShortBreak).unwrap();
        assert!(matches!(
            ev,
            Event::ModeSwitched { from: Mode::Focus, to: Mode::ShortBreak, remaining_secs: 300, .. }
        ));
        assert_eq!(r.engine.mode(), Mode::ShortBreak);
        assert_eq!(r.engine.remaining_secs(), 300);
        assert!(!r.engine.is_active());
        assert!(r.engine.deadline_ms().is_none());
    }

    #[test]
    fn switch_to_same_mode_is_noop() {
        let mut r = rig();
        r.engine.start();
        assert!(r.engine.switch_mode(Mode::Focus).is_none());
        assert!(r.engine.is_active());
    }

    #[test]
    fn focus_expiry_goes_to_short_break_and_counts() {
        let mut r = rig();
        r.engine.start();
        r.clock.advance(secs(1500));
        let events = r.engine.tick();

        assert!(matches!(
            events[0],
            Event::TimerCompleted { mode: Mode::Focus, next_mode: Mode::ShortBreak, completed_focus_sessions: 1, .. }
        ));
        assert!(matches!(events[1], Event::ModeAdvanced { to: Mode::ShortBreak, remaining_secs: 300, .. }));
        assert_eq!(r.engine.mode(), Mode::ShortBreak);
        assert_eq!(r.engine.remaining_secs(), 300);
        assert_eq!(r.engine.completed_focus_sessions(), 1);
        assert!(!r.engine.is_active());
        assert!(r.engine.persistence().get(DEADLINE_KEY).unwrap().is_none());
        assert_eq!(r.sync_rx.try_recv().unwrap(), SyncRequest::IncrementSession);
        assert_eq!(r.sink.count(NoticeLevel::Success), 1);
    }

    #[test]
    fn one_second_focus_expires_into_break_exactly_once() {
        let mut r = rig();
        r.engine.start();
        r.clock.advance(secs(1499));
        r.engine.pause();
        assert_eq!(r.engine.remaining_secs(), 1);

        r.engine.start();
        assert_eq!(r.engine.deadline_ms(), Some(T0 + 1_500_000));
        r.clock.advance(Duration::from_millis(1001));
        r.engine.tick();
        r.engine.tick();

        assert_eq!(r.engine.mode(), Mode::ShortBreak);
        assert_eq!(r.engine.completed_focus_sessions(), 1);
        assert_eq!(r.engine.remaining_secs(), 300);
        assert!(!r.engine.is_active());
        assert_eq!(r.sync_rx.try_recv().unwrap(), SyncRequest::IncrementSession);
        assert!(r.sync_rx.try_recv().is_err());
    }

    #[test]
    fn focus_expiry_announces_on_bus() {
        let mut r = rig();
        let mut rx = r.engine.bus().subscribe();
        r.engine.start();
        r.clock.advance(secs(1500));
        r.engine.tick();
        assert_eq!(rx.try_recv().unwrap(), BusEvent::FocusSessionFinished);
    }

    #[test]
    fn break_expiry_returns_to_focus_without_counting() {
        let mut r = rig();
        r.engine.switch_mode(Mode::ShortBreak);
        r.engine.start();
        r.clock.advance(secs(300));
        r.engine.tick();
        assert_eq!(r.engine.mode(), Mode::Focus);
        assert_eq!(r.engine.remaining_secs(), 1500);
        assert_eq!(r.engine.completed_focus_sessions(), 0);
        assert!(r.sync_rx.try_recv().is_err());
    }

    #[test]
    fn transition_waits_for_delay() {
        let mut r = rig_with(MemoryPersistence::new(), 1000);
        r.engine.start();
        r.clock.advance(secs(1500));
        let events = r.engine.tick();
        assert_eq!(events.len(), 1);
        assert_eq!(r.engine.mode(), Mode::Focus);
        assert_eq!(r.engine.remaining_secs(), 0);
        assert_eq!(r.engine.pending_mode(), Some(Mode::ShortBreak));

        r.clock.advance(Duration::from_millis(999));
        assert!(r.engine.tick().is_empty());

        r.clock.advance(Duration::from_millis(1));
        let events = r.engine.tick();
        assert!(matches!(events[0], Event::ModeAdvanced { to: Mode::ShortBreak, .. }));
        assert_eq!(r.engine.pending_mode(), None);
    }

    #[test]
    fn user_action_settles_pending_transition() {
        let mut r = rig_with(MemoryPersistence::new(), 5000);
        r.engine.start();
        r.clock.advance(secs(1500));
        r.engine.tick();
        assert_eq!(r.engine.mode(), Mode::Focus);

        r.engine.start();
        assert_eq!(r.engine.mode(), Mode::ShortBreak);
        assert!(r.engine.is_active());
        assert_eq!(r.engine.remaining_secs(), 300);
        assert_eq!(r.engine.completed_focus_sessions(), 1);
    }

    #[test]
    fn overdue_expiry_is_processed_before_commands() {
        let mut r = rig();
        r.engine.start();
        r.clock.advance(secs(2000));
        // No tick happened; start must see the finished focus session first.
        r.engine.start();
        assert_eq!(r.engine.completed_focus_sessions(), 1);
        assert_eq!(r.engine.mode(), Mode::ShortBreak);
        assert!(r.engine.is_active());
    }

    #[test]
    fn long_break_cadence_with_four() {
        let mut r = rig();
        let mut breaks = Vec::new();
        for _ in 0..12 {
            r.engine.switch_mode(Mode::Focus);
            r.engine.start();
            r.clock.advance(secs(1500));
            r.engine.tick();
            breaks.push(r.engine.mode());
        }
        for (i, mode) in breaks.iter().enumerate() {
            let n = i + 1;
            let expected = if n % 4 == 0 { Mode::LongBreak } else { Mode::ShortBreak };
            assert_eq!(*mode, expected, "after focus session {n}");
        }
        assert_eq!(r.engine.completed_focus_sessions(), 12);
    }

    #[test]
    fn reset_round_clears_count_and_forces_focus() {
        let mut r = rig();
        r.engine.start();
        r.clock.advance(secs(1500));
        r.engine.tick();
        assert_eq!(r.engine.mode(), Mode::ShortBreak);
        r.engine.start();

        r.engine.reset_round();
        assert_eq!(r.engine.completed_focus_sessions(), 0);
        assert_eq!(r.engine.mode(), Mode::Focus);
        assert_eq!(r.engine.remaining_secs(), 1500);
        assert!(!r.engine.is_active());
    }

    #[test]
    fn save_settings_clamps_pauses_and_queues_save() {
        let mut r = rig();
        r.engine.start();
        let requested = Settings {
            focus_time: 5,
            short_break_time: 120,
            long_break_time: 10_000,
            long_break_after: 0,
        };
        r.engine.save_settings(requested);

        let expected = requested.clamped();
        assert_eq!(r.engine.settings(), expected);
        assert_eq!(r.engine.remaining_secs(), 60);
        assert!(!r.engine.is_active());
        assert_eq!(
            r.sync_rx.try_recv().unwrap(),
            SyncRequest::SaveSettings(expected)
        );
    }

    #[test]
    fn start_break_command_switches_and_starts() {
        let mut r = rig();
        let ev = r.engine.handle_command(Command::StartBreak).unwrap();
        assert!(matches!(ev, Event::TimerStarted { mode: Mode::ShortBreak, .. }));
        assert_eq!(r.engine.mode(), Mode::ShortBreak);
        assert!(r.engine.is_active());
        assert_eq!(r.engine.deadline_ms(), Some(T0 + 300_000));
    }

    #[test]
    fn start_break_on_paused_break_just_starts() {
        let mut r = rig();
        r.engine.switch_mode(Mode::LongBreak);
        r.engine.handle_command(Command::StartBreak);
        assert_eq!(r.engine.mode(), Mode::LongBreak);
        assert!(r.engine.is_active());
        // Running break: nothing to do.
        assert!(r.engine.handle_command(Command::StartBreak).is_none());
    }

    #[test]
    fn start_focus_command_is_symmetric() {
        let mut r = rig();
        r.engine.switch_mode(Mode::ShortBreak);
        r.engine.start();
        r.engine.handle_command(Command::StartFocus);
        assert_eq!(r.engine.mode(), Mode::Focus);
        assert!(r.engine.is_active());
        assert_eq!(r.engine.remaining_secs(), 1500);
        assert!(r.engine.handle_command(Command::StartFocus).is_none());
    }

    #[test]
    fn recover_resumes_future_deadline() {
        let stored = MemoryPersistence::new()
            .with_entry(DEADLINE_KEY, &(T0 + 30_000).to_string())
            .with_entry(MODE_KEY, "shortBreak");
        let mut r = rig_with(stored, 0);
        let ev = r.engine.recover().unwrap();
        assert!(matches!(ev, Event::TimerRecovered { mode: Mode::ShortBreak, remaining_secs: 30, .. }));
        assert!(r.engine.is_active());
        assert_eq!(r.engine.mode(), Mode::ShortBreak);
    }

    #[test]
    fn recover_drops_past_or_garbage_deadlines() {
        let past = MemoryPersistence::new().with_entry(DEADLINE_KEY, &(T0 - 1).to_string());
        let mut r = rig_with(past, 0);
        assert!(r.engine.recover().is_none());
        assert!(r.engine.persistence().get(DEADLINE_KEY).unwrap().is_none());

        let garbage = MemoryPersistence::new().with_entry(DEADLINE_KEY, "soon");
        let mut r = rig_with(garbage, 0);
        assert!(r.engine.recover().is_none());
        assert!(!r.engine.is_active());
        assert!(r.engine.persistence().get(DEADLINE_KEY).unwrap().is_none());
    }

    #[test]
    fn recover_caps_remaining_at_mode_duration() {
        let far = MemoryPersistence::new().with_entry(DEADLINE_KEY, &(T0 + 10_000_000).to_string());
        let mut r = rig_with(far, 0);
        r.engine.recover();
        assert_eq!(r.engine.remaining_secs(), 1500);
        assert_eq!(
            r.engine.persistence().get(DEADLINE_KEY).unwrap(),
            Some((T0 + 1_500_000).to_string())
        );
    }

    #[test]
    fn load_remote_clamps_and_adopts_count() {
        let mut r = rig();
        r.engine.load_remote(
            Settings {
                focus_time: 1,
                short_break_time: 300,
                long_break_time: 900,
                long_break_after: 99,
            },
            7,
        );
        assert_eq!(r.engine.settings().focus_time, 60);
        assert_eq!(r.engine.settings().long_break_after, 10);
        assert_eq!(r.engine.completed_focus_sessions(), 7);
        assert_eq!(r.engine.remaining_secs(), 60);
    }

    proptest! {
        #[test]
        fn ticks_never_increase_remaining(steps in proptest::collection::vec(0u64..5_000, 1..60)) {
            let mut r = rig();
            r.engine.start();
            let mut last = r.engine.remaining_secs();
            for step in steps {
                r.clock.advance(Duration::from_millis(step));
                r.engine.tick();
                if r.engine.mode() != Mode::Focus {
                    break;
                }
                let now = r.engine.remaining_secs();
                prop_assert!(now <= last);
                last = now;
            }
        }

        #[test]
        fn remaining_bounded_and_active_matches_deadline(
            ops in proptest::collection::vec((0u8..8, 0u64..400_000), 1..40)
        ) {
            let mut r = rig();
            for (op, advance_ms) in ops {
                match op {
                    0 => { r.engine.start(); }
                    1 => { r.engine.pause(); }
                    2 => { r.engine.reset(); }
                    3 => { r.engine.switch_mode(Mode::ShortBreak); }
                    4 => { r.engine.switch_mode(Mode::LongBreak); }
                    5 => { r.engine.handle_command(Command::StartFocus); }
                    6 => { r.engine.handle_command(Command::StartBreak); }
                    _ => { r.engine.reset_round(); }
                }
                r.clock.advance(Duration::from_millis(advance_ms));
                r.engine.tick();

                let snap = r.engine.snapshot();
                prop_assert!(snap.remaining_secs <= r.engine.settings().duration_secs(snap.mode));
                let deadline_future = snap
                    .deadline_ms
                    .is_some_and(|d| d > r.clock.now_ms());
                prop_assert_eq!(snap.is_active, deadline_future);
            }
        }
    }
}
