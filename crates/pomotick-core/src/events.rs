use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::{Mode, Settings};

/// Every state change of the countdown engine produces an Event.
/// The driver forwards them to whatever renders the timer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    TimerStarted {
        mode: Mode,
        remaining_secs: u64,
        deadline_ms: u64,
        at: DateTime<Utc>,
    },
    TimerPaused {
        mode: Mode,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerReset {
        mode: Mode,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    /// Session counter cleared and the timer forced back to Focus.
    RoundReset {
        at: DateTime<Utc>,
    },
    ModeSwitched {
        from: Mode,
        to: Mode,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    SettingsChanged {
        settings: Settings,
        at: DateTime<Utc>,
    },
    /// A countdown reached zero. `next_mode` takes over once the
    /// transition delay has passed.
    TimerCompleted {
        mode: Mode,
        next_mode: Mode,
        completed_focus_sessions: u64,
        at: DateTime<Utc>,
    },
    /// The delayed completion transition was applied.
    ModeAdvanced {
        from: Mode,
        to: Mode,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    /// A still-running countdown was picked up from local persistence.
    TimerRecovered {
        mode: Mode,
        remaining_secs: u64,
        deadline_ms: u64,
        at: DateTime<Utc>,
    },
}

/// Commands other features post to the timer through the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    StartBreak,
    StartFocus,
}

/// Events the timer announces to other features through the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BusEvent {
    FocusSessionFinished,
}
