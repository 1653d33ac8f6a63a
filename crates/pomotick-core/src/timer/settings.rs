use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

pub const FOCUS_TIME_RANGE: RangeInclusive<u32> = 60..=7200;
pub const SHORT_BREAK_RANGE: RangeInclusive<u32> = 60..=1800;
pub const LONG_BREAK_RANGE: RangeInclusive<u32> = 300..=3600;
pub const LONG_BREAK_AFTER_RANGE: RangeInclusive<u32> = 1..=10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Mode {
    Focus,
    ShortBreak,
    LongBreak,
}

impl Mode {
    pub fn is_break(self) -> bool {
        matches!(self, Mode::ShortBreak | Mode::LongBreak)
    }

    /// Wire name, as stored under the local `pomodoroMode` key.
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Focus => "focus",
            Mode::ShortBreak => "shortBreak",
            Mode::LongBreak => "longBreak",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "focus" => Some(Mode::Focus),
            "shortBreak" => Some(Mode::ShortBreak),
            "longBreak" => Some(Mode::LongBreak),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Mode::Focus => "Focus",
            Mode::ShortBreak => "Short Break",
            Mode::LongBreak => "Long Break",
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Timer durations, all in seconds.
///
/// Serialized with the server's field names (`focusTime`, `shortBreakTime`,
/// `longBreakTime`, `longBreakAfter`). Values coming from outside are not
/// trusted: the engine only ever stores the result of [`Settings::clamped`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub focus_time: u32,
    pub short_break_time: u32,
    pub long_break_time: u32,
    /// Focus sessions before a long break is inserted.
    pub long_break_after: u32,
}

impl Settings {
    pub const DEFAULT_FOCUS_TIME: u32 = 1500;
    pub const DEFAULT_SHORT_BREAK_TIME: u32 = 300;
    pub const DEFAULT_LONG_BREAK_TIME: u32 = 900;
    pub const DEFAULT_LONG_BREAK_AFTER: u32 = 4;

    /// Constrain every field to its documented range.
    pub fn clamped(self) -> Self {
        Self {
            focus_time: clamp_to(self.focus_time, &FOCUS_TIME_RANGE),
            short_break_time: clamp_to(self.short_break_time, &SHORT_BREAK_RANGE),
            long_break_time: clamp_to(self.long_break_time, &LONG_BREAK_RANGE),
            long_break_after: clamp_to(self.long_break_after, &LONG_BREAK_AFTER_RANGE),
        }
    }

    pub fn is_clamped(&self) -> bool {
        *self == self.clamped()
    }

    /// Full countdown length of `mode`, in seconds.
    pub fn duration_secs(&self, mode: Mode) -> u64 {
        let secs = match mode {
            Mode::Focus => self.focus_time,
            Mode::ShortBreak => self.short_break_time,
            Mode::LongBreak => self.long_break_time,
        };
        u64::from(secs)
    }

    /// Which break follows the `completed`-th focus session.
    ///
    /// `completed` is the post-increment count, so the Nth, 2Nth, ...
    /// sessions are followed by a long break.
    pub fn break_after(&self, completed: u64) -> Mode {
        let every = u64::from(self.long_break_after.max(1));
        if completed % every == 0 {
            Mode::LongBreak
        } else {
            Mode::ShortBreak
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            focus_time: Self::DEFAULT_FOCUS_TIME,
            short_break_time: Self::DEFAULT_SHORT_BREAK_TIME,
            long_break_time: Self::DEFAULT_LONG_BREAK_TIME,
            long_break_after: Self::DEFAULT_LONG_BREAK_AFTER,
        }
    }
}

fn clamp_to(value: u32, range: &RangeInclusive<u32>) -> u32 {
    value.clamp(*range.start(), *range.end())
}
