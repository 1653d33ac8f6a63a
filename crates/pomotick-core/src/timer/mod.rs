mod clock;
mod engine;
mod settings;

pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{CountdownEngine, EngineContext, TimerSnapshot};
pub use settings::{
    Mode, Settings, FOCUS_TIME_RANGE, LONG_BREAK_AFTER_RANGE, LONG_BREAK_RANGE, SHORT_BREAK_RANGE,
};
