//! # Pomotick Core Library
//!
//! This library provides the countdown engine behind the Pomotick Pomodoro
//! timer. It cycles between focus, short-break and long-break periods, keeps
//! the countdown honest against the wall clock, and survives restarts. The
//! `pomotick` CLI is a thin layer over the same library.
//!
//! ## Architecture
//!
//! - **Timer Engine**: A deadline-based state machine. Remaining time is always
//!   derived from `deadline - now`, so suspended or throttled ticks never drift
//! - **Storage**: Local deadline persistence (memory or SQLite) and TOML-based
//!   configuration
//! - **Remote**: HTTP settings store holding the user's durations and completed
//!   session count
//! - **Session**: Async driver that ticks the engine and routes user actions,
//!   bus commands and server writes
//!
//! ## Key Components
//!
//! - [`CountdownEngine`]: Core timer state machine
//! - [`TimerSession`]: Async loop owning one engine
//! - [`EventBus`]: Commands in, focus completions out
//! - [`Config`]: Application configuration management
//! - [`SettingsStore`]: Trait for the server-side settings store

pub mod bus;
pub mod error;
pub mod events;
pub mod notify;
pub mod remote;
pub mod session;
pub mod storage;
pub mod sync;
pub mod timer;

pub use bus::EventBus;
pub use error::{ConfigError, CoreError, PersistenceError, StoreError};
pub use events::{BusEvent, Command, Event};
pub use notify::{MemorySink, Notice, NoticeLevel, NotificationSink, TracingSink};
pub use remote::{HttpSettingsStore, RemoteState, SettingsStore};
pub use session::{Action, TimerHandle, TimerSession};
pub use storage::{Config, Database, LocalPersistence, MemoryPersistence};
pub use sync::{SyncRequest, SyncWorker};
pub use timer::{Clock, CountdownEngine, ManualClock, Mode, Settings, SystemClock, TimerSnapshot};
