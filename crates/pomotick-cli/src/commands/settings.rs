use clap::Subcommand;
use pomotick_core::{Config, Settings, SettingsStore};

use super::{print_json, require_store, CliResult};

#[derive(Subcommand)]
pub enum SettingsAction {
    /// Show the server-side settings and completed focus sessions
    Show,
    /// Update durations on the server. Values are clamped to their allowed ranges.
    Set {
        /// Focus duration in seconds
        #[arg(long)]
        focus: Option<u32>,
        /// Short break duration in seconds
        #[arg(long)]
        short: Option<u32>,
        /// Long break duration in seconds
        #[arg(long)]
        long: Option<u32>,
        /// Focus sessions before a long break
        #[arg(long)]
        after: Option<u32>,
    },
}

/// Overlay the given fields on `base` and clamp the result.
fn merge(
    base: Settings,
    focus: Option<u32>,
    short: Option<u32>,
    long: Option<u32>,
    after: Option<u32>,
) -> Settings {
    Settings {
        focus_time: focus.unwrap_or(base.focus_time),
        short_break_time: short.unwrap_or(base.short_break_time),
        long_break_time: long.unwrap_or(base.long_break_time),
        long_break_after: after.unwrap_or(base.long_break_after),
    }
    .clamped()
}

pub async fn run(action: SettingsAction) -> CliResult {
    let config = Config::load()?;
    let store = require_store(&config)?;

    match action {
        SettingsAction::Show => {
            let state = store.fetch().await?;
            print_json(&state)?;
        }
        SettingsAction::Set {
            focus,
            short,
            long,
            after,
        } => {
            let current = store.fetch().await?;
            let settings = merge(current.settings.clamped(), focus, short, long, after);
            store.save(settings).await?;
            print_json(&settings)?;
        }
    }
    Ok(())
}
