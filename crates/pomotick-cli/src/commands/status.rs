use pomotick_core::Config;

use super::{open_session, print_json, Access, CliResult};

/// Load settings, look for a running countdown and print the result.
///
/// Read-only: a stale stored deadline is ignored and an over-long one is
/// capped in the output, but the database keeps both for `run` to settle.
pub async fn run() -> CliResult {
    let config = Config::load()?;
    let session = open_session(&config, Access::ReadOnly).await?;
    print_json(&session.snapshot())
}
