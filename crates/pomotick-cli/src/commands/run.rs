//! Interactive session: one command per stdin line, events as JSON on stdout,
//! a live clock on stderr.

use std::io::Write;

use pomotick_core::{Action, Command, Config, CoreError, Mode, TimerSnapshot};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use super::{open_session, print_json, Access, CliResult};

const HELP: &str = "commands: start pause reset round focus short long break work status quit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Input {
    Action(Action),
    Bus(Command),
    Status,
    Help,
    Quit,
}

fn parse_input(line: &str) -> Option<Input> {
    let input = match line.trim().to_ascii_lowercase().as_str() {
        "start" | "s" => Input::Action(Action::Start),
        "pause" | "p" => Input::Action(Action::Pause),
        "reset" | "r" => Input::Action(Action::Reset),
        "round" => Input::Action(Action::ResetRound),
        "focus" => Input::Action(Action::SwitchMode(Mode::Focus)),
        "short" => Input::Action(Action::SwitchMode(Mode::ShortBreak)),
        "long" => Input::Action(Action::SwitchMode(Mode::LongBreak)),
        "break" => Input::Bus(Command::StartBreak),
        "work" => Input::Bus(Command::StartFocus),
        "status" => Input::Status,
        "help" | "?" => Input::Help,
        "quit" | "q" | "exit" => Input::Quit,
        _ => return None,
    };
    Some(input)
}

/// `Focus 24:59 running`
fn render_clock(snapshot: &TimerSnapshot) -> String {
    let state = if snapshot.is_active { "running" } else { "paused" };
    format!(
        "{} {:02}:{:02} {state}",
        snapshot.mode,
        snapshot.remaining_secs / 60,
        snapshot.remaining_secs % 60
    )
}

fn draw(snapshot: &TimerSnapshot) {
    let mut stderr = std::io::stderr().lock();
    let _ = write!(stderr, "\r\x1b[2K{}", render_clock(snapshot));
    let _ = stderr.flush();
}

pub async fn run() -> CliResult {
    let config = Config::load()?;
    let session = open_session(&config, Access::ReadWrite).await?;
    let (handle, task) = session.spawn();

    let mut events = handle.events();
    let mut snapshots = handle.watch();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    eprintln!("{HELP}");
    draw(&handle.snapshot());

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match parse_input(&line) {
                    Some(Input::Action(action)) => handle.send(action).await?,
                    Some(Input::Bus(command)) => handle.bus().post(command),
                    Some(Input::Status) => print_json(&handle.snapshot())?,
                    Some(Input::Help) => eprintln!("{HELP}"),
                    Some(Input::Quit) => break,
                    None if line.trim().is_empty() => {}
                    None => eprintln!("unknown command: {}", line.trim()),
                }
            }
            event = events.recv() => match event {
                Ok(event) => {
                    eprintln!();
                    print_json(&event)?;
                }
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "event output fell behind"),
                Err(RecvError::Closed) => break,
            },
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                draw(&snapshot);
            }
        }
    }

    eprintln!();
    drop(handle);
    let engine = task.await.map_err(|_| CoreError::SessionClosed)?;
    info!(
        mode = %engine.mode(),
        completed = engine.completed_focus_sessions(),
        "session closed"
    );
    Ok(())
}
