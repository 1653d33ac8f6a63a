use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use pomotick_core::Config;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "pomotick", version, about = "Pomotick CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a timer session in this terminal, reading commands from stdin
    Run,
    /// Print current timer state as JSON
    Status,
    /// Timer durations stored on the server
    Settings {
        #[command(subcommand)]
        action: commands::settings::SettingsAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Generate shell completions
    Completions {
        /// Target shell
        shell: Shell,
    },
}

/// Log to stderr so stdout stays parseable. `RUST_LOG` wins over the
/// configured level.
fn init_tracing() {
    let level = Config::load_or_default().logging.level;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("pomotick_core={level},pomotick={level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if !matches!(cli.command, Commands::Completions { .. } | Commands::Config { .. }) {
        init_tracing();
    }

    let result = match cli.command {
        Commands::Run => commands::run::run().await,
        Commands::Status => commands::status::run().await,
        Commands::Settings { action } => commands::settings::run(action).await,
        Commands::Config { action } => commands::config::run(action),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "pomotick", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
