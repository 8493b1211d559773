use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "studyflow", version, about = "StudyFlow study planner CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect or edit the raw state document
    State {
        #[command(subcommand)]
        action: commands::state::StateAction,
    },
    /// Weekly timetable slots
    Slot {
        #[command(subcommand)]
        action: commands::slot::SlotAction,
    },
    /// Daily stress/sleep journal
    Log {
        #[command(subcommand)]
        action: commands::log::LogAction,
    },
    /// Weekly load, rest ratio and recent averages
    Stats(commands::stats::StatsArgs),
    /// Wellbeing safe mode
    SafeMode {
        #[command(subcommand)]
        action: commands::safe_mode::SafeModeAction,
    },
    /// Check whether notifications are currently silenced
    QuietHours(commands::quiet_hours::QuietHoursArgs),
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

/// Log to stderr; `STUDYFLOW_LOG` takes the usual filter syntax.
fn init_logging() {
    let filter = EnvFilter::try_from_env("STUDYFLOW_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_logging();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::State { action } => commands::state::run(action),
        Commands::Slot { action } => commands::slot::run(action),
        Commands::Log { action } => commands::log::run(action),
        Commands::Stats(args) => commands::stats::run(args),
        Commands::SafeMode { action } => commands::safe_mode::run(action),
        Commands::QuietHours(args) => commands::quiet_hours::run(args),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
