mod cli;
mod daemon;

use clap::{Parser, Subcommand};
use proactive_daemon::config::StartRequest;

#[derive(Parser)]
#[command(
    name = "proactive-daemon",
    version,
    about = "Proactive Daemon: background proactive-engagement scheduler"
)]
struct App {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the daemon process
    Daemon {
        #[command(subcommand)]
        action: DaemonAction,
    },
    /// Start (or re-arm) the proactive service, merging any given settings
    Start {
        #[arg(long)]
        api_key: Option<String>,
        #[arg(long)]
        api_url: Option<String>,
        #[arg(long)]
        model: Option<String>,
        /// Fixed interval between ticks (0 or negative = 15s floor)
        #[arg(long, allow_negative_numbers = true)]
        interval_ms: Option<i64>,
        /// Pick each delay from {10m, 30m, 1h, 2h, 5h} instead of the fixed interval
        #[arg(long)]
        random: Option<bool>,
        /// Program used to surface messages (invoked as `<cmd> -u <urgency> <title> <body>`)
        #[arg(long)]
        notify_command: Option<String>,
    },
    /// Stop the proactive service (the daemon stays up)
    Stop,
    /// Enable or disable proactive messages
    Proactive {
        /// on | off
        state: String,
    },
    /// Print whether the service is running
    IsRunning,
    /// List generated messages waiting for the host
    Pending {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// View configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Display the persisted configuration (api key masked)
    Show,
}

#[derive(Subcommand)]
enum DaemonAction {
    /// Start the daemon (background)
    Start,
    /// Stop the daemon
    Stop,
    /// Show daemon status
    Status,
    /// Run daemon in foreground (used internally by 'start')
    RunForeground {
        /// Resume the service from persisted config (set on relaunch)
        #[arg(long)]
        resume: bool,
    },
}

fn main() {
    let app = App::parse();

    if let Commands::Daemon {
        action: DaemonAction::RunForeground { resume },
    } = app.command
    {
        daemon::run(resume);
        return;
    }

    proactive_daemon::tracing_init::init_cli_tracing();

    let result = match app.command {
        Commands::Daemon { action } => match action {
            DaemonAction::Start => cli::daemon::start(),
            DaemonAction::Stop => cli::daemon::stop(),
            DaemonAction::Status => cli::daemon::status(),
            DaemonAction::RunForeground { .. } => Ok(()),
        },
        Commands::Start {
            api_key,
            api_url,
            model,
            interval_ms,
            random,
            notify_command,
        } => cli::service::start(StartRequest {
            api_key,
            api_url,
            model,
            interval_ms,
            proactive_random_enabled: random,
            notify_command,
        }),
        Commands::Stop => cli::service::stop(),
        Commands::Proactive { state } => {
            cli::parse_switch(&state).and_then(cli::service::proactive)
        }
        Commands::IsRunning => cli::service::is_running(),
        Commands::Pending { json } => cli::service::pending(json),
        Commands::Config { action } => match action {
            ConfigAction::Show => cli::config::run_show(),
        },
    };

    result.unwrap_or_else(|e| eprintln!("Error: {}", e));
}
