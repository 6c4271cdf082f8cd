mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::config::ConfigSubcommand;
use cmd::RiskArgs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "vyuha",
    about = "Autonomous collision-avoidance agent: scan, decide, validate, maneuver",
    version,
    propagate_version = true
)]
struct Cli {
    /// Agent root (default: auto-detect from .vyuha/ or .git/)
    #[arg(long, global = true, env = "VYUHA_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create .vyuha/ and a default config.yaml
    Init,

    /// Run the HTTP server
    Serve {
        /// Port to listen on (0 = OS-assigned)
        #[arg(long, default_value = "8000", env = "VYUHA_PORT")]
        port: u16,
    },

    /// Record a risk assessment from the risk source
    Scan {
        /// Satellite identifier (default: the configured spacecraft name)
        #[arg(long)]
        satellite: Option<String>,

        #[command(flatten)]
        risk: RiskArgs,

        /// Measured risk-source latency in milliseconds
        #[arg(long)]
        latency_ms: Option<f64>,
    },

    /// Run one decide-validate-retry cycle
    Act {
        #[command(flatten)]
        risk: RiskArgs,

        /// Replace the first proposal with a synthetic unsafe command
        #[arg(long)]
        inject_threat: bool,

        /// Session id for audit logging (generated if omitted)
        #[arg(long)]
        session: Option<String>,
    },

    /// Show the current spacecraft state
    State,

    /// Return to the baseline trajectory
    Restore,

    /// Show maneuver history and baseline
    History,

    /// Aggregate the event log into insights and recommendations
    Insights,

    /// Inspect and validate the configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("warning: .env not loaded: {e}");
        }
    }

    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Serve { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Init => cmd::init::run(&root),
        Commands::Serve { port } => cmd::serve::run(&root, port),
        Commands::Scan {
            satellite,
            risk,
            latency_ms,
        } => cmd::scan::run(&root, satellite.as_deref(), &risk, latency_ms, cli.json),
        Commands::Act {
            risk,
            inject_threat,
            session,
        } => cmd::act::run(&root, &risk, inject_threat, session, cli.json),
        Commands::State => cmd::spacecraft::state(&root, cli.json),
        Commands::Restore => cmd::spacecraft::restore(&root, cli.json),
        Commands::History => cmd::spacecraft::history(&root, cli.json),
        Commands::Insights => cmd::insights::run(&root, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
