mod cmd;
mod output;

use clap::{Parser, Subcommand};
use cmd::{
    config::ConfigSubcommand, db::DbSubcommand, token::TokenSubcommand, user::UserSubcommand,
    Context,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "pulse",
    about = "Team-performance dashboard: serve the API and manage its database",
    version,
    propagate_version = true
)]
struct Cli {
    /// Path to the config file
    #[arg(long, global = true, env = "PULSE_CONFIG", default_value = pulse_core::config::CONFIG_FILE)]
    config: PathBuf,

    /// Database location, overriding `database.path` (":memory:" for a throwaway store)
    #[arg(long, global = true, env = "PULSE_DB")]
    db: Option<String>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Port to listen on (default: server.port from config)
        #[arg(long)]
        port: Option<u16>,
        /// Address to bind (default: server.bind from config)
        #[arg(long)]
        bind: Option<String>,
    },

    /// Schema management
    Db {
        #[command(subcommand)]
        subcommand: DbSubcommand,
    },

    /// Inspect and administer users
    User {
        #[command(subcommand)]
        subcommand: UserSubcommand,
    },

    /// Bearer tokens for the configured secret
    Token {
        #[command(subcommand)]
        subcommand: TokenSubcommand,
    },

    /// Create and validate the config file
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
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

    let ctx = Context {
        config_path: cli.config,
        db_override: cli.db,
        json: cli.json,
    };

    let result = match cli.command {
        Commands::Serve { port, bind } => cmd::serve::run(&ctx, port, bind),
        Commands::Db { subcommand } => cmd::db::run(&ctx, subcommand),
        Commands::User { subcommand } => cmd::user::run(&ctx, subcommand),
        Commands::Token { subcommand } => cmd::token::run(&ctx, subcommand),
        Commands::Config { subcommand } => cmd::config::run(&ctx, subcommand),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
