//! `queueboard`: terminal front-end for the hospital queue display.
//!
//! # Subcommands
//!
//! - `display`: the public "now serving" board (no login needed)
//! - `console`: the staff console for calling and finishing tickets
//! - `login` / `logout` / `whoami`: manage the stored staff session
//!
//! Configuration comes from `QUEUEBOARD_*` environment variables; the
//! global flags override them. Logs go to stderr so stdout stays free for
//! the board.

mod account;
mod board;
mod console;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use queueboard_client::{ClientConfig, CredentialStore};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Command-line arguments.
#[derive(Debug, Parser)]
#[command(name = "queueboard", version, about = "Hospital queue display and staff console")]
struct Cli {
    /// Backend base URL (overrides `QUEUEBOARD_API_URL`).
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Event gateway URL (overrides `QUEUEBOARD_WS_URL`; derived from the
    /// backend URL when neither is set).
    #[arg(long, global = true)]
    ws_url: Option<String>,

    /// Directory for stored credentials (overrides `QUEUEBOARD_STATE_DIR`).
    #[arg(long, global = true)]
    state_dir: Option<PathBuf>,

    /// Emit logs as JSON.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show the live "now serving" board.
    Display,
    /// Run the staff console for the logged-in user.
    Console,
    /// Log in and store the session.
    Login {
        /// Staff email address.
        #[arg(long)]
        email: String,
        /// Password; prompted for when omitted.
        #[arg(long, env = "QUEUEBOARD_PASSWORD", hide_env_values = true)]
        password: Option<String>,
        /// Replace a session that is already stored.
        #[arg(long)]
        replace: bool,
    },
    /// Forget the stored session.
    Logout,
    /// Show the stored session's user.
    Whoami,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json);

    let config = load_config(&cli, ClientConfig::from_env()?)?;
    info!(
        api_url = config.api_url,
        ws_url = config.ws_url,
        state_dir = %config.state_dir.display(),
        "configuration loaded"
    );
    let store = CredentialStore::new(config.credentials_path());

    match cli.command {
        Command::Display => board::run(&config).await,
        Command::Console => console::run(&config, &store).await,
        Command::Login {
            email,
            password,
            replace,
        } => account::login(&config, &store, &email, password, replace).await,
        Command::Logout => account::logout(&store),
        Command::Whoami => account::whoami(&store),
    }
}

fn init_tracing(json: bool) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Apply the global flags on top of the environment configuration.
fn load_config(cli: &Cli, mut config: ClientConfig) -> anyhow::Result<ClientConfig> {
    if let Some(api_url) = &cli.api_url {
        config = config.with_api_url(api_url)?;
    }
    if let Some(ws_url) = &cli.ws_url {
        config = config.with_ws_url(ws_url)?;
    }
    if let Some(dir) = &cli.state_dir {
        config = config.with_state_dir(dir);
    }
    Ok(config)
}
