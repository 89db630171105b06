//! `console`: a line-oriented staff console.
//!
//! Each input line is parsed as a console command with clap, so `help`
//! and typos get the usual clap messages.

use std::io::Write;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use queueboard_client::{ClientConfig, CredentialStore, QueueClient, auth};
use queueboard_sync::render::render_console;
use queueboard_sync::{Announcer, ConfiguredSpeech, ConsoleSync};
use queueboard_types::CounterType;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

/// One console input line.
#[derive(Debug, Parser)]
#[command(name = "console", no_binary_name = true, disable_version_flag = true)]
struct ConsoleLine {
    #[command(subcommand)]
    command: ConsoleCommand,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
enum ConsoleCommand {
    /// Call the next ticket at the selected counter.
    Next,
    /// Finish the current ticket at the selected counter.
    Finish,
    /// Select a counter; only your own counter is accepted.
    Select {
        /// Counter to serve.
        counter: CounterType,
    },
    /// Clear the current notice.
    Dismiss,
    /// Redraw the console.
    Show,
    /// Leave the console.
    #[command(alias = "exit")]
    Quit,
}

fn parse_line(line: &str) -> Result<ConsoleCommand, clap::Error> {
    ConsoleLine::try_parse_from(line.split_whitespace()).map(|parsed| parsed.command)
}

pub async fn run(config: &ClientConfig, store: &CredentialStore) -> anyhow::Result<()> {
    let Some(session) = auth::restore(store)? else {
        anyhow::bail!("not logged in; run `queueboard login --email <EMAIL>` first");
    };
    info!(user = %session.user.id, counter = %session.home_counter(), "console starting");

    let client = session.client(&QueueClient::new(config)?);
    let announcer = Announcer::new(
        ConfiguredSpeech::from_config(&config.speech),
        config.speech.rate,
    );
    let console = ConsoleSync::new(Arc::new(client), announcer, session.home_counter());
    console.load().await;
    draw(&render_console(&console.view()))?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let command = match parse_line(&line) {
            Ok(command) => command,
            Err(error) => {
                draw(&error.render().to_string())?;
                continue;
            }
        };

        match command {
            ConsoleCommand::Next => {
                if let Err(error) = console.call_next().await {
                    debug!(error = %error, "call next did not complete");
                }
            }
            ConsoleCommand::Finish => {
                if let Err(error) = console.finish().await {
                    debug!(error = %error, "finish did not complete");
                }
            }
            ConsoleCommand::Select { counter } => {
                if let Err(error) = console.select(counter) {
                    debug!(error = %error, "selection refused");
                }
            }
            ConsoleCommand::Dismiss => console.dismiss(),
            ConsoleCommand::Show => {}
            ConsoleCommand::Quit => break,
        }
        draw(&render_console(&console.view()))?;
    }

    info!("console closed");
    Ok(())
}

fn draw(text: &str) -> anyhow::Result<()> {
    let mut out = std::io::stdout().lock();
    writeln!(out, "{text}")?;
    out.flush()?;
    Ok(())
}
