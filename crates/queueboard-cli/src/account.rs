//! `login`, `logout`, and `whoami`.

use std::io::Write;

use anyhow::Context;
use queueboard_client::{ClientConfig, CredentialStore, QueueClient, auth};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

pub async fn login(
    config: &ClientConfig,
    store: &CredentialStore,
    email: &str,
    password: Option<String>,
    replace: bool,
) -> anyhow::Result<()> {
    check_existing_session(store, replace)?;

    let password = match password {
        Some(password) => password,
        None => prompt("Password: ").await?,
    };

    let client = QueueClient::new(config)?;
    let session = auth::login(&client, store, email, &password)
        .await
        .context("login failed")?;

    let mut out = std::io::stdout().lock();
    writeln!(
        out,
        "Logged in as {} (counter {})",
        session.user.email,
        session.home_counter()
    )?;
    Ok(())
}

/// Refuse to overwrite a stored session unless `replace` is set.
fn check_existing_session(store: &CredentialStore, replace: bool) -> anyhow::Result<()> {
    let Some(current) = auth::restore(store)? else {
        return Ok(());
    };
    if replace {
        info!(user = %current.user.id, email = current.user.email, "replacing stored session");
        return Ok(());
    }
    anyhow::bail!(
        "already logged in as {}; run `queueboard logout` first or pass --replace",
        current.user.email
    )
}

pub fn logout(store: &CredentialStore) -> anyhow::Result<()> {
    auth::logout(store)?;
    writeln!(std::io::stdout().lock(), "Logged out")?;
    Ok(())
}

pub fn whoami(store: &CredentialStore) -> anyhow::Result<()> {
    let mut out = std::io::stdout().lock();
    match auth::restore(store)? {
        Some(session) => writeln!(
            out,
            "{} ({}), counter {}",
            session.user.email,
            session.user.id,
            session.home_counter()
        )?,
        None => writeln!(out, "Not logged in")?,
    }
    Ok(())
}

async fn prompt(label: &str) -> anyhow::Result<String> {
    {
        let mut out = std::io::stdout().lock();
        write!(out, "{label}")?;
        out.flush()?;
    }
    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .context("failed to read from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_owned())
}
