mod auth;
mod config;
mod db;
mod decode;
mod error;
mod imap;
mod models;
mod sync;
mod view;

use crate::config::Config;
use crate::imap::ImapMailbox;
use crate::sync::{SyncOutcome, Syncer};
use anyhow::Context;
use std::io;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let debug_logging = args.iter().any(|arg| arg == "--debug");
    let offline = args.iter().any(|arg| arg == "--offline");

    // Logs go to stderr so the rendered mailbox on stdout stays readable.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if debug_logging { "debug" } else { "info" };
        EnvFilter::new(format!("warn,mailstash={}", level))
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let config_path = args
        .iter()
        .position(|arg| arg == "--config")
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
        .unwrap_or(config::DEFAULT_CONFIG_PATH);
    let config = Config::load(config_path);

    let credential_store = auth::CredentialStore::default();

    // Handle credential reset
    if args.iter().any(|arg| arg == "--reset-credentials") {
        let address = auth::prompt_line(
            &mut io::stdin().lock(),
            &mut io::stdout(),
            "Enter your email address: ",
        )?;
        credential_store.clear(&address)?;
        println!("Stored password cleared for {}.", address);
        return Ok(());
    }

    if !config.store.database.exists() {
        info!("creating {}", config.store.database.display());
    }
    let db = db::Database::new(&config.store.database_url())
        .await
        .with_context(|| format!("Failed to open {}", config.store.database.display()))?;
    db.ensure_schema().await.context("Failed to create the emails table")?;

    if !offline {
        sync_mailbox(&config, &db, &credential_store).await?;
    }

    info!("{} records in the store", db.count().await?);
    for block in view::Viewer::new(&db).render().await? {
        println!("{}", block);
    }

    db.close().await;
    Ok(())
}

/// Runs one sync and prints its report. Connection and folder problems are
/// reported and the program carries on to the offline view; store failures
/// are returned.
async fn sync_mailbox(
    config: &Config,
    db: &db::Database,
    credential_store: &auth::CredentialStore,
) -> anyhow::Result<()> {
    let store = config
        .mailbox
        .remember_password
        .then_some(credential_store);
    let (credentials, remembered) =
        auth::prompt_credentials(&mut io::stdin().lock(), &mut io::stdout(), store)?;

    let result = match ImapMailbox::open(&config.mailbox, &credentials).await {
        Ok(mailbox) => {
            if let (Some(store), false) = (store, remembered) {
                store.set(&credentials);
            }
            Syncer::new(db, config.mailbox.folder.as_str()).run(mailbox).await
        }
        Err(e) => {
            if remembered && credential_store.forget(&credentials.address) {
                println!("The remembered password was removed; you will be asked again next time.");
            }
            Err(e)
        }
    };

    let outcome = SyncOutcome::settle(result).context("Sync failed")?;
    if let SyncOutcome::Abandoned(e) = &outcome {
        error!("{}", e);
    }
    for line in outcome.report() {
        println!("{}", line);
    }
    Ok(())
}
