//! # resetwatch server
//!
//! Watches the identity service's reset directory and relays every reset
//! request to the affected user. Administrators can also issue resets and
//! reset links from the command line.

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use resetwatch_config::{Config, ConfigLoad, ConfigLoader};
use resetwatch_core::{
    DirectoryWatcher, EventProcessor, InternalResetGenerator, ResetObserver, ResetServices,
    TracingObserver,
};
use resetwatch_server::{FileDirectory, SpoolNotifier, run_watcher};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// CLI entry point
#[derive(Parser, Debug)]
#[command(name = "resetwatch-server")]
#[command(about = "Relays password reset requests from an identity service to users")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Watch the reset directory until interrupted (default)
    Watch,
    /// Generate a reset for a user and deliver it through the admin path
    Issue {
        /// Directory id of the user
        #[arg(long)]
        user_id: String,
    },
    /// Print the reset link for a PIN
    Link {
        #[arg(long)]
        pin: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let env_file_loaded = dotenvy::dotenv().is_ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if env_file_loaded {
        info!("loaded environment from .env");
    }

    let ConfigLoad {
        config,
        source,
        warnings,
    } = ConfigLoader::new()
        .load()
        .context("failed to load configuration")?;
    info!(source = ?source, "configuration resolved");

    for warning in &warnings.items {
        match &warning.hint {
            Some(hint) => warn!(message = %warning.message, hint = %hint, "configuration warning"),
            None => warn!(message = %warning.message, "configuration warning"),
        }
    }

    match cli.command.unwrap_or(Command::Watch) {
        Command::Watch => watch(&config).await,
        Command::Issue { user_id } => issue(&config, &user_id).await,
        Command::Link { pin } => link(&config, &pin),
    }
}

struct Collaborators {
    directory: Arc<FileDirectory>,
    notifier: Arc<SpoolNotifier>,
}

fn collaborators(config: &Config) -> anyhow::Result<Collaborators> {
    let users_file = &config.directory.users_file;
    let directory = FileDirectory::load(users_file)
        .with_context(|| format!("failed to load users from {}", users_file.display()))?;
    info!(users = directory.len(), path = %users_file.display(), "user directory loaded");

    let notifier = SpoolNotifier::new(
        config.notifications.outbox_directory.clone(),
        config.password_resets.link_builder(),
    );

    Ok(Collaborators {
        directory: Arc::new(directory),
        notifier: Arc::new(notifier),
    })
}

async fn watch(config: &Config) -> anyhow::Result<()> {
    let Some(settings) = config.password_resets.watch_settings() else {
        info!("no watch directory configured; reset file watcher is disabled");
        return Ok(());
    };

    let Collaborators {
        directory,
        notifier,
    } = collaborators(config)?;
    let observer: Arc<dyn ResetObserver> = Arc::new(TracingObserver);

    let processor = EventProcessor::new(
        ResetServices {
            directory: directory.clone(),
            notifier,
            addresses: directory,
        },
        config.processor_settings(),
        observer.clone(),
    );
    let watcher = DirectoryWatcher::new(settings, processor, observer);

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("interrupt received, stopping reset watcher"),
            Err(err) => warn!("failed to listen for interrupt: {err}"),
        }
        signal_token.cancel();
    });

    run_watcher(watcher, shutdown).await
}

async fn issue(config: &Config, user_id: &str) -> anyhow::Result<()> {
    let Collaborators {
        directory,
        notifier,
    } = collaborators(config)?;
    let generator = InternalResetGenerator::new(
        directory,
        notifier,
        config.password_resets.link_builder(),
    )
    .with_lifetime(config.password_resets.internal_lifetime());

    let record = generator
        .send_internal_reset(user_id)
        .await
        .with_context(|| format!("failed to issue a reset for {user_id}"))?;

    println!("PIN: {}", record.pin());
    println!(
        "Expires: {}",
        resetwatch_core::record::format_expiration(record.expiry())
    );
    if let Ok(link) = generator.gen_reset_link(record.pin()) {
        println!("Link: {link}");
    }
    Ok(())
}

fn link(config: &Config, pin: &str) -> anyhow::Result<()> {
    let link = config
        .password_resets
        .link_builder()
        .link(pin)
        .context("cannot build reset link")?;
    println!("{link}");
    Ok(())
}
