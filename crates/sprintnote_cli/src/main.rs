//! CLI smoke entry point.
//!
//! # Responsibility
//! - Drive `SyncZoneManager` startup against the in-memory backend.
//! - Print emitted sync events and final state for quick local sanity checks.
//!
//! Usage: `sprintnote_cli [--log-dir <dir> [--log-level <level>]] [collaborator ...]`
//!
//! Storage location and identity follow `SPRINTNOTE_APP_SUPPORT_DIR`,
//! `SPRINTNOTE_CURRENT_USER` and `SPRINTNOTE_ZONE_NAME`.

use clap::Parser;
use log::info;
use sprintnote_core::{
    start_logging, InMemoryBackend, LogLevel, LogSettings, LoggingError, SyncBackend, SyncConfig,
    SyncEvent, SyncEventBus, SyncStores, SyncZoneManager,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::broadcast::error::TryRecvError;

#[derive(Debug, Parser)]
#[command(name = "sprintnote_cli")]
#[command(version)]
#[command(about = "Run SprintNote sync zone setup against the in-memory backend")]
struct Cli {
    /// Directory for rolling log files; logging stays off when omitted
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Log level used with --log-dir (trace|debug|info|warn|error)
    #[arg(long, requires = "log_dir")]
    log_level: Option<String>,

    /// Collaborator identities to add after startup
    collaborators: Vec<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Some(log_dir) = cli.log_dir {
        if let Err(err) = start_cli_logging(cli.log_level.as_deref(), log_dir) {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    }

    println!("sprintnote_core version={}", sprintnote_core::core_version());
    match run(cli.collaborators).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn start_cli_logging(level: Option<&str>, log_dir: PathBuf) -> Result<(), LoggingError> {
    let level = match level {
        Some(raw) => LogLevel::parse(raw)?,
        None => LogLevel::default_for_build(),
    };
    start_logging(LogSettings::new(level, log_dir)?)
}

async fn run(collaborators: Vec<String>) -> Result<(), sprintnote_core::SyncError> {
    let config = SyncConfig::from_env();
    println!("app_support_dir={}", config.app_support_dir.display());

    let stores = SyncStores::open(&config)?;
    let events = SyncEventBus::new(config.event_capacity);
    let mut receiver = events.subscribe();
    let backend: Arc<dyn SyncBackend> = Arc::new(InMemoryBackend::new());

    let manager = SyncZoneManager::start(config, backend, stores, events).await?;
    for identity in &collaborators {
        let outcome = manager.add_collaborator(identity).await?;
        info!(
            "event=cli_add_collaborator module=cli status={}",
            outcome.status_label()
        );
    }
    manager.wait_for_permission_request().await;

    loop {
        match receiver.try_recv() {
            Ok(event) => println!("event {}", describe(&event)),
            Err(TryRecvError::Lagged(skipped)) => println!("event lagged skipped={skipped}"),
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
        }
    }

    println!("zone_setup_state={}", manager.zone_setup_state().await?.as_str());
    println!("collaborators={}", manager.collaborators().await.to_vec().join(","));
    manager.shutdown();
    Ok(())
}

fn describe(event: &SyncEvent) -> String {
    match event {
        SyncEvent::ZoneCreated { zone } => format!("zone_created zone={}", zone.zone_name()),
        SyncEvent::ZoneCreationFailed { zone, error } => {
            format!("zone_creation_failed zone={} error={error}", zone.zone_name())
        }
        SyncEvent::NotificationsEnsured {
            scope, outcome, ..
        } => format!(
            "notifications_ensured scope={scope} status={}",
            outcome.status_label()
        ),
        SyncEvent::SubscriptionRemoved {
            scope,
            subscription_id,
        } => format!("subscription_removed scope={scope} id={subscription_id}"),
        SyncEvent::SubscriptionRemovalFailed { scope, error } => {
            format!("subscription_removal_failed scope={scope} error={error}")
        }
        SyncEvent::PermissionResolved { status } => {
            format!("permission_resolved status={}", status.as_str())
        }
        SyncEvent::PermissionFailed { error } => format!("permission_failed error={error}"),
        SyncEvent::CollaboratorAdded {
            identity,
            newly_added,
        } => format!("collaborator_added identity={identity} newly_added={newly_added}"),
    }
}
