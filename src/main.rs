//! `script-search`: find and run shell scripts by their metadata header.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use script_search::app::{Session, UserEvent};
use script_search::config::settings::load_settings;
use script_search::config::store::SettingsStore;
use script_search::core::{NotifyMode, ProcessRunner, ResultMeta};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "script-search", version, about = "Search and run your shell scripts")]
struct Cli {
    /// Settings file to use instead of the platform default.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Script folder for this invocation only; the saved location is left alone
    /// and `watch` no longer follows the settings file.
    #[arg(long, global = true)]
    location: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every script in catalog order.
    List {
        #[arg(long)]
        json: bool,
    },
    /// Search the catalog like the search overview does.
    Search {
        #[arg(required = true)]
        terms: Vec<String>,
        /// Maximum number of results to show.
        #[arg(long, default_value_t = 10)]
        max: usize,
        #[arg(long)]
        json: bool,
    },
    /// Run a script and print its notification.
    Run {
        terms: Vec<String>,
        /// Result id to run instead of the first search hit.
        #[arg(long)]
        id: Option<String>,
    },
    /// Keep the catalog live and log every change until Ctrl-C. Settings
    /// written by other processes are applied as they land.
    Watch,
    /// Show or change the saved settings.
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
}

#[derive(Subcommand)]
enum SettingsAction {
    Show,
    SetLocation { location: String },
    SetIcon { icon: String },
    SetNotify { style: NotifyMode },
    /// Ask running sessions to reload all scripts.
    Refresh,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Settings { action } => run_settings(cli.config, action),
        Commands::Watch if cli.location.is_none() => {
            let store = Arc::new(SettingsStore::open(cli.config.as_deref())?);
            if let Err(e) = store.watch_file() {
                tracing::warn!("Settings changes on disk will not be picked up: {}", e);
            }
            run_session_command(store, Commands::Watch).await
        }
        command => {
            let mut settings = load_settings(cli.config.as_deref())?;
            if let Some(location) = cli.location {
                settings.script_location = location;
            }
            let store = Arc::new(SettingsStore::new(settings));
            run_session_command(store, command).await
        }
    }
}

fn run_settings(config: Option<PathBuf>, action: SettingsAction) -> Result<()> {
    let store = SettingsStore::open(config.as_deref())?;
    match action {
        SettingsAction::Show => {
            println!("{}", serde_json::to_string_pretty(&store.snapshot())?);
        }
        SettingsAction::SetLocation { location } => {
            store.set_script_location(location)?;
        }
        SettingsAction::SetIcon { icon } => {
            store.set_default_icon(icon)?;
        }
        SettingsAction::SetNotify { style } => {
            store.set_default_notification_style(style)?;
        }
        SettingsAction::Refresh => {
            let value = store.bump_refresh_trigger()?;
            tracing::info!(value, "Refresh requested");
        }
    }
    Ok(())
}

async fn run_session_command(store: Arc<SettingsStore>, command: Commands) -> Result<()> {
    let (proxy, mut events) = mpsc::unbounded_channel();
    let session = Session::enable(store, proxy, Arc::new(ProcessRunner));
    let cancel = CancellationToken::new();

    match command {
        Commands::List { json } => {
            let ids = session.get_initial_result_set(&[], &cancel).await?;
            let metas = session.get_result_metas(&ids, &cancel).await?;
            print_metas(&metas, json)?;
        }
        Commands::Search { terms, max, json } => {
            let ids = session.get_initial_result_set(&terms, &cancel).await?;
            let ids = session.filter_results(ids, max);
            let metas = session.get_result_metas(&ids, &cancel).await?;
            print_metas(&metas, json)?;
        }
        Commands::Run { terms, id } => {
            let id = match id {
                Some(id) => id,
                None => session
                    .get_initial_result_set(&terms, &cancel)
                    .await?
                    .into_iter()
                    .next()
                    .with_context(|| format!("No script matches '{}'", terms.join(" ")))?,
            };
            session.activate_result(&id, &terms)?.await?;
            while let Ok(event) = events.try_recv() {
                if let UserEvent::Notification(n) = event {
                    let mark = if n.success { "ok" } else { "failed" };
                    println!("[{}] {}: {}", mark, n.title, n.body.trim_end());
                }
            }
        }
        Commands::Watch => {
            tracing::info!("Watching scripts, press Ctrl-C to stop");
            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => break,
                    Some(event) = events.recv() => log_event(&event),
                }
            }
        }
        // Handled before a session is created.
        Commands::Settings { .. } => {}
    }

    session.disable().await;
    Ok(())
}

fn print_metas(metas: &[ResultMeta], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(metas)?);
        return Ok(());
    }
    for meta in metas {
        if meta.description.is_empty() {
            println!("{:>3}  {}", meta.id, meta.name);
        } else {
            println!("{:>3}  {}  {}", meta.id, meta.name, meta.description);
        }
    }
    Ok(())
}

fn log_event(event: &UserEvent) {
    match event {
        UserEvent::CatalogUpdated { root, scripts } => {
            tracing::info!(root = %root.display(), scripts, "Catalog updated")
        }
        UserEvent::Notification(n) => {
            tracing::info!(title = %n.title, body = %n.body, success = n.success, "Notification")
        }
        UserEvent::HideOverview => tracing::debug!("Overview hidden"),
    }
}
