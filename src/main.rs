//! `sos` command-line host for the SOS dispatch engine.
//!
//! Stands in for the mobile shell: the picked contact comes from flags,
//! permission grants and provider readings come from `config.toml`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{debug, info, warn};

use sos_dispatch::config::{self, Config, RuntimePaths, StoreBackend};
use sos_dispatch::engine::{Dispatch, SosEngine};
use sos_dispatch::host::{FixedHost, HostPlatform, REQUIRED_PERMISSIONS};
use sos_dispatch::location::fixed::StaticProviders;
use sos_dispatch::places::NominatimClient;
use sos_dispatch::recorder::Recorder;
use sos_dispatch::router::DispatchRouter;
use sos_dispatch::store::rest::RestStore;
use sos_dispatch::store::sqlite::SqliteStore;
use sos_dispatch::store::{DocumentStore, SOS_HISTORY};
use sos_dispatch::transport::dry_run::DryRunTransport;
use sos_dispatch::transport::gateway::HttpSmsGateway;
use sos_dispatch::transport::SmsTransport;
use sos_dispatch::types::Contact;

/// Send an emergency SOS with your location to your emergency contacts.
#[derive(Parser)]
#[command(name = "sos", version, about)]
struct Cli {
    /// Runtime directory (default: `~/.sos-dispatch`).
    #[arg(long, global = true)]
    home: Option<PathBuf>,

    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

/// Available CLI subcommands.
#[derive(Subcommand)]
enum Command {
    /// Write a starter config.toml.
    Init,
    /// Trigger an SOS.
    Send {
        /// Phone number of the picked contact (secondary target).
        #[arg(long)]
        phone: Option<String>,
        /// Name of the picked contact.
        #[arg(long, default_value = "")]
        name: String,
        /// Email of the picked contact.
        #[arg(long)]
        email: Option<String>,
        /// Language to record instead of the configured one.
        #[arg(long)]
        language: Option<String>,
    },
    /// Save a picked contact to the emergency contact list.
    AddContact {
        /// Phone number.
        #[arg(long)]
        phone: String,
        /// Display name.
        #[arg(long, default_value = "")]
        name: String,
        /// Email address.
        #[arg(long)]
        email: Option<String>,
    },
    /// Store the UI language preference.
    Language {
        /// Language name, e.g. `English` or `Hindi`.
        value: String,
    },
    /// Show recent SOS records (SQLite store only).
    History {
        /// Maximum records to show.
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let paths = match cli.home {
        Some(root) => RuntimePaths::under(&root),
        None => config::runtime_paths()?,
    };

    match cli.command {
        Command::Init => handle_init(&paths),
        Command::Send {
            phone,
            name,
            email,
            language,
        } => {
            let picked = phone.map(|phone| Contact {
                phone_number: phone,
                display_name: name,
                email,
            });
            handle_send(&paths, picked, language).await
        }
        Command::AddContact { phone, name, email } => {
            let contact = Contact {
                phone_number: phone,
                display_name: name,
                email,
            };
            handle_add_contact(&paths, &contact).await
        }
        Command::Language { value } => handle_language(&paths, &value).await,
        Command::History { limit } => handle_history(&paths, limit).await,
    }
}

/// Write the starter config unless one exists.
fn handle_init(paths: &RuntimePaths) -> anyhow::Result<ExitCode> {
    sos_dispatch::logging::init_cli();
    std::fs::create_dir_all(&paths.root)
        .with_context(|| format!("failed to create {}", paths.root.display()))?;
    if paths.config_toml.exists() {
        println!("config already exists at {}", paths.config_toml.display());
        return Ok(ExitCode::SUCCESS);
    }
    std::fs::write(&paths.config_toml, config::DEFAULT_CONFIG_TOML)
        .with_context(|| format!("failed to write {}", paths.config_toml.display()))?;
    println!("wrote {}", paths.config_toml.display());
    Ok(ExitCode::SUCCESS)
}

/// Run one SOS pipeline and print the outcome as JSON.
async fn handle_send(
    paths: &RuntimePaths,
    picked: Option<Contact>,
    language: Option<String>,
) -> anyhow::Result<ExitCode> {
    let _logging_guard = sos_dispatch::logging::init_production(&paths.logs_dir)?;
    load_env(paths);

    let config = config::load_config_or_default(&paths.config_toml)?;
    let store = open_store(&config, paths).await?;
    let recorder = Recorder::new(store);

    let host = Arc::new(FixedHost::new(picked, config.permissions.to_grants()));
    let grants = host.request_permissions(&REQUIRED_PERMISSIONS).await;
    if !grants.can_locate() || !grants.can_send_sms() {
        warn!("not all permissions granted");
    }
    let selected = host.pick_contact().await;

    let readings = config
        .location
        .readings
        .iter()
        .map(config::ReadingConfig::to_stored)
        .collect();
    let providers = Arc::new(StaticProviders::new(readings, config.location.max_age()));

    let router = DispatchRouter::new(build_transport(&config));
    let mut engine = SosEngine::new(
        host,
        providers,
        router,
        recorder.clone(),
        config.engine_settings(),
    );
    if config.places.enabled {
        engine = engine.with_places(Arc::new(NominatimClient::new(
            config.places.endpoint.clone(),
            &config.places.user_agent,
            Duration::from_secs(config.places.timeout_secs),
        )));
    }

    let emergency = config.contacts.emergency.to_contact();
    let language = language.unwrap_or_else(|| config.language.clone());
    let Dispatch { outcome, record } = engine
        .trigger(selected.as_ref(), &emergency, &language)
        .await;
    let (outcome, in_flight) = match record {
        Some(record) => engine.settle(outcome, record).await,
        None => (outcome, None),
    };

    info!(
        success = outcome.success,
        error_kind = outcome.error_kind.as_str(),
        "sos finished"
    );
    println!("{}", serde_json::to_string_pretty(&outcome)?);

    // The runtime drops spawned tasks on exit.
    if let Some(receipt) = in_flight {
        match receipt.outcome().await {
            Ok(id) => debug!(id = %id, "late audit write landed"),
            Err(e) => warn!(error = %e, "late audit write failed"),
        }
    }
    if outcome.sms_delivered {
        if let Some(contact) = selected.as_ref() {
            if let Err(e) = recorder.save_contact(contact).await {
                warn!(error = %e, "failed to save picked contact");
            }
        }
    }

    Ok(if outcome.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn handle_add_contact(paths: &RuntimePaths, contact: &Contact) -> anyhow::Result<ExitCode> {
    sos_dispatch::logging::init_cli();
    load_env(paths);
    if !contact.is_reachable() {
        anyhow::bail!("contact phone number must not be empty");
    }
    let config = config::load_config_or_default(&paths.config_toml)?;
    let recorder = Recorder::new(open_store(&config, paths).await?);
    let id = recorder.save_contact(contact).await?;
    println!("saved contact {id}");
    Ok(ExitCode::SUCCESS)
}

async fn handle_language(paths: &RuntimePaths, language: &str) -> anyhow::Result<ExitCode> {
    sos_dispatch::logging::init_cli();
    load_env(paths);
    if language.trim().is_empty() {
        anyhow::bail!("language must not be empty");
    }
    let config = config::load_config_or_default(&paths.config_toml)?;
    let recorder = Recorder::new(open_store(&config, paths).await?);
    recorder.save_language(language.trim()).await?;
    println!("language set to {}", language.trim());
    Ok(ExitCode::SUCCESS)
}

async fn handle_history(paths: &RuntimePaths, limit: usize) -> anyhow::Result<ExitCode> {
    sos_dispatch::logging::init_cli();
    let config = config::load_config_or_default(&paths.config_toml)?;
    if config.store.backend != StoreBackend::Sqlite {
        anyhow::bail!("history is only available with the sqlite store backend");
    }
    let store = SqliteStore::open(&sqlite_path(&config, paths)).await?;
    let documents = store.list_documents(SOS_HISTORY, limit).await?;
    if documents.is_empty() {
        println!("no SOS records");
    }
    for doc in documents {
        println!("{} {}", doc.created_at, doc.fields);
    }
    Ok(ExitCode::SUCCESS)
}

/// Load secrets from the runtime `.env`, if present.
fn load_env(paths: &RuntimePaths) {
    if paths.env_file.exists() {
        if let Err(e) = dotenvy::from_path(&paths.env_file) {
            warn!(error = %e, path = %paths.env_file.display(), "failed to load .env");
        }
    }
}

fn sqlite_path(config: &Config, paths: &RuntimePaths) -> PathBuf {
    config
        .store
        .sqlite_path
        .clone()
        .unwrap_or_else(|| paths.store_db.clone())
}

async fn open_store(
    config: &Config,
    paths: &RuntimePaths,
) -> anyhow::Result<Arc<dyn DocumentStore>> {
    match config.store.backend {
        StoreBackend::Sqlite => {
            let store = SqliteStore::open(&sqlite_path(config, paths)).await?;
            Ok(Arc::new(store))
        }
        StoreBackend::Rest => {
            let url = config
                .store
                .rest_url
                .clone()
                .context("store.rest_url is required for the rest backend")?;
            Ok(Arc::new(RestStore::new(
                url,
                Duration::from_secs(config.store.timeout_secs),
            )))
        }
    }
}

fn build_transport(config: &Config) -> Arc<dyn SmsTransport> {
    match &config.transport.gateway_url {
        Some(url) => {
            let token = std::env::var(&config.transport.token_env).ok();
            if token.is_none() {
                debug!(env = %config.transport.token_env, "no gateway token set");
            }
            Arc::new(HttpSmsGateway::new(
                url.clone(),
                token,
                Duration::from_secs(config.transport.timeout_secs),
            ))
        }
        None => {
            info!("no sms gateway configured, using dry-run transport");
            Arc::new(DryRunTransport)
        }
    }
}
