use crate::application::dispatcher::PaymentDispatcher;
use crate::application::repository::ConfigRepository;
use crate::application::resolver::{PaymentRequest, PaymentSource, VoiceCommandResolver};
use crate::application::store::ConfigStore;
use crate::domain::config::{ConfigId, ParkingConfig};
use crate::domain::ports::{KeyValueStoreBox, PermissionProviderBox, SmsGatewayBox};
use crate::infrastructure::file::FileKeyValueStore;
use crate::interfaces::app_link::AppLink;
use crate::interfaces::permission::{StaticPermissions, TerminalPrompt};
use crate::interfaces::sms::{CommandSmsGateway, ConsoleSmsGateway};
use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result, miette};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

#[derive(Parser, Debug)]
#[command(author, version, about = "Pay for parking by SMS", long_about = None)]
pub struct Cli {
    /// Directory holding the settings file. Defaults to the platform data directory.
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long, global = true)]
    pub db_path: Option<PathBuf>,

    /// Program that sends an SMS, e.g. "termux-sms-send -n {destination} {body}".
    /// Without it the message is only printed.
    #[arg(long, global = true)]
    pub sms_command: Option<String>,

    /// Grant the SMS permission without asking.
    #[arg(short, long, global = true)]
    pub yes: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Save the vehicle registration number
    Register { number: String },
    /// Show the registration number and all parking configurations
    Show,
    /// List parking configurations
    List,
    /// Add a parking configuration
    Add {
        #[arg(long)]
        city: String,
        #[arg(long)]
        zone: String,
        #[arg(long)]
        sms: String,
    },
    /// Remove a parking configuration
    Remove { id: i64 },
    /// Pay with the given parking configuration
    Pay { id: i64 },
    /// Pay with the first configuration matching a city and zone
    Voice {
        #[arg(long)]
        city: Option<String>,
        #[arg(long)]
        zone: Option<String>,
    },
    /// Handle an assistant app link, e.g. "platiparking://pay?city=Beograd&zone=1"
    Link { uri: String },
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("plati-parking")
}

#[cfg(feature = "storage-rocksdb")]
fn open_database(path: &Path) -> Result<Option<KeyValueStoreBox>> {
    let store = crate::infrastructure::rocksdb::RocksDBStore::open(path).into_diagnostic()?;
    Ok(Some(Box::new(store)))
}

#[cfg(not(feature = "storage-rocksdb"))]
fn open_database(path: &Path) -> Result<Option<KeyValueStoreBox>> {
    tracing::warn!(
        path = %path.display(),
        "Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to file storage."
    );
    Ok(None)
}

fn open_backend(cli: &Cli) -> Result<KeyValueStoreBox> {
    if let Some(db_path) = &cli.db_path
        && let Some(store) = open_database(db_path)?
    {
        return Ok(store);
    }

    let dir = cli.data_dir.clone().unwrap_or_else(default_data_dir);
    debug!(dir = %dir.display(), "using file storage");
    Ok(Box::new(FileKeyValueStore::open(dir).into_diagnostic()?))
}

fn sms_gateway(cli: &Cli) -> Result<SmsGatewayBox> {
    match &cli.sms_command {
        Some(line) => Ok(Box::new(
            CommandSmsGateway::from_command_line(line).into_diagnostic()?,
        )),
        None => Ok(Box::new(ConsoleSmsGateway)),
    }
}

fn permissions(cli: &Cli) -> PermissionProviderBox {
    if cli.yes {
        Box::new(StaticPermissions(true))
    } else {
        Box::new(TerminalPrompt::new())
    }
}

fn print_config(config: &ParkingConfig) {
    println!(
        "{}\t{}\t{}\t{}",
        config.id(),
        config.city_name(),
        config.zone_name(),
        config.sms_number()
    );
}

fn print_configs(configs: &[ParkingConfig]) {
    if configs.is_empty() {
        println!("No parking configurations");
    }
    configs.iter().for_each(print_config);
}

/// Opens the store, runs one command and shuts everything down again.
pub async fn run(cli: Cli) -> Result<ExitCode> {
    let store = Arc::new(ConfigStore::open(open_backend(&cli)?).await);
    let repository = ConfigRepository::spawn(Arc::clone(&store));

    let result = execute(&cli, &repository).await;
    repository.shutdown().await;
    result
}

async fn execute(cli: &Cli, repository: &ConfigRepository) -> Result<ExitCode> {
    match &cli.command {
        Command::Register { number } => {
            let saved = repository.save_registration(number).await.into_diagnostic()?;
            if saved.is_blank() {
                println!("Registration cleared");
            } else {
                println!("Saved registration {}", saved);
            }
        }
        Command::Show => {
            let registration = repository.registration();
            if registration.is_blank() {
                println!("Registration: not set");
            } else {
                println!("Registration: {}", registration);
            }
            print_configs(&repository.configs());
        }
        Command::List => print_configs(&repository.configs()),
        Command::Add { city, zone, sms } => {
            let config = repository.create(city, zone, sms).await.into_diagnostic()?;
            println!("Added configuration {}", config.id());
        }
        Command::Remove { id } => {
            repository.remove(ConfigId(*id)).await.into_diagnostic()?;
            println!("Removed configuration {}", id);
        }
        Command::Pay { id } => {
            let config = repository
                .find(ConfigId(*id))
                .ok_or_else(|| miette!("no parking configuration with id {}", id))?;
            return pay(cli, repository, Trigger::User(config)).await;
        }
        Command::Voice { city, zone } => {
            return pay(cli, repository, Trigger::Voice(city.clone(), zone.clone())).await;
        }
        Command::Link { uri } => {
            let link = AppLink::parse(uri).into_diagnostic()?;
            println!(
                "Assistant request: city={}, zone={}",
                link.city.as_deref().unwrap_or("-"),
                link.zone.as_deref().unwrap_or("-")
            );
            return pay(cli, repository, Trigger::Voice(link.city, link.zone)).await;
        }
    }
    Ok(ExitCode::SUCCESS)
}

enum Trigger {
    User(ParkingConfig),
    Voice(Option<String>, Option<String>),
}

async fn pay(cli: &Cli, repository: &ConfigRepository, trigger: Trigger) -> Result<ExitCode> {
    let store = repository.store();
    let dispatcher = PaymentDispatcher::new(store, permissions(cli), sms_gateway(cli)?);
    let (request_tx, request_rx) = mpsc::channel(1);
    let (outcome_tx, mut outcome_rx) = mpsc::channel(1);
    let worker = tokio::spawn(dispatcher.run(request_rx, outcome_tx));

    match trigger {
        Trigger::User(config) => request_tx
            .send(PaymentRequest {
                config,
                source: PaymentSource::User,
            })
            .await
            .map_err(|_| miette!("payment dispatcher stopped"))?,
        Trigger::Voice(city, zone) => {
            let resolver = VoiceCommandResolver::new(store, request_tx.clone());
            let matched = resolver
                .submit(city.as_deref(), zone.as_deref())
                .await
                .into_diagnostic()?;
            if matched.is_none() {
                println!("No parking configuration matches the request");
            }
        }
    }
    drop(request_tx);

    let mut code = ExitCode::SUCCESS;
    while let Some(outcome) = outcome_rx.recv().await {
        if outcome.is_sent() {
            println!("{}", outcome.message());
        } else {
            eprintln!("{}", outcome.message());
        }
        if let Err(e) = outcome.into_result() {
            debug!(error = %e, "payment not completed");
            code = ExitCode::FAILURE;
        }
    }
    worker.await.into_diagnostic()?;
    Ok(code)
}
