// ============================================================================
// appctl — command-line host for the risk calculator client
// ============================================================================
// Usage:
//   appctl run                                  Register, check, and keep polling
//   appctl device-id [--reset]                  Show (or regenerate) the device id
//   appctl check                                Run a single access check
//   appctl calc --entry 500 --stop 490 [...]    Compute a risk plan
//   appctl cache install | fetch PATH           Drive the offline cache
// ============================================================================

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use appctl_core::calc::{self, CalcSaveClient, RiskInput, TradeDirection, DEFAULT_CAPITAL, DEFAULT_RISK_PERCENT};
use appctl_core::offline_cache::FetchSource;
use appctl_core::{
    AccessController, CheckOutcome, ConsoleView, ControllerConfig, ControllerState, DeviceIdentity,
    HttpAccessApi, LocalStore, OfflineCache,
};
use clap::{Parser, Subcommand};
use tracing::info;

/// Risk calculator client
#[derive(Parser)]
#[command(name = "appctl", version, about = "Device access controller and risk calculator client")]
struct Cli {
    /// Server origin (default: APPCTL_BASE_URL or http://127.0.0.1:8000)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Path to the local storage file (default: ~/.appctl/local.redb)
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register this device and keep validating access until denied or Ctrl-C
    Run,

    /// Print the stored device identity
    DeviceId {
        /// Discard the stored identity and generate a new one
        #[arg(long)]
        reset: bool,
    },

    /// Run a single access check and print the outcome
    Check,

    /// Compute position size and targets for a trade
    Calc {
        #[arg(long, default_value_t = DEFAULT_CAPITAL)]
        capital: f64,

        /// Risk per trade in percent
        #[arg(long, default_value_t = DEFAULT_RISK_PERCENT)]
        risk: f64,

        #[arg(long)]
        entry: f64,

        #[arg(long)]
        stop: f64,

        /// buy/long or sell/short
        #[arg(long, default_value = "buy")]
        direction: String,

        /// Custom reward ratio, e.g. 10 or 1:10
        #[arg(long)]
        ratio: Option<String>,

        /// Save the calculation to the server history
        #[arg(long)]
        save: bool,

        /// Symbol recorded with a saved calculation
        #[arg(long, default_value = "N/A")]
        symbol: String,
    },

    /// Offline cache operations
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Store the app shell for offline use
    Install,

    /// Fetch a path, cache first
    Fetch { path: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("Warning: Could not load .env file: {}", e);
    }

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("appctl=info,appctl_core=info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = ControllerConfig::from_env();
    if let Some(url) = &cli.base_url {
        config = config.with_base_url(url);
    }
    if let Some(path) = cli.db_path {
        config.db_path = Some(path);
    }

    match cli.command {
        Commands::Run => cmd_run(config).await,
        Commands::DeviceId { reset } => cmd_device_id(&config, reset),
        Commands::Check => cmd_check(config).await,
        Commands::Calc {
            capital,
            risk,
            entry,
            stop,
            direction,
            ratio,
            save,
            symbol,
        } => {
            let input = RiskInput {
                capital,
                risk_percent: risk,
                entry_price: entry,
                stop_loss: stop,
                direction: direction.parse::<TradeDirection>()?,
                custom_ratio: ratio,
            };
            cmd_calc(&config, input, save, &symbol).await
        }
        Commands::Cache { action } => cmd_cache(&config, action).await,
    }
}

fn open_store(config: &ControllerConfig) -> Result<Arc<LocalStore>> {
    let store = LocalStore::open(config.db_path.as_deref()).context("Failed to open local storage")?;
    Ok(Arc::new(store))
}

fn build_controller(config: ControllerConfig) -> Result<AccessController> {
    let store = open_store(&config)?;
    let identity = DeviceIdentity::resolve(store.as_ref())?;
    let api = Arc::new(HttpAccessApi::new(&config)?);
    Ok(AccessController::new(api, Arc::new(ConsoleView::new()), identity, config))
}

async fn cmd_run(config: ControllerConfig) -> Result<()> {
    let controller = build_controller(config)?;
    info!("Device {}", controller.device_id());

    controller.start().await?;
    let mut states = controller.subscribe();

    loop {
        if states.borrow_and_update().is_terminal() {
            println!("Access denied. Restart the app to try again.");
            break;
        }
        tokio::select! {
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }
    }

    controller.stop();
    Ok(())
}

fn cmd_device_id(config: &ControllerConfig, reset: bool) -> Result<()> {
    let store = open_store(config)?;
    let identity = if reset {
        DeviceIdentity::reset(store.as_ref())?
    } else {
        DeviceIdentity::resolve(store.as_ref())?
    };
    println!("{}", identity);
    Ok(())
}

async fn cmd_check(config: ControllerConfig) -> Result<()> {
    let controller = build_controller(config)?;

    match controller.check_access().await {
        CheckOutcome::Allowed => println!("Access granted"),
        CheckOutcome::Warned(message) => println!("Access granted with warning: {}", message),
        CheckOutcome::Denied(notice) => {
            println!("{}", serde_json::to_string_pretty(&notice)?);
        }
        CheckOutcome::Skipped(reason) => println!("Check skipped (offline): {}", reason),
        CheckOutcome::AlreadyDenied => println!("Access already denied"),
    }

    if controller.state() == ControllerState::Denied {
        std::process::exit(2);
    }
    Ok(())
}

async fn cmd_calc(config: &ControllerConfig, input: RiskInput, save: bool, symbol: &str) -> Result<()> {
    let plan = calc::plan(&input)?;
    print!("{}", plan);

    if save {
        CalcSaveClient::new(&config.base_url).save(&plan, symbol).await?;
        println!("Calculation saved successfully!");
    }
    Ok(())
}

async fn cmd_cache(config: &ControllerConfig, action: CacheAction) -> Result<()> {
    let store = open_store(config)?;
    let cache = OfflineCache::new(store, &config.base_url);

    match action {
        CacheAction::Install => {
            let count = cache.install().await?;
            println!("Cached {} URLs in {}", count, cache.cache_name());
        }
        CacheAction::Fetch { path } => {
            let fetched = cache.fetch(&path).await?;
            let source = match fetched.source {
                FetchSource::Cache => "cache",
                FetchSource::Network => "network",
            };
            eprintln!(
                "{} {} ({} bytes from {})",
                fetched.response.status,
                path,
                fetched.response.body.len(),
                source
            );
            println!("{}", String::from_utf8_lossy(&fetched.response.body));
        }
    }
    Ok(())
}
