//! Stockroom command-line client
//!
//! Scan-driven inventory operations against the configured cloud datasheet.
//! Product lookups are served from the local cache; run `sync` to refresh it.

use std::io::BufRead;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use stockroom_client::settings::keys;
use stockroom_client::store::{record_inbound, unscanned, InventorySession, OutboundBasket};
use stockroom_client::{AppConfig, AppContext, ProviderKind, ProviderRegistry, Record};
use stockroom_common::config::{
    load_toml_config_or_default, RootFolderInitializer, RootFolderResolver,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments for stockroom
#[derive(Parser, Debug)]
#[command(name = "stockroom")]
#[command(about = "Inventory client for AITable, Vika and Bika datasheets")]
#[command(version)]
struct Args {
    /// Folder holding the local database
    #[arg(short, long, global = true, env = "STOCKROOM_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List supported cloud providers
    Providers,

    /// Verify credentials against the backend and save them
    Setup(SetupArgs),

    /// Show configuration and cache state
    Status,

    /// Refresh the local product cache from the products datasheet
    Sync {
        /// View to restrict the sync to (defaults to the configured view)
        #[arg(long)]
        view: Option<String>,
    },

    /// Look up a scanned code in the local cache
    Lookup { code: String },

    /// Record stock arriving for one product
    Inbound {
        code: String,
        #[arg(short, long, default_value_t = 1)]
        qty: u32,
    },

    /// Record stock leaving for one or more products
    Outbound {
        #[arg(required = true)]
        codes: Vec<String>,
        /// Quantity applied to every listed product
        #[arg(short, long, default_value_t = 1)]
        qty: u32,
        #[arg(short, long)]
        borrower: Option<String>,
    },

    /// Read scanned codes from stdin and report products that were not seen
    Stocktake,

    /// Forget configuration and cached records
    Logout,
}

#[derive(clap::Args, Debug)]
struct SetupArgs {
    #[arg(long, default_value = "aitable")]
    provider: String,
    #[arg(long, env = "STOCKROOM_API_KEY")]
    api_key: String,
    /// Workspace (space) id
    #[arg(long)]
    workspace: String,
    /// Products datasheet id
    #[arg(long)]
    products: Option<String>,
    /// Transactions datasheet id
    #[arg(long)]
    transactions: Option<String>,
    /// Operator name written to ledger rows
    #[arg(long)]
    employee: String,
    #[arg(long)]
    view: Option<String>,
    #[arg(long)]
    sku_field: Option<String>,
    #[arg(long)]
    type_field: Option<String>,
    #[arg(long)]
    quantity_field: Option<String>,
    #[arg(long)]
    operator_field: Option<String>,
    #[arg(long)]
    time_field: Option<String>,
    #[arg(long)]
    borrower_field: Option<String>,
}

impl SetupArgs {
    fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            (keys::CLOUD_PROVIDER, self.provider.trim().to_ascii_lowercase()),
            (keys::API_KEY, self.api_key.clone()),
            (keys::WORKSPACE_ID, self.workspace.clone()),
            (keys::EMPLOYEE_NAME, self.employee.clone()),
        ];
        let optional = [
            (keys::PRODUCTS_DATASHEET_ID, &self.products),
            (keys::TRANSACTIONS_DATASHEET_ID, &self.transactions),
            (keys::VIEW_ID, &self.view),
            (keys::SKU_FIELD, &self.sku_field),
            (keys::TYPE_FIELD, &self.type_field),
            (keys::QUANTITY_FIELD, &self.quantity_field),
            (keys::OPERATOR_FIELD, &self.operator_field),
            (keys::TIME_FIELD, &self.time_field),
            (keys::BORROWER_FIELD, &self.borrower_field),
        ];
        for (key, value) in optional {
            if let Some(value) = value {
                pairs.push((key, value.clone()));
            }
        }
        pairs
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let toml_config = load_toml_config_or_default();

    // RUST_LOG wins over the config file level
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&toml_config.logging.level)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let root_folder = RootFolderResolver::new()
        .with_cli_arg(args.root_folder.clone())
        .with_toml(&toml_config)
        .resolve();
    let initializer = RootFolderInitializer::new(root_folder);
    initializer
        .ensure_directory_exists()
        .context("Failed to create root folder")?;
    info!("Root folder: {}", initializer.root_folder().display());

    let mut ctx = AppContext::open(&initializer.database_path(), &toml_config.providers)
        .await
        .context("Failed to open local database")?;

    match args.command {
        Command::Providers => list_providers(),
        Command::Setup(setup) => run_setup(&mut ctx, setup).await,
        Command::Status => show_status(&ctx).await,
        Command::Sync { view } => run_sync(&ctx, view).await,
        Command::Lookup { code } => run_lookup(&ctx, &code).await,
        Command::Inbound { code, qty } => run_inbound(&ctx, &code, qty).await,
        Command::Outbound {
            codes,
            qty,
            borrower,
        } => run_outbound(&ctx, &codes, qty, borrower).await,
        Command::Stocktake => run_stocktake(&ctx).await,
        Command::Logout => {
            ctx.logout().await.context("Logout failed")?;
            println!("Configuration and cache cleared");
            Ok(())
        }
    }
}

fn list_providers() -> Result<()> {
    for info in ProviderRegistry::available() {
        println!("{:<8} {:<8} {}", info.id, info.label, info.description);
    }
    Ok(())
}

async fn run_setup(ctx: &mut AppContext, setup: SetupArgs) -> Result<()> {
    let pairs = setup.pairs();
    let candidate = AppConfig::from_pairs(pairs.clone());

    let schema = ctx
        .verify_setup(&candidate)
        .await
        .context("Setup verification failed")?;

    ctx.save_config(pairs).await.context("Failed to save configuration")?;

    println!(
        "Connected to {} ({} fields)",
        candidate.provider_kind()?.label(),
        schema.fields.len()
    );
    if schema.field(candidate.code_field()).is_none() {
        warn!(field = candidate.code_field(), "Code field not found in datasheet schema");
    }
    Ok(())
}

async fn show_status(ctx: &AppContext) -> Result<()> {
    let config = ctx.config();
    let kind = config.provider_kind().unwrap_or(ProviderKind::Aitable);

    println!("Provider:    {}", kind.label());
    println!("Configured:  {}", if config.is_configured() { "yes" } else { "no" });
    for key in config.missing_required() {
        println!("  missing {}", key);
    }

    let count = ctx.cache().count_records().await?;
    println!("Cached:      {} records", count);

    let last_sync = ctx
        .cache()
        .all_records()
        .await?
        .iter()
        .map(|r| r.updated_at)
        .max();
    match last_sync {
        Some(at) => println!("Last sync:   {}", at.to_rfc3339()),
        None => println!("Last sync:   never"),
    }
    Ok(())
}

async fn run_sync(ctx: &AppContext, view: Option<String>) -> Result<()> {
    let store = ctx.record_store()?;
    let view = view.or_else(|| ctx.config().view_id().map(str::to_string));

    let count = store.sync_from_remote(view.as_deref()).await?;

    println!("Synced {} records", count);
    Ok(())
}

/// Cached record for `code`, or an error naming the miss
async fn find_cached(ctx: &AppContext, code: &str) -> Result<Record> {
    let store = ctx.record_store()?;
    store.load_from_cache().await?;

    match store.get_by_code(code.trim()) {
        Some(record) => Ok(record),
        None => bail!("No product with code {} in the local cache (try `stockroom sync`)", code),
    }
}

async fn run_lookup(ctx: &AppContext, code: &str) -> Result<()> {
    let record = find_cached(ctx, code).await?;
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

fn require_employee(ctx: &AppContext) -> Result<String> {
    ctx.config()
        .employee_name()
        .map(str::to_string)
        .context("employee_name is not configured")
}

async fn run_inbound(ctx: &AppContext, code: &str, qty: u32) -> Result<()> {
    if qty == 0 {
        bail!("quantity must be at least 1");
    }
    let record = find_cached(ctx, code).await?;
    let employee = require_employee(ctx)?;
    let ledger = ctx.ledger_provider()?;

    let entry = record_inbound(
        ledger.as_ref(),
        &ctx.config().ledger_fields(),
        &record,
        qty,
        &employee,
    )
    .await?;

    println!("Inbound {} x{} recorded ({})", record.external_code, qty, entry.id);
    Ok(())
}

async fn run_outbound(
    ctx: &AppContext,
    codes: &[String],
    qty: u32,
    borrower: Option<String>,
) -> Result<()> {
    let store = ctx.record_store()?;
    store.load_from_cache().await?;

    let mut basket = OutboundBasket::new();
    for code in codes {
        let Some(record) = store.get_by_code(code.trim()) else {
            bail!("No product with code {} in the local cache", code);
        };
        let id = record.id.clone();
        if basket.add(record) {
            basket.update_quantity(&id, qty)?;
        }
    }
    if let Some(borrower) = borrower {
        basket.set_borrower(borrower);
    }

    let employee = require_employee(ctx)?;
    let ledger = ctx.ledger_provider()?;
    let created = basket
        .submit(ledger.as_ref(), &ctx.config().ledger_fields(), &employee)
        .await?;

    println!("Outbound recorded for {} products", created.len());
    Ok(())
}

async fn run_stocktake(ctx: &AppContext) -> Result<()> {
    let store = ctx.record_store()?;
    store.load_from_cache().await?;

    let mut session = InventorySession::new();
    session.start();

    for line in std::io::stdin().lock().lines() {
        let line = line?;
        let code = line.trim();
        if code.is_empty() {
            continue;
        }
        if store.get_by_code(code).is_none() {
            warn!(code, "Scanned code not in catalog");
        }
        session.mark_scanned(code)?;
    }

    let entries = session.end();
    let missing = unscanned(&store.records(), &entries);

    println!("Scanned {} codes, {} not scanned:", entries.len(), missing.len());
    for code in missing {
        println!("  {}", code);
    }
    Ok(())
}
