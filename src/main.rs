use anyhow::{bail, Context, Result};
use api_client::YahooClient;
use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use configuration::{DEFAULT_CONFIG_FILE, DEFAULT_SECTION};
use core_types::{DataVendor, Exchange, DEFAULT_EXCHANGE_TIMEZONE};
use database::{
    connection_details, create_database, fetch_all, fetch_many, run_migrations, show_databases,
    MySqlConnector, Session,
};
use indicatif::{ProgressBar, ProgressStyle};
use loader::{
    insert_data_vendor, insert_exchange, insert_price_data, insert_symbols, symbol_tickers,
    PriceLoadRequest, DEFAULT_RECONNECT_ATTEMPTS, YAHOO_VENDOR_ID,
};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// The main entry point for the securities master loader.
#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from an optional .env file
    dotenvy::dotenv().ok();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();
    let today = Utc::now().date_naive();

    match cli.command {
        Commands::InitDb => handle_init_db(&cli.db).await,
        Commands::Vendor(args) => handle_vendor(&cli.db, args, today).await,
        Commands::Exchange(args) => handle_exchange(&cli.db, args, today).await,
        Commands::Symbols(args) => handle_symbols(&cli.db, args, today).await,
        Commands::Prices(args) => handle_prices(&cli.db, args, today).await,
        Commands::Query(args) => handle_query(&cli.db, args).await,
        Commands::Databases => handle_databases(&cli.db).await,
        Commands::Details => handle_details(&cli.db).await,
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Loads vendors, exchanges, symbols and daily prices into a MySQL securities master.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    db: DbArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Where the credentials live and which schema to use.
#[derive(Args)]
struct DbArgs {
    /// Directory holding the credentials file.
    #[arg(long, global = true, env = "SECMASTER_CONFIG_DIR", default_value = ".")]
    config_dir: PathBuf,

    /// Name of the INI credentials file inside the config directory.
    #[arg(long, global = true, env = "SECMASTER_CONFIG_FILE", default_value = DEFAULT_CONFIG_FILE)]
    config_file: String,

    /// Section of the credentials file to read.
    #[arg(long, global = true, env = "SECMASTER_SECTION", default_value = DEFAULT_SECTION)]
    section: String,

    /// Schema to connect to. Server-wide when omitted.
    #[arg(long, global = true, env = "SECMASTER_DATABASE")]
    database: Option<String>,
}

impl DbArgs {
    fn connector(&self) -> Result<MySqlConnector> {
        MySqlConnector::from_config_file(
            &self.config_dir,
            &self.config_file,
            &self.section,
            self.database.as_deref(),
        )
        .with_context(|| {
            format!(
                "Failed to read credentials from {}",
                self.config_dir.join(&self.config_file).display()
            )
        })
    }

    fn require_database(&self) -> Result<&str> {
        match self.database.as_deref() {
            Some(name) => Ok(name),
            None => bail!("This command needs a schema: pass --database or set SECMASTER_DATABASE."),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create the schema if needed and apply the table migrations.
    InitDb,
    /// Insert a data vendor.
    Vendor(VendorArgs),
    /// Insert an exchange.
    Exchange(ExchangeArgs),
    /// Insert every symbol from a CSV file.
    Symbols(SymbolsArgs),
    /// Download daily prices from Yahoo Finance and insert them.
    Prices(PricesArgs),
    /// Run a read query and print the result.
    Query(QueryArgs),
    /// List the databases on the server.
    Databases,
    /// Show details about the current connection.
    Details,
}

#[derive(Args)]
struct VendorArgs {
    #[arg(long, default_value_t = YAHOO_VENDOR_ID)]
    id: i32,

    #[arg(long, default_value = "Yahoo Finance")]
    name: String,

    #[arg(long, default_value = "https://finance.yahoo.com")]
    website_url: String,

    #[arg(long, default_value = "")]
    support_email: String,

    /// First time the vendor was entered (format: YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    created_date: Option<NaiveDate>,
}

#[derive(Args)]
struct ExchangeArgs {
    /// Market code, e.g. "US".
    #[arg(long)]
    exchange_id: String,

    /// e.g. "NYSE".
    #[arg(long)]
    abbrev: String,

    #[arg(long)]
    name: String,

    #[arg(long)]
    city: String,

    #[arg(long)]
    country: String,

    #[arg(long)]
    currency: String,

    /// IANA timezone of the exchange.
    #[arg(long, default_value = DEFAULT_EXCHANGE_TIMEZONE)]
    timezone: String,

    /// First time the exchange was entered (format: YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    created_date: Option<NaiveDate>,
}

#[derive(Args)]
struct SymbolsArgs {
    /// CSV file with a header row naming the `symbol` columns.
    file: PathBuf,

    /// First time the symbols were entered (format: YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    created_date: Option<NaiveDate>,
}

#[derive(Args)]
struct PricesArgs {
    /// Tickers with their market code, e.g. "MMM US".
    #[arg(required_unless_present = "all_symbols", conflicts_with = "all_symbols")]
    tickers: Vec<String>,

    /// Backfill every ticker in the `symbol` table.
    #[arg(long)]
    all_symbols: bool,

    /// The start date for data download (format: YYYY-MM-DD).
    #[arg(long, default_value = "1999-12-31")]
    from: NaiveDate,

    /// The end date for data download (format: YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    to: Option<NaiveDate>,

    /// Stamped into `created_date` (format: YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    created_date: Option<NaiveDate>,

    #[arg(long, default_value_t = YAHOO_VENDOR_ID)]
    vendor_id: i32,

    /// Connection attempts when opening or reopening a session.
    #[arg(long, default_value_t = DEFAULT_RECONNECT_ATTEMPTS)]
    reconnect_attempts: u32,
}

#[derive(Args)]
struct QueryArgs {
    /// The SQL to run.
    sql: String,

    /// Print at most this many rows.
    #[arg(long)]
    limit: Option<usize>,
}

// ==============================================================================
// Command Logic
// ==============================================================================

async fn handle_init_db(db: &DbArgs) -> Result<()> {
    let name = db.require_database()?;
    let connector = db.connector()?;
    create_database(&connector, name).await?;
    run_migrations(&connector)
        .await
        .context("Failed to run database migrations")?;
    println!("Database '{name}' is ready.");
    Ok(())
}

async fn handle_vendor(db: &DbArgs, args: VendorArgs, today: NaiveDate) -> Result<()> {
    let vendor = DataVendor {
        data_vendor_id: args.id,
        name: args.name,
        website_url: args.website_url,
        support_email: args.support_email,
        created_date: args.created_date.unwrap_or(today),
    };
    let inserted = insert_data_vendor(&db.connector()?, &vendor, today).await?;
    println!("Inserted {inserted} vendor row(s).");
    Ok(())
}

async fn handle_exchange(db: &DbArgs, args: ExchangeArgs, today: NaiveDate) -> Result<()> {
    let exchange = Exchange {
        exchange_id: args.exchange_id,
        abbrev: args.abbrev,
        name: args.name,
        city: args.city,
        country: args.country,
        currency: args.currency,
        timezone: args.timezone,
        created_date: args.created_date.unwrap_or(today),
    };
    let inserted = insert_exchange(&db.connector()?, &exchange, Utc::now(), today).await?;
    println!("Inserted {inserted} exchange row(s).");
    Ok(())
}

async fn handle_symbols(db: &DbArgs, args: SymbolsArgs, today: NaiveDate) -> Result<()> {
    let created_date = args.created_date.unwrap_or(today);
    let inserted = insert_symbols(&db.connector()?, &args.file, created_date, today)
        .await
        .with_context(|| format!("Failed to load symbols from {}", args.file.display()))?;
    println!("Inserted {inserted} symbol row(s).");
    Ok(())
}

/// Handles the orchestration of the price backfill.
async fn handle_prices(db: &DbArgs, args: PricesArgs, today: NaiveDate) -> Result<()> {
    let connector = db.connector()?;
    let tickers = if args.all_symbols {
        symbol_tickers(&connector).await?
    } else {
        args.tickers
    };
    let end = args.to.unwrap_or(today);
    if end < args.from {
        bail!("--to ({end}) is before --from ({})", args.from);
    }

    println!(
        "Starting price backfill for {} ticker(s) from {} to {}",
        tickers.len(),
        args.from,
        end
    );

    let mut request = PriceLoadRequest::new(
        tickers,
        args.from,
        end,
        args.created_date.unwrap_or(today),
        today,
    );
    request.data_vendor_id = args.vendor_id;
    request.reconnect_attempts = args.reconnect_attempts;

    let provider = YahooClient::new()?;

    // Set up the progress bar
    let progress_bar = ProgressBar::new(request.tickers.len() as u64);
    progress_bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")?
            .progress_chars("#>-"),
    );

    let result = insert_price_data(&connector, &provider, &request, &progress_bar).await;
    match &result {
        Ok(_) => progress_bar.finish_with_message("Backfill complete!"),
        Err(_) => progress_bar.abandon_with_message("Backfill stopped."),
    }
    let summary = result?;

    println!(
        "Inserted {} row(s) for {} ticker(s).",
        summary.rows, summary.tickers
    );
    if !summary.skipped.is_empty() {
        println!("No data for: {}", summary.skipped.join(", "));
    }
    Ok(())
}

async fn handle_query(db: &DbArgs, args: QueryArgs) -> Result<()> {
    let connector = db.connector()?;
    let mut session = connector.connect_mysql().await?;
    // Both helpers print the rows and report failures themselves.
    match args.limit {
        Some(size) => fetch_many(&mut session, &args.sql, size).await,
        None => fetch_all(&mut session, &args.sql).await,
    };
    session.close().await?;
    Ok(())
}

async fn handle_databases(db: &DbArgs) -> Result<()> {
    let connector = db.connector()?;
    let mut session = connector.connect_mysql().await?;
    for name in show_databases(&mut session).await {
        println!("{name}");
    }
    session.close().await?;
    Ok(())
}

async fn handle_details(db: &DbArgs) -> Result<()> {
    let connector = db.connector()?;
    let mut session = connector.connect_mysql().await?;
    let details = connection_details(&mut session).await?;
    println!("{details}");
    session.close().await?;
    Ok(())
}
