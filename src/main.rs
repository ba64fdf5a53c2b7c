use std::sync::Arc;

use sqlx::sqlite::SqlitePoolOptions;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use llwatcher::catalog::{CatalogClient, SheetsCatalog};
use llwatcher::config::AppConfig;
use llwatcher::error::RunError;
use llwatcher::playback::BrowserDriver;
use llwatcher::repository::Ledger;
use llwatcher::services::{CycleScheduler, refresh_ledger};
use llwatcher::services::scheduler::BREAK_LINE;

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "llwatcher=info".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();

    if let Err(e) = run().await {
        error!("run aborted: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), RunError> {
    let config = AppConfig::new_from_env()?;
    print_welcome(&config);

    // Link shape is checked here, before anything is fetched or written.
    let catalog = SheetsCatalog::new(&config)?;

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;

    let ledger = Ledger::new(pool, catalog.sheet_id())?;
    let resumed = ledger.init().await?;

    let snapshot = catalog.fetch_courses().await?;
    info!(courses = snapshot.len(), "loaded course sheet");

    if resumed {
        // Keep attempt history from the previous run; only membership and
        // stale in-flight markers get refreshed.
        let reset = ledger.reset_in_progress().await?;
        if reset > 0 {
            info!(reset, "cleared in-flight markers from an interrupted run");
        }
        refresh_ledger(&ledger, &snapshot).await?;
    } else {
        ledger.replace_all(&snapshot).await?;
    }

    let driver = BrowserDriver::new(&config);
    let scheduler = CycleScheduler::new(
        ledger,
        Arc::new(catalog),
        Arc::new(driver),
        config.max_tabs,
        config.cycle_hours,
    );
    scheduler.run().await?;

    println!("All courses watched out. Bye :)");
    Ok(())
}

fn print_welcome(config: &AppConfig) {
    println!("{}", BREAK_LINE);
    println!("LinkedIn Learning watcher");
    println!("{}", BREAK_LINE);
    println!("Required sheet schema: url\tcertified\tcourse_hour");
    println!("{}", BREAK_LINE);
    println!("Cycle time: {} hour(s)", config.cycle_hours);
    println!("Max tabs: {}", config.max_tabs);
    println!("Sheet: {}", config.sheet_url);
    println!("Database: {}", config.database_url);
    println!("Browser: {}", config.browser_command);
    println!("{}", BREAK_LINE);
}
