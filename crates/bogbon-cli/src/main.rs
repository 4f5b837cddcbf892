use std::path::PathBuf;

use anyhow::Context;
use bogbon_core::AppConfig;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "bogbon-cli")]
#[command(about = "Bogbon store operator command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Apply pending database migrations.
    Migrate,
    /// Check database connectivity.
    Ping,
    /// Insert categories and products from a YAML catalog file.
    Seed {
        /// Catalog file; defaults to `BOGBON_CATALOG_PATH`.
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("bogbon-cli: run with --help to list commands");
        return Ok(());
    };

    let config = bogbon_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match command {
        Commands::Migrate => migrate(&config).await,
        Commands::Ping => ping(&config).await,
        Commands::Seed { path } => seed(&config, path).await,
    }
}

async fn connect(config: &AppConfig) -> anyhow::Result<sqlx::PgPool> {
    let pool_config = bogbon_db::PoolConfig::from_app_config(config);
    bogbon_db::connect_pool(&config.database_url, pool_config)
        .await
        .context("failed to connect to database")
}

async fn migrate(config: &AppConfig) -> anyhow::Result<()> {
    let pool = connect(config).await?;
    let applied = bogbon_db::run_migrations(&pool).await?;
    tracing::info!(applied, "migrations complete");
    println!("applied {applied} migration(s)");
    Ok(())
}

async fn ping(config: &AppConfig) -> anyhow::Result<()> {
    let pool = connect(config).await?;
    bogbon_db::health_check(&pool).await?;
    println!("database ok");
    Ok(())
}

async fn seed(config: &AppConfig, path: Option<PathBuf>) -> anyhow::Result<()> {
    let path = path.unwrap_or_else(|| config.catalog_path.clone());
    let catalog = bogbon_core::load_catalog(&path)
        .with_context(|| format!("failed to load catalog from {}", path.display()))?;
    tracing::info!(
        path = %path.display(),
        categories = catalog.categories.len(),
        products = catalog.products.len(),
        "catalog file validated"
    );

    let pool = connect(config).await?;
    let summary = bogbon_db::seed_catalog(&pool, &catalog).await?;
    println!(
        "seeded {} categories, {} products, {} images ({} categories and {} products already present)",
        summary.categories,
        summary.products,
        summary.images,
        summary.existing_categories,
        summary.existing_products
    );
    Ok(())
}

#[cfg(test)]
mod tests;
