//! Catalog Seeder
//!
//! Resets the product catalog to a fixed sample data set: connects with
//! retry, checks health, applies migrations, deletes every product and
//! inserts the samples through `ProductService`.

use clap::Parser;
use core_config::tracing::{init_tracing, install_color_eyre};
use database::RetryPolicy;
use database::postgres::{check_health, connect_with_retry, run_migrations};
use domain_products::{PgCatalogStore, ProductService};
use eyre::{Result, WrapErr};
use migration::Migrator;
use tracing::info;
use validator::Validate;

mod catalog;
mod config;
mod seeder;

use config::Config;

#[derive(Parser, Debug)]
#[command(name = "catalog-seed")]
#[command(about = "Reset the product catalog to the sample data set")]
struct Cli {
    /// Assume the schema is already up to date
    #[arg(long)]
    skip_migrations: bool,

    /// Validate and print the sample catalog without touching the database
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    install_color_eyre();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    init_tracing(&config.environment);

    let products = catalog::sample_products();
    for product in &products {
        product
            .validate()
            .wrap_err_with(|| format!("Invalid sample product '{}'", product.title))?;
    }

    if cli.dry_run {
        for product in &products {
            info!(title = %product.title, slug = %product.slug, images = product.images.len(), "Would seed product");
        }
        info!(count = products.len(), "Dry run complete, database untouched");
        return Ok(());
    }

    info!("Connecting to database...");
    let db = connect_with_retry(&config.database, RetryPolicy::default()).await?;
    check_health(&db).await?;

    if cli.skip_migrations {
        info!("Skipping migrations");
    } else {
        run_migrations::<Migrator>(&db, "catalog-seed").await?;
    }

    let service = ProductService::with_backend(PgCatalogStore::new(db));
    let report = seeder::reseed(&service, products).await?;

    info!(
        removed = report.removed,
        inserted = report.inserted,
        images = report.images,
        "Catalog seeded"
    );

    Ok(())
}
