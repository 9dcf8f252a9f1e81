//! Catalog schema CLI.
//!
//! ```text
//! DATABASE_URL=postgres://... cargo run -p migration -- up
//! DATABASE_URL=postgres://... cargo run -p migration -- fresh
//! ```

use migration::Migrator;
use sea_orm_migration::cli;

#[tokio::main]
async fn main() {
    cli::run_cli(Migrator).await;
}
