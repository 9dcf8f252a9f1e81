//! Products Domain
//!
//! Persistence for the product catalog: products that own an ordered list of
//! images, stored in PostgreSQL through SeaORM.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │   Service   │  ← Orchestration, error classification
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │ Transaction │  ← Scope guard over a TransactionCoordinator
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │ Repository  │  ← Store traits + in-memory / PostgreSQL backends
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │   Models    │  ← Aggregate, DTOs, views
//! └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use domain_products::{InMemoryCatalog, Pagination, ProductService};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let service = ProductService::with_backend(InMemoryCatalog::new());
//! let page = service.list_products(Pagination::new(10, 0)).await?;
//! # Ok(())
//! # }
//! ```
//!
//! With PostgreSQL, build the service over
//! [`PgCatalogStore`](postgres::PgCatalogStore) instead.

pub mod entity;
pub mod error;
pub mod lookup;
pub mod models;
pub mod postgres;
pub mod repository;
pub mod service;
pub mod transaction;

// Re-export commonly used types
pub use error::{ProductError, ProductResult, StoreError, StoreResult};
pub use lookup::{Lookup, NaturalKey};
pub use models::{
    CreateProduct, Gender, Pagination, Product, ProductImage, ProductView, UpdateProduct, slugify,
};
pub use postgres::PgCatalogStore;
pub use repository::{
    InMemoryCatalog, InMemoryTx, ProductImageStore, ProductStore, TransactionCoordinator,
};
pub use service::ProductService;
pub use transaction::TransactionScope;
