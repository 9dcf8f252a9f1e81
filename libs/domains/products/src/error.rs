use sea_orm::sqlx::postgres::PgDatabaseError;
use sea_orm::{DbErr, RuntimeErr, SqlErr};
use thiserror::Error;

/// Raw failure reported by a store, before classification
#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique constraint rejected the write; carries the backend's detail,
    /// e.g. `Key (slug)=(mens_tee) already exists.`
    #[error("{0}")]
    UniqueViolation(String),

    #[error(transparent)]
    Database(DbErr),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl From<DbErr> for StoreError {
    fn from(err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(message)) => {
                StoreError::UniqueViolation(postgres_detail(&err).unwrap_or(message))
            }
            _ => StoreError::Database(err),
        }
    }
}

/// `DETAIL` field of a PostgreSQL error, which names the conflicting key.
/// `sql_err()` only exposes the primary message.
fn postgres_detail(err: &DbErr) -> Option<String> {
    let (DbErr::Exec(RuntimeErr::SqlxError(source)) | DbErr::Query(RuntimeErr::SqlxError(source))) =
        err
    else {
        return None;
    };

    source
        .as_database_error()?
        .try_downcast_ref::<PgDatabaseError>()?
        .detail()
        .map(str::to_owned)
}

#[derive(Debug, Error)]
pub enum ProductError {
    /// Carries the lookup term exactly as the caller supplied it
    #[error("Product with id: #{0} not found.")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Unexpected error, check logs")]
    Internal,
}

pub type ProductResult<T> = Result<T, ProductError>;

impl ProductError {
    /// Classify a store failure. Anything that is not a unique violation is
    /// logged here and surfaced as [`ProductError::Internal`].
    pub fn from_store(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation(detail) => ProductError::Conflict(detail),
            StoreError::Database(source) => {
                tracing::error!(error = %source, "Unexpected storage failure");
                ProductError::Internal
            }
        }
    }
}
