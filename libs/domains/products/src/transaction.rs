use tracing::warn;

use crate::error::StoreResult;
use crate::repository::TransactionCoordinator;

/// An open unit of work.
///
/// Settle it with [`finish`](Self::finish). A scope dropped without finishing
/// (for example when the surrounding future is cancelled) releases its handle
/// without committing.
pub struct TransactionScope<'a, C: TransactionCoordinator> {
    coordinator: &'a C,
    tx: C::Tx,
}

impl<'a, C: TransactionCoordinator> TransactionScope<'a, C> {
    pub async fn begin(coordinator: &'a C) -> StoreResult<Self> {
        let tx = coordinator.begin().await?;
        Ok(Self { coordinator, tx })
    }

    pub fn tx(&self) -> &C::Tx {
        &self.tx
    }

    /// Commit when `outcome` is `Ok`, otherwise roll back and hand the
    /// original error back. A failed rollback is logged, never returned.
    pub async fn finish<T>(self, outcome: StoreResult<T>) -> StoreResult<T> {
        let Self { coordinator, tx } = self;

        match outcome {
            Ok(value) => {
                coordinator.commit(tx).await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = coordinator.rollback(tx).await {
                    warn!(error = %rollback_err, "Rollback failed, handle released");
                }
                Err(err)
            }
        }
    }
}
