/**
 * Unit-of-Work Coordinator
 *
 * Every multi-step write in the backend (create a case with its chats and
 * enrollments, change a status and post the system message, delete a message
 * and append the audit entry) runs through a single database transaction:
 * either all steps land or none do.
 *
 * Side effects that must NOT roll back with the transaction (push
 * notifications, proposal emails) are collected during the operation and
 * executed by the caller only after the commit succeeds.
 */

use futures_util::future::BoxFuture;
use sqlx::{PgPool, Postgres, Transaction};

use crate::shared::error::{CoreError, CoreResult};

/// Run `op` inside a transaction, committing on `Ok` and rolling back on
/// `Err`.
///
/// The closure receives the open transaction; store functions that take
/// `&mut PgConnection` are driven through it with `&mut *tx`.
///
/// # Arguments
/// * `pool` - Database connection pool
/// * `op` - The multi-step operation to run atomically
///
/// # Returns
/// The operation's value after a successful commit, or the operation's error
/// after rollback
pub async fn run<T, F>(pool: &PgPool, op: F) -> CoreResult<T>
where
    F: for<'t> FnOnce(&'t mut Transaction<'static, Postgres>) -> BoxFuture<'t, CoreResult<T>>,
{
    let mut tx = pool.begin().await.map_err(CoreError::from)?;

    match op(&mut tx).await {
        Ok(value) => {
            tx.commit().await.map_err(CoreError::from)?;
            Ok(value)
        }
        Err(err) => {
            // The error from the operation is the one the caller cares
            // about; a rollback failure is only logged.
            if let Err(rollback_err) = tx.rollback().await {
                tracing::error!("Transaction rollback failed: {}", rollback_err);
            }
            Err(err)
        }
    }
}
