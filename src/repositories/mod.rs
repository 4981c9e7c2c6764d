use futures::future::BoxFuture;
use metrics::{counter, histogram};
use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionError, TransactionTrait};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::ServiceError;

pub mod batch_repository;

/// Repository trait for common database operations
pub trait Repository {
    fn get_db(&self) -> &DatabaseConnection;
}

#[derive(Debug)]
pub struct BaseRepository {
    db: Arc<DatabaseConnection>,
}

impl BaseRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Scoped unit of work: `callback` runs inside a single transaction.
    /// Commit happens only when the closure returns `Ok`; any error rolls
    /// back every write made inside it.
    pub async fn with_transaction<F, T>(&self, callback: F) -> Result<T, ServiceError>
    where
        F: for<'c> FnOnce(&'c DatabaseTransaction) -> BoxFuture<'c, Result<T, ServiceError>>
            + Send,
        T: Send,
    {
        let transaction_id = Uuid::new_v4();
        let start = std::time::Instant::now();

        debug!(transaction_id = %transaction_id, "Starting database transaction");
        counter!("lotkeeper_db.transaction.started", 1);

        let result = self.db.transaction::<_, T, ServiceError>(callback).await;

        let elapsed = start.elapsed();
        histogram!("lotkeeper_db.transaction.duration", elapsed);

        match &result {
            Ok(_) => {
                counter!("lotkeeper_db.transaction.committed", 1);
                debug!(
                    transaction_id = %transaction_id,
                    "Transaction committed successfully in {:?}", elapsed
                );
            }
            Err(_) => {
                counter!("lotkeeper_db.transaction.rolled_back", 1);
                warn!(
                    transaction_id = %transaction_id,
                    "Transaction rolled back after {:?}", elapsed
                );
            }
        }

        result.map_err(|err| match err {
            TransactionError::Connection(db_err) => ServiceError::DatabaseError(db_err),
            TransactionError::Transaction(service_err) => service_err,
        })
    }
}

impl Repository for BaseRepository {
    fn get_db(&self) -> &DatabaseConnection {
        &self.db
    }
}
