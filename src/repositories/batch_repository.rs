use futures::future::BoxFuture;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::entities::material_batch::{
    ActiveModel as BatchActiveModel, BatchStatus, Column, Entity as MaterialBatch,
    Model as BatchModel,
};
use crate::errors::ServiceError;
use crate::repositories::{BaseRepository, Repository};

/// Optional narrowing for batch listings.
#[derive(Clone, Copy, Debug, Default)]
pub struct BatchFilter {
    pub material_type_id: Option<Uuid>,
    pub status: Option<BatchStatus>,
}

/// Storage gateway for `material_batches`.
///
/// Every query is tenant scoped. Query methods take the connection
/// explicitly so the same code path serves both pool reads and
/// transactional reads.
#[derive(Debug)]
pub struct BatchRepository {
    base: BaseRepository,
}

impl BatchRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// See [`BaseRepository::with_transaction`].
    pub async fn with_transaction<F, T>(&self, callback: F) -> Result<T, ServiceError>
    where
        F: for<'c> FnOnce(&'c DatabaseTransaction) -> BoxFuture<'c, Result<T, ServiceError>>
            + Send,
        T: Send,
    {
        self.base.with_transaction(callback).await
    }

    /// Find one batch within the tenant's scope.
    pub async fn find_by_id(
        &self,
        conn: &impl ConnectionTrait,
        tenant_id: Uuid,
        batch_id: Uuid,
    ) -> Result<Option<BatchModel>, ServiceError> {
        MaterialBatch::find_by_id(batch_id)
            .filter(Column::TenantId.eq(tenant_id))
            .one(conn)
            .await
            .map_err(|e| ServiceError::DatabaseError(e))
    }

    /// Same lookup, but holds an exclusive row lock until the surrounding
    /// transaction ends. SQLite has no row locks and drops the clause; its
    /// single-writer transactions serialize these updates regardless.
    pub async fn find_for_update(
        &self,
        txn: &DatabaseTransaction,
        tenant_id: Uuid,
        batch_id: Uuid,
    ) -> Result<Option<BatchModel>, ServiceError> {
        MaterialBatch::find_by_id(batch_id)
            .filter(Column::TenantId.eq(tenant_id))
            .lock_exclusive()
            .one(txn)
            .await
            .map_err(|e| ServiceError::DatabaseError(e))
    }

    /// Open batches with stock left for one material type, oldest intake
    /// first with batch id as the tie break.
    pub async fn find_candidates(
        &self,
        conn: &impl ConnectionTrait,
        tenant_id: Uuid,
        material_type_id: Uuid,
    ) -> Result<Vec<BatchModel>, ServiceError> {
        MaterialBatch::find()
            .filter(Column::TenantId.eq(tenant_id))
            .filter(Column::MaterialTypeId.eq(material_type_id))
            .filter(Column::Status.is_in([BatchStatus::Available, BatchStatus::Reserved]))
            .filter(Column::RemainingQuantity.gt(Decimal::ZERO))
            .order_by_asc(Column::InboundDate)
            .order_by_asc(Column::BatchId)
            .all(conn)
            .await
            .map_err(|e| ServiceError::DatabaseError(e))
    }

    pub async fn insert(
        &self,
        conn: &impl ConnectionTrait,
        batch: BatchActiveModel,
    ) -> Result<BatchModel, ServiceError> {
        batch
            .insert(conn)
            .await
            .map_err(|e| ServiceError::DatabaseError(e))
    }

    pub async fn update(
        &self,
        conn: &impl ConnectionTrait,
        batch: BatchActiveModel,
    ) -> Result<BatchModel, ServiceError> {
        batch
            .update(conn)
            .await
            .map_err(|e| ServiceError::DatabaseError(e))
    }

    /// Paginated tenant listing, newest intake first. `page` is 1-based.
    pub async fn list(
        &self,
        conn: &impl ConnectionTrait,
        tenant_id: Uuid,
        filter: &BatchFilter,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<BatchModel>, u64), ServiceError> {
        let mut query = MaterialBatch::find().filter(Column::TenantId.eq(tenant_id));
        if let Some(material_type_id) = filter.material_type_id {
            query = query.filter(Column::MaterialTypeId.eq(material_type_id));
        }
        if let Some(status) = filter.status {
            query = query.filter(Column::Status.eq(status));
        }

        let paginator = query
            .order_by_desc(Column::InboundDate)
            .order_by_asc(Column::BatchId)
            .paginate(conn, page_size);

        let total = paginator
            .num_items()
            .await
            .map_err(|e| ServiceError::DatabaseError(e))?;

        let batches = paginator
            .fetch_page(page.max(1) - 1)
            .await
            .map_err(|e| ServiceError::DatabaseError(e))?;

        Ok((batches, total))
    }
}

impl Repository for BatchRepository {
    fn get_db(&self) -> &DatabaseConnection {
        self.base.get_db()
    }
}
