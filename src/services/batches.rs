//! Batch Intake and Query Surface
//!
//! Records inbound material batches and serves tenant-scoped lookups and
//! listings over the batch store.

use chrono::{DateTime, NaiveDate, Utc};
use lazy_static::lazy_static;
use prometheus::IntCounter;
use rust_decimal::Decimal;
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::entities::material_batch::{self, BatchStatus};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::repositories::batch_repository::{BatchFilter, BatchRepository};
use crate::repositories::Repository;

lazy_static! {
    static ref BATCH_INTAKES: IntCounter = IntCounter::new(
        "lotkeeper_batch_intakes_total",
        "Total number of material batches received"
    )
    .expect("metric can be created");
    static ref BATCH_INTAKE_FAILURES: IntCounter = IntCounter::new(
        "lotkeeper_batch_intake_failures_total",
        "Total number of rejected batch intakes"
    )
    .expect("metric can be created");
}

/// Inbound batch registration.
#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
pub struct ReceiveBatchRequest {
    pub material_type_id: Uuid,
    pub supplier_id: Uuid,
    #[validate(custom = "validate_positive_quantity")]
    pub inbound_quantity: Decimal,
    #[validate(custom = "validate_non_negative_price")]
    pub unit_price: Decimal,
    pub inbound_date: NaiveDate,
    pub expiry_date: Option<NaiveDate>,
    pub production_date: Option<NaiveDate>,
}

fn validate_positive_quantity(quantity: &Decimal) -> Result<(), ValidationError> {
    if *quantity <= Decimal::ZERO {
        let mut err = ValidationError::new("inbound_quantity");
        err.message = Some("inbound quantity must be greater than zero".into());
        return Err(err);
    }
    Ok(())
}

fn validate_non_negative_price(price: &Decimal) -> Result<(), ValidationError> {
    if *price < Decimal::ZERO {
        let mut err = ValidationError::new("unit_price");
        err.message = Some("unit price must not be negative".into());
        return Err(err);
    }
    Ok(())
}

/// Optional narrowing and paging for batch listings.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
pub struct ListBatchesRequest {
    pub material_type_id: Option<Uuid>,
    pub status: Option<BatchStatus>,
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

/// Summary of a batch for API responses.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BatchSummary {
    pub batch_id: Uuid,
    pub tenant_id: Uuid,
    pub material_type_id: Uuid,
    pub supplier_id: Uuid,
    pub inbound_quantity: Decimal,
    pub remaining_quantity: Decimal,
    pub reserved_quantity: Decimal,
    pub used_quantity: Decimal,
    pub unit_price: Decimal,
    pub total_cost: Decimal,
    pub inbound_date: NaiveDate,
    pub expiry_date: Option<NaiveDate>,
    pub production_date: Option<NaiveDate>,
    pub status: BatchStatus,
    pub is_expired: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<material_batch::Model> for BatchSummary {
    fn from(model: material_batch::Model) -> Self {
        let is_expired = model
            .expiry_date
            .map(|exp| exp < Utc::now().date_naive())
            .unwrap_or(false);
        Self {
            batch_id: model.batch_id,
            tenant_id: model.tenant_id,
            material_type_id: model.material_type_id,
            supplier_id: model.supplier_id,
            inbound_quantity: model.inbound_quantity,
            remaining_quantity: model.remaining_quantity,
            reserved_quantity: model.reserved_quantity,
            used_quantity: model.used_quantity,
            unit_price: model.unit_price,
            total_cost: model.total_cost,
            inbound_date: model.inbound_date,
            expiry_date: model.expiry_date,
            production_date: model.production_date,
            status: model.status,
            is_expired,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Service for receiving and querying material batches.
#[derive(Clone)]
pub struct BatchService {
    repo: Arc<BatchRepository>,
    event_sender: EventSender,
    default_page_size: u64,
    max_page_size: u64,
}

impl BatchService {
    pub fn new(
        repo: Arc<BatchRepository>,
        event_sender: EventSender,
        default_page_size: u64,
        max_page_size: u64,
    ) -> Self {
        Self {
            repo,
            event_sender,
            default_page_size,
            max_page_size,
        }
    }

    /// Registers an inbound batch. The full inbound quantity starts as
    /// remaining and the batch opens in the available status.
    #[instrument(skip(self, request), fields(tenant_id = %tenant_id, material_type_id = %request.material_type_id))]
    pub async fn receive_batch(
        &self,
        tenant_id: Uuid,
        request: ReceiveBatchRequest,
    ) -> Result<BatchSummary, ServiceError> {
        request.validate().map_err(|e| {
            BATCH_INTAKE_FAILURES.inc();
            let msg = format!("Invalid input: {}", e);
            error!("{}", msg);
            ServiceError::ValidationError(msg)
        })?;

        if let Some(expiry) = request.expiry_date {
            if expiry <= request.inbound_date {
                BATCH_INTAKE_FAILURES.inc();
                return Err(ServiceError::ValidationError(format!(
                    "Expiry date {} is not after inbound date {}",
                    expiry, request.inbound_date
                )));
            }
        }

        let total_cost = request.inbound_quantity * request.unit_price;
        let batch = material_batch::ActiveModel {
            tenant_id: Set(tenant_id),
            material_type_id: Set(request.material_type_id),
            supplier_id: Set(request.supplier_id),
            inbound_quantity: Set(request.inbound_quantity),
            remaining_quantity: Set(request.inbound_quantity),
            reserved_quantity: Set(Decimal::ZERO),
            used_quantity: Set(Decimal::ZERO),
            unit_price: Set(request.unit_price),
            total_cost: Set(total_cost),
            inbound_date: Set(request.inbound_date),
            expiry_date: Set(request.expiry_date),
            production_date: Set(request.production_date),
            status: Set(BatchStatus::Available),
            ..Default::default()
        };

        let inserted = self.repo.insert(self.repo.get_db(), batch).await?;

        BATCH_INTAKES.inc();
        info!(
            batch_id = %inserted.batch_id,
            inbound_quantity = %inserted.inbound_quantity,
            unit_price = %inserted.unit_price,
            total_cost = %inserted.total_cost,
            "Received material batch"
        );

        self.event_sender
            .send(Event::BatchReceived {
                batch_id: inserted.batch_id,
                tenant_id,
                material_type_id: inserted.material_type_id,
                inbound_quantity: inserted.inbound_quantity,
                total_cost: inserted.total_cost,
            })
            .await
            .map_err(|e| ServiceError::EventError(format!("Failed to send event: {}", e)))?;

        Ok(BatchSummary::from(inserted))
    }

    /// Gets one batch by id.
    #[instrument(skip(self), fields(tenant_id = %tenant_id, batch_id = %batch_id))]
    pub async fn get_batch(
        &self,
        tenant_id: Uuid,
        batch_id: Uuid,
    ) -> Result<BatchSummary, ServiceError> {
        let batch = self
            .repo
            .find_by_id(self.repo.get_db(), tenant_id, batch_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Batch {} not found", batch_id)))?;
        Ok(BatchSummary::from(batch))
    }

    /// Lists batches with pagination and optional filters, newest inbound
    /// date first.
    #[instrument(skip(self, request), fields(tenant_id = %tenant_id))]
    pub async fn list_batches(
        &self,
        tenant_id: Uuid,
        request: ListBatchesRequest,
    ) -> Result<(Vec<BatchSummary>, u64), ServiceError> {
        let page = request.page.unwrap_or(1);
        if page == 0 {
            return Err(ServiceError::ValidationError(
                "Page number must be greater than 0".to_string(),
            ));
        }
        let page_size = request
            .page_size
            .unwrap_or(self.default_page_size)
            .min(self.max_page_size);
        if page_size == 0 {
            return Err(ServiceError::ValidationError(
                "Page size must be greater than 0".to_string(),
            ));
        }

        let filter = BatchFilter {
            material_type_id: request.material_type_id,
            status: request.status,
        };
        let (models, total) = self
            .repo
            .list(self.repo.get_db(), tenant_id, &filter, page, page_size)
            .await?;

        Ok((models.into_iter().map(BatchSummary::from).collect(), total))
    }
}
