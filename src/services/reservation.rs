//! Reservation Coordinator
//!
//! Applies reserve, release and consume operations over one or more batches
//! inside a single database transaction. Lines are processed in input order
//! against row-locked batches; any failing line rolls the whole request back.

use lazy_static::lazy_static;
use prometheus::{IntCounterVec, Opts};
use rust_decimal::Decimal;
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::entities::material_batch::{self, BatchStatus};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::lifecycle::{self, LifecycleOp, QuantityState, TransitionError};
use crate::repositories::batch_repository::BatchRepository;

lazy_static! {
    static ref BATCH_LIFECYCLE_OPS: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "lotkeeper_batch_lifecycle_ops_total",
            "Total number of committed batch lifecycle operations"
        ),
        &["op"]
    )
    .expect("metric can be created");
    static ref BATCH_LIFECYCLE_FAILURES: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "lotkeeper_batch_lifecycle_failures_total",
            "Total number of failed batch lifecycle operations"
        ),
        &["op", "error_type"]
    )
    .expect("metric can be created");
}

/// One line of a multi-batch request.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReservationLine {
    pub batch_id: Uuid,
    pub quantity: Decimal,
}

/// A multi-line request. The same batch may appear on several lines; later
/// lines see the effect of earlier ones.
#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
pub struct BatchOperationRequest {
    #[validate(length(min = 1), custom = "validate_line_quantities")]
    pub lines: Vec<ReservationLine>,
}

impl BatchOperationRequest {
    /// Convenience constructor for a single-batch request.
    pub fn single(batch_id: Uuid, quantity: Decimal) -> Self {
        Self {
            lines: vec![ReservationLine { batch_id, quantity }],
        }
    }
}

fn validate_line_quantities(lines: &[ReservationLine]) -> Result<(), ValidationError> {
    for line in lines {
        if line.quantity <= Decimal::ZERO {
            let mut err = ValidationError::new("quantity");
            err.message =
                Some(format!("quantity for batch {} must be positive", line.batch_id).into());
            return Err(err);
        }
    }
    Ok(())
}

/// Result of one committed request: the updated batch records in input
/// order plus the total quantity moved.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OperationOutcome {
    pub op: LifecycleOp,
    pub changes: Vec<material_batch::Model>,
    pub total_quantity: Decimal,
}

/// Service coordinating batch lifecycle operations.
#[derive(Clone)]
pub struct ReservationService {
    repo: Arc<BatchRepository>,
    event_sender: EventSender,
}

impl ReservationService {
    pub fn new(repo: Arc<BatchRepository>, event_sender: EventSender) -> Self {
        Self { repo, event_sender }
    }

    /// Reserves quantity on every line, moving remaining into reserved.
    #[instrument(skip(self, request), fields(tenant_id = %tenant_id, lines = request.lines.len()))]
    pub async fn reserve_batches(
        &self,
        tenant_id: Uuid,
        request: BatchOperationRequest,
    ) -> Result<OperationOutcome, ServiceError> {
        self.apply_lines(tenant_id, LifecycleOp::Reserve, request)
            .await
    }

    /// Releases previously reserved quantity back into remaining.
    #[instrument(skip(self, request), fields(tenant_id = %tenant_id, lines = request.lines.len()))]
    pub async fn release_batches(
        &self,
        tenant_id: Uuid,
        request: BatchOperationRequest,
    ) -> Result<OperationOutcome, ServiceError> {
        self.apply_lines(tenant_id, LifecycleOp::Release, request)
            .await
    }

    /// Consumes previously reserved quantity, moving reserved into used.
    #[instrument(skip(self, request), fields(tenant_id = %tenant_id, lines = request.lines.len()))]
    pub async fn consume_batches(
        &self,
        tenant_id: Uuid,
        request: BatchOperationRequest,
    ) -> Result<OperationOutcome, ServiceError> {
        self.apply_lines(tenant_id, LifecycleOp::Consume, request)
            .await
    }

    async fn apply_lines(
        &self,
        tenant_id: Uuid,
        op: LifecycleOp,
        request: BatchOperationRequest,
    ) -> Result<OperationOutcome, ServiceError> {
        let op_label = op.to_string();

        request.validate().map_err(|e| {
            BATCH_LIFECYCLE_FAILURES
                .with_label_values(&[&op_label, "validation_error"])
                .inc();
            let msg = format!("Invalid input: {}", e);
            error!("{}", msg);
            ServiceError::ValidationError(msg)
        })?;

        let lines = request.lines;
        let total_quantity: Decimal = lines.iter().map(|l| l.quantity).sum();
        let repo = self.repo.clone();

        let changes = self
            .repo
            .with_transaction(move |txn| {
                Box::pin(async move {
                    let mut changes = Vec::with_capacity(lines.len());
                    for line in &lines {
                        let batch = repo
                            .find_for_update(txn, tenant_id, line.batch_id)
                            .await?
                            .ok_or_else(|| {
                                ServiceError::NotFound(format!("Batch {} not found", line.batch_id))
                            })?;

                        let (next, status) = lifecycle::transition(
                            QuantityState::from(&batch),
                            batch.status,
                            op,
                            line.quantity,
                        )
                        .map_err(|e| transition_error(line.batch_id, e))?;

                        let mut active: material_batch::ActiveModel = batch.into();
                        active.remaining_quantity = Set(next.remaining);
                        active.reserved_quantity = Set(next.reserved);
                        active.used_quantity = Set(next.used);
                        active.status = Set(status);

                        let updated = repo.update(txn, active).await?;
                        changes.push(updated);
                    }
                    Ok(changes)
                })
            })
            .await
            .map_err(|e| {
                BATCH_LIFECYCLE_FAILURES
                    .with_label_values(&[&op_label, failure_label(&e)])
                    .inc();
                e
            })?;

        BATCH_LIFECYCLE_OPS.with_label_values(&[&op_label]).inc();
        info!(
            tenant_id = %tenant_id,
            op = %op,
            batch_count = changes.len(),
            total_quantity = %total_quantity,
            "Batch lifecycle operation committed"
        );

        self.publish_outcome(tenant_id, op, &op_label, &changes, total_quantity)
            .await;

        Ok(OperationOutcome {
            op,
            changes,
            total_quantity,
        })
    }

    /// Event publication happens after commit, so a send failure can only be
    /// reported, never rolled back.
    async fn publish_outcome(
        &self,
        tenant_id: Uuid,
        op: LifecycleOp,
        op_label: &str,
        changes: &[material_batch::Model],
        total_quantity: Decimal,
    ) {
        let batch_ids: Vec<Uuid> = changes.iter().map(|c| c.batch_id).collect();
        let event = match op {
            LifecycleOp::Reserve => Event::BatchesReserved {
                tenant_id,
                batch_ids,
                total_quantity,
            },
            LifecycleOp::Release => Event::BatchesReleased {
                tenant_id,
                batch_ids,
                total_quantity,
            },
            LifecycleOp::Consume => Event::BatchesConsumed {
                tenant_id,
                batch_ids,
                total_quantity,
            },
        };
        self.publish(op_label, event).await;

        for change in changes.iter().filter(|c| c.status == BatchStatus::Depleted) {
            self.publish(
                op_label,
                Event::BatchDepleted {
                    batch_id: change.batch_id,
                    tenant_id,
                    material_type_id: change.material_type_id,
                },
            )
            .await;
        }
    }

    async fn publish(&self, op_label: &str, event: Event) {
        if let Err(e) = self.event_sender.send(event).await {
            BATCH_LIFECYCLE_FAILURES
                .with_label_values(&[op_label, "event_error"])
                .inc();
            warn!(error = %e, "Failed to publish event; database state is already committed");
        }
    }
}

fn transition_error(batch_id: Uuid, err: TransitionError) -> ServiceError {
    match err {
        TransitionError::InsufficientRemaining {
            requested,
            available,
        } => ServiceError::InsufficientQuantity {
            batch_id,
            requested,
            available,
        },
        TransitionError::ExceedsReserved {
            requested,
            reserved,
        } => ServiceError::InvalidOperation(format!(
            "Cannot take {} from batch {}: only {} reserved",
            requested, batch_id, reserved
        )),
        TransitionError::NonPositiveQuantity(quantity) => {
            ServiceError::ValidationError(format!("Quantity must be positive, got {}", quantity))
        }
    }
}

fn failure_label(err: &ServiceError) -> &'static str {
    match err {
        ServiceError::InsufficientQuantity { .. } => "insufficient_quantity",
        ServiceError::NotFound(_) => "not_found",
        ServiceError::InvalidOperation(_) => "invalid_operation",
        ServiceError::ValidationError(_) => "validation_error",
        _ => "database_error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn empty_requests_fail_validation() {
        let request = BatchOperationRequest { lines: vec![] };
        assert!(request.validate().is_err());
    }

    #[test]
    fn non_positive_line_quantities_fail_validation() {
        for quantity in [dec!(0), dec!(-2.5)] {
            let request = BatchOperationRequest::single(Uuid::from_u128(1), quantity);
            assert!(request.validate().is_err(), "{} passed validation", quantity);
        }
    }

    #[test]
    fn positive_line_quantities_pass_validation() {
        let request = BatchOperationRequest {
            lines: vec![
                ReservationLine {
                    batch_id: Uuid::from_u128(1),
                    quantity: dec!(0.0001),
                },
                ReservationLine {
                    batch_id: Uuid::from_u128(2),
                    quantity: dec!(40),
                },
            ],
        };
        assert!(request.validate().is_ok());
    }

    #[test]
    fn insufficient_remaining_surfaces_the_batch_id() {
        let batch_id = Uuid::from_u128(7);
        let err = transition_error(
            batch_id,
            TransitionError::InsufficientRemaining {
                requested: dec!(5),
                available: dec!(3),
            },
        );
        match err {
            ServiceError::InsufficientQuantity {
                batch_id: reported,
                requested,
                available,
            } => {
                assert_eq!(reported, batch_id);
                assert_eq!(requested, dec!(5));
                assert_eq!(available, dec!(3));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn over_release_maps_to_invalid_operation() {
        let err = transition_error(
            Uuid::from_u128(9),
            TransitionError::ExceedsReserved {
                requested: dec!(6),
                reserved: dec!(5),
            },
        );
        assert!(matches!(err, ServiceError::InvalidOperation(_)));
    }
}
