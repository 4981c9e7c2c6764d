use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::entities::material_batch::{self, BatchStatus};

/// The three mutations a batch supports after intake.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum LifecycleOp {
    Reserve,
    Release,
    Consume,
}

/// The mutable quantity pools of one batch, detached from the persisted row.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QuantityState {
    pub remaining: Decimal,
    pub reserved: Decimal,
    pub used: Decimal,
}

impl QuantityState {
    pub fn total(&self) -> Decimal {
        self.remaining + self.reserved + self.used
    }
}

impl From<&material_batch::Model> for QuantityState {
    fn from(batch: &material_batch::Model) -> Self {
        Self {
            remaining: batch.remaining_quantity,
            reserved: batch.reserved_quantity,
            used: batch.used_quantity,
        }
    }
}

/// Rejected transitions. The coordinator attaches the batch id when
/// surfacing these as service errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransitionError {
    #[error("requested {requested} exceeds available {available}")]
    InsufficientRemaining {
        requested: Decimal,
        available: Decimal,
    },
    #[error("requested {requested} exceeds reserved {reserved}")]
    ExceedsReserved {
        requested: Decimal,
        reserved: Decimal,
    },
    #[error("quantity must be positive, got {0}")]
    NonPositiveQuantity(Decimal),
}

/// Moves `quantity` between the pools according to `op`.
///
/// Quantity conservation is structural here: every arm moves the same
/// amount out of one pool and into another, so
/// `remaining + reserved + used` never changes after intake.
pub fn apply(
    state: QuantityState,
    op: LifecycleOp,
    quantity: Decimal,
) -> Result<QuantityState, TransitionError> {
    if quantity <= Decimal::ZERO {
        return Err(TransitionError::NonPositiveQuantity(quantity));
    }

    match op {
        LifecycleOp::Reserve => {
            if quantity > state.remaining {
                return Err(TransitionError::InsufficientRemaining {
                    requested: quantity,
                    available: state.remaining,
                });
            }
            Ok(QuantityState {
                remaining: state.remaining - quantity,
                reserved: state.reserved + quantity,
                used: state.used,
            })
        }
        LifecycleOp::Release => {
            if quantity > state.reserved {
                return Err(TransitionError::ExceedsReserved {
                    requested: quantity,
                    reserved: state.reserved,
                });
            }
            Ok(QuantityState {
                remaining: state.remaining + quantity,
                reserved: state.reserved - quantity,
                used: state.used,
            })
        }
        LifecycleOp::Consume => {
            if quantity > state.reserved {
                return Err(TransitionError::ExceedsReserved {
                    requested: quantity,
                    reserved: state.reserved,
                });
            }
            Ok(QuantityState {
                remaining: state.remaining,
                reserved: state.reserved - quantity,
                used: state.used + quantity,
            })
        }
    }
}

/// Derives the batch status after `op` produced `next`.
///
/// Single source of truth for status transitions; every mutation path
/// goes through here.
pub fn status_for(op: LifecycleOp, next: QuantityState, current: BatchStatus) -> BatchStatus {
    match op {
        LifecycleOp::Reserve => {
            if next.remaining <= Decimal::ZERO {
                BatchStatus::Depleted
            } else {
                BatchStatus::Reserved
            }
        }
        // Intentionally unconditional: a release marks the batch available
        // again even while reserved_quantity is still positive for other
        // requests. Downstream consumers depend on this reset.
        LifecycleOp::Release => BatchStatus::Available,
        LifecycleOp::Consume => {
            if next.reserved <= Decimal::ZERO && next.remaining <= Decimal::ZERO {
                BatchStatus::Depleted
            } else {
                current
            }
        }
    }
}

/// Applies `op` and derives the resulting status in one step.
pub fn transition(
    state: QuantityState,
    current: BatchStatus,
    op: LifecycleOp,
    quantity: Decimal,
) -> Result<(QuantityState, BatchStatus), TransitionError> {
    let next = apply(state, op, quantity)?;
    let status = status_for(op, next, current);
    Ok((next, status))
}
