use rust_decimal::Decimal;
use sea_orm::error::DbErr;
use uuid::Uuid;

/// Unified error type for every fallible engine operation.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sea_orm::error::DbErr),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error(
        "Insufficient quantity for batch {batch_id}: requested {requested}, available {available}"
    )]
    InsufficientQuantity {
        batch_id: Uuid,
        requested: Decimal,
        available: Decimal,
    },

    #[error("Event error: {0}")]
    EventError(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

pub trait IntoDbErr {
    fn into_db_err(self) -> DbErr;
}

impl IntoDbErr for DbErr {
    fn into_db_err(self) -> DbErr {
        self
    }
}

impl IntoDbErr for String {
    fn into_db_err(self) -> DbErr {
        DbErr::Custom(self)
    }
}

impl IntoDbErr for &str {
    fn into_db_err(self) -> DbErr {
        DbErr::Custom(self.to_string())
    }
}

impl ServiceError {
    /// Generic constructor that normalizes any supported database error input.
    pub fn db_error<E: IntoDbErr>(error: E) -> Self {
        ServiceError::DatabaseError(error.into_db_err())
    }

    /// True for errors callers can fix by changing their request.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_)
                | Self::ValidationError(_)
                | Self::InvalidOperation(_)
                | Self::InsufficientQuantity { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn insufficient_quantity_message_names_the_batch() {
        let batch_id = Uuid::nil();
        let err = ServiceError::InsufficientQuantity {
            batch_id,
            requested: dec!(25),
            available: dec!(10.5),
        };
        let msg = err.to_string();
        assert!(msg.contains(&batch_id.to_string()));
        assert!(msg.contains("requested 25"));
        assert!(msg.contains("available 10.5"));
    }

    #[test]
    fn client_error_classification() {
        assert!(ServiceError::NotFound("batch".into()).is_client_error());
        assert!(ServiceError::ValidationError("empty".into()).is_client_error());
        assert!(!ServiceError::InternalError("boom".into()).is_client_error());
        assert!(!ServiceError::db_error("connection reset").is_client_error());
    }

    #[test]
    fn db_error_normalizes_strings() {
        let err = ServiceError::db_error("timeout waiting for lock");
        match err {
            ServiceError::DatabaseError(DbErr::Custom(msg)) => {
                assert_eq!(msg, "timeout waiting for lock")
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }
}
