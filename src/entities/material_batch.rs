use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of a material batch.
///
/// `Reserved` means at least one open reservation exists against the batch;
/// `Depleted` means the free pool has been exhausted.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    #[sea_orm(string_value = "available")]
    Available,
    #[sea_orm(string_value = "reserved")]
    Reserved,
    #[sea_orm(string_value = "depleted")]
    Depleted,
}

/// The `material_batches` table: one row per inbound lot of raw material.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "material_batches")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub batch_id: Uuid,
    pub tenant_id: Uuid,
    pub material_type_id: Uuid,
    pub supplier_id: Uuid,
    /// Quantity received at intake; immutable afterwards.
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub inbound_quantity: rust_decimal::Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub remaining_quantity: rust_decimal::Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub reserved_quantity: rust_decimal::Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub used_quantity: rust_decimal::Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub unit_price: rust_decimal::Decimal,
    /// inbound_quantity * unit_price, fixed at intake.
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub total_cost: rust_decimal::Decimal,
    pub inbound_date: NaiveDate,
    pub expiry_date: Option<NaiveDate>,
    pub production_date: Option<NaiveDate>,
    pub status: BatchStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C: ConnectionTrait>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;
        let now = Utc::now();

        if insert {
            if let ActiveValue::NotSet = active_model.batch_id {
                active_model.batch_id = Set(Uuid::new_v4());
            }
            active_model.created_at = Set(now);
        }

        active_model.updated_at = Set(now);

        Ok(active_model)
    }
}

impl Model {
    /// Conservation check: the three mutable pools always sum to the inbound total.
    pub fn is_conserved(&self) -> bool {
        self.remaining_quantity + self.reserved_quantity + self.used_quantity
            == self.inbound_quantity
    }

    /// Quantity still open to new reservations.
    pub fn available_quantity(&self) -> rust_decimal::Decimal {
        self.remaining_quantity
    }
}
