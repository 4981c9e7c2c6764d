//! Allocation Planning
//!
//! Read-only recommendation of first-in-first-out and cost-optimal
//! consumption plans over the open batches of one material type. Nothing
//! here reserves or mutates stock; callers hand a chosen plan to the
//! reservation side.

use lazy_static::lazy_static;
use prometheus::IntCounter;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::allocation::{self, AllocationPlan, PlanComparison};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::repositories::batch_repository::BatchRepository;
use crate::repositories::Repository;

lazy_static! {
    static ref PLAN_REQUESTS: IntCounter = IntCounter::new(
        "lotkeeper_plan_requests_total",
        "Total number of allocation plan requests"
    )
    .expect("metric can be created");
    static ref PLAN_SHORTFALLS: IntCounter = IntCounter::new(
        "lotkeeper_plan_shortfalls_total",
        "Plan requests the candidate batches could not fully cover"
    )
    .expect("metric can be created");
}

/// Aggregate facts about the candidate pool a recommendation was built from.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CandidateSummary {
    pub batch_count: usize,
    pub total_available: Decimal,
    pub required_quantity: Decimal,
}

/// A full recommendation: the candidate summary plus both plans.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlanRecommendation {
    pub summary: CandidateSummary,
    pub fifo: AllocationPlan,
    pub cost_optimal: AllocationPlan,
}

/// Service building allocation plan recommendations.
#[derive(Clone)]
pub struct PlanningService {
    repo: Arc<BatchRepository>,
    event_sender: EventSender,
}

impl PlanningService {
    pub fn new(repo: Arc<BatchRepository>, event_sender: EventSender) -> Self {
        Self { repo, event_sender }
    }

    /// Builds both plans for `required_quantity` of one material type.
    ///
    /// Candidates are the tenant's batches of that material type which still
    /// have quantity remaining. A required quantity of zero or less yields
    /// empty plans rather than an error.
    #[instrument(skip(self), fields(tenant_id = %tenant_id, material_type_id = %material_type_id))]
    pub async fn recommend_allocation(
        &self,
        tenant_id: Uuid,
        material_type_id: Uuid,
        required_quantity: Decimal,
    ) -> Result<PlanRecommendation, ServiceError> {
        let db = self.repo.get_db();
        let candidates = self
            .repo
            .find_candidates(db, tenant_id, material_type_id)
            .await?;

        let total_available: Decimal = candidates.iter().map(|b| b.remaining_quantity).sum();
        let summary = CandidateSummary {
            batch_count: candidates.len(),
            total_available,
            required_quantity,
        };

        let PlanComparison { fifo, cost_optimal } =
            allocation::recommend_plans(&candidates, required_quantity);

        PLAN_REQUESTS.inc();
        // Both plans walk the same candidates, so their shortfalls agree.
        if !fifo.is_complete() {
            PLAN_SHORTFALLS.inc();
            warn!(
                requested = %required_quantity,
                available = %total_available,
                shortfall = %fifo.shortfall,
                "Candidate batches cannot fully cover the requested quantity"
            );
            if let Err(e) = self
                .event_sender
                .send(Event::PartialPlanWarning {
                    tenant_id,
                    material_type_id,
                    requested_quantity: required_quantity,
                    available_quantity: total_available,
                })
                .await
            {
                warn!(error = %e, "Failed to publish shortfall event");
            }
        }

        info!(
            batch_count = summary.batch_count,
            fifo_cost = %fifo.total_cost,
            cost_optimal_cost = %cost_optimal.total_cost,
            "Built allocation plans"
        );

        Ok(PlanRecommendation {
            summary,
            fifo,
            cost_optimal,
        })
    }
}
