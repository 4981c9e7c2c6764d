use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::material_batch::Model as MaterialBatch;

/// Ordering rule a plan was built with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PlanStrategy {
    Fifo,
    CostOptimal,
}

/// One slice of a plan: take `quantity` from `batch_id` at the price the
/// batch carried when the plan was built.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BatchAllocation {
    pub batch_id: Uuid,
    pub quantity: Decimal,
    pub unit_price: Decimal,
}

/// A consumption plan over candidate batches. Never persisted; callers
/// hand the selected allocations to the reservation side.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AllocationPlan {
    pub strategy: PlanStrategy,
    pub allocations: Vec<BatchAllocation>,
    pub total_cost: Decimal,
    pub allocated_quantity: Decimal,
    /// Requested quantity the candidates could not cover. Zero for a full plan.
    pub shortfall: Decimal,
    pub advantage: Option<String>,
    pub warning: Option<String>,
}

impl AllocationPlan {
    pub fn is_complete(&self) -> bool {
        self.shortfall.is_zero()
    }
}

/// Both plan variants for one request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlanComparison {
    pub fifo: AllocationPlan,
    pub cost_optimal: AllocationPlan,
}

/// Builds the FIFO and cost-optimal plans for `required_quantity` over
/// `candidates`.
///
/// Callers filter the candidates first (one material type, batch open,
/// quantity remaining); this function only orders and walks them. Pure:
/// no I/O, no mutation, identical inputs give identical plans.
pub fn recommend_plans(
    candidates: &[MaterialBatch],
    required_quantity: Decimal,
) -> PlanComparison {
    let mut fifo_order: Vec<&MaterialBatch> = candidates.iter().collect();
    fifo_order.sort_by(|a, b| {
        a.inbound_date
            .cmp(&b.inbound_date)
            .then_with(|| a.batch_id.cmp(&b.batch_id))
    });

    let mut cost_order: Vec<&MaterialBatch> = candidates.iter().collect();
    cost_order.sort_by(|a, b| {
        a.unit_price
            .cmp(&b.unit_price)
            .then_with(|| a.inbound_date.cmp(&b.inbound_date))
            .then_with(|| a.batch_id.cmp(&b.batch_id))
    });

    let mut fifo = greedy_fill(&fifo_order, required_quantity, PlanStrategy::Fifo);
    let mut cost_optimal = greedy_fill(&cost_order, required_quantity, PlanStrategy::CostOptimal);

    if !fifo.allocations.is_empty() {
        fifo.advantage = Some("Consumes oldest stock first, minimizing expiry risk".to_string());
    }
    if fifo.total_cost > cost_optimal.total_cost {
        let saving = fifo.total_cost - cost_optimal.total_cost;
        cost_optimal.advantage = Some(format!(
            "Costs {saving} less than first-in-first-out ordering"
        ));
        cost_optimal.warning = Some(
            "Bypasses older batches; check expiry dates on skipped stock before committing"
                .to_string(),
        );
    }

    PlanComparison {
        fifo,
        cost_optimal,
    }
}

fn greedy_fill(
    ordered: &[&MaterialBatch],
    required_quantity: Decimal,
    strategy: PlanStrategy,
) -> AllocationPlan {
    let required = required_quantity.max(Decimal::ZERO);
    let mut outstanding = required;
    let mut allocations = Vec::new();
    let mut total_cost = Decimal::ZERO;

    for batch in ordered {
        if outstanding <= Decimal::ZERO {
            break;
        }
        if batch.remaining_quantity <= Decimal::ZERO {
            continue;
        }
        let take = batch.remaining_quantity.min(outstanding);
        total_cost += take * batch.unit_price;
        allocations.push(BatchAllocation {
            batch_id: batch.batch_id,
            quantity: take,
            unit_price: batch.unit_price,
        });
        outstanding -= take;
    }

    AllocationPlan {
        strategy,
        allocations,
        total_cost,
        allocated_quantity: required - outstanding,
        shortfall: outstanding,
        advantage: None,
        warning: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::material_batch::BatchStatus;
    use chrono::{NaiveDate, Utc};
    use rust_decimal_macros::dec;

    fn batch(id: u128, inbound_date: (i32, u32, u32), remaining: Decimal, price: Decimal) -> MaterialBatch {
        MaterialBatch {
            batch_id: Uuid::from_u128(id),
            tenant_id: Uuid::from_u128(1),
            material_type_id: Uuid::from_u128(2),
            supplier_id: Uuid::from_u128(3),
            inbound_quantity: remaining,
            remaining_quantity: remaining,
            reserved_quantity: Decimal::ZERO,
            used_quantity: Decimal::ZERO,
            unit_price: price,
            total_cost: remaining * price,
            inbound_date: NaiveDate::from_ymd_opt(inbound_date.0, inbound_date.1, inbound_date.2)
                .unwrap(),
            expiry_date: None,
            production_date: None,
            status: BatchStatus::Available,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn fifo_takes_oldest_batches_first() {
        let b1 = batch(10, (2024, 1, 1), dec!(50), dec!(10));
        let b2 = batch(20, (2024, 1, 5), dec!(50), dec!(8));
        let plans = recommend_plans(&[b2.clone(), b1.clone()], dec!(60));

        let fifo = &plans.fifo;
        assert_eq!(fifo.allocations.len(), 2);
        assert_eq!(fifo.allocations[0].batch_id, b1.batch_id);
        assert_eq!(fifo.allocations[0].quantity, dec!(50));
        assert_eq!(fifo.allocations[1].batch_id, b2.batch_id);
        assert_eq!(fifo.allocations[1].quantity, dec!(10));
        assert_eq!(fifo.total_cost, dec!(580));
        assert!(fifo.is_complete());
    }

    #[test]
    fn cost_optimal_takes_cheapest_batches_and_flags_fifo_premium() {
        let b1 = batch(10, (2024, 1, 1), dec!(50), dec!(10));
        let b2 = batch(20, (2024, 1, 5), dec!(50), dec!(8));
        let plans = recommend_plans(&[b1.clone(), b2.clone()], dec!(60));

        let cost = &plans.cost_optimal;
        assert_eq!(cost.allocations[0].batch_id, b2.batch_id);
        assert_eq!(cost.allocations[0].quantity, dec!(50));
        assert_eq!(cost.allocations[1].batch_id, b1.batch_id);
        assert_eq!(cost.allocations[1].quantity, dec!(10));
        assert_eq!(cost.total_cost, dec!(500));

        // 580 > 500, so the cheaper plan carries the expiry-risk warning.
        assert!(cost.warning.is_some());
        assert!(cost.advantage.as_deref().unwrap().contains("80"));
    }

    #[test]
    fn equal_costs_produce_no_warning() {
        let b1 = batch(10, (2024, 1, 1), dec!(30), dec!(5));
        let b2 = batch(20, (2024, 2, 1), dec!(30), dec!(5));
        let plans = recommend_plans(&[b1, b2], dec!(40));
        assert_eq!(plans.fifo.total_cost, plans.cost_optimal.total_cost);
        assert!(plans.cost_optimal.warning.is_none());
        assert!(plans.cost_optimal.advantage.is_none());
    }

    #[test]
    fn shortfall_degrades_to_partial_plan() {
        let b1 = batch(10, (2024, 1, 1), dec!(20), dec!(4));
        let plans = recommend_plans(&[b1], dec!(50));
        assert_eq!(plans.fifo.allocated_quantity, dec!(20));
        assert_eq!(plans.fifo.shortfall, dec!(30));
        assert!(!plans.fifo.is_complete());
        assert_eq!(plans.cost_optimal.shortfall, dec!(30));
    }

    #[test]
    fn non_positive_requirement_yields_empty_plans() {
        let b1 = batch(10, (2024, 1, 1), dec!(20), dec!(4));
        for required in [dec!(0), dec!(-3)] {
            let plans = recommend_plans(std::slice::from_ref(&b1), required);
            assert!(plans.fifo.allocations.is_empty());
            assert!(plans.cost_optimal.allocations.is_empty());
            assert_eq!(plans.fifo.total_cost, Decimal::ZERO);
            assert_eq!(plans.fifo.shortfall, Decimal::ZERO);
        }
    }

    #[test]
    fn empty_candidates_yield_empty_plans() {
        let plans = recommend_plans(&[], dec!(10));
        assert!(plans.fifo.allocations.is_empty());
        assert_eq!(plans.fifo.total_cost, Decimal::ZERO);
        assert_eq!(plans.fifo.shortfall, dec!(10));
    }

    #[test]
    fn inbound_date_ties_break_by_batch_id() {
        let b1 = batch(5, (2024, 3, 1), dec!(10), dec!(7));
        let b2 = batch(9, (2024, 3, 1), dec!(10), dec!(7));
        let plans = recommend_plans(&[b2.clone(), b1.clone()], dec!(15));
        assert_eq!(plans.fifo.allocations[0].batch_id, b1.batch_id);
        assert_eq!(plans.fifo.allocations[1].batch_id, b2.batch_id);
    }

    #[test]
    fn unit_price_ties_break_by_inbound_date() {
        let newer = batch(5, (2024, 6, 1), dec!(10), dec!(7));
        let older = batch(9, (2024, 3, 1), dec!(10), dec!(7));
        let plans = recommend_plans(&[newer.clone(), older.clone()], dec!(15));
        assert_eq!(plans.cost_optimal.allocations[0].batch_id, older.batch_id);
        assert_eq!(plans.cost_optimal.allocations[1].batch_id, newer.batch_id);
    }

    #[test]
    fn exhausted_candidates_are_skipped() {
        let empty = batch(5, (2024, 1, 1), dec!(0), dec!(1));
        let stocked = batch(9, (2024, 5, 1), dec!(40), dec!(2));
        let plans = recommend_plans(&[empty, stocked.clone()], dec!(25));
        assert_eq!(plans.fifo.allocations.len(), 1);
        assert_eq!(plans.fifo.allocations[0].batch_id, stocked.batch_id);
        assert_eq!(plans.fifo.allocations[0].quantity, dec!(25));
    }
}
