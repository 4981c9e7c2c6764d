use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

// Domain events emitted after batch mutations commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    BatchReceived {
        batch_id: Uuid,
        tenant_id: Uuid,
        material_type_id: Uuid,
        inbound_quantity: Decimal,
        total_cost: Decimal,
    },
    BatchesReserved {
        tenant_id: Uuid,
        batch_ids: Vec<Uuid>,
        total_quantity: Decimal,
    },
    BatchesReleased {
        tenant_id: Uuid,
        batch_ids: Vec<Uuid>,
        total_quantity: Decimal,
    },
    BatchesConsumed {
        tenant_id: Uuid,
        batch_ids: Vec<Uuid>,
        total_quantity: Decimal,
    },
    BatchDepleted {
        batch_id: Uuid,
        tenant_id: Uuid,
        material_type_id: Uuid,
    },
    PartialPlanWarning {
        tenant_id: Uuid,
        material_type_id: Uuid,
        requested_quantity: Decimal,
        available_quantity: Decimal,
    },
}

// Consumes the event channel and reacts to each event. Runs until every
// sender is dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match event {
            Event::BatchReceived {
                batch_id,
                tenant_id,
                material_type_id,
                inbound_quantity,
                total_cost,
            } => {
                info!(
                    %batch_id,
                    %tenant_id,
                    %material_type_id,
                    %inbound_quantity,
                    %total_cost,
                    "Batch received into stock"
                );
            }
            Event::BatchesReserved {
                tenant_id,
                ref batch_ids,
                total_quantity,
            } => {
                info!(
                    %tenant_id,
                    batch_count = batch_ids.len(),
                    %total_quantity,
                    "Batches reserved"
                );
            }
            Event::BatchesReleased {
                tenant_id,
                ref batch_ids,
                total_quantity,
            } => {
                info!(
                    %tenant_id,
                    batch_count = batch_ids.len(),
                    %total_quantity,
                    "Reservations released"
                );
            }
            Event::BatchesConsumed {
                tenant_id,
                ref batch_ids,
                total_quantity,
            } => {
                info!(
                    %tenant_id,
                    batch_count = batch_ids.len(),
                    %total_quantity,
                    "Reserved material consumed"
                );
            }
            Event::BatchDepleted {
                batch_id,
                tenant_id,
                material_type_id,
            } => {
                if let Err(e) = handle_batch_depleted(batch_id, tenant_id, material_type_id).await
                {
                    warn!(%batch_id, error = %e, "Failed to handle batch depletion");
                }
            }
            Event::PartialPlanWarning {
                tenant_id,
                material_type_id,
                requested_quantity,
                available_quantity,
            } => {
                warn!(
                    %tenant_id,
                    %material_type_id,
                    %requested_quantity,
                    %available_quantity,
                    "Allocation plan could not cover the requested quantity"
                );
            }
        }
    }

    warn!("Event processing loop has ended");
}

async fn handle_batch_depleted(
    batch_id: Uuid,
    tenant_id: Uuid,
    material_type_id: Uuid,
) -> Result<(), String> {
    warn!(
        %batch_id,
        %tenant_id,
        %material_type_id,
        "Batch fully depleted; material type may need replenishment"
    );
    Ok(())
}
