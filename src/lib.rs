//! Lotkeeper
//!
//! Tenant-scoped material batch inventory: a batch store, pure allocation
//! planning (first-in-first-out and cost-optimal), a pure lifecycle state
//! machine and a transactional reservation coordinator over them.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod allocation;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod lifecycle;
pub mod migrator;
pub mod repositories;
pub mod services;

use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::EngineConfig;
use crate::errors::ServiceError;
use crate::events::{process_events, Event, EventSender};
use crate::repositories::batch_repository::BatchRepository;
use crate::services::batches::BatchService;
use crate::services::planning::PlanningService;
use crate::services::reservation::ReservationService;

/// One wired engine instance: connection pool, repository and services.
#[derive(Clone)]
pub struct Engine {
    pub db: Arc<DatabaseConnection>,
    pub config: EngineConfig,
    pub event_sender: EventSender,
    pub batches: BatchService,
    pub planning: PlanningService,
    pub reservations: ReservationService,
}

impl Engine {
    /// Connects to the configured database, optionally migrates, and wires
    /// every service.
    ///
    /// Also returns the receiving end of the event channel; hand it to
    /// [`Engine::spawn_event_worker`] or consume it yourself.
    pub async fn connect(
        config: EngineConfig,
    ) -> Result<(Self, mpsc::Receiver<Event>), ServiceError> {
        let pool = db::establish_connection_from_engine_config(&config).await?;
        if config.auto_migrate {
            db::run_migrations(&pool).await?;
        }
        let (tx, rx) = mpsc::channel(config.event_channel_capacity);
        let engine = Self::from_parts(Arc::new(pool), config, EventSender::new(tx));
        Ok((engine, rx))
    }

    /// Wires services over an existing connection. Used by tests and by
    /// embedders that manage their own pool.
    pub fn from_parts(
        db: Arc<DatabaseConnection>,
        config: EngineConfig,
        event_sender: EventSender,
    ) -> Self {
        let repo = Arc::new(BatchRepository::new(db.clone()));
        let batches = BatchService::new(
            repo.clone(),
            event_sender.clone(),
            config.default_page_size,
            config.max_page_size,
        );
        let planning = PlanningService::new(repo.clone(), event_sender.clone());
        let reservations = ReservationService::new(repo, event_sender.clone());
        Self {
            db,
            config,
            event_sender,
            batches,
            planning,
            reservations,
        }
    }

    /// Spawns the default logging worker over the event channel.
    pub fn spawn_event_worker(receiver: mpsc::Receiver<Event>) -> JoinHandle<()> {
        tokio::spawn(process_events(receiver))
    }
}

pub mod prelude {
    pub use crate::allocation::{
        AllocationPlan, BatchAllocation, PlanComparison, PlanStrategy,
    };
    pub use crate::config::{load_config, EngineConfig};
    pub use crate::entities::material_batch::BatchStatus;
    pub use crate::errors::ServiceError;
    pub use crate::events::{Event, EventSender};
    pub use crate::lifecycle::{LifecycleOp, QuantityState};
    pub use crate::services::batches::{
        BatchService, BatchSummary, ListBatchesRequest, ReceiveBatchRequest,
    };
    pub use crate::services::planning::{PlanRecommendation, PlanningService};
    pub use crate::services::reservation::{
        BatchOperationRequest, OperationOutcome, ReservationLine, ReservationService,
    };
    pub use crate::Engine;
}
