use chrono::NaiveDate;
use rust_decimal::Decimal;
use tempfile::TempDir;
use uuid::Uuid;

use lotkeeper::config::EngineConfig;
use lotkeeper::services::batches::{BatchSummary, ReceiveBatchRequest};
use lotkeeper::Engine;

/// Harness spinning up an engine backed by a throwaway SQLite database.
///
/// Each instance gets its own database file in a temp directory, so tests
/// can run in parallel without clobbering each other.
pub struct TestEngine {
    pub engine: Engine,
    _db_dir: TempDir,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestEngine {
    pub async fn new() -> Self {
        let db_dir = tempfile::tempdir().expect("create temp dir for test database");
        let db_path = db_dir.path().join("lotkeeper_test.db");

        let mut cfg = EngineConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            "test".to_string(),
        );
        cfg.auto_migrate = true;
        // A single connection serializes writers, which is what SQLite wants.
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let (engine, event_rx) = Engine::connect(cfg)
            .await
            .expect("failed to start test engine");
        let event_task = Engine::spawn_event_worker(event_rx);

        Self {
            engine,
            _db_dir: db_dir,
            _event_task: event_task,
        }
    }

    /// Registers a batch through the intake service and returns its summary.
    #[allow(dead_code)]
    pub async fn seed_batch(
        &self,
        tenant_id: Uuid,
        material_type_id: Uuid,
        quantity: Decimal,
        unit_price: Decimal,
        inbound_date: NaiveDate,
    ) -> BatchSummary {
        self.engine
            .batches
            .receive_batch(
                tenant_id,
                ReceiveBatchRequest {
                    material_type_id,
                    supplier_id: Uuid::new_v4(),
                    inbound_quantity: quantity,
                    unit_price,
                    inbound_date,
                    expiry_date: None,
                    production_date: None,
                },
            )
            .await
            .expect("seed batch for tests")
    }
}

impl Drop for TestEngine {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

#[allow(dead_code)]
pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid test date")
}
