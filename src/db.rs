use crate::config::EngineConfig;
use crate::errors::ServiceError;
use anyhow::Context;
use metrics::{counter, gauge};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use std::time::Duration;
use tracing::{debug, error, info};

/// Type alias for a database connection pool
pub type DbPool = DatabaseConnection;

/// Configuration for database connection
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Database connection URL
    pub url: String,
    /// Maximum number of connections
    pub max_connections: u32,
    /// Minimum number of connections
    pub min_connections: u32,
    /// Connection timeout duration
    pub connect_timeout: Duration,
    /// Idle timeout duration
    pub idle_timeout: Duration,
    /// Acquire connection timeout
    pub acquire_timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            acquire_timeout: Duration::from_secs(8),
        }
    }
}

/// Establishes a connection pool to the database
///
/// # Errors
/// Returns a `ServiceError` if the connection cannot be established
pub async fn establish_connection(database_url: &str) -> Result<DbPool, ServiceError> {
    let config = DbConfig {
        url: database_url.to_string(),
        ..Default::default()
    };

    establish_connection_with_config(&config).await
}

/// Establishes a connection pool to the database with custom configuration
///
/// # Errors
/// Returns a `ServiceError` if the connection cannot be established
pub async fn establish_connection_with_config(config: &DbConfig) -> Result<DbPool, ServiceError> {
    debug!("Configuring database connection with: {:?}", config);

    let mut opt = ConnectOptions::new(config.url.clone());

    opt.max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(config.connect_timeout)
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(config.idle_timeout)
        .sqlx_logging(true);

    gauge!("lotkeeper_db.max_connections", config.max_connections as f64);

    info!(
        "Connecting to database with max_connections={}",
        config.max_connections
    );

    let db_pool = Database::connect(opt)
        .await
        .map_err(|e| ServiceError::DatabaseError(e))
        .context("Database connection establishment failed")?;

    info!("Database connection pool established successfully");

    Ok(db_pool)
}

impl From<&EngineConfig> for DbConfig {
    fn from(cfg: &EngineConfig) -> Self {
        Self {
            url: cfg.database_url.clone(),
            max_connections: cfg.db_max_connections,
            min_connections: cfg.db_min_connections,
            connect_timeout: Duration::from_secs(cfg.db_connect_timeout_secs),
            idle_timeout: Duration::from_secs(cfg.db_idle_timeout_secs),
            acquire_timeout: Duration::from_secs(cfg.db_acquire_timeout_secs),
        }
    }
}

/// Establish DB pool using EngineConfig tuning
pub async fn establish_connection_from_engine_config(
    cfg: &EngineConfig,
) -> Result<DbPool, ServiceError> {
    let db_cfg: DbConfig = cfg.into();
    establish_connection_with_config(&db_cfg).await
}

/// Runs database migrations
///
/// # Errors
/// Returns a `ServiceError` if migrations fail to execute
pub async fn run_migrations(pool: &DbPool) -> Result<(), ServiceError> {
    info!("Running database migrations");
    let start = std::time::Instant::now();

    let result = crate::migrator::Migrator::up(pool, None)
        .await
        .map_err(ServiceError::DatabaseError);

    let elapsed = start.elapsed();
    match &result {
        Ok(_) => info!(
            "Database migrations completed successfully in {:?}",
            elapsed
        ),
        Err(e) => error!("Database migrations failed after {:?}: {}", elapsed, e),
    }

    result
}

/// Checks if the database connection is active
pub async fn check_connection(pool: &DbPool) -> Result<(), ServiceError> {
    debug!("Checking database connection");
    let start = std::time::Instant::now();

    let result = pool.ping().await.map_err(|e| ServiceError::DatabaseError(e));

    let elapsed = start.elapsed();
    match &result {
        Ok(_) => {
            debug!("Database connection check successful in {:?}", elapsed);
            gauge!(
                "lotkeeper_db.connection_latency",
                elapsed.as_millis() as f64
            );
        }
        Err(e) => {
            error!(
                "Database connection check failed after {:?}: {}",
                elapsed, e
            );
            counter!("lotkeeper_db.connection_failures", 1);
        }
    }

    result
}

/// Closes the database connection pool
pub async fn close_pool(pool: DbPool) -> Result<(), ServiceError> {
    info!("Closing database connection pool");

    pool.close().await.map_err(|e| ServiceError::DatabaseError(e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connects_migrates_and_pings_in_memory() {
        let pool = establish_connection("sqlite::memory:")
            .await
            .expect("connection should establish");
        run_migrations(&pool).await.expect("migrations should run");
        check_connection(&pool).await.expect("ping should succeed");
        close_pool(pool).await.expect("pool should close");
    }

    #[tokio::test]
    async fn migrated_sqlite_schema_round_trips_fractional_quantities() {
        use crate::entities::material_batch::{self, BatchStatus, Entity as MaterialBatch};
        use chrono::NaiveDate;
        use rust_decimal_macros::dec;
        use sea_orm::{ActiveModelTrait, EntityTrait, Set};
        use uuid::Uuid;

        // A single connection keeps every statement on the same in-memory
        // database.
        let config = DbConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            ..Default::default()
        };
        let pool = establish_connection_with_config(&config)
            .await
            .expect("connection should establish");
        run_migrations(&pool).await.expect("migrations should run");

        let inserted = material_batch::ActiveModel {
            tenant_id: Set(Uuid::new_v4()),
            material_type_id: Set(Uuid::new_v4()),
            supplier_id: Set(Uuid::new_v4()),
            inbound_quantity: Set(dec!(12.3456)),
            remaining_quantity: Set(dec!(12.3456)),
            reserved_quantity: Set(dec!(0)),
            used_quantity: Set(dec!(0)),
            unit_price: Set(dec!(3.25)),
            total_cost: Set(dec!(40.1232)),
            inbound_date: Set(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()),
            expiry_date: Set(None),
            production_date: Set(None),
            status: Set(BatchStatus::Available),
            ..Default::default()
        }
        .insert(&pool)
        .await
        .expect("insert should succeed");

        let fetched = MaterialBatch::find_by_id(inserted.batch_id)
            .one(&pool)
            .await
            .expect("select should succeed")
            .expect("row should exist");
        assert_eq!(fetched.inbound_quantity, dec!(12.3456));
        assert_eq!(fetched.unit_price, dec!(3.25));
        assert_eq!(fetched.total_cost, dec!(40.1232));
    }
}
