use crate::config::AppConfig;
use crate::errors::ServiceError;
use metrics::{counter, gauge};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbBackend};
use sea_orm_migration::MigratorTrait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};
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

impl From<&AppConfig> for DbConfig {
    fn from(cfg: &AppConfig) -> Self {
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

/// Serialises read-then-write transactions on SQLite.
///
/// SQLite has no row locks: a deferred transaction that reads before it
/// writes must upgrade its shared lock, and two such upgrades at once fail
/// with `SQLITE_BUSY` instead of waiting. Postgres takes `FOR UPDATE` row
/// locks, so the gate is open there.
#[derive(Debug, Clone, Default)]
pub struct WriteGate {
    lock: Option<Arc<Mutex<()>>>,
}

impl WriteGate {
    pub fn for_pool(pool: &DbPool) -> Self {
        match pool.get_database_backend() {
            DbBackend::Sqlite => Self {
                lock: Some(Arc::new(Mutex::new(()))),
            },
            _ => Self::default(),
        }
    }

    /// Waits for exclusive write access; hold the guard until commit.
    pub async fn enter(&self) -> Option<MutexGuard<'_, ()>> {
        match &self.lock {
            Some(lock) => Some(lock.lock().await),
            None => None,
        }
    }
}

/// Establishes a connection pool to the database with custom configuration
pub async fn establish_connection_with_config(config: &DbConfig) -> Result<DbPool, ServiceError> {
    debug!("Configuring database connection with: {:?}", config);

    let mut opt = ConnectOptions::new(config.url.clone());
    opt.max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(config.connect_timeout)
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(config.idle_timeout)
        .sqlx_logging(false);

    gauge!("feathers_db.max_connections", config.max_connections as f64);

    info!(
        "Connecting to database with max_connections={}",
        config.max_connections
    );

    let db_pool = Database::connect(opt).await.map_err(|e| {
        error!("Database connection failed: {}", e);
        counter!("feathers_db.connection_failures", 1);
        ServiceError::DatabaseError(e)
    })?;

    info!("Database connection pool established successfully");
    Ok(db_pool)
}

/// Establish DB pool using AppConfig tuning
pub async fn establish_connection_from_app_config(cfg: &AppConfig) -> Result<DbPool, ServiceError> {
    let db_cfg: DbConfig = cfg.into();
    establish_connection_with_config(&db_cfg).await
}

/// Runs the embedded migrations
pub async fn run_migrations(pool: &DbPool) -> Result<(), ServiceError> {
    info!("Running database migrations");
    let start = std::time::Instant::now();

    let result = crate::migrator::Migrator::up(pool, None)
        .await
        .map_err(ServiceError::DatabaseError);

    let elapsed = start.elapsed();
    match &result {
        Ok(_) => info!("Database migrations completed in {:?}", elapsed),
        Err(e) => error!("Database migrations failed after {:?}: {}", elapsed, e),
    }

    result
}

/// Checks if the database connection is active
pub async fn check_connection(pool: &DbPool) -> Result<(), ServiceError> {
    let start = std::time::Instant::now();
    let result = pool.ping().await.map_err(ServiceError::DatabaseError);

    let elapsed = start.elapsed();
    match &result {
        Ok(_) => {
            debug!("Database connection check successful in {:?}", elapsed);
            gauge!("feathers_db.connection_latency", elapsed.as_millis() as f64);
        }
        Err(e) => {
            error!("Database connection check failed after {:?}: {}", elapsed, e);
            counter!("feathers_db.connection_failures", 1);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_pool_connects_and_migrates() {
        let pool = establish_connection_with_config(&DbConfig {
            url: "sqlite::memory:".into(),
            max_connections: 1,
            ..Default::default()
        })
        .await
        .expect("sqlite pool");

        check_connection(&pool).await.expect("ping");
        run_migrations(&pool).await.expect("migrations");
        // Second run is a no-op
        run_migrations(&pool).await.expect("idempotent migrations");
    }

    #[tokio::test]
    async fn write_gate_admits_one_writer_at_a_time_on_sqlite() {
        let pool = establish_connection_with_config(&DbConfig {
            url: "sqlite::memory:".into(),
            max_connections: 1,
            ..Default::default()
        })
        .await
        .expect("sqlite pool");
        let gate = WriteGate::for_pool(&pool);

        let held = gate.enter().await;
        assert!(held.is_some());
        let second = tokio::time::timeout(Duration::from_millis(50), gate.enter()).await;
        assert!(second.is_err(), "second writer must wait");

        drop(held);
        assert!(gate.enter().await.is_some());
    }

    #[tokio::test]
    async fn shared_lock_upgrade_behind_another_writer_is_transient() {
        use axum::http::StatusCode;
        use sea_orm::{Statement, TransactionTrait};

        let dir = tempfile::tempdir().expect("temp dir");
        let pool = establish_connection_with_config(&DbConfig {
            url: format!("sqlite://{}?mode=rwc", dir.path().join("busy.db").display()),
            max_connections: 2,
            ..Default::default()
        })
        .await
        .expect("sqlite pool");
        pool.execute_unprepared("CREATE TABLE tills (id INTEGER PRIMARY KEY)")
            .await
            .expect("create table");

        let count = || Statement::from_string(DbBackend::Sqlite, "SELECT count(*) FROM tills");
        let first = pool.begin().await.expect("first txn");
        let second = pool.begin().await.expect("second txn");
        first.query_one(count()).await.expect("first read");
        second.query_one(count()).await.expect("second read");

        first
            .execute_unprepared("INSERT INTO tills (id) VALUES (1)")
            .await
            .expect("first writer takes the reserved lock");
        let err = second
            .execute_unprepared("INSERT INTO tills (id) VALUES (2)")
            .await
            .map(|_| ())
            .map_err(ServiceError::DatabaseError)
            .expect_err("second upgrade must fail");

        assert!(err.is_lock_contention(), "{err}");
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);

        second.rollback().await.expect("rollback");
        first.commit().await.expect("commit");
    }

    #[tokio::test]
    async fn default_write_gate_is_open() {
        let gate = WriteGate::default();
        assert!(gate.enter().await.is_none());
        assert!(gate.enter().await.is_none());
    }
}
