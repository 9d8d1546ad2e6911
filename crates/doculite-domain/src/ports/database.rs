//! SQL driver port (spec §4.7): the boundary every storage backend
//! implements, and every higher layer (DDL compiler, query compiler,
//! collection runtime, migrator) depends on only through this trait —
//! never on `sqlx`/`rusqlite` directly. Grounded on
//! `mcb_domain::ports::infrastructure::database`.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Connection pool options (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PoolOptions {
    pub max_connections: u32,
    pub max_idle_time_secs: u64,
    pub health_check_interval_secs: u64,
    pub retry_attempts: u32,
    pub retry_delay_ms: u64,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            max_connections: 5,
            max_idle_time_secs: 600,
            health_check_interval_secs: 30,
            retry_attempts: 3,
            retry_delay_ms: 200,
        }
    }
}

/// Engine pragmas applied on connect (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EnginePragmas {
    pub journal_mode: String,
    pub synchronous: String,
    pub busy_timeout_ms: u32,
    pub cache_size: i64,
    pub temp_store: String,
    pub locking_mode: String,
    pub auto_vacuum: String,
    pub wal_checkpoint: String,
}

impl Default for EnginePragmas {
    fn default() -> Self {
        Self {
            journal_mode: "WAL".to_owned(),
            synchronous: "NORMAL".to_owned(),
            busy_timeout_ms: 5_000,
            cache_size: -2_000,
            temp_store: "MEMORY".to_owned(),
            locking_mode: "NORMAL".to_owned(),
            auto_vacuum: "NONE".to_owned(),
            wal_checkpoint: "PASSIVE".to_owned(),
        }
    }
}

/// Parameter for prepared-statement binding, driver-agnostic.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Text(String),
    Integer(i64),
    Real(f64),
    Blob(Vec<u8>),
    Null,
}

/// A single query result row, exposed by column name so callers never
/// depend on a driver's native row type.
pub trait SqlRow: Send + Sync {
    fn try_get_string(&self, name: &str) -> Result<Option<String>>;
    fn try_get_i64(&self, name: &str) -> Result<Option<i64>>;
    fn try_get_f64(&self, name: &str) -> Result<Option<f64>>;
    fn try_get_blob(&self, name: &str) -> Result<Option<Vec<u8>>>;
}

/// The async SQL surface (spec §4.7/§5: "cooperative async API, all
/// IO-bearing operations may suspend").
#[async_trait]
pub trait SqlDriver: Send + Sync {
    /// Execute a statement with no result rows; returns rows affected.
    async fn exec(&self, sql: &str, params: &[SqlParam]) -> Result<u64>;

    /// Execute a query, returning every matching row.
    async fn query(&self, sql: &str, params: &[SqlParam]) -> Result<Vec<Arc<dyn SqlRow>>>;

    /// Begin a transaction. Nested transactions join the outer one
    /// (spec §4.7: "nested transactions joining the outer one").
    async fn begin(&self) -> Result<Box<dyn SqlTransaction>>;

    /// Release all resources held by this driver.
    async fn close(&self) -> Result<()>;
}

/// An open transaction, itself capable of `exec`/`query` until committed
/// or rolled back.
#[async_trait]
pub trait SqlTransaction: Send + Sync {
    async fn exec(&mut self, sql: &str, params: &[SqlParam]) -> Result<u64>;
    async fn query(&mut self, sql: &str, params: &[SqlParam]) -> Result<Vec<Arc<dyn SqlRow>>>;
    async fn commit(self: Box<Self>) -> Result<()>;
    async fn rollback(self: Box<Self>) -> Result<()>;
}

/// The blocking SQL surface, for hosts with no async runtime (spec §5).
/// A blocking surface built on a pooled/shared async driver must fail
/// with [`crate::error::DatabaseErrorCode::SyncWithSharedConnection`]
/// rather than block.
pub trait BlockingSqlDriver: Send + Sync {
    fn exec(&self, sql: &str, params: &[SqlParam]) -> Result<u64>;
    fn query(&self, sql: &str, params: &[SqlParam]) -> Result<Vec<Box<dyn SqlRow>>>;

    /// Run `body` inside a transaction, committing on `Ok` and rolling
    /// back on `Err`.
    fn transaction(&self, body: &mut dyn FnMut(&dyn BlockingSqlDriver) -> Result<()>) -> Result<()>;
}

/// Factory for connections, producing an initialized [`SqlDriver`].
/// `pool`/`pragmas` are the connection-time tuning from spec §6's
/// configuration surface; implementations apply every field they can
/// honor on the underlying engine.
#[async_trait]
pub trait DatabaseProvider: Send + Sync {
    async fn connect(&self, path: &std::path::Path, pool: &PoolOptions, pragmas: &EnginePragmas) -> Result<Arc<dyn SqlDriver>>;
    async fn connect_in_memory(&self, pool: &PoolOptions, pragmas: &EnginePragmas) -> Result<Arc<dyn SqlDriver>>;
}
