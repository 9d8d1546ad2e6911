//! Async SQLite driver, wrapping `sqlx::SqlitePool` (spec §4.7). Grounded
//! on `mcb_providers::database::sqlite::executor::SqliteExecutor`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use doculite_domain::error::{DatabaseErrorCode, Error, Result};
use doculite_domain::ports::database::{
    DatabaseProvider, EnginePragmas, PoolOptions, SqlDriver, SqlParam, SqlRow, SqlTransaction,
};
use sqlx::{Column, Row};

/// Row adapter that copies column values out of a `sqlx::sqlite::SqliteRow`
/// so it can be returned as `Arc<dyn SqlRow>` without borrowing the
/// connection.
#[derive(Debug)]
struct SqliteMappedRow {
    strings: HashMap<String, Option<String>>,
    i64s: HashMap<String, Option<i64>>,
    f64s: HashMap<String, Option<f64>>,
    blobs: HashMap<String, Option<Vec<u8>>>,
}

impl SqliteMappedRow {
    fn from_sqlite_row(row: &sqlx::sqlite::SqliteRow) -> Self {
        let mut strings = HashMap::new();
        let mut i64s = HashMap::new();
        let mut f64s = HashMap::new();
        let mut blobs = HashMap::new();
        for (i, col) in row.columns().iter().enumerate() {
            let name = col.name().to_owned();
            if let Ok(opt) = row.try_get::<Option<String>, _>(i) {
                strings.insert(name, opt);
            } else if let Ok(opt) = row.try_get::<Option<i64>, _>(i) {
                i64s.insert(name, opt);
            } else if let Ok(opt) = row.try_get::<Option<f64>, _>(i) {
                f64s.insert(name, opt);
            } else if let Ok(opt) = row.try_get::<Option<Vec<u8>>, _>(i) {
                blobs.insert(name, opt);
            } else {
                strings.insert(name, None);
            }
        }
        Self { strings, i64s, f64s, blobs }
    }
}

impl SqlRow for SqliteMappedRow {
    fn try_get_string(&self, name: &str) -> Result<Option<String>> {
        Ok(self.strings.get(name).cloned().flatten())
    }
    fn try_get_i64(&self, name: &str) -> Result<Option<i64>> {
        Ok(self.i64s.get(name).copied().flatten())
    }
    fn try_get_f64(&self, name: &str) -> Result<Option<f64>> {
        Ok(self.f64s.get(name).copied().flatten())
    }
    fn try_get_blob(&self, name: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.blobs.get(name).cloned().flatten())
    }
}

fn bind_params<'q>(
    mut query: sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
    params: &'q [SqlParam],
) -> sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
    for p in params {
        query = match p {
            SqlParam::Text(s) => query.bind(s.as_str()),
            SqlParam::Integer(n) => query.bind(*n),
            SqlParam::Real(r) => query.bind(*r),
            SqlParam::Blob(b) => query.bind(b.as_slice()),
            SqlParam::Null => query.bind(Option::<String>::None),
        };
    }
    query
}

fn map_sqlx_error(sql: &str, err: sqlx::Error) -> Error {
    if let sqlx::Error::Database(ref db_err) = err {
        if db_err.code().as_deref() == Some("2067") || db_err.message().contains("UNIQUE constraint failed") {
            let field = db_err
                .message()
                .rsplit_once(':')
                .map_or_else(|| db_err.message().to_owned(), |(_, f)| f.trim().to_owned());
            return Error::unique_constraint(field, "");
        }
    }
    Error::database_with_source(DatabaseErrorCode::Other, format!("SQL failed: {sql}"), err)
}

/// Async driver over a pooled `sqlx::SqlitePool`.
pub struct AsyncSqliteDriver {
    pool: sqlx::SqlitePool,
}

impl AsyncSqliteDriver {
    #[must_use]
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &sqlx::SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl SqlDriver for AsyncSqliteDriver {
    async fn exec(&self, sql: &str, params: &[SqlParam]) -> Result<u64> {
        let query = bind_params(sqlx::query(sql), params);
        let result = query
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(sql, e))?;
        Ok(result.rows_affected())
    }

    async fn query(&self, sql: &str, params: &[SqlParam]) -> Result<Vec<Arc<dyn SqlRow>>> {
        let query = bind_params(sqlx::query(sql), params);
        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(sql, e))?;
        Ok(rows
            .iter()
            .map(|r| Arc::new(SqliteMappedRow::from_sqlite_row(r)) as Arc<dyn SqlRow>)
            .collect())
    }

    async fn begin(&self) -> Result<Box<dyn SqlTransaction>> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| Error::database_with_source(DatabaseErrorCode::ConnectionCreateFailed, "begin failed", e))?;
        Ok(Box::new(AsyncSqliteTransaction { tx: Some(tx) }))
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }
}

struct AsyncSqliteTransaction {
    tx: Option<sqlx::Transaction<'static, sqlx::Sqlite>>,
}

impl AsyncSqliteTransaction {
    fn active(&mut self) -> Result<&mut sqlx::Transaction<'static, sqlx::Sqlite>> {
        self.tx
            .as_mut()
            .ok_or_else(|| Error::database(DatabaseErrorCode::Other, "transaction already finished"))
    }
}

#[async_trait]
impl SqlTransaction for AsyncSqliteTransaction {
    async fn exec(&mut self, sql: &str, params: &[SqlParam]) -> Result<u64> {
        let conn = self.active()?;
        let query = bind_params(sqlx::query(sql), params);
        let result = query.execute(&mut **conn).await.map_err(|e| map_sqlx_error(sql, e))?;
        Ok(result.rows_affected())
    }

    async fn query(&mut self, sql: &str, params: &[SqlParam]) -> Result<Vec<Arc<dyn SqlRow>>> {
        let conn = self.active()?;
        let query = bind_params(sqlx::query(sql), params);
        let rows = query.fetch_all(&mut **conn).await.map_err(|e| map_sqlx_error(sql, e))?;
        Ok(rows
            .iter()
            .map(|r| Arc::new(SqliteMappedRow::from_sqlite_row(r)) as Arc<dyn SqlRow>)
            .collect())
    }

    async fn commit(mut self: Box<Self>) -> Result<()> {
        let tx = self
            .tx
            .take()
            .ok_or_else(|| Error::database(DatabaseErrorCode::Other, "transaction already finished"))?;
        tx.commit()
            .await
            .map_err(|e| Error::database_with_source(DatabaseErrorCode::Other, "commit failed", e))
    }

    async fn rollback(mut self: Box<Self>) -> Result<()> {
        let tx = self
            .tx
            .take()
            .ok_or_else(|| Error::database(DatabaseErrorCode::Other, "transaction already finished"))?;
        tx.rollback()
            .await
            .map_err(|e| Error::database_with_source(DatabaseErrorCode::Other, "rollback failed", e))
    }
}

/// Connection factory registered under the `"sqlite"` driver name.
#[derive(Debug, Clone, Default)]
pub struct SqliteDatabaseProvider;

fn build_sqlite_provider() -> Arc<dyn DatabaseProvider> {
    Arc::new(SqliteDatabaseProvider)
}

#[linkme::distributed_slice(doculite_domain::registry::DRIVER_PROVIDERS)]
static SQLITE_DRIVER_PROVIDER: doculite_domain::registry::DriverProviderEntry =
    doculite_domain::registry::DriverProviderEntry {
        name: "sqlite",
        build: build_sqlite_provider,
    };

#[async_trait]
impl DatabaseProvider for SqliteDatabaseProvider {
    async fn connect(&self, path: &std::path::Path, pool: &PoolOptions, pragmas: &EnginePragmas) -> Result<Arc<dyn SqlDriver>> {
        let url = format!("sqlite://{}?mode=rwc", path.display());
        connect_url(&url, pool, pragmas).await
    }

    async fn connect_in_memory(&self, pool: &PoolOptions, pragmas: &EnginePragmas) -> Result<Arc<dyn SqlDriver>> {
        connect_url("sqlite::memory:", pool, pragmas).await
    }
}

static VEC_EXTENSION_REGISTERED: std::sync::Once = std::sync::Once::new();

/// Register `sqlite-vec` as an auto-extension so every connection opened
/// by the process (sqlx pool or rusqlite) gets `vec0` for free. Must run
/// before the first connection is opened; `Once` makes repeated calls
/// across multiple `connect`/`connect_in_memory` calls harmless.
#[allow(unsafe_code)]
fn ensure_vec_extension_registered() {
    VEC_EXTENSION_REGISTERED.call_once(|| unsafe {
        rusqlite::ffi::sqlite3_auto_extension(Some(std::mem::transmute(
            sqlite_vec::sqlite3_vec_init as *const (),
        )));
    });
}

async fn connect_url(url: &str, pool_opts: &PoolOptions, pragmas: &EnginePragmas) -> Result<Arc<dyn SqlDriver>> {
    use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
    use std::str::FromStr;
    use std::time::Duration;

    ensure_vec_extension_registered();

    let options = SqliteConnectOptions::from_str(url)
        .map_err(|e| Error::database_with_source(DatabaseErrorCode::ConnectionCreateFailed, "invalid connection URL", e))?
        .foreign_keys(true)
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(pool_opts.max_connections)
        .idle_timeout(Some(Duration::from_secs(pool_opts.max_idle_time_secs)))
        .acquire_timeout(Duration::from_millis(u64::from(pool_opts.retry_attempts) * pool_opts.retry_delay_ms.max(1)))
        .test_before_acquire(pool_opts.health_check_interval_secs > 0)
        .connect_with(options)
        .await
        .map_err(|e| Error::database_with_source(DatabaseErrorCode::ConnectionCreateFailed, "failed to open SQLite pool", e))?;

    for statement in pragma_statements(pragmas) {
        sqlx::query(&statement)
            .execute(&pool)
            .await
            .map_err(|e| Error::database_with_source(DatabaseErrorCode::ConnectionCreateFailed, format!("apply '{statement}'"), e))?;
    }

    tracing::info!(url, "doculite.driver opened SQLite pool");
    Ok(Arc::new(AsyncSqliteDriver::new(pool)))
}

/// Render every documented engine pragma (spec §6) as a standalone
/// `PRAGMA` statement, in application order.
fn pragma_statements(pragmas: &EnginePragmas) -> Vec<String> {
    vec![
        format!("PRAGMA journal_mode = {};", pragmas.journal_mode),
        format!("PRAGMA synchronous = {};", pragmas.synchronous),
        format!("PRAGMA busy_timeout = {};", pragmas.busy_timeout_ms),
        format!("PRAGMA cache_size = {};", pragmas.cache_size),
        format!("PRAGMA temp_store = {};", pragmas.temp_store),
        format!("PRAGMA locking_mode = {};", pragmas.locking_mode),
        format!("PRAGMA auto_vacuum = {};", pragmas.auto_vacuum),
        format!("PRAGMA wal_checkpoint({});", pragmas.wal_checkpoint),
    ]
}
