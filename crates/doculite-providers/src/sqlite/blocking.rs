//! Blocking SQLite driver (spec §4.7/§5): a synchronous surface for
//! hosts with no async runtime, backed by a mutex-guarded
//! `rusqlite::Connection`. Grounded on the `Mutex<Connection>` pattern
//! in `other_examples/*-rag-db.rs.rs`.

use parking_lot::Mutex;

use doculite_domain::error::{DatabaseErrorCode, Error, Result};
use doculite_domain::ports::database::{BlockingSqlDriver, SqlParam, SqlRow};

fn bind_value(param: &SqlParam) -> rusqlite::types::Value {
    match param {
        SqlParam::Text(s) => rusqlite::types::Value::Text(s.clone()),
        SqlParam::Integer(n) => rusqlite::types::Value::Integer(*n),
        SqlParam::Real(r) => rusqlite::types::Value::Real(*r),
        SqlParam::Blob(b) => rusqlite::types::Value::Blob(b.clone()),
        SqlParam::Null => rusqlite::types::Value::Null,
    }
}

struct RusqliteRow {
    values: std::collections::HashMap<String, rusqlite::types::Value>,
}

impl SqlRow for RusqliteRow {
    fn try_get_string(&self, name: &str) -> Result<Option<String>> {
        Ok(match self.values.get(name) {
            Some(rusqlite::types::Value::Text(s)) => Some(s.clone()),
            _ => None,
        })
    }
    fn try_get_i64(&self, name: &str) -> Result<Option<i64>> {
        Ok(match self.values.get(name) {
            Some(rusqlite::types::Value::Integer(n)) => Some(*n),
            _ => None,
        })
    }
    fn try_get_f64(&self, name: &str) -> Result<Option<f64>> {
        Ok(match self.values.get(name) {
            Some(rusqlite::types::Value::Real(r)) => Some(*r),
            _ => None,
        })
    }
    fn try_get_blob(&self, name: &str) -> Result<Option<Vec<u8>>> {
        Ok(match self.values.get(name) {
            Some(rusqlite::types::Value::Blob(b)) => Some(b.clone()),
            _ => None,
        })
    }
}

fn map_rusqlite_error(err: rusqlite::Error) -> Error {
    if let rusqlite::Error::SqliteFailure(ref e, Some(ref msg)) = err {
        if e.code == rusqlite::ErrorCode::ConstraintViolation && msg.contains("UNIQUE") {
            let field = msg.rsplit_once('.').map_or_else(|| msg.clone(), |(_, f)| f.to_owned());
            return Error::unique_constraint(field, "");
        }
    }
    Error::database_with_source(DatabaseErrorCode::Other, "SQL failed", err)
}

fn run_query(conn: &rusqlite::Connection, sql: &str, params: &[SqlParam]) -> Result<Vec<RusqliteRow>> {
    let mut stmt = conn.prepare(sql).map_err(map_rusqlite_error)?;
    let bound: Vec<rusqlite::types::Value> = params.iter().map(bind_value).collect();
    let column_names: Vec<String> = stmt.column_names().iter().map(|s| (*s).to_owned()).collect();

    let rows = stmt
        .query_map(rusqlite::params_from_iter(bound), |row| {
            let mut values = std::collections::HashMap::new();
            for (i, name) in column_names.iter().enumerate() {
                let value: rusqlite::types::Value = row.get(i)?;
                values.insert(name.clone(), value);
            }
            Ok(RusqliteRow { values })
        })
        .map_err(map_rusqlite_error)?;

    rows.collect::<std::result::Result<Vec<_>, _>>().map_err(map_rusqlite_error)
}

/// Kind of connection a [`BlockingSqliteDriver`] was built from. Only
/// [`ConnectionKind::Owned`] can honour blocking calls; anything shared
/// with an async pool must refuse per spec §5/§9.
enum ConnectionKind {
    Owned(Mutex<rusqlite::Connection>),
    /// Placeholder marking a driver that wraps a shared/pooled async
    /// connection and must always fail fast.
    SharedWithAsyncPool,
}

/// Blocking driver over an owned `rusqlite::Connection`, or a stub that
/// always reports [`DatabaseErrorCode::SyncWithSharedConnection`] when
/// constructed from a connection the async surface already owns.
pub struct BlockingSqliteDriver {
    kind: ConnectionKind,
}

impl BlockingSqliteDriver {
    /// Open a dedicated blocking connection at `path` (or `:memory:`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Database`] if the connection cannot be opened.
    pub fn open(path: &std::path::Path) -> Result<Self> {
        let conn = rusqlite::Connection::open(path)
            .map_err(|e| Error::database_with_source(DatabaseErrorCode::ConnectionCreateFailed, "open blocking SQLite connection", e))?;
        conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA journal_mode = WAL;")
            .map_err(|e| Error::database_with_source(DatabaseErrorCode::ConnectionCreateFailed, "configure blocking connection", e))?;
        Ok(Self {
            kind: ConnectionKind::Owned(Mutex::new(conn)),
        })
    }

    /// Build a driver that always fails with
    /// [`DatabaseErrorCode::SyncWithSharedConnection`]: used when the
    /// host's database was opened on a pooled/shared async driver, which
    /// cannot honour blocking calls without risking a deadlock (spec §9,
    /// "never silently busy-wait").
    #[must_use]
    pub fn shared_with_async_pool() -> Self {
        Self {
            kind: ConnectionKind::SharedWithAsyncPool,
        }
    }

    fn shared_error() -> Error {
        Error::database(
            DatabaseErrorCode::SyncWithSharedConnection,
            "blocking calls are not supported against a shared/pooled async connection",
        )
    }
}

impl BlockingSqlDriver for BlockingSqliteDriver {
    fn exec(&self, sql: &str, params: &[SqlParam]) -> Result<u64> {
        let ConnectionKind::Owned(mutex) = &self.kind else {
            return Err(Self::shared_error());
        };
        let conn = mutex.lock();
        let bound: Vec<rusqlite::types::Value> = params.iter().map(bind_value).collect();
        let affected = conn
            .execute(sql, rusqlite::params_from_iter(bound))
            .map_err(map_rusqlite_error)?;
        Ok(affected as u64)
    }

    fn query(&self, sql: &str, params: &[SqlParam]) -> Result<Vec<Box<dyn SqlRow>>> {
        let ConnectionKind::Owned(mutex) = &self.kind else {
            return Err(Self::shared_error());
        };
        let conn = mutex.lock();
        let rows = run_query(&conn, sql, params)?;
        Ok(rows.into_iter().map(|r| Box::new(r) as Box<dyn SqlRow>).collect())
    }

    fn transaction(&self, body: &mut dyn FnMut(&dyn BlockingSqlDriver) -> Result<()>) -> Result<()> {
        let ConnectionKind::Owned(mutex) = &self.kind else {
            return Err(Self::shared_error());
        };
        {
            let conn = mutex.lock();
            conn.execute_batch("BEGIN").map_err(map_rusqlite_error)?;
        }
        match body(self) {
            Ok(()) => {
                let conn = mutex.lock();
                conn.execute_batch("COMMIT").map_err(map_rusqlite_error)
            }
            Err(err) => {
                let conn = mutex.lock();
                conn.execute_batch("ROLLBACK").ok();
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_driver_fails_with_sync_with_shared_connection() {
        let driver = BlockingSqliteDriver::shared_with_async_pool();
        let err = driver.exec("SELECT 1", &[]).unwrap_err();
        assert!(err.is_database_code(DatabaseErrorCode::SyncWithSharedConnection));
    }

    #[test]
    fn owned_driver_execs_and_queries() {
        let driver = BlockingSqliteDriver::open(std::path::Path::new(":memory:")).unwrap();
        driver.exec("CREATE TABLE t (id INTEGER, name TEXT)", &[]).unwrap();
        driver
            .exec("INSERT INTO t (id, name) VALUES (?, ?)", &[SqlParam::Integer(1), SqlParam::Text("a".into())])
            .unwrap();
        let rows = driver.query("SELECT id, name FROM t", &[]).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].try_get_string("name").unwrap(), Some("a".to_owned()));
    }

    #[test]
    fn transaction_rolls_back_on_error() {
        let driver = BlockingSqliteDriver::open(std::path::Path::new(":memory:")).unwrap();
        driver.exec("CREATE TABLE t (id INTEGER)", &[]).unwrap();
        let result = driver.transaction(&mut |d| {
            d.exec("INSERT INTO t (id) VALUES (1)", &[])?;
            Err(Error::config("abort"))
        });
        assert!(result.is_err());
        let rows = driver.query("SELECT id FROM t", &[]).unwrap();
        assert!(rows.is_empty());
    }
}
