//! Error taxonomy.
//!
//! Every error that crosses the collection boundary is one of these
//! variants; raw engine messages (sqlx/rusqlite) are wrapped, never
//! exposed as-is to callers. See spec §6/§7 for the category contract.

use thiserror::Error;

/// Result type alias used throughout doculite.
pub type Result<T> = std::result::Result<T, Error>;

/// Stable category attached to [`Error::Database`], mirroring the
/// taxonomy's `DatabaseError(code)` categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseErrorCode {
    /// A migration diff was classified breaking and was refused.
    BreakingMigration,
    /// A pooled driver had no connection available within its budget.
    ConnectionPoolExhausted,
    /// A new connection could not be created.
    ConnectionCreateFailed,
    /// An operation was attempted before the database finished opening.
    DbNotInitialized,
    /// A blocking call was attempted against a shared/pooled connection.
    SyncWithSharedConnection,
    /// Any other engine-reported condition not covered above.
    Other,
}

impl std::fmt::Display for DatabaseErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::BreakingMigration => "BREAKING_MIGRATION",
            Self::ConnectionPoolExhausted => "CONNECTION_POOL_EXHAUSTED",
            Self::ConnectionCreateFailed => "CONNECTION_CREATE_FAILED",
            Self::DbNotInitialized => "DB_NOT_INITIALIZED",
            Self::SyncWithSharedConnection => "SYNC_WITH_SHARED_CONNECTION",
            Self::Other => "OTHER",
        };
        f.write_str(s)
    }
}

/// Main error type for doculite.
#[derive(Error, Debug)]
pub enum Error {
    /// Schema/shape validation failed before any SQL ran.
    #[error("validation error at '{field}': {message}")]
    Validation {
        /// Dotted field path that failed validation.
        field: String,
        /// Human-readable expected-type summary.
        message: String,
    },

    /// A UNIQUE constraint (single or composite) was violated.
    #[error("unique constraint violated on '{field}': {value}")]
    UniqueConstraint {
        /// Name of the violated column, or a comma-joined composite name.
        field: String,
        /// The value that collided.
        value: String,
    },

    /// `put` targeted a document id that does not exist.
    #[error("not found: {id}")]
    NotFound {
        /// The document id that was not found.
        id: String,
    },

    /// Driver/engine-level error, classified with a stable code.
    #[error("database error ({code}): {message}")]
    Database {
        /// Stable category.
        code: DatabaseErrorCode,
        /// Description of the failure.
        message: String,
        /// Optional underlying error.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A lifecycle hook returned an error in strict mode.
    #[error("plugin error in hook '{hook}': {message}")]
    Plugin {
        /// Name of the hook that failed.
        hook: String,
        /// Description of the failure.
        message: String,
    },

    /// A lifecycle hook did not complete within its timeout.
    #[error("plugin hook '{hook}' timed out after {timeout_ms}ms")]
    PluginTimeout {
        /// Name of the hook that timed out.
        hook: String,
        /// Configured timeout, in milliseconds.
        timeout_ms: u64,
    },

    /// A collection/field/promotion was misconfigured before any IO.
    #[error("configuration error: {message}")]
    Config {
        /// Description of the misconfiguration.
        message: String,
    },
}

impl Error {
    /// Build a [`Error::Validation`].
    pub fn validation<F: Into<String>, M: Into<String>>(field: F, message: M) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Build a [`Error::UniqueConstraint`].
    pub fn unique_constraint<F: Into<String>, V: Into<String>>(field: F, value: V) -> Self {
        Self::UniqueConstraint {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Build a [`Error::NotFound`].
    pub fn not_found<I: Into<String>>(id: I) -> Self {
        Self::NotFound { id: id.into() }
    }

    /// Build a [`Error::Database`] with no source.
    pub fn database<M: Into<String>>(code: DatabaseErrorCode, message: M) -> Self {
        Self::Database {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Build a [`Error::Database`] wrapping an underlying error.
    pub fn database_with_source<M, E>(code: DatabaseErrorCode, message: M, source: E) -> Self
    where
        M: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Database {
            code,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Build a [`Error::Plugin`].
    pub fn plugin<H: Into<String>, M: Into<String>>(hook: H, message: M) -> Self {
        Self::Plugin {
            hook: hook.into(),
            message: message.into(),
        }
    }

    /// Build a [`Error::PluginTimeout`].
    pub fn plugin_timeout<H: Into<String>>(hook: H, timeout_ms: u64) -> Self {
        Self::PluginTimeout {
            hook: hook.into(),
            timeout_ms,
        }
    }

    /// Build a [`Error::Config`].
    pub fn config<M: Into<String>>(message: M) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// True if this is a [`Error::Database`] carrying `code`.
    #[must_use]
    pub fn is_database_code(&self, code: DatabaseErrorCode) -> bool {
        matches!(self, Self::Database { code: c, .. } if *c == code)
    }
}
