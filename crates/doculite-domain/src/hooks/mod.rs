//! Lifecycle hook contract (spec §5/§9): typed before/after/error events
//! dispatched around every collection write, with a per-hook timeout and
//! a strict/lenient failure policy. Generalized from the teacher's
//! pub/sub `EventPublisher` into point-in-time hook dispatch; the actual
//! dispatcher (which needs a timeout clock) lives in `doculite::hooks`,
//! since this crate does no IO.

use async_trait::async_trait;

use crate::document::Document;
use crate::error::Result;

/// Default per-hook timeout, per spec §5.
pub const DEFAULT_HOOK_TIMEOUT_MS: u64 = 5_000;

/// The point in a write operation's lifecycle a hook observes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookPoint {
    BeforeInsert,
    AfterInsert,
    BeforeUpdate,
    AfterUpdate,
    BeforeUpsert,
    AfterUpsert,
    BeforeDelete,
    AfterDelete,
    /// Fired once, isolated from `before*`/`after*` sequencing, when the
    /// operation fails at any stage.
    OnError,
}

impl HookPoint {
    /// True for the `before*` family, whose return value may replace the
    /// document carried into validation and the SQL write.
    #[must_use]
    pub fn is_before(self) -> bool {
        matches!(
            self,
            Self::BeforeInsert | Self::BeforeUpdate | Self::BeforeUpsert | Self::BeforeDelete
        )
    }
}

/// The data carried into a hook invocation.
#[derive(Debug, Clone)]
pub struct HookContext {
    pub collection: String,
    pub point: HookPoint,
    pub id: Option<String>,
    pub document: Option<Document>,
    /// Set only for [`HookPoint::OnError`].
    pub error_message: Option<String>,
}

/// A registered hook handler. A `before*` handler may return
/// `Some(document)` to replace the carried document; any other handler
/// should return `None`.
#[async_trait]
pub trait Hook: Send + Sync {
    async fn call(&self, ctx: HookContext) -> Result<Option<Document>>;
}

/// Whether a failing hook aborts the operation ([`Strict`]) or is logged
/// and ignored ([`Lenient`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookPolicy {
    Strict,
    Lenient,
}

impl Default for HookPolicy {
    fn default() -> Self {
        Self::Strict
    }
}
