//! Hook dispatcher: the IO-bearing half of `doculite_domain::hooks`,
//! adding the timeout clock the pure domain layer can't own. Grounded
//! on the teacher's event-bus dispatch pattern (`mcb_domain::events`),
//! generalized from pub/sub fan-out to a per-point ordered list with
//! bounded per-hook timeout (spec §5: "each hook has an individual
//! timeout... exceeding it yields a timeout error scoped to that hook").

use std::sync::Arc;
use std::time::Duration;

use doculite_domain::error::{Error, Result};
use doculite_domain::hooks::{Hook, HookContext, HookPoint, HookPolicy, DEFAULT_HOOK_TIMEOUT_MS};

/// One registered hook: its handler, the policy to apply on failure, and
/// its individual timeout.
struct Registration {
    name: String,
    hook: Arc<dyn Hook>,
    policy: HookPolicy,
    timeout: Duration,
}

/// Ordered registry of lifecycle hooks for one collection (or database-
/// wide, when shared). Registrations fire in registration order at
/// their matching [`HookPoint`].
#[derive(Default)]
pub struct HookRegistry {
    registrations: Vec<(HookPoint, Registration)>,
}

impl HookRegistry {
    /// Start an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `hook` to run at `point`, under the default timeout
    /// (5s) and [`HookPolicy::Strict`].
    pub fn register<N: Into<String>>(&mut self, name: N, point: HookPoint, hook: Arc<dyn Hook>) {
        self.register_with(name, point, hook, HookPolicy::Strict, DEFAULT_HOOK_TIMEOUT_MS);
    }

    /// Register `hook` with an explicit policy and timeout.
    pub fn register_with<N: Into<String>>(
        &mut self,
        name: N,
        point: HookPoint,
        hook: Arc<dyn Hook>,
        policy: HookPolicy,
        timeout_ms: u64,
    ) {
        self.registrations.push((
            point,
            Registration {
                name: name.into(),
                hook,
                policy,
                timeout: Duration::from_millis(timeout_ms),
            },
        ));
    }

    /// Run every hook registered at `ctx.point`, in registration order.
    ///
    /// For `before*` points, a handler returning `Some(document)` replaces
    /// the document carried forward into the next handler and, ultimately,
    /// back to the caller (spec §4.4: "the runtime must pass the
    /// possibly-mutated value forward").
    ///
    /// # Errors
    ///
    /// Returns [`Error::PluginTimeout`] if a hook exceeds its timeout, or
    /// [`Error::Plugin`] if a [`HookPolicy::Strict`] hook returns an
    /// error. [`HookPolicy::Lenient`] failures are logged via
    /// `tracing::warn!` and swallowed.
    pub async fn dispatch(&self, mut ctx: HookContext) -> Result<Option<doculite_domain::document::Document>> {
        let point = ctx.point;
        let mut carried = ctx.document.clone();

        for (registered_point, reg) in &self.registrations {
            if *registered_point != point {
                continue;
            }
            ctx.document = carried.clone();

            let result = tokio::time::timeout(reg.timeout, reg.hook.call(ctx.clone())).await;

            match result {
                Ok(Ok(Some(replaced))) if point.is_before() => {
                    carried = Some(replaced);
                }
                Ok(Ok(_)) => {}
                Ok(Err(err)) => {
                    handle_failure(reg, &err.to_string(), reg.policy)?;
                }
                Err(_elapsed) => {
                    let timeout_err = Error::plugin_timeout(reg.name.clone(), reg.timeout.as_millis() as u64);
                    handle_failure(reg, &timeout_err.to_string(), reg.policy)?;
                }
            }
        }

        Ok(carried)
    }
}

fn handle_failure(reg: &Registration, message: &str, policy: HookPolicy) -> Result<()> {
    match policy {
        HookPolicy::Strict => Err(Error::plugin(reg.name.clone(), message.to_owned())),
        HookPolicy::Lenient => {
            tracing::warn!(hook = %reg.name, error = %message, "doculite.hooks lenient hook failed, continuing");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use doculite_domain::document::Document;

    struct AlwaysFails;

    #[async_trait]
    impl Hook for AlwaysFails {
        async fn call(&self, _ctx: HookContext) -> Result<Option<Document>> {
            Err(Error::plugin("always_fails", "boom"))
        }
    }

    struct Replaces;

    #[async_trait]
    impl Hook for Replaces {
        async fn call(&self, ctx: HookContext) -> Result<Option<Document>> {
            let mut doc = ctx.document.unwrap_or_default();
            doc.insert("touched".to_owned(), serde_json::Value::Bool(true));
            Ok(Some(doc))
        }
    }

    #[tokio::test]
    async fn strict_hook_failure_propagates() {
        let mut registry = HookRegistry::new();
        registry.register("fails", HookPoint::BeforeInsert, Arc::new(AlwaysFails));
        let ctx = HookContext {
            collection: "widgets".into(),
            point: HookPoint::BeforeInsert,
            id: None,
            document: None,
            error_message: None,
        };
        let result = registry.dispatch(ctx).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn lenient_hook_failure_is_swallowed() {
        let mut registry = HookRegistry::new();
        registry.register_with(
            "fails",
            HookPoint::BeforeInsert,
            Arc::new(AlwaysFails),
            HookPolicy::Lenient,
            DEFAULT_HOOK_TIMEOUT_MS,
        );
        let ctx = HookContext {
            collection: "widgets".into(),
            point: HookPoint::BeforeInsert,
            id: None,
            document: None,
            error_message: None,
        };
        assert!(registry.dispatch(ctx).await.is_ok());
    }

    #[tokio::test]
    async fn before_hook_mutation_is_carried_forward() {
        let mut registry = HookRegistry::new();
        registry.register("replaces", HookPoint::BeforeInsert, Arc::new(Replaces));
        let ctx = HookContext {
            collection: "widgets".into(),
            point: HookPoint::BeforeInsert,
            id: None,
            document: Some(serde_json::Map::new()),
            error_message: None,
        };
        let result = registry.dispatch(ctx).await.unwrap();
        assert_eq!(result.unwrap().get("touched"), Some(&serde_json::Value::Bool(true)));
    }
}
