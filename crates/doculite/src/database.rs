//! Database handle (spec §4.4/§7 point 6): opens a driver, owns the
//! shared hook registry and closed-state flag, and registers
//! collections through the migrator. Grounded on the teacher's
//! connection-manager shape (`mcb_infrastructure::database::manager`),
//! narrowed from a multi-tenant pool registry to the single-driver,
//! single-process model doculite targets.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;

use doculite_domain::error::{DatabaseErrorCode, Error, Result};
use doculite_domain::ports::database::{EnginePragmas, PoolOptions, SqlDriver};
use doculite_domain::registry;
use doculite_domain::schema::{compile_schema, CollectionSchema};

use doculite_providers::sqlite::ensure_schema;

use crate::collection::Collection;
use crate::config::DoculiteConfig;
use crate::hooks::HookRegistry;

/// An open doculite database: one SQL driver, a shared hook registry,
/// and the collections registered against it.
pub struct Database {
    driver: Arc<dyn SqlDriver>,
    closed: Arc<AtomicBool>,
    hooks: Arc<HookRegistry>,
    collections: RwLock<HashMap<String, Arc<Collection>>>,
}

impl Database {
    /// Open a database per `config`, resolving the driver through
    /// [`doculite_domain::registry::resolve_driver`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the named driver isn't linked, or
    /// [`Error::Database`] if the connection cannot be opened.
    pub async fn connect(config: &DoculiteConfig) -> Result<Self> {
        let provider = registry::resolve_driver(&config.driver)?;
        let driver = if config.is_memory() {
            provider.connect_in_memory(&config.pool, &config.pragmas).await?
        } else {
            provider
                .connect(std::path::Path::new(&config.path), &config.pool, &config.pragmas)
                .await?
        };
        Ok(Self::from_driver(driver))
    }

    /// Open an in-memory database using the default driver and default
    /// pool/pragma settings, bypassing [`DoculiteConfig`] entirely.
    /// Convenient for tests and scratch use.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Database`] if the connection cannot be opened.
    pub async fn connect_in_memory() -> Result<Self> {
        let provider = registry::resolve_driver(registry::DEFAULT_DRIVER_NAME)?;
        let driver = provider
            .connect_in_memory(&PoolOptions::default(), &EnginePragmas::default())
            .await?;
        Ok(Self::from_driver(driver))
    }

    fn from_driver(driver: Arc<dyn SqlDriver>) -> Self {
        Self {
            driver,
            closed: Arc::new(AtomicBool::new(false)),
            hooks: Arc::new(HookRegistry::new()),
            collections: RwLock::new(HashMap::new()),
        }
    }

    /// The shared hook registry. Register hooks before inserting
    /// documents so `BeforeInsert` et al. observe them.
    #[must_use]
    pub fn hooks(&self) -> &HookRegistry {
        &self.hooks
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Register a collection, running the migrator to create or evolve
    /// its table (spec §4.1/§4.6). Re-registering the same name with an
    /// unchanged schema is a no-op past the version check.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `schema` is invalid, and propagates
    /// [`DatabaseErrorCode::BreakingMigration`] from the migrator.
    pub async fn register_collection<N: Into<String>>(&self, name: N, schema: CollectionSchema) -> Result<Arc<Collection>> {
        let name = name.into();
        let compiled = compile_schema(&name, &schema)?;
        ensure_schema(self.driver.as_ref(), &compiled, schema.upgrade.as_ref(), schema.seed.as_ref()).await?;

        let collection = Arc::new(Collection::new(
            name.clone(),
            schema,
            compiled,
            Arc::clone(&self.driver),
            Arc::clone(&self.closed),
            Arc::clone(&self.hooks),
        ));
        self.collections.write().await.insert(name, Arc::clone(&collection));
        Ok(collection)
    }

    /// Look up an already-registered collection by name.
    #[must_use]
    pub async fn collection(&self, name: &str) -> Option<Arc<Collection>> {
        self.collections.read().await.get(name).cloned()
    }

    /// Start a raw transaction against the underlying driver. Refuses
    /// with a "cannot start transaction on closed database" error once
    /// closed (spec §7 point 6) — the one closed-database operation
    /// that raises rather than silently no-opping.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Database`] if the database is closed, or
    /// propagates a driver error otherwise.
    pub async fn begin_transaction(&self) -> Result<Box<dyn doculite_domain::ports::database::SqlTransaction>> {
        if self.is_closed() {
            return Err(Error::database(
                DatabaseErrorCode::DbNotInitialized,
                "cannot start transaction on closed database",
            ));
        }
        self.driver.begin().await
    }

    /// Close the database. Best-effort: releases the underlying driver
    /// and marks every collection derived from it closed, so subsequent
    /// writes silently no-op and reads return empty (spec §7 point 6,
    /// §9 open question on `closeSync` visibility).
    ///
    /// # Errors
    ///
    /// Propagates a driver error from closing the underlying pool.
    pub async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::Release);
        self.driver.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doculite_domain::schema::{FieldType, PromotionDef, SchemaBuilder};

    async fn open() -> Database {
        Database::connect_in_memory().await.unwrap()
    }

    fn users_schema() -> CollectionSchema {
        SchemaBuilder::new()
            .field("email", FieldType::String)
            .promote("email", PromotionDef::plain().unique().not_null())
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn register_and_lookup_collection() {
        let db = open().await;
        db.register_collection("users", users_schema()).await.unwrap();
        assert!(db.collection("users").await.is_some());
        assert!(db.collection("missing").await.is_none());
    }

    #[tokio::test]
    async fn closed_database_rejects_new_transactions() {
        let db = open().await;
        db.close().await.unwrap();
        let err = db.begin_transaction().await.unwrap_err();
        assert!(err.is_database_code(DatabaseErrorCode::DbNotInitialized));
    }

    #[tokio::test]
    async fn closed_collection_writes_are_silent_no_ops() {
        let db = open().await;
        let users = db.register_collection("users", users_schema()).await.unwrap();
        db.close().await.unwrap();
        let doc = serde_json::json!({"email": "a@example.com"}).as_object().unwrap().clone();
        let result = users.insert(doc.clone()).await.unwrap();
        assert_eq!(result, doc);
        assert!(users.find_by_id("anything").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn seed_hook_runs_once_for_a_fresh_table() {
        let db = open().await;
        let seeded = Arc::new(std::sync::Mutex::new(false));
        let seeded_write = Arc::clone(&seeded);
        let schema = SchemaBuilder::new()
            .field("email", FieldType::String)
            .promote("email", PromotionDef::plain().unique().not_null())
            .seed(move || {
                *seeded_write.lock().unwrap() = true;
                Ok(())
            })
            .build()
            .unwrap();

        db.register_collection("users", schema).await.unwrap();
        assert!(*seeded.lock().unwrap());
    }

    #[tokio::test]
    async fn upgrade_hook_runs_once_per_intermediate_version() {
        let db = open().await;
        db.register_collection("users", users_schema()).await.unwrap();

        let seen_versions = Arc::new(std::sync::Mutex::new(Vec::new()));
        let seen_write = Arc::clone(&seen_versions);
        let schema = SchemaBuilder::new()
            .version(3)
            .field("email", FieldType::String)
            .optional_field("nickname", FieldType::String)
            .promote("email", PromotionDef::plain().unique().not_null())
            .promote("nickname", PromotionDef::plain())
            .upgrade(move |version| {
                seen_write.lock().unwrap().push(version);
                Ok(())
            })
            .build()
            .unwrap();

        db.register_collection("users", schema).await.unwrap();
        assert_eq!(*seen_versions.lock().unwrap(), vec![2, 3]);
    }
}
