//! Embedded, schema-validated document database over SQLite: fluent
//! queries, vector search, and migrations, layered on
//! `doculite-domain`'s pure schema/query model and
//! `doculite-providers`'s SQLite backend.
//!
//! ```ignore
//! let db = Database::connect_in_memory().await?;
//! let users = db.register_collection("users", SchemaBuilder::new()
//!     .field("email", FieldType::String)
//!     .promote("email", PromotionDef::plain().unique().not_null())
//!     .build()?).await?;
//! let doc = users.insert(serde_json::json!({"email": "a@x.com"}).as_object().unwrap().clone()).await?;
//! ```

pub mod collection;
pub mod config;
pub mod database;
pub mod hooks;

pub use collection::Collection;
pub use config::{ConfigLoader, DoculiteConfig, EnginePragmas, PoolOptions, RemoteOptions};
pub use database::Database;
pub use hooks::HookRegistry;

pub use doculite_domain::document::Document;
pub use doculite_domain::error::{DatabaseErrorCode, Error, Result};
pub use doculite_domain::hooks::{Hook, HookContext, HookPoint, HookPolicy};
pub use doculite_domain::query::{
    AggregateFn, AggregateSpec, Filter, FilterValue, GroupKind, JoinKind, JoinSpec, Operator, Page,
    QueryBuilder, QuerySpec, SortDirection,
};
pub use doculite_domain::schema::{
    CollectionSchema, ColumnDef, ColumnType, FieldDef, FieldResolver, FieldType, ForeignKeyDef, IndexDef,
    IndexSpec, PromotionDef, RefAction, Schema, SchemaBuilder, SeedHook, TableDef, UniqueConstraintDef,
    UpgradeHook, VectorType,
};
