//! Schema model: declaring collections, compiling them into a canonical
//! DDL-facing form, and resolving field paths to storage locations.

mod builder;
mod compile;
mod infer;
mod resolve;
mod types;

pub use builder::{CollectionSchema, IndexSpec, SchemaBuilder, SeedHook, UpgradeHook};
pub use compile::{column_name_for_path, compile_schema};
pub use infer::infer_storage_type;
pub use resolve::{FieldAccess, FieldResolver};
pub use types::{
    ColumnDef, ColumnType, FieldDef, FieldType, ForeignKeyDef, IndexDef, PromotionDef, RefAction,
    Schema, SchemaDdlGenerator, TableDef, UniqueConstraintDef, VectorType,
};
