//! SQLite backend: DDL compiler, query compiler, async/blocking
//! drivers, vector engine, and migrator.

mod blocking;
mod ddl;
mod driver;
mod migrate;
mod query;
mod vector;

pub use blocking::BlockingSqliteDriver;
pub use ddl::{alter_table_add_column, SqliteSchemaDdlGenerator};
pub use driver::{AsyncSqliteDriver, SqliteDatabaseProvider};
pub use migrate::{
    describe_steps, ensure_schema, plan_migration, AlterStep, MigrationPlan, MIGRATIONS_TABLE,
};
pub use query::{compile_select, CompiledQuery};
pub use vector::{
    delete_sidecar_row, encode_vector, sidecar_table, upsert_sidecar_row, validate_vector_query,
    vector_search, VectorHit,
};
