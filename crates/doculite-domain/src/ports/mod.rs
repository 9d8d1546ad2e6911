//! Ports: the boundary traits this crate depends on but never implements
//! (spec §4.7). Concrete implementations live in `doculite-providers`.

pub mod database;

pub use database::{
    BlockingSqlDriver, DatabaseProvider, EnginePragmas, PoolOptions, SqlDriver, SqlParam, SqlRow, SqlTransaction,
};
