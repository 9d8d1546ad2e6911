//! The fluent query model (spec §4.3): filter trees, pagination,
//! aggregates, and joins, assembled into a backend-agnostic [`QuerySpec`]
//! for a SQL compiler to turn into parameterized SQL.

mod aggregate;
mod builder;
mod filter;
mod operator;
mod pagination;
mod spec;

pub use aggregate::{AggregateSpec, JoinSpec};
pub use builder::QueryBuilder;
pub use filter::{Filter, FilterValue, GroupKind};
pub use operator::{AggregateFn, JoinKind, Operator, SortDirection};
pub use pagination::Page;
pub use spec::QuerySpec;
