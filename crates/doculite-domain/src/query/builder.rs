//! Fluent [`QueryBuilder`], the `where(field)...` entry point collections
//! expose (spec §4.3/§4.4). Field-existence/operator validation against a
//! specific collection's schema happens in the SQL compiler
//! (`doculite-providers::sqlite::query`), which is the only place that
//! knows the collection's [`crate::schema::CollectionSchema`].

use super::aggregate::{AggregateSpec, JoinSpec};
use super::filter::Filter;
use super::operator::SortDirection;
use super::pagination::Page;
use super::spec::QuerySpec;
use crate::error::{Error, Result};

/// Builds a [`QuerySpec`] one clause at a time.
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    spec: QuerySpec,
}

impl QueryBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// AND a filter onto the top-level clause (spec §4.3: "top-level
    /// filters AND-combine").
    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.spec.filters = Some(match self.spec.filters.take() {
            None => filter,
            Some(Filter::Group {
                kind: super::filter::GroupKind::And,
                mut filters,
            }) => {
                filters.push(filter);
                Filter::and(filters)
            }
            Some(existing) => Filter::and(vec![existing, filter]),
        });
        self
    }

    #[must_use]
    pub fn order_by<F: Into<String>>(mut self, field: F, direction: SortDirection) -> Self {
        self.spec.order_by.push((field.into(), direction));
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: i64) -> Self {
        self.spec.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn offset(mut self, offset: i64) -> Self {
        self.spec.offset = Some(offset);
        self
    }

    /// 1-based page number + page size, per spec §4.3.
    pub fn page(mut self, page: i64, size: i64) -> Result<Self> {
        let resolved = Page::new(page, size)?;
        self.spec.limit = Some(resolved.limit);
        self.spec.offset = Some(resolved.offset);
        Ok(self)
    }

    #[must_use]
    pub fn group_by<F: Into<String>>(mut self, field: F) -> Self {
        self.spec.group_by.push(field.into());
        self
    }

    #[must_use]
    pub fn having(mut self, filter: Filter) -> Self {
        self.spec.having = Some(filter);
        self
    }

    #[must_use]
    pub fn distinct(mut self) -> Self {
        self.spec.distinct = true;
        self
    }

    #[must_use]
    pub fn aggregate(mut self, aggregate: AggregateSpec) -> Self {
        self.spec.aggregates.push(aggregate);
        self
    }

    #[must_use]
    pub fn join(mut self, join: JoinSpec) -> Self {
        self.spec.joins.push(join);
        self
    }

    #[must_use]
    pub fn select<F: Into<String>>(mut self, fields: Vec<F>) -> Self {
        self.spec.select_fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Finish building. Rejects negative limit/offset (spec §4.3:
    /// "negative limit/offset are build-time errors").
    pub fn build(self) -> Result<QuerySpec> {
        if let Some(limit) = self.spec.limit {
            if limit < 0 {
                return Err(Error::config(format!("limit must be >= 0, got {limit}")));
            }
        }
        if let Some(offset) = self.spec.offset {
            if offset < 0 {
                return Err(Error::config(format!("offset must be >= 0, got {offset}")));
            }
        }
        Ok(self.spec)
    }
}
