//! Filter tree: leaf predicates, `And`/`Or` groups, and subquery filters
//! (spec §4.3).

use super::operator::Operator;
use super::spec::QuerySpec;

/// A bound filter value. Lists are only valid with `In`/`NotIn`.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    String(String),
    Integer(i64),
    Real(f64),
    Bool(bool),
    Null,
    List(Vec<FilterValue>),
}

impl From<&str> for FilterValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_owned())
    }
}
impl From<String> for FilterValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}
impl From<i64> for FilterValue {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}
impl From<f64> for FilterValue {
    fn from(v: f64) -> Self {
        Self::Real(v)
    }
}
impl From<bool> for FilterValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

/// How sibling filters in a [`Filter::Group`] combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKind {
    And,
    Or,
}

/// One node of the filter tree.
#[derive(Debug, Clone)]
pub enum Filter {
    /// A single field predicate.
    Leaf {
        field: String,
        operator: Operator,
        value: Option<FilterValue>,
        /// Second bound for `Between`.
        value2: Option<FilterValue>,
        /// For `Operator::JsonArrayLength`, the comparison applied to the
        /// computed length (e.g. `Gt` in `len(tags) > 3`).
        length_cmp: Option<Operator>,
    },
    /// A nested `And`/`Or` group.
    Group { kind: GroupKind, filters: Vec<Filter> },
    /// `Exists`/`NotExists`/`In`/`NotIn` against a correlated subquery.
    Subquery {
        field: String,
        operator: Operator,
        subquery: Box<QuerySpec>,
        subquery_collection: String,
    },
}

impl Filter {
    /// Build a plain leaf predicate with a single bound value.
    #[must_use]
    pub fn leaf<F: Into<String>, V: Into<FilterValue>>(field: F, operator: Operator, value: V) -> Self {
        Self::Leaf {
            field: field.into(),
            operator,
            value: Some(value.into()),
            value2: None,
            length_cmp: None,
        }
    }

    /// Build a `Between(a, b)` leaf predicate.
    #[must_use]
    pub fn between<F, A, B>(field: F, low: A, high: B) -> Self
    where
        F: Into<String>,
        A: Into<FilterValue>,
        B: Into<FilterValue>,
    {
        Self::Leaf {
            field: field.into(),
            operator: Operator::Between,
            value: Some(low.into()),
            value2: Some(high.into()),
            length_cmp: None,
        }
    }

    /// Build an `Exists`/`NotExists` leaf predicate (no bound value).
    #[must_use]
    pub fn exists<F: Into<String>>(field: F) -> Self {
        Self::Leaf {
            field: field.into(),
            operator: Operator::Exists,
            value: None,
            value2: None,
            length_cmp: None,
        }
    }

    /// Build an `In`/`NotIn` leaf predicate over a list of values.
    #[must_use]
    pub fn in_list<F: Into<String>, V: Into<FilterValue>>(
        field: F,
        operator: Operator,
        values: Vec<V>,
    ) -> Self {
        Self::Leaf {
            field: field.into(),
            operator,
            value: Some(FilterValue::List(values.into_iter().map(Into::into).collect())),
            value2: None,
            length_cmp: None,
        }
    }

    /// Build the synthetic `JsonArrayLength(field) <cmp> n` predicate.
    #[must_use]
    pub fn array_length<F: Into<String>>(field: F, cmp: Operator, n: i64) -> Self {
        Self::Leaf {
            field: field.into(),
            operator: Operator::JsonArrayLength,
            value: Some(FilterValue::Integer(n)),
            value2: None,
            length_cmp: Some(cmp),
        }
    }

    /// Combine `filters` with `And`.
    #[must_use]
    pub fn and(filters: Vec<Filter>) -> Self {
        Self::Group {
            kind: GroupKind::And,
            filters,
        }
    }

    /// Combine `filters` with `Or`.
    #[must_use]
    pub fn or(filters: Vec<Filter>) -> Self {
        Self::Group {
            kind: GroupKind::Or,
            filters,
        }
    }
}
