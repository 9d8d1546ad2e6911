//! Filter operators (spec §4.3).

/// A leaf predicate's comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    NotIn,
    Like,
    ILike,
    StartsWith,
    EndsWith,
    Contains,
    Exists,
    /// Only valid on a [`super::filter::Filter::Subquery`] node.
    NotExists,
    Between,
    JsonArrayContains,
    JsonArrayNotContains,
    /// Synthetic: `JsonArrayLength(field) <op> n`. The inner comparison
    /// operator is carried separately on the filter node.
    JsonArrayLength,
}

/// Sort direction for an `order_by` clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Supported aggregate functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFn {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregateFn {
    /// SQL function keyword.
    #[must_use]
    pub fn sql(self) -> &'static str {
        match self {
            Self::Count => "COUNT",
            Self::Sum => "SUM",
            Self::Avg => "AVG",
            Self::Min => "MIN",
            Self::Max => "MAX",
        }
    }
}

/// Join kind (spec §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
}
