//! Shared field-access resolution (spec §4.3): every SQL-facing component
//! that needs to read a document field — the query compiler, the DDL
//! index compiler — must agree on whether a path reads from a promoted
//! column or from `json_extract(doc, '$.path')`. This is decided here
//! once, so the two compilers can never disagree.

use std::collections::HashMap;

use super::builder::CollectionSchema;
use super::compile::column_name_for_path;

/// Where a field path's value physically lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldAccess {
    /// Lives in a real, promoted column of this name.
    Column(String),
    /// Must be read out of the JSON `doc` column at this dotted path.
    Json(String),
}

/// Resolves document field paths to their physical storage location for
/// one collection's compiled schema.
#[derive(Debug, Clone)]
pub struct FieldResolver {
    promoted: HashMap<String, String>,
}

impl FieldResolver {
    /// Build a resolver from a collection's runtime schema descriptor.
    #[must_use]
    pub fn new(schema: &CollectionSchema) -> Self {
        let promoted = schema
            .promotions
            .iter()
            .map(|(path, _)| (path.clone(), column_name_for_path(path)))
            .collect();
        Self { promoted }
    }

    /// Resolve `path` to its physical access.
    #[must_use]
    pub fn resolve(&self, path: &str) -> FieldAccess {
        match self.promoted.get(path) {
            Some(column) => FieldAccess::Column(column.clone()),
            None => FieldAccess::Json(path.to_owned()),
        }
    }

    /// True if `path` is backed by a real column (vs. `json_extract`).
    #[must_use]
    pub fn is_promoted(&self, path: &str) -> bool {
        self.promoted.contains_key(path)
    }

    /// A resolver with no promoted columns: every path resolves to
    /// `json_extract`. Used to compile a correlated subquery whose
    /// target collection's schema is not loaded at compile time — always
    /// correct SQL, just without the promoted-column fast path.
    #[must_use]
    pub fn json_only() -> Self {
        Self {
            promoted: HashMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::builder::SchemaBuilder;
    use crate::schema::types::{FieldType, PromotionDef};

    #[test]
    fn promoted_field_resolves_to_column() {
        let schema = SchemaBuilder::new()
            .field("email", FieldType::String)
            .promote("email", PromotionDef::plain().unique())
            .build()
            .unwrap();
        let resolver = FieldResolver::new(&schema);
        assert_eq!(
            resolver.resolve("email"),
            FieldAccess::Column("email".to_owned())
        );
    }

    #[test]
    fn non_promoted_field_resolves_to_json() {
        let schema = SchemaBuilder::new()
            .field("address.city", FieldType::String)
            .build()
            .unwrap();
        let resolver = FieldResolver::new(&schema);
        assert_eq!(
            resolver.resolve("address.city"),
            FieldAccess::Json("address.city".to_owned())
        );
        assert!(!resolver.is_promoted("address.city"));
    }

    #[test]
    fn dotted_path_promoted_column_uses_underscore_name() {
        let schema = SchemaBuilder::new()
            .field("address.city", FieldType::String)
            .promote("address.city", PromotionDef::plain())
            .build()
            .unwrap();
        let resolver = FieldResolver::new(&schema);
        assert_eq!(
            resolver.resolve("address.city"),
            FieldAccess::Column("address_city".to_owned())
        );
    }
}
