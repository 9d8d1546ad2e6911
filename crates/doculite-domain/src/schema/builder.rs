//! Runtime schema descriptor + builder.
//!
//! Per spec §9 ("dynamic schema shape"), a collection's schema is not a
//! compile-time static table: it is built programmatically via
//! [`SchemaBuilder`] when the caller registers a collection.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::types::{FieldDef, FieldType, PromotionDef};
use crate::error::{Error, Result};

/// User hook run once per intermediate version while migrating a
/// collection forward (spec §4.6).
pub type UpgradeHook = Arc<dyn Fn(u32) -> Result<()> + Send + Sync>;
/// User hook run once, only when a collection's table is created fresh
/// or found at stored version 0 (spec §3/§4.6).
pub type SeedHook = Arc<dyn Fn() -> Result<()> + Send + Sync>;

/// A collection's validating schema: its fields plus the subset promoted
/// to real columns, indexes, and composite unique constraints.
#[derive(Clone)]
pub struct CollectionSchema {
    /// Declared fields, in declaration order.
    pub fields: Vec<FieldDef>,
    /// Promoted fields, in the order they were promoted (this fixes
    /// column order in the compiled table per spec §4.2).
    pub promotions: Vec<(String, PromotionDef)>,
    /// Secondary indexes over declared (possibly non-promoted) fields.
    pub indexes: Vec<IndexSpec>,
    /// Composite unique constraints (legacy JSON-path form).
    pub unique_constraints: Vec<Vec<String>>,
    /// Declared schema version, compared against the stored version in
    /// `_skibbadb_migrations` at registration time.
    pub version: u32,
    /// Optional upgrade hook, invoked by the migrator for each
    /// intermediate version between the stored and declared one.
    pub upgrade: Option<UpgradeHook>,
    /// Optional seed hook, invoked once when the collection is new.
    pub seed: Option<SeedHook>,
}

impl fmt::Debug for CollectionSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionSchema")
            .field("fields", &self.fields)
            .field("promotions", &self.promotions)
            .field("indexes", &self.indexes)
            .field("unique_constraints", &self.unique_constraints)
            .field("version", &self.version)
            .field("upgrade", &self.upgrade.is_some())
            .field("seed", &self.seed.is_some())
            .finish()
    }
}

impl Default for CollectionSchema {
    fn default() -> Self {
        Self {
            fields: Vec::new(),
            promotions: Vec::new(),
            indexes: Vec::new(),
            unique_constraints: Vec::new(),
            version: 1,
            upgrade: None,
            seed: None,
        }
    }
}

/// An index declaration before the table name is known.
#[derive(Debug, Clone)]
pub struct IndexSpec {
    /// Optional explicit name; auto-generated from fields if absent.
    pub name: Option<String>,
    /// Field paths covered, in order.
    pub fields: Vec<String>,
    /// Whether the index is unique.
    pub unique: bool,
    /// Optional partial-index predicate (raw SQL).
    pub partial: Option<String>,
}

impl CollectionSchema {
    /// Look up a declared field by path.
    #[must_use]
    pub fn field(&self, path: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.path == path)
    }
}

/// Fluent builder for a [`CollectionSchema`].
pub struct SchemaBuilder {
    fields: Vec<FieldDef>,
    promotions: Vec<(String, PromotionDef)>,
    indexes: Vec<IndexSpec>,
    unique_constraints: Vec<Vec<String>>,
    defaults: BTreeMap<String, serde_json::Value>,
    version: u32,
    upgrade: Option<UpgradeHook>,
    seed: Option<SeedHook>,
}

impl fmt::Debug for SchemaBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaBuilder")
            .field("fields", &self.fields)
            .field("promotions", &self.promotions)
            .field("indexes", &self.indexes)
            .field("unique_constraints", &self.unique_constraints)
            .field("version", &self.version)
            .field("upgrade", &self.upgrade.is_some())
            .field("seed", &self.seed.is_some())
            .finish()
    }
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self {
            fields: Vec::new(),
            promotions: Vec::new(),
            indexes: Vec::new(),
            unique_constraints: Vec::new(),
            defaults: BTreeMap::new(),
            version: 1,
            upgrade: None,
            seed: None,
        }
    }
}

impl SchemaBuilder {
    /// Start an empty schema, at version 1.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare this schema's version (default 1). Compared against the
    /// stored version in `_skibbadb_migrations` at registration.
    #[must_use]
    pub fn version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Declare a required field.
    #[must_use]
    pub fn field<P: Into<String>>(mut self, path: P, field_type: FieldType) -> Self {
        self.fields.push(FieldDef {
            path: path.into(),
            field_type,
            required: true,
            default: None,
        });
        self
    }

    /// Declare an optional field, with an optional literal default applied
    /// on insert when absent.
    #[must_use]
    pub fn optional_field<P: Into<String>>(mut self, path: P, field_type: FieldType) -> Self {
        let path = path.into();
        let default = self.defaults.remove(&path);
        self.fields.push(FieldDef {
            path,
            field_type,
            required: false,
            default,
        });
        self
    }

    /// Set a literal default value for a field declared via
    /// [`Self::optional_field`] (call before or after; the builder matches
    /// by path at `build()` time regardless of call order using a side
    /// table).
    #[must_use]
    pub fn default_value<P: Into<String>>(mut self, path: P, value: serde_json::Value) -> Self {
        let path = path.into();
        if let Some(f) = self.fields.iter_mut().find(|f| f.path == path) {
            f.default = Some(value);
        } else {
            self.defaults.insert(path, value);
        }
        self
    }

    /// Promote `path` to a real column with the given descriptor.
    #[must_use]
    pub fn promote<P: Into<String>>(mut self, path: P, promotion: PromotionDef) -> Self {
        self.promotions.push((path.into(), promotion));
        self
    }

    /// Add a secondary index.
    #[must_use]
    pub fn index(mut self, spec: IndexSpec) -> Self {
        self.indexes.push(spec);
        self
    }

    /// Add a composite unique constraint over the given field paths.
    #[must_use]
    pub fn unique_together(mut self, fields: Vec<String>) -> Self {
        self.unique_constraints.push(fields);
        self
    }

    /// Declare an upgrade hook, called once per intermediate version
    /// while migrating this collection forward (spec §4.6).
    #[must_use]
    pub fn upgrade<F>(mut self, hook: F) -> Self
    where
        F: Fn(u32) -> Result<()> + Send + Sync + 'static,
    {
        self.upgrade = Some(Arc::new(hook));
        self
    }

    /// Declare a seed hook, called once when this collection's table is
    /// created fresh or found at stored version 0 (spec §3/§4.6).
    #[must_use]
    pub fn seed<F>(mut self, hook: F) -> Self
    where
        F: Fn() -> Result<()> + Send + Sync + 'static,
    {
        self.seed = Some(Arc::new(hook));
        self
    }

    /// Finish building, validating that every promoted/indexed/composite
    /// field path is declared. Returns a [`Error::Config`] otherwise, per
    /// spec §4.1 ("promotion of a non-existent field path is a
    /// configuration error").
    pub fn build(self) -> Result<CollectionSchema> {
        let declared: std::collections::HashSet<&str> =
            self.fields.iter().map(|f| f.path.as_str()).collect();

        for (path, _) in &self.promotions {
            if !declared.contains(path.as_str()) {
                return Err(Error::config(format!(
                    "promoted field '{path}' is not declared in the schema"
                )));
            }
        }
        for spec in &self.indexes {
            for path in &spec.fields {
                if !declared.contains(path.as_str()) {
                    return Err(Error::config(format!(
                        "indexed field '{path}' is not declared in the schema"
                    )));
                }
            }
        }
        for fields in &self.unique_constraints {
            for path in fields {
                if !declared.contains(path.as_str()) {
                    return Err(Error::config(format!(
                        "unique-together field '{path}' is not declared in the schema"
                    )));
                }
            }
        }
        for (path, promotion) in &self.promotions {
            if matches!(promotion.storage_type, Some(super::types::ColumnType::Vector))
                && promotion.vector_dimensions.is_none()
            {
                return Err(Error::config(format!(
                    "vector field '{path}' is missing vector_dimensions"
                )));
            }
        }

        Ok(CollectionSchema {
            fields: self.fields,
            promotions: self.promotions,
            indexes: self.indexes,
            unique_constraints: self.unique_constraints,
            version: self.version,
            upgrade: self.upgrade,
            seed: self.seed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::types::PromotionDef;

    #[test]
    fn rejects_promotion_of_undeclared_field() {
        let result = SchemaBuilder::new()
            .field("email", FieldType::String)
            .promote("username", PromotionDef::plain().unique())
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn accepts_well_formed_schema() {
        let schema = SchemaBuilder::new()
            .field("email", FieldType::String)
            .optional_field("username", FieldType::String)
            .promote("email", PromotionDef::plain().unique().not_null())
            .promote("username", PromotionDef::plain().unique())
            .build()
            .expect("valid schema");
        assert_eq!(schema.promotions.len(), 2);
    }

    #[test]
    fn upgrade_and_seed_hooks_are_callable_after_build() {
        let schema = SchemaBuilder::new()
            .version(2)
            .field("email", FieldType::String)
            .upgrade(|version| {
                assert_eq!(version, 2);
                Ok(())
            })
            .seed(|| Ok(()))
            .build()
            .expect("valid schema");
        assert!((schema.upgrade.expect("upgrade hook declared"))(2).is_ok());
        assert!((schema.seed.expect("seed hook declared"))().is_ok());
    }

    #[test]
    fn rejects_vector_promotion_without_dimensions() {
        let result = SchemaBuilder::new()
            .field("embedding", FieldType::Array(Box::new(FieldType::Real)))
            .promote(
                "embedding",
                PromotionDef::plain().storage_type(crate::schema::types::ColumnType::Vector),
            )
            .build();
        assert!(result.is_err());
    }
}
