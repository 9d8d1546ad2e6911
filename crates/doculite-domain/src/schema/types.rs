//! Canonical schema types: nominal field types, promotion descriptors, and
//! the DDL-facing `ColumnType`/`TableDef`/... model the compiler consumes.
//!
//! Mirrors the shape of a classic `TableDef`/`ColumnDef` canonical-schema
//! model, generalized so a [`crate::schema::Schema`] is built at runtime by
//! a collection registration call rather than compiled into a static table.

use std::collections::BTreeMap;

/// Logical storage type a promoted column (or vector sidecar) is given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// UTF-8 text value.
    Text,
    /// Signed integer value (also used for booleans, 0/1).
    Integer,
    /// Floating-point value.
    Real,
    /// Arbitrary binary payload.
    Blob,
    /// Vector, backed by a `vec0` sidecar virtual table.
    Vector,
}

/// Nominal field type as declared in a schema descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    /// UTF-8 string.
    String,
    /// Integer number.
    Integer,
    /// Real (floating point) number.
    Real,
    /// Boolean.
    Boolean,
    /// ISO-8601 date/time.
    Date,
    /// Array of a nested element type.
    Array(Box<FieldType>),
    /// Nested object (opaque, stored as JSON).
    Object,
    /// Tagged union over named variant field-type maps.
    TaggedUnion(BTreeMap<String, FieldType>),
}

/// Vector element type, default `Float`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VectorType {
    /// 32-bit float (sqlite-vec `float[n]`).
    #[default]
    Float,
    /// 8-bit signed integer (sqlite-vec `int8[n]`).
    Int8,
    /// Single-bit-packed vector (sqlite-vec `bit[n]`).
    Bit,
}

impl VectorType {
    /// sqlite-vec column-type token, e.g. `float`.
    #[must_use]
    pub fn sqlite_vec_token(self) -> &'static str {
        match self {
            Self::Float => "float",
            Self::Int8 => "int8",
            Self::Bit => "bit",
        }
    }
}

/// Referential action for a foreign key, on delete or on update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefAction {
    /// No special action (engine default: `NO ACTION`/`RESTRICT`).
    #[default]
    Restrict,
    /// Propagate the delete/update to dependent rows.
    Cascade,
    /// Null out the referencing column.
    SetNull,
}

impl RefAction {
    /// SQL keyword(s) for this action.
    #[must_use]
    pub fn sql(self) -> &'static str {
        match self {
            Self::Restrict => "RESTRICT",
            Self::Cascade => "CASCADE",
            Self::SetNull => "SET NULL",
        }
    }
}

/// Per-field promotion descriptor: how a document field is lifted into a
/// real SQL column. See spec §4.1.
#[derive(Debug, Clone, Default)]
pub struct PromotionDef {
    /// Explicit storage-type override; `None` uses type inference.
    pub storage_type: Option<ColumnType>,
    /// Single-column `UNIQUE`.
    pub unique: bool,
    /// `"<table>.<column>"` this column references, if any.
    pub foreign_key: Option<(String, String)>,
    /// Action on delete of the referenced row.
    pub on_delete: RefAction,
    /// Action on update of the referenced row.
    pub on_update: RefAction,
    /// Whether the column may be NULL. Defaults to `true`.
    pub nullable: bool,
    /// Raw `CHECK(...)` expression body, with the field path substituted
    /// whole-word by the column name at compile time.
    pub check_constraint: Option<String>,
    /// Vector dimensionality; required when `storage_type` resolves to
    /// [`ColumnType::Vector`].
    pub vector_dimensions: Option<u32>,
    /// Vector element type.
    pub vector_type: VectorType,
}

impl PromotionDef {
    /// A plain promotion with no constraints, nullable.
    #[must_use]
    pub fn plain() -> Self {
        Self {
            nullable: true,
            ..Default::default()
        }
    }

    /// Mark this promotion `UNIQUE`.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Mark this promotion `NOT NULL`.
    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Attach a foreign key, e.g. `.foreign_key("organizations", "id")`.
    #[must_use]
    pub fn foreign_key<T: Into<String>, C: Into<String>>(mut self, table: T, column: C) -> Self {
        self.foreign_key = Some((table.into(), column.into()));
        self
    }

    /// Set the `ON DELETE` action for an attached foreign key.
    #[must_use]
    pub fn on_delete(mut self, action: RefAction) -> Self {
        self.on_delete = action;
        self
    }

    /// Set the `ON UPDATE` action for an attached foreign key.
    #[must_use]
    pub fn on_update(mut self, action: RefAction) -> Self {
        self.on_update = action;
        self
    }

    /// Attach a `CHECK` constraint expression.
    #[must_use]
    pub fn check<E: Into<String>>(mut self, expr: E) -> Self {
        self.check_constraint = Some(expr.into());
        self
    }

    /// Declare this promotion a vector column of `dimensions`.
    #[must_use]
    pub fn vector(mut self, dimensions: u32) -> Self {
        self.storage_type = Some(ColumnType::Vector);
        self.vector_dimensions = Some(dimensions);
        self
    }

    /// Override the vector element type (default `Float`).
    #[must_use]
    pub fn vector_type(mut self, vector_type: VectorType) -> Self {
        self.vector_type = vector_type;
        self
    }

    /// Override the inferred storage type explicitly.
    #[must_use]
    pub fn storage_type(mut self, ty: ColumnType) -> Self {
        self.storage_type = Some(ty);
        self
    }
}

/// Canonical column definition, as emitted by the DDL compiler.
#[derive(Debug, Clone)]
pub struct ColumnDef {
    /// Column name (field path with `.` replaced by `_`).
    pub name: String,
    /// Storage type.
    pub type_: ColumnType,
    /// `NOT NULL` when false.
    pub nullable: bool,
    /// `UNIQUE` column constraint.
    pub unique: bool,
    /// Foreign key target, if any.
    pub foreign_key: Option<ForeignKeyDef>,
    /// `CHECK(...)` expression, column name already substituted in.
    pub check: Option<String>,
    /// Vector dimensions, set only when `type_` is [`ColumnType::Vector`].
    pub vector_dimensions: Option<u32>,
    /// Vector element type, set only when `type_` is [`ColumnType::Vector`].
    pub vector_type: VectorType,
}

/// Foreign key relationship, already resolved (`id` → `_id`).
#[derive(Debug, Clone)]
pub struct ForeignKeyDef {
    /// Source column (on the owning table).
    pub from_column: String,
    /// Referenced table.
    pub to_table: String,
    /// Referenced column.
    pub to_column: String,
    /// `ON DELETE` action.
    pub on_delete: RefAction,
    /// `ON UPDATE` action.
    pub on_update: RefAction,
}

/// Secondary index definition.
#[derive(Debug, Clone)]
pub struct IndexDef {
    /// Index name.
    pub name: String,
    /// Table the index belongs to.
    pub table: String,
    /// Field paths indexed, in order. Each is either a promoted column
    /// name or resolved to `json_extract(doc, '$.<path>')` at compile time.
    pub fields: Vec<String>,
    /// Whether the index enforces uniqueness.
    pub unique: bool,
    /// Optional partial-index `WHERE` predicate (raw SQL fragment).
    pub partial: Option<String>,
}

/// Composite (multi-column) uniqueness constraint over JSON-extracted
/// fields (the "legacy path" of spec §4.2).
#[derive(Debug, Clone)]
pub struct UniqueConstraintDef {
    /// Table the constraint applies to.
    pub table: String,
    /// Field paths participating in the composite key.
    pub fields: Vec<String>,
}

/// One field in a collection's schema descriptor.
#[derive(Debug, Clone)]
pub struct FieldDef {
    /// Dotted field path, e.g. `"address.city"`.
    pub path: String,
    /// Nominal type.
    pub field_type: FieldType,
    /// Whether the field is required on insert.
    pub required: bool,
    /// Literal default value, used when the field is absent and optional.
    pub default: Option<serde_json::Value>,
}

/// A table, as the DDL compiler sees it: a name plus a resolved column
/// list (`_id`, `doc`, then one column per promotion, in declaration
/// order).
#[derive(Debug, Clone)]
pub struct TableDef {
    /// Table name (== collection name).
    pub name: String,
    /// Resolved columns, `_id`/`doc` first.
    pub columns: Vec<ColumnDef>,
}

/// The full compiled schema for one collection: its table, indexes, and
/// composite unique constraints. Vector side-tables are implied by
/// [`ColumnDef::vector_dimensions`] on the relevant columns and are
/// generated directly from `table` by the DDL compiler.
#[derive(Debug, Clone)]
pub struct Schema {
    /// The base table.
    pub table: TableDef,
    /// Secondary indexes.
    pub indexes: Vec<IndexDef>,
    /// Composite unique constraints over JSON paths.
    pub unique_constraints: Vec<UniqueConstraintDef>,
    /// Declared schema version (spec §4.6), compared against the stored
    /// version in `_skibbadb_migrations` at registration time.
    pub version: u32,
}

/// Port for generating backend-specific DDL from a compiled [`Schema`].
/// Implemented by `doculite-providers::sqlite::ddl::SqliteSchemaDdlGenerator`.
pub trait SchemaDdlGenerator: Send + Sync {
    /// Generate the ordered list of DDL statements for `schema`.
    fn generate_ddl(&self, schema: &Schema) -> Vec<String>;
}
