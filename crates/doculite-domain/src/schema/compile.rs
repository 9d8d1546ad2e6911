//! Compiles a runtime [`CollectionSchema`] into the canonical, DDL-facing
//! [`Schema`] model (spec §4.2): resolves column names, FK target
//! rewriting (`id` → `_id`), check-constraint substitution, and storage
//! type inference.

use regex::Regex;

use super::builder::CollectionSchema;
use super::infer::infer_storage_type;
use super::types::{
    ColumnDef, ColumnType, ForeignKeyDef, IndexDef, Schema, TableDef, UniqueConstraintDef,
};
use crate::error::{Error, Result};

/// Column name for a (possibly dotted) field path: dots become underscores.
#[must_use]
pub fn column_name_for_path(path: &str) -> String {
    path.replace('.', "_")
}

fn substitute_whole_word(expr: &str, needle: &str, replacement: &str) -> String {
    let pattern = format!(r"\b{}\b", regex::escape(needle));
    // A malformed needle cannot fail to compile since it is fully escaped.
    let re = Regex::new(&pattern).expect("escaped pattern is always valid");
    re.replace_all(expr, replacement).into_owned()
}

/// Compile `schema` into the canonical [`Schema`] for table `table_name`.
pub fn compile_schema(table_name: &str, schema: &CollectionSchema) -> Result<Schema> {
    let mut columns = vec![
        ColumnDef {
            name: "_id".to_owned(),
            type_: ColumnType::Text,
            nullable: false,
            unique: false,
            foreign_key: None,
            check: None,
            vector_dimensions: None,
            vector_type: super::types::VectorType::default(),
        },
        ColumnDef {
            name: "doc".to_owned(),
            type_: ColumnType::Text,
            nullable: false,
            unique: false,
            foreign_key: None,
            check: None,
            vector_dimensions: None,
            vector_type: super::types::VectorType::default(),
        },
    ];

    for (path, promotion) in &schema.promotions {
        let field = schema.field(path).ok_or_else(|| {
            Error::config(format!("promoted field '{path}' is not declared"))
        })?;
        let storage_type = infer_storage_type(&field.field_type, promotion);
        if matches!(storage_type, ColumnType::Vector) && promotion.vector_dimensions.is_none() {
            return Err(Error::config(format!(
                "vector field '{path}' is missing vector_dimensions"
            )));
        }
        let column_name = column_name_for_path(path);

        let foreign_key = promotion.foreign_key.as_ref().map(|(table, column)| {
            let to_column = if column == "id" {
                "_id".to_owned()
            } else {
                column.clone()
            };
            ForeignKeyDef {
                from_column: column_name.clone(),
                to_table: table.clone(),
                to_column,
                on_delete: promotion.on_delete,
                on_update: promotion.on_update,
            }
        });

        let check = promotion
            .check_constraint
            .as_ref()
            .map(|expr| substitute_whole_word(expr, path, &column_name));

        columns.push(ColumnDef {
            name: column_name,
            type_: storage_type,
            nullable: promotion.nullable,
            unique: promotion.unique,
            foreign_key,
            check,
            vector_dimensions: promotion.vector_dimensions,
            vector_type: promotion.vector_type,
        });
    }

    let indexes = schema
        .indexes
        .iter()
        .map(|spec| {
            let name = spec.name.clone().unwrap_or_else(|| {
                format!("idx_{}_{}", table_name, spec.fields.join("_"))
            });
            IndexDef {
                name,
                table: table_name.to_owned(),
                fields: spec.fields.clone(),
                unique: spec.unique,
                partial: spec.partial.clone(),
            }
        })
        .collect();

    let unique_constraints = schema
        .unique_constraints
        .iter()
        .map(|fields| UniqueConstraintDef {
            table: table_name.to_owned(),
            fields: fields.clone(),
        })
        .collect();

    Ok(Schema {
        table: TableDef {
            name: table_name.to_owned(),
            columns,
        },
        indexes,
        unique_constraints,
        version: schema.version,
    })
}
