//! SQLite DDL compiler (spec §4.2). Grounded on
//! `mcb_providers::database::sqlite::ddl::SqliteSchemaDdlGenerator`.

use doculite_domain::schema::{column_name_for_path, ColumnType, Schema, SchemaDdlGenerator, TableDef};

/// Generates SQLite DDL for one collection's compiled [`Schema`].
#[derive(Debug, Clone, Default)]
pub struct SqliteSchemaDdlGenerator;

impl SchemaDdlGenerator for SqliteSchemaDdlGenerator {
    fn generate_ddl(&self, schema: &Schema) -> Vec<String> {
        let mut stmts = vec![table_to_sqlite_ddl(&schema.table)];

        for column in &schema.table.columns {
            if column.type_ == ColumnType::Vector {
                stmts.push(vector_sidecar_ddl(&schema.table.name, column));
            }
        }

        for unique in &schema.unique_constraints {
            stmts.push(composite_unique_ddl(unique));
        }

        for index in &schema.indexes {
            stmts.push(index_ddl(&schema.table, index));
        }

        stmts
    }
}

fn column_type_sqlite(ty: ColumnType) -> &'static str {
    match ty {
        ColumnType::Text => "TEXT",
        ColumnType::Integer => "INTEGER",
        ColumnType::Real => "REAL",
        ColumnType::Blob => "BLOB",
        // The base-table column for a vector field stores the JSON array;
        // the vector itself lives in the vec0 sidecar (spec §3/§4.2).
        ColumnType::Vector => "TEXT",
    }
}

fn table_to_sqlite_ddl(table: &TableDef) -> String {
    use std::fmt::Write;

    let columns: Vec<String> = table
        .columns
        .iter()
        .map(|col| {
            let mut s = format!("{} {}", col.name, column_type_sqlite(col.type_));
            if col.name == "_id" {
                s.push_str(" PRIMARY KEY");
            }
            if col.unique {
                s.push_str(" UNIQUE");
            }
            if !col.nullable && col.name != "_id" {
                s.push_str(" NOT NULL");
            }
            if let Some(fk) = &col.foreign_key {
                let _ = write!(
                    s,
                    " REFERENCES {}({}) ON DELETE {} ON UPDATE {}",
                    fk.to_table,
                    fk.to_column,
                    fk.on_delete.sql(),
                    fk.on_update.sql()
                );
            }
            if let Some(check) = &col.check {
                let _ = write!(s, " CHECK({check})");
            }
            s
        })
        .collect();

    format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        table.name,
        columns.join(", ")
    )
}

fn vector_sidecar_ddl(table_name: &str, column: &doculite_domain::schema::ColumnDef) -> String {
    let dims = column
        .vector_dimensions
        .expect("DDL generator only called against a compiled schema; compile_schema rejects missing vector_dimensions");
    format!(
        "CREATE VIRTUAL TABLE IF NOT EXISTS {}_{}_vec USING vec0(_id TEXT PRIMARY KEY, {} {}[{}])",
        table_name,
        column.name,
        column.name,
        column.vector_type.sqlite_vec_token(),
        dims
    )
}

fn json_path_expr(path: &str) -> String {
    format!("json_extract(doc, '$.{path}')")
}

/// Resolve a declared field path to the SQL expression that reads it: a
/// bare column reference if it was promoted, `json_extract` otherwise.
/// Recomputed from the compiled [`TableDef`] alone (no live
/// `CollectionSchema` is available at this layer), matching the same
/// naming rule promotion used (`doc.path` → `doc_path`).
fn resolve_field_expr(table: &TableDef, path: &str) -> String {
    let candidate = column_name_for_path(path);
    if table.columns.iter().any(|c| c.name == candidate) {
        candidate
    } else {
        json_path_expr(path)
    }
}

fn composite_unique_ddl(unique: &doculite_domain::schema::UniqueConstraintDef) -> String {
    let exprs: Vec<String> = unique.fields.iter().map(|f| json_path_expr(f)).collect();
    format!(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_{}_{}_unique ON {}({})",
        unique.table,
        unique.fields.join("_"),
        unique.table,
        exprs.join(", ")
    )
}

fn index_ddl(table: &TableDef, index: &doculite_domain::schema::IndexDef) -> String {
    let exprs: Vec<String> = index
        .fields
        .iter()
        .map(|f| resolve_field_expr(table, f))
        .collect();
    let unique = if index.unique { "UNIQUE " } else { "" };
    let mut sql = format!(
        "CREATE {unique}INDEX IF NOT EXISTS {} ON {}({})",
        index.name,
        index.table,
        exprs.join(", ")
    );
    if let Some(partial) = &index.partial {
        sql.push_str(" WHERE ");
        sql.push_str(partial);
    }
    sql
}

/// `ALTER TABLE ... ADD COLUMN`, for the migrator's additive path.
pub fn alter_table_add_column(table: &str, column: &doculite_domain::schema::ColumnDef) -> String {
    let ty = column_type_sqlite(column.type_);
    let mut sql = format!("ALTER TABLE {table} ADD COLUMN {} {ty}", column.name);
    if !column.nullable {
        // SQLite requires ADD COLUMN NOT NULL to carry a default.
        sql.push_str(" DEFAULT ''");
    }
    sql
}

#[cfg(test)]
mod tests {
    use super::*;
    use doculite_domain::schema::{compile_schema, SchemaBuilder};
    use doculite_domain::schema::{FieldType, PromotionDef, RefAction};

    #[test]
    fn base_table_has_id_and_doc_columns() {
        let schema = SchemaBuilder::new().build().unwrap();
        let compiled = compile_schema("widgets", &schema).unwrap();
        let ddl = SqliteSchemaDdlGenerator.generate_ddl(&compiled);
        assert!(ddl[0].contains("_id TEXT PRIMARY KEY"));
        assert!(ddl[0].contains("doc TEXT NOT NULL"));
    }

    #[test]
    fn promoted_unique_not_null_column_emits_constraints() {
        let schema = SchemaBuilder::new()
            .field("email", FieldType::String)
            .promote("email", PromotionDef::plain().unique().not_null())
            .build()
            .unwrap();
        let compiled = compile_schema("users", &schema).unwrap();
        let ddl = SqliteSchemaDdlGenerator.generate_ddl(&compiled);
        assert!(ddl[0].contains("email TEXT UNIQUE NOT NULL"));
    }

    #[test]
    fn foreign_key_emits_references_clause() {
        let schema = SchemaBuilder::new()
            .field("organization_id", FieldType::String)
            .promote(
                "organization_id",
                PromotionDef::plain()
                    .foreign_key("organizations", "id")
                    .on_delete(RefAction::Cascade),
            )
            .build()
            .unwrap();
        let compiled = compile_schema("users", &schema).unwrap();
        let ddl = SqliteSchemaDdlGenerator.generate_ddl(&compiled);
        assert!(ddl[0].contains("REFERENCES organizations(_id) ON DELETE CASCADE"));
    }

    #[test]
    fn vector_field_emits_sidecar_virtual_table() {
        let schema = SchemaBuilder::new()
            .field("embedding", FieldType::Array(Box::new(FieldType::Real)))
            .promote("embedding", PromotionDef::plain().vector(384))
            .build()
            .unwrap();
        let compiled = compile_schema("docs", &schema).unwrap();
        let ddl = SqliteSchemaDdlGenerator.generate_ddl(&compiled);
        assert!(ddl.iter().any(|s| {
            s.contains("CREATE VIRTUAL TABLE IF NOT EXISTS docs_embedding_vec USING vec0(_id TEXT PRIMARY KEY, embedding float[384])")
        }));
    }

    #[test]
    fn secondary_index_over_non_promoted_field_uses_json_extract() {
        let schema = SchemaBuilder::new()
            .field("address.city", FieldType::String)
            .index(doculite_domain::schema::IndexSpec {
                name: None,
                fields: vec!["address.city".to_owned()],
                unique: false,
                partial: None,
            })
            .build()
            .unwrap();
        let compiled = compile_schema("users", &schema).unwrap();
        let ddl = SqliteSchemaDdlGenerator.generate_ddl(&compiled);
        assert!(ddl
            .iter()
            .any(|s| s.contains("json_extract(doc, '$.address.city')")));
    }

    #[test]
    fn secondary_index_over_promoted_field_uses_bare_column() {
        let schema = SchemaBuilder::new()
            .field("status", FieldType::String)
            .promote("status", PromotionDef::plain())
            .index(doculite_domain::schema::IndexSpec {
                name: None,
                fields: vec!["status".to_owned()],
                unique: false,
                partial: None,
            })
            .build()
            .unwrap();
        let compiled = compile_schema("tasks", &schema).unwrap();
        let ddl = SqliteSchemaDdlGenerator.generate_ddl(&compiled);
        assert!(ddl.iter().any(|s| s.contains("ON tasks(status)")));
    }

    #[test]
    fn all_statements_use_if_not_exists() {
        let schema = SchemaBuilder::new()
            .field("email", FieldType::String)
            .promote("email", PromotionDef::plain().unique())
            .unique_together(vec!["email".to_owned()])
            .build()
            .unwrap();
        let compiled = compile_schema("users", &schema).unwrap();
        let ddl = SqliteSchemaDdlGenerator.generate_ddl(&compiled);
        assert!(ddl[0].contains("IF NOT EXISTS"));
        assert!(ddl[1..].iter().all(|s| s.contains("IF NOT EXISTS")));
    }
}
