//! Vector engine (spec §4.5): dual-write of a vector promotion's base
//! TEXT column and its `vec0` sidecar, plus k-NN search with an optional
//! WHERE post-filter. Grounded on the `vec0`-maintenance pattern in
//! `other_examples/*-rag-db.rs.rs` (migrate + dual-write), adapted to
//! doculite's per-document transactional write path.

use doculite_domain::error::{DatabaseErrorCode, Error, Result};
use doculite_domain::ports::database::{SqlParam, SqlTransaction};
use doculite_domain::schema::{ColumnType, FieldResolver, Schema};

use super::query::compile_select;

/// Sidecar virtual table name for `<collection>_<column>_vec`.
#[must_use]
pub fn sidecar_table(collection: &str, column: &str) -> String {
    format!("{collection}_{column}_vec")
}

/// Encode a vector as the JSON array the sqlite-vec `vec0` binding
/// (and the base TEXT column) both expect.
#[must_use]
pub fn encode_vector(values: &[f32]) -> String {
    serde_json::to_string(values).unwrap_or_else(|_| "[]".to_owned())
}

fn find_vector_column<'a>(schema: &'a Schema, field: &str) -> Result<&'a doculite_domain::schema::ColumnDef> {
    schema
        .table
        .columns
        .iter()
        .find(|c| c.name == field && c.type_ == ColumnType::Vector)
        .ok_or_else(|| Error::config(format!("'{field}' is not a declared vector promotion")))
}

/// Validate `field` is a declared vector promotion of the right
/// dimensionality (spec §4.5 step 1).
///
/// # Errors
///
/// Returns [`Error::Config`] if `field` isn't a vector promotion, or if
/// `vector.len()` doesn't match its declared dimensionality.
pub fn validate_vector_query(schema: &Schema, field: &str, vector: &[f32]) -> Result<()> {
    let column = find_vector_column(schema, field)?;
    let dims = column.vector_dimensions.unwrap_or(0) as usize;
    if vector.len() != dims {
        return Err(Error::config(format!(
            "vector length {} does not match declared dimensions {dims} for '{field}'",
            vector.len()
        )));
    }
    Ok(())
}

/// Write (insert or replace) the sidecar row for one vector field. Must
/// run in the same transaction as the base-table write (spec §4.5:
/// "the primary row and vector row are written in the same
/// transaction").
///
/// # Errors
///
/// Propagates any transaction error.
pub async fn upsert_sidecar_row(
    tx: &mut dyn SqlTransaction,
    collection: &str,
    column: &str,
    id: &str,
    vector: Option<&[f32]>,
) -> Result<()> {
    let table = sidecar_table(collection, column);
    tx.exec(&format!("DELETE FROM {table} WHERE _id = ?"), &[SqlParam::Text(id.to_owned())])
        .await?;
    if let Some(values) = vector {
        tx.exec(
            &format!("INSERT INTO {table} (_id, {column}) VALUES (?, ?)"),
            &[SqlParam::Text(id.to_owned()), SqlParam::Text(encode_vector(values))],
        )
        .await?;
    }
    Ok(())
}

/// Remove the sidecar row for one document, run in the same transaction
/// as the base-table delete (spec §4.5).
///
/// # Errors
///
/// Propagates any transaction error.
pub async fn delete_sidecar_row(tx: &mut dyn SqlTransaction, collection: &str, column: &str, id: &str) -> Result<()> {
    let table = sidecar_table(collection, column);
    tx.exec(&format!("DELETE FROM {table} WHERE _id = ?"), &[SqlParam::Text(id.to_owned())])
        .await?;
    Ok(())
}

/// One k-NN search result (spec §4.5 step 4).
#[derive(Debug, Clone)]
pub struct VectorHit {
    pub id: String,
    pub distance: f64,
    pub document: String,
}

/// Run a k-NN search. Binds the query vector first (into the `MATCH`
/// placeholder), then the sidecar's `k` limit, then any post-filter
/// parameters.
///
/// # Errors
///
/// Returns [`Error::Config`] if `field` isn't a declared vector
/// promotion or `vector.len()` doesn't match, and propagates any driver
/// error otherwise.
pub async fn vector_search(
    driver: &dyn doculite_domain::ports::database::SqlDriver,
    schema: &Schema,
    resolver: &FieldResolver,
    field: &str,
    vector: &[f32],
    limit: u32,
    where_filter: Option<&doculite_domain::query::Filter>,
) -> Result<Vec<VectorHit>> {
    validate_vector_query(schema, field, vector)?;

    let sidecar = sidecar_table(&schema.table.name, field);
    let mut sql = format!(
        "SELECT t._id AS _id, t.doc AS doc, v.distance AS distance \
         FROM (SELECT _id, distance FROM {sidecar} WHERE {field} MATCH ? AND k = ?) AS v \
         JOIN {} AS t ON t._id = v._id",
        schema.table.name
    );
    let mut params = vec![SqlParam::Text(encode_vector(vector)), SqlParam::Integer(i64::from(limit))];

    if let Some(filter) = where_filter {
        let mut spec = doculite_domain::query::QuerySpec::empty();
        spec.filters = Some(filter.clone());
        let compiled = compile_select(&schema.table.name, resolver, &spec)?;
        if let Some(idx) = compiled.sql.find("WHERE") {
            sql.push_str(" WHERE ");
            sql.push_str(compiled.sql[idx + "WHERE".len()..].trim());
            params.extend(compiled.params);
        }
    }
    sql.push_str(" ORDER BY v.distance ASC");

    let rows = driver.query(&sql, &params).await?;
    rows.iter()
        .map(|row| {
            Ok(VectorHit {
                id: row
                    .try_get_string("_id")?
                    .ok_or_else(|| Error::database(DatabaseErrorCode::Other, "vector hit missing '_id'"))?,
                distance: row.try_get_f64("distance")?.unwrap_or(f64::MAX),
                document: row
                    .try_get_string("doc")?
                    .ok_or_else(|| Error::database(DatabaseErrorCode::Other, "vector hit missing 'doc'"))?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sidecar_table_name_matches_convention() {
        assert_eq!(sidecar_table("docs", "embedding"), "docs_embedding_vec");
    }

    #[test]
    fn encode_vector_round_trips_as_json_array() {
        let encoded = encode_vector(&[1.0, 0.0, 0.0, 0.0]);
        let decoded: Vec<f32> = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, vec![1.0, 0.0, 0.0, 0.0]);
    }
}
