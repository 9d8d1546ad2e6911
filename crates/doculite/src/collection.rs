//! Collection runtime (spec §4.4): insert/put/upsert/delete/find_by_id
//! and the `where(...)` query surface, wired to validation, the SQL
//! compiler, the vector engine, and hook dispatch. Grounded on the
//! teacher's repository-per-aggregate pattern
//! (`mcb_application::repository`), generalized from a fixed entity
//! shape to a schema-declared document shape.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::Value;

use doculite_domain::document::{self, Document};
use doculite_domain::error::{DatabaseErrorCode, Error, Result};
use doculite_domain::hooks::{HookContext, HookPoint};
use doculite_domain::ports::database::{SqlDriver, SqlParam, SqlRow};
use doculite_domain::query::{AggregateSpec, QueryBuilder, QuerySpec};
use doculite_domain::schema::{CollectionSchema, ColumnDef, ColumnType, FieldResolver, Schema};

use doculite_providers::sqlite::{compile_select, upsert_sidecar_row, vector_search, VectorHit};

use crate::hooks::HookRegistry;

/// A named, schema-bound document container backed by one base table.
pub struct Collection {
    name: String,
    schema: CollectionSchema,
    compiled: Schema,
    resolver: FieldResolver,
    driver: Arc<dyn SqlDriver>,
    closed: Arc<AtomicBool>,
    hooks: Arc<HookRegistry>,
}

impl Collection {
    pub(crate) fn new(
        name: String,
        schema: CollectionSchema,
        compiled: Schema,
        driver: Arc<dyn SqlDriver>,
        closed: Arc<AtomicBool>,
        hooks: Arc<HookRegistry>,
    ) -> Self {
        let resolver = FieldResolver::new(&schema);
        Self {
            name,
            schema,
            compiled,
            resolver,
            driver,
            closed,
            hooks,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn resolver(&self) -> &FieldResolver {
        &self.resolver
    }

    #[must_use]
    pub fn compiled_schema(&self) -> &Schema {
        &self.compiled
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn promoted_column(&self, name: &str) -> Option<&ColumnDef> {
        self.compiled.table.columns.iter().find(|c| c.name == name)
    }

    /// Start a fluent query against this collection (spec §4.3/§4.4:
    /// `where(field)...toArray/first/count`).
    #[must_use]
    pub fn query(&self) -> QueryBuilder {
        QueryBuilder::new()
    }

    /// Validate each promoted field with a foreign key actually points
    /// at an existing row, re-raising the violation as a validation
    /// error naming the referenced table/column (spec §7 point 3).
    async fn check_foreign_keys(&self, doc: &Document) -> Result<()> {
        for (path, promotion) in &self.schema.promotions {
            let Some((table, column)) = promotion.foreign_key.as_ref() else { continue };
            let Some(value) = document::path::get(doc, path) else { continue };
            let Some(id) = value.as_str() else { continue };
            let to_column = if column == "id" { "_id" } else { column.as_str() };
            let rows = self
                .driver
                .query(
                    &format!("SELECT 1 FROM {table} WHERE {to_column} = ? LIMIT 1"),
                    &[SqlParam::Text(id.to_owned())],
                )
                .await?;
            if rows.is_empty() {
                return Err(Error::validation(
                    path.clone(),
                    format!("foreign key references non-existent {table}.{to_column}"),
                ));
            }
        }
        Ok(())
    }

    fn value_to_param(value: Option<&Value>, column: &ColumnDef) -> SqlParam {
        let Some(value) = value else { return SqlParam::Null };
        if value.is_null() {
            return SqlParam::Null;
        }
        match column.type_ {
            ColumnType::Integer => value
                .as_i64()
                .map(SqlParam::Integer)
                .or_else(|| value.as_bool().map(|b| SqlParam::Integer(i64::from(b))))
                .unwrap_or(SqlParam::Null),
            ColumnType::Real => value.as_f64().map(SqlParam::Real).unwrap_or(SqlParam::Null),
            ColumnType::Blob => value
                .as_str()
                .map(|s| SqlParam::Blob(s.as_bytes().to_vec()))
                .unwrap_or(SqlParam::Null),
            ColumnType::Vector => SqlParam::Text(value.to_string()),
            ColumnType::Text => value
                .as_str()
                .map(|s| SqlParam::Text(s.to_owned()))
                .unwrap_or_else(|| SqlParam::Text(value.to_string())),
        }
    }

    /// Promoted columns in declared order, paired with the bound value
    /// read out of `doc` at each promotion's path.
    fn promoted_params(&self, doc: &Document) -> Vec<(String, SqlParam)> {
        self.schema
            .promotions
            .iter()
            .map(|(path, _)| {
                let column_name = doculite_domain::schema::column_name_for_path(path);
                let column = self
                    .promoted_column(&column_name)
                    .expect("every declared promotion compiles to a column");
                let value = document::path::get(doc, path);
                (column_name, Self::value_to_param(value, column))
            })
            .collect()
    }

    /// `(field path, column name)` for every declared vector promotion.
    fn vector_promotions(&self) -> Vec<(&str, String)> {
        self.schema
            .promotions
            .iter()
            .filter_map(|(path, _)| {
                let column_name = doculite_domain::schema::column_name_for_path(path);
                self.promoted_column(&column_name)
                    .filter(|c| c.type_ == ColumnType::Vector)
                    .map(|_| (path.as_str(), column_name))
            })
            .collect()
    }

    async fn write_vector_sidecars(
        &self,
        tx: &mut dyn doculite_domain::ports::database::SqlTransaction,
        id: &str,
        doc: &Document,
    ) -> Result<()> {
        for (path, column) in self.vector_promotions() {
            let vector = document::path::get(doc, path)
                .and_then(Value::as_array)
                .map(|arr| arr.iter().filter_map(Value::as_f64).map(|v| v as f32).collect::<Vec<_>>());
            upsert_sidecar_row(tx, &self.name, &column, id, vector.as_deref()).await?;
        }
        Ok(())
    }

    async fn dispatch(&self, point: HookPoint, id: Option<String>, document: Option<Document>) -> Result<Option<Document>> {
        self.hooks
            .dispatch(HookContext {
                collection: self.name.clone(),
                point,
                id,
                document,
                error_message: None,
            })
            .await
    }

    async fn dispatch_error(&self, point_id: Option<String>, message: String) {
        let _ = self
            .hooks
            .dispatch(HookContext {
                collection: self.name.clone(),
                point: HookPoint::OnError,
                id: point_id,
                document: None,
                error_message: Some(message),
            })
            .await;
    }

    /// Insert a new document (spec §4.4). Assigns `_id` if absent;
    /// returns [`Error::UniqueConstraint`] if a supplied id already
    /// exists. A closed collection silently no-ops, returning `doc`
    /// unchanged (spec §7 point 6).
    pub async fn insert(&self, mut doc: Document) -> Result<Document> {
        if self.is_closed() {
            return Ok(doc);
        }

        let id = match doc.get("_id").and_then(Value::as_str) {
            Some(existing) => {
                let found = self.find_by_id(existing).await?;
                if found.is_some() {
                    return Err(Error::unique_constraint("id", existing.to_owned()));
                }
                existing.to_owned()
            }
            None => document::new_id(),
        };
        doc.insert("_id".to_owned(), Value::String(id.clone()));

        document::validate_and_normalize(&self.schema, &mut doc)?;
        self.check_foreign_keys(&doc).await?;

        let carried = self.dispatch(HookPoint::BeforeInsert, Some(id.clone()), Some(doc)).await;
        let doc = match carried {
            Ok(carried) => carried.unwrap_or_default(),
            Err(err) => {
                self.dispatch_error(Some(id), err.to_string()).await;
                return Err(err);
            }
        };

        let result = self.write_insert(&id, &doc).await;
        match result {
            Ok(()) => {
                let _ = self.dispatch(HookPoint::AfterInsert, Some(id), Some(doc.clone())).await;
                Ok(doc)
            }
            Err(err) => {
                self.dispatch_error(Some(id), err.to_string()).await;
                Err(err)
            }
        }
    }

    async fn write_insert(&self, id: &str, doc: &Document) -> Result<()> {
        let promoted = self.promoted_params(doc);
        let columns: Vec<&str> = std::iter::once("_id").chain(std::iter::once("doc")).chain(promoted.iter().map(|(c, _)| c.as_str())).collect();
        let placeholders = vec!["?"; columns.len()].join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({placeholders})",
            self.name,
            columns.join(", ")
        );
        let mut params = vec![SqlParam::Text(id.to_owned()), SqlParam::Text(document::encode_to_text(doc))];
        params.extend(promoted.into_iter().map(|(_, p)| p));

        let mut tx = self.driver.begin().await?;
        tx.exec(&sql, &params).await?;
        self.write_vector_sidecars(&mut *tx, id, doc).await?;
        tx.commit().await
    }

    /// Insert each document independently (spec §4.4: "atomic semantics
    /// per document, no implicit cross-document transaction"). A
    /// failure on one document does not prevent the rest from being
    /// attempted; results are returned in input order.
    pub async fn insert_bulk(&self, docs: Vec<Document>) -> Vec<Result<Document>> {
        let mut results = Vec::with_capacity(docs.len());
        for doc in docs {
            results.push(self.insert(doc).await);
        }
        results
    }

    /// Fetch the stored document by id, overlaying promoted columns so
    /// they win on divergence from the `doc` blob (spec §4.4).
    pub async fn find_by_id(&self, id: &str) -> Result<Option<Document>> {
        if self.is_closed() {
            return Ok(None);
        }
        let select_columns: Vec<&str> = std::iter::once("_id")
            .chain(std::iter::once("doc"))
            .chain(self.compiled.table.columns.iter().skip(2).map(|c| c.name.as_str()))
            .collect();
        let sql = format!("SELECT {} FROM {} WHERE _id = ?", select_columns.join(", "), self.name);
        let rows = self.driver.query(&sql, &[SqlParam::Text(id.to_owned())]).await?;
        let Some(row) = rows.first() else { return Ok(None) };
        Ok(Some(self.row_to_document(row.as_ref())?))
    }

    fn row_to_document(&self, row: &dyn SqlRow) -> Result<Document> {
        let text = row
            .try_get_string("doc")?
            .ok_or_else(|| Error::database(DatabaseErrorCode::Other, "row missing 'doc' column"))?;
        let mut doc = document::decode_from_text(&text)?;
        if let Some(id) = row.try_get_string("_id")? {
            doc.insert("_id".to_owned(), Value::String(id));
        }
        for (path, _) in &self.schema.promotions {
            let column_name = doculite_domain::schema::column_name_for_path(path);
            let column = self.promoted_column(&column_name);
            let Some(column) = column else { continue };
            if column.type_ == ColumnType::Vector {
                continue;
            }
            if let Some(value) = self.read_promoted_value(row, column)? {
                document::path::set(&mut doc, path, value);
            }
        }
        Ok(doc)
    }

    fn read_promoted_value(&self, row: &dyn SqlRow, column: &ColumnDef) -> Result<Option<Value>> {
        Ok(match column.type_ {
            ColumnType::Text => row.try_get_string(&column.name)?.map(Value::String),
            ColumnType::Integer => row.try_get_i64(&column.name)?.map(|n| Value::Number(n.into())),
            ColumnType::Real => row
                .try_get_f64(&column.name)?
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number),
            ColumnType::Blob => row
                .try_get_blob(&column.name)?
                .map(|b| Value::String(String::from_utf8_lossy(&b).into_owned())),
            ColumnType::Vector => None,
        })
    }

    /// Merge `partial` into the existing document and re-validate (spec
    /// §4.4). Returns [`Error::NotFound`] if `id` has no existing row.
    pub async fn put(&self, id: &str, partial: Document) -> Result<Document> {
        if self.is_closed() {
            return Ok(partial);
        }
        let Some(mut existing) = self.find_by_id(id).await? else {
            return Err(Error::not_found(id.to_owned()));
        };
        for (key, value) in partial {
            existing.insert(key, value);
        }
        existing.insert("_id".to_owned(), Value::String(id.to_owned()));

        document::validate_and_normalize(&self.schema, &mut existing)?;
        self.check_foreign_keys(&existing).await?;

        let carried = self.dispatch(HookPoint::BeforeUpdate, Some(id.to_owned()), Some(existing)).await;
        let merged = match carried {
            Ok(carried) => carried.unwrap_or_default(),
            Err(err) => {
                self.dispatch_error(Some(id.to_owned()), err.to_string()).await;
                return Err(err);
            }
        };

        match self.write_replace(id, &merged).await {
            Ok(()) => {
                let _ = self.dispatch(HookPoint::AfterUpdate, Some(id.to_owned()), Some(merged.clone())).await;
                Ok(merged)
            }
            Err(err) => {
                self.dispatch_error(Some(id.to_owned()), err.to_string()).await;
                Err(err)
            }
        }
    }

    /// Validate and write a full document under `id`, replacing any
    /// existing row atomically (spec §4.4: `INSERT ... ON CONFLICT(_id)
    /// DO REPLACE` semantics).
    pub async fn upsert(&self, id: &str, mut doc: Document) -> Result<Document> {
        if self.is_closed() {
            return Ok(doc);
        }
        doc.insert("_id".to_owned(), Value::String(id.to_owned()));
        document::validate_and_normalize(&self.schema, &mut doc)?;
        self.check_foreign_keys(&doc).await?;

        let carried = self.dispatch(HookPoint::BeforeUpsert, Some(id.to_owned()), Some(doc)).await;
        let doc = match carried {
            Ok(carried) => carried.unwrap_or_default(),
            Err(err) => {
                self.dispatch_error(Some(id.to_owned()), err.to_string()).await;
                return Err(err);
            }
        };

        match self.write_replace(id, &doc).await {
            Ok(()) => {
                let _ = self.dispatch(HookPoint::AfterUpsert, Some(id.to_owned()), Some(doc.clone())).await;
                Ok(doc)
            }
            Err(err) => {
                self.dispatch_error(Some(id.to_owned()), err.to_string()).await;
                Err(err)
            }
        }
    }

    async fn write_replace(&self, id: &str, doc: &Document) -> Result<()> {
        let promoted = self.promoted_params(doc);
        let columns: Vec<&str> = std::iter::once("_id").chain(std::iter::once("doc")).chain(promoted.iter().map(|(c, _)| c.as_str())).collect();
        let placeholders = vec!["?"; columns.len()].join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({placeholders}) \
             ON CONFLICT(_id) DO UPDATE SET {}",
            self.name,
            columns.join(", "),
            columns
                .iter()
                .filter(|c| **c != "_id")
                .map(|c| format!("{c} = excluded.{c}"))
                .collect::<Vec<_>>()
                .join(", ")
        );
        let mut params = vec![SqlParam::Text(id.to_owned()), SqlParam::Text(document::encode_to_text(doc))];
        params.extend(promoted.into_iter().map(|(_, p)| p));

        let mut tx = self.driver.begin().await?;
        tx.exec(&sql, &params).await?;
        self.write_vector_sidecars(&mut *tx, id, doc).await?;
        tx.commit().await
    }

    /// Delete by id. Deleting a missing id is not an error (spec §4.4:
    /// "returns success idempotently"); FK cascades follow the declared
    /// `ON DELETE` action.
    pub async fn delete(&self, id: &str) -> Result<()> {
        if self.is_closed() {
            return Ok(());
        }
        let _ = self.dispatch(HookPoint::BeforeDelete, Some(id.to_owned()), None).await;

        let mut tx = self.driver.begin().await?;
        tx.exec(&format!("DELETE FROM {} WHERE _id = ?", self.name), &[SqlParam::Text(id.to_owned())])
            .await?;
        for (_, column) in self.vector_promotions() {
            doculite_providers::sqlite::delete_sidecar_row(&mut *tx, &self.name, &column, id).await?;
        }
        tx.commit().await?;

        let _ = self.dispatch(HookPoint::AfterDelete, Some(id.to_owned()), None).await;
        Ok(())
    }

    /// Execute `spec` and decode every matching row.
    pub async fn to_array(&self, spec: &QuerySpec) -> Result<Vec<Document>> {
        if self.is_closed() {
            return Ok(Vec::new());
        }
        let compiled = compile_select(&self.name, &self.resolver, spec)?;
        let rows = self.driver.query(&compiled.sql, &compiled.params).await?;
        rows.iter().map(|row| self.row_to_document(row.as_ref())).collect()
    }

    /// Execute `spec` with its limit pinned to 1 and return the first
    /// match, if any.
    pub async fn first(&self, spec: &QuerySpec) -> Result<Option<Document>> {
        if self.is_closed() {
            return Ok(None);
        }
        let mut spec = spec.clone();
        spec.limit = Some(1);
        Ok(self.to_array(&spec).await?.into_iter().next())
    }

    /// Execute `spec`'s filters as a `COUNT(*)`.
    pub async fn count(&self, spec: &QuerySpec) -> Result<i64> {
        if self.is_closed() {
            return Ok(0);
        }
        let mut spec = spec.clone();
        spec.aggregates = vec![AggregateSpec::count_star().alias("count")];
        spec.select_fields = None;
        spec.order_by.clear();
        spec.limit = None;
        spec.offset = None;
        let compiled = compile_select(&self.name, &self.resolver, &spec)?;
        let rows = self.driver.query(&compiled.sql, &compiled.params).await?;
        Ok(rows.first().and_then(|r| r.try_get_i64("count").ok().flatten()).unwrap_or(0))
    }

    /// Run a k-NN search over a declared vector promotion (spec §4.5).
    pub async fn vector_search(
        &self,
        field: &str,
        vector: &[f32],
        limit: u32,
        where_filter: Option<&doculite_domain::query::Filter>,
    ) -> Result<Vec<(Document, f64)>> {
        if self.is_closed() {
            return Ok(Vec::new());
        }
        let hits: Vec<VectorHit> =
            vector_search(self.driver.as_ref(), &self.compiled, &self.resolver, field, vector, limit, where_filter).await?;
        hits.into_iter()
            .map(|hit| {
                let mut doc = document::decode_from_text(&hit.document)?;
                doc.insert("_id".to_owned(), Value::String(hit.id));
                Ok((doc, hit.distance))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doculite_domain::query::{Filter, Operator, SortDirection};
    use doculite_domain::schema::{FieldType, PromotionDef, RefAction, SchemaBuilder};

    use crate::database::Database;

    fn users_schema() -> CollectionSchema {
        SchemaBuilder::new()
            .field("email", FieldType::String)
            .optional_field("age", FieldType::Integer)
            .promote("email", PromotionDef::plain().unique().not_null())
            .promote("age", PromotionDef::plain())
            .build()
            .unwrap()
    }

    fn orders_schema() -> CollectionSchema {
        SchemaBuilder::new()
            .field("user_id", FieldType::String)
            .promote(
                "user_id",
                PromotionDef::plain().not_null().foreign_key("users", "id").on_delete(RefAction::Cascade),
            )
            .build()
            .unwrap()
    }

    fn docs_schema() -> CollectionSchema {
        SchemaBuilder::new()
            .field("embedding", FieldType::Array(Box::new(FieldType::Real)))
            .promote("embedding", PromotionDef::plain().vector(3))
            .build()
            .unwrap()
    }

    async fn open() -> Database {
        Database::connect_in_memory().await.unwrap()
    }

    fn doc(json: serde_json::Value) -> Document {
        json.as_object().unwrap().clone()
    }

    #[tokio::test]
    async fn insert_then_find_by_id_round_trips() {
        let db = open().await;
        let users = db.register_collection("users", users_schema()).await.unwrap();
        let inserted = users.insert(doc(serde_json::json!({"email": "a@example.com", "age": 30}))).await.unwrap();
        let id = inserted.get("_id").and_then(Value::as_str).unwrap().to_owned();

        let found = users.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(found.get("email"), Some(&Value::String("a@example.com".to_owned())));
        assert_eq!(found.get("age"), Some(&serde_json::json!(30)));
    }

    #[tokio::test]
    async fn insert_with_existing_id_conflict_is_unique_constraint() {
        let db = open().await;
        let users = db.register_collection("users", users_schema()).await.unwrap();
        let first = users.insert(doc(serde_json::json!({"email": "a@example.com"}))).await.unwrap();
        let id = first.get("_id").and_then(Value::as_str).unwrap().to_owned();

        let mut duplicate = doc(serde_json::json!({"email": "b@example.com"}));
        duplicate.insert("_id".to_owned(), Value::String(id));
        let err = users.insert(duplicate).await.unwrap_err();
        assert!(matches!(err, Error::UniqueConstraint { .. }));
    }

    #[tokio::test]
    async fn missing_required_field_rejected_on_insert() {
        let db = open().await;
        let users = db.register_collection("users", users_schema()).await.unwrap();
        let err = users.insert(doc(serde_json::json!({"age": 1}))).await.unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
    }

    #[tokio::test]
    async fn insert_bulk_reports_per_document_results() {
        let db = open().await;
        let users = db.register_collection("users", users_schema()).await.unwrap();
        let results = users
            .insert_bulk(vec![
                doc(serde_json::json!({"email": "a@example.com"})),
                doc(serde_json::json!({"age": 1})),
                doc(serde_json::json!({"email": "c@example.com"})),
            ])
            .await;
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
        assert!(results[2].is_ok());
    }

    #[tokio::test]
    async fn put_merges_partial_into_existing_document() {
        let db = open().await;
        let users = db.register_collection("users", users_schema()).await.unwrap();
        let inserted = users.insert(doc(serde_json::json!({"email": "a@example.com", "age": 1}))).await.unwrap();
        let id = inserted.get("_id").and_then(Value::as_str).unwrap().to_owned();

        let updated = users.put(&id, doc(serde_json::json!({"age": 2}))).await.unwrap();
        assert_eq!(updated.get("email"), Some(&Value::String("a@example.com".to_owned())));
        assert_eq!(updated.get("age"), Some(&serde_json::json!(2)));
    }

    #[tokio::test]
    async fn put_missing_id_is_not_found() {
        let db = open().await;
        let users = db.register_collection("users", users_schema()).await.unwrap();
        let err = users.put("missing", doc(serde_json::json!({"age": 2}))).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[tokio::test]
    async fn upsert_replaces_the_full_document() {
        let db = open().await;
        let users = db.register_collection("users", users_schema()).await.unwrap();
        users.upsert("fixed-id", doc(serde_json::json!({"email": "a@example.com", "age": 1}))).await.unwrap();
        let replaced = users.upsert("fixed-id", doc(serde_json::json!({"email": "b@example.com"}))).await.unwrap();
        assert_eq!(replaced.get("email"), Some(&Value::String("b@example.com".to_owned())));

        let found = users.find_by_id("fixed-id").await.unwrap().unwrap();
        assert_eq!(found.get("email"), Some(&Value::String("b@example.com".to_owned())));
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let db = open().await;
        let users = db.register_collection("users", users_schema()).await.unwrap();
        let inserted = users.insert(doc(serde_json::json!({"email": "a@example.com"}))).await.unwrap();
        let id = inserted.get("_id").and_then(Value::as_str).unwrap().to_owned();

        users.delete(&id).await.unwrap();
        assert!(users.find_by_id(&id).await.unwrap().is_none());
        users.delete(&id).await.unwrap();
        users.delete("never-existed").await.unwrap();
    }

    #[tokio::test]
    async fn foreign_key_violation_is_rejected() {
        let db = open().await;
        db.register_collection("users", users_schema()).await.unwrap();
        let orders = db.register_collection("orders", orders_schema()).await.unwrap();
        let err = orders.insert(doc(serde_json::json!({"user_id": "nonexistent"}))).await.unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
    }

    #[tokio::test]
    async fn foreign_key_to_existing_row_is_accepted() {
        let db = open().await;
        let users = db.register_collection("users", users_schema()).await.unwrap();
        let orders = db.register_collection("orders", orders_schema()).await.unwrap();
        let user = users.insert(doc(serde_json::json!({"email": "a@example.com"}))).await.unwrap();
        let user_id = user.get("_id").and_then(Value::as_str).unwrap().to_owned();
        orders.insert(doc(serde_json::json!({"user_id": user_id}))).await.unwrap();
    }

    #[tokio::test]
    async fn to_array_honors_filter_order_and_limit() {
        let db = open().await;
        let users = db.register_collection("users", users_schema()).await.unwrap();
        for age in [10, 20, 30] {
            users.insert(doc(serde_json::json!({"email": format!("user{age}@example.com"), "age": age}))).await.unwrap();
        }

        let spec = users
            .query()
            .filter(Filter::leaf("age", Operator::Gte, 20i64))
            .order_by("age", SortDirection::Desc)
            .limit(1)
            .build()
            .unwrap();
        let results = users.to_array(&spec).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].get("age"), Some(&serde_json::json!(30)));
    }

    #[tokio::test]
    async fn first_returns_none_when_nothing_matches() {
        let db = open().await;
        let users = db.register_collection("users", users_schema()).await.unwrap();
        let spec = users.query().filter(Filter::leaf("age", Operator::Gte, 99i64)).build().unwrap();
        assert!(users.first(&spec).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn count_reflects_matching_rows() {
        let db = open().await;
        let users = db.register_collection("users", users_schema()).await.unwrap();
        users.insert(doc(serde_json::json!({"email": "a@example.com", "age": 10}))).await.unwrap();
        users.insert(doc(serde_json::json!({"email": "b@example.com", "age": 20}))).await.unwrap();

        let spec = users.query().build().unwrap();
        assert_eq!(users.count(&spec).await.unwrap(), 2);

        let filtered = users.query().filter(Filter::leaf("age", Operator::Gte, 15i64)).build().unwrap();
        assert_eq!(users.count(&filtered).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn vector_search_ranks_by_distance() {
        let db = open().await;
        let docs = db.register_collection("docs", docs_schema()).await.unwrap();
        docs.insert(doc(serde_json::json!({"embedding": [1.0, 0.0, 0.0]}))).await.unwrap();
        docs.insert(doc(serde_json::json!({"embedding": [0.0, 1.0, 0.0]}))).await.unwrap();

        let hits = docs.vector_search("embedding", &[1.0, 0.0, 0.0], 2, None).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].0.get("embedding"), Some(&serde_json::json!([1.0, 0.0, 0.0])));
        assert!(hits[0].1 <= hits[1].1);
    }

    #[tokio::test]
    async fn vector_sidecar_row_removed_on_delete() {
        let db = open().await;
        let docs = db.register_collection("docs", docs_schema()).await.unwrap();
        let inserted = docs.insert(doc(serde_json::json!({"embedding": [1.0, 0.0, 0.0]}))).await.unwrap();
        let id = inserted.get("_id").and_then(Value::as_str).unwrap().to_owned();

        docs.delete(&id).await.unwrap();
        let hits = docs.vector_search("embedding", &[1.0, 0.0, 0.0], 5, None).await.unwrap();
        assert!(hits.is_empty());
    }
}
