//! SQL query compiler (spec §4.3): lowers a backend-agnostic
//! [`QuerySpec`] into parameterized SQL text plus bound [`SqlParam`]s.
//! Grounded in shape on `query_helpers.rs`'s parameterized-execution
//! idiom, generalized here to include clause assembly.

use doculite_domain::error::{Error, Result};
use doculite_domain::ports::database::SqlParam;
use doculite_domain::query::{
    AggregateSpec, Filter, FilterValue, GroupKind, JoinKind, JoinSpec, Operator, QuerySpec,
    SortDirection,
};
use doculite_domain::schema::{FieldAccess, FieldResolver};

/// Parameterized SQL plus its bound values, ready to hand to a
/// [`doculite_domain::ports::database::SqlDriver`].
#[derive(Debug, Clone)]
pub struct CompiledQuery {
    pub sql: String,
    pub params: Vec<SqlParam>,
}

fn filter_value_to_param(value: &FilterValue) -> Result<SqlParam> {
    match value {
        FilterValue::String(s) => Ok(SqlParam::Text(s.clone())),
        FilterValue::Integer(i) => Ok(SqlParam::Integer(*i)),
        FilterValue::Real(r) => Ok(SqlParam::Real(*r)),
        FilterValue::Bool(b) => Ok(SqlParam::Integer(i64::from(*b))),
        FilterValue::Null => Ok(SqlParam::Null),
        FilterValue::List(_) => Err(Error::config(
            "a list value cannot be bound directly; expand with in_list_placeholders",
        )),
    }
}

fn access_expr(resolver: &FieldResolver, field: &str) -> String {
    match resolver.resolve(field) {
        FieldAccess::Column(column) => column,
        FieldAccess::Json(path) => format!("json_extract(doc, '$.{path}')"),
    }
}

fn like_operator_sql(op: Operator) -> &'static str {
    match op {
        Operator::Like | Operator::StartsWith | Operator::EndsWith | Operator::Contains => "LIKE",
        _ => unreachable!("like_operator_sql called with a non-LIKE-family operator"),
    }
}

fn escape_like(raw: &str) -> String {
    raw.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn like_pattern(op: Operator, raw: &str) -> String {
    let escaped = escape_like(raw);
    match op {
        Operator::StartsWith => format!("{escaped}%"),
        Operator::EndsWith => format!("%{escaped}"),
        Operator::Contains => format!("%{escaped}%"),
        Operator::Like => escaped,
        _ => unreachable!("like_pattern called with a non-LIKE-family operator"),
    }
}

fn comparison_sql(op: Operator) -> &'static str {
    match op {
        Operator::Eq => "=",
        Operator::Neq => "!=",
        Operator::Gt => ">",
        Operator::Gte => ">=",
        Operator::Lt => "<",
        Operator::Lte => "<=",
        _ => unreachable!("comparison_sql called with a non-comparison operator"),
    }
}

/// Compile one filter node, appending bound values to `params`. `raw_fields`
/// treats leaf field names as literal SQL identifiers instead of resolving
/// them through `resolver` — used for `HAVING`, where a field name is an
/// aggregate alias, not a document path.
fn compile_filter(
    filter: &Filter,
    resolver: &FieldResolver,
    raw_fields: bool,
    params: &mut Vec<SqlParam>,
) -> Result<String> {
    match filter {
        Filter::Group { kind, filters } => {
            if filters.is_empty() {
                return Ok(match kind {
                    GroupKind::And => "1".to_owned(),
                    GroupKind::Or => "0".to_owned(),
                });
            }
            let joiner = match kind {
                GroupKind::And => " AND ",
                GroupKind::Or => " OR ",
            };
            let parts = filters
                .iter()
                .map(|f| compile_filter(f, resolver, raw_fields, params))
                .collect::<Result<Vec<_>>>()?;
            Ok(format!("({})", parts.join(joiner)))
        }

        Filter::Leaf {
            field,
            operator,
            value,
            value2,
            length_cmp,
        } => {
            let access = if raw_fields {
                field.clone()
            } else {
                access_expr(resolver, field)
            };
            compile_leaf(field, &access, *operator, value.as_ref(), value2.as_ref(), *length_cmp, params)
        }

        Filter::Subquery {
            field,
            operator,
            subquery,
            subquery_collection,
        } => compile_subquery(field, *operator, subquery, subquery_collection, resolver, params),
    }
}

#[allow(clippy::too_many_arguments)]
fn compile_leaf(
    field: &str,
    access: &str,
    operator: Operator,
    value: Option<&FilterValue>,
    value2: Option<&FilterValue>,
    length_cmp: Option<Operator>,
    params: &mut Vec<SqlParam>,
) -> Result<String> {
    match operator {
        Operator::Eq | Operator::Neq | Operator::Gt | Operator::Gte | Operator::Lt | Operator::Lte => {
            let value = value.ok_or_else(|| Error::config(format!("operator on '{field}' requires a value")))?;
            params.push(filter_value_to_param(value)?);
            Ok(format!("{access} {} ?", comparison_sql(operator)))
        }
        Operator::In | Operator::NotIn => {
            let values = match value {
                Some(FilterValue::List(list)) => list,
                _ => return Err(Error::config(format!("'{field}' In/NotIn requires a list value"))),
            };
            if values.is_empty() {
                // An empty In never matches; an empty NotIn always matches.
                return Ok(if operator == Operator::In { "0".to_owned() } else { "1".to_owned() });
            }
            let placeholders = vec!["?"; values.len()].join(", ");
            for v in values {
                params.push(filter_value_to_param(v)?);
            }
            let kw = if operator == Operator::In { "IN" } else { "NOT IN" };
            Ok(format!("{access} {kw} ({placeholders})"))
        }
        Operator::Like => {
            let value = value.ok_or_else(|| Error::config(format!("'{field}' Like requires a value")))?;
            let raw = as_string(field, value)?;
            params.push(SqlParam::Text(like_pattern(operator, raw)));
            Ok(format!("{access} {} ? ESCAPE '\\'", like_operator_sql(operator)))
        }
        Operator::ILike => {
            let value = value.ok_or_else(|| Error::config(format!("'{field}' ILike requires a value")))?;
            let raw = as_string(field, value)?;
            params.push(SqlParam::Text(like_pattern(Operator::Like, raw)));
            Ok(format!("LOWER({access}) LIKE LOWER(?) ESCAPE '\\'"))
        }
        Operator::StartsWith | Operator::EndsWith | Operator::Contains => {
            let value = value.ok_or_else(|| Error::config(format!("'{field}' requires a value")))?;
            let raw = as_string(field, value)?;
            params.push(SqlParam::Text(like_pattern(operator, raw)));
            Ok(format!("{access} {} ? ESCAPE '\\'", like_operator_sql(operator)))
        }
        Operator::Exists => Ok(format!("{access} IS NOT NULL")),
        Operator::NotExists => Ok(format!("{access} IS NULL")),
        Operator::Between => {
            let (low, high) = match (value, value2) {
                (Some(a), Some(b)) => (a, b),
                _ => return Err(Error::config(format!("'{field}' Between requires two values"))),
            };
            params.push(filter_value_to_param(low)?);
            params.push(filter_value_to_param(high)?);
            Ok(format!("{access} BETWEEN ? AND ?"))
        }
        Operator::JsonArrayContains | Operator::JsonArrayNotContains => {
            let value = value.ok_or_else(|| Error::config(format!("'{field}' requires a value")))?;
            params.push(filter_value_to_param(value)?);
            let kw = if operator == Operator::JsonArrayContains { "EXISTS" } else { "NOT EXISTS" };
            Ok(format!("{kw}(SELECT 1 FROM json_each({access}) WHERE value = ?)"))
        }
        Operator::JsonArrayLength => {
            let n = value.ok_or_else(|| Error::config(format!("'{field}' JsonArrayLength requires a value")))?;
            let cmp = length_cmp
                .ok_or_else(|| Error::config(format!("'{field}' JsonArrayLength requires a comparison operator")))?;
            params.push(filter_value_to_param(n)?);
            Ok(format!(
                "(SELECT COUNT(*) FROM json_each({access})) {} ?",
                comparison_sql(cmp)
            ))
        }
    }
}

fn as_string<'a>(field: &str, value: &'a FilterValue) -> Result<&'a str> {
    match value {
        FilterValue::String(s) => Ok(s),
        _ => Err(Error::config(format!("'{field}' requires a string value"))),
    }
}

fn compile_subquery(
    field: &str,
    operator: Operator,
    subquery: &QuerySpec,
    subquery_collection: &str,
    resolver: &FieldResolver,
    params: &mut Vec<SqlParam>,
) -> Result<String> {
    let sub_resolver = FieldResolver::json_only();
    let compiled = compile_select(subquery_collection, &sub_resolver, subquery)?;
    params.extend(compiled.params);
    match operator {
        Operator::Exists => Ok(format!("EXISTS ({})", compiled.sql)),
        Operator::NotExists => Ok(format!("NOT EXISTS ({})", compiled.sql)),
        Operator::In => {
            let access = access_expr(resolver, field);
            Ok(format!("{access} IN ({})", compiled.sql))
        }
        Operator::NotIn => {
            let access = access_expr(resolver, field);
            Ok(format!("{access} NOT IN ({})", compiled.sql))
        }
        other => Err(Error::config(format!(
            "operator {other:?} is not valid on a subquery filter"
        ))),
    }
}

fn aggregate_sql(agg: &AggregateSpec) -> String {
    let inner = match (&agg.field, agg.function) {
        (None, _) => "*".to_owned(),
        (Some(f), _) if agg.distinct => format!("DISTINCT {f}"),
        (Some(f), _) => f.clone(),
    };
    let expr = format!("{}({inner})", agg.function.sql());
    match &agg.alias {
        Some(alias) => format!("{expr} AS {alias}"),
        None => expr,
    }
}

fn join_sql(resolver: &FieldResolver, join: &JoinSpec) -> String {
    let kind = match join.kind {
        JoinKind::Inner => "INNER JOIN",
        JoinKind::Left => "LEFT JOIN",
        JoinKind::Right => "RIGHT JOIN",
        JoinKind::Full => "FULL JOIN",
    };
    let left = access_expr(resolver, &join.left);
    format!(
        "{kind} {} ON {left} {} {}._id",
        join.collection,
        comparison_sql(join.op),
        join.collection
    )
}

/// Compile a full `SELECT` against `table`, using `resolver` for this
/// collection's field-access resolution.
pub fn compile_select(table: &str, resolver: &FieldResolver, spec: &QuerySpec) -> Result<CompiledQuery> {
    let mut params = Vec::new();

    let select_list = if !spec.aggregates.is_empty() {
        spec.aggregates.iter().map(aggregate_sql).collect::<Vec<_>>().join(", ")
    } else if let Some(fields) = &spec.select_fields {
        fields
            .iter()
            .map(|f| format!("{} AS {}", access_expr(resolver, f), f.replace('.', "_")))
            .collect::<Vec<_>>()
            .join(", ")
    } else {
        "_id, doc".to_owned()
    };

    let distinct = if spec.distinct { "DISTINCT " } else { "" };
    let mut sql = format!("SELECT {distinct}{select_list} FROM {table}");

    for join in &spec.joins {
        sql.push(' ');
        sql.push_str(&join_sql(resolver, join));
    }

    if let Some(filter) = &spec.filters {
        let clause = compile_filter(filter, resolver, false, &mut params)?;
        sql.push_str(" WHERE ");
        sql.push_str(&clause);
    }

    if !spec.group_by.is_empty() {
        let cols = spec
            .group_by
            .iter()
            .map(|f| access_expr(resolver, f))
            .collect::<Vec<_>>()
            .join(", ");
        sql.push_str(" GROUP BY ");
        sql.push_str(&cols);
    }

    if let Some(having) = &spec.having {
        let clause = compile_filter(having, resolver, true, &mut params)?;
        sql.push_str(" HAVING ");
        sql.push_str(&clause);
    }

    if !spec.order_by.is_empty() {
        let cols = spec
            .order_by
            .iter()
            .map(|(f, dir)| {
                let dir_sql = match dir {
                    SortDirection::Asc => "ASC",
                    SortDirection::Desc => "DESC",
                };
                format!("{} {dir_sql}", access_expr(resolver, f))
            })
            .collect::<Vec<_>>()
            .join(", ");
        sql.push_str(" ORDER BY ");
        sql.push_str(&cols);
    }

    if let Some(limit) = spec.limit {
        sql.push_str(&format!(" LIMIT {limit}"));
    }
    if let Some(offset) = spec.offset {
        sql.push_str(&format!(" OFFSET {offset}"));
    }

    Ok(CompiledQuery { sql, params })
}

#[cfg(test)]
mod tests {
    use super::*;
    use doculite_domain::query::QueryBuilder;
    use doculite_domain::schema::{CollectionSchema, PromotionDef};

    fn resolver_with_promoted(field: &str) -> FieldResolver {
        let schema = CollectionSchema {
            fields: vec![doculite_domain::schema::FieldDef {
                path: field.to_owned(),
                field_type: doculite_domain::schema::FieldType::String,
                required: true,
                default: None,
            }],
            promotions: vec![(field.to_owned(), PromotionDef::plain())],
            indexes: vec![],
            unique_constraints: vec![],
            ..CollectionSchema::default()
        };
        FieldResolver::new(&schema)
    }

    #[test]
    fn eq_filter_on_json_field_uses_json_extract() {
        let spec = QueryBuilder::new()
            .filter(Filter::leaf("status", Operator::Eq, "active"))
            .build()
            .unwrap();
        let compiled = compile_select("tasks", &FieldResolver::json_only(), &spec).unwrap();
        assert!(compiled.sql.contains("json_extract(doc, '$.status') = ?"));
        assert_eq!(compiled.params, vec![SqlParam::Text("active".to_owned())]);
    }

    #[test]
    fn eq_filter_on_promoted_field_uses_bare_column() {
        let spec = QueryBuilder::new()
            .filter(Filter::leaf("status", Operator::Eq, "active"))
            .build()
            .unwrap();
        let compiled = compile_select("tasks", &resolver_with_promoted("status"), &spec).unwrap();
        assert!(compiled.sql.contains("status = ?"));
        assert!(!compiled.sql.contains("json_extract"));
    }

    #[test]
    fn empty_in_list_compiles_to_always_false() {
        let spec = QueryBuilder::new()
            .filter(Filter::in_list::<_, i64>("age", Operator::In, vec![]))
            .build()
            .unwrap();
        let compiled = compile_select("users", &FieldResolver::json_only(), &spec).unwrap();
        assert!(compiled.sql.contains("WHERE 0"));
    }

    #[test]
    fn starts_with_escapes_wildcards() {
        let spec = QueryBuilder::new()
            .filter(Filter::leaf("name", Operator::StartsWith, "100%_off"))
            .build()
            .unwrap();
        let compiled = compile_select("products", &FieldResolver::json_only(), &spec).unwrap();
        assert_eq!(compiled.params, vec![SqlParam::Text("100\\%\\_off%".to_owned())]);
    }

    #[test]
    fn between_binds_two_values() {
        let spec = QueryBuilder::new()
            .filter(Filter::between("age", 18i64, 65i64))
            .build()
            .unwrap();
        let compiled = compile_select("users", &FieldResolver::json_only(), &spec).unwrap();
        assert!(compiled.sql.contains("BETWEEN ? AND ?"));
        assert_eq!(compiled.params.len(), 2);
    }

    #[test]
    fn page_compiles_to_limit_and_offset() {
        let spec = QueryBuilder::new().page(2, 10).unwrap().build().unwrap();
        let compiled = compile_select("users", &FieldResolver::json_only(), &spec).unwrap();
        assert!(compiled.sql.contains("LIMIT 10"));
        assert!(compiled.sql.contains("OFFSET 10"));
    }

    #[test]
    fn count_star_aggregate() {
        let spec = QueryBuilder::new()
            .aggregate(AggregateSpec::count_star())
            .build()
            .unwrap();
        let compiled = compile_select("users", &FieldResolver::json_only(), &spec).unwrap();
        assert!(compiled.sql.starts_with("SELECT COUNT(*) FROM users"));
    }

    #[test]
    fn json_array_contains_uses_json_each() {
        let spec = QueryBuilder::new()
            .filter(Filter::leaf("tags", Operator::JsonArrayContains, "rust"))
            .build()
            .unwrap();
        let compiled = compile_select("posts", &FieldResolver::json_only(), &spec).unwrap();
        assert!(compiled.sql.contains("EXISTS(SELECT 1 FROM json_each"));
    }

    #[test]
    fn right_and_full_joins_compile_to_matching_sql_keywords() {
        let spec = QueryBuilder::new()
            .join(JoinSpec {
                kind: JoinKind::Right,
                collection: "orders".to_owned(),
                left: "id".to_owned(),
                right: "user_id".to_owned(),
                op: Operator::Eq,
            })
            .build()
            .unwrap();
        let compiled = compile_select("users", &FieldResolver::json_only(), &spec).unwrap();
        assert!(compiled.sql.contains("RIGHT JOIN orders ON"));

        let spec = QueryBuilder::new()
            .join(JoinSpec {
                kind: JoinKind::Full,
                collection: "orders".to_owned(),
                left: "id".to_owned(),
                right: "user_id".to_owned(),
                op: Operator::Eq,
            })
            .build()
            .unwrap();
        let compiled = compile_select("users", &FieldResolver::json_only(), &spec).unwrap();
        assert!(compiled.sql.contains("FULL JOIN orders ON"));
    }

    #[test]
    fn array_length_operator_compiles_subselect() {
        let spec = QueryBuilder::new()
            .filter(Filter::array_length("tags", Operator::Gt, 3))
            .build()
            .unwrap();
        let compiled = compile_select("posts", &FieldResolver::json_only(), &spec).unwrap();
        assert!(compiled.sql.contains("(SELECT COUNT(*) FROM json_each"));
        assert!(compiled.sql.contains(") > ?"));
    }
}
