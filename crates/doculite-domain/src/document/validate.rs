//! Shape validation against a collection's schema, applying defaults and
//! normalizing dates on write (spec §4.4).

use serde_json::{Map, Value};

use super::date;
use super::path;
use crate::error::{Error, Result};
use crate::schema::{CollectionSchema, FieldType};

/// Validate `doc` against `schema`, applying literal defaults for missing
/// optional fields and normalizing date values to the tagged wire form.
/// Mutates `doc` in place.
pub fn validate_and_normalize(schema: &CollectionSchema, doc: &mut Map<String, Value>) -> Result<()> {
    for field in &schema.fields {
        match path::get(doc, &field.path).cloned() {
            Some(value) => {
                let normalized = check_and_normalize(&field.path, &field.field_type, &value)?;
                if let Some(normalized) = normalized {
                    path::set(doc, &field.path, normalized);
                }
            }
            None => {
                if field.required {
                    return Err(Error::validation(
                        field.path.clone(),
                        "field is required but was not supplied",
                    ));
                }
                if let Some(default) = &field.default {
                    path::set(doc, &field.path, default.clone());
                }
            }
        }
    }
    Ok(())
}

/// Check `value` against `field_type`, returning `Some(replacement)` when
/// the value should be rewritten (dates only) or `None` to leave it as-is.
fn check_and_normalize(path: &str, field_type: &FieldType, value: &Value) -> Result<Option<Value>> {
    match field_type {
        FieldType::String => {
            expect(path, value.is_string(), "expected a string")?;
            Ok(None)
        }
        FieldType::Integer => {
            expect(path, value.is_i64() || value.is_u64(), "expected an integer")?;
            Ok(None)
        }
        FieldType::Real => {
            expect(path, value.is_number(), "expected a number")?;
            Ok(None)
        }
        FieldType::Boolean => {
            expect(path, value.is_boolean(), "expected a boolean")?;
            Ok(None)
        }
        FieldType::Date => {
            let parsed = date::parse(value).ok_or_else(|| {
                Error::validation(path, "expected an ISO-8601 date or tagged date value")
            })?;
            Ok(Some(date::tag(parsed)))
        }
        FieldType::Array(elem) => {
            let arr = value
                .as_array()
                .ok_or_else(|| Error::validation(path, "expected an array"))?;
            let mut rewritten = None;
            for (i, item) in arr.iter().enumerate() {
                let item_path = format!("{path}[{i}]");
                if let Some(replacement) = check_and_normalize(&item_path, elem, item)? {
                    let mut new_arr = arr.clone();
                    new_arr[i] = replacement;
                    rewritten = Some(Value::Array(new_arr));
                }
            }
            Ok(rewritten)
        }
        FieldType::Object => {
            expect(path, value.is_object(), "expected an object")?;
            Ok(None)
        }
        FieldType::TaggedUnion(variants) => {
            let obj = value
                .as_object()
                .ok_or_else(|| Error::validation(path, "expected a tagged union object"))?;
            let tag = obj
                .get("tag")
                .and_then(Value::as_str)
                .ok_or_else(|| Error::validation(path, "tagged union is missing a 'tag' field"))?;
            let variant_type = variants.get(tag).ok_or_else(|| {
                Error::validation(path, format!("unknown tagged union variant '{tag}'"))
            })?;
            if let Some(inner) = obj.get("value") {
                check_and_normalize(&format!("{path}.value"), variant_type, inner)?;
            }
            Ok(None)
        }
    }
}

fn expect(path: &str, ok: bool, message: &str) -> Result<()> {
    if ok {
        Ok(())
    } else {
        Err(Error::validation(path, message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaBuilder;
    use serde_json::json;

    fn schema() -> CollectionSchema {
        SchemaBuilder::new()
            .field("email", FieldType::String)
            .optional_field("nickname", FieldType::String)
            .default_value("nickname", json!("anonymous"))
            .field("created_at", FieldType::Date)
            .build()
            .unwrap()
    }

    #[test]
    fn missing_required_field_is_rejected() {
        let mut doc = json!({"created_at": "2024-01-01T00:00:00Z"})
            .as_object()
            .unwrap()
            .clone();
        let err = validate_and_normalize(&schema(), &mut doc).unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
    }

    #[test]
    fn missing_optional_field_gets_default() {
        let mut doc = json!({
            "email": "a@example.com",
            "created_at": "2024-01-01T00:00:00Z",
        })
        .as_object()
        .unwrap()
        .clone();
        validate_and_normalize(&schema(), &mut doc).unwrap();
        assert_eq!(doc.get("nickname"), Some(&json!("anonymous")));
    }

    #[test]
    fn date_field_normalized_to_tagged_form() {
        let mut doc = json!({
            "email": "a@example.com",
            "created_at": "2024-01-01T00:00:00Z",
        })
        .as_object()
        .unwrap()
        .clone();
        validate_and_normalize(&schema(), &mut doc).unwrap();
        assert!(date::is_tagged(doc.get("created_at").unwrap()));
    }

    #[test]
    fn wrong_type_is_rejected() {
        let mut doc = json!({
            "email": 42,
            "created_at": "2024-01-01T00:00:00Z",
        })
        .as_object()
        .unwrap()
        .clone();
        assert!(validate_and_normalize(&schema(), &mut doc).is_err());
    }
}
