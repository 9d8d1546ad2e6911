//! Dotted-path access into a document's JSON object tree.

use serde_json::{Map, Value};

/// Read the value at a dotted path, e.g. `"address.city"`.
#[must_use]
pub fn get<'a>(doc: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let first = segments.next()?;
    let mut current = doc.get(first)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Write `value` at a dotted path, creating intermediate objects as
/// needed.
pub fn set(doc: &mut Map<String, Value>, path: &str, value: Value) {
    let mut segments: Vec<&str> = path.split('.').collect();
    let last = segments.pop().expect("path is non-empty");
    let mut current = doc;
    for segment in segments {
        current = current
            .entry(segment.to_owned())
            .or_insert_with(|| Value::Object(Map::new()))
            .as_object_mut()
            .expect("intermediate path segment is an object");
    }
    current.insert(last.to_owned(), value);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reads_top_level_field() {
        let doc = json!({"email": "a@example.com"}).as_object().unwrap().clone();
        assert_eq!(get(&doc, "email"), Some(&Value::String("a@example.com".into())));
    }

    #[test]
    fn reads_nested_field() {
        let doc = json!({"address": {"city": "Paris"}}).as_object().unwrap().clone();
        assert_eq!(get(&doc, "address.city"), Some(&Value::String("Paris".into())));
    }

    #[test]
    fn set_creates_intermediate_objects() {
        let mut doc = Map::new();
        set(&mut doc, "address.city", Value::String("Berlin".into()));
        assert_eq!(get(&doc, "address.city"), Some(&Value::String("Berlin".into())));
    }

    #[test]
    fn missing_path_returns_none() {
        let doc = json!({"email": "a@example.com"}).as_object().unwrap().clone();
        assert_eq!(get(&doc, "address.city"), None);
    }
}
