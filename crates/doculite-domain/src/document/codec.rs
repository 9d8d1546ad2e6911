//! Wire (de)serialization of a document to/from the `doc` TEXT column.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use super::date;
use super::path;
use crate::error::{DatabaseErrorCode, Error, Result};

/// Serialize a document to its canonical JSON text form.
#[must_use]
pub fn encode_to_text(doc: &Map<String, Value>) -> String {
    // A `Map<String, Value>` always serializes; this cannot fail.
    serde_json::to_string(doc).expect("document serialization is infallible")
}

/// Parse a document back out of its stored JSON text form.
pub fn decode_from_text(text: &str) -> Result<Map<String, Value>> {
    let value: Value = serde_json::from_str(text).map_err(|e| {
        Error::database_with_source(DatabaseErrorCode::Other, "stored document is not valid JSON", e)
    })?;
    value
        .as_object()
        .cloned()
        .ok_or_else(|| Error::database(DatabaseErrorCode::Other, "stored document is not a JSON object"))
}

/// Read a date field back out as a native `DateTime<Utc>`, accepting
/// either the tagged wire form or a bare ISO-8601 string.
#[must_use]
pub fn extract_date(doc: &Map<String, Value>, field_path: &str) -> Option<DateTime<Utc>> {
    date::parse(path::get(doc, field_path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn round_trips_through_text() {
        let doc = json!({"email": "a@example.com"}).as_object().unwrap().clone();
        let text = encode_to_text(&doc);
        let decoded = decode_from_text(&text).unwrap();
        assert_eq!(doc, decoded);
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(decode_from_text("not json").is_err());
    }

    #[test]
    fn extracts_tagged_date() {
        let now = Utc::now();
        let mut doc = Map::new();
        doc.insert("created_at".to_owned(), date::tag(now));
        let extracted = extract_date(&doc, "created_at").unwrap();
        assert_eq!(extracted.timestamp_millis(), now.timestamp_millis());
    }
}
