//! Canonical wire representation for date values (spec §6):
//! `{"__type":"Date","value":"<ISO-8601>"}`.

use chrono::{DateTime, Utc};
use serde_json::{json, Value};

const TAG_KEY: &str = "__type";
const TAG_VALUE: &str = "Date";
const VALUE_KEY: &str = "value";

/// Build the tagged wire value for `dt`.
#[must_use]
pub fn tag(dt: DateTime<Utc>) -> Value {
    json!({ TAG_KEY: TAG_VALUE, VALUE_KEY: dt.to_rfc3339() })
}

/// True if `value` is a tagged date object.
#[must_use]
pub fn is_tagged(value: &Value) -> bool {
    value
        .as_object()
        .and_then(|obj| obj.get(TAG_KEY))
        .and_then(Value::as_str)
        == Some(TAG_VALUE)
}

/// Parse a tagged date object (or a bare ISO-8601 string) back to a
/// `DateTime<Utc>`.
#[must_use]
pub fn parse(value: &Value) -> Option<DateTime<Utc>> {
    let raw = if is_tagged(value) {
        value.get(VALUE_KEY)?.as_str()?
    } else {
        value.as_str()?
    };
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_tagged_form() {
        let now = Utc::now();
        let tagged = tag(now);
        assert!(is_tagged(&tagged));
        let parsed = parse(&tagged).unwrap();
        assert_eq!(parsed.timestamp_millis(), now.timestamp_millis());
    }

    #[test]
    fn accepts_bare_iso8601_string() {
        let value = Value::String("2024-01-15T10:30:00Z".to_owned());
        assert!(parse(&value).is_some());
    }

    #[test]
    fn rejects_non_date_value() {
        let value = Value::String("not a date".to_owned());
        assert!(parse(&value).is_none());
    }
}
