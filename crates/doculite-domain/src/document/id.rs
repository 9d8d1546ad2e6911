//! Document identifiers: random 128-bit values rendered as canonical
//! UUIDv4 text (spec §3).

use uuid::Uuid;

/// Generate a new document id.
#[must_use]
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Syntactic validity check only; doculite does not require ids to be
/// UUIDs (a caller-supplied id is accepted as-is), but a generated one is
/// always well-formed.
#[must_use]
pub fn looks_like_uuid(id: &str) -> bool {
    Uuid::parse_str(id).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_unique_and_well_formed() {
        let a = new_id();
        let b = new_id();
        assert_ne!(a, b);
        assert!(looks_like_uuid(&a));
        assert!(looks_like_uuid(&b));
    }
}
