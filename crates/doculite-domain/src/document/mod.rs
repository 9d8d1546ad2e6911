//! Document model: identifiers, dotted-path access, tagged-date wire
//! encoding, and schema-driven validation/normalization (spec §3/§4.4).

pub mod date;
mod codec;
mod id;
pub mod path;
mod validate;

pub use codec::{decode_from_text, encode_to_text, extract_date};
pub use id::{looks_like_uuid, new_id};
pub use validate::validate_and_normalize;

/// A document: an ordered JSON object mapping field names to values.
pub type Document = serde_json::Map<String, serde_json::Value>;
