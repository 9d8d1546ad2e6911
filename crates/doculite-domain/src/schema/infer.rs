//! Type inference: nominal [`FieldType`] + optional override → storage
//! [`ColumnType`]. See spec §4.1.

use super::types::{ColumnType, FieldType, PromotionDef};

/// Infer the storage type for `field_type`, honoring `promotion`'s explicit
/// override if present.
///
/// Rules (in order): explicit override wins; string → TEXT; integer →
/// INTEGER; real/number → REAL; boolean → INTEGER(0/1); date → TEXT
/// (ISO-8601); numeric array with `vector_dimensions` set → VECTOR; any
/// other array → TEXT (JSON); nested object → TEXT (JSON); tagged union →
/// TEXT (JSON); otherwise TEXT.
#[must_use]
pub fn infer_storage_type(field_type: &FieldType, promotion: &PromotionDef) -> ColumnType {
    if let Some(override_ty) = promotion.storage_type {
        return override_ty;
    }
    match field_type {
        FieldType::String | FieldType::Date => ColumnType::Text,
        FieldType::Integer | FieldType::Boolean => ColumnType::Integer,
        FieldType::Real => ColumnType::Real,
        FieldType::Array(elem) => {
            if promotion.vector_dimensions.is_some() && is_numeric(elem) {
                ColumnType::Vector
            } else {
                ColumnType::Text
            }
        }
        FieldType::Object | FieldType::TaggedUnion(_) => ColumnType::Text,
    }
}

fn is_numeric(field_type: &FieldType) -> bool {
    matches!(field_type, FieldType::Integer | FieldType::Real)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_infers_text() {
        let ty = infer_storage_type(&FieldType::String, &PromotionDef::plain());
        assert_eq!(ty, ColumnType::Text);
    }

    #[test]
    fn boolean_infers_integer() {
        let ty = infer_storage_type(&FieldType::Boolean, &PromotionDef::plain());
        assert_eq!(ty, ColumnType::Integer);
    }

    #[test]
    fn date_infers_text() {
        let ty = infer_storage_type(&FieldType::Date, &PromotionDef::plain());
        assert_eq!(ty, ColumnType::Text);
    }

    #[test]
    fn numeric_array_with_dimensions_infers_vector() {
        let promo = PromotionDef::plain().vector(4);
        let ty = infer_storage_type(&FieldType::Array(Box::new(FieldType::Real)), &promo);
        assert_eq!(ty, ColumnType::Vector);
    }

    #[test]
    fn string_array_infers_text_even_with_dimensions() {
        let promo = PromotionDef::plain().vector(4);
        let ty = infer_storage_type(&FieldType::Array(Box::new(FieldType::String)), &promo);
        assert_eq!(ty, ColumnType::Text);
    }

    #[test]
    fn plain_array_infers_text() {
        let ty = infer_storage_type(
            &FieldType::Array(Box::new(FieldType::Integer)),
            &PromotionDef::plain(),
        );
        assert_eq!(ty, ColumnType::Text);
    }

    #[test]
    fn nested_object_infers_text() {
        let ty = infer_storage_type(&FieldType::Object, &PromotionDef::plain());
        assert_eq!(ty, ColumnType::Text);
    }

    #[test]
    fn explicit_override_wins() {
        let promo = PromotionDef::plain().storage_type(ColumnType::Blob);
        let ty = infer_storage_type(&FieldType::String, &promo);
        assert_eq!(ty, ColumnType::Blob);
    }
}
