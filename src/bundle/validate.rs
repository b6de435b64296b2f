use serde_json::{Map, Value};

use crate::error::{Result, ShelfError};

// Older exports used the second name of each pair
pub(crate) const FORMAT_VERSION_FIELDS: &[&str] = &["formatVersion", "version"];
pub(crate) const EXPORTED_AT_FIELDS: &[&str] = &["exportedAt", "exportTimestamp"];
pub(crate) const RECORDS_FIELDS: &[&str] = &["records", "prompts"];
pub(crate) const NOTES_FIELDS: &[&str] = &["legacyNotes", "notes"];

const REQUIRED_RECORD_FIELDS: &[&str] = &["id", "title", "content"];

pub(crate) fn field<'a>(object: &'a Map<String, Value>, names: &[&str]) -> Option<&'a Value> {
    names.iter().find_map(|name| object.get(*name))
}

/// Check that `value` has the shape of an export bundle.
pub fn validate_bundle(value: &Value) -> Result<()> {
    let object = value
        .as_object()
        .ok_or_else(|| ShelfError::validation("Export data must be an object"))?;

    if !is_non_empty_string(field(object, FORMAT_VERSION_FIELDS)) {
        return Err(ShelfError::validation("Missing or invalid formatVersion field"));
    }

    if !is_non_empty_string(field(object, EXPORTED_AT_FIELDS)) {
        return Err(ShelfError::validation("Missing or invalid exportedAt field"));
    }

    let records = field(object, RECORDS_FIELDS)
        .and_then(Value::as_array)
        .ok_or_else(|| ShelfError::validation("Missing or invalid records array"))?;

    for (index, record) in records.iter().enumerate() {
        let record = record.as_object().ok_or_else(|| {
            ShelfError::validation(format!("Record at index {} is not an object", index))
        })?;
        for name in REQUIRED_RECORD_FIELDS {
            if !is_non_empty_string(record.get(*name)) {
                return Err(ShelfError::validation(format!(
                    "Record at index {} is missing or has invalid {}",
                    index, name
                )));
            }
        }
    }

    Ok(())
}

fn is_non_empty_string(value: Option<&Value>) -> bool {
    matches!(value, Some(Value::String(s)) if !s.is_empty())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn reason(value: Value) -> String {
        match validate_bundle(&value) {
            Err(ShelfError::Validation(reason)) => reason,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_accepts_current_and_legacy_names() {
        let current = json!({
            "formatVersion": "1.0.0",
            "exportedAt": "2024-01-01T00:00:00Z",
            "records": [{"id": "a", "title": "t", "content": "c"}]
        });
        assert!(validate_bundle(&current).is_ok());

        let legacy = json!({
            "version": "1.0.0",
            "exportTimestamp": "2024-01-01T00:00:00Z",
            "prompts": []
        });
        assert!(validate_bundle(&legacy).is_ok());
    }

    #[test]
    fn test_rejects_bad_top_level() {
        assert_eq!(reason(json!([1, 2])), "Export data must be an object");
        assert_eq!(
            reason(json!({"formatVersion": "", "exportedAt": "x", "records": []})),
            "Missing or invalid formatVersion field"
        );
        assert_eq!(
            reason(json!({"formatVersion": "1", "exportedAt": 5, "records": []})),
            "Missing or invalid exportedAt field"
        );
        assert_eq!(
            reason(json!({"formatVersion": "1", "exportedAt": "x", "records": {}})),
            "Missing or invalid records array"
        );
    }

    #[test]
    fn test_names_offending_record_and_field() {
        let bundle = json!({
            "formatVersion": "1.0.0",
            "exportedAt": "2024-01-01T00:00:00Z",
            "records": [
                {"id": "a", "title": "t", "content": "c"},
                {"id": "b", "title": "t", "content": ""}
            ]
        });
        assert_eq!(
            reason(bundle),
            "Record at index 1 is missing or has invalid content"
        );
    }
}
