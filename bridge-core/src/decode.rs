use crate::model::Telemetry;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum DecodeError {
    #[error("payload is not valid utf-8")]
    InvalidEncoding,
    #[error("missing uniqueId field")]
    MissingUniqueId,
    #[error("missing value field")]
    MissingValue,
    #[error("malformed value field: {0:?}")]
    MalformedValue(String),
}

/// Decodes a raw telemetry payload of comma-separated `key:value` fields.
///
/// Only `uniqueId` and `value` are looked at; unknown keys are ignored so
/// sensors can add fields without breaking older bridges. Fields without a
/// `:` or with an empty value segment are treated as unmatched. A `value`
/// that is present but not numeric fails the whole message, since a reading
/// without a numeric value is meaningless.
pub fn decode(payload: &[u8]) -> Result<Telemetry, DecodeError> {
    let text = std::str::from_utf8(payload).map_err(|_| DecodeError::InvalidEncoding)?;

    let mut unique_id: Option<String> = None;
    let mut value: Option<f64> = None;

    for part in text.split(',') {
        let Some((key, raw)) = part.split_once(':') else {
            continue;
        };
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }
        match key.trim() {
            "uniqueId" => unique_id = Some(raw.to_string()),
            "value" => {
                let parsed: f64 =
                    raw.parse().map_err(|_| DecodeError::MalformedValue(raw.to_string()))?;
                value = Some(parsed);
            }
            _ => {}
        }
    }

    let unique_id = unique_id.ok_or(DecodeError::MissingUniqueId)?;
    let value = value.ok_or(DecodeError::MissingValue)?;
    Ok(Telemetry { unique_id, value })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_well_formed_payload() {
        let t = decode(b"uniqueId:sensor-1,value:23.5").unwrap();
        assert_eq!(t.unique_id, "sensor-1");
        assert_eq!(t.value, 23.5);
    }

    #[test]
    fn field_order_does_not_matter() {
        let t = decode(b"value:7.25,uniqueId:sensor-2").unwrap();
        assert_eq!(t.unique_id, "sensor-2");
        assert_eq!(t.value, 7.25);
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let t = decode(b"battery:88,uniqueId:s1,rssi:-70,value:1.5").unwrap();
        assert_eq!(t.unique_id, "s1");
        assert_eq!(t.value, 1.5);
    }

    #[test]
    fn whitespace_around_values_is_trimmed() {
        let t = decode(b"uniqueId: sensor-3 ,value: 4.0 ").unwrap();
        assert_eq!(t.unique_id, "sensor-3");
        assert_eq!(t.value, 4.0);
    }

    #[test]
    fn negative_value_keeps_sign_and_precision() {
        let t = decode(b"uniqueId:s1,value:-3.14").unwrap();
        assert_eq!(t.value, -3.14);
    }

    #[test]
    fn missing_unique_id_fails() {
        assert_eq!(decode(b"value:1.0"), Err(DecodeError::MissingUniqueId));
    }

    #[test]
    fn missing_value_fails() {
        assert_eq!(decode(b"uniqueId:s1"), Err(DecodeError::MissingValue));
    }

    #[test]
    fn non_numeric_value_fails() {
        assert_eq!(
            decode(b"uniqueId:s1,value:abc"),
            Err(DecodeError::MalformedValue("abc".into()))
        );
    }

    #[test]
    fn field_without_separator_is_skipped() {
        let t = decode(b"garbage,uniqueId:s1,value:2.0").unwrap();
        assert_eq!(t.unique_id, "s1");
    }

    #[test]
    fn empty_value_segment_counts_as_unmatched() {
        assert_eq!(decode(b"uniqueId:,value:2.0"), Err(DecodeError::MissingUniqueId));
        assert_eq!(decode(b"uniqueId:s1,value:"), Err(DecodeError::MissingValue));
    }

    #[test]
    fn empty_payload_fails() {
        assert_eq!(decode(b""), Err(DecodeError::MissingUniqueId));
    }

    #[test]
    fn non_utf8_payload_fails() {
        assert_eq!(decode(&[0xff, 0xfe]), Err(DecodeError::InvalidEncoding));
    }

    #[test]
    fn last_occurrence_wins_on_duplicates() {
        let t = decode(b"uniqueId:a,uniqueId:b,value:1.0").unwrap();
        assert_eq!(t.unique_id, "b");
    }
}
