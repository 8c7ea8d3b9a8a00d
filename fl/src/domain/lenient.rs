//! Lenient field decoding for documents written by older clients
//!
//! Older clients wrote numbers as strings (`"waterlevel": "50"`) and the
//! active-nutrient list as a JSON-encoded string. These helpers coerce such
//! values into real types at the boundary so business logic never sees them.

use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Interpret a JSON value as an integer: numbers (rounded) or numeric strings
fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f.round() as i64))
        }
        _ => None,
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Non-negative integer
pub fn u32_lenient<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let n = as_i64(&value).ok_or_else(|| de::Error::custom(format!("expected integer, got {}", value)))?;
    u32::try_from(n).map_err(|_| de::Error::custom(format!("expected non-negative integer, got {}", n)))
}

/// Optional positive integer; null, blank and zero all mean "none"
pub fn opt_positive_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    if is_blank(&value) {
        return Ok(None);
    }
    let n = as_i64(&value).ok_or_else(|| de::Error::custom(format!("expected integer, got {}", value)))?;
    match n {
        0 => Ok(None),
        n if n < 0 => Err(de::Error::custom(format!("expected positive integer, got {}", n))),
        n => u32::try_from(n)
            .map(Some)
            .map_err(|_| de::Error::custom(format!("integer out of range: {}", n))),
    }
}

/// Percentage level clamped to 0..=100
pub fn level<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    if is_blank(&value) {
        return Ok(0);
    }
    let n = as_i64(&value).ok_or_else(|| de::Error::custom(format!("expected level, got {}", value)))?;
    Ok(n.clamp(0, 100) as u8)
}

/// A list that may arrive either as an array or as a JSON-encoded string of one
pub fn list_or_encoded<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    let value = match value {
        Value::Null => return Ok(Vec::new()),
        Value::String(s) if s.trim().is_empty() => return Ok(Vec::new()),
        Value::String(s) => serde_json::from_str::<Value>(&s).map_err(de::Error::custom)?,
        other => other,
    };
    serde_json::from_value(value).map_err(de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Sample {
        #[serde(default, deserialize_with = "u32_lenient")]
        count: u32,
        #[serde(default, deserialize_with = "opt_positive_u32")]
        every: Option<u32>,
        #[serde(default, deserialize_with = "level")]
        level: u8,
        #[serde(default, deserialize_with = "list_or_encoded")]
        items: Vec<u32>,
    }

    fn decode(value: serde_json::Value) -> Result<Sample, serde_json::Error> {
        serde_json::from_value(value)
    }

    #[test]
    fn test_numbers_pass_through() {
        let p = decode(json!({"count": 5, "every": 3, "level": 40, "items": [1, 2]})).unwrap();
        assert_eq!(p.count, 5);
        assert_eq!(p.every, Some(3));
        assert_eq!(p.level, 40);
        assert_eq!(p.items, vec![1, 2]);
    }

    #[test]
    fn test_strings_are_coerced() {
        let p = decode(json!({"count": "7", "every": " 2 ", "level": "55.6", "items": "[3,4]"})).unwrap();
        assert_eq!(p.count, 7);
        assert_eq!(p.every, Some(2));
        assert_eq!(p.level, 56);
        assert_eq!(p.items, vec![3, 4]);
    }

    #[test]
    fn test_levels_are_clamped() {
        assert_eq!(decode(json!({"level": 140})).unwrap().level, 100);
        assert_eq!(decode(json!({"level": -3})).unwrap().level, 0);
    }

    #[test]
    fn test_blank_and_zero_recurrence_is_none() {
        assert_eq!(decode(json!({"every": null})).unwrap().every, None);
        assert_eq!(decode(json!({"every": ""})).unwrap().every, None);
        assert_eq!(decode(json!({"every": 0})).unwrap().every, None);
        assert!(decode(json!({"every": -1})).is_err());
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(decode(json!({"count": "lots"})).is_err());
        assert!(decode(json!({"count": -2})).is_err());
        assert!(decode(json!({"items": "not json"})).is_err());
    }

    #[test]
    fn test_missing_fields_default() {
        let p = decode(json!({})).unwrap();
        assert_eq!(p.count, 0);
        assert_eq!(p.every, None);
        assert!(p.items.is_empty());
    }
}
