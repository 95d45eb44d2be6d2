//! Lenient deserializers for server fields.
//!
//! The backend stores job progress in a string hash, so counters routinely
//! arrive as `"42"` instead of `42`. These helpers coerce once, at the
//! boundary, so the rest of the crate only ever sees typed values.

use std::fmt;

use serde::de::{self, Deserializer, Unexpected, Visitor};

/// Deserializes a non-negative counter from a number or numeric string.
///
/// `null` and blank strings become `0`, negative values are clamped to `0`,
/// fractional values are truncated. Non-numeric text is rejected.
pub fn lenient_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_any(CountVisitor)
}

/// Deserializes a display percentage, normalized into `0.0..=100.0`.
///
/// Unlike counters, an unreadable percent is not worth failing a whole
/// snapshot over: it becomes `0.0`.
pub fn lenient_percent<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = deserializer.deserialize_any(PercentVisitor)?;
    let percent = clamp_percent(raw);
    if percent != raw && !raw.is_nan() {
        log::debug!("Clamped out-of-range percent {} to {}", raw, percent);
    }
    Ok(percent)
}

/// Deserializes a string field that may be `null` or a bare number.
pub fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_any(TextVisitor)
}

pub(crate) fn clamp_percent(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}

struct CountVisitor;

impl<'de> Visitor<'de> for CountVisitor {
    type Value = u64;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a non-negative count as a number or numeric string")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<u64, E> {
        Ok(v)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<u64, E> {
        Ok(v.max(0) as u64)
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<u64, E> {
        if v.is_finite() {
            Ok(v.max(0.0) as u64)
        } else {
            Err(E::invalid_value(Unexpected::Float(v), &self))
        }
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<u64, E> {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            return Ok(0);
        }
        if let Ok(n) = trimmed.parse::<u64>() {
            return Ok(n);
        }
        match trimmed.parse::<f64>() {
            Ok(f) if f.is_finite() => Ok(f.max(0.0) as u64),
            _ => Err(E::invalid_value(Unexpected::Str(v), &self)),
        }
    }

    fn visit_unit<E: de::Error>(self) -> Result<u64, E> {
        Ok(0)
    }

    fn visit_none<E: de::Error>(self) -> Result<u64, E> {
        Ok(0)
    }
}

struct PercentVisitor;

impl<'de> Visitor<'de> for PercentVisitor {
    type Value = f64;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a percentage as a number or numeric string")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<f64, E> {
        Ok(v as f64)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<f64, E> {
        Ok(v as f64)
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<f64, E> {
        Ok(v)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<f64, E> {
        let trimmed = v.trim().trim_end_matches('%').trim();
        match trimmed.parse::<f64>() {
            Ok(f) => Ok(f),
            Err(_) => {
                if !trimmed.is_empty() {
                    log::debug!("Ignoring unreadable percent value '{}'", v);
                }
                Ok(0.0)
            }
        }
    }

    fn visit_unit<E: de::Error>(self) -> Result<f64, E> {
        Ok(0.0)
    }

    fn visit_none<E: de::Error>(self) -> Result<f64, E> {
        Ok(0.0)
    }
}

struct TextVisitor;

impl<'de> Visitor<'de> for TextVisitor {
    type Value = String;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a string, number or null")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<String, E> {
        Ok(v.to_string())
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<String, E> {
        Ok(v)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<String, E> {
        Ok(v.to_string())
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<String, E> {
        Ok(v.to_string())
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<String, E> {
        Ok(v.to_string())
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<String, E> {
        Ok(v.to_string())
    }

    fn visit_unit<E: de::Error>(self) -> Result<String, E> {
        Ok(String::new())
    }

    fn visit_none<E: de::Error>(self) -> Result<String, E> {
        Ok(String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Probe {
        #[serde(default, deserialize_with = "lenient_u64")]
        count: u64,
        #[serde(default, deserialize_with = "lenient_percent")]
        percent: f64,
        #[serde(default, deserialize_with = "lenient_string")]
        text: String,
    }

    fn probe(json: &str) -> Result<Probe, serde_json::Error> {
        serde_json::from_str(json)
    }

    #[test]
    fn test_count_accepts_numeric_strings() {
        assert_eq!(probe(r#"{"count": "500000"}"#).unwrap().count, 500_000);
        assert_eq!(probe(r#"{"count": " 42 "}"#).unwrap().count, 42);
        assert_eq!(probe(r#"{"count": "12.9"}"#).unwrap().count, 12);
    }

    #[test]
    fn test_count_normalizes_empty_and_negative() {
        assert_eq!(probe(r#"{"count": ""}"#).unwrap().count, 0);
        assert_eq!(probe(r#"{"count": null}"#).unwrap().count, 0);
        assert_eq!(probe(r#"{"count": -3}"#).unwrap().count, 0);
        assert_eq!(probe(r#"{}"#).unwrap().count, 0);
    }

    #[test]
    fn test_count_rejects_text() {
        assert!(probe(r#"{"count": "lots"}"#).is_err());
    }

    #[test]
    fn test_percent_is_clamped() {
        assert_eq!(probe(r#"{"percent": 150}"#).unwrap().percent, 100.0);
        assert_eq!(probe(r#"{"percent": "-1"}"#).unwrap().percent, 0.0);
        assert_eq!(probe(r#"{"percent": "37.5%"}"#).unwrap().percent, 37.5);
        assert_eq!(probe(r#"{"percent": "n/a"}"#).unwrap().percent, 0.0);
    }

    #[test]
    fn test_text_accepts_null_and_numbers() {
        assert_eq!(probe(r#"{"text": null}"#).unwrap().text, "");
        assert_eq!(probe(r#"{"text": 1712345678}"#).unwrap().text, "1712345678");
    }
}
