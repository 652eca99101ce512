//! Step 5: domain-specific coercions applied after schema validation.

use chrono::{NaiveDate, NaiveTime};
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

fn hhmm_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([01]\d|2[0-3]):([0-5]\d)$").unwrap())
}

fn url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^https?://\S+$").unwrap())
}

/// Combine a day's ISO-8601 date with an `"HH:mm"` string into epoch
/// milliseconds at UTC. Returns `None` if either fails to parse.
#[must_use]
pub fn hhmm_to_epoch_ms(day_date: &str, hhmm: &str) -> Option<i64> {
    if !hhmm_regex().is_match(hhmm) {
        return None;
    }
    let date = NaiveDate::parse_from_str(day_date, "%Y-%m-%d").ok()?;
    let time = NaiveTime::parse_from_str(hhmm, "%H:%M").ok()?;
    Some(date.and_time(time).and_utc().timestamp_millis())
}

/// A plain URL string submitted for a booking link is coerced into the
/// structured shape the rest of the system expects.
#[must_use]
pub fn coerce_booking_url(value: &Value) -> Option<Value> {
    if let Value::String(s) = value {
        if url_regex().is_match(s) {
            return Some(serde_json::json!({ "status": "NOT_REQUIRED", "details": s }));
        }
    }
    None
}

/// A numeric-string duration (`"45"`) coerced to an integer.
#[must_use]
pub fn coerce_numeric_duration(value: &Value) -> Option<Value> {
    if let Value::String(s) = value {
        if let Ok(n) = s.trim().parse::<i64>() {
            return Some(Value::from(n));
        }
    }
    None
}

/// Walk a JSON value recursively, applying the known coercions by key
/// name. `day_date`, when present, is used for `startTime`/`endTime`
/// `"HH:mm"` conversion.
pub fn apply_coercions(value: &mut Value, day_date: Option<&str>) {
    match value {
        Value::Object(map) => {
            for (key, v) in map.iter_mut() {
                match key.as_str() {
                    "startTime" | "endTime" => {
                        if let (Some(date), Value::String(s)) = (day_date, &*v) {
                            if let Some(ms) = hhmm_to_epoch_ms(date, s) {
                                *v = Value::from(ms);
                                continue;
                            }
                        }
                    }
                    "booking" => {
                        if let Some(coerced) = coerce_booking_url(v) {
                            *v = coerced;
                            continue;
                        }
                    }
                    "durationMin" | "duration" => {
                        if let Some(coerced) = coerce_numeric_duration(v) {
                            *v = coerced;
                            continue;
                        }
                    }
                    _ => {}
                }
                apply_coercions(v, day_date);
            }
        }
        Value::Array(items) => {
            for item in items {
                apply_coercions(item, day_date);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hhmm_converts_to_epoch_ms() {
        let ms = hhmm_to_epoch_ms("2025-10-05", "14:00").unwrap();
        assert_eq!(ms, 1_759_672_800_000);
    }

    #[test]
    fn hhmm_rejects_malformed_time() {
        assert!(hhmm_to_epoch_ms("2025-10-05", "25:61").is_none());
    }

    #[test]
    fn booking_url_wraps_into_structured_shape() {
        let v = Value::String("https://example.com/book/1".to_string());
        let coerced = coerce_booking_url(&v).unwrap();
        assert_eq!(coerced["status"], "NOT_REQUIRED");
        assert_eq!(coerced["details"], "https://example.com/book/1");
    }

    #[test]
    fn numeric_string_duration_becomes_int() {
        let v = Value::String("45".to_string());
        assert_eq!(coerce_numeric_duration(&v).unwrap(), Value::from(45));
    }

    #[test]
    fn apply_coercions_rewrites_nested_times() {
        let mut doc = serde_json::json!({
            "ops": [{"op": "move", "id": "day2_node1", "startTime": "14:00"}]
        });
        apply_coercions(&mut doc, Some("2025-10-05"));
        assert_eq!(doc["ops"][0]["startTime"], 1_759_672_800_000_i64);
    }
}
