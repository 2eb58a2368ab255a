// Validation of the `/fetch_data` payload
use crate::model::{OhlcvFrame, ParseError, RawResponse};
use crate::utils::parse_timestamp;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use tracing::{debug, error};

const PRICE_KEYS: [&str; 4] = ["open", "high", "low", "close"];

pub trait Parser {
    fn parse(&self, raw: &RawResponse) -> Result<OhlcvFrame, ParseError>;
}

pub struct ResponseParser;

impl ResponseParser {
    pub fn new() -> Self {
        Self
    }
}

impl Parser for ResponseParser {
    /// Short-circuits on a server error string, then requires all of
    /// open/high/low/close before looking at anything else.
    fn parse(&self, raw: &RawResponse) -> Result<OhlcvFrame, ParseError> {
        if let Some(msg) = server_error(raw) {
            return Err(ParseError::ServerError(msg));
        }

        debug!("Response keys: {:?}", raw.keys().collect::<Vec<_>>());

        let missing: Vec<&str> = PRICE_KEYS
            .iter()
            .copied()
            .filter(|k| !raw.contains(k))
            .collect();
        if !missing.is_empty() {
            error!("OHLC data missing: {}", missing.join(", "));
            return Err(ParseError::MalformedResponse(format!(
                "missing {}",
                missing.join(", ")
            )));
        }

        let time = raw
            .get("time")
            .ok_or_else(|| malformed("missing time"))
            .and_then(|v| time_array(v).ok_or_else(|| malformed("time is not a timestamp array")))?;
        let column = |key: &str| -> Result<Vec<f64>, ParseError> {
            let v = raw
                .get(key)
                .ok_or_else(|| malformed(&format!("missing {}", key)))?;
            numeric_array(v).ok_or_else(|| malformed(&format!("{} is not a numeric array", key)))
        };

        let frame = OhlcvFrame {
            open: column("open")?,
            high: column("high")?,
            low: column("low")?,
            close: column("close")?,
            volume: column("volume")?,
            time,
        };

        let n = frame.time.len();
        for (name, len) in [
            ("open", frame.open.len()),
            ("high", frame.high.len()),
            ("low", frame.low.len()),
            ("close", frame.close.len()),
            ("volume", frame.volume.len()),
        ] {
            if len != n {
                return Err(malformed(&format!(
                    "{} has {} values but time has {}",
                    name, len, n
                )));
            }
        }

        Ok(frame)
    }
}

fn malformed(detail: &str) -> ParseError {
    ParseError::MalformedResponse(detail.to_string())
}

/// A non-empty `error` entry. `false`, `""` and `null` do not count.
fn server_error(raw: &RawResponse) -> Option<String> {
    match raw.get("error")? {
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(false) => None,
        other => Some(other.to_string()),
    }
}

/// Numbers as-is, `null` as a NaN gap.
pub fn numeric_array(value: &Value) -> Option<Vec<f64>> {
    value
        .as_array()?
        .iter()
        .map(|v| match v {
            Value::Null => Some(f64::NAN),
            other => other.as_f64(),
        })
        .collect()
}

/// Timestamp strings, or epoch milliseconds.
pub fn time_array(value: &Value) -> Option<Vec<DateTime<Utc>>> {
    value
        .as_array()?
        .iter()
        .map(|v| match v {
            Value::String(s) => parse_timestamp(s),
            Value::Number(n) => n.as_i64().and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn full() -> serde_json::Map<String, Value> {
        let v = json!({
            "time": ["2024-01-01 00:00:00", "2024-01-01 01:00:00"],
            "open": [1.10, 1.11],
            "high": [1.12, 1.13],
            "low": [1.09, 1.10],
            "close": [1.11, 1.12],
            "volume": [100, 150]
        });
        match v {
            Value::Object(m) => m,
            _ => unreachable!(),
        }
    }

    #[test]
    fn parses_complete_payload() {
        let frame = ResponseParser::new().parse(&RawResponse(full())).unwrap();
        assert_eq!(frame.len(), 2);
        assert_eq!(frame.volume, vec![100.0, 150.0]);
        assert_eq!(frame.close_series().points[1].1, 1.12);
    }

    #[test]
    fn any_missing_price_column_is_malformed() {
        for key in PRICE_KEYS {
            let mut m = full();
            m.remove(key);
            m.insert("sma".into(), json!([1.0, 1.0]));
            m.insert("kalman_denoised_close".into(), json!([1.0, 1.0]));
            m.insert("kalman_denoised_time".into(), json!(["2024-01-01 00:00:00", "2024-01-01 01:00:00"]));
            let err = ResponseParser::new().parse(&RawResponse(m)).unwrap_err();
            assert!(
                matches!(err, ParseError::MalformedResponse(ref d) if d.contains(key)),
                "{key}: {err:?}"
            );
        }
    }

    #[test]
    fn null_price_column_counts_as_missing() {
        let mut m = full();
        m.insert("high".into(), Value::Null);
        assert!(matches!(
            ResponseParser::new().parse(&RawResponse(m)),
            Err(ParseError::MalformedResponse(_))
        ));
    }

    #[test]
    fn server_error_short_circuits_validation() {
        let raw = RawResponse::from(json!({"error": "instrument not found"}));
        assert_eq!(
            ResponseParser::new().parse(&raw).unwrap_err(),
            ParseError::ServerError("instrument not found".into())
        );
    }

    #[test]
    fn empty_error_string_is_ignored() {
        let mut m = full();
        m.insert("error".into(), json!(""));
        assert!(ResponseParser::new().parse(&RawResponse(m)).is_ok());
    }

    #[test]
    fn mismatched_lengths_are_malformed() {
        let mut m = full();
        m.insert("volume".into(), json!([1]));
        assert!(matches!(
            ResponseParser::new().parse(&RawResponse(m)),
            Err(ParseError::MalformedResponse(_))
        ));
    }

    #[test]
    fn nulls_become_gaps() {
        let v = numeric_array(&json!([1.0, null, 3])).unwrap();
        assert_eq!(v[0], 1.0);
        assert!(v[1].is_nan());
        assert_eq!(v[2], 3.0);
        assert!(numeric_array(&json!(["a"])).is_none());
    }

    #[test]
    fn epoch_millis_are_accepted_as_time() {
        let t = time_array(&json!([0, "1970-01-01 00:00:01"])).unwrap();
        assert_eq!(t[1].timestamp(), 1);
        assert_eq!(t[0].timestamp(), 0);
    }
}
