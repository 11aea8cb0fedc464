use serde_json::Value;

pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;
pub const MIN_TIMEOUT_MS: u64 = 1;
pub const MAX_TIMEOUT_MS: u64 = 30_000;

pub const DEFAULT_METHOD: &str = "GET";

/// The parts of a caller envelope the relay acts on.
///
/// Built from a body that already passed the request schema, so every field
/// is read leniently: anything the schema allowed but the relay cannot use
/// falls back to its default.
#[derive(Debug, Clone, PartialEq)]
pub struct RelayRequest {
    /// Passed through to the receipt untouched.
    pub x402: Option<Value>,
    /// Passed through to the receipt untouched.
    pub request_id: Option<Value>,
    pub url: Option<String>,
    pub method: String,
    pub headers: Vec<(String, String)>,
    pub timeout_ms: u64,
}

impl RelayRequest {
    pub fn from_value(body: &Value) -> Self {
        let payload = body.get("payload");
        let field = |name: &str| payload.and_then(|payload| payload.get(name));

        Self {
            x402: body.get("x402").cloned(),
            request_id: body
                .get("trace")
                .and_then(|trace| trace.get("request_id"))
                .cloned(),
            url: field("url").and_then(Value::as_str).map(str::to_string),
            method: field("method")
                .and_then(Value::as_str)
                .map(str::to_ascii_uppercase)
                .unwrap_or_else(|| DEFAULT_METHOD.to_string()),
            headers: field("headers").map(header_pairs).unwrap_or_default(),
            timeout_ms: effective_timeout_ms(field("timeout_ms")),
        }
    }

    /// `trace.request_id` when it is a string, for logging.
    pub fn request_id_str(&self) -> Option<&str> {
        self.request_id.as_ref().and_then(Value::as_str)
    }
}

/// Clamp a caller-supplied timeout into `[MIN_TIMEOUT_MS, MAX_TIMEOUT_MS]`.
///
/// Missing or non-numeric values mean [`DEFAULT_TIMEOUT_MS`]; fractions are
/// truncated.
pub fn effective_timeout_ms(raw: Option<&Value>) -> u64 {
    let requested = match raw {
        Some(Value::Number(number)) => number.as_f64(),
        Some(Value::String(text)) => text.trim().parse::<f64>().ok(),
        _ => None,
    };

    match requested {
        Some(ms) if !ms.is_nan() => {
            let ms = ms.trunc();
            if ms <= MIN_TIMEOUT_MS as f64 {
                MIN_TIMEOUT_MS
            } else if ms >= MAX_TIMEOUT_MS as f64 {
                MAX_TIMEOUT_MS
            } else {
                ms as u64
            }
        }
        _ => DEFAULT_TIMEOUT_MS,
    }
}

fn header_pairs(headers: &Value) -> Vec<(String, String)> {
    let Value::Object(map) = headers else {
        return Vec::new();
    };

    map.iter()
        .filter_map(|(name, value)| {
            let value = match value {
                Value::String(text) => text.clone(),
                Value::Number(number) => number.to_string(),
                Value::Bool(flag) => flag.to_string(),
                _ => return None,
            };
            Some((name.clone(), value))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn reads_full_envelope() {
        let request = RelayRequest::from_value(&json!({
            "x402": { "tok": "a" },
            "trace": { "request_id": "r1" },
            "payload": {
                "url": "https://api.example.com/data",
                "method": "post",
                "headers": { "Accept": "application/json", "X-Retry": 2, "X-Flag": true, "X-Null": null },
                "timeout_ms": 2500
            }
        }));

        assert_eq!(request.x402, Some(json!({ "tok": "a" })));
        assert_eq!(request.request_id, Some(json!("r1")));
        assert_eq!(request.request_id_str(), Some("r1"));
        assert_eq!(request.url.as_deref(), Some("https://api.example.com/data"));
        assert_eq!(request.method, "POST");
        assert_eq!(
            request.headers,
            vec![
                ("Accept".to_string(), "application/json".to_string()),
                ("X-Flag".to_string(), "true".to_string()),
                ("X-Retry".to_string(), "2".to_string()),
            ]
        );
        assert_eq!(request.timeout_ms, 2500);
    }

    #[test]
    fn defaults_apply_to_sparse_payload() {
        let request = RelayRequest::from_value(&json!({
            "payload": { "url": "https://example.com" }
        }));

        assert_eq!(request.x402, None);
        assert_eq!(request.request_id, None);
        assert_eq!(request.method, "GET");
        assert!(request.headers.is_empty());
        assert_eq!(request.timeout_ms, DEFAULT_TIMEOUT_MS);
    }

    #[test]
    fn missing_or_non_string_url_is_none() {
        assert_eq!(RelayRequest::from_value(&json!({})).url, None);
        assert_eq!(
            RelayRequest::from_value(&json!({ "payload": { "url": 42 } })).url,
            None
        );
    }

    #[test]
    fn null_request_id_is_kept() {
        let request = RelayRequest::from_value(&json!({ "trace": { "request_id": null } }));
        assert_eq!(request.request_id, Some(Value::Null));
        assert_eq!(request.request_id_str(), None);
    }

    #[test]
    fn timeout_is_clamped() {
        assert_eq!(effective_timeout_ms(Some(&json!(0))), 1);
        assert_eq!(effective_timeout_ms(Some(&json!(-250))), 1);
        assert_eq!(effective_timeout_ms(Some(&json!(999_999))), 30_000);
        assert_eq!(effective_timeout_ms(Some(&json!(30_000))), 30_000);
        assert_eq!(effective_timeout_ms(Some(&json!(1))), 1);
        assert_eq!(effective_timeout_ms(Some(&json!(1500.9))), 1500);
        assert_eq!(effective_timeout_ms(None), 10_000);
    }

    #[test]
    fn non_numeric_timeout_uses_default() {
        assert_eq!(effective_timeout_ms(Some(&Value::Null)), 10_000);
        assert_eq!(effective_timeout_ms(Some(&json!("soon"))), 10_000);
        assert_eq!(effective_timeout_ms(Some(&json!({ "ms": 5 }))), 10_000);
        assert_eq!(effective_timeout_ms(Some(&json!(" 750 "))), 750);
    }
}
