use std::collections::BTreeMap;

use chrono::{SecondsFormat, Utc};
use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::executor::{FetchedResponse, Outcome};
use crate::request::RelayRequest;

/// Characters of the relayed body kept in a success receipt.
pub const BODY_PREVIEW_LIMIT: usize = 2000;

/// The envelope returned for every executed relay request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelayReceipt {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x402: Option<Value>,
    pub trace: ReceiptTrace,
    pub result: ReceiptResult,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReceiptTrace {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<Value>,
    pub receipt_id: String,
    pub ts: String,
}

/// Outcome of the relayed call.
///
/// Serialized as `{ok: true, status, headers, body_preview}` or
/// `{ok: false, status: 0, error}`; `ok` follows from the variant.
#[derive(Debug, Clone, PartialEq)]
pub enum ReceiptResult {
    Success {
        status: u16,
        headers: BTreeMap<String, String>,
        body_preview: String,
    },
    Failure {
        error: String,
    },
}

impl ReceiptResult {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Upstream status; `0` when no response was received.
    pub fn status(&self) -> u16 {
        match self {
            Self::Success { status, .. } => *status,
            Self::Failure { .. } => 0,
        }
    }
}

#[derive(Serialize)]
#[serde(untagged)]
enum WireResult<'a> {
    Success {
        ok: bool,
        status: u16,
        headers: &'a BTreeMap<String, String>,
        body_preview: &'a str,
    },
    Failure {
        ok: bool,
        status: u16,
        error: &'a str,
    },
}

impl Serialize for ReceiptResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let wire = match self {
            Self::Success {
                status,
                headers,
                body_preview,
            } => WireResult::Success {
                ok: true,
                status: *status,
                headers,
                body_preview,
            },
            Self::Failure { error } => WireResult::Failure {
                ok: false,
                status: 0,
                error,
            },
        };
        wire.serialize(serializer)
    }
}

impl RelayReceipt {
    pub fn to_value(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }
}

pub fn build_receipt(request: &RelayRequest, outcome: Outcome) -> RelayReceipt {
    let result = match outcome {
        Outcome::Response(FetchedResponse {
            status,
            headers,
            body,
        }) => ReceiptResult::Success {
            status,
            headers: flatten_headers(headers),
            body_preview: body_preview(&body).to_string(),
        },
        Outcome::Failure { message } => ReceiptResult::Failure { error: message },
    };

    RelayReceipt {
        x402: request.x402.clone(),
        trace: ReceiptTrace {
            request_id: request.request_id.clone(),
            receipt_id: new_receipt_id(),
            ts: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        },
        result,
    }
}

fn new_receipt_id() -> String {
    format!("rcpt_{}", uuid::Uuid::new_v4())
}

/// The first [`BODY_PREVIEW_LIMIT`] characters of `body`.
pub fn body_preview(body: &str) -> &str {
    match body.char_indices().nth(BODY_PREVIEW_LIMIT) {
        Some((cut, _)) => &body[..cut],
        None => body,
    }
}

fn flatten_headers(pairs: Vec<(String, String)>) -> BTreeMap<String, String> {
    let mut headers: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in pairs {
        headers
            .entry(name.to_ascii_lowercase())
            .and_modify(|joined| {
                joined.push_str(", ");
                joined.push_str(&value);
            })
            .or_insert(value);
    }
    headers
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;
    use serde_json::json;

    use super::*;

    fn request() -> RelayRequest {
        RelayRequest::from_value(&json!({
            "x402": { "tok": "a" },
            "trace": { "request_id": "r1" },
            "payload": { "url": "https://api.example.com/" }
        }))
    }

    fn response(body: &str) -> Outcome {
        Outcome::Response(FetchedResponse {
            status: 200,
            headers: vec![
                ("Content-Type".to_string(), "text/plain".to_string()),
                ("set-cookie".to_string(), "a=1".to_string()),
                ("Set-Cookie".to_string(), "b=2".to_string()),
            ],
            body: body.to_string(),
        })
    }

    #[test]
    fn success_receipt_shape() {
        let receipt = build_receipt(&request(), response("hello"));
        let value = receipt.to_value().unwrap();

        assert_eq!(value["x402"], json!({ "tok": "a" }));
        assert_eq!(value["trace"]["request_id"], json!("r1"));
        assert_eq!(
            value["result"],
            json!({
                "ok": true,
                "status": 200,
                "headers": { "content-type": "text/plain", "set-cookie": "a=1, b=2" },
                "body_preview": "hello"
            })
        );
    }

    #[test]
    fn failure_receipt_shape() {
        let receipt = build_receipt(
            &request(),
            Outcome::Failure {
                message: "request aborted: timed out after 5ms".to_string(),
            },
        );

        assert!(!receipt.result.is_ok());
        assert_eq!(receipt.result.status(), 0);
        assert_eq!(
            receipt.to_value().unwrap()["result"],
            json!({ "ok": false, "status": 0, "error": "request aborted: timed out after 5ms" })
        );
    }

    #[test]
    fn absent_passthrough_fields_are_omitted() {
        let request = RelayRequest::from_value(&json!({ "payload": { "url": "https://a.example" } }));
        let value = build_receipt(&request, response("")).to_value().unwrap();

        assert!(value.get("x402").is_none());
        assert!(value["trace"].get("request_id").is_none());
        assert!(value["trace"]["receipt_id"].is_string());
    }

    #[test]
    fn receipt_ids_are_fresh_uuids() {
        let first = build_receipt(&request(), response("")).trace.receipt_id;
        let second = build_receipt(&request(), response("")).trace.receipt_id;

        assert_ne!(first, second);
        let uuid = first.strip_prefix("rcpt_").expect("prefix");
        let parsed = uuid::Uuid::parse_str(uuid).expect("uuid");
        assert_eq!(parsed.get_version_num(), 4);
    }

    #[test]
    fn timestamp_is_utc_millis() {
        let ts = build_receipt(&request(), response("")).trace.ts;

        assert!(ts.ends_with('Z'), "{ts}");
        let (_, fraction) = ts.rsplit_once('.').expect("fraction");
        assert_eq!(fraction.len(), 4, "{ts}");
        DateTime::parse_from_rfc3339(&ts).expect("rfc3339");
    }

    #[test]
    fn preview_truncates_to_limit() {
        let body = "x".repeat(BODY_PREVIEW_LIMIT + 1);
        let receipt = build_receipt(&request(), response(&body));

        let ReceiptResult::Success { body_preview, .. } = receipt.result else {
            panic!("expected success");
        };
        assert_eq!(body_preview, "x".repeat(BODY_PREVIEW_LIMIT));
    }

    #[test]
    fn preview_counts_characters_not_bytes() {
        let body = "é".repeat(BODY_PREVIEW_LIMIT + 10);
        let preview = body_preview(&body);

        assert_eq!(preview.chars().count(), BODY_PREVIEW_LIMIT);
        assert_eq!(preview.len(), BODY_PREVIEW_LIMIT * 2);
        assert_eq!(body_preview("short"), "short");
    }

    #[test]
    fn ok_flag_follows_variant() {
        let success = ReceiptResult::Success {
            status: 500,
            headers: BTreeMap::new(),
            body_preview: String::new(),
        };
        let failure = ReceiptResult::Failure {
            error: "boom".to_string(),
        };

        assert!(success.is_ok());
        assert_eq!(serde_json::to_value(&success).unwrap()["ok"], true);
        assert!(!failure.is_ok());
        assert_eq!(
            serde_json::to_value(&failure).unwrap(),
            json!({ "ok": false, "status": 0, "error": "boom" })
        );
    }
}
