use clrelay_schema::ValidationIssue;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use crate::executor::FetchExecutor;
use crate::guard::is_blocked;
use crate::receipt::build_receipt;
use crate::request::RelayRequest;
use crate::state::{ContractValidators, RelayState};

/// Where a request is in the relay pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    RequestValidated,
    UrlGuarded,
    Executed,
    ReceiptBuilt,
    ReceiptValidated,
    Responded,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::RequestValidated => "request_validated",
            Self::UrlGuarded => "url_guarded",
            Self::Executed => "executed",
            Self::ReceiptBuilt => "receipt_built",
            Self::ReceiptValidated => "receipt_validated",
            Self::Responded => "responded",
        }
    }
}

/// A request the relay refused to complete.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Rejection {
    #[error("schemas not loaded")]
    NotReady,

    #[error("invalid json")]
    InvalidJson { message: String },

    #[error("request schema validation failed")]
    RequestInvalid(Vec<ValidationIssue>),

    #[error("blocked or missing url")]
    BlockedUrl { url: Option<String> },

    #[error("receipt schema validation failed")]
    ReceiptInvalid(Vec<ValidationIssue>),
}

impl Rejection {
    pub fn status(&self) -> u16 {
        match self {
            Self::NotReady => 503,
            Self::InvalidJson { .. } | Self::RequestInvalid(_) | Self::BlockedUrl { .. } => 400,
            Self::ReceiptInvalid(_) => 500,
        }
    }

    pub fn body(&self) -> Value {
        let error = self.to_string();
        match self {
            Self::NotReady => json!({ "error": error }),
            Self::InvalidJson { message } => {
                json!({ "error": error, "details": { "message": message } })
            }
            Self::RequestInvalid(issues) | Self::ReceiptInvalid(issues) => {
                json!({ "error": error, "details": issues })
            }
            Self::BlockedUrl { url } => json!({ "error": error, "details": { "url": url } }),
        }
    }
}

/// Status and JSON body to send back to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct RelayReply {
    pub status: u16,
    pub body: Value,
}

impl From<Rejection> for RelayReply {
    fn from(rejection: Rejection) -> Self {
        Self {
            status: rejection.status(),
            body: rejection.body(),
        }
    }
}

/// Run one relay request from raw body bytes to reply.
pub async fn handle(state: &RelayState, body: &[u8]) -> RelayReply {
    debug!(stage = Stage::Received.as_str(), bytes = body.len());

    let Some(contracts) = state.contracts() else {
        warn!("relay request before schemas loaded");
        return Rejection::NotReady.into();
    };

    let envelope: Value = match serde_json::from_slice(body) {
        Ok(envelope) => envelope,
        Err(err) => {
            warn!(error = %err, "relay request body is not json");
            return Rejection::InvalidJson {
                message: err.to_string(),
            }
            .into();
        }
    };
    let request_id = envelope
        .get("trace")
        .and_then(|trace| trace.get("request_id"))
        .and_then(Value::as_str)
        .unwrap_or("-")
        .to_string();

    let reply = match relay(contracts, state.executor(), &envelope, &request_id).await {
        Ok(receipt) => RelayReply {
            status: 200,
            body: receipt,
        },
        Err(rejection) => {
            match &rejection {
                Rejection::ReceiptInvalid(issues) => {
                    error!(request_id = %request_id, issues = issues.len(), "receipt failed its schema");
                }
                other => warn!(request_id = %request_id, reason = %other, "relay request rejected"),
            }
            rejection.into()
        }
    };

    debug!(stage = Stage::Responded.as_str(), request_id = %request_id);
    info!(request_id = %request_id, status = reply.status, "relay request completed");
    reply
}

async fn relay(
    contracts: &ContractValidators,
    executor: &FetchExecutor,
    envelope: &Value,
    request_id: &str,
) -> Result<Value, Rejection> {
    let verdict = contracts.request.validate(envelope);
    if !verdict.valid {
        return Err(Rejection::RequestInvalid(verdict.errors));
    }
    debug!(stage = Stage::RequestValidated.as_str(), request_id);

    let request = RelayRequest::from_value(envelope);
    let url = match request.url.as_deref() {
        Some(url) if !is_blocked(url) => url,
        _ => {
            return Err(Rejection::BlockedUrl {
                url: request.url.clone(),
            })
        }
    };
    debug!(stage = Stage::UrlGuarded.as_str(), request_id, url);

    let outcome = executor
        .execute(url, &request.method, &request.headers, request.timeout_ms)
        .await;
    debug!(stage = Stage::Executed.as_str(), request_id);

    let receipt = build_receipt(&request, outcome)
        .to_value()
        .map_err(|err| {
            Rejection::ReceiptInvalid(vec![ValidationIssue {
                message: format!("receipt could not be serialized: {err}"),
                instance_path: String::new(),
                schema_path: String::new(),
            }])
        })?;
    debug!(stage = Stage::ReceiptBuilt.as_str(), request_id);

    let verdict = contracts.receipt.validate(&receipt);
    if !verdict.valid {
        return Err(Rejection::ReceiptInvalid(verdict.errors));
    }
    debug!(stage = Stage::ReceiptValidated.as_str(), request_id);

    Ok(receipt)
}
