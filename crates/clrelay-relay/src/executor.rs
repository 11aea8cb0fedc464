use std::error::Error as _;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method};
use tracing::debug;

use crate::error::{RelayError, Result};

/// A response that was fully received within the deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedResponse {
    pub status: u16,
    /// Header pairs in wire order; repeated names appear more than once.
    pub headers: Vec<(String, String)>,
    pub body: String,
}

/// What happened to one outbound call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Response(FetchedResponse),
    Failure { message: String },
}

impl Outcome {
    fn failure(message: impl Into<String>) -> Self {
        Self::Failure {
            message: message.into(),
        }
    }
}

/// Runs relayed calls under a per-call deadline.
#[derive(Debug, Clone)]
pub struct FetchExecutor {
    client: Client,
}

impl FetchExecutor {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("clrelay/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(RelayError::Client)?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Send the request and read the whole body before `timeout_ms` elapses.
    ///
    /// Never fails: every problem, including the deadline firing, becomes
    /// [`Outcome::Failure`]. When the deadline fires the in-flight future is
    /// dropped, which closes the connection.
    pub async fn execute(
        &self,
        url: &str,
        method: &str,
        headers: &[(String, String)],
        timeout_ms: u64,
    ) -> Outcome {
        let method = match Method::from_bytes(method.as_bytes()) {
            Ok(method) => method,
            Err(_) => return Outcome::failure(format!("invalid HTTP method: {method:?}")),
        };
        let headers = match header_map(headers) {
            Ok(headers) => headers,
            Err(message) => return Outcome::failure(message),
        };

        debug!(%method, url, timeout_ms, "relaying request");
        let call = async {
            let response = self
                .client
                .request(method, url)
                .headers(headers)
                .send()
                .await?;
            let status = response.status().as_u16();
            let headers = response
                .headers()
                .iter()
                .map(|(name, value)| {
                    (
                        name.as_str().to_string(),
                        String::from_utf8_lossy(value.as_bytes()).into_owned(),
                    )
                })
                .collect();
            let body = response.bytes().await?;
            Ok::<_, reqwest::Error>(FetchedResponse {
                status,
                headers,
                body: String::from_utf8_lossy(&body).into_owned(),
            })
        };

        match tokio::time::timeout(Duration::from_millis(timeout_ms), call).await {
            Ok(Ok(response)) => {
                debug!(url, status = response.status, "relayed request completed");
                Outcome::Response(response)
            }
            Ok(Err(err)) => {
                debug!(url, error = %err, "relayed request failed");
                Outcome::failure(error_chain(&err))
            }
            Err(_) => {
                debug!(url, timeout_ms, "relayed request timed out");
                Outcome::failure(format!("request aborted: timed out after {timeout_ms}ms"))
            }
        }
    }
}

fn header_map(pairs: &[(String, String)]) -> std::result::Result<HeaderMap, String> {
    let mut headers = HeaderMap::with_capacity(pairs.len());
    for (name, value) in pairs {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| format!("invalid header name: {name:?}"))?;
        let header_value = HeaderValue::from_str(value)
            .map_err(|_| format!("invalid value for header {name:?}"))?;
        headers.append(header_name, header_value);
    }
    Ok(headers)
}

/// `reqwest` keeps the useful part (refused, DNS, TLS) in the source chain.
fn error_chain(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        if !message.contains(&cause_text) {
            message.push_str(": ");
            message.push_str(&cause_text);
        }
        source = cause.source();
    }
    message
}
