use std::sync::atomic::{AtomicU64, Ordering};

use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::abi::{decode_address, decode_string, encode_resolver_call, encode_text_call, namehash};
use crate::error::{NamingError, Result};
use crate::locate::SchemaLocationPair;

/// ENS registry (same address on mainnet and the public testnets).
pub const ENS_REGISTRY: &str = "0x00000000000C2E074eC69A0bFb2cC3FdB9CC0fFE";

/// Text record holding the request schema URL.
pub const REQUEST_SCHEMA_RECORD: &str = "cl.schema.request";

/// Text record holding the receipt schema URL.
pub const RECEIPT_SCHEMA_RECORD: &str = "cl.schema.receipt";

/// JSON-RPC code used by nodes for reverted calls.
const EXECUTION_REVERTED: i64 = 3;

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<String>,
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

/// Reads the contract's schema locations from ENS text records.
pub struct NameResolver {
    client: reqwest::Client,
    registry: String,
    next_request_id: AtomicU64,
}

impl NameResolver {
    /// Create a resolver against the canonical registry.
    pub fn new(client: reqwest::Client) -> Self {
        Self::with_registry(client, ENS_REGISTRY)
    }

    /// Create a resolver against an explicit registry address.
    pub fn with_registry(client: reqwest::Client, registry: impl Into<String>) -> Self {
        Self {
            client,
            registry: registry.into(),
            next_request_id: AtomicU64::new(1),
        }
    }

    /// Look up both schema records for `name` via `rpc_url`.
    pub async fn resolve(&self, name: &str, rpc_url: &str) -> Result<SchemaLocationPair> {
        let node = namehash(name)?;

        let resolver = self
            .resolver_address(rpc_url, &node)
            .await?
            .ok_or_else(|| NamingError::NoResolver(name.to_string()))?;
        debug!(name, resolver = %resolver, "found resolver");

        let request = self
            .text_record(rpc_url, &resolver, &node, REQUEST_SCHEMA_RECORD)
            .await?;
        let receipt = self
            .text_record(rpc_url, &resolver, &node, RECEIPT_SCHEMA_RECORD)
            .await?;

        match (request, receipt) {
            (Some(request_schema_url), Some(receipt_schema_url)) => {
                info!(name, "resolved schema locations from text records");
                Ok(SchemaLocationPair {
                    request_schema_url,
                    receipt_schema_url,
                })
            }
            (request, receipt) => {
                let mut missing = Vec::new();
                if request.is_none() {
                    missing.push(REQUEST_SCHEMA_RECORD.to_string());
                }
                if receipt.is_none() {
                    missing.push(RECEIPT_SCHEMA_RECORD.to_string());
                }
                Err(NamingError::MissingRecords {
                    name: name.to_string(),
                    missing,
                })
            }
        }
    }

    async fn resolver_address(&self, rpc_url: &str, node: &[u8; 32]) -> Result<Option<String>> {
        let output = self
            .eth_call(rpc_url, &self.registry, &encode_resolver_call(node))
            .await?;
        match output {
            Some(data) if !data.is_empty() => decode_address(&data),
            _ => Ok(None),
        }
    }

    /// Trimmed text record value; blank or unreadable records are `None`.
    async fn text_record(
        &self,
        rpc_url: &str,
        resolver: &str,
        node: &[u8; 32],
        key: &str,
    ) -> Result<Option<String>> {
        let output = self
            .eth_call(rpc_url, resolver, &encode_text_call(node, key))
            .await?;
        let Some(data) = output.filter(|data| !data.is_empty()) else {
            return Ok(None);
        };

        let value = decode_string(&data)?;
        let trimmed = value.trim();
        if trimmed.is_empty() {
            Ok(None)
        } else {
            Ok(Some(trimmed.to_string()))
        }
    }

    /// Run `eth_call`; a reverted call yields `None`.
    async fn eth_call(&self, rpc_url: &str, to: &str, data: &[u8]) -> Result<Option<Vec<u8>>> {
        let id = self.next_request_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": "eth_call",
            "params": [{ "to": to, "data": format!("0x{}", hex::encode(data)) }, "latest"],
        });

        let response = self
            .client
            .post(rpc_url)
            .json(&body)
            .send()
            .await
            .map_err(|source| transport(rpc_url, source))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|source| transport(rpc_url, source))?;

        let parsed: RpcResponse = serde_json::from_str(&text).map_err(|err| {
            NamingError::InvalidResponse(format!("HTTP {status}: {err}"))
        })?;

        if let Some(error) = parsed.error {
            if is_revert(&error) {
                return Ok(None);
            }
            return Err(NamingError::Rpc {
                code: error.code,
                message: error.message,
            });
        }

        let result = parsed
            .result
            .ok_or_else(|| NamingError::InvalidResponse("missing result".to_string()))?;
        let hex_data = result.strip_prefix("0x").unwrap_or(&result);
        hex::decode(hex_data)
            .map(Some)
            .map_err(|err| NamingError::InvalidResponse(format!("result is not hex: {err}")))
    }
}

fn is_revert(error: &RpcErrorObject) -> bool {
    error.code == EXECUTION_REVERTED || error.message.to_ascii_lowercase().contains("revert")
}

fn transport(url: &str, source: reqwest::Error) -> NamingError {
    NamingError::Transport {
        url: url.to_string(),
        source,
    }
}
