use tracing::info;

use crate::ens::NameResolver;
use crate::error::{NamingError, Result};

/// The two schema documents that make up the relay contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaLocationPair {
    pub request_schema_url: String,
    pub receipt_schema_url: String,
}

/// Schema source settings as supplied by the operator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocationConfig {
    pub request_schema_url: Option<String>,
    pub receipt_schema_url: Option<String>,
    pub ens_name: Option<String>,
    pub rpc_url: Option<String>,
}

/// Which configured source supplies the schema locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaSource {
    Direct(SchemaLocationPair),
    Named { name: String, rpc_url: String },
}

impl LocationConfig {
    /// Pick the source: direct URLs win when both are present.
    pub fn source(&self) -> Result<SchemaSource> {
        let request = present(&self.request_schema_url);
        let receipt = present(&self.receipt_schema_url);
        if let (Some(request), Some(receipt)) = (request, receipt) {
            return Ok(SchemaSource::Direct(SchemaLocationPair {
                request_schema_url: request.to_string(),
                receipt_schema_url: receipt.to_string(),
            }));
        }

        match (present(&self.ens_name), present(&self.rpc_url)) {
            (Some(name), Some(rpc_url)) => Ok(SchemaSource::Named {
                name: name.to_string(),
                rpc_url: rpc_url.to_string(),
            }),
            _ => Err(NamingError::Configuration(
                "set REQ_URL and RCPT_URL, or ENS_NAME and RPC_URL".to_string(),
            )),
        }
    }
}

/// Resolve the schema locations once, at startup.
pub async fn resolve_locations(
    config: &LocationConfig,
    resolver: &NameResolver,
) -> Result<SchemaLocationPair> {
    match config.source()? {
        SchemaSource::Direct(pair) => {
            info!(
                request = %pair.request_schema_url,
                receipt = %pair.receipt_schema_url,
                "using configured schema urls"
            );
            Ok(pair)
        }
        SchemaSource::Named { name, rpc_url } => {
            info!(name = %name, "resolving schema urls from ENS");
            resolver.resolve(&name, &rpc_url).await
        }
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}
