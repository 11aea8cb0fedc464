/// Errors that can occur while locating the contract schemas.
#[derive(Debug, thiserror::Error)]
pub enum NamingError {
    /// Neither direct URLs nor a name + RPC endpoint were configured.
    #[error("schema locations not configured: {0}")]
    Configuration(String),

    /// The name cannot be hashed.
    #[error("invalid name {name:?}: {reason}")]
    InvalidName { name: String, reason: String },

    /// The registry has no resolver for the name.
    #[error("no resolver set for {0}")]
    NoResolver(String),

    /// Required text records are absent or blank.
    #[error("text records missing for {name}: {}", missing.join(", "))]
    MissingRecords { name: String, missing: Vec<String> },

    /// The RPC endpoint could not be reached.
    #[error("rpc request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The RPC endpoint returned a JSON-RPC error object.
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// The RPC result could not be decoded.
    #[error("invalid rpc response: {0}")]
    InvalidResponse(String),

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, NamingError>;
