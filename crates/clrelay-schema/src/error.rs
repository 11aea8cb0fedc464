/// Errors raised while acquiring or compiling schema documents.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// The document URL could not be parsed or uses an unsupported scheme.
    #[error("invalid document url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The document source could not be reached.
    #[error("failed to fetch {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The document source answered with a non-success status.
    #[error("fetching {url} returned HTTP {status}")]
    FetchFailed { status: u16, url: String },

    /// The fetched body is not a JSON document.
    #[error("document at {url} is not valid JSON: {reason}")]
    InvalidDocument { url: String, reason: String },

    /// The schema could not be compiled.
    #[error("failed to compile schema: {0}")]
    CompileFailed(String),

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, SchemaError>;
