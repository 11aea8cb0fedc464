use std::time::Duration;

/// Public gateway used to rewrite `ipfs://` document URLs.
pub const DEFAULT_IPFS_GATEWAY: &str = "https://ipfs.io/ipfs/";

/// Controls how schema documents are fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetcherConfig {
    /// HTTP gateway prefix substituted for the `ipfs://` scheme.
    pub ipfs_gateway: String,
    /// Upper bound on a single document fetch.
    pub timeout: Duration,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            ipfs_gateway: DEFAULT_IPFS_GATEWAY.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Controls schema compilation behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompilerConfig {
    /// When true, unknown keywords and unknown formats fail compilation.
    pub strict: bool,
    /// When true, `format` is asserted during validation, not just annotated.
    pub validate_formats: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            strict: true,
            validate_formats: true,
        }
    }
}
