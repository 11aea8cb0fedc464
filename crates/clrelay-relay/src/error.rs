use clrelay_naming::NamingError;
use clrelay_schema::SchemaError;

/// Errors that stop the relay from starting.
///
/// Per-request failures never surface here; they become receipts or
/// [`crate::Rejection`]s.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Schema locations could not be determined.
    #[error("schema location failed: {0}")]
    Naming(#[from] NamingError),

    /// A schema document could not be fetched or compiled.
    #[error("schema load failed: {0}")]
    Schema(#[from] SchemaError),

    /// Validators were already installed for this process.
    #[error("contract validators already installed")]
    AlreadyInstalled,

    /// The outbound HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, RelayError>;
