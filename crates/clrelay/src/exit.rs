use std::fmt;
use std::io;

use clrelay::naming::NamingError;
use clrelay::relay::RelayError;
use clrelay::schema::SchemaError;

// Exit codes follow sysexits-style ranges (64 usage, 124 timeout).
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::AddrInUse | io::ErrorKind::AddrNotAvailable => USAGE,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

fn reqwest_code(err: &reqwest::Error) -> i32 {
    if err.is_timeout() {
        TIMEOUT
    } else {
        TRANSPORT_ERROR
    }
}

pub fn schema_error(context: &str, err: SchemaError) -> CliError {
    let code = match &err {
        SchemaError::InvalidUrl { .. } => USAGE,
        SchemaError::Transport { source, .. } => reqwest_code(source),
        SchemaError::FetchFailed { .. } => TRANSPORT_ERROR,
        SchemaError::InvalidDocument { .. } | SchemaError::CompileFailed(_) => DATA_INVALID,
        SchemaError::Client(_) => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn naming_error(context: &str, err: NamingError) -> CliError {
    let code = match &err {
        NamingError::Configuration(_) | NamingError::InvalidName { .. } => USAGE,
        NamingError::Transport { source, .. } => reqwest_code(source),
        NamingError::NoResolver(_)
        | NamingError::MissingRecords { .. }
        | NamingError::Rpc { .. }
        | NamingError::InvalidResponse(_) => FAILURE,
        NamingError::Client(_) => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn relay_error(context: &str, err: RelayError) -> CliError {
    match err {
        RelayError::Naming(err) => naming_error(context, err),
        RelayError::Schema(err) => schema_error(context, err),
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_problems_are_usage_errors() {
        let err = relay_error(
            "startup failed",
            RelayError::Naming(NamingError::Configuration("nothing set".to_string())),
        );
        assert_eq!(err.code, USAGE);
        assert!(err.message.starts_with("startup failed: "));
    }

    #[test]
    fn bad_schemas_are_data_errors() {
        let compile = schema_error("load", SchemaError::CompileFailed("bad".to_string()));
        let document = schema_error(
            "load",
            SchemaError::InvalidDocument {
                url: "https://schemas.example/r.json".to_string(),
                reason: "eof".to_string(),
            },
        );
        assert_eq!(compile.code, DATA_INVALID);
        assert_eq!(document.code, DATA_INVALID);
    }

    #[test]
    fn unreachable_sources_are_transport_errors() {
        let err = relay_error(
            "load",
            RelayError::Schema(SchemaError::FetchFailed {
                status: 502,
                url: "https://schemas.example/r.json".to_string(),
            }),
        );
        assert_eq!(err.code, TRANSPORT_ERROR);
    }

    #[test]
    fn lookup_failures_are_plain_failures() {
        let err = naming_error("resolve", NamingError::NoResolver("relay.eth".to_string()));
        assert_eq!(err.code, FAILURE);
        assert_eq!(err.to_string(), "resolve: no resolver set for relay.eth");
    }

    #[test]
    fn bind_conflicts_are_usage_errors() {
        let err = io_error("bind", io::Error::from(io::ErrorKind::AddrInUse));
        assert_eq!(err.code, USAGE);
        assert_eq!(
            io_error("bind", io::Error::from(io::ErrorKind::PermissionDenied)).code,
            PERMISSION_DENIED
        );
    }

    #[test]
    fn double_install_is_internal() {
        assert_eq!(relay_error("install", RelayError::AlreadyInstalled).code, INTERNAL);
    }
}
