//! The contract-enforcing relay pipeline.
//!
//! Per request: validate against the request schema, gate the target URL,
//! run the outbound call under a timeout, build a receipt for whatever
//! happened, and validate that receipt against the receipt schema before it
//! leaves the process.

pub mod bootstrap;
pub mod error;
pub mod executor;
pub mod guard;
pub mod pipeline;
pub mod receipt;
pub mod request;
pub mod state;

pub use bootstrap::{bootstrap, load_contracts};
pub use error::{RelayError, Result};
pub use executor::{FetchExecutor, FetchedResponse, Outcome};
pub use guard::is_blocked;
pub use pipeline::{handle, Rejection, RelayReply, Stage};
pub use receipt::{build_receipt, ReceiptResult, ReceiptTrace, RelayReceipt, BODY_PREVIEW_LIMIT};
pub use request::{RelayRequest, DEFAULT_TIMEOUT_MS, MAX_TIMEOUT_MS, MIN_TIMEOUT_MS};
pub use state::{ContractValidators, RelayState};
