//! Where the relay contract lives.
//!
//! The two schema URLs come either straight from configuration or from two
//! ENS text records on a configured name, read over Ethereum JSON-RPC.

pub mod abi;
pub mod ens;
pub mod error;
pub mod locate;

pub use ens::{NameResolver, RECEIPT_SCHEMA_RECORD, REQUEST_SCHEMA_RECORD};
pub use error::{NamingError, Result};
pub use locate::{resolve_locations, LocationConfig, SchemaLocationPair, SchemaSource};
