//! Contract-enforcing HTTP fetch relay.
//!
//! Callers post a request envelope; the relay validates it against a remote
//! request schema, calls the target URL under an SSRF guard and a deadline,
//! and answers with a receipt that is itself validated against a remote
//! receipt schema.
//!
//! # Crate Structure
//!
//! - [`schema`]: Remote schema fetching and strict compilation
//! - [`naming`]: Schema location from configuration or ENS text records
//! - [`relay`]: Guard, executor, receipt builder and request pipeline
//! - [`server`]: HTTP routes

/// Re-export schema types.
pub mod schema {
    pub use clrelay_schema::*;
}

/// Re-export naming types.
pub mod naming {
    pub use clrelay_naming::*;
}

/// Re-export relay types.
pub mod relay {
    pub use clrelay_relay::*;
}

pub mod server;
