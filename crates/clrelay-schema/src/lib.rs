//! Remote JSON Schema acquisition and strict compilation.
//!
//! Schemas for the relay contract live outside the process. This crate
//! fetches them (memoized for the process lifetime), resolves their external
//! `$ref`s through the same fetcher, and compiles them into validators that
//! reject schema-authoring mistakes instead of ignoring them.

pub mod compiler;
pub mod config;
pub mod error;
pub mod fetcher;
mod keywords;
pub mod validator;

pub use compiler::SchemaCompiler;
pub use config::{CompilerConfig, FetcherConfig, DEFAULT_IPFS_GATEWAY};
pub use error::{Result, SchemaError};
pub use fetcher::DocumentFetcher;
pub use validator::{CompiledValidator, ValidationIssue, Verdict};
