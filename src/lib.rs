//! # cmdbridge
//!
//! Runs external command-line tools (git, docker, kubectl, openssl) under a
//! deadline and turns their output into structured, uniformly shaped results.
//!
//! ## Usage
//!
//! ```bash
//! cmdbridge run git_grep --params '{"pattern": "TODO", "count": true}'
//! ```
//!
//! ## Modules
//!
//! - `operations` - Typed operations and their argument vectors
//! - `subprocess` - Process runner with deadlines, output caps and mocking
//! - `classify` - Exit status classification policies
//! - `parsers` - Output dialect parsers producing records
//! - `envelope` - The result returned for every invocation
//! - `engine` - Ties planning, execution, classification and parsing together
//! - `credentials` - Token lookup and environment-only injection
//! - `config` - TOML configuration with environment overrides
//! - `error` - Unified error type with numeric codes
pub mod classify;
pub mod config;
pub mod credentials;
pub mod engine;
pub mod envelope;
pub mod error;
pub mod operations;
pub mod parsers;
pub mod subprocess;

pub use classify::{Classification, ClassificationPolicy};
pub use config::{ConfigLoader, EngineConfig};
pub use credentials::{ConfiguredCredentials, CredentialProvider, NoCredentials};
pub use engine::Engine;
pub use envelope::ResultEnvelope;
pub use error::{BridgeError, ErrorCode};
pub use operations::{Operation, CATALOGUE};
pub use parsers::Record;
