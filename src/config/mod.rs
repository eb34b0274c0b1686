//! Configuration subsystem.
//!
//! # Data Flow
//! ```text
//! TOML file
//!     → loader.rs (read, parse)
//!     → validation.rs (semantic checks, all errors collected)
//!     → schema.rs types consumed by the protection pipeline
//! ```
//!
//! # Design Decisions
//! - Every section has a working default; a missing config file is usable
//! - Security invariants that can be checked statically (credentialed
//!   wildcard CORS) are config errors, not request-time surprises

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::GuardConfig;
