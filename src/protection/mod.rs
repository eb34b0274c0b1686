//! Request protection subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → cors.rs (policy resolution, origin check, preflight)
//!     → csrf.rs (token validation for protected mutations)
//!     → rate_limit.rs (per-identity fixed-window quota)
//!     → Pass to business handler, then decorate the response
//! ```
//!
//! # Design Decisions
//! - Fail closed: any check failure, or any failure inside a check,
//!   denies the request
//! - All state is held in injected services so tests run isolated
//!   instances and a shared store can replace the in-memory maps
//! - The CORS table is read-only at request time; only the limiter and
//!   token maps are mutated concurrently

pub mod cors;
pub mod csrf;
pub mod pipeline;
pub mod rate_limit;

pub use pipeline::{protection_middleware, ProtectionPipeline};
