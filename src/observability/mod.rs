//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Protection pipeline produces:
//!     → logging.rs (structured denial events)
//!     → metrics.rs (denial counters, sweep counters)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```

pub mod logging;
pub mod metrics;
