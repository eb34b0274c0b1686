//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber
//! - Respect `RUST_LOG` when set, config level otherwise
//!
//! # Design Decisions
//! - Uses the tracing crate for structured logging
//! - Security denials are logged with structured fields (client, path,
//!   reason) so they can be aggregated, never silently dropped

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the logging subsystem.
///
/// `RUST_LOG` takes precedence; otherwise the configured level applies to
/// this crate and tower-http.
pub fn init(log_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("storefront_guard={log_level},tower_http=info").into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
