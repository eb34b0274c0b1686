//! Storefront request-protection gateway.
//!
//! Every inbound API call passes through a protection pipeline before
//! reaching business logic:
//!
//! ```text
//!                        ┌──────────────────────────────────────────────┐
//!                        │              PROTECTION GATEWAY               │
//!                        │                                              │
//!   Client Request       │  ┌──────┐   ┌──────┐   ┌────────────┐        │
//!   ─────────────────────┼─▶│ CORS │──▶│ CSRF │──▶│ rate limit │──▶ ... ─┼──▶ Business
//!                        │  └──┬───┘   └──────┘   └────────────┘        │    handlers
//!                        │     │ preflight                              │
//!   Client Response      │     ▼                  ┌────────────┐        │
//!   ◀────────────────────┼── 204/403  ◀───────────│ decoration │◀───────┼─── Handler
//!                        │                        └────────────┘        │    response
//!                        │  ┌────────────────────────────────────────┐  │
//!                        │  │ config │ observability │ lifecycle     │  │
//!                        │  └────────────────────────────────────────┘  │
//!                        └──────────────────────────────────────────────┘
//! ```
//!
//! State is process-local: horizontally scaled deployments enforce limits
//! per process. The limiter and token service are injected services, so a
//! shared store can replace their in-memory maps without contract changes.

// Core subsystems
pub mod config;
pub mod http;
pub mod protection;

// Collaborator seams
pub mod clock;
pub mod session;

// Cross-cutting concerns
pub mod error;
pub mod lifecycle;
pub mod observability;

pub use config::GuardConfig;
pub use error::GuardError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use protection::ProtectionPipeline;
