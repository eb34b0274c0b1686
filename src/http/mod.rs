//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, router assembly)
//!     → protection pipeline (CORS → CSRF → rate limit)
//!     → business handler
//!     → response.rs (rejection bodies, rate-limit headers)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::X_REQUEST_ID;
pub use server::{build_router, AppState, HttpServer};
