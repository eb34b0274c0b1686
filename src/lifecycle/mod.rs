//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Init logging → Load config → Validate → Bind listener → Spawn sweepers → Serve
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Broadcast → Sweepers exit → Server drains → Exit
//! ```

pub mod shutdown;

pub use shutdown::Shutdown;
