//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Validate → Init logging/metrics → Connect cluster
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Notify background tasks → Drain → Close cluster
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then observability, then the cluster
//! - Ordered shutdown: stop background tasks, drain, close every node
//! - Shutdown has timeout: the cluster is closed after the deadline anyway

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use signals::shutdown_signal;
pub use startup::{connect_cluster, connect_with, StartupError};
