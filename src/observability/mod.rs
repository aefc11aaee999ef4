//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! cluster / health / lifecycle produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → stdout (pretty or JSON lines)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Metrics are cheap (atomic increments)
//! - The router logs lifecycle events only, never per-call errors

pub mod logging;
pub mod metrics;
