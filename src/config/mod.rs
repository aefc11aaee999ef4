//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! <config_dir>/<env>.config.toml
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//!     → SqlConfig::cluster_config() → ClusterConnector
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; topology changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - `master` / `slaves` are accepted as aliases of `primary` / `replicas`

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_environment, ConfigError};
pub use schema::AppConfig;
pub use schema::HealthCheckConfig;
pub use schema::LogFormat;
pub use schema::ObservabilityConfig;
pub use schema::SqlConfig;
pub use schema::SqlConnConfig;
pub use validation::ValidationError;
