//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (read & deserialize)
//!     → validation.rs (semantic checks, every problem reported)
//!     → ServerConfig (validated, immutable)
//!     → handed to stores, sessions and the HTTP server at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults so an empty file is a valid config
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    IdentityConfig, ListenerConfig, LogFormat, ObservabilityConfig, SecurityConfig, ServerConfig,
    SessionConfig, StorageConfig, TimeoutConfig, UserConfig,
};
pub use validation::{validate_config, ValidationError};
