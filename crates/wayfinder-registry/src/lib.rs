//! Per-API configuration and catalog.
//!
//! Each registered API pairs one configuration (spec source, base URL,
//! auth) with one parsed spec. Registration failures degrade to listed
//! placeholder entries instead of taking the whole registry down.

pub mod config;
pub mod registry;

pub use config::{load_config, ApiConfig, ApiSettings, AuthConfig, AuthType, Config, ConfigError};
pub use registry::{ApiRegistry, ApiSummary};
