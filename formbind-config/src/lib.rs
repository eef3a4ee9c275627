//! formbind configuration using Figment
//!
//! Engine settings are merged from several sources, later sources override
//! earlier ones:
//!
//! 1. Built-in defaults ([`FormConfig::default`])
//! 2. `formbind.{toml,yaml,yml,json}` in the configuration directory
//! 3. Environment variables prefixed with `FORMBIND_`
//!
//! ```no_run
//! use formbind_config::load_configuration;
//!
//! let config = load_configuration()?;
//! println!("controls declare their pointer in [{}]", config.bind_attribute);
//! # Ok::<(), formbind_config::ConfigError>(())
//! ```
//!
//! ## Example TOML Configuration
//!
//! ```toml
//! bind_attribute = "data-bind"
//! validator_timeout_ms = 500
//! defer_validation = true
//! ```
//!
//! ## Environment Variables
//!
//! ```bash
//! export FORMBIND_VALIDATOR_TIMEOUT_MS=250   # → validator_timeout_ms
//! export FORMBIND_EVENT_CAPACITY=128         # → event_capacity
//! ```

pub mod discovery;
pub mod error;
pub mod provider;
pub mod types;

pub use discovery::{ConfigFile, ConfigFormat, FileDiscovery};
pub use error::{ConfigError, ConfigResult};
pub use provider::{ConfigProvider, ENV_PREFIX};
pub use types::FormConfig;

/// Load configuration from the current directory and the environment.
pub fn load_configuration() -> ConfigResult<FormConfig> {
    ConfigProvider::new().load()
}
