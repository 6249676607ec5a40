pub mod config;
pub mod logging;

pub use config::{ApiConfig, ConfigError, ExportConfig, FmsConfig};
