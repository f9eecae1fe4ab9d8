//! Process-level runtime support: layered configuration, logging setup and
//! home directory resolution shared by every binary in the workspace.

pub mod config;
pub mod logging;
pub mod paths;

pub use config::{
    default_logging_config, AppConfig, AppConfigProvider, CliArgs, DatabaseConfig, LoggingConfig,
    Section, ServerConfig,
};
