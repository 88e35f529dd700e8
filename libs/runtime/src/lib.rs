//! Process-level plumbing shared by CourseHub binaries: layered configuration,
//! logging setup and shutdown signals.

pub mod config;
pub mod logging;
pub mod paths;
pub mod shutdown;

pub use config::{
    default_logging_config, AppConfig, CliArgs, ConfigError, LoggingConfig, Section, ServerConfig,
};
pub use shutdown::wait_for_shutdown;
