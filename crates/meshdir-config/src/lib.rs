//! # meshdir-config
//!
//! Configuration for the directory client. Reads from `meshdir.toml` and
//! environment variables, in that precedence order, and sets up `tracing`
//! output from the `[logging]` section.

pub mod loader;
pub mod logging;
pub mod schema;

pub use loader::ConfigLoader;
pub use logging::init_logging;
pub use schema::{ConfigWarning, DirectoryConfig, LoggingConfig, MeshdirConfig, WarningSeverity};
