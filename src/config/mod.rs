#[cfg(feature = "cli")]
pub mod cli;
pub mod yaml_config;

#[cfg(feature = "cli")]
pub use cli::CliArgs;
pub use yaml_config::{AppConfig, GlobalConfig, StorageAccountConfig};
