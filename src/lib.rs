pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliArgs;
pub use config::{AppConfig, StorageAccountConfig};

pub use adapters::azure::{BlobServiceClient, ClientOptions};
pub use adapters::credential::SharedKeyCredential;
pub use core::enumerator::{collect_all, enumerate};
pub use core::runner::{AccountOutcome, AccountStatus, RunOptions, RunReport, Runner};
pub use utils::error::{AppError, Result};
