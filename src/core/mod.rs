pub mod enumerator;
pub mod runner;

pub use crate::domain::model::{BlobPage, BlobRecord, ContainerRef, ContinuationState, EnumerationResult};
pub use crate::domain::ports::{BlobPageSource, ConfigProvider};
pub use crate::utils::error::Result;
