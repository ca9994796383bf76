// Adapters layer: concrete implementations for external systems.

pub mod azure;
pub mod credential;
