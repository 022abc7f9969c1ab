pub mod api;
pub mod config;
pub mod error;
pub mod event_bus;
pub mod types;

pub use config::{AppConfig, SdkConfig};
pub use error::{EngineError, EngineResult};
