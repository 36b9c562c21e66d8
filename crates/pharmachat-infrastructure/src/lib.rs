//! Infrastructure layer: durable storage and configuration loading.

pub mod config_loader;
pub mod json_session_store;
pub mod paths;

pub use config_loader::load_gateway_config;
pub use json_session_store::JsonSessionStore;
pub use paths::PharmaPaths;
