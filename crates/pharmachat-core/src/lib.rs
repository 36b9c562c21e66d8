pub mod agent;
pub mod config;
pub mod error;
pub mod inventory;
pub mod notification;
pub mod order;
pub mod patient;
pub mod session;

// Re-export common error type
pub use error::PharmaError;
