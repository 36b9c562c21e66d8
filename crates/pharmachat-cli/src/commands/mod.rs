pub mod chat;
pub mod inventory;
pub mod orders;
pub mod patients;
pub mod refills;
pub mod render;
pub mod utils;
