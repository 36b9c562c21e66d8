//! Order domain module.
//!
//! Contains the order model as persisted by the fulfillment backend, the
//! pure timeline derivation used to render an order's lifecycle, and the
//! single place display pricing is computed.

mod model;
pub mod pricing;
mod timeline;

pub use model::{Order, OrderEvent, OrderItem, OrderStatus};
pub use timeline::{StepStatus, TimelineStep, derive_timeline};
