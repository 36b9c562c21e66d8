//! Application layer: the session coordinator and its supporting pieces.
//!
//! The [`SessionCoordinator`] owns per-patient conversation state and
//! mediates every round trip to the agent gateway; [`poller`] provides the
//! cancellable order-refresh subscription.

pub mod audio;
pub mod coordinator;
pub mod poller;
mod session;

pub use audio::{AudioSink, NullAudioSink};
pub use coordinator::{SendOutcome, SessionCoordinator};
pub use poller::{PollHandle, spawn_order_poll};
pub use session::PatientSession;
