//! Session storage trait.
//!
//! Defines the interface for durable conversation storage, keyed by
//! patient id. Overwrites must be idempotent and removal immediate.

use async_trait::async_trait;

use super::message::ChatMessage;
use crate::error::Result;

/// An abstract store for persisted conversation logs.
///
/// Decouples the session coordinator from the storage mechanism (JSON
/// files, a key-value database, a remote API). Implementations must treat
/// `save_messages` as a full overwrite of the patient's snapshot and make
/// `delete_messages` immediate and complete.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Loads the persisted message log for a patient.
    ///
    /// Returns `Ok(None)` when no snapshot exists for the patient.
    async fn load_messages(&self, patient_id: &str) -> Result<Option<Vec<ChatMessage>>>;

    /// Overwrites the patient's persisted message log.
    async fn save_messages(&self, patient_id: &str, messages: &[ChatMessage]) -> Result<()>;

    /// Removes the patient's persisted message log. Deleting a missing
    /// snapshot is not an error.
    async fn delete_messages(&self, patient_id: &str) -> Result<()>;

    /// Returns the last patient selected across application runs.
    async fn last_selected_patient(&self) -> Result<Option<String>>;

    /// Records the last selected patient.
    async fn set_last_selected_patient(&self, patient_id: &str) -> Result<()>;
}
