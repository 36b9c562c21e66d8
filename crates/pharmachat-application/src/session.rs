//! In-memory state for one patient's conversation session.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::RwLock;

use pharmachat_core::agent::{ExtractionResult, HistoryEntry};
use pharmachat_core::patient::Patient;
use pharmachat_core::session::{ChatMessage, MessagePayload, MessageRole, SessionPreferences};

/// Mutable conversation state scoped to one patient.
///
/// The message log, the last extracted-entity snapshot, the preferences,
/// and the in-flight flag all live here. At most one request may be
/// outstanding per session; the flag is the only mutual-exclusion
/// primitive a session needs.
pub struct PatientSession {
    patient: Patient,
    messages: RwLock<Vec<ChatMessage>>,
    next_id: AtomicU64,
    last_entities: RwLock<Option<ExtractionResult>>,
    last_trace_url: RwLock<Option<String>>,
    preferences: RwLock<SessionPreferences>,
    in_flight: AtomicBool,
}

impl PatientSession {
    /// Creates a session, seeding the log from a persisted snapshot when
    /// one was loaded.
    pub fn new(patient: Patient, persisted: Option<Vec<ChatMessage>>) -> Self {
        let messages = persisted.unwrap_or_default();
        let next_id = messages.iter().map(|m| m.id).max().unwrap_or(0) + 1;
        Self {
            patient,
            messages: RwLock::new(messages),
            next_id: AtomicU64::new(next_id),
            last_entities: RwLock::new(None),
            last_trace_url: RwLock::new(None),
            preferences: RwLock::new(SessionPreferences::default()),
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn patient(&self) -> &Patient {
        &self.patient
    }

    pub fn patient_id(&self) -> &str {
        &self.patient.patient_id
    }

    /// Attempts the `Idle -> Sending` transition. Returns false when a
    /// request is already outstanding.
    pub fn try_begin_send(&self) -> bool {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Clears the in-flight flag (`Sending -> Idle`). Called on every
    /// outcome, including failure and discarded responses.
    pub fn end_send(&self) {
        self.in_flight.store(false, Ordering::Release);
    }

    pub fn is_sending(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Snapshot of prior turns in gateway history form. The current turn is
    /// sent separately and must not appear here.
    pub async fn history_snapshot(&self) -> Vec<HistoryEntry> {
        self.messages
            .read()
            .await
            .iter()
            .map(|m| HistoryEntry {
                role: match m.role {
                    MessageRole::User => "user".to_string(),
                    MessageRole::Assistant => "assistant".to_string(),
                },
                content: m.content.clone(),
            })
            .collect()
    }

    /// Appends a user message and returns its id.
    pub async fn append_user(&self, content: &str) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.messages.write().await.push(ChatMessage::user(id, content));
        id
    }

    /// Appends an assistant message and returns its id.
    pub async fn append_assistant(&self, content: &str, payload: Option<MessagePayload>) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.messages
            .write()
            .await
            .push(ChatMessage::assistant(id, content, payload));
        id
    }

    /// Clones the current message log.
    pub async fn messages(&self) -> Vec<ChatMessage> {
        self.messages.read().await.clone()
    }

    pub async fn message_count(&self) -> usize {
        self.messages.read().await.len()
    }

    /// Marks an order-preview message's prescription-upload flag. This is
    /// the single allowed in-place update to an appended message.
    pub async fn mark_prescription_uploaded(&self, message_id: u64) -> bool {
        let mut messages = self.messages.write().await;
        for message in messages.iter_mut() {
            if message.id != message_id {
                continue;
            }
            if let Some(payload) = message.payload.as_mut() {
                if payload.order_preview.is_some() && !payload.prescription_uploaded {
                    payload.prescription_uploaded = true;
                    return true;
                }
            }
            return false;
        }
        false
    }

    pub async fn set_last_entities(&self, entities: Option<ExtractionResult>) {
        *self.last_entities.write().await = entities;
    }

    pub async fn last_entities(&self) -> Option<ExtractionResult> {
        self.last_entities.read().await.clone()
    }

    pub async fn set_last_trace_url(&self, trace_url: Option<String>) {
        if trace_url.is_some() {
            *self.last_trace_url.write().await = trace_url;
        }
    }

    pub async fn last_trace_url(&self) -> Option<String> {
        self.last_trace_url.read().await.clone()
    }

    pub async fn preferences(&self) -> SessionPreferences {
        *self.preferences.read().await
    }

    pub async fn set_auto_save(&self, enabled: bool) {
        self.preferences.write().await.auto_save = enabled;
    }

    pub async fn set_notifications_enabled(&self, enabled: bool) {
        self.preferences.write().await.notifications_enabled = enabled;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patient() -> Patient {
        Patient::new("P001", "Sarah Tan")
    }

    #[tokio::test]
    async fn test_ids_continue_after_restore() {
        let persisted = vec![
            ChatMessage::user(1, "hello"),
            ChatMessage::assistant(2, "hi", None),
        ];
        let session = PatientSession::new(patient(), Some(persisted));
        let id = session.append_user("next").await;
        assert_eq!(id, 3);
    }

    #[tokio::test]
    async fn test_in_flight_transition_is_exclusive() {
        let session = PatientSession::new(patient(), None);
        assert!(session.try_begin_send());
        assert!(!session.try_begin_send());
        session.end_send();
        assert!(session.try_begin_send());
    }

    #[tokio::test]
    async fn test_mark_prescription_uploaded_requires_preview() {
        let session = PatientSession::new(patient(), None);
        let plain = session.append_assistant("no preview here", None).await;
        assert!(!session.mark_prescription_uploaded(plain).await);

        let payload = MessagePayload {
            order_preview: Some(pharmachat_core::agent::OrderPreview {
                preview_id: "PRV-1".to_string(),
                patient_id: "P001".to_string(),
                patient_name: String::new(),
                items: vec![],
                total_amount: 0.0,
                safety_decision: Default::default(),
                safety_reasons: vec![],
                requires_prescription: true,
                created_at: String::new(),
            }),
            ..Default::default()
        };
        let with_preview = session.append_assistant("preview", Some(payload)).await;
        assert!(session.mark_prescription_uploaded(with_preview).await);
        // Second flip is a no-op.
        assert!(!session.mark_prescription_uploaded(with_preview).await);
    }
}
