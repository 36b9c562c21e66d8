//! Session coordinator.
//!
//! Owns every patient conversation, serializes gateway round trips per
//! session, and applies the persistence and notification policy after each
//! turn. Sessions for different patients are independent; only the active
//! one receives input.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock, mpsc};

use pharmachat_core::agent::{
    AgentGateway, ChatRequest, ChatResponse, ExtractionResult, VoiceRequest,
};
use pharmachat_core::notification::{Notification, NotificationSink, NullNotificationSink, Severity};
use pharmachat_core::order::{self, Order, OrderStatus};
use pharmachat_core::patient::Patient;
use pharmachat_core::session::{ChatMessage, MessagePayload, SessionPreferences, SessionStore};

use crate::audio::{AudioSink, NullAudioSink};
use crate::poller::{PollHandle, spawn_order_poll};
use crate::session::PatientSession;

/// Shown when the gateway fails or returns something unparseable. The
/// failure stays local to the turn; the session remains usable.
const FALLBACK_REPLY: &str =
    "I'm sorry, I ran into a problem processing that request. Please try again.";

/// Outcome of a `send_*` call.
///
/// Guard violations (empty input, no patient selected, request already in
/// flight) are rejections, not errors: the caller gets a no-op, never a
/// failure to handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The turn ran to completion (including the fallback-reply path).
    Completed,
    /// A guard condition rejected the call; nothing changed.
    Rejected,
}

/// Coordinates conversation sessions across patients.
///
/// One session exists per patient id. Selecting a patient deselects the
/// previous session without destroying it. Within a session the in-flight
/// flag serializes gateway calls; across sessions no shared mutable state
/// exists beyond the session map itself.
pub struct SessionCoordinator {
    gateway: Arc<dyn AgentGateway>,
    store: Arc<dyn SessionStore>,
    notifier: Arc<dyn NotificationSink>,
    audio: Arc<dyn AudioSink>,
    sessions: RwLock<HashMap<String, Arc<PatientSession>>>,
    active: RwLock<Option<String>>,
    poll: Mutex<Option<PollHandle>>,
}

impl SessionCoordinator {
    pub fn new(gateway: Arc<dyn AgentGateway>, store: Arc<dyn SessionStore>) -> Self {
        Self {
            gateway,
            store,
            notifier: Arc::new(NullNotificationSink),
            audio: Arc::new(NullAudioSink),
            sessions: RwLock::new(HashMap::new()),
            active: RwLock::new(None),
            poll: Mutex::new(None),
        }
    }

    /// Replaces the notification sink.
    pub fn with_notifier(mut self, notifier: Arc<dyn NotificationSink>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Replaces the audio playback sink.
    pub fn with_audio(mut self, audio: Arc<dyn AudioSink>) -> Self {
        self.audio = audio;
        self
    }

    /// Switches the active session to `patient`.
    ///
    /// An existing session for the patient is reused as-is; otherwise a
    /// new one is created, seeded from durable storage iff auto-save is
    /// enabled. The last-entity snapshot is always cleared, and any
    /// running order poll for the previous patient is stopped.
    pub async fn select_patient(&self, patient: Patient) {
        self.stop_watching().await;

        let patient_id = patient.patient_id.clone();
        let existing = self.sessions.read().await.get(&patient_id).cloned();
        let session = match existing {
            Some(session) => session,
            None => {
                // Load the snapshot before taking the write lock so a slow
                // read never blocks other sessions.
                let preferences = SessionPreferences::default();
                let persisted = if preferences.auto_save {
                    match self.store.load_messages(&patient_id).await {
                        Ok(persisted) => persisted,
                        Err(e) => {
                            tracing::warn!(
                                patient_id = %patient_id,
                                "failed to load persisted session, starting empty: {e}"
                            );
                            None
                        }
                    }
                } else {
                    None
                };
                // A concurrent select may have inserted meanwhile; the
                // first insert wins.
                self.sessions
                    .write()
                    .await
                    .entry(patient_id.clone())
                    .or_insert_with(|| Arc::new(PatientSession::new(patient, persisted)))
                    .clone()
            }
        };

        session.set_last_entities(None).await;
        *self.active.write().await = Some(patient_id.clone());

        if let Err(e) = self.store.set_last_selected_patient(&patient_id).await {
            tracing::warn!("failed to record last selected patient: {e}");
        }
        tracing::info!(patient_id = %patient_id, "patient selected");
    }

    /// Returns the active patient, if one is selected.
    pub async fn active_patient(&self) -> Option<Patient> {
        let session = self.active_session().await?;
        Some(session.patient().clone())
    }

    /// Clones the active session's message log.
    pub async fn messages(&self) -> Vec<ChatMessage> {
        match self.active_session().await {
            Some(session) => session.messages().await,
            None => Vec::new(),
        }
    }

    /// Last extracted-entity snapshot for the active session.
    pub async fn last_entities(&self) -> Option<ExtractionResult> {
        self.active_session().await?.last_entities().await
    }

    /// Last trace link for the active session.
    pub async fn last_trace_url(&self) -> Option<String> {
        self.active_session().await?.last_trace_url().await
    }

    /// Preferences of the active session.
    pub async fn preferences(&self) -> Option<SessionPreferences> {
        match self.active_session().await {
            Some(session) => Some(session.preferences().await),
            None => None,
        }
    }

    /// Sends one text turn through the agent pipeline.
    ///
    /// The user message is appended optimistically before the gateway call;
    /// the outbound history is the pre-send log, with the current message
    /// traveling separately. Gateway failures append one fallback reply
    /// instead of surfacing an error.
    pub async fn send_text(&self, text: &str) -> SendOutcome {
        let text = text.trim();
        if text.is_empty() {
            return SendOutcome::Rejected;
        }
        let Some(session) = self.active_session().await else {
            return SendOutcome::Rejected;
        };
        if !session.try_begin_send() {
            tracing::debug!("send_text rejected: request already in flight");
            return SendOutcome::Rejected;
        }

        let patient_id = session.patient_id().to_string();
        let history = session.history_snapshot().await;
        session.append_user(text).await;

        let request = ChatRequest {
            patient_id: patient_id.clone(),
            message: text.to_string(),
            session_id: Some(patient_id.clone()),
            conversation_history: history,
        };

        let result = self.gateway.chat(request).await;

        if self.response_is_stale(&patient_id).await {
            tracing::debug!(patient_id = %patient_id, "discarding reply for deselected session");
            session.end_send();
            return SendOutcome::Completed;
        }

        match result {
            Ok(response) => {
                self.apply_chat_response(&session, &response).await;
            }
            Err(e) => {
                tracing::warn!(patient_id = %patient_id, "chat turn failed: {e}");
                session.append_assistant(FALLBACK_REPLY, None).await;
            }
        }

        self.persist_if_enabled(&session).await;
        session.end_send();
        SendOutcome::Completed
    }

    /// Sends one voice turn: transcription, chat, and optional synthesized
    /// reply audio in a single gateway round trip.
    pub async fn send_voice(&self, audio: &[u8]) -> SendOutcome {
        if audio.is_empty() {
            return SendOutcome::Rejected;
        }
        let Some(session) = self.active_session().await else {
            return SendOutcome::Rejected;
        };
        if !session.try_begin_send() {
            tracing::debug!("send_voice rejected: request already in flight");
            return SendOutcome::Rejected;
        }

        let patient_id = session.patient_id().to_string();
        let request = VoiceRequest::from_audio(audio, &patient_id, Some(patient_id.clone()));

        let result = self.gateway.voice(request).await;

        if self.response_is_stale(&patient_id).await {
            tracing::debug!(patient_id = %patient_id, "discarding voice reply for deselected session");
            session.end_send();
            return SendOutcome::Completed;
        }

        match result {
            Ok(response) => {
                let transcript = response.transcript.trim();
                if !transcript.is_empty() {
                    session.append_user(transcript).await;
                }
                self.apply_chat_response(&session, &response.chat_response).await;

                // Playback is outside the data contract; failures are the
                // sink's problem.
                if let Some(bytes) = response.decode_audio() {
                    self.audio.play(bytes);
                }
            }
            Err(e) => {
                tracing::warn!(patient_id = %patient_id, "voice turn failed: {e}");
                session.append_assistant(FALLBACK_REPLY, None).await;
            }
        }

        self.persist_if_enabled(&session).await;
        session.end_send();
        SendOutcome::Completed
    }

    /// Forwards the literal confirmation token; interpreting it is the
    /// agent backend's job.
    pub async fn confirm_order(&self) -> SendOutcome {
        self.send_text("confirm").await
    }

    /// Forwards the literal cancellation token.
    pub async fn cancel_order(&self) -> SendOutcome {
        self.send_text("cancel").await
    }

    /// Toggles auto-save for the active session.
    ///
    /// Disabling purges the patient's durable snapshot immediately; the
    /// in-memory log is untouched. Re-enabling restores nothing, it only
    /// arms future snapshots.
    pub async fn set_auto_save(&self, enabled: bool) {
        let Some(session) = self.active_session().await else {
            return;
        };
        session.set_auto_save(enabled).await;
        if !enabled {
            if let Err(e) = self.store.delete_messages(session.patient_id()).await {
                tracing::warn!("failed to purge session snapshot: {e}");
            }
        }
    }

    /// Pure preference flip; no effect on message state.
    pub async fn set_notifications_enabled(&self, enabled: bool) {
        if let Some(session) = self.active_session().await {
            session.set_notifications_enabled(enabled).await;
        }
    }

    /// Marks an order-preview message's prescription upload as satisfied.
    pub async fn mark_prescription_uploaded(&self, message_id: u64) -> bool {
        let Some(session) = self.active_session().await else {
            return false;
        };
        let updated = session.mark_prescription_uploaded(message_id).await;
        if updated {
            self.persist_if_enabled(&session).await;
        }
        updated
    }

    /// Starts polling the active patient's orders every `period`, pushing
    /// snapshots into `tx`. Any previous poll is stopped first. Returns
    /// false when no patient is selected.
    pub async fn watch_orders(&self, period: Duration, tx: mpsc::Sender<Vec<Order>>) -> bool {
        let Some(session) = self.active_session().await else {
            return false;
        };
        let handle = spawn_order_poll(
            self.gateway.clone(),
            session.patient_id().to_string(),
            period,
            tx,
        );
        let mut poll = self.poll.lock().await;
        if let Some(previous) = poll.replace(handle) {
            previous.stop();
        }
        true
    }

    /// Stops any running order poll.
    pub async fn stop_watching(&self) {
        if let Some(handle) = self.poll.lock().await.take() {
            handle.stop();
        }
    }

    async fn active_session(&self) -> Option<Arc<PatientSession>> {
        let active = self.active.read().await;
        let id = active.as_ref()?;
        self.sessions.read().await.get(id).cloned()
    }

    /// A reply is stale when the active patient changed while the request
    /// was in flight.
    async fn response_is_stale(&self, patient_id: &str) -> bool {
        self.active.read().await.as_deref() != Some(patient_id)
    }

    /// Appends the assistant reply, refreshes session snapshots, and emits
    /// at most one notification for the turn.
    async fn apply_chat_response(&self, session: &Arc<PatientSession>, response: &ChatResponse) {
        let payload = MessagePayload::from_response(response);
        session.append_assistant(&response.message, payload).await;
        session
            .set_last_entities(response.extracted_entities.clone())
            .await;
        session.set_last_trace_url(response.trace_url.clone()).await;

        if let Some(order) = response.order.as_ref() {
            self.maybe_notify_confirmed(session, order).await;
        }
    }

    async fn maybe_notify_confirmed(&self, session: &Arc<PatientSession>, order: &Order) {
        if order.status != OrderStatus::Confirmed {
            return;
        }
        // Suppressed means gone: nothing is queued for later delivery.
        if !session.preferences().await.notifications_enabled {
            return;
        }
        self.notifier.notify(Notification {
            title: "Order Confirmed".to_string(),
            body: format!(
                "Order {} confirmed. Total: ${:.2}",
                order.order_id,
                order::pricing::display_total(order.total_amount)
            ),
            severity: Severity::Success,
        });
    }

    /// Snapshots the log to durable storage, only after the in-memory log
    /// is fully updated for the turn.
    async fn persist_if_enabled(&self, session: &Arc<PatientSession>) {
        if !session.preferences().await.auto_save {
            return;
        }
        let messages = session.messages().await;
        if let Err(e) = self.store.save_messages(session.patient_id(), &messages).await {
            tracing::warn!(patient_id = %session.patient_id(), "failed to persist session: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pharmachat_core::agent::{RefillPrediction, VoiceResponse};
    use pharmachat_core::error::Result;
    use pharmachat_core::inventory::{InventoryStats, Medicine};
    use pharmachat_core::session::MessageRole;
    use pharmachat_core::PharmaError;
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;
    use tokio::sync::Notify;

    // ------------------------------------------------------------------
    // Test doubles
    // ------------------------------------------------------------------

    #[derive(Default)]
    struct MockGateway {
        chat_requests: StdMutex<Vec<ChatRequest>>,
        chat_responses: StdMutex<VecDeque<Result<ChatResponse>>>,
        voice_responses: StdMutex<VecDeque<Result<VoiceResponse>>>,
        /// When set, chat() signals `entered` and blocks until `release`.
        gate: Option<(Arc<Notify>, Arc<Notify>)>,
    }

    impl MockGateway {
        fn with_chat_responses(responses: Vec<Result<ChatResponse>>) -> Self {
            Self {
                chat_responses: StdMutex::new(responses.into_iter().collect()),
                ..Default::default()
            }
        }

        fn with_voice_responses(responses: Vec<Result<VoiceResponse>>) -> Self {
            Self {
                voice_responses: StdMutex::new(responses.into_iter().collect()),
                ..Default::default()
            }
        }

        fn gated(responses: Vec<Result<ChatResponse>>) -> (Self, Arc<Notify>, Arc<Notify>) {
            let entered = Arc::new(Notify::new());
            let release = Arc::new(Notify::new());
            let gateway = Self {
                chat_responses: StdMutex::new(responses.into_iter().collect()),
                gate: Some((entered.clone(), release.clone())),
                ..Default::default()
            };
            (gateway, entered, release)
        }

        fn requests(&self) -> Vec<ChatRequest> {
            self.chat_requests.lock().unwrap().clone()
        }

        fn next_chat(&self) -> Result<ChatResponse> {
            self.chat_responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(reply("Sure, I can help with that.")))
        }
    }

    #[async_trait]
    impl AgentGateway for MockGateway {
        async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
            self.chat_requests.lock().unwrap().push(request);
            if let Some((entered, release)) = &self.gate {
                entered.notify_one();
                release.notified().await;
            }
            self.next_chat()
        }

        async fn voice(&self, _request: VoiceRequest) -> Result<VoiceResponse> {
            self.voice_responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(PharmaError::gateway("no voice response queued")))
        }

        async fn patients(&self) -> Result<Vec<Patient>> {
            Ok(vec![])
        }
        async fn patient(&self, patient_id: &str) -> Result<Patient> {
            Err(PharmaError::not_found("patient", patient_id))
        }
        async fn orders(&self, _patient_id: Option<&str>) -> Result<Vec<Order>> {
            Ok(vec![])
        }
        async fn order(&self, order_id: &str) -> Result<Order> {
            Err(PharmaError::not_found("order", order_id))
        }
        async fn inventory(&self) -> Result<Vec<Medicine>> {
            Ok(vec![])
        }
        async fn inventory_stats(&self) -> Result<InventoryStats> {
            Ok(InventoryStats::default())
        }
        async fn refills(&self) -> Result<Vec<RefillPrediction>> {
            Ok(vec![])
        }
    }

    #[derive(Default)]
    struct MockStore {
        snapshots: StdMutex<HashMap<String, Vec<ChatMessage>>>,
        last_patient: StdMutex<Option<String>>,
    }

    impl MockStore {
        fn snapshot_len(&self, patient_id: &str) -> Option<usize> {
            self.snapshots
                .lock()
                .unwrap()
                .get(patient_id)
                .map(|m| m.len())
        }
    }

    #[async_trait]
    impl SessionStore for MockStore {
        async fn load_messages(&self, patient_id: &str) -> Result<Option<Vec<ChatMessage>>> {
            Ok(self.snapshots.lock().unwrap().get(patient_id).cloned())
        }
        async fn save_messages(&self, patient_id: &str, messages: &[ChatMessage]) -> Result<()> {
            self.snapshots
                .lock()
                .unwrap()
                .insert(patient_id.to_string(), messages.to_vec());
            Ok(())
        }
        async fn delete_messages(&self, patient_id: &str) -> Result<()> {
            self.snapshots.lock().unwrap().remove(patient_id);
            Ok(())
        }
        async fn last_selected_patient(&self) -> Result<Option<String>> {
            Ok(self.last_patient.lock().unwrap().clone())
        }
        async fn set_last_selected_patient(&self, patient_id: &str) -> Result<()> {
            *self.last_patient.lock().unwrap() = Some(patient_id.to_string());
            Ok(())
        }
    }

    /// Store whose `load_messages` parks on a gate for one patient id.
    struct GatedLoadStore {
        inner: MockStore,
        gated_patient: String,
        entered: Arc<Notify>,
        release: Arc<Notify>,
    }

    #[async_trait]
    impl SessionStore for GatedLoadStore {
        async fn load_messages(&self, patient_id: &str) -> Result<Option<Vec<ChatMessage>>> {
            if patient_id == self.gated_patient {
                self.entered.notify_one();
                self.release.notified().await;
            }
            self.inner.load_messages(patient_id).await
        }
        async fn save_messages(&self, patient_id: &str, messages: &[ChatMessage]) -> Result<()> {
            self.inner.save_messages(patient_id, messages).await
        }
        async fn delete_messages(&self, patient_id: &str) -> Result<()> {
            self.inner.delete_messages(patient_id).await
        }
        async fn last_selected_patient(&self) -> Result<Option<String>> {
            self.inner.last_selected_patient().await
        }
        async fn set_last_selected_patient(&self, patient_id: &str) -> Result<()> {
            self.inner.set_last_selected_patient(patient_id).await
        }
    }

    #[derive(Default)]
    struct CapturingSink {
        notifications: StdMutex<Vec<Notification>>,
    }

    impl NotificationSink for CapturingSink {
        fn notify(&self, notification: Notification) {
            self.notifications.lock().unwrap().push(notification);
        }
    }

    #[derive(Default)]
    struct CapturingAudio {
        played: StdMutex<Vec<Vec<u8>>>,
    }

    impl AudioSink for CapturingAudio {
        fn play(&self, audio: Vec<u8>) {
            self.played.lock().unwrap().push(audio);
        }
    }

    fn reply(message: &str) -> ChatResponse {
        ChatResponse {
            message: message.to_string(),
            ..Default::default()
        }
    }

    fn confirmed_order_reply() -> ChatResponse {
        let order: Order = serde_json::from_value(serde_json::json!({
            "order_id": "ORD-20260101-ABC123",
            "patient_id": "P001",
            "total_amount": 20.0,
            "status": "CONFIRMED",
            "created_at": "2026-01-01T00:00:00Z"
        }))
        .unwrap();
        ChatResponse {
            message: "Order confirmed!".to_string(),
            order: Some(order),
            ..Default::default()
        }
    }

    fn patient(id: &str) -> Patient {
        Patient::new(id, format!("Patient {id}"))
    }

    fn coordinator(gateway: MockGateway) -> (SessionCoordinator, Arc<MockStore>) {
        let store = Arc::new(MockStore::default());
        let coordinator = SessionCoordinator::new(Arc::new(gateway), store.clone());
        (coordinator, store)
    }

    // ------------------------------------------------------------------
    // Guard conditions
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_empty_and_whitespace_text_is_rejected() {
        let (coordinator, _store) = coordinator(MockGateway::default());
        coordinator.select_patient(patient("P001")).await;

        assert_eq!(coordinator.send_text("").await, SendOutcome::Rejected);
        assert_eq!(coordinator.send_text("   ").await, SendOutcome::Rejected);
        assert!(coordinator.messages().await.is_empty());
    }

    #[tokio::test]
    async fn test_send_without_patient_is_rejected() {
        let (coordinator, _store) = coordinator(MockGateway::default());
        assert_eq!(coordinator.send_text("hello").await, SendOutcome::Rejected);
    }

    #[tokio::test]
    async fn test_second_send_while_in_flight_is_rejected() {
        let (gateway, entered, release) = MockGateway::gated(vec![Ok(reply("done"))]);
        let store = Arc::new(MockStore::default());
        let coordinator = Arc::new(SessionCoordinator::new(Arc::new(gateway), store));
        coordinator.select_patient(patient("P001")).await;

        let first = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.send_text("first").await })
        };
        entered.notified().await;

        // The first call is parked inside the gateway; the second must be
        // rejected without appending a duplicate user message.
        assert_eq!(coordinator.send_text("second").await, SendOutcome::Rejected);

        release.notify_one();
        assert_eq!(first.await.unwrap(), SendOutcome::Completed);

        let messages = coordinator.messages().await;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content, "first");
        assert_eq!(messages[1].content, "done");
    }

    // ------------------------------------------------------------------
    // Happy path
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_first_turn_sends_empty_history_and_appends_two_messages() {
        let gateway = MockGateway::with_chat_responses(vec![Ok(reply(
            "I've added Metformin 500mg to your order preview.",
        ))]);
        let store = Arc::new(MockStore::default());
        let gateway = Arc::new(gateway);
        let coordinator = SessionCoordinator::new(gateway.clone(), store);
        coordinator.select_patient(patient("P001")).await;

        let outcome = coordinator
            .send_text("I need Metformin 500mg, 60 tablets")
            .await;
        assert_eq!(outcome, SendOutcome::Completed);

        let requests = gateway.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].conversation_history.is_empty());
        assert_eq!(requests[0].message, "I need Metformin 500mg, 60 tablets");
        assert_eq!(requests[0].patient_id, "P001");

        let messages = coordinator.messages().await;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, MessageRole::User);
        assert_eq!(messages[1].role, MessageRole::Assistant);
    }

    #[tokio::test]
    async fn test_history_excludes_current_turn() {
        let gateway = Arc::new(MockGateway::default());
        let store = Arc::new(MockStore::default());
        let coordinator = SessionCoordinator::new(gateway.clone(), store);
        coordinator.select_patient(patient("P001")).await;

        coordinator.send_text("first turn").await;
        coordinator.send_text("second turn").await;

        let requests = gateway.requests();
        assert_eq!(requests.len(), 2);
        // Second request carries the two messages of the first turn only.
        assert_eq!(requests[1].conversation_history.len(), 2);
        assert_eq!(requests[1].conversation_history[0].content, "first turn");
        assert_eq!(requests[1].message, "second turn");
    }

    #[tokio::test]
    async fn test_entities_and_trace_are_captured() {
        let response = ChatResponse {
            message: "Got it.".to_string(),
            extracted_entities: Some(ExtractionResult {
                entities: vec![],
                needs_clarification: true,
                clarification_message: "Which strength?".to_string(),
            }),
            trace_url: Some("https://cloud.langfuse.com/trace/t1".to_string()),
            ..Default::default()
        };
        let (coordinator, _store) =
            coordinator(MockGateway::with_chat_responses(vec![Ok(response)]));
        coordinator.select_patient(patient("P001")).await;
        coordinator.send_text("I need something for headaches").await;

        assert!(coordinator.last_entities().await.unwrap().needs_clarification);
        assert_eq!(
            coordinator.last_trace_url().await.as_deref(),
            Some("https://cloud.langfuse.com/trace/t1")
        );
    }

    // ------------------------------------------------------------------
    // Failure handling
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_gateway_failure_appends_fallback_and_session_stays_usable() {
        let gateway = MockGateway::with_chat_responses(vec![
            Err(PharmaError::gateway_retryable("connection refused")),
            Ok(reply("recovered")),
        ]);
        let (coordinator, _store) = coordinator(gateway);
        coordinator.select_patient(patient("P001")).await;

        assert_eq!(coordinator.send_text("hello").await, SendOutcome::Completed);
        let messages = coordinator.messages().await;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].content, FALLBACK_REPLY);
        assert!(messages[1].payload.is_none());

        // In-flight flag was cleared; the next turn goes through.
        assert_eq!(coordinator.send_text("again").await, SendOutcome::Completed);
        assert_eq!(coordinator.messages().await.len(), 4);
        assert_eq!(coordinator.messages().await[3].content, "recovered");
    }

    // ------------------------------------------------------------------
    // Session switching
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_switching_patient_preserves_previous_session() {
        let (coordinator, _store) = coordinator(MockGateway::default());
        coordinator.select_patient(patient("P001")).await;
        coordinator.send_text("hello from P001").await;

        coordinator.select_patient(patient("P002")).await;
        assert!(coordinator.messages().await.is_empty());

        coordinator.select_patient(patient("P001")).await;
        let messages = coordinator.messages().await;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content, "hello from P001");
        // Entity snapshot is always cleared on selection.
        assert!(coordinator.last_entities().await.is_none());
    }

    #[tokio::test]
    async fn test_message_reads_proceed_while_snapshot_loads() {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let store = Arc::new(GatedLoadStore {
            inner: MockStore::default(),
            gated_patient: "P002".to_string(),
            entered: entered.clone(),
            release: release.clone(),
        });
        let coordinator = Arc::new(SessionCoordinator::new(
            Arc::new(MockGateway::default()),
            store,
        ));
        coordinator.select_patient(patient("P001")).await;
        coordinator.send_text("hello").await;

        let select = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.select_patient(patient("P002")).await })
        };
        entered.notified().await;

        // P002's snapshot is still loading; existing sessions must remain
        // readable in the meantime.
        assert_eq!(coordinator.messages().await.len(), 2);

        release.notify_one();
        select.await.unwrap();
        assert_eq!(
            coordinator.active_patient().await.unwrap().patient_id,
            "P002"
        );
    }

    #[tokio::test]
    async fn test_select_patient_loads_persisted_log() {
        let store = Arc::new(MockStore::default());
        store
            .save_messages(
                "P001",
                &[
                    ChatMessage::user(1, "earlier message"),
                    ChatMessage::assistant(2, "earlier reply", None),
                ],
            )
            .await
            .unwrap();

        let coordinator = SessionCoordinator::new(Arc::new(MockGateway::default()), store);
        coordinator.select_patient(patient("P001")).await;

        let messages = coordinator.messages().await;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content, "earlier message");
    }

    #[tokio::test]
    async fn test_stale_reply_is_discarded_after_patient_switch() {
        let (gateway, entered, release) = MockGateway::gated(vec![Ok(reply("too late"))]);
        let store = Arc::new(MockStore::default());
        let coordinator = Arc::new(SessionCoordinator::new(Arc::new(gateway), store.clone()));
        coordinator.select_patient(patient("P001")).await;

        let first = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.send_text("slow question").await })
        };
        entered.notified().await;

        coordinator.select_patient(patient("P002")).await;
        release.notify_one();
        assert_eq!(first.await.unwrap(), SendOutcome::Completed);

        // P001's log keeps the optimistic user message but no reply, and no
        // snapshot of the half-finished turn was persisted.
        coordinator.select_patient(patient("P001")).await;
        let messages = coordinator.messages().await;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "slow question");
        assert_eq!(store.snapshot_len("P001"), None);

        // The flag was cleared, so the session accepts new turns.
        release.notify_one();
        assert_eq!(coordinator.send_text("hello again").await, SendOutcome::Completed);
    }

    // ------------------------------------------------------------------
    // Persistence policy
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_auto_save_snapshots_after_each_turn() {
        let (coordinator, store) = coordinator(MockGateway::default());
        coordinator.select_patient(patient("P001")).await;
        coordinator.send_text("hello").await;
        assert_eq!(store.snapshot_len("P001"), Some(2));
    }

    #[tokio::test]
    async fn test_disabling_auto_save_purges_snapshot_but_keeps_memory() {
        let (coordinator, store) = coordinator(MockGateway::default());
        coordinator.select_patient(patient("P001")).await;
        coordinator.send_text("hello").await;
        assert_eq!(store.snapshot_len("P001"), Some(2));

        coordinator.set_auto_save(false).await;
        assert_eq!(store.snapshot_len("P001"), None);
        assert_eq!(coordinator.messages().await.len(), 2);

        // Further turns are not persisted while auto-save is off.
        coordinator.send_text("more").await;
        assert_eq!(store.snapshot_len("P001"), None);

        // Re-enabling restores nothing by itself.
        coordinator.set_auto_save(true).await;
        assert_eq!(store.snapshot_len("P001"), None);

        // The next completed turn is snapshotted again.
        coordinator.send_text("and more").await;
        assert_eq!(store.snapshot_len("P001"), Some(6));
    }

    // ------------------------------------------------------------------
    // Notifications
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_confirmed_order_emits_one_notification() {
        let sink = Arc::new(CapturingSink::default());
        let store = Arc::new(MockStore::default());
        let gateway = MockGateway::with_chat_responses(vec![Ok(confirmed_order_reply())]);
        let coordinator = SessionCoordinator::new(Arc::new(gateway), store)
            .with_notifier(sink.clone());
        coordinator.select_patient(patient("P001")).await;

        coordinator.confirm_order().await;

        let notifications = sink.notifications.lock().unwrap();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].title, "Order Confirmed");
        assert_eq!(notifications[0].severity, Severity::Success);
        // 20.00 * 1.05 + 2.00 delivery fee, rounded at render time.
        assert!(notifications[0].body.contains("$23.00"));
    }

    #[tokio::test]
    async fn test_notifications_suppressed_when_disabled() {
        let sink = Arc::new(CapturingSink::default());
        let store = Arc::new(MockStore::default());
        let gateway = MockGateway::with_chat_responses(vec![Ok(confirmed_order_reply())]);
        let coordinator = SessionCoordinator::new(Arc::new(gateway), store)
            .with_notifier(sink.clone());
        coordinator.select_patient(patient("P001")).await;
        coordinator.set_notifications_enabled(false).await;

        coordinator.confirm_order().await;
        assert!(sink.notifications.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_non_confirmed_order_does_not_notify() {
        let sink = Arc::new(CapturingSink::default());
        let store = Arc::new(MockStore::default());
        let mut response = confirmed_order_reply();
        response.order.as_mut().unwrap().status = OrderStatus::Pending;
        let gateway = MockGateway::with_chat_responses(vec![Ok(response)]);
        let coordinator = SessionCoordinator::new(Arc::new(gateway), store)
            .with_notifier(sink.clone());
        coordinator.select_patient(patient("P001")).await;

        coordinator.send_text("order something").await;
        assert!(sink.notifications.lock().unwrap().is_empty());
    }

    // ------------------------------------------------------------------
    // Convenience wrappers
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_confirm_and_cancel_send_literal_tokens() {
        let gateway = Arc::new(MockGateway::default());
        let store = Arc::new(MockStore::default());
        let coordinator = SessionCoordinator::new(gateway.clone(), store);
        coordinator.select_patient(patient("P001")).await;

        coordinator.confirm_order().await;
        coordinator.cancel_order().await;

        let requests = gateway.requests();
        assert_eq!(requests[0].message, "confirm");
        assert_eq!(requests[1].message, "cancel");
    }

    // ------------------------------------------------------------------
    // Voice
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_voice_turn_appends_transcript_and_reply() {
        let voice_response = VoiceResponse {
            transcript: "I need aspirin".to_string(),
            chat_response: reply("Adding aspirin to your preview."),
            audio_response_base64: Some({
                use base64::Engine as _;
                base64::engine::general_purpose::STANDARD.encode(b"tts-bytes")
            }),
        };
        let audio_sink = Arc::new(CapturingAudio::default());
        let store = Arc::new(MockStore::default());
        let gateway = MockGateway::with_voice_responses(vec![Ok(voice_response)]);
        let coordinator = SessionCoordinator::new(Arc::new(gateway), store)
            .with_audio(audio_sink.clone());
        coordinator.select_patient(patient("P001")).await;

        let outcome = coordinator.send_voice(b"fake-audio").await;
        assert_eq!(outcome, SendOutcome::Completed);

        let messages = coordinator.messages().await;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, MessageRole::User);
        assert_eq!(messages[0].content, "I need aspirin");
        assert_eq!(messages[1].content, "Adding aspirin to your preview.");
        assert_eq!(audio_sink.played.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_voice_without_transcript_appends_reply_only() {
        let voice_response = VoiceResponse {
            transcript: String::new(),
            chat_response: reply("I couldn't understand the audio. Please try speaking again."),
            audio_response_base64: None,
        };
        let (coordinator, _store) =
            coordinator(MockGateway::with_voice_responses(vec![Ok(voice_response)]));
        coordinator.select_patient(patient("P001")).await;

        coordinator.send_voice(b"static").await;
        let messages = coordinator.messages().await;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, MessageRole::Assistant);
    }

    #[tokio::test]
    async fn test_empty_audio_is_rejected() {
        let (coordinator, _store) = coordinator(MockGateway::default());
        coordinator.select_patient(patient("P001")).await;
        assert_eq!(coordinator.send_voice(&[]).await, SendOutcome::Rejected);
    }

    #[tokio::test]
    async fn test_voice_failure_appends_fallback() {
        let (coordinator, _store) = coordinator(MockGateway::with_voice_responses(vec![Err(
            PharmaError::gateway("boom"),
        )]));
        coordinator.select_patient(patient("P001")).await;

        coordinator.send_voice(b"audio").await;
        let messages = coordinator.messages().await;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, FALLBACK_REPLY);
    }
}
