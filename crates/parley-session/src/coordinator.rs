// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The session coordinator.
//!
//! `send_turn` runs strictly in order: identity and connectivity gates, quota
//! check, optimistic append of a pending requester message, optional upload,
//! hand-off (`delivered`), one assistant request under a deadline, then reply
//! append and quota commit. Rejections happen before the transcript is
//! touched. Locks on the transcript, quota, and context are never held
//! across an await on a collaborator.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use parley_attachments::{AttachmentUploader, PreviewStore, UploadFailure, UploadReport};
use parley_core::{
    AssistantAdapter, AssistantRequest, Connectivity, ConversationId, ExportSink, Identity,
    Lifecycle, Message, MessageId, ParleyError, QuotaKind, QuotaSource, QuotaState, RawFile,
    RequestMetadata, TransferAdapter, UploadEvent,
};
use parley_quota::QuotaTracker;
use parley_transcript::{MessagePatch, Transcript};
use tokio::sync::{Mutex, RwLock, mpsc, watch};
use tracing::{debug, info, warn};

use crate::context::{ContextSnapshot, SessionContext};
use crate::export::{ExportDocument, ExportReceipt, export_file_name};
use crate::settings::SessionSettings;
use crate::state::TurnState;

/// Content used for a requester message that carries only attachments.
pub const ATTACHMENT_PLACEHOLDER: &str = "[attachment]";

/// External collaborators a coordinator talks to.
#[derive(Clone)]
pub struct SessionDeps {
    pub assistant: Arc<dyn AssistantAdapter>,
    pub transfer: Arc<dyn TransferAdapter>,
    pub quota_source: Arc<dyn QuotaSource>,
    pub export_sink: Arc<dyn ExportSink>,
    pub previews: Arc<PreviewStore>,
}

/// Result of a successful turn.
#[derive(Debug)]
pub struct TurnOutcome {
    pub requester_id: MessageId,
    /// The appended reply. `None` if the requester message was removed while
    /// the request was in flight.
    pub reply: Option<Message>,
    /// Files that did not make it into the turn.
    pub upload_failures: Vec<UploadFailure>,
}

/// Quota tracker plus units held by turns that have passed the check but not
/// yet committed, so concurrent turns cannot oversubscribe the last slots.
#[derive(Debug)]
struct QuotaLedger {
    tracker: QuotaTracker,
    reserved_messages: u64,
    reserved_attachments: u64,
}

impl QuotaLedger {
    fn reserved(&mut self, kind: QuotaKind) -> &mut u64 {
        match kind {
            QuotaKind::Messages => &mut self.reserved_messages,
            QuotaKind::Attachments => &mut self.reserved_attachments,
        }
    }

    fn check_message(&self) -> Result<(), ParleyError> {
        self.tracker
            .require(QuotaKind::Messages, self.reserved_messages + 1)
    }

    fn try_reserve_message(&mut self) -> Result<(), ParleyError> {
        self.check_message()?;
        self.reserved_messages += 1;
        Ok(())
    }

    /// Reserve up to `wanted` attachment slots. Returns the budget granted
    /// (`None` = unlimited).
    fn reserve_attachments(&mut self, wanted: u64) -> Option<u64> {
        let remaining = self.tracker.remaining(QuotaKind::Attachments)?;
        let granted = remaining.saturating_sub(self.reserved_attachments).min(wanted);
        self.reserved_attachments += granted;
        Some(granted)
    }

    fn settle(&mut self, kind: QuotaKind, reserved: u64, used: u64) {
        let slot = self.reserved(kind);
        *slot = slot.saturating_sub(reserved);
        if used > 0 {
            self.tracker.commit(kind, used);
        }
    }
}

/// Orchestrates turns for one session.
pub struct SessionCoordinator {
    context: RwLock<SessionContext>,
    transcript: RwLock<Transcript>,
    quota: Mutex<QuotaLedger>,
    uploader: AttachmentUploader,
    assistant: Arc<dyn AssistantAdapter>,
    export_sink: Arc<dyn ExportSink>,
    previews: Arc<PreviewStore>,
    turns: DashMap<MessageId, TurnState>,
    upload_observer: Option<mpsc::UnboundedSender<UploadEvent>>,
    settings: SessionSettings,
}

impl SessionCoordinator {
    /// Start a session.
    ///
    /// Quota is hydrated from `deps.quota_source` (falling back to the
    /// configured default plan). If connectivity is `online` right now, the
    /// transcript starts with one synthetic welcome message.
    pub async fn start(
        deps: SessionDeps,
        identity: Option<Identity>,
        connectivity: watch::Receiver<Connectivity>,
        settings: SessionSettings,
    ) -> Self {
        let tracker = QuotaTracker::from_source(
            deps.quota_source.as_ref(),
            identity.as_ref(),
            settings.fallback_quota.clone(),
        )
        .await;

        let online = connectivity.borrow().can_send();
        let mut transcript = Transcript::new(Arc::clone(&deps.previews));
        if online {
            transcript.append(Message::assistant(settings.welcome_message.clone(), None));
        }

        let uploader = AttachmentUploader::new(
            deps.transfer,
            Arc::clone(&deps.previews),
            settings.max_file_bytes,
            settings.max_concurrent_transfers,
        );

        info!(
            authenticated = identity.is_some(),
            online,
            plan_tier = %tracker.plan_tier(),
            "session started"
        );

        Self {
            context: RwLock::new(SessionContext::new(identity, connectivity)),
            transcript: RwLock::new(transcript),
            quota: Mutex::new(QuotaLedger {
                tracker,
                reserved_messages: 0,
                reserved_attachments: 0,
            }),
            uploader,
            assistant: deps.assistant,
            export_sink: deps.export_sink,
            previews: deps.previews,
            turns: DashMap::new(),
            upload_observer: None,
            settings,
        }
    }

    /// Forward every upload event to `observer` (progress display).
    pub fn with_upload_observer(mut self, observer: mpsc::UnboundedSender<UploadEvent>) -> Self {
        self.upload_observer = Some(observer);
        self
    }

    /// Identity and connectivity gates. Returns the bound identity.
    async fn preflight(&self) -> Result<Identity, ParleyError> {
        let ctx = self.context.read().await;
        let identity = ctx.identity().cloned().ok_or(ParleyError::NotAuthenticated)?;
        let state = ctx.connectivity();
        if !state.can_send() {
            return Err(ParleyError::NotConnected { state });
        }
        Ok(identity)
    }

    fn begin_turn(&self, id: &MessageId) {
        debug!(message_id = %id, turn_state = %TurnState::QuotaChecking, "turn state");
        self.turns.insert(id.clone(), TurnState::QuotaChecking);
    }

    /// Advance a tracked turn. Turns whose message was removed stay untracked,
    /// so at most one entry exists per requester message in the transcript.
    fn set_turn(&self, id: &MessageId, state: TurnState) {
        if let Some(mut entry) = self.turns.get_mut(id) {
            debug!(message_id = %id, turn_state = %state, "turn state");
            *entry = state;
        }
    }

    /// Send one turn: `content` plus optional `files`.
    pub async fn send_turn(
        &self,
        content: &str,
        files: Vec<RawFile>,
    ) -> Result<TurnOutcome, ParleyError> {
        let body = if content.trim().is_empty() && !files.is_empty() {
            ATTACHMENT_PLACEHOLDER.to_string()
        } else {
            content.to_string()
        };
        self.run_turn(content, body, files).await
    }

    /// `content` goes to the assistant, `body` into the transcript.
    async fn run_turn(
        &self,
        content: &str,
        body: String,
        files: Vec<RawFile>,
    ) -> Result<TurnOutcome, ParleyError> {
        let identity = self.preflight().await?;

        let requester_id = MessageId::generate();
        self.begin_turn(&requester_id);
        let reservation = self.quota.lock().await.try_reserve_message();
        if let Err(e) = reservation {
            self.turns.remove(&requester_id);
            info!(error = %e, "turn rejected");
            return Err(e);
        }

        self.transcript
            .write()
            .await
            .append(Message::requester(requester_id.clone(), body));

        let report = if files.is_empty() {
            UploadReport::default()
        } else {
            self.set_turn(&requester_id, TurnState::Uploading);
            self.upload(&requester_id, files).await
        };

        self.transcript
            .write()
            .await
            .update_by_id(&requester_id, MessagePatch::lifecycle(Lifecycle::Delivered));
        self.set_turn(&requester_id, TurnState::AwaitingReply);

        let conversation_id = self.context.read().await.active_conversation().cloned();
        let plan_tier = self.quota.lock().await.tracker.plan_tier();
        let request = AssistantRequest {
            message: content.to_string(),
            identity_id: identity.id,
            conversation_id,
            attachments: report.attachments.iter().map(|a| a.descriptor()).collect(),
            metadata: RequestMetadata {
                timestamp: Utc::now(),
                plan_tier,
            },
        };

        let timeout = self.settings.request_timeout;
        let result = match tokio::time::timeout(timeout, self.assistant.send(request)).await {
            Ok(result) => result,
            Err(_) => Err(ParleyError::request_failed(format!(
                "assistant did not reply within {}s",
                timeout.as_secs_f64()
            ))),
        };

        match result {
            Ok(response) => {
                let reply = Message::assistant(response.reply.clone(), Some(response.metadata()));
                let appended = {
                    let mut transcript = self.transcript.write().await;
                    if transcript.get(&requester_id).is_some() {
                        transcript.append(reply.clone());
                        true
                    } else {
                        false
                    }
                };
                if appended {
                    if let Some(conversation) = response.conversation_id {
                        self.context.write().await.set_conversation(Some(conversation));
                    }
                } else {
                    debug!(message_id = %requester_id, "reply dropped, requester message was removed");
                }
                self.quota.lock().await.settle(QuotaKind::Messages, 1, 1);
                self.set_turn(&requester_id, TurnState::Settled(Lifecycle::Delivered));

                Ok(TurnOutcome {
                    requester_id,
                    reply: appended.then_some(reply),
                    upload_failures: report.failures,
                })
            }
            Err(e) => {
                warn!(message_id = %requester_id, error = %e, "assistant request failed");
                self.transcript
                    .write()
                    .await
                    .update_by_id(&requester_id, MessagePatch::lifecycle(Lifecycle::Failed));
                self.quota.lock().await.settle(QuotaKind::Messages, 1, 0);
                self.set_turn(&requester_id, TurnState::Settled(Lifecycle::Failed));
                Err(e)
            }
        }
    }

    /// Upload `files` for `requester_id`, patching the message as events arrive.
    async fn upload(&self, requester_id: &MessageId, files: Vec<RawFile>) -> UploadReport {
        let wanted = files.len() as u64;
        let budget = self.quota.lock().await.reserve_attachments(wanted);
        let reserved = budget.unwrap_or(0);

        let (tx, mut rx) = mpsc::unbounded_channel();
        let upload = self.uploader.upload(files, budget, Some(tx));
        let patch = async {
            while let Some(event) = rx.recv().await {
                self.apply_upload_event(requester_id, event).await;
            }
        };
        let (report, ()) = tokio::join!(upload, patch);

        self.quota
            .lock()
            .await
            .settle(QuotaKind::Attachments, reserved, report.succeeded());
        report
    }

    async fn apply_upload_event(&self, requester_id: &MessageId, event: UploadEvent) {
        if let Some(observer) = &self.upload_observer {
            let _ = observer.send(event.clone());
        }

        let (patch, orphan) = match event {
            UploadEvent::Staged { attachment, .. } | UploadEvent::Completed { attachment, .. } => {
                let preview = attachment.preview_ref.clone();
                (MessagePatch::upsert_attachment(attachment), preview)
            }
            UploadEvent::Failed {
                attachment_id: Some(id),
                ..
            } => (MessagePatch::remove_attachment(id), None),
            UploadEvent::Failed { .. } | UploadEvent::Progress { .. } => return,
        };

        let applied = self.transcript.write().await.update_by_id(requester_id, patch);
        if !applied {
            // Message is gone; nothing else will release this preview.
            if let Some(preview) = orphan {
                self.previews.release(&preview);
            }
        }
    }

    /// Retry a requester message: remove it and its dependent reply, then
    /// send its content again as a new turn. Attachments are not re-sent, so
    /// an attachment-only message is retried with an empty request body.
    pub async fn retry(&self, message_id: &MessageId) -> Result<TurnOutcome, ParleyError> {
        {
            let transcript = self.transcript.read().await;
            let message = transcript.get(message_id).ok_or_else(|| ParleyError::NotFound {
                id: message_id.clone(),
            })?;
            if !message.is_requester() {
                return Err(ParleyError::NotRetryable {
                    id: message_id.clone(),
                });
            }
        }
        // Keep the original if the new turn would be rejected anyway.
        self.preflight().await?;
        self.quota.lock().await.check_message()?;

        let (content, body) = {
            let mut transcript = self.transcript.write().await;
            let message = transcript.get(message_id).ok_or_else(|| ParleyError::NotFound {
                id: message_id.clone(),
            })?;
            let body = message.content.clone();
            let content = if body == ATTACHMENT_PLACEHOLDER && !message.attachments.is_empty() {
                String::new()
            } else {
                body.clone()
            };
            let reply_id = transcript.dependent_reply(message_id).map(|m| m.id.clone());
            transcript.remove_by_id(message_id);
            if let Some(reply_id) = reply_id {
                transcript.remove_by_id(&reply_id);
            }
            (content, body)
        };
        self.turns.remove(message_id);
        info!(message_id = %message_id, "retrying turn");

        self.run_turn(&content, body, Vec::new()).await
    }

    /// Remove exactly one message, whatever its author.
    pub async fn delete(&self, message_id: &MessageId) -> Result<(), ParleyError> {
        if !self.transcript.write().await.remove_by_id(message_id) {
            return Err(ParleyError::NotFound {
                id: message_id.clone(),
            });
        }
        self.turns.remove(message_id);
        Ok(())
    }

    pub async fn search(&self, query: &str) -> Vec<Message> {
        self.transcript.read().await.search(query)
    }

    /// Serialize the transcript and hand it to the export sink.
    ///
    /// Failure leaves the session untouched.
    pub async fn export(&self) -> Result<ExportReceipt, ParleyError> {
        let identity = self.context.read().await.identity().cloned();
        let messages = self.snapshot().await;
        let exported_at = Utc::now();
        let document = ExportDocument::new(identity.as_ref(), exported_at, &messages);
        let contents = serde_json::to_vec_pretty(&document).map_err(|e| ParleyError::Export {
            message: format!("failed to serialize transcript: {e}"),
            source: Some(Box::new(e)),
        })?;

        let file_name = export_file_name(exported_at.date_naive());
        let location = self.export_sink.save(&file_name, &contents).await?;
        info!(location = %location, messages = document.message_count, "transcript exported");

        Ok(ExportReceipt {
            file_name,
            location,
            message_count: document.message_count,
        })
    }

    /// Empty the transcript and forget the conversation. Quota is untouched.
    pub async fn clear(&self) {
        self.transcript.write().await.clear();
        self.context.write().await.set_conversation(None);
        self.turns.clear();
    }

    /// Ordered copy of the transcript.
    pub async fn snapshot(&self) -> Vec<Message> {
        self.transcript.read().await.all().to_vec()
    }

    pub async fn stats(&self) -> parley_transcript::TranscriptStats {
        self.transcript.read().await.stats()
    }

    pub async fn quota(&self) -> QuotaState {
        self.quota.lock().await.tracker.state()
    }

    /// Start a new quota period (usage back to zero).
    pub async fn reset_quota_period(&self) {
        self.quota.lock().await.tracker.reset_period();
    }

    pub async fn connectivity(&self) -> Connectivity {
        self.context.read().await.connectivity()
    }

    pub async fn identity(&self) -> Option<Identity> {
        self.context.read().await.identity().cloned()
    }

    pub async fn active_conversation(&self) -> Option<ConversationId> {
        self.context.read().await.active_conversation().cloned()
    }

    pub async fn context(&self) -> ContextSnapshot {
        self.context.read().await.snapshot()
    }

    pub async fn bind_identity(&self, identity: Identity) {
        info!(user_id = %identity.id, "identity bound");
        self.context.write().await.bind_identity(identity);
    }

    pub async fn sign_out(&self) {
        info!("signed out");
        self.context.write().await.sign_out();
    }

    pub fn turn_state(&self, message_id: &MessageId) -> Option<TurnState> {
        self.turns.get(message_id).map(|s| *s)
    }

    /// Turns that have not settled yet.
    pub fn turns_in_flight(&self) -> usize {
        self.turns.iter().filter(|t| !t.value().is_settled()).count()
    }

    pub fn previews(&self) -> &Arc<PreviewStore> {
        &self.previews
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use parley_core::{Author, PlanTier};
    use parley_test_utils::{MockAssistant, MockExportSink, MockQuotaSource, MockTransfer};

    struct Fixture {
        coordinator: SessionCoordinator,
        assistant: Arc<MockAssistant>,
        transfer: Arc<MockTransfer>,
        connectivity: watch::Sender<Connectivity>,
    }

    fn quota(used: u64, limit: Option<u64>, attachment_limit: Option<u64>) -> QuotaState {
        QuotaState {
            plan_tier: PlanTier::Free,
            messages_used: used,
            message_limit: limit,
            attachments_used: 0,
            attachment_limit,
        }
    }

    async fn fixture_with(
        state: QuotaState,
        identity: Option<Identity>,
        online: Connectivity,
        timeout: Duration,
    ) -> Fixture {
        let assistant = Arc::new(MockAssistant::new());
        let transfer = Arc::new(MockTransfer::new());
        let (connectivity, rx) = watch::channel(online);
        let deps = SessionDeps {
            assistant: assistant.clone(),
            transfer: transfer.clone(),
            quota_source: Arc::new(MockQuotaSource::new(state)),
            export_sink: Arc::new(MockExportSink::new()),
            previews: Arc::new(PreviewStore::new()),
        };
        let settings = SessionSettings {
            request_timeout: timeout,
            welcome_message: "welcome".into(),
            max_file_bytes: 4 * 1024 * 1024,
            max_concurrent_transfers: 2,
            fallback_quota: quota(0, Some(50), Some(10)),
        };
        let coordinator = SessionCoordinator::start(deps, identity, rx, settings).await;
        Fixture {
            coordinator,
            assistant,
            transfer,
            connectivity,
        }
    }

    async fn fixture(state: QuotaState) -> Fixture {
        fixture_with(
            state,
            Some(Identity::new("u-1", "Ada")),
            Connectivity::Online,
            Duration::from_secs(5),
        )
        .await
    }

    #[tokio::test]
    async fn online_start_has_exactly_one_welcome_message() {
        let f = fixture(quota(0, Some(50), None)).await;
        let messages = f.coordinator.snapshot().await;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].author, Author::Assistant);
        assert_eq!(messages[0].content, "welcome");
    }

    #[tokio::test]
    async fn offline_start_has_no_welcome_and_rejects_turns() {
        let f = fixture_with(
            quota(0, Some(50), None),
            Some(Identity::new("u", "U")),
            Connectivity::Offline,
            Duration::from_secs(5),
        )
        .await;
        assert!(f.coordinator.snapshot().await.is_empty());
        let err = f.coordinator.send_turn("hi", vec![]).await.unwrap_err();
        assert!(matches!(
            err,
            ParleyError::NotConnected {
                state: Connectivity::Offline
            }
        ));
        assert!(f.coordinator.snapshot().await.is_empty());
        assert_eq!(f.assistant.call_count(), 0);
    }

    #[tokio::test]
    async fn degraded_connectivity_rejects_turns() {
        let f = fixture(quota(0, Some(50), None)).await;
        f.connectivity.send_replace(Connectivity::Degraded);
        let err = f.coordinator.send_turn("hi", vec![]).await.unwrap_err();
        assert!(matches!(err, ParleyError::NotConnected { .. }));
    }

    #[tokio::test]
    async fn unauthenticated_turn_is_rejected_before_mutation() {
        let f = fixture_with(
            quota(0, Some(50), None),
            None,
            Connectivity::Online,
            Duration::from_secs(5),
        )
        .await;
        let before = f.coordinator.snapshot().await;
        let err = f.coordinator.send_turn("hi", vec![]).await.unwrap_err();
        assert!(matches!(err, ParleyError::NotAuthenticated));
        assert_eq!(f.coordinator.snapshot().await, before);
    }

    #[tokio::test]
    async fn successful_turn_appends_pair_and_commits_quota() {
        let f = fixture(quota(0, Some(50), None)).await;
        f.assistant.push_reply("hello back").await;
        let outcome = f.coordinator.send_turn("hello", vec![]).await.unwrap();

        let messages = f.coordinator.snapshot().await;
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1].id, outcome.requester_id);
        assert_eq!(messages[1].lifecycle, Lifecycle::Delivered);
        assert_eq!(messages[2].content, "hello back");
        assert!(messages[2].response_metadata.is_some());
        assert_eq!(f.coordinator.quota().await.messages_used, 1);
        assert_eq!(
            f.coordinator.turn_state(&outcome.requester_id),
            Some(TurnState::Settled(Lifecycle::Delivered))
        );
        assert_eq!(
            f.coordinator.active_conversation().await,
            Some(ConversationId::from("mock-conversation"))
        );
    }

    #[tokio::test]
    async fn request_carries_identity_conversation_and_tier() {
        let f = fixture(quota(0, Some(50), None)).await;
        f.coordinator.send_turn("first", vec![]).await.unwrap();
        f.coordinator.send_turn("second", vec![]).await.unwrap();

        let requests = f.assistant.requests().await;
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].identity_id.as_str(), "u-1");
        assert!(requests[0].conversation_id.is_none());
        assert_eq!(
            requests[1].conversation_id,
            Some(ConversationId::from("mock-conversation"))
        );
        assert_eq!(requests[1].metadata.plan_tier, PlanTier::Free);
    }

    #[tokio::test]
    async fn quota_exceeded_leaves_transcript_unchanged() {
        let f = fixture(quota(50, Some(50), None)).await;
        let before = f.coordinator.snapshot().await;
        let err = f.coordinator.send_turn("again", vec![]).await.unwrap_err();
        assert!(matches!(
            err,
            ParleyError::QuotaExceeded {
                kind: QuotaKind::Messages
            }
        ));
        assert_eq!(f.coordinator.snapshot().await, before);
        assert_eq!(f.assistant.call_count(), 0);
    }

    #[tokio::test]
    async fn failed_request_marks_failed_and_commits_nothing() {
        let f = fixture(quota(0, Some(50), None)).await;
        f.assistant.push_failure("boom").await;
        let err = f.coordinator.send_turn("hi", vec![]).await.unwrap_err();
        assert!(err.is_retryable());

        let messages = f.coordinator.snapshot().await;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].lifecycle, Lifecycle::Failed);
        assert_eq!(f.coordinator.quota().await.messages_used, 0);
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn failed_request_is_logged() {
        let f = fixture(quota(0, Some(50), None)).await;
        f.assistant.push_failure("gateway down").await;
        f.coordinator.send_turn("hi", vec![]).await.unwrap_err();
        assert!(logs_contain("assistant request failed"));
        assert!(logs_contain("gateway down"));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_is_a_transport_failure() {
        let f = fixture_with(
            quota(0, Some(50), None),
            Some(Identity::new("u", "U")),
            Connectivity::Online,
            Duration::from_secs(2),
        )
        .await;
        f.assistant.set_delay(Duration::from_secs(10));
        let err = f.coordinator.send_turn("slow", vec![]).await.unwrap_err();
        assert!(matches!(err, ParleyError::RequestFailed { .. }));
        let messages = f.coordinator.snapshot().await;
        assert_eq!(messages.last().unwrap().lifecycle, Lifecycle::Failed);
    }

    #[tokio::test]
    async fn attachment_only_turn_uses_placeholder() {
        let f = fixture(quota(0, Some(50), Some(10))).await;
        let file = RawFile::new("a.png", "image/png", vec![1; 64]);
        let outcome = f.coordinator.send_turn("", vec![file]).await.unwrap();

        let messages = f.coordinator.snapshot().await;
        let requester = &messages[1];
        assert_eq!(requester.id, outcome.requester_id);
        assert_eq!(requester.content, ATTACHMENT_PLACEHOLDER);
        assert_eq!(requester.attachments.len(), 1);
        assert!(requester.attachments[0].preview_ref.is_some());
        assert!(requester.attachments[0].remote_ref.is_some());
        assert_eq!(f.coordinator.quota().await.attachments_used, 1);

        let request = &f.assistant.requests().await[0];
        assert_eq!(request.message, "");
        assert_eq!(request.attachments.len(), 1);
        assert_eq!(request.attachments[0].name, "a.png");
    }

    #[tokio::test]
    async fn retrying_attachment_only_turn_sends_empty_body() {
        let f = fixture(quota(0, Some(50), Some(10))).await;
        f.assistant.push_failure("down").await;
        let file = RawFile::new("a.png", "image/png", vec![1; 64]);
        f.coordinator.send_turn("", vec![file]).await.unwrap_err();
        let failed_id = f.coordinator.snapshot().await[1].id.clone();

        let outcome = f.coordinator.retry(&failed_id).await.unwrap();
        let requests = f.assistant.requests().await;
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].message, "");
        assert!(requests[1].attachments.is_empty());

        let messages = f.coordinator.snapshot().await;
        let requester = messages
            .iter()
            .find(|m| m.id == outcome.requester_id)
            .unwrap();
        assert_eq!(requester.content, ATTACHMENT_PLACEHOLDER);
        assert!(requester.attachments.is_empty());
    }

    #[tokio::test]
    async fn partial_upload_failure_keeps_successful_files() {
        let f = fixture(quota(0, Some(50), Some(10))).await;
        f.transfer.fail_file("bad.pdf").await;
        let files = vec![
            RawFile::new("good.png", "image/png", vec![1; 8]),
            RawFile::new("bad.pdf", "application/pdf", vec![1; 8]),
        ];
        let outcome = f.coordinator.send_turn("see files", files).await.unwrap();

        assert_eq!(outcome.upload_failures.len(), 1);
        assert_eq!(outcome.upload_failures[0].file, "bad.pdf");
        let messages = f.coordinator.snapshot().await;
        let names: Vec<_> = messages[1]
            .attachments
            .iter()
            .map(|a| a.display_name.as_str())
            .collect();
        assert_eq!(names, vec!["good.png"]);
        assert_eq!(f.coordinator.quota().await.attachments_used, 1);
    }

    #[tokio::test]
    async fn attachment_budget_limits_files() {
        let f = fixture(quota(0, Some(50), Some(1))).await;
        let files = vec![
            RawFile::new("one.png", "image/png", vec![1; 8]),
            RawFile::new("two.png", "image/png", vec![1; 8]),
        ];
        let outcome = f.coordinator.send_turn("two files", files).await.unwrap();
        assert_eq!(outcome.upload_failures.len(), 1);
        assert!(matches!(
            outcome.upload_failures[0].error,
            ParleyError::QuotaExceeded {
                kind: QuotaKind::Attachments
            }
        ));
        assert_eq!(f.coordinator.quota().await.attachments_used, 1);
    }

    #[tokio::test]
    async fn retry_replaces_failed_message_with_one_new_turn() {
        let f = fixture(quota(0, Some(50), None)).await;
        f.assistant.push_failure("down").await;
        f.coordinator.send_turn("try me", vec![]).await.unwrap_err();
        let failed_id = f.coordinator.snapshot().await[1].id.clone();

        let outcome = f.coordinator.retry(&failed_id).await.unwrap();
        assert_ne!(outcome.requester_id, failed_id);
        assert_eq!(f.assistant.call_count(), 2);

        let messages = f.coordinator.snapshot().await;
        assert_eq!(messages.len(), 3);
        assert!(messages.iter().all(|m| m.id != failed_id));
        assert_eq!(messages[1].content, "try me");
        assert_eq!(f.coordinator.quota().await.messages_used, 1);
    }

    #[tokio::test]
    async fn retry_removes_dependent_reply() {
        let f = fixture(quota(0, Some(50), None)).await;
        let first = f.coordinator.send_turn("again please", vec![]).await.unwrap();
        let old_reply = first.reply.unwrap().id;

        f.coordinator.retry(&first.requester_id).await.unwrap();
        let messages = f.coordinator.snapshot().await;
        assert_eq!(messages.len(), 3);
        assert!(messages.iter().all(|m| m.id != old_reply));
    }

    #[tokio::test]
    async fn retry_rejects_unknown_and_assistant_messages() {
        let f = fixture(quota(0, Some(50), None)).await;
        let welcome = f.coordinator.snapshot().await[0].id.clone();
        assert!(matches!(
            f.coordinator.retry(&welcome).await,
            Err(ParleyError::NotRetryable { .. })
        ));
        assert!(matches!(
            f.coordinator.retry(&MessageId::generate()).await,
            Err(ParleyError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn retry_while_offline_keeps_original() {
        let f = fixture(quota(0, Some(50), None)).await;
        f.assistant.push_failure("down").await;
        f.coordinator.send_turn("keep me", vec![]).await.unwrap_err();
        let failed_id = f.coordinator.snapshot().await[1].id.clone();

        f.connectivity.send_replace(Connectivity::Offline);
        assert!(f.coordinator.retry(&failed_id).await.is_err());
        assert!(f.coordinator.snapshot().await.iter().any(|m| m.id == failed_id));
    }

    #[tokio::test]
    async fn delete_does_not_cascade() {
        let f = fixture(quota(0, Some(50), None)).await;
        let outcome = f.coordinator.send_turn("hello", vec![]).await.unwrap();
        f.coordinator.delete(&outcome.requester_id).await.unwrap();

        let messages = f.coordinator.snapshot().await;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].id, outcome.reply.unwrap().id);
        assert!(matches!(
            f.coordinator.delete(&outcome.requester_id).await,
            Err(ParleyError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn reply_for_removed_message_is_dropped_but_counted() {
        let f = Arc::new(fixture(quota(0, Some(50), None)).await);
        f.assistant.set_delay(Duration::from_millis(200));

        let sender = Arc::clone(&f);
        let turn = tokio::spawn(async move { sender.coordinator.send_turn("bye", vec![]).await });

        let pending_id = loop {
            let snapshot = f.coordinator.snapshot().await;
            if let Some(m) = snapshot.iter().find(|m| m.content == "bye") {
                break m.id.clone();
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        };
        f.coordinator.delete(&pending_id).await.unwrap();

        let outcome = turn.await.unwrap().unwrap();
        assert!(outcome.reply.is_none());
        assert_eq!(f.coordinator.snapshot().await.len(), 1);
        assert_eq!(f.coordinator.quota().await.messages_used, 1);
        assert!(f.coordinator.active_conversation().await.is_none());
        assert_eq!(f.coordinator.turn_state(&pending_id), None);
        assert_eq!(f.coordinator.turns_in_flight(), 0);
    }

    #[tokio::test]
    async fn deleting_message_mid_upload_discards_late_patches() {
        let f = Arc::new(fixture(quota(0, Some(50), Some(10))).await);
        f.transfer.set_step_delay(Duration::from_millis(30));
        let files = vec![
            RawFile::new("shot.png", "image/png", vec![3; 64]),
            RawFile::new("notes.txt", "text/plain", b"notes".to_vec()),
        ];

        let sender = Arc::clone(&f);
        let turn = tokio::spawn(async move { sender.coordinator.send_turn("", files).await });

        let pending_id = loop {
            let snapshot = f.coordinator.snapshot().await;
            if let Some(m) = snapshot.iter().find(|m| !m.attachments.is_empty()) {
                break m.id.clone();
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        };
        assert_eq!(f.coordinator.turns_in_flight(), 1);
        f.coordinator.delete(&pending_id).await.unwrap();

        let outcome = turn.await.unwrap().unwrap();
        assert_eq!(outcome.requester_id, pending_id);
        assert!(outcome.reply.is_none());
        assert!(outcome.upload_failures.is_empty());

        let messages = f.coordinator.snapshot().await;
        assert_eq!(messages.len(), 1);
        assert!(messages.iter().all(|m| m.attachments.is_empty()));
        assert!(f.coordinator.previews().is_empty());
        // Both transfers finished, so both count against the period.
        assert_eq!(f.coordinator.quota().await.attachments_used, 2);
        assert_eq!(f.coordinator.quota().await.messages_used, 1);
        assert_eq!(f.coordinator.turn_state(&pending_id), None);
    }

    #[tokio::test]
    async fn deleting_attachment_message_releases_previews() {
        let f = fixture(quota(0, Some(50), Some(10))).await;
        let file = RawFile::new("pic.png", "image/png", vec![9; 16]);
        let outcome = f.coordinator.send_turn("look", vec![file]).await.unwrap();
        assert_eq!(f.coordinator.previews().len(), 1);

        f.coordinator.delete(&outcome.requester_id).await.unwrap();
        assert!(f.coordinator.previews().is_empty());
    }

    #[tokio::test]
    async fn clear_resets_transcript_and_conversation_not_quota() {
        let f = fixture(quota(0, Some(50), None)).await;
        f.coordinator.send_turn("hello", vec![]).await.unwrap();
        f.coordinator.clear().await;

        assert!(f.coordinator.snapshot().await.is_empty());
        assert!(f.coordinator.active_conversation().await.is_none());
        assert_eq!(f.coordinator.quota().await.messages_used, 1);
    }

    #[tokio::test]
    async fn concurrent_turns_cannot_oversubscribe_last_slot() {
        let f = Arc::new(fixture(quota(49, Some(50), None)).await);
        f.assistant.set_delay(Duration::from_millis(50));

        let a = {
            let f = Arc::clone(&f);
            tokio::spawn(async move { f.coordinator.send_turn("a", vec![]).await })
        };
        let b = {
            let f = Arc::clone(&f);
            tokio::spawn(async move { f.coordinator.send_turn("b", vec![]).await })
        };
        let results = [a.await.unwrap(), b.await.unwrap()];

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert_eq!(f.coordinator.quota().await.messages_used, 50);
    }

    #[tokio::test]
    async fn upload_observer_sees_progress() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let f = fixture(quota(0, Some(50), Some(10))).await;
        let coordinator = f.coordinator.with_upload_observer(tx);
        coordinator
            .send_turn("pic", vec![RawFile::new("p.png", "image/png", vec![0; 4])])
            .await
            .unwrap();

        let mut progress = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let UploadEvent::Progress { percent, .. } = event {
                progress.push(percent);
            }
        }
        assert_eq!(progress.last(), Some(&100));
        assert!(progress.windows(2).all(|w| w[0] < w[1]));
    }
}
