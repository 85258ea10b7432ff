use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::config::ClientConfig;
use crate::errors::{ChatError, ChatResult};
use crate::feedback::FeedbackSession;
use crate::ids::{IdGenerator, TimestampIdGenerator};
use crate::protocol::{ProtocolAdapter, TRANSPORT_APOLOGY};
use crate::transport::{
    build_http_client, ChatTransport, FeedbackTransport, HttpBackend, HttpMessageArchive,
    MessageArchive,
};
use crate::types::{ArchivedMessage, Message, RequestPayload, Role};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Holds the pending flag for the duration of one exchange and clears it on
/// every exit path.
struct PendingGuard<'a>(&'a AtomicBool);

impl<'a> PendingGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Builder for [`ConversationSession`]
#[derive(Debug)]
pub struct SessionBuilder {
    chat: Arc<dyn ChatTransport>,
    feedback: Arc<dyn FeedbackTransport>,
    archive: Option<Arc<dyn MessageArchive>>,
    ids: Arc<dyn IdGenerator>,
    adapter: ProtocolAdapter,
    timeout: Duration,
}

impl SessionBuilder {
    pub fn adapter(mut self, adapter: ProtocolAdapter) -> Self {
        self.adapter = adapter;
        self
    }

    pub fn id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn archive(mut self, archive: Arc<dyn MessageArchive>) -> Self {
        self.archive = Some(archive);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Assigns the session id and returns an empty session.
    pub fn start(self) -> ConversationSession {
        let session_id = self.ids.new_id();
        info!(session_id = %session_id, "Conversation session started");

        ConversationSession {
            session_id,
            adapter: self.adapter,
            ids: self.ids,
            chat: self.chat,
            feedback_transport: self.feedback,
            archive: self.archive,
            timeout: self.timeout,
            log: Mutex::new(Vec::new()),
            feedback: Mutex::new(HashMap::new()),
            pending: AtomicBool::new(false),
        }
    }
}

/// The ordered message log of one conversation and the exchange that grows it
#[derive(Debug)]
pub struct ConversationSession {
    session_id: String,
    adapter: ProtocolAdapter,
    ids: Arc<dyn IdGenerator>,
    chat: Arc<dyn ChatTransport>,
    feedback_transport: Arc<dyn FeedbackTransport>,
    archive: Option<Arc<dyn MessageArchive>>,
    timeout: Duration,
    log: Mutex<Vec<Message>>,
    feedback: Mutex<HashMap<String, Arc<FeedbackSession>>>,
    pending: AtomicBool,
}

impl ConversationSession {
    pub fn builder(
        chat: Arc<dyn ChatTransport>,
        feedback: Arc<dyn FeedbackTransport>,
    ) -> SessionBuilder {
        SessionBuilder {
            chat,
            feedback,
            archive: None,
            ids: Arc::new(TimestampIdGenerator::new()),
            adapter: ProtocolAdapter::default(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Start a session talking HTTP to the configured endpoints
    pub fn from_config(config: &ClientConfig) -> ChatResult<Self> {
        let client = build_http_client(config)?;
        let backend = Arc::new(HttpBackend::new(client.clone(), config));

        let mut builder = Self::builder(backend.clone(), backend)
            .adapter(ProtocolAdapter::new(
                config.request_format(),
                config.reply_style(),
            ))
            .timeout(config.request_timeout());

        if let Some(endpoint) = config.archive_endpoint() {
            debug!("Archiving messages to {}", endpoint);
            builder = builder.archive(Arc::new(HttpMessageArchive::new(client, endpoint)));
        }

        Ok(builder.start())
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn adapter(&self) -> &ProtocolAdapter {
        &self.adapter
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    fn log(&self) -> MutexGuard<'_, Vec<Message>> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn feedback_sessions(&self) -> MutexGuard<'_, HashMap<String, Arc<FeedbackSession>>> {
        self.feedback.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the log in display order
    pub fn messages(&self) -> Vec<Message> {
        self.log().clone()
    }

    pub fn len(&self) -> usize {
        self.log().len()
    }

    pub fn is_empty(&self) -> bool {
        self.log().is_empty()
    }

    pub fn latest_bot_message(&self) -> Option<Message> {
        self.log()
            .iter()
            .rev()
            .find(|message| message.role == Role::Bot)
            .cloned()
    }

    /// Feedback session attached to a bot message
    pub fn feedback(&self, message_id: &str) -> Option<Arc<FeedbackSession>> {
        self.feedback_sessions().get(message_id).cloned()
    }

    /// Send one user turn and append the reply.
    ///
    /// Returns `None` without touching the log when the text is blank or
    /// another exchange is still pending. Otherwise the user message is
    /// appended at once and exactly one bot message follows it, whether the
    /// exchange succeeds or not.
    #[instrument(skip(self, user_text), fields(session_id = %self.session_id))]
    pub async fn submit(&self, user_text: &str) -> Option<Message> {
        let text = user_text.trim();
        if text.is_empty() {
            return None;
        }

        let Some(_pending) = PendingGuard::acquire(&self.pending) else {
            debug!("Exchange already pending, ignoring submit");
            return None;
        };

        let user_message = Message::user(self.ids.new_id(), text.to_string());
        let payload = self
            .adapter
            .build_request(text, &self.session_id, &user_message.id);
        self.append(user_message);

        let bot_text = match self.send_with_timeout(&payload).await {
            Ok(reply) => self.adapter.interpret_response(&reply),
            Err(e) => {
                warn!(message_id = %payload.message_id, "Conversation request failed: {}", e);
                TRANSPORT_APOLOGY.to_string()
            }
        };

        let bot_message = Message::bot(self.ids.new_id(), bot_text);
        self.feedback_sessions().insert(
            bot_message.id.clone(),
            Arc::new(FeedbackSession::new(
                bot_message.id.clone(),
                self.session_id.clone(),
                self.feedback_transport.clone(),
                self.timeout,
            )),
        );
        self.append(bot_message.clone());

        Some(bot_message)
    }

    async fn send_with_timeout(&self, payload: &RequestPayload) -> ChatResult<Value> {
        match tokio::time::timeout(self.timeout, self.chat.send(payload)).await {
            Ok(result) => result,
            Err(_) => Err(ChatError::Timeout(self.timeout)),
        }
    }

    /// Push onto the log and hand the message to the archive in the background.
    fn append(&self, message: Message) {
        debug!(message_id = %message.id, role = %message.role, "Appending message");
        if let Some(archive) = &self.archive {
            let record = ArchivedMessage::new(&self.session_id, &message);
            let archive = Arc::clone(archive);
            let timeout = self.timeout;
            tokio::spawn(async move {
                match tokio::time::timeout(timeout, archive.archive(&record)).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => warn!(message_id = %record.message_id, "Message not archived: {}", e),
                    Err(_) => warn!(message_id = %record.message_id, "Message archive timed out"),
                }
            });
        }
        self.log().push(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feedback::{FeedbackOutcome, FeedbackState};
    use crate::protocol::ReplyStyle;
    use crate::types::{FeedbackRecord, Rating, RequestFormat};
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;

    /// Replays scripted replies in order and remembers every payload.
    #[derive(Debug, Default)]
    struct ScriptedChat {
        replies: Mutex<VecDeque<ChatResult<Value>>>,
        payloads: Mutex<Vec<RequestPayload>>,
    }

    impl ScriptedChat {
        fn new(replies: Vec<ChatResult<Value>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                payloads: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ChatTransport for ScriptedChat {
        async fn send(&self, payload: &RequestPayload) -> ChatResult<Value> {
            self.payloads.lock().unwrap().push(payload.clone());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(json!({})))
        }
    }

    /// Holds every request until the gate is opened.
    #[derive(Debug, Default)]
    struct GatedChat {
        gate: Notify,
    }

    #[async_trait]
    impl ChatTransport for GatedChat {
        async fn send(&self, _payload: &RequestPayload) -> ChatResult<Value> {
            self.gate.notified().await;
            Ok(json!({"success": true, "message": "done"}))
        }
    }

    #[derive(Debug)]
    struct StalledChat;

    #[async_trait]
    impl ChatTransport for StalledChat {
        async fn send(&self, _payload: &RequestPayload) -> ChatResult<Value> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(json!({}))
        }
    }

    #[derive(Debug, Default)]
    struct CountingFeedback {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl FeedbackTransport for CountingFeedback {
        async fn submit(&self, _record: &FeedbackRecord) -> ChatResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[derive(Debug, Default)]
    struct FailingArchive {
        seen: Mutex<Vec<ArchivedMessage>>,
    }

    #[async_trait]
    impl MessageArchive for FailingArchive {
        async fn archive(&self, message: &ArchivedMessage) -> ChatResult<()> {
            self.seen.lock().unwrap().push(message.clone());
            Err(ChatError::RequestError("archive offline".to_string()))
        }
    }

    /// Accepts messages and never finishes posting them.
    #[derive(Debug, Default)]
    struct StalledArchive {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl MessageArchive for StalledArchive {
        async fn archive(&self, _message: &ArchivedMessage) -> ChatResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        }
    }

    fn start(chat: Arc<dyn ChatTransport>) -> ConversationSession {
        ConversationSession::builder(chat, Arc::new(CountingFeedback::default())).start()
    }

    #[tokio::test]
    async fn test_submit_appends_user_then_bot() {
        let chat = ScriptedChat::new(vec![Ok(json!({
            "success": true,
            "type": "ingredient_substitutes",
            "substitutes": ["yogurt", "buttermilk"]
        }))]);
        let session = start(chat.clone());

        let bot = session.submit("  substitute for sour cream  ").await.unwrap();
        let log = session.messages();

        assert_eq!(log.len(), 2);
        assert_eq!(log[0].role, Role::User);
        assert_eq!(log[0].text, "substitute for sour cream");
        assert_eq!(log[1], bot);
        assert_eq!(
            bot.text,
            "Here are some substitutes for your ingredient:\n\n1. yogurt\n2. buttermilk"
        );
        assert_ne!(log[0].id, log[1].id);
        assert!(!session.is_pending());

        let payloads = chat.payloads.lock().unwrap();
        assert_eq!(payloads[0].session_id, session.session_id());
        assert_eq!(payloads[0].message_id, log[0].id);
        assert_eq!(payloads[0].user_text, "substitute for sour cream");
    }

    #[tokio::test]
    async fn test_blank_input_is_ignored() {
        let chat = ScriptedChat::new(vec![]);
        let session = start(chat.clone());

        assert!(session.submit("").await.is_none());
        assert!(session.submit(" \n\t").await.is_none());
        assert!(session.is_empty());
        assert!(chat.payloads.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_backend_failure_message_is_shown() {
        let chat = ScriptedChat::new(vec![Ok(json!({"success": false, "output": "no match"}))]);
        let session = start(chat);

        let bot = session.submit("durian pie").await.unwrap();
        assert_eq!(bot.text, "no match");
    }

    #[tokio::test]
    async fn test_transport_error_appends_apology() {
        let chat = ScriptedChat::new(vec![
            Err(ChatError::HttpError {
                status_code: 502,
                message: "bad gateway".to_string(),
            }),
            Ok(json!({"success": false, "message": "try eggs"})),
        ]);
        let session = start(chat);

        let bot = session.submit("eggs").await.unwrap();
        assert_eq!(bot.text, TRANSPORT_APOLOGY);
        assert!(!session.is_pending());

        // The session stays usable after a failed exchange.
        let bot = session.submit("eggs again").await.unwrap();
        assert_eq!(bot.text, "try eggs");
        assert_eq!(session.len(), 4);
    }

    #[tokio::test]
    async fn test_submit_while_pending_is_rejected() {
        let chat = Arc::new(GatedChat::default());
        let session = Arc::new(start(chat.clone()));

        let first = {
            let session = session.clone();
            tokio::spawn(async move { session.submit("first").await })
        };
        while session.len() < 1 {
            tokio::task::yield_now().await;
        }

        assert!(session.is_pending());
        assert!(session.submit("second").await.is_none());
        assert_eq!(session.len(), 1);

        chat.gate.notify_one();
        let bot = first.await.unwrap().unwrap();
        assert_eq!(bot.text, "done");
        assert_eq!(session.len(), 2);
        assert!(!session.is_pending());
    }

    #[tokio::test]
    async fn test_stalled_request_times_out_to_apology() {
        let session = ConversationSession::builder(
            Arc::new(StalledChat),
            Arc::new(CountingFeedback::default()),
        )
        .timeout(Duration::from_millis(20))
        .start();

        let bot = session.submit("anyone there?").await.unwrap();
        assert_eq!(bot.text, TRANSPORT_APOLOGY);
        assert!(!session.is_pending());
    }

    #[tokio::test]
    async fn test_bot_messages_get_feedback_sessions() {
        let feedback = Arc::new(CountingFeedback::default());
        let session = ConversationSession::builder(ScriptedChat::new(vec![]), feedback.clone())
            .adapter(ProtocolAdapter::new(RequestFormat::Simple, ReplyStyle::Bulleted))
            .start();

        session.submit("hello").await;
        let log = session.messages();
        assert!(session.feedback(&log[0].id).is_none());

        let bot = session.latest_bot_message().unwrap();
        let handle = session.feedback(&bot.id).unwrap();
        assert_eq!(handle.message_id(), bot.id);

        assert_eq!(handle.rate(Rating::Positive).await, FeedbackOutcome::Submitted);
        assert_eq!(handle.rate(Rating::Negative).await, FeedbackOutcome::Ignored);
        assert_eq!(
            session.feedback(&bot.id).unwrap().state(),
            FeedbackState::Submitted
        );
        assert_eq!(feedback.calls.load(Ordering::SeqCst), 1);
        assert_eq!(session.len(), 2);
    }

    #[tokio::test]
    async fn test_archive_failures_do_not_affect_log() {
        let archive = Arc::new(FailingArchive::default());
        let session = ConversationSession::builder(
            ScriptedChat::new(vec![Ok(json!({"success": false}))]),
            Arc::new(CountingFeedback::default()),
        )
        .archive(archive.clone())
        .start();

        let bot = session.submit("hi").await.unwrap();
        assert_eq!(bot.text, crate::protocol::FAILURE_APOLOGY);
        assert_eq!(session.len(), 2);

        for _ in 0..100 {
            if archive.seen.lock().unwrap().len() == 2 {
                break;
            }
            tokio::task::yield_now().await;
        }
        let seen = archive.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(seen.iter().any(|m| m.sender_type == Role::User && m.message_id == session.messages()[0].id));
        assert!(seen.iter().any(|m| m.sender_type == Role::Bot && m.message_id == bot.id));
        assert!(seen.iter().all(|m| m.session_id == session.session_id()));
    }

    #[tokio::test]
    async fn test_stalled_archive_does_not_delay_submit() {
        let archive = Arc::new(StalledArchive::default());
        let session = ConversationSession::builder(
            ScriptedChat::new(vec![Ok(json!({"success": true, "message": "ok"}))]),
            Arc::new(CountingFeedback::default()),
        )
        .archive(archive.clone())
        .timeout(Duration::from_secs(30))
        .start();

        let started = std::time::Instant::now();
        let bot = tokio::time::timeout(Duration::from_secs(5), session.submit("hi"))
            .await
            .expect("submit waited on the archive")
            .unwrap();

        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(bot.text, "ok");
        assert_eq!(session.len(), 2);
        assert!(!session.is_pending());

        for _ in 0..100 {
            if archive.calls.load(Ordering::SeqCst) == 2 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(archive.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_many_exchanges_keep_alternation_and_unique_ids() {
        let session = start(ScriptedChat::new(vec![]));
        for turn in 0..20 {
            session.submit(&format!("question {}", turn)).await;
        }

        let log = session.messages();
        assert_eq!(log.len(), 40);
        for pair in log.chunks(2) {
            assert_eq!(pair[0].role, Role::User);
            assert_eq!(pair[1].role, Role::Bot);
        }
        let ids: std::collections::HashSet<_> = log.iter().map(|m| m.id.clone()).collect();
        assert_eq!(ids.len(), 40);
    }
}
