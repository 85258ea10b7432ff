//! Per-reply helpfulness feedback.
//!
//! Each bot message gets one [`FeedbackSession`]. A rating is sent straight
//! away unless the comment box is open, in which case it waits for an explicit
//! send. Once the endpoint has accepted a record the session is closed for good.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::errors::{ChatError, ChatResult};
use crate::transport::FeedbackTransport;
use crate::types::{FeedbackRecord, Rating};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackState {
    /// Nothing accepted yet; a remembered rating may still be pending
    Unrated,
    /// A record is in flight
    Submitting,
    /// The endpoint accepted a record; terminal
    Submitted,
}

/// What a feedback action ended up doing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackOutcome {
    /// A record was sent and accepted
    Submitted,
    /// The rating was remembered and waits for the comment to be sent
    Deferred,
    /// A record was sent and rejected; the rating is kept for a retry
    Failed,
    /// No record was sent
    Ignored,
}

/// Point-in-time view of a feedback session, for rendering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackSnapshot {
    pub state: FeedbackState,
    pub rating: Option<Rating>,
    pub comment_open: bool,
    pub draft_comment: String,
}

#[derive(Debug)]
struct FeedbackInner {
    state: FeedbackState,
    rating: Option<Rating>,
    comment_open: bool,
    draft_comment: String,
}

/// Marks a record as in flight. Unless settled, dropping it (a cancelled
/// submit) puts the session back to `Unrated` so the rating can be retried.
struct InFlight<'a> {
    session: &'a FeedbackSession,
    settled: bool,
}

impl<'a> InFlight<'a> {
    fn begin(session: &'a FeedbackSession, inner: &mut FeedbackInner) -> Self {
        inner.state = FeedbackState::Submitting;
        Self {
            session,
            settled: false,
        }
    }

    fn settle(mut self, state: FeedbackState) {
        self.session.lock().state = state;
        self.settled = true;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut inner = self.session.lock();
        if inner.state == FeedbackState::Submitting {
            debug!(message_id = %self.session.message_id, "Feedback submit cancelled");
            inner.state = FeedbackState::Unrated;
        }
    }
}

#[derive(Debug)]
pub struct FeedbackSession {
    message_id: String,
    session_id: String,
    transport: Arc<dyn FeedbackTransport>,
    timeout: Duration,
    inner: Mutex<FeedbackInner>,
}

impl FeedbackSession {
    pub fn new(
        message_id: impl Into<String>,
        session_id: impl Into<String>,
        transport: Arc<dyn FeedbackTransport>,
        timeout: Duration,
    ) -> Self {
        Self {
            message_id: message_id.into(),
            session_id: session_id.into(),
            transport,
            timeout,
            inner: Mutex::new(FeedbackInner {
                state: FeedbackState::Unrated,
                rating: None,
                comment_open: false,
                draft_comment: String::new(),
            }),
        }
    }

    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    fn lock(&self) -> MutexGuard<'_, FeedbackInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> FeedbackState {
        self.lock().state
    }

    pub fn snapshot(&self) -> FeedbackSnapshot {
        let inner = self.lock();
        FeedbackSnapshot {
            state: inner.state,
            rating: inner.rating,
            comment_open: inner.comment_open,
            draft_comment: inner.draft_comment.clone(),
        }
    }

    /// Thumbs up / thumbs down.
    pub async fn rate(&self, rating: Rating) -> FeedbackOutcome {
        let (record, in_flight) = {
            let mut inner = self.lock();
            if inner.state != FeedbackState::Unrated {
                debug!(message_id = %self.message_id, state = ?inner.state, "Ignoring rating");
                return FeedbackOutcome::Ignored;
            }

            inner.rating = Some(rating);
            if inner.comment_open {
                return FeedbackOutcome::Deferred;
            }

            let in_flight = InFlight::begin(self, &mut inner);
            (self.record(rating, String::new()), in_flight)
        };

        self.deliver(record, in_flight).await
    }

    /// Open or close the comment box. Returns whether it is now open.
    pub fn toggle_comment(&self) -> bool {
        let mut inner = self.lock();
        if inner.state == FeedbackState::Submitted {
            return false;
        }
        inner.comment_open = !inner.comment_open;
        inner.comment_open
    }

    /// Replace the draft comment. Returns false once feedback has been submitted.
    pub fn set_comment(&self, text: impl Into<String>) -> bool {
        let mut inner = self.lock();
        if inner.state == FeedbackState::Submitted {
            return false;
        }
        inner.draft_comment = text.into();
        true
    }

    /// Send the remembered rating together with the draft comment.
    ///
    /// The comment box closes whether or not the endpoint accepts the record.
    pub async fn send_comment(&self) -> FeedbackOutcome {
        let (record, in_flight) = {
            let mut inner = self.lock();
            if inner.state != FeedbackState::Unrated {
                return FeedbackOutcome::Ignored;
            }
            let Some(rating) = inner.rating else {
                debug!(message_id = %self.message_id, "No rating chosen, comment not sent");
                return FeedbackOutcome::Ignored;
            };

            inner.comment_open = false;
            let in_flight = InFlight::begin(self, &mut inner);
            (self.record(rating, inner.draft_comment.clone()), in_flight)
        };

        self.deliver(record, in_flight).await
    }

    fn record(&self, rating: Rating, comment: String) -> FeedbackRecord {
        FeedbackRecord {
            message_id: self.message_id.clone(),
            session_id: self.session_id.clone(),
            is_helpful: rating.is_helpful(),
            comment,
        }
    }

    async fn deliver(&self, record: FeedbackRecord, in_flight: InFlight<'_>) -> FeedbackOutcome {
        match self.submit_with_timeout(&record).await {
            Ok(()) => {
                in_flight.settle(FeedbackState::Submitted);
                info!(message_id = %self.message_id, is_helpful = record.is_helpful, "Feedback submitted");
                FeedbackOutcome::Submitted
            }
            Err(e) => {
                in_flight.settle(FeedbackState::Unrated);
                warn!(message_id = %self.message_id, "Failed to submit feedback: {}", e);
                FeedbackOutcome::Failed
            }
        }
    }

    async fn submit_with_timeout(&self, record: &FeedbackRecord) -> ChatResult<()> {
        match tokio::time::timeout(self.timeout, self.transport.submit(record)).await {
            Ok(result) => result,
            Err(_) => Err(ChatError::Timeout(self.timeout)),
        }
    }
}
