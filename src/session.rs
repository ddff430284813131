//! Conversation session: the turn log behind the chat and explore screens.
//!
//! A session starts with one assistant greeting. [`ConversationSession::submit`]
//! appends the user's turn plus a pending assistant placeholder, then asks the
//! [`Assistant`] in a background task. When the answer arrives the placeholder
//! is updated in place. At most one turn is pending at a time; submissions
//! made while one is outstanding are ignored.
//!
//! The background task only holds a weak reference to the session, so
//! dropping the session while a request is in flight is safe: the late
//! answer is discarded.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::assistant::{Assistant, Reply, Source};
use crate::error::ClientError;
use crate::persona::{SessionKind, PENDING_PLACEHOLDER};

/// Process-wide turn id counter.
static NEXT_TURN_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct TurnId(u64);

impl TurnId {
    fn next() -> Self {
        TurnId(NEXT_TURN_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for TurnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    User,
    Assistant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnStatus {
    Final,
    /// Assistant turn waiting for its answer.
    Pending,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Turn {
    pub id: TurnId,
    pub text: String,
    pub origin: Origin,
    pub status: TurnStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<Source>,
    pub created_at: DateTime<Utc>,
}

impl Turn {
    fn new(origin: Origin, status: TurnStatus, text: impl Into<String>) -> Self {
        Self {
            id: TurnId::next(),
            text: text.into(),
            origin,
            status,
            sources: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == TurnStatus::Pending
    }
}

#[derive(Debug, Default)]
struct SessionState {
    turns: Vec<Turn>,
    compose: String,
    pending: Option<TurnId>,
}

struct Shared {
    kind: SessionKind,
    state: Mutex<SessionState>,
    revision: watch::Sender<u64>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, SessionState> {
        // Poisoned: take the state as-is.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn bump(&self) {
        self.revision.send_modify(|rev| *rev += 1);
    }

    /// Replace the pending turn `id` with the outcome of its request.
    fn resolve(&self, id: TurnId, outcome: Result<Reply, ClientError>) {
        {
            let mut state = self.lock();
            let Some(turn) = state.turns.iter_mut().find(|t| t.id == id) else {
                warn!(turn = %id, "Pending turn vanished before resolution");
                return;
            };

            match outcome {
                Ok(reply) => {
                    info!(
                        turn = %id,
                        kind = self.kind.as_str(),
                        sources = reply.sources.len(),
                        "Assistant turn resolved"
                    );
                    turn.text = reply.text;
                    turn.status = TurnStatus::Final;
                    if self.kind.wants_grounding() {
                        turn.sources = reply.sources;
                    }
                }
                Err(e) => {
                    warn!(
                        turn = %id,
                        kind = self.kind.as_str(),
                        code = e.code(),
                        error = %e,
                        "Assistant turn failed"
                    );
                    turn.text = e.user_message().to_string();
                    turn.status = TurnStatus::Failed;
                }
            }

            if state.pending == Some(id) {
                state.pending = None;
            }
        }
        self.bump();
    }
}

/// One conversation, owned by whatever is showing it.
pub struct ConversationSession {
    shared: Arc<Shared>,
    assistant: Arc<dyn Assistant>,
}

impl ConversationSession {
    /// Start a session seeded with the kind's greeting.
    pub fn new(kind: SessionKind, assistant: Arc<dyn Assistant>) -> Self {
        let greeting = Turn::new(Origin::Assistant, TurnStatus::Final, kind.greeting());
        let (revision, _) = watch::channel(0);
        Self {
            shared: Arc::new(Shared {
                kind,
                state: Mutex::new(SessionState {
                    turns: vec![greeting],
                    ..SessionState::default()
                }),
                revision,
            }),
            assistant,
        }
    }

    pub fn kind(&self) -> SessionKind {
        self.shared.kind
    }

    /// Snapshot of the turn log in chronological order.
    pub fn turns(&self) -> Vec<Turn> {
        self.shared.lock().turns.clone()
    }

    pub fn turn(&self, id: TurnId) -> Option<Turn> {
        self.shared.lock().turns.iter().find(|t| t.id == id).cloned()
    }

    pub fn last_turn(&self) -> Option<Turn> {
        self.shared.lock().turns.last().cloned()
    }

    pub fn is_pending(&self) -> bool {
        self.shared.lock().pending.is_some()
    }

    pub fn compose(&self) -> String {
        self.shared.lock().compose.clone()
    }

    /// Replace the not-yet-submitted input (called on every keystroke).
    pub fn set_compose(&self, text: impl Into<String>) {
        self.shared.lock().compose = text.into();
    }

    /// Receiver that changes whenever the turn log does.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.shared.revision.subscribe()
    }

    /// Submit whatever is in the compose buffer.
    pub fn submit_compose(&self) -> Option<JoinHandle<()>> {
        let text = self.compose();
        self.submit(&text)
    }

    /// Submit a user message.
    ///
    /// Ignored when the trimmed input is empty or a turn is already pending.
    /// Otherwise the request runs on a spawned task; the returned handle can
    /// be awaited or dropped. Outside a tokio runtime nothing is submitted
    /// and the log is left untouched.
    pub fn submit(&self, input: &str) -> Option<JoinHandle<()>> {
        let message = input.trim();
        if message.is_empty() {
            debug!("Ignoring empty submission");
            return None;
        }

        let runtime = match Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                warn!(error = %e, "No async runtime to run the request on, ignoring submission");
                return None;
            }
        };

        let pending_id = {
            let mut state = self.shared.lock();
            if let Some(pending) = state.pending {
                debug!(pending = %pending, "Ignoring submission while a reply is pending");
                return None;
            }

            state
                .turns
                .push(Turn::new(Origin::User, TurnStatus::Final, message));
            let placeholder =
                Turn::new(Origin::Assistant, TurnStatus::Pending, PENDING_PLACEHOLDER);
            let id = placeholder.id;
            state.turns.push(placeholder);
            state.compose.clear();
            state.pending = Some(id);
            id
        };
        self.shared.bump();

        info!(
            turn = %pending_id,
            kind = self.shared.kind.as_str(),
            "Submitted message"
        );

        let session: Weak<Shared> = Arc::downgrade(&self.shared);
        let assistant = Arc::clone(&self.assistant);
        let kind = self.shared.kind;
        let message = message.to_string();

        Some(runtime.spawn(async move {
            let outcome = assistant.reply(kind, &message).await;
            match session.upgrade() {
                Some(shared) => shared.resolve(pending_id, outcome),
                None => debug!(
                    turn = %pending_id,
                    "Session closed before reply arrived, discarding"
                ),
            }
        }))
    }
}
