use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::{DataId, QuestionId, SessionId, UserId};
use crate::model::message::{Message, MessageMeta, Speaker};

//
// ─── PHASE ─────────────────────────────────────────────────────────────────────
//

/// Coarse-grained stage of a verification attempt.
///
/// Phases only ever advance `Uploading → Authenticating → Result`;
/// the sole way back is replacing the whole session via reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Waiting for transaction data to be supplied.
    Uploading,
    /// Question/answer exchange is running.
    Authenticating,
    /// A verdict has been reached.
    Result,
}

//
// ─── AUTH STATUS ───────────────────────────────────────────────────────────────
//

/// Outcome state reported by the verification service after each answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthStatus {
    InProgress,
    Success,
    Failed,
}

impl AuthStatus {
    /// True once the service has stopped asking questions.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::InProgress)
    }
}

/// Error parsing a wire status string.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown authentication status: {0}")]
pub struct StatusParseError(pub String);

impl FromStr for AuthStatus {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_progress" => Ok(Self::InProgress),
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            other => Err(StatusParseError(other.to_string())),
        }
    }
}

impl fmt::Display for AuthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::InProgress => "in_progress",
            Self::Success => "success",
            Self::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

//
// ─── VERDICT ───────────────────────────────────────────────────────────────────
//

/// Terminal outcome of a verification attempt.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub final_score: f64,
    pub status: AuthStatus,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// The entire client-visible truth of one verification attempt.
///
/// Exclusively owned and mutated by the session controller; the
/// presentation layer only reads snapshots. Fields are private so the
/// transcript and progression invariants cannot be broken from outside:
///
/// - at most one placeholder message, always the last entry when present,
///   removed before any real message is appended;
/// - `current_question_id` is set only while a delivered question awaits
///   an answer;
/// - `verdict` is set exactly when the phase reaches `Result`.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    phase: Phase,
    user_id: UserId,
    data_id: Option<DataId>,
    session_id: Option<SessionId>,
    current_question_id: Option<QuestionId>,
    total_transactions: Option<u32>,
    transcript: Vec<Message>,
    is_loading: bool,
    error: Option<String>,
    verdict: Option<Verdict>,
}

impl Session {
    /// Initial state: `Uploading`, a single bot greeting in the transcript.
    #[must_use]
    pub fn new(user_id: UserId, greeting: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            phase: Phase::Uploading,
            user_id,
            data_id: None,
            session_id: None,
            current_question_id: None,
            total_transactions: None,
            transcript: vec![Message::bot(greeting, now)],
            is_loading: false,
            error: None,
            verdict: None,
        }
    }

    // ─── Reads ─────────────────────────────────────────────────────────────

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    #[must_use]
    pub fn data_id(&self) -> Option<&DataId> {
        self.data_id.as_ref()
    }

    #[must_use]
    pub fn session_id(&self) -> Option<&SessionId> {
        self.session_id.as_ref()
    }

    #[must_use]
    pub fn current_question_id(&self) -> Option<&QuestionId> {
        self.current_question_id.as_ref()
    }

    #[must_use]
    pub fn total_transactions(&self) -> Option<u32> {
        self.total_transactions
    }

    #[must_use]
    pub fn transcript(&self) -> &[Message] {
        &self.transcript
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    #[must_use]
    pub fn verdict(&self) -> Option<Verdict> {
        self.verdict
    }

    #[must_use]
    pub fn has_placeholder(&self) -> bool {
        self.transcript
            .last()
            .is_some_and(Message::is_placeholder)
    }

    /// Number of answers the user has sent so far.
    #[must_use]
    pub fn questions_asked(&self) -> usize {
        self.transcript
            .iter()
            .filter(|m| m.speaker() == Speaker::User && !m.text().is_empty())
            .count()
    }

    /// Number of answers graded as correct so far.
    #[must_use]
    pub fn questions_correct(&self) -> usize {
        self.transcript
            .iter()
            .filter(|m| m.meta().is_some_and(|meta| meta.was_correct == Some(true)))
            .count()
    }

    /// `(current, total)` from the most recently delivered question, if any.
    #[must_use]
    pub fn question_progress(&self) -> Option<(u32, u32)> {
        self.transcript.iter().rev().find_map(|m| {
            let meta = m.meta()?;
            Some((meta.question_number?, meta.total_questions?))
        })
    }

    // ─── Transcript ────────────────────────────────────────────────────────

    /// Appends a bot message, removing any pending placeholder first.
    pub fn push_bot(&mut self, text: impl Into<String>, now: DateTime<Utc>) {
        self.clear_placeholder();
        self.transcript.push(Message::bot(text, now));
    }

    /// Appends an annotated bot message, removing any pending placeholder first.
    pub fn push_bot_with_meta(
        &mut self,
        text: impl Into<String>,
        meta: MessageMeta,
        now: DateTime<Utc>,
    ) {
        self.clear_placeholder();
        self.transcript.push(Message::bot(text, now).with_meta(meta));
    }

    /// Appends a user message, removing any pending placeholder first.
    pub fn push_user(&mut self, text: impl Into<String>, now: DateTime<Utc>) {
        self.clear_placeholder();
        self.transcript.push(Message::user(text, now));
    }

    /// Appends a message from the given speaker.
    pub fn push_note(&mut self, speaker: Speaker, text: impl Into<String>, now: DateTime<Utc>) {
        match speaker {
            Speaker::Bot => self.push_bot(text, now),
            Speaker::User => self.push_user(text, now),
        }
    }

    /// Shows the typing indicator, replacing any existing one.
    pub fn show_placeholder(&mut self, now: DateTime<Utc>) {
        self.clear_placeholder();
        self.transcript.push(Message::placeholder(now));
    }

    /// Removes the typing indicator if present.
    pub fn clear_placeholder(&mut self) {
        if self.has_placeholder() {
            self.transcript.pop();
        }
    }

    // ─── Loading / errors ──────────────────────────────────────────────────

    /// Marks a request as outstanding and clears the last surfaced failure.
    pub fn begin_loading(&mut self) {
        self.is_loading = true;
        self.error = None;
    }

    pub fn finish_loading(&mut self) {
        self.is_loading = false;
    }

    pub fn set_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    // ─── Progression ───────────────────────────────────────────────────────

    /// Records a successful upload receipt.
    pub fn record_upload(&mut self, data_id: DataId, total_transactions: u32) {
        self.data_id = Some(data_id);
        self.total_transactions = Some(total_transactions);
    }

    /// Enters the question/answer exchange.
    pub fn begin_authentication(&mut self, session_id: SessionId) {
        self.session_id = Some(session_id);
        self.phase = Phase::Authenticating;
    }

    /// A question has been delivered and awaits an answer.
    pub fn set_current_question(&mut self, question_id: QuestionId) {
        self.current_question_id = Some(question_id);
    }

    /// The pending question has been consumed (answered or superseded).
    pub fn clear_current_question(&mut self) {
        self.current_question_id = None;
    }

    /// Reaches the terminal phase with the service's verdict.
    pub fn complete(&mut self, verdict: Verdict) {
        self.current_question_id = None;
        self.verdict = Some(verdict);
        self.phase = Phase::Result;
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────────
