use async_trait::async_trait;

use veriq_core::model::{AuthStatus, DataId, QuestionId, SessionId, UserId};

use crate::error::TransportError;

//
// ─── PAYLOADS ──────────────────────────────────────────────────────────────────
//

/// A CSV document ready to be sent to the upload endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvUpload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl CsvUpload {
    #[must_use]
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
        }
    }
}

/// What the service reports after ingesting a transaction dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadReceipt {
    pub data_id: DataId,
    pub total_transactions: u32,
    pub summary: String,
}

/// A knowledge question delivered to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionPrompt {
    pub text: String,
    pub number: u32,
    pub total: u32,
}

/// Grading of a single submitted answer.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerGrading {
    pub is_correct: bool,
    pub confidence: f64,
    pub explanation: String,
}

/// Where the exchange stands after an answer was graded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AuthProgress {
    pub status: AuthStatus,
    pub score: f64,
}

/// Full response to an answer submission: the grading plus the updated
/// authentication status.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerReview {
    pub grading: AnswerGrading,
    pub progress: AuthProgress,
}

/// Aggregate counters for a session, served by the status endpoint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionReport {
    pub questions_asked: u32,
    pub questions_correct: u32,
    pub status: AuthStatus,
}

//
// ─── PORT ──────────────────────────────────────────────────────────────────────
//

/// Contract for the remote verification service.
///
/// One method per wire operation, each taking plain request data and
/// returning either a typed payload or a classified [`TransportError`].
/// Implementations keep no state between calls.
#[async_trait]
pub trait VerificationApi: Send + Sync {
    /// Upload a transaction-history CSV for the given user.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` when the call fails or the service
    /// rejects the dataset.
    async fn upload_csv(
        &self,
        user_id: &UserId,
        upload: &CsvUpload,
    ) -> Result<UploadReceipt, TransportError>;

    /// Start a question/answer exchange over an uploaded dataset.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` when the call fails or the service
    /// refuses to open a session.
    async fn start_auth(
        &self,
        data_id: &DataId,
        user_id: &UserId,
    ) -> Result<SessionId, TransportError>;

    /// Fetch the next question for a running session.
    ///
    /// # Errors
    ///
    /// Returns `TransportError`; a success body carrying no question is
    /// reported as `Rejected` ("no more questions available").
    async fn next_question(
        &self,
        session_id: &SessionId,
    ) -> Result<QuestionPrompt, TransportError>;

    /// Submit an answer for grading.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` when the call fails or the grading is
    /// rejected.
    async fn verify_answer(
        &self,
        question_id: &QuestionId,
        session_id: &SessionId,
        answer: &str,
    ) -> Result<AnswerReview, TransportError>;

    /// Fetch aggregate counters for a session. Not used by the core
    /// flow; surfaced through the debug command.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` when the call fails.
    async fn session_status(
        &self,
        session_id: &SessionId,
    ) -> Result<SessionReport, TransportError>;

    /// Connectivity probe.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` when the service is not reachable or
    /// unhealthy.
    async fn health(&self) -> Result<(), TransportError>;
}
