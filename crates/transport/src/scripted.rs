use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use veriq_core::model::{DataId, QuestionId, SessionId, UserId};

use crate::api::{
    AnswerReview, CsvUpload, QuestionPrompt, SessionReport, UploadReceipt, VerificationApi,
};
use crate::error::TransportError;

/// One observed call against a [`ScriptedVerifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCall {
    UploadCsv { user_id: String, filename: String },
    StartAuth { data_id: String },
    NextQuestion { session_id: String },
    VerifyAnswer { question_id: String, answer: String },
    SessionStatus { session_id: String },
    Health,
}

/// In-memory [`VerificationApi`] double.
///
/// Responses are scripted per operation and handed out in FIFO order;
/// every call is recorded so tests can assert on exactly which requests
/// went over the wire. An exhausted script yields `Rejected`.
#[derive(Default)]
pub struct ScriptedVerifier {
    uploads: Mutex<VecDeque<Result<UploadReceipt, TransportError>>>,
    starts: Mutex<VecDeque<Result<SessionId, TransportError>>>,
    questions: Mutex<VecDeque<Result<QuestionPrompt, TransportError>>>,
    reviews: Mutex<VecDeque<Result<AnswerReview, TransportError>>>,
    reports: Mutex<VecDeque<Result<SessionReport, TransportError>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedVerifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script_upload(&self, result: Result<UploadReceipt, TransportError>) {
        Self::enqueue(&self.uploads, result);
    }

    pub fn script_start(&self, result: Result<SessionId, TransportError>) {
        Self::enqueue(&self.starts, result);
    }

    pub fn script_question(&self, result: Result<QuestionPrompt, TransportError>) {
        Self::enqueue(&self.questions, result);
    }

    pub fn script_review(&self, result: Result<AnswerReview, TransportError>) {
        Self::enqueue(&self.reviews, result);
    }

    pub fn script_report(&self, result: Result<SessionReport, TransportError>) {
        Self::enqueue(&self.reports, result);
    }

    /// Everything that has been called so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }

    fn enqueue<T>(
        queue: &Mutex<VecDeque<Result<T, TransportError>>>,
        result: Result<T, TransportError>,
    ) {
        if let Ok(mut guard) = queue.lock() {
            guard.push_back(result);
        }
    }

    fn record(&self, call: RecordedCall) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }

    fn next<T>(
        queue: &Mutex<VecDeque<Result<T, TransportError>>>,
        operation: &str,
    ) -> Result<T, TransportError> {
        let mut guard = queue
            .lock()
            .map_err(|e| TransportError::Rejected(format!("scripted verifier poisoned: {e}")))?;
        guard.pop_front().unwrap_or_else(|| {
            Err(TransportError::Rejected(format!(
                "no scripted response for {operation}"
            )))
        })
    }
}

#[async_trait]
impl VerificationApi for ScriptedVerifier {
    async fn upload_csv(
        &self,
        user_id: &UserId,
        upload: &CsvUpload,
    ) -> Result<UploadReceipt, TransportError> {
        self.record(RecordedCall::UploadCsv {
            user_id: user_id.as_str().to_string(),
            filename: upload.filename.clone(),
        });
        Self::next(&self.uploads, "upload_csv")
    }

    async fn start_auth(
        &self,
        data_id: &DataId,
        _user_id: &UserId,
    ) -> Result<SessionId, TransportError> {
        self.record(RecordedCall::StartAuth {
            data_id: data_id.as_str().to_string(),
        });
        Self::next(&self.starts, "start_auth")
    }

    async fn next_question(
        &self,
        session_id: &SessionId,
    ) -> Result<QuestionPrompt, TransportError> {
        self.record(RecordedCall::NextQuestion {
            session_id: session_id.as_str().to_string(),
        });
        Self::next(&self.questions, "next_question")
    }

    async fn verify_answer(
        &self,
        question_id: &QuestionId,
        _session_id: &SessionId,
        answer: &str,
    ) -> Result<AnswerReview, TransportError> {
        self.record(RecordedCall::VerifyAnswer {
            question_id: question_id.as_str().to_string(),
            answer: answer.to_string(),
        });
        Self::next(&self.reviews, "verify_answer")
    }

    async fn session_status(
        &self,
        session_id: &SessionId,
    ) -> Result<SessionReport, TransportError> {
        self.record(RecordedCall::SessionStatus {
            session_id: session_id.as_str().to_string(),
        });
        Self::next(&self.reports, "session_status")
    }

    async fn health(&self) -> Result<(), TransportError> {
        self.record(RecordedCall::Health);
        Ok(())
    }
}
