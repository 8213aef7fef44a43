use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use veriq_core::model::{AuthStatus, DataId, QuestionId, SessionId, UserId};

use crate::api::{
    AnswerGrading, AnswerReview, AuthProgress, CsvUpload, QuestionPrompt, SessionReport,
    UploadReceipt, VerificationApi,
};
use crate::config::ClientConfig;
use crate::error::TransportError;

/// HTTP implementation of [`VerificationApi`].
///
/// A thin wrapper over the fixed external contract: four core calls plus
/// the status/health probes, all sharing one pooled client with the
/// configured request deadline. No state is retained between calls.
#[derive(Clone)]
pub struct VerificationClient {
    http: Client,
    base_url: String,
}

impl VerificationClient {
    /// Builds a client for the given service endpoint.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` if the underlying HTTP client cannot be
    /// constructed.
    pub fn new(config: ClientConfig) -> Result<Self, TransportError> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

//
// ─── WIRE FORMAT ───────────────────────────────────────────────────────────────
//

fn malformed() -> TransportError {
    TransportError::Rejected("malformed response from the verification service".into())
}

#[derive(Debug, Deserialize)]
struct UploadCsvResponse {
    success: bool,
    data_id: Option<String>,
    total_transactions: Option<u32>,
    summary: Option<String>,
}

impl UploadCsvResponse {
    fn into_receipt(self) -> Result<UploadReceipt, TransportError> {
        if !self.success {
            return Err(TransportError::Rejected(
                "failed to process transaction data".into(),
            ));
        }
        Ok(UploadReceipt {
            data_id: DataId::new(self.data_id.ok_or_else(malformed)?),
            total_transactions: self.total_transactions.ok_or_else(malformed)?,
            summary: self.summary.unwrap_or_default(),
        })
    }
}

#[derive(Debug, serde::Serialize)]
struct StartAuthRequest<'a> {
    data_id: &'a DataId,
    user_id: &'a UserId,
}

#[derive(Debug, Deserialize)]
struct StartAuthResponse {
    success: bool,
    session_id: Option<String>,
}

impl StartAuthResponse {
    fn into_session_id(self) -> Result<SessionId, TransportError> {
        if !self.success {
            return Err(TransportError::Rejected(
                "failed to start authentication".into(),
            ));
        }
        Ok(SessionId::new(self.session_id.ok_or_else(malformed)?))
    }
}

#[derive(Debug, Deserialize)]
struct QuestionBody {
    question_text: String,
    question_number: u32,
    total_questions: u32,
}

#[derive(Debug, Deserialize)]
struct QuestionsResponse {
    success: bool,
    question: Option<QuestionBody>,
}

impl QuestionsResponse {
    fn into_prompt(self) -> Result<QuestionPrompt, TransportError> {
        // The service signals exhaustion with a success body that has no
        // question attached; both that and an outright refusal surface
        // the same way to the caller.
        match (self.success, self.question) {
            (true, Some(q)) => Ok(QuestionPrompt {
                text: q.question_text,
                number: q.question_number,
                total: q.total_questions,
            }),
            _ => Err(TransportError::Rejected(
                "no more questions available".into(),
            )),
        }
    }
}

#[derive(Debug, serde::Serialize)]
struct VerifyAnswerRequest<'a> {
    session_id: &'a SessionId,
    answer: &'a str,
}

#[derive(Debug, Deserialize)]
struct ValidationBody {
    is_correct: bool,
    confidence: f64,
    explanation: String,
}

#[derive(Debug, Deserialize)]
struct AuthStatusBody {
    status: AuthStatus,
    score: f64,
}

#[derive(Debug, Deserialize)]
struct VerifyAnswerResponse {
    success: bool,
    validation: Option<ValidationBody>,
    authentication_status: Option<AuthStatusBody>,
}

impl VerifyAnswerResponse {
    fn into_review(self) -> Result<AnswerReview, TransportError> {
        if !self.success {
            return Err(TransportError::Rejected("failed to verify answer".into()));
        }
        let validation = self.validation.ok_or_else(malformed)?;
        let status = self.authentication_status.ok_or_else(malformed)?;
        Ok(AnswerReview {
            grading: AnswerGrading {
                is_correct: validation.is_correct,
                confidence: validation.confidence,
                explanation: validation.explanation,
            },
            progress: AuthProgress {
                status: status.status,
                score: status.score,
            },
        })
    }
}

#[derive(Debug, Deserialize)]
struct SessionStatusResponse {
    success: bool,
    questions_asked: Option<u32>,
    questions_correct: Option<u32>,
    status: Option<AuthStatus>,
}

impl SessionStatusResponse {
    fn into_report(self) -> Result<SessionReport, TransportError> {
        if !self.success {
            return Err(TransportError::Rejected(
                "failed to fetch session status".into(),
            ));
        }
        Ok(SessionReport {
            questions_asked: self.questions_asked.ok_or_else(malformed)?,
            questions_correct: self.questions_correct.ok_or_else(malformed)?,
            status: self.status.ok_or_else(malformed)?,
        })
    }
}

//
// ─── RESPONSE HANDLING ─────────────────────────────────────────────────────────
//

/// Classifies the HTTP status and decodes the JSON body.
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, TransportError> {
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Err(TransportError::NotFound);
    }
    if status.is_server_error() {
        return Err(TransportError::ServerFault);
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(TransportError::rejected_from_body(&body));
    }
    response.json::<T>().await.map_err(|_| malformed())
}

#[async_trait::async_trait]
impl VerificationApi for VerificationClient {
    async fn upload_csv(
        &self,
        user_id: &UserId,
        upload: &CsvUpload,
    ) -> Result<UploadReceipt, TransportError> {
        debug!(user_id = %user_id, filename = %upload.filename, "uploading transaction history");
        let part = Part::bytes(upload.bytes.clone())
            .file_name(upload.filename.clone())
            .mime_str("text/csv")?;
        let form = Form::new()
            .text("user_id", user_id.as_str().to_string())
            .part("csv_file", part);

        let response = self
            .http
            .post(self.url("/upload-csv"))
            .multipart(form)
            .send()
            .await?;
        decode::<UploadCsvResponse>(response).await?.into_receipt()
    }

    async fn start_auth(
        &self,
        data_id: &DataId,
        user_id: &UserId,
    ) -> Result<SessionId, TransportError> {
        debug!(data_id = %data_id, "starting authentication session");
        let response = self
            .http
            .post(self.url("/start-auth"))
            .json(&StartAuthRequest { data_id, user_id })
            .send()
            .await?;
        decode::<StartAuthResponse>(response).await?.into_session_id()
    }

    async fn next_question(
        &self,
        session_id: &SessionId,
    ) -> Result<QuestionPrompt, TransportError> {
        debug!(session_id = %session_id, "fetching next question");
        let response = self
            .http
            .get(self.url("/questions"))
            .query(&[("session_id", session_id.as_str())])
            .send()
            .await?;
        decode::<QuestionsResponse>(response).await?.into_prompt()
    }

    async fn verify_answer(
        &self,
        question_id: &QuestionId,
        session_id: &SessionId,
        answer: &str,
    ) -> Result<AnswerReview, TransportError> {
        debug!(question_id = %question_id, "submitting answer for grading");
        let response = self
            .http
            .post(self.url(&format!("/questions/{question_id}/verify")))
            .json(&VerifyAnswerRequest { session_id, answer })
            .send()
            .await?;
        decode::<VerifyAnswerResponse>(response).await?.into_review()
    }

    async fn session_status(
        &self,
        session_id: &SessionId,
    ) -> Result<SessionReport, TransportError> {
        let response = self
            .http
            .get(self.url(&format!("/session-status/{session_id}")))
            .send()
            .await?;
        decode::<SessionStatusResponse>(response).await?.into_report()
    }

    async fn health(&self) -> Result<(), TransportError> {
        let response = self.http.get(self.url("/health")).send().await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(TransportError::from_status(status, None))
        }
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_response_decodes_and_converts() {
        let raw = r#"{
            "success": true,
            "data_id": "data-7",
            "total_transactions": 44,
            "summary": "Mostly food and shopping."
        }"#;
        let receipt = serde_json::from_str::<UploadCsvResponse>(raw)
            .unwrap()
            .into_receipt()
            .unwrap();
        assert_eq!(receipt.data_id.as_str(), "data-7");
        assert_eq!(receipt.total_transactions, 44);
        assert_eq!(receipt.summary, "Mostly food and shopping.");
    }

    #[test]
    fn unsuccessful_upload_is_rejected() {
        let raw = r#"{"success": false}"#;
        let err = serde_json::from_str::<UploadCsvResponse>(raw)
            .unwrap()
            .into_receipt()
            .unwrap_err();
        assert_eq!(
            err,
            TransportError::Rejected("failed to process transaction data".into())
        );
    }

    #[test]
    fn question_response_converts_to_prompt() {
        let raw = r#"{
            "success": true,
            "question": {
                "question_text": "How much did you spend at Dominos Pizza?",
                "question_number": 1,
                "total_questions": 5
            }
        }"#;
        let prompt = serde_json::from_str::<QuestionsResponse>(raw)
            .unwrap()
            .into_prompt()
            .unwrap();
        assert_eq!(prompt.number, 1);
        assert_eq!(prompt.total, 5);
        assert!(prompt.text.contains("Dominos"));
    }

    #[test]
    fn missing_question_means_exhausted() {
        let raw = r#"{"success": true, "question": null}"#;
        let err = serde_json::from_str::<QuestionsResponse>(raw)
            .unwrap()
            .into_prompt()
            .unwrap_err();
        assert_eq!(
            err,
            TransportError::Rejected("no more questions available".into())
        );
    }

    #[test]
    fn verify_response_decodes_statuses() {
        let raw = r#"{
            "success": true,
            "validation": {
                "is_correct": true,
                "confidence": 92.0,
                "explanation": "Matches the Dominos transaction."
            },
            "authentication_status": {"status": "in_progress", "score": 60.0}
        }"#;
        let review = serde_json::from_str::<VerifyAnswerResponse>(raw)
            .unwrap()
            .into_review()
            .unwrap();
        assert!(review.grading.is_correct);
        assert_eq!(review.progress.status, AuthStatus::InProgress);

        let raw = r#"{
            "success": true,
            "validation": {"is_correct": false, "confidence": 10.0, "explanation": "No."},
            "authentication_status": {"status": "failed", "score": 40.0}
        }"#;
        let review = serde_json::from_str::<VerifyAnswerResponse>(raw)
            .unwrap()
            .into_review()
            .unwrap();
        assert_eq!(review.progress.status, AuthStatus::Failed);
        assert!((review.progress.score - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn session_status_converts_to_report() {
        let raw = r#"{
            "success": true,
            "questions_asked": 3,
            "questions_correct": 2,
            "status": "in_progress"
        }"#;
        let report = serde_json::from_str::<SessionStatusResponse>(raw)
            .unwrap()
            .into_report()
            .unwrap();
        assert_eq!(report.questions_asked, 3);
        assert_eq!(report.questions_correct, 2);
        assert_eq!(report.status, AuthStatus::InProgress);
    }

    #[test]
    fn base_url_trailing_slash_is_normalized() {
        let client =
            VerificationClient::new(ClientConfig::with_base_url("http://localhost:5000/api/"))
                .unwrap();
        assert_eq!(client.url("/health"), "http://localhost:5000/api/health");
    }
}
