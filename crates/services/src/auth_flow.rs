use std::sync::Arc;

use tracing::{debug, warn};

use transport::{SessionReport, TransportError, VerificationApi};
use veriq_core::Clock;
use veriq_core::model::{
    DataId, MessageMeta, Phase, QuestionId, Session, Speaker, UserId, Verdict,
};

use crate::pacing::Pacing;
use crate::upload::UploadSource;

/// Greeting seeded into every fresh session.
const GREETING: &str = "Hi! I'm your secure banking assistant. To verify your identity, \
I'll ask some questions about your recent transactions. Upload a CSV of your transaction \
history, or use the bundled sample data to get started.";

//
// ─── COMMAND OUTCOME ───────────────────────────────────────────────────────────
//

/// Whether a command was acted upon.
///
/// Precondition violations (an answer with no question pending, a second
/// command while one is in flight) are UI races, not user-facing errors,
/// so they are reported as `Ignored` rather than surfaced in the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Handled,
    Ignored,
}

//
// ─── AUTH FLOW ─────────────────────────────────────────────────────────────────
//

/// The session controller: owns the [`Session`] and drives it through
/// upload → question loop → verdict against the remote service.
///
/// All mutation happens here, in response to the commands below; the
/// presentation layer reads `session()` snapshots and never touches the
/// state directly. Remote calls run one at a time: each command either
/// runs its whole chain to completion or is ignored while a previous
/// one is still in flight. Remote failures are never fatal; they are
/// recorded on the session, narrated into the transcript, and the flow
/// returns to a state the user can retry from. Nothing is retried
/// automatically.
pub struct AuthFlowService {
    api: Arc<dyn VerificationApi>,
    clock: Clock,
    pacing: Pacing,
    session: Session,
}

impl AuthFlowService {
    #[must_use]
    pub fn new(api: Arc<dyn VerificationApi>) -> Self {
        let clock = Clock::default_clock();
        Self {
            session: Session::new(UserId::generate(), GREETING, clock.now()),
            api,
            clock,
            pacing: Pacing::default(),
        }
    }

    /// Replaces the clock (and restarts the session so the greeting
    /// carries the new clock's timestamp).
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self.session = Session::new(UserId::generate(), GREETING, clock.now());
        self
    }

    #[must_use]
    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    /// Read-only snapshot of the current state.
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Supplies transaction history and, on success, rolls straight into
    /// the question loop (the user never explicitly starts a session).
    ///
    /// Valid only while uploading and idle; otherwise the command is
    /// ignored. On failure the phase stays `Uploading` so the user can
    /// retry with the same or another dataset.
    pub async fn submit_data(&mut self, source: UploadSource) -> CommandOutcome {
        if self.session.phase() != Phase::Uploading || self.session.is_loading() {
            debug!("submit_data ignored: not uploading or a request is in flight");
            return CommandOutcome::Ignored;
        }

        self.session.begin_loading();
        self.session.show_placeholder(self.clock.now());

        let upload = source.into_upload();
        match self.api.upload_csv(self.session.user_id(), &upload).await {
            Ok(receipt) => {
                self.session
                    .record_upload(receipt.data_id.clone(), receipt.total_transactions);
                self.session.push_bot(
                    format!(
                        "Great! I found {} transactions in your data. {} \
                         Let me start the verification process.",
                        receipt.total_transactions, receipt.summary
                    ),
                    self.clock.now(),
                );
                self.start_auth(receipt.data_id).await;
            }
            Err(err) => {
                warn!(%err, "transaction upload failed");
                self.session.clear_placeholder();
                self.session.set_error(err.to_string());
                self.session.push_bot(
                    format!(
                        "Sorry, there was an error processing your transaction data: {err}. \
                         Please try again."
                    ),
                    self.clock.now(),
                );
            }
        }

        // One release point for the whole chain: a stale loading flag
        // would deadlock the input affordances.
        self.session.finish_loading();
        CommandOutcome::Handled
    }

    /// Submits the answer to the pending question.
    ///
    /// Ignored unless a question is actually awaiting an answer and no
    /// request is in flight: at most one answer submission per session
    /// at any time. The raw text goes into the transcript; the trimmed
    /// text goes over the wire.
    pub async fn submit_answer(&mut self, answer: &str) -> CommandOutcome {
        if self.session.phase() != Phase::Authenticating || self.session.is_loading() {
            debug!("submit_answer ignored: not authenticating or a request is in flight");
            return CommandOutcome::Ignored;
        }
        let (Some(session_id), Some(question_id)) = (
            self.session.session_id().cloned(),
            self.session.current_question_id().cloned(),
        ) else {
            debug!("submit_answer ignored: no question pending");
            return CommandOutcome::Ignored;
        };

        self.session.begin_loading();
        self.session.push_user(answer, self.clock.now());
        self.session.show_placeholder(self.clock.now());

        match self
            .api
            .verify_answer(&question_id, &session_id, answer.trim())
            .await
        {
            Ok(review) => {
                let feedback = if review.grading.is_correct {
                    format!(
                        "✅ Correct! ({:.0}% confidence) - {}",
                        review.grading.confidence, review.grading.explanation
                    )
                } else {
                    format!("❌ {}", review.grading.explanation)
                };
                self.session.push_bot_with_meta(
                    feedback,
                    MessageMeta::grading(review.grading.confidence, review.grading.is_correct),
                    self.clock.now(),
                );

                if review.progress.status.is_terminal() {
                    let verdict = Verdict {
                        final_score: review.progress.score,
                        status: review.progress.status,
                    };
                    self.session.complete(verdict);
                    self.pacing.before_verdict().await;
                    self.session
                        .push_bot(verdict_summary(verdict), self.clock.now());
                } else {
                    self.session.clear_current_question();
                    self.pacing.before_next_question().await;
                    self.fetch_question().await;
                }
            }
            Err(err) => {
                // The question stays pending so the same answer can be
                // retyped once the failure clears.
                warn!(%err, "answer verification failed");
                self.session.clear_placeholder();
                self.session.set_error(err.to_string());
                self.session.push_bot(
                    format!("Error verifying answer: {err}"),
                    self.clock.now(),
                );
            }
        }

        self.session.finish_loading();
        CommandOutcome::Handled
    }

    /// Discards everything and returns to the initial state under a
    /// fresh identity. No network call.
    pub fn reset(&mut self) {
        debug!("resetting session");
        self.session = Session::new(UserId::generate(), GREETING, self.clock.now());
    }

    /// Escape hatch for auxiliary UI needs: append an arbitrary message
    /// to the transcript.
    pub fn append_note(&mut self, speaker: Speaker, text: &str) {
        self.session.push_note(speaker, text, self.clock.now());
    }

    /// Aggregate counters from the status endpoint, once a session
    /// exists. Debug surface; not part of the core flow.
    pub async fn session_report(&self) -> Option<Result<SessionReport, TransportError>> {
        let session_id = self.session.session_id()?;
        Some(self.api.session_status(session_id).await)
    }

    // ─── Internal transitions ──────────────────────────────────────────────

    /// Continuation of a successful upload: open the exchange, then pull
    /// the first question. A failure here ends the current upload
    /// attempt (the phase never left `Uploading`).
    async fn start_auth(&mut self, data_id: DataId) {
        self.session.show_placeholder(self.clock.now());
        match self.api.start_auth(&data_id, self.session.user_id()).await {
            Ok(session_id) => {
                self.session.begin_authentication(session_id);
                self.fetch_question().await;
            }
            Err(err) => {
                warn!(%err, "could not start verification session");
                self.session.clear_placeholder();
                self.session.set_error(err.to_string());
                self.session.push_bot(
                    format!("Unable to start verification: {err}"),
                    self.clock.now(),
                );
            }
        }
    }

    /// Pulls the next question and marks it pending. Failures (including
    /// exhaustion) are narrated without changing phase.
    async fn fetch_question(&mut self) {
        let Some(session_id) = self.session.session_id().cloned() else {
            return;
        };
        match self.api.next_question(&session_id).await {
            Ok(question) => {
                let meta = MessageMeta::question(question.number, question.total);
                self.session
                    .set_current_question(QuestionId::from_ordinal(question.number));
                self.session
                    .push_bot_with_meta(question.text, meta, self.clock.now());
            }
            Err(err) => {
                warn!(%err, "question fetch failed");
                self.session.clear_placeholder();
                self.session.set_error(err.to_string());
                self.session
                    .push_bot(format!("Error getting question: {err}"), self.clock.now());
            }
        }
    }
}

fn verdict_summary(verdict: Verdict) -> String {
    use veriq_core::model::AuthStatus;
    match verdict.status {
        AuthStatus::Success => format!(
            "🎉 Authentication successful! You answered correctly with a score of {:.0}%. \
             Welcome back!",
            verdict.final_score
        ),
        _ => format!(
            "❌ Authentication failed. You scored {:.0}%. \
             Please try again with a new CSV file.",
            verdict.final_score
        ),
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use transport::scripted::RecordedCall;
    use transport::{
        AnswerGrading, AnswerReview, AuthProgress, QuestionPrompt, ScriptedVerifier, UploadReceipt,
    };
    use veriq_core::model::{AuthStatus, SessionId, Speaker};
    use veriq_core::time::fixed_clock;

    fn receipt(total: u32) -> UploadReceipt {
        UploadReceipt {
            data_id: veriq_core::model::DataId::new("data-1"),
            total_transactions: total,
            summary: "Mostly food and shopping.".into(),
        }
    }

    fn question(number: u32, total: u32) -> QuestionPrompt {
        QuestionPrompt {
            text: format!("Question {number} of {total}?"),
            number,
            total,
        }
    }

    fn review(is_correct: bool, confidence: f64, status: AuthStatus, score: f64) -> AnswerReview {
        AnswerReview {
            grading: AnswerGrading {
                is_correct,
                confidence,
                explanation: "Matches the record.".into(),
            },
            progress: AuthProgress { status, score },
        }
    }

    fn service(api: &Arc<ScriptedVerifier>) -> AuthFlowService {
        AuthFlowService::new(Arc::clone(api) as Arc<dyn VerificationApi>)
            .with_clock(fixed_clock())
            .with_pacing(Pacing::Immediate)
    }

    /// Scripts a clean run up to the first delivered question.
    async fn authenticated(api: &Arc<ScriptedVerifier>) -> AuthFlowService {
        api.script_upload(Ok(receipt(44)));
        api.script_start(Ok(SessionId::new("sess-1")));
        api.script_question(Ok(question(1, 5)));
        let mut flow = service(api);
        let outcome = flow.submit_data(UploadSource::Sample).await;
        assert_eq!(outcome, CommandOutcome::Handled);
        flow
    }

    #[tokio::test]
    async fn upload_chains_to_first_question() {
        let api = Arc::new(ScriptedVerifier::new());
        let flow = authenticated(&api).await;
        let session = flow.session();

        assert_eq!(session.phase(), Phase::Authenticating);
        assert!(!session.is_loading());
        assert!(!session.has_placeholder());
        assert!(session.error().is_none());
        assert_eq!(session.total_transactions(), Some(44));
        assert_eq!(
            session.current_question_id().map(|q| q.as_str().to_string()),
            Some("q_1".to_string())
        );

        // Greeting, upload summary, first question.
        let texts: Vec<&str> = session.transcript().iter().map(|m| m.text()).collect();
        assert_eq!(texts.len(), 3);
        assert!(texts[1].contains("44 transactions"));
        let last = session.transcript().last().unwrap();
        assert_eq!(last.meta().unwrap().question_number, Some(1));
        assert_eq!(last.meta().unwrap().total_questions, Some(5));

        let calls = api.calls();
        assert!(matches!(calls[0], RecordedCall::UploadCsv { .. }));
        assert!(matches!(calls[1], RecordedCall::StartAuth { .. }));
        assert!(matches!(calls[2], RecordedCall::NextQuestion { .. }));
        assert_eq!(calls.len(), 3);
    }

    #[tokio::test]
    async fn unreachable_upload_stays_in_upload_phase() {
        let api = Arc::new(ScriptedVerifier::new());
        api.script_upload(Err(TransportError::Unreachable));
        let mut flow = service(&api);

        flow.submit_data(UploadSource::Sample).await;
        let session = flow.session();

        assert_eq!(session.phase(), Phase::Uploading);
        assert!(!session.is_loading());
        assert!(!session.has_placeholder());
        assert!(session.error().unwrap().contains("network error"));
        assert!(session
            .transcript()
            .last()
            .unwrap()
            .text()
            .contains("network error"));
        assert_eq!(api.calls().len(), 1);
    }

    #[tokio::test]
    async fn start_failure_ends_the_attempt_in_upload_phase() {
        let api = Arc::new(ScriptedVerifier::new());
        api.script_upload(Ok(receipt(44)));
        api.script_start(Err(TransportError::ServerFault));
        let mut flow = service(&api);

        flow.submit_data(UploadSource::Sample).await;
        let session = flow.session();

        assert_eq!(session.phase(), Phase::Uploading);
        assert!(!session.is_loading());
        assert!(session
            .transcript()
            .last()
            .unwrap()
            .text()
            .starts_with("Unable to start verification"));
        // No question was ever requested.
        assert_eq!(api.calls().len(), 2);
    }

    #[tokio::test]
    async fn question_fetch_failure_keeps_authenticating() {
        let api = Arc::new(ScriptedVerifier::new());
        api.script_upload(Ok(receipt(44)));
        api.script_start(Ok(SessionId::new("sess-1")));
        api.script_question(Err(TransportError::Rejected(
            "no more questions available".into(),
        )));
        let mut flow = service(&api);

        flow.submit_data(UploadSource::Sample).await;
        let session = flow.session();

        assert_eq!(session.phase(), Phase::Authenticating);
        assert!(session.current_question_id().is_none());
        assert!(!session.is_loading());
        assert!(session
            .transcript()
            .last()
            .unwrap()
            .text()
            .contains("no more questions available"));
    }

    #[tokio::test]
    async fn correct_answer_in_progress_brings_next_question() {
        let api = Arc::new(ScriptedVerifier::new());
        let mut flow = authenticated(&api).await;
        api.script_review(Ok(review(true, 92.0, AuthStatus::InProgress, 60.0)));
        api.script_question(Ok(question(2, 5)));

        let outcome = flow.submit_answer("450").await;
        assert_eq!(outcome, CommandOutcome::Handled);

        let session = flow.session();
        assert_eq!(session.phase(), Phase::Authenticating);
        assert!(!session.is_loading());
        assert_eq!(session.question_progress(), Some((2, 5)));
        assert_eq!(
            session.current_question_id().map(|q| q.as_str().to_string()),
            Some("q_2".to_string())
        );

        // ... user answer, graded feedback, next question.
        let transcript = session.transcript();
        let n = transcript.len();
        assert_eq!(transcript[n - 3].speaker(), Speaker::User);
        assert_eq!(transcript[n - 3].text(), "450");
        let feedback = &transcript[n - 2];
        assert!(feedback.text().contains("92% confidence"));
        assert_eq!(feedback.meta().unwrap().was_correct, Some(true));
        assert_eq!(feedback.meta().unwrap().confidence, Some(92.0));

        assert!(api.calls().iter().any(|c| matches!(
            c,
            RecordedCall::VerifyAnswer { question_id, answer }
                if question_id == "q_1" && answer == "450"
        )));
        assert_eq!(session.questions_asked(), 1);
        assert_eq!(session.questions_correct(), 1);
    }

    #[tokio::test]
    async fn failed_verdict_reaches_result_phase() {
        let api = Arc::new(ScriptedVerifier::new());
        let mut flow = authenticated(&api).await;
        api.script_review(Ok(review(false, 10.0, AuthStatus::Failed, 40.0)));

        flow.submit_answer("no idea").await;
        let session = flow.session();

        assert_eq!(session.phase(), Phase::Result);
        let verdict = session.verdict().unwrap();
        assert_eq!(verdict.status, AuthStatus::Failed);
        assert!((verdict.final_score - 40.0).abs() < f64::EPSILON);
        assert!(session.current_question_id().is_none());
        assert!(!session.is_loading());

        let last = session.transcript().last().unwrap();
        assert!(last.text().contains("Authentication failed"));
        assert!(last.text().contains("40%"));
    }

    #[tokio::test]
    async fn success_verdict_is_welcomed_back() {
        let api = Arc::new(ScriptedVerifier::new());
        let mut flow = authenticated(&api).await;
        api.script_review(Ok(review(true, 95.0, AuthStatus::Success, 80.0)));

        flow.submit_answer("450").await;
        let session = flow.session();

        assert_eq!(session.phase(), Phase::Result);
        assert_eq!(session.verdict().unwrap().status, AuthStatus::Success);
        let last = session.transcript().last().unwrap();
        assert!(last.text().contains("Authentication successful"));
        assert!(last.text().contains("80%"));
    }

    #[tokio::test]
    async fn failed_verification_call_keeps_question_for_retry() {
        let api = Arc::new(ScriptedVerifier::new());
        let mut flow = authenticated(&api).await;
        api.script_review(Err(TransportError::Timeout));

        flow.submit_answer("450").await;
        {
            let session = flow.session();
            assert_eq!(session.phase(), Phase::Authenticating);
            assert!(session.current_question_id().is_some());
            assert!(!session.is_loading());
            assert!(session.error().unwrap().contains("timed out"));
        }

        // The same question can be answered again once the failure clears.
        api.script_review(Ok(review(true, 90.0, AuthStatus::Success, 100.0)));
        let outcome = flow.submit_answer("450").await;
        assert_eq!(outcome, CommandOutcome::Handled);
        assert_eq!(flow.session().phase(), Phase::Result);
    }

    #[tokio::test]
    async fn answer_without_pending_question_is_a_noop() {
        let api = Arc::new(ScriptedVerifier::new());
        let mut flow = service(&api);

        let before = flow.session().transcript().len();
        let outcome = flow.submit_answer("450").await;

        assert_eq!(outcome, CommandOutcome::Ignored);
        assert_eq!(flow.session().transcript().len(), before);
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn answer_after_verdict_is_a_noop() {
        let api = Arc::new(ScriptedVerifier::new());
        let mut flow = authenticated(&api).await;
        api.script_review(Ok(review(true, 95.0, AuthStatus::Success, 80.0)));
        flow.submit_answer("450").await;

        let before = flow.session().transcript().len();
        assert_eq!(flow.submit_answer("another").await, CommandOutcome::Ignored);
        assert_eq!(flow.session().transcript().len(), before);
    }

    #[tokio::test]
    async fn second_upload_during_authentication_is_a_noop() {
        let api = Arc::new(ScriptedVerifier::new());
        let mut flow = authenticated(&api).await;

        let calls_before = api.calls().len();
        assert_eq!(
            flow.submit_data(UploadSource::Sample).await,
            CommandOutcome::Ignored
        );
        assert_eq!(api.calls().len(), calls_before);
    }

    #[tokio::test]
    async fn answer_is_trimmed_for_transport_but_raw_in_transcript() {
        let api = Arc::new(ScriptedVerifier::new());
        let mut flow = authenticated(&api).await;
        api.script_review(Ok(review(true, 90.0, AuthStatus::Success, 100.0)));

        flow.submit_answer("  450  ").await;

        let sent = api.calls().into_iter().find_map(|c| match c {
            RecordedCall::VerifyAnswer { answer, .. } => Some(answer),
            _ => None,
        });
        assert_eq!(sent.as_deref(), Some("450"));
        assert!(flow
            .session()
            .transcript()
            .iter()
            .any(|m| m.speaker() == Speaker::User && m.text() == "  450  "));
    }

    #[tokio::test]
    async fn reset_starts_over_with_a_new_identity() {
        let api = Arc::new(ScriptedVerifier::new());
        let mut flow = authenticated(&api).await;
        let old_user = flow.session().user_id().clone();

        flow.reset();
        let session = flow.session();

        assert_eq!(session.phase(), Phase::Uploading);
        assert_eq!(session.transcript().len(), 1);
        assert_eq!(session.transcript()[0].speaker(), Speaker::Bot);
        assert_ne!(session.user_id(), &old_user);
        assert!(session.verdict().is_none());
        assert!(session.session_id().is_none());
        assert!(!session.is_loading());
    }

    #[tokio::test]
    async fn append_note_reaches_the_transcript() {
        let api = Arc::new(ScriptedVerifier::new());
        let mut flow = service(&api);
        flow.append_note(Speaker::Bot, "Connectivity restored.");
        assert_eq!(
            flow.session().transcript().last().unwrap().text(),
            "Connectivity restored."
        );
    }

    #[tokio::test]
    async fn session_report_requires_a_session() {
        let api = Arc::new(ScriptedVerifier::new());
        let flow = service(&api);
        assert!(flow.session_report().await.is_none());
    }
}
