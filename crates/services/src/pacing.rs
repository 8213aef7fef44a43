use std::time::Duration;

/// Pause before the next question appears after grading feedback.
pub const NEXT_QUESTION_DELAY: Duration = Duration::from_millis(1500);

/// Pause before the final summary appears after the verdict.
pub const VERDICT_DELAY: Duration = Duration::from_millis(1000);

/// How bot replies are paced in the conversation.
///
/// Without a deliberate pause, grading feedback and the next question
/// would land in the same instant; the read-time delay is what makes the
/// exchange feel like a conversation rather than a form. `Immediate`
/// exists so tests (and batch use) skip the waiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Pacing {
    #[default]
    Conversational,
    Immediate,
}

impl Pacing {
    pub(crate) async fn before_next_question(self) {
        self.pause(NEXT_QUESTION_DELAY).await;
    }

    pub(crate) async fn before_verdict(self) {
        self.pause(VERDICT_DELAY).await;
    }

    async fn pause(self, delay: Duration) {
        if self == Self::Conversational {
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn immediate_pacing_does_not_sleep() {
        let started = Instant::now();
        Pacing::Immediate.before_next_question().await;
        Pacing::Immediate.before_verdict().await;
        assert!(started.elapsed() < Duration::from_millis(100));
    }
}
