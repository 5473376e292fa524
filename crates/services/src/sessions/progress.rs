use chrono::{DateTime, Utc};
use serde::Serialize;

use exam_core::BASE_QUESTION_COUNT;
use exam_core::model::{ExamSession, Phase};

/// Aggregated view of exam progress, for the examiner's screen.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionProgress {
    pub phase: Phase,
    pub answered: u32,
    pub base_remaining: u32,
    pub extra_answered: u32,
    pub running_total: f64,
    /// Answers recorded in memory that the session store did not acknowledge.
    pub unconfirmed_answers: usize,
    pub awaiting_question: bool,
    pub is_terminal: bool,
    pub is_saved: bool,
    pub started_at: DateTime<Utc>,
}

impl SessionProgress {
    #[must_use]
    pub fn of(session: &ExamSession, has_question: bool) -> Self {
        let answered = session.questions_answered();
        Self {
            phase: session.phase(),
            answered,
            base_remaining: BASE_QUESTION_COUNT.saturating_sub(answered),
            extra_answered: session.extra_answered(),
            running_total: session.scores().total(),
            unconfirmed_answers: session.scores().unconfirmed_count(),
            awaiting_question: !session.is_terminal() && !has_question,
            is_terminal: session.is_terminal(),
            is_saved: session.is_saved(),
            started_at: session.started_at(),
        }
    }
}
