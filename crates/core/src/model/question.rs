use serde::{Deserialize, Serialize};

use crate::model::ids::{ExamId, QuestionId};

/// Question drawn from an exam's pool.
///
/// Content is opaque to the scoring logic; only `id` is threaded back when a
/// score is recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub exam_id: ExamId,
    pub text: String,
    pub answer: String,
}

impl Question {
    #[must_use]
    pub fn new(
        id: QuestionId,
        exam_id: ExamId,
        text: impl Into<String>,
        answer: impl Into<String>,
    ) -> Self {
        Self {
            id,
            exam_id,
            text: text.into(),
            answer: answer.into(),
        }
    }
}
