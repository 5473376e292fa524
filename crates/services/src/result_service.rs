use std::sync::Arc;

use exam_core::model::{ExamId, ExamineeId};
use storage::repository::{SessionHistory, SessionRecord, StorageError};

use crate::error::LookupError;

/// Looks up what a student scored on an exam.
#[derive(Clone)]
pub struct ResultService {
    history: Arc<dyn SessionHistory>,
}

impl ResultService {
    #[must_use]
    pub fn new(history: Arc<dyn SessionHistory>) -> Self {
        Self { history }
    }

    /// Latest session of the student on the exam, with every answer given.
    ///
    /// # Errors
    ///
    /// Returns `LookupError::NoSession` if the student never sat the exam.
    /// Returns `LookupError::Storage` if repository access fails.
    pub async fn session_result(
        &self,
        examinee_id: ExamineeId,
        exam_id: ExamId,
    ) -> Result<SessionRecord, LookupError> {
        match self.history.latest_session(examinee_id, exam_id).await {
            Ok(record) => Ok(record),
            Err(StorageError::NotFound) => Err(LookupError::NoSession {
                examinee_id,
                exam_id,
            }),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exam_core::model::{QuestionId, ScoreValue};
    use storage::repository::{InMemoryRepository, SessionStore};

    #[tokio::test]
    async fn missing_session_is_reported_with_ids() {
        let svc = ResultService::new(Arc::new(InMemoryRepository::new()));
        let err = svc
            .session_result(ExamineeId::new(4), ExamId::new(9))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LookupError::NoSession { examinee_id, exam_id }
                if examinee_id == ExamineeId::new(4) && exam_id == ExamId::new(9)
        ));
    }

    #[tokio::test]
    async fn open_session_has_answers_but_no_result() {
        let repo = InMemoryRepository::new();
        let session = repo
            .create_session(ExamineeId::new(1), ExamId::new(1))
            .await
            .unwrap();
        repo.append_answer(session, QuestionId::new(3), ScoreValue::Half)
            .await
            .unwrap();

        let svc = ResultService::new(Arc::new(repo));
        let record = svc
            .session_result(ExamineeId::new(1), ExamId::new(1))
            .await
            .unwrap();
        assert_eq!(record.id, session);
        assert_eq!(record.answers.len(), 1);
        assert_eq!(record.answers[0].value, ScoreValue::Half);
        assert!(record.result.is_none());
    }
}
