use std::fmt;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use exam_core::model::{
    ExamId, ExamSession, ExamineeId, FinalResult, Phase, Question, ScoreEntry, ScoreValue,
};
use exam_core::{Clock, Decision, PhaseDecisionPolicy};
use storage::repository::{QuestionSource, SessionStore};

use super::progress::SessionProgress;
use crate::error::{ExamError, QuestionFetchFailure};

/// Lifecycle of a controller, as seen by the examiner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    NotStarted,
    InProgress(Phase),
    /// A final result exists but the session store has not confirmed it.
    AwaitingSave,
    Finalized,
}

impl fmt::Display for ControllerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerState::NotStarted => f.write_str("not started"),
            ControllerState::InProgress(phase) => write!(f, "in progress ({phase} phase)"),
            ControllerState::AwaitingSave => f.write_str("awaiting save"),
            ControllerState::Finalized => f.write_str("finalized"),
        }
    }
}

/// What the examiner sees next after a score is submitted.
#[derive(Debug, Clone, PartialEq)]
pub enum NextStep {
    Question(Question),
    Finished(FinalResult),
}

/// Result of submitting one score.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitOutcome {
    pub entry: ScoreEntry,
    pub decision: Decision,
    pub next: NextStep,
}

/// Drives one oral exam from session creation to the saved grade.
///
/// Every operation takes `&mut self`, so at most one question fetch, answer
/// save or final save is in flight per session. Dropping the controller
/// abandons the session.
pub struct SessionController {
    clock: Clock,
    questions: Arc<dyn QuestionSource>,
    store: Arc<dyn SessionStore>,
    policy: PhaseDecisionPolicy,
    session: Option<ExamSession>,
    current_question: Option<Question>,
}

impl SessionController {
    #[must_use]
    pub fn new(
        clock: Clock,
        questions: Arc<dyn QuestionSource>,
        store: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            clock,
            questions,
            store,
            policy: PhaseDecisionPolicy::default(),
            session: None,
            current_question: None,
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: PhaseDecisionPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn policy(&self) -> PhaseDecisionPolicy {
        self.policy
    }

    #[must_use]
    pub fn state(&self) -> ControllerState {
        match &self.session {
            None => ControllerState::NotStarted,
            Some(s) if s.is_saved() => ControllerState::Finalized,
            Some(s) if s.is_terminal() => ControllerState::AwaitingSave,
            Some(s) => ControllerState::InProgress(s.phase()),
        }
    }

    #[must_use]
    pub fn session(&self) -> Option<&ExamSession> {
        self.session.as_ref()
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.current_question.as_ref()
    }

    #[must_use]
    pub fn progress(&self) -> Option<SessionProgress> {
        self.session
            .as_ref()
            .map(|s| SessionProgress::of(s, self.current_question.is_some()))
    }

    fn invalid(&self, operation: &'static str) -> ExamError {
        ExamError::InvalidState {
            operation,
            state: self.state(),
        }
    }

    /// Open a session for the examinee and exam, then fetch the first question.
    ///
    /// # Errors
    ///
    /// Returns `ExamError::InvalidState` if a session was already started,
    /// `ExamError::SessionCreate` if the store rejects the session (the
    /// controller stays not started), or `ExamError::QuestionFetch` if the
    /// first question cannot be fetched (retry with `fetch_question`).
    pub async fn start(
        &mut self,
        examinee_id: ExamineeId,
        exam_id: ExamId,
    ) -> Result<&Question, ExamError> {
        if self.session.is_some() {
            return Err(self.invalid("start a session"));
        }

        let session_id = self
            .store
            .create_session(examinee_id, exam_id)
            .await
            .map_err(ExamError::SessionCreate)?;
        info!(
            session_id = %session_id,
            examinee_id = %examinee_id,
            exam_id = %exam_id,
            "exam session created"
        );

        self.session = Some(ExamSession::new(
            session_id,
            examinee_id,
            exam_id,
            self.clock.now(),
        ));
        self.fetch_question().await
    }

    /// Fetch the next question for an in-progress session that has none.
    ///
    /// # Errors
    ///
    /// Returns `ExamError::InvalidState` if no session is in progress or a
    /// question is already pending, and `ExamError::QuestionFetch` if the
    /// source fails or has no question left.
    pub async fn fetch_question(&mut self) -> Result<&Question, ExamError> {
        let exam_id = match (&self.session, &self.current_question) {
            (Some(s), None) if !s.is_terminal() => s.exam_id(),
            _ => return Err(self.invalid("fetch a question")),
        };

        let question = self
            .questions
            .random_question(exam_id)
            .await
            .map_err(QuestionFetchFailure::Storage)?
            .ok_or(QuestionFetchFailure::NoQuestionAvailable(exam_id))?;
        debug!(exam_id = %exam_id, question_id = %question.id, "question fetched");

        Ok(self.current_question.insert(question))
    }

    /// Validate a raw numeric award and submit it.
    ///
    /// # Errors
    ///
    /// Returns `ExamError::InvalidScore` for anything but 0, 0.5 or 1, with no
    /// state change; otherwise see [`SessionController::submit_score`].
    pub async fn submit_raw(&mut self, raw: f64) -> Result<SubmitOutcome, ExamError> {
        let value = ScoreValue::try_from(raw)?;
        self.submit_score(value).await
    }

    /// Record the examiner's award for the current question and advance.
    ///
    /// A failed answer save is logged and flagged on the entry; it does not
    /// stop the exam.
    ///
    /// # Errors
    ///
    /// Returns `ExamError::InvalidState` if there is no question awaiting a
    /// score. After the award is recorded, returns `ExamError::QuestionFetch`
    /// if the next question cannot be fetched, or `ExamError::Finalize` if the
    /// final result cannot be saved.
    pub async fn submit_score(&mut self, value: ScoreValue) -> Result<SubmitOutcome, ExamError> {
        let (session_id, question_id) = match (&self.session, &self.current_question) {
            (Some(s), Some(q)) if !s.is_terminal() => (s.id(), q.id),
            _ => return Err(self.invalid("submit a score")),
        };

        let persisted = match self
            .store
            .append_answer(session_id, question_id, value)
            .await
        {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    session_id = %session_id,
                    question_id = %question_id,
                    error = %e,
                    "answer not confirmed by session store"
                );
                false
            }
        };

        let answered_at = self.clock.now();
        let Some(session) = self.session.as_mut() else {
            return Err(self.invalid("submit a score"));
        };
        let entry = session
            .record(ScoreEntry::new(question_id, value, answered_at, persisted))?
            .clone();
        self.current_question = None;
        let decision = session.evaluate(&self.policy)?;
        info!(
            session_id = %session_id,
            question_id = %question_id,
            value = %value,
            answered = session.questions_answered(),
            total = session.scores().total(),
            "answer recorded"
        );

        match decision {
            Decision::Terminate { .. } => {
                let result = self.finalize().await?;
                Ok(SubmitOutcome {
                    entry,
                    decision,
                    next: NextStep::Finished(result),
                })
            }
            Decision::EnterExtra { base_score } => {
                info!(session_id = %session_id, base_score = %base_score, "entering extra phase");
                let question = self.fetch_question().await?.clone();
                Ok(SubmitOutcome {
                    entry,
                    decision,
                    next: NextStep::Question(question),
                })
            }
            Decision::ContinueBase | Decision::ContinueExtra => {
                let question = self.fetch_question().await?.clone();
                Ok(SubmitOutcome {
                    entry,
                    decision,
                    next: NextStep::Question(question),
                })
            }
        }
    }

    /// Save the final result of a terminated session.
    ///
    /// Called automatically when the last score is submitted; call it again
    /// to retry a failed save.
    ///
    /// # Errors
    ///
    /// Returns `ExamError::InvalidState` unless the session has a final result
    /// that is not yet saved, and `ExamError::Finalize` (carrying the result)
    /// if the store rejects it.
    pub async fn finalize(&mut self) -> Result<FinalResult, ExamError> {
        let (session_id, result) = match &self.session {
            Some(s) if !s.is_saved() => match s.final_result() {
                Some(result) => (s.id(), *result),
                None => return Err(self.invalid("finalize")),
            },
            _ => return Err(self.invalid("finalize")),
        };

        if let Err(source) = self.store.set_final_result(session_id, &result).await {
            error!(
                session_id = %session_id,
                score = result.score,
                grade = %result.grade,
                error = %source,
                "final result not saved"
            );
            return Err(ExamError::Finalize { result, source });
        }

        let saved_at = self.clock.now();
        if let Some(session) = self.session.as_mut() {
            session.mark_saved(saved_at)?;
        }
        info!(
            session_id = %session_id,
            score = result.score,
            grade = %result.grade,
            questions = result.questions_answered,
            "exam finalized"
        );
        Ok(result)
    }
}

impl fmt::Debug for SessionController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionController")
            .field("state", &self.state())
            .field("policy", &self.policy)
            .field("session", &self.session.as_ref().map(ExamSession::id))
            .field("current_question", &self.current_question.as_ref().map(|q| q.id))
            .finish_non_exhaustive()
    }
}
