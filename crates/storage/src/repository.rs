use async_trait::async_trait;
use exam_core::GradeTier;
use exam_core::model::{
    Exam, ExamId, Examinee, ExamineeId, FinalResult, Question, QuestionId, ScoreValue, SessionId,
};
use rand::seq::IndexedRandom;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

//
// ─── RECORDS ──────────────────────────────────────────────────────────────────
//

/// Final score and grade as persisted for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoredResult {
    pub score: u32,
    pub grade: GradeTier,
}

impl From<&FinalResult> for StoredResult {
    fn from(result: &FinalResult) -> Self {
        Self {
            score: result.score,
            grade: result.grade,
        }
    }
}

/// One persisted answer, joined with its question when still available.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerRecord {
    pub question_id: QuestionId,
    pub question: Option<String>,
    pub correct_answer: Option<String>,
    pub value: ScoreValue,
}

/// Persisted view of an exam session, answers in the order they were given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub id: SessionId,
    pub examinee_id: ExamineeId,
    pub exam_id: ExamId,
    pub answers: Vec<AnswerRecord>,
    pub result: Option<StoredResult>,
}

//
// ─── CONTRACTS ────────────────────────────────────────────────────────────────
//

/// Pool of exam questions.
#[async_trait]
pub trait QuestionSource: Send + Sync {
    /// Persist or update a question.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the question cannot be stored.
    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError>;

    /// Draw a random question from an exam's pool.
    ///
    /// Returns `Ok(None)` when the pool is empty.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the pool cannot be read.
    async fn random_question(&self, exam_id: ExamId) -> Result<Option<Question>, StorageError>;
}

/// Write side of exam sessions.
///
/// The three calls are independent; no transaction spans them.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Open a new session and return its id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the session cannot be created.
    async fn create_session(
        &self,
        examinee_id: ExamineeId,
        exam_id: ExamId,
    ) -> Result<SessionId, StorageError>;

    /// Append an awarded score to the session's answer log.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` for an unknown session, or other
    /// storage errors.
    async fn append_answer(
        &self,
        session_id: SessionId,
        question_id: QuestionId,
        value: ScoreValue,
    ) -> Result<(), StorageError>;

    /// Store the final score and grade.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` for an unknown session,
    /// `StorageError::Conflict` if the session already has a final result, or
    /// other storage errors.
    async fn set_final_result(
        &self,
        session_id: SessionId,
        result: &FinalResult,
    ) -> Result<(), StorageError>;
}

/// Read side of exam sessions.
#[async_trait]
pub trait SessionHistory: Send + Sync {
    /// Latest session for an examinee/exam pair.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the pair has no session.
    async fn latest_session(
        &self,
        examinee_id: ExamineeId,
        exam_id: ExamId,
    ) -> Result<SessionRecord, StorageError>;
}

#[async_trait]
pub trait StudentDirectory: Send + Sync {
    /// Persist or update a student.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the student cannot be stored.
    async fn upsert_student(&self, student: &Examinee) -> Result<(), StorageError>;

    /// All students, ordered by full name.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the directory cannot be read.
    async fn list_students(&self) -> Result<Vec<Examinee>, StorageError>;
}

#[async_trait]
pub trait ExamDirectory: Send + Sync {
    /// Persist or update an exam.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the exam cannot be stored.
    async fn upsert_exam(&self, exam: &Exam) -> Result<(), StorageError>;

    /// All exams, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the directory cannot be read.
    async fn list_exams(&self) -> Result<Vec<Exam>, StorageError>;
}

//
// ─── IN-MEMORY ────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone)]
struct MemorySession {
    examinee_id: ExamineeId,
    exam_id: ExamId,
    answers: Vec<(QuestionId, ScoreValue)>,
    result: Option<StoredResult>,
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone)]
pub struct InMemoryRepository {
    students: Arc<Mutex<HashMap<ExamineeId, Examinee>>>,
    exams: Arc<Mutex<HashMap<ExamId, Exam>>>,
    questions: Arc<Mutex<HashMap<QuestionId, Question>>>,
    sessions: Arc<Mutex<HashMap<SessionId, MemorySession>>>,
    next_session_id: Arc<AtomicU64>,
}

fn poisoned<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self {
            students: Arc::new(Mutex::new(HashMap::new())),
            exams: Arc::new(Mutex::new(HashMap::new())),
            questions: Arc::new(Mutex::new(HashMap::new())),
            sessions: Arc::new(Mutex::new(HashMap::new())),
            next_session_id: Arc::new(AtomicU64::new(1)),
        }
    }
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QuestionSource for InMemoryRepository {
    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError> {
        let mut guard = self.questions.lock().map_err(poisoned)?;
        guard.insert(question.id, question.clone());
        Ok(())
    }

    async fn random_question(&self, exam_id: ExamId) -> Result<Option<Question>, StorageError> {
        let guard = self.questions.lock().map_err(poisoned)?;
        let pool: Vec<&Question> = guard.values().filter(|q| q.exam_id == exam_id).collect();
        Ok(pool.choose(&mut rand::rng()).map(|q| (*q).clone()))
    }
}

#[async_trait]
impl SessionStore for InMemoryRepository {
    async fn create_session(
        &self,
        examinee_id: ExamineeId,
        exam_id: ExamId,
    ) -> Result<SessionId, StorageError> {
        let mut guard = self.sessions.lock().map_err(poisoned)?;
        let id = SessionId::new(self.next_session_id.fetch_add(1, Ordering::Relaxed));
        guard.insert(
            id,
            MemorySession {
                examinee_id,
                exam_id,
                answers: Vec::new(),
                result: None,
            },
        );
        Ok(id)
    }

    async fn append_answer(
        &self,
        session_id: SessionId,
        question_id: QuestionId,
        value: ScoreValue,
    ) -> Result<(), StorageError> {
        let mut guard = self.sessions.lock().map_err(poisoned)?;
        let session = guard.get_mut(&session_id).ok_or(StorageError::NotFound)?;
        session.answers.push((question_id, value));
        Ok(())
    }

    async fn set_final_result(
        &self,
        session_id: SessionId,
        result: &FinalResult,
    ) -> Result<(), StorageError> {
        let mut guard = self.sessions.lock().map_err(poisoned)?;
        let session = guard.get_mut(&session_id).ok_or(StorageError::NotFound)?;
        if session.result.is_some() {
            return Err(StorageError::Conflict);
        }
        session.result = Some(StoredResult::from(result));
        Ok(())
    }
}

#[async_trait]
impl SessionHistory for InMemoryRepository {
    async fn latest_session(
        &self,
        examinee_id: ExamineeId,
        exam_id: ExamId,
    ) -> Result<SessionRecord, StorageError> {
        let (id, session) = {
            let guard = self.sessions.lock().map_err(poisoned)?;
            guard
                .iter()
                .filter(|(_, s)| s.examinee_id == examinee_id && s.exam_id == exam_id)
                .max_by_key(|(id, _)| **id)
                .map(|(id, s)| (*id, s.clone()))
                .ok_or(StorageError::NotFound)?
        };

        let questions = self.questions.lock().map_err(poisoned)?;
        let answers = session
            .answers
            .iter()
            .map(|(question_id, value)| {
                let question = questions.get(question_id);
                AnswerRecord {
                    question_id: *question_id,
                    question: question.map(|q| q.text.clone()),
                    correct_answer: question.map(|q| q.answer.clone()),
                    value: *value,
                }
            })
            .collect();

        Ok(SessionRecord {
            id,
            examinee_id: session.examinee_id,
            exam_id: session.exam_id,
            answers,
            result: session.result,
        })
    }
}

#[async_trait]
impl StudentDirectory for InMemoryRepository {
    async fn upsert_student(&self, student: &Examinee) -> Result<(), StorageError> {
        let mut guard = self.students.lock().map_err(poisoned)?;
        guard.insert(student.id, student.clone());
        Ok(())
    }

    async fn list_students(&self) -> Result<Vec<Examinee>, StorageError> {
        let guard = self.students.lock().map_err(poisoned)?;
        let mut out: Vec<Examinee> = guard.values().cloned().collect();
        out.sort_by(|a, b| a.full_name.cmp(&b.full_name).then(a.id.cmp(&b.id)));
        Ok(out)
    }
}

#[async_trait]
impl ExamDirectory for InMemoryRepository {
    async fn upsert_exam(&self, exam: &Exam) -> Result<(), StorageError> {
        let mut guard = self.exams.lock().map_err(poisoned)?;
        guard.insert(exam.id, exam.clone());
        Ok(())
    }

    async fn list_exams(&self) -> Result<Vec<Exam>, StorageError> {
        let guard = self.exams.lock().map_err(poisoned)?;
        let mut out: Vec<Exam> = guard.values().cloned().collect();
        out.sort_by_key(|e| e.id);
        Ok(out)
    }
}

/// Aggregates the exam repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub questions: Arc<dyn QuestionSource>,
    pub sessions: Arc<dyn SessionStore>,
    pub history: Arc<dyn SessionHistory>,
    pub students: Arc<dyn StudentDirectory>,
    pub exams: Arc<dyn ExamDirectory>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        Self {
            questions: Arc::new(repo.clone()),
            sessions: Arc::new(repo.clone()),
            history: Arc::new(repo.clone()),
            students: Arc::new(repo.clone()),
            exams: Arc::new(repo),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exam_core::model::{ExamSession, ScoreEntry};
    use exam_core::time::fixed_now;
    use exam_core::PhaseDecisionPolicy;

    fn question(id: u64, exam: u64) -> Question {
        Question::new(
            QuestionId::new(id),
            ExamId::new(exam),
            format!("Q{id}"),
            format!("A{id}"),
        )
    }

    fn terminal_result() -> FinalResult {
        let mut s = ExamSession::new(
            SessionId::new(1),
            ExamineeId::new(1),
            ExamId::new(1),
            fixed_now(),
        );
        for q in 1..=6 {
            s.record(ScoreEntry::new(
                QuestionId::new(q),
                ScoreValue::Full,
                fixed_now(),
                true,
            ))
            .unwrap();
            s.evaluate(&PhaseDecisionPolicy::default()).unwrap();
        }
        *s.final_result().unwrap()
    }

    #[tokio::test]
    async fn random_question_stays_within_exam() {
        let repo = InMemoryRepository::new();
        repo.upsert_question(&question(1, 1)).await.unwrap();
        repo.upsert_question(&question(2, 1)).await.unwrap();
        repo.upsert_question(&question(3, 2)).await.unwrap();

        for _ in 0..20 {
            let q = repo.random_question(ExamId::new(1)).await.unwrap().unwrap();
            assert_eq!(q.exam_id, ExamId::new(1));
        }
        assert!(repo.random_question(ExamId::new(9)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn session_round_trips_answers_and_result() {
        let repo = InMemoryRepository::new();
        repo.upsert_question(&question(1, 5)).await.unwrap();

        let id = repo
            .create_session(ExamineeId::new(3), ExamId::new(5))
            .await
            .unwrap();
        repo.append_answer(id, QuestionId::new(1), ScoreValue::Half)
            .await
            .unwrap();
        repo.append_answer(id, QuestionId::new(42), ScoreValue::Full)
            .await
            .unwrap();
        repo.set_final_result(id, &terminal_result()).await.unwrap();

        let record = repo
            .latest_session(ExamineeId::new(3), ExamId::new(5))
            .await
            .unwrap();
        assert_eq!(record.id, id);
        assert_eq!(record.answers.len(), 2);
        assert_eq!(record.answers[0].question.as_deref(), Some("Q1"));
        assert_eq!(record.answers[0].value, ScoreValue::Half);
        assert_eq!(record.answers[1].question, None);
        assert_eq!(
            record.result,
            Some(StoredResult {
                score: 6,
                grade: GradeTier::Excellent
            })
        );
    }

    #[tokio::test]
    async fn stored_result_cannot_be_overwritten() {
        let repo = InMemoryRepository::new();
        let id = repo
            .create_session(ExamineeId::new(1), ExamId::new(1))
            .await
            .unwrap();
        repo.set_final_result(id, &terminal_result()).await.unwrap();

        let mut lower = terminal_result();
        lower.score = 3;
        lower.grade = GradeTier::Unsatisfactory;
        let err = repo.set_final_result(id, &lower).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict));

        let record = repo
            .latest_session(ExamineeId::new(1), ExamId::new(1))
            .await
            .unwrap();
        assert_eq!(record.result.map(|r| r.score), Some(6));

        let err = repo
            .set_final_result(SessionId::new(99), &terminal_result())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let repo = InMemoryRepository::new();
        let err = repo
            .append_answer(SessionId::new(99), QuestionId::new(1), ScoreValue::Zero)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound));

        let err = repo
            .latest_session(ExamineeId::new(1), ExamId::new(1))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
    }

    #[tokio::test]
    async fn latest_session_prefers_newest() {
        let repo = InMemoryRepository::new();
        let first = repo
            .create_session(ExamineeId::new(1), ExamId::new(1))
            .await
            .unwrap();
        let second = repo
            .create_session(ExamineeId::new(1), ExamId::new(1))
            .await
            .unwrap();
        assert!(second > first);

        let record = repo
            .latest_session(ExamineeId::new(1), ExamId::new(1))
            .await
            .unwrap();
        assert_eq!(record.id, second);
    }

    #[tokio::test]
    async fn students_are_listed_by_name() {
        let repo = InMemoryRepository::new();
        repo.upsert_student(&Examinee::new(ExamineeId::new(2), "Boris"))
            .await
            .unwrap();
        repo.upsert_student(&Examinee::new(ExamineeId::new(1), "Anna"))
            .await
            .unwrap();

        let names: Vec<String> = repo
            .list_students()
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.full_name)
            .collect();
        assert_eq!(names, ["Anna", "Boris"]);
    }
}
