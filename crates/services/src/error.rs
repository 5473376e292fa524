//! Shared error types for the services crate.

use thiserror::Error;

use exam_core::PolicyError;
use exam_core::model::{ExamId, ExamineeId, FinalResult, ScoreError, SessionError};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

use crate::sessions::ControllerState;

/// Why a question could not be fetched.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuestionFetchFailure {
    #[error("no question available for exam {0}")]
    NoQuestionAvailable(ExamId),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `SessionController`.
///
/// External failures leave the session in its last consistent state so the
/// operator can repeat the same operation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExamError {
    #[error(transparent)]
    InvalidScore(#[from] ScoreError),
    #[error("cannot {operation} while the session is {state}")]
    InvalidState {
        operation: &'static str,
        state: ControllerState,
    },
    #[error("failed to create exam session: {0}")]
    SessionCreate(#[source] StorageError),
    #[error("failed to fetch question: {0}")]
    QuestionFetch(#[from] QuestionFetchFailure),
    #[error("final grade {} was computed but not saved: {source}", .result.grade)]
    Finalize {
        result: FinalResult,
        #[source]
        source: StorageError,
    },
    #[error(transparent)]
    Policy(#[from] PolicyError),
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl ExamError {
    /// Result computed in memory, if this error happened while saving it.
    #[must_use]
    pub fn unsaved_result(&self) -> Option<&FinalResult> {
        match self {
            ExamError::Finalize { result, .. } => Some(result),
            _ => None,
        }
    }
}

/// Errors emitted by directory and result lookups.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LookupError {
    #[error("no exam session for student {examinee_id} and exam {exam_id}")]
    NoSession {
        examinee_id: ExamineeId,
        exam_id: ExamId,
    },
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping exam services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
}
