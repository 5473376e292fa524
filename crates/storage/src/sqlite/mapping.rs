use exam_core::GradeTier;
use exam_core::model::{ExamId, ExamineeId, QuestionId, ScoreValue, SessionId};

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn id_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn examinee_id_from_i64(v: i64) -> Result<ExamineeId, StorageError> {
    Ok(ExamineeId::new(i64_to_u64("student_id", v)?))
}

pub(crate) fn exam_id_from_i64(v: i64) -> Result<ExamId, StorageError> {
    Ok(ExamId::new(i64_to_u64("exam_id", v)?))
}

pub(crate) fn question_id_from_i64(v: i64) -> Result<QuestionId, StorageError> {
    Ok(QuestionId::new(i64_to_u64("question_id", v)?))
}

pub(crate) fn session_id_from_i64(v: i64) -> Result<SessionId, StorageError> {
    Ok(SessionId::new(i64_to_u64("session_id", v)?))
}

/// Scores are stored as the literal points value (`0`, `0.5`, `1`).
pub(crate) fn score_from_f64(v: f64) -> Result<ScoreValue, StorageError> {
    ScoreValue::try_from(v).map_err(ser)
}

pub(crate) fn grade_from_i64(v: i64) -> Result<GradeTier, StorageError> {
    let raw = u8::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid grade: {v}")))?;
    GradeTier::from_value(raw).map_err(ser)
}

pub(crate) fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}
