use exam_core::model::{ExamId, ExamineeId, FinalResult, QuestionId, ScoreValue, SessionId};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use super::SqliteRepository;
use super::mapping::{
    conn, exam_id_from_i64, examinee_id_from_i64, grade_from_i64, id_i64, question_id_from_i64,
    score_from_f64, ser, session_id_from_i64, u32_from_i64,
};
use crate::repository::{
    AnswerRecord, SessionHistory, SessionRecord, SessionStore, StorageError, StoredResult,
};

fn map_answer_row(row: &SqliteRow) -> Result<AnswerRecord, StorageError> {
    Ok(AnswerRecord {
        question_id: question_id_from_i64(row.try_get::<i64, _>("question_id").map_err(ser)?)?,
        question: row.try_get("text").map_err(ser)?,
        correct_answer: row.try_get("answer").map_err(ser)?,
        value: score_from_f64(row.try_get::<f64, _>("result").map_err(ser)?)?,
    })
}

fn map_result(row: &SqliteRow) -> Result<Option<StoredResult>, StorageError> {
    let score: Option<i64> = row.try_get("final_score").map_err(ser)?;
    let grade: Option<i64> = row.try_get("grade").map_err(ser)?;
    match (score, grade) {
        (Some(score), Some(grade)) => Ok(Some(StoredResult {
            score: u32_from_i64("final_score", score)?,
            grade: grade_from_i64(grade)?,
        })),
        (None, None) => Ok(None),
        _ => Err(StorageError::Serialization(
            "final_score and grade must be set together".into(),
        )),
    }
}

#[async_trait::async_trait]
impl SessionStore for SqliteRepository {
    async fn create_session(
        &self,
        examinee_id: ExamineeId,
        exam_id: ExamId,
    ) -> Result<SessionId, StorageError> {
        let res = sqlx::query(
            r"
                INSERT INTO exam_sessions (student_id, exam_id)
                VALUES (?1, ?2)
            ",
        )
        .bind(id_i64("student_id", examinee_id.value())?)
        .bind(id_i64("exam_id", exam_id.value())?)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        session_id_from_i64(res.last_insert_rowid())
    }

    async fn append_answer(
        &self,
        session_id: SessionId,
        question_id: QuestionId,
        value: ScoreValue,
    ) -> Result<(), StorageError> {
        let res = sqlx::query(
            r"
                INSERT INTO exam_answers (session_id, question_id, result)
                SELECT ?1, ?2, ?3
                WHERE EXISTS (SELECT 1 FROM exam_sessions WHERE id = ?1)
            ",
        )
        .bind(id_i64("session_id", session_id.value())?)
        .bind(id_i64("question_id", question_id.value())?)
        .bind(value.as_f64())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn set_final_result(
        &self,
        session_id: SessionId,
        result: &FinalResult,
    ) -> Result<(), StorageError> {
        let id = id_i64("session_id", session_id.value())?;
        let res = sqlx::query(
            r"
                UPDATE exam_sessions
                SET final_score = ?2, grade = ?3
                WHERE id = ?1 AND final_score IS NULL
            ",
        )
        .bind(id)
        .bind(i64::from(result.score))
        .bind(i64::from(result.grade.value()))
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        if res.rows_affected() > 0 {
            return Ok(());
        }

        // Finalized sessions are history; tell them apart from unknown ids.
        let exists = sqlx::query("SELECT 1 FROM exam_sessions WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;
        Err(if exists.is_some() {
            StorageError::Conflict
        } else {
            StorageError::NotFound
        })
    }
}

#[async_trait::async_trait]
impl SessionHistory for SqliteRepository {
    async fn latest_session(
        &self,
        examinee_id: ExamineeId,
        exam_id: ExamId,
    ) -> Result<SessionRecord, StorageError> {
        let row = sqlx::query(
            r"
                SELECT id, student_id, exam_id, final_score, grade
                FROM exam_sessions
                WHERE student_id = ?1 AND exam_id = ?2
                ORDER BY id DESC
                LIMIT 1
            ",
        )
        .bind(id_i64("student_id", examinee_id.value())?)
        .bind(id_i64("exam_id", exam_id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?
        .ok_or(StorageError::NotFound)?;

        let id: i64 = row.try_get("id").map_err(ser)?;
        let answer_rows = sqlx::query(
            r"
                SELECT a.question_id, a.result, q.text, q.answer
                FROM exam_answers a
                LEFT JOIN questions q ON q.id = a.question_id
                WHERE a.session_id = ?1
                ORDER BY a.id ASC
            ",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut answers = Vec::with_capacity(answer_rows.len());
        for answer in &answer_rows {
            answers.push(map_answer_row(answer)?);
        }

        Ok(SessionRecord {
            id: session_id_from_i64(id)?,
            examinee_id: examinee_id_from_i64(row.try_get::<i64, _>("student_id").map_err(ser)?)?,
            exam_id: exam_id_from_i64(row.try_get::<i64, _>("exam_id").map_err(ser)?)?,
            answers,
            result: map_result(&row)?,
        })
    }
}
