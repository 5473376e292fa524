use exam_core::model::{ExamId, Question};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use super::SqliteRepository;
use super::mapping::{conn, exam_id_from_i64, id_i64, question_id_from_i64, ser};
use crate::repository::{QuestionSource, StorageError};

fn map_question_row(row: &SqliteRow) -> Result<Question, StorageError> {
    Ok(Question {
        id: question_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        exam_id: exam_id_from_i64(row.try_get::<i64, _>("exam_id").map_err(ser)?)?,
        text: row.try_get("text").map_err(ser)?,
        answer: row.try_get("answer").map_err(ser)?,
    })
}

#[async_trait::async_trait]
impl QuestionSource for SqliteRepository {
    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO questions (id, exam_id, text, answer)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET
                exam_id = excluded.exam_id,
                text = excluded.text,
                answer = excluded.answer
            ",
        )
        .bind(id_i64("question_id", question.id.value())?)
        .bind(id_i64("exam_id", question.exam_id.value())?)
        .bind(&question.text)
        .bind(&question.answer)
        .execute(&self.pool)
        .await
        .map_err(conn)?;
        Ok(())
    }

    async fn random_question(&self, exam_id: ExamId) -> Result<Option<Question>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, exam_id, text, answer
            FROM questions
            WHERE exam_id = ?1
            ORDER BY RANDOM()
            LIMIT 1
            ",
        )
        .bind(id_i64("exam_id", exam_id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(map_question_row).transpose()
    }
}
