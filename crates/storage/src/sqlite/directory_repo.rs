use chrono::NaiveDate;
use exam_core::model::{Exam, Examinee};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{conn, exam_id_from_i64, examinee_id_from_i64, id_i64, ser};
use crate::repository::{ExamDirectory, StorageError, StudentDirectory};

#[async_trait::async_trait]
impl StudentDirectory for SqliteRepository {
    async fn upsert_student(&self, student: &Examinee) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO students (id, full_name)
            VALUES (?1, ?2)
            ON CONFLICT(id) DO UPDATE SET full_name = excluded.full_name
            ",
        )
        .bind(id_i64("student_id", student.id.value())?)
        .bind(&student.full_name)
        .execute(&self.pool)
        .await
        .map_err(conn)?;
        Ok(())
    }

    async fn list_students(&self) -> Result<Vec<Examinee>, StorageError> {
        let rows = sqlx::query("SELECT id, full_name FROM students ORDER BY full_name, id")
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;

        rows.iter()
            .map(|row| {
                Ok(Examinee {
                    id: examinee_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
                    full_name: row.try_get("full_name").map_err(ser)?,
                })
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl ExamDirectory for SqliteRepository {
    async fn upsert_exam(&self, exam: &Exam) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO exams (id, name, held_on)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                held_on = excluded.held_on
            ",
        )
        .bind(id_i64("exam_id", exam.id.value())?)
        .bind(&exam.name)
        .bind(exam.held_on)
        .execute(&self.pool)
        .await
        .map_err(conn)?;
        Ok(())
    }

    async fn list_exams(&self) -> Result<Vec<Exam>, StorageError> {
        let rows = sqlx::query("SELECT id, name, held_on FROM exams ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;

        rows.iter()
            .map(|row| {
                Ok(Exam {
                    id: exam_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
                    name: row.try_get("name").map_err(ser)?,
                    held_on: row.try_get::<Option<NaiveDate>, _>("held_on").map_err(ser)?,
                })
            })
            .collect()
    }
}
