use std::sync::Arc;

use exam_core::model::{Exam, Examinee};
use storage::repository::{ExamDirectory, StorageError, StudentDirectory};

/// Read access to the students and exams an examiner can pick from.
#[derive(Clone)]
pub struct DirectoryService {
    students: Arc<dyn StudentDirectory>,
    exams: Arc<dyn ExamDirectory>,
}

impl DirectoryService {
    #[must_use]
    pub fn new(students: Arc<dyn StudentDirectory>, exams: Arc<dyn ExamDirectory>) -> Self {
        Self { students, exams }
    }

    /// List students ordered by name, keeping those whose name contains
    /// `search` (case-insensitive). A blank or missing search lists everyone.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if repository access fails.
    pub async fn examinees(&self, search: Option<&str>) -> Result<Vec<Examinee>, StorageError> {
        let mut students = self.students.list_students().await?;
        if let Some(query) = search {
            students.retain(|s| s.matches(query));
        }
        Ok(students)
    }

    /// List exams ordered by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if repository access fails.
    pub async fn exams(&self) -> Result<Vec<Exam>, StorageError> {
        self.exams.list_exams().await
    }
}
