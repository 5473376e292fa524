use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::model::ids::{ExamId, ExamineeId};

/// A student that can be picked for an oral exam.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Examinee {
    pub id: ExamineeId,
    pub full_name: String,
}

impl Examinee {
    #[must_use]
    pub fn new(id: ExamineeId, full_name: impl Into<String>) -> Self {
        Self {
            id,
            full_name: full_name.into(),
        }
    }

    /// Case-insensitive substring match on the full name.
    ///
    /// A blank query matches everyone.
    #[must_use]
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim();
        query.is_empty()
            || self
                .full_name
                .to_lowercase()
                .contains(&query.to_lowercase())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exam {
    pub id: ExamId,
    pub name: String,
    pub held_on: Option<NaiveDate>,
}

impl Exam {
    #[must_use]
    pub fn new(id: ExamId, name: impl Into<String>, held_on: Option<NaiveDate>) -> Self {
        Self {
            id,
            name: name.into(),
            held_on,
        }
    }
}
