use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GradeError {
    #[error("invalid grade tier value: {0}")]
    InvalidTier(u8),
}

/// Final grade of an oral exam.
///
/// Persisted as the numeric tier (`5` down to `2`); labels are for display
/// only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradeTier {
    Unsatisfactory,
    Satisfactory,
    Good,
    Excellent,
}

impl GradeTier {
    /// Numeric tier stored alongside the session.
    #[must_use]
    pub fn value(self) -> u8 {
        match self {
            GradeTier::Excellent => 5,
            GradeTier::Good => 4,
            GradeTier::Satisfactory => 3,
            GradeTier::Unsatisfactory => 2,
        }
    }

    /// Converts a stored numeric tier back to a `GradeTier`.
    ///
    /// # Errors
    ///
    /// Returns `GradeError::InvalidTier` if the value is not in `2..=5`.
    pub fn from_value(value: u8) -> Result<Self, GradeError> {
        match value {
            5 => Ok(GradeTier::Excellent),
            4 => Ok(GradeTier::Good),
            3 => Ok(GradeTier::Satisfactory),
            2 => Ok(GradeTier::Unsatisfactory),
            _ => Err(GradeError::InvalidTier(value)),
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            GradeTier::Excellent => "excellent",
            GradeTier::Good => "good",
            GradeTier::Satisfactory => "satisfactory",
            GradeTier::Unsatisfactory => "unsatisfactory",
        }
    }
}

impl fmt::Display for GradeTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Maps a final exam score to a grade tier.
#[derive(Debug, Clone, Copy, Default)]
pub struct GradeMapper;

impl GradeMapper {
    /// Tier for any real score; each tier includes its lower bound.
    #[must_use]
    pub fn grade(score: f64) -> GradeTier {
        if score >= 6.0 {
            GradeTier::Excellent
        } else if score >= 5.0 {
            GradeTier::Good
        } else if score >= 4.0 {
            GradeTier::Satisfactory
        } else {
            GradeTier::Unsatisfactory
        }
    }

    /// Tier for a finalized whole-number score.
    #[must_use]
    pub fn for_points(points: u32) -> GradeTier {
        Self::grade(f64::from(points))
    }
}
