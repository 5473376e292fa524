use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::model::ids::QuestionId;

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum ScoreError {
    #[error("invalid score {0}: expected 0, 0.5 or 1")]
    InvalidScore(f64),
}

//
// ─── SCORE VALUE ──────────────────────────────────────────────────────────────
//

/// Points an examiner may award for a single answer.
///
/// Serializes as the plain number `0`, `0.5` or `1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "f64", try_from = "f64")]
pub enum ScoreValue {
    Zero,
    Half,
    Full,
}

impl ScoreValue {
    pub const ALL: [ScoreValue; 3] = [ScoreValue::Zero, ScoreValue::Half, ScoreValue::Full];

    /// Value expressed in half-points (0, 1 or 2).
    #[must_use]
    pub fn half_points(self) -> u32 {
        match self {
            ScoreValue::Zero => 0,
            ScoreValue::Half => 1,
            ScoreValue::Full => 2,
        }
    }

    #[must_use]
    pub fn as_f64(self) -> f64 {
        f64::from(self.half_points()) / 2.0
    }
}

impl TryFrom<f64> for ScoreValue {
    type Error = ScoreError;

    #[allow(clippy::float_cmp)]
    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if value == 0.0 {
            Ok(ScoreValue::Zero)
        } else if value == 0.5 {
            Ok(ScoreValue::Half)
        } else if value == 1.0 {
            Ok(ScoreValue::Full)
        } else {
            Err(ScoreError::InvalidScore(value))
        }
    }
}

impl From<ScoreValue> for f64 {
    fn from(value: ScoreValue) -> Self {
        value.as_f64()
    }
}

impl fmt::Display for ScoreValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoreValue::Zero => f.write_str("0"),
            ScoreValue::Half => f.write_str("0.5"),
            ScoreValue::Full => f.write_str("1"),
        }
    }
}

//
// ─── HALF POINTS ──────────────────────────────────────────────────────────────
//

/// Exact score total counted in half-points.
///
/// Every award is a multiple of 0.5, so totals are kept as integers and only
/// converted to `f64` for display.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct HalfPoints(u32);

impl HalfPoints {
    pub const ZERO: HalfPoints = HalfPoints(0);

    #[must_use]
    pub fn new(half_points: u32) -> Self {
        Self(half_points)
    }

    #[must_use]
    pub fn raw(self) -> u32 {
        self.0
    }

    #[must_use]
    pub fn plus(self, value: ScoreValue) -> Self {
        Self(self.0.saturating_add(value.half_points()))
    }

    #[must_use]
    pub fn is_whole(self) -> bool {
        self.0 % 2 == 0
    }

    #[must_use]
    pub fn floor(self) -> u32 {
        self.0 / 2
    }

    #[must_use]
    pub fn ceil(self) -> u32 {
        self.0.div_ceil(2)
    }

    #[must_use]
    pub fn as_f64(self) -> f64 {
        f64::from(self.0) / 2.0
    }
}

impl fmt::Display for HalfPoints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_whole() {
            write!(f, "{}", self.floor())
        } else {
            write!(f, "{}.5", self.floor())
        }
    }
}

//
// ─── SCORE ENTRY ──────────────────────────────────────────────────────────────
//

/// One examiner award, appended in answer order and never edited afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub question_id: QuestionId,
    pub value: ScoreValue,
    pub answered_at: DateTime<Utc>,
    /// Whether the session store acknowledged this answer.
    pub persisted: bool,
}

impl ScoreEntry {
    #[must_use]
    pub fn new(
        question_id: QuestionId,
        value: ScoreValue,
        answered_at: DateTime<Utc>,
        persisted: bool,
    ) -> Self {
        Self {
            question_id,
            value,
            answered_at,
            persisted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_only_the_three_awards() {
        assert_eq!(ScoreValue::try_from(0.0).unwrap(), ScoreValue::Zero);
        assert_eq!(ScoreValue::try_from(0.5).unwrap(), ScoreValue::Half);
        assert_eq!(ScoreValue::try_from(1.0).unwrap(), ScoreValue::Full);

        for bad in [-0.5, 0.25, 0.75, 1.5, 2.0, f64::NAN, f64::INFINITY] {
            assert!(ScoreValue::try_from(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn half_points_rounding() {
        let total = HalfPoints::new(11);
        assert!(!total.is_whole());
        assert_eq!(total.floor(), 5);
        assert_eq!(total.ceil(), 6);
        assert_eq!(total.to_string(), "5.5");

        let whole = HalfPoints::new(8);
        assert!(whole.is_whole());
        assert_eq!(whole.floor(), 4);
        assert_eq!(whole.ceil(), 4);
        assert_eq!(whole.to_string(), "4");
    }

    #[test]
    fn score_value_displays_as_points() {
        let shown: Vec<String> = ScoreValue::ALL.iter().map(ToString::to_string).collect();
        assert_eq!(shown, ["0", "0.5", "1"]);
        assert_eq!(f64::from(ScoreValue::Half), 0.5);
    }
}
