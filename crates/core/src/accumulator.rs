use chrono::{DateTime, Utc};

use crate::model::{HalfPoints, QuestionId, ScoreEntry, ScoreError, ScoreValue};

/// Running tally of examiner awards for one session.
///
/// The answered count is always the length of the log, so the two cannot
/// drift apart.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScoreAccumulator {
    entries: Vec<ScoreEntry>,
    total: HalfPoints,
}

impl ScoreAccumulator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an award and add it to the total.
    pub fn record(&mut self, entry: ScoreEntry) -> &ScoreEntry {
        self.total = self.total.plus(entry.value);
        self.entries.push(entry);
        &self.entries[self.entries.len() - 1]
    }

    /// Validate a raw numeric award, then append it.
    ///
    /// # Errors
    ///
    /// Returns `ScoreError::InvalidScore` if `raw` is not 0, 0.5 or 1. The
    /// accumulator is left untouched in that case.
    pub fn try_record(
        &mut self,
        question_id: QuestionId,
        raw: f64,
        answered_at: DateTime<Utc>,
        persisted: bool,
    ) -> Result<&ScoreEntry, ScoreError> {
        let value = ScoreValue::try_from(raw)?;
        Ok(self.record(ScoreEntry::new(question_id, value, answered_at, persisted)))
    }

    #[must_use]
    pub fn total(&self) -> f64 {
        self.total.as_f64()
    }

    #[must_use]
    pub fn total_points(&self) -> HalfPoints {
        self.total
    }

    #[must_use]
    pub fn answered_count(&self) -> u32 {
        u32::try_from(self.entries.len()).unwrap_or(u32::MAX)
    }

    #[must_use]
    pub fn entries(&self) -> &[ScoreEntry] {
        &self.entries
    }

    #[must_use]
    pub fn latest(&self) -> Option<&ScoreEntry> {
        self.entries.last()
    }

    /// Number of answers the session store has not acknowledged.
    #[must_use]
    pub fn unconfirmed_count(&self) -> usize {
        self.entries.iter().filter(|e| !e.persisted).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn entry(id: u64, value: ScoreValue) -> ScoreEntry {
        ScoreEntry::new(QuestionId::new(id), value, fixed_now(), true)
    }

    #[test]
    fn record_updates_total_and_count() {
        let mut acc = ScoreAccumulator::new();
        acc.record(entry(1, ScoreValue::Full));
        acc.record(entry(2, ScoreValue::Half));
        acc.record(entry(3, ScoreValue::Zero));

        assert_eq!(acc.answered_count(), 3);
        assert_eq!(acc.total(), 1.5);
        assert_eq!(acc.total_points(), HalfPoints::new(3));
        assert_eq!(acc.latest().map(|e| e.value), Some(ScoreValue::Zero));
    }

    #[test]
    fn invalid_raw_score_leaves_state_untouched() {
        let mut acc = ScoreAccumulator::new();
        acc.record(entry(1, ScoreValue::Half));
        let before = acc.clone();

        for bad in [0.3, -1.0, 2.0, f64::NAN] {
            let err = acc
                .try_record(QuestionId::new(9), bad, fixed_now(), true)
                .unwrap_err();
            assert!(matches!(err, ScoreError::InvalidScore(_)));
        }

        assert_eq!(acc, before);
        assert_eq!(acc.answered_count(), 1);
    }

    #[test]
    fn count_grows_by_one_and_log_keeps_order() {
        let mut acc = ScoreAccumulator::new();
        let awards = [1.0, 0.5, 0.0, 1.0, 0.5];
        for (i, raw) in awards.iter().enumerate() {
            let before = acc.answered_count();
            acc.try_record(QuestionId::new(i as u64 + 10), *raw, fixed_now(), true)
                .unwrap();
            assert_eq!(acc.answered_count(), before + 1);
        }

        let ids: Vec<u64> = acc.entries().iter().map(|e| e.question_id.value()).collect();
        assert_eq!(ids, [10, 11, 12, 13, 14]);
        let values: Vec<f64> = acc.entries().iter().map(|e| e.value.as_f64()).collect();
        assert_eq!(values, awards);
        assert_eq!(acc.total(), 3.0);
    }

    #[test]
    fn unconfirmed_answers_are_counted() {
        let mut acc = ScoreAccumulator::new();
        acc.record(entry(1, ScoreValue::Full));
        acc.record(ScoreEntry::new(QuestionId::new(2), ScoreValue::Full, fixed_now(), false));
        assert_eq!(acc.unconfirmed_count(), 1);
    }
}
