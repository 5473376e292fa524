use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::accumulator::ScoreAccumulator;
use crate::grade::{GradeMapper, GradeTier};
use crate::model::{ExamId, ExamineeId, HalfPoints, ScoreEntry, SessionId};
use crate::policy::{Decision, PhaseDecisionPolicy, PolicyError, PolicyInput, TerminationReason};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    #[error("session {0} already has a final result")]
    AlreadyTerminal(SessionId),
    #[error("session {0} has no final result yet")]
    NotTerminal(SessionId),
    #[error("session {0} was already saved")]
    AlreadySaved(SessionId),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Base,
    Extra,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Base => f.write_str("base"),
            Phase::Extra => f.write_str("extra"),
        }
    }
}

/// Outcome of a terminated session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalResult {
    pub score: u32,
    pub grade: GradeTier,
    pub reason: TerminationReason,
    /// Total of the base phase, before any tie-break.
    pub base_score: HalfPoints,
    pub questions_answered: u32,
}

impl FinalResult {
    #[must_use]
    pub fn went_to_extra(&self) -> bool {
        self.reason != TerminationReason::WholeBaseTotal
    }
}

/// One examiner-administered run of one exam for one examinee.
///
/// Owned by a single controller; answers can only be appended, and once a
/// final result exists the log is closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamSession {
    id: SessionId,
    examinee_id: ExamineeId,
    exam_id: ExamId,
    scores: ScoreAccumulator,
    phase: Phase,
    base_score: Option<HalfPoints>,
    final_result: Option<FinalResult>,
    started_at: DateTime<Utc>,
    saved_at: Option<DateTime<Utc>>,
}

impl ExamSession {
    #[must_use]
    pub fn new(
        id: SessionId,
        examinee_id: ExamineeId,
        exam_id: ExamId,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            examinee_id,
            exam_id,
            scores: ScoreAccumulator::new(),
            phase: Phase::Base,
            base_score: None,
            final_result: None,
            started_at,
            saved_at: None,
        }
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn examinee_id(&self) -> ExamineeId {
        self.examinee_id
    }

    #[must_use]
    pub fn exam_id(&self) -> ExamId {
        self.exam_id
    }

    #[must_use]
    pub fn scores(&self) -> &ScoreAccumulator {
        &self.scores
    }

    #[must_use]
    pub fn entries(&self) -> &[ScoreEntry] {
        self.scores.entries()
    }

    #[must_use]
    pub fn questions_answered(&self) -> u32 {
        self.scores.answered_count()
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Base-phase total, frozen when the extra phase begins.
    #[must_use]
    pub fn base_score(&self) -> Option<HalfPoints> {
        self.base_score
    }

    #[must_use]
    pub fn final_result(&self) -> Option<&FinalResult> {
        self.final_result.as_ref()
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn saved_at(&self) -> Option<DateTime<Utc>> {
        self.saved_at
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.final_result.is_some()
    }

    #[must_use]
    pub fn is_saved(&self) -> bool {
        self.saved_at.is_some()
    }

    /// Answers given after the base phase ended.
    #[must_use]
    pub fn extra_answered(&self) -> u32 {
        match self.phase {
            Phase::Base => 0,
            Phase::Extra => self
                .questions_answered()
                .saturating_sub(crate::policy::BASE_QUESTION_COUNT),
        }
    }

    /// Append an award to the log.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AlreadyTerminal` once a final result exists.
    pub fn record(&mut self, entry: ScoreEntry) -> Result<&ScoreEntry, SessionError> {
        if self.is_terminal() {
            return Err(SessionError::AlreadyTerminal(self.id));
        }
        Ok(self.scores.record(entry))
    }

    /// Consult the policy about the latest answer and apply its decision.
    ///
    /// # Errors
    ///
    /// Returns `PolicyError` if the session state is inconsistent with the
    /// policy's expectations; the session is left unchanged.
    pub fn evaluate(&mut self, policy: &PhaseDecisionPolicy) -> Result<Decision, PolicyError> {
        let latest = self
            .scores
            .latest()
            .map(|e| e.value)
            .ok_or(PolicyError::NothingRecorded)?;
        let decision = policy.decide(PolicyInput {
            answered: self.questions_answered(),
            total: self.scores.total_points(),
            phase: self.phase,
            latest,
            base_score: self.base_score,
        })?;

        match decision {
            Decision::ContinueBase | Decision::ContinueExtra => {}
            Decision::EnterExtra { base_score } => {
                self.phase = Phase::Extra;
                self.base_score = Some(base_score);
            }
            Decision::Terminate {
                final_score,
                reason,
            } => {
                let base_score = self.base_score.unwrap_or(self.scores.total_points());
                self.final_result = Some(FinalResult {
                    score: final_score,
                    grade: GradeMapper::for_points(final_score),
                    reason,
                    base_score,
                    questions_answered: self.questions_answered(),
                });
            }
        }
        Ok(decision)
    }

    /// Record that the final result reached the session store.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotTerminal` before a final result exists, or
    /// `SessionError::AlreadySaved` if called twice.
    pub fn mark_saved(&mut self, at: DateTime<Utc>) -> Result<(), SessionError> {
        if !self.is_terminal() {
            return Err(SessionError::NotTerminal(self.id));
        }
        if self.is_saved() {
            return Err(SessionError::AlreadySaved(self.id));
        }
        self.saved_at = Some(at);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{QuestionId, ScoreValue};
    use crate::policy::BASE_QUESTION_COUNT;
    use crate::time::fixed_now;

    fn session() -> ExamSession {
        ExamSession::new(
            SessionId::new(1),
            ExamineeId::new(10),
            ExamId::new(20),
            fixed_now(),
        )
    }

    fn answer(
        s: &mut ExamSession,
        policy: &PhaseDecisionPolicy,
        q: u64,
        value: ScoreValue,
    ) -> Decision {
        s.record(ScoreEntry::new(QuestionId::new(q), value, fixed_now(), true))
            .unwrap();
        s.evaluate(policy).unwrap()
    }

    #[test]
    fn whole_total_finalizes_after_six() {
        let policy = PhaseDecisionPolicy::default();
        let mut s = session();
        for q in 1..=5 {
            assert_eq!(answer(&mut s, &policy, q, ScoreValue::Full), Decision::ContinueBase);
        }
        assert!(answer(&mut s, &policy, 6, ScoreValue::Full).is_terminal());

        let result = s.final_result().unwrap();
        assert_eq!(result.score, 6);
        assert_eq!(result.grade, GradeTier::Excellent);
        assert_eq!(result.questions_answered, 6);
        assert!(!result.went_to_extra());
        assert_eq!(s.phase(), Phase::Base);
    }

    #[test]
    fn fractional_total_freezes_base_score() {
        let policy = PhaseDecisionPolicy::default();
        let mut s = session();
        for q in 1..=5 {
            answer(&mut s, &policy, q, ScoreValue::Full);
        }
        let d = answer(&mut s, &policy, 6, ScoreValue::Half);
        assert_eq!(
            d,
            Decision::EnterExtra {
                base_score: HalfPoints::new(11)
            }
        );
        assert_eq!(s.phase(), Phase::Extra);

        // Inconclusive tie-breaks do not move the frozen score.
        answer(&mut s, &policy, 7, ScoreValue::Half);
        answer(&mut s, &policy, 8, ScoreValue::Half);
        assert_eq!(s.base_score(), Some(HalfPoints::new(11)));
        assert_eq!(s.extra_answered(), 2);

        answer(&mut s, &policy, 9, ScoreValue::Zero);
        let result = s.final_result().unwrap();
        assert_eq!(result.score, 5);
        assert_eq!(result.grade, GradeTier::Good);
        assert_eq!(result.base_score, HalfPoints::new(11));
        assert_eq!(result.questions_answered, 9);
        assert!(result.went_to_extra());
    }

    #[test]
    fn every_base_sequence_ends_as_expected() {
        let policy = PhaseDecisionPolicy::default();
        let mut fractional = 0;
        for code in 0..3_u32.pow(BASE_QUESTION_COUNT) {
            let mut s = session();
            let mut digits = code;
            let mut half_points = 0;
            let mut last = None;
            for q in 1..=u64::from(BASE_QUESTION_COUNT) {
                let value = ScoreValue::ALL[(digits % 3) as usize];
                digits /= 3;
                half_points += value.half_points();
                last = Some(answer(&mut s, &policy, q, value));
            }
            let last = last.unwrap();

            if half_points % 2 == 0 {
                let points = half_points / 2;
                assert_eq!(
                    last,
                    Decision::Terminate {
                        final_score: points,
                        reason: TerminationReason::WholeBaseTotal
                    },
                    "sequence {code}"
                );
                let result = s.final_result().unwrap();
                assert_eq!(result.questions_answered, BASE_QUESTION_COUNT);
                assert_eq!(result.grade, GradeMapper::for_points(points));
                continue;
            }

            fractional += 1;
            let base = HalfPoints::new(half_points);
            assert_eq!(last, Decision::EnterExtra { base_score: base }, "sequence {code}");
            for (tie_break, expected) in [
                (ScoreValue::Zero, base.floor()),
                (ScoreValue::Full, base.ceil()),
            ] {
                let mut ended = s.clone();
                answer(&mut ended, &policy, 7, tie_break);
                let result = ended.final_result().unwrap();
                assert_eq!(result.score, expected, "sequence {code} then {tie_break}");
                assert_eq!(result.grade, GradeMapper::for_points(expected));
                assert_eq!(result.base_score, base);
            }
        }
        assert!(fractional > 0);
    }

    #[test]
    fn terminal_session_rejects_answers_and_double_save() {
        let policy = PhaseDecisionPolicy::default();
        let mut s = session();
        for q in 1..=6 {
            answer(&mut s, &policy, q, ScoreValue::Zero);
        }
        assert!(s.is_terminal());

        let err = s
            .record(ScoreEntry::new(QuestionId::new(7), ScoreValue::Full, fixed_now(), true))
            .unwrap_err();
        assert_eq!(err, SessionError::AlreadyTerminal(SessionId::new(1)));
        assert_eq!(s.questions_answered(), 6);

        s.mark_saved(fixed_now()).unwrap();
        assert_eq!(
            s.mark_saved(fixed_now()).unwrap_err(),
            SessionError::AlreadySaved(SessionId::new(1))
        );
    }

    #[test]
    fn cannot_save_before_termination() {
        let mut s = session();
        assert_eq!(
            s.mark_saved(fixed_now()).unwrap_err(),
            SessionError::NotTerminal(SessionId::new(1))
        );
        assert_eq!(
            s.evaluate(&PhaseDecisionPolicy::default()).unwrap_err(),
            PolicyError::NothingRecorded
        );
    }
}
