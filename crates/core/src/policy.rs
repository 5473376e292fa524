use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use thiserror::Error;

use crate::model::{HalfPoints, Phase, ScoreValue};

/// Number of scored questions in the base phase.
pub const BASE_QUESTION_COUNT: u32 = 6;

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

/// Inputs that cannot occur in a session driven through `ExamSession`.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum PolicyError {
    #[error("no answer has been recorded yet")]
    NothingRecorded,
    #[error("base phase holds {answered} answers, more than the six base questions")]
    BaseOverrun { answered: u32 },
    #[error("extra phase reached after only {answered} answers")]
    ExtraBeforeBase { answered: u32 },
    #[error("extra phase has no frozen base score")]
    MissingBaseScore,
}

//
// ─── CONFIG ───────────────────────────────────────────────────────────────────
//

/// How many inconclusive tie-break answers are tolerated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExtraPhaseLimit {
    /// Keep asking while the examiner awards 0.5.
    #[default]
    Unbounded,
    /// Stop after this many extra answers; an unresolved tie rounds down.
    AtMost(NonZeroU32),
}

impl ExtraPhaseLimit {
    #[must_use]
    pub fn from_option(max: Option<u32>) -> Self {
        max.and_then(NonZeroU32::new)
            .map_or(Self::Unbounded, Self::AtMost)
    }
}

//
// ─── DECISIONS ────────────────────────────────────────────────────────────────
//

/// State the policy looks at after each recorded answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyInput {
    pub answered: u32,
    pub total: HalfPoints,
    pub phase: Phase,
    pub latest: ScoreValue,
    pub base_score: Option<HalfPoints>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    /// Six base answers summed to a whole number.
    WholeBaseTotal,
    /// A tie-break answer of 0 rounded the base score down.
    TieBrokenDown,
    /// A tie-break answer of 1 rounded the base score up.
    TieBrokenUp,
    /// The configured extra-phase cap ran out without a decisive answer.
    ExtraLimitReached,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    ContinueBase,
    /// The base total is fractional; freeze it and start tie-breaking.
    EnterExtra { base_score: HalfPoints },
    ContinueExtra,
    Terminate {
        final_score: u32,
        reason: TerminationReason,
    },
}

impl Decision {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Decision::Terminate { .. })
    }
}

//
// ─── POLICY ───────────────────────────────────────────────────────────────────
//

/// Decides how a session proceeds after each answer.
///
/// The policy holds configuration only; every call is a pure function of its
/// input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhaseDecisionPolicy {
    extra_limit: ExtraPhaseLimit,
}

impl PhaseDecisionPolicy {
    #[must_use]
    pub fn new(extra_limit: ExtraPhaseLimit) -> Self {
        Self { extra_limit }
    }

    #[must_use]
    pub fn extra_limit(&self) -> ExtraPhaseLimit {
        self.extra_limit
    }

    /// Evaluate the session state right after an answer was recorded.
    ///
    /// # Errors
    ///
    /// Returns `PolicyError` when the input breaks the session invariants
    /// (empty log, base phase past six answers, extra phase without a frozen
    /// base score).
    pub fn decide(&self, input: PolicyInput) -> Result<Decision, PolicyError> {
        if input.answered == 0 {
            return Err(PolicyError::NothingRecorded);
        }

        match input.phase {
            Phase::Base => Self::decide_base(input),
            Phase::Extra => self.decide_extra(input),
        }
    }

    fn decide_base(input: PolicyInput) -> Result<Decision, PolicyError> {
        match input.answered.cmp(&BASE_QUESTION_COUNT) {
            std::cmp::Ordering::Less => Ok(Decision::ContinueBase),
            std::cmp::Ordering::Equal if input.total.is_whole() => Ok(Decision::Terminate {
                final_score: input.total.floor(),
                reason: TerminationReason::WholeBaseTotal,
            }),
            std::cmp::Ordering::Equal => Ok(Decision::EnterExtra {
                base_score: input.total,
            }),
            std::cmp::Ordering::Greater => Err(PolicyError::BaseOverrun {
                answered: input.answered,
            }),
        }
    }

    fn decide_extra(&self, input: PolicyInput) -> Result<Decision, PolicyError> {
        if input.answered <= BASE_QUESTION_COUNT {
            return Err(PolicyError::ExtraBeforeBase {
                answered: input.answered,
            });
        }
        let base = input.base_score.ok_or(PolicyError::MissingBaseScore)?;

        // The tie-break award only picks the rounding direction; it is never
        // added to the final score.
        let decision = match input.latest {
            ScoreValue::Zero => Decision::Terminate {
                final_score: base.floor(),
                reason: TerminationReason::TieBrokenDown,
            },
            ScoreValue::Full => Decision::Terminate {
                final_score: base.ceil(),
                reason: TerminationReason::TieBrokenUp,
            },
            ScoreValue::Half => {
                let extra_answered = input.answered - BASE_QUESTION_COUNT;
                match self.extra_limit {
                    ExtraPhaseLimit::AtMost(max) if extra_answered >= max.get() => {
                        Decision::Terminate {
                            final_score: base.floor(),
                            reason: TerminationReason::ExtraLimitReached,
                        }
                    }
                    _ => Decision::ContinueExtra,
                }
            }
        };
        Ok(decision)
    }
}
