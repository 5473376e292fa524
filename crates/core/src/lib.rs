#![forbid(unsafe_code)]

pub mod accumulator;
pub mod grade;
pub mod model;
pub mod policy;
pub mod time;

pub use accumulator::ScoreAccumulator;
pub use grade::{GradeError, GradeMapper, GradeTier};
pub use policy::{
    BASE_QUESTION_COUNT, Decision, ExtraPhaseLimit, PhaseDecisionPolicy, PolicyError, PolicyInput,
    TerminationReason,
};
pub use time::Clock;
