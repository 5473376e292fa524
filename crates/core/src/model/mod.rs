mod directory;
mod ids;
mod question;
mod score;
mod session;

pub use directory::{Exam, Examinee};
pub use ids::{ExamId, ExamineeId, ParseIdError, QuestionId, SessionId};
pub use question::Question;
pub use score::{HalfPoints, ScoreEntry, ScoreError, ScoreValue};
pub use session::{ExamSession, FinalResult, Phase, SessionError};
