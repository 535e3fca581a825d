pub mod answer;
pub mod attempt;

pub use answer::AnswerRecord;
pub use attempt::{Attempt, AttemptStatus};
