pub mod commands;
pub mod controller;
pub mod events;
pub mod feedback;
pub mod model;
pub mod report;
pub mod score;
pub mod session;

pub use controller::QuizController;
pub use events::{EventEmitter, QuizEvent};
pub use feedback::FeedbackThrottle;
pub use model::{Quiz, QuizQuestion};
pub use report::QuizReport;
pub use session::{AnswerOutcome, InputMethod, QuizSession, SessionSnapshot};
