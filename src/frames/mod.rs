pub mod clock;
pub mod input;
pub mod loop_worker;
pub mod throttle;
pub mod trace;

pub use clock::SessionClock;
pub use input::SessionInput;
pub use loop_worker::{session_loop, LoopContext, ProgressPoll};
pub use throttle::FrameThrottle;
pub use trace::{load_trace, parse_live_line};
