pub mod countdown;
pub mod driver;
pub mod machine;

pub use driver::{DriverError, SessionSink, TimerDriver};
pub use machine::{CompletedSession, FocusTimer, Interval, TimerDisplay, TimerError, TimerPhase};
