pub mod clock;
pub mod scheduler;

pub use clock::{PlaybackClock, PlaybackTiming, TickOutcome};
pub use scheduler::{Tick, Ticker};
