pub mod clock;

pub use clock::{Clock, MonotonicClock};

/// A connected consumer of broadcast snapshots (display, logger, peer controller).
///
/// `deliver` must not block for long: the controller thread calls it inline
/// during fan-out.
pub trait Observer: Send {
    fn deliver(&self, message: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// The physical reward dispenser, signalled once per successful hold.
pub trait RewardDispenser {
    fn dispense(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}
