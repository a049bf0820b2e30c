//! Bounded frame retention: two alternating buffers and the timer-driven
//! policy that clears them.

mod cycler;
mod dual;

pub use cycler::BufferCycler;
pub use dual::{DualBuffer, MergeOutcome, Slot, WorkingSet};
