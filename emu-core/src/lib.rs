//! Core traits and types shared by the microsequencer.
//!
//! Everything ticks at the master clock. All component timing derives
//! from this. No exceptions.

mod bus;
mod observable;
mod tickable;
mod ticks;

pub use bus::{Bus, SimpleBus};
pub use observable::{Observable, Value};
pub use tickable::Tickable;
pub use ticks::Ticks;
