//! Background Tasks Module
//!
//! Houses the periodic expired-entry sweep.

mod sweep;

pub use sweep::spawn_sweep_task;
