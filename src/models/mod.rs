//! Data models for the ID card backend.

mod attendance;
mod employee;

pub use attendance::*;
pub use employee::*;
