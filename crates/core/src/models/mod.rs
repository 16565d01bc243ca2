//! Data models for Watchroom

mod movie;
mod room;

pub use movie::*;
pub use room::*;
