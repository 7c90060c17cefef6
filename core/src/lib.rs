//! Engines and session plumbing for three small board games: matching pairs, minefield and
//! snake. Every engine state is an immutable value and each transition returns a new one;
//! timers live in the [`session`] that drives it.

pub use config::*;
pub use display::*;
pub use error::*;
pub use types::*;

pub use minigames_protocol::{GameId, ScoreRecord, SortDirection, SortField, SortRule};

mod config;
mod display;
mod error;
mod types;

pub mod leaderboard;
pub mod memory;
pub mod minefield;
pub mod session;
pub mod snake;
