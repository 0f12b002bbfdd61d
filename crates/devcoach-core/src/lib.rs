pub mod block;
pub mod coaching;
pub mod config;
pub mod error;
pub mod hygiene;
pub mod intake;
pub mod io;
pub mod paths;
pub mod queue;
pub mod score;
pub mod signals;
pub mod state;
pub mod trigger;
pub mod types;

pub use error::{CoachError, Result};
