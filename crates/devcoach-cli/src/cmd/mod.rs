pub mod block;
pub mod coach;
pub mod config;
pub mod queue;
pub mod stats;
pub mod trigger;
