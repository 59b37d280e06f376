//! I/O helpers for experiment commands.

pub mod config;
pub mod results;
pub mod screen;
pub mod stimuli;
