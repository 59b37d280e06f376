//! Pure trial logic: no filesystem, window, or clock access.

pub mod stats;
pub mod types;
