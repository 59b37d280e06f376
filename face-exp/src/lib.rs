//! Same/different face presentation experiment.
//!
//! A session runs three stages in order: collect the stimulus images and
//! shuffle them, present each one in a window until a keyed response or a
//! timeout, then write the trials to CSV and summarize them.
//!
//! - **[`core`]**: Pure logic (trial types, statistics). No I/O.
//! - **[`io`]**: Side effects (config files, directory listing, the window,
//!   results files).
//!
//! [`session`] drives the trial loop and [`cli`] wires it to the commands in
//! `main.rs`.

pub mod cli;
pub mod core;
pub mod io;
pub mod logging;
pub mod report;
pub mod session;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
