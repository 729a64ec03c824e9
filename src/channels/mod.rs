//! Interactive channels.

pub mod cli;

pub use cli::{run_repl, run_session};
