//! `stockwatch` command-line entry points.

pub mod app;
pub mod cli;

pub use app::App;
pub use cli::{Cli, Command};
