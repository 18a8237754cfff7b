//! CLI argument parsing.

mod args;
mod validators;

pub use args::{AnalyzeArgs, Cli, Command, ConfigAction, ServeArgs};
