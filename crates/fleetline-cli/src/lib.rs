mod adapters;
mod args;
mod commands;

pub use args::{Cli, Commands, OutputFormat};
pub use commands::run;
