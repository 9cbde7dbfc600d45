//! Command-line surface: clap subcommands, the interactive menu prompts and table output.

mod commands;
mod output;
mod prompts;

pub use commands::*;
pub use prompts::*;
