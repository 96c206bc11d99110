//! CLI domain: parse, route, and output only.
//! Route handlers stay thin; record semantics live in the library.

mod output;
mod parse;
mod route;

pub use output::map_error;
pub use parse::{Cli, Commands, OutputFormat};
pub use route::RunContext;
