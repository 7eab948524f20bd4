//! blog-e2e CLI: command-line runner for the blog scenario catalog
//!
//! ## Usage
//!
//! ```bash
//! blog-e2e run --base-url http://localhost:3000      # whole catalog on Chromium
//! blog-e2e run --fixture --suite smoke               # in-process fixture
//! blog-e2e run --grep "LCP" --format json -o out.json
//! blog-e2e list --suite blog-posts
//! blog-e2e config
//! ```

#![warn(missing_docs)]

mod commands;
mod config;
mod error;
mod output;
mod runner;

pub use commands::{Cli, ColorArg, Commands, ConfigArgs, FormatArg, ListArgs, RunArgs};
pub use config::{CliConfig, ColorChoice, Verbosity};
pub use error::{CliError, CliResult};
pub use output::{outcome_line, status_line, Level, ProgressReporter};
pub use runner::{build_filter, effective_config, execute_run, list_ids, run_config};
