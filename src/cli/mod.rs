//! # Command-Line Interface
//!
//! User-facing CLI commands and output formatting.
//!
//! ## Command Groups
//!
//! | Group | Purpose | Examples |
//! |-------|---------|----------|
//! | Core | Workspace setup | `init` |
//! | Project | Project management | `project new`, `project list`, `project use` |
//! | Decision | Decision lifecycle | `decision add`, `decision promote`, `decision reparent` |
//! | Query | Timeline views | `timeline`, `latest`, `stats`, `limits`, `check` |
//!
//! ## Output Formats
//!
//! All commands support `--format` flag:
//! - `text` (default) - Human-readable output
//! - `json` - Machine-parseable JSON
//!
//! ## Verbose Mode
//!
//! Use `--verbose` (or `-v`) for debug output, or set `STRATA_LOG` to an
//! env-filter directive:
//! ```bash
//! strata --verbose timeline focus
//! STRATA_LOG=strata_cli=trace strata check
//! ```
//!
//! ## Entry Point
//!
//! Call [`run()`] to parse arguments and execute the appropriate command.

mod app;
mod output;
mod project;
mod decision;
mod query;

pub use app::{Cli, Commands, run};
pub use output::{Output, OutputFormat};
