//! # Storage Layer
//!
//! Persistence for strata workspaces with git-friendly file formats.
//!
//! ## Storage Formats
//!
//! | Data | Format | Location |
//! |------|--------|----------|
//! | Decisions | JSONL (one JSON per line) | `.strata/decisions.jsonl` |
//! | Projects | JSONL | `.strata/projects.jsonl` |
//! | Config | TOML | `.strata/config.toml` |
//!
//! ## Concurrency Safety
//!
//! - Reads take a shared lock, writes are atomic (temp file + rename)
//! - Read-modify-write cycles hold an exclusive lock on a sidecar `.lock`
//!   file, and the engine's checks run while it is held
//! - `created_at` is assigned here and is strictly increasing per project
//!
//! ## Workspace Structure
//!
//! ```text
//! .strata/
//! ├── decisions.jsonl       # Decisions of every project
//! ├── projects.jsonl        # Projects
//! ├── config.toml           # Default project and layer limits
//! └── .gitignore            # Ignores lock and temp files
//! ```
//!
//! ## Key Types
//!
//! - [`Workspace`] - Entry point; validates writes against the engine
//! - [`DecisionStore`] - Read/write decisions as JSONL
//! - [`ProjectStore`] - Read/write projects as JSONL
//! - [`Config`] - Workspace and global configuration

mod jsonl;
mod projects;
mod config;
mod workspace;

pub use jsonl::{DecisionPatch, DecisionStore, StorageError};
pub use projects::ProjectStore;
pub use config::{Config, ConfigError, GlobalConfig, LayersConfig, OutputFormat, WorkspaceConfig};
pub use workspace::{Workspace, WorkspaceError};
