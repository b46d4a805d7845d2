//! Core types, configuration, and error handling for Strata.
//!
//! This crate provides the shared foundation used by the analyzers:
//! - [`StrataError`]: unified error type using `thiserror`
//! - [`StrataConfig`]: analyzer configuration loaded from `.strata.toml`
//! - [`CommitHistory`]: immutable, validated commit history
//! - [`FileIndex`]: inverted path → commits index over a history
//! - [`CancelToken`]: cooperative cancellation for long analyses

mod cancel;
mod config;
mod error;
mod history;
mod index;

pub use cancel::CancelToken;
pub use config::{
    ActivityConfig, ChurnConfig, CoChangeConfig, DependencyWindow, DepsConfig, OwnershipConfig,
    StrataConfig,
};
pub use error::StrataError;
pub use history::{
    normalize_path, Author, ChangeKind, CommitHistory, CommitRecord, DiffData, FileChange, Hunk,
    IngestOptions, InputOrder, RawCommit, RawFileChange,
};
pub use index::FileIndex;

/// A convenience `Result` type for Strata operations.
pub type Result<T> = std::result::Result<T, StrataError>;
