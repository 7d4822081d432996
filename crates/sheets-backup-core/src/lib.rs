//! Core of the spreadsheet backup service.
//!
//! - `TreeWalker`: discovers spreadsheets under a drive folder, following
//!   subfolders and shortcuts
//! - `BackupPipeline`: exports and uploads each target with per-item
//!   failure isolation
//! - `BackupJob`: one complete run producing a `RunReport`
//! - `DirectoryLister`, `ShortcutResolver`, `DocumentExporter`,
//!   `ObjectUploader`, `TokenProvider`: the provider seams

mod auth;
mod config;
mod drive;
mod error;
mod job;
mod layout;
mod model;
mod pipeline;
pub mod retry;
mod storage;
mod visited;
mod walker;

pub use auth::{StaticTokenProvider, TokenProvider};
pub use config::{BackupConfig, DEFAULT_CONCURRENCY_LIMIT, DEFAULT_SHORTCUT_CHAIN_DEPTH};
pub use drive::{DirectoryLister, DocumentExporter, ShortcutResolver, XLSX_MIME_TYPE};
pub use error::{BackupError, Result};
pub use job::BackupJob;
pub use layout::{DestinationPrefix, ObjectKeyLayout};
pub use model::{
    BackupOutcome, BackupStatus, BackupTarget, DriveEntry, EntryKind, RunReport, SkippedNode,
};
pub use pipeline::BackupPipeline;
pub use storage::ObjectUploader;
pub use visited::VisitedSet;
pub use walker::{Discovery, TreeWalker};

pub use tokio_util::sync::CancellationToken;
