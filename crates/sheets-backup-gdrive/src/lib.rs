//! Google Drive side of sheets-backup.
//!
//! - `GDriveClient`: raw Drive API v3 calls (list, get, export)
//! - `GDriveBackend`: `DirectoryLister` + `ShortcutResolver` + `DocumentExporter`
//! - `TokenManager`: service-account tokens implementing `TokenProvider`

mod backend;
mod gdrive;
mod token_manager;
mod types;

pub use backend::GDriveBackend;
pub use gdrive::{GDriveClient, GOOGLE_API_BASE};
pub use token_manager::{ServiceAccountKey, TokenManager, DEFAULT_SCOPES, GOOGLE_TOKEN_URI};
pub use types::{
    DriveFile, ShortcutDetails, FOLDER_MIME_TYPE, SHORTCUT_MIME_TYPE, SPREADSHEET_MIME_TYPE,
};
