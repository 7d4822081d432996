//! Google Drive API v3 response types.

use serde::Deserialize;
use sheets_backup_core::{DriveEntry, EntryKind};

pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";
pub const SPREADSHEET_MIME_TYPE: &str = "application/vnd.google-apps.spreadsheet";
pub const SHORTCUT_MIME_TYPE: &str = "application/vnd.google-apps.shortcut";

/// Fields requested for every file resource.
pub const FILE_FIELDS: &str = "id,name,mimeType,shortcutDetails(targetId,targetMimeType)";

/// Google Drive file resource (subset).
///
/// See: https://developers.google.com/drive/api/v3/reference/files#resource
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub shortcut_details: Option<ShortcutDetails>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortcutDetails {
    pub target_id: String,
    #[serde(default)]
    pub target_mime_type: Option<String>,
}

/// files.list response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilesListResponse {
    #[serde(default)]
    pub files: Vec<DriveFile>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// Error envelope returned by Google APIs.
#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    pub code: u16,
    pub message: String,
}

impl DriveFile {
    pub fn kind(&self) -> EntryKind {
        match self.mime_type.as_str() {
            SPREADSHEET_MIME_TYPE => EntryKind::Spreadsheet,
            FOLDER_MIME_TYPE => EntryKind::Folder,
            SHORTCUT_MIME_TYPE => EntryKind::Shortcut,
            _ => EntryKind::Other,
        }
    }
}

impl From<DriveFile> for DriveEntry {
    fn from(file: DriveFile) -> Self {
        let kind = file.kind();
        let shortcut_target_id = match kind {
            EntryKind::Shortcut => file.shortcut_details.map(|d| d.target_id),
            _ => None,
        };
        DriveEntry {
            id: file.id,
            name: file.name,
            kind,
            shortcut_target_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_classify_files() {
        let files: FilesListResponse = serde_json::from_value(json!({
            "files": [
                {"id": "s1", "name": "Budget", "mimeType": SPREADSHEET_MIME_TYPE},
                {"id": "f1", "name": "Finance", "mimeType": FOLDER_MIME_TYPE},
                {
                    "id": "sc1",
                    "name": "Budget link",
                    "mimeType": SHORTCUT_MIME_TYPE,
                    "shortcutDetails": {"targetId": "s1", "targetMimeType": SPREADSHEET_MIME_TYPE}
                },
                {"id": "d1", "name": "Notes", "mimeType": "application/vnd.google-apps.document"}
            ],
            "nextPageToken": "page-2"
        }))
        .unwrap();

        let entries: Vec<DriveEntry> = files.files.into_iter().map(DriveEntry::from).collect();
        assert_eq!(entries[0].kind, EntryKind::Spreadsheet);
        assert_eq!(entries[1].kind, EntryKind::Folder);
        assert_eq!(entries[2].kind, EntryKind::Shortcut);
        assert_eq!(entries[2].shortcut_target_id.as_deref(), Some("s1"));
        assert_eq!(entries[3].kind, EntryKind::Other);
        assert_eq!(files.next_page_token.as_deref(), Some("page-2"));
    }

    #[test]
    fn test_non_shortcut_ignores_details() {
        let file: DriveFile = serde_json::from_value(json!({
            "id": "x",
            "name": "X",
            "mimeType": FOLDER_MIME_TYPE,
            "shortcutDetails": {"targetId": "y"}
        }))
        .unwrap();
        let entry = DriveEntry::from(file);
        assert!(entry.shortcut_target_id.is_none());
    }
}
