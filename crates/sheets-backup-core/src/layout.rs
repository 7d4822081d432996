//! Object key layout in the destination bucket.
//!
//! ```text
//! {bucket}/
//!   {prefix}/                 # plain string or strftime template, e.g. backups/%Y-%m-%d
//!     {display_name}.xlsx
//! ```

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Utc};

use crate::error::BackupError;

/// Destination prefix, possibly containing strftime date fields.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DestinationPrefix {
    template: String,
}

impl DestinationPrefix {
    /// Parse and validate a prefix. `%` fields are expanded per run.
    pub fn parse(template: &str) -> Result<Self, BackupError> {
        let template = template.trim().trim_matches('/').to_string();
        if StrftimeItems::new(&template).any(|item| matches!(item, Item::Error)) {
            return Err(BackupError::Config(format!(
                "invalid date template in destination prefix: {}",
                template
            )));
        }
        Ok(Self { template })
    }

    pub fn is_templated(&self) -> bool {
        self.template.contains('%')
    }

    /// Expand the template for a run started at `now`.
    pub fn resolve(&self, now: DateTime<Utc>) -> String {
        if self.is_templated() {
            now.format(&self.template).to_string()
        } else {
            self.template.clone()
        }
    }
}

/// Key builder for one run; the prefix is resolved once so a run that
/// crosses midnight still lands in a single directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectKeyLayout {
    prefix: String,
}

impl ObjectKeyLayout {
    pub fn for_run(prefix: &DestinationPrefix, started_at: DateTime<Utc>) -> Self {
        Self {
            prefix: prefix.resolve(started_at),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// `{prefix}/{display_name}.xlsx`, or `{display_name}.xlsx` without a prefix.
    pub fn object_key(&self, display_name: &str) -> String {
        let file_name = format!("{}.xlsx", sanitize_name(display_name));
        if self.prefix.is_empty() {
            file_name
        } else {
            format!("{}/{}", self.prefix, file_name)
        }
    }
}

/// Replace path separators and control characters so a document name
/// maps to exactly one key segment.
fn sanitize_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if cleaned.is_empty() {
        "untitled".to_string()
    } else {
        cleaned
    }
}
