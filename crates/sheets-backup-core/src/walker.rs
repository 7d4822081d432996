//! Discovery of every spreadsheet reachable from a root folder.
//!
//! Folders are expanded from an explicit work queue by a bounded set of
//! tokio tasks. Each scan lists one folder, resolves its shortcuts and
//! reports its spreadsheets and folder references, in listing order, back
//! to the coordinator loop in `discover`. Once all scans have joined, the
//! targets are ordered by a single-threaded depth-first pass over the
//! recorded listings, so the result does not depend on which scan finished
//! first.
//!
//! Shortcuts are followed `shortcut_chain_depth` levels (default 1). A
//! shortcut that still resolves to another shortcut at that depth is
//! recorded as skipped rather than chased further.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use serde::Serialize;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::auth::TokenProvider;
use crate::config::{DEFAULT_CONCURRENCY_LIMIT, DEFAULT_SHORTCUT_CHAIN_DEPTH};
use crate::drive::{DirectoryLister, ShortcutResolver};
use crate::error::BackupError;
use crate::model::{BackupTarget, DriveEntry, EntryKind, SkippedNode};
use crate::visited::VisitedSet;

/// One relevant child of a scanned folder, after shortcut resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Listed {
    Target(BackupTarget),
    /// Folder reference, whether or not this scan was the one to expand it
    Folder(String),
}

#[derive(Debug, Default)]
struct FolderScan {
    listing: Vec<Listed>,
    /// Folders this scan claimed in the VisitedSet and must be expanded
    subfolders: Vec<String>,
    skipped: Vec<SkippedNode>,
}

/// Result of a traversal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Discovery {
    /// Deduplicated targets in depth-first order
    pub targets: Vec<BackupTarget>,
    /// Folders and shortcuts that could not be expanded
    pub skipped: Vec<SkippedNode>,
    pub folders_scanned: usize,
    /// Whether the traversal stopped early on cancellation
    pub cancelled: bool,
}

/// Walks a drive folder tree, following subfolders and shortcuts.
#[derive(Clone)]
pub struct TreeWalker {
    lister: Arc<dyn DirectoryLister>,
    resolver: Arc<dyn ShortcutResolver>,
    tokens: Arc<dyn TokenProvider>,
    concurrency: usize,
    shortcut_chain_depth: u32,
}

impl TreeWalker {
    pub fn new(
        lister: Arc<dyn DirectoryLister>,
        resolver: Arc<dyn ShortcutResolver>,
        tokens: Arc<dyn TokenProvider>,
    ) -> Self {
        Self {
            lister,
            resolver,
            tokens,
            concurrency: DEFAULT_CONCURRENCY_LIMIT,
            shortcut_chain_depth: DEFAULT_SHORTCUT_CHAIN_DEPTH,
        }
    }

    /// Maximum number of folders listed at the same time.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// How many shortcut hops to follow; 0 ignores shortcuts entirely.
    pub fn with_shortcut_chain_depth(mut self, depth: u32) -> Self {
        self.shortcut_chain_depth = depth;
        self
    }

    /// Discover every spreadsheet reachable from `root_folder_id`.
    ///
    /// Only a failure to list the root itself (or to obtain a token for it)
    /// is returned as an error; unreadable subfolders and shortcuts are
    /// reported in `Discovery::skipped`.
    #[instrument(skip(self, cancel), level = "info")]
    pub async fn discover(
        &self,
        root_folder_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Discovery, BackupError> {
        let visited = Arc::new(VisitedSet::new());
        visited.insert(root_folder_id);

        let root_scan = self
            .scan_folder(root_folder_id, &visited)
            .await
            .map_err(|e| match e {
                BackupError::Auth(_) => e,
                other => BackupError::Traversal {
                    folder_id: root_folder_id.to_string(),
                    message: other.to_string(),
                },
            })?;

        let mut listings = HashMap::new();
        let mut skipped = Vec::new();
        let mut queue = VecDeque::new();
        let mut folders_scanned = 1;
        root_scan.merge_into(root_folder_id, &mut listings, &mut skipped, &mut queue);

        let mut tasks = JoinSet::new();
        loop {
            while tasks.len() < self.concurrency && !cancel.is_cancelled() {
                let Some(folder_id) = queue.pop_front() else {
                    break;
                };
                let walker = self.clone();
                let visited = Arc::clone(&visited);
                tasks.spawn(async move {
                    let result = walker.scan_folder(&folder_id, &visited).await;
                    (folder_id, result)
                });
            }

            let Some(joined) = tasks.join_next().await else {
                break;
            };

            match joined {
                Ok((folder_id, Ok(scan))) => {
                    folders_scanned += 1;
                    scan.merge_into(&folder_id, &mut listings, &mut skipped, &mut queue);
                }
                Ok((folder_id, Err(e))) => {
                    warn!(folder_id = %folder_id, error = %e, "Skipping unreadable folder");
                    skipped.push(SkippedNode {
                        node_id: folder_id,
                        reason: e.to_string(),
                    });
                }
                Err(e) => {
                    warn!("Folder scan task failed: {}", e);
                }
            }
        }

        let cancelled = cancel.is_cancelled();
        if cancelled {
            warn!(
                pending = queue.len(),
                "Traversal cancelled, pending folders not scanned"
            );
            skipped.extend(queue.into_iter().map(|folder_id| SkippedNode {
                node_id: folder_id,
                reason: "traversal cancelled".to_string(),
            }));
        }

        let targets = order_targets(root_folder_id, &listings);
        info!(
            targets = targets.len(),
            folders = folders_scanned,
            skipped = skipped.len(),
            "Discovery finished"
        );

        Ok(Discovery {
            targets,
            skipped,
            folders_scanned,
            cancelled,
        })
    }

    /// List one folder and classify its children.
    async fn scan_folder(
        &self,
        folder_id: &str,
        visited: &VisitedSet,
    ) -> Result<FolderScan, BackupError> {
        let token = self.tokens.access_token().await?;
        let children = self.lister.list_children(folder_id, &token).await?;
        debug!(
            folder_id = %folder_id,
            children = children.len(),
            "Listed folder"
        );

        let mut scan = FolderScan::default();
        for entry in children {
            let entry = if entry.kind == EntryKind::Shortcut {
                match self.follow_shortcut(&entry, &token).await {
                    Ok(resolved) => resolved,
                    Err(e) => {
                        warn!(shortcut_id = %entry.id, error = %e, "Skipping unreachable shortcut");
                        scan.skipped.push(SkippedNode {
                            node_id: entry.id,
                            reason: e.to_string(),
                        });
                        continue;
                    }
                }
            } else {
                entry
            };

            match entry.kind {
                EntryKind::Spreadsheet => {
                    scan.listing.push(Listed::Target(BackupTarget::from(&entry)));
                }
                EntryKind::Folder => {
                    if visited.insert(&entry.id) {
                        scan.subfolders.push(entry.id.clone());
                    } else {
                        debug!(folder_id = %entry.id, "Folder already visited");
                    }
                    scan.listing.push(Listed::Folder(entry.id));
                }
                EntryKind::Shortcut | EntryKind::Other => {}
            }
        }

        Ok(scan)
    }

    /// Resolve a shortcut up to the configured chain depth.
    async fn follow_shortcut(
        &self,
        shortcut: &DriveEntry,
        token: &str,
    ) -> Result<DriveEntry, BackupError> {
        if self.shortcut_chain_depth == 0 {
            return Err(BackupError::Resolve {
                shortcut_id: shortcut.id.clone(),
                message: "shortcut following is disabled".to_string(),
            });
        }

        let mut resolved = self.resolver.resolve_shortcut(shortcut, token).await?;
        let mut hops = 1;
        while resolved.kind == EntryKind::Shortcut && hops < self.shortcut_chain_depth {
            resolved = self.resolver.resolve_shortcut(&resolved, token).await?;
            hops += 1;
        }

        if resolved.kind == EntryKind::Shortcut {
            return Err(BackupError::Resolve {
                shortcut_id: shortcut.id.clone(),
                message: format!(
                    "target {} is another shortcut, chain too deep (limit {})",
                    resolved.id, self.shortcut_chain_depth
                ),
            });
        }

        debug!(shortcut_id = %shortcut.id, target_id = %resolved.id, "Resolved shortcut");
        Ok(resolved)
    }
}

impl FolderScan {
    fn merge_into(
        self,
        folder_id: &str,
        listings: &mut HashMap<String, Vec<Listed>>,
        skipped: &mut Vec<SkippedNode>,
        queue: &mut VecDeque<String>,
    ) {
        listings.insert(folder_id.to_string(), self.listing);
        skipped.extend(self.skipped);
        queue.extend(self.subfolders);
    }
}

/// Depth-first pass over the recorded listings from the root, expanding
/// each folder at its first reference and keeping the first occurrence of
/// each source ID. Folders without a listing (unreadable, cancelled) are
/// passed over.
fn order_targets(
    root_folder_id: &str,
    listings: &HashMap<String, Vec<Listed>>,
) -> Vec<BackupTarget> {
    let mut targets = Vec::new();
    let mut seen_targets = HashSet::new();
    let mut expanded = HashSet::from([root_folder_id]);

    let mut stack: Vec<std::slice::Iter<'_, Listed>> = Vec::new();
    if let Some(listing) = listings.get(root_folder_id) {
        stack.push(listing.iter());
    }

    while let Some(items) = stack.last_mut() {
        let Some(item) = items.next() else {
            stack.pop();
            continue;
        };
        match item {
            Listed::Target(target) => {
                if seen_targets.insert(target.source_id.as_str()) {
                    targets.push(target.clone());
                }
            }
            Listed::Folder(folder_id) => {
                if !expanded.insert(folder_id.as_str()) {
                    continue;
                }
                if let Some(listing) = listings.get(folder_id) {
                    stack.push(listing.iter());
                }
            }
        }
    }

    targets
}
