mod common;

use std::collections::HashSet;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use common::{FailingTokens, FakeDrive};
use sheets_backup_core::{
    BackupError, CancellationToken, DriveEntry, StaticTokenProvider, TreeWalker,
};

fn walker(drive: &Arc<FakeDrive>) -> TreeWalker {
    TreeWalker::new(
        drive.clone(),
        drive.clone(),
        Arc::new(StaticTokenProvider::new("token")),
    )
}

fn ids(discovery: &sheets_backup_core::Discovery) -> Vec<&str> {
    discovery
        .targets
        .iter()
        .map(|t| t.source_id.as_str())
        .collect()
}

#[tokio::test]
async fn test_direct_and_shortcut_paths_yield_one_target() {
    let drive = Arc::new(
        FakeDrive::new()
            .folder(
                "root",
                vec![
                    DriveEntry::spreadsheet("s1", "Budget"),
                    DriveEntry::folder("f1", "Finance"),
                    DriveEntry::shortcut("sc1", "Budget (link)", "s1"),
                ],
            )
            .folder("f1", vec![DriveEntry::spreadsheet("s2", "Payroll")]),
    );

    let discovery = walker(&drive)
        .discover("root", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(ids(&discovery), vec!["s1", "s2"]);
    assert_eq!(discovery.targets[0].display_name, "Budget");
    assert!(discovery.skipped.is_empty());
    assert_eq!(discovery.folders_scanned, 2);
    assert!(!discovery.cancelled);
}

#[tokio::test]
async fn test_nested_tree_finds_every_spreadsheet() {
    let drive = Arc::new(
        FakeDrive::new()
            .folder(
                "root",
                vec![
                    DriveEntry::folder("a", "A"),
                    DriveEntry::folder("b", "B"),
                    DriveEntry::spreadsheet("s0", "Zero"),
                    DriveEntry::new("doc", "Notes", sheets_backup_core::EntryKind::Other),
                ],
            )
            .folder(
                "a",
                vec![
                    DriveEntry::spreadsheet("s1", "One"),
                    DriveEntry::folder("a1", "A1"),
                ],
            )
            .folder("a1", vec![DriveEntry::spreadsheet("s2", "Two")])
            .folder(
                "b",
                vec![
                    DriveEntry::spreadsheet("s3", "Three"),
                    DriveEntry::folder("empty", "Empty"),
                ],
            )
            .folder("empty", vec![]),
    );

    let discovery = walker(&drive)
        .with_concurrency(3)
        .discover("root", &CancellationToken::new())
        .await
        .unwrap();

    // Depth-first listing order, independent of scan completion order.
    assert_eq!(ids(&discovery), vec!["s1", "s2", "s3", "s0"]);
    assert_eq!(discovery.folders_scanned, 5);
}

fn shared_folder_drive(a_delay: u64, b_delay: u64) -> Arc<FakeDrive> {
    Arc::new(
        FakeDrive::new()
            .folder(
                "root",
                vec![
                    DriveEntry::folder("a", "A"),
                    DriveEntry::spreadsheet("m", "Middle"),
                    DriveEntry::folder("b", "B"),
                ],
            )
            .folder("a", vec![DriveEntry::folder("x", "X")])
            .folder("b", vec![DriveEntry::shortcut("sc-x", "X link", "x")])
            .folder("x", vec![DriveEntry::spreadsheet("sx", "Shared")])
            .with_folder_delay("a", Duration::from_millis(a_delay))
            .with_folder_delay("b", Duration::from_millis(b_delay)),
    )
}

#[tokio::test]
async fn test_order_of_folder_reached_twice_ignores_listing_latency() {
    let a_first = walker(&shared_folder_drive(1, 40))
        .discover("root", &CancellationToken::new())
        .await
        .unwrap();
    let b_first = walker(&shared_folder_drive(40, 1))
        .discover("root", &CancellationToken::new())
        .await
        .unwrap();

    // x is listed under a before m, whichever path claimed it.
    assert_eq!(ids(&a_first), vec!["sx", "m"]);
    assert_eq!(ids(&b_first), vec!["sx", "m"]);
    assert_eq!(b_first.folders_scanned, 4);
}

#[tokio::test]
async fn test_shortcut_into_disjoint_tree_is_followed() {
    let drive = Arc::new(
        FakeDrive::new()
            .folder(
                "root",
                vec![DriveEntry::shortcut("sc-shared", "Shared", "shared")],
            )
            .folder(
                "shared",
                vec![
                    DriveEntry::spreadsheet("s9", "Shared sheet"),
                    DriveEntry::folder("deep", "Deep"),
                ],
            )
            .folder("deep", vec![DriveEntry::spreadsheet("s10", "Deep sheet")]),
    );

    let discovery = walker(&drive)
        .discover("root", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(ids(&discovery), vec!["s9", "s10"]);
}

#[tokio::test]
async fn test_shortcut_cycle_terminates_without_duplicates() {
    // root/A contains a shortcut to B, B contains a shortcut back to A.
    let drive = Arc::new(
        FakeDrive::new()
            .folder("root", vec![DriveEntry::folder("A", "A")])
            .folder(
                "A",
                vec![
                    DriveEntry::spreadsheet("sa", "In A"),
                    DriveEntry::shortcut("to-b", "B link", "B"),
                ],
            )
            .folder(
                "B",
                vec![
                    DriveEntry::spreadsheet("sb", "In B"),
                    DriveEntry::shortcut("to-a", "A link", "A"),
                    DriveEntry::shortcut("to-root", "Root link", "root"),
                ],
            )
            .entry(DriveEntry::folder("B", "B")),
    );

    let discovery = walker(&drive)
        .discover("root", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(ids(&discovery), vec!["sa", "sb"]);
    // root, A and B each listed exactly once.
    assert_eq!(drive.list_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_unreadable_shortcut_target_is_skipped() {
    let drive = Arc::new(
        FakeDrive::new()
            .folder(
                "root",
                vec![
                    DriveEntry::shortcut("broken", "Gone", "missing"),
                    DriveEntry::folder("f1", "F1"),
                    DriveEntry::spreadsheet("s1", "One"),
                ],
            )
            .folder("f1", vec![DriveEntry::spreadsheet("s2", "Two")]),
    );

    let discovery = walker(&drive)
        .discover("root", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(ids(&discovery), vec!["s2", "s1"]);
    assert_eq!(discovery.skipped.len(), 1);
    assert_eq!(discovery.skipped[0].node_id, "broken");
}

#[tokio::test]
async fn test_unreadable_subfolder_does_not_stop_siblings() {
    let drive = Arc::new(
        FakeDrive::new()
            .folder(
                "root",
                vec![
                    DriveEntry::folder("private", "Private"),
                    DriveEntry::folder("public", "Public"),
                ],
            )
            .folder("private", vec![DriveEntry::spreadsheet("hidden", "Hidden")])
            .folder("public", vec![DriveEntry::spreadsheet("s1", "Visible")])
            .fail_listing("private"),
    );

    let discovery = walker(&drive)
        .discover("root", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(ids(&discovery), vec!["s1"]);
    assert_eq!(discovery.skipped.len(), 1);
    assert_eq!(discovery.skipped[0].node_id, "private");
    assert!(discovery.skipped[0].reason.contains("403"));
}

#[tokio::test]
async fn test_unreadable_root_fails_discovery() {
    let drive = Arc::new(FakeDrive::new().folder("root", vec![]).fail_listing("root"));

    let result = walker(&drive)
        .discover("root", &CancellationToken::new())
        .await;

    match result {
        Err(BackupError::Traversal { folder_id, .. }) => assert_eq!(folder_id, "root"),
        other => panic!("expected traversal error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_auth_failure_is_not_wrapped() {
    let drive = Arc::new(FakeDrive::new().folder("root", vec![]));
    let walker = TreeWalker::new(drive.clone(), drive.clone(), Arc::new(FailingTokens));

    let result = walker.discover("root", &CancellationToken::new()).await;
    assert!(matches!(result, Err(BackupError::Auth(_))));
}

#[tokio::test]
async fn test_empty_root_yields_no_targets() {
    let drive = Arc::new(FakeDrive::new().folder("root", vec![]));

    let discovery = walker(&drive)
        .discover("root", &CancellationToken::new())
        .await
        .unwrap();

    assert!(discovery.targets.is_empty());
    assert!(discovery.skipped.is_empty());
}

#[tokio::test]
async fn test_shortcut_chains_follow_configured_depth() {
    let drive = Arc::new(
        FakeDrive::new()
            .folder(
                "root",
                vec![DriveEntry::shortcut("outer", "Outer link", "inner")],
            )
            .entry(DriveEntry::shortcut("inner", "Inner link", "s1"))
            .entry(DriveEntry::spreadsheet("s1", "Target")),
    );

    let single_hop = walker(&drive)
        .discover("root", &CancellationToken::new())
        .await
        .unwrap();
    assert!(single_hop.targets.is_empty());
    assert_eq!(single_hop.skipped.len(), 1);
    assert_eq!(single_hop.skipped[0].node_id, "outer");

    let two_hops = walker(&drive)
        .with_shortcut_chain_depth(2)
        .discover("root", &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(ids(&two_hops), vec!["s1"]);
}

#[tokio::test]
async fn test_zero_chain_depth_ignores_shortcuts() {
    let drive = Arc::new(
        FakeDrive::new().folder(
            "root",
            vec![
                DriveEntry::spreadsheet("s1", "One"),
                DriveEntry::shortcut("sc", "Link", "s1"),
            ],
        ),
    );

    let discovery = walker(&drive)
        .with_shortcut_chain_depth(0)
        .discover("root", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(ids(&discovery), vec!["s1"]);
    assert_eq!(drive.resolve_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_repeated_discovery_is_idempotent() {
    let drive = Arc::new(
        FakeDrive::new()
            .folder(
                "root",
                vec![
                    DriveEntry::folder("f1", "F1"),
                    DriveEntry::shortcut("sc", "F1 link", "f1"),
                    DriveEntry::spreadsheet("s1", "One"),
                ],
            )
            .folder("f1", vec![DriveEntry::spreadsheet("s2", "Two")]),
    );
    let walker = walker(&drive);

    let first = walker
        .discover("root", &CancellationToken::new())
        .await
        .unwrap();
    let second = walker
        .discover("root", &CancellationToken::new())
        .await
        .unwrap();

    let first_set: HashSet<_> = first.targets.iter().collect();
    let second_set: HashSet<_> = second.targets.iter().collect();
    assert_eq!(first_set, second_set);
    assert_eq!(first.targets.len(), 2);
}

#[tokio::test]
async fn test_folder_scans_respect_concurrency_limit() {
    let subfolders: Vec<_> = (0..8)
        .map(|i| DriveEntry::folder(format!("f{}", i), format!("F{}", i)))
        .collect();
    let mut drive = FakeDrive::new()
        .folder("root", subfolders)
        .with_list_delay(Duration::from_millis(20));
    for i in 0..8 {
        drive = drive.folder(
            &format!("f{}", i),
            vec![DriveEntry::spreadsheet(format!("s{}", i), format!("S{}", i))],
        );
    }
    let drive = Arc::new(drive);

    let discovery = walker(&drive)
        .with_concurrency(2)
        .discover("root", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(discovery.targets.len(), 8);
    assert!(drive.max_in_flight.load(Ordering::SeqCst) <= 2);
}

#[tokio::test]
async fn test_cancelled_traversal_stops_expanding() {
    let drive = Arc::new(
        FakeDrive::new()
            .folder(
                "root",
                vec![
                    DriveEntry::spreadsheet("s0", "Root sheet"),
                    DriveEntry::folder("f1", "F1"),
                ],
            )
            .folder("f1", vec![DriveEntry::spreadsheet("s1", "Nested")]),
    );
    let cancel = CancellationToken::new();
    cancel.cancel();

    let discovery = walker(&drive).discover("root", &cancel).await.unwrap();

    assert!(discovery.cancelled);
    assert_eq!(ids(&discovery), vec!["s0"]);
    assert_eq!(discovery.skipped.len(), 1);
    assert_eq!(discovery.skipped[0].node_id, "f1");
    assert_eq!(drive.list_calls.load(Ordering::SeqCst), 1);
}
