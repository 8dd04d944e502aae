use chrono::{Duration, Utc};
use file_share::storage::models::{FileRecord, ShareLinkRecord};
use file_share::storage::{ConsumeOutcome, Database};

fn test_db() -> (tempfile::TempDir, Database) {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(dir.path().join("data")).unwrap();
    (dir, db)
}

fn sample_file(id: &str, owner_id: &str) -> FileRecord {
    let now = Utc::now();
    FileRecord {
        id: id.to_string(),
        filename: format!("{id}.pdf"),
        content_type: "application/pdf".to_string(),
        size: 1024,
        owner_id: owner_id.to_string(),
        created_at: now,
        expires_at: now + Duration::days(7),
        bucket: "test-bucket".to_string(),
        object_name: format!("{id}_file.pdf"),
    }
}

fn sample_link(id: &str, file_id: &str, token: &str) -> ShareLinkRecord {
    let now = Utc::now();
    ShareLinkRecord {
        id: id.to_string(),
        file_id: file_id.to_string(),
        token: token.to_string(),
        created_at: now,
        expires_at: Some(now + Duration::days(7)),
        max_views: None,
        views: 0,
        is_active: true,
    }
}

// ============================================================================
// File operations
// ============================================================================

#[test]
fn test_put_and_get_file() {
    let (_dir, db) = test_db();
    let file = sample_file("file-1", "user-1");

    db.put_file(&file).unwrap();

    let retrieved = db.get_file("file-1").unwrap().expect("file should exist");
    assert_eq!(retrieved.id, "file-1");
    assert_eq!(retrieved.filename, "file-1.pdf");
    assert_eq!(retrieved.content_type, "application/pdf");
    assert_eq!(retrieved.owner_id, "user-1");
    assert_eq!(retrieved.bucket, "test-bucket");
    assert_eq!(retrieved.object_name, "file-1_file.pdf");
}

#[test]
fn test_get_file_not_found() {
    let (_dir, db) = test_db();
    assert!(db.get_file("nonexistent").unwrap().is_none());
}

#[test]
fn test_get_files_by_owner() {
    let (_dir, db) = test_db();
    db.put_file(&sample_file("a", "org-1")).unwrap();
    db.put_file(&sample_file("b", "org-1")).unwrap();
    db.put_file(&sample_file("c", "org-2")).unwrap();

    let org1_files = db.get_files_by_owner("org-1").unwrap();
    assert_eq!(org1_files.len(), 2);

    let org2_files = db.get_files_by_owner("org-2").unwrap();
    assert_eq!(org2_files.len(), 1);
    assert_eq!(org2_files[0].id, "c");

    assert!(db.get_files_by_owner("nobody").unwrap().is_empty());
}

#[test]
fn test_delete_file() {
    let (_dir, db) = test_db();
    db.put_file(&sample_file("file-3", "user-1")).unwrap();

    assert!(db.delete_file("file-3").unwrap());
    assert!(db.get_file("file-3").unwrap().is_none());
    assert!(db.get_files_by_owner("user-1").unwrap().is_empty());
}

#[test]
fn test_delete_file_not_found() {
    let (_dir, db) = test_db();
    assert!(!db.delete_file("nonexistent").unwrap());
}

#[test]
fn test_delete_file_cascades_links() {
    let (_dir, db) = test_db();
    db.put_file(&sample_file("file-4", "user-1")).unwrap();
    db.insert_link(&sample_link("link-a", "file-4", "token-a"))
        .unwrap();
    db.insert_link(&sample_link("link-b", "file-4", "token-b"))
        .unwrap();

    db.delete_file("file-4").unwrap();

    assert!(db.get_link("link-a").unwrap().is_none());
    assert!(db.get_link("link-b").unwrap().is_none());
    assert!(db.get_link_by_token("token-a").unwrap().is_none());
    assert!(db.get_link_by_token("token-b").unwrap().is_none());
}

#[test]
fn test_expired_files_respects_cutoff_and_limit() {
    let (_dir, db) = test_db();
    let now = Utc::now();

    for i in 0..5 {
        let mut file = sample_file(&format!("old-{i}"), "user-1");
        file.expires_at = now - Duration::hours(2);
        db.put_file(&file).unwrap();
    }
    let mut fresh = sample_file("fresh", "user-1");
    fresh.expires_at = now + Duration::days(1);
    db.put_file(&fresh).unwrap();

    let cutoff = now - Duration::hours(1);
    let expired = db.expired_files(cutoff, 3).unwrap();
    assert_eq!(expired.len(), 3);

    let all_expired = db.expired_files(cutoff, 100).unwrap();
    assert_eq!(all_expired.len(), 5);
    assert!(all_expired.iter().all(|f| f.id.starts_with("old-")));
}

// ============================================================================
// Share link operations
// ============================================================================

#[test]
fn test_insert_and_get_link() {
    let (_dir, db) = test_db();
    db.put_file(&sample_file("file-5", "user-1")).unwrap();

    let link = sample_link("link-1", "file-5", "token-1");
    assert!(db.insert_link(&link).unwrap());

    let by_id = db.get_link("link-1").unwrap().expect("link should exist");
    assert_eq!(by_id.token, "token-1");
    assert!(by_id.is_active);
    assert_eq!(by_id.views, 0);

    let by_token = db
        .get_link_by_token("token-1")
        .unwrap()
        .expect("token should resolve");
    assert_eq!(by_token.id, "link-1");
}

#[test]
fn test_insert_link_missing_file() {
    let (_dir, db) = test_db();
    let link = sample_link("link-2", "no-such-file", "token-2");

    assert!(!db.insert_link(&link).unwrap());
    assert!(db.get_link("link-2").unwrap().is_none());
    assert!(db.get_link_by_token("token-2").unwrap().is_none());
}

#[test]
fn test_insert_link_duplicate_token() {
    let (_dir, db) = test_db();
    db.put_file(&sample_file("file-6", "user-1")).unwrap();
    db.insert_link(&sample_link("link-3", "file-6", "token-3"))
        .unwrap();

    let dup = sample_link("link-4", "file-6", "token-3");
    assert!(db.insert_link(&dup).is_err());

    // The original mapping is untouched
    let resolved = db.get_link_by_token("token-3").unwrap().unwrap();
    assert_eq!(resolved.id, "link-3");
}

#[test]
fn test_find_usable_link() {
    let (_dir, db) = test_db();
    db.put_file(&sample_file("file-7", "user-1")).unwrap();

    let mut dead = sample_link("dead", "file-7", "token-dead");
    dead.is_active = false;
    db.insert_link(&dead).unwrap();

    let mut stale = sample_link("stale", "file-7", "token-stale");
    stale.expires_at = Some(Utc::now() - Duration::seconds(1));
    db.insert_link(&stale).unwrap();

    let live = sample_link("live", "file-7", "token-live");
    db.insert_link(&live).unwrap();

    let found = db
        .find_usable_link("file-7", Utc::now())
        .unwrap()
        .expect("should find the live link");
    assert_eq!(found.id, "live");

    assert!(db.find_usable_link("no-file", Utc::now()).unwrap().is_none());
}

// ============================================================================
// View consumption
// ============================================================================

#[test]
fn test_consume_view_increments_and_returns_file() {
    let (_dir, db) = test_db();
    db.put_file(&sample_file("file-8", "user-1")).unwrap();
    let mut link = sample_link("link-8", "file-8", "token-8");
    link.max_views = Some(3);
    db.insert_link(&link).unwrap();

    match db.consume_view("token-8", Utc::now()).unwrap() {
        ConsumeOutcome::Consumed { link, file } => {
            assert_eq!(link.views, 1);
            assert!(link.is_active);
            assert_eq!(file.id, "file-8");
        }
        other => panic!("expected Consumed, got {other:?}"),
    }
}

#[test]
fn test_consume_view_unknown_token() {
    let (_dir, db) = test_db();
    assert!(matches!(
        db.consume_view("who-dis", Utc::now()).unwrap(),
        ConsumeOutcome::Missing
    ));
}

#[test]
fn test_consume_view_deactivates_at_limit() {
    let (_dir, db) = test_db();
    db.put_file(&sample_file("file-9", "user-1")).unwrap();
    let mut link = sample_link("link-9", "file-9", "token-9");
    link.max_views = Some(1);
    db.insert_link(&link).unwrap();

    match db.consume_view("token-9", Utc::now()).unwrap() {
        ConsumeOutcome::Consumed { link, .. } => {
            assert_eq!(link.views, 1);
            assert!(!link.is_active);
        }
        other => panic!("expected Consumed, got {other:?}"),
    }

    // The final view flipped the link; the next attempt fails
    assert!(matches!(
        db.consume_view("token-9", Utc::now()).unwrap(),
        ConsumeOutcome::NotUsable
    ));

    let stored = db.get_link("link-9").unwrap().unwrap();
    assert_eq!(stored.views, 1);
    assert!(!stored.is_active);
}

#[test]
fn test_consume_view_time_expired_regardless_of_views() {
    let (_dir, db) = test_db();
    db.put_file(&sample_file("file-10", "user-1")).unwrap();
    let mut link = sample_link("link-10", "file-10", "token-10");
    link.expires_at = Some(Utc::now() - Duration::seconds(1));
    link.max_views = None;
    db.insert_link(&link).unwrap();

    assert!(matches!(
        db.consume_view("token-10", Utc::now()).unwrap(),
        ConsumeOutcome::NotUsable
    ));

    // No view was spent on the failed attempt
    assert_eq!(db.get_link("link-10").unwrap().unwrap().views, 0);
}

#[test]
fn test_consume_view_dangling_file_deactivates_link() {
    let (_dir, db) = test_db();
    db.put_file(&sample_file("ghost", "user-1")).unwrap();
    db.insert_link(&sample_link("link-11", "ghost", "token-11"))
        .unwrap();

    // Simulate out-of-band file loss: drop the file row directly, bypassing
    // the cascading delete_file
    let txn = db.begin_write().unwrap();
    {
        let mut files = txn.open_table(file_share::storage::FILES).unwrap();
        files.remove("ghost").unwrap();
    }
    txn.commit().unwrap();

    assert!(matches!(
        db.consume_view("token-11", Utc::now()).unwrap(),
        ConsumeOutcome::DanglingFile
    ));

    let link = db.get_link("link-11").unwrap().unwrap();
    assert!(!link.is_active);
    assert_eq!(link.views, 0);

    // A dangling token now looks like any other dead token
    assert!(matches!(
        db.consume_view("token-11", Utc::now()).unwrap(),
        ConsumeOutcome::NotUsable
    ));
}

#[test]
fn test_usability_predicate() {
    let now = Utc::now();
    let mut link = sample_link("l", "f", "t");

    assert!(link.is_usable(now));

    link.is_active = false;
    assert!(!link.is_usable(now));
    link.is_active = true;

    link.expires_at = Some(now - Duration::seconds(1));
    assert!(!link.is_usable(now));
    link.expires_at = None;
    assert!(link.is_usable(now));

    link.max_views = Some(2);
    link.views = 1;
    assert!(link.is_usable(now));
    link.views = 2;
    assert!(!link.is_usable(now));
}

// ============================================================================
// Expired link deactivation
// ============================================================================

#[test]
fn test_deactivate_expired_links() {
    let (_dir, db) = test_db();
    db.put_file(&sample_file("file-12", "user-1")).unwrap();
    let now = Utc::now();

    let mut expired = sample_link("exp-1", "file-12", "token-exp-1");
    expired.expires_at = Some(now - Duration::minutes(5));
    db.insert_link(&expired).unwrap();

    let mut eternal = sample_link("noexp", "file-12", "token-noexp");
    eternal.expires_at = None;
    db.insert_link(&eternal).unwrap();

    let live = sample_link("live-2", "file-12", "token-live-2");
    db.insert_link(&live).unwrap();

    let count = db.deactivate_expired_links(now, 100).unwrap();
    assert_eq!(count, 1);

    assert!(!db.get_link("exp-1").unwrap().unwrap().is_active);
    assert!(db.get_link("noexp").unwrap().unwrap().is_active);
    assert!(db.get_link("live-2").unwrap().unwrap().is_active);

    // Already-inactive links are not counted again
    assert_eq!(db.deactivate_expired_links(now, 100).unwrap(), 0);
}

#[test]
fn test_deactivate_expired_links_bounded_batch() {
    let (_dir, db) = test_db();
    db.put_file(&sample_file("file-13", "user-1")).unwrap();
    let now = Utc::now();

    for i in 0..10 {
        let mut link = sample_link(&format!("b-{i}"), "file-13", &format!("token-b-{i}"));
        link.expires_at = Some(now - Duration::minutes(1));
        db.insert_link(&link).unwrap();
    }

    assert_eq!(db.deactivate_expired_links(now, 4).unwrap(), 4);
    assert_eq!(db.deactivate_expired_links(now, 4).unwrap(), 4);
    assert_eq!(db.deactivate_expired_links(now, 4).unwrap(), 2);
    assert_eq!(db.deactivate_expired_links(now, 4).unwrap(), 0);
}
