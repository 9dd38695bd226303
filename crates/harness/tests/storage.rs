use chrono::{TimeZone, Utc};
use curate_core::{
    CommentRecord, EditPatch, EditRecord, ItemId, ReviewId, ReviewStatus, StatusRecord, Timestamp,
};
use curate_storage::{RemoteStore, SqliteRemoteStore, Table};

fn ts() -> Timestamp {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

fn status(review: &str, item: &str, status: ReviewStatus) -> StatusRecord {
    StatusRecord {
        review_id: ReviewId::new(review),
        item_id: ItemId::new(item),
        status,
        updated_at: ts(),
    }
}

// ============================================================================
// Upserts
// ============================================================================

#[test]
fn status_upsert_replaces_under_key() -> Result<(), Box<dyn std::error::Error>> {
    let mut store = SqliteRemoteStore::open_in_memory()?;

    store.upsert_status(&status("r1", "a", ReviewStatus::Use))?;
    store.upsert_status(&status("r1", "a", ReviewStatus::Remove))?;
    store.upsert_status(&status("r1", "a", ReviewStatus::Remove))?;

    assert_eq!(store.count_rows(Table::Reviews)?, 1);
    let stored = store
        .get_status(&ReviewId::new("r1"), &ItemId::new("a"))?
        .unwrap();
    assert_eq!(stored.status, ReviewStatus::Remove);
    Ok(())
}

#[test]
fn upsert_returns_store_timestamp() -> Result<(), Box<dyn std::error::Error>> {
    let mut store = SqliteRemoteStore::open_in_memory()?;
    let returned = store.upsert_status(&status("r1", "a", ReviewStatus::Like))?;

    // The store stamps the row itself; the caller's timestamp is ignored.
    assert_ne!(returned.updated_at, ts());
    let fetched = store.fetch_statuses(&ReviewId::new("r1"))?;
    assert_eq!(fetched, vec![returned]);
    Ok(())
}

#[test]
fn edit_upsert_keeps_null_overrides() -> Result<(), Box<dyn std::error::Error>> {
    let mut store = SqliteRemoteStore::open_in_memory()?;
    let review = ReviewId::new("r1");
    let record = EditRecord::from_patch(
        review.clone(),
        ItemId::new("a"),
        EditPatch::new().title("New").link("https://example.com"),
        ts(),
    );
    store.upsert_edit(&record)?;

    let stored = store.get_edit(&review, &ItemId::new("a"))?.unwrap();
    assert!(stored.same_fields(&record));
    assert!(stored.category.is_none());
    assert!(stored.description.is_none());

    // A second upsert replaces every field, including clearing old ones.
    let cleared = EditRecord::from_patch(review.clone(), ItemId::new("a"), EditPatch::new(), ts());
    store.upsert_edit(&cleared)?;
    let stored = store.get_edit(&review, &ItemId::new("a"))?.unwrap();
    assert!(stored.title.is_none());
    assert_eq!(store.count_rows(Table::Edits)?, 1);
    Ok(())
}

#[test]
fn delete_edit_is_idempotent() -> Result<(), Box<dyn std::error::Error>> {
    let mut store = SqliteRemoteStore::open_in_memory()?;
    let review = ReviewId::new("r1");
    let item = ItemId::new("a");
    store.upsert_edit(&EditRecord::from_patch(
        review.clone(),
        item.clone(),
        EditPatch::new().title("x"),
        ts(),
    ))?;

    store.delete_edit(&review, &item)?;
    store.delete_edit(&review, &item)?;
    assert!(store.get_edit(&review, &item)?.is_none());
    assert_eq!(store.count_rows(Table::Edits)?, 0);
    Ok(())
}

#[test]
fn empty_comment_is_a_row() -> Result<(), Box<dyn std::error::Error>> {
    let mut store = SqliteRemoteStore::open_in_memory()?;
    store.upsert_comment(&CommentRecord {
        review_id: ReviewId::new("r1"),
        item_id: ItemId::new("a"),
        comment: String::new(),
        updated_at: ts(),
    })?;
    assert_eq!(store.count_rows(Table::Comments)?, 1);
    Ok(())
}

// ============================================================================
// Query
// ============================================================================

#[test]
fn query_is_scoped_to_review() -> Result<(), Box<dyn std::error::Error>> {
    let mut store = SqliteRemoteStore::open_in_memory()?;
    store.upsert_status(&status("r1", "a", ReviewStatus::Use))?;
    store.upsert_status(&status("r1", "b", ReviewStatus::Like))?;
    store.upsert_status(&status("r2", "a", ReviewStatus::Remove))?;
    store.upsert_comment(&CommentRecord {
        review_id: ReviewId::new("r2"),
        item_id: ItemId::new("a"),
        comment: "other review".into(),
        updated_at: ts(),
    })?;

    let r1 = store.query(&ReviewId::new("r1"))?;
    assert_eq!(r1.statuses.len(), 2);
    assert!(r1.comments.is_empty());
    assert!(r1.statuses.iter().all(|s| s.review_id.as_str() == "r1"));

    let r2 = store.query(&ReviewId::new("r2"))?;
    assert_eq!(r2.statuses.len(), 1);
    assert_eq!(r2.comments.len(), 1);

    assert!(store.query(&ReviewId::new("r3"))?.is_empty());
    Ok(())
}

#[test]
fn rows_survive_reopen() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("reviews.db");
    let path = path.to_str().unwrap();

    {
        let mut store = SqliteRemoteStore::open(path)?;
        store.upsert_status(&status("r1", "a", ReviewStatus::Like))?;
    }

    let store = SqliteRemoteStore::open(path)?;
    let statuses = store.fetch_statuses(&ReviewId::new("r1"))?;
    assert_eq!(statuses.len(), 1);
    assert_eq!(statuses[0].status, ReviewStatus::Like);
    Ok(())
}
