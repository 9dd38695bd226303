use curate_core::{
    Catalog, ContentItem, ContentKind, CoreError, EditPatch, ItemFilter, ItemId, ReviewId,
    ReviewStatus, StatusRecord, export,
};
use curate_engine::{
    DirectTransport, EngineError, ReviewSession, SessionConfig, SyncEvent, load_catalog,
};
use curate_harness::{ManualClock, TestSession, item_id, sample_items};
use curate_storage::{RemoteStore, SqliteRemoteStore};

// ============================================================================
// Loading
// ============================================================================

#[test]
fn catalog_load_errors_are_fatal() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;

    let missing = load_catalog(&dir.path().join("missing.json"));
    assert!(matches!(missing, Err(EngineError::Load(_))));

    let malformed = dir.path().join("malformed.json");
    std::fs::write(&malformed, "[{\"id\": \"a\"")?;
    assert!(matches!(load_catalog(&malformed), Err(EngineError::Load(_))));

    let duplicated = dir.path().join("dup.json");
    std::fs::write(
        &duplicated,
        r#"[{"id": "a", "title": "A"}, {"id": "a", "title": "again"}]"#,
    )?;
    assert!(matches!(load_catalog(&duplicated), Err(EngineError::Load(_))));
    Ok(())
}

#[test]
fn duplicate_catalog_ids_rejected() {
    let result = Catalog::new(vec![ContentItem::new("a", "A"), ContentItem::new("a", "B")]);
    assert!(matches!(result, Err(CoreError::DuplicateItem(id)) if id == "a"));
}

#[test]
fn catalog_parses_optional_fields() -> Result<(), Box<dyn std::error::Error>> {
    let catalog = Catalog::from_json(
        r#"[
            {"id": "a", "title": "A", "category": "Photos", "media": "a.jpg"},
            {"id": "b", "title": "B"}
        ]"#,
    )?;
    assert_eq!(catalog.len(), 2);
    assert_eq!(catalog.position(&ItemId::new("b")), Some(1));
    let a = catalog.get(&ItemId::new("a")).unwrap();
    assert_eq!(a.media.as_deref(), Some("a.jpg"));
    assert!(a.description.is_none());
    Ok(())
}

#[test]
fn session_resumes_persisted_overlay() -> Result<(), Box<dyn std::error::Error>> {
    let mut store = SqliteRemoteStore::open_in_memory()?;
    store.upsert_status(&StatusRecord {
        review_id: ReviewId::new("review-1"),
        item_id: ItemId::new("c"),
        status: ReviewStatus::Like,
        updated_at: chrono::Utc::now(),
    })?;
    store.upsert_status(&StatusRecord {
        review_id: ReviewId::new("review-2"),
        item_id: ItemId::new("a"),
        status: ReviewStatus::Remove,
        updated_at: chrono::Utc::now(),
    })?;

    let session = ReviewSession::builder("review-1", Catalog::new(sample_items())?)
        .remote(DirectTransport::new(store))
        .clock(ManualClock::new())
        .open()?;

    assert_eq!(session.item(&item_id("c")).unwrap().status, ReviewStatus::Like);
    assert_eq!(session.item(&item_id("a")).unwrap().status, ReviewStatus::Unreviewed);
    assert_eq!(session.progress().reviewed, 1);
    Ok(())
}

#[test]
fn direct_transport_round_trip() -> Result<(), Box<dyn std::error::Error>> {
    let mut session = ReviewSession::builder("review-1", Catalog::new(sample_items())?)
        .remote(DirectTransport::new(SqliteRemoteStore::open_in_memory()?))
        .open()?;

    session.set_status(&item_id("a"), ReviewStatus::Use)?;
    session.save_comment(&item_id("a"), "lead image")?;
    let events = session.settle(4);

    assert!(session.sync().is_settled());
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, SyncEvent::Saved { .. }))
            .count(),
        2
    );
    Ok(())
}

// ============================================================================
// Filtering and progress
// ============================================================================

#[test]
fn filters_compose() -> Result<(), Box<dyn std::error::Error>> {
    let mut t = TestSession::new()?;
    t.session.set_status(&item_id("a"), ReviewStatus::Use)?;
    t.session.set_status(&item_id("c"), ReviewStatus::Remove)?;
    t.session
        .save_edits(&item_id("e"), EditPatch::new().category("Articles"))?;
    t.pump();

    let photos = t.session.filtered(&ItemFilter::new().category("Photos"));
    assert_eq!(photos.len(), 2);

    let used = t.session.filtered(&ItemFilter::new().status(ReviewStatus::Use));
    assert_eq!(used.len(), 1);
    assert_eq!(used[0].id, item_id("a"));

    // Category matches the edited value, not the baseline.
    let articles = t.session.filtered(&ItemFilter::new().category("Articles"));
    let ids: Vec<&str> = articles.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, ["b", "d", "e"]);

    let images = t.session.filtered(&ItemFilter::new().content(ContentKind::Images));
    assert_eq!(images.len(), 2);
    let text = t.session.filtered(&ItemFilter::new().content(ContentKind::Text));
    assert_eq!(text.len(), 3);

    // Search spans title and description, case-insensitively.
    let boats = t.session.filtered(&ItemFilter::new().search("BOATS"));
    assert_eq!(boats.len(), 1);
    let none = t.session.filtered(
        &ItemFilter::new()
            .search("harbour")
            .status(ReviewStatus::Remove),
    );
    assert!(none.is_empty());

    assert!(!ItemFilter::new().search("").is_active());
    assert_eq!(t.session.filtered(&ItemFilter::new()).len(), 5);
    Ok(())
}

#[test]
fn categories_come_from_baseline() -> Result<(), Box<dyn std::error::Error>> {
    let t = TestSession::new()?;
    assert_eq!(t.session.categories(), ["Photos", "Articles"]);
    Ok(())
}

#[test]
fn progress_counts() -> Result<(), Box<dyn std::error::Error>> {
    let mut t = TestSession::new()?;
    assert_eq!(t.session.progress().percent(), 0);

    t.session.set_status(&item_id("a"), ReviewStatus::Use)?;
    t.session.set_status(&item_id("b"), ReviewStatus::Like)?;
    t.session.save_comment(&item_id("b"), "good")?;
    t.session.save_comment(&item_id("c"), "")?;
    t.session.save_edits(&item_id("d"), EditPatch::new())?;
    t.pump();

    let progress = t.session.progress();
    assert_eq!(progress.total, 5);
    assert_eq!(progress.reviewed, 2);
    assert_eq!(progress.use_count, 1);
    assert_eq!(progress.like_count, 1);
    assert_eq!(progress.remove_count, 0);
    assert_eq!(progress.edited, 1);
    assert_eq!(progress.commented, 1);
    assert_eq!(progress.remaining(), 3);
    assert_eq!(progress.percent(), 40);
    Ok(())
}

// ============================================================================
// Export
// ============================================================================

#[test]
fn csv_export_escapes_cells() -> Result<(), Box<dyn std::error::Error>> {
    let catalog = Catalog::new(vec![
        ContentItem::new("a", "Plain"),
        ContentItem::new("b", "Comma, \"quoted\"").with_description("two\nlines"),
    ])?;
    let mut session = ReviewSession::builder("r", catalog)
        .clock(ManualClock::new())
        .open()?;
    session.set_status(&item_id("b"), ReviewStatus::Remove)?;
    session.save_comment(&item_id("b"), "needs, work")?;

    let csv = export::to_csv(&session.items());
    let mut lines = csv.split('\n');
    assert_eq!(
        lines.next(),
        Some("id,title,category,description,link,status,isEdited,statusUpdatedAt,editUpdatedAt,comment")
    );
    assert_eq!(lines.next(), Some("a,Plain,,,,unreviewed,false,,,"));
    assert!(csv.contains("b,\"Comma, \"\"quoted\"\"\",,\"two\nlines\",,remove,false,2024-01-01T00:00:00.000Z,,\"needs, work\""));
    Ok(())
}

#[test]
fn json_export_uses_camel_case() -> Result<(), Box<dyn std::error::Error>> {
    let (mut session, _clock) = TestSession::local_only()?;
    session.save_edits(&item_id("a"), EditPatch::new().title("Edited"))?;

    let json = export::to_json(&session.items())?;
    let rows: serde_json::Value = serde_json::from_str(&json)?;
    let first = &rows[0];
    assert_eq!(first["id"], "a");
    assert_eq!(first["title"], "Edited");
    assert_eq!(first["isEdited"], true);
    assert_eq!(first["status"], "unreviewed");
    assert_eq!(first["statusUpdatedAt"], "");
    assert_eq!(rows.as_array().map(Vec::len), Some(5));
    Ok(())
}

// ============================================================================
// Config
// ============================================================================

#[test]
fn config_defaults_and_overrides() -> Result<(), Box<dyn std::error::Error>> {
    let defaults = SessionConfig::from_toml_str("")?;
    assert_eq!(defaults, SessionConfig::default());
    assert_eq!(defaults.saved_revert_ms, 2_000);
    assert_eq!(defaults.transition_ms, 200);

    let tuned = SessionConfig::from_toml_str("saved_revert_ms = 500")?;
    assert_eq!(tuned.saved_revert_ms, 500);
    assert_eq!(tuned.transition_ms, 200);

    assert!(matches!(
        SessionConfig::from_toml_str("saved_revert_ms = \"soon\""),
        Err(EngineError::Config(_))
    ));

    let dir = tempfile::tempdir()?;
    assert_eq!(
        SessionConfig::load(&dir.path().join("absent.toml"))?,
        SessionConfig::default()
    );
    Ok(())
}

#[test]
fn configured_revert_delay_applies() -> Result<(), Box<dyn std::error::Error>> {
    let config = SessionConfig::from_toml_str("saved_revert_ms = 500\ntransition_ms = 50")?;
    let mut t = TestSession::with_config(
        curate_harness::sample_catalog()?,
        curate_harness::SimulatedRemote::new()?,
        config,
    )?;
    let a = item_id("a");

    t.session.set_status(&a, ReviewStatus::Use)?;
    t.pump();
    t.advance_ms(500);
    assert_eq!(t.session.save_state(&a), curate_core::SaveState::Idle);

    t.session.enter_focus(None)?;
    t.session
        .focus_command(curate_engine::FocusCommand::Next)?;
    t.advance_ms(50);
    assert_eq!(t.session.focus().unwrap().current_index(), Some(2));
    Ok(())
}
