use chrono::TimeDelta;
use curate_core::{Clock, EditPatch, ItemFilter, ReviewStatus, merge};
use curate_engine::{
    Direction, EngineError, FocusCommand, FocusNavigator, FocusOutcome, Key, KeyInput, KeyTarget,
    Panel,
};
use curate_harness::{ManualClock, SimulatedRemote, TestSession, item_id, numbered_catalog};

fn three_items() -> Result<TestSession, Box<dyn std::error::Error>> {
    Ok(TestSession::with_catalog(numbered_catalog(3)?, SimulatedRemote::new()?)?)
}

// ============================================================================
// Navigator
// ============================================================================

#[test]
fn status_advances_until_last_item() -> Result<(), Box<dyn std::error::Error>> {
    let mut t = three_items()?;
    t.session.enter_focus(None)?;
    assert_eq!(t.session.focus().unwrap().current_index(), Some(0));

    let outcome = t.session.focus_command(FocusCommand::Status(ReviewStatus::Use))?;
    assert_eq!(
        outcome,
        FocusOutcome::ApplyStatus {
            item_id: item_id("item-0"),
            status: ReviewStatus::Use,
            advancing: true,
        }
    );
    assert_eq!(t.item("item-0").unwrap().status, ReviewStatus::Use);
    assert!(t.session.focus().unwrap().is_transitioning());

    t.advance_ms(200);
    let nav = t.session.focus().unwrap();
    assert_eq!(nav.current_index(), Some(1));
    assert!(!nav.is_transitioning());

    t.session.focus_command(FocusCommand::Next)?;
    t.advance_ms(200);
    assert_eq!(t.session.focus().unwrap().current_index(), Some(2));

    let outcome = t.session.focus_command(FocusCommand::Status(ReviewStatus::Remove))?;
    assert!(matches!(outcome, FocusOutcome::ApplyStatus { advancing: false, .. }));
    assert_eq!(t.item("item-2").unwrap().status, ReviewStatus::Remove);

    let nav = t.session.focus().unwrap();
    assert_eq!(nav.current_index(), Some(2));
    assert!(!nav.is_transitioning());
    Ok(())
}

#[test]
fn commands_rejected_while_transitioning() -> Result<(), Box<dyn std::error::Error>> {
    let mut t = three_items()?;
    t.session.enter_focus(None)?;

    t.session.focus_command(FocusCommand::Skip)?;
    assert_eq!(
        t.session.focus_command(FocusCommand::Status(ReviewStatus::Like))?,
        FocusOutcome::Ignored
    );
    assert_eq!(t.session.focus_command(FocusCommand::Next)?, FocusOutcome::Ignored);
    assert_eq!(t.item("item-0").unwrap().status, ReviewStatus::Unreviewed);

    t.advance_ms(199);
    assert_eq!(t.session.focus().unwrap().current_index(), Some(0));
    t.advance_ms(1);
    assert_eq!(t.session.focus().unwrap().current_index(), Some(1));
    Ok(())
}

#[test]
fn starts_at_first_unreviewed_item() -> Result<(), Box<dyn std::error::Error>> {
    let mut t = three_items()?;
    t.session.set_status(&item_id("item-0"), ReviewStatus::Use)?;
    t.pump();

    t.session.enter_focus(None)?;
    assert_eq!(t.session.focus().unwrap().current_index(), Some(1));

    for id in ["item-1", "item-2"] {
        t.session.set_status(&item_id(id), ReviewStatus::Like)?;
    }
    t.pump();
    t.session.enter_focus(None)?;
    assert_eq!(t.session.focus().unwrap().current_index(), Some(0));
    Ok(())
}

#[test]
fn empty_list_has_no_position() -> Result<(), Box<dyn std::error::Error>> {
    let mut t = three_items()?;
    let nav = t
        .session
        .enter_focus(Some(&ItemFilter::new().search("no such title")))?;
    assert!(nav.is_empty());
    assert_eq!(nav.current_index(), None);
    assert!(nav.current_item().is_none());

    assert_eq!(
        t.session.focus_command(FocusCommand::Status(ReviewStatus::Use))?,
        FocusOutcome::Ignored
    );
    assert_eq!(t.session.focus_command(FocusCommand::Next)?, FocusOutcome::Ignored);
    assert!(t.session.focused_item().is_none());
    Ok(())
}

#[test]
fn item_list_is_fixed_on_entry() -> Result<(), Box<dyn std::error::Error>> {
    let mut t = three_items()?;
    let filter = ItemFilter::new().status(ReviewStatus::Unreviewed);
    t.session.enter_focus(Some(&filter))?;

    t.session.focus_command(FocusCommand::Status(ReviewStatus::Use))?;
    t.advance_ms(200);

    // item-0 no longer matches the filter but keeps its slot.
    let nav = t.session.focus().unwrap();
    assert_eq!(nav.len(), 3);
    assert_eq!(nav.current_item(), Some(&item_id("item-1")));
    assert_eq!(t.session.filtered(&filter).len(), 2);
    Ok(())
}

#[test]
fn moving_back_and_bounds() -> Result<(), Box<dyn std::error::Error>> {
    let clock = ManualClock::new();
    let catalog = numbered_catalog(2)?;
    let items = merge(catalog.items(), &[], &[], &[]);
    let mut nav = FocusNavigator::new(&items, TimeDelta::milliseconds(200));

    assert!(!nav.go_prev(clock.now()));
    assert!(!nav.go_to(5, Direction::Next, clock.now()));

    assert!(nav.go_next(clock.now()));
    assert_eq!(nav.direction(), Direction::Next);
    clock.advance_ms(200);
    assert_eq!(nav.poll(clock.now()), Some(1));
    assert!(!nav.go_next(clock.now()));

    assert_eq!(
        nav.dispatch(FocusCommand::Prev, clock.now()),
        FocusOutcome::Moving {
            target: 0,
            direction: Direction::Prev,
        }
    );
    clock.advance_ms(200);
    assert_eq!(nav.poll(clock.now()), Some(0));
    assert_eq!(nav.poll(clock.now()), None);
    Ok(())
}

#[test]
fn oversized_delay_never_commits() -> Result<(), Box<dyn std::error::Error>> {
    let clock = ManualClock::new();
    let items = merge(numbered_catalog(2)?.items(), &[], &[], &[]);
    let mut nav = FocusNavigator::new(&items, TimeDelta::days(365 * 1_000_000));

    assert!(nav.go_next(clock.now()));
    clock.advance_ms(10 * 365 * 24 * 60 * 60 * 1_000);
    assert_eq!(nav.poll(clock.now()), None);
    assert!(nav.is_transitioning());
    assert_eq!(nav.current_index(), Some(0));
    Ok(())
}

#[test]
fn transition_closes_open_panels() -> Result<(), Box<dyn std::error::Error>> {
    let mut t = three_items()?;
    t.session.enter_focus(None)?;

    t.session.focus_command(FocusCommand::ToggleComment)?;
    t.session.focus_command(FocusCommand::ToggleEdit)?;
    let nav = t.session.focus().unwrap();
    assert!(nav.is_commenting() && nav.is_editing());

    t.session.focus_command(FocusCommand::Next)?;
    let nav = t.session.focus().unwrap();
    assert!(!nav.is_commenting());
    assert!(!nav.is_editing());
    Ok(())
}

// ============================================================================
// Keyboard
// ============================================================================

#[test]
fn keys_map_to_commands() -> Result<(), Box<dyn std::error::Error>> {
    let mut t = three_items()?;
    t.session.enter_focus(None)?;

    let outcome = t.session.focus_key(KeyInput::new(Key::Char('2')))?;
    assert!(matches!(
        outcome,
        FocusOutcome::ApplyStatus { status: ReviewStatus::Like, .. }
    ));
    t.advance_ms(200);

    let outcome = t.session.focus_key(KeyInput::new(Key::Space))?;
    assert!(matches!(outcome, FocusOutcome::Moving { target: 2, .. }));
    t.advance_ms(200);

    let outcome = t.session.focus_key(KeyInput::new(Key::Left))?;
    assert!(matches!(outcome, FocusOutcome::Moving { target: 1, direction: Direction::Prev }));
    t.advance_ms(200);

    assert_eq!(
        t.session.focus_key(KeyInput::new(Key::Char('x')))?,
        FocusOutcome::Ignored
    );
    assert_eq!(t.item("item-1").unwrap().status, ReviewStatus::Unreviewed);
    Ok(())
}

#[test]
fn keys_ignored_while_panel_open_or_typing() -> Result<(), Box<dyn std::error::Error>> {
    let mut t = three_items()?;
    t.session.enter_focus(None)?;

    let typing = KeyInput::in_target(Key::Char('1'), KeyTarget::TextArea);
    assert_eq!(t.session.focus_key(typing)?, FocusOutcome::Ignored);

    let outcome = t.session.focus_key(KeyInput::new(Key::Char('e')))?;
    assert_eq!(
        outcome,
        FocusOutcome::PanelToggled {
            panel: Panel::Edit,
            open: true,
        }
    );
    assert_eq!(
        t.session.focus_key(KeyInput::new(Key::Char('1')))?,
        FocusOutcome::Ignored
    );
    assert_eq!(
        t.session.focus_key(KeyInput::new(Key::Escape))?,
        FocusOutcome::Ignored
    );
    assert_eq!(t.item("item-0").unwrap().status, ReviewStatus::Unreviewed);
    assert!(t.session.focus().unwrap().is_editing());
    Ok(())
}

#[test]
fn escape_closes_panel_before_exiting() -> Result<(), Box<dyn std::error::Error>> {
    let mut t = three_items()?;
    t.session.enter_focus(None)?;
    t.session.focus_command(FocusCommand::ToggleComment)?;

    let outcome = t.session.focus_command(FocusCommand::Escape)?;
    assert_eq!(
        outcome,
        FocusOutcome::PanelToggled {
            panel: Panel::Comment,
            open: false,
        }
    );
    assert!(t.session.focus().is_some());

    let outcome = t.session.focus_key(KeyInput::new(Key::Escape))?;
    assert_eq!(outcome, FocusOutcome::Exit);
    assert!(t.session.focus().is_none());

    let err = t.session.focus_command(FocusCommand::Next).unwrap_err();
    assert!(matches!(err, EngineError::FocusInactive));
    Ok(())
}

// ============================================================================
// Session integration
// ============================================================================

#[test]
fn saving_edits_closes_edit_panel() -> Result<(), Box<dyn std::error::Error>> {
    let mut t = three_items()?;
    t.session.enter_focus(None)?;
    t.session.focus_command(FocusCommand::ToggleEdit)?;

    let current = t.session.focus().unwrap().current_item().cloned().unwrap();
    t.session.save_edits(&current, EditPatch::new().title("Retitled"))?;

    assert!(!t.session.focus().unwrap().is_editing());
    assert_eq!(t.session.focused_item().unwrap().title, "Retitled");
    Ok(())
}

#[test]
fn clearing_comment_closes_comment_panel() -> Result<(), Box<dyn std::error::Error>> {
    let mut t = three_items()?;
    t.session.enter_focus(None)?;
    let current = t.session.focus().unwrap().current_item().cloned().unwrap();

    t.session.focus_command(FocusCommand::ToggleComment)?;
    t.session.save_comment(&current, "draft")?;
    assert!(t.session.focus().unwrap().is_commenting());

    t.session.save_comment(&current, "")?;
    assert!(!t.session.focus().unwrap().is_commenting());
    Ok(())
}

#[test]
fn close_drops_pending_transition() -> Result<(), Box<dyn std::error::Error>> {
    let mut t = three_items()?;
    t.session.enter_focus(None)?;
    t.session.focus_command(FocusCommand::Next)?;

    t.session.close();
    assert!(t.session.focus().is_none());
    t.advance_ms(500);
    assert!(matches!(
        t.session.enter_focus(None),
        Err(EngineError::SessionClosed)
    ));
    Ok(())
}
