//! Integration tests for the tactician session pipeline
//!
//! These tests use the puzzle files in `tests/fixtures/puzzles/` to verify
//! gathering, persistence and the trainer flows end to end.

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tactician_core::config::{FilterConfig, TrainerConfig};
use tactician_core::puzzle::{Attempt, Rejection};
use tactician_core::scheduler::ActionScheduler;
use tactician_core::session::{Feedback, PuzzleAction, Submission};
use tactician_core::timeline::MoveOutcome;
use tactician_core::{
    BrowseHistory, Catalog, Favorites, KeyValueStore, MemoryStore, MoveSpec, ProgressLedger,
    PuzzleSession, PuzzleSolver, PuzzleType, ShakmatyRules, SqliteStore, Timeline,
    STARTING_POSITION,
};
use tempfile::TempDir;

/// Get the path to the fixture puzzles directory
fn puzzles_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/puzzles")
}

fn timeline() -> Timeline<ShakmatyRules> {
    Timeline::new(ShakmatyRules::new(), STARTING_POSITION, None)
}

fn uci(text: &str) -> MoveSpec {
    MoveSpec::parse_uci(text).expect("valid uci")
}

// ============================================
// Timeline Tests
// ============================================

#[test]
fn test_advance_from_start() {
    let mut timeline = timeline();
    let outcome = timeline.advance(&uci("e2e4"), None);

    assert!(outcome.is_applied());
    assert_eq!(timeline.len(), 2);
    assert_eq!(timeline.current_index(), 1);
    let played = timeline.entry(1).unwrap().played.as_ref().unwrap();
    assert_eq!(played.san, "e4");
}

#[test]
fn test_deviation_replaces_continuation() {
    let mut timeline = timeline();
    timeline.advance(&uci("e2e4"), None);

    assert!(timeline.retreat());
    assert_eq!(timeline.current_index(), 0);

    match timeline.advance(&uci("d2d4"), None) {
        MoveOutcome::Applied { truncated, .. } => assert_eq!(truncated, 1),
        MoveOutcome::Illegal => panic!("d4 should be legal"),
    }
    assert_eq!(timeline.len(), 2);
    assert_eq!(timeline.entry(1).unwrap().played.as_ref().unwrap().san, "d4");
}

#[test]
fn test_navigation_never_truncates() {
    let mut timeline = timeline();
    for m in ["e2e4", "e7e5", "g1f3", "b8c6"] {
        assert!(timeline.advance(&uci(m), None).is_applied());
    }

    assert!(timeline.jump(1));
    assert!(timeline.retreat());
    assert!(!timeline.retreat());
    assert!(timeline.replay_forward());
    assert!(timeline.jump(4));
    assert!(!timeline.replay_forward());
    assert!(!timeline.jump(5));
    assert_eq!(timeline.len(), 5);
}

#[test]
fn test_illegal_move_changes_nothing() {
    let mut timeline = timeline();
    timeline.advance(&uci("e2e4"), None);
    let before = timeline.position().to_string();

    assert_eq!(timeline.advance(&uci("e4e6"), None), MoveOutcome::Illegal);
    assert_eq!(timeline.position(), before);
    assert_eq!(timeline.len(), 2);
}

// ============================================
// Puzzle Tests
// ============================================

fn solver() -> PuzzleSolver<ShakmatyRules> {
    let line = ["e4", "e5", "Nf3"].map(String::from).to_vec();
    PuzzleSolver::new(ShakmatyRules::new(), STARTING_POSITION, line).unwrap()
}

#[test]
fn test_puzzle_solved_along_line() {
    let mut solver = solver();

    assert!(solver.attempt("e5").is_correct());
    assert!(!solver.is_solved());

    assert!(solver.attempt("Nf3").is_correct());
    assert!(solver.is_solved());
}

#[test]
fn test_wrong_move_records_depth_once() {
    let store = MemoryStore::new();
    let mut ledger = ProgressLedger::load(&store).unwrap();
    let mut solver = solver();

    assert!(solver.attempt("e5").is_correct());
    let before = solver.position().to_string();

    assert_eq!(
        solver.attempt("Nc3"),
        Attempt::Incorrect(Rejection::WrongMove)
    );
    assert_eq!(solver.position(), before);

    assert!(ledger.save_if_first("p1", solver.progress_value()).unwrap());
    assert_eq!(ledger.get("p1"), Some(1));

    // A later, better result never overwrites the first one
    assert!(solver.attempt("Nf3").is_correct());
    assert!(!ledger.save_if_first("p1", 2).unwrap());
    assert_eq!(ledger.get("p1"), Some(1));
}

#[test]
fn test_puzzle_move_index_is_monotonic() {
    let mut solver = solver();
    let mut last = solver.move_index();
    for san in ["Nc6", "e5", "Qh5", "Nf3"] {
        solver.attempt(san);
        assert!(solver.move_index() >= last);
        last = solver.move_index();
    }
    assert!(solver.is_solved());
}

// ============================================
// History and Scheduler Tests
// ============================================

#[test]
fn test_history_discards_forward_slot() {
    let mut history = BrowseHistory::new();
    history.add("A");
    history.add("B");

    assert_eq!(history.previous(), Some(&"A"));
    history.add("C");
    assert_eq!(history.next(), None);
    assert_eq!(history.len(), 2);
}

#[test]
fn test_last_schedule_wins() {
    let mut scheduler = ActionScheduler::new();
    let now = Instant::now();
    scheduler.schedule_at("first", now, Duration::from_millis(10));
    scheduler.schedule_at("second", now, Duration::from_millis(20));

    let later = now + Duration::from_millis(50);
    assert_eq!(scheduler.poll(later), Some("second"));
    assert_eq!(scheduler.poll(later), None);
    assert!(!scheduler.is_busy());
}

#[test]
fn test_later_schedule_with_earlier_deadline_wins() {
    let mut scheduler = ActionScheduler::new();
    let now = Instant::now();
    scheduler.schedule_at("A", now, Duration::from_millis(100));
    scheduler.schedule_at("B", now, Duration::from_millis(50));

    assert_eq!(scheduler.poll(now + Duration::from_millis(50)), Some("B"));
    assert_eq!(scheduler.poll(now + Duration::from_millis(100)), None);
    assert!(!scheduler.is_busy());
}

// ============================================
// Catalog and Session Tests
// ============================================

#[test]
fn test_gather_fixtures() {
    let catalog = Catalog::gather(&puzzles_dir()).unwrap();

    // broken.pgn has an illegal setup move and is skipped
    assert_eq!(catalog.len(), 2);

    // Material-advantage puzzles sort ahead of checkmates
    let opening = &catalog.entries()[0];
    assert_eq!(opening.path, "openings/open_game.pgn");
    assert_eq!(opening.moves, 2);
    assert!(!opening.white_to_move);

    let mate = &catalog.entries()[1];
    assert_eq!(mate.puzzle_type, PuzzleType::Checkmate);
    assert_eq!(mate.path, "mates/scholars.pgn");
    assert!(mate.white_to_move);
    assert_eq!(mate.moves, 1);
    assert_eq!(mate.initial_evaluation, "M1");
    assert_eq!(
        catalog.get(&mate.hash).unwrap().name,
        "Ramos vs. Lindqvist (2023.11.04)"
    );
}

#[test]
fn test_catalog_save_and_load() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("catalog/puzzles.json");
    let catalog = Catalog::gather(&puzzles_dir()).unwrap();

    catalog.save(&path).unwrap();
    let loaded = Catalog::load(&path).unwrap();
    assert_eq!(loaded.entries(), catalog.entries());
}

fn scholars_id(catalog: &Catalog) -> String {
    catalog
        .entries()
        .iter()
        .find(|p| p.path == "mates/scholars.pgn")
        .map(|p| p.hash.clone())
        .unwrap()
}

fn trainer() -> TrainerConfig {
    TrainerConfig {
        keep_playing: false,
        delay_ms: 100,
        ..Default::default()
    }
}

#[test]
fn test_solve_gathered_puzzle_with_sqlite_store() {
    tactician_core::logging::init_test();
    let temp = TempDir::new().unwrap();
    let store = Arc::new(SqliteStore::open(&temp.path().join("store.db")).unwrap());
    let catalog = Catalog::gather(&puzzles_dir()).unwrap();
    let id = scholars_id(&catalog);

    let ledger = ProgressLedger::load(Arc::clone(&store)).unwrap();
    let favorites = Favorites::load(Arc::clone(&store)).unwrap();
    let mut session = PuzzleSession::new(
        trainer(),
        FilterConfig::default(),
        catalog,
        puzzles_dir(),
        ledger,
        favorites,
    );

    let now = Instant::now();
    session.open(&id, true, now).unwrap();
    assert_eq!(session.status(), "○ White to move");

    let submission = session.submit(&uci("h5f7"), now).unwrap();
    assert!(matches!(submission, Submission::Correct { solved: true, .. }));
    assert_eq!(session.feedback(), Some(&Feedback::Solved));
    assert!(session.status().contains("Black is checkmated"));
    assert_eq!(session.toggle_favorite().unwrap(), Some(true));

    drop(session);
    let reopened = ProgressLedger::load(Arc::clone(&store)).unwrap();
    assert_eq!(reopened.get(&id), Some(1));
    assert_eq!(
        store.get("favorites").unwrap()[id.as_str()],
        serde_json::Value::Bool(true)
    );
}

#[test]
fn test_wrong_move_reverts_after_delay() {
    let store = Arc::new(MemoryStore::new());
    let catalog = Catalog::gather(&puzzles_dir()).unwrap();
    let id = scholars_id(&catalog);
    let mut session = PuzzleSession::new(
        trainer(),
        FilterConfig::default(),
        catalog,
        puzzles_dir(),
        ProgressLedger::load(Arc::clone(&store)).unwrap(),
        Favorites::load(Arc::clone(&store)).unwrap(),
    );
    let mut rng = StdRng::seed_from_u64(7);

    let now = Instant::now();
    session.open(&id, true, now).unwrap();
    let start = session.board_fen().unwrap();

    let submission = session.submit(&uci("c4f7"), now).unwrap();
    assert!(matches!(submission, Submission::Incorrect(_)));
    assert!(session.is_busy());
    assert_eq!(session.ledger().get(&id), Some(0));

    assert_eq!(session.poll(now, &mut rng).unwrap(), None);
    let later = now + Duration::from_millis(200);
    assert_eq!(
        session.poll(later, &mut rng).unwrap(),
        Some(PuzzleAction::Revert)
    );
    assert_eq!(session.board_fen().unwrap(), start);
    assert_eq!(session.feedback(), None);
}

#[test]
fn test_next_puzzle_respects_filter() {
    let store = Arc::new(MemoryStore::new());
    let filter = FilterConfig {
        themes: vec![PuzzleType::MaterialAdvantage],
        ..Default::default()
    };
    let mut session = PuzzleSession::new(
        trainer(),
        filter,
        Catalog::gather(&puzzles_dir()).unwrap(),
        puzzles_dir(),
        ProgressLedger::load(Arc::clone(&store)).unwrap(),
        Favorites::load(Arc::clone(&store)).unwrap(),
    );
    let mut rng = StdRng::seed_from_u64(1);

    assert_eq!(session.filtered_count(), 1);
    let id = session.next_puzzle(&mut rng, Instant::now()).unwrap().unwrap();
    assert_eq!(session.catalog().get(&id).unwrap().path, "openings/open_game.pgn");
    assert_eq!(session.history().len(), 1);
}
