//! # tactician-core
//!
//! Core library for tactician - a chess tactics and endgame trainer.
//!
//! This library provides:
//! - Session state machines for puzzles, tablebase endgames and game review
//! - A navigable position timeline over a pluggable rules engine
//! - Progress, favorites and catalog persistence over a key-value store
//! - Configuration management
//! - Logging infrastructure
//!
//! ## Architecture
//!
//! Every session is built from the same pieces:
//! - **Rules:** [`RulesEngine`] answers legality and game-over questions for FEN positions
//! - **Timeline:** [`Timeline`] keeps every explored position plus a current pointer
//! - **Scheduler:** [`ActionScheduler`] delays follow-up effects and drops superseded ones
//!
//! ## Example
//!
//! ```rust,no_run
//! use tactician_core::{Catalog, Config, SqliteStore, ProgressLedger};
//!
//! let config = Config::load().expect("failed to load config");
//! let store = SqliteStore::open(&config.store_path()).expect("failed to open store");
//! let ledger = ProgressLedger::load(&store).expect("failed to load progress");
//! let catalog = Catalog::load(&config.catalog_path()).expect("failed to load catalog");
//! println!("{} of {} puzzles attempted", ledger.len(), catalog.len());
//! ```

// Re-export commonly used items at the crate root
pub use catalog::{Catalog, PuzzleInfo};
pub use config::Config;
pub use endgame::{EndgameLayout, EndgameSession, HttpMoveService, MoveService};
pub use error::{Error, Result};
pub use favorites::Favorites;
pub use history::BrowseHistory;
pub use moves_list::MoveAnnotationList;
pub use pgn::GameRecord;
pub use progress::{ProgressLedger, SuccessMode};
pub use puzzle::PuzzleSolver;
pub use review::ReviewedGame;
pub use rules::{Board, RulesEngine, ShakmatyRules};
pub use scheduler::ActionScheduler;
pub use session::PuzzleSession;
pub use store::{KeyValueStore, MemoryStore, SqliteStore};
pub use timeline::Timeline;
pub use types::*;

// Public modules
pub mod catalog;
pub mod config;
pub mod endgame;
pub mod error;
pub mod favorites;
pub mod history;
pub mod logging;
pub mod moves_list;
pub mod pgn;
pub mod progress;
pub mod puzzle;
pub mod review;
pub mod rules;
pub mod scheduler;
pub mod session;
pub mod store;
pub mod timeline;
pub mod types;
