//! # danci-adaptive
//!
//! Adaptive scheduling for vocabulary and sentence practice:
//!
//! - **Review scheduling** - SM-2 spaced repetition over binary outcomes
//! - **Performance analysis** - accuracy, pace, streak and consistency folded into one score
//! - **Difficulty control** - hysteretic level changes at session boundaries, live nudges in-session
//! - **Recommendations** - ranked next actions from usage patterns and curriculum progress
//!
//! ## Modules
//!
//! - [`scheduler`] - review records, intervals, due queue
//! - [`analyzer`] - performance metrics, score, trend tracking
//! - [`difficulty`] - level adjustments
//! - [`usage`] - time-of-day and activity preferences, path progress
//! - [`recommend`] - recommendation candidates and ranking
//! - [`goals`] - goal progress
//! - [`storage`] - the [`LearnerStore`] seam with memory and SQLite backends
//! - [`engine`] - [`AdaptiveEngine`], wiring the above to a store
//!
//! ## Example
//!
//! ```rust
//! use chrono::Utc;
//! use danci_adaptive::{AdaptiveConfig, AdaptiveEngine, MemoryStore};
//!
//! let engine = AdaptiveEngine::new(AdaptiveConfig::default(), MemoryStore::new());
//! let now = Utc::now();
//! engine.record_attempt("u1", "apple", true, "flashcard", now).unwrap();
//! let report = engine.complete_session("u1", 5, &Default::default()).unwrap();
//! assert!((0.0..=1.0).contains(&report.score));
//! ```

pub mod analyzer;
pub mod config;
pub mod difficulty;
pub mod engine;
pub mod goals;
pub mod logging;
pub mod recommend;
pub mod scheduler;
pub mod storage;
pub mod types;
pub mod usage;

pub use analyzer::{PerformanceAnalyzer, TrendTracker};
pub use config::{AdaptiveConfig, ConfigError};
pub use difficulty::{resolve_session_level, DifficultyController, RealtimeSignals, SessionLevel};
pub use engine::{AdaptiveEngine, AttemptResult, SessionReport};
pub use goals::GoalSignals;
pub use recommend::{RecommendationContext, RecommendationEngine};
pub use scheduler::{Quality, ReviewOutcome, ReviewScheduler};
pub use storage::{LearnerStore, MemoryStore, SqliteStore, StorageError, StorageResult};
pub use types::*;
pub use usage::{PathProgress, TimeOfDay, UsagePatterns};
