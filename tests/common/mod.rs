#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};

use danci_adaptive::{
    AdaptiveConfig, AdaptiveEngine, DifficultyPreference, LearningPath, MemoryStore, PathModule, SqliteStore,
};

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
}

pub fn memory_engine() -> AdaptiveEngine<MemoryStore> {
    AdaptiveEngine::new(AdaptiveConfig::default(), MemoryStore::new())
}

/// Engine over a SQLite file inside `dir`.
pub fn sqlite_engine(dir: &tempfile::TempDir) -> AdaptiveEngine<SqliteStore> {
    let store = SqliteStore::open(dir.path().join("adaptive.db")).unwrap();
    AdaptiveEngine::new(AdaptiveConfig::default(), store)
}

fn module(id: &str, prerequisites: &[&str]) -> PathModule {
    PathModule {
        id: id.to_string(),
        title: format!("Module {id}"),
        prerequisites: prerequisites.iter().map(|s| s.to_string()).collect(),
    }
}

pub fn curriculum() -> Vec<LearningPath> {
    vec![
        LearningPath {
            id: "basics".to_string(),
            title: "Everyday Basics".to_string(),
            tier: DifficultyPreference::Beginner,
            prerequisites: vec![],
            modules: vec![module("greetings", &[]), module("numbers", &["greetings"])],
        },
        LearningPath {
            id: "travel".to_string(),
            title: "Travel Talk".to_string(),
            tier: DifficultyPreference::Intermediate,
            prerequisites: vec!["basics".to_string()],
            modules: vec![module("airport", &[]), module("hotel", &["airport"])],
        },
    ]
}
