use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub type ItemId = String;

pub const MIN_LEVEL: u8 = 1;
pub const MAX_LEVEL: u8 = 5;

/// Global difficulty level, always within `MIN_LEVEL..=MAX_LEVEL`.
///
/// Out-of-range input is clamped on construction and on deserialization, so a
/// corrupted stored value never reaches the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub struct Level(u8);

impl Level {
    pub const MIN: Level = Level(MIN_LEVEL);
    pub const MAX: Level = Level(MAX_LEVEL);

    pub fn new(value: i64) -> Self {
        Self(value.clamp(MIN_LEVEL as i64, MAX_LEVEL as i64) as u8)
    }

    pub fn get(self) -> u8 {
        self.0
    }

    pub fn is_max(self) -> bool {
        self.0 >= MAX_LEVEL
    }

    pub fn is_min(self) -> bool {
        self.0 <= MIN_LEVEL
    }

    pub fn raised(self) -> Self {
        Self::new(self.0 as i64 + 1)
    }

    pub fn lowered(self) -> Self {
        Self::new(self.0 as i64 - 1)
    }
}

impl Default for Level {
    fn default() -> Self {
        Self::MIN
    }
}

impl From<i64> for Level {
    fn from(value: i64) -> Self {
        Self::new(value)
    }
}

impl From<Level> for i64 {
    fn from(level: Level) -> Self {
        level.0 as i64
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================
// Content
// ============================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningItem {
    pub id: ItemId,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl LearningItem {
    pub fn new(id: impl Into<ItemId>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            category: None,
        }
    }

    pub fn char_count(&self) -> usize {
        self.text.chars().filter(|c| !c.is_whitespace()).count()
    }

    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }

    /// A-priori difficulty bucket from surface features only.
    ///
    /// Single words are bucketed by length; multi-word items (phrases and
    /// sentences) start at 2 and grow with the number of words.
    pub fn difficulty_bucket(&self) -> Level {
        let words = self.word_count();
        let chars = self.char_count();
        let bucket = if words <= 1 {
            match chars {
                0..=4 => 1,
                5..=7 => 2,
                8..=10 => 3,
                11..=14 => 4,
                _ => 5,
            }
        } else {
            match words {
                2..=3 => 2,
                4..=6 => 3,
                7..=10 => 4,
                _ => 5,
            }
        };
        Level::new(bucket)
    }
}

// ============================================================
// Scheduling state
// ============================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRecord {
    pub item_id: ItemId,
    pub repetitions: u32,
    /// Days until the item is next due.
    pub interval: u32,
    pub ease_factor: f64,
    pub next_due: DateTime<Utc>,
    pub last_studied: DateTime<Utc>,
    /// Set once the item has been answered correctly at least once.
    #[serde(default)]
    pub learned: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEvent {
    pub timestamp: DateTime<Utc>,
    pub item_id: ItemId,
    pub is_correct: bool,
    pub session_type: String,
}

impl ActivityEvent {
    pub fn new(
        timestamp: DateTime<Utc>,
        item_id: impl Into<ItemId>,
        is_correct: bool,
        session_type: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            item_id: item_id.into(),
            is_correct,
            session_type: session_type.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total_items_learned: u32,
    pub total_study_time_minutes: u32,
    pub streak_days: u32,
    pub current_level: Level,
    pub daily_goal: u32,
    #[serde(default)]
    pub last_study_date: Option<NaiveDate>,
}

impl Default for UserStats {
    fn default() -> Self {
        Self {
            total_items_learned: 0,
            total_study_time_minutes: 0,
            streak_days: 0,
            current_level: Level::MIN,
            daily_goal: 10,
            last_study_date: None,
        }
    }
}

// ============================================================
// Derived analysis
// ============================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetrics {
    pub accuracy: f64,
    /// Seconds per attempt.
    pub average_response_time: f64,
    pub streak_length: usize,
    pub session_length: usize,
    /// Most recent first, 1 = correct.
    pub recent_performance: Vec<u8>,
    pub current_level: Level,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdjustmentType {
    Increase,
    Decrease,
    Maintain,
}

impl AdjustmentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Increase => "increase",
            Self::Decrease => "decrease",
            Self::Maintain => "maintain",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DifficultyAdjustment {
    pub new_level: Level,
    pub reason: String,
    pub adjustment_type: AdjustmentType,
    pub confidence: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendState {
    Up,
    #[default]
    Flat,
    Stuck,
    Down,
}

impl TrendState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Flat => "flat",
            Self::Stuck => "stuck",
            Self::Down => "down",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "up" => Self::Up,
            "stuck" => Self::Stuck,
            "down" => Self::Down,
            _ => Self::Flat,
        }
    }
}

// ============================================================
// Goals
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalPriority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalCategory {
    Vocabulary,
    Grammar,
    Fluency,
    Accuracy,
    Speed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningGoal {
    pub id: String,
    pub target_value: f64,
    pub current_value: f64,
    pub unit: String,
    pub priority: GoalPriority,
    pub category: GoalCategory,
    /// Percentage, 0..=100.
    pub progress: f64,
}

// ============================================================
// Curriculum and recommendations
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DifficultyPreference {
    Beginner,
    Intermediate,
    Advanced,
}

impl DifficultyPreference {
    pub fn from_level(level: Level) -> Self {
        match level.get() {
            0..=2 => Self::Beginner,
            3..=4 => Self::Intermediate,
            _ => Self::Advanced,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Beginner => "beginner",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathModule {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub prerequisites: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningPath {
    pub id: String,
    pub title: String,
    pub tier: DifficultyPreference,
    #[serde(default)]
    pub prerequisites: Vec<String>,
    pub modules: Vec<PathModule>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationType {
    Path,
    Module,
    Activity,
    Review,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    #[serde(rename = "type")]
    pub kind: RecommendationType,
    pub title: String,
    pub reason: String,
    pub confidence: f64,
    pub estimated_benefit: f64,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl Recommendation {
    pub fn score(&self) -> f64 {
        self.confidence * self.estimated_benefit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_clamps_out_of_range() {
        assert_eq!(Level::new(6).get(), 5);
        assert_eq!(Level::new(0).get(), 1);
        assert_eq!(Level::new(-3).get(), 1);
        assert_eq!(Level::MAX.raised(), Level::MAX);
        assert_eq!(Level::MIN.lowered(), Level::MIN);
    }

    #[test]
    fn level_deserialization_clamps() {
        let level: Level = serde_json::from_str("9").unwrap();
        assert_eq!(level, Level::MAX);
        assert_eq!(serde_json::to_string(&Level::new(3)).unwrap(), "3");
    }

    #[test]
    fn difficulty_bucket_from_text() {
        assert_eq!(LearningItem::new("w1", "cat").difficulty_bucket().get(), 1);
        assert_eq!(LearningItem::new("w2", "library").difficulty_bucket().get(), 2);
        assert_eq!(LearningItem::new("w3", "incomprehensible").difficulty_bucket().get(), 5);
        assert_eq!(LearningItem::new("s1", "good morning").difficulty_bucket().get(), 2);
        assert_eq!(
            LearningItem::new("s2", "the quick brown fox jumps over the lazy dog today")
                .difficulty_bucket()
                .get(),
            4
        );
    }

    #[test]
    fn preference_from_level() {
        assert_eq!(DifficultyPreference::from_level(Level::new(2)), DifficultyPreference::Beginner);
        assert_eq!(DifficultyPreference::from_level(Level::new(4)), DifficultyPreference::Intermediate);
        assert_eq!(DifficultyPreference::from_level(Level::new(5)), DifficultyPreference::Advanced);
    }

    #[test]
    fn recommendation_serializes_type_field() {
        let rec = Recommendation {
            kind: RecommendationType::Review,
            title: "t".to_string(),
            reason: "r".to_string(),
            confidence: 0.8,
            estimated_benefit: 0.85,
            payload: serde_json::Value::Null,
        };
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["type"], "review");
        assert!(json["estimatedBenefit"].is_number());
    }

    #[test]
    fn trend_state_parse() {
        assert_eq!(TrendState::parse("UP"), TrendState::Up);
        assert_eq!(TrendState::parse("bogus"), TrendState::Flat);
    }
}
