use std::collections::{HashMap, HashSet};

use chrono::{Duration, Timelike};
use serde::{Deserialize, Serialize};

use crate::config::RecommendationParams;
use crate::types::{ActivityEvent, DifficultyPreference, LearningPath, UserStats};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeOfDay {
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl TimeOfDay {
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            5..=11 => Self::Morning,
            12..=16 => Self::Afternoon,
            17..=21 => Self::Evening,
            _ => Self::Night,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Morning => "morning",
            Self::Afternoon => "afternoon",
            Self::Evening => "evening",
            Self::Night => "night",
        }
    }

    const ALL: [TimeOfDay; 4] = [Self::Morning, Self::Afternoon, Self::Evening, Self::Night];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityShare {
    pub session_type: String,
    pub count: usize,
    pub share: f64,
}

/// Curriculum progress tracked outside this crate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathProgress {
    /// Path id to completion percentage (0..=100).
    #[serde(default)]
    pub paths: HashMap<String, f64>,
    #[serde(default)]
    pub completed_modules: HashSet<String>,
}

impl PathProgress {
    pub fn percent(&self, path_id: &str) -> f64 {
        self.paths.get(path_id).copied().unwrap_or(0.0).clamp(0.0, 100.0)
    }

    pub fn is_complete(&self, path: &LearningPath) -> bool {
        if self.percent(&path.id) >= 100.0 {
            return true;
        }
        !path.modules.is_empty() && path.modules.iter().all(|m| self.completed_modules.contains(&m.id))
    }

    pub fn is_module_done(&self, module_id: &str) -> bool {
        self.completed_modules.contains(module_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsagePatterns {
    pub hour_histogram: Vec<u32>,
    pub preferred_time_of_day: Option<TimeOfDay>,
    /// Sorted by share, largest first.
    pub activity_preferences: Vec<ActivityShare>,
    pub difficulty_preference: DifficultyPreference,
    pub progress: PathProgress,
}

impl UsagePatterns {
    pub fn from_activity(
        log: &[ActivityEvent],
        stats: &UserStats,
        progress: PathProgress,
        params: &RecommendationParams,
    ) -> Self {
        let offset = Duration::minutes(params.utc_offset_minutes as i64);
        let mut hour_histogram = vec![0_u32; 24];
        let mut type_counts: HashMap<&str, usize> = HashMap::new();

        for event in log {
            let local = event.timestamp + offset;
            hour_histogram[local.hour() as usize] += 1;
            *type_counts.entry(event.session_type.as_str()).or_insert(0) += 1;
        }

        let total = log.len();
        let mut activity_preferences: Vec<ActivityShare> = type_counts
            .into_iter()
            .map(|(session_type, count)| ActivityShare {
                session_type: session_type.to_string(),
                count,
                share: count as f64 / total as f64,
            })
            .collect();
        activity_preferences.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.session_type.cmp(&b.session_type)));

        let preferred_time_of_day = preferred_slot(&hour_histogram, params);

        Self {
            hour_histogram,
            preferred_time_of_day,
            activity_preferences,
            difficulty_preference: DifficultyPreference::from_level(stats.current_level),
            progress,
        }
    }

    pub fn dominant_activity(&self) -> Option<&ActivityShare> {
        self.activity_preferences.first()
    }
}

fn preferred_slot(hour_histogram: &[u32], params: &RecommendationParams) -> Option<TimeOfDay> {
    let total: u32 = hour_histogram.iter().sum();
    if (total as usize) < params.time_of_day_min_events {
        return None;
    }

    let mut slots: HashMap<TimeOfDay, u32> = HashMap::new();
    for (hour, count) in hour_histogram.iter().enumerate() {
        *slots.entry(TimeOfDay::from_hour(hour as u32)).or_insert(0) += count;
    }

    let (slot, count) = TimeOfDay::ALL
        .iter()
        .map(|slot| (*slot, slots.get(slot).copied().unwrap_or(0)))
        .fold((TimeOfDay::Morning, 0), |best, cur| if cur.1 > best.1 { cur } else { best });

    let share = count as f64 / total as f64;
    (share >= params.time_of_day_min_share).then_some(slot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Level, PathModule};
    use chrono::{TimeZone, Utc};

    fn event(hour: u32, kind: &str) -> ActivityEvent {
        ActivityEvent::new(Utc.with_ymd_and_hms(2026, 3, 1, hour, 15, 0).unwrap(), "w", true, kind)
    }

    #[test]
    fn dominant_activity_and_time_slot() {
        let log = vec![
            event(8, "flashcard"),
            event(9, "flashcard"),
            event(10, "quiz"),
            event(20, "flashcard"),
        ];
        let usage = UsagePatterns::from_activity(&log, &UserStats::default(), PathProgress::default(), &RecommendationParams::default());
        let top = usage.dominant_activity().unwrap();
        assert_eq!(top.session_type, "flashcard");
        assert!((top.share - 0.75).abs() < 1e-9);
        assert_eq!(usage.preferred_time_of_day, Some(TimeOfDay::Morning));
        assert_eq!(usage.hour_histogram[8], 1);
        assert_eq!(usage.difficulty_preference, DifficultyPreference::Beginner);
    }

    #[test]
    fn too_few_events_have_no_time_preference() {
        let log = vec![event(8, "quiz"), event(9, "quiz")];
        let usage = UsagePatterns::from_activity(&log, &UserStats::default(), PathProgress::default(), &RecommendationParams::default());
        assert_eq!(usage.preferred_time_of_day, None);
    }

    #[test]
    fn spread_out_usage_has_no_time_preference() {
        let log = vec![event(8, "a"), event(13, "b"), event(18, "c"), event(23, "d")];
        let usage = UsagePatterns::from_activity(&log, &UserStats::default(), PathProgress::default(), &RecommendationParams::default());
        assert_eq!(usage.preferred_time_of_day, None);
    }

    #[test]
    fn offset_shifts_hours() {
        let params = RecommendationParams {
            utc_offset_minutes: 9 * 60,
            ..Default::default()
        };
        let log = vec![event(0, "quiz"), event(1, "quiz"), event(2, "quiz")];
        let usage = UsagePatterns::from_activity(&log, &UserStats::default(), PathProgress::default(), &params);
        assert_eq!(usage.preferred_time_of_day, Some(TimeOfDay::Morning));
    }

    #[test]
    fn path_completion_from_modules_or_percent() {
        let path = LearningPath {
            id: "p1".to_string(),
            title: "Basics".to_string(),
            tier: DifficultyPreference::Beginner,
            prerequisites: vec![],
            modules: vec![PathModule {
                id: "m1".to_string(),
                title: "Greetings".to_string(),
                prerequisites: vec![],
            }],
        };
        let mut progress = PathProgress::default();
        assert!(!progress.is_complete(&path));
        progress.completed_modules.insert("m1".to_string());
        assert!(progress.is_complete(&path));

        let mut by_percent = PathProgress::default();
        by_percent.paths.insert("p1".to_string(), 100.0);
        assert!(by_percent.is_complete(&path));
    }

    #[test]
    fn advanced_preference_at_top_level() {
        let stats = UserStats {
            current_level: Level::MAX,
            ..Default::default()
        };
        let usage = UsagePatterns::from_activity(&[], &stats, PathProgress::default(), &RecommendationParams::default());
        assert_eq!(usage.difficulty_preference, DifficultyPreference::Advanced);
        assert!(usage.dominant_activity().is_none());
    }
}
