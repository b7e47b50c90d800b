use serde::{Deserialize, Serialize};

use crate::types::{GoalCategory, LearningGoal, PerformanceMetrics, UserStats};

/// Activity counters that are not part of `UserStats`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalSignals {
    /// Correct attempts on sentence items, fed by the caller.
    pub correct_sentences: u32,
}

pub fn goal_value(category: GoalCategory, stats: &UserStats, metrics: &PerformanceMetrics, signals: &GoalSignals) -> f64 {
    match category {
        GoalCategory::Vocabulary => stats.total_items_learned as f64,
        GoalCategory::Accuracy => metrics.accuracy.clamp(0.0, 1.0) * 100.0,
        GoalCategory::Fluency => stats.total_study_time_minutes as f64,
        GoalCategory::Speed => metrics.session_length as f64,
        GoalCategory::Grammar => signals.correct_sentences as f64,
    }
}

pub fn progress_percent(current: f64, target: f64) -> f64 {
    if !current.is_finite() || current <= 0.0 {
        return 0.0;
    }
    if !target.is_finite() || target <= 0.0 {
        return 100.0;
    }
    (current / target * 100.0).clamp(0.0, 100.0)
}

/// Refresh `current_value` and `progress`; every user-owned field is left alone.
pub fn update_goal_progress(
    goal: &LearningGoal,
    stats: &UserStats,
    metrics: &PerformanceMetrics,
    signals: &GoalSignals,
) -> LearningGoal {
    let current_value = goal_value(goal.category, stats, metrics, signals);
    LearningGoal {
        current_value,
        progress: progress_percent(current_value, goal.target_value),
        ..goal.clone()
    }
}

pub fn update_all(
    goals: &[LearningGoal],
    stats: &UserStats,
    metrics: &PerformanceMetrics,
    signals: &GoalSignals,
) -> Vec<LearningGoal> {
    goals
        .iter()
        .map(|goal| update_goal_progress(goal, stats, metrics, signals))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{GoalPriority, Level};

    fn goal(category: GoalCategory, target: f64) -> LearningGoal {
        LearningGoal {
            id: "g1".to_string(),
            target_value: target,
            current_value: 0.0,
            unit: "items".to_string(),
            priority: GoalPriority::High,
            category,
            progress: 0.0,
        }
    }

    fn metrics() -> PerformanceMetrics {
        PerformanceMetrics {
            accuracy: 0.75,
            average_response_time: 5.0,
            streak_length: 2,
            session_length: 12,
            recent_performance: vec![1, 1, 0],
            current_level: Level::new(2),
        }
    }

    #[test]
    fn vocabulary_goal_tracks_items_learned() {
        let stats = UserStats {
            total_items_learned: 25,
            ..Default::default()
        };
        let updated = update_goal_progress(&goal(GoalCategory::Vocabulary, 100.0), &stats, &metrics(), &GoalSignals::default());
        assert_eq!(updated.current_value, 25.0);
        assert!((updated.progress - 25.0).abs() < 1e-9);
        assert_eq!(updated.priority, GoalPriority::High);
    }

    #[test]
    fn accuracy_goal_uses_percent() {
        let updated = update_goal_progress(&goal(GoalCategory::Accuracy, 90.0), &UserStats::default(), &metrics(), &GoalSignals::default());
        assert!((updated.current_value - 75.0).abs() < 1e-9);
        assert!((updated.progress - 75.0 / 90.0 * 100.0).abs() < 1e-9);
    }

    #[test]
    fn progress_is_capped() {
        let stats = UserStats {
            total_study_time_minutes: 600,
            ..Default::default()
        };
        let updated = update_goal_progress(&goal(GoalCategory::Fluency, 60.0), &stats, &metrics(), &GoalSignals::default());
        assert_eq!(updated.progress, 100.0);
    }

    #[test]
    fn zero_target_edge_cases() {
        assert_eq!(progress_percent(0.0, 0.0), 0.0);
        assert_eq!(progress_percent(3.0, 0.0), 100.0);
        assert_eq!(progress_percent(f64::NAN, 10.0), 0.0);
    }

    #[test]
    fn grammar_and_speed_goals() {
        let signals = GoalSignals { correct_sentences: 4 };
        let goals = vec![goal(GoalCategory::Grammar, 8.0), goal(GoalCategory::Speed, 24.0)];
        let updated = update_all(&goals, &UserStats::default(), &metrics(), &signals);
        assert!((updated[0].progress - 50.0).abs() < 1e-9);
        assert!((updated[1].progress - 50.0).abs() < 1e-9);
    }
}
