use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{Level, MAX_LEVEL, MIN_LEVEL};

/// Upper bound for `maxIntervalDays`; keeps due dates inside chrono's range.
pub const MAX_INTERVAL_DAYS_LIMIT: i64 = 36_500;
/// Upper bound for `activityRetentionDays`.
pub const MAX_RETENTION_DAYS: i64 = 3_650;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("validation error: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerParams {
    pub initial_ease_factor: f64,
    pub min_ease_factor: f64,
    pub correct_quality: u8,
    pub incorrect_quality: u8,
    pub max_interval_days: i64,
}

impl Default for SchedulerParams {
    fn default() -> Self {
        Self {
            initial_ease_factor: 2.5,
            min_ease_factor: 1.3,
            correct_quality: 5,
            incorrect_quality: 2,
            max_interval_days: 365,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreWeights {
    pub accuracy: f64,
    pub timeliness: f64,
    pub streak: f64,
    pub consistency: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            accuracy: 0.4,
            timeliness: 0.3,
            streak: 0.2,
            consistency: 0.1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzerParams {
    pub weights: ScoreWeights,
    pub assumed_response_time_secs: f64,
    pub optimal_pace_secs: f64,
    pub pace_tolerance_secs: f64,
    pub streak_saturation: usize,
    pub recent_window: usize,
    pub empty_log_accuracy: f64,
}

impl Default for AnalyzerParams {
    fn default() -> Self {
        Self {
            weights: ScoreWeights::default(),
            assumed_response_time_secs: 5.0,
            optimal_pace_secs: 6.0,
            pace_tolerance_secs: 10.0,
            streak_saturation: 10,
            recent_window: 10,
            empty_log_accuracy: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelProfile {
    pub level: u8,
    pub min_accuracy: f64,
    pub time_budget_secs: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DifficultyParams {
    pub levels: Vec<LevelProfile>,
    pub increase_score: f64,
    pub increase_min_streak: usize,
    pub decrease_score: f64,
    pub decrease_accuracy: f64,
    pub max_confidence: f64,
    pub maintain_confidence: f64,
}

impl Default for DifficultyParams {
    fn default() -> Self {
        let table = [(1, 0.90, 15.0), (2, 0.85, 12.0), (3, 0.80, 10.0), (4, 0.75, 8.0), (5, 0.65, 6.0)];
        Self {
            levels: table
                .iter()
                .map(|&(level, min_accuracy, time_budget_secs)| LevelProfile {
                    level,
                    min_accuracy,
                    time_budget_secs,
                })
                .collect(),
            increase_score: 0.8,
            increase_min_streak: 5,
            decrease_score: 0.4,
            decrease_accuracy: 0.6,
            max_confidence: 0.9,
            maintain_confidence: 0.5,
        }
    }
}

impl DifficultyParams {
    pub fn profile(&self, level: Level) -> Option<&LevelProfile> {
        self.levels.iter().find(|p| p.level == level.get())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeParams {
    pub hot_streak: usize,
    pub hot_streak_delta: f64,
    pub cold_streak: usize,
    pub cold_accuracy: f64,
    pub cold_delta: f64,
    pub fast_response_secs: f64,
    pub fast_accuracy: f64,
    pub fast_delta: f64,
    pub slow_response_secs: f64,
    pub slow_delta: f64,
}

impl Default for RealtimeParams {
    fn default() -> Self {
        Self {
            hot_streak: 8,
            hot_streak_delta: 0.5,
            cold_streak: 2,
            cold_accuracy: 0.6,
            cold_delta: -0.5,
            fast_response_secs: 4.0,
            fast_accuracy: 0.9,
            fast_delta: 0.3,
            slow_response_secs: 15.0,
            slow_delta: -0.2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationParams {
    pub adjustment_benefit: f64,
    pub path_confidence: f64,
    pub path_benefit: f64,
    pub module_confidence: f64,
    pub module_benefit: f64,
    pub activity_share_threshold: f64,
    pub activity_confidence: f64,
    pub activity_benefit: f64,
    pub review_accuracy_threshold: f64,
    pub review_confidence: f64,
    pub review_benefit: f64,
    pub schedule_confidence: f64,
    pub schedule_benefit: f64,
    pub time_of_day_min_share: f64,
    pub time_of_day_min_events: usize,
    pub utc_offset_minutes: i32,
    pub default_limit: usize,
}

impl Default for RecommendationParams {
    fn default() -> Self {
        Self {
            adjustment_benefit: 0.8,
            path_confidence: 0.9,
            path_benefit: 0.95,
            module_confidence: 0.85,
            module_benefit: 0.9,
            activity_share_threshold: 0.3,
            activity_confidence: 0.7,
            activity_benefit: 0.6,
            review_accuracy_threshold: 0.7,
            review_confidence: 0.8,
            review_benefit: 0.85,
            schedule_confidence: 0.6,
            schedule_benefit: 0.4,
            time_of_day_min_share: 0.4,
            time_of_day_min_events: 3,
            utc_offset_minutes: 0,
            default_limit: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendParams {
    pub window_size: usize,
    pub min_samples: usize,
    pub up_threshold: f64,
    pub down_threshold: f64,
    pub stuck_variance_threshold: f64,
}

impl Default for TrendParams {
    fn default() -> Self {
        Self {
            window_size: 30,
            min_samples: 5,
            up_threshold: 0.02,
            down_threshold: -0.02,
            stuck_variance_threshold: 0.005,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetentionParams {
    pub activity_limit: usize,
    pub activity_retention_days: i64,
}

impl Default for RetentionParams {
    fn default() -> Self {
        Self {
            activity_limit: 100,
            activity_retention_days: 30,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdaptiveConfig {
    pub scheduler: SchedulerParams,
    pub analyzer: AnalyzerParams,
    pub difficulty: DifficultyParams,
    pub realtime: RealtimeParams,
    pub recommendation: RecommendationParams,
    pub trend: TrendParams,
    pub retention: RetentionParams,
}

impl AdaptiveConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("ADAPTIVE_MAX_INTERVAL_DAYS") {
            if let Ok(days) = val.parse::<i64>() {
                config.scheduler.max_interval_days = days.clamp(1, MAX_INTERVAL_DAYS_LIMIT);
            }
        }
        if let Ok(val) = std::env::var("ADAPTIVE_ASSUMED_RESPONSE_SECS") {
            if let Ok(secs) = val.parse::<f64>() {
                if secs.is_finite() && secs >= 0.0 {
                    config.analyzer.assumed_response_time_secs = secs;
                }
            }
        }
        if let Ok(val) = std::env::var("ADAPTIVE_ACTIVITY_RETENTION_DAYS") {
            if let Ok(days) = val.parse::<i64>() {
                config.retention.activity_retention_days = days.clamp(1, MAX_RETENTION_DAYS);
            }
        }
        if let Ok(val) = std::env::var("ADAPTIVE_UTC_OFFSET_MINUTES") {
            if let Ok(minutes) = val.parse::<i32>() {
                config.recommendation.utc_offset_minutes = minutes.clamp(-14 * 60, 14 * 60);
            }
        }
        if let Ok(val) = std::env::var("ADAPTIVE_ACTIVITY_LIMIT") {
            if let Ok(limit) = val.parse::<usize>() {
                config.retention.activity_limit = limit.max(1);
            }
        }

        config
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.scheduler;
        if s.min_ease_factor < 1.3 {
            return Err(ConfigError::Validation(format!(
                "minEaseFactor must be >= 1.3, got {}",
                s.min_ease_factor
            )));
        }
        if s.initial_ease_factor < s.min_ease_factor {
            return Err(ConfigError::Validation(
                "initialEaseFactor must not be below minEaseFactor".to_string(),
            ));
        }
        if s.correct_quality > 5 || s.incorrect_quality > 5 {
            return Err(ConfigError::Validation("quality values must be within 0..=5".to_string()));
        }
        if !(6..=MAX_INTERVAL_DAYS_LIMIT).contains(&s.max_interval_days) {
            return Err(ConfigError::Validation(format!(
                "maxIntervalDays must be within 6..={MAX_INTERVAL_DAYS_LIMIT}, got {}",
                s.max_interval_days
            )));
        }

        let w = &self.analyzer.weights;
        let total = w.accuracy + w.timeliness + w.streak + w.consistency;
        if [w.accuracy, w.timeliness, w.streak, w.consistency].iter().any(|v| *v < 0.0)
            || (total - 1.0).abs() > 1e-6
        {
            return Err(ConfigError::Validation(format!(
                "score weights must be non-negative and sum to 1, got {total:.4}"
            )));
        }
        if self.analyzer.pace_tolerance_secs <= 0.0 {
            return Err(ConfigError::Validation("paceToleranceSecs must be positive".to_string()));
        }
        if self.analyzer.streak_saturation == 0 || self.analyzer.recent_window == 0 {
            return Err(ConfigError::Validation(
                "streakSaturation and recentWindow must be positive".to_string(),
            ));
        }

        for level in MIN_LEVEL..=MAX_LEVEL {
            if self.difficulty.profile(Level::new(level as i64)).is_none() {
                return Err(ConfigError::Validation(format!("missing profile for level {level}")));
            }
        }
        for pair in self.difficulty.levels.windows(2) {
            if pair[1].level > pair[0].level && pair[1].min_accuracy > pair[0].min_accuracy {
                return Err(ConfigError::Validation(
                    "minAccuracy must not increase with level".to_string(),
                ));
            }
        }

        if self.retention.activity_limit == 0 {
            return Err(ConfigError::Validation("activityLimit must be positive".to_string()));
        }
        if !(1..=MAX_RETENTION_DAYS).contains(&self.retention.activity_retention_days) {
            return Err(ConfigError::Validation(format!(
                "activityRetentionDays must be within 1..={MAX_RETENTION_DAYS}, got {}",
                self.retention.activity_retention_days
            )));
        }
        if self.trend.min_samples < 2 || self.trend.window_size < self.trend.min_samples {
            return Err(ConfigError::Validation(
                "trend window must hold at least minSamples (>= 2)".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(AdaptiveConfig::default().validate().is_ok());
    }

    #[test]
    fn level_table_decreases() {
        let params = DifficultyParams::default();
        let first = params.profile(Level::new(1)).unwrap();
        let last = params.profile(Level::new(5)).unwrap();
        assert!((first.min_accuracy - 0.9).abs() < 1e-9);
        assert!((last.min_accuracy - 0.65).abs() < 1e-9);
        assert!((first.time_budget_secs - 15.0).abs() < 1e-9);
        assert!((last.time_budget_secs - 6.0).abs() < 1e-9);
    }

    #[test]
    fn rejects_bad_weights() {
        let mut config = AdaptiveConfig::default();
        config.analyzer.weights.accuracy = 0.9;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_low_ease_floor() {
        let mut config = AdaptiveConfig::default();
        config.scheduler.min_ease_factor = 1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_unbounded_interval_cap() {
        let mut config = AdaptiveConfig::default();
        config.scheduler.max_interval_days = 1_000_000_000_000;
        assert!(config.validate().is_err());
        config.scheduler.max_interval_days = MAX_INTERVAL_DAYS_LIMIT;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_unbounded_retention_window() {
        let mut config = AdaptiveConfig::default();
        config.retention.activity_retention_days = 1_000_000_000;
        assert!(config.validate().is_err());
        config.retention.activity_retention_days = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn from_env_clamps_day_counts() {
        std::env::set_var("ADAPTIVE_MAX_INTERVAL_DAYS", "1000000000000");
        std::env::set_var("ADAPTIVE_ACTIVITY_RETENTION_DAYS", "1000000000");
        let config = AdaptiveConfig::from_env();
        std::env::remove_var("ADAPTIVE_MAX_INTERVAL_DAYS");
        std::env::remove_var("ADAPTIVE_ACTIVITY_RETENTION_DAYS");

        assert_eq!(config.scheduler.max_interval_days, MAX_INTERVAL_DAYS_LIMIT);
        assert_eq!(config.retention.activity_retention_days, MAX_RETENTION_DAYS);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_missing_level() {
        let mut config = AdaptiveConfig::default();
        config.difficulty.levels.retain(|p| p.level != 3);
        assert!(config.validate().is_err());
    }

    #[test]
    fn serde_roundtrip_uses_camel_case() {
        let json = serde_json::to_value(AdaptiveConfig::default()).unwrap();
        assert!(json["scheduler"]["maxIntervalDays"].is_number());
        assert!(json["analyzer"]["assumedResponseTimeSecs"].is_number());
    }
}
