use serde::{Deserialize, Serialize};

use crate::analyzer::PerformanceAnalyzer;
use crate::config::{AdaptiveConfig, DifficultyParams, RealtimeParams};
use crate::types::{AdjustmentType, DifficultyAdjustment, Level, PerformanceMetrics, UserStats};

/// Live in-session signals for the continuous adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeSignals {
    pub streak_length: usize,
    pub accuracy: f64,
    pub response_time_secs: f64,
}

impl RealtimeSignals {
    pub fn from_metrics(metrics: &PerformanceMetrics) -> Self {
        Self {
            streak_length: metrics.streak_length,
            accuracy: metrics.accuracy,
            response_time_secs: metrics.average_response_time,
        }
    }
}

pub struct DifficultyController {
    params: DifficultyParams,
    realtime: RealtimeParams,
    analyzer: PerformanceAnalyzer,
}

impl DifficultyController {
    pub fn new(params: DifficultyParams, realtime: RealtimeParams, analyzer: PerformanceAnalyzer) -> Self {
        Self {
            params,
            realtime,
            analyzer,
        }
    }

    pub fn from_config(config: &AdaptiveConfig) -> Self {
        Self::new(
            config.difficulty.clone(),
            config.realtime.clone(),
            PerformanceAnalyzer::new(config.analyzer.clone()),
        )
    }

    pub fn time_budget_secs(&self, level: Level) -> Option<f64> {
        self.params.profile(level).map(|p| p.time_budget_secs)
    }

    pub fn suggest(&self, metrics: &PerformanceMetrics) -> DifficultyAdjustment {
        let score = self.analyzer.performance_score(metrics);
        self.suggest_with_score(metrics, score)
    }

    /// Coarse per-session transition. Moves at most one level; ambiguous
    /// signals fall through to `Maintain`.
    pub fn suggest_with_score(&self, metrics: &PerformanceMetrics, score: f64) -> DifficultyAdjustment {
        let level = metrics.current_level;
        let min_accuracy = self.params.profile(level).map(|p| p.min_accuracy).unwrap_or(1.0);

        let strong = score > self.params.increase_score
            && metrics.accuracy > min_accuracy
            && metrics.streak_length >= self.params.increase_min_streak;
        let weak = score < self.params.decrease_score || metrics.accuracy < self.params.decrease_accuracy;

        if strong && !level.is_max() {
            let new_level = level.raised();
            return DifficultyAdjustment {
                new_level,
                reason: format!(
                    "Score {score:.2} with {} correct in a row clears level {level}; moving to level {new_level}",
                    metrics.streak_length
                ),
                adjustment_type: AdjustmentType::Increase,
                confidence: score.min(self.params.max_confidence),
            };
        }

        if weak && !level.is_min() {
            let new_level = level.lowered();
            return DifficultyAdjustment {
                new_level,
                reason: format!(
                    "Score {score:.2} at {:.0}% accuracy is below level {level}; easing to level {new_level}",
                    metrics.accuracy * 100.0
                ),
                adjustment_type: AdjustmentType::Decrease,
                confidence: (1.0 - score).min(self.params.max_confidence),
            };
        }

        let reason = if strong {
            "Already at the highest level".to_string()
        } else if weak {
            "Already at the easiest level".to_string()
        } else {
            format!("Performance fits level {level}")
        };

        DifficultyAdjustment {
            new_level: level,
            reason,
            adjustment_type: AdjustmentType::Maintain,
            confidence: self.params.maintain_confidence,
        }
    }

    pub fn realtime_delta(&self, signals: &RealtimeSignals) -> f64 {
        let p = &self.realtime;
        let mut delta = 0.0;

        if signals.streak_length >= p.hot_streak {
            delta += p.hot_streak_delta;
        }
        if signals.streak_length <= p.cold_streak && signals.accuracy < p.cold_accuracy {
            delta += p.cold_delta;
        }
        if signals.response_time_secs < p.fast_response_secs && signals.accuracy > p.fast_accuracy {
            delta += p.fast_delta;
        }
        if signals.response_time_secs > p.slow_response_secs {
            delta += p.slow_delta;
        }

        delta
    }

    /// Fine-grained in-session level. Never written back to `UserStats`.
    pub fn realtime_level(&self, signals: &RealtimeSignals, current: Level) -> Level {
        let target = (current.get() as f64 + self.realtime_delta(signals)).clamp(Level::MIN.get() as f64, Level::MAX.get() as f64);
        Level::new(target.round() as i64)
    }
}

impl Default for DifficultyController {
    fn default() -> Self {
        Self::from_config(&AdaptiveConfig::default())
    }
}

/// The committed level from `UserStats` plus the live level shown inside a
/// session. Only `commit` changes the committed level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionLevel {
    pub committed: Level,
    pub live: Level,
}

impl SessionLevel {
    pub fn start(stats: &UserStats) -> Self {
        Self {
            committed: stats.current_level,
            live: stats.current_level,
        }
    }

    pub fn observe(&mut self, controller: &DifficultyController, signals: &RealtimeSignals) -> Level {
        self.live = controller.realtime_level(signals, self.committed);
        self.live
    }

    /// Session boundary: the coarse adjustment wins and the live level is dropped.
    pub fn commit(&mut self, adjustment: &DifficultyAdjustment) -> Level {
        self.committed = adjustment.new_level;
        self.live = adjustment.new_level;
        self.committed
    }
}

pub fn resolve_session_level(stats: &UserStats, adjustment: &DifficultyAdjustment) -> UserStats {
    UserStats {
        current_level: adjustment.new_level,
        ..stats.clone()
    }
}
