use std::collections::VecDeque;

use crate::config::{AnalyzerParams, TrendParams};
use crate::types::{ActivityEvent, PerformanceMetrics, TrendState, UserStats};

pub struct PerformanceAnalyzer {
    params: AnalyzerParams,
}

impl PerformanceAnalyzer {
    pub fn new(params: AnalyzerParams) -> Self {
        Self { params }
    }

    /// Analyze with the configured placeholder response time.
    pub fn analyze(&self, log: &[ActivityEvent], stats: &UserStats) -> PerformanceMetrics {
        self.analyze_with_response_time(log, stats, self.params.assumed_response_time_secs)
    }

    pub fn analyze_with_response_time(
        &self,
        log: &[ActivityEvent],
        stats: &UserStats,
        response_time_secs: f64,
    ) -> PerformanceMetrics {
        let mut ordered: Vec<&ActivityEvent> = log.iter().collect();
        // Stable: events sharing a timestamp keep the caller's order.
        ordered.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        let accuracy = if ordered.is_empty() {
            self.params.empty_log_accuracy
        } else {
            ordered.iter().filter(|e| e.is_correct).count() as f64 / ordered.len() as f64
        };

        let streak_length = ordered.iter().take_while(|e| e.is_correct).count();

        let recent_performance = ordered
            .iter()
            .take(self.params.recent_window)
            .map(|e| u8::from(e.is_correct))
            .collect();

        PerformanceMetrics {
            accuracy,
            average_response_time: response_time_secs,
            streak_length,
            session_length: ordered.len(),
            recent_performance,
            current_level: stats.current_level,
        }
    }

    pub fn timeliness(&self, response_time_secs: f64) -> f64 {
        if !response_time_secs.is_finite() {
            return 0.0;
        }
        let off_pace = (response_time_secs - self.params.optimal_pace_secs).abs();
        (1.0 - off_pace / self.params.pace_tolerance_secs).clamp(0.0, 1.0)
    }

    pub fn streak_score(&self, streak_length: usize) -> f64 {
        let saturation = self.params.streak_saturation.max(1) as f64;
        (streak_length as f64 / saturation).min(1.0)
    }

    pub fn consistency(&self, recent_performance: &[u8]) -> f64 {
        (1.0 - population_variance(recent_performance)).clamp(0.0, 1.0)
    }

    pub fn performance_score(&self, metrics: &PerformanceMetrics) -> f64 {
        let w = &self.params.weights;
        let accuracy = if metrics.accuracy.is_finite() {
            metrics.accuracy.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let score = accuracy * w.accuracy
            + self.timeliness(metrics.average_response_time) * w.timeliness
            + self.streak_score(metrics.streak_length) * w.streak
            + self.consistency(&metrics.recent_performance) * w.consistency;
        score.clamp(0.0, 1.0)
    }
}

impl Default for PerformanceAnalyzer {
    fn default() -> Self {
        Self::new(AnalyzerParams::default())
    }
}

/// Population variance; 0 for an empty sequence.
pub fn population_variance(values: &[u8]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().map(|&v| v as f64).sum::<f64>() / n;
    values.iter().map(|&v| (v as f64 - mean).powi(2)).sum::<f64>() / n
}

/// Sliding window over session performance scores.
pub struct TrendTracker {
    params: TrendParams,
    history: VecDeque<f64>,
    current_trend: TrendState,
}

impl TrendTracker {
    pub fn new(params: TrendParams) -> Self {
        let capacity = params.window_size;
        Self {
            params,
            history: VecDeque::with_capacity(capacity),
            current_trend: TrendState::Flat,
        }
    }

    /// Rebuild from stored scores, oldest first.
    pub fn from_scores(params: TrendParams, scores: impl IntoIterator<Item = f64>) -> Self {
        let mut tracker = Self::new(params);
        for score in scores {
            tracker.update(score);
        }
        tracker
    }

    pub fn update(&mut self, score: f64) -> TrendState {
        if !score.is_finite() {
            return self.current_trend;
        }
        self.history.push_back(score);
        while self.history.len() > self.params.window_size {
            self.history.pop_front();
        }

        if self.history.len() < self.params.min_samples {
            self.current_trend = TrendState::Flat;
            return self.current_trend;
        }

        let slope = self.slope();
        let variance = self.variance();

        self.current_trend = if slope > self.params.up_threshold {
            TrendState::Up
        } else if slope < self.params.down_threshold {
            TrendState::Down
        } else if variance < self.params.stuck_variance_threshold && slope.abs() < 1e-3 {
            TrendState::Stuck
        } else {
            TrendState::Flat
        };

        self.current_trend
    }

    pub fn current(&self) -> TrendState {
        self.current_trend
    }

    pub fn scores(&self) -> impl Iterator<Item = f64> + '_ {
        self.history.iter().copied()
    }

    fn slope(&self) -> f64 {
        let n = self.history.len() as f64;
        if n < 2.0 {
            return 0.0;
        }
        let sum_x: f64 = (0..self.history.len()).map(|i| i as f64).sum();
        let sum_y: f64 = self.history.iter().sum();
        let sum_xy: f64 = self.history.iter().enumerate().map(|(i, y)| i as f64 * y).sum();
        let sum_xx: f64 = (0..self.history.len()).map(|i| (i as f64).powi(2)).sum();

        let denominator = n * sum_xx - sum_x.powi(2);
        if denominator.abs() < 1e-10 {
            return 0.0;
        }
        (n * sum_xy - sum_x * sum_y) / denominator
    }

    fn variance(&self) -> f64 {
        let n = self.history.len() as f64;
        let mean = self.history.iter().sum::<f64>() / n;
        self.history.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n
    }
}

impl Default for TrendTracker {
    fn default() -> Self {
        Self::new(TrendParams::default())
    }
}
