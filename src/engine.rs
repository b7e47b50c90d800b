use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::analyzer::{PerformanceAnalyzer, TrendTracker};
use crate::config::AdaptiveConfig;
use crate::difficulty::{resolve_session_level, DifficultyController, RealtimeSignals};
use crate::goals::{self, GoalSignals};
use crate::recommend::{RecommendationContext, RecommendationEngine};
use crate::scheduler::{ReviewOutcome, ReviewScheduler};
use crate::storage::{LearnerStore, StorageResult};
use crate::types::{
    ActivityEvent, DifficultyAdjustment, ItemId, LearningPath, Level, PerformanceMetrics, Recommendation,
    TrendState, UserStats,
};
use crate::usage::{PathProgress, UsagePatterns};

const REVIEW_PAYLOAD_LIMIT: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptResult {
    pub outcome: ReviewOutcome,
    pub stats: UserStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionReport {
    pub metrics: PerformanceMetrics,
    pub score: f64,
    pub adjustment: DifficultyAdjustment,
    pub trend: TrendState,
    pub stats: UserStats,
}

/// Wires the four components to a [`LearnerStore`].
///
/// Every call is a read-compute-write against one user's records; callers
/// must not run two calls for the same user concurrently.
pub struct AdaptiveEngine<S: LearnerStore> {
    config: AdaptiveConfig,
    store: S,
    scheduler: ReviewScheduler,
    analyzer: PerformanceAnalyzer,
    controller: DifficultyController,
    recommender: RecommendationEngine,
}

impl<S: LearnerStore> AdaptiveEngine<S> {
    pub fn new(config: AdaptiveConfig, store: S) -> Self {
        Self {
            scheduler: ReviewScheduler::new(config.scheduler.clone()),
            analyzer: PerformanceAnalyzer::new(config.analyzer.clone()),
            controller: DifficultyController::from_config(&config),
            recommender: RecommendationEngine::new(config.recommendation.clone()),
            config,
            store,
        }
    }

    pub fn config(&self) -> &AdaptiveConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn stats_or_default(&self, user_id: &str) -> StorageResult<UserStats> {
        Ok(self.store.load_stats(user_id)?.unwrap_or_default())
    }

    fn recent_log(&self, user_id: &str) -> StorageResult<Vec<ActivityEvent>> {
        self.store.recent_activity(user_id, self.config.retention.activity_limit)
    }

    /// Writes go out in order: review record, activity event, stats, goals.
    /// They are not batched, so an error part-way leaves the earlier writes
    /// in place; a retry applies the review update again.
    pub fn record_attempt(
        &self,
        user_id: &str,
        item_id: &str,
        is_correct: bool,
        session_type: &str,
        now: DateTime<Utc>,
    ) -> StorageResult<AttemptResult> {
        let previous = self.store.load_review(user_id, item_id)?;
        let outcome = self.scheduler.record_outcome(item_id, previous.as_ref(), is_correct, now);
        self.store.save_review(user_id, &outcome.record)?;

        self.store
            .append_activity(user_id, &ActivityEvent::new(now, item_id, is_correct, session_type))?;
        self.store.prune_activity(user_id, now, &self.config.retention)?;

        let mut stats = touch_study_day(&self.stats_or_default(user_id)?, now.date_naive());
        if outcome.newly_learned {
            stats.total_items_learned = stats.total_items_learned.saturating_add(1);
        }
        self.store.save_stats(user_id, &stats)?;

        let goals = self.store.load_goals(user_id)?;
        if !goals.is_empty() {
            let metrics = self.analyzer.analyze(&self.recent_log(user_id)?, &stats);
            let updated = goals::update_all(&goals, &stats, &metrics, &GoalSignals::default());
            self.store.save_goals(user_id, &updated)?;
        }

        tracing::debug!(
            user_id,
            item_id,
            is_correct,
            interval = outcome.record.interval,
            newly_learned = outcome.newly_learned,
            "attempt recorded"
        );

        Ok(AttemptResult { outcome, stats })
    }

    pub fn due_items(&self, user_id: &str, now: DateTime<Utc>, limit: usize) -> StorageResult<Vec<ItemId>> {
        let records = self.store.reviews_for_user(user_id)?;
        Ok(self.scheduler.due_items(&records, now, limit))
    }

    pub fn performance(&self, user_id: &str) -> StorageResult<(PerformanceMetrics, f64)> {
        let stats = self.stats_or_default(user_id)?;
        let metrics = self.analyzer.analyze(&self.recent_log(user_id)?, &stats);
        let score = self.analyzer.performance_score(&metrics);
        Ok((metrics, score))
    }

    /// Session boundary: the coarse adjustment is applied to `UserStats`.
    pub fn complete_session(
        &self,
        user_id: &str,
        study_minutes: u32,
        signals: &GoalSignals,
    ) -> StorageResult<SessionReport> {
        let mut stats = self.stats_or_default(user_id)?;
        stats.total_study_time_minutes = stats.total_study_time_minutes.saturating_add(study_minutes);

        let metrics = self.analyzer.analyze(&self.recent_log(user_id)?, &stats);
        let score = self.analyzer.performance_score(&metrics);
        let adjustment = self.controller.suggest_with_score(&metrics, score);
        let stats = resolve_session_level(&stats, &adjustment);

        let mut scores = self.store.load_scores(user_id)?;
        scores.push(score);
        let overflow = scores.len().saturating_sub(self.config.trend.window_size);
        scores.drain(..overflow);
        self.store.save_scores(user_id, &scores)?;
        let trend = TrendTracker::from_scores(self.config.trend.clone(), scores.iter().copied()).current();

        let goals = self.store.load_goals(user_id)?;
        if !goals.is_empty() {
            self.store
                .save_goals(user_id, &goals::update_all(&goals, &stats, &metrics, signals))?;
        }
        self.store.save_stats(user_id, &stats)?;

        tracing::info!(
            user_id,
            score,
            adjustment = adjustment.adjustment_type.as_str(),
            level = %stats.current_level,
            trend = trend.as_str(),
            "session completed"
        );

        Ok(SessionReport {
            metrics,
            score,
            adjustment,
            trend,
            stats,
        })
    }

    /// Ranked next actions. The difficulty suggestion is read, not applied.
    pub fn recommendations(
        &self,
        user_id: &str,
        curriculum: &[LearningPath],
        progress: PathProgress,
        now: DateTime<Utc>,
        limit: Option<usize>,
    ) -> StorageResult<Vec<Recommendation>> {
        let stats = self.stats_or_default(user_id)?;
        let log = self.recent_log(user_id)?;
        let metrics = self.analyzer.analyze(&log, &stats);
        let adjustment = self.controller.suggest(&metrics);
        let usage = UsagePatterns::from_activity(&log, &stats, progress, &self.config.recommendation);
        let due = self.due_items(user_id, now, REVIEW_PAYLOAD_LIMIT)?;

        let ctx = RecommendationContext {
            stats: &stats,
            metrics: &metrics,
            adjustment: &adjustment,
            usage: &usage,
            curriculum,
            due_items: &due,
        };
        let limit = limit.unwrap_or(self.config.recommendation.default_limit);
        Ok(self.recommender.recommend_top(&ctx, limit))
    }

    /// In-session level from live signals. Never persisted.
    pub fn live_level(&self, user_id: &str, signals: &RealtimeSignals) -> StorageResult<Level> {
        let stats = self.stats_or_default(user_id)?;
        Ok(self.controller.realtime_level(signals, stats.current_level))
    }
}

/// Same day keeps the streak, the next day extends it, any gap restarts it.
pub fn touch_study_day(stats: &UserStats, today: NaiveDate) -> UserStats {
    let streak_days = match stats.last_study_date {
        Some(last) if last == today => stats.streak_days.max(1),
        Some(last) if last.succ_opt() == Some(today) => stats.streak_days.saturating_add(1),
        Some(last) if last > today => stats.streak_days.max(1),
        _ => 1,
    };
    let last_study_date = match stats.last_study_date {
        Some(last) if last > today => Some(last),
        _ => Some(today),
    };
    UserStats {
        streak_days,
        last_study_date,
        ..stats.clone()
    }
}
