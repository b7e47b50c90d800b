use serde_json::json;

use crate::config::RecommendationParams;
use crate::types::{
    AdjustmentType, DifficultyAdjustment, ItemId, LearningPath, PathModule, PerformanceMetrics, Recommendation,
    RecommendationType, UserStats,
};
use crate::usage::UsagePatterns;

/// Everything one `recommend` call reads. Borrowed, never retained.
pub struct RecommendationContext<'a> {
    pub stats: &'a UserStats,
    pub metrics: &'a PerformanceMetrics,
    pub adjustment: &'a DifficultyAdjustment,
    pub usage: &'a UsagePatterns,
    pub curriculum: &'a [LearningPath],
    pub due_items: &'a [ItemId],
}

pub struct RecommendationEngine {
    params: RecommendationParams,
}

impl RecommendationEngine {
    pub fn new(params: RecommendationParams) -> Self {
        Self { params }
    }

    /// Full ranked list, highest `confidence * estimated_benefit` first.
    /// Equal scores keep generation order.
    pub fn recommend(&self, ctx: &RecommendationContext<'_>) -> Vec<Recommendation> {
        let mut out = Vec::new();

        if let Some(rec) = self.difficulty_candidate(ctx.adjustment) {
            out.push(rec);
        }
        if let Some(path) = self.matching_path(ctx) {
            out.push(self.path_candidate(ctx, path));
            if let Some(module) = next_module(ctx, path) {
                out.push(self.module_candidate(path, module));
            }
        }
        if let Some(rec) = self.activity_candidate(ctx.usage) {
            out.push(rec);
        }
        if let Some(rec) = self.review_candidate(ctx) {
            out.push(rec);
        }
        if let Some(rec) = self.schedule_candidate(ctx.usage) {
            out.push(rec);
        }

        out.sort_by(|a, b| b.score().total_cmp(&a.score()));
        tracing::debug!(
            level = %ctx.stats.current_level,
            candidates = out.len(),
            "recommendations ranked"
        );
        out
    }

    pub fn recommend_top(&self, ctx: &RecommendationContext<'_>, limit: usize) -> Vec<Recommendation> {
        let mut ranked = self.recommend(ctx);
        ranked.truncate(limit);
        ranked
    }

    fn difficulty_candidate(&self, adjustment: &DifficultyAdjustment) -> Option<Recommendation> {
        let title = match adjustment.adjustment_type {
            AdjustmentType::Increase => "Take on a harder challenge",
            AdjustmentType::Decrease => "Reinforce the basics",
            AdjustmentType::Maintain => return None,
        };
        Some(Recommendation {
            kind: RecommendationType::Activity,
            title: title.to_string(),
            reason: adjustment.reason.clone(),
            confidence: adjustment.confidence,
            estimated_benefit: self.params.adjustment_benefit,
            payload: json!({
                "adjustmentType": adjustment.adjustment_type.as_str(),
                "targetLevel": adjustment.new_level.get(),
            }),
        })
    }

    /// Incomplete paths at the learner's tier; unlocked ones first, then the
    /// one furthest along, then curriculum order.
    fn matching_path<'c>(&self, ctx: &RecommendationContext<'c>) -> Option<&'c LearningPath> {
        let progress = &ctx.usage.progress;
        let unlocked = |path: &LearningPath| {
            path.prerequisites.iter().all(|req| {
                ctx.curriculum
                    .iter()
                    .find(|p| &p.id == req)
                    .map_or(true, |p| progress.is_complete(p))
            })
        };

        let mut best: Option<(&LearningPath, bool, f64)> = None;
        for path in ctx.curriculum {
            if path.tier != ctx.usage.difficulty_preference || progress.is_complete(path) {
                continue;
            }
            let candidate = (path, unlocked(path), progress.percent(&path.id));
            best = match best {
                None => Some(candidate),
                Some(current) if (candidate.1, candidate.2) > (current.1, current.2) => Some(candidate),
                keep => keep,
            };
        }
        best.map(|(path, _, _)| path)
    }

    fn path_candidate(&self, ctx: &RecommendationContext<'_>, path: &LearningPath) -> Recommendation {
        let percent = ctx.usage.progress.percent(&path.id);
        let reason = if percent > 0.0 {
            format!("{percent:.0}% complete and matched to your {} level", ctx.usage.difficulty_preference.as_str())
        } else {
            format!("Matched to your {} level", ctx.usage.difficulty_preference.as_str())
        };
        Recommendation {
            kind: RecommendationType::Path,
            title: format!("Continue \"{}\"", path.title),
            reason,
            confidence: self.params.path_confidence,
            estimated_benefit: self.params.path_benefit,
            payload: json!({ "pathId": path.id, "progress": percent }),
        }
    }

    fn module_candidate(&self, path: &LearningPath, module: &PathModule) -> Recommendation {
        Recommendation {
            kind: RecommendationType::Module,
            title: format!("Start \"{}\"", module.title),
            reason: format!("Next unlocked module in \"{}\"", path.title),
            confidence: self.params.module_confidence,
            estimated_benefit: self.params.module_benefit,
            payload: json!({ "pathId": path.id, "moduleId": module.id }),
        }
    }

    fn activity_candidate(&self, usage: &UsagePatterns) -> Option<Recommendation> {
        let top = usage.dominant_activity()?;
        if top.share <= self.params.activity_share_threshold {
            return None;
        }
        Some(Recommendation {
            kind: RecommendationType::Activity,
            title: format!("Continue with {}", top.session_type),
            reason: format!("{:.0}% of your recent practice", top.share * 100.0),
            confidence: self.params.activity_confidence,
            estimated_benefit: self.params.activity_benefit,
            payload: json!({ "sessionType": top.session_type, "share": top.share }),
        })
    }

    fn review_candidate(&self, ctx: &RecommendationContext<'_>) -> Option<Recommendation> {
        if ctx.metrics.accuracy >= self.params.review_accuracy_threshold {
            return None;
        }
        Some(Recommendation {
            kind: RecommendationType::Review,
            title: "Review to improve accuracy".to_string(),
            reason: format!("Recent accuracy is {:.0}%", ctx.metrics.accuracy * 100.0),
            confidence: self.params.review_confidence,
            estimated_benefit: self.params.review_benefit,
            payload: json!({ "focus": "accuracy", "itemIds": ctx.due_items }),
        })
    }

    fn schedule_candidate(&self, usage: &UsagePatterns) -> Option<Recommendation> {
        let slot = usage.preferred_time_of_day?;
        Some(Recommendation {
            kind: RecommendationType::Activity,
            title: format!("Plan your next session for the {}", slot.as_str()),
            reason: format!("You practice most in the {}", slot.as_str()),
            confidence: self.params.schedule_confidence,
            estimated_benefit: self.params.schedule_benefit,
            payload: json!({ "timeOfDay": slot.as_str() }),
        })
    }
}

impl Default for RecommendationEngine {
    fn default() -> Self {
        Self::new(RecommendationParams::default())
    }
}

fn next_module<'c>(ctx: &RecommendationContext<'c>, path: &'c LearningPath) -> Option<&'c PathModule> {
    let progress = &ctx.usage.progress;
    path.modules.iter().find(|m| {
        !progress.is_module_done(&m.id) && m.prerequisites.iter().all(|req| progress.is_module_done(req))
    })
}
