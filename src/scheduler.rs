use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{SchedulerParams, MAX_INTERVAL_DAYS_LIMIT};
use crate::types::{ItemId, ReviewRecord};

const MAX_QUALITY: u8 = 5;
const PASSING_QUALITY: u8 = 3;

/// Recall quality on the conventional 0..=5 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Quality(u8);

impl Quality {
    pub fn new(value: u8) -> Self {
        Self(value.min(MAX_QUALITY))
    }

    /// Binary outcomes only ever map to two points of the scale.
    pub fn from_correct(is_correct: bool, params: &SchedulerParams) -> Self {
        if is_correct {
            Self::new(params.correct_quality)
        } else {
            Self::new(params.incorrect_quality)
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    pub fn is_passing(self) -> bool {
        self.0 >= PASSING_QUALITY
    }

    fn ease_delta(self) -> f64 {
        let miss = (MAX_QUALITY - self.0) as f64;
        0.1 - miss * (0.08 + miss * 0.02)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewOutcome {
    pub record: ReviewRecord,
    /// First-ever correct answer for this item; the caller bumps
    /// `UserStats::total_items_learned`.
    pub newly_learned: bool,
    pub lapsed: bool,
}

pub struct ReviewScheduler {
    params: SchedulerParams,
}

impl ReviewScheduler {
    pub fn new(params: SchedulerParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &SchedulerParams {
        &self.params
    }

    pub fn record_outcome(
        &self,
        item_id: &str,
        record: Option<&ReviewRecord>,
        is_correct: bool,
        now: DateTime<Utc>,
    ) -> ReviewOutcome {
        match record {
            None => self.first_attempt(item_id, is_correct, now),
            Some(prev) => self.record_quality(prev, Quality::from_correct(is_correct, &self.params), now),
        }
    }

    pub fn record_quality(&self, prev: &ReviewRecord, quality: Quality, now: DateTime<Utc>) -> ReviewOutcome {
        let (repetitions, interval) = if quality.is_passing() {
            let repetitions = prev.repetitions.saturating_add(1);
            let interval = match repetitions {
                1 => 1,
                2 => 6,
                _ => self.grow_interval(prev.interval, prev.ease_factor),
            };
            (repetitions, interval)
        } else {
            (0, 0)
        };

        let ease_factor = (prev.ease_factor + quality.ease_delta()).max(self.params.min_ease_factor);
        let lapsed = !quality.is_passing();
        if lapsed {
            tracing::trace!(item_id = %prev.item_id, previous_interval = prev.interval, "review lapsed");
        }

        ReviewOutcome {
            record: ReviewRecord {
                item_id: prev.item_id.clone(),
                repetitions,
                interval,
                ease_factor,
                next_due: due_after(now, interval),
                last_studied: now,
                learned: prev.learned || quality.is_passing(),
            },
            newly_learned: !prev.learned && quality.is_passing(),
            lapsed,
        }
    }

    fn first_attempt(&self, item_id: &str, is_correct: bool, now: DateTime<Utc>) -> ReviewOutcome {
        let step = u32::from(is_correct);
        ReviewOutcome {
            record: ReviewRecord {
                item_id: item_id.to_string(),
                repetitions: step,
                interval: step,
                ease_factor: self.params.initial_ease_factor,
                next_due: due_after(now, step),
                last_studied: now,
                learned: is_correct,
            },
            newly_learned: is_correct,
            lapsed: false,
        }
    }

    fn grow_interval(&self, interval: u32, ease_factor: f64) -> u32 {
        let cap = self.params.max_interval_days.clamp(1, MAX_INTERVAL_DAYS_LIMIT) as u32;
        let grown = (interval as f64 * ease_factor).round();
        // `as` saturates on overflow, then the policy cap applies.
        (grown as u32).max(1).min(cap)
    }

    /// Due item ids, most overdue first; ties go to the harder item (lower ease).
    pub fn due_items(&self, records: &[ReviewRecord], now: DateTime<Utc>, limit: usize) -> Vec<ItemId> {
        let mut due: Vec<&ReviewRecord> = records.iter().filter(|r| is_due(r, now)).collect();
        due.sort_by(|a, b| {
            a.next_due
                .cmp(&b.next_due)
                .then_with(|| a.ease_factor.total_cmp(&b.ease_factor))
        });
        due.into_iter().take(limit).map(|r| r.item_id.clone()).collect()
    }
}

impl Default for ReviewScheduler {
    fn default() -> Self {
        Self::new(SchedulerParams::default())
    }
}

pub fn is_due(record: &ReviewRecord, now: DateTime<Utc>) -> bool {
    now >= record.next_due
}

/// Saturates at the latest representable instant.
fn due_after(now: DateTime<Utc>, interval_days: u32) -> DateTime<Utc> {
    Duration::try_days(interval_days as i64)
        .and_then(|delta| now.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
