//! Review state transitions.
//!
//! State is only `(srs_level, next_review)`; stages are derived on demand.
//! A repeat leaves every streak counter and timestamp alone, it only
//! pulls the item back into the queue after the repeat delay.

use chrono::{
    DateTime,
    Duration,
    Utc,
};

use super::types::{
    Outcome,
    ReviewItem,
    Stage,
};
use crate::{
    core::{
        Result,
        ZhquizError,
    },
    settings::SrsConfig,
};

/// Applies one answer. On error the item is left exactly as it was.
pub fn apply(
    item: &mut ReviewItem,
    outcome: Outcome,
    now: DateTime<Utc>,
    config: &SrsConfig,
) -> Result<()> {
    match outcome {
        Outcome::Right => mark_right(item, now, config),
        Outcome::Wrong => mark_wrong(item, now, config),
        Outcome::Repeat => mark_repeat(item, now, config),
    }
}

fn next_review(item: &ReviewItem, now: DateTime<Utc>, delay: Duration) -> Result<DateTime<Utc>> {
    now.checked_add_signed(delay).ok_or_else(|| ZhquizError::ReviewOutOfRange(item.entry.clone()))
}

fn mark_right(item: &mut ReviewItem, now: DateTime<Utc>, config: &SrsConfig) -> Result<()> {
    let level = (item.srs_level + 1).min(config.max_level());
    let next = next_review(item, now, config.interval(level))?;

    let streak = &mut item.stat.streak;
    streak.right += 1;
    streak.wrong = 0;
    streak.max_right = streak.max_right.max(streak.right);
    item.stat.last_right = Some(now);

    item.srs_level = level;
    item.next_review = Some(next);
    Ok(())
}

fn mark_wrong(item: &mut ReviewItem, now: DateTime<Utc>, config: &SrsConfig) -> Result<()> {
    let next = next_review(item, now, config.repeat_delay())?;

    let streak = &mut item.stat.streak;
    streak.wrong += 1;
    streak.right = 0;
    streak.max_wrong = streak.max_wrong.max(streak.wrong);
    item.stat.last_wrong = Some(now);

    item.srs_level = item.srs_level.saturating_sub(1);
    item.next_review = Some(next);
    Ok(())
}

fn mark_repeat(item: &mut ReviewItem, now: DateTime<Utc>, config: &SrsConfig) -> Result<()> {
    item.next_review = Some(next_review(item, now, config.repeat_delay())?);
    Ok(())
}

pub fn in_stage(item: &ReviewItem, stage: Stage, now: DateTime<Utc>, config: &SrsConfig) -> bool {
    match stage {
        Stage::New => item.next_review.is_none(),
        Stage::Leech => item.stat.streak.wrong >= config.leech_threshold,
        Stage::Learning => item.srs_level < config.graduate_level,
        Stage::Graduated => item.srs_level >= config.graduate_level,
        Stage::Due => item.next_review.is_some_and(|due| due <= now),
    }
}

pub fn stages(item: &ReviewItem, now: DateTime<Utc>, config: &SrsConfig) -> Vec<Stage> {
    [Stage::New, Stage::Leech, Stage::Learning, Stage::Graduated, Stage::Due]
        .into_iter()
        .filter(|stage| in_stage(item, *stage, now, config))
        .collect()
}
