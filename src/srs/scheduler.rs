use std::{
    cmp::Ordering,
    sync::Arc,
};

use super::{
    machine,
    store::{
        ReviewFilter,
        ReviewStore,
        WriteOutcome,
    },
    types::{
        Outcome,
        ReviewItem,
        ReviewKey,
        Stage,
    },
};
use crate::{
    core::{
        Clock,
        Result,
        ZhquizError,
    },
    lexicon::Category,
    settings::SrsConfig,
};

const MAX_WRITE_ATTEMPTS: usize = 8;

/// What a learner wants to study. An item qualifies when it carries any of `stages`;
/// an empty list admits every item.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StudyQuery {
    pub category: Option<Category>,
    pub direction: Option<String>,
    pub stages: Vec<Stage>,
}

pub struct Scheduler {
    store: Arc<dyn ReviewStore>,
    clock: Arc<dyn Clock>,
    config: SrsConfig,
}

impl Scheduler {
    pub fn new(
        store: Arc<dyn ReviewStore>,
        clock: Arc<dyn Clock>,
        config: SrsConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self { store, clock, config })
    }

    pub fn config(&self) -> &SrsConfig {
        &self.config
    }

    /// Puts an item on the learner's list as "new" unless it is already there.
    pub async fn schedule(&self, key: &ReviewKey) -> Result<ReviewItem> {
        self.update(key, |existing| Ok(existing.unwrap_or_else(|| ReviewItem::new(key.clone()))))
            .await
    }

    /// Records an answer, creating the item on its first mark.
    pub async fn mark(&self, key: &ReviewKey, outcome: Outcome) -> Result<ReviewItem> {
        let item = self
            .update(key, |existing| {
                let mut item = existing.unwrap_or_else(|| ReviewItem::new(key.clone()));
                machine::apply(&mut item, outcome, self.clock.now(), &self.config)?;
                Ok(item)
            })
            .await?;

        log::debug!(
            "Marked {} '{}' ({}) {:?} for {}: level {}, next review {:?}",
            item.category,
            item.entry,
            item.direction,
            outcome,
            item.learner,
            item.srs_level,
            item.next_review
        );
        Ok(item)
    }

    pub async fn unschedule(&self, key: &ReviewKey) -> Result<bool> {
        self.store.delete_review_item(key).await
    }

    pub async fn stages(&self, key: &ReviewKey) -> Result<Option<Vec<Stage>>> {
        let now = self.clock.now();
        Ok(self
            .store
            .get_review_item(key)
            .await?
            .map(|item| machine::stages(&item, now, &self.config)))
    }

    /// Items matching `query`, soonest review first and new items last.
    pub async fn study(&self, learner: &str, query: &StudyQuery) -> Result<Vec<ReviewItem>> {
        let filter = ReviewFilter {
            category: query.category,
            direction: query.direction.clone(),
            ..Default::default()
        };
        let now = self.clock.now();

        let mut items: Vec<ReviewItem> = self
            .store
            .find_review_items(learner, &filter)
            .await?
            .into_iter()
            .filter(|item| {
                query.stages.is_empty()
                    || query.stages.iter().any(|stage| machine::in_stage(item, *stage, now, &self.config))
            })
            .collect();

        items.sort_by(|a, b| {
            match (a.next_review, b.next_review) {
                (Some(da), Some(db)) => da.cmp(&db),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            }
            .then_with(|| a.entry.cmp(&b.entry))
        });
        Ok(items)
    }

    /// Items whose next review has passed.
    pub async fn due(&self, learner: &str, category: Option<Category>) -> Result<Vec<ReviewItem>> {
        self.study(learner, &StudyQuery { category, stages: vec![Stage::Due], ..Default::default() })
            .await
    }

    /// Read-modify-write with a revision check, retried on conflict.
    async fn update<F>(&self, key: &ReviewKey, transition: F) -> Result<ReviewItem>
    where
        F: Fn(Option<ReviewItem>) -> Result<ReviewItem> + Send + Sync,
    {
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let existing = self.store.get_review_item(key).await?;
            let expected = existing.as_ref().map(|item| item.revision);

            match self.store.upsert_review_item(transition(existing)?, expected).await? {
                WriteOutcome::Committed(item) => return Ok(item),
                WriteOutcome::Conflict => {
                    log::debug!(
                        "Conflict updating {}/{} (attempt {} of {}), retrying",
                        key.learner,
                        key.entry,
                        attempt,
                        MAX_WRITE_ATTEMPTS
                    );
                }
            }
        }

        Err(ZhquizError::Custom(format!(
            "Gave up updating review item '{}' for {} after {} conflicting writes",
            key.entry, key.learner, MAX_WRITE_ATTEMPTS
        )))
    }
}
