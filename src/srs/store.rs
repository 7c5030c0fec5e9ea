use std::{
    collections::{
        HashMap,
        HashSet,
    },
    sync::RwLock,
};

use async_trait::async_trait;
use chrono::{
    DateTime,
    Utc,
};

use super::types::{
    ReviewItem,
    ReviewKey,
};
use crate::{
    core::Result,
    lexicon::Category,
};

/// Conditions for listing one learner's review items. `None` fields don't constrain.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReviewFilter {
    pub category: Option<Category>,
    pub entries: Option<Vec<String>>,
    pub direction: Option<String>,
    /// `Some(true)`: only items with a next review set. `Some(false)`: only new items.
    pub scheduled: Option<bool>,
    pub due_before: Option<DateTime<Utc>>,
}

impl ReviewFilter {
    pub fn matches(&self, item: &ReviewItem) -> bool {
        if self.category.is_some_and(|category| category != item.category) {
            return false;
        }
        if let Some(entries) = &self.entries {
            if !entries.iter().any(|entry| *entry == item.entry) {
                return false;
            }
        }
        if let Some(direction) = &self.direction {
            if *direction != item.direction {
                return false;
            }
        }
        if let Some(scheduled) = self.scheduled {
            if scheduled != item.next_review.is_some() {
                return false;
            }
        }
        if let Some(cutoff) = self.due_before {
            if !item.next_review.is_some_and(|due| due <= cutoff) {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WriteOutcome {
    Committed(ReviewItem),
    /// Someone else wrote the item since it was read.
    Conflict,
}

/// Durable home of review state.
///
/// Writes are conditional: `expected_revision` is the revision the caller read
/// (`None` when it saw no item). A mismatch yields [`WriteOutcome::Conflict`]
/// and leaves the stored item alone.
#[async_trait]
pub trait ReviewStore: Send + Sync {
    async fn find_review_items(&self, learner: &str, filter: &ReviewFilter)
        -> Result<Vec<ReviewItem>>;

    async fn get_review_item(&self, key: &ReviewKey) -> Result<Option<ReviewItem>>;

    async fn upsert_review_item(
        &self,
        item: ReviewItem,
        expected_revision: Option<u64>,
    ) -> Result<WriteOutcome>;

    async fn delete_review_item(&self, key: &ReviewKey) -> Result<bool>;
}

#[derive(Debug, Default)]
pub struct InMemoryReviewStore {
    items: RwLock<HashMap<ReviewKey, ReviewItem>>,
}

impl InMemoryReviewStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ReviewStore for InMemoryReviewStore {
    async fn find_review_items(
        &self,
        learner: &str,
        filter: &ReviewFilter,
    ) -> Result<Vec<ReviewItem>> {
        let items = self.items.read().unwrap_or_else(|e| e.into_inner());
        let entries: Option<HashSet<&String>> =
            filter.entries.as_ref().map(|entries| entries.iter().collect());
        let rest = ReviewFilter { entries: None, ..filter.clone() };

        Ok(items
            .values()
            .filter(|item| item.learner == learner)
            .filter(|item| entries.as_ref().map_or(true, |set| set.contains(&item.entry)))
            .filter(|item| rest.matches(item))
            .cloned()
            .collect())
    }

    async fn get_review_item(&self, key: &ReviewKey) -> Result<Option<ReviewItem>> {
        Ok(self.items.read().unwrap_or_else(|e| e.into_inner()).get(key).cloned())
    }

    async fn upsert_review_item(
        &self,
        mut item: ReviewItem,
        expected_revision: Option<u64>,
    ) -> Result<WriteOutcome> {
        let key = item.key();
        let mut items = self.items.write().unwrap_or_else(|e| e.into_inner());
        let current = items.get(&key).map(|stored| stored.revision);

        if current != expected_revision {
            log::debug!(
                "Review write conflict on {}/{}: expected {:?}, found {:?}",
                key.learner,
                key.entry,
                expected_revision,
                current
            );
            return Ok(WriteOutcome::Conflict);
        }

        item.revision = current.map_or(1, |revision| revision + 1);
        items.insert(key, item.clone());
        Ok(WriteOutcome::Committed(item))
    }

    async fn delete_review_item(&self, key: &ReviewKey) -> Result<bool> {
        Ok(self.items.write().unwrap_or_else(|e| e.into_inner()).remove(key).is_some())
    }
}
