use chrono::{
    DateTime,
    Utc,
};
use serde::{
    Deserialize,
    Serialize,
};
use uuid::Uuid;

use crate::lexicon::Category;

/// Identifies one review item: a learner studying one entry in one direction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReviewKey {
    pub learner: String,
    pub entry: String,
    pub category: Category,
    /// Card template, e.g. "se" (simplified -> english) or "ec".
    pub direction: String,
}

impl ReviewKey {
    pub fn new(
        learner: impl Into<String>,
        entry: impl Into<String>,
        category: Category,
        direction: impl Into<String>,
    ) -> Self {
        Self {
            learner: learner.into(),
            entry: entry.into(),
            category,
            direction: direction.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Streak {
    pub right: u32,
    pub wrong: u32,
    pub max_right: u32,
    pub max_wrong: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stat {
    pub streak: Streak,
    pub last_right: Option<DateTime<Utc>>,
    pub last_wrong: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewItem {
    pub id: Uuid,
    pub learner: String,
    pub entry: String,
    pub category: Category,
    pub direction: String,
    pub srs_level: u32,
    /// Absent until the first mark: the item is still "new".
    pub next_review: Option<DateTime<Utc>>,
    pub stat: Stat,
    /// Bumped by the store on every committed write.
    #[serde(default)]
    pub revision: u64,
}

impl ReviewItem {
    pub fn new(key: ReviewKey) -> Self {
        Self {
            id: Uuid::new_v4(),
            learner: key.learner,
            entry: key.entry,
            category: key.category,
            direction: key.direction,
            srs_level: 0,
            next_review: None,
            stat: Stat::default(),
            revision: 0,
        }
    }

    pub fn key(&self) -> ReviewKey {
        ReviewKey::new(&self.learner, &self.entry, self.category, &self.direction)
    }

    pub fn is_new(&self) -> bool {
        self.next_review.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Right,
    Wrong,
    Repeat,
}

/// Derived labels; an item can carry several at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    New,
    Leech,
    Learning,
    Graduated,
    Due,
}
