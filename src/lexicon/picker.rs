use std::{
    collections::{
        BTreeMap,
        HashSet,
    },
    ops::RangeInclusive,
    sync::Mutex,
};

use super::{
    record::CacheRecord,
    store::CacheStore,
};
use crate::{
    core::Result,
    srs::store::{
        ReviewFilter,
        ReviewStore,
    },
};

/// Uniform draw over `[0, n)`. Every `rand::Rng` is one; seed a `StdRng` for repeatable picks.
pub trait RandomSource {
    fn below(&mut self, n: usize) -> usize;
}

impl<R: rand::Rng + ?Sized> RandomSource for R {
    fn below(&mut self, n: usize) -> usize {
        self.random_range(0..n)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pick {
    pub entry: String,
    pub level: u32,
}

/// Partial Fisher-Yates: `count` items without replacement, or all of them if fewer.
pub fn draw_without_replacement<T, G: RandomSource + ?Sized>(
    mut pool: Vec<T>,
    count: usize,
    rng: &mut G,
) -> Vec<T> {
    let take = count.min(pool.len());
    for i in 0..take {
        let j = i + rng.below(pool.len() - i);
        pool.swap(i, j);
    }
    pool.truncate(take);
    pool
}

/// Picks up to `count` leveled entries the learner is not already reviewing.
pub async fn pick_random<R: CacheRecord, G: RandomSource + ?Sized>(
    store: &Mutex<CacheStore<R>>,
    reviews: &dyn ReviewStore,
    learner: &str,
    levels: RangeInclusive<u32>,
    count: usize,
    rng: &mut G,
) -> Result<Vec<Pick>> {
    let (category, pool): (_, BTreeMap<String, u32>) = {
        let store = store.lock().unwrap_or_else(|e| e.into_inner());
        (store.category(), store.levels_in_range(*levels.start(), *levels.end()))
    };

    if pool.is_empty() || count == 0 {
        return Ok(Vec::new());
    }

    let filter = ReviewFilter {
        category: Some(category),
        entries: Some(pool.keys().cloned().collect()),
        scheduled: Some(true),
        ..Default::default()
    };
    let scheduled: HashSet<String> = reviews
        .find_review_items(learner, &filter)
        .await?
        .into_iter()
        .map(|item| item.entry)
        .collect();

    let eligible: Vec<Pick> = pool
        .into_iter()
        .filter(|(entry, _)| !scheduled.contains(entry))
        .map(|(entry, level)| Pick { entry, level })
        .collect();

    log::debug!(
        "Random pick for {} in {} levels {:?}: {} eligible, {} excluded as scheduled",
        learner,
        category,
        levels,
        eligible.len(),
        scheduled.len()
    );

    Ok(draw_without_replacement(eligible, count, rng))
}

#[cfg(test)]
mod tests {
    use rand::{
        rngs::StdRng,
        SeedableRng,
    };

    use super::*;
    use crate::{
        lexicon::{
            record::LexicalRecord,
            Category,
        },
        srs::{
            store::InMemoryReviewStore,
            types::{
                ReviewItem,
                ReviewKey,
            },
        },
    };

    fn leveled_store(entries: &[(&str, Option<u32>)]) -> Mutex<CacheStore<LexicalRecord>> {
        let mut store = CacheStore::new(Category::Vocab);
        store.upsert_many(
            entries
                .iter()
                .map(|(entry, level)| LexicalRecord { level: *level, ..LexicalRecord::new(*entry) }),
        );
        Mutex::new(store)
    }

    async fn schedule(reviews: &InMemoryReviewStore, entry: &str, due: bool) {
        let mut item = ReviewItem::new(ReviewKey::new("learner", entry, Category::Vocab, "se"));
        if due {
            item.next_review = Some(chrono::Utc::now());
        }
        reviews.upsert_review_item(item, None).await.unwrap();
    }

    #[test]
    fn test_draw_without_replacement_is_distinct() {
        let mut rng = StdRng::seed_from_u64(7);
        let drawn = draw_without_replacement((0..20).collect::<Vec<_>>(), 5, &mut rng);
        assert_eq!(drawn.len(), 5);
        let distinct: HashSet<_> = drawn.iter().collect();
        assert_eq!(distinct.len(), 5);

        let drawn = draw_without_replacement(vec![1, 2, 3], 10, &mut rng);
        assert_eq!(drawn.len(), 3);
    }

    #[tokio::test]
    async fn test_pick_excludes_scheduled_items() {
        let store = leveled_store(&[
            ("一", Some(1)),
            ("二", Some(1)),
            ("三", Some(2)),
            ("四", Some(3)),
            ("五", None),
        ]);
        let reviews = InMemoryReviewStore::new();
        schedule(&reviews, "一", true).await;
        schedule(&reviews, "二", false).await;

        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let picks =
                pick_random(&store, &reviews, "learner", 1..=2, 10, &mut rng).await.unwrap();
            let entries: HashSet<&str> = picks.iter().map(|p| p.entry.as_str()).collect();
            assert_eq!(entries, HashSet::from(["二", "三"]));
        }
    }

    #[tokio::test]
    async fn test_pick_other_learner_schedule_is_ignored() {
        let store = leveled_store(&[("一", Some(1))]);
        let reviews = InMemoryReviewStore::new();
        let mut item = ReviewItem::new(ReviewKey::new("someone-else", "一", Category::Vocab, "se"));
        item.next_review = Some(chrono::Utc::now());
        reviews.upsert_review_item(item, None).await.unwrap();

        let mut rng = StdRng::seed_from_u64(1);
        let picks = pick_random(&store, &reviews, "learner", 1..=1, 1, &mut rng).await.unwrap();
        assert_eq!(picks, vec![Pick { entry: "一".to_string(), level: 1 }]);
    }

    #[tokio::test]
    async fn test_empty_pool_is_not_an_error() {
        let store = leveled_store(&[("五", None)]);
        let reviews = InMemoryReviewStore::new();
        let mut rng = StdRng::seed_from_u64(3);
        let picks = pick_random(&store, &reviews, "learner", 1..=60, 5, &mut rng).await.unwrap();
        assert!(picks.is_empty());
    }
}
