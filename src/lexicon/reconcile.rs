use std::{
    ops::RangeInclusive,
    path::Path,
    sync::{
        Arc,
        Mutex,
        MutexGuard,
    },
    time::Instant,
};

use super::{
    picker::{
        self,
        Pick,
        RandomSource,
    },
    query::{
        self,
        KeyStrategy,
        QueryOptions,
    },
    record::{
        CacheRecord,
        Field,
        LexicalRecord,
        TokenRecord,
    },
    remote::{
        FetchRequest,
        RemoteSource,
    },
    store::{
        CacheStore,
        Predicate,
        UpsertReport,
    },
    Category,
};
use crate::{
    core::{
        utils::dedup_preserving_order,
        Result,
        ZhquizError,
    },
    persistence,
    settings::CacheConfig,
    srs::store::ReviewStore,
};

/// Local-first lookups for one category: answer from the cache, fetch only the gap,
/// merge it in, then answer again from the cache.
pub struct Reconciler<R: CacheRecord> {
    store: Mutex<CacheStore<R>>,
    remote: Arc<dyn RemoteSource>,
    default_limit: usize,
}

impl<R: CacheRecord> Reconciler<R> {
    pub fn new(category: Category, remote: Arc<dyn RemoteSource>, default_limit: usize) -> Self {
        Self::with_store(CacheStore::new(category), remote, default_limit)
    }

    pub fn with_store(
        store: CacheStore<R>,
        remote: Arc<dyn RemoteSource>,
        default_limit: usize,
    ) -> Self {
        Self { store: Mutex::new(store), remote, default_limit }
    }

    fn lock(&self) -> MutexGuard<'_, CacheStore<R>> {
        self.store.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn category(&self) -> Category {
        self.lock().category()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, entry: &str) -> Option<R> {
        self.lock().get(entry).cloned()
    }

    /// Resolves `keys` against the cache, fetching only what it lacks.
    ///
    /// Keys the remote has nothing for are cached as bare placeholders so they are
    /// not fetched again. If the fetch fails the cache is left exactly as it was.
    pub async fn lookup(
        &self,
        keys: &[String],
        fields: &[Field],
        strategy: KeyStrategy,
        options: &QueryOptions,
    ) -> Result<Vec<R>> {
        let requested = dedup_preserving_order(keys.iter().cloned());
        let predicate = strategy.predicate(&requested);

        let (category, known) = {
            let store = self.lock();
            let known = answered_keys(&requested, &store.find(&predicate, &[]), strategy);
            (store.category(), known)
        };

        let missing: Vec<String> =
            requested.iter().filter(|key| !known.contains(*key)).cloned().collect();
        if missing.is_empty() {
            log::debug!("{} lookup served from cache ({} keys)", category, requested.len());
            return Ok(self.query_local(&predicate, options));
        }

        let start = Instant::now();
        let request = FetchRequest {
            category,
            entries: missing.clone(),
            exclude: known,
            select: fields.to_vec(),
        };
        let raw = self.remote.fetch(&request).await?;
        let received = raw.len();

        let fetched = decode_records::<R>(category, raw);
        let answered = answered_keys(&missing, &fetched, strategy);
        let placeholders: Vec<R> = missing
            .iter()
            .filter(|key| !answered.contains(*key))
            .map(|key| R::placeholder(key))
            .collect();
        let found = missing.len() - placeholders.len();

        // Merge and re-query under one lock so nobody sees a half-merged cache.
        let (report, results) = {
            let mut store = self.lock();
            let report = store.upsert_many(fetched.into_iter().chain(placeholders));
            (report, store.find(&predicate, &options.require))
        };

        log::info!(
            "{} lookup fetched {} of {} missing keys ({} received, {} inserted, {} merged, {} rejected, {:.2}s)",
            category,
            found,
            missing.len(),
            received,
            report.inserted,
            report.merged,
            report.rejected,
            start.elapsed().as_secs_f32()
        );

        Ok(query::order_and_limit(results, options.limit, self.default_limit))
    }

    /// Substring search over entries and alternate forms. Local only.
    pub fn search(&self, text: &str, options: &QueryOptions) -> Vec<R> {
        self.query_local(&query::contains(text), options)
    }

    pub fn upsert_local(&self, records: Vec<R>) -> UpsertReport {
        self.lock().upsert_many(records)
    }

    pub async fn pick_random<G: RandomSource + ?Sized>(
        &self,
        reviews: &dyn ReviewStore,
        learner: &str,
        levels: RangeInclusive<u32>,
        count: usize,
        rng: &mut G,
    ) -> Result<Vec<Pick>> {
        picker::pick_random(&self.store, reviews, learner, levels, count, rng).await
    }

    pub fn reset(&self) {
        self.lock().reset();
    }

    pub fn save_snapshot(&self, path: &Path) -> Result<()> {
        self.lock().save_snapshot(path)
    }

    fn query_local(&self, predicate: &Predicate, options: &QueryOptions) -> Vec<R> {
        let results = self.lock().find(predicate, &options.require);
        query::order_and_limit(results, options.limit, self.default_limit)
    }
}

/// The requested keys, in request order, that some record answers under `strategy`.
fn answered_keys<R: CacheRecord>(
    keys: &[String],
    records: &[R],
    strategy: KeyStrategy,
) -> Vec<String> {
    keys.iter()
        .filter(|key| records.iter().any(|record| strategy.satisfies(record, key)))
        .cloned()
        .collect()
}

fn decode_records<R: CacheRecord>(category: Category, raw: Vec<serde_json::Value>) -> Vec<R> {
    raw.into_iter()
        .filter_map(|value| match serde_json::from_value::<R>(value) {
            Ok(record) => match record.validate(category) {
                Ok(()) => Some(record),
                Err(e) => {
                    log::warn!("Dropping remote record: {}", e);
                    None
                }
            },
            Err(e) => {
                log::warn!("Dropping malformed remote {} record: {}", category, e);
                None
            }
        })
        .collect()
}

/// One batch lookup against a lexical (non-token) category.
#[derive(Debug, Clone)]
pub struct LexicalRequest {
    pub category: Category,
    pub keys: Vec<String>,
    pub fields: Vec<Field>,
    pub strategy: KeyStrategy,
    pub options: QueryOptions,
}

/// The cache for every category, sharing one remote source.
pub struct Lexicon {
    pub tokens: Reconciler<TokenRecord>,
    pub vocab: Reconciler<LexicalRecord>,
    pub sentences: Reconciler<LexicalRecord>,
    pub extras: Reconciler<LexicalRecord>,
}

impl Lexicon {
    pub fn new(remote: Arc<dyn RemoteSource>, config: &CacheConfig) -> Self {
        let limit = config.default_limit;
        Self {
            tokens: Reconciler::new(Category::Token, remote.clone(), limit),
            vocab: Reconciler::new(Category::Vocab, remote.clone(), limit),
            sentences: Reconciler::new(Category::Sentence, remote.clone(), limit),
            extras: Reconciler::new(Category::Extra, remote, limit),
        }
    }

    /// Restores saved snapshots where present. A missing or unreadable snapshot
    /// starts that category empty.
    pub fn open(remote: Arc<dyn RemoteSource>, config: &CacheConfig) -> Self {
        let limit = config.default_limit;
        Self {
            tokens: Reconciler::with_store(load_or_empty(config, Category::Token), remote.clone(), limit),
            vocab: Reconciler::with_store(load_or_empty(config, Category::Vocab), remote.clone(), limit),
            sentences: Reconciler::with_store(
                load_or_empty(config, Category::Sentence),
                remote.clone(),
                limit,
            ),
            extras: Reconciler::with_store(load_or_empty(config, Category::Extra), remote, limit),
        }
    }

    pub fn save(&self, config: &CacheConfig) -> Result<()> {
        self.tokens.save_snapshot(&persistence::snapshot_path(config, Category::Token))?;
        for category in Category::LEXICAL {
            if let Some(reconciler) = self.lexical(category) {
                reconciler.save_snapshot(&persistence::snapshot_path(config, category))?;
            }
        }
        Ok(())
    }

    pub fn lexical(&self, category: Category) -> Option<&Reconciler<LexicalRecord>> {
        match category {
            Category::Vocab => Some(&self.vocab),
            Category::Sentence => Some(&self.sentences),
            Category::Extra => Some(&self.extras),
            Category::Token => None,
        }
    }

    /// Runs several lexical lookups concurrently; each succeeds or fails on its own.
    pub async fn lookup_many(&self, requests: &[LexicalRequest]) -> Vec<Result<Vec<LexicalRecord>>> {
        let lookups = requests.iter().map(|request| async move {
            let reconciler = self.lexical(request.category).ok_or_else(|| {
                ZhquizError::Custom(format!("{} is not a lexical category", request.category))
            })?;
            reconciler
                .lookup(&request.keys, &request.fields, request.strategy, &request.options)
                .await
        });
        futures::future::join_all(lookups).await
    }

    /// Adds a user-authored entry without any remote lookup.
    pub fn add_extra(&self, record: LexicalRecord) -> Result<UpsertReport> {
        record.validate(Category::Extra)?;
        Ok(self.extras.upsert_local(vec![record]))
    }

    pub fn reset_all(&self) {
        self.tokens.reset();
        for category in Category::LEXICAL {
            if let Some(reconciler) = self.lexical(category) {
                reconciler.reset();
            }
        }
    }
}

fn load_or_empty<R: CacheRecord>(config: &CacheConfig, category: Category) -> CacheStore<R> {
    let path = persistence::snapshot_path(config, category);
    if !path.exists() {
        return CacheStore::new(category);
    }
    match CacheStore::load_snapshot(category, &path) {
        Ok(store) => store,
        Err(e) => {
            log::warn!("Failed to load {} snapshot, starting empty: {}", category, e);
            CacheStore::new(category)
        }
    }
}
