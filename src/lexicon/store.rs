use std::{
    collections::{
        BTreeMap,
        BTreeSet,
        HashMap,
        HashSet,
    },
    fs::{
        self,
        File,
    },
    io::{
        BufReader,
        Read,
        Write,
    },
    path::Path,
    time::Instant,
};

use serde::{
    Deserialize,
    Serialize,
};

use super::{
    record::{
        CacheRecord,
        Field,
    },
    Category,
};
use crate::core::{
    Result,
    ZhquizError,
};

/// The only lookups the cache answers. Ordering of results is left to the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    ByKeySet(Vec<String>),
    ByKeySetExcluding { keys: Vec<String>, exclude: Vec<String> },
    /// Entry or any alternate form is in the set.
    ByAltSet(Vec<String>),
    ContainsSubstring(String),
    ByLevelRange { min: u32, max: u32 },
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UpsertReport {
    pub inserted: usize,
    pub merged: usize,
    pub rejected: usize,
}

#[derive(Serialize, Deserialize)]
struct Snapshot<R> {
    category: Category,
    records: Vec<R>,
}

/// One category's cached records, keyed by entry, with alt-form and level indices.
#[derive(Debug)]
pub struct CacheStore<R: CacheRecord> {
    category: Category,
    records: HashMap<String, R>,
    alt_index: HashMap<String, BTreeSet<String>>,
    level_index: BTreeMap<u32, BTreeSet<String>>,
}

impl<R: CacheRecord> CacheStore<R> {
    pub fn new(category: Category) -> Self {
        Self {
            category,
            records: HashMap::new(),
            alt_index: HashMap::new(),
            level_index: BTreeMap::new(),
        }
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, entry: &str) -> Option<&R> {
        self.records.get(entry)
    }

    /// Inserts unseen entries and merges the rest field by field.
    /// An invalid record is dropped on its own; the rest of the batch still lands.
    pub fn upsert_many(&mut self, records: impl IntoIterator<Item = R>) -> UpsertReport {
        let mut report = UpsertReport::default();

        for record in records {
            if let Err(e) = record.validate(self.category) {
                log::warn!("Dropping record during upsert: {}", e);
                report.rejected += 1;
                continue;
            }

            let entry = record.entry().to_string();
            match self.records.remove(&entry) {
                Some(mut existing) => {
                    self.unindex(&existing);
                    existing.merge_from(record);
                    self.index(&existing);
                    self.records.insert(entry, existing);
                    report.merged += 1;
                }
                None => {
                    let record = record.normalized();
                    self.index(&record);
                    self.records.insert(entry, record);
                    report.inserted += 1;
                }
            }
        }

        log::debug!(
            "Upserted into {} cache: {} inserted, {} merged, {} rejected",
            self.category,
            report.inserted,
            report.merged,
            report.rejected
        );
        report
    }

    pub fn find(&self, predicate: &Predicate, require: &[Field]) -> Vec<R> {
        self.candidates(predicate)
            .into_iter()
            .filter(|record| require.iter().all(|field| record.has_field(*field)))
            .cloned()
            .collect()
    }

    /// Entry -> level for every record whose level lies in `min..=max`.
    pub fn levels_in_range(&self, min: u32, max: u32) -> BTreeMap<String, u32> {
        if min > max {
            return BTreeMap::new();
        }
        self.level_index
            .range(min..=max)
            .flat_map(|(level, entries)| entries.iter().map(move |entry| (entry.clone(), *level)))
            .collect()
    }

    pub fn reset(&mut self) {
        log::info!("Resetting {} cache ({} records)", self.category, self.records.len());
        self.records.clear();
        self.alt_index.clear();
        self.level_index.clear();
    }

    fn candidates(&self, predicate: &Predicate) -> Vec<&R> {
        match predicate {
            Predicate::ByKeySet(keys) => {
                let keys: HashSet<&String> = keys.iter().collect();
                keys.into_iter().filter_map(|key| self.records.get(key)).collect()
            }
            Predicate::ByKeySetExcluding { keys, exclude } => {
                let exclude: HashSet<&String> = exclude.iter().collect();
                let keys: HashSet<&String> = keys.iter().filter(|k| !exclude.contains(k)).collect();
                keys.into_iter().filter_map(|key| self.records.get(key)).collect()
            }
            Predicate::ByAltSet(keys) => {
                let mut entries: BTreeSet<&String> = BTreeSet::new();
                for key in keys {
                    if let Some((entry, _)) = self.records.get_key_value(key) {
                        entries.insert(entry);
                    }
                    if let Some(owners) = self.alt_index.get(key) {
                        entries.extend(owners.iter());
                    }
                }
                entries.into_iter().filter_map(|entry| self.records.get(entry)).collect()
            }
            Predicate::ContainsSubstring(query) => self
                .records
                .values()
                .filter(|record| {
                    record.entry().contains(query.as_str())
                        || record.alts().iter().any(|alt| alt.contains(query.as_str()))
                })
                .collect(),
            Predicate::ByLevelRange { min, max } => self
                .levels_in_range(*min, *max)
                .keys()
                .filter_map(|entry| self.records.get(entry))
                .collect(),
        }
    }

    fn index(&mut self, record: &R) {
        let entry = record.entry();
        for alt in record.alts() {
            self.alt_index.entry(alt.clone()).or_default().insert(entry.to_string());
        }
        if let Some(level) = record.level() {
            self.level_index.entry(level).or_default().insert(entry.to_string());
        }
    }

    fn unindex(&mut self, record: &R) {
        let entry = record.entry();
        for alt in record.alts() {
            if let Some(owners) = self.alt_index.get_mut(alt) {
                owners.remove(entry);
                if owners.is_empty() {
                    self.alt_index.remove(alt);
                }
            }
        }
        if let Some(level) = record.level() {
            if let Some(entries) = self.level_index.get_mut(&level) {
                entries.remove(entry);
                if entries.is_empty() {
                    self.level_index.remove(&level);
                }
            }
        }
    }

    pub fn save_snapshot(&self, path: &Path) -> Result<()> {
        let mut records: Vec<R> = self.records.values().cloned().collect();
        records.sort_by(|a, b| a.entry().cmp(b.entry()));
        let snapshot = Snapshot { category: self.category, records };

        let encoded = bincode::serde::encode_to_vec(&snapshot, bincode::config::standard())?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = File::create(path)?;
        file.write_all(&encoded)?;
        log::info!("Saved {} cache snapshot to {:?}", self.category, path);
        Ok(())
    }

    pub fn load_snapshot(category: Category, path: &Path) -> Result<Self> {
        let start = Instant::now();
        let mut reader = BufReader::new(File::open(path)?);
        let mut buffer = Vec::new();
        reader.read_to_end(&mut buffer)?;

        let (snapshot, _): (Snapshot<R>, usize) =
            bincode::serde::decode_from_slice(&buffer, bincode::config::standard())?;

        if snapshot.category != category {
            return Err(ZhquizError::Custom(format!(
                "Snapshot at {:?} holds {} records, expected {}",
                path, snapshot.category, category
            )));
        }

        let mut store = Self::new(category);
        let report = store.upsert_many(snapshot.records);
        log::info!(
            "Loaded {} cache snapshot in {:?}: {} records",
            category,
            start.elapsed(),
            report.inserted
        );
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexicon::record::{
        LexicalRecord,
        TokenRecord,
    };

    fn vocab(entry: &str, alt: &[&str], level: Option<u32>) -> LexicalRecord {
        LexicalRecord {
            entry: entry.to_string(),
            alt: alt.iter().map(|s| s.to_string()).collect(),
            level,
            ..Default::default()
        }
    }

    fn entries(records: &[LexicalRecord]) -> Vec<String> {
        let mut entries: Vec<String> = records.iter().map(|r| r.entry.clone()).collect();
        entries.sort();
        entries
    }

    #[test]
    fn test_upsert_inserts_then_merges() {
        let mut store = CacheStore::new(Category::Vocab);
        let report = store.upsert_many(vec![vocab("你好", &[], Some(1)), vocab("再见", &[], None)]);
        assert_eq!(report, UpsertReport { inserted: 2, merged: 0, rejected: 0 });

        let report = store.upsert_many(vec![LexicalRecord {
            english: vec!["hello".to_string()],
            ..LexicalRecord::new("你好")
        }]);
        assert_eq!(report, UpsertReport { inserted: 0, merged: 1, rejected: 0 });

        let merged = store.get("你好").unwrap();
        assert_eq!(merged.level, Some(1));
        assert_eq!(merged.english, vec!["hello".to_string()]);
    }

    #[test]
    fn test_invalid_record_does_not_abort_batch() {
        let mut store = CacheStore::new(Category::Token);
        let report = store.upsert_many(vec![
            TokenRecord::new("好"),
            TokenRecord::new("你好"),
            TokenRecord::new("字"),
        ]);
        assert_eq!(report.inserted, 2);
        assert_eq!(report.rejected, 1);
        assert!(store.get("你好").is_none());
    }

    #[test]
    fn test_predicates() {
        let mut store = CacheStore::new(Category::Vocab);
        store.upsert_many(vec![
            vocab("说话", &["說話"], Some(2)),
            vocab("你好", &[], Some(1)),
            vocab("再见", &["再見"], Some(5)),
        ]);

        let found = store.find(&Predicate::ByKeySet(vec!["你好".into(), "不在".into()]), &[]);
        assert_eq!(entries(&found), vec!["你好"]);

        let found = store.find(
            &Predicate::ByKeySetExcluding {
                keys: vec!["你好".into(), "再见".into()],
                exclude: vec!["你好".into()],
            },
            &[],
        );
        assert_eq!(entries(&found), vec!["再见"]);

        let found = store.find(&Predicate::ByAltSet(vec!["說話".into(), "你好".into()]), &[]);
        assert_eq!(entries(&found), vec!["你好", "说话"]);

        let found = store.find(&Predicate::ContainsSubstring("見".into()), &[]);
        assert_eq!(entries(&found), vec!["再见"]);

        let found = store.find(&Predicate::ByLevelRange { min: 1, max: 2 }, &[]);
        assert_eq!(entries(&found), vec!["你好", "说话"]);

        let found = store.find(&Predicate::ContainsSubstring("".into()), &[Field::Alt]);
        assert_eq!(entries(&found), vec!["再见", "说话"]);
    }

    #[test]
    fn test_indices_follow_merges() {
        let mut store = CacheStore::new(Category::Vocab);
        store.upsert_many(vec![vocab("说", &[], Some(1))]);
        store.upsert_many(vec![vocab("说", &["說"], Some(3))]);

        assert!(store.levels_in_range(1, 1).is_empty());
        assert_eq!(store.levels_in_range(1, 5).get("说"), Some(&3));
        assert_eq!(entries(&store.find(&Predicate::ByAltSet(vec!["說".into()]), &[])), vec!["说"]);
    }

    #[test]
    fn test_snapshot_round_trip() {
        let path = std::env::temp_dir()
            .join(format!("zhquiz-store-{}", uuid::Uuid::new_v4()))
            .join("vocab.bin");

        let mut store = CacheStore::new(Category::Vocab);
        store.upsert_many(vec![vocab("说话", &["說話"], Some(2)), vocab("你好", &[], None)]);
        store.save_snapshot(&path).unwrap();

        let loaded: CacheStore<LexicalRecord> =
            CacheStore::load_snapshot(Category::Vocab, &path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.get("说话"), store.get("说话"));
        assert_eq!(entries(&loaded.find(&Predicate::ByAltSet(vec!["說話".into()]), &[])), vec![
            "说话"
        ]);

        let wrong = CacheStore::<LexicalRecord>::load_snapshot(Category::Sentence, &path);
        assert!(wrong.is_err());

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut store = CacheStore::new(Category::Vocab);
        store.upsert_many(vec![vocab("你好", &["妳好"], Some(1))]);
        store.reset();
        assert!(store.is_empty());
        assert!(store.levels_in_range(1, 60).is_empty());
        assert!(store.find(&Predicate::ByAltSet(vec!["妳好".into()]), &[]).is_empty());
    }
}
