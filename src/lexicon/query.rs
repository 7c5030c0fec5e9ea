use std::cmp::Ordering;

use serde::{
    Deserialize,
    Serialize,
};

use super::{
    record::{
        CacheRecord,
        Field,
    },
    store::Predicate,
};

pub const DEFAULT_LIMIT: usize = 10;

/// How a batch of requested keys is matched against cached entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyStrategy {
    /// Entry key is one of the requested keys.
    Match,
    /// Entry key or one of its alternate forms is a requested key.
    Alt,
}

impl KeyStrategy {
    pub fn predicate(&self, keys: &[String]) -> Predicate {
        match self {
            KeyStrategy::Match => Predicate::ByKeySet(keys.to_vec()),
            KeyStrategy::Alt => Predicate::ByAltSet(keys.to_vec()),
        }
    }

    /// Whether `key` is answered by `record` under this strategy.
    pub fn satisfies<R: CacheRecord>(&self, record: &R, key: &str) -> bool {
        match self {
            KeyStrategy::Match => record.entry() == key,
            KeyStrategy::Alt => record.matches_key_or_alt(key),
        }
    }
}

/// Free-text substring search. Never goes through the remote batch flow.
pub fn contains(query: &str) -> Predicate {
    Predicate::ContainsSubstring(query.to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Limit {
    #[default]
    Default,
    Unlimited,
    Count(usize),
}

impl Limit {
    /// Maps a caller parameter: absent is the default page, any negative value is unlimited.
    pub fn from_param(param: Option<i64>) -> Self {
        match param {
            None => Limit::Default,
            Some(n) if n < 0 => Limit::Unlimited,
            Some(n) => Limit::Count(n as usize),
        }
    }

    pub fn resolve(&self, default_limit: usize) -> Option<usize> {
        match self {
            Limit::Default => Some(default_limit),
            Limit::Unlimited => None,
            Limit::Count(n) => Some(*n),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOptions {
    pub limit: Limit,
    /// Only records where every one of these fields is present.
    pub require: Vec<Field>,
}

impl QueryOptions {
    pub fn unlimited() -> Self {
        Self { limit: Limit::Unlimited, require: Vec::new() }
    }

    pub fn with_limit(mut self, limit: Limit) -> Self {
        self.limit = limit;
        self
    }

    pub fn requiring(mut self, field: Field) -> Self {
        self.require.push(field);
        self
    }
}

/// Descending frequency, records without a frequency last, then entry key ascending.
pub fn compare_records<R: CacheRecord>(a: &R, b: &R) -> Ordering {
    match (a.frequency(), b.frequency()) {
        (Some(fa), Some(fb)) => fb.total_cmp(&fa),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then_with(|| a.entry().cmp(b.entry()))
}

pub fn order_and_limit<R: CacheRecord>(
    mut records: Vec<R>,
    limit: Limit,
    default_limit: usize,
) -> Vec<R> {
    records.sort_by(compare_records);
    if let Some(n) = limit.resolve(default_limit) {
        records.truncate(n);
    }
    records
}
