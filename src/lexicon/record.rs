use std::fmt::Debug;

use serde::{
    de::DeserializeOwned,
    Deserialize,
    Serialize,
};

use super::Category;
use crate::core::{
    utils::{
        dedup_preserving_order,
        is_single_grapheme,
        merge_unique,
    },
    Result,
    ZhquizError,
};

pub const MAX_LEVEL: u32 = 60;

/// Named fields, used both for remote field selection and for
/// "only records where this field is present" constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Alt,
    Reading,
    English,
    Frequency,
    Level,
    Priority,
    Tag,
    Description,
    Sub,
    Sup,
    Variants,
}

/// Behaviour shared by every record kind the cache holds.
///
/// `merge_from` must be field-wise: anything the incoming record leaves empty is kept.
pub trait CacheRecord: Clone + Debug + Serialize + DeserializeOwned + Send + Sync + 'static {
    fn entry(&self) -> &str;

    /// Alternate surface forms that resolve to this record under the `alt` strategy.
    fn alts(&self) -> &[String];

    fn frequency(&self) -> Option<f64>;

    fn level(&self) -> Option<u32>;

    fn has_field(&self, field: Field) -> bool;

    fn merge_from(&mut self, incoming: Self);

    /// Minimal record remembering that `entry` has no remote data.
    fn placeholder(entry: &str) -> Self;

    fn validate(&self, category: Category) -> Result<()>;

    /// Cleans up a record before it is stored, e.g. dropping duplicate list values.
    fn normalized(self) -> Self {
        self
    }

    fn matches_key_or_alt(&self, key: &str) -> bool {
        self.entry() == key || self.alts().iter().any(|alt| alt == key)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LexicalRecord {
    pub entry: String,
    #[serde(default)]
    pub alt: Vec<String>,
    #[serde(default)]
    pub reading: Vec<String>,
    #[serde(default, alias = "translation")]
    pub english: Vec<String>,
    #[serde(default)]
    pub frequency: Option<f64>,
    #[serde(default)]
    pub level: Option<u32>,
    #[serde(default)]
    pub priority: Option<f64>,
    #[serde(default)]
    pub tag: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl LexicalRecord {
    pub fn new(entry: impl Into<String>) -> Self {
        Self { entry: entry.into(), ..Default::default() }
    }
}

impl CacheRecord for LexicalRecord {
    fn entry(&self) -> &str {
        &self.entry
    }

    fn alts(&self) -> &[String] {
        &self.alt
    }

    fn frequency(&self) -> Option<f64> {
        self.frequency
    }

    fn level(&self) -> Option<u32> {
        self.level
    }

    fn has_field(&self, field: Field) -> bool {
        match field {
            Field::Alt => !self.alt.is_empty(),
            Field::Reading => !self.reading.is_empty(),
            Field::English => !self.english.is_empty(),
            Field::Frequency => self.frequency.is_some(),
            Field::Level => self.level.is_some(),
            Field::Priority => self.priority.is_some(),
            Field::Tag => !self.tag.is_empty(),
            Field::Description => self.description.is_some(),
            Field::Sub | Field::Sup | Field::Variants => false,
        }
    }

    fn merge_from(&mut self, incoming: Self) {
        merge_unique(&mut self.alt, &incoming.alt);
        merge_unique(&mut self.tag, &incoming.tag);
        replace_if_non_empty(&mut self.reading, incoming.reading);
        replace_if_non_empty(&mut self.english, incoming.english);
        replace_if_some(&mut self.frequency, incoming.frequency);
        replace_if_some(&mut self.level, incoming.level);
        replace_if_some(&mut self.priority, incoming.priority);
        replace_if_some(&mut self.description, incoming.description);
    }

    fn placeholder(entry: &str) -> Self {
        Self::new(entry)
    }

    fn normalized(mut self) -> Self {
        self.alt = dedup_preserving_order(self.alt);
        self.tag = dedup_preserving_order(self.tag);
        self
    }

    fn validate(&self, category: Category) -> Result<()> {
        validate_entry(category, &self.entry)?;
        validate_numbers(category, &self.entry, self.frequency, self.priority, self.level)
    }
}

/// A single-grapheme record with its component and variant relations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub entry: String,
    #[serde(default)]
    pub sub: Vec<String>,
    #[serde(default)]
    pub sup: Vec<String>,
    #[serde(default)]
    pub variants: Vec<String>,
    #[serde(default)]
    pub frequency: Option<f64>,
    #[serde(default)]
    pub level: Option<u32>,
    #[serde(default)]
    pub tag: Vec<String>,
}

impl TokenRecord {
    pub fn new(entry: impl Into<String>) -> Self {
        Self { entry: entry.into(), ..Default::default() }
    }
}

impl CacheRecord for TokenRecord {
    fn entry(&self) -> &str {
        &self.entry
    }

    fn alts(&self) -> &[String] {
        &self.variants
    }

    fn frequency(&self) -> Option<f64> {
        self.frequency
    }

    fn level(&self) -> Option<u32> {
        self.level
    }

    fn has_field(&self, field: Field) -> bool {
        match field {
            Field::Sub => !self.sub.is_empty(),
            Field::Sup => !self.sup.is_empty(),
            Field::Variants | Field::Alt => !self.variants.is_empty(),
            Field::Frequency => self.frequency.is_some(),
            Field::Level => self.level.is_some(),
            Field::Tag => !self.tag.is_empty(),
            _ => false,
        }
    }

    fn merge_from(&mut self, incoming: Self) {
        let incoming = incoming.normalized();
        merge_unique(&mut self.sub, &incoming.sub);
        merge_unique(&mut self.sup, &incoming.sup);
        merge_unique(&mut self.variants, &incoming.variants);
        merge_unique(&mut self.tag, &incoming.tag);
        replace_if_some(&mut self.frequency, incoming.frequency);
        replace_if_some(&mut self.level, incoming.level);
    }

    fn placeholder(entry: &str) -> Self {
        Self::new(entry)
    }

    fn normalized(mut self) -> Self {
        self.sub = dedup_preserving_order(self.sub);
        self.sup = dedup_preserving_order(self.sup);
        self.variants = dedup_preserving_order(self.variants);
        self.tag = dedup_preserving_order(self.tag);
        self
    }

    fn validate(&self, category: Category) -> Result<()> {
        validate_entry(category, &self.entry)?;
        if !is_single_grapheme(&self.entry) {
            return Err(invalid(category, &self.entry, "token entry must be a single grapheme"));
        }
        validate_numbers(category, &self.entry, self.frequency, None, self.level)
    }
}

fn replace_if_non_empty(target: &mut Vec<String>, incoming: Vec<String>) {
    if !incoming.is_empty() {
        *target = incoming;
    }
}

fn replace_if_some<T>(target: &mut Option<T>, incoming: Option<T>) {
    if incoming.is_some() {
        *target = incoming;
    }
}

fn invalid(category: Category, entry: &str, reason: &str) -> ZhquizError {
    ZhquizError::Validation { category, entry: entry.to_string(), reason: reason.to_string() }
}

fn validate_entry(category: Category, entry: &str) -> Result<()> {
    if entry.trim().is_empty() {
        return Err(invalid(category, entry, "entry is empty"));
    }
    Ok(())
}

fn validate_numbers(
    category: Category,
    entry: &str,
    frequency: Option<f64>,
    priority: Option<f64>,
    level: Option<u32>,
) -> Result<()> {
    if frequency.is_some_and(|f| !f.is_finite()) {
        return Err(invalid(category, entry, "frequency is not a finite number"));
    }
    if priority.is_some_and(|p| !p.is_finite()) {
        return Err(invalid(category, entry, "priority is not a finite number"));
    }
    if let Some(level) = level {
        if level == 0 || level > MAX_LEVEL {
            return Err(invalid(category, entry, &format!("level must be in 1..={}", MAX_LEVEL)));
        }
    }
    Ok(())
}
