use std::fmt;

use serde::{
    Deserialize,
    Serialize,
};

pub mod picker;
pub mod query;
pub mod reconcile;
pub mod record;
pub mod remote;
pub mod store;

pub use picker::RandomSource;
pub use query::{
    KeyStrategy,
    Limit,
    QueryOptions,
};
pub use reconcile::{
    Lexicon,
    Reconciler,
};
pub use record::{
    CacheRecord,
    Field,
    LexicalRecord,
    TokenRecord,
};
pub use remote::{
    HttpRemoteSource,
    RemoteSource,
};
pub use store::{
    CacheStore,
    Predicate,
    UpsertReport,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Token,
    Vocab,
    Sentence,
    Extra,
}

impl Category {
    pub const LEXICAL: [Category; 3] = [Category::Vocab, Category::Sentence, Category::Extra];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Token => "token",
            Category::Vocab => "vocab",
            Category::Sentence => "sentence",
            Category::Extra => "extra",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
