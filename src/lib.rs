pub mod core;
pub mod lexicon;
pub mod persistence;
pub mod settings;
pub mod srs;

pub use crate::core::{
    Result,
    ZhquizError,
};
pub use lexicon::{
    Category,
    Lexicon,
};
pub use settings::Settings;
pub use srs::Scheduler;
