pub mod machine;
pub mod scheduler;
pub mod store;
pub mod types;

pub use scheduler::{
    Scheduler,
    StudyQuery,
};
pub use store::{
    InMemoryReviewStore,
    ReviewFilter,
    ReviewStore,
    WriteOutcome,
};
pub use types::{
    Outcome,
    ReviewItem,
    ReviewKey,
    Stage,
    Stat,
    Streak,
};
