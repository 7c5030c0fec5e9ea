pub mod clock;
pub mod errors;
pub mod utils;

pub use clock::{
    Clock,
    FixedClock,
    SystemClock,
};
pub use errors::{
    Result,
    ZhquizError,
};
