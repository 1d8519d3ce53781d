mod utils;

pub use utils::{relative_time, truncate};
