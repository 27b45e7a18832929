pub mod executor;
pub mod pool;
pub mod queries;

pub use executor::SqlExecutor;
pub use pool::create_pool;
pub use queries::*;
