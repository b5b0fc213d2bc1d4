//! Process-level utilities: worker pool, timing, index arithmetic

pub mod multi_index;
pub mod thread_pool;
pub mod timing;

pub use multi_index::{MultiIndex, SubIndex};
pub use thread_pool::ThreadPool;
