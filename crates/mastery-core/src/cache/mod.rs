//! Query cache
//!
//! A key-addressed, multi-collection store with request de-duplication,
//! last-key-version-wins writes and atomic enrollment patches.

mod key;
mod store;
mod value;

pub use key::QueryKey;
pub use store::{CacheSnapshot, EnrollmentPatch, QueryCache, QueryState};
pub use value::{CacheValue, Cacheable};
