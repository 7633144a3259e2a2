//! Fragment caching for rendered feed output.
//!
//! [`FragmentCache`] sits in front of any [`CacheBackend`]. The backend is
//! a plain key/value store with expiry; the fragment layer adds logical keys,
//! per-fragment invalidation and the rule that a failing backend only ever
//! causes a recompute.

mod backend;
mod fragment;
mod memory;

pub use backend::{CacheBackend, CacheError, DisabledCache};
pub use fragment::{FragmentCache, FragmentKey};
pub use memory::MemoryCache;
