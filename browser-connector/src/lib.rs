//! Native store connectors for the link intelligence engine
//!
//! The engine treats the browser's bookmark and history stores as opaque
//! services behind the [`BookmarkStore`] and [`HistoryStore`] traits. The
//! in-memory implementations here back standalone runs and double as test
//! stores for everything downstream.

pub mod traits;
pub mod memory;

pub use traits::*;
pub use memory::{MemoryBookmarkStore, MemoryHistoryStore};
