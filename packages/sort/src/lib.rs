//! Sidebar ordering for story index entries
//!
//! Titles are split into `/` path segments and compared depth-first. At the
//! first differing segment, explicit weights decide, then the (branch-scoped)
//! `order` list, then the configured method.

pub mod comparator;
pub mod error;
pub mod natural;
pub mod options;

pub use comparator::{compare, sort_entries, Sortable};
pub use error::{SortError, SortResult};
pub use natural::natural_compare;
pub use options::{OrderItem, SortMethod, StorySortOptions, WILDCARD};
