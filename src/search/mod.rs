//! Full-text search over the catalog.
//!
//! The inverted index is built from normalized [`SearchDocument`]s and
//! persisted as a versioned snapshot in the durable store; queries merge
//! an indexed pass with a direct substring scan and score the union.
//!
//! [`SearchDocument`]: crate::domain::search::SearchDocument

pub mod distance;
pub mod index;
pub mod query;
pub mod seed;
pub mod suggest;
pub mod text;
