//! Vetrina: storefront edge cache and search.
//!
//! The crate layers a TTL-policy cache with stale-while-revalidate reads,
//! a durable fragment registry, popularity tracking and a two-pass
//! catalog search over a shared key/value store, fronted by a small HTTP
//! API.

pub mod application;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod domain;
pub mod infra;
pub mod search;
