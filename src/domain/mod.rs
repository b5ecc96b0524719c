pub mod error;
pub mod fragment;
pub mod product;
pub mod search;
