//! Taxonomy cache for valid categories and languages

pub mod cache;

pub use cache::{TaxonomyCache, TaxonomySnapshot};
