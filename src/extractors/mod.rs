//! Entity extractors, one per embedded-metadata dialect.

mod jsonld_extractor;
mod microdata_extractor;

pub use jsonld_extractor::{JsonLdExtractor, JSON_LD_TYPE};
pub use microdata_extractor::{MicrodataExtractor, CYCLE_SENTINEL, MICRODATA_ATTRIBUTES};
