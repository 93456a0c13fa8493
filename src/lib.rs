//! Structured-data extraction for rendered HTML documents.
//!
//! Scans a document for two embedded-metadata dialects and merges the
//! results into one ordered entity collection:
//! - Microdata (`itemscope`/`itemprop`/`itemtype`/`itemid`/`itemref`)
//! - JSON-LD (`<script type="application/ld+json">`)
//!
//! The [`ExtractionCoordinator`] keeps the collection incrementally
//! consistent: mutation batches forwarded from the host's document
//! observer invalidate only the extractors they can affect, and the next
//! extraction recomputes exactly those.

pub mod coordinator;
pub mod entity;
pub mod error;
pub mod extractors;
pub mod mutation;

pub use coordinator::ExtractionCoordinator;
pub use entity::{entity_type, Entity, EntityExtractor};
pub use error::{ExtractError, Result};
pub use extractors::{
    JsonLdExtractor, MicrodataExtractor, CYCLE_SENTINEL, JSON_LD_TYPE, MICRODATA_ATTRIBUTES,
};
pub use mutation::{parse_batch, ElementSummary, MutationRecord, NodeSummary, ObserveOptions};
