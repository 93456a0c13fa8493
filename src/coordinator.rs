//! Incremental extraction across all dialects.
//!
//! The coordinator owns one cache slot per extractor. A mutation batch
//! only clears the slots whose extractor reports the batch as relevant;
//! the next `extract` call recomputes exactly the cleared slots. The
//! reaction to a batch is an explicit state transition from (cache, batch)
//! to (new cache, changed flag) — nothing depends on callback timing.

use scraper::Html;
use tracing::trace;
use url::Url;

use crate::entity::{Entity, EntityExtractor};
use crate::error::{ExtractError, Result};
use crate::extractors::{JsonLdExtractor, MicrodataExtractor};
use crate::mutation::{MutationRecord, ObserveOptions};

/// Most recent results per extractor. The extractor set is closed, so a
/// fixed struct stands in for an identity-keyed map; `None` means
/// "recompute on the next extract call".
#[derive(Debug, Clone, Default)]
struct ExtractorCache {
    microdata: Option<Vec<Entity>>,
    json_ld: Option<Vec<Entity>>,
}

/// Merges entities from every extractor and keeps them incrementally
/// consistent as the document mutates.
pub struct ExtractionCoordinator {
    microdata: MicrodataExtractor,
    json_ld: JsonLdExtractor,
    cache: ExtractorCache,
    entities: Vec<Entity>,
    listeners: Vec<Box<dyn Fn()>>,
}

impl ExtractionCoordinator {
    /// Creates a coordinator and performs the initial extract + publish.
    pub fn new(document: &Html) -> Self {
        Self::with_microdata(MicrodataExtractor::new(), document)
    }

    /// Like [`new`](Self::new), resolving relative URLs in microdata
    /// values against the document URL.
    pub fn with_base(base: Url, document: &Html) -> Self {
        Self::with_microdata(MicrodataExtractor::with_base(base), document)
    }

    fn with_microdata(microdata: MicrodataExtractor, document: &Html) -> Self {
        let mut coordinator = Self {
            microdata,
            json_ld: JsonLdExtractor::new(),
            cache: ExtractorCache::default(),
            entities: Vec::new(),
            listeners: Vec::new(),
        };
        coordinator.republish(document);
        coordinator
    }

    /// The observer configuration the host must apply to its
    /// change-notification mechanism for incremental updates to be sound.
    pub fn observe_options() -> ObserveOptions {
        ObserveOptions::default()
    }

    /// Extracts the merged entity set, recomputing only the cache slots a
    /// mutation batch has cleared. Registration order first (microdata,
    /// then JSON-LD), document order within each extractor.
    pub fn extract(&mut self, document: &Html) -> Vec<Entity> {
        if self.cache.microdata.is_none() {
            self.cache.microdata = Some(self.microdata.extract(document));
        }
        if self.cache.json_ld.is_none() {
            self.cache.json_ld = Some(self.json_ld.extract(document));
        }

        let mut merged = Vec::new();
        if let Some(entities) = &self.cache.microdata {
            merged.extend(entities.iter().cloned());
        }
        if let Some(entities) = &self.cache.json_ld {
            merged.extend(entities.iter().cloned());
        }
        merged
    }

    /// Classifies a batch and clears the affected cache slots. Returns
    /// true when at least one slot was cleared. Every extractor's check
    /// runs so each slot invalidates independently.
    pub fn on_mutation_batch(&mut self, records: &[MutationRecord]) -> bool {
        let mut changed = false;
        if self.microdata.entities_changed(records) {
            trace!("microdata cache slot cleared");
            self.cache.microdata = None;
            changed = true;
        }
        if self.json_ld.entities_changed(records) {
            trace!("JSON-LD cache slot cleared");
            self.cache.json_ld = None;
            changed = true;
        }
        changed
    }

    /// Drives one delivered batch to completion: classify, and when
    /// anything was invalidated, re-extract, republish, and signal every
    /// listener. Returns true when the published set was refreshed.
    pub fn document_mutated(&mut self, document: &Html, records: &[MutationRecord]) -> bool {
        if !self.on_mutation_batch(records) {
            return false;
        }
        self.republish(document);
        true
    }

    /// The last-published merged entity sequence.
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// The published sequence as a JSON string, for host bridges.
    pub fn merged_json(&self) -> Result<String> {
        serde_json::to_string(&self.entities).map_err(ExtractError::Serialize)
    }

    /// Registers a change signal fired after every republish. The signal
    /// carries no payload; consumers re-read [`entities`](Self::entities).
    pub fn on_entities_changed(&mut self, listener: impl Fn() + 'static) {
        self.listeners.push(Box::new(listener));
    }

    fn republish(&mut self, document: &Html) {
        self.entities = self.extract(document);
        for listener in &self.listeners {
            listener();
        }
    }
}

impl std::fmt::Debug for ExtractionCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractionCoordinator")
            .field("microdata", &self.microdata)
            .field("json_ld", &self.json_ld)
            .field("cache", &self.cache)
            .field("entities", &self.entities.len())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
