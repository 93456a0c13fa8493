//! Entity model shared by all extractors.

use scraper::Html;
use serde_json::Value;
use url::Url;

use crate::mutation::MutationRecord;

/// A single structured-data record extracted from a document.
///
/// Microdata items are objects whose property values are ordered sequences
/// (repeated property names accumulate, never overwrite); JSON-LD entities
/// are whatever the script payload parsed to. Reserved keys: `@type`,
/// `@id`, and (JSON-LD only) `@context`.
pub type Entity = Value;

/// A source of entities embedded in a document.
pub trait EntityExtractor {
    /// Extracts every entity this dialect contributes, in document order.
    ///
    /// Idempotent; caching is the coordinator's job, not the extractor's.
    fn extract(&self, document: &Html) -> Vec<Entity>;

    /// Returns true if any record in the batch could affect the set of
    /// entities returned by [`extract`](Self::extract). Conservative:
    /// over-reporting costs a recompute, under-reporting serves stale data.
    fn entities_changed(&self, records: &[MutationRecord]) -> bool;
}

/// Returns the entity's fully qualified type identifier.
///
/// A string `@context` is treated as a base URL and the (first) `@type` is
/// resolved against it, so `{"@context": "https://schema.org", "@type":
/// "Product"}` yields `https://schema.org/Product`. Without a usable
/// context the bare type is returned; without a type, nothing.
pub fn entity_type(entity: &Entity) -> Option<String> {
    let raw = match entity.get("@type")? {
        Value::String(s) => s.clone(),
        Value::Array(types) => types.first()?.as_str()?.to_string(),
        _ => return None,
    };

    let Some(context) = entity.get("@context").and_then(Value::as_str) else {
        return Some(raw);
    };
    let Ok(context_url) = Url::parse(context) else {
        return Some(raw);
    };
    match context_url.join(&raw) {
        Ok(resolved) => Some(resolved.to_string()),
        Err(_) => Some(raw),
    }
}
