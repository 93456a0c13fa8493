//! JSON-LD extraction from `<script type="application/ld+json">` tags.
//!
//! Script payloads are taken as already structured: a top-level array
//! contributes each element as a standalone entity, anything else is one
//! entity. Malformed payloads are skipped without affecting the rest of
//! the document.

use scraper::{Html, Selector};
use serde_json::Value;
use tracing::debug;

use crate::entity::{Entity, EntityExtractor};
use crate::mutation::{ElementSummary, MutationRecord, NodeSummary};

/// The media type that marks a script element as JSON-LD.
pub const JSON_LD_TYPE: &str = "application/ld+json";

/// Extracts JSON-LD entities from a parsed document.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonLdExtractor;

impl JsonLdExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl EntityExtractor for JsonLdExtractor {
    fn extract(&self, document: &Html) -> Vec<Entity> {
        let selector = match Selector::parse(r#"script[type="application/ld+json"]"#) {
            Ok(selector) => selector,
            Err(_) => return Vec::new(),
        };

        let mut entities = Vec::new();
        for script in document.select(&selector) {
            let payload: String = script.text().collect();
            let trimmed = payload.trim();
            if trimmed.is_empty() {
                continue;
            }

            match serde_json::from_str::<Value>(trimmed) {
                Ok(Value::Array(items)) => entities.extend(items),
                Ok(value) => entities.push(value),
                Err(error) => {
                    debug!(%error, "skipping malformed JSON-LD script");
                }
            }
        }
        entities
    }

    fn entities_changed(&self, records: &[MutationRecord]) -> bool {
        records.iter().any(record_related)
    }
}

fn record_related(record: &MutationRecord) -> bool {
    match record {
        MutationRecord::ChildList {
            added_nodes,
            removed_nodes,
            ..
        } => added_nodes
            .iter()
            .chain(removed_nodes.iter())
            .any(node_related),
        MutationRecord::Attributes {
            target,
            attribute_name,
            old_value,
        } => {
            // Only a change of the type attribute to or from the JSON-LD
            // media type can alter what this extractor returns.
            target
                .element
                .as_ref()
                .is_some_and(|element| element.is_tag("script"))
                && attribute_name == "type"
                && (node_related(target) || old_value.as_deref() == Some(JSON_LD_TYPE))
        }
        MutationRecord::CharacterData { target } => {
            target.nearest_element().is_some_and(is_json_ld_script)
        }
    }
}

/// A node is JSON-LD-related when it is, or sits inside, a JSON-LD script.
fn node_related(node: &NodeSummary) -> bool {
    node.self_and_ancestors().any(is_json_ld_script)
}

fn is_json_ld_script(element: &ElementSummary) -> bool {
    element.is_tag("script") && element.attr("type") == Some(JSON_LD_TYPE)
}
