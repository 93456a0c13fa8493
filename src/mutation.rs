//! Document change notifications consumed from the host.
//!
//! The host DOM lives on the far side of a process or language boundary,
//! so mutation records carry serialized node summaries instead of live node
//! references: the affected node's own shape plus its element-ancestor
//! chain, nearest first. That is exactly the information the relevance
//! checks need — everything else about the document is re-read from the
//! parsed tree at extraction time.
//!
//! Field and tag names match the DOM `MutationRecord` (`childList`,
//! `addedNodes`, `attributeName`, `oldValue`, ...) so a host bridge can
//! forward its observer records as JSON unchanged.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{ExtractError, Result};

/// Serialized view of one element: tag name and attributes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementSummary {
    pub tag: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub attributes: HashMap<String, String>,
}

impl ElementSummary {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: HashMap::new(),
        }
    }

    /// Builder-style attribute for hosts and tests.
    #[must_use]
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    /// Tag comparison, case-insensitive: hosts deliver `tagName` uppercase.
    pub fn is_tag(&self, tag: &str) -> bool {
        self.tag.eq_ignore_ascii_case(tag)
    }
}

/// Serialized view of one affected node.
///
/// `element` is present when the node is itself an element; text and
/// comment nodes carry only their ancestor chain.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeSummary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element: Option<ElementSummary>,
    /// Element ancestors, nearest first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ancestors: Vec<ElementSummary>,
}

impl NodeSummary {
    /// An element node with no recorded ancestors.
    pub fn element(summary: ElementSummary) -> Self {
        Self {
            element: Some(summary),
            ancestors: Vec::new(),
        }
    }

    /// An element node with its ancestor chain, nearest first.
    pub fn element_within(summary: ElementSummary, ancestors: Vec<ElementSummary>) -> Self {
        Self {
            element: Some(summary),
            ancestors,
        }
    }

    /// A text (or other non-element) node under the given ancestors.
    pub fn text_within(ancestors: Vec<ElementSummary>) -> Self {
        Self {
            element: None,
            ancestors,
        }
    }

    /// The node itself if it is an element, otherwise its nearest element
    /// ancestor.
    pub fn nearest_element(&self) -> Option<&ElementSummary> {
        self.element.as_ref().or_else(|| self.ancestors.first())
    }

    /// Iterates the node (if an element) followed by its ancestors.
    pub fn self_and_ancestors(&self) -> impl Iterator<Item = &ElementSummary> {
        self.element.iter().chain(self.ancestors.iter())
    }
}

/// One coalesced document change, as delivered by the host's observer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum MutationRecord {
    /// Nodes added to or removed from the target's child list.
    #[serde(rename_all = "camelCase")]
    ChildList {
        target: NodeSummary,
        #[serde(default)]
        added_nodes: Vec<NodeSummary>,
        #[serde(default)]
        removed_nodes: Vec<NodeSummary>,
    },
    /// An attribute on the target changed; the previous value is retained.
    #[serde(rename_all = "camelCase")]
    Attributes {
        target: NodeSummary,
        attribute_name: String,
        #[serde(default)]
        old_value: Option<String>,
    },
    /// The target text node's content changed.
    #[serde(rename_all = "camelCase")]
    CharacterData { target: NodeSummary },
}

impl MutationRecord {
    pub fn child_list(
        target: NodeSummary,
        added_nodes: Vec<NodeSummary>,
        removed_nodes: Vec<NodeSummary>,
    ) -> Self {
        Self::ChildList {
            target,
            added_nodes,
            removed_nodes,
        }
    }

    pub fn attribute_change(
        target: NodeSummary,
        attribute_name: impl Into<String>,
        old_value: Option<String>,
    ) -> Self {
        Self::Attributes {
            target,
            attribute_name: attribute_name.into(),
            old_value,
        }
    }

    pub fn character_data(target: NodeSummary) -> Self {
        Self::CharacterData { target }
    }
}

/// The observer configuration the host must apply for the coordinator's
/// relevance checks to be sound: all of the subtree, with old attribute
/// values retained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObserveOptions {
    pub child_list: bool,
    pub attributes: bool,
    pub subtree: bool,
    pub character_data: bool,
    pub attribute_old_value: bool,
}

impl Default for ObserveOptions {
    fn default() -> Self {
        Self {
            child_list: true,
            attributes: true,
            subtree: true,
            character_data: true,
            attribute_old_value: true,
        }
    }
}

/// Decodes a JSON-encoded mutation batch from a host bridge.
pub fn parse_batch(json: &str) -> Result<Vec<MutationRecord>> {
    serde_json::from_str(json).map_err(ExtractError::MutationBatch)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_batch_accepts_observer_shaped_records() {
        let json = r#"[
            {
                "type": "childList",
                "target": { "element": { "tag": "BODY" } },
                "addedNodes": [
                    {
                        "element": {
                            "tag": "DIV",
                            "attributes": { "itemscope": "" }
                        }
                    }
                ]
            },
            {
                "type": "attributes",
                "target": { "element": { "tag": "SPAN" } },
                "attributeName": "itemprop",
                "oldValue": "name"
            },
            {
                "type": "characterData",
                "target": { "ancestors": [{ "tag": "P" }] }
            }
        ]"#;

        let batch = parse_batch(json).expect("batch should decode");
        assert_eq!(batch.len(), 3);
        match &batch[0] {
            MutationRecord::ChildList {
                added_nodes,
                removed_nodes,
                ..
            } => {
                assert_eq!(added_nodes.len(), 1);
                assert!(removed_nodes.is_empty());
                assert!(added_nodes[0]
                    .nearest_element()
                    .is_some_and(|el| el.has_attr("itemscope")));
            }
            other => panic!("expected childList, got {other:?}"),
        }
        match &batch[1] {
            MutationRecord::Attributes {
                attribute_name,
                old_value,
                ..
            } => {
                assert_eq!(attribute_name, "itemprop");
                assert_eq!(old_value.as_deref(), Some("name"));
            }
            other => panic!("expected attributes, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_batch_rejects_malformed_json() {
        assert!(parse_batch("[{").is_err());
        assert!(parse_batch(r#"[{"type": "unknownKind"}]"#).is_err());
    }

    #[test]
    fn test_nearest_element_prefers_self() {
        let node = NodeSummary::element_within(
            ElementSummary::new("span").with_attr("itemprop", "name"),
            vec![ElementSummary::new("div").with_attr("itemscope", "")],
        );
        assert_eq!(
            node.nearest_element().map(|el| el.tag.as_str()),
            Some("span")
        );

        let text = NodeSummary::text_within(vec![ElementSummary::new("div")]);
        assert_eq!(
            text.nearest_element().map(|el| el.tag.as_str()),
            Some("div")
        );
        assert_eq!(NodeSummary::default().nearest_element(), None);
    }

    #[test]
    fn test_observe_options_cover_the_whole_subtree() {
        let options = ObserveOptions::default();
        assert!(options.child_list);
        assert!(options.attributes);
        assert!(options.subtree);
        assert!(options.character_data);
        assert!(options.attribute_old_value);
    }
}
