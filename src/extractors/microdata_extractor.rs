//! Microdata (schema.org HTML attributes) extraction.
//!
//! Builds one entity per top-level `itemscope` element, following the HTML
//! microdata model: nested scopes become nested entities, `itemref` pulls
//! in properties from elsewhere in the document, and each property value
//! is resolved by element kind.
//! Reference: https://html.spec.whatwg.org/multipage/microdata.html

use ego_tree::NodeId;
use scraper::{ElementRef, Html, Selector};
use serde_json::{Map, Value};
use tracing::trace;
use url::Url;

use crate::entity::{Entity, EntityExtractor};
use crate::mutation::{ElementSummary, MutationRecord, NodeSummary};

/// The five attributes that make an element microdata-related.
pub const MICRODATA_ATTRIBUTES: [&str; 5] =
    ["itemscope", "itemprop", "itemtype", "itemid", "itemref"];

/// Substituted for a property value whose resolution revisits an element
/// already on the current extraction path.
pub const CYCLE_SENTINEL: &str = "ERROR";

/// Closed set of element kinds the value-resolution policy dispatches on,
/// classified once per element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ElementKind {
    Scoped,
    Media,
    Link,
    MeterLike,
    TimeLike,
    Other,
}

impl ElementKind {
    fn classify(element: ElementRef<'_>) -> Self {
        if element.value().attr("itemscope").is_some() {
            return Self::Scoped;
        }
        match element.value().name() {
            "audio" | "embed" | "iframe" | "img" | "source" | "track" | "video" => Self::Media,
            "a" | "area" | "link" => Self::Link,
            "data" | "meter" => Self::MeterLike,
            "time" => Self::TimeLike,
            _ => Self::Other,
        }
    }
}

/// Extracts microdata items from a parsed document.
#[derive(Debug, Clone, Default)]
pub struct MicrodataExtractor {
    base: Option<Url>,
}

impl MicrodataExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves relative `src`/`href` property values against `base`, the
    /// way the DOM's reflected URL attributes would.
    pub fn with_base(base: Url) -> Self {
        Self { base: Some(base) }
    }

    /// The effective base URL: a `<base href>` in the document wins over
    /// the configured document URL, and resolves against it when relative.
    fn document_base(&self, document: &Html) -> Option<Url> {
        if let Ok(selector) = Selector::parse("base[href]") {
            if let Some(href) = document
                .select(&selector)
                .next()
                .and_then(|base| base.value().attr("href"))
            {
                let resolved = match &self.base {
                    Some(document_url) => document_url.join(href).ok(),
                    None => Url::parse(href).ok(),
                };
                if resolved.is_some() {
                    return resolved;
                }
            }
        }
        self.base.clone()
    }

    /// Builds the entity rooted at `item`.
    ///
    /// `memory` holds every element on the current resolution path; a
    /// property element already present resolves to [`CYCLE_SENTINEL`]
    /// instead of recursing.
    fn extract_entity(
        &self,
        document: &Html,
        prop_selector: &Selector,
        base: Option<&Url>,
        item: ElementRef<'_>,
        memory: &mut Vec<NodeId>,
    ) -> Entity {
        let mut result = Map::new();
        memory.push(item.id());

        if let Some(itemtype) = item.value().attr("itemtype") {
            let types: Vec<Value> = itemtype
                .split_ascii_whitespace()
                .map(|itemtype| Value::String(itemtype.to_string()))
                .collect();
            if !types.is_empty() {
                result.insert("@type".to_string(), Value::Array(types));
            }
        }
        if let Some(itemid) = item.value().attr("itemid") {
            result.insert("@id".to_string(), Value::String(itemid.to_string()));
        }

        // The reference walk carries its own visited set, seeded with the
        // item root, so an itemref back to the item terminates.
        let mut expanded = vec![item.id()];
        for property in self.item_properties(document, prop_selector, item, &mut expanded) {
            let value = self.property_value(document, prop_selector, base, property, memory);
            let Some(names) = property.value().attr("itemprop") else {
                continue;
            };
            for name in names.split_ascii_whitespace() {
                match result.get_mut(name) {
                    Some(Value::Array(values)) => values.push(value.clone()),
                    _ => {
                        result.insert(name.to_string(), Value::Array(vec![value.clone()]));
                    }
                }
            }
        }

        Value::Object(result)
    }

    /// The properties of `root`: descendants whose nearest scoped ancestor
    /// is `root`, plus properties pulled in through `itemref`.
    fn item_properties<'a>(
        &self,
        document: &'a Html,
        prop_selector: &Selector,
        root: ElementRef<'a>,
        expanded: &mut Vec<NodeId>,
    ) -> Vec<ElementRef<'a>> {
        let mut properties: Vec<ElementRef<'a>> = root
            .select(prop_selector)
            .filter(|property| direct_child(*property, root))
            .collect();

        if root.value().attr("itemscope").is_some() {
            if let Some(refs) = root.value().attr("itemref") {
                for id in refs.split_ascii_whitespace() {
                    // Dangling ids contribute nothing; a repeated or
                    // cyclic target is expanded at most once per item.
                    let Some(referenced) = element_by_id(document, id) else {
                        trace!(%id, "skipping dangling itemref");
                        continue;
                    };
                    if expanded.contains(&referenced.id()) {
                        continue;
                    }
                    expanded.push(referenced.id());
                    properties.extend(self.item_properties(
                        document,
                        prop_selector,
                        referenced,
                        expanded,
                    ));
                }
            }
        }

        properties
    }

    /// Resolves one property element's contributed value.
    fn property_value(
        &self,
        document: &Html,
        prop_selector: &Selector,
        base: Option<&Url>,
        element: ElementRef<'_>,
        memory: &mut Vec<NodeId>,
    ) -> Value {
        if memory.contains(&element.id()) {
            return Value::String(CYCLE_SENTINEL.to_string());
        }

        match ElementKind::classify(element) {
            ElementKind::Scoped => {
                self.extract_entity(document, prop_selector, base, element, memory)
            }
            kind => match element.value().attr("content") {
                Some(content) => Value::String(content.to_string()),
                None => match kind {
                    ElementKind::Media => resolve_url(base, element.value().attr("src")),
                    ElementKind::Link => resolve_url(base, element.value().attr("href")),
                    ElementKind::MeterLike => match element.value().attr("value") {
                        Some(value) => Value::String(value.to_string()),
                        None => Value::String(text_content(element)),
                    },
                    ElementKind::TimeLike => match element.value().attr("datetime") {
                        Some(datetime) => Value::String(datetime.to_string()),
                        None => Value::String(text_content(element)),
                    },
                    _ => Value::String(text_content(element)),
                },
            },
        }
    }
}

impl EntityExtractor for MicrodataExtractor {
    fn extract(&self, document: &Html) -> Vec<Entity> {
        // Top-level items carry itemscope but are not themselves a
        // property of an enclosing item.
        let root_selector = match Selector::parse("[itemscope]:not([itemprop])") {
            Ok(selector) => selector,
            Err(_) => return Vec::new(),
        };
        let prop_selector = match Selector::parse(r#"[itemprop]:not([itemprop=""])"#) {
            Ok(selector) => selector,
            Err(_) => return Vec::new(),
        };
        let base = self.document_base(document);

        document
            .select(&root_selector)
            .map(|item| {
                self.extract_entity(document, &prop_selector, base.as_ref(), item, &mut Vec::new())
            })
            .collect()
    }

    fn entities_changed(&self, records: &[MutationRecord]) -> bool {
        // The whole batch is scanned; one relevant record anywhere marks it.
        records.iter().any(record_related)
    }
}

/// True when `root` is the nearest scoped ancestor of `element`; an
/// intervening itemscope claims the property for its own item.
fn direct_child(element: ElementRef<'_>, root: ElementRef<'_>) -> bool {
    for ancestor in element.ancestors() {
        if ancestor.id() == root.id() {
            return true;
        }
        if let Some(scope) = ElementRef::wrap(ancestor) {
            if scope.value().attr("itemscope").is_some() {
                return false;
            }
        }
    }
    false
}

/// Document-wide id lookup, first match in document order.
fn element_by_id<'a>(document: &'a Html, id: &str) -> Option<ElementRef<'a>> {
    document
        .tree
        .root()
        .descendants()
        .filter_map(ElementRef::wrap)
        .find(|element| element.value().attr("id") == Some(id))
}

fn text_content(element: ElementRef<'_>) -> String {
    element.text().collect()
}

fn resolve_url(base: Option<&Url>, raw: Option<&str>) -> Value {
    let Some(raw) = raw else {
        return Value::String(String::new());
    };
    let resolved = base
        .and_then(|base| base.join(raw).ok())
        .map_or_else(|| raw.to_string(), |url| url.to_string());
    Value::String(resolved)
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
            node_related(target)
                || (MICRODATA_ATTRIBUTES.contains(&attribute_name.as_str()) && old_value.is_some())
        }
        MutationRecord::CharacterData { target } => node_related(target),
    }
}

/// An element is microdata-related when it carries any of the five
/// attributes; a non-element node defers to its nearest element ancestor.
fn node_related(node: &NodeSummary) -> bool {
    node.nearest_element().is_some_and(carries_microdata)
}

fn carries_microdata(element: &ElementSummary) -> bool {
    MICRODATA_ATTRIBUTES.iter().any(|attr| element.has_attr(attr))
}
