//! End-to-end coordinator scenarios: lazy recompute, invalidation
//! precision, and republish signaling across document versions.

use std::cell::Cell;
use std::rc::Rc;

use pretty_assertions::assert_eq;
use scraper::Html;
use serde_json::json;

use schema_extract::{
    parse_batch, ElementSummary, ExtractionCoordinator, MutationRecord, NodeSummary,
};

const INITIAL: &str = r##"
<html><body>
    <div itemscope itemtype="Person" itemid="#p1"><span itemprop="name">Alice</span></div>
    <script type="application/ld+json">{"@context": "https://schema.org", "@type": "Event", "name": "Launch"}</script>
</body></html>
"##;

const RENAMED: &str = r##"
<html><body>
    <div itemscope itemtype="Person" itemid="#p1"><span itemprop="name">Bob</span></div>
    <script type="application/ld+json">{"@context": "https://schema.org", "@type": "Event", "name": "Launch"}</script>
</body></html>
"##;

fn microdata_text_batch() -> Vec<MutationRecord> {
    vec![MutationRecord::character_data(NodeSummary::text_within(
        vec![
            ElementSummary::new("span").with_attr("itemprop", "name"),
            ElementSummary::new("div").with_attr("itemscope", ""),
        ],
    ))]
}

fn plain_text_batch() -> Vec<MutationRecord> {
    vec![MutationRecord::character_data(NodeSummary::text_within(
        vec![ElementSummary::new("p")],
    ))]
}

#[test]
fn initial_publish_covers_both_dialects() {
    let document = Html::parse_document(INITIAL);
    let coordinator = ExtractionCoordinator::new(&document);

    let entities = coordinator.entities();
    assert_eq!(entities.len(), 2);
    assert_eq!(
        entities[0],
        json!({ "@type": ["Person"], "@id": "#p1", "name": ["Alice"] })
    );
    assert_eq!(entities[1]["name"], json!("Launch"));
}

#[test]
fn cached_results_are_served_until_invalidated() {
    let document = Html::parse_document(INITIAL);
    let mut coordinator = ExtractionCoordinator::new(&document);

    // The document changed underneath, but no relevant batch arrived, so
    // extraction still serves the cached entities rather than re-walking.
    let renamed = Html::parse_document(RENAMED);
    let stale = coordinator.extract(&renamed);
    assert_eq!(stale[0]["name"], json!(["Alice"]));

    assert!(coordinator.document_mutated(&renamed, &microdata_text_batch()));
    assert_eq!(coordinator.entities()[0]["name"], json!(["Bob"]));
}

#[test]
fn irrelevant_batch_neither_republishes_nor_notifies() {
    let document = Html::parse_document(INITIAL);
    let mut coordinator = ExtractionCoordinator::new(&document);

    let fired = Rc::new(Cell::new(0));
    let counter = Rc::clone(&fired);
    coordinator.on_entities_changed(move || counter.set(counter.get() + 1));

    assert!(!coordinator.document_mutated(&document, &plain_text_batch()));
    assert_eq!(fired.get(), 0);
}

#[test]
fn relevant_batch_republishes_and_notifies() {
    let document = Html::parse_document(INITIAL);
    let mut coordinator = ExtractionCoordinator::new(&document);

    let fired = Rc::new(Cell::new(0));
    let counter = Rc::clone(&fired);
    coordinator.on_entities_changed(move || counter.set(counter.get() + 1));

    let renamed = Html::parse_document(RENAMED);
    assert!(coordinator.document_mutated(&renamed, &microdata_text_batch()));
    assert_eq!(fired.get(), 1);
    assert_eq!(coordinator.entities()[0]["name"], json!(["Bob"]));

    // A second delivery of an irrelevant batch stays quiet.
    assert!(!coordinator.document_mutated(&renamed, &plain_text_batch()));
    assert_eq!(fired.get(), 1);
}

#[test]
fn microdata_batch_keeps_json_ld_results_intact() {
    let document = Html::parse_document(INITIAL);
    let mut coordinator = ExtractionCoordinator::new(&document);

    // The new document version drops the script entirely; a
    // microdata-only batch must not make the coordinator notice.
    let no_script = Html::parse_document(
        r##"<div itemscope itemtype="Person" itemid="#p1"><span itemprop="name">Bob</span></div>"##,
    );
    assert!(coordinator.document_mutated(&no_script, &microdata_text_batch()));

    let entities = coordinator.entities();
    assert_eq!(entities.len(), 2, "JSON-LD slot still cached");
    assert_eq!(entities[0]["name"], json!(["Bob"]));
    assert_eq!(entities[1]["name"], json!("Launch"));
}

#[test]
fn empty_document_publishes_empty_set() {
    let document = Html::parse_document("<html><body><p>nothing here</p></body></html>");
    let coordinator = ExtractionCoordinator::new(&document);
    assert!(coordinator.entities().is_empty());
    assert_eq!(coordinator.merged_json().expect("serializable"), "[]");
}

#[test]
fn json_batches_from_a_host_bridge_drive_invalidation() {
    let document = Html::parse_document(INITIAL);
    let mut coordinator = ExtractionCoordinator::new(&document);

    let batch = parse_batch(
        r#"[{
            "type": "characterData",
            "target": {
                "ancestors": [
                    { "tag": "SPAN", "attributes": { "itemprop": "name" } }
                ]
            }
        }]"#,
    )
    .expect("well-formed batch");

    let renamed = Html::parse_document(RENAMED);
    assert!(coordinator.document_mutated(&renamed, &batch));
    assert_eq!(coordinator.entities()[0]["name"], json!(["Bob"]));
}

#[test]
fn observe_options_request_the_full_subtree() {
    let options = ExtractionCoordinator::observe_options();
    assert!(options.subtree && options.attribute_old_value);
}
