//! Integration tests for the named entity resolver.

#![allow(clippy::unwrap_used)]

use std::ops::ControlFlow;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use pretty_assertions::assert_eq;
use sprigxml::parser::{Classifier, ParseOptions};
use sprigxml::sax::{self, SaxEvent};
use sprigxml::Document;

/// Builds `ParseOptions` with a resolver for two private entities.
fn opts_with_resolver() -> ParseOptions {
    ParseOptions::default().entity_resolver(|name| match name {
        "greeting" => Some("Hello, world!".to_string()),
        "year" => Some("2026".to_string()),
        _ => None,
    })
}

#[test]
fn test_entity_resolver_basic() {
    let doc = Document::parse_str("<doc>&greeting;</doc>", &opts_with_resolver()).unwrap();
    let root = doc.root_element().unwrap();
    // replacement text stays one token even when it contains spaces
    let words: Vec<_> = doc.children(root).filter_map(|n| doc.text(n)).collect();
    assert_eq!(words, vec!["Hello, world!"]);
}

#[test]
fn test_entity_resolver_returns_none() {
    let err = Document::parse_str("<doc>&other;</doc>", &opts_with_resolver()).unwrap_err();
    assert_eq!(err.message, "unknown entity reference: &other;");
}

#[test]
fn test_no_resolver_is_an_error() {
    let err = Document::parse_str("<doc>&greeting;</doc>", &ParseOptions::default()).unwrap_err();
    assert!(err.message.contains("&greeting;"));
}

#[test]
fn test_builtin_entities_take_precedence() {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);
    let opts = ParseOptions::default().entity_resolver(move |_| {
        seen.fetch_add(1, Ordering::Relaxed);
        Some("resolved".to_string())
    });
    let doc = Document::parse_str("<doc>&amp;&copy;&#65;</doc>", &opts).unwrap();
    let root = doc.root_element().unwrap();
    assert_eq!(doc.text(root), Some("&\u{a9}A"));
    assert_eq!(calls.load(Ordering::Relaxed), 0);
}

#[test]
fn test_resolved_text_is_not_reparsed() {
    let opts = ParseOptions::default()
        .classifier(Classifier::Opaque)
        .entity_resolver(|name| (name == "markup").then(|| "<b>bold</b>".to_string()));
    let doc = Document::parse_str("<doc>&markup;</doc>", &opts).unwrap();
    let root = doc.root_element().unwrap();
    assert_eq!(doc.opaque(root), Some("<b>bold</b>"));
    assert_eq!(doc.children(root).count(), 1);
}

#[test]
fn test_entity_resolver_multiple_entities() {
    let opts = opts_with_resolver().classifier(Classifier::Opaque);
    let doc = Document::parse_str("<doc>&greeting; (c) &year;</doc>", &opts).unwrap();
    let root = doc.root_element().unwrap();
    assert_eq!(doc.opaque(root), Some("Hello, world! (c) 2026"));
}

#[test]
fn test_entity_resolver_in_attribute_value() {
    let doc = Document::parse_str("<doc since='&year;'/>", &opts_with_resolver()).unwrap();
    let root = doc.root_element().unwrap();
    assert_eq!(doc.attribute(root, "since"), Some("2026"));
}

#[test]
fn test_entity_resolver_integer_leaves() {
    let opts = opts_with_resolver().classifier(Classifier::Integer);
    let doc = Document::parse_str("<doc>&year; 1</doc>", &opts).unwrap();
    let root = doc.root_element().unwrap();
    let values: Vec<_> = doc.children(root).filter_map(|n| doc.integer(n)).collect();
    assert_eq!(values, vec![2026, 1]);
}

#[test]
fn test_entity_resolver_sax() {
    let mut data = Vec::new();
    let mut handler = sax::from_fn(|cx, node, event| {
        if event == SaxEvent::Data {
            data.push(cx.document().text(node).unwrap_or_default().to_string());
        }
        ControlFlow::Continue(())
    });
    sax::parse_sax_str("<doc>&year;</doc>", &opts_with_resolver(), &mut handler).unwrap();
    assert_eq!(data, vec!["2026"]);
}

#[test]
fn test_entity_resolver_reader() {
    let doc =
        Document::parse_reader("<doc>&year;</doc>".as_bytes(), &opts_with_resolver()).unwrap();
    let root = doc.root_element().unwrap();
    assert_eq!(doc.text(root), Some("2026"));
}

#[test]
fn test_parse_options_clone_and_debug_with_resolver() {
    let opts = opts_with_resolver();
    let cloned = opts.clone();
    assert!(cloned.entity_resolver.is_some());
    let debug = format!("{opts:?}");
    assert!(debug.contains("entity_resolver"));
    assert!(debug.contains("..."));
}
