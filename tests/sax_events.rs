//! Integration tests for the streaming loader: event accounting, nesting
//! order and retention over the `options.xml` fixture.

#![allow(clippy::unwrap_used)]

use std::collections::HashMap;
use std::ops::ControlFlow;

use pretty_assertions::assert_eq;
use sprigxml::parser::{Classifier, LeafKind, ParseOptions};
use sprigxml::sax::{self, SaxEvent};
use sprigxml::search::find_path;
use sprigxml::{NodeId, NodeType};

const OPTIONS_XML: &str = include_str!("data/options.xml");

/// Types leaves from a `type` attribute, falling back to the element name.
fn typed_options() -> ParseOptions {
    ParseOptions::default().classifier(Classifier::custom(|doc, node| {
        let kind = doc
            .attribute(node, "type")
            .or_else(|| doc.element_name(node))
            .unwrap_or_default();
        match kind {
            "integer" => LeafKind::Integer,
            "opaque" | "pre" => LeafKind::Opaque,
            "real" => LeafKind::Real,
            _ => LeafKind::Text,
        }
    }))
}

#[test]
fn test_event_counts() {
    let mut counts: HashMap<SaxEvent, usize> = HashMap::new();
    let mut handler = sax::from_fn(|_, _, event| {
        *counts.entry(event).or_default() += 1;
        ControlFlow::Continue(())
    });
    let doc = sax::parse_sax_str(OPTIONS_XML, &typed_options(), &mut handler).unwrap();
    assert!(doc.is_none());

    let count = |event| counts.get(&event).copied().unwrap_or(0);
    assert_eq!(count(SaxEvent::CData), 1);
    assert_eq!(count(SaxEvent::Comment), 1);
    assert_eq!(count(SaxEvent::Data), 61);
    assert_eq!(count(SaxEvent::Declaration), 0);
    assert_eq!(count(SaxEvent::Directive), 1);
    assert_eq!(count(SaxEvent::ElementClose), 20);
    assert_eq!(count(SaxEvent::ElementOpen), 20);
}

#[test]
fn test_events_are_well_nested() {
    let mut open: Vec<NodeId> = Vec::new();
    let mut max_depth = 0;
    let mut handler = sax::from_fn(|cx, node, event| {
        let doc = cx.document();
        match event {
            SaxEvent::ElementOpen => {
                let expected_parent = open.last().copied().unwrap_or(doc.root());
                assert_eq!(doc.parent(node), Some(expected_parent));
                open.push(node);
                max_depth = max_depth.max(open.len());
            }
            SaxEvent::ElementClose => {
                assert_eq!(open.pop(), Some(node));
            }
            _ => {
                let expected_parent = open.last().copied().unwrap_or(doc.root());
                assert_eq!(doc.parent(node), Some(expected_parent));
            }
        }
        ControlFlow::Continue(())
    });
    sax::parse_sax_str(OPTIONS_XML, &typed_options(), &mut handler).unwrap();
    assert!(open.is_empty());
    assert_eq!(max_depth, 5);
}

#[test]
fn test_retaining_elements_keeps_the_skeleton() {
    let mut handler = sax::from_fn(|cx, node, event| {
        if event == SaxEvent::ElementOpen {
            cx.retain(node);
        }
        ControlFlow::Continue(())
    });
    let doc = sax::parse_sax_str(OPTIONS_XML, &typed_options(), &mut handler)
        .unwrap()
        .unwrap();

    let options = doc.root_element().unwrap();
    let elements = doc
        .descendants(options)
        .filter(|&n| doc.node_type(n) == Some(NodeType::Element))
        .count();
    assert_eq!(elements, 20);
    // nothing but elements survived
    assert_eq!(doc.node_count(), 21);

    let keyword = find_path(&doc, options, "group/option/keyword").unwrap();
    assert_eq!(doc.element_name(keyword), Some("keyword"));
    assert_eq!(doc.ref_count(keyword), Some(1));
}

#[test]
fn test_retaining_data_under_one_element() {
    let mut handler = sax::from_fn(|cx, node, event| {
        let doc = cx.document();
        let in_integer = doc
            .parent(node)
            .and_then(|p| doc.element_name(p))
            .is_some_and(|name| name == "integer");
        let keep = match event {
            SaxEvent::ElementOpen => true,
            SaxEvent::Data => in_integer,
            _ => false,
        };
        if keep {
            cx.retain(node);
        }
        ControlFlow::Continue(())
    });
    let doc = sax::parse_sax_str(OPTIONS_XML, &typed_options(), &mut handler)
        .unwrap()
        .unwrap();
    let options = doc.root_element().unwrap();
    let integer = find_path(&doc, options, "group/integer").unwrap();
    let parent = doc.parent(integer).unwrap();
    let values: Vec<_> = doc.children(parent).filter_map(|n| doc.integer(n)).collect();
    assert_eq!(values, vec![123, 456, 789]);
}

#[test]
fn test_stop_at_first_element() {
    let mut seen = Vec::new();
    let mut handler = sax::from_fn(|_, _, event| {
        seen.push(event);
        if event == SaxEvent::ElementOpen {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    });
    let doc = sax::parse_sax_str(OPTIONS_XML, &typed_options(), &mut handler).unwrap();
    assert!(doc.is_none());
    assert_eq!(seen, vec![SaxEvent::Directive, SaxEvent::ElementOpen]);
}

#[test]
fn test_parse_sax_bytes_and_reader() {
    let mut opens = 0;
    let mut handler = sax::from_fn(|_, _, event| {
        if event == SaxEvent::ElementOpen {
            opens += 1;
        }
        ControlFlow::Continue(())
    });
    sax::parse_sax_bytes(OPTIONS_XML.as_bytes(), &typed_options(), &mut handler).unwrap();
    sax::parse_sax_reader(OPTIONS_XML.as_bytes(), &typed_options(), &mut handler).unwrap();
    assert_eq!(opens, 40);
}

#[test]
fn test_malformed_input_reports_error() {
    let mut events = 0;
    let mut handler = sax::from_fn(|cx, node, _| {
        events += 1;
        cx.retain(node);
        ControlFlow::Continue(())
    });
    let truncated = OPTIONS_XML.split("</option>").next().unwrap();
    let err = sax::parse_sax_str(truncated, &typed_options(), &mut handler).unwrap_err();
    assert!(err.message.contains("unexpected end of input"), "{err}");
    assert!(events > 0);
}
