//! Integration tests building the reference sample tree by hand and through
//! `load_str`, then exercising paths, indexes and deletion on it.

#![allow(clippy::unwrap_used)]

use pretty_assertions::assert_eq;
use sprigxml::index::NodeIndex;
use sprigxml::parser::{Classifier, ParseOptions};
use sprigxml::search::find_path;
use sprigxml::serial::{save_string, SaveOptions};
use sprigxml::{Document, NodeId, NodeType};

const CDATA_LINE: &str = "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef\n";

/// Builds `<element>` with four leaves, four groups, a nested `foo` chain
/// and three CDATA blocks: twelve children in total.
fn sample_tree() -> (Document, NodeId) {
    let mut doc = Document::new_xml("1.0");
    let tree = doc.new_element(Some(doc.root()), "element").unwrap();

    doc.new_integer(Some(tree), 123).unwrap();
    doc.new_opaque(Some(tree), "opaque").unwrap();
    doc.new_real(Some(tree), 123.4).unwrap();
    doc.new_text(Some(tree), true, "text").unwrap();

    let loads = [
        ("<group type='string'>string string string</group>", Classifier::Text),
        ("<group type='integer'>1 2 3</group>", Classifier::Integer),
        ("<group type='real'>1.0 2.0 3.0</group>", Classifier::Real),
        ("<group>opaque opaque opaque</group>", Classifier::Opaque),
        (
            "<foo><bar><one><two>value<two>value2</two></two></one></bar></foo>",
            Classifier::Opaque,
        ),
    ];
    for (input, classifier) in loads {
        let opts = ParseOptions::default().classifier(classifier);
        assert_eq!(doc.load_str(tree, input, &opts).unwrap(), tree);
    }

    doc.new_cdata(Some(tree), CDATA_LINE).unwrap();
    doc.new_cdata(Some(tree), &CDATA_LINE.repeat(4)).unwrap();
    doc.new_cdata(Some(tree), &CDATA_LINE.repeat(8)).unwrap();
    (doc, tree)
}

#[test]
fn test_leaf_children() {
    let (doc, tree) = sample_tree();
    assert_eq!(doc.node_type(tree), Some(NodeType::Element));
    assert_eq!(doc.element_name(tree), Some("element"));
    assert_eq!(doc.children(tree).count(), 12);

    let mut children = doc.children(tree);
    let first = children.next().unwrap();
    assert_eq!(doc.integer(first), Some(123));
    let second = children.next().unwrap();
    assert_eq!(doc.opaque(second), Some("opaque"));
    let third = children.next().unwrap();
    assert_eq!(doc.real(third), Some(123.4));
    let fourth = children.next().unwrap();
    assert_eq!(doc.text(fourth), Some("text"));
    assert_eq!(doc.text_whitespace(fourth), Some(true));

    for _ in 0..4 {
        let group = children.next().unwrap();
        assert_eq!(doc.element_name(group), Some("group"));
    }
}

#[test]
fn test_group_leaf_types() {
    let (doc, tree) = sample_tree();
    let groups: Vec<_> = doc.children(tree).skip(4).take(4).collect();

    let kinds = |group: NodeId| -> Vec<NodeType> {
        doc.children(group)
            .map(|c| doc.node_type(c).unwrap())
            .collect()
    };
    assert_eq!(kinds(groups[0]), vec![NodeType::Text; 3]);
    assert_eq!(kinds(groups[1]), vec![NodeType::Integer; 3]);
    assert_eq!(kinds(groups[2]), vec![NodeType::Real; 3]);
    assert_eq!(kinds(groups[3]), vec![NodeType::Opaque]);

    assert_eq!(doc.opaque(groups[3]), Some("opaque opaque opaque"));
    let reals: Vec<_> = doc.children(groups[2]).filter_map(|c| doc.real(c)).collect();
    assert_eq!(reals, vec![1.0, 2.0, 3.0]);
}

#[test]
fn test_find_path_on_sample() {
    let (doc, tree) = sample_tree();
    for path in ["*/two", "foo/*/two", "foo/bar/one/two"] {
        let node = find_path(&doc, tree, path).unwrap_or_else(|| panic!("no match for {path}"));
        assert_eq!(doc.node_type(node), Some(NodeType::Opaque), "{path}");
        assert_eq!(doc.opaque(node), Some("value"), "{path}");
    }
}

#[test]
fn test_indexes_on_sample() {
    let (doc, tree) = sample_tree();

    let mut all = NodeIndex::new(&doc, tree, None, None);
    assert_eq!(all.len(), 10);
    all.reset();
    assert!(all.find(Some("group"), None).is_some());

    let mut groups = NodeIndex::new(&doc, tree, Some("group"), None);
    assert_eq!(groups.len(), 4);
    groups.reset();
    assert!(groups.next().is_some());

    let mut typed = NodeIndex::new(&doc, tree, None, Some("type"));
    assert_eq!(typed.len(), 3);
    typed.reset();
    assert!(typed.find(None, Some("string")).is_some());

    let mut both = NodeIndex::new(&doc, tree, Some("group"), Some("type"));
    assert_eq!(both.len(), 3);
    both.reset();
    let string_group = both.find(Some("group"), Some("string")).unwrap();
    assert_eq!(doc.attribute(string_group, "type"), Some("string"));
}

#[test]
fn test_save_leaf_separators() {
    let (doc, tree) = sample_tree();
    let unwrapped = SaveOptions::default().wrap_margin(0);
    let text = save_string(&doc, tree, &unwrapped).unwrap();
    assert!(
        text.starts_with(
            "<element>123opaque 123.4 text<group type=\"string\">string string string</group>"
        ),
        "{text}"
    );
    assert!(text.ends_with("]]></element>"));

    let whole = save_string(&doc, doc.root(), &SaveOptions::default()).unwrap();
    assert!(whole.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<element>"));
}

#[test]
fn test_delete_every_child() {
    let (mut doc, tree) = sample_tree();
    for i in 0..12 {
        let child = doc
            .first_child(tree)
            .unwrap_or_else(|| panic!("child pointer empty at #{}", i + 1));
        doc.delete(child);
    }
    assert_eq!(doc.first_child(tree), None);
    assert_eq!(doc.last_child(tree), None);
    // root + element
    assert_eq!(doc.node_count(), 2);

    let root = doc.root();
    doc.delete(root);
    assert!(!doc.contains(tree));
    assert_eq!(doc.node_count(), 1);
}

#[test]
fn test_index_entries_resolve_to_none_after_delete() {
    let (mut doc, tree) = sample_tree();
    let index = NodeIndex::new(&doc, tree, Some("group"), None);
    let first_group = doc.children(tree).nth(4).unwrap();
    doc.delete(first_group);
    let live = index
        .entries()
        .iter()
        .filter(|e| doc.contains(e.node))
        .count();
    assert_eq!(live, 3);
}
