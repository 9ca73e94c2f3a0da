//! Tests that hostile or pathological input is rejected cleanly.
//!
//! Every rejection must leave the target document exactly as it was.

#![allow(clippy::unwrap_used)]

use pretty_assertions::assert_eq;
use rstest::rstest;
use sprigxml::parser::ParseOptions;
use sprigxml::serial::{save_string, SaveOptions};
use sprigxml::Document;

fn nested(depth: usize) -> String {
    let open: String = (0..depth).map(|_| "<a>").collect();
    let close: String = (0..depth).map(|_| "</a>").collect();
    format!("{open}{close}")
}

// ---------------------------------------------------------------------------
// Depth limit
// ---------------------------------------------------------------------------

#[test]
fn test_deeply_nested_elements_rejected() {
    // a larger stack keeps debug builds from overflowing before the limit
    let result = std::thread::Builder::new()
        .stack_size(8 * 1024 * 1024)
        .spawn(|| Document::parse_str(&nested(300), &ParseOptions::default()))
        .unwrap()
        .join()
        .unwrap();
    let err = result.unwrap_err();
    assert!(err.message.contains("depth"), "{}", err.message);
}

#[test]
fn test_depth_limit_exact_boundary() {
    let opts = ParseOptions::default().max_depth(3);
    assert!(Document::parse_str(&nested(3), &opts).is_ok());

    let err = Document::parse_str(&nested(4), &opts).unwrap_err();
    assert_eq!(err.message, "maximum nesting depth exceeded (3)");
}

#[test]
fn test_depth_counts_from_the_load_point() {
    let mut doc = Document::new();
    let outer = doc.new_element(Some(doc.root()), "outer").unwrap();
    let inner = doc.new_element(Some(outer), "inner").unwrap();
    let opts = ParseOptions::default().max_depth(2);
    doc.load_str(inner, &nested(2), &opts).unwrap();
    assert!(doc.load_str(inner, &nested(3), &opts).is_err());
}

// ---------------------------------------------------------------------------
// Malformed markup
// ---------------------------------------------------------------------------

#[rstest]
#[case::unknown_entity("<a>&bogus;</a>", "unknown entity reference: &bogus;")]
#[case::lt_in_attribute("<a x='1<2'/>", "'<' not allowed in attribute values")]
#[case::duplicate_attribute("<a x='1' x='2'/>", "duplicate attribute: 'x'")]
#[case::unquoted_attribute("<a x=1/>", "attribute value must be quoted")]
#[case::double_hyphen_comment("<a><!-- a -- b --></a>", "'--' not allowed inside comments")]
#[case::stray_close("</a>", "close tag without matching open tag")]
#[case::root_text("hello <a/>", "character data outside of an element")]
#[case::mismatched("<a><b></a></b>", "mismatched close tag: expected </b>, found </a>")]
#[case::null_char_ref("<a>&#0;</a>", "invalid character reference: U+0000")]
#[case::unterminated_cdata("<a><![CDATA[open", "CDATA section")]
fn test_malformed_input_rejected(#[case] input: &str, #[case] expected: &str) {
    let err = Document::parse_str(input, &ParseOptions::default()).unwrap_err();
    assert!(
        err.message.contains(expected),
        "expected {expected:?} in {:?}",
        err.message
    );
}

#[test]
fn test_error_carries_location() {
    let err = Document::parse_str("<a>\n  <b x='1' x='2'/>\n</a>", &ParseOptions::default())
        .unwrap_err();
    assert_eq!(err.location.line, 2);
}

// ---------------------------------------------------------------------------
// Rollback
// ---------------------------------------------------------------------------

#[test]
fn test_failed_load_leaves_document_untouched() {
    let mut doc = Document::parse_str(
        "<?xml version=\"1.0\"?><list><item>1</item></list>",
        &ParseOptions::default(),
    )
    .unwrap();
    let list = doc.root_element().unwrap();
    let before = save_string(&doc, doc.root(), &SaveOptions::default()).unwrap();
    let count = doc.node_count();

    let hostile = format!("<item>2</item><item>{}</item><item>&bogus;</item>", nested(4));
    assert!(doc.load_str(list, &hostile, &ParseOptions::default()).is_err());

    assert_eq!(doc.node_count(), count);
    assert_eq!(save_string(&doc, doc.root(), &SaveOptions::default()).unwrap(), before);
}

#[test]
fn test_failed_load_restores_declaration() {
    let mut doc = Document::new_xml("1.0");
    let root = doc.root();
    let bad = "<?xml version=\"1.1\" standalone=\"yes\"?><a>";
    assert!(doc.load_str(root, bad, &ParseOptions::default()).is_err());
    assert_eq!(doc.version.as_deref(), Some("1.0"));
    assert_eq!(doc.standalone, None);
}

#[test]
fn test_large_flat_input() {
    let body: String = (0..10_000).map(|i| format!("<i n='{i}'>{i}</i>")).collect();
    let xml = format!("<list>{body}</list>");
    let doc = Document::parse_str(&xml, &ParseOptions::default()).unwrap();
    let list = doc.root_element().unwrap();
    assert_eq!(doc.children(list).count(), 10_000);
}
