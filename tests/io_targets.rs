//! Integration tests for loading from and saving to files, readers,
//! writers and raw descriptors.

#![allow(clippy::unwrap_used)]

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};

use pretty_assertions::assert_eq;
use sprigxml::parser::{Classifier, ParseOptions};
use sprigxml::search::find_path;
use sprigxml::serial::{save_string, save_to_buffer, save_to_writer, SaveOptions};
use sprigxml::{Document, Error, NodeType};

const CONFIG: &str = "<?xml version=\"1.0\"?>\n<config><port>8080</port><host>example.org</host></config>";

/// A reader that fails after handing out its first chunk.
struct FailingReader {
    sent: bool,
}

impl Read for FailingReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.sent {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed"));
        }
        self.sent = true;
        let chunk = b"<config><port>";
        buf[..chunk.len()].copy_from_slice(chunk);
        Ok(chunk.len())
    }
}

#[test]
fn test_parse_reader_from_file() {
    let mut file = tempfile::tempfile().unwrap();
    file.write_all(CONFIG.as_bytes()).unwrap();
    file.seek(SeekFrom::Start(0)).unwrap();

    let opts = ParseOptions::default().classifier(Classifier::Integer);
    let doc = Document::parse_reader(&mut file, &opts).unwrap();
    assert_eq!(doc.version.as_deref(), Some("1.0"));
    let config = doc.root_element().unwrap();
    assert_eq!(doc.integer(find_path(&doc, config, "port").unwrap()), Some(8080));
}

#[test]
fn test_save_to_writer_then_read_back() {
    let doc = Document::parse_str(CONFIG, &ParseOptions::default()).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.xml");

    save_to_writer(&doc, doc.root(), File::create(&path).unwrap(), &SaveOptions::default())
        .unwrap();
    let written = std::fs::read_to_string(&path).unwrap();
    assert_eq!(written, CONFIG);
}

#[test]
fn test_save_to_buffer_truncates() {
    let doc = Document::parse_str("<a>hello</a>", &ParseOptions::default()).unwrap();
    let mut small = [0u8; 4];
    let full = save_to_buffer(&doc, doc.root(), &mut small, &SaveOptions::default()).unwrap();
    assert_eq!(full, "<a>hello</a>".len());
    assert_eq!(&small, b"<a>h");
}

#[test]
fn test_failing_reader_reports_io_error() {
    let err = Document::parse_reader(FailingReader { sent: false }, &ParseOptions::default())
        .unwrap_err();
    assert!(matches!(err, Error::Io(_)), "{err:?}");

    let mut doc = Document::new();
    let root = doc.root();
    let err = doc
        .load_reader(root, FailingReader { sent: false }, &ParseOptions::default())
        .unwrap_err();
    assert!(matches!(err, Error::Io(_)), "{err:?}");
    assert_eq!(doc.first_child(root), None);
}

#[test]
fn test_truncated_file_reports_parse_error() {
    let err = Document::parse_reader(&b"<config><port>"[..], &ParseOptions::default())
        .unwrap_err();
    assert!(matches!(err, Error::Parse(_)), "{err:?}");
}

#[test]
fn test_load_reader_into_parent() {
    let mut doc = Document::new_xml("1.0");
    let list = doc.new_element(Some(doc.root()), "list").unwrap();
    let opts = ParseOptions::default().classifier(Classifier::Real);
    for item in ["<item>1.5</item>", "<item>2.5</item>"] {
        assert_eq!(doc.load_reader(list, item.as_bytes(), &opts).unwrap(), list);
    }
    let values: Vec<_> = doc
        .children(list)
        .filter_map(|item| doc.real(item))
        .collect();
    assert_eq!(values, vec![1.5, 2.5]);
}

#[test]
fn test_latin1_and_utf16_inputs() {
    let latin1 = b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?><w>caf\xe9</w>";
    let doc = Document::parse_bytes(latin1, &ParseOptions::default()).unwrap();
    let w = doc.root_element().unwrap();
    assert_eq!(doc.text(w), Some("caf\u{e9}"));

    let mut utf16 = vec![0xFF, 0xFE];
    for unit in "<w>na\u{ef}ve</w>".encode_utf16() {
        utf16.extend_from_slice(&unit.to_le_bytes());
    }
    let doc = Document::parse_bytes(&utf16, &ParseOptions::default()).unwrap();
    let w = doc.root_element().unwrap();
    assert_eq!(doc.node_type(doc.first_child(w).unwrap()), Some(NodeType::Text));
    assert_eq!(doc.text(w), Some("na\u{ef}ve"));
    assert_eq!(save_string(&doc, w, &SaveOptions::default()).unwrap(), "<w>na\u{ef}ve</w>");
}

#[cfg(unix)]
mod descriptors {
    use std::os::fd::AsFd;

    use super::*;
    use pretty_assertions::assert_eq;
    use sprigxml::serial::save_to_fd;

    #[test]
    fn test_parse_and_load_fd() {
        let mut file = tempfile::tempfile().unwrap();
        file.write_all(b"<entry>one</entry>").unwrap();

        file.seek(SeekFrom::Start(0)).unwrap();
        let doc = Document::parse_fd(file.as_fd(), &ParseOptions::default()).unwrap();
        assert_eq!(doc.element_name(doc.root_element().unwrap()), Some("entry"));

        file.seek(SeekFrom::Start(0)).unwrap();
        let mut target = Document::new();
        let feed = target.new_element(Some(target.root()), "feed").unwrap();
        target
            .load_fd(feed, file.as_fd(), &ParseOptions::default())
            .unwrap();
        let entry = target.first_child(feed).unwrap();
        assert_eq!(target.text(entry), Some("one"));
    }

    #[test]
    fn test_save_to_fd() {
        let doc = Document::parse_str(CONFIG, &ParseOptions::default()).unwrap();
        let mut file = tempfile::tempfile().unwrap();
        save_to_fd(&doc, doc.root(), file.as_fd(), &SaveOptions::default()).unwrap();

        file.seek(SeekFrom::Start(0)).unwrap();
        let mut written = String::new();
        file.read_to_string(&mut written).unwrap();
        assert_eq!(written, CONFIG);
    }
}
