//! # sprigxml
//!
//! A small, embeddable XML library. Documents are parsed into an arena-backed
//! tree of typed nodes, edited through [`Document`], written back out with
//! [`serial`], and queried with [`search`] and [`index`]. Large inputs can be
//! streamed through [`sax`], keeping only the nodes a handler retains.
//!
//! Character data is turned into typed leaves (integers, reals, words or
//! opaque runs) by the [`Classifier`](parser::Classifier) in
//! [`ParseOptions`](parser::ParseOptions).
//!
//! ## Quick Start
//!
//! ```
//! use sprigxml::parser::{Classifier, ParseOptions};
//! use sprigxml::search::find_path;
//! use sprigxml::serial::{save_string, SaveOptions};
//! use sprigxml::Document;
//!
//! let opts = ParseOptions::default().classifier(Classifier::Integer);
//! let mut doc = Document::parse_str("<config><port>8080</port></config>", &opts).unwrap();
//!
//! let config = doc.root_element().unwrap();
//! let port = find_path(&doc, config, "port").unwrap();
//! assert_eq!(doc.integer(port), Some(8080));
//!
//! doc.set_integer(port, 9090).unwrap();
//! let text = save_string(&doc, doc.root(), &SaveOptions::default()).unwrap();
//! assert_eq!(text, "<config><port>9090</port></config>");
//! ```
//!
//! ## Logging
//!
//! The library never prints. Failed loads and streaming decisions are
//! reported through [`tracing`] at `debug` and `trace` level.

pub mod encoding;
pub mod error;
pub mod index;
pub mod parser;
pub mod sax;
pub mod search;
pub mod serial;
pub mod tree;

// Re-export primary types at the crate root for convenience.
pub use error::{Error, ParseError, SourceLocation};
pub use tree::{Attribute, Document, InsertPosition, NodeId, NodeKind, NodeType};
