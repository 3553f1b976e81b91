//! The DOM abstraction underneath Jugl
//!
//! This crate implements a small headless DOM ([`Document`]) which the template engine walks and rewrites
//! in place. Most users will want to build documents through a parser:
//!
//!  - [`TemplateDocument`](https://docs.rs/jugl-html/latest/jugl_html/struct.TemplateDocument.html) from the
//!    [jugl-html](https://docs.rs/jugl-html) crate parses HTML or XML markup into a [`Document`] and installs a
//!    [`MarkupParserProvider`] so that fragments can be parsed later on.
//!
//! It includes: a slab-backed node tree, namespace-aware attributes, a mutation API ([`DocumentMutator`]),
//! cross-document import and HTML/XML serialization.

// ## Feature flags
//  - `default`: Enables the features listed below.
//  - `tracing`: Enables tracing support.

/// The DOM implementation.
///
/// This is the primary entry point for this crate.
mod document;

/// The nodes themselves, and their data.
pub mod node;

mod config;
mod markup;
mod mutator;
mod serialize;

pub mod util;

pub use config::DocumentConfig;
pub use document::Document;
pub use markup::{DummyMarkupParserProvider, MarkupError, MarkupMode, MarkupParserProvider};
pub use markup5ever::{
    LocalName, Namespace, Prefix, QualName, local_name, namespace_prefix, namespace_url, ns,
};
pub use mutator::{AppendTextErr, DocumentMutator};
pub use node::{Attribute, AttributeLookup, ElementData, Node, NodeData, TextNodeData};
