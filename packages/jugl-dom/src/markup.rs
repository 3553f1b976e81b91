use std::fmt;

use crate::DocumentMutator;

/// The flavour of markup a [`Document`](crate::Document) was parsed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MarkupMode {
    #[default]
    Html,
    Xml,
}

impl fmt::Display for MarkupMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarkupMode::Html => f.write_str("HTML"),
            MarkupMode::Xml => f.write_str("XML"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MarkupError {
    #[error("no markup parser is installed on this document")]
    Unsupported,
    #[error("malformed {mode} markup {markup:?}: {}", errors.join("; "))]
    Malformed {
        mode: MarkupMode,
        markup: String,
        errors: Vec<String>,
    },
    #[error("markup {markup:?} did not contain an element")]
    NoElement { markup: String },
}

pub trait MarkupParserProvider: Send + Sync {
    /// Parse `markup` as the content of the node `context_id` and return the ids of the
    /// resulting (unparented) nodes, in document order.
    fn parse_fragment(
        &self,
        mutr: &mut DocumentMutator<'_>,
        context_id: usize,
        markup: &str,
        mode: MarkupMode,
    ) -> Result<Vec<usize>, MarkupError>;
}

pub struct DummyMarkupParserProvider;
impl MarkupParserProvider for DummyMarkupParserProvider {
    fn parse_fragment(
        &self,
        mutr: &mut DocumentMutator<'_>,
        context_id: usize,
        markup: &str,
        mode: MarkupMode,
    ) -> Result<Vec<usize>, MarkupError> {
        let _ = mutr;
        let _ = context_id;
        let _ = markup;
        let _ = mode;
        Err(MarkupError::Unsupported)
    }
}
