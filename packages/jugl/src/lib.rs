//! Jugl: attribute-driven HTML/XML templates
//!
//! A template is ordinary markup annotated with statement attributes (`jugl:define`,
//! `jugl:condition`, `jugl:repeat`, `jugl:content`, `jugl:replace`, `jugl:attributes`,
//! `jugl:omit-tag` and `jugl:reflow`). Processing evaluates each statement's expression against
//! a [`Scope`] and rewrites the tree accordingly; statement attributes never survive into the
//! output.
//!
//! ```rust
//! use jugl::{Scope, Template};
//!
//! let mut template = Template::parse_html(
//!     r#"<ul><li jugl:repeat="item items" jugl:content="item"></li></ul>"#,
//! )
//! .unwrap();
//! let context = Scope::from_json(serde_json::json!({ "items": ["a", "b"] })).unwrap();
//! assert_eq!(template.render(context).unwrap(), "<li>a</li><li>b</li>");
//! ```

mod attribute;
mod config;
mod context;
mod element;
mod error;
pub mod expr;
mod grammar;
mod scope;
mod template;
mod value;

pub use attribute::{Attribute, Statement};
pub use config::{
    ConditionFaultPolicy, DEFAULT_NAMESPACE_URI, DEFAULT_PREFIX, NoopReflow, ReflowHook,
    TemplateConfig,
};
pub use element::Element;
pub use error::{EvalError, EvalResult, TemplateError};
pub use expr::Globals;
pub use grammar::{ContentMode, split_expression_prefix, split_key_expression, split_statement_list};
pub use scope::{REPEAT_VARIABLE, RepeatStatus, Scope};
pub use template::{ProcessOptions, Processed, Template};
pub use value::{Function, Map, Value};

pub use jugl_dom::{Document, MarkupMode};
pub use jugl_html::TemplateDocument;
