use jugl_dom::{Document, Namespace};
use regex::Regex;

use crate::attribute::Statement;
use crate::config::TemplateConfig;
use crate::error::EvalResult;
use crate::expr::ExpressionCache;
use crate::scope::Scope;
use crate::value::Value;

/// State shared by every element during one `process` call.
pub(crate) struct ProcessContext<'a> {
    pub doc: &'a mut Document,
    pub config: &'a TemplateConfig,
    pub trim_space: &'a Regex,
    /// Set when statements are matched by namespace rather than by literal `prefix:name`.
    pub namespace: Option<Namespace>,
    pub cache: ExpressionCache,
}

impl<'a> ProcessContext<'a> {
    pub fn new(
        doc: &'a mut Document,
        config: &'a TemplateConfig,
        trim_space: &'a Regex,
        namespace: Option<Namespace>,
    ) -> Self {
        Self {
            doc,
            config,
            trim_space,
            namespace,
            cache: ExpressionCache::default(),
        }
    }

    /// `prefix:name` as written in the markup, e.g. `jugl:omit-tag`.
    pub fn qualified_name(&self, statement: Statement) -> String {
        format!("{}:{}", self.config.prefix, statement.local_name())
    }

    pub fn eval(&mut self, scope: &Scope, expression: &str) -> EvalResult<Value> {
        self.cache.eval(expression, scope, &self.config.globals)
    }
}
