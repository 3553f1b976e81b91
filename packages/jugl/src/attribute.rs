//! Statement attributes and what each one does to its element.

use std::fmt;

use jugl_dom::{MarkupMode, QualName};

use crate::config::ConditionFaultPolicy;
use crate::context::ProcessContext;
use crate::element::Element;
use crate::error::TemplateError;
use crate::grammar::{ContentMode, split_expression_prefix, split_key_expression, split_statement_list};
use crate::scope::RepeatStatus;
use crate::value::Value;

/// The statements, in the order an element runs them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Statement {
    Define,
    Condition,
    Repeat,
    Content,
    Replace,
    Attributes,
    OmitTag,
    Reflow,
}

impl Statement {
    pub const ALL: [Statement; 8] = [
        Statement::Define,
        Statement::Condition,
        Statement::Repeat,
        Statement::Content,
        Statement::Replace,
        Statement::Attributes,
        Statement::OmitTag,
        Statement::Reflow,
    ];

    pub fn local_name(self) -> &'static str {
        match self {
            Statement::Define => "define",
            Statement::Condition => "condition",
            Statement::Repeat => "repeat",
            Statement::Content => "content",
            Statement::Replace => "replace",
            Statement::Attributes => "attributes",
            Statement::OmitTag => "omit-tag",
            Statement::Reflow => "reflow",
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.local_name())
    }
}

/// Whether the element should carry on with its remaining steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    Continue,
    /// The element was removed or replaced; nothing more to do for it.
    Halt,
}

/// A statement attribute found on an element.
#[derive(Debug, Clone)]
pub struct Attribute {
    statement: Statement,
    name: QualName,
    value: String,
}

impl Attribute {
    /// Find `statement` on `node_id`. Attributes only present as DTD defaults are ignored.
    pub(crate) fn lookup(
        cx: &ProcessContext<'_>,
        node_id: usize,
        statement: Statement,
    ) -> Option<Self> {
        let element = cx.doc.get_node(node_id)?.element_data()?;
        let lookup = match &cx.namespace {
            Some(ns) => element.lookup_ns(ns, statement.local_name()),
            None => element.lookup_qualified(&cx.qualified_name(statement)),
        };
        let attr = lookup.specified()?;
        Some(Attribute {
            statement,
            name: attr.name.clone(),
            value: attr.value.clone(),
        })
    }

    pub fn statement(&self) -> Statement {
        self.statement
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn qualified_name(&self) -> String {
        match &self.name.prefix {
            Some(prefix) => format!("{prefix}:{}", self.name.local),
            None => self.name.local.to_string(),
        }
    }

    /// Run the statement against `element`. Faults are logged here, with the attribute and the
    /// element they came from, before being passed up.
    pub(crate) fn process(
        &self,
        element: &mut Element,
        cx: &mut ProcessContext<'_>,
    ) -> Result<Flow, TemplateError> {
        #[cfg(feature = "tracing")]
        tracing::trace!(
            "{}=\"{}\" on {}",
            self.qualified_name(),
            self.value,
            cx.doc.node_debug_str(element.node())
        );

        let result = match self.statement {
            Statement::Define => self.define(element, cx),
            Statement::Condition => self.condition(element, cx),
            Statement::Repeat => self.repeat(element, cx),
            Statement::Content => self.content(element, cx),
            Statement::Replace => self.replace(element, cx),
            Statement::Attributes => self.attributes(element, cx),
            Statement::OmitTag => self.omit_tag(element, cx),
            Statement::Reflow => self.reflow(element, cx),
        };

        #[cfg(feature = "tracing")]
        if let Err(err) = &result {
            tracing::error!(
                attribute = %self.qualified_name(),
                node = %cx.doc.node_debug_str(element.node()),
                "{err}"
            );
        }

        result
    }

    /// Drop the attribute from its element so it never reaches the output.
    pub(crate) fn remove(&self, element: &Element, cx: &mut ProcessContext<'_>) {
        if let Some(data) = cx
            .doc
            .get_node_mut(element.node())
            .and_then(|node| node.element_data_mut())
        {
            data.attrs.remove(&self.name);
        }
    }

    fn split<'v>(
        &self,
        element: &Element,
        cx: &ProcessContext<'_>,
        value: &'v str,
    ) -> Result<(&'v str, &'v str), TemplateError> {
        match split_key_expression(cx.trim_space, value) {
            Some((key, expression)) if !expression.is_empty() => Ok((key, expression)),
            _ => Err(TemplateError::MalformedStatement {
                attribute: self.qualified_name(),
                value: value.trim().to_string(),
                node: cx.doc.node_debug_str(element.node()),
            }),
        }
    }

    fn eval(
        &self,
        element: &Element,
        cx: &mut ProcessContext<'_>,
        expression: &str,
    ) -> Result<Value, TemplateError> {
        cx.eval(element.scope(), expression)
            .map_err(|source| TemplateError::Expression {
                attribute: self.qualified_name(),
                expression: expression.to_string(),
                node: cx.doc.node_debug_str(element.node()),
                source,
            })
    }

    /// Boolean statements treat an empty value as `true`.
    fn eval_flag(
        &self,
        element: &Element,
        cx: &mut ProcessContext<'_>,
    ) -> Result<bool, TemplateError> {
        if self.value.trim().is_empty() {
            return Ok(true);
        }
        Ok(self.eval(element, cx, &self.value)?.is_truthy())
    }

    fn define(
        &self,
        element: &mut Element,
        cx: &mut ProcessContext<'_>,
    ) -> Result<Flow, TemplateError> {
        for item in split_statement_list(&self.value) {
            let (key, expression) = self.split(element, cx, &item)?;
            let value = self.eval(element, cx, expression)?;
            element.scope_mut().set(key, value);
        }
        self.remove(element, cx);
        Ok(Flow::Continue)
    }

    fn condition(
        &self,
        element: &mut Element,
        cx: &mut ProcessContext<'_>,
    ) -> Result<Flow, TemplateError> {
        let keep = match self.eval(element, cx, &self.value) {
            Ok(value) => value.is_truthy(),
            Err(err) => match cx.config.condition_faults {
                ConditionFaultPolicy::Propagate => return Err(err),
                ConditionFaultPolicy::FailClosed | ConditionFaultPolicy::FailOpen => {
                    #[cfg(feature = "tracing")]
                    tracing::error!(
                        policy = ?cx.config.condition_faults,
                        node = %cx.doc.node_debug_str(element.node()),
                        "condition fault: {err}"
                    );
                    #[cfg(not(feature = "tracing"))]
                    let _ = err;
                    cx.config.condition_faults == ConditionFaultPolicy::FailOpen
                }
            },
        };

        if !keep {
            element.remove(cx);
            return Ok(Flow::Halt);
        }
        self.remove(element, cx);
        Ok(Flow::Continue)
    }

    fn repeat(
        &self,
        element: &mut Element,
        cx: &mut ProcessContext<'_>,
    ) -> Result<Flow, TemplateError> {
        let (key, expression) = self.split(element, cx, &self.value)?;
        let list = self.eval(element, cx, expression)?;
        // Clones must not repeat again
        self.remove(element, cx);

        let items = list.iter_items();
        let length = items.len();
        #[cfg(feature = "tracing")]
        tracing::debug!(
            "repeating {} {length} times over {}",
            cx.doc.node_debug_str(element.node()),
            list.type_name()
        );
        for (index, item) in items.into_iter().enumerate() {
            let mut clone = element.clone_in(cx);
            clone.scope_mut().set(key, item);
            clone
                .scope_mut()
                .set_repeat(key, RepeatStatus::new(index, length));
            element.insert_before(cx, &clone);
            clone.process(cx)?;
        }

        element.remove(cx);
        Ok(Flow::Halt)
    }

    /// Parse `markup` as the children of `context_id`. In XML documents markup which is not
    /// well-formed is re-parsed as HTML unless `strict_xml` is set.
    fn parse_structure(
        &self,
        element: &Element,
        cx: &mut ProcessContext<'_>,
        context_id: usize,
        markup: &str,
    ) -> Result<Vec<usize>, TemplateError> {
        let provider = cx.doc.markup_parser_provider();
        let mode = cx.doc.mode();
        let mut result = provider.parse_fragment(&mut cx.doc.mutate(), context_id, markup, mode);

        if result.is_err() && mode == MarkupMode::Xml && !cx.config.strict_xml {
            #[cfg(feature = "tracing")]
            if let Err(err) = &result {
                tracing::debug!("re-parsing {} result as HTML: {err}", self.qualified_name());
            }
            result = provider.parse_fragment(
                &mut cx.doc.mutate(),
                context_id,
                markup,
                MarkupMode::Html,
            );
        }

        result.map_err(|source| TemplateError::Markup {
            attribute: self.qualified_name(),
            node: cx.doc.node_debug_str(element.node()),
            source,
        })
    }

    fn content(
        &self,
        element: &mut Element,
        cx: &mut ProcessContext<'_>,
    ) -> Result<Flow, TemplateError> {
        let (mode, expression) = split_expression_prefix(cx.trim_space, &self.value);
        let value = self.eval(element, cx, expression)?;
        self.remove(element, cx);

        match mode {
            ContentMode::Text => element.set_text(cx, &value.to_string()),
            ContentMode::Structure => {
                let nodes = self.parse_structure(element, cx, element.node(), &value.to_string())?;
                element.remove_child_nodes(cx);
                element.append_children(cx, &nodes);
            }
        }
        Ok(Flow::Continue)
    }

    fn replace(
        &self,
        element: &mut Element,
        cx: &mut ProcessContext<'_>,
    ) -> Result<Flow, TemplateError> {
        let (mode, expression) = split_expression_prefix(cx.trim_space, &self.value);
        let value = self.eval(element, cx, expression)?;

        let nodes = match mode {
            ContentMode::Text => vec![cx.doc.create_text_node(&value.to_string())],
            ContentMode::Structure => {
                // The replacement lives where the element did, so parse it in the parent's context
                let context_id = element
                    .parent_element(cx)
                    .unwrap_or(element.node());
                self.parse_structure(element, cx, context_id, &value.to_string())?
            }
        };
        element.replace_with(cx, &nodes);
        Ok(Flow::Halt)
    }

    fn attributes(
        &self,
        element: &mut Element,
        cx: &mut ProcessContext<'_>,
    ) -> Result<Flow, TemplateError> {
        for item in split_statement_list(&self.value) {
            let (name, expression) = self.split(element, cx, &item)?;
            let value = self.eval(element, cx, expression)?;
            let mut mutr = cx.doc.mutate();
            match value {
                Value::Bool(false) => {
                    mutr.clear_attribute_qualified(element.node(), name);
                }
                value => mutr.set_attribute_qualified(element.node(), name, &value.to_string()),
            }
        }
        self.remove(element, cx);
        Ok(Flow::Continue)
    }

    fn omit_tag(
        &self,
        element: &mut Element,
        cx: &mut ProcessContext<'_>,
    ) -> Result<Flow, TemplateError> {
        let omit = self.eval_flag(element, cx)?;
        self.remove(element, cx);
        if omit {
            element.unwrap(cx);
            return Ok(Flow::Halt);
        }
        Ok(Flow::Continue)
    }

    fn reflow(
        &self,
        element: &mut Element,
        cx: &mut ProcessContext<'_>,
    ) -> Result<Flow, TemplateError> {
        let reflow = self.eval_flag(element, cx)?;
        self.remove(element, cx);
        if reflow && element.exists(cx) {
            cx.config.reflow.reflow(cx.doc, element.node());
        }
        Ok(Flow::Continue)
    }
}
