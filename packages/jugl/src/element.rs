use crate::attribute::{Attribute, Flow, Statement};
use crate::context::ProcessContext;
use crate::error::TemplateError;
use crate::scope::Scope;

/// A node being processed, together with the variables visible to its statements.
#[derive(Debug, Clone)]
pub struct Element {
    node: usize,
    scope: Scope,
}

impl Element {
    pub fn new(node: usize, scope: Scope) -> Self {
        Self { node, scope }
    }

    pub fn node(&self) -> usize {
        self.node
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn scope_mut(&mut self) -> &mut Scope {
        &mut self.scope
    }

    pub(crate) fn exists(&self, cx: &ProcessContext<'_>) -> bool {
        cx.doc.get_node(self.node).is_some()
    }

    /// Deep copy of the node, minus its `id`, with a copy of the scope. The copy is detached.
    pub(crate) fn clone_in(&self, cx: &mut ProcessContext<'_>) -> Element {
        let mut mutr = cx.doc.mutate();
        let clone_id = mutr.deep_clone_node(self.node);
        mutr.clear_attribute_qualified(clone_id, "id");
        Element::new(clone_id, self.scope.clone())
    }

    /// Insert `other` right before this element.
    pub(crate) fn insert_before(&self, cx: &mut ProcessContext<'_>, other: &Element) {
        cx.doc.insert_before(self.node, &[other.node]);
    }

    pub(crate) fn append_children(&self, cx: &mut ProcessContext<'_>, node_ids: &[usize]) {
        cx.doc.append(self.node, node_ids);
    }

    pub(crate) fn remove(&self, cx: &mut ProcessContext<'_>) {
        cx.doc.remove_node(self.node);
    }

    pub(crate) fn remove_child_nodes(&self, cx: &mut ProcessContext<'_>) {
        cx.doc.remove_children(self.node);
    }

    pub(crate) fn set_text(&self, cx: &mut ProcessContext<'_>, text: &str) {
        cx.doc.mutate().set_text_content(self.node, text);
    }

    pub(crate) fn replace_with(&self, cx: &mut ProcessContext<'_>, node_ids: &[usize]) {
        cx.doc.mutate().replace_node_with(self.node, node_ids);
    }

    /// Replace the element with its own children.
    pub(crate) fn unwrap(&self, cx: &mut ProcessContext<'_>) {
        cx.doc.mutate().unwrap_node(self.node);
    }

    pub(crate) fn parent_element(&self, cx: &ProcessContext<'_>) -> Option<usize> {
        let parent_id = cx.doc.get_node(self.node)?.parent?;
        cx.doc
            .get_node(parent_id)
            .filter(|parent| parent.is_element())
            .map(|parent| parent.id)
    }

    /// The element children as they are now, each with a copy of this element's scope.
    pub(crate) fn child_elements(&self, cx: &ProcessContext<'_>) -> Vec<Element> {
        cx.doc
            .child_elements(self.node)
            .map(|child_id| Element::new(child_id, self.scope.clone()))
            .collect()
    }

    fn statement(&self, cx: &ProcessContext<'_>, statement: Statement) -> Option<Attribute> {
        Attribute::lookup(cx, self.node, statement)
    }

    /// Run this element's statements, then its children's.
    pub(crate) fn process(&mut self, cx: &mut ProcessContext<'_>) -> Result<(), TemplateError> {
        for statement in [Statement::Define, Statement::Condition, Statement::Repeat] {
            if let Some(attr) = self.statement(cx, statement) {
                if attr.process(self, cx)? == Flow::Halt {
                    return Ok(());
                }
            }
        }

        // `content` wins over `replace` when both are present
        let content = self.statement(cx, Statement::Content);
        let replace = self.statement(cx, Statement::Replace);
        let has_content = content.is_some() || replace.is_some();
        match (content, replace) {
            (Some(content), replace) => {
                if let Some(replace) = replace {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(
                        "{} ignored in favour of {} on {}",
                        replace.qualified_name(),
                        content.qualified_name(),
                        cx.doc.node_debug_str(self.node)
                    );
                    replace.remove(self, cx);
                }
                content.process(self, cx)?;
            }
            (None, Some(replace)) => {
                replace.process(self, cx)?;
                return Ok(());
            }
            (None, None) => {}
        }

        if let Some(attr) = self.statement(cx, Statement::Attributes) {
            attr.process(self, cx)?;
        }

        if !has_content {
            self.process_children(cx)?;
        }

        // Looked up before omit-tag may unwrap the element
        let reflow = self.statement(cx, Statement::Reflow);
        if let Some(attr) = self.statement(cx, Statement::OmitTag) {
            attr.process(self, cx)?;
        }
        if let Some(attr) = reflow {
            attr.process(self, cx)?;
        }

        Ok(())
    }

    fn process_children(&self, cx: &mut ProcessContext<'_>) -> Result<(), TemplateError> {
        for mut child in self.child_elements(cx) {
            // An earlier sibling's statements may have moved or dropped it
            let attached = cx
                .doc
                .get_node(child.node)
                .is_some_and(|node| node.parent == Some(self.node));
            if attached {
                child.process(cx)?;
            }
        }
        Ok(())
    }
}
