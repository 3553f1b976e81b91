use std::sync::Arc;

use jugl_dom::Document;

use crate::expr::Globals;
use crate::value::Value;

pub const DEFAULT_PREFIX: &str = "jugl";
pub const DEFAULT_NAMESPACE_URI: &str = "http://namespace.jugl.org/";

/// What to do when a `condition` expression fails to evaluate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConditionFaultPolicy {
    /// Log the fault and treat the condition as false, removing the element.
    #[default]
    FailClosed,
    /// Abort processing with the fault, like any other statement.
    Propagate,
    /// Log the fault and keep the element.
    FailOpen,
}

/// Called for every element carrying a `reflow` statement which evaluated truthy.
pub trait ReflowHook: Send + Sync {
    fn reflow(&self, doc: &mut Document, node_id: usize);
}

/// Logs reflow requests and leaves the document alone. Layout is the embedder's business.
pub struct NoopReflow;

impl ReflowHook for NoopReflow {
    fn reflow(&self, _doc: &mut Document, _node_id: usize) {
        #[cfg(feature = "tracing")]
        tracing::debug!("reflow requested for {}", _doc.node_debug_str(_node_id));
    }
}

/// Options for processing a [`Template`](crate::Template)
#[derive(Clone)]
pub struct TemplateConfig {
    /// Statement attribute prefix, e.g. `jugl` for `jugl:content`
    pub prefix: String,
    /// Namespace statement attributes belong to when the template declares it. `None` always
    /// matches attributes by their literal `prefix:name`.
    pub namespace_uri: Option<String>,
    /// Reject `structure` content which is not well-formed XML in XML documents instead of
    /// re-parsing it as HTML.
    pub strict_xml: bool,
    pub condition_faults: ConditionFaultPolicy,
    pub globals: Globals,
    pub reflow: Arc<dyn ReflowHook>,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            prefix: String::from(DEFAULT_PREFIX),
            namespace_uri: Some(String::from(DEFAULT_NAMESPACE_URI)),
            strict_xml: false,
            condition_faults: ConditionFaultPolicy::default(),
            globals: Globals::default(),
            reflow: Arc::new(NoopReflow),
        }
    }
}

impl TemplateConfig {
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_namespace_uri(mut self, namespace_uri: Option<String>) -> Self {
        self.namespace_uri = namespace_uri;
        self
    }

    pub fn with_condition_faults(mut self, policy: ConditionFaultPolicy) -> Self {
        self.condition_faults = policy;
        self
    }

    pub fn with_global(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.globals.insert(name, value);
        self
    }

    pub fn with_reflow(mut self, hook: impl ReflowHook + 'static) -> Self {
        self.reflow = Arc::new(hook);
        self
    }

    pub fn strict_xml(mut self, strict: bool) -> Self {
        self.strict_xml = strict;
        self
    }
}

impl std::fmt::Debug for TemplateConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateConfig")
            .field("prefix", &self.prefix)
            .field("namespace_uri", &self.namespace_uri)
            .field("strict_xml", &self.strict_xml)
            .field("condition_faults", &self.condition_faults)
            .finish_non_exhaustive()
    }
}
