use jugl_dom::MarkupError;

/// Errors raised while parsing or evaluating a template expression.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalError {
    #[error("syntax error at offset {offset}: {message}")]
    Syntax { message: String, offset: usize },

    #[error("'{0}' is not defined")]
    UndefinedVariable(String),

    #[error("'{0}' is not a function")]
    NotCallable(String),

    #[error("type error: {0}")]
    Type(String),

    #[error("{name}() expects {expected} argument(s), got {found}")]
    Arity {
        name: String,
        expected: String,
        found: usize,
    },
}

impl EvalError {
    pub(crate) fn syntax(message: impl Into<String>, offset: usize) -> Self {
        EvalError::Syntax {
            message: message.into(),
            offset,
        }
    }

    pub(crate) fn type_error(message: impl Into<String>) -> Self {
        EvalError::Type(message.into())
    }

    pub(crate) fn arity(name: &str, expected: impl Into<String>, found: usize) -> Self {
        EvalError::Arity {
            name: name.to_string(),
            expected: expected.into(),
            found,
        }
    }
}

pub type EvalResult<T> = Result<T, EvalError>;

/// Errors raised while processing a template.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("error evaluating {attribute}=\"{expression}\" on {node}: {source}")]
    Expression {
        attribute: String,
        expression: String,
        node: String,
        source: EvalError,
    },

    #[error("could not parse the result of {attribute} on {node} as markup: {source}")]
    Markup {
        attribute: String,
        node: String,
        source: MarkupError,
    },

    #[error("malformed {attribute} statement {value:?} on {node}: expected `name expression`")]
    MalformedStatement {
        attribute: String,
        value: String,
        node: String,
    },

    #[error("Element id not found: {0}")]
    ElementNotFound(String),

    #[error("document has no root element")]
    EmptyDocument,

    #[error("template has not been loaded")]
    NotLoaded,

    #[error("template root node #{0} was consumed by an earlier in-place process")]
    RootConsumed(usize),

    #[error("template context must be an object, got {0}")]
    InvalidContext(String),
}

impl TemplateError {
    /// The underlying expression error, if this fault came from evaluating an expression.
    pub fn eval_error(&self) -> Option<&EvalError> {
        match self {
            TemplateError::Expression { source, .. } => Some(source),
            _ => None,
        }
    }
}
