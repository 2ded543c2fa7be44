use thiserror::Error;

pub type FormResult<T> = Result<T, FormError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormError {
    // --- buffer stack invariants ---

    #[error("Buffer stack is empty: the root buffer is missing")]
    EmptyStack,

    #[error("Unbalanced buffer stack: expected depth {expected}, found {actual}")]
    UnbalancedStack { expected: usize, actual: usize },

    // --- rendering collaborators ---

    #[error("Unable to find input renderer for '{kind}' (searched: {searched})")]
    UnknownInput { kind: String, searched: String },

    #[error("Unknown field '{field}' on model '{model}'")]
    UnknownField { model: String, field: String },

    #[error("Unknown association '{association}' on model '{model}'")]
    UnknownAssociation { model: String, association: String },

    #[error("Invalid name '{name}': must be a lowercase identifier")]
    InvalidName { name: String },

    #[error("Render error: {0}")]
    Render(String),

    // --- loading ---

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("YAML error: {0}")]
    Yaml(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl From<serde_yaml::Error> for FormError {
    fn from(err: serde_yaml::Error) -> Self {
        FormError::Yaml(err.to_string())
    }
}

impl From<std::io::Error> for FormError {
    fn from(err: std::io::Error) -> Self {
        FormError::Io(err.to_string())
    }
}
