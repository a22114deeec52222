//! Error types for celsql.

use thiserror::Error;

/// The main error type for celsql operations.
///
/// Every failure is terminal: a conversion either produces the whole SQL
/// fragment or one of these.
#[derive(Debug, Error)]
pub enum CelSqlError {
    /// Failed to parse the expression source.
    #[error("Parse error at position {position}: {message}")]
    Parse { position: usize, message: String },

    /// The expression does not type-check against the environment.
    #[error("Check error: {0}")]
    Check(String),

    /// A node reached the converter without a resolved type.
    #[error("Missing type for expression: {0}")]
    MissingType(String),

    /// Node kind or function with no registered translation.
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// Operator or function applied to operands it cannot translate.
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    /// Map/struct field name that is not a bare SQL identifier.
    #[error("Invalid identifier: '{0}'")]
    InvalidIdentifier(String),

    /// Regular expression that fails to compile.
    #[error("Malformed pattern {pattern:?}: {message}")]
    MalformedPattern { pattern: String, message: String },

    /// Filter function called without an argument.
    #[error("Function '{0}' requires an argument")]
    EmptyArguments(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CelSqlError {
    /// Create a parse error at the given position.
    pub fn parse(position: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            position,
            message: message.into(),
        }
    }

    /// Create a type-check error.
    pub fn check(message: impl Into<String>) -> Self {
        Self::Check(message.into())
    }

    /// Create an unsupported-construct error.
    pub fn unsupported(construct: impl Into<String>) -> Self {
        Self::Unsupported(construct.into())
    }

    /// Create a type mismatch error.
    pub fn mismatch(message: impl Into<String>) -> Self {
        Self::TypeMismatch(message.into())
    }

    /// Create a malformed pattern error.
    pub fn pattern(pattern: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedPattern {
            pattern: pattern.into(),
            message: message.into(),
        }
    }
}

/// Result type alias for celsql operations.
pub type CelSqlResult<T> = Result<T, CelSqlError>;
