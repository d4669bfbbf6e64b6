//! Error and diagnostic types for dispatch generation.
//!
//! Configuration errors abort the artifact being generated. Diagnostics are
//! recoverable and travel next to the rendered text.

use std::fmt;

use thiserror::Error;

/// Fatal configuration errors raised while generating one artifact.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum GenError {
    /// Data type tag without a known type alias set.
    #[error("unsupported data type: {0}")]
    UnsupportedDataType(String),

    /// Hierarchy references a variable that has no runtime expression.
    #[error("wrapper hierarchy contains {0} but no binding was provided for it")]
    MissingWrapperBinding(String),

    /// Two descriptors of one family synthesize the same symbol.
    #[error("naming collision: {0} is declared more than once")]
    NamingCollision(String),

    /// The hierarchy is exhausted but more than one variant is left.
    #[error("hierarchy {path} does not separate variants: {}", .names.join(", "))]
    UnresolvedPartition { path: String, names: Vec<String> },

    /// Duplicate parameter or padding not at the deepest level.
    #[error("invalid hierarchy: {0}")]
    InvalidHierarchy(String),

    #[error("unknown dispatch parameter: {0}")]
    UnknownParameter(String),

    #[error("unknown padding scheme: {0}")]
    UnknownPadding(String),

    #[error("unknown op kind: {0}")]
    UnknownOp(String),

    #[error("unknown layout: {0}")]
    UnknownLayout(String),

    #[error("unknown dispatch style: {0}")]
    UnknownStyle(String),

    /// Missing, duplicated or constrained generic variant.
    #[error("invalid generic variant: {0}")]
    InvalidGeneric(String),

    #[error("{name} declares {count} core routines, at most 10 are supported")]
    TooManyCoreRoutines { name: String, count: usize },

    /// Strict substitution hit a placeholder with no value.
    #[error("template {template} has no value for ${key}")]
    Template { template: String, key: String },
}

pub type GenResult<T> = std::result::Result<T, GenError>;

/// Recoverable findings reported during generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// Several siblings at one level resolve to an always-true padding
    /// predicate. Only `kept` is reachable.
    AmbiguousPaddingBranch {
        path: String,
        kept: String,
        shadowed: Vec<String>,
    },
    /// A non-generic variant without any condition ends the flat chain early.
    UnreachableVariants { after: String, names: Vec<String> },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::AmbiguousPaddingBranch {
                path,
                kept,
                shadowed,
            } => write!(
                f,
                "ambiguous padding branch at {path}: keeping {kept}, shadowed {}",
                shadowed.join(", ")
            ),
            Diagnostic::UnreachableVariants { after, names } => write!(
                f,
                "{after} matches unconditionally, unreachable: {}",
                names.join(", ")
            ),
        }
    }
}
