//! Semantic errors detected while lowering
//!
//! Lowering does not stop at the first problem. A failing declaration or
//! statement is recorded, logged, and skipped; lowering resumes at the next
//! declaration or statement. If anything was recorded, the whole run fails
//! with [`LoweringErrors`] and no module is produced.

use crate::parser::ast::SourceLocation;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SemanticError {
    #[error("Semantic error at {location}: '{name}' is already declared in this scope")]
    Redeclared {
        name: String,
        location: SourceLocation,
    },

    #[error("Semantic error at {location}: '{name}' is not declared")]
    Unbound {
        name: String,
        location: SourceLocation,
    },

    #[error("Semantic error at {location}: cannot assign to constant '{name}'")]
    AssignToConstant {
        name: String,
        location: SourceLocation,
    },

    #[error("Semantic error at {location}: '{name}' is not an array and cannot be indexed")]
    NotAnArray {
        name: String,
        location: SourceLocation,
    },

    #[error("Semantic error at {location}: array '{name}' used without an index")]
    MissingIndex {
        name: String,
        location: SourceLocation,
    },

    #[error("Semantic error at {location}: array '{name}' has invalid bounds {from} .. {to}")]
    InvalidArrayBounds {
        name: String,
        from: i64,
        to: i64,
        location: SourceLocation,
    },

    #[error("Semantic error at {location}: variable '{name}' has no type")]
    MissingType {
        name: String,
        location: SourceLocation,
    },

    #[error("Semantic error at {location}: 'break' outside of a loop")]
    BreakOutsideLoop { location: SourceLocation },

    #[error("Semantic error at {location}: unknown procedure or function '{name}'")]
    UnknownRoutine {
        name: String,
        location: SourceLocation,
    },

    #[error("Semantic error at {location}: '{name}' expects {expected} argument(s), found {found}")]
    ArityMismatch {
        name: String,
        expected: usize,
        found: usize,
        location: SourceLocation,
    },

    #[error("Semantic error at {location}: procedure '{name}' does not return a value")]
    NoReturnValue {
        name: String,
        location: SourceLocation,
    },

    #[error("Semantic error at {location}: '{name}' does not match its earlier declaration")]
    SignatureMismatch {
        name: String,
        location: SourceLocation,
    },

    #[error("Semantic error at {location}: '{name}' already has a body")]
    RoutineRedefined {
        name: String,
        location: SourceLocation,
    },

    #[error("Semantic error at {location}: {what} is not supported")]
    Unsupported {
        what: &'static str,
        location: SourceLocation,
    },

    #[error("Semantic error: empty expression")]
    EmptyExpression,
}

impl SemanticError {
    pub fn location(&self) -> Option<SourceLocation> {
        match self {
            SemanticError::Redeclared { location, .. }
            | SemanticError::Unbound { location, .. }
            | SemanticError::AssignToConstant { location, .. }
            | SemanticError::NotAnArray { location, .. }
            | SemanticError::MissingIndex { location, .. }
            | SemanticError::InvalidArrayBounds { location, .. }
            | SemanticError::MissingType { location, .. }
            | SemanticError::BreakOutsideLoop { location }
            | SemanticError::UnknownRoutine { location, .. }
            | SemanticError::ArityMismatch { location, .. }
            | SemanticError::NoReturnValue { location, .. }
            | SemanticError::SignatureMismatch { location, .. }
            | SemanticError::RoutineRedefined { location, .. }
            | SemanticError::Unsupported { location, .. } => Some(*location),
            SemanticError::EmptyExpression => None,
        }
    }
}

/// Every semantic error of one lowering run, in source order of discovery.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", summarize(.errors))]
pub struct LoweringErrors {
    pub errors: Vec<SemanticError>,
}

fn summarize(errors: &[SemanticError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}
