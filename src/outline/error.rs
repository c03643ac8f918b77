//! Internal faults: invariant violations that halt a compilation unit.
//!
//! These are never user errors: they mean the event source and the
//! builder disagree about structure (a begin without its end, a pop of the
//! wrong scope kind). User-facing problems go through
//! [`Diagnostic`](super::Diagnostic) instead.

use thiserror::Error;

use super::fragments::DeclarationKind;
use super::scope::TypeScopeKind;

/// Result type for operations that can hit an internal fault.
pub type BuildResult<T> = Result<T, InternalError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InternalError {
    #[error("unexpected type scope: expected {expected}, found {found}")]
    ScopeKindMismatch {
        expected: TypeScopeKind,
        found: TypeScopeKind,
    },

    #[error("cannot pop the library scope")]
    ScopeUnderflow,

    #[error("no {0} parameter namespace is open")]
    MissingParameterNameSpace(&'static str),

    #[error("unexpected declaration fragment: expected {expected}, found {found}")]
    DeclarationKindMismatch {
        expected: DeclarationKind,
        found: DeclarationKind,
    },

    #[error("no declaration is open for {0}")]
    NoCurrentDeclaration(&'static str),

    #[error("omitted type name in constructor reference outside an enum")]
    OmittedTypeNameOutsideEnum,

    #[error("{stack} stack not empty at end of unit ({depth} left)")]
    StackResidue { stack: &'static str, depth: usize },

    #[error("type parameter '{name}' was collected twice")]
    TypeParameterCollectedTwice { name: String },

    #[error("unknown type parameter id")]
    UnknownTypeParameter,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_mismatch_message_names_both_kinds() {
        let err = InternalError::ScopeKindMismatch {
            expected: TypeScopeKind::MemberTypeParameters,
            found: TypeScopeKind::Library,
        };
        let message = err.to_string();
        assert!(message.contains("member type parameters"));
        assert!(message.contains("library"));
    }

    #[test]
    fn test_residue_message() {
        let err = InternalError::StackResidue {
            stack: "declaration",
            depth: 2,
        };
        assert_eq!(err.to_string(), "declaration stack not empty at end of unit (2 left)");
    }
}
