use thiserror::Error;

use crate::archetype::ArchetypeId;
use crate::component::{ComponentId, ElementType};

/// Error taxonomy for precondition violations and addressable lookups across
/// the archetype storage core.
///
/// Most operations in this crate run under precondition contracts rather than
/// defensive validation (see module docs on `archetype` and `registry`): a
/// caller that violates one gets a panic from [`assert_precondition`] in a
/// debug build, carrying this type's `PreconditionViolation` message, and
/// undefined behavior from an elided check in a release build. This type
/// also covers the subset of checks that are part of the *public* contract
/// regardless of build profile (an archetype id or component id supplied by
/// the caller is simply data, not an internal invariant) and genuinely
/// recoverable validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EcsError {
    #[error("archetype {0:?} does not exist in this registry")]
    UnknownArchetype(ArchetypeId),

    #[error("component {0:?} is not present on the addressed archetype")]
    UnknownComponent(ComponentId),

    #[error("field {field:?} is not present on component {component:?}")]
    UnknownField {
        component: ComponentId,
        field: &'static str,
    },

    #[error("value for field {field:?} on component {component:?} does not fit its column type")]
    ValidationFailure {
        component: ComponentId,
        field: &'static str,
    },

    #[error("column holds element type {expected:?} but was given a value of type {actual:?}")]
    ElementTypeMismatch {
        expected: ElementType,
        actual: ElementType,
    },

    #[error("component {0:?} appears more than once in the same signature")]
    DuplicateComponentInSchema(ComponentId),

    #[error(
        "write_fields for component {component:?} expected {expected} values but got {actual}"
    )]
    SchemaFieldCountMismatch {
        component: ComponentId,
        expected: usize,
        actual: usize,
    },

    #[error("precondition violated: {0}")]
    PreconditionViolation(&'static str),
}

/// Panics with [`EcsError::PreconditionViolation`]'s message if `condition`
/// is false. Only active when debug assertions are compiled in — release
/// builds elide the check entirely, matching spec §4.6's "precondition
/// contracts rather than defensive validation in hot paths" policy. The
/// typed error's `Display` output is what reaches the panic message, so a
/// caller in a debug build (or a test, via `catch_unwind`) can assert on a
/// stable category string rather than an ad hoc literal.
#[track_caller]
pub(crate) fn assert_precondition(condition: bool, message: &'static str) {
    if cfg!(debug_assertions) && !condition {
        panic!("{}", EcsError::PreconditionViolation(message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precondition_violation_panics_with_its_display_message() {
        let result = std::panic::catch_unwind(|| {
            assert_precondition(false, "example violation");
        });
        let payload = result.expect_err("a false condition must panic");
        let message = payload
            .downcast_ref::<String>()
            .expect("panic payload should be a message string");
        assert_eq!(
            message,
            &EcsError::PreconditionViolation("example violation").to_string()
        );
    }

    #[test]
    fn precondition_holds_is_a_noop() {
        // Must not panic.
        assert_precondition(true, "unreachable");
    }
}
