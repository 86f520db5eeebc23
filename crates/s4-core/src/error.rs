//! Registration and dispatch errors, plus the ambiguity warning.
//!
//! Registration errors abort the offending call before anything is mutated.
//! Dispatch errors are surfaced to the caller of `dispatch`/`call_next`.
//! [`AmbiguousDispatch`] is not an error: resolution still produces a
//! winner, and the warning rides alongside it.

use std::fmt;

use serde::Serialize;

use crate::class::{render_signature, ClassName, MethodId};

/// An error raised while registering classes, generics or methods, or while
/// dispatching a call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DispatchError {
    /// Registering `class` would make it its own ancestor.
    Cycle {
        class: ClassName,
        /// The offending chain, starting and ending with `class`.
        cycle_path: Vec<ClassName>,
    },
    /// `class` was registered sealed and cannot be redefined.
    SealedClass { class: ClassName },
    /// `ANY` and `missing` are dispatch tokens, not classes.
    ReservedClassName { name: ClassName },
    /// A generic was re-registered with a different number of dispatch
    /// parameters.
    DuplicateGeneric {
        name: String,
        existing_arity: usize,
        requested_arity: usize,
    },
    /// A method or call named a generic that was never registered.
    UnknownGeneric { name: String },
    /// A signature or call tuple does not have one class per dispatch
    /// parameter.
    ArityMismatch {
        generic: String,
        expected: usize,
        found: usize,
    },
    /// No registered signature applies to the call's classes.
    NoApplicableMethod {
        generic: String,
        classes: Vec<ClassName>,
    },
    /// `call_next` found nothing less specific than the current method.
    NoNextMethod {
        generic: String,
        current: Vec<ClassName>,
        classes: Vec<ClassName>,
    },
    /// `call_next` was given an id that does not belong to any generic.
    UnknownMethod { method: MethodId },
    /// A handler failed; the message is propagated unchanged.
    Handler { generic: String, message: String },
}

impl DispatchError {
    /// A stable code per variant, used by diagnostics.
    pub fn code(&self) -> &'static str {
        match self {
            DispatchError::Cycle { .. } => "D0001",
            DispatchError::SealedClass { .. } => "D0002",
            DispatchError::ReservedClassName { .. } => "D0003",
            DispatchError::DuplicateGeneric { .. } => "D0004",
            DispatchError::UnknownGeneric { .. } => "D0005",
            DispatchError::ArityMismatch { .. } => "D0006",
            DispatchError::NoApplicableMethod { .. } => "D0007",
            DispatchError::NoNextMethod { .. } => "D0008",
            DispatchError::UnknownMethod { .. } => "D0009",
            DispatchError::Handler { .. } => "D0010",
        }
    }

    /// Whether this error came from a registration call (as opposed to a
    /// dispatch).
    pub fn is_registration_error(&self) -> bool {
        matches!(
            self,
            DispatchError::Cycle { .. }
                | DispatchError::SealedClass { .. }
                | DispatchError::ReservedClassName { .. }
                | DispatchError::DuplicateGeneric { .. }
                | DispatchError::UnknownGeneric { .. }
                | DispatchError::ArityMismatch { .. }
        )
    }
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::Cycle { class, cycle_path } => {
                write!(f, "class `{}` would be its own ancestor: ", class)?;
                for (i, step) in cycle_path.iter().enumerate() {
                    if i > 0 {
                        write!(f, " -> ")?;
                    }
                    write!(f, "{}", step)?;
                }
                Ok(())
            }
            DispatchError::SealedClass { class } => {
                write!(f, "class `{}` is sealed and cannot be redefined", class)
            }
            DispatchError::ReservedClassName { name } => {
                write!(f, "`{}` is a reserved dispatch token, not a class", name)
            }
            DispatchError::DuplicateGeneric {
                name,
                existing_arity,
                requested_arity,
            } => write!(
                f,
                "generic `{}` already dispatches on {} argument(s), cannot redefine with {}",
                name, existing_arity, requested_arity
            ),
            DispatchError::UnknownGeneric { name } => {
                write!(f, "no generic function named `{}`", name)
            }
            DispatchError::ArityMismatch {
                generic,
                expected,
                found,
            } => write!(
                f,
                "generic `{}` dispatches on {} argument(s), found {}",
                generic, expected, found
            ),
            DispatchError::NoApplicableMethod { generic, classes } => write!(
                f,
                "no method of `{}` applies to ({})",
                generic,
                render_signature(classes)
            ),
            DispatchError::NoNextMethod {
                generic,
                current,
                classes,
            } => write!(
                f,
                "no next method of `{}` after ({}) for ({})",
                generic,
                render_signature(current),
                render_signature(classes)
            ),
            DispatchError::UnknownMethod { method } => {
                write!(f, "{} is not registered", method)
            }
            DispatchError::Handler { generic, message } => {
                write!(f, "method of `{}` failed: {}", generic, message)
            }
        }
    }
}

impl std::error::Error for DispatchError {}

/// Two or more signatures tied for the smallest total distance.
///
/// The winner is the first by canonical rendering. The warning names the
/// winner and every runner-up so the caller can register a more specific
/// method to settle it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AmbiguousDispatch {
    pub generic: String,
    /// The concrete classes of the call.
    pub classes: Vec<ClassName>,
    /// The shared total distance.
    pub distance: u64,
    pub winner: Vec<ClassName>,
    pub runners_up: Vec<Vec<ClassName>>,
}

impl AmbiguousDispatch {
    pub const CODE: &'static str = "W0001";
}

impl fmt::Display for AmbiguousDispatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ambiguous dispatch of `{}` for ({}): chose ({}) over ",
            self.generic,
            render_signature(&self.classes),
            render_signature(&self.winner)
        )?;
        for (i, other) in self.runners_up.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "({})", render_signature(other))?;
        }
        write!(f, " at distance {}", self.distance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::classes;

    #[test]
    fn cycle_display() {
        let err = DispatchError::Cycle {
            class: "A".into(),
            cycle_path: classes(["A", "C", "B", "A"]),
        };
        assert_eq!(
            err.to_string(),
            "class `A` would be its own ancestor: A -> C -> B -> A"
        );
    }

    #[test]
    fn no_applicable_display() {
        let err = DispatchError::NoApplicableMethod {
            generic: "area".to_string(),
            classes: classes(["character", "missing"]),
        };
        assert_eq!(err.to_string(), "no method of `area` applies to (character#missing)");
        assert!(!err.is_registration_error());
    }

    #[test]
    fn registration_errors_are_classified() {
        assert!(DispatchError::SealedClass { class: "A".into() }.is_registration_error());
        assert!(DispatchError::UnknownGeneric { name: "f".into() }.is_registration_error());
        assert!(!DispatchError::UnknownMethod { method: MethodId(3) }.is_registration_error());
    }

    #[test]
    fn ambiguity_display() {
        let warning = AmbiguousDispatch {
            generic: "foo".to_string(),
            classes: classes(["A2", "A2"]),
            distance: 2,
            winner: classes(["A1", "A2"]),
            runners_up: vec![classes(["A2", "A1"])],
        };
        insta::assert_snapshot!(
            warning.to_string(),
            @"ambiguous dispatch of `foo` for (A2#A2): chose (A1#A2) over (A2#A1) at distance 2"
        );
    }
}
