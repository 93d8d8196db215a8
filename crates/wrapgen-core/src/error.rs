//! Error types for the generation pipeline.
//!
//! Generation has two error domains that never mix:
//!
//! ```text
//! Generation time (this module)
//! ├── RegistrationError - inconsistent API model (duplicates, unknown bases)
//! └── GenerationError   - a class cannot be generated as customized
//!
//! Runtime (wrapgen-runtime)
//! └── RuntimeError      - raised by generated code in the target program
//! ```
//!
//! A [`GenerationError`] is fatal for the class it names only; the module
//! builder records it and continues with unrelated classes.

use thiserror::Error;

use crate::ArgIndex;

// ============================================================================
// Registration Errors
// ============================================================================

/// Errors raised while loading the API model into the registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    /// A class with this qualified name is already registered.
    #[error("class '{0}' is already registered")]
    DuplicateClass(String),

    /// An enum with this qualified name is already registered.
    #[error("enum '{0}' is already registered")]
    DuplicateEnum(String),

    /// A global function with the same signature is already registered.
    #[error("function '{0}' is already registered")]
    DuplicateFunction(String),

    /// A class names a base that is not part of the model.
    #[error("class '{class}' derives from unknown base '{base}'")]
    UnknownBase {
        /// Derived class.
        class: String,
        /// Missing base.
        base: String,
    },

    /// The inheritance graph contains a cycle through this class.
    #[error("inheritance cycle through class '{0}'")]
    InheritanceCycle(String),
}

// ============================================================================
// Generation Errors
// ============================================================================

/// A fatal problem generating one class.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    /// A safe-default return needs a value class that has no usable constructor.
    #[error("class '{class}' does not have a default constructor, needed by '{context}'")]
    NoDefaultConstructor {
        /// Class lacking a constructor.
        class: String,
        /// Function whose trampoline needs the value.
        context: String,
    },

    /// No minimal value can be synthesized for a type.
    #[error("cannot synthesize a minimal value of type '{ty}' for '{context}'")]
    UnconstructibleMinimalValue {
        /// Type spelling.
        ty: String,
        /// Function whose trampoline needs the value.
        context: String,
    },

    /// A removed argument has neither a default value nor a conversion rule.
    #[error("No way to call \"{class}::{signature}\" with the modifications described in the type system file")]
    RemovedArgumentWithoutValue {
        /// Owning class (or module for globals).
        class: String,
        /// Function signature.
        signature: String,
    },

    /// An ancestor is reachable through several non-virtual paths.
    #[error("cannot resolve special cast from '{class}' to ambiguous ancestor '{ancestor}'")]
    AmbiguousSpecialCast {
        /// Most derived class.
        class: String,
        /// Ambiguous ancestor.
        ancestor: String,
    },

    /// A modification refers to an argument the function does not have.
    #[error("invalid argument index {index} on function modification of '{function}'")]
    UnknownArgumentIndex {
        /// Function signature.
        function: String,
        /// Offending index.
        index: ArgIndex,
    },

    /// More than one exclusive ownership directive targets the same index.
    #[error("conflicting ownership directives for {index} of '{function}'")]
    ConflictingOwnership {
        /// Function signature.
        function: String,
        /// Index with several directives.
        index: ArgIndex,
    },

    /// A class name could not be resolved.
    #[error("unknown class '{0}'")]
    UnknownClass(String),

    /// The module entry point cannot be produced.
    #[error("can't initialize module {module}: {reason}")]
    ModuleInit {
        /// Module name.
        module: String,
        /// Why finalization failed.
        reason: String,
    },
}

/// Several generation errors collected over a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationErrors {
    errors: Vec<GenerationError>,
}

impl GenerationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: GenerationError) {
        self.errors.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &GenerationError> {
        self.errors.iter()
    }

    /// `Ok(value)` if nothing was collected, otherwise all errors.
    pub fn into_result<T>(self, value: T) -> Result<T, Vec<GenerationError>> {
        if self.errors.is_empty() {
            Ok(value)
        } else {
            Err(self.errors)
        }
    }
}

impl Extend<GenerationError> for GenerationErrors {
    fn extend<I: IntoIterator<Item = GenerationError>>(&mut self, iter: I) {
        self.errors.extend(iter);
    }
}

impl IntoIterator for GenerationErrors {
    type Item = GenerationError;
    type IntoIter = std::vec::IntoIter<GenerationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}
