//! Errors raised at the native/dynamic call boundary.
//!
//! Every variant corresponds to an exception generated code raises. They are
//! recoverable: the call that produced one has not registered anything nor
//! changed ownership.

use thiserror::Error;

/// Result alias for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;

// ============================================================================
// Conversion Errors
// ============================================================================

/// A dynamic value could not become the requested native value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: &'static str, actual: String },

    #[error("integer overflow: {value} does not fit in {target_type}")]
    IntegerOverflow { value: i128, target_type: &'static str },

    #[error("Sequence of ints expected")]
    IntSequenceExpected,
}

// ============================================================================
// Runtime Errors
// ============================================================================

/// Errors surfaced to dynamic callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    /// No overload accepts the supplied arguments.
    #[error("'{function}' called with wrong argument types: {received}. Supported signatures: {}", .signatures.join(", "))]
    WrongArguments {
        function: String,
        received: String,
        signatures: Vec<String>,
    },

    #[error("{function}(): too many arguments")]
    TooManyArguments { function: String },

    #[error("{function}(): not enough arguments")]
    NotEnoughArguments { function: String },

    #[error("{function}(): got multiple values for keyword argument '{keyword}'.")]
    MultipleValuesForKeyword { function: String, keyword: String },

    /// A pure virtual method was called without a dynamic override.
    #[error("pure virtual method '{class}.{method}()' not implemented.")]
    NotImplemented { class: String, method: String },

    #[error("'{class}' represents a C++ abstract class and cannot be instantiated")]
    AbstractInstantiation { class: String },

    /// The native object behind a wrapper was deleted or handed away.
    #[error("Internal C++ object ({class}) already deleted.")]
    InvalidObject { class: String },

    #[error("Invalid return value in function {function}, expected {expected}, got {actual}.")]
    InvalidReturnValue {
        function: String,
        expected: String,
        actual: String,
    },

    /// An override returned an object nothing else references.
    #[error("Returning last python reference on virtual function: {function}")]
    LastReference { function: String },

    #[error("operator not implemented.")]
    OperatorNotImplemented,

    #[error("'{attribute}' may not be deleted")]
    AttributeDeletion { attribute: String },

    #[error("wrong type attributed to '{attribute}', '{expected}' or convertible type expected")]
    WrongAttributeType { attribute: String, expected: String },

    /// A second wrapper was registered for an address that already has one.
    #[error("native object at {address:#x} already has a wrapper")]
    DoubleRegistration { address: usize },

    #[error(transparent)]
    Conversion(#[from] ConversionError),
}
