//! Shared vocabulary for the wrapgen binding generator.
//!
//! This crate holds everything the generator and runtime model agree on:
//!
//! - [`TypeHash`] - deterministic identities for types and functions
//! - [`CppType`], [`TypeCategory`], [`TypeCheck`] - how native values cross
//!   into the dynamic side and how generated code tests them
//! - [`ClassEntry`], [`FunctionEntry`], [`EnumEntry`] - the extracted API model
//! - [`FunctionModification`] and friends - pre-parsed customization rules
//! - [`OwnershipModification`] - ownership directives
//! - [`GenerationError`], [`RegistrationError`] - generation-time errors
//! - [`GeneratorOptions`] - configuration
//! - [`normalize_signature`] - canonical signal/slot signatures

pub mod entries;
pub mod error;
pub mod modifications;
pub mod operator;
pub mod options;
pub mod signature;
pub mod type_hash;
pub mod types;

pub use entries::{
    ArgumentEntry, ClassEntry, EnumEntry, EnumValue, FieldEntry, FunctionEntry, FunctionKind,
};
pub use error::{GenerationError, GenerationErrors, RegistrationError};
pub use modifications::{
    ArgumentModification, CodeLanguage, CodeSnip, ConversionRule, FunctionModification,
    SnipPosition,
};
pub use operator::OperatorKind;
pub use options::GeneratorOptions;
pub use signature::normalize_signature;
pub use type_hash::TypeHash;
pub use types::{
    ArgIndex, ArgumentProbe, ClassFlags, ContainerKind, CppType, FunctionFlags, Indirection,
    LinkAction, OwnershipDirection, OwnershipModification, OwnershipPolicy, OwnershipState,
    PrimitiveKind,
    ReferenceAction, TypeCategory, TypeCheck,
};
