//! API model entries.
//!
//! These are the read-only inputs handed over by the API extractor:
//!
//! - [`ClassEntry`] - Classes and namespaces
//! - [`FunctionEntry`] - Functions, methods, constructors and operators
//! - [`ArgumentEntry`] - Function parameters
//! - [`EnumEntry`] - Enumerations (and their flags types)
//! - [`FieldEntry`] - Public data members

mod argument;
mod class;
mod enum_entry;
mod field;
mod function;

pub use argument::ArgumentEntry;
pub use class::ClassEntry;
pub use enum_entry::{EnumEntry, EnumValue};
pub use field::FieldEntry;
pub use function::{FunctionEntry, FunctionKind};
