//! wrapgen Generator
//!
//! Turns a validated API model into the C++ sources of a dynamic-language
//! extension module.
//!
//! ## Architecture
//!
//! - **Phase 1 (Classes)**: every wrapped class gets its own source file with
//!   dispatchers, protocol tables, the type object and its registration
//!   function. A failing class is reported and left out.
//! - **Phase 2 (Module)**: the shared header and the module file registering
//!   everything that was generated.
//!
//! ## Modules
//!
//! - [`class`]: Per-class source file
//! - [`context`]: Read-only generation context
//! - [`conversion`]: Converter spellings and type checks
//! - [`enums`]: Enum and flags types
//! - [`forward`]: Dispatchers for constructors, methods and global functions
//! - [`header`]: The module header
//! - [`module`]: Two-phase module builder
//! - [`multiple_inheritance`]: Pointer offsets and special casts
//! - [`naming`]: Symbol and file naming
//! - [`overload`]: Overload decisor
//! - [`ownership`]: Ownership transfer and reference keeping
//! - [`protocols`]: Method, number, sequence, comparison and attribute slots
//! - [`signals`]: Signal registration
//! - [`signature`]: Human-readable signatures for error messages
//! - [`type_discovery`]: Dynamic type discovery and extended converters
//! - [`type_object`]: Type object slot tables
//! - [`virtual_bridge`]: Native trampoline subclasses
//! - [`writer`]: Indented source writer

pub mod class;
pub mod context;
pub mod conversion;
pub mod enums;
pub mod forward;
pub mod header;
pub mod module;
pub mod multiple_inheritance;
pub mod naming;
pub mod overload;
pub mod ownership;
pub mod protocols;
pub mod signals;
pub mod signature;
pub mod type_discovery;
pub mod type_object;
pub mod virtual_bridge;
pub mod writer;

pub use class::{ClassArtifact, ClassGenerator};
pub use context::GeneratorContext;
pub use header::generate_header;
pub use module::{GeneratedFile, ModuleBuilder, ModuleOutput, registration_order};
pub use overload::OverloadDecisor;
pub use type_object::TypeSlots;
pub use virtual_bridge::{TrampolineDescriptor, VirtualBridge};
pub use writer::CodeWriter;

// Errors live in core so callers need only one import
pub use wrapgen_core::{GenerationError, GenerationErrors};
