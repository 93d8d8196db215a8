//! wrapgen - generates dynamic-language bindings for C++ APIs.
//!
//! Given a model of a C++ API (classes, functions, enums and the rules that
//! customize them), wrapgen emits the C++ source of an extension module:
//! one wrapper file per class, a shared header and the module file.
//!
//! ## Crates
//!
//! - [`core`]: API model, type checks, customization rules and options
//! - [`registry`]: model storage, class hierarchy and overload groups
//! - [`generator`]: source generation
//! - [`runtime`]: in-process model of the runtime contracts the generated
//!   code relies on
//!
//! ## Example
//!
//! ```
//! use wrapgen::{BindingUnit, core::{ClassEntry, CppType, FunctionEntry, PrimitiveKind}};
//!
//! let mut unit = BindingUnit::for_module("sample");
//! unit.add_class(
//!     ClassEntry::value("Point")
//!         .with_function(FunctionEntry::method("x", CppType::primitive(PrimitiveKind::Double)).as_const()),
//! ).unwrap();
//!
//! let output = unit.build().unwrap();
//! assert!(output.file("point_wrapper.cpp").is_some());
//! ```

mod model;
mod unit;

pub use wrapgen_core as core;
pub use wrapgen_generator as generator;
pub use wrapgen_registry as registry;
pub use wrapgen_runtime as runtime;

pub use model::ApiModel;
pub use unit::{BindingUnit, BuildError, generate_module};

pub use wrapgen_core::{GenerationError, GeneratorOptions, RegistrationError};
pub use wrapgen_generator::{GeneratedFile, ModuleOutput};
