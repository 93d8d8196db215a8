//! Generator configuration.
//!
//! [`GeneratorOptions`] is deserializable so callers can keep it next to the
//! customization rules as JSON. Every field has a default; an empty object is a
//! valid configuration.
//!
//! ```
//! use wrapgen_core::GeneratorOptions;
//!
//! let options = GeneratorOptions::from_json(r#"{ "module_name": "sample" }"#).unwrap();
//! assert!(options.verbose_error_messages);
//! assert_eq!(options.module_name, "sample");
//! ```

use serde::{Deserialize, Serialize};

/// Switches controlling what the generator emits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorOptions {
    /// Name of the generated dynamic-language module.
    pub module_name: String,
    /// List every valid signature in wrong-argument errors; terse otherwise.
    pub verbose_error_messages: bool,
    /// Link a constructor argument named `parent` of object type to the new object.
    pub constructor_parent_heuristic: bool,
    /// Link object/value-pointer results of non-static methods to `self`.
    pub return_value_heuristic: bool,
    /// Emit signal/slot/property reflection support for reflected classes.
    pub enable_pyside_extensions: bool,
    /// Access protected members through the trampoline subclass instead of
    /// redefining `protected` as `public`.
    pub avoid_protected_hack: bool,
    /// Signal capacity of a dynamic meta-object.
    pub max_dynamic_signals: usize,
    /// Slot capacity of a dynamic meta-object.
    pub max_dynamic_slots: usize,
    /// Slot capacity of the global receiver's meta-object.
    pub global_receiver_limit: usize,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            module_name: "module".to_string(),
            verbose_error_messages: true,
            constructor_parent_heuristic: true,
            return_value_heuristic: true,
            enable_pyside_extensions: false,
            avoid_protected_hack: false,
            max_dynamic_signals: 50,
            max_dynamic_slots: 50,
            global_receiver_limit: 500,
        }
    }
}

impl GeneratorOptions {
    /// Options for a named module, everything else default.
    pub fn for_module(module_name: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
            ..Self::default()
        }
    }

    /// Parse options from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
