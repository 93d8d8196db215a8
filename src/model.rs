//! Serialized form of an API model.

use serde::{Deserialize, Serialize};

use wrapgen_core::{ClassEntry, EnumEntry, FunctionEntry, RegistrationError};
use wrapgen_registry::ApiRegistry;

/// Everything the extractor found in one module, as it appears in JSON.
///
/// Enums listed here are global; nested enums belong to their class.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiModel {
    pub classes: Vec<ClassEntry>,
    pub functions: Vec<FunctionEntry>,
    pub enums: Vec<EnumEntry>,
}

impl ApiModel {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Add every entry to `registry`, stopping at the first rejected one.
    pub fn register_into(self, registry: &mut ApiRegistry) -> Result<(), RegistrationError> {
        for class in self.classes {
            registry.register_class(class)?;
        }
        for function in self.functions {
            registry.register_function(function)?;
        }
        for entry in self.enums {
            registry.register_enum(entry)?;
        }
        Ok(())
    }
}
