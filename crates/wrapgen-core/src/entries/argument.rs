use serde::{Deserialize, Serialize};

use crate::CppType;

/// A function parameter as extracted from the native API.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArgumentEntry {
    pub name: String,
    pub ty: CppType,
    /// Native default value expression, as written in the header.
    #[serde(default)]
    pub default_value: Option<String>,
}

impl ArgumentEntry {
    pub fn new(name: impl Into<String>, ty: CppType) -> Self {
        Self {
            name: name.into(),
            ty,
            default_value: None,
        }
    }

    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn has_default(&self) -> bool {
        self.default_value.is_some()
    }
}
