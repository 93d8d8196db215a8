use serde::{Deserialize, Serialize};

use crate::CppType;

/// A public data member exposed through a getter/setter pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldEntry {
    pub name: String,
    pub ty: CppType,
    #[serde(default)]
    pub is_static: bool,
    /// Read-only: no setter is generated.
    #[serde(default)]
    pub is_const: bool,
}

impl FieldEntry {
    pub fn new(name: impl Into<String>, ty: CppType) -> Self {
        Self {
            name: name.into(),
            ty,
            is_static: false,
            is_const: false,
        }
    }

    pub fn read_only(mut self) -> Self {
        self.is_const = true;
        self
    }
}
