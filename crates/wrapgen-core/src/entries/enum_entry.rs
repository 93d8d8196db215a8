//! Enumeration entries.

use serde::{Deserialize, Serialize};

use crate::TypeHash;

/// A single enumerator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnumValue {
    pub name: String,
    pub value: i64,
}

impl EnumValue {
    pub fn new(name: impl Into<String>, value: i64) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// A native enum, optionally paired with a flags type (`QFlags<Enum>`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumEntry {
    /// Unqualified name.
    pub name: String,
    /// Fully qualified name (`Overload::FunctionEnum`).
    pub qualified_name: String,
    pub values: Vec<EnumValue>,
    /// Qualified name of the associated flags type.
    #[serde(default)]
    pub flags: Option<String>,
}

impl EnumEntry {
    /// Create an enum in `scope` (empty for the global scope).
    pub fn new(name: impl Into<String>, scope: &str) -> Self {
        let name = name.into();
        let qualified_name = if scope.is_empty() {
            name.clone()
        } else {
            format!("{scope}::{name}")
        };
        Self {
            name,
            qualified_name,
            values: Vec::new(),
            flags: None,
        }
    }

    pub fn with_value(mut self, name: impl Into<String>, value: i64) -> Self {
        self.values.push(EnumValue::new(name, value));
        self
    }

    pub fn with_flags(mut self, flags: impl Into<String>) -> Self {
        self.flags = Some(flags.into());
        self
    }

    /// Scope the enumerators are registered in.
    pub fn scope(&self) -> Option<&str> {
        self.qualified_name.rsplit_once("::").map(|(scope, _)| scope)
    }

    pub fn type_hash(&self) -> TypeHash {
        TypeHash::from_name(&self.qualified_name)
    }

    pub fn value_of(&self, name: &str) -> Option<i64> {
        self.values.iter().find(|v| v.name == name).map(|v| v.value)
    }

    pub fn name_of(&self, value: i64) -> Option<&str> {
        self.values.iter().find(|v| v.value == value).map(|v| v.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qualified_names_and_lookups() {
        let e = EnumEntry::new("ParamEnum", "Overload")
            .with_value("Param0", 0)
            .with_value("Param1", 1);
        assert_eq!(e.qualified_name, "Overload::ParamEnum");
        assert_eq!(e.scope(), Some("Overload"));
        assert_eq!(e.value_of("Param1"), Some(1));
        assert_eq!(e.name_of(0), Some("Param0"));
        assert_eq!(EnumEntry::new("GlobalEnum", "").scope(), None);
    }
}
