//! Pre-parsed customization rules attached to functions and classes.
//!
//! The customization-file parser is an external collaborator; it hands the
//! generator one merged [`FunctionModification`] per function. These types are
//! plain data: the query helpers on [`FunctionEntry`](crate::FunctionEntry)
//! answer the questions the generator asks of them.

use serde::{Deserialize, Serialize};

use crate::{ArgIndex, OwnershipModification};

/// Where injected code is placed relative to the generated call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SnipPosition {
    Beginning,
    End,
    /// Replaces the default native invocation entirely.
    Replace,
}

/// Which side of the bridge injected code targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CodeLanguage {
    /// The dynamic-facing wrapper function.
    Dynamic,
    /// The native trampoline subclass.
    Native,
    /// The trampoline branch taken when no dynamic override exists.
    Shell,
}

/// Custom code injected into generated output.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CodeSnip {
    pub position: SnipPosition,
    pub language: CodeLanguage,
    pub code: String,
}

impl CodeSnip {
    pub fn new(position: SnipPosition, language: CodeLanguage, code: impl Into<String>) -> Self {
        Self {
            position,
            language,
            code: code.into(),
        }
    }
}

/// Conversion code fragment with `%in` / `%out` placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversionRule {
    pub language: CodeLanguage,
    pub code: String,
}

impl ConversionRule {
    pub fn new(language: CodeLanguage, code: impl Into<String>) -> Self {
        Self {
            language,
            code: code.into(),
        }
    }

    /// Substitute the placeholders. `%out` becomes `<out_base>_out`.
    pub fn expand(&self, input: &str, out_base: &str) -> String {
        self.code
            .replace("%in", input)
            .replace("%out", &format!("{out_base}_out"))
    }
}

/// Modifications to a single argument (or the return value / receiver).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgumentModification {
    pub index: ArgIndex,
    /// The argument is hidden from the dynamic side.
    #[serde(default)]
    pub removed: bool,
    /// Dynamic-side type replacing the native one.
    #[serde(default)]
    pub replaced_type: Option<String>,
    /// Default value expression replacing the native one.
    #[serde(default)]
    pub replaced_default: Option<String>,
    #[serde(default)]
    pub conversion_rules: Vec<ConversionRule>,
    /// Invalidate the wrapper after a virtual call if the dynamic side kept no reference.
    #[serde(default)]
    pub reset_after_use: bool,
    #[serde(default)]
    pub rename: Option<String>,
}

impl ArgumentModification {
    pub fn new(index: ArgIndex) -> Self {
        Self {
            index,
            removed: false,
            replaced_type: None,
            replaced_default: None,
            conversion_rules: Vec::new(),
            reset_after_use: false,
            rename: None,
        }
    }

    pub fn removed(mut self) -> Self {
        self.removed = true;
        self
    }

    pub fn with_type(mut self, ty: impl Into<String>) -> Self {
        self.replaced_type = Some(ty.into());
        self
    }

    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.replaced_default = Some(value.into());
        self
    }

    pub fn with_conversion_rule(mut self, rule: ConversionRule) -> Self {
        self.conversion_rules.push(rule);
        self
    }

    pub fn reset_after_use(mut self) -> Self {
        self.reset_after_use = true;
        self
    }
}

/// All customization rules for one function, already merged.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FunctionModification {
    #[serde(default)]
    pub rename: Option<String>,
    /// Hide the function from the dynamic side.
    #[serde(default)]
    pub remove: bool,
    /// Release the global lock around the native call.
    #[serde(default)]
    pub allow_thread: bool,
    #[serde(default)]
    pub snips: Vec<CodeSnip>,
    #[serde(default)]
    pub arguments: Vec<ArgumentModification>,
    #[serde(default)]
    pub ownership: Vec<OwnershipModification>,
}

impl FunctionModification {
    pub fn is_empty(&self) -> bool {
        *self == FunctionModification::default()
    }

    pub fn argument(&self, index: ArgIndex) -> Option<&ArgumentModification> {
        self.arguments.iter().find(|m| m.index == index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversion_rule_expands_placeholders() {
        let rule = ConversionRule::new(CodeLanguage::Dynamic, "%out = toPython(%in);");
        assert_eq!(rule.expand("cpp_arg0", "arg0"), "arg0_out = toPython(cpp_arg0);");
    }

    #[test]
    fn argument_lookup_by_index() {
        let modification = FunctionModification {
            arguments: vec![ArgumentModification::new(ArgIndex::Arg(2)).removed()],
            ..Default::default()
        };
        assert!(modification.argument(ArgIndex::Arg(2)).is_some_and(|m| m.removed));
        assert!(modification.argument(ArgIndex::Arg(1)).is_none());
        assert!(!modification.is_empty());
    }

    #[test]
    fn modifications_deserialize_with_defaults() {
        let json = r#"{ "allow_thread": true, "arguments": [ { "index": { "Arg": 1 }, "removed": true } ] }"#;
        let modification: FunctionModification = serde_json::from_str(json).unwrap();
        assert!(modification.allow_thread);
        assert!(modification.arguments[0].removed);
        assert!(modification.snips.is_empty());
    }
}
