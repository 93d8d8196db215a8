//! Function entries: extracted signature plus attached customization rules.

use serde::{Deserialize, Serialize};

use crate::{
    ArgIndex, CodeLanguage, CodeSnip, ConversionRule, CppType, FunctionFlags,
    FunctionModification, OperatorKind, OwnershipModification, SnipPosition, TypeHash,
};

use super::ArgumentEntry;

/// The trampoline's default call into the dynamic override, whitespace removed.
const OVERRIDE_CALL: &str = "PyObject_Call(py_override,pyargs,NULL)";

/// What kind of callable an entry describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FunctionKind {
    Normal,
    Constructor,
    CopyConstructor,
    Destructor,
    Operator(OperatorKind),
    /// `operator T()`.
    Conversion,
    Signal,
    Slot,
}

/// A native function, method or constructor in the API model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionEntry {
    /// C++ name (for operators, the bare token is kept in `kind`).
    pub name: String,
    pub kind: FunctionKind,
    #[serde(default)]
    pub flags: FunctionFlags,
    pub return_type: CppType,
    #[serde(default)]
    pub arguments: Vec<ArgumentEntry>,
    /// Class the function was found in (qualified), `None` for globals.
    #[serde(default)]
    pub owner: Option<String>,
    /// Class providing the implementation that will be called.
    #[serde(default)]
    pub implementing_class: Option<String>,
    /// Class that first declared the function.
    #[serde(default)]
    pub declaring_class: Option<String>,
    #[serde(default)]
    pub modification: FunctionModification,
}

impl FunctionEntry {
    /// Create a new function entry.
    pub fn new(name: impl Into<String>, kind: FunctionKind, return_type: CppType) -> Self {
        Self {
            name: name.into(),
            kind,
            flags: FunctionFlags::empty(),
            return_type,
            arguments: Vec::new(),
            owner: None,
            implementing_class: None,
            declaring_class: None,
            modification: FunctionModification::default(),
        }
    }

    /// A plain function or method.
    pub fn method(name: impl Into<String>, return_type: CppType) -> Self {
        Self::new(name, FunctionKind::Normal, return_type)
    }

    /// A constructor of `class_name` (unqualified name).
    pub fn constructor(class_name: impl Into<String>) -> Self {
        Self::new(class_name, FunctionKind::Constructor, CppType::void())
    }

    /// An operator overload.
    pub fn operator(op: OperatorKind, return_type: CppType) -> Self {
        Self::new(format!("operator{}", op.cpp_symbol()), FunctionKind::Operator(op), return_type)
    }

    // === Builder Methods ===

    pub fn with_arg(mut self, arg: ArgumentEntry) -> Self {
        self.arguments.push(arg);
        self
    }

    pub fn with_flags(mut self, flags: FunctionFlags) -> Self {
        self.flags |= flags;
        self
    }

    pub fn as_static(self) -> Self {
        self.with_flags(FunctionFlags::STATIC)
    }

    pub fn as_virtual(self) -> Self {
        self.with_flags(FunctionFlags::VIRTUAL)
    }

    /// Pure virtual.
    pub fn as_abstract(self) -> Self {
        self.with_flags(FunctionFlags::VIRTUAL | FunctionFlags::ABSTRACT)
    }

    pub fn as_const(self) -> Self {
        self.with_flags(FunctionFlags::CONST)
    }

    pub fn as_reverse(self) -> Self {
        self.with_flags(FunctionFlags::REVERSE_OPERATOR)
    }

    pub fn as_private(self) -> Self {
        self.with_flags(FunctionFlags::PRIVATE)
    }

    pub fn with_modification(mut self, modification: FunctionModification) -> Self {
        self.modification = modification;
        self
    }

    pub fn with_ownership(mut self, ownership: OwnershipModification) -> Self {
        self.modification.ownership.push(ownership);
        self
    }

    /// Attach the function to a class.
    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        let owner = owner.into();
        self.implementing_class.get_or_insert_with(|| owner.clone());
        self.declaring_class.get_or_insert_with(|| owner.clone());
        self.owner = Some(owner);
        self
    }

    // === Kind Queries ===

    pub fn is_static(&self) -> bool {
        self.flags.contains(FunctionFlags::STATIC)
    }

    pub fn is_virtual(&self) -> bool {
        self.flags.contains(FunctionFlags::VIRTUAL)
    }

    pub fn is_abstract(&self) -> bool {
        self.flags.contains(FunctionFlags::ABSTRACT)
    }

    pub fn is_const(&self) -> bool {
        self.flags.contains(FunctionFlags::CONST)
    }

    pub fn is_private(&self) -> bool {
        self.flags.contains(FunctionFlags::PRIVATE)
    }

    pub fn is_protected(&self) -> bool {
        self.flags.contains(FunctionFlags::PROTECTED)
    }

    pub fn is_user_added(&self) -> bool {
        self.flags.contains(FunctionFlags::USER_ADDED)
    }

    pub fn is_constructor(&self) -> bool {
        matches!(self.kind, FunctionKind::Constructor | FunctionKind::CopyConstructor)
    }

    pub fn is_copy_constructor(&self) -> bool {
        self.kind == FunctionKind::CopyConstructor
    }

    pub fn is_signal(&self) -> bool {
        self.kind == FunctionKind::Signal
    }

    pub fn operator_kind(&self) -> Option<OperatorKind> {
        match self.kind {
            FunctionKind::Operator(op) => Some(op),
            _ => None,
        }
    }

    pub fn is_operator_overload(&self) -> bool {
        self.operator_kind().is_some()
    }

    pub fn is_reverse_operator(&self) -> bool {
        self.flags.contains(FunctionFlags::REVERSE_OPERATOR)
    }

    pub fn is_assignment_operator(&self) -> bool {
        self.operator_kind() == Some(OperatorKind::Assign)
    }

    pub fn is_conversion_operator(&self) -> bool {
        self.kind == FunctionKind::Conversion
    }

    /// Removed by a customization rule.
    pub fn is_removed(&self) -> bool {
        self.modification.remove
    }

    pub fn allows_thread(&self) -> bool {
        self.modification.allow_thread
    }

    pub fn returns_void(&self) -> bool {
        self.return_type.is_void()
    }

    /// A trailing `...` parameter that customization did not remove.
    pub fn has_varargs(&self) -> bool {
        self.visible_arguments().last().is_some_and(|(_, a)| a.ty.is_varargs())
    }

    // === Naming ===

    /// Number of explicit operands of an operator besides the receiver.
    pub fn operand_count(&self) -> usize {
        self.arguments.len()
    }

    /// Name visible from the dynamic side.
    pub fn dynamic_name(&self) -> String {
        if let Some(rename) = &self.modification.rename {
            return rename.clone();
        }
        match self.kind {
            FunctionKind::Operator(op) => {
                let name = if self.is_reverse_operator() {
                    op.reverse_dynamic_name()
                } else {
                    op.dynamic_name(self.operand_count())
                };
                name.map(str::to_string).unwrap_or_else(|| self.name.clone())
            }
            _ => self.name.clone(),
        }
    }

    /// Name and parameter types, e.g. `overloaded(Point*,Overload::ParamEnum)`.
    pub fn minimal_signature(&self) -> String {
        let args: Vec<String> = self.arguments.iter().map(|a| a.ty.cpp_signature()).collect();
        format!(
            "{}({}){}",
            self.name,
            args.join(","),
            if self.is_const() { "const" } else { "" }
        )
    }

    /// Human-readable signature with parameter names.
    pub fn signature(&self) -> String {
        let args: Vec<String> = self
            .arguments
            .iter()
            .map(|a| format!("{} {}", a.ty.cpp_signature(), a.name))
            .collect();
        format!("{}({})", self.name, args.join(", "))
    }

    /// Identity hash of this function.
    pub fn type_hash(&self) -> TypeHash {
        let params: Vec<TypeHash> = self.arguments.iter().map(|a| a.ty.type_hash()).collect();
        match (&self.owner, self.is_constructor()) {
            (Some(owner), true) => TypeHash::from_constructor(TypeHash::from_name(owner), &params),
            (Some(owner), false) => {
                TypeHash::from_method(TypeHash::from_name(owner), &self.name, &params, self.is_const())
            }
            (None, _) => TypeHash::from_function(&self.name, &params),
        }
    }

    // === Argument Modification Queries ===

    /// Whether the 0-based argument is hidden from the dynamic side.
    pub fn argument_removed(&self, position: usize) -> bool {
        self.modification
            .argument(ArgIndex::Arg(position + 1))
            .is_some_and(|m| m.removed)
    }

    /// Number of removed arguments before the 0-based position.
    pub fn removed_arguments_before(&self, position: usize) -> usize {
        (0..position.min(self.arguments.len()))
            .filter(|&i| self.argument_removed(i))
            .count()
    }

    pub fn removed_argument_count(&self) -> usize {
        self.removed_arguments_before(self.arguments.len())
    }

    /// Arguments visible from the dynamic side, with their native positions.
    pub fn visible_arguments(&self) -> impl Iterator<Item = (usize, &ArgumentEntry)> {
        self.arguments
            .iter()
            .enumerate()
            .filter(|(i, _)| !self.argument_removed(*i))
    }

    /// Dynamic-side type replacing the native one at `index`.
    pub fn type_replaced(&self, index: ArgIndex) -> Option<&str> {
        self.modification
            .argument(index)
            .and_then(|m| m.replaced_type.as_deref())
    }

    /// Effective default value of the 0-based argument.
    pub fn default_value(&self, position: usize) -> Option<&str> {
        self.modification
            .argument(ArgIndex::Arg(position + 1))
            .and_then(|m| m.replaced_default.as_deref())
            .or_else(|| {
                self.arguments
                    .get(position)
                    .and_then(|a| a.default_value.as_deref())
            })
    }

    /// The default value was changed by a rule and must be passed explicitly.
    pub fn default_value_modified(&self, position: usize) -> bool {
        let modified = self
            .modification
            .argument(ArgIndex::Arg(position + 1))
            .and_then(|m| m.replaced_default.as_deref());
        match modified {
            Some(value) => self.arguments.get(position).and_then(|a| a.default_value.as_deref()) != Some(value),
            None => false,
        }
    }

    pub fn conversion_rule(&self, language: CodeLanguage, index: ArgIndex) -> Option<&ConversionRule> {
        self.modification
            .argument(index)
            .and_then(|m| m.conversion_rules.iter().find(|r| r.language == language))
    }

    pub fn reset_after_use(&self, position: usize) -> bool {
        self.modification
            .argument(ArgIndex::Arg(position + 1))
            .is_some_and(|m| m.reset_after_use)
    }

    /// Dynamic-side parameter name (renames applied).
    pub fn argument_name(&self, position: usize) -> Option<&str> {
        let renamed = self
            .modification
            .argument(ArgIndex::Arg(position + 1))
            .and_then(|m| m.rename.as_deref());
        renamed.or_else(|| self.arguments.get(position).map(|a| a.name.as_str()))
    }

    // === Injected Code Queries ===

    pub fn snips(&self, position: SnipPosition, language: CodeLanguage) -> impl Iterator<Item = &CodeSnip> {
        self.modification
            .snips
            .iter()
            .filter(move |s| s.position == position && s.language == language)
    }

    pub fn has_snips(&self, language: CodeLanguage) -> bool {
        self.modification.snips.iter().any(|s| s.language == language)
    }

    /// Injected dynamic-facing code replaces the native call.
    pub fn replaces_native_call(&self) -> bool {
        self.snips(SnipPosition::Replace, CodeLanguage::Dynamic).next().is_some()
    }

    /// Injected native code calls the dynamic override itself, so the
    /// trampoline must not emit its own call.
    pub fn injected_code_calls_override(&self) -> bool {
        self.modification
            .snips
            .iter()
            .filter(|s| s.language == CodeLanguage::Native)
            .any(|s| {
                let compact: String = s.code.chars().filter(|c| !c.is_whitespace()).collect();
                compact.contains(OVERRIDE_CALL)
            })
    }

    pub fn ownership_for(&self, index: ArgIndex) -> impl Iterator<Item = &OwnershipModification> {
        self.modification
            .ownership
            .iter()
            .filter(move |m| m.index == index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ArgumentModification, PrimitiveKind};

    fn point_ref() -> CppType {
        CppType::value("Point").const_ref()
    }

    #[test]
    fn minimal_signature_lists_types() {
        let func = FunctionEntry::method("overloaded", CppType::void())
            .with_arg(ArgumentEntry::new("pt", CppType::value("Point").pointer()))
            .with_arg(ArgumentEntry::new("param", CppType::enumeration("Overload::ParamEnum")));
        assert_eq!(func.minimal_signature(), "overloaded(Point*,Overload::ParamEnum)");
    }

    #[test]
    fn operator_dynamic_names() {
        let add = FunctionEntry::operator(OperatorKind::Add, CppType::value("Point"))
            .with_arg(ArgumentEntry::new("other", point_ref()));
        assert_eq!(add.dynamic_name(), "__add__");
        assert_eq!(add.as_reverse().dynamic_name(), "__radd__");

        let neg = FunctionEntry::operator(OperatorKind::Sub, CppType::value("Point"));
        assert_eq!(neg.dynamic_name(), "__neg__");
    }

    #[test]
    fn removed_arguments_are_skipped() {
        let func = FunctionEntry::method("f", CppType::void())
            .with_arg(ArgumentEntry::new("a", CppType::primitive(PrimitiveKind::Int)))
            .with_arg(ArgumentEntry::new("b", CppType::primitive(PrimitiveKind::Int)).with_default("0"))
            .with_arg(ArgumentEntry::new("c", CppType::primitive(PrimitiveKind::Double)))
            .with_modification(FunctionModification {
                arguments: vec![ArgumentModification::new(ArgIndex::Arg(2)).removed()],
                ..Default::default()
            });
        assert!(func.argument_removed(1));
        assert_eq!(func.removed_arguments_before(2), 1);
        let visible: Vec<usize> = func.visible_arguments().map(|(i, _)| i).collect();
        assert_eq!(visible, vec![0, 2]);
    }

    #[test]
    fn modified_defaults_are_detected() {
        let func = FunctionEntry::method("f", CppType::void())
            .with_arg(ArgumentEntry::new("a", CppType::primitive(PrimitiveKind::Int)).with_default("0"))
            .with_modification(FunctionModification {
                arguments: vec![ArgumentModification::new(ArgIndex::Arg(1)).with_default("42")],
                ..Default::default()
            });
        assert_eq!(func.default_value(0), Some("42"));
        assert!(func.default_value_modified(0));
    }

    #[test]
    fn method_and_global_hashes_differ() {
        let global = FunctionEntry::method("value", CppType::primitive(PrimitiveKind::Int));
        let method = global.clone().with_owner("Point");
        assert_ne!(global.type_hash(), method.type_hash());
        assert_eq!(method.implementing_class.as_deref(), Some("Point"));
    }

    #[test]
    fn injected_override_calls_are_detected() {
        let with_snip = |language, code: &str| {
            FunctionEntry::method("pureVirtual", CppType::void()).with_modification(FunctionModification {
                snips: vec![CodeSnip::new(SnipPosition::Beginning, language, code)],
                ..Default::default()
            })
        };
        let call = "Shiboken::AutoDecRef py_result(PyObject_Call( py_override,\n pyargs, NULL ));";
        assert!(with_snip(CodeLanguage::Native, call).injected_code_calls_override());
        assert!(!with_snip(CodeLanguage::Dynamic, call).injected_code_calls_override());
        assert!(!with_snip(CodeLanguage::Native, "PyObject_Call(other, pyargs, NULL);").injected_code_calls_override());
        assert!(!FunctionEntry::method("f", CppType::void()).injected_code_calls_override());
    }
}
