//! Class entries.

use serde::{Deserialize, Serialize};

use crate::{ClassFlags, CodeSnip, CppType, FunctionKind, TypeHash};

use super::{EnumEntry, FieldEntry, FunctionEntry};

/// A native class (or namespace) in the API model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassEntry {
    /// Unqualified name.
    pub name: String,
    /// Fully qualified name (with enclosing scopes).
    pub qualified_name: String,
    /// Type hash for identity.
    pub type_hash: TypeHash,
    #[serde(default)]
    pub flags: ClassFlags,

    // === Inheritance ===
    /// Qualified names of direct bases, in declaration order.
    #[serde(default)]
    pub bases: Vec<String>,

    // === Members ===
    #[serde(default)]
    pub functions: Vec<FunctionEntry>,
    #[serde(default)]
    pub fields: Vec<FieldEntry>,
    #[serde(default)]
    pub enums: Vec<EnumEntry>,

    // === Customization ===
    /// Custom type-discovery code; `%1` is the pointer being inspected.
    #[serde(default)]
    pub type_discovery: Option<String>,
    /// Class-level injected code.
    #[serde(default)]
    pub snips: Vec<CodeSnip>,
    /// Expression computing a hash of `%1` for `tp_hash`.
    #[serde(default)]
    pub hash_function: Option<String>,
    /// Declared by another module; converters may be extended but no wrapper is generated.
    #[serde(default)]
    pub external: bool,
}

impl ClassEntry {
    /// Create a new class entry with a qualified name.
    pub fn new(qualified_name: impl Into<String>, flags: ClassFlags) -> Self {
        let qualified_name = qualified_name.into();
        let name = qualified_name
            .rsplit("::")
            .next()
            .unwrap_or(&qualified_name)
            .to_string();
        let type_hash = TypeHash::from_name(&qualified_name);
        Self {
            name,
            qualified_name,
            type_hash,
            flags,
            bases: Vec::new(),
            functions: Vec::new(),
            fields: Vec::new(),
            enums: Vec::new(),
            type_discovery: None,
            snips: Vec::new(),
            hash_function: None,
            external: false,
        }
    }

    /// A copyable value class.
    pub fn value(qualified_name: impl Into<String>) -> Self {
        Self::new(qualified_name, ClassFlags::VALUE_TYPE)
    }

    /// An identity-bearing object class.
    pub fn object(qualified_name: impl Into<String>) -> Self {
        Self::new(qualified_name, ClassFlags::empty())
    }

    pub fn namespace(qualified_name: impl Into<String>) -> Self {
        Self::new(qualified_name, ClassFlags::NAMESPACE)
    }

    // === Builder Methods ===

    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.bases.push(base.into());
        self
    }

    /// Add a function; its owner is set to this class.
    pub fn with_function(mut self, function: FunctionEntry) -> Self {
        let mut function = function.with_owner(self.qualified_name.clone());
        if function.is_virtual() {
            self.flags |= ClassFlags::POLYMORPHIC;
        }
        if function.is_abstract() {
            self.flags |= ClassFlags::ABSTRACT;
        }
        if function.is_constructor() && function.name != self.name {
            function.name = self.name.clone();
        }
        self.functions.push(function);
        self
    }

    pub fn with_field(mut self, field: FieldEntry) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_enum(mut self, entry: EnumEntry) -> Self {
        self.enums.push(entry);
        self
    }

    pub fn with_flags(mut self, flags: ClassFlags) -> Self {
        self.flags |= flags;
        self
    }

    pub fn as_abstract(self) -> Self {
        self.with_flags(ClassFlags::ABSTRACT | ClassFlags::POLYMORPHIC)
    }

    pub fn with_virtual_destructor(self) -> Self {
        self.with_flags(ClassFlags::VIRTUAL_DESTRUCTOR | ClassFlags::POLYMORPHIC)
    }

    pub fn with_type_discovery(mut self, code: impl Into<String>) -> Self {
        self.type_discovery = Some(code.into());
        self
    }

    pub fn as_external(mut self) -> Self {
        self.external = true;
        self
    }

    // === Queries ===

    pub fn is_abstract(&self) -> bool {
        self.flags.contains(ClassFlags::ABSTRACT)
    }

    pub fn is_polymorphic(&self) -> bool {
        self.flags.contains(ClassFlags::POLYMORPHIC)
    }

    pub fn has_virtual_destructor(&self) -> bool {
        self.flags.contains(ClassFlags::VIRTUAL_DESTRUCTOR)
    }

    pub fn has_private_destructor(&self) -> bool {
        self.flags.contains(ClassFlags::PRIVATE_DESTRUCTOR)
    }

    pub fn is_namespace(&self) -> bool {
        self.flags.contains(ClassFlags::NAMESPACE)
    }

    pub fn is_qobject(&self) -> bool {
        self.flags.contains(ClassFlags::QOBJECT)
    }

    pub fn is_value_type(&self) -> bool {
        self.flags.contains(ClassFlags::VALUE_TYPE)
    }

    pub fn has_protected_members(&self) -> bool {
        self.functions.iter().any(FunctionEntry::is_protected)
    }

    /// A native subclass is generated to intercept virtual calls and destruction.
    pub fn needs_native_wrapper(&self) -> bool {
        (self.is_polymorphic() || self.has_virtual_destructor())
            && !self.is_namespace()
            && !self.has_private_destructor()
    }

    /// The native type used when this class is passed around.
    pub fn as_type(&self) -> CppType {
        if self.is_value_type() {
            CppType::value(self.qualified_name.clone())
        } else {
            CppType::object(self.qualified_name.clone())
        }
    }

    pub fn constructors(&self) -> impl Iterator<Item = &FunctionEntry> {
        self.functions.iter().filter(|f| f.is_constructor())
    }

    /// Public, non-removed constructors callable from the dynamic side.
    pub fn visible_constructors(&self) -> impl Iterator<Item = &FunctionEntry> {
        self.constructors().filter(|f| !f.is_private() && !f.is_removed())
    }

    pub fn virtual_functions(&self) -> impl Iterator<Item = &FunctionEntry> {
        self.functions
            .iter()
            .filter(|f| f.is_virtual() && f.kind != FunctionKind::Destructor && !f.is_private())
    }

    pub fn signals(&self) -> impl Iterator<Item = &FunctionEntry> {
        self.functions.iter().filter(|f| f.is_signal())
    }

    /// Lowercase file-name stem (`Overload::Inner` becomes `overload_inner`).
    pub fn file_stem(&self) -> String {
        self.qualified_name.replace("::", "_").to_lowercase()
    }

    /// Identifier-safe flattened name (`Overload_Inner`).
    pub fn flat_name(&self) -> String {
        self.qualified_name.replace("::", "_")
    }
}
