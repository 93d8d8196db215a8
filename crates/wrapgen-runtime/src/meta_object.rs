//! Dynamic meta-objects for dynamic subclasses of reflected classes.
//!
//! A reflected native class describes its signals, slots and properties in a
//! static meta-object. A dynamic subclass may declare more; they are
//! collected in a [`DynamicMetaObject`] layered on top of the native one.
//!
//! ## Layout
//!
//! The encoded table follows the reflection system's revision 5 format:
//!
//! ```text
//! header (13 ints)   revision, class name, class info x2, method count,
//!                    method offset, property count, property offset,
//!                    enums x2, constructors x2, signal count
//! methods (5 each)   name, arguments, return type, tag, flags
//!                    (signal capacity slots, then slot capacity slots)
//! properties (3 each) name, type, flags
//! terminator         0
//! ```
//!
//! Strings live in one NUL-separated table and are referenced by byte
//! offset; equal strings share one entry. Method slots have a fixed
//! capacity so indices stay stable while entries are added and removed.

use bitflags::bitflags;
use thiserror::Error;
use wrapgen_core::{GeneratorOptions, normalize_signature};

use crate::error::{RuntimeError, RuntimeResult};
use crate::manager::BindingManager;
use crate::value::DynValue;

/// Class name of the receiver shared by all dynamic connections.
pub const GLOBAL_RECEIVER_CLASS_NAME: &str = "__GlobalReceiver__";

const REVISION: u32 = 5;
const HEADER_LENGTH: usize = 13;

bitflags! {
    /// Property attribute flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PropertyFlags: u32 {
        const READABLE = 0x0000_0001;
        const WRITABLE = 0x0000_0002;
        const RESETTABLE = 0x0000_0004;
        const ENUM_OR_FLAG = 0x0000_0008;
        const STD_CPP_SET = 0x0000_0100;
        const CONSTANT = 0x0000_0400;
        const FINAL = 0x0000_0800;
        const DESIGNABLE = 0x0000_1000;
        const RESOLVE_DESIGNABLE = 0x0000_2000;
        const SCRIPTABLE = 0x0000_4000;
        const RESOLVE_SCRIPTABLE = 0x0000_8000;
        const STORED = 0x0001_0000;
        const RESOLVE_STORED = 0x0002_0000;
        const EDITABLE = 0x0004_0000;
        const RESOLVE_EDITABLE = 0x0008_0000;
        const USER = 0x0010_0000;
        const RESOLVE_USER = 0x0020_0000;
        const NOTIFY = 0x0040_0000;
    }
}

bitflags! {
    /// Method access and kind flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MethodFlags: u32 {
        const ACCESS_PROTECTED = 0x01;
        const ACCESS_PUBLIC = 0x02;
        const METHOD_SIGNAL = 0x04;
        const METHOD_SLOT = 0x08;
        const METHOD_CONSTRUCTOR = 0x0c;
        const METHOD_COMPATIBILITY = 0x10;
        const METHOD_CLONED = 0x20;
        const METHOD_SCRIPTABLE = 0x40;
    }
}

/// Built-in variant type id of a property type, if it has one.
pub fn variant_type_id(type_name: &str) -> Option<u32> {
    let id = match type_name {
        "QVariant" => 0xff,
        "bool" => 1,
        "int" => 2,
        "uint" | "unsigned int" => 3,
        "qlonglong" | "Q_LLONG" | "long long" => 4,
        "qulonglong" | "Q_ULLONG" | "unsigned long long" => 5,
        "double" | "qreal" => 6,
        "QChar" => 7,
        "QVariantMap" => 8,
        "QVariantList" => 9,
        "QString" => 10,
        "QStringList" => 11,
        "QByteArray" | "QCString" => 12,
        "QBitArray" => 13,
        "QDate" => 14,
        "QTime" => 15,
        "QDateTime" => 16,
        "QUrl" => 17,
        "QLocale" => 18,
        "QRect" => 19,
        "QRectF" => 20,
        "QSize" => 21,
        "QSizeF" => 22,
        "QLine" => 23,
        "QLineF" => 24,
        "QPoint" => 25,
        "QPointF" => 26,
        "QRegExp" => 27,
        "QVariantHash" => 28,
        "QIcon" | "QIconSet" => 69,
        _ => return None,
    };
    Some(id)
}

/// Capacities of dynamic meta-objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetaObjectLimits {
    pub max_signals: usize,
    pub max_slots: usize,
    pub global_receiver_limit: usize,
}

impl Default for MetaObjectLimits {
    fn default() -> Self {
        Self {
            max_signals: 50,
            max_slots: 50,
            global_receiver_limit: 500,
        }
    }
}

impl MetaObjectLimits {
    pub fn from_options(options: &GeneratorOptions) -> Self {
        Self {
            max_signals: options.max_dynamic_signals,
            max_slots: options.max_dynamic_slots,
            global_receiver_limit: options.global_receiver_limit,
        }
    }

    /// (signals, slots) capacity for a class.
    fn capacity(&self, class_name: &str) -> (usize, usize) {
        if class_name == GLOBAL_RECEIVER_CLASS_NAME {
            (self.global_receiver_limit, self.global_receiver_limit)
        } else {
            (self.max_signals, self.max_slots)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    Signal,
    Slot,
}

impl MethodKind {
    fn noun(self) -> &'static str {
        match self {
            MethodKind::Signal => "signal",
            MethodKind::Slot => "slot",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReflectionError {
    #[error("Fail to add dynamic {} to QObject. PySide support at most {limit} dynamic {}s.", .kind.noun(), .kind.noun())]
    CapacityExceeded { kind: MethodKind, limit: usize },

    #[error("no dynamic method at index {0}")]
    UnknownMethod(usize),
}

// ============================================================================
// Members
// ============================================================================

/// Attributes of a dynamic property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertySpec {
    pub type_name: String,
    pub readable: bool,
    pub writable: bool,
    pub resettable: bool,
    pub designable: bool,
    pub scriptable: bool,
    pub stored: bool,
    pub user: bool,
    pub constant: bool,
    pub is_final: bool,
}

impl PropertySpec {
    /// A read-only, designable, scriptable, stored property.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            readable: true,
            writable: false,
            resettable: false,
            designable: true,
            scriptable: true,
            stored: true,
            user: false,
            constant: false,
            is_final: false,
        }
    }

    pub fn writable(mut self) -> Self {
        self.writable = true;
        self
    }

    pub fn resettable(mut self) -> Self {
        self.resettable = true;
        self
    }

    pub fn constant(mut self) -> Self {
        self.constant = true;
        self
    }

    /// Encoded flags; built-in variant types carry their id in the top byte.
    pub fn flags(&self) -> PropertyFlags {
        let mut flags = PropertyFlags::empty();
        match variant_type_id(&self.type_name) {
            None => flags |= PropertyFlags::ENUM_OR_FLAG,
            Some(_) if self.type_name == "qreal" => {}
            Some(id) => flags |= PropertyFlags::from_bits_retain(id << 24),
        }
        let pairs = [
            (self.readable, PropertyFlags::READABLE, PropertyFlags::empty()),
            (self.writable, PropertyFlags::WRITABLE, PropertyFlags::empty()),
            (self.resettable, PropertyFlags::RESETTABLE, PropertyFlags::empty()),
            (self.designable, PropertyFlags::DESIGNABLE, PropertyFlags::RESOLVE_DESIGNABLE),
            (self.scriptable, PropertyFlags::SCRIPTABLE, PropertyFlags::RESOLVE_SCRIPTABLE),
            (self.stored, PropertyFlags::STORED, PropertyFlags::RESOLVE_STORED),
            (self.user, PropertyFlags::USER, PropertyFlags::RESOLVE_USER),
            (self.constant, PropertyFlags::CONSTANT, PropertyFlags::empty()),
            (self.is_final, PropertyFlags::FINAL, PropertyFlags::empty()),
        ];
        for (set, when_set, when_unset) in pairs {
            flags |= if set { when_set } else { when_unset };
        }
        flags
    }
}

/// A signal or slot entry; blank once removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MethodData {
    pub signature: String,
    /// Empty for `void`.
    pub return_type: String,
}

impl MethodData {
    fn new(signature: String, return_type: &str) -> Self {
        let return_type = if return_type == "void" { "" } else { return_type };
        Self {
            signature,
            return_type: return_type.to_string(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.signature.is_empty()
    }

    /// Method name, the signature up to its parameter list.
    pub fn name(&self) -> &str {
        self.signature.split('(').next().unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyData {
    pub name: String,
    pub spec: PropertySpec,
}

/// Reflection data of a native class.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticMetaObject {
    pub class_name: String,
    pub signals: Vec<String>,
    pub slots: Vec<String>,
    pub properties: Vec<String>,
    /// Methods and properties of the native class's own ancestors.
    pub inherited_methods: usize,
    pub inherited_properties: usize,
}

impl StaticMetaObject {
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            ..Self::default()
        }
    }

    pub fn with_signal(mut self, signature: &str) -> Self {
        self.signals.push(normalize_signature(signature));
        self
    }

    pub fn with_slot(mut self, signature: &str) -> Self {
        self.slots.push(normalize_signature(signature));
        self
    }

    pub fn with_property(mut self, name: impl Into<String>) -> Self {
        self.properties.push(name.into());
        self
    }

    pub fn method_count(&self) -> usize {
        self.inherited_methods + self.signals.len() + self.slots.len()
    }

    pub fn property_count(&self) -> usize {
        self.inherited_properties + self.properties.len()
    }

    pub fn index_of_signal(&self, signature: &str) -> Option<usize> {
        let signature = normalize_signature(signature);
        self.signals
            .iter()
            .position(|s| *s == signature)
            .map(|i| self.inherited_methods + i)
    }

    pub fn index_of_slot(&self, signature: &str) -> Option<usize> {
        let signature = normalize_signature(signature);
        self.slots
            .iter()
            .position(|s| *s == signature)
            .map(|i| self.inherited_methods + self.signals.len() + i)
    }
}

/// A declaration found on a dynamic class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DynamicAttribute {
    Property { name: String, spec: PropertySpec },
    /// A signal object with all its overload signatures.
    Signal { signatures: Vec<String> },
    /// A decorated method; each entry is `"<return type> <signature>"`.
    Slot { decorated: Vec<String> },
}

// ============================================================================
// DynamicMetaObject
// ============================================================================

#[derive(Debug, Clone)]
pub struct DynamicMetaObject {
    class_name: String,
    base: StaticMetaObject,
    max_signals: usize,
    max_slots: usize,
    signals: Vec<MethodData>,
    slots: Vec<MethodData>,
    properties: Vec<PropertyData>,
    data: Vec<u32>,
    strings: Vec<String>,
}

impl DynamicMetaObject {
    pub fn new(class_name: impl Into<String>, base: StaticMetaObject, limits: &MetaObjectLimits) -> Self {
        let class_name = class_name.into();
        let (max_signals, max_slots) = limits.capacity(&class_name);
        let mut meta = Self {
            class_name,
            base,
            max_signals,
            max_slots,
            signals: Vec::new(),
            slots: Vec::new(),
            properties: Vec::new(),
            data: Vec::new(),
            strings: Vec::new(),
        };
        meta.update();
        meta
    }

    /// Meta-object for a dynamic type, registering only what the native
    /// base does not already declare.
    #[tracing::instrument(level = "debug", skip(base, attributes, limits))]
    pub fn create_based_on(
        type_name: &str,
        base: &StaticMetaObject,
        attributes: &[DynamicAttribute],
        limits: &MetaObjectLimits,
    ) -> Self {
        let class_name = type_name.rsplit('.').next().unwrap_or(type_name);
        let mut meta = Self::new(class_name, base.clone(), limits);
        for attribute in attributes {
            match attribute {
                DynamicAttribute::Property { name, spec } => meta.add_property(name, spec.clone()),
                DynamicAttribute::Signal { signatures } => {
                    for signature in signatures.iter().filter(|s| base.index_of_signal(s).is_none()) {
                        // Capacity problems are already logged
                        let _ = meta.add_signal(signature, "void");
                    }
                }
                DynamicAttribute::Slot { decorated } => {
                    for entry in decorated {
                        let mut parts = entry.split_whitespace();
                        let (Some(return_type), Some(signature)) = (parts.next(), parts.next()) else {
                            tracing::warn!(entry = %entry, "malformed slot declaration");
                            continue;
                        };
                        if base.index_of_slot(signature).is_none() {
                            let _ = meta.add_slot(signature, return_type);
                        }
                    }
                }
            }
        }
        meta
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn base(&self) -> &StaticMetaObject {
        &self.base
    }

    /// Index of the first dynamic method.
    pub fn method_offset(&self) -> usize {
        self.base.method_count()
    }

    /// Methods including the fixed-capacity dynamic blocks.
    pub fn method_count(&self) -> usize {
        self.method_offset() + self.max_signals + self.max_slots
    }

    pub fn property_offset(&self) -> usize {
        self.base.property_count()
    }

    pub fn property_count(&self) -> usize {
        self.property_offset() + self.properties.len()
    }

    pub fn signals(&self) -> &[MethodData] {
        &self.signals
    }

    pub fn slots(&self) -> &[MethodData] {
        &self.slots
    }

    pub fn properties(&self) -> &[PropertyData] {
        &self.properties
    }

    pub fn add_signal(&mut self, signature: &str, return_type: &str) -> Result<usize, ReflectionError> {
        let signature = normalize_signature(signature);
        let offset = self.method_offset();
        let index = Self::add_method(&mut self.signals, self.max_signals, MethodKind::Signal, signature, return_type)?;
        self.update();
        Ok(offset + index)
    }

    pub fn add_slot(&mut self, signature: &str, return_type: &str) -> Result<usize, ReflectionError> {
        let signature = normalize_signature(signature);
        let offset = self.method_offset() + self.max_signals;
        let index = Self::add_method(&mut self.slots, self.max_slots, MethodKind::Slot, signature, return_type)?;
        self.update();
        Ok(offset + index)
    }

    fn add_method(
        methods: &mut Vec<MethodData>,
        limit: usize,
        kind: MethodKind,
        signature: String,
        return_type: &str,
    ) -> Result<usize, ReflectionError> {
        if let Some(existing) = methods.iter().position(|m| m.signature == signature) {
            return Ok(existing);
        }
        if let Some(blank) = methods.iter().position(MethodData::is_blank) {
            methods[blank] = MethodData::new(signature, return_type);
            return Ok(blank);
        }
        if methods.len() >= limit {
            let error = ReflectionError::CapacityExceeded { kind, limit };
            tracing::warn!(%signature, "{error}");
            return Err(error);
        }
        methods.push(MethodData::new(signature, return_type));
        Ok(methods.len() - 1)
    }

    /// Blank the signal at absolute `index`; its slot is reused later.
    pub fn remove_signal(&mut self, index: usize) -> Result<(), ReflectionError> {
        let position = index
            .checked_sub(self.method_offset())
            .filter(|p| *p < self.signals.len())
            .ok_or(ReflectionError::UnknownMethod(index))?;
        self.signals[position] = MethodData::default();
        self.update();
        Ok(())
    }

    pub fn remove_slot(&mut self, index: usize) -> Result<(), ReflectionError> {
        let position = index
            .checked_sub(self.method_offset() + self.max_signals)
            .filter(|p| *p < self.slots.len())
            .ok_or(ReflectionError::UnknownMethod(index))?;
        self.slots[position] = MethodData::default();
        self.update();
        Ok(())
    }

    /// Add a property unless one with this name exists.
    pub fn add_property(&mut self, name: &str, spec: PropertySpec) {
        if self.properties.iter().any(|p| p.name == name) {
            return;
        }
        self.properties.push(PropertyData {
            name: name.to_string(),
            spec,
        });
        self.update();
    }

    pub fn index_of_signal(&self, signature: &str) -> Option<usize> {
        self.base.index_of_signal(signature).or_else(|| {
            let signature = normalize_signature(signature);
            self.signals
                .iter()
                .position(|m| m.signature == signature)
                .map(|i| self.method_offset() + i)
        })
    }

    pub fn index_of_slot(&self, signature: &str) -> Option<usize> {
        self.base.index_of_slot(signature).or_else(|| {
            let signature = normalize_signature(signature);
            self.slots
                .iter()
                .position(|m| m.signature == signature)
                .map(|i| self.method_offset() + self.max_signals + i)
        })
    }

    pub fn index_of_property(&self, name: &str) -> Option<usize> {
        match self.base.properties.iter().position(|p| p == name) {
            Some(i) => Some(self.base.inherited_properties + i),
            None => self
                .properties
                .iter()
                .position(|p| p.name == name)
                .map(|i| self.property_offset() + i),
        }
    }

    /// The dynamic method at absolute `index`.
    pub fn method(&self, index: usize) -> Option<(&MethodData, MethodFlags)> {
        let relative = index.checked_sub(self.method_offset())?;
        if relative < self.max_signals {
            let method = self.signals.get(relative).filter(|m| !m.is_blank())?;
            return Some((method, MethodFlags::ACCESS_PUBLIC | MethodFlags::METHOD_SIGNAL));
        }
        let method = self.slots.get(relative - self.max_signals).filter(|m| !m.is_blank())?;
        Some((method, MethodFlags::ACCESS_PUBLIC | MethodFlags::METHOD_SLOT))
    }

    /// Invoke the dynamic slot at `index` on the object at `address`.
    ///
    /// The slot body is the dynamic override of the same name, called under
    /// the global lock like a virtual trampoline.
    pub fn invoke(
        &self,
        manager: &BindingManager,
        address: usize,
        index: usize,
        args: &[DynValue],
    ) -> RuntimeResult<DynValue> {
        let not_implemented = |method: &str| RuntimeError::NotImplemented {
            class: self.class_name.clone(),
            method: method.to_string(),
        };
        let Some((method, flags)) = self.method(index) else {
            return Err(not_implemented(&index.to_string()));
        };
        if !flags.contains(MethodFlags::METHOD_SLOT) {
            return Err(not_implemented(method.name()));
        }
        let _gil = manager.gil();
        let body = manager.find_override(address, method.name()).map_err(|reason| {
            tracing::debug!(slot = %method.signature, %reason, "slot has no body");
            not_implemented(method.name())
        })?;
        body(manager, args)
    }

    /// Encoded method and property table.
    pub fn data(&self) -> &[u32] {
        &self.data
    }

    /// NUL-separated string table referenced by [`data`](Self::data).
    pub fn string_data(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        for string in &self.strings {
            bytes.extend_from_slice(string.as_bytes());
            bytes.push(0);
        }
        bytes
    }

    fn update(&mut self) {
        let mut strings = StringTable::default();
        let n_methods = (self.max_signals + self.max_slots) as u32;
        let n_properties = self.properties.len() as u32;

        let mut data = Vec::with_capacity(HEADER_LENGTH + n_methods as usize * 5 + n_properties as usize * 3 + 1);
        data.extend_from_slice(&[
            REVISION,
            0,
            0,
            0,
            n_methods,
            HEADER_LENGTH as u32,
            n_properties,
            0,
            0,
            0,
            0,
            0,
            self.max_signals as u32,
        ]);
        strings.register(&self.class_name);
        let null_index = strings.register("");

        let signal_flags = (MethodFlags::ACCESS_PUBLIC | MethodFlags::METHOD_SIGNAL).bits();
        let slot_flags = (MethodFlags::ACCESS_PUBLIC | MethodFlags::METHOD_SLOT).bits();
        write_methods(&mut data, &mut strings, &self.signals, self.max_signals, null_index, signal_flags);
        write_methods(&mut data, &mut strings, &self.slots, self.max_slots, null_index, slot_flags);

        if !self.properties.is_empty() {
            data[7] = data.len() as u32;
        }
        for property in &self.properties {
            data.push(strings.register(&property.name));
            data.push(strings.register(&property.spec.type_name));
            data.push(property.spec.flags().bits());
        }
        data.push(0);

        self.data = data;
        self.strings = strings.entries;
    }
}

fn write_methods(
    data: &mut Vec<u32>,
    strings: &mut StringTable,
    methods: &[MethodData],
    capacity: usize,
    null_index: u32,
    flags: u32,
) {
    for slot in 0..capacity {
        let method = methods.get(slot).filter(|m| !m.is_blank());
        data.push(method.map_or(null_index, |m| strings.register(&m.signature)));
        data.push(null_index);
        data.push(match method {
            Some(m) if !m.return_type.is_empty() => strings.register(&m.return_type),
            _ => null_index,
        });
        data.push(null_index);
        data.push(flags);
    }
}

/// Deduplicated strings addressed by byte offset.
#[derive(Debug, Default)]
struct StringTable {
    entries: Vec<String>,
}

impl StringTable {
    fn register(&mut self, value: &str) -> u32 {
        let mut offset = 0;
        for entry in &self.entries {
            if entry == value {
                return offset as u32;
            }
            offset += entry.len() + 1;
        }
        self.entries.push(value.to_string());
        offset as u32
    }
}
