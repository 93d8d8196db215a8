//! Bit flags describing functions and classes in the API model.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Properties of a native function as reported by the extractor or
    /// added by customization rules.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct FunctionFlags: u32 {
        const STATIC = 1 << 0;
        const VIRTUAL = 1 << 1;
        /// Pure virtual.
        const ABSTRACT = 1 << 2;
        const CONST = 1 << 3;
        /// Operator whose receiver is the right-hand operand (`__radd__`).
        const REVERSE_OPERATOR = 1 << 4;
        const PRIVATE = 1 << 5;
        const PROTECTED = 1 << 6;
        /// Added by the customization rules rather than extracted.
        const USER_ADDED = 1 << 7;
        /// `explicit` constructor; never used as an implicit conversion.
        const EXPLICIT = 1 << 8;
    }
}

bitflags! {
    /// Properties of a native class.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct ClassFlags: u32 {
        /// Has at least one pure virtual method.
        const ABSTRACT = 1 << 0;
        /// Has virtual functions; its dynamic type may differ from the static one.
        const POLYMORPHIC = 1 << 1;
        const VIRTUAL_DESTRUCTOR = 1 << 2;
        const PRIVATE_DESTRUCTOR = 1 << 3;
        /// Namespace wrapped as a class-like scope.
        const NAMESPACE = 1 << 4;
        /// Participates in the signal/slot reflection system.
        const QOBJECT = 1 << 5;
        /// Copyable value type.
        const VALUE_TYPE = 1 << 6;
        /// Has a hash function usable as `tp_hash`.
        const HAS_HASH = 1 << 7;
    }
}
