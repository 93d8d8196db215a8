//! Primitive C++ types and how they map onto dynamic-language numbers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Built-in C++ arithmetic and boolean types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PrimitiveKind {
    Bool,
    Char,
    SignedChar,
    UnsignedChar,
    Short,
    UnsignedShort,
    Int,
    UnsignedInt,
    Long,
    UnsignedLong,
    LongLong,
    UnsignedLongLong,
    Float,
    Double,
}

impl PrimitiveKind {
    /// All primitive kinds, in declaration order.
    pub const ALL: [PrimitiveKind; 14] = [
        PrimitiveKind::Bool,
        PrimitiveKind::Char,
        PrimitiveKind::SignedChar,
        PrimitiveKind::UnsignedChar,
        PrimitiveKind::Short,
        PrimitiveKind::UnsignedShort,
        PrimitiveKind::Int,
        PrimitiveKind::UnsignedInt,
        PrimitiveKind::Long,
        PrimitiveKind::UnsignedLong,
        PrimitiveKind::LongLong,
        PrimitiveKind::UnsignedLongLong,
        PrimitiveKind::Float,
        PrimitiveKind::Double,
    ];

    /// The C++ spelling of this type.
    pub const fn cpp_name(self) -> &'static str {
        match self {
            PrimitiveKind::Bool => "bool",
            PrimitiveKind::Char => "char",
            PrimitiveKind::SignedChar => "signed char",
            PrimitiveKind::UnsignedChar => "unsigned char",
            PrimitiveKind::Short => "short",
            PrimitiveKind::UnsignedShort => "unsigned short",
            PrimitiveKind::Int => "int",
            PrimitiveKind::UnsignedInt => "unsigned int",
            PrimitiveKind::Long => "long",
            PrimitiveKind::UnsignedLong => "unsigned long",
            PrimitiveKind::LongLong => "long long",
            PrimitiveKind::UnsignedLongLong => "unsigned long long",
            PrimitiveKind::Float => "float",
            PrimitiveKind::Double => "double",
        }
    }

    /// Parse a C++ spelling, accepting the common `signed` aliases.
    pub fn from_cpp_name(name: &str) -> Option<Self> {
        let kind = match name.trim() {
            "bool" => PrimitiveKind::Bool,
            "char" => PrimitiveKind::Char,
            "signed char" => PrimitiveKind::SignedChar,
            "unsigned char" => PrimitiveKind::UnsignedChar,
            "short" | "signed short" | "short int" => PrimitiveKind::Short,
            "unsigned short" => PrimitiveKind::UnsignedShort,
            "int" | "signed int" | "signed" => PrimitiveKind::Int,
            "unsigned int" | "unsigned" => PrimitiveKind::UnsignedInt,
            "long" | "signed long" | "long int" => PrimitiveKind::Long,
            "unsigned long" => PrimitiveKind::UnsignedLong,
            "long long" | "signed long long" => PrimitiveKind::LongLong,
            "unsigned long long" => PrimitiveKind::UnsignedLongLong,
            "float" => PrimitiveKind::Float,
            "double" => PrimitiveKind::Double,
            _ => return None,
        };
        Some(kind)
    }

    /// Name shown to dynamic-language users in signature listings.
    ///
    /// A leading `signed ` is dropped and `double` is shown as `float`, since
    /// the dynamic side has a single floating type.
    pub fn display_name(self) -> &'static str {
        match self {
            PrimitiveKind::Double => "float",
            other => {
                let name = other.cpp_name();
                name.strip_prefix("signed ").unwrap_or(name)
            }
        }
    }

    pub const fn is_bool(self) -> bool {
        matches!(self, PrimitiveKind::Bool)
    }

    pub const fn is_floating(self) -> bool {
        matches!(self, PrimitiveKind::Float | PrimitiveKind::Double)
    }

    /// Integral types other than `bool`; all of them map to the dynamic `int`.
    pub const fn is_integral(self) -> bool {
        !self.is_bool() && !self.is_floating()
    }

    pub const fn is_unsigned(self) -> bool {
        matches!(
            self,
            PrimitiveKind::UnsignedChar
                | PrimitiveKind::UnsignedShort
                | PrimitiveKind::UnsignedInt
                | PrimitiveKind::UnsignedLong
                | PrimitiveKind::UnsignedLongLong
        )
    }

    /// Bit width on an LP64 target.
    pub const fn bit_width(self) -> u32 {
        match self {
            PrimitiveKind::Bool | PrimitiveKind::Char | PrimitiveKind::SignedChar | PrimitiveKind::UnsignedChar => 8,
            PrimitiveKind::Short | PrimitiveKind::UnsignedShort => 16,
            PrimitiveKind::Int | PrimitiveKind::UnsignedInt | PrimitiveKind::Float => 32,
            PrimitiveKind::Long
            | PrimitiveKind::UnsignedLong
            | PrimitiveKind::LongLong
            | PrimitiveKind::UnsignedLongLong
            | PrimitiveKind::Double => 64,
        }
    }

    /// Inclusive value range for integral kinds.
    pub fn integral_range(self) -> Option<(i128, i128)> {
        if !self.is_integral() {
            return None;
        }
        let bits = self.bit_width();
        if self.is_unsigned() {
            Some((0, (1i128 << bits) - 1))
        } else {
            Some((-(1i128 << (bits - 1)), (1i128 << (bits - 1)) - 1))
        }
    }

    /// Position in the numeric specificity order used by the overload decisor.
    ///
    /// Strict checks must be tried before permissive ones: `bool` first, then
    /// floating types, then the integral types whose check accepts any number.
    pub const fn specificity_rank(self) -> u8 {
        if self.is_bool() {
            0
        } else if self.is_floating() {
            1
        } else {
            2
        }
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.cpp_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cpp_names_round_trip() {
        for kind in PrimitiveKind::ALL {
            assert_eq!(PrimitiveKind::from_cpp_name(kind.cpp_name()), Some(kind));
        }
    }

    #[test]
    fn display_name_drops_signed_and_renames_double() {
        assert_eq!(PrimitiveKind::SignedChar.display_name(), "char");
        assert_eq!(PrimitiveKind::Double.display_name(), "float");
        assert_eq!(PrimitiveKind::UnsignedInt.display_name(), "unsigned int");
    }

    #[test]
    fn integral_ranges() {
        assert_eq!(PrimitiveKind::UnsignedChar.integral_range(), Some((0, 255)));
        assert_eq!(PrimitiveKind::Int.integral_range(), Some((i32::MIN as i128, i32::MAX as i128)));
        assert_eq!(PrimitiveKind::UnsignedLongLong.integral_range(), Some((0, u64::MAX as i128)));
        assert_eq!(PrimitiveKind::Double.integral_range(), None);
        assert_eq!(PrimitiveKind::Bool.integral_range(), None);
    }

    #[test]
    fn specificity_puts_int_last() {
        assert!(PrimitiveKind::Bool.specificity_rank() < PrimitiveKind::Double.specificity_rank());
        assert!(PrimitiveKind::Double.specificity_rank() < PrimitiveKind::Int.specificity_rank());
    }
}
