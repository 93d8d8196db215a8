//! C++ operators and their dynamic-language protocol names.

use serde::{Deserialize, Serialize};

/// Overloadable C++ operators the generator knows how to expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperatorKind {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    LeftShift,
    RightShift,
    BitAnd,
    BitOr,
    BitXor,
    /// Unary `~`.
    Invert,
    /// Unary `!`.
    Not,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    ModAssign,
    LeftShiftAssign,
    RightShiftAssign,
    BitAndAssign,
    BitOrAssign,
    BitXorAssign,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Assign,
    Subscript,
    Call,
}

impl OperatorKind {
    /// The C++ operator token.
    pub const fn cpp_symbol(self) -> &'static str {
        match self {
            OperatorKind::Add => "+",
            OperatorKind::Sub => "-",
            OperatorKind::Mul => "*",
            OperatorKind::Div => "/",
            OperatorKind::Mod => "%",
            OperatorKind::LeftShift => "<<",
            OperatorKind::RightShift => ">>",
            OperatorKind::BitAnd => "&",
            OperatorKind::BitOr => "|",
            OperatorKind::BitXor => "^",
            OperatorKind::Invert => "~",
            OperatorKind::Not => "!",
            OperatorKind::AddAssign => "+=",
            OperatorKind::SubAssign => "-=",
            OperatorKind::MulAssign => "*=",
            OperatorKind::DivAssign => "/=",
            OperatorKind::ModAssign => "%=",
            OperatorKind::LeftShiftAssign => "<<=",
            OperatorKind::RightShiftAssign => ">>=",
            OperatorKind::BitAndAssign => "&=",
            OperatorKind::BitOrAssign => "|=",
            OperatorKind::BitXorAssign => "^=",
            OperatorKind::Equal => "==",
            OperatorKind::NotEqual => "!=",
            OperatorKind::Less => "<",
            OperatorKind::LessEqual => "<=",
            OperatorKind::Greater => ">",
            OperatorKind::GreaterEqual => ">=",
            OperatorKind::Assign => "=",
            OperatorKind::Subscript => "[]",
            OperatorKind::Call => "()",
        }
    }

    /// Parse the token following `operator` in a C++ function name.
    pub fn from_cpp_symbol(symbol: &str) -> Option<Self> {
        let kind = match symbol.trim() {
            "+" => OperatorKind::Add,
            "-" => OperatorKind::Sub,
            "*" => OperatorKind::Mul,
            "/" => OperatorKind::Div,
            "%" => OperatorKind::Mod,
            "<<" => OperatorKind::LeftShift,
            ">>" => OperatorKind::RightShift,
            "&" => OperatorKind::BitAnd,
            "|" => OperatorKind::BitOr,
            "^" => OperatorKind::BitXor,
            "~" => OperatorKind::Invert,
            "!" => OperatorKind::Not,
            "+=" => OperatorKind::AddAssign,
            "-=" => OperatorKind::SubAssign,
            "*=" => OperatorKind::MulAssign,
            "/=" => OperatorKind::DivAssign,
            "%=" => OperatorKind::ModAssign,
            "<<=" => OperatorKind::LeftShiftAssign,
            ">>=" => OperatorKind::RightShiftAssign,
            "&=" => OperatorKind::BitAndAssign,
            "|=" => OperatorKind::BitOrAssign,
            "^=" => OperatorKind::BitXorAssign,
            "==" => OperatorKind::Equal,
            "!=" => OperatorKind::NotEqual,
            "<" => OperatorKind::Less,
            "<=" => OperatorKind::LessEqual,
            ">" => OperatorKind::Greater,
            ">=" => OperatorKind::GreaterEqual,
            "=" => OperatorKind::Assign,
            "[]" => OperatorKind::Subscript,
            "()" => OperatorKind::Call,
            _ => return None,
        };
        Some(kind)
    }

    /// Dynamic protocol method name.
    ///
    /// `operand_count` is the number of explicit operands besides the receiver;
    /// unary `-` and `+` map to `__neg__` and `__pos__`.
    pub fn dynamic_name(self, operand_count: usize) -> Option<&'static str> {
        let name = match self {
            OperatorKind::Add if operand_count == 0 => "__pos__",
            OperatorKind::Sub if operand_count == 0 => "__neg__",
            OperatorKind::Add => "__add__",
            OperatorKind::Sub => "__sub__",
            OperatorKind::Mul => "__mul__",
            OperatorKind::Div => "__div__",
            OperatorKind::Mod => "__mod__",
            OperatorKind::LeftShift => "__lshift__",
            OperatorKind::RightShift => "__rshift__",
            OperatorKind::BitAnd => "__and__",
            OperatorKind::BitOr => "__or__",
            OperatorKind::BitXor => "__xor__",
            OperatorKind::Invert => "__invert__",
            OperatorKind::Not => "__nonzero__",
            OperatorKind::AddAssign => "__iadd__",
            OperatorKind::SubAssign => "__isub__",
            OperatorKind::MulAssign => "__imul__",
            OperatorKind::DivAssign => "__idiv__",
            OperatorKind::ModAssign => "__imod__",
            OperatorKind::LeftShiftAssign => "__ilshift__",
            OperatorKind::RightShiftAssign => "__irshift__",
            OperatorKind::BitAndAssign => "__iand__",
            OperatorKind::BitOrAssign => "__ior__",
            OperatorKind::BitXorAssign => "__ixor__",
            OperatorKind::Equal => "__eq__",
            OperatorKind::NotEqual => "__ne__",
            OperatorKind::Less => "__lt__",
            OperatorKind::LessEqual => "__le__",
            OperatorKind::Greater => "__gt__",
            OperatorKind::GreaterEqual => "__ge__",
            OperatorKind::Call => "__call__",
            OperatorKind::Assign | OperatorKind::Subscript => return None,
        };
        Some(name)
    }

    /// Reverse protocol name (`__radd__`) for binary arithmetic operators.
    pub fn reverse_dynamic_name(self) -> Option<&'static str> {
        let name = match self {
            OperatorKind::Add => "__radd__",
            OperatorKind::Sub => "__rsub__",
            OperatorKind::Mul => "__rmul__",
            OperatorKind::Div => "__rdiv__",
            OperatorKind::Mod => "__rmod__",
            OperatorKind::LeftShift => "__rlshift__",
            OperatorKind::RightShift => "__rrshift__",
            OperatorKind::BitAnd => "__rand__",
            OperatorKind::BitOr => "__ror__",
            OperatorKind::BitXor => "__rxor__",
            _ => return None,
        };
        Some(name)
    }

    pub const fn is_comparison(self) -> bool {
        matches!(
            self,
            OperatorKind::Equal
                | OperatorKind::NotEqual
                | OperatorKind::Less
                | OperatorKind::LessEqual
                | OperatorKind::Greater
                | OperatorKind::GreaterEqual
        )
    }

    pub const fn is_inplace(self) -> bool {
        matches!(
            self,
            OperatorKind::AddAssign
                | OperatorKind::SubAssign
                | OperatorKind::MulAssign
                | OperatorKind::DivAssign
                | OperatorKind::ModAssign
                | OperatorKind::LeftShiftAssign
                | OperatorKind::RightShiftAssign
                | OperatorKind::BitAndAssign
                | OperatorKind::BitOrAssign
                | OperatorKind::BitXorAssign
        )
    }

    /// Operators served by the number protocol.
    pub const fn is_number_protocol(self) -> bool {
        !self.is_comparison()
            && !matches!(self, OperatorKind::Assign | OperatorKind::Subscript | OperatorKind::Call)
    }

    /// Whether the generator exposes this operator at all.
    pub const fn is_exposed(self) -> bool {
        !matches!(self, OperatorKind::Assign | OperatorKind::Subscript)
    }

    /// The rich-comparison opcode name used by the runtime (`Py_EQ`, ...).
    pub const fn compare_opcode(self) -> Option<&'static str> {
        match self {
            OperatorKind::Equal => Some("Py_EQ"),
            OperatorKind::NotEqual => Some("Py_NE"),
            OperatorKind::Less => Some("Py_LT"),
            OperatorKind::LessEqual => Some("Py_LE"),
            OperatorKind::Greater => Some("Py_GT"),
            OperatorKind::GreaterEqual => Some("Py_GE"),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unary_minus_is_negation() {
        assert_eq!(OperatorKind::Sub.dynamic_name(0), Some("__neg__"));
        assert_eq!(OperatorKind::Sub.dynamic_name(1), Some("__sub__"));
    }

    #[test]
    fn symbols_round_trip() {
        for symbol in ["+", "-=", "<<", "==", ">=", "~"] {
            let kind = OperatorKind::from_cpp_symbol(symbol).unwrap();
            assert_eq!(kind.cpp_symbol(), symbol);
        }
    }

    #[test]
    fn classification() {
        assert!(OperatorKind::Less.is_comparison());
        assert!(!OperatorKind::Less.is_number_protocol());
        assert!(OperatorKind::AddAssign.is_inplace());
        assert!(!OperatorKind::Assign.is_exposed());
        assert_eq!(OperatorKind::Mul.reverse_dynamic_name(), Some("__rmul__"));
        assert_eq!(OperatorKind::Equal.reverse_dynamic_name(), None);
    }
}
