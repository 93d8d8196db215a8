//! Conversions between native values and [`DynValue`]s.
//!
//! - [`FromDyn`]: extract a native value, as `Converter<T>::toCpp` does
//! - [`IntoDyn`]: build a dynamic value, as `Converter<T>::toPython` does
//!
//! Integers are range checked; floating point values accept any number.
//! Enumerators convert through [`EnumValue`], keeping their type name.

use crate::error::ConversionError;
use crate::value::DynValue;

pub trait FromDyn: Sized {
    fn from_dyn(value: &DynValue) -> Result<Self, ConversionError>;
}

pub trait IntoDyn {
    fn into_dyn(self) -> DynValue;
}

fn integer_of(value: &DynValue) -> Option<i128> {
    match value {
        DynValue::Bool(v) => Some(i128::from(*v)),
        DynValue::Int(v) => Some(*v),
        DynValue::Enum { value, .. } | DynValue::Flags { value, .. } => Some(i128::from(*value)),
        _ => None,
    }
}

// ============================================================================
// Integer implementations
// ============================================================================

macro_rules! impl_dyn_int {
    ($($ty:ty),*) => {
        $(
            impl FromDyn for $ty {
                fn from_dyn(value: &DynValue) -> Result<Self, ConversionError> {
                    let v = integer_of(value).ok_or_else(|| ConversionError::TypeMismatch {
                        expected: "int",
                        actual: value.type_name().to_string(),
                    })?;
                    <$ty>::try_from(v).map_err(|_| ConversionError::IntegerOverflow {
                        value: v,
                        target_type: stringify!($ty),
                    })
                }
            }

            impl IntoDyn for $ty {
                fn into_dyn(self) -> DynValue {
                    DynValue::Int(i128::from(self))
                }
            }
        )*
    };
}

impl_dyn_int!(i8, i16, i32, i64, i128, u8, u16, u32, u64);

// ============================================================================
// Float, bool and string implementations
// ============================================================================

impl FromDyn for f64 {
    fn from_dyn(value: &DynValue) -> Result<Self, ConversionError> {
        match value {
            DynValue::Float(v) => Ok(*v),
            other => integer_of(other)
                .map(|v| v as f64)
                .ok_or_else(|| ConversionError::TypeMismatch {
                    expected: "float",
                    actual: other.type_name().to_string(),
                }),
        }
    }
}

impl FromDyn for f32 {
    fn from_dyn(value: &DynValue) -> Result<Self, ConversionError> {
        f64::from_dyn(value).map(|v| v as f32)
    }
}

impl IntoDyn for f64 {
    fn into_dyn(self) -> DynValue {
        DynValue::Float(self)
    }
}

impl IntoDyn for f32 {
    fn into_dyn(self) -> DynValue {
        DynValue::Float(f64::from(self))
    }
}

impl FromDyn for bool {
    fn from_dyn(value: &DynValue) -> Result<Self, ConversionError> {
        match value {
            DynValue::None => Ok(false),
            DynValue::Float(v) => Ok(*v != 0.0),
            DynValue::Str(s) => Ok(!s.is_empty()),
            DynValue::List(items) | DynValue::Tuple(items) => Ok(!items.is_empty()),
            other => integer_of(other)
                .map(|v| v != 0)
                .ok_or_else(|| ConversionError::TypeMismatch {
                    expected: "bool",
                    actual: other.type_name().to_string(),
                }),
        }
    }
}

impl IntoDyn for bool {
    fn into_dyn(self) -> DynValue {
        DynValue::Bool(self)
    }
}

impl FromDyn for String {
    fn from_dyn(value: &DynValue) -> Result<Self, ConversionError> {
        match value {
            DynValue::Str(s) => Ok(s.clone()),
            other => Err(ConversionError::TypeMismatch {
                expected: "str",
                actual: other.type_name().to_string(),
            }),
        }
    }
}

impl IntoDyn for String {
    fn into_dyn(self) -> DynValue {
        DynValue::Str(self)
    }
}

impl IntoDyn for &str {
    fn into_dyn(self) -> DynValue {
        DynValue::Str(self.to_string())
    }
}

impl IntoDyn for () {
    fn into_dyn(self) -> DynValue {
        DynValue::None
    }
}

impl<T: IntoDyn> IntoDyn for Vec<T> {
    fn into_dyn(self) -> DynValue {
        DynValue::List(self.into_iter().map(IntoDyn::into_dyn).collect())
    }
}

impl<T: FromDyn> FromDyn for Vec<T> {
    fn from_dyn(value: &DynValue) -> Result<Self, ConversionError> {
        match value {
            DynValue::List(items) | DynValue::Tuple(items) => items.iter().map(T::from_dyn).collect(),
            other => Err(ConversionError::TypeMismatch {
                expected: "list",
                actual: other.type_name().to_string(),
            }),
        }
    }
}

impl<A: IntoDyn, B: IntoDyn> IntoDyn for (A, B) {
    fn into_dyn(self) -> DynValue {
        DynValue::Tuple(vec![self.0.into_dyn(), self.1.into_dyn()])
    }
}

// ============================================================================
// Enumerators
// ============================================================================

/// A native enumerator together with its enum type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumValue {
    pub type_name: String,
    pub value: i64,
}

impl EnumValue {
    pub fn new(type_name: impl Into<String>, value: i64) -> Self {
        Self {
            type_name: type_name.into(),
            value,
        }
    }
}

impl FromDyn for EnumValue {
    fn from_dyn(value: &DynValue) -> Result<Self, ConversionError> {
        match value {
            DynValue::Enum { type_name, value } | DynValue::Flags { type_name, value } => {
                Ok(EnumValue::new(type_name.clone(), *value))
            }
            other => Err(ConversionError::TypeMismatch {
                expected: "enum",
                actual: other.type_name().to_string(),
            }),
        }
    }
}

impl IntoDyn for EnumValue {
    fn into_dyn(self) -> DynValue {
        DynValue::Enum {
            type_name: self.type_name,
            value: self.value,
        }
    }
}

// ============================================================================
// Sequence helpers
// ============================================================================

/// A sequence of integers as a native `int` array, optionally 0-terminated.
pub fn sequence_to_int_array(value: &DynValue, zero_terminated: bool) -> Result<Vec<i32>, ConversionError> {
    let (DynValue::List(items) | DynValue::Tuple(items)) = value else {
        return Err(ConversionError::IntSequenceExpected);
    };
    let mut array = Vec::with_capacity(items.len() + usize::from(zero_terminated));
    for item in items {
        if !matches!(item, DynValue::Int(_)) {
            return Err(ConversionError::IntSequenceExpected);
        }
        array.push(i32::from_dyn(item)?);
    }
    if zero_terminated {
        array.push(0);
    }
    Ok(array)
}

/// A sequence of strings as an `argc`/`argv` pair.
///
/// An empty sequence becomes just `default_app_name` when one is given.
/// Returns `None` if the value is not a sequence of strings.
pub fn sequence_to_argv(value: &DynValue, default_app_name: Option<&str>) -> Option<Vec<String>> {
    let (DynValue::List(items) | DynValue::Tuple(items)) = value else {
        return None;
    };
    let mut argv = items
        .iter()
        .map(|item| match item {
            DynValue::Str(s) => Some(s.clone()),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()?;
    if argv.is_empty()
        && let Some(name) = default_app_name
    {
        argv.push(name.to_string());
    }
    Some(argv)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_round_trip_across_their_range() {
        for v in [i32::MIN, -1, 0, 1, i32::MAX] {
            assert_eq!(i32::from_dyn(&v.into_dyn()), Ok(v));
        }
        for v in [0u8, 200, u8::MAX] {
            assert_eq!(u8::from_dyn(&v.into_dyn()), Ok(v));
        }
        assert_eq!(i64::from_dyn(&i64::MIN.into_dyn()), Ok(i64::MIN));
        for v in [0u64, i64::MAX as u64 + 1, u64::MAX] {
            assert_eq!(u64::from_dyn(&v.into_dyn()), Ok(v));
        }
        assert_eq!(u64::MAX.into_dyn(), DynValue::Int(18_446_744_073_709_551_615));
        assert_eq!(
            i64::from_dyn(&u64::MAX.into_dyn()),
            Err(ConversionError::IntegerOverflow {
                value: i128::from(u64::MAX),
                target_type: "i64"
            })
        );
        assert_eq!(
            u8::from_dyn(&DynValue::Int(256)),
            Err(ConversionError::IntegerOverflow {
                value: 256,
                target_type: "u8"
            })
        );
        assert!(u32::from_dyn(&DynValue::Int(-1)).is_err());
    }

    #[test]
    fn floats_accept_any_number() {
        assert_eq!(f64::from_dyn(&1.25f64.into_dyn()), Ok(1.25));
        assert_eq!(f64::from_dyn(&DynValue::Int(3)), Ok(3.0));
        assert_eq!(f32::from_dyn(&0.5f32.into_dyn()), Ok(0.5));
        assert!(f64::from_dyn(&DynValue::Str("1".into())).is_err());
    }

    #[test]
    fn enumerators_keep_their_type() {
        let original = EnumValue::new("Overload::FunctionEnum", 1);
        let value = original.clone().into_dyn();
        assert_eq!(EnumValue::from_dyn(&value), Ok(original));
        assert_eq!(i32::from_dyn(&value), Ok(1));
    }

    #[test]
    fn int_sequences() {
        let list = vec![1i32, 2, 3].into_dyn();
        assert_eq!(sequence_to_int_array(&list, true), Ok(vec![1, 2, 3, 0]));
        let mixed = DynValue::List(vec![DynValue::Int(1), DynValue::Float(2.0)]);
        assert_eq!(sequence_to_int_array(&mixed, false), Err(ConversionError::IntSequenceExpected));
    }

    #[test]
    fn argv_uses_the_default_name_for_empty_lists() {
        let empty = DynValue::List(Vec::new());
        assert_eq!(sequence_to_argv(&empty, Some("app")), Some(vec!["app".to_string()]));
        let args = vec!["prog", "-v"].into_dyn();
        assert_eq!(sequence_to_argv(&args, Some("app")), Some(vec!["prog".to_string(), "-v".to_string()]));
        assert_eq!(sequence_to_argv(&DynValue::Int(1), None), None);
    }
}
