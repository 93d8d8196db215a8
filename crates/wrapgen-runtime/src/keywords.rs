//! Keyword argument resolution.
//!
//! Mirrors what a generated dispatcher does before converting arguments:
//! validate the argument count, then fill defaulted parameters from named
//! arguments. Only parameters with a default value can be named. Resolution
//! builds a fresh argument list, so a conflict leaves the caller's
//! arguments untouched.

use crate::error::{RuntimeError, RuntimeResult};
use crate::value::DynValue;

/// A parameter as seen by keyword resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parameter<'a> {
    pub name: &'a str,
    pub has_default: bool,
}

impl<'a> Parameter<'a> {
    pub fn required(name: &'a str) -> Self {
        Self {
            name,
            has_default: false,
        }
    }

    pub fn defaulted(name: &'a str) -> Self {
        Self {
            name,
            has_default: true,
        }
    }
}

/// Reject calls whose argument count no overload can accept.
pub fn check_argument_count(
    function: &str,
    num_args: usize,
    num_named_args: usize,
    min: usize,
    max: usize,
) -> RuntimeResult<()> {
    if num_args + num_named_args > max {
        return Err(RuntimeError::TooManyArguments {
            function: function.to_string(),
        });
    }
    if num_args < min {
        return Err(RuntimeError::NotEnoughArguments {
            function: function.to_string(),
        });
    }
    Ok(())
}

/// One value per parameter: positional first, then named values for
/// defaulted parameters. `None` means the default applies.
pub fn resolve_arguments(
    function: &str,
    parameters: &[Parameter<'_>],
    positional: &[DynValue],
    named: &[(String, DynValue)],
) -> RuntimeResult<Vec<Option<DynValue>>> {
    if positional.len() > parameters.len() {
        return Err(RuntimeError::TooManyArguments {
            function: function.to_string(),
        });
    }
    let mut resolved: Vec<Option<DynValue>> = positional.iter().cloned().map(Some).collect();
    resolved.resize(parameters.len(), None);

    for (position, parameter) in parameters.iter().enumerate().filter(|(_, p)| p.has_default) {
        let Some((_, value)) = named.iter().find(|(name, _)| name == parameter.name) else {
            continue;
        };
        if position < positional.len() {
            return Err(RuntimeError::MultipleValuesForKeyword {
                function: function.to_string(),
                keyword: parameter.name.to_string(),
            });
        }
        resolved[position] = Some(value.clone());
    }

    let required = parameters.iter().take_while(|p| !p.has_default).count();
    if resolved.iter().take(required).any(Option::is_none) {
        return Err(RuntimeError::NotEnoughArguments {
            function: function.to_string(),
        });
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Overload::strBufferOverloads(const Str&, const char*, bool = true)
    fn parameters() -> Vec<Parameter<'static>> {
        vec![
            Parameter::required("arg"),
            Parameter::required("data"),
            Parameter::defaulted("isReadOnly"),
        ]
    }

    #[test]
    fn named_values_fill_defaulted_parameters() {
        let positional = [DynValue::Str("s".into()), DynValue::Str("d".into())];
        let named = [("isReadOnly".to_string(), DynValue::Bool(false))];
        let resolved = resolve_arguments("f", &parameters(), &positional, &named).unwrap();
        assert_eq!(resolved[2], Some(DynValue::Bool(false)));

        let resolved = resolve_arguments("f", &parameters(), &positional, &[]).unwrap();
        assert_eq!(resolved[2], None);
    }

    #[test]
    fn conflicts_leave_arguments_untouched() {
        let positional = vec![
            DynValue::Str("s".into()),
            DynValue::Str("d".into()),
            DynValue::Bool(true),
        ];
        let before = positional.clone();
        let named = [("isReadOnly".to_string(), DynValue::Bool(false))];
        let err = resolve_arguments("sample.Overload.strBufferOverloads", &parameters(), &positional, &named)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "sample.Overload.strBufferOverloads(): got multiple values for keyword argument 'isReadOnly'."
        );
        assert_eq!(positional, before);
    }

    #[test]
    fn required_parameters_cannot_be_named() {
        let named = [("data".to_string(), DynValue::Str("d".into()))];
        let err = resolve_arguments("f", &parameters(), &[DynValue::Str("s".into())], &named).unwrap_err();
        assert!(matches!(err, RuntimeError::NotEnoughArguments { .. }));
    }

    #[test]
    fn counts_are_validated_first() {
        assert!(check_argument_count("f", 2, 0, 2, 3).is_ok());
        assert_eq!(
            check_argument_count("f", 3, 1, 2, 3).unwrap_err().to_string(),
            "f(): too many arguments"
        );
        assert_eq!(
            check_argument_count("f", 1, 0, 2, 3).unwrap_err().to_string(),
            "f(): not enough arguments"
        );
    }
}
