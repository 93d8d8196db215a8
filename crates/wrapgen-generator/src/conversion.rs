//! Argument conversion descriptors and converter expressions.
//!
//! An [`ArgumentConversion`] is derived per call site from a candidate's
//! argument: the native type, whether implicit conversions require a guarded
//! temporary, the dynamic-side type replacement and the default expression.
//! It renders the declaration of `cpp_argN` in the dispatcher body.

use wrapgen_core::{ArgIndex, CppType, FunctionEntry, TypeCategory, TypeCheck};

use crate::naming;
use crate::writer::CodeWriter;
use crate::GeneratorContext;

/// Spelling used as the `Shiboken::Converter<...>` template argument.
///
/// Wrapped classes are always converted through pointers; primitives and
/// containers drop `const` and references; C strings keep `const char*`.
pub fn converter_spelling(ty: &CppType) -> String {
    match ty.category {
        TypeCategory::Value | TypeCategory::Object => format!("{}*", ty.name),
        TypeCategory::CString => "const char*".to_string(),
        TypeCategory::Custom => "PyObject*".to_string(),
        _ => ty.unqualified().cpp_signature(),
    }
}

/// Spelling for return values converted back to the dynamic side.
pub fn result_spelling(ty: &CppType) -> String {
    if ty.has_identity() || ty.category == TypeCategory::CString {
        converter_spelling(ty)
    } else {
        ty.unqualified().cpp_signature()
    }
}

pub fn to_cpp(ty: &CppType, dynamic_expr: &str) -> String {
    format!("Shiboken::Converter<{} >::toCpp({dynamic_expr})", converter_spelling(ty))
}

pub fn to_python(ty: &CppType, native_expr: &str) -> String {
    format!("Shiboken::Converter<{} >::toPython({native_expr})", result_spelling(ty))
}

/// C expression evaluating `check` on the dynamic object `arg`.
pub fn check_expression(ty: &CppType, check: &TypeCheck, arg: &str) -> String {
    match check {
        TypeCheck::Number { permissive: true, .. } => format!("PyNumber_Check({arg})"),
        TypeCheck::Number { kind, .. } if kind.is_bool() => format!("PyBool_Check({arg})"),
        TypeCheck::Number { kind, .. } if kind.is_floating() => format!("PyFloat_Check({arg})"),
        TypeCheck::Number { .. } => format!("PyInt_Check({arg})"),
        TypeCheck::String => format!("Shiboken::Converter<const char* >::isConvertible({arg})"),
        TypeCheck::Wrapper { class, accepts_none } => {
            let spelling = if *accepts_none { format!("{class}*") } else { class.clone() };
            format!("Shiboken::Converter<{spelling} >::isConvertible({arg})")
        }
        TypeCheck::Enum { name } | TypeCheck::Flags { name } => {
            format!("{}({arg})", naming::check_function(name))
        }
        TypeCheck::Container { .. } => format!(
            "Shiboken::Converter<{} >::isConvertible({arg})",
            ty.unqualified().cpp_signature()
        ),
        TypeCheck::Any => format!("{arg} != 0"),
        TypeCheck::Custom { function } => format!("{function}({arg})"),
    }
}

/// Check function guessed for a dynamic-side type replacement.
pub fn replacement_check(replaced_type: &str) -> TypeCheck {
    let function = match replaced_type {
        "PyObject" | "PyObject*" | "object" => return TypeCheck::Any,
        "PyString" | "str" => "PyString_Check".to_string(),
        "PyInt" | "int" => "PyInt_Check".to_string(),
        "PyFloat" | "float" => "PyFloat_Check".to_string(),
        "PyBool" | "bool" => "PyBool_Check".to_string(),
        "PySequence" => "PySequence_Check".to_string(),
        "PyCallable" => "PyCallable_Check".to_string(),
        other => format!("Shiboken::Converter<{other} >::isConvertible"),
    };
    TypeCheck::Custom { function }
}

/// How one dynamic argument becomes a native value at a call site.
#[derive(Debug, Clone, PartialEq)]
pub struct ArgumentConversion {
    /// 0-based native position.
    pub position: usize,
    pub ty: CppType,
    pub replaced_type: Option<String>,
    pub default_value: Option<String>,
    /// Implicit conversions exist; a converted temporary must be owned locally.
    pub implicit: bool,
    /// `cpp_argN`, numbered by dynamic position.
    pub native_name: String,
    /// Dynamic object holding the argument (`pyargs[N]` or `arg`).
    pub source: String,
}

impl ArgumentConversion {
    pub fn derive(
        ctx: &GeneratorContext<'_>,
        function: &FunctionEntry,
        position: usize,
        dynamic_position: usize,
        source: String,
    ) -> Self {
        let ty = function.arguments[position].ty.clone();
        Self {
            position,
            implicit: ctx.has_implicit_conversions(&ty),
            replaced_type: function.type_replaced(ArgIndex::Arg(position + 1)).map(str::to_string),
            default_value: function.default_value(position).map(str::to_string),
            native_name: format!("cpp_arg{dynamic_position}"),
            source,
            ty,
        }
    }

    /// Custom and varargs arguments are passed through untouched; replaced
    /// types are converted by injected code.
    pub fn is_converted(&self) -> bool {
        self.replaced_type.is_none() && !matches!(self.ty.category, TypeCategory::Custom | TypeCategory::Varargs)
    }

    /// Expression passing the converted value to the native call.
    pub fn call_expression(&self) -> String {
        if !self.is_converted() {
            return self.source.clone();
        }
        if self.ty.is_wrapper_class() && !self.ty.is_pointer() {
            format!("*{}", self.native_name)
        } else {
            self.native_name.clone()
        }
    }

    /// Declare and initialize the native value.
    pub fn emit(&self, w: &mut CodeWriter, error_return: &str) {
        if !self.is_converted() {
            return;
        }
        let spelling = converter_spelling(&self.ty);
        let name = &self.native_name;
        let source = &self.source;

        if self.ty.is_wrapper_class() {
            let check = naming::check_function(&self.ty.name);
            if self.implicit {
                w.line(format!(
                    "if ({check}({source}) && Shiboken::cppObjectIsInvalid({source}))"
                ));
            } else {
                w.line(format!("if (Shiboken::cppObjectIsInvalid({source}))"));
            }
            w.indented(|w| w.line(format!("return {error_return};")));
        }

        let by_value = self.ty.is_value() && !self.ty.is_pointer();
        if let (true, Some(default)) = (by_value, &self.default_value) {
            w.line(format!("{} {name}_tmp = {default};", self.ty.name));
        }

        let converted = to_cpp(&self.ty, source);
        match &self.default_value {
            Some(default) => {
                let fallback = if by_value { format!("&{name}_tmp") } else { default.clone() };
                w.line(format!("{spelling} {name} = {source} ? {converted} : {fallback};"));
            }
            None => w.line(format!("{spelling} {name} = {converted};")),
        }

        if self.implicit {
            let base = &self.ty.name;
            let check = naming::check_function(base);
            w.line(format!("std::auto_ptr<{base} > {name}_auto_ptr;"));
            w.line(format!("if ({source} && !{check}({source}))"));
            w.indented(|w| w.line(format!("{name}_auto_ptr = std::auto_ptr<{base} >({name});")));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wrapgen_core::PrimitiveKind;

    #[test]
    fn converter_spellings() {
        assert_eq!(converter_spelling(&CppType::value("Point").const_ref()), "Point*");
        assert_eq!(converter_spelling(&CppType::primitive(PrimitiveKind::Int).const_ref()), "int");
        assert_eq!(converter_spelling(&CppType::cstring()), "const char*");
        assert_eq!(result_spelling(&CppType::value("Point")), "Point");
        assert_eq!(result_spelling(&CppType::object("ObjectType")), "ObjectType*");
    }

    #[test]
    fn number_checks_follow_permissiveness() {
        let double = CppType::primitive(PrimitiveKind::Double);
        let strict = TypeCheck::for_type(&double, false);
        let loose = TypeCheck::for_type(&double, true);
        assert_eq!(check_expression(&double, &strict, "arg"), "PyFloat_Check(arg)");
        assert_eq!(check_expression(&double, &loose, "arg"), "PyNumber_Check(arg)");
    }

    #[test]
    fn enum_checks_use_the_enum_type() {
        let ty = CppType::enumeration("Overload::ParamEnum");
        let check = TypeCheck::for_type(&ty, false);
        assert_eq!(check_expression(&ty, &check, "pyargs[1]"), "SbkOverload_ParamEnum_Check(pyargs[1])");
    }

    #[test]
    fn value_with_default_uses_temporary() {
        let conversion = ArgumentConversion {
            position: 0,
            ty: CppType::value("Point").const_ref(),
            replaced_type: None,
            default_value: Some("Point(0, 0)".into()),
            implicit: false,
            native_name: "cpp_arg0".into(),
            source: "pyargs[0]".into(),
        };
        let mut w = CodeWriter::new();
        conversion.emit(&mut w, "0");
        let text = w.finish();
        assert!(text.contains("if (Shiboken::cppObjectIsInvalid(pyargs[0]))"));
        assert!(text.contains("Point cpp_arg0_tmp = Point(0, 0);"));
        assert!(text.contains(
            "Point* cpp_arg0 = pyargs[0] ? Shiboken::Converter<Point* >::toCpp(pyargs[0]) : &cpp_arg0_tmp;"
        ));
        assert_eq!(conversion.call_expression(), "*cpp_arg0");
    }

    #[test]
    fn replacement_checks() {
        assert_eq!(replacement_check("PyObject"), TypeCheck::Any);
        assert_eq!(
            replacement_check("PySequence"),
            TypeCheck::Custom { function: "PySequence_Check".into() }
        );
    }
}
