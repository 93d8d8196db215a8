//! Argument listings shown by the generated "wrong arguments" error.
//!
//! Each candidate contributes one entry: its dynamic-visible arguments
//! rendered with dynamic-side type names and defaults. The runtime prefixes
//! every entry with the function name when it formats the error.

use wrapgen_core::{ArgIndex, FunctionEntry};

/// Render a default value expression for a listing.
fn display_default(function: &FunctionEntry, position: usize, value: &str) -> String {
    let ty = &function.arguments[position].ty;
    if value == "0" && ty.accepts_none() {
        return "None".to_string();
    }
    value.replace("::", ".").replace('"', "\\\"")
}

/// `int, Point = None` for one candidate.
pub fn argument_listing(function: &FunctionEntry) -> String {
    let args: Vec<String> = function
        .visible_arguments()
        .map(|(i, arg)| {
            let ty = function
                .type_replaced(ArgIndex::Arg(i + 1))
                .map(|t| t.replace("::", "."))
                .unwrap_or_else(|| arg.ty.display_name());
            match function.default_value(i) {
                Some(value) => format!("{ty} = {}", display_default(function, i, value)),
                None => ty,
            }
        })
        .collect();
    args.join(", ")
}

/// Listings for all candidates in order.
pub fn overload_listings(functions: &[FunctionEntry]) -> Vec<String> {
    functions.iter().map(argument_listing).collect()
}

/// A C string literal for embedding a listing in generated code.
pub fn c_string_literal(text: &str) -> String {
    format!("\"{text}\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use wrapgen_core::{ArgumentEntry, ContainerKind, CppType, PrimitiveKind};

    #[test]
    fn listing_uses_dynamic_names_and_defaults() {
        let f = FunctionEntry::method("f", CppType::void())
            .with_arg(ArgumentEntry::new("a", CppType::primitive(PrimitiveKind::Double)))
            .with_arg(ArgumentEntry::new("b", CppType::object("ObjectType")).with_default("0"))
            .with_arg(ArgumentEntry::new("c", CppType::enumeration("Overload::ParamEnum")).with_default("Overload::Param0"))
            .with_arg(ArgumentEntry::new(
                "d",
                CppType::container(ContainerKind::List, "std::list", vec![CppType::primitive(PrimitiveKind::Int)]),
            ));
        assert_eq!(
            argument_listing(&f),
            "float, ObjectType = None, Overload.ParamEnum = Overload.Param0, list"
        );
    }

    #[test]
    fn quotes_are_escaped() {
        let f = FunctionEntry::method("f", CppType::void())
            .with_arg(ArgumentEntry::new("s", CppType::cstring()).with_default("\"x\""));
        assert_eq!(argument_listing(&f), "str = \\\"x\\\"");
    }
}
