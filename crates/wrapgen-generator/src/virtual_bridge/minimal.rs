//! Minimal values: the safe defaults a trampoline returns when it cannot
//! produce a real result (dynamic error, missing override, bad return type).

use wrapgen_core::{CppType, FunctionEntry, GenerationError, Indirection, TypeCategory};

use crate::GeneratorContext;

/// Expression of the minimal value of `ty`, or `None` for `void`.
///
/// `context` names the function needing the value, for error reports.
pub fn minimal_value(
    ctx: &GeneratorContext<'_>,
    ty: &CppType,
    context: &str,
) -> Result<Option<String>, GenerationError> {
    if ty.is_void() {
        return Ok(None);
    }
    if ty.is_pointer() || ty.is_object() {
        return Ok(Some("0".to_string()));
    }
    if ty.indirection == Indirection::Reference {
        return Err(GenerationError::UnconstructibleMinimalValue {
            ty: ty.cpp_signature(),
            context: context.to_string(),
        });
    }

    let value = match ty.category {
        TypeCategory::Primitive(kind) => format!("{}(0)", kind.cpp_name()),
        TypeCategory::Enum | TypeCategory::Flags | TypeCategory::Container(_) => {
            format!("{}()", ty.base_signature())
        }
        TypeCategory::Value => value_class_minimal(ctx, &ty.name, context)?,
        TypeCategory::CString | TypeCategory::Custom => "0".to_string(),
        TypeCategory::Void | TypeCategory::Varargs | TypeCategory::Object => {
            return Err(GenerationError::UnconstructibleMinimalValue {
                ty: ty.cpp_signature(),
                context: context.to_string(),
            });
        }
    };
    Ok(Some(value))
}

/// `Class(T(0), ...)` from the cheapest constructor whose mandatory
/// arguments are all primitives.
fn value_class_minimal(ctx: &GeneratorContext<'_>, class_name: &str, context: &str) -> Result<String, GenerationError> {
    let class = ctx
        .class(class_name)
        .ok_or_else(|| GenerationError::UnknownClass(class_name.to_string()))?;

    let mandatory = |ctor: &FunctionEntry| -> Vec<usize> {
        (0..ctor.arguments.len())
            .filter(|&i| ctor.default_value(i).is_none())
            .collect()
    };
    let best = class
        .constructors()
        .filter(|ctor| !ctor.is_private() && !ctor.is_copy_constructor())
        .filter(|ctor| mandatory(ctor).iter().all(|&i| ctor.arguments[i].ty.is_number()))
        .min_by_key(|ctor| ctor.arguments.len());

    // A class without declared constructors has the implicit default one.
    if class.constructors().next().is_none() {
        return Ok(format!("{class_name}()"));
    }
    let ctor = best.ok_or_else(|| GenerationError::NoDefaultConstructor {
        class: class_name.to_string(),
        context: context.to_string(),
    })?;
    let args: Vec<String> = mandatory(ctor)
        .into_iter()
        .filter_map(|i| ctor.arguments[i].ty.as_primitive())
        .map(|kind| format!("{}(0)", kind.cpp_name()))
        .collect();
    Ok(format!("{class_name}({})", args.join(", ")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wrapgen_core::{ArgumentEntry, ClassEntry, ContainerKind, GeneratorOptions, PrimitiveKind};
    use wrapgen_registry::ApiRegistry;

    fn with_ctx<R>(classes: Vec<ClassEntry>, body: impl FnOnce(&GeneratorContext<'_>) -> R) -> R {
        let mut registry = ApiRegistry::new();
        for class in classes {
            registry.register_class(class).unwrap();
        }
        let options = GeneratorOptions::default();
        let ctx = GeneratorContext::new(&registry, &options).unwrap();
        body(&ctx)
    }

    fn int() -> CppType {
        CppType::primitive(PrimitiveKind::Int)
    }

    #[test]
    fn scalar_minimal_values() {
        with_ctx(vec![], |ctx| {
            let min = |ty: CppType| minimal_value(ctx, &ty, "f").unwrap();
            assert_eq!(min(CppType::void()), None);
            assert_eq!(min(int()).as_deref(), Some("int(0)"));
            assert_eq!(min(CppType::object("ObjectType")).as_deref(), Some("0"));
            assert_eq!(min(CppType::value("Point").pointer()).as_deref(), Some("0"));
            assert_eq!(min(CppType::enumeration("Overload::FunctionEnum")).as_deref(), Some("Overload::FunctionEnum()"));
            let list = CppType::container(ContainerKind::List, "std::list", vec![int()]);
            assert_eq!(min(list).as_deref(), Some("std::list<int >()"));
        });
    }

    #[test]
    fn value_classes_use_the_cheapest_primitive_constructor() {
        let size = ClassEntry::value("Size")
            .with_function(
                FunctionEntry::constructor("Size")
                    .with_arg(ArgumentEntry::new("width", CppType::primitive(PrimitiveKind::Double)))
                    .with_arg(ArgumentEntry::new("height", CppType::primitive(PrimitiveKind::Double))),
            )
            .with_function(
                FunctionEntry::constructor("Size").with_arg(ArgumentEntry::new("other", CppType::value("Point").const_ref())),
            );
        with_ctx(vec![ClassEntry::value("Point"), size], |ctx| {
            let value = minimal_value(ctx, &CppType::value("Size").const_ref(), "f").unwrap();
            assert_eq!(value.as_deref(), Some("Size(double(0), double(0))"));
            let implicit = minimal_value(ctx, &CppType::value("Point"), "f").unwrap();
            assert_eq!(implicit.as_deref(), Some("Point()"));
        });
    }

    #[test]
    fn value_class_without_usable_constructor_fails() {
        let handle = ClassEntry::value("Handle").with_function(
            FunctionEntry::constructor("Handle").with_arg(ArgumentEntry::new("name", CppType::cstring())),
        );
        with_ctx(vec![handle], |ctx| {
            let err = minimal_value(ctx, &CppType::value("Handle"), "Abstract::handle()").unwrap_err();
            assert_eq!(
                err,
                GenerationError::NoDefaultConstructor {
                    class: "Handle".into(),
                    context: "Abstract::handle()".into()
                }
            );
        });
    }
}
