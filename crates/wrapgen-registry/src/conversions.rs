//! Implicit conversions into wrapped classes.
//!
//! A value of type `S` converts implicitly into class `T` when:
//!
//! - `T` has a non-explicit constructor, other than the copy constructor,
//!   taking `S` as its only required argument; or
//! - `S` is a class declaring a conversion operator `operator T()`.
//!
//! The generator uses these to widen type checks (`T` accepts any `S`), to
//! order overload checks (a conversion source is tested before its target),
//! and to emit guarded temporaries at call sites.

use wrapgen_core::{ClassEntry, CppType, FunctionEntry, FunctionFlags};

use crate::ApiRegistry;

/// How an implicit conversion is performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionVia {
    /// A converting constructor of the target class.
    Constructor,
    /// A conversion operator of the source class.
    Operator,
}

/// One way to obtain a target class value from another type.
#[derive(Debug, Clone, PartialEq)]
pub struct ImplicitConversion {
    /// The convertible source type.
    pub source: CppType,
    /// The native function performing the conversion.
    pub function: FunctionEntry,
    pub via: ConversionVia,
}

fn converting_argument(ctor: &FunctionEntry) -> Option<&CppType> {
    if ctor.is_copy_constructor()
        || ctor.flags.contains(FunctionFlags::EXPLICIT)
        || ctor.is_private()
        || ctor.is_removed()
    {
        return None;
    }
    let mut required = ctor.visible_arguments().filter(|(i, _)| ctor.default_value(*i).is_none());
    let (_, first) = required.next()?;
    if required.next().is_some() {
        return None;
    }
    Some(&first.ty)
}

impl ApiRegistry {
    /// Implicit conversions into `target`, constructors first, then operators
    /// in class registration order.
    pub fn implicit_conversions(&self, target: &ClassEntry) -> Vec<ImplicitConversion> {
        let mut result: Vec<ImplicitConversion> = target
            .constructors()
            .filter_map(|ctor| {
                let source = converting_argument(ctor)?;
                if source.name == target.qualified_name {
                    return None;
                }
                Some(ImplicitConversion {
                    source: source.clone(),
                    function: ctor.clone(),
                    via: ConversionVia::Constructor,
                })
            })
            .collect();

        for class in self.classes() {
            if class.qualified_name == target.qualified_name {
                continue;
            }
            for op in class.functions.iter().filter(|f| f.is_conversion_operator()) {
                if op.return_type.name == target.qualified_name && !op.is_removed() {
                    result.push(ImplicitConversion {
                        source: class.as_type(),
                        function: op.clone(),
                        via: ConversionVia::Operator,
                    });
                }
            }
        }
        result
    }

    /// Whether `source` converts implicitly into the class named `target`.
    pub fn is_implicitly_convertible(&self, source: &CppType, target: &str) -> bool {
        self.class(target).is_some_and(|class| {
            self.implicit_conversions(class)
                .iter()
                .any(|c| c.source.name == source.name)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wrapgen_core::{ArgumentEntry, FunctionKind, PrimitiveKind};

    fn registry() -> ApiRegistry {
        let mut registry = ApiRegistry::new();
        let point = ClassEntry::value("Point")
            .with_function(FunctionEntry::constructor("Point"))
            .with_function(
                FunctionEntry::new("Point", FunctionKind::CopyConstructor, CppType::void())
                    .with_arg(ArgumentEntry::new("other", CppType::value("Point").const_ref())),
            )
            .with_function(
                FunctionEntry::constructor("Point")
                    .with_arg(ArgumentEntry::new("x", CppType::primitive(PrimitiveKind::Double)))
                    .with_arg(
                        ArgumentEntry::new("y", CppType::primitive(PrimitiveKind::Double)).with_default("0"),
                    ),
            )
            .with_function(
                FunctionEntry::constructor("Point")
                    .with_arg(ArgumentEntry::new("s", CppType::cstring()))
                    .with_flags(FunctionFlags::EXPLICIT),
            );
        let size = ClassEntry::value("Size")
            .with_function(FunctionEntry::new("operator Point", FunctionKind::Conversion, CppType::value("Point")));
        registry.register_class(point).unwrap();
        registry.register_class(size).unwrap();
        registry
    }

    #[test]
    fn converting_constructors_and_operators_are_found() {
        let registry = registry();
        let point = registry.class("Point").unwrap();
        let conversions = registry.implicit_conversions(point);
        assert_eq!(conversions.len(), 2);
        assert_eq!(conversions[0].via, ConversionVia::Constructor);
        assert_eq!(conversions[0].source.as_primitive(), Some(PrimitiveKind::Double));
        assert_eq!(conversions[1].via, ConversionVia::Operator);
        assert_eq!(conversions[1].source.name, "Size");
    }

    #[test]
    fn explicit_and_copy_constructors_do_not_convert() {
        let registry = registry();
        assert!(!registry.is_implicitly_convertible(&CppType::cstring(), "Point"));
        assert!(registry.is_implicitly_convertible(&CppType::value("Size"), "Point"));
        assert!(!registry.is_implicitly_convertible(&CppType::value("Point"), "Size"));
    }
}
