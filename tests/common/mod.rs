//! Shared sample API model for integration tests.
//!
//! Mirrors a small C++ library with overloads, value and object types, an
//! abstract class, a parent/child factory and a multiple-inheritance chain.

#![allow(dead_code)]

use wrapgen::core::{
    ArgIndex, ArgumentEntry, ClassEntry, CppType, EnumEntry, FieldEntry, FunctionEntry, OperatorKind,
    OwnershipModification, PrimitiveKind,
};
use wrapgen::registry::{ApiRegistry, GroupKind, OverloadGroup};
use wrapgen::{ApiModel, BindingUnit};

pub const MODULE: &str = "sample";

pub fn int() -> CppType {
    CppType::primitive(PrimitiveKind::Int)
}

pub fn double() -> CppType {
    CppType::primitive(PrimitiveKind::Double)
}

pub fn point() -> ClassEntry {
    let point_ref = CppType::value("Point").const_ref();
    ClassEntry::value("Point")
        .with_function(FunctionEntry::constructor("Point"))
        .with_function(
            FunctionEntry::constructor("Point")
                .with_arg(ArgumentEntry::new("x", double()))
                .with_arg(ArgumentEntry::new("y", double())),
        )
        .with_function(FunctionEntry::method("x", double()).as_const())
        .with_function(FunctionEntry::method("y", double()).as_const())
        .with_function(
            FunctionEntry::operator(OperatorKind::Add, CppType::value("Point"))
                .with_arg(ArgumentEntry::new("other", point_ref.clone()))
                .as_const(),
        )
        .with_function(
            FunctionEntry::operator(OperatorKind::Equal, CppType::primitive(PrimitiveKind::Bool))
                .with_arg(ArgumentEntry::new("other", point_ref))
                .as_const(),
        )
}

pub fn size() -> ClassEntry {
    ClassEntry::value("Size")
        .with_function(FunctionEntry::constructor("Size"))
        .with_field(FieldEntry::new("width", double()))
        .with_field(FieldEntry::new("height", double()))
}

pub fn overload() -> ClassEntry {
    let function_enum = CppType::enumeration("Overload::FunctionEnum");
    let mut class = ClassEntry::object("Overload")
        .with_enum(
            EnumEntry::new("FunctionEnum", "Overload")
                .with_value("Function0", 0)
                .with_value("Function1", 1),
        )
        .with_enum(
            EnumEntry::new("ParamEnum", "Overload")
                .with_value("Param0", 0)
                .with_value("Param1", 1),
        )
        .with_function(FunctionEntry::constructor("Overload"));
    for function in overloaded_group().functions {
        class = class.with_function(function);
    }
    class
        .with_function(
            FunctionEntry::method("strBufferOverloads", function_enum)
                .with_arg(ArgumentEntry::new("arg", CppType::cstring()))
                .with_arg(ArgumentEntry::new("data", CppType::cstring()))
                .with_arg(
                    ArgumentEntry::new("isReadOnly", CppType::primitive(PrimitiveKind::Bool)).with_default("true"),
                ),
        )
}

/// `Overload::overloaded`, in declaration order.
pub fn overloaded_group() -> OverloadGroup {
    let ret = CppType::enumeration("Overload::FunctionEnum");
    OverloadGroup::new("overloaded", Some("Overload".into()), GroupKind::Method)
        .with_function(FunctionEntry::method("overloaded", ret.clone()))
        .with_function(
            FunctionEntry::method("overloaded", ret.clone())
                .with_arg(ArgumentEntry::new("size", CppType::value("Size").pointer())),
        )
        .with_function(
            FunctionEntry::method("overloaded", ret.clone())
                .with_arg(ArgumentEntry::new("point", CppType::value("Point").pointer()))
                .with_arg(ArgumentEntry::new("param", CppType::enumeration("Overload::ParamEnum"))),
        )
        .with_function(
            FunctionEntry::method("overloaded", ret)
                .with_arg(ArgumentEntry::new("point", CppType::value("Point").const_ref())),
        )
}

pub fn abstract_class() -> ClassEntry {
    ClassEntry::object("Abstract")
        .with_virtual_destructor()
        .with_function(FunctionEntry::constructor("Abstract").with_arg(ArgumentEntry::new("id", int()).with_default("0")))
        .with_function(FunctionEntry::method("pureVirtual", CppType::void()).as_abstract())
        .with_function(FunctionEntry::method("id", int()).as_virtual())
        .with_function(FunctionEntry::method("callPureVirtual", CppType::void()))
}

pub fn derived() -> ClassEntry {
    ClassEntry::object("Derived")
        .with_base("Abstract")
        .with_virtual_destructor()
        .with_function(FunctionEntry::constructor("Derived").with_arg(ArgumentEntry::new("id", int()).with_default("0")))
        .with_function(FunctionEntry::method("pureVirtual", CppType::void()).as_virtual())
}

pub fn object_type() -> ClassEntry {
    let object = CppType::object("ObjectType");
    ClassEntry::object("ObjectType")
        .with_virtual_destructor()
        .with_function(
            FunctionEntry::constructor("ObjectType").with_arg(ArgumentEntry::new("parent", object.clone()).with_default("0")),
        )
        .with_function(FunctionEntry::method("parent", object.clone()).as_const())
        .with_function(
            FunctionEntry::method("setParent", CppType::void())
                .with_arg(ArgumentEntry::new("parent", object.clone()))
                .with_ownership(OwnershipModification::parent(ArgIndex::This, ArgIndex::Arg(1))),
        )
        .with_function(
            FunctionEntry::method("takeChild", object.clone())
                .with_arg(ArgumentEntry::new("name", CppType::cstring()))
                .with_ownership(OwnershipModification::dynamic_owns(ArgIndex::Return)),
        )
        .with_function(
            FunctionEntry::method("setLayout", CppType::void())
                .with_arg(ArgumentEntry::new("layout", object))
                .with_ownership(OwnershipModification::keep_reference(ArgIndex::Arg(1), Some("layout".into()))),
        )
}

pub fn multiple_inheritance() -> Vec<ClassEntry> {
    vec![
        ClassEntry::object("Base1").with_virtual_destructor(),
        ClassEntry::object("Base2").with_virtual_destructor(),
        ClassEntry::object("MDerived1")
            .with_base("Base1")
            .with_base("Base2")
            .with_virtual_destructor(),
    ]
}

/// The whole sample library.
pub fn sample_model() -> ApiModel {
    let mut classes = vec![point(), size(), overload(), abstract_class(), derived(), object_type()];
    classes.extend(multiple_inheritance());
    ApiModel {
        classes,
        functions: vec![
            FunctionEntry::method("gimmeInt", int()),
            FunctionEntry::method("gimmeDouble", double()),
        ],
        enums: vec![
            EnumEntry::new("GlobalEnum", "")
                .with_value("NoThing", 0)
                .with_value("FirstThing", 1),
        ],
    }
}

pub fn sample_registry() -> ApiRegistry {
    let mut registry = ApiRegistry::new();
    sample_model().register_into(&mut registry).expect("sample model registers");
    registry
}

pub fn sample_unit() -> BindingUnit {
    let mut unit = BindingUnit::for_module(MODULE);
    unit.add_model(sample_model()).expect("sample model registers");
    unit
}
