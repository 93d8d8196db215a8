//! Per-class wrapper source file.
//!
//! [`ClassGenerator`] assembles everything the other emitters produce for one
//! class into `<cls>_wrapper.cpp` and reports the registration function the
//! module init has to call.
//!
//! ## File Layout
//!
//! ```text
//! protected hack, includes, native beginning snippets
//! // Native    trampoline subclass (classes that need one)
//! // Target    extern "C" dispatchers, method table, protocol slots
//! hash / copier helpers, multiple inheritance helpers
//! // Class Definition
//! type discovery, enums and flags
//! init_<Cls>(PyObject* module)
//! native end snippets
//! ```

use wrapgen_core::{ClassEntry, CodeLanguage, FunctionEntry, GenerationError, SnipPosition};
use wrapgen_registry::{GroupKind, OverloadGroup, class_function_groups, constructor_group};

use crate::GeneratorContext;
use crate::conversion::{to_cpp, to_python};
use crate::enums::{emit_enum_definition, emit_enum_initialization, emit_flags_methods, type_ext};
use crate::forward::{emit_constructor_wrapper, emit_method_wrapper};
use crate::module::GeneratedFile;
use crate::multiple_inheritance::{emit_mi_init, emit_special_cast, multiple_inheriting_class};
use crate::naming::{self, CPP_SELF, PY_RESULT};
use crate::overload::OverloadDecisor;
use crate::protocols::{
    NumberSlots, emit_getset_table, emit_getter, emit_method_table_with, emit_nonzero_function, emit_richcompare,
    emit_sequence_functions, emit_sequence_table, emit_setter, has_bool_cast, is_number_slot, is_sequence_method,
    sequence_functions,
};
use crate::signals::emit_signal_initialization;
use crate::type_discovery::{emit_inheritance_links, emit_type_discovery, emit_type_resolvers, has_type_discovery};
use crate::type_object::{TypeSlots, slot_line};
use crate::virtual_bridge::VirtualBridge;
use crate::writer::CodeWriter;

/// Generated source of one class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassArtifact {
    pub class_name: String,
    pub file: GeneratedFile,
    /// `void init_<Cls>(PyObject* module)`
    pub init_function: String,
}

/// `operator!` is dispatched as a method; `nb_nonzero` comes from `operator bool`.
const NONZERO: &str = "__nonzero__";

/// The class lexically enclosing `class`, when it is itself wrapped.
pub fn enclosing_class<'a>(ctx: &GeneratorContext<'a>, class: &ClassEntry) -> Option<&'a ClassEntry> {
    let (scope, _) = class.qualified_name.rsplit_once("::")?;
    ctx.class(scope)
}

fn is_own_function(class: &ClassEntry, function: &FunctionEntry) -> bool {
    function
        .implementing_class
        .as_deref()
        .is_none_or(|c| c == class.qualified_name)
}

/// Emits the wrapper source for one class.
pub struct ClassGenerator<'c, 'a> {
    ctx: &'c GeneratorContext<'a>,
    class: &'a ClassEntry,
    constructors: Option<OverloadGroup>,
    groups: Vec<OverloadGroup>,
}

impl<'c, 'a> ClassGenerator<'c, 'a> {
    pub fn new(ctx: &'c GeneratorContext<'a>, class: &'a ClassEntry) -> Self {
        let groups = class_function_groups(class)
            .into_iter()
            .filter_map(|mut group| {
                group.functions.retain(|f| is_own_function(class, f));
                (!group.is_empty()).then_some(group)
            })
            .collect();
        Self {
            ctx,
            class,
            constructors: Self::constructor_group(class),
            groups,
        }
    }

    /// Declared constructors, or the implicit default one when the class
    /// declares none.
    fn constructor_group(class: &ClassEntry) -> Option<OverloadGroup> {
        if class.is_namespace() || class.has_private_destructor() {
            return None;
        }
        if class.constructors().next().is_some() {
            return constructor_group(class);
        }
        let implicit = FunctionEntry::constructor(class.name.clone()).with_owner(class.qualified_name.clone());
        Some(
            OverloadGroup::new(class.name.clone(), Some(class.qualified_name.clone()), GroupKind::Constructor)
                .with_function(implicit),
        )
    }

    /// Groups served through the method table.
    fn method_groups(&self) -> impl Iterator<Item = &OverloadGroup> {
        self.groups.iter().filter(|g| match g.kind {
            GroupKind::Method => !is_sequence_method(&g.name),
            GroupKind::NumberOperator => !is_number_slot(&g.name) || g.name == NONZERO,
            _ => false,
        })
    }

    /// Operator groups filling number slots.
    fn number_groups(&self) -> impl Iterator<Item = &OverloadGroup> {
        self.groups
            .iter()
            .filter(|g| g.kind == GroupKind::NumberOperator && is_number_slot(&g.name) && g.name != NONZERO)
    }

    fn number_slots(&self) -> NumberSlots {
        let groups: Vec<OverloadGroup> = self.number_groups().cloned().collect();
        NumberSlots::collect(self.class, &groups, self.ctx.module())
    }

    fn has_comparisons(&self) -> bool {
        self.groups.iter().any(|g| g.kind == GroupKind::Comparison)
    }

    fn slot_function(&self, method: &str) -> Option<String> {
        self.groups
            .iter()
            .find(|g| g.kind == GroupKind::Method && g.name == method)
            .map(|g| naming::group_function(g, self.ctx.module()))
    }

    fn uses_protected_hack(&self) -> bool {
        !self.ctx.options.avoid_protected_hack && !self.class.is_namespace() && !self.class.has_private_destructor()
    }

    fn pyside(&self) -> bool {
        self.ctx.options.enable_pyside_extensions
    }

    /// Produce the class file.
    #[tracing::instrument(level = "debug", skip_all, fields(class = %self.class.qualified_name))]
    pub fn generate(&self) -> Result<ClassArtifact, GenerationError> {
        #[cfg(feature = "profiling")]
        profiling::scope!("ClassGenerator::generate");

        let class = self.class;
        let mut w = CodeWriter::new();

        self.emit_prologue(&mut w);
        if class.needs_native_wrapper() {
            VirtualBridge::new(self.ctx, class).emit(&mut w)?;
            w.blank();
        }
        self.emit_target_section(&mut w)?;
        self.emit_helpers(&mut w)?;
        self.emit_class_definition(&mut w);
        if has_type_discovery(class) {
            emit_type_discovery(self.ctx, &mut w, class);
        }
        for entry in &class.enums {
            if entry.flags.is_some() {
                emit_flags_methods(&mut w, entry);
            }
            emit_enum_definition(&mut w, entry);
        }
        self.emit_register_function(&mut w);
        for snip in class.snips.iter().filter(|s| is_snip(s, SnipPosition::End, CodeLanguage::Native)) {
            w.code(&snip.code);
            w.blank();
        }

        tracing::debug!(groups = self.groups.len(), "class generated");
        Ok(ClassArtifact {
            class_name: class.qualified_name.clone(),
            file: GeneratedFile::new(naming::class_file(&class.qualified_name), w.finish()),
            init_function: format!("void {}(PyObject* module)", naming::class_init(&class.qualified_name)),
        })
    }

    // ==========================================================================
    // Prologue
    // ==========================================================================

    fn emit_prologue(&self, w: &mut CodeWriter) {
        let class = self.class;
        if self.uses_protected_hack() {
            w.line("//workaround to access protected functions");
            w.line("#define protected public");
            w.blank();
        }
        w.line("// default includes");
        w.line("#include <shiboken.h>");
        if self.pyside() {
            w.line("#include <qsignal.h>");
            w.line("#include <qproperty.h>");
            w.line("#include <pyside.h>");
        }
        w.line("#include <typeresolver.h>");
        w.line("#include <typeinfo>");
        if self.pyside() && class.is_qobject() {
            w.line("#include <signalmanager.h>");
            w.line("#include <dynamicqmetaobject.h>");
        }
        if multiple_inheriting_class(self.ctx, class).is_some() {
            w.line("#include <set>");
        }
        w.line(format!("#include \"{}\"", naming::module_header(self.ctx.module())));
        w.blank();
        w.line("using namespace Shiboken;");
        w.blank();
        for snip in class.snips.iter().filter(|s| is_snip(s, SnipPosition::Beginning, CodeLanguage::Native)) {
            w.code(&snip.code);
            w.blank();
        }
    }

    // ==========================================================================
    // Target Section
    // ==========================================================================

    fn emit_target_section(&self, w: &mut CodeWriter) -> Result<(), GenerationError> {
        let class = self.class;
        let qualified = &class.qualified_name;
        w.line("// Target ---------------------------------------------------------");
        w.blank();
        w.line("extern \"C\" {");

        if let Some(group) = &self.constructors {
            let decisor = OverloadDecisor::build(self.ctx, group);
            emit_constructor_wrapper(self.ctx, w, class, &decisor)?;
        }

        let decisors: Vec<OverloadDecisor<'_>> = self
            .method_groups()
            .map(|group| OverloadDecisor::build(self.ctx, group))
            .collect();
        for decisor in &decisors {
            emit_method_wrapper(self.ctx, w, decisor)?;
        }

        let mut extra = Vec::new();
        if class.is_value_type() {
            self.emit_copy_function(w);
            extra.push(format!(
                "{{\"__copy__\", (PyCFunction){}___copy__, METH_NOARGS}},",
                naming::base_name(qualified)
            ));
        }
        let refs: Vec<&OverloadDecisor<'_>> = decisors.iter().collect();
        emit_method_table_with(self.ctx, w, &naming::methods_table(qualified), &refs, &extra);

        let slots = self.number_slots();
        if !slots.is_empty() {
            for group in self.number_groups() {
                let decisor = OverloadDecisor::build(self.ctx, group);
                emit_method_wrapper(self.ctx, w, &decisor)?;
            }
            if has_bool_cast(class) {
                emit_nonzero_function(w, class);
            }
            w.line("// type has number operators");
            slots.emit(w, qualified);
        }

        if !sequence_functions(class).is_empty() {
            emit_sequence_functions(w, class);
            emit_sequence_table(w, class);
        }

        if self.has_comparisons() {
            w.line("// Rich comparison");
            emit_richcompare(self.ctx, w, class, &self.groups);
        }

        if self.has_getset_list() {
            for field in class.fields.iter().filter(|f| !f.is_static) {
                emit_getter(w, class, field);
                if !field.is_const {
                    emit_setter(w, class, field);
                }
                w.blank();
            }
            w.line(format!("// Getters and Setters for {}", class.name));
            emit_getset_table(w, class);
        }

        w.line("} // extern \"C\"");
        w.blank();
        Ok(())
    }

    fn has_getset_list(&self) -> bool {
        self.class.fields.iter().any(|f| !f.is_static)
    }

    /// `Cls.__copy__`: a new, dynamically owned native copy.
    fn emit_copy_function(&self, w: &mut CodeWriter) {
        let qualified = &self.class.qualified_name;
        w.line(format!("static PyObject* {}___copy__(PyObject* self)", naming::base_name(qualified)));
        w.block("", |w| {
            w.line(format!("{qualified}* {CPP_SELF} = 0;"));
            w.line("if (Shiboken::cppObjectIsInvalid(self))");
            w.indented(|w| w.line("return 0;"));
            w.line(format!("{CPP_SELF} = Shiboken::Converter<{qualified}* >::toCpp(self);"));
            w.line(format!("PyObject* {PY_RESULT} = 0;"));
            w.line(format!("{qualified}* copy = new {qualified}(*{CPP_SELF});"));
            w.line(format!("{PY_RESULT} = Shiboken::Converter<{qualified}* >::toPython(copy);"));
            w.line(format!("SbkBaseWrapper_setOwnership({PY_RESULT}, true);"));
            w.blank();
            w.block(format!("if (PyErr_Occurred() || !{PY_RESULT})"), |w| {
                w.line(format!("Py_XDECREF({PY_RESULT});"));
                w.line("return 0;");
            });
            w.line(format!("return {PY_RESULT};"));
        });
        w.blank();
    }

    // ==========================================================================
    // Helpers outside the extern block
    // ==========================================================================

    fn emit_helpers(&self, w: &mut CodeWriter) -> Result<(), GenerationError> {
        let class = self.class;
        let base = naming::base_name(&class.qualified_name);
        if let Some(hash) = &class.hash_function {
            w.block(format!("static long {base}_HashFunc(PyObject* obj)"), |w| {
                w.line(format!("return {hash}(*{});", to_cpp(&class.as_type(), "obj")));
            });
            w.blank();
        }
        if self.has_object_copier() {
            w.block(format!("static void* {base}_ObjCopierFunc(const void* ptr)"), |w| {
                w.line(format!(
                    "return new {}(*reinterpret_cast<const {}*>(ptr));",
                    naming::wrapper_class(&class.qualified_name),
                    class.qualified_name
                ));
            });
            w.blank();
        }
        if let Some(mi_class) = multiple_inheriting_class(self.ctx, class) {
            if mi_class.qualified_name == class.qualified_name {
                emit_mi_init(self.ctx, w, class);
                w.blank();
            }
            emit_special_cast(self.ctx, w, class)?;
        }
        Ok(())
    }

    fn has_object_copier(&self) -> bool {
        self.class.is_value_type() && self.class.needs_native_wrapper()
    }

    // ==========================================================================
    // Class Definition
    // ==========================================================================

    fn type_slots(&self) -> TypeSlots {
        let class = self.class;
        let qualified = &class.qualified_name;
        let base = naming::base_name(qualified);
        let mut slots = TypeSlots::new()
            .with("tp_name", format!("\"{}.{}\"", self.ctx.module(), naming::dotted(qualified)))
            .with("tp_basicsize", "sizeof(Shiboken::SbkBaseWrapper)")
            .with("tp_methods", naming::methods_table(qualified));

        let has_visible_constructor = self.constructors.is_some();
        if class.is_namespace() || class.has_private_destructor() {
            slots.set("tp_flags", "Py_TPFLAGS_DEFAULT|Py_TPFLAGS_CHECKTYPES");
            if class.has_private_destructor() {
                slots.set("tp_dealloc", "Shiboken::deallocWrapperWithPrivateDtor");
            }
        } else {
            let flags = if has_visible_constructor {
                "Py_TPFLAGS_DEFAULT|Py_TPFLAGS_BASETYPE|Py_TPFLAGS_CHECKTYPES"
            } else {
                "Py_TPFLAGS_DEFAULT|Py_TPFLAGS_CHECKTYPES"
            };
            slots.set("tp_flags", flags);
            slots.set("tp_dealloc", "&Shiboken::deallocWrapper");
            if let Some(group) = &self.constructors {
                slots.set("tp_init", naming::group_function(group, self.ctx.module()));
            }
        }
        if has_visible_constructor {
            slots.set("tp_new", "Shiboken::SbkBaseWrapper_TpNew");
        }
        if class.bases.is_empty() {
            slots.set("tp_base", "reinterpret_cast<PyTypeObject*>(&Shiboken::SbkBaseWrapper_Type)");
        }
        if !self.number_slots().is_empty() {
            slots.set("tp_as_number", format!("&{}", naming::number_table(qualified)));
        }
        if !sequence_functions(class).is_empty() {
            slots.set("tp_as_sequence", format!("&{}", naming::sequence_table(qualified)));
        }
        if class.hash_function.is_some() {
            slots.set("tp_hash", format!("&{base}_HashFunc"));
        }
        if self.has_comparisons() {
            slots.set("tp_richcompare", naming::richcompare(qualified));
        }
        if self.has_getset_list() {
            slots.set("tp_getset", naming::getset_table(qualified));
        }
        if let Some(repr) = self.slot_function("__repr__") {
            slots.set("tp_repr", repr);
        }
        if let Some(str_function) = self.slot_function("__str__") {
            slots.set("tp_str", str_function);
        }
        slots
    }

    fn emit_class_definition(&self, w: &mut CodeWriter) {
        let class = self.class;
        let qualified = &class.qualified_name;
        let base = naming::base_name(qualified);

        let mut extension = vec![("mi_offsets", "0".to_string())];
        let mi_class = multiple_inheriting_class(self.ctx, class);
        let mi_init = match mi_class {
            Some(mi) if mi.qualified_name == *qualified => naming::mi_init(qualified),
            _ => "0".to_string(),
        };
        extension.push(("mi_init", mi_init));
        let special_cast = if mi_class.is_some() {
            format!("&{}", naming::special_cast(qualified))
        } else {
            "0".to_string()
        };
        extension.push(("mi_specialcast", special_cast));
        extension.push(("type_discovery", "0".to_string()));
        let copier = if self.has_object_copier() {
            format!("&{base}_ObjCopierFunc")
        } else {
            "0".to_string()
        };
        extension.push(("obj_copier", copier));
        extension.push(("ext_isconvertible", "0".to_string()));
        extension.push(("ext_tocpp", "0".to_string()));
        let cpp_dtor = if class.is_namespace() || class.has_private_destructor() {
            "0".to_string()
        } else {
            format!("&Shiboken::callCppDestructor<{qualified} >")
        };
        extension.push(("cpp_dtor", cpp_dtor));
        extension.push(("is_multicpp", "0".to_string()));
        extension.push(("is_user_type", "0".to_string()));
        let suffix = if class.is_value_type() { "" } else { "*" };
        extension.push(("original_name", format!("\"{qualified}{suffix}\"")));
        extension.push(("user_data", "0".to_string()));

        let slots = self.type_slots();
        w.line("// Class Definition -----------------------------------------------");
        w.line("extern \"C\" {");
        w.line(format!("static SbkBaseWrapperType {} = {{ {{ {{", naming::type_object(qualified)));
        w.indented(|w| {
            w.line("PyObject_HEAD_INIT(&Shiboken::SbkBaseWrapperType_Type)");
            slots.emit(w, false);
        });
        w.line("}, },");
        w.indented(|w| {
            let last = extension.len() - 1;
            for (i, (slot, value)) in extension.iter().enumerate() {
                w.line(slot_line(slot, value, i == last));
            }
        });
        w.line("};");
        w.line("} //extern");
        w.blank();
    }

    // ==========================================================================
    // Registration
    // ==========================================================================

    fn emit_register_function(&self, w: &mut CodeWriter) {
        let class = self.class;
        let qualified = &class.qualified_name;
        let type_name = naming::type_object(qualified);
        w.line(format!("void {}(PyObject* module)", naming::class_init(qualified)));
        w.block("", |w| {
            w.line(format!(
                "{} = reinterpret_cast<PyTypeObject*>(&{type_name});",
                type_ext(qualified)
            ));
            w.blank();
            let beginning: Vec<_> = class
                .snips
                .iter()
                .filter(|s| is_snip(s, SnipPosition::Beginning, CodeLanguage::Dynamic))
                .collect();
            if !beginning.is_empty() {
                for snip in beginning {
                    w.code(&snip.code);
                }
                w.blank();
            }

            if let Some(primary) = class.bases.first() {
                w.line(format!("{type_name}.super.ht_type.tp_base = {};", type_ext(primary)));
            }
            if class.bases.len() > 1 {
                w.line(format!("{type_name}.super.ht_type.tp_bases = PyTuple_Pack({},", class.bases.len()));
                let bases: Vec<String> = class
                    .bases
                    .iter()
                    .map(|b| format!("(PyTypeObject*){}", type_ext(b)))
                    .collect();
                w.indented(|w| w.line(format!("{});", bases.join(", "))));
                w.blank();
            }
            if let Some(mi_class) = multiple_inheriting_class(self.ctx, class)
                .filter(|mi| mi.qualified_name != *qualified)
            {
                w.line(format!(
                    "{type_name}.mi_init = reinterpret_cast<SbkBaseWrapperType*>({})->mi_init;",
                    type_ext(&mi_class.qualified_name)
                ));
                w.blank();
            }
            if class.is_polymorphic() {
                w.line("// Fill type discovery information");
                if has_type_discovery(class) {
                    w.line(format!(
                        "{type_name}.type_discovery = &{};",
                        naming::type_discovery(qualified)
                    ));
                    emit_inheritance_links(w, class);
                }
                w.blank();
            }

            w.line(format!("if (PyType_Ready((PyTypeObject*)&{type_name}) < 0)"));
            w.indented(|w| w.line("return;"));
            w.blank();

            if enclosing_class(self.ctx, class).is_some() {
                w.line(format!(
                    "PyDict_SetItemString(module,\"{}\", (PyObject*)&{type_name});",
                    class.name
                ));
            } else {
                w.line(format!("Py_INCREF(reinterpret_cast<PyObject*>(&{type_name}));"));
                w.line(format!("PyModule_AddObject(module, \"{}\",", class.name));
                w.indented(|w| w.line(format!("((PyObject*)&{type_name}));")));
                w.blank();
            }

            if !class.enums.is_empty() {
                w.line("// Initialize enums");
                w.line("PyObject* enum_item;");
                w.blank();
            }
            for entry in &class.enums {
                emit_enum_initialization(w, entry);
            }

            if self.pyside() {
                emit_signal_initialization(w, class);
            }

            for field in class.fields.iter().filter(|f| f.is_static) {
                w.line(format!(
                    "PyDict_SetItemString({type_name}.super.ht_type.tp_dict, \"{}\", {});",
                    field.name,
                    to_python(&field.ty, &format!("{qualified}::{}", field.name))
                ));
            }
            w.blank();

            let end: Vec<_> = class
                .snips
                .iter()
                .filter(|s| is_snip(s, SnipPosition::End, CodeLanguage::Dynamic))
                .collect();
            if !end.is_empty() {
                w.blank();
                for snip in end {
                    w.code(&snip.code);
                }
            }

            emit_type_resolvers(w, class);
            if self.pyside() && !class.is_namespace() {
                let star = if class.is_value_type() { "" } else { "*" };
                w.line(format!("PySide::initQtMetaType<{qualified}{star} >();"));
            }
        });
        w.blank();
    }
}

fn is_snip(snip: &wrapgen_core::CodeSnip, position: SnipPosition, language: CodeLanguage) -> bool {
    snip.position == position && snip.language == language
}

#[cfg(test)]
mod tests {
    use super::*;
    use wrapgen_core::{
        ArgIndex, ArgumentEntry, ArgumentModification, ClassFlags, CodeSnip, CppType, EnumEntry, FieldEntry,
        FunctionModification, GeneratorOptions, OperatorKind, PrimitiveKind,
    };
    use wrapgen_registry::ApiRegistry;

    fn int() -> CppType {
        CppType::primitive(PrimitiveKind::Int)
    }

    fn generate(classes: Vec<ClassEntry>, name: &str, options: GeneratorOptions) -> Result<ClassArtifact, GenerationError> {
        let mut registry = ApiRegistry::new();
        for class in classes {
            registry.register_class(class).unwrap();
        }
        let ctx = GeneratorContext::new(&registry, &options).unwrap();
        let class = ctx.class(name).unwrap();
        ClassGenerator::new(&ctx, class).generate()
    }

    fn point() -> ClassEntry {
        let point = CppType::value("Point");
        ClassEntry::value("Point")
            .with_function(
                FunctionEntry::constructor("Point")
                    .with_arg(ArgumentEntry::new("x", int()).with_default("0"))
                    .with_arg(ArgumentEntry::new("y", int()).with_default("0")),
            )
            .with_function(FunctionEntry::method("x", int()).as_const())
            .with_function(
                FunctionEntry::operator(OperatorKind::Add, point.clone())
                    .with_arg(ArgumentEntry::new("other", point.clone().const_ref())),
            )
            .with_function(
                FunctionEntry::operator(OperatorKind::Equal, CppType::primitive(PrimitiveKind::Bool))
                    .with_arg(ArgumentEntry::new("other", point.const_ref())),
            )
            .with_field(FieldEntry::new("label", int()))
    }

    #[test]
    fn value_class_file_layout() {
        let artifact = generate(vec![point()], "Point", GeneratorOptions::for_module("sample")).unwrap();
        let text = &artifact.file.contents;
        assert_eq!(artifact.file.name, "point_wrapper.cpp");
        assert_eq!(artifact.init_function, "void init_Point(PyObject* module)");
        assert!(text.starts_with("//workaround to access protected functions\n#define protected public\n\n// default includes\n"));
        assert!(text.contains("#include \"sample_python.h\"\n\nusing namespace Shiboken;\n"));
        assert!(!text.contains("// Native ---"));

        let order = [
            "extern \"C\" {",
            "static int SbkPoint_Init(PyObject* self, PyObject* args, PyObject* kwds)",
            "static PyObject* SbkPointFunc_x(PyObject* self)",
            "static PyObject* SbkPoint___copy__(PyObject* self)",
            "static PyMethodDef SbkPoint_methods[] = {",
            "// type has number operators",
            "// Rich comparison",
            "// Getters and Setters for Point",
            "} // extern \"C\"",
            "// Class Definition ---",
            "void init_Point(PyObject* module)",
        ];
        let mut last = 0;
        for fragment in order {
            let at = text[last..].find(fragment).map(|i| i + last);
            assert!(at.is_some(), "missing or out of order: {fragment}\n{text}");
            last = at.unwrap_or(last);
        }
        assert!(text.contains("    {\"__copy__\", (PyCFunction)SbkPoint___copy__, METH_NOARGS},\n    {0} // Sentinel\n"));
    }

    #[test]
    fn type_object_slots() {
        let artifact = generate(vec![point()], "Point", GeneratorOptions::for_module("sample")).unwrap();
        let text = &artifact.file.contents;
        assert!(text.contains("static SbkBaseWrapperType SbkPoint_Type = { { {\n    PyObject_HEAD_INIT(&Shiboken::SbkBaseWrapperType_Type)\n"));
        assert!(text.contains("    /*tp_name*/             \"sample.Point\",\n"));
        assert!(text.contains("    /*tp_dealloc*/          &Shiboken::deallocWrapper,\n"));
        assert!(text.contains("    /*tp_as_number*/        &SbkPoint_as_number,\n"));
        assert!(text.contains("    /*tp_flags*/            Py_TPFLAGS_DEFAULT|Py_TPFLAGS_BASETYPE|Py_TPFLAGS_CHECKTYPES,\n"));
        assert!(text.contains("    /*tp_richcompare*/      SbkPoint_richcompare,\n"));
        assert!(text.contains("    /*tp_getset*/           SbkPoint_getsetlist,\n"));
        assert!(text.contains("    /*tp_init*/             SbkPoint_Init,\n"));
        assert!(text.contains("    /*tp_new*/              Shiboken::SbkBaseWrapper_TpNew,\n"));
        assert!(text.contains("    /*tp_weaklist*/         0\n}, },\n    /*mi_offsets*/          0,\n"));
        assert!(text.contains("    /*cpp_dtor*/            &Shiboken::callCppDestructor<Point >,\n"));
        assert!(text.contains("    /*original_name*/       \"Point\",\n    /*user_data*/           0\n};\n} //extern\n"));
    }

    #[test]
    fn registration_function() {
        let artifact = generate(vec![point()], "Point", GeneratorOptions::for_module("sample")).unwrap();
        let text = &artifact.file.contents;
        let expected = "\
void init_Point(PyObject* module)
{
    SbkPoint_TypeExt = reinterpret_cast<PyTypeObject*>(&SbkPoint_Type);

    if (PyType_Ready((PyTypeObject*)&SbkPoint_Type) < 0)
        return;

    Py_INCREF(reinterpret_cast<PyObject*>(&SbkPoint_Type));
    PyModule_AddObject(module, \"Point\",
        ((PyObject*)&SbkPoint_Type));


    Shiboken::TypeResolver::createValueTypeResolver<Point >(\"Point\");
    Shiboken::TypeResolver::createObjectTypeResolver<Point >(\"Point*\");
    Shiboken::TypeResolver::createValueTypeResolver<Point >(typeid(Point).name());
}
";
        assert!(text.contains(expected), "{text}");
    }

    #[test]
    fn polymorphic_derived_class_links_into_the_hierarchy() {
        let base = ClassEntry::object("ObjectType")
            .with_virtual_destructor()
            .with_function(FunctionEntry::method("event", CppType::void()).as_virtual());
        let derived = ClassEntry::object("Derived")
            .with_base("ObjectType")
            .with_virtual_destructor()
            .with_function(FunctionEntry::method("event", CppType::void()).as_virtual());
        let artifact = generate(vec![base, derived], "Derived", GeneratorOptions::for_module("sample")).unwrap();
        let text = &artifact.file.contents;
        assert!(text.contains("// Native ---------------------------------------------------------"));
        assert!(text.contains("void DerivedWrapper::event()"));
        assert!(text.contains("    /*tp_base*/             0,\n"));
        assert!(text.contains("    /*original_name*/       \"Derived*\",\n"));
        assert!(text.contains("static SbkBaseWrapperType* SbkDerived_typeDiscovery(void* cptr, SbkBaseWrapperType* instanceType)"));
        assert!(text.contains(
            "    SbkDerived_Type.super.ht_type.tp_base = SbkObjectType_TypeExt;\n    // Fill type discovery information\n    SbkDerived_Type.type_discovery = &SbkDerived_typeDiscovery;\n"
        ));
        assert!(text.contains("createObjectTypeResolver<Derived >(typeid(DerivedWrapper).name());"));
    }

    #[test]
    fn multiple_inheritance_helpers() {
        let classes = vec![
            ClassEntry::object("Base1"),
            ClassEntry::object("Base2"),
            ClassEntry::object("MDerived1").with_base("Base1").with_base("Base2"),
            ClassEntry::object("SonOfMDerived1").with_base("MDerived1"),
        ];
        let artifact = generate(classes.clone(), "MDerived1", GeneratorOptions::for_module("sample")).unwrap();
        let text = &artifact.file.contents;
        assert!(text.contains("#include <set>\n"));
        assert!(text.contains("MDerived1_mi_init(const void* cptr)"));
        assert!(text.contains("    /*mi_init*/             MDerived1_mi_init,\n"));
        assert!(text.contains("    /*mi_specialcast*/      &SbkMDerived1SpecialCastFunction,\n"));
        assert!(text.contains(
            "    SbkMDerived1_Type.super.ht_type.tp_bases = PyTuple_Pack(2,\n        (PyTypeObject*)SbkBase1_TypeExt, (PyTypeObject*)SbkBase2_TypeExt);\n"
        ));

        let artifact = generate(classes, "SonOfMDerived1", GeneratorOptions::for_module("sample")).unwrap();
        let text = &artifact.file.contents;
        assert!(!text.contains("SonOfMDerived1_mi_init"));
        assert!(text.contains(
            "    SbkSonOfMDerived1_Type.mi_init = reinterpret_cast<SbkBaseWrapperType*>(SbkMDerived1_TypeExt)->mi_init;\n"
        ));
    }

    #[test]
    fn namespaces_have_no_constructor_or_destructor() {
        let ns = ClassEntry::namespace("SampleNamespace")
            .with_function(FunctionEntry::method("getNumber", int()).as_static())
            .with_enum(EnumEntry::new("Option", "SampleNamespace").with_value("None", 0).with_value("RandomNumber", 1));
        let artifact = generate(vec![ns], "SampleNamespace", GeneratorOptions::for_module("sample")).unwrap();
        let text = &artifact.file.contents;
        assert!(!text.contains("#define protected public"));
        assert!(!text.contains("_Init("));
        assert!(text.contains("    /*tp_dealloc*/          0,\n"));
        assert!(text.contains("    /*tp_flags*/            Py_TPFLAGS_DEFAULT|Py_TPFLAGS_CHECKTYPES,\n"));
        assert!(text.contains("    /*cpp_dtor*/            0,\n"));
        assert!(text.contains("    // Initialize enums\n    PyObject* enum_item;\n\n    // init enum: Option\n"));
        assert!(!text.contains("TypeResolver<SampleNamespace"));
    }

    #[test]
    fn implicit_default_constructor() {
        let artifact = generate(vec![ClassEntry::object("Bare")], "Bare", GeneratorOptions::for_module("sample")).unwrap();
        assert!(artifact.file.contents.contains("static int SbkBare_Init(PyObject* self, PyObject* args, PyObject* kwds)"));
    }

    #[test]
    fn private_constructors_block_instantiation() {
        let class = ClassEntry::object("Singleton").with_function(FunctionEntry::constructor("Singleton").as_private());
        let artifact = generate(vec![class], "Singleton", GeneratorOptions::for_module("sample")).unwrap();
        let text = &artifact.file.contents;
        assert!(!text.contains("SbkSingleton_Init"));
        assert!(text.contains("    /*tp_init*/             0,\n"));
        assert!(text.contains("    /*tp_new*/              0,\n"));
    }

    #[test]
    fn static_fields_and_class_snippets() {
        let mut counter = FieldEntry::new("count", int());
        counter.is_static = true;
        let mut class = ClassEntry::object("Counter").with_field(counter);
        class.snips.push(CodeSnip::new(SnipPosition::Beginning, CodeLanguage::Native, "static int helper = 0;"));
        class.snips.push(CodeSnip::new(SnipPosition::End, CodeLanguage::Dynamic, "PyErr_Clear();"));
        let artifact = generate(vec![class], "Counter", GeneratorOptions::for_module("sample")).unwrap();
        let text = &artifact.file.contents;
        assert!(text.contains("using namespace Shiboken;\n\nstatic int helper = 0;\n\n"));
        assert!(text.contains(
            "    PyDict_SetItemString(SbkCounter_Type.super.ht_type.tp_dict, \"count\", Shiboken::Converter<int >::toPython(Counter::count));\n"
        ));
        assert!(text.contains("\n\n    PyErr_Clear();\n    Shiboken::TypeResolver"));
        assert!(!text.contains("SbkCounter_getsetlist"));
    }

    #[test]
    fn signals_are_registered_with_extensions_enabled() {
        let class = ClassEntry::object("Emitter")
            .with_flags(ClassFlags::QOBJECT)
            .with_function(FunctionEntry::new("clicked", wrapgen_core::FunctionKind::Signal, CppType::void()));
        let mut options = GeneratorOptions::for_module("sample");
        options.enable_pyside_extensions = true;
        let artifact = generate(vec![class], "Emitter", options).unwrap();
        let text = &artifact.file.contents;
        assert!(text.contains("#include <signalmanager.h>\n#include <dynamicqmetaobject.h>\n"));
        assert!(text.contains("signal_item = PySide::signalNew(\"clicked\", \"void\", NULL);"));
        assert!(text.contains("    PySide::initQtMetaType<Emitter* >();\n"));
    }

    #[test]
    fn emitter_errors_abort_the_class() {
        let modification = FunctionModification {
            arguments: vec![ArgumentModification::new(ArgIndex::Arg(1)).removed()],
            ..Default::default()
        };
        let class = ClassEntry::object("Modifications").with_function(
            FunctionEntry::method("doublePlus", int())
                .with_arg(ArgumentEntry::new("x", int()))
                .with_modification(modification),
        );
        let err = generate(vec![class], "Modifications", GeneratorOptions::for_module("sample")).unwrap_err();
        assert!(matches!(err, GenerationError::RemovedArgumentWithoutValue { .. }));
    }
}
