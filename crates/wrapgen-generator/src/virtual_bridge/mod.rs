//! Virtual-dispatch bridge - the native trampoline subclass.
//!
//! For every class that may be subclassed from the dynamic side, a native
//! subclass (`<Class>Wrapper`) overrides each virtual method. A trampoline
//! looks up a dynamic override by name and either calls it and converts the
//! result back, raises "not implemented" for pure virtuals, or falls back to
//! the native base implementation.
//!
//! ## Trampoline Layout
//!
//! ```text
//! acquire the global lock
//! look up the override        -> none: shell code, base call / NotImplementedError
//! build the argument tuple, run native injected code
//! call the override           -> error: print, return minimal value
//!                                (left to injected code that calls it itself)
//! validate the result type    -> wrong: TypeError, return minimal value
//! convert the result, apply reset-after-use invalidations
//! refuse to return the last dynamic reference to an object
//! ```

mod minimal;

pub use minimal::minimal_value;

use wrapgen_core::{
    ArgIndex, ClassEntry, CodeLanguage, CppType, FunctionEntry, GenerationError, OwnershipDirection,
    PrimitiveKind, SnipPosition, TypeCategory, TypeCheck,
};

use crate::GeneratorContext;
use crate::conversion::{check_expression, replacement_check, result_spelling, to_python};
use crate::naming::{self, CPP_RESULT, PY_RESULT, THREAD_STATE_SAVER};
use crate::writer::CodeWriter;

// ============================================================================
// Signatures
// ============================================================================

/// Native declaration of `function`, optionally qualified by `scope`.
///
/// Default values are omitted; they belong to the base declaration.
pub fn native_signature(function: &FunctionEntry, scope: Option<&str>) -> String {
    let args: Vec<String> = function
        .arguments
        .iter()
        .map(|a| format!("{} {}", a.ty.cpp_signature(), a.name))
        .collect();
    let prefix = scope.map(|s| format!("{s}::")).unwrap_or_default();
    let constness = if function.is_const() { " const" } else { "" };
    if function.is_constructor() {
        let name = scope.unwrap_or(function.name.as_str());
        return format!("{prefix}{name}({})", args.join(", "));
    }
    format!(
        "{} {prefix}{}({}){constness}",
        function.return_type.cpp_signature(),
        function.name,
        args.join(", ")
    )
}

/// `Py_BuildValue` format unit of an argument passed without conversion.
fn format_unit(ty: &CppType) -> Option<char> {
    if ty.is_reference() || ty.is_pointer() && ty.category != TypeCategory::CString {
        return None;
    }
    let unit = match ty.category {
        TypeCategory::CString => 'z',
        TypeCategory::Primitive(kind) => match kind {
            PrimitiveKind::Char | PrimitiveKind::SignedChar => 'b',
            PrimitiveKind::UnsignedChar => 'B',
            PrimitiveKind::Short => 'h',
            PrimitiveKind::UnsignedShort => 'H',
            PrimitiveKind::Int => 'i',
            PrimitiveKind::UnsignedInt => 'I',
            PrimitiveKind::Long => 'l',
            PrimitiveKind::UnsignedLong => 'k',
            PrimitiveKind::LongLong => 'L',
            PrimitiveKind::UnsignedLongLong => 'K',
            PrimitiveKind::Float => 'f',
            PrimitiveKind::Double => 'd',
            PrimitiveKind::Bool => return None,
        },
        _ => return None,
    };
    Some(unit)
}

// ============================================================================
// Trampoline Descriptor
// ============================================================================

/// How one virtual method's trampoline departs from the default dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrampolineDescriptor {
    pub is_abstract: bool,
    /// Dynamic-side type the override result is checked against.
    pub replaced_return: Option<String>,
    /// 0-based positions of arguments whose dynamic-side type was replaced.
    pub replaced_arguments: Vec<usize>,
    /// Injected native code calls the override itself.
    pub bypasses_override_call: bool,
    /// The base call releases the global lock.
    pub allows_thread: bool,
}

impl TrampolineDescriptor {
    pub fn of(function: &FunctionEntry) -> Self {
        let replaced_arguments = (0..function.arguments.len())
            .filter(|&position| function.type_replaced(ArgIndex::Arg(position + 1)).is_some())
            .collect();
        Self {
            is_abstract: function.is_abstract(),
            replaced_return: function.type_replaced(ArgIndex::Return).map(str::to_string),
            replaced_arguments,
            bypasses_override_call: function.injected_code_calls_override(),
            allows_thread: function.allows_thread(),
        }
    }
}

// ============================================================================
// Trampoline Subclass
// ============================================================================

/// Generates the members of one class's trampoline subclass.
pub struct VirtualBridge<'c, 'a> {
    ctx: &'c GeneratorContext<'a>,
    class: &'c ClassEntry,
    wrapper: String,
}

impl<'c, 'a> VirtualBridge<'c, 'a> {
    pub fn new(ctx: &'c GeneratorContext<'a>, class: &'c ClassEntry) -> Self {
        Self {
            ctx,
            class,
            wrapper: naming::wrapper_class(&class.qualified_name),
        }
    }

    /// Functions the trampoline subclass must override.
    pub fn trampolined_functions(&self) -> impl Iterator<Item = &'c FunctionEntry> {
        self.class
            .functions
            .iter()
            .filter(|f| f.is_virtual() && !f.is_constructor() && !f.is_private())
            .filter(|f| !f.is_removed() || f.is_abstract())
    }

    /// Constructors forwarded by the trampoline subclass.
    pub fn forwarded_constructors(&self) -> impl Iterator<Item = &'c FunctionEntry> {
        self.class
            .constructors()
            .filter(|f| !f.is_copy_constructor() && !f.is_user_added() && !f.is_private())
    }

    fn has_metaobject(&self) -> bool {
        self.ctx.options.enable_pyside_extensions && self.class.is_qobject()
    }

    /// Emit every member definition of the trampoline subclass.
    #[tracing::instrument(level = "debug", skip_all, fields(class = %self.class.qualified_name))]
    pub fn emit(&self, w: &mut CodeWriter) -> Result<(), GenerationError> {
        w.line("// Native ---------------------------------------------------------");
        w.blank();
        for ctor in self.forwarded_constructors() {
            self.emit_constructor(w, ctor);
        }
        for function in self.trampolined_functions() {
            self.emit_trampoline(w, function)?;
        }
        if self.has_metaobject() {
            self.emit_metaobject_methods(w);
        }
        self.emit_destructor(w);
        Ok(())
    }

    /// Emit the subclass declaration for the module header.
    pub fn emit_declaration(&self, w: &mut CodeWriter) {
        let wrapper = &self.wrapper;
        w.line(format!("class {wrapper} : public {}", self.class.qualified_name));
        w.line("{");
        w.line("public:");
        w.indented(|w| {
            for ctor in self.forwarded_constructors() {
                let args: Vec<String> = ctor
                    .arguments
                    .iter()
                    .map(|a| format!("{} {}", a.ty.cpp_signature(), a.name))
                    .collect();
                w.line(format!("{wrapper}({});", args.join(", ")));
            }
            for function in self.trampolined_functions() {
                w.line(format!("virtual {};", native_signature(function, None)));
            }
            if self.has_metaobject() {
                w.line("virtual const QMetaObject* metaObject() const;");
                w.line("virtual int qt_metacall(QMetaObject::Call call, int id, void** args);");
                w.line("mutable PySide::DynamicQMetaObject* m_metaObject;");
            }
            w.line(format!("virtual ~{wrapper}();"));
        });
        w.line("};");
        w.blank();
    }

    fn emit_constructor(&self, w: &mut CodeWriter, ctor: &FunctionEntry) {
        let args: Vec<&str> = ctor.arguments.iter().map(|a| a.name.as_str()).collect();
        let mut header = format!(
            "{} : {}({})",
            native_signature(ctor, Some(&self.wrapper)),
            self.class.qualified_name,
            args.join(", ")
        );
        if self.has_metaobject() {
            header.push_str(", m_metaObject(0)");
        }
        w.block(header, |w| {
            for snip in ctor.snips(SnipPosition::Beginning, CodeLanguage::Native) {
                w.code(&snip.code);
            }
            w.line("// ... middle");
            for snip in ctor.snips(SnipPosition::End, CodeLanguage::Native) {
                w.code(&snip.code);
            }
        });
        w.blank();
    }

    pub fn emit_destructor(&self, w: &mut CodeWriter) {
        w.line(format!("{0}::~{0}()", self.wrapper));
        w.block("", |w| w.line("BindingManager::instance().destroyWrapper(this);"));
    }

    fn emit_metaobject_methods(&self, w: &mut CodeWriter) {
        let class = &self.class.qualified_name;
        let wrapper = &self.wrapper;
        w.line(format!("const QMetaObject* {wrapper}::metaObject() const"));
        w.block("", |w| {
            w.block("if (!m_metaObject)", |w| {
                w.line("PyObject *pySelf = BindingManager::instance().retrieveWrapper(this);");
                w.line("void *typeData = Shiboken::getTypeUserData(reinterpret_cast<Shiboken::SbkBaseWrapper*>(pySelf));");
                w.line("if (!typeData) {");
                w.indented(|w| {
                    w.line(format!(
                        "m_metaObject = PySide::DynamicQMetaObject::createBasedOn(pySelf, pySelf->ob_type, &{class}::staticMetaObject);"
                    ));
                    w.line("Shiboken::setTypeUserData(reinterpret_cast<Shiboken::SbkBaseWrapper*>(pySelf), m_metaObject, PySide::deleteDynamicQMetaObject);");
                });
                w.line("} else {");
                w.indented(|w| w.line("m_metaObject = reinterpret_cast<PySide::DynamicQMetaObject*>(typeData);"));
                w.line("}");
            });
            w.line("return m_metaObject;");
        });
        w.blank();
        w.line(format!("int {wrapper}::qt_metacall(QMetaObject::Call call, int id, void** args)"));
        w.block("", |w| {
            w.line(format!("int result = {class}::qt_metacall(call, id, args);"));
            w.line("return result < 0 ? result : PySide::SignalManager::qt_metacall(this, call, id, args);");
        });
        w.blank();
    }

    // ========================================================================
    // Trampolines
    // ========================================================================

    /// `return <minimal>;` for early exits.
    fn minimal_return(&self, function: &FunctionEntry) -> Result<String, GenerationError> {
        let context = format!("{}::{}", self.class.qualified_name, function.minimal_signature());
        Ok(match minimal_value(self.ctx, &function.return_type, &context)? {
            Some(value) => format!("return {value};"),
            None => "return;".to_string(),
        })
    }

    /// Emit one trampoline.
    pub fn emit_trampoline(&self, w: &mut CodeWriter, function: &FunctionEntry) -> Result<(), GenerationError> {
        let minimal = self.minimal_return(function)?;
        w.line(native_signature(function, Some(&self.wrapper)));
        let mut outcome = Ok(());
        w.block("", |w| {
            if function.is_abstract() && function.is_removed() {
                tracing::warn!(
                    class = %self.class.qualified_name,
                    function = %function.minimal_signature(),
                    "pure virtual method must be implemented but was completely removed"
                );
                w.line(&minimal);
                return;
            }
            outcome = self.emit_trampoline_body(w, function, &minimal);
        });
        w.blank();
        outcome
    }

    fn emit_trampoline_body(
        &self,
        w: &mut CodeWriter,
        function: &FunctionEntry,
        minimal: &str,
    ) -> Result<(), GenerationError> {
        let display = format!("{}.{}", self.class.name, function.name);
        let descriptor = TrampolineDescriptor::of(function);

        w.line("Shiboken::GilState gil;");
        w.line(format!(
            "Shiboken::AutoDecRef py_override(BindingManager::instance().getOverride(this, \"{}\"));",
            function.name
        ));
        w.block("if (py_override.isNull())", |w| {
            let shell_snips: Vec<_> = function.snips(SnipPosition::Beginning, CodeLanguage::Shell).collect();
            for snip in &shell_snips {
                w.code(&snip.code);
            }
            if !shell_snips.is_empty() {
                w.blank();
            }
            if descriptor.is_abstract {
                w.line(format!(
                    "PyErr_SetString(PyExc_NotImplementedError, \"pure virtual method '{display}()' not implemented.\");"
                ));
                w.line(minimal);
            } else {
                if descriptor.allows_thread {
                    w.line(format!("Shiboken::ThreadStateSaver {THREAD_STATE_SAVER};"));
                    w.line(format!("{THREAD_STATE_SAVER}.save();"));
                }
                let implementing = function
                    .implementing_class
                    .as_deref()
                    .unwrap_or(&self.class.qualified_name);
                let args: Vec<&str> = function.arguments.iter().map(|a| a.name.as_str()).collect();
                w.line(format!("return this->{implementing}::{}({});", function.name, args.join(", ")));
            }
        });
        w.blank();

        for (position, arg) in function.arguments.iter().enumerate() {
            if let Some(rule) = function.conversion_rule(CodeLanguage::Dynamic, ArgIndex::Arg(position + 1)) {
                w.code(&rule.expand(&arg.name, &arg.name));
            }
        }
        self.emit_argument_tuple(w, function);

        for modification in &function.modification.arguments {
            if let (ArgIndex::Arg(n), true) = (modification.index, modification.reset_after_use) {
                w.line(format!(
                    "bool invalidadeArg{n} = PyTuple_GET_ITEM(pyargs, {})->ob_refcnt == 1;",
                    n - 1
                ));
            }
        }
        let invalidate_return = function
            .ownership_for(ArgIndex::Return)
            .any(|m| m.direction == OwnershipDirection::NativeOwns);
        w.blank();

        let native_snips: Vec<_> = function.snips(SnipPosition::Beginning, CodeLanguage::Native).collect();
        for snip in &native_snips {
            w.code(&snip.code);
        }
        if !native_snips.is_empty() {
            w.blank();
        }

        let ty = &function.return_type;
        let returns = !function.returns_void();
        let mut result_name = CPP_RESULT.to_string();
        // Injected code that calls the override owns the result conversion too.
        if !descriptor.bypasses_override_call {
            w.line(format!(
                "Shiboken::AutoDecRef {PY_RESULT}(PyObject_Call(py_override, pyargs, NULL));"
            ));
            w.line("// An error happened in python code!");
            w.block(format!("if ({PY_RESULT}.isNull())"), |w| {
                w.line("PyErr_Print();");
                w.line(minimal);
            });

            if returns {
                if invalidate_return {
                    w.line(format!("bool invalidadeArg0 = {PY_RESULT}->ob_refcnt == 1;"));
                }
                self.emit_return_check(w, function, descriptor.replaced_return.as_deref(), &display, minimal);
                if let Some(rule) = function.conversion_rule(CodeLanguage::Native, ArgIndex::Return) {
                    w.code(&rule.expand(PY_RESULT, CPP_RESULT));
                    result_name = format!("{CPP_RESULT}_out");
                } else {
                    let spelling = result_spelling(ty);
                    w.line(format!(
                        "{spelling} {CPP_RESULT}(Shiboken::Converter<{spelling} >::toCpp({PY_RESULT}));"
                    ));
                }
            }
        }

        if invalidate_return {
            w.line("if (invalidadeArg0)");
            w.indented(|w| {
                w.line(format!("BindingManager::instance().invalidateWrapper({PY_RESULT}.object());"));
            });
        }
        for modification in &function.modification.arguments {
            if let (ArgIndex::Arg(n), true) = (modification.index, modification.reset_after_use) {
                w.line(format!("if (invalidadeArg{n})"));
                w.indented(|w| {
                    w.line(format!(
                        "BindingManager::instance().invalidateWrapper(PyTuple_GET_ITEM(pyargs, {}));",
                        n - 1
                    ));
                });
            }
        }

        let end_snips: Vec<_> = function.snips(SnipPosition::End, CodeLanguage::Native).collect();
        if !end_snips.is_empty() {
            w.blank();
        }
        for snip in end_snips {
            w.code(&snip.code);
        }

        if returns {
            if !invalidate_return && ty.has_identity() {
                w.block(format!("if ({PY_RESULT}->ob_refcnt < 2)"), |w| {
                    w.line(format!(
                        "PyErr_SetString(PyExc_ReferenceError, \"Returning last python reference on virtual function: {display}\");"
                    ));
                    w.line("PyErr_Print();");
                    w.line("assert(false);");
                });
            }
            w.line(format!("return {result_name};"));
        }
        Ok(())
    }

    fn emit_argument_tuple(&self, w: &mut CodeWriter, function: &FunctionEntry) {
        let mut units = String::new();
        let mut values = Vec::new();
        for (position, arg) in function.visible_arguments() {
            let has_rule = function
                .conversion_rule(CodeLanguage::Dynamic, ArgIndex::Arg(position + 1))
                .is_some();
            if has_rule {
                units.push('O');
                values.push(format!("{}_out", arg.name));
            } else if let Some(unit) = format_unit(&arg.ty) {
                units.push(unit);
                values.push(arg.name.clone());
            } else {
                units.push('O');
                values.push(to_python(&arg.ty, &arg.name));
            }
        }
        if values.is_empty() {
            w.line("Shiboken::AutoDecRef pyargs(PyTuple_New(0));");
            return;
        }
        w.line(format!("Shiboken::AutoDecRef pyargs(Py_BuildValue(\"({units})\","));
        w.indented(|w| {
            let last = values.len() - 1;
            for (i, value) in values.iter().enumerate() {
                let separator = if i == last { "" } else { "," };
                w.line(format!("{value}{separator}"));
            }
        });
        w.line("));");
    }

    fn emit_return_check(
        &self,
        w: &mut CodeWriter,
        function: &FunctionEntry,
        replaced: Option<&str>,
        display: &str,
        minimal: &str,
    ) {
        let ty = &function.return_type;
        let (check, desired) = match replaced {
            Some(replaced) => (
                check_expression(ty, &replacement_check(replaced), PY_RESULT),
                format!("\"{replaced}\""),
            ),
            None => {
                let desired = match ty.category {
                    TypeCategory::Primitive(kind) => format!("\"{}\"", kind.cpp_name()),
                    TypeCategory::Container(_) => format!("\"{}\"", ty.name),
                    TypeCategory::CString => "\"str\"".to_string(),
                    _ => format!("SbkType<{} >()->tp_name", ty.unqualified().cpp_signature()),
                };
                let check = TypeCheck::for_type(ty, true);
                let expression = match check {
                    TypeCheck::Number { .. } => format!(
                        "Shiboken::Converter<{} >::isConvertible({PY_RESULT})",
                        result_spelling(ty)
                    ),
                    _ => check_expression(ty, &check, PY_RESULT),
                };
                (expression, desired)
            }
        };
        w.line("// Check return type");
        w.line(format!("bool typeIsValid = {check};"));
        if ty.has_identity() {
            w.line(format!("typeIsValid = typeIsValid || ({PY_RESULT} == Py_None);"));
        }
        w.block("if (!typeIsValid)", |w| {
            w.line(format!(
                "PyErr_Format(PyExc_TypeError, \"Invalid return value in function %s, expected %s, got %s.\", \"{display}\", {desired}, {PY_RESULT}->ob_type->tp_name);"
            ));
            w.line(minimal);
        });
    }
}
