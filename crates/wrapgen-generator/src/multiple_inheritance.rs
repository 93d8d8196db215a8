//! Multiple inheritance support.
//!
//! A wrapper for a class with several bases must find each ancestor
//! subobject inside the most-derived native object. Two functions are
//! generated:
//!
//! - `<Cls>_mi_init(const void* cptr)` computes, once, the distinct non-zero
//!   byte offsets from the object to each ancestor subobject and caches them
//!   in a sorted `-1` terminated table.
//! - `Sbk<Cls>SpecialCastFunction(void* obj, SbkBaseWrapperType* desiredType)`
//!   `static_cast`s the object to whichever ancestor type is requested.
//!
//! ## Algorithm
//!
//! For every direct base two offsets are recorded: the plain upcast and the
//! upcast through a reinterpretation as the class itself. The same pair is
//! then produced recursively for the bases' bases, always measured from the
//! most-derived pointer. Duplicates and zero collapse in the native
//! `std::set`.

use wrapgen_core::{ClassEntry, GenerationError};

use crate::GeneratorContext;
use crate::enums::type_ext;
use crate::naming;
use crate::writer::CodeWriter;

/// The class in `class`'s primary lineage that declares several bases.
///
/// Subclasses of such a class reuse its offset initializer.
pub fn multiple_inheriting_class<'a>(ctx: &GeneratorContext<'a>, class: &'a ClassEntry) -> Option<&'a ClassEntry> {
    let mut current = class;
    loop {
        if current.bases.len() > 1 {
            return Some(current);
        }
        current = ctx.class(current.bases.first()?)?;
    }
}

/// Offset expressions relative to `class_ptr` and `base` for every ancestor.
pub fn offset_expressions(ctx: &GeneratorContext<'_>, qualified_name: &str) -> Vec<String> {
    let mut result = Vec::new();
    let bases = ctx.hierarchy.bases(qualified_name);
    for base in bases {
        result.push(format!("((size_t) static_cast<const {base}*>(class_ptr)) - base"));
        result.push(format!(
            "((size_t) static_cast<const {base}*>(({qualified_name}*)((void*)class_ptr))) - base"
        ));
    }
    for base in bases {
        result.extend(offset_expressions(ctx, base));
    }
    result
}

/// Emit the offset table and `<Cls>_mi_init`.
#[tracing::instrument(level = "debug", skip_all, fields(class = %class.qualified_name))]
pub fn emit_mi_init(ctx: &GeneratorContext<'_>, w: &mut CodeWriter, class: &ClassEntry) {
    let qualified = &class.qualified_name;
    let offsets = offset_expressions(ctx, qualified);

    let mut table = String::from("static int mi_offsets[] = { ");
    for _ in &offsets {
        table.push_str("-1, ");
    }
    table.push_str("-1 };");
    w.line(table);
    w.line("int*");
    w.line(format!("{}(const void* cptr)", naming::mi_init(qualified)));
    w.block("", |w| {
        w.block("if (mi_offsets[0] == -1)", |w| {
            w.line("std::set<int> offsets;");
            w.line("std::set<int>::iterator it;");
            w.line(format!(
                "const {qualified}* class_ptr = reinterpret_cast<const {qualified}*>(cptr);"
            ));
            w.line("size_t base = (size_t) class_ptr;");
            for offset in &offsets {
                w.line(format!("offsets.insert({offset});"));
            }
            w.blank();
            w.line("offsets.erase(0);");
            w.blank();
            w.line("int i = 0;");
            w.block("for (it = offsets.begin(); it != offsets.end(); it++)", |w| {
                w.line("mi_offsets[i] = *it;");
                w.line("i++;");
            });
        });
        w.line("return mi_offsets;");
    });
}

/// Emit `Sbk<Cls>SpecialCastFunction`.
///
/// Fails when an ancestor is reachable through more than one path, since
/// the `static_cast` would be ambiguous.
#[tracing::instrument(level = "debug", skip_all, fields(class = %class.qualified_name))]
pub fn emit_special_cast(
    ctx: &GeneratorContext<'_>,
    w: &mut CodeWriter,
    class: &ClassEntry,
) -> Result<(), GenerationError> {
    let qualified = &class.qualified_name;
    let ancestors = ctx.hierarchy.ancestors(qualified);
    if let Some(ambiguous) = ancestors
        .iter()
        .find(|a| ctx.hierarchy.path_count(qualified, a) > 1)
    {
        return Err(GenerationError::AmbiguousSpecialCast {
            class: qualified.clone(),
            ancestor: ambiguous.clone(),
        });
    }

    w.line(format!(
        "static void* {}(void* obj, SbkBaseWrapperType* desiredType)",
        naming::special_cast(qualified)
    ));
    w.block("", |w| {
        w.line(format!("{qualified}* me = reinterpret_cast<{qualified}*>(obj);"));
        for (i, ancestor) in ancestors.iter().enumerate() {
            let keyword = if i == 0 { "if" } else { "else if" };
            w.line(format!(
                "{keyword} (desiredType == reinterpret_cast<SbkBaseWrapperType*>({}))",
                type_ext(ancestor)
            ));
            w.indented(|w| w.line(format!("return static_cast<{ancestor}*>(me);")));
        }
        w.line("return me;");
    });
    w.blank();
    Ok(())
}
