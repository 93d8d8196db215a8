//! Ownership/lifetime linker.
//!
//! After a native call returns, the wrappers involved may change owner: a
//! result handed out by native code is borrowed, an argument stored by a
//! container becomes its child, an object given away must not be deleted by
//! the dynamic side any more. The linker decides these transitions per call
//! site and renders them as runtime calls.
//!
//! ## Algorithm
//!
//! 1. Validate the directives: every index must name the receiver, a
//!    non-void return value or an existing visible argument, and each index
//!    carries at most one exclusive explicit directive. Heuristic directives
//!    yield to explicit ones at the same index.
//! 2. Ownership transfers, in declaration order.
//! 3. Keep-alive references, keyed by the rule's slot name or by
//!    `<minimal signature><index>`.
//! 4. Parent links for the return value, the receiver and each argument:
//!    an explicit parent directive, else the enabled heuristics. An explicit
//!    `Unchanged` directive suppresses heuristics for its index.

use wrapgen_core::{
    ArgIndex, ClassEntry, CppType, FunctionEntry, GenerationError, LinkAction, OwnershipDirection,
    OwnershipModification, OwnershipPolicy, OwnershipState, ReferenceAction, TypeCategory,
};

use crate::GeneratorContext;
use crate::naming::PY_RESULT;
use crate::writer::CodeWriter;

/// One runtime call emitted after the native call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OwnershipStep {
    /// The wrapper becomes responsible for deleting the object.
    GiveToDynamic { var: String },
    /// Native code takes the object; its virtual destructor will notify the registry.
    TransferToNative { var: String, is_return: bool },
    /// Native code takes the object and nothing will report its deletion.
    Invalidate { var: String },
    KeepReference {
        slot: String,
        var: String,
        action: ReferenceAction,
    },
    SetParent { parent: String, child: String },
}

impl OwnershipStep {
    /// State of the affected wrapper once the step ran, if it changes.
    pub fn resulting_state(&self) -> Option<OwnershipState> {
        match self {
            OwnershipStep::GiveToDynamic { .. } => Some(OwnershipState::DynamicOwned),
            OwnershipStep::TransferToNative { .. } | OwnershipStep::Invalidate { .. } => {
                Some(OwnershipState::NativeOwned)
            }
            OwnershipStep::SetParent { parent, .. } if parent == "Py_None" => Some(OwnershipState::DynamicOwned),
            OwnershipStep::SetParent { .. } => Some(OwnershipState::Parented),
            OwnershipStep::KeepReference { .. } => None,
        }
    }

    pub fn render(&self) -> String {
        match self {
            OwnershipStep::GiveToDynamic { var } => format!("SbkBaseWrapper_setOwnership({var}, true);"),
            OwnershipStep::TransferToNative { var, is_return: true } => {
                format!("SbkBaseWrapper_setOwnership({var}, 0);")
            }
            OwnershipStep::TransferToNative { var, .. } => {
                format!("BindingManager::instance().transferOwnershipToCpp({var});")
            }
            OwnershipStep::Invalidate { var } => format!("BindingManager::instance().invalidateWrapper({var});"),
            OwnershipStep::KeepReference { slot, var, action } => {
                let (value, append) = match action {
                    ReferenceAction::Add => (var.as_str(), "true"),
                    ReferenceAction::Set => (var.as_str(), "false"),
                    ReferenceAction::Remove => ("Py_None", "false"),
                };
                format!(
                    "Shiboken::keepReference(reinterpret_cast<SbkBaseWrapper*>(self), \"{slot}\", {value}, {append});"
                )
            }
            OwnershipStep::SetParent { parent, child } => format!("Shiboken::setParent({parent}, {child});"),
        }
    }

    fn is_transfer(&self) -> bool {
        matches!(
            self,
            OwnershipStep::GiveToDynamic { .. } | OwnershipStep::TransferToNative { .. } | OwnershipStep::Invalidate { .. }
        )
    }
}

/// Plans the ownership steps of one candidate.
pub struct OwnershipLinker<'c, 'a> {
    ctx: &'c GeneratorContext<'a>,
    function: &'c FunctionEntry,
    /// The dispatcher names its arguments `pyargs[N]` rather than `arg`.
    uses_argument_list: bool,
}

impl<'c, 'a> OwnershipLinker<'c, 'a> {
    pub fn new(ctx: &'c GeneratorContext<'a>, function: &'c FunctionEntry, uses_argument_list: bool) -> Self {
        Self {
            ctx,
            function,
            uses_argument_list,
        }
    }

    fn directives(&self) -> &'c [OwnershipModification] {
        &self.function.modification.ownership
    }

    fn index_error(&self, index: ArgIndex) -> GenerationError {
        GenerationError::UnknownArgumentIndex {
            function: self.function.minimal_signature(),
            index,
        }
    }

    // ==========================================================================
    // Validation
    // ==========================================================================

    fn check_index(&self, index: ArgIndex) -> Result<(), GenerationError> {
        let valid = match index {
            ArgIndex::This => self.function.owner.is_some() && !self.function.is_static(),
            ArgIndex::Return => !self.function.returns_void() || self.function.is_constructor(),
            ArgIndex::Arg(n) => n >= 1 && n <= self.function.arguments.len() && !self.function.argument_removed(n - 1),
        };
        if valid { Ok(()) } else { Err(self.index_error(index)) }
    }

    /// Every index exists and no index carries two exclusive explicit directives.
    pub fn validate(&self) -> Result<(), GenerationError> {
        for directive in self.directives() {
            self.check_index(directive.index)?;
            if let OwnershipDirection::ParentChild { parent, action: LinkAction::Add } = directive.direction {
                self.check_index(parent)?;
            }
        }
        for (i, directive) in self.directives().iter().enumerate() {
            let conflicting = self.directives()[..i].iter().any(|earlier| {
                earlier.index == directive.index
                    && earlier.policy == OwnershipPolicy::Explicit
                    && directive.policy == OwnershipPolicy::Explicit
                    && earlier.direction.is_exclusive()
                    && directive.direction.is_exclusive()
            });
            if conflicting {
                return Err(GenerationError::ConflictingOwnership {
                    function: self.function.minimal_signature(),
                    index: directive.index,
                });
            }
        }
        Ok(())
    }

    /// The exclusive directive in force at `index`: explicit beats heuristic.
    fn effective(&self, index: ArgIndex) -> Option<&'c OwnershipModification> {
        let mut exclusive = self
            .directives()
            .iter()
            .filter(|d| d.index == index && d.direction.is_exclusive());
        let first = exclusive.next()?;
        if first.policy == OwnershipPolicy::Explicit {
            return Some(first);
        }
        exclusive
            .find(|d| d.policy == OwnershipPolicy::Explicit)
            .or(Some(first))
    }

    // ==========================================================================
    // Variables
    // ==========================================================================

    /// Dynamic-side variable holding the object at `index`.
    pub fn variable(&self, index: ArgIndex) -> String {
        match index {
            ArgIndex::This => "self".to_string(),
            ArgIndex::Return => PY_RESULT.to_string(),
            ArgIndex::Arg(n) => {
                let position = n.saturating_sub(1);
                let dynamic = position - self.function.removed_arguments_before(position);
                if self.uses_argument_list {
                    format!("pyargs[{dynamic}]")
                } else {
                    "arg".to_string()
                }
            }
        }
    }

    fn type_at(&self, index: ArgIndex) -> Option<&'c CppType> {
        match index {
            ArgIndex::This => None,
            ArgIndex::Return => Some(&self.function.return_type),
            ArgIndex::Arg(n) => self.function.arguments.get(n.checked_sub(1)?).map(|a| &a.ty),
        }
    }

    /// Wrapped class of the object at `index`, looking through containers.
    fn wrapped_class(&self, index: ArgIndex) -> Option<&'a ClassEntry> {
        if index == ArgIndex::This {
            let owner = self.function.implementing_class.as_deref().or(self.function.owner.as_deref())?;
            return self.ctx.class(owner);
        }
        let ty = self.type_at(index)?;
        if matches!(ty.category, TypeCategory::Container(_)) {
            return ty.instantiations.iter().find_map(|t| self.ctx.class_of(t));
        }
        self.ctx.class_of(ty)
    }

    // ==========================================================================
    // Planning
    // ==========================================================================

    /// Validate, then compute the steps in emission order.
    pub fn plan(&self) -> Result<Vec<OwnershipStep>, GenerationError> {
        self.validate()?;
        let mut steps = Vec::new();

        for directive in self.directives() {
            let in_force = self.effective(directive.index).is_some_and(|d| std::ptr::eq(d, directive));
            if !in_force {
                continue;
            }
            let var = self.variable(directive.index);
            let step = match directive.direction {
                OwnershipDirection::DynamicOwns => OwnershipStep::GiveToDynamic { var },
                OwnershipDirection::NativeOwns => {
                    let class = self
                        .wrapped_class(directive.index)
                        .ok_or_else(|| self.index_error(directive.index))?;
                    if class.has_virtual_destructor() {
                        OwnershipStep::TransferToNative {
                            var,
                            is_return: directive.index == ArgIndex::Return,
                        }
                    } else {
                        OwnershipStep::Invalidate { var }
                    }
                }
                _ => continue,
            };
            steps.push(step);
        }

        for directive in self.directives() {
            if let OwnershipDirection::ReferenceKept { slot, action } = &directive.direction {
                let slot = slot
                    .clone()
                    .unwrap_or_else(|| format!("{}{}", self.function.minimal_signature(), directive.index.to_raw()));
                steps.push(OwnershipStep::KeepReference {
                    slot,
                    var: self.variable(directive.index),
                    action: *action,
                });
            }
        }

        let mut indices = vec![ArgIndex::Return, ArgIndex::This];
        indices.extend((1..=self.function.arguments.len()).map(ArgIndex::Arg));
        for index in indices {
            if let Some(step) = self.parent_step(index) {
                steps.push(step);
            }
        }
        Ok(steps)
    }

    fn parent_step(&self, index: ArgIndex) -> Option<OwnershipStep> {
        if let ArgIndex::Arg(n) = index
            && self.function.argument_removed(n - 1)
        {
            return None;
        }
        match self.effective(index).map(|d| &d.direction) {
            Some(OwnershipDirection::ParentChild { parent, action }) => {
                let parent = match action {
                    LinkAction::Remove => "Py_None".to_string(),
                    LinkAction::Add => self.variable(*parent),
                };
                Some(OwnershipStep::SetParent {
                    parent,
                    child: self.variable(index),
                })
            }
            Some(OwnershipDirection::Unchanged) => None,
            Some(_) => None,
            None => match index {
                ArgIndex::Return => self.return_value_heuristic(),
                ArgIndex::Arg(_) => self.constructor_parent_heuristic(index),
                ArgIndex::This => None,
            },
        }
    }

    /// `ObjectType(ObjectType* parent)`: the new object is owned by `parent`.
    fn constructor_parent_heuristic(&self, index: ArgIndex) -> Option<OwnershipStep> {
        if !self.ctx.options.constructor_parent_heuristic || !self.function.is_constructor() {
            return None;
        }
        let position = index.param_position()?;
        let arg = self.function.arguments.get(position)?;
        if arg.name != "parent" || !arg.ty.is_object() {
            return None;
        }
        tracing::debug!(function = %self.function.minimal_signature(), "constructor parent heuristic");
        Some(OwnershipStep::SetParent {
            parent: self.variable(index),
            child: "self".to_string(),
        })
    }

    /// Object results of instance methods are kept alive by their receiver.
    fn return_value_heuristic(&self) -> Option<OwnershipStep> {
        let has_return_policy = self.directives().iter().any(|d| d.index == ArgIndex::Return);
        let function = self.function;
        let ty = &function.return_type;
        if has_return_policy
            || !self.ctx.options.return_value_heuristic
            || function.owner.is_none()
            || function.is_constructor()
            || function.returns_void()
            || function.is_static()
            || function.type_replaced(ArgIndex::Return).is_some()
            || !(ty.is_object() || ty.is_value_pointer())
        {
            return None;
        }
        tracing::debug!(function = %function.minimal_signature(), "return value heuristic");
        Some(OwnershipStep::SetParent {
            parent: "self".to_string(),
            child: PY_RESULT.to_string(),
        })
    }

    // ==========================================================================
    // Emission
    // ==========================================================================

    pub fn emit(&self, w: &mut CodeWriter) -> Result<(), GenerationError> {
        let steps = self.plan()?;
        if steps.iter().any(OwnershipStep::is_transfer) {
            w.blank();
            w.line("// Ownership transferences.");
        }
        for step in &steps {
            w.line(step.render());
        }
        Ok(())
    }
}
