//! Overload decisor - chooses one candidate of a group at call time.
//!
//! The decisor is a tree over argument positions. The head node holds every
//! candidate; each child represents one (position, type) pair and holds the
//! candidates whose argument at that position has that type. Removed
//! arguments are skipped when numbering positions.
//!
//! ## Algorithm
//!
//! At each node, in order:
//!
//! 1. A group whose largest arity is 0 selects its reference candidate.
//! 2. A non-head node that is the last argument of a signature, or has one
//!    candidate and no default call, selects that candidate.
//! 3. If a "default call" exists (a child's candidate has a default value at
//!    the child's position, or a candidate ends at this node), the call
//!    selects it when exactly the arguments up to this node were supplied.
//! 4. Children are tried in specificity order. Positions with a single
//!    continuation are chained into one conjunction of checks, guarded by the
//!    argument count; the first branch whose guard and checks pass is
//!    entered and decides alone.
//!
//! The same tree drives both the emitted C++ and the pure
//! evaluator [`OverloadDecisor::select`], so tests can observe exactly the
//! decision the generated code makes.

mod emit;
mod node;
mod ordering;
mod select;

pub use node::DecisorNode;
pub use select::{CallShape, DecisionError};

use rustc_hash::FxHashSet;

use wrapgen_core::FunctionEntry;
use wrapgen_registry::OverloadGroup;

use crate::GeneratorContext;

/// Argument-count guard placed before a branch's type checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArityGuard {
    None,
    Exactly(usize),
    AtLeast(usize),
}

/// One `if`/`else if` branch of a decision node.
#[derive(Debug, Clone)]
pub struct Branch<'n> {
    pub guard: ArityGuard,
    /// `Some(reverse)` for operator candidates.
    pub reverse: Option<bool>,
    /// Chained nodes whose checks must all pass, in argument order.
    pub checks: Vec<&'n DecisorNode>,
    /// Node deciding once the branch is entered.
    pub target: &'n DecisorNode,
}

/// The decision tree of one overload group.
#[derive(Debug, Clone)]
pub struct OverloadDecisor<'g> {
    group: &'g OverloadGroup,
    root: DecisorNode,
    /// Constructor of a reflected class: unknown keywords are properties.
    reflected_constructor: bool,
}

impl<'g> OverloadDecisor<'g> {
    /// Build and order the tree for `group`.
    #[tracing::instrument(level = "debug", skip_all, fields(group = %group.name))]
    pub fn build(ctx: &GeneratorContext<'_>, group: &'g OverloadGroup) -> Self {
        let mut root = DecisorNode::build(group);
        ordering::finalize(ctx, group, &mut root);
        let reflected_constructor = group.is_constructor()
            && group
                .scope
                .as_deref()
                .and_then(|scope| ctx.class(scope))
                .is_some_and(|class| class.is_qobject());
        Self {
            group,
            root,
            reflected_constructor,
        }
    }

    pub fn group(&self) -> &'g OverloadGroup {
        self.group
    }

    pub fn root(&self) -> &DecisorNode {
        &self.root
    }

    pub fn function(&self, index: usize) -> &'g FunctionEntry {
        &self.group.functions[index]
    }

    /// First candidate; used for names and error messages.
    pub fn reference(&self) -> &'g FunctionEntry {
        self.function(0)
    }

    // ==========================================================================
    // Arity
    // ==========================================================================

    /// Largest arity, counting a trailing varargs slice as one argument.
    pub fn max_args(&self) -> usize {
        self.group.max_args()
    }

    pub fn min_args(&self) -> usize {
        self.group.min_args().min(self.positional_limit())
    }

    /// Largest number of positional arguments before a varargs slice.
    pub fn positional_limit(&self) -> usize {
        let max = self.max_args();
        if self.group.has_varargs() { max.saturating_sub(1) } else { max }
    }

    pub fn has_varargs(&self) -> bool {
        self.group.has_varargs()
    }

    /// The dispatcher receives a tuple (`pyargs[]`) instead of a single `arg`.
    pub fn uses_argument_list(&self) -> bool {
        let (min, max) = (self.group.min_args(), self.max_args());
        self.group.is_constructor() || min != max || max > 1 || self.group.has_argument_with_default()
    }

    /// Keyword arguments are accepted for defaulted parameters.
    pub fn uses_named_arguments(&self) -> bool {
        self.group.has_argument_with_default()
    }

    pub fn is_reflected_constructor(&self) -> bool {
        self.reflected_constructor
    }

    /// Argument counts between the bounds that no candidate accepts.
    pub fn invalid_argument_lengths(&self) -> Vec<usize> {
        let mut valid: FxHashSet<usize> = FxHashSet::default();
        for function in &self.group.functions {
            let mut visible = 0;
            for (position, _) in function.visible_arguments() {
                if function.default_value(position).is_some() {
                    valid.insert(visible);
                }
                visible += 1;
            }
            valid.insert(visible);
        }
        ((self.group.min_args() + 1)..self.max_args())
            .filter(|n| !valid.contains(n))
            .collect()
    }

    // ==========================================================================
    // Node Queries
    // ==========================================================================

    /// Native position of the argument a node tests for one candidate.
    fn native_position(&self, node: &DecisorNode, function: usize) -> Option<usize> {
        let position = node.position?;
        self.function(function)
            .visible_arguments()
            .nth(position)
            .map(|(native, _)| native)
    }

    /// First candidate with a default value at this node's position.
    pub fn function_with_default(&self, node: &DecisorNode) -> Option<usize> {
        node.functions.iter().copied().find(|&f| {
            self.native_position(node, f)
                .is_some_and(|native| self.function(f).default_value(native).is_some())
        })
    }

    pub fn next_argument_has_default(&self, node: &DecisorNode) -> bool {
        node.children.iter().any(|c| self.function_with_default(c).is_some())
    }

    /// This node or one below it has a defaulted candidate.
    fn subtree_has_default(&self, node: &DecisorNode) -> bool {
        self.function_with_default(node).is_some() || node.children.iter().any(|c| self.subtree_has_default(c))
    }

    /// `function` has no argument after this node.
    pub fn is_final_occurrence(&self, node: &DecisorNode, function: usize) -> bool {
        !node.children.iter().any(|c| c.functions.contains(&function))
    }

    /// Whether the node can select by argument count alone, and the candidate
    /// that is then the reference.
    fn default_call(&self, node: &DecisorNode) -> (usize, bool) {
        let reference = node.reference();
        if self.next_argument_has_default(node) {
            return (reference, true);
        }
        match node.functions.iter().copied().find(|&f| self.is_final_occurrence(node, f)) {
            Some(f) => (f, true),
            None => (reference, false),
        }
    }

    /// Candidate selected by the default call of `node`.
    fn default_call_target(&self, node: &DecisorNode, reference: usize) -> usize {
        node.children
            .iter()
            .find_map(|c| self.function_with_default(c))
            .unwrap_or(reference)
    }

    /// Immediate selection at `node` (rules 1 and 2), if any.
    fn immediate_selection(&self, node: &DecisorNode, reference: usize, has_default_call: bool) -> Option<usize> {
        if self.max_args() == 0 {
            return Some(reference);
        }
        if !node.is_head() {
            let is_last = node.children.is_empty();
            let single = node.functions.len() == 1;
            if is_last || (single && !has_default_call) {
                return Some(node.reference());
            }
        }
        None
    }

    /// The branch testing `child`, with its chain of single continuations.
    pub fn branch<'n>(&self, child: &'n DecisorNode) -> Branch<'n> {
        let mut checks = Vec::new();
        let mut target = child;
        let mut current = Some(child);
        while let Some(node) = current.filter(|n| !n.is_varargs()) {
            checks.push(node);
            let stop = node.children.is_empty()
                || self.next_argument_has_default(node)
                || node.children.len() != 1
                || node.functions.len() != node.children[0].functions.len();
            if stop {
                target = node;
                current = None;
            } else {
                current = node.children.first();
            }
        }

        let reference = self.function(child.reference());
        let signature_found =
            child.functions.len() == 1 && self.function_with_default(child).is_none() && !self.subtree_has_default(child);
        let guard = if self.uses_argument_list() && signature_found {
            let varargs = reference.arguments.len() > 1 && reference.has_varargs();
            let count = reference
                .arguments
                .len()
                .saturating_sub(reference.removed_argument_count())
                .saturating_sub(usize::from(varargs));
            if varargs { ArityGuard::AtLeast(count) } else { ArityGuard::Exactly(count) }
        } else if checks.len() > 1 {
            ArityGuard::AtLeast(child.position.unwrap_or(0) + checks.len())
        } else {
            ArityGuard::None
        };
        let reverse = reference
            .is_operator_overload()
            .then(|| reference.is_reverse_operator());

        Branch {
            guard,
            reverse,
            checks,
            target,
        }
    }

    /// Dynamic object tested at `position` in the generated code.
    pub fn argument_source(&self, position: usize) -> String {
        if self.uses_argument_list() {
            format!("pyargs[{position}]")
        } else {
            "arg".to_string()
        }
    }
}

