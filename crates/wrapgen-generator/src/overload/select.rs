//! Pure evaluation of the decision tree.

use thiserror::Error;

use wrapgen_core::ArgumentProbe;

use super::{ArityGuard, Branch, DecisorNode, OverloadDecisor};

/// Shape of one dynamic call as seen by a dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CallShape {
    /// Positional arguments.
    pub num_args: usize,
    /// Keyword arguments.
    pub num_named_args: usize,
    /// Operator dispatch with swapped operands.
    pub is_reverse: bool,
}

impl CallShape {
    pub fn positional(num_args: usize) -> Self {
        Self {
            num_args,
            ..Self::default()
        }
    }

    pub fn with_named(mut self, num_named_args: usize) -> Self {
        self.num_named_args = num_named_args;
        self
    }

    pub fn reversed(mut self) -> Self {
        self.is_reverse = true;
        self
    }
}

/// Why no candidate was selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecisionError {
    #[error("too many arguments")]
    TooManyArguments,
    #[error("not enough arguments")]
    NotEnoughArguments,
    /// The generated code jumps to the wrong-arguments error section.
    #[error("no signature matches the arguments")]
    NoMatchingSignature,
}

impl OverloadDecisor<'_> {
    /// Argument-count validation performed before the decision tree runs.
    pub fn check_arity(&self, call: CallShape) -> Result<(), DecisionError> {
        let (min, max) = (self.min_args(), self.positional_limit());
        if self.uses_named_arguments() {
            let counts_keywords = !self.is_reflected_constructor() && !self.has_varargs();
            if counts_keywords && call.num_args + call.num_named_args > max {
                return Err(DecisionError::TooManyArguments);
            }
            if min > 0 && call.num_args < min {
                return Err(DecisionError::NotEnoughArguments);
            }
        }
        if self.invalid_argument_lengths().contains(&call.num_args) {
            return Err(DecisionError::NoMatchingSignature);
        }
        // Tuple unpacking enforces the bounds when keywords are not counted.
        if !self.has_varargs() && call.num_args > max {
            return Err(DecisionError::TooManyArguments);
        }
        if call.num_args < min {
            return Err(DecisionError::NotEnoughArguments);
        }
        Ok(())
    }

    /// Select the candidate the generated dispatcher would call.
    ///
    /// `probe` answers the runtime type checks; it is consulted lazily, in
    /// the order the generated code evaluates them.
    pub fn select(&self, call: CallShape, probe: &impl ArgumentProbe) -> Result<usize, DecisionError> {
        self.check_arity(call)?;
        self.decide(&self.root, call, probe)
            .ok_or(DecisionError::NoMatchingSignature)
    }

    fn decide(&self, node: &DecisorNode, call: CallShape, probe: &impl ArgumentProbe) -> Option<usize> {
        let (reference, has_default_call) = self.default_call(node);
        if let Some(selected) = self.immediate_selection(node, reference, has_default_call) {
            return Some(selected);
        }

        if has_default_call && call.num_args == node.next_position() {
            return Some(self.default_call_target(node, reference));
        }

        for child in &node.children {
            let branch = self.branch(child);
            if branch_matches(&branch, call, probe) {
                return self.decide(branch.target, call, probe);
            }
        }
        None
    }
}

fn branch_matches(branch: &Branch<'_>, call: CallShape, probe: &impl ArgumentProbe) -> bool {
    let guard = match branch.guard {
        ArityGuard::None => true,
        ArityGuard::Exactly(n) => call.num_args == n,
        ArityGuard::AtLeast(n) => call.num_args >= n,
    };
    guard
        && branch.reverse.is_none_or(|reverse| reverse == call.is_reverse)
        && branch.checks.iter().all(|node| match (node.position, &node.check) {
            (Some(position), Some(check)) => probe.check(position, check),
            _ => true,
        })
}
