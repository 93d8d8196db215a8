//! Ownership vocabulary shared by the linker and the runtime model.
//!
//! An [`OwnershipModification`] is the (argument index, direction, policy)
//! triple attached to a function. The generator's linker turns the
//! modifications of a function, plus its heuristics, into emitted runtime
//! calls; the runtime model applies the same directions to its state machine.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Who is responsible for destroying a wrapped native object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OwnershipState {
    /// The wrapper deletes the native object when it is collected.
    #[default]
    DynamicOwned,
    /// Native code deletes the object; the wrapper only borrows it.
    NativeOwned,
    /// Owned by a parent wrapper and invalidated with it.
    Parented,
}

/// Position a modification refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ArgIndex {
    /// The return value (index 0 in customization files).
    Return,
    /// The implicit receiver (index -1 in customization files).
    This,
    /// Positional parameter, 1-based.
    Arg(usize),
}

impl ArgIndex {
    /// Decode the raw index used by customization files.
    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            -1 => Some(ArgIndex::This),
            0 => Some(ArgIndex::Return),
            n if n > 0 => Some(ArgIndex::Arg(n as usize)),
            _ => None,
        }
    }

    pub fn to_raw(self) -> i32 {
        match self {
            ArgIndex::This => -1,
            ArgIndex::Return => 0,
            ArgIndex::Arg(n) => n as i32,
        }
    }

    /// Zero-based parameter position, for positional indices.
    pub fn param_position(self) -> Option<usize> {
        match self {
            ArgIndex::Arg(n) if n > 0 => Some(n - 1),
            _ => None,
        }
    }
}

impl fmt::Display for ArgIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgIndex::Return => f.write_str("return value"),
            ArgIndex::This => f.write_str("self"),
            ArgIndex::Arg(n) => write!(f, "argument {n}"),
        }
    }
}

/// Parent-link action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LinkAction {
    #[default]
    Add,
    Remove,
}

/// Keep-alive table action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ReferenceAction {
    /// Append to the slot.
    #[default]
    Add,
    /// Replace the slot contents.
    Set,
    /// Clear the slot.
    Remove,
}

/// Who is responsible for an object after the call.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OwnershipDirection {
    /// Native code takes responsibility for deleting the object.
    NativeOwns,
    /// The dynamic side becomes responsible for final cleanup.
    DynamicOwns,
    /// The object becomes a child of the object at `parent`.
    ParentChild { parent: ArgIndex, action: LinkAction },
    /// The object is stored in the receiver's keep-alive table under `slot`.
    ReferenceKept {
        slot: Option<String>,
        action: ReferenceAction,
    },
    /// Leave ownership as it is and suppress heuristics for this index.
    Unchanged,
}

impl OwnershipDirection {
    /// Reference keeping can accompany any other directive.
    pub fn is_exclusive(&self) -> bool {
        !matches!(self, OwnershipDirection::ReferenceKept { .. })
    }
}

/// Origin of a directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OwnershipPolicy {
    /// Declared by a customization rule.
    #[default]
    Explicit,
    /// Inferred by a generator heuristic; an explicit directive replaces it.
    Heuristic,
}

/// One ownership directive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnershipModification {
    pub index: ArgIndex,
    pub direction: OwnershipDirection,
    #[serde(default)]
    pub policy: OwnershipPolicy,
}

impl OwnershipModification {
    pub fn new(index: ArgIndex, direction: OwnershipDirection) -> Self {
        Self {
            index,
            direction,
            policy: OwnershipPolicy::Explicit,
        }
    }

    pub fn heuristic(index: ArgIndex, direction: OwnershipDirection) -> Self {
        Self {
            index,
            direction,
            policy: OwnershipPolicy::Heuristic,
        }
    }

    pub fn native_owns(index: ArgIndex) -> Self {
        Self::new(index, OwnershipDirection::NativeOwns)
    }

    pub fn dynamic_owns(index: ArgIndex) -> Self {
        Self::new(index, OwnershipDirection::DynamicOwns)
    }

    pub fn parent(index: ArgIndex, parent: ArgIndex) -> Self {
        Self::new(
            index,
            OwnershipDirection::ParentChild {
                parent,
                action: LinkAction::Add,
            },
        )
    }

    pub fn keep_reference(index: ArgIndex, slot: Option<String>) -> Self {
        Self::new(
            index,
            OwnershipDirection::ReferenceKept {
                slot,
                action: ReferenceAction::Add,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_indices_decode() {
        assert_eq!(ArgIndex::from_raw(-1), Some(ArgIndex::This));
        assert_eq!(ArgIndex::from_raw(0), Some(ArgIndex::Return));
        assert_eq!(ArgIndex::from_raw(2), Some(ArgIndex::Arg(2)));
        assert_eq!(ArgIndex::from_raw(-2), None);
        assert_eq!(ArgIndex::Arg(3).to_raw(), 3);
        assert_eq!(ArgIndex::Arg(1).param_position(), Some(0));
        assert_eq!(ArgIndex::Return.param_position(), None);
    }

    #[test]
    fn reference_keeping_is_not_exclusive() {
        assert!(!OwnershipModification::keep_reference(ArgIndex::Arg(1), None).direction.is_exclusive());
        assert!(OwnershipModification::native_owns(ArgIndex::Arg(1)).direction.is_exclusive());
    }
}
