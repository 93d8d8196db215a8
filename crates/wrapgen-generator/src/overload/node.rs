//! Decision tree nodes.

use wrapgen_core::{CppType, TypeCheck};
use wrapgen_registry::OverloadGroup;

/// One argument position in the decision tree.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisorNode {
    /// 0-based dynamic argument position; `None` for the head.
    pub position: Option<usize>,
    /// Type tested here, taken from the first candidate reaching the node.
    pub arg_type: Option<CppType>,
    /// Runtime predicate, set once siblings are known.
    pub check: Option<TypeCheck>,
    /// Candidate indices into the group, in group order.
    pub functions: Vec<usize>,
    /// Next positions, in specificity order once finalized.
    pub children: Vec<DecisorNode>,
}

impl DecisorNode {
    fn head(functions: Vec<usize>) -> Self {
        Self {
            position: None,
            arg_type: None,
            check: None,
            functions,
            children: Vec::new(),
        }
    }

    /// Build the unordered tree: one path per candidate through its visible
    /// arguments, sharing nodes for equal types at equal positions.
    pub(super) fn build(group: &OverloadGroup) -> Self {
        let mut head = DecisorNode::head((0..group.len()).collect());
        for (index, function) in group.functions.iter().enumerate() {
            let mut node = &mut head;
            for (position, (_, arg)) in function.visible_arguments().enumerate() {
                node = node.child_for(position, &arg.ty, index);
            }
        }
        head
    }

    fn child_for(&mut self, position: usize, ty: &CppType, function: usize) -> &mut DecisorNode {
        let key = ty.unqualified();
        let existing = self
            .children
            .iter()
            .position(|c| c.arg_type.as_ref().is_some_and(|t| t.unqualified() == key));
        let index = match existing {
            Some(index) => index,
            None => {
                self.children.push(DecisorNode {
                    position: Some(position),
                    arg_type: Some(ty.clone()),
                    check: None,
                    functions: Vec::new(),
                    children: Vec::new(),
                });
                self.children.len() - 1
            }
        };
        let child = &mut self.children[index];
        child.functions.push(function);
        child
    }

    pub fn is_head(&self) -> bool {
        self.position.is_none()
    }

    pub fn is_varargs(&self) -> bool {
        self.arg_type.as_ref().is_some_and(CppType::is_varargs)
    }

    /// First candidate reaching this node.
    pub fn reference(&self) -> usize {
        self.functions.first().copied().unwrap_or(0)
    }

    /// Argument count at which a call ends right after this node.
    pub fn next_position(&self) -> usize {
        self.position.map_or(0, |p| p + 1)
    }

    /// Number of nodes below and including this one.
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(DecisorNode::size).sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wrapgen_core::{ArgumentEntry, FunctionEntry, PrimitiveKind};
    use wrapgen_registry::GroupKind;

    #[test]
    fn equal_types_share_a_node() {
        let group = OverloadGroup::new("overloaded", Some("Overload".into()), GroupKind::Method)
            .with_function(FunctionEntry::method("overloaded", CppType::void()))
            .with_function(
                FunctionEntry::method("overloaded", CppType::void())
                    .with_arg(ArgumentEntry::new("point", CppType::value("Point").pointer()))
                    .with_arg(ArgumentEntry::new("param", CppType::enumeration("Overload::ParamEnum"))),
            )
            .with_function(
                FunctionEntry::method("overloaded", CppType::void())
                    .with_arg(ArgumentEntry::new("point", CppType::value("Point").const_ref())),
            );
        let head = DecisorNode::build(&group);
        assert_eq!(head.functions, vec![0, 1, 2]);
        assert_eq!(head.children.len(), 1);
        let point = &head.children[0];
        assert_eq!(point.functions, vec![1, 2]);
        assert_eq!(point.children.len(), 1);
        assert_eq!(point.children[0].position, Some(1));
        assert_eq!(head.size(), 3);
    }

    #[test]
    fn removed_arguments_are_not_positions() {
        use wrapgen_core::{ArgIndex, ArgumentModification, FunctionModification};
        let int = CppType::primitive(PrimitiveKind::Int);
        let f = FunctionEntry::method("intOverloads", int.clone())
            .with_arg(ArgumentEntry::new("i", int.clone()))
            .with_arg(ArgumentEntry::new("removedArg", int.clone()))
            .with_arg(ArgumentEntry::new("d", CppType::primitive(PrimitiveKind::Double)))
            .with_modification(FunctionModification {
                arguments: vec![ArgumentModification::new(ArgIndex::Arg(2)).removed().with_default("0")],
                ..Default::default()
            });
        let group = OverloadGroup::new("intOverloads", None, GroupKind::Global).with_function(f);
        let head = DecisorNode::build(&group);
        let second = &head.children[0].children[0];
        assert_eq!(second.position, Some(1));
        assert_eq!(second.arg_type.as_ref().and_then(CppType::as_primitive), Some(PrimitiveKind::Double));
    }
}
