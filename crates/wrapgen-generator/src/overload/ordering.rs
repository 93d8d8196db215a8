//! Specificity ordering of sibling decision nodes.
//!
//! Siblings are checked in sequence and the first passing check wins, so a
//! check that accepts a superset of another's values must come later. The
//! order is a stable topological sort of a "must be tested before" graph:
//!
//! - a derived class before its bases;
//! - an implicit-conversion source before its target;
//! - `bool` before floating types before integral types;
//! - enums and flags before numbers;
//! - the opaque "any object" check last.
//!
//! Ties keep declaration order. A cycle (conflicting conversions) keeps
//! declaration order for the whole sibling set and is reported as a warning.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};

use wrapgen_core::{ArgIndex, CppType, TypeCategory, TypeCheck};
use wrapgen_registry::OverloadGroup;

use super::DecisorNode;
use crate::GeneratorContext;
use crate::conversion::replacement_check;

/// Order every sibling set and compute each node's check.
pub(super) fn finalize(ctx: &GeneratorContext<'_>, group: &OverloadGroup, node: &mut DecisorNode) {
    sort_children(ctx, &mut node.children);

    let numeric_types = node
        .children
        .iter()
        .filter(|c| c.arg_type.as_ref().is_some_and(CppType::is_number))
        .count();

    for child in &mut node.children {
        child.check = Some(node_check(group, child, numeric_types));
        finalize(ctx, group, child);
    }
}

fn node_check(group: &OverloadGroup, node: &DecisorNode, numeric_siblings: usize) -> TypeCheck {
    let replaced = node.functions.iter().find_map(|&f| {
        let function = &group.functions[f];
        let (native, _) = function.visible_arguments().nth(node.position?)?;
        function.type_replaced(ArgIndex::Arg(native + 1))
    });
    if let Some(replaced) = replaced {
        return replacement_check(replaced);
    }
    let Some(ty) = &node.arg_type else {
        return TypeCheck::Any;
    };
    let permissive = numeric_siblings == 1 || ty.as_primitive().is_some_and(|k| k.is_integral());
    TypeCheck::for_type(ty, permissive)
}

fn is_any(node: &DecisorNode) -> bool {
    matches!(node.check, Some(TypeCheck::Any))
        || node
            .arg_type
            .as_ref()
            .is_some_and(|t| matches!(t.category, TypeCategory::Custom))
}

/// `a` must be tested before `b`.
fn must_precede(ctx: &GeneratorContext<'_>, a: &DecisorNode, b: &DecisorNode) -> bool {
    let (Some(ta), Some(tb)) = (&a.arg_type, &b.arg_type) else {
        return false;
    };
    if ta.is_wrapper_class() && tb.is_wrapper_class() && ta.name != tb.name && ctx.hierarchy.inherits(&ta.name, &tb.name) {
        return true;
    }
    if tb.is_wrapper_class() && ta.name != tb.name && ctx.registry.is_implicitly_convertible(ta, &tb.name) {
        return true;
    }
    if let (Some(ka), Some(kb)) = (ta.as_primitive(), tb.as_primitive()) {
        return ka.specificity_rank() < kb.specificity_rank();
    }
    if matches!(ta.category, TypeCategory::Enum | TypeCategory::Flags) && tb.is_number() {
        return true;
    }
    is_any(b) && !is_any(a)
}

fn sort_children(ctx: &GeneratorContext<'_>, children: &mut Vec<DecisorNode>) {
    let count = children.len();
    if count < 2 {
        return;
    }

    let mut graph: DiGraph<usize, ()> = DiGraph::with_capacity(count, 0);
    let nodes: Vec<NodeIndex> = (0..count).map(|i| graph.add_node(i)).collect();
    for i in 0..count {
        for j in 0..count {
            if i != j && must_precede(ctx, &children[i], &children[j]) {
                graph.add_edge(nodes[i], nodes[j], ());
            }
        }
    }

    let mut pending: Vec<usize> = nodes
        .iter()
        .map(|&n| graph.neighbors_directed(n, Direction::Incoming).count())
        .collect();
    let mut ready: BinaryHeap<Reverse<usize>> = (0..count).filter(|&i| pending[i] == 0).map(Reverse).collect();
    let mut order = Vec::with_capacity(count);
    while let Some(Reverse(i)) = ready.pop() {
        order.push(i);
        for next in graph.neighbors_directed(nodes[i], Direction::Outgoing) {
            let j = graph[next];
            pending[j] -= 1;
            if pending[j] == 0 {
                ready.push(Reverse(j));
            }
        }
    }

    if order.len() != count {
        let types: Vec<String> = children
            .iter()
            .filter_map(|c| c.arg_type.as_ref().map(CppType::cpp_signature))
            .collect();
        tracing::warn!(types = ?types, "cyclic overload ordering, keeping declaration order");
        return;
    }

    let mut slots: Vec<Option<DecisorNode>> = std::mem::take(children).into_iter().map(Some).collect();
    children.extend(order.into_iter().filter_map(|i| slots[i].take()));
}
