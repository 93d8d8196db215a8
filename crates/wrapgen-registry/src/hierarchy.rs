//! Class hierarchy - the inheritance graph of the API model.
//!
//! Uses `petgraph::DiGraph` with:
//! - Nodes: [`ClassNode`] (qualified name, registration order, ordered bases)
//! - Edges: derived -> base
//!
//! The generator asks three kinds of questions of it: ancestry (type checks,
//! multiple-inheritance casts), descendants (type discovery, most-derived
//! wrapper selection) and a base-before-derived order for module
//! registration.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use petgraph::Direction;
use petgraph::algo::{has_path_connecting, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use rustc_hash::FxHashMap;

use wrapgen_core::{ClassEntry, RegistrationError};

/// Data stored in each class node.
#[derive(Debug, Clone)]
pub struct ClassNode {
    pub name: String,
    /// Registration order, used to keep every traversal deterministic.
    pub order: usize,
    /// Direct bases in declaration order.
    pub bases: Vec<String>,
}

/// Inheritance graph over all registered classes.
#[derive(Debug, Clone, Default)]
pub struct ClassHierarchy {
    graph: DiGraph<ClassNode, ()>,
    index: FxHashMap<String, NodeIndex>,
}

impl ClassHierarchy {
    /// Build the graph; fails if inheritance is cyclic.
    pub fn build<'a>(classes: impl IntoIterator<Item = &'a ClassEntry>) -> Result<Self, RegistrationError> {
        let mut hierarchy = ClassHierarchy::default();
        let classes: Vec<&ClassEntry> = classes.into_iter().collect();

        for (order, class) in classes.iter().enumerate() {
            let node = hierarchy.graph.add_node(ClassNode {
                name: class.qualified_name.clone(),
                order,
                bases: class.bases.clone(),
            });
            hierarchy.index.insert(class.qualified_name.clone(), node);
        }

        for class in &classes {
            let Some(&derived) = hierarchy.index.get(&class.qualified_name) else {
                continue;
            };
            for base in &class.bases {
                if let Some(&base_node) = hierarchy.index.get(base) {
                    hierarchy.graph.add_edge(derived, base_node, ());
                }
            }
        }

        if let Err(cycle) = toposort(&hierarchy.graph, None) {
            let name = hierarchy.graph[cycle.node_id()].name.clone();
            return Err(RegistrationError::InheritanceCycle(name));
        }

        Ok(hierarchy)
    }

    fn node(&self, name: &str) -> Option<&ClassNode> {
        self.index.get(name).map(|&idx| &self.graph[idx])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Direct bases in declaration order.
    pub fn bases(&self, name: &str) -> &[String] {
        self.node(name).map(|n| n.bases.as_slice()).unwrap_or(&[])
    }

    /// All ancestors: each base followed by its own ancestors, without repeats.
    pub fn ancestors(&self, name: &str) -> Vec<String> {
        let mut result = Vec::new();
        self.collect_ancestors(name, &mut result);
        result
    }

    fn collect_ancestors(&self, name: &str, out: &mut Vec<String>) {
        for base in self.bases(name) {
            if !out.contains(base) {
                out.push(base.clone());
            }
            self.collect_ancestors(base, out);
        }
    }

    /// `derived` is `base` or inherits from it.
    pub fn inherits(&self, derived: &str, base: &str) -> bool {
        match (self.index.get(derived), self.index.get(base)) {
            (Some(&d), Some(&b)) => d == b || has_path_connecting(&self.graph, d, b, None),
            _ => derived == base,
        }
    }

    /// Direct subclasses in registration order.
    pub fn direct_subclasses(&self, name: &str) -> Vec<String> {
        let Some(&idx) = self.index.get(name) else {
            return Vec::new();
        };
        let mut subs: Vec<&ClassNode> = self
            .graph
            .neighbors_directed(idx, Direction::Incoming)
            .map(|n| &self.graph[n])
            .collect();
        subs.sort_by_key(|n| n.order);
        subs.dedup_by_key(|n| n.order);
        subs.into_iter().map(|n| n.name.clone()).collect()
    }

    /// Every transitive subclass, deepest first.
    pub fn all_subclasses(&self, name: &str) -> Vec<String> {
        let Some(&root) = self.index.get(name) else {
            return Vec::new();
        };
        let mut found: Vec<&ClassNode> = self
            .graph
            .node_indices()
            .filter(|&n| n != root && has_path_connecting(&self.graph, n, root, None))
            .map(|n| &self.graph[n])
            .collect();
        found.sort_by_key(|n| (Reverse(self.depth(&n.name)), n.order));
        found.into_iter().map(|n| n.name.clone()).collect()
    }

    /// Length of the longest base chain above `name`.
    pub fn depth(&self, name: &str) -> usize {
        self.bases(name)
            .iter()
            .map(|b| self.depth(b) + 1)
            .max()
            .unwrap_or(0)
    }

    /// Number of distinct inheritance paths from `derived` up to `ancestor`.
    pub fn path_count(&self, derived: &str, ancestor: &str) -> usize {
        if derived == ancestor {
            return 1;
        }
        self.bases(derived)
            .iter()
            .map(|b| self.path_count(b, ancestor))
            .sum()
    }

    /// The class or one of its ancestors has more than one direct base.
    pub fn uses_multiple_inheritance(&self, name: &str) -> bool {
        self.bases(name).len() > 1
            || self
                .ancestors(name)
                .iter()
                .any(|a| self.bases(a).len() > 1)
    }

    /// All classes ordered so that every base precedes its subclasses.
    ///
    /// Among classes whose bases are already placed, registration order wins.
    pub fn base_before_derived(&self) -> Vec<String> {
        let mut pending: FxHashMap<NodeIndex, usize> = self
            .graph
            .node_indices()
            .map(|n| (n, self.graph.neighbors_directed(n, Direction::Outgoing).count()))
            .collect();

        let mut ready: BinaryHeap<Reverse<(usize, NodeIndex)>> = pending
            .iter()
            .filter(|&(_, &count)| count == 0)
            .map(|(&n, _)| Reverse((self.graph[n].order, n)))
            .collect();

        let mut result = Vec::with_capacity(self.graph.node_count());
        while let Some(Reverse((_, node))) = ready.pop() {
            result.push(self.graph[node].name.clone());
            for derived in self.graph.neighbors_directed(node, Direction::Incoming) {
                if let Some(count) = pending.get_mut(&derived) {
                    *count -= 1;
                    if *count == 0 {
                        ready.push(Reverse((self.graph[derived].order, derived)));
                    }
                }
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diamond() -> ClassHierarchy {
        let classes = vec![
            ClassEntry::object("MDerived").with_base("Base1").with_base("Base2"),
            ClassEntry::object("Base1").with_base("Root"),
            ClassEntry::object("Base2").with_base("Root"),
            ClassEntry::object("Root"),
            ClassEntry::object("Leaf").with_base("MDerived"),
        ];
        ClassHierarchy::build(&classes).unwrap()
    }

    #[test]
    fn bases_come_before_derived() {
        let h = diamond();
        let order = h.base_before_derived();
        let pos = |n: &str| order.iter().position(|x| x == n).unwrap();
        assert_eq!(order.len(), 5);
        assert!(pos("Root") < pos("Base1"));
        assert!(pos("Base1") < pos("MDerived"));
        assert!(pos("Base2") < pos("MDerived"));
        assert!(pos("MDerived") < pos("Leaf"));
    }

    #[test]
    fn ancestors_are_unique_and_ordered() {
        let h = diamond();
        assert_eq!(h.ancestors("MDerived"), vec!["Base1", "Root", "Base2"]);
        assert!(h.inherits("Leaf", "Root"));
        assert!(h.inherits("Root", "Root"));
        assert!(!h.inherits("Root", "Leaf"));
    }

    #[test]
    fn diamond_has_two_paths_to_root() {
        let h = diamond();
        assert_eq!(h.path_count("MDerived", "Root"), 2);
        assert_eq!(h.path_count("MDerived", "Base1"), 1);
        assert!(h.uses_multiple_inheritance("Leaf"));
        assert!(!h.uses_multiple_inheritance("Base1"));
    }

    #[test]
    fn subclasses_deepest_first() {
        let h = diamond();
        assert_eq!(h.all_subclasses("Root"), vec!["Leaf", "MDerived", "Base1", "Base2"]);
        assert_eq!(h.direct_subclasses("Root"), vec!["Base1", "Base2"]);
    }

    #[test]
    fn cycles_are_rejected() {
        let classes = vec![
            ClassEntry::object("A").with_base("B"),
            ClassEntry::object("B").with_base("A"),
        ];
        assert!(matches!(
            ClassHierarchy::build(&classes),
            Err(RegistrationError::InheritanceCycle(_))
        ));
    }
}
