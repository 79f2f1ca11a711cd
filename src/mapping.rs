//! Bidirectional node correspondence between the two forests of a reduction.
//!
//! Starts as the identity on leaf labels and grows as sibling pairs are
//! contracted: each contraction maps the new terminal in one forest to its
//! counterpart in the other. Both directions are kept so either forest can
//! look up its twin in O(1). Node ids survive forest clones (the arena keeps
//! indices stable), so a single mapping clone per branch is all the solver
//! needs.

use std::collections::HashMap;

use crate::forest::NodeId;

#[derive(Clone, Debug, Default)]
pub struct NodeMapping {
    forward: HashMap<NodeId, NodeId>,
    backward: HashMap<NodeId, NodeId>,
}

impl NodeMapping {
    pub fn new() -> Self {
        NodeMapping::default()
    }

    /// Record that `a` in the first forest corresponds to `b` in the second.
    ///
    /// Mapping a node that already has a different twin is a defect in the
    /// reduction, not a recoverable condition.
    pub fn add(&mut self, a: NodeId, b: NodeId) {
        let old_f = self.forward.insert(a, b);
        let old_b = self.backward.insert(b, a);
        assert!(
            old_f.is_none_or(|x| x == b) && old_b.is_none_or(|x| x == a),
            "node correspondence reassigned"
        );
    }

    pub fn twin(&self, a: NodeId) -> Option<NodeId> {
        self.forward.get(&a).copied()
    }

    pub fn twin_back(&self, b: NodeId) -> Option<NodeId> {
        self.backward.get(&b).copied()
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn twin_lookup_goes_both_ways() {
        let mut m = NodeMapping::new();
        m.add(3, 7);
        m.add(4, 1);
        assert_eq!(m.twin(3), Some(7));
        assert_eq!(m.twin_back(7), Some(3));
        assert_eq!(m.twin(4), Some(1));
        assert_eq!(m.twin(5), None);
        assert_eq!(m.len(), 2);
    }

    #[test]
    #[should_panic(expected = "reassigned")]
    fn reassigning_a_twin_panics() {
        let mut m = NodeMapping::new();
        m.add(3, 7);
        m.add(3, 8);
    }
}
