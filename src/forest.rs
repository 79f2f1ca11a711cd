//! Arena-backed unrooted binary trees and forests.
//!
//! All nodes of a forest live in one `Vec<Node>`; a [`NodeId`] is an index
//! into that arena. Edges are symmetric adjacency lists (degree at most 3),
//! and on top of the adjacency each component carries a *derived* orientation:
//! every node stores its parent and its distance from the component root.
//! The orientation is bookkeeping for the agreement-forest reduction and is
//! recomputed wholesale whenever an edit changes the topology; the adjacency
//! lists are the ground truth.
//!
//! Cloning a `Forest` deep-copies the arena. Because identity is an index,
//! `NodeId`s remain valid across the copy, which is what lets the
//! branch-and-bound solver clone a forest per branch while keeping its
//! node-correspondence maps intact.
//!
//! Nodes removed by degree-2 suppression are tombstoned (`alive == false`)
//! rather than compacted, again so that indices stay stable.

use std::collections::{BTreeSet, VecDeque};

use crate::error::Error;

/// Index of a node in a forest's arena.
pub type NodeId = usize;

/// Interned leaf label (see `io::LabelInterner`).
pub type Label = usize;

#[derive(Clone, Debug)]
pub struct Node {
    label: Option<Label>,
    neighbors: Vec<NodeId>,
    parent: Option<NodeId>,
    distance: u32,
    terminal: bool,
    component: usize,
    alive: bool,
}

impl Node {
    fn new(label: Option<Label>) -> Self {
        Node {
            label,
            neighbors: Vec::with_capacity(3),
            parent: None,
            distance: 0,
            terminal: label.is_some(),
            component: 0,
            alive: true,
        }
    }
}

/// Per-component bookkeeping. The representative is the component's current
/// root; `done` marks components that the reduction has fully matched and
/// closed off.
#[derive(Clone, Debug)]
pub struct Component {
    pub representative: NodeId,
    pub done: bool,
}

#[derive(Clone, Debug, Default)]
pub struct Forest {
    nodes: Vec<Node>,
    components: Vec<Component>,
}

impl Forest {
    pub fn new() -> Self {
        Forest::default()
    }

    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    pub fn add_leaf(&mut self, label: Label) -> NodeId {
        self.nodes.push(Node::new(Some(label)));
        self.nodes.len() - 1
    }

    pub fn add_internal(&mut self) -> NodeId {
        self.nodes.push(Node::new(None));
        self.nodes.len() - 1
    }

    pub fn add_edge(&mut self, a: NodeId, b: NodeId) {
        self.nodes[a].neighbors.push(b);
        self.nodes[b].neighbors.push(a);
    }

    /// Validate a freshly built tree and set up its single component.
    ///
    /// Expects degree-2 nodes (the artificial root of a rooted newick
    /// string) to have been suppressed already. Fails on empty input,
    /// disconnected input, and internal nodes whose degree is not 3.
    pub fn finish(&mut self) -> Result<(), Error> {
        if self.nodes.iter().all(|n| !n.alive) {
            return Err(Error::EmptyTree);
        }
        for node in self.nodes.iter().filter(|n| n.alive) {
            let degree = node.neighbors.len();
            match node.label {
                Some(_) if degree > 1 => return Err(Error::NotBinary { degree }),
                None if degree != 3 => return Err(Error::NotBinary { degree }),
                _ => {}
            }
        }
        let root = self.smallest_leaf().ok_or(Error::EmptyTree)?;
        self.components.clear();
        self.components.push(Component {
            representative: root,
            done: false,
        });
        self.orient(root, 0);
        if self.nodes.iter().any(|n| n.alive && n.component != 0) {
            return Err(Error::Disconnected);
        }
        Ok(())
    }

    /// Remove a degree-2 non-leaf node by joining its two neighbors, or a
    /// degree-1 unlabeled node (a dangling artificial root) outright.
    pub(crate) fn suppress_if_degree_two(&mut self, v: NodeId) {
        if !self.nodes[v].alive || self.nodes[v].label.is_some() {
            return;
        }
        match self.nodes[v].neighbors.len() {
            2 => {
                let (a, b) = (self.nodes[v].neighbors[0], self.nodes[v].neighbors[1]);
                self.detach(v, a);
                self.detach(v, b);
                self.add_edge(a, b);
                self.tombstone(v);
            }
            1 => {
                let a = self.nodes[v].neighbors[0];
                self.detach(v, a);
                self.tombstone(v);
            }
            _ => {}
        }
    }

    fn tombstone(&mut self, v: NodeId) {
        let node = &mut self.nodes[v];
        node.alive = false;
        node.neighbors.clear();
        node.parent = None;
        node.terminal = false;
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn is_alive(&self, x: NodeId) -> bool {
        self.nodes[x].alive
    }

    /// Every arena slot, live or tombstoned.
    pub fn node_ids(&self) -> std::ops::Range<NodeId> {
        0..self.nodes.len()
    }

    pub fn label(&self, x: NodeId) -> Option<Label> {
        self.nodes[x].label
    }

    pub fn neighbors(&self, x: NodeId) -> &[NodeId] {
        &self.nodes[x].neighbors
    }

    pub fn degree(&self, x: NodeId) -> usize {
        self.nodes[x].neighbors.len()
    }

    pub fn parent(&self, x: NodeId) -> Option<NodeId> {
        self.nodes[x].parent
    }

    pub fn distance(&self, x: NodeId) -> u32 {
        self.nodes[x].distance
    }

    pub fn is_terminal(&self, x: NodeId) -> bool {
        self.nodes[x].terminal
    }

    pub fn set_terminal(&mut self, x: NodeId, terminal: bool) {
        self.nodes[x].terminal = terminal;
    }

    pub fn component_of(&self, x: NodeId) -> usize {
        self.nodes[x].component
    }

    pub fn num_components(&self) -> usize {
        self.components.len()
    }

    pub fn component(&self, idx: usize) -> &Component {
        &self.components[idx]
    }

    pub fn set_component_done(&mut self, idx: usize) {
        self.components[idx].done = true;
    }

    /// Point a component at a new representative root.
    pub fn update_component(&mut self, idx: usize, representative: NodeId) {
        self.components[idx].representative = representative;
    }

    /// A node is active while it still takes part in the reduction: it is a
    /// terminal of a component that has not been closed off.
    pub fn is_active(&self, x: NodeId) -> bool {
        let node = &self.nodes[x];
        node.alive && node.terminal && !self.components[node.component].done
    }

    /// All live leaves, in arena order.
    pub fn leaves(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.alive && n.label.is_some())
            .map(|(id, _)| id)
    }

    /// Sorted labels of all live leaves.
    pub fn leaf_labels(&self) -> Vec<Label> {
        let mut labels: Vec<Label> = self.leaves().filter_map(|id| self.label(id)).collect();
        labels.sort_unstable();
        labels
    }

    pub fn node_with_label(&self, label: Label) -> Option<NodeId> {
        self.leaves().find(|&id| self.label(id) == Some(label))
    }

    /// The live leaf with the smallest label, across all components.
    pub fn smallest_leaf(&self) -> Option<NodeId> {
        self.leaves().min_by_key(|&id| self.label(id))
    }

    /// The unique neighbor of `x` that is neither `a` nor `b`.
    pub fn get_neighbor_not(&self, x: NodeId, a: NodeId, b: NodeId) -> Result<NodeId, Error> {
        let mut found = None;
        for &n in &self.nodes[x].neighbors {
            if n != a && n != b {
                if found.is_some() {
                    return Err(Error::NoThirdNeighbor);
                }
                found = Some(n);
            }
        }
        found.ok_or(Error::NoThirdNeighbor)
    }

    // ------------------------------------------------------------------
    // Orientation
    // ------------------------------------------------------------------

    /// Rebuild parent pointers, distances, and component membership for the
    /// component reachable from `root`, and record `root` as its
    /// representative.
    fn orient(&mut self, root: NodeId, component: usize) {
        self.components[component].representative = root;
        self.nodes[root].parent = None;
        self.nodes[root].distance = 0;
        self.nodes[root].component = component;
        let mut queue = VecDeque::from([root]);
        while let Some(x) = queue.pop_front() {
            let dist = self.nodes[x].distance;
            let parent = self.nodes[x].parent;
            for i in 0..self.nodes[x].neighbors.len() {
                let n = self.nodes[x].neighbors[i];
                if Some(n) == parent {
                    continue;
                }
                self.nodes[n].parent = Some(x);
                self.nodes[n].distance = dist + 1;
                self.nodes[n].component = component;
                queue.push_back(n);
            }
        }
    }

    /// Re-root the component containing the leaf with the given label at that
    /// leaf. Idempotent when already rooted there.
    pub fn root(&mut self, label: Label) -> Result<(), Error> {
        let leaf = self.node_with_label(label).ok_or(Error::UnmappedNode)?;
        let comp = self.component_of(leaf);
        self.orient(leaf, comp);
        Ok(())
    }

    /// Reorient the component of `x` so that `x`'s parent becomes its
    /// neighbor `n`. Implemented as a re-root at `n`; all adjacency is
    /// preserved, only the derived orientation changes.
    pub fn rotate(&mut self, x: NodeId, n: NodeId) -> Result<(), Error> {
        if !self.nodes[x].neighbors.contains(&n) {
            return Err(Error::NotAdjacent);
        }
        if self.parent(x) != Some(n) {
            let comp = self.component_of(x);
            self.orient(n, comp);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Edits
    // ------------------------------------------------------------------

    pub(crate) fn detach(&mut self, a: NodeId, b: NodeId) {
        self.nodes[a].neighbors.retain(|&n| n != b);
        self.nodes[b].neighbors.retain(|&n| n != a);
    }

    /// Delete the edge between `a` and `b`, one of which must be the other's
    /// parent. The side that hung below the edge becomes a new component with
    /// a fresh id. Non-terminal nodes left with degree 2 are spliced out on
    /// both sides, and both affected components are reoriented at a terminal
    /// (see [`Forest::orientation_root_from`]); a side whose terminal count
    /// drops to one is a finished agreement piece and is closed on the spot.
    ///
    /// Returns the id of the new component.
    pub fn cut_edge(&mut self, a: NodeId, b: NodeId) -> Result<usize, Error> {
        let (child, parent) = if self.parent(a) == Some(b) {
            (a, b)
        } else if self.parent(b) == Some(a) {
            (b, a)
        } else {
            return Err(Error::NotAdjacent);
        };
        let old_comp = self.component_of(parent);
        self.detach(child, parent);

        let new_comp = self.components.len();
        self.components.push(Component {
            representative: child,
            done: false,
        });

        // Anchors into each side must be grabbed before splicing, since a
        // splice tombstones the node we would otherwise start from.
        let child_anchor = self.nodes[child].neighbors.first().copied();
        self.splice_out_if_redundant(child);
        let anchor = if self.nodes[child].alive {
            child
        } else {
            child_anchor.ok_or(Error::Disconnected)?
        };
        let root = self
            .orientation_root_from(anchor)
            .ok_or(Error::EmptyTree)?;
        self.orient(root, new_comp);
        if self.is_lone_terminal_component(root) {
            self.components[new_comp].done = true;
        }

        let parent_anchor = self.nodes[parent].neighbors.first().copied();
        self.splice_out_if_redundant(parent);
        let anchor = if self.nodes[parent].alive {
            parent
        } else {
            parent_anchor.ok_or(Error::Disconnected)?
        };
        let root = self
            .orientation_root_from(anchor)
            .ok_or(Error::EmptyTree)?;
        self.orient(root, old_comp);
        if self.is_lone_terminal_component(root) {
            self.components[old_comp].done = true;
        }
        Ok(new_comp)
    }

    /// Root for (re)orienting a component: the smallest-id terminal if one
    /// exists, otherwise the smallest-labeled leaf. Contracted subtrees touch
    /// the rest of their component only through their own terminal, so an
    /// orientation rooted at a terminal keeps every contracted subtree below
    /// the terminal that stands for it; a leaf inside a contracted subtree
    /// would invert that and corrupt the reduction's parent-edge reasoning.
    fn orientation_root_from(&self, start: NodeId) -> Option<NodeId> {
        let mut terminal: Option<NodeId> = None;
        let mut leaf: Option<NodeId> = None;
        self.walk_component(start, |f, id| {
            if f.is_terminal(id) && terminal.is_none_or(|b| id < b) {
                terminal = Some(id);
            }
            if f.label(id).is_some() && leaf.is_none_or(|b| f.label(id) < f.label(b)) {
                leaf = Some(id);
            }
        });
        terminal.or(leaf)
    }

    /// Whether the component reachable from `root` holds exactly one
    /// terminal. Such a component is a single finished agreement piece with
    /// nothing left to reduce.
    fn is_lone_terminal_component(&self, root: NodeId) -> bool {
        let mut terminals = 0usize;
        self.walk_component(root, |f, id| {
            if f.is_terminal(id) {
                terminals += 1;
            }
        });
        terminals == 1
    }

    /// Re-root the component of `x` at `x` itself.
    pub(crate) fn reroot_at(&mut self, x: NodeId) {
        let comp = self.component_of(x);
        self.orient(x, comp);
    }

    /// The smallest-id terminal in `x`'s component other than `x` itself.
    pub(crate) fn other_terminal_in_component(&self, x: NodeId) -> Option<NodeId> {
        let mut best: Option<NodeId> = None;
        self.walk_component(x, |f, id| {
            if id != x && f.is_terminal(id) && best.is_none_or(|b| id < b) {
                best = Some(id);
            }
        });
        best
    }

    /// Replace the edge between `u` and `v` with a fresh internal node
    /// adjacent to both. Used when rejoining forest components; the caller
    /// is responsible for reorienting if it needs parent pointers.
    pub(crate) fn subdivide(&mut self, u: NodeId, v: NodeId) -> Result<NodeId, Error> {
        if !self.nodes[u].neighbors.contains(&v) {
            return Err(Error::NotAdjacent);
        }
        self.detach(u, v);
        let m = self.add_internal();
        self.add_edge(u, m);
        self.add_edge(m, v);
        Ok(m)
    }

    /// Splice a non-terminal node of degree 2 out of its component, or
    /// tombstone a non-terminal unlabeled node of degree 0.
    fn splice_out_if_redundant(&mut self, v: NodeId) {
        if !self.nodes[v].alive || self.nodes[v].terminal || self.nodes[v].label.is_some() {
            return;
        }
        match self.nodes[v].neighbors.len() {
            2 => {
                let (a, b) = (self.nodes[v].neighbors[0], self.nodes[v].neighbors[1]);
                self.detach(v, a);
                self.detach(v, b);
                self.add_edge(a, b);
                self.tombstone(v);
            }
            0 => self.tombstone(v),
            _ => {}
        }
    }

    /// Delete a leaf and splice its former attachment point, reorienting the
    /// surviving component. Used by the common-cherry preprocessing.
    pub fn remove_leaf(&mut self, leaf: NodeId) -> Result<(), Error> {
        let comp = self.component_of(leaf);
        let attach = match self.nodes[leaf].neighbors.first().copied() {
            Some(p) => p,
            None => {
                self.tombstone(leaf);
                return Ok(());
            }
        };
        self.detach(leaf, attach);
        self.tombstone(leaf);
        let attach_anchor = self.nodes[attach].neighbors.first().copied();
        self.splice_out_if_redundant(attach);
        let anchor = if self.nodes[attach].alive {
            attach
        } else {
            attach_anchor.ok_or(Error::EmptyTree)?
        };
        let rep = self
            .smallest_leaf_reachable_from(anchor)
            .ok_or(Error::EmptyTree)?;
        self.orient(rep, comp);
        Ok(())
    }

    fn smallest_leaf_reachable_from(&self, start: NodeId) -> Option<NodeId> {
        let mut best: Option<NodeId> = None;
        self.walk_component(start, |f, id| {
            if f.label(id).is_some() {
                match best {
                    Some(b) if f.label(b) <= f.label(id) => {}
                    _ => best = Some(id),
                }
            }
        });
        best
    }

    fn walk_component(&self, start: NodeId, mut visit: impl FnMut(&Forest, NodeId)) {
        if !self.nodes[start].alive {
            return;
        }
        let mut seen = vec![false; self.nodes.len()];
        let mut queue = VecDeque::from([start]);
        seen[start] = true;
        while let Some(x) = queue.pop_front() {
            visit(self, x);
            for &n in &self.nodes[x].neighbors {
                if !seen[n] {
                    seen[n] = true;
                    queue.push_back(n);
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Reduction support
    // ------------------------------------------------------------------

    /// Reset terminal flags (leaves are terminal, everything else is not)
    /// and clear all done flags. Called once before a reduction starts.
    pub fn reset_reduction_state(&mut self) {
        for node in self.nodes.iter_mut().filter(|n| n.alive) {
            node.terminal = node.label.is_some();
        }
        for comp in &mut self.components {
            comp.done = false;
        }
    }

    /// All currently checkable sibling pairs, as normalized `(min, max)`
    /// node id pairs. A pair is either two active terminals sharing an
    /// attachment node, or two active terminals joined directly by an edge
    /// (a component reduced to its final join).
    pub fn find_sibling_pairs(&self) -> BTreeSet<(NodeId, NodeId)> {
        let mut pairs = BTreeSet::new();
        for x in 0..self.nodes.len() {
            if self.nodes[x].alive && self.is_active(x) {
                self.sibling_pairs_of(x, &mut pairs);
            }
        }
        pairs
    }

    /// Insert into `pairs` every sibling pair that `x` currently takes part
    /// in. Used both by the full scan and for local requeueing after an edit.
    pub fn sibling_pairs_of(&self, x: NodeId, pairs: &mut BTreeSet<(NodeId, NodeId)>) {
        if !self.is_active(x) {
            return;
        }
        if let Some(p) = self.parent(x) {
            if self.is_active(p) {
                pairs.insert(normalized(x, p));
            } else {
                for &s in &self.nodes[p].neighbors {
                    if s != x && self.parent(s) == Some(p) && self.is_active(s) {
                        pairs.insert(normalized(x, s));
                    }
                }
            }
        }
        for &c in &self.nodes[x].neighbors {
            if self.parent(c) == Some(x) && self.is_active(c) {
                pairs.insert(normalized(x, c));
            }
        }
    }

    // ------------------------------------------------------------------
    // Serialization
    // ------------------------------------------------------------------

    /// Canonical newick-like form of the whole forest, independent of stored
    /// orientation, neighbor order, and component bookkeeping. Each component
    /// is rooted at its smallest-labeled leaf, children are ordered by the
    /// smallest label below them, and components are emitted in order of
    /// their smallest label, separated by spaces. Unlabeled degree-2 nodes
    /// are serialized through, so two forests are isomorphic up to redundant
    /// nodes exactly when their canonical forms are equal.
    ///
    /// Components are derived from adjacency here, so the canonical form
    /// stays correct even while component ids are stale (for instance on a
    /// forest produced by the neighborhood enumerator).
    pub fn canonical_form(&self) -> String {
        let mut seen = vec![false; self.nodes.len()];
        let mut parts: Vec<(Label, String)> = Vec::new();
        for start in 0..self.nodes.len() {
            if !self.nodes[start].alive || seen[start] {
                continue;
            }
            let mut members = Vec::new();
            let mut queue = VecDeque::from([start]);
            seen[start] = true;
            while let Some(x) = queue.pop_front() {
                members.push(x);
                for &n in &self.nodes[x].neighbors {
                    if !seen[n] {
                        seen[n] = true;
                        queue.push_back(n);
                    }
                }
            }
            let root = members
                .iter()
                .copied()
                .filter(|&id| self.label(id).is_some())
                .min_by_key(|&id| self.label(id));
            let root = match root {
                Some(r) => r,
                // A component without leaves cannot occur in a valid forest.
                None => continue,
            };
            let label = self.nodes[root].label.unwrap_or(0);
            let text = match self.nodes[root].neighbors.first().copied() {
                None => format!("{label}"),
                Some(n) => {
                    let (_, sub) = self.canonical_subtree(n, root);
                    format!("({label},{sub})")
                }
            };
            parts.push((label, text));
        }
        parts.sort();
        parts
            .into_iter()
            .map(|(_, text)| text)
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn canonical_subtree(&self, x: NodeId, from: NodeId) -> (Label, String) {
        let children: Vec<NodeId> = self.nodes[x]
            .neighbors
            .iter()
            .copied()
            .filter(|&n| n != from)
            .collect();
        if children.is_empty() {
            let label = self.nodes[x].label.unwrap_or(0);
            return (label, format!("{label}"));
        }
        // An unlabeled degree-2 node adds no structure; serialize straight
        // through it so forests differing only in redundant nodes compare
        // equal.
        if let [only] = children[..] {
            if self.nodes[x].label.is_none() {
                return self.canonical_subtree(only, x);
            }
        }
        let mut subs: Vec<(Label, String)> = children
            .into_iter()
            .map(|c| self.canonical_subtree(c, x))
            .collect();
        subs.sort();
        let min = subs[0].0;
        let text = format!(
            "({})",
            subs.into_iter()
                .map(|(_, t)| t)
                .collect::<Vec<_>>()
                .join(",")
        );
        (min, text)
    }

    /// Serialize in stored order, one component per representative, using
    /// `names` to render labels when provided. Diagnostic output; use
    /// [`Forest::canonical_form`] for comparisons.
    pub fn str(&self, names: Option<&[String]>) -> String {
        self.components
            .iter()
            .filter(|c| self.nodes[c.representative].alive)
            .map(|c| {
                let root = c.representative;
                match self.nodes[root].neighbors.first().copied() {
                    None => self.render_label(root, names),
                    Some(n) => format!(
                        "({},{})",
                        self.render_label(root, names),
                        self.stored_subtree(n, root, names)
                    ),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// The subtree hanging below `x` under the current orientation.
    pub fn str_subtree(&self, x: NodeId, names: Option<&[String]>) -> String {
        match self.parent(x) {
            Some(p) => self.stored_subtree(x, p, names),
            None => self.str(names),
        }
    }

    fn stored_subtree(&self, x: NodeId, from: NodeId, names: Option<&[String]>) -> String {
        let children: Vec<NodeId> = self.nodes[x]
            .neighbors
            .iter()
            .copied()
            .filter(|&n| n != from)
            .collect();
        if children.is_empty() {
            return self.render_label(x, names);
        }
        if let [only] = children[..] {
            if self.nodes[x].label.is_none() {
                return self.stored_subtree(only, x, names);
            }
        }
        format!(
            "({})",
            children
                .into_iter()
                .map(|c| self.stored_subtree(c, x, names))
                .collect::<Vec<_>>()
                .join(",")
        )
    }

    fn render_label(&self, x: NodeId, names: Option<&[String]>) -> String {
        match (self.nodes[x].label, names) {
            (Some(l), Some(ns)) if l < ns.len() => ns[l].clone(),
            (Some(l), _) => format!("{l}"),
            (None, _) => String::new(),
        }
    }

    /// Bring the forest into a fully normalized physical shape: component
    /// bookkeeping is rebuilt from adjacency, every component is rooted at
    /// its smallest leaf, and every adjacency list is reordered to parent
    /// first, then children by the smallest label below them. After this,
    /// [`Forest::str`] of a tree agrees with its canonical form. Idempotent.
    pub fn normalize_order(&mut self) {
        let mut seen = vec![false; self.nodes.len()];
        let mut groups: Vec<(Label, NodeId)> = Vec::new();
        for start in 0..self.nodes.len() {
            if !self.nodes[start].alive || seen[start] {
                continue;
            }
            let mut best: Option<NodeId> = None;
            let mut queue = VecDeque::from([start]);
            seen[start] = true;
            while let Some(x) = queue.pop_front() {
                if self.label(x).is_some() && best.is_none_or(|b| self.label(x) < self.label(b)) {
                    best = Some(x);
                }
                for &n in &self.nodes[x].neighbors {
                    if !seen[n] {
                        seen[n] = true;
                        queue.push_back(n);
                    }
                }
            }
            if let Some(root) = best {
                groups.push((self.nodes[root].label.unwrap_or(0), root));
            }
        }
        groups.sort_unstable();
        self.components = groups
            .iter()
            .map(|&(_, root)| Component {
                representative: root,
                done: false,
            })
            .collect();
        for (idx, &(_, root)) in groups.iter().enumerate() {
            self.orient(root, idx);
        }
        for x in 0..self.nodes.len() {
            if !self.nodes[x].alive {
                continue;
            }
            let parent = self.nodes[x].parent;
            let mut order: Vec<(u32, Label, NodeId)> = self.nodes[x]
                .neighbors
                .iter()
                .map(|&n| {
                    if Some(n) == parent {
                        (0, 0, n)
                    } else {
                        (1, self.min_label_below(n, x).unwrap_or(Label::MAX), n)
                    }
                })
                .collect();
            order.sort_unstable();
            self.nodes[x].neighbors = order.into_iter().map(|(_, _, n)| n).collect();
        }
    }

    fn min_label_below(&self, x: NodeId, from: NodeId) -> Option<Label> {
        let mut best = self.nodes[x].label;
        for &n in &self.nodes[x].neighbors {
            if n == from {
                continue;
            }
            if let Some(l) = self.min_label_below(n, x) {
                if best.is_none_or(|b| l < b) {
                    best = Some(l);
                }
            }
        }
        best
    }
}

pub(crate) fn normalized(a: NodeId, b: NodeId) -> (NodeId, NodeId) {
    if a <= b { (a, b) } else { (b, a) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{LabelInterner, forest_from_newick};

    fn tree(newick: &str, interner: &mut LabelInterner) -> Forest {
        forest_from_newick(newick, interner).unwrap()
    }

    #[test]
    fn canonical_form_ignores_rotation_and_rooting() {
        let mut interner = LabelInterner::new();
        let a = tree("((1,2),(3,4));", &mut interner);
        let b = tree("((4,3),(2,1));", &mut interner);
        let c = tree("(1,(2,(3,4)));", &mut interner);
        assert_eq!(a.canonical_form(), b.canonical_form());
        assert_eq!(a.canonical_form(), c.canonical_form());
    }

    #[test]
    fn canonical_form_distinguishes_topologies() {
        let mut interner = LabelInterner::new();
        let a = tree("((1,2),(3,4));", &mut interner);
        let b = tree("((1,3),(2,4));", &mut interner);
        assert_ne!(a.canonical_form(), b.canonical_form());
    }

    #[test]
    fn normalize_order_is_idempotent_and_matches_canonical() {
        let mut interner = LabelInterner::new();
        let mut t = tree("((5,(3,1)),(2,4));", &mut interner);
        t.normalize_order();
        let once = t.str(None);
        assert_eq!(once, t.canonical_form());
        t.normalize_order();
        assert_eq!(once, t.str(None));
    }

    #[test]
    fn clone_is_a_deep_copy() {
        let mut interner = LabelInterner::new();
        let t = tree("((1,2),(3,4));", &mut interner);
        let before = t.canonical_form();
        let mut copy = t.clone();
        let leaf = copy.node_with_label(3).unwrap();
        let parent = copy.parent(leaf).unwrap();
        copy.cut_edge(leaf, parent).unwrap();
        assert_eq!(t.canonical_form(), before);
        assert_ne!(copy.canonical_form(), before);
    }

    #[test]
    fn cut_edge_creates_a_done_terminal_component() {
        let mut interner = LabelInterner::new();
        let mut t = tree("((1,2),(3,4));", &mut interner);
        t.reset_reduction_state();
        let leaf = t.node_with_label(3).unwrap();
        let parent = t.parent(leaf).unwrap();
        let comp = t.cut_edge(leaf, parent).unwrap();
        assert!(t.component(comp).done);
        assert_eq!(t.component(comp).representative, leaf);
        assert_eq!(t.num_components(), 2);
        // The surviving three-leaf component lost its degree-2 join.
        assert!(
            t.leaves()
                .filter(|&l| t.component_of(l) != comp)
                .all(|l| t.degree(l) <= 1)
        );
    }

    // Cutting an internal edge leaves both sides open while each still
    // holds several terminals; only a lone-terminal side is closed.
    #[test]
    fn cut_component_with_remaining_terminals_stays_open() {
        let mut interner = LabelInterner::new();
        let mut t = tree("(((1,2),(3,4)),(5,6));", &mut interner);
        t.normalize_order();
        t.reset_reduction_state();
        let (p, q) = t
            .leaves()
            .find_map(|l| {
                let p = t.parent(l)?;
                let q = t.parent(p)?;
                // Keep the root leaf's own attachment out of it; both sides
                // of the chosen edge must hold at least two leaves.
                t.parent(q)?;
                Some((p, q))
            })
            .unwrap();
        let comp = t.cut_edge(p, q).unwrap();
        assert!(!t.component(comp).done);
        assert!(!t.component(t.component_of(q)).done);
    }

    #[test]
    fn canonical_form_serializes_through_degree_two_nodes() {
        let mut plain = Forest::new();
        let a = plain.add_leaf(0);
        let b = plain.add_leaf(1);
        let c = plain.add_leaf(2);
        let p = plain.add_internal();
        plain.add_edge(a, p);
        plain.add_edge(b, p);
        plain.add_edge(c, p);

        // Same shape with a redundant degree-2 node on the edge above leaf 0.
        let mut padded = Forest::new();
        let a2 = padded.add_leaf(0);
        let b2 = padded.add_leaf(1);
        let c2 = padded.add_leaf(2);
        let p2 = padded.add_internal();
        let m = padded.add_internal();
        padded.add_edge(a2, m);
        padded.add_edge(m, p2);
        padded.add_edge(b2, p2);
        padded.add_edge(c2, p2);

        assert_eq!(plain.canonical_form(), padded.canonical_form());
    }

    #[test]
    fn root_is_idempotent() {
        let mut interner = LabelInterner::new();
        let mut t = tree("((1,2),(3,4));", &mut interner);
        let label = t.label(t.smallest_leaf().unwrap()).unwrap();
        t.root(label).unwrap();
        let first = t.str(None);
        t.root(label).unwrap();
        assert_eq!(first, t.str(None));
    }

    #[test]
    fn sibling_pairs_found_for_cherries() {
        let mut interner = LabelInterner::new();
        let mut t = tree("((1,2),(3,4));", &mut interner);
        t.normalize_order();
        t.reset_reduction_state();
        let pairs = t.find_sibling_pairs();
        // A quartet rooted at one of its leaves exposes exactly the cherry
        // away from the root; the root leaf itself never pairs up.
        assert_eq!(pairs.len(), 1);
        for &(x, y) in &pairs {
            assert!(t.is_active(x) && t.is_active(y));
            let attached = t
                .neighbors(x)
                .iter()
                .any(|n| t.neighbors(y).contains(n));
            assert!(attached || t.neighbors(x).contains(&y));
        }
    }

    #[test]
    fn non_binary_input_is_rejected() {
        let mut interner = LabelInterner::new();
        assert!(matches!(
            forest_from_newick("((1,2,3),(4,5));", &mut interner),
            Err(Error::NotBinary { .. })
        ));
    }
}
