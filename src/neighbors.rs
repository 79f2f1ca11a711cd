//! Neighborhood enumeration for rearrangement moves.
//!
//! The SPR primitive is a slide: a degree-3 "plug" node `x`, carrying the
//! subtree attached through one neighbor `y`, is pulled out of its socket
//! (the edge between its other two neighbors, which fuse) and pushed into a
//! target edge `(w, z)` elsewhere. Target edges inside the carried piece are
//! rejected up front (they would close a cycle), as is the freshly fused
//! socket itself (the identity move). Slides are applied destructively and
//! reverted exactly, so the enumerator's net effect on its input is the
//! identity; each accepted result is recorded as a canonical form plus a
//! deep copy of the forest in the moved state.
//!
//! Replug enumeration extends the move set for forest states: besides slides
//! (whose targets may lie in any other component), an edge may be unplugged
//! outright, splitting a component in two, and two components may be plugged
//! back together through any pair of attachment points. Unplug and plug work
//! on clones, so they need no inverse.
//!
//! All results are deduplicated by canonical form and exclude the input
//! itself and anything in the caller's visited set.

use std::collections::{BTreeMap, HashSet, VecDeque};

use itertools::Itertools;

use crate::error::Error;
use crate::forest::{Forest, NodeId, normalized};

/// Every distinct tree one SPR move away from `tree`, minus the visited set.
/// The input must be a single tree; it is returned to its original shape
/// before this function returns.
pub fn spr_neighbors(
    tree: &mut Forest,
    visited: &HashSet<String>,
) -> Result<Vec<(String, Forest)>, Error> {
    let mut out = BTreeMap::new();
    slide_moves(tree, visited, &mut out)?;
    Ok(out.into_iter().collect())
}

/// Every distinct forest one replug move away from `forest`, minus the
/// visited set: slides across the whole forest, single-edge unplugs, and
/// component-pair plugs.
pub fn replug_neighbors(
    forest: &mut Forest,
    visited: &HashSet<String>,
) -> Result<Vec<(String, Forest)>, Error> {
    let mut out = BTreeMap::new();
    slide_moves(forest, visited, &mut out)?;
    unplug_moves(forest, visited, &mut out);
    plug_moves(forest, visited, &mut out)?;
    Ok(out.into_iter().collect())
}

fn record(
    key: String,
    state: &Forest,
    original: &str,
    visited: &HashSet<String>,
    out: &mut BTreeMap<String, Forest>,
) {
    if key != original && !visited.contains(&key) && !out.contains_key(&key) {
        out.insert(key, state.clone());
    }
}

fn all_edges(f: &Forest) -> Vec<(NodeId, NodeId)> {
    let mut edges = Vec::new();
    for x in f.node_ids() {
        if !f.is_alive(x) {
            continue;
        }
        for &n in f.neighbors(x) {
            if x < n {
                edges.push((x, n));
            }
        }
    }
    edges
}

fn reachable_from(f: &Forest, start: NodeId) -> Vec<bool> {
    let mut seen = vec![false; f.node_ids().end];
    let mut queue = VecDeque::from([start]);
    seen[start] = true;
    while let Some(x) = queue.pop_front() {
        for &n in f.neighbors(x) {
            if !seen[n] {
                seen[n] = true;
                queue.push_back(n);
            }
        }
    }
    seen
}

fn slide_moves(
    f: &mut Forest,
    visited: &HashSet<String>,
    out: &mut BTreeMap<String, Forest>,
) -> Result<(), Error> {
    let original = f.canonical_form();
    let plugs: Vec<NodeId> = f
        .node_ids()
        .filter(|&x| f.is_alive(x) && f.degree(x) == 3)
        .collect();
    for x in plugs {
        let nbrs: Vec<NodeId> = f.neighbors(x).to_vec();
        for &y in &nbrs {
            let sockets: Vec<NodeId> = nbrs.iter().copied().filter(|&n| n != y).collect();
            let (s1, s2) = (sockets[0], sockets[1]);
            // Pull x and the subtree through y out; the socket fuses.
            f.detach(x, s1);
            f.detach(x, s2);
            f.add_edge(s1, s2);

            let carried = reachable_from(f, x);
            let socket = normalized(s1, s2);
            let targets: Vec<(NodeId, NodeId)> = all_edges(f)
                .into_iter()
                .filter(|&(w, z)| !carried[w] && !carried[z] && (w, z) != socket)
                .collect();
            for (w, z) in targets {
                f.detach(w, z);
                f.add_edge(x, w);
                f.add_edge(x, z);
                record(f.canonical_form(), f, &original, visited, out);
                f.detach(x, w);
                f.detach(x, z);
                f.add_edge(w, z);
            }

            // Exact inverse of the pull.
            f.detach(s1, s2);
            f.add_edge(x, s1);
            f.add_edge(x, s2);
        }
    }
    debug_assert_eq!(f.canonical_form(), original);
    Ok(())
}

fn unplug_moves(f: &Forest, visited: &HashSet<String>, out: &mut BTreeMap<String, Forest>) {
    let original = f.canonical_form();
    for (u, v) in all_edges(f) {
        let mut copy = f.clone();
        copy.detach(u, v);
        copy.suppress_if_degree_two(u);
        copy.suppress_if_degree_two(v);
        record(copy.canonical_form(), &copy, &original, visited, out);
    }
}

/// An attachment point on a component: a subdivision of one of its edges,
/// or the node itself for a singleton component.
#[derive(Clone, Copy)]
enum Attach {
    Edge(NodeId, NodeId),
    Node(NodeId),
}

fn attach_points(f: &Forest, members: &[NodeId]) -> Vec<Attach> {
    if let [solo] = members {
        return vec![Attach::Node(*solo)];
    }
    let mut points = Vec::new();
    for &x in members {
        for &n in f.neighbors(x) {
            if x < n {
                points.push(Attach::Edge(x, n));
            }
        }
    }
    points
}

fn realize(f: &mut Forest, at: Attach) -> Result<NodeId, Error> {
    match at {
        Attach::Edge(u, v) => f.subdivide(u, v),
        Attach::Node(x) => Ok(x),
    }
}

fn plug_moves(
    f: &Forest,
    visited: &HashSet<String>,
    out: &mut BTreeMap<String, Forest>,
) -> Result<(), Error> {
    let mut groups: Vec<Vec<NodeId>> = Vec::new();
    let mut seen = vec![false; f.node_ids().end];
    for start in f.node_ids() {
        if !f.is_alive(start) || seen[start] {
            continue;
        }
        let reach = reachable_from(f, start);
        let members: Vec<NodeId> = f
            .node_ids()
            .filter(|&id| reach[id] && f.is_alive(id))
            .collect();
        for &m in &members {
            seen[m] = true;
        }
        groups.push(members);
    }
    if groups.len() < 2 {
        return Ok(());
    }
    let original = f.canonical_form();
    for (gi, gj) in groups.iter().tuple_combinations() {
        for &a in &attach_points(f, gi) {
            for &c in &attach_points(f, gj) {
                let mut copy = f.clone();
                let m = realize(&mut copy, a)?;
                let n = realize(&mut copy, c)?;
                copy.add_edge(m, n);
                record(copy.canonical_form(), &copy, &original, visited, out);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{LabelInterner, forest_from_newick};

    fn tree(newick: &str, interner: &mut LabelInterner) -> Forest {
        forest_from_newick(newick, interner).unwrap()
    }

    #[test]
    fn enumeration_leaves_the_input_untouched() {
        let mut interner = LabelInterner::new();
        let mut t = tree("(((1,2),(3,4)),(5,6));", &mut interner);
        let before = t.canonical_form();
        spr_neighbors(&mut t, &HashSet::new()).unwrap();
        assert_eq!(t.canonical_form(), before);
        replug_neighbors(&mut t, &HashSet::new()).unwrap();
        assert_eq!(t.canonical_form(), before);
    }

    #[test]
    fn quartet_neighborhood_is_the_other_two_topologies() {
        let mut interner = LabelInterner::new();
        let mut t = tree("((1,2),(3,4));", &mut interner);
        let own = t.canonical_form();
        let neighbors = spr_neighbors(&mut t, &HashSet::new()).unwrap();
        // An unrooted quartet has exactly three topologies; one SPR move
        // reaches both of the others and never reproduces the input.
        assert_eq!(neighbors.len(), 2);
        let alt1 = tree("((1,3),(2,4));", &mut interner).canonical_form();
        let alt2 = tree("((1,4),(2,3));", &mut interner).canonical_form();
        let keys: Vec<&String> = neighbors.iter().map(|(k, _)| k).collect();
        assert!(keys.contains(&&alt1));
        assert!(keys.contains(&&alt2));
        assert!(!keys.contains(&&own));
    }

    #[test]
    fn visited_states_are_suppressed() {
        let mut interner = LabelInterner::new();
        let mut t = tree("((1,2),(3,4));", &mut interner);
        let alt1 = tree("((1,3),(2,4));", &mut interner).canonical_form();
        let mut visited = HashSet::new();
        visited.insert(alt1.clone());
        let neighbors = spr_neighbors(&mut t, &visited).unwrap();
        assert!(neighbors.iter().all(|(k, _)| *k != alt1));
        assert_eq!(neighbors.len(), 1);
    }

    #[test]
    fn unplug_then_plug_round_trips_through_a_forest() {
        let mut interner = LabelInterner::new();
        let mut t = tree("((1,2),(3,4));", &mut interner);
        let own = t.canonical_form();
        let neighbors = replug_neighbors(&mut t, &HashSet::new()).unwrap();
        // Some replug neighbor is a genuine two-component forest.
        let forest_state = neighbors
            .iter()
            .find(|(k, _)| k.contains(' '))
            .expect("an unplug move yields a forest");
        // Plugging that forest back together reaches the original tree.
        let mut detached = forest_state.1.clone();
        let rejoined = replug_neighbors(&mut detached, &HashSet::new()).unwrap();
        assert!(rejoined.iter().any(|(k, _)| *k == own));
    }

    #[test]
    fn neighbor_forests_are_structurally_consistent() {
        let mut interner = LabelInterner::new();
        let mut t = tree("((1,2),(3,(4,5)));", &mut interner);
        let neighbors = replug_neighbors(&mut t, &HashSet::new()).unwrap();
        for (key, state) in neighbors {
            assert_eq!(state.canonical_form(), key);
            for x in state.node_ids() {
                if state.is_alive(x) {
                    let degree = state.degree(x);
                    match state.label(x) {
                        Some(_) => assert!(degree <= 1),
                        None => assert_eq!(degree, 3),
                    }
                }
            }
        }
    }
}
