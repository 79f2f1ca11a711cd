//! Exact TBR distance and maximum agreement forests.
//!
//! Two unrooted binary trees over the same leaf set are reduced side by side:
//! sibling pairs of terminals in the first forest are checked against their
//! twins in the second and either merged (the pair agrees), split off (the
//! twins' component is already fully matched), or branched over (the twins
//! conflict, and one of a small set of edges must be cut). A budget `k`
//! bounds the number of cuts per attempt; the public entry points run
//! iterative deepening on `k`, so the first budget that admits a solution is
//! the distance. Conflicts take the explicit minimum over their branches, so
//! intermediate budgets never have to be trusted.
//!
//! The number of cuts in a solution is the TBR distance, and the cut-up copy
//! of either tree is a maximum agreement forest (`d + 1` components).
//!
//! A cheap greedy variant of the same reduction cuts three candidate edges
//! per conflict without branching; the number of edges it cuts sandwiches
//! the exact distance within a factor of three and serves as the coarse
//! estimator of the rearrangement searches.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::Error;
use crate::forest::{Forest, NodeId, normalized};
use crate::mapping::NodeMapping;

/// Working state of one reduction attempt: both forests, the terminal
/// correspondence, and the queue of sibling pairs still to be checked.
/// Cloned wholesale at each branch point; node ids survive the clones.
struct Reduction {
    f1: Forest,
    f2: Forest,
    twins: NodeMapping,
    queue: BTreeSet<(NodeId, NodeId)>,
}

impl Reduction {
    fn branch(&self) -> Reduction {
        Reduction {
            f1: self.f1.clone(),
            f2: self.f2.clone(),
            twins: self.twins.clone(),
            queue: BTreeSet::new(),
        }
    }
}

fn setup(t1: &Forest, t2: &Forest) -> Result<Reduction, Error> {
    let mut f1 = t1.clone();
    let mut f2 = t2.clone();
    f1.normalize_order();
    f2.normalize_order();
    f1.reset_reduction_state();
    f2.reset_reduction_state();
    if f1.leaf_labels() != f2.leaf_labels() {
        return Err(Error::DisjointLeafSets);
    }
    let mut twins = NodeMapping::new();
    for leaf in f1.leaves().collect::<Vec<_>>() {
        let label = f1.label(leaf).ok_or(Error::UnmappedNode)?;
        let twin = f2.node_with_label(label).ok_or(Error::DisjointLeafSets)?;
        twins.add(leaf, twin);
    }
    let queue = f1.find_sibling_pairs();
    Ok(Reduction {
        f1,
        f2,
        twins,
        queue,
    })
}

/// How the two members of a sibling pair sit relative to each other within
/// one forest.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PairRelation {
    /// Joined directly by an edge; the component is reduced to its final
    /// join.
    Adjacent,
    /// Sharing an attachment node of degree 3.
    Joint(NodeId),
    /// Sharing an attachment node of degree 2, which is then the component
    /// root and the component consists of exactly this pair.
    FinalJoint(NodeId),
    /// Neither adjacent nor sharing an attachment.
    Distant,
}

fn relation(f: &Forest, a: NodeId, c: NodeId) -> PairRelation {
    if f.neighbors(a).contains(&c) {
        return PairRelation::Adjacent;
    }
    for &p in f.neighbors(a) {
        if f.neighbors(c).contains(&p) {
            return if f.degree(p) == 3 {
                PairRelation::Joint(p)
            } else {
                PairRelation::FinalJoint(p)
            };
        }
    }
    PairRelation::Distant
}

/// Merge a compatible sibling pair into its attachment node: the attachment
/// becomes the new terminal standing for the joined subtree, hung from its
/// third neighbor, and the pair members stop taking part in the reduction.
/// Purely a flag-and-orientation change; the adjacency is untouched.
fn contract_pair(f: &mut Forest, a: NodeId, c: NodeId, joint: NodeId) -> Result<(), Error> {
    let third = f.get_neighbor_not(joint, a, c)?;
    f.rotate(joint, third)?;
    f.set_terminal(a, false);
    f.set_terminal(c, false);
    f.set_terminal(joint, true);
    Ok(())
}

/// The edge separating terminal `x` from the rest of its component: the edge
/// to its parent. A parentless `x` is the component root and its children mix
/// the subtree it stands for with the rest of the component, so the component
/// is first re-rooted at another terminal to make the parent edge exist.
/// `None` when `x` is the only terminal of its component, in which case there
/// is nothing left to cut it away from.
fn edge_off(f: &mut Forest, x: NodeId) -> Option<(NodeId, NodeId)> {
    if f.parent(x).is_none() {
        match f.other_terminal_in_component(x) {
            Some(t) => f.reroot_at(t),
            None => return None,
        }
    }
    f.parent(x).map(|p| (x, p))
}

/// Order a pair of twins so the deeper one comes first. Equal depths break
/// the tie toward the larger node id; the choice only affects which witness
/// forest is found first, not the distance.
fn order_by_depth(f: &Forest, x: NodeId, y: NodeId) -> (NodeId, NodeId) {
    if (f.distance(y), y) > (f.distance(x), x) {
        (y, x)
    } else {
        (x, y)
    }
}

/// Walk the path between two nodes of one forest bottom-up from both ends
/// and collect the edges hanging off its interior, in order of discovery.
/// The walk advances whichever endpoint is currently deeper, so it needs no
/// global view of the path. On meeting at a shared ancestor the out-of-path
/// edge at the join is included as well. Returns an empty list when the two
/// nodes turn out to live in different components.
fn find_pendants(f: &Forest, deep: NodeId, shallow: NodeId) -> Result<Vec<(NodeId, NodeId)>, Error> {
    let mut pendants = Vec::new();
    let (mut a, mut c) = (deep, shallow);
    let (mut prev_a, mut prev_c) = (None::<NodeId>, None::<NodeId>);
    loop {
        if a == c {
            if let (Some(pa), Some(pc)) = (prev_a, prev_c) {
                if f.degree(a) == 3 {
                    pendants.push((a, f.get_neighbor_not(a, pa, pc)?));
                }
            }
            return Ok(pendants);
        }
        if let (Some(pa), Some(pc)) = (f.parent(a), f.parent(c)) {
            if pa == pc {
                if f.degree(pa) == 3 {
                    pendants.push((pa, f.get_neighbor_not(pa, a, c)?));
                }
                return Ok(pendants);
            }
        }
        let advance_first = (f.distance(a), a) > (f.distance(c), c);
        let (cur, prev) = if advance_first {
            (&mut a, &mut prev_a)
        } else {
            (&mut c, &mut prev_c)
        };
        let step = match f.parent(*cur) {
            Some(p) if f.distance(p) < f.distance(*cur) => p,
            _ => return Ok(Vec::new()),
        };
        let from = *cur;
        *prev = Some(from);
        *cur = step;
        if a != c {
            // An interior path node; its off-path edge is a pendant. A
            // parentless interior node is a component root whose off-path
            // edge is resolved once the other endpoint arrives.
            if let Some(pp) = f.parent(step) {
                pendants.push((step, f.get_neighbor_not(step, from, pp)?));
            }
        }
    }
}

/// Cut `x` loose in the first forest because its twin's component is fully
/// matched. Free of budget cost: the cut mirrors structure the second forest
/// already committed to.
fn mirror_cut(r: &mut Reduction, x: NodeId) -> Result<(), Error> {
    match edge_off(&mut r.f1, x) {
        Some((u, v)) => {
            // x hangs below the edge, so the cut closes x's side as a
            // finished piece.
            r.f1.cut_edge(u, v)?;
            let pairs = r.f1.find_sibling_pairs();
            r.queue.extend(pairs);
        }
        None => {
            // x is the only terminal of its component: the piece is already
            // whole, nothing to cut it away from.
            let comp = r.f1.component_of(x);
            r.f1.set_component_done(comp);
        }
    }
    debug_assert!(r.f1.component(r.f1.component_of(x)).done);
    Ok(())
}

/// Mirror cuts that no pair in the queue will trigger anymore: terminals
/// whose twin component closed after their last queue entry was consumed.
/// Returns whether anything was applied.
fn apply_pending_mirror_cuts(r: &mut Reduction) -> Result<bool, Error> {
    let mut applied = false;
    loop {
        let pending = r.f1.node_ids().find(|&x| {
            r.f1.is_active(x)
                && r
                    .twins
                    .twin(x)
                    .is_some_and(|t| r.f2.component(r.f2.component_of(t)).done)
        });
        match pending {
            Some(x) => {
                mirror_cut(r, x)?;
                applied = true;
            }
            None => break,
        }
    }
    Ok(applied)
}

fn reborrow<'a, T>(opt: &'a mut Option<&mut T>) -> Option<&'a mut T> {
    opt.as_mut().map(|m| &mut **m)
}

/// One bounded reduction attempt. Returns the cuts used and the two witness
/// forests on success, `None` when the budget `k` does not suffice on any
/// branch. When `collect` is given, every successful leaf of the search tree
/// deposits its witness (keyed by canonical form), and compatible pairs
/// additionally branch over cutting either twin loose so that alternative
/// agreement forests of the same size are reached too.
fn solve(
    mut r: Reduction,
    k: usize,
    mut collect: Option<&mut BTreeMap<String, Forest>>,
) -> Result<Option<(usize, Forest, Forest)>, Error> {
    loop {
        let (a, c) = match r.queue.pop_first() {
            Some(pair) => pair,
            None => {
                if apply_pending_mirror_cuts(&mut r)? {
                    continue;
                }
                break;
            }
        };
        if !r.f1.is_active(a) || !r.f1.is_active(c) {
            continue;
        }
        let a2 = r.twins.twin(a).ok_or(Error::UnmappedNode)?;
        let c2 = r.twins.twin(c).ok_or(Error::UnmappedNode)?;

        // A twin sits in a component the second forest has already closed:
        // mirror the split at no cost and move on.
        if r.f2.component(r.f2.component_of(a2)).done {
            mirror_cut(&mut r, a)?;
            continue;
        }
        if r.f2.component(r.f2.component_of(c2)).done {
            mirror_cut(&mut r, c)?;
            continue;
        }

        let rel1 = relation(&r.f1, a, c);
        let rel2 = relation(&r.f2, a2, c2);
        match (rel1, rel2) {
            // The pair dissolved in the first forest since it was queued.
            (PairRelation::Distant, _) => continue,

            // Both components are down to the same final join: they agree.
            (
                PairRelation::Adjacent | PairRelation::FinalJoint(_),
                PairRelation::Adjacent | PairRelation::FinalJoint(_),
            ) => {
                let comp1 = r.f1.component_of(a);
                let comp2 = r.f2.component_of(a2);
                r.f1.set_component_done(comp1);
                r.f2.set_component_done(comp2);
            }

            // The twins' component is exactly this pair's two subtrees
            // joined, but the first forest still carries the pair as a
            // cherry inside a larger component: carve the matching piece
            // out, free of cost.
            (
                PairRelation::Joint(p1),
                PairRelation::Adjacent | PairRelation::FinalJoint(_),
            ) => {
                contract_pair(&mut r.f1, a, c, p1)?;
                let comp2 = r.f2.component_of(a2);
                r.f2.set_component_done(comp2);
                mirror_cut(&mut r, p1)?;
            }

            // Compatible sibling pair: merge it on both sides.
            (PairRelation::Joint(p1), PairRelation::Joint(p2)) => {
                if collect.is_some() && k > 0 {
                    // Alternative agreement forests may cut a compatible
                    // pair apart instead of keeping it; explore both cuts.
                    for x in [a2, c2] {
                        if let Some((u, v)) = edge_off(&mut r.f2, x) {
                            let mut branch = r.branch();
                            branch.f2.cut_edge(u, v)?;
                            branch.queue = branch.f1.find_sibling_pairs();
                            solve(branch, k - 1, reborrow(&mut collect))?;
                        }
                    }
                }
                contract_pair(&mut r.f1, a, c, p1)?;
                contract_pair(&mut r.f2, a2, c2, p2)?;
                r.twins.add(p1, p2);
                let pairs = r.f1.find_sibling_pairs();
                r.queue.extend(pairs);
            }

            // Conflict: the twins disagree and an edge of the second forest
            // must be cut. Branch over every candidate and keep the best.
            (_, PairRelation::Joint(_) | PairRelation::Distant) => {
                if k == 0 {
                    return Ok(None);
                }
                let (deep, shallow) = order_by_depth(&r.f2, a2, c2);
                let mut candidates: BTreeSet<(NodeId, NodeId)> = BTreeSet::new();
                for (u, v) in find_pendants(&r.f2, deep, shallow)? {
                    candidates.insert(normalized(u, v));
                }
                for x in [deep, shallow] {
                    if let Some((u, v)) = edge_off(&mut r.f2, x) {
                        candidates.insert(normalized(u, v));
                    }
                }
                let mut best: Option<(usize, Forest, Forest)> = None;
                for (u, v) in candidates {
                    let mut branch = r.branch();
                    branch.f2.cut_edge(u, v)?;
                    branch.queue = branch.f1.find_sibling_pairs();
                    if let Some((d, w1, w2)) = solve(branch, k - 1, reborrow(&mut collect))? {
                        let total = d + 1;
                        if best.as_ref().is_none_or(|b| total < b.0) {
                            best = Some((total, w1, w2));
                        }
                    }
                }
                return Ok(best);
            }
        }
    }
    if let Some(mafs) = collect {
        mafs.entry(r.f2.canonical_form())
            .or_insert_with(|| r.f2.clone());
    }
    Ok(Some((0, r.f1, r.f2)))
}

/// Exact TBR distance between two trees (or between a forest and a tree,
/// counting the cuts the second input needs to agree with the first).
pub fn tbr_distance(t1: &Forest, t2: &Forest) -> Result<usize, Error> {
    tbr_distance_maf(t1, t2).map(|(d, _, _)| d)
}

/// Exact TBR distance together with one maximum agreement forest, as the
/// cut-up copies of both inputs. Iteratively deepens the cut budget, so the
/// first success is optimal.
pub fn tbr_distance_maf(t1: &Forest, t2: &Forest) -> Result<(usize, Forest, Forest), Error> {
    let cap = t1.leaf_labels().len().max(1);
    for k in 0..=cap {
        let r = setup(t1, t2)?;
        if let Some(found) = solve(r, k, None)? {
            return Ok(found);
        }
    }
    Err(Error::SearchExhausted)
}

/// All distinct maximum agreement forests, each given as a cut-up copy of
/// the second input, deduplicated by canonical form.
pub fn tbr_mafs(t1: &Forest, t2: &Forest) -> Result<(usize, Vec<Forest>), Error> {
    let (d, _, _) = tbr_distance_maf(t1, t2)?;
    let mut found = BTreeMap::new();
    let r = setup(t1, t2)?;
    solve(r, d, Some(&mut found))?;
    Ok((d, found.into_values().collect()))
}

/// The TBR distance and the number of distinct maximum agreement forests.
pub fn tbr_count_mafs(t1: &Forest, t2: &Forest) -> Result<(usize, usize), Error> {
    let (d, mafs) = tbr_mafs(t1, t2)?;
    Ok((d, mafs.len()))
}

/// Greedy 3-approximation of the TBR distance: run the same reduction but
/// resolve every conflict by cutting up to three candidate edges (the first
/// pendant and the edges above both twins) without branching. If `c` edges
/// get cut, the exact distance lies in `[ceil(c / 3), c]`; the lower end is
/// the admissible estimate used by the rearrangement searches.
pub fn tbr_bounds(t1: &Forest, t2: &Forest) -> Result<(usize, usize), Error> {
    let mut r = setup(t1, t2)?;
    let mut cuts = 0usize;
    loop {
        let (a, c) = match r.queue.pop_first() {
            Some(pair) => pair,
            None => {
                if apply_pending_mirror_cuts(&mut r)? {
                    continue;
                }
                break;
            }
        };
        if !r.f1.is_active(a) || !r.f1.is_active(c) {
            continue;
        }
        let a2 = r.twins.twin(a).ok_or(Error::UnmappedNode)?;
        let c2 = r.twins.twin(c).ok_or(Error::UnmappedNode)?;
        if r.f2.component(r.f2.component_of(a2)).done {
            mirror_cut(&mut r, a)?;
            continue;
        }
        if r.f2.component(r.f2.component_of(c2)).done {
            mirror_cut(&mut r, c)?;
            continue;
        }
        let rel1 = relation(&r.f1, a, c);
        let rel2 = relation(&r.f2, a2, c2);
        match (rel1, rel2) {
            (PairRelation::Distant, _) => continue,
            (
                PairRelation::Adjacent | PairRelation::FinalJoint(_),
                PairRelation::Adjacent | PairRelation::FinalJoint(_),
            ) => {
                let comp1 = r.f1.component_of(a);
                let comp2 = r.f2.component_of(a2);
                r.f1.set_component_done(comp1);
                r.f2.set_component_done(comp2);
            }
            (
                PairRelation::Joint(p1),
                PairRelation::Adjacent | PairRelation::FinalJoint(_),
            ) => {
                contract_pair(&mut r.f1, a, c, p1)?;
                let comp2 = r.f2.component_of(a2);
                r.f2.set_component_done(comp2);
                mirror_cut(&mut r, p1)?;
            }
            (PairRelation::Joint(p1), PairRelation::Joint(p2)) => {
                contract_pair(&mut r.f1, a, c, p1)?;
                contract_pair(&mut r.f2, a2, c2, p2)?;
                r.twins.add(p1, p2);
                let pairs = r.f1.find_sibling_pairs();
                r.queue.extend(pairs);
            }
            (_, PairRelation::Joint(_) | PairRelation::Distant) => {
                let (deep, shallow) = order_by_depth(&r.f2, a2, c2);
                // Cut the first pendant before the twin edges; the twin cuts
                // can splice path nodes the pendant edge touches.
                if let Some(&(u, v)) = find_pendants(&r.f2, deep, shallow)?.first() {
                    if r.f2.is_alive(u) && r.f2.neighbors(u).contains(&v) {
                        r.f2.cut_edge(u, v)?;
                        cuts += 1;
                    }
                }
                for x in [deep, shallow] {
                    if let Some((u, v)) = edge_off(&mut r.f2, x) {
                        r.f2.cut_edge(u, v)?;
                        cuts += 1;
                    }
                }
                let pairs = r.f1.find_sibling_pairs();
                r.queue.extend(pairs);
            }
        }
    }
    Ok((cuts.div_ceil(3), cuts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{LabelInterner, forest_from_newick};

    fn tree(newick: &str, interner: &mut LabelInterner) -> Forest {
        forest_from_newick(newick, interner).unwrap()
    }

    #[test]
    fn identical_trees_have_distance_zero() {
        let mut interner = LabelInterner::new();
        let a = tree("((1,2),(3,(4,5)));", &mut interner);
        let b = tree("((3,(4,5)),(2,1));", &mut interner);
        assert_eq!(tbr_distance(&a, &b).unwrap(), 0);
        assert_eq!(tbr_distance(&a, &a).unwrap(), 0);
    }

    #[test]
    fn quartet_swap_has_distance_one() {
        let mut interner = LabelInterner::new();
        let a = tree("((1,2),(3,4));", &mut interner);
        let b = tree("((1,3),(2,4));", &mut interner);
        let (d, w1, w2) = tbr_distance_maf(&a, &b).unwrap();
        assert_eq!(d, 1);
        // A maximum agreement forest has d + 1 components and the two
        // witnesses agree piece by piece.
        assert_eq!(w2.canonical_form().split(' ').count(), 2);
        assert_eq!(w1.canonical_form(), w2.canonical_form());
    }

    #[test]
    fn distance_is_symmetric() {
        let mut interner = LabelInterner::new();
        let a = tree("(((1,2),(3,4)),(5,6));", &mut interner);
        let b = tree("(((1,5),(3,6)),(2,4));", &mut interner);
        let d = tbr_distance(&a, &b).unwrap();
        assert_eq!(d, tbr_distance(&b, &a).unwrap());
        assert!(d >= 1);
    }

    // A pair whose reduction splices out a component representative
    // mid-search; re-rooting must then land on a terminal, not on a leaf
    // buried inside an already-merged subtree.
    #[test]
    fn respliced_components_keep_the_distance_symmetric() {
        let mut interner = LabelInterner::new();
        let a = tree("((5,(2,(3,7))),((4,(1,6)),8));", &mut interner);
        let b = tree("(((6,1),(7,(5,8))),((3,4),2));", &mut interner);
        let (d_ab, w1, w2) = tbr_distance_maf(&a, &b).unwrap();
        let (d_ba, v1, v2) = tbr_distance_maf(&b, &a).unwrap();
        assert_eq!(d_ab, 3);
        assert_eq!(d_ab, d_ba);
        // The two halves of each witness describe the same agreement forest.
        assert_eq!(w1.canonical_form(), w2.canonical_form());
        assert_eq!(v1.canonical_form(), v2.canonical_form());
    }

    fn pick(seed: &mut u64, n: usize) -> usize {
        *seed = seed
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        ((*seed >> 33) as usize) % n
    }

    fn random_newick(labels: &[&str], seed: &mut u64) -> String {
        let mut parts: Vec<String> = labels.iter().map(|l| l.to_string()).collect();
        while parts.len() > 1 {
            let a = parts.swap_remove(pick(seed, parts.len()));
            let b = parts.swap_remove(pick(seed, parts.len()));
            parts.push(format!("({a},{b})"));
        }
        format!("{};", parts.pop().unwrap())
    }

    #[test]
    fn scrambled_pairs_agree_on_symmetry_and_witnesses() {
        let labels = ["1", "2", "3", "4", "5", "6", "7", "8"];
        let mut interner = LabelInterner::new();
        let mut seed = 0x2545f4914f6cdd1d_u64;
        for _ in 0..6 {
            let a = tree(&random_newick(&labels, &mut seed), &mut interner);
            let b = tree(&random_newick(&labels, &mut seed), &mut interner);
            let (d, w1, w2) = tbr_distance_maf(&a, &b).unwrap();
            assert_eq!(d, tbr_distance(&b, &a).unwrap());
            assert_eq!(w1.canonical_form(), w2.canonical_form());
            let (low, high) = tbr_bounds(&a, &b).unwrap();
            assert!(low <= d && d <= high);
        }
    }

    #[test]
    fn independent_conflicts_add_up() {
        let mut interner = LabelInterner::new();
        let a = tree("(((1,2),(3,4)),((5,6),(7,8)));", &mut interner);
        let b = tree("(((1,3),(2,4)),((5,7),(6,8)));", &mut interner);
        assert_eq!(tbr_distance(&a, &b).unwrap(), 2);
    }

    #[test]
    fn approximation_sandwiches_the_distance() {
        let mut interner = LabelInterner::new();
        let pairs = [
            ("((1,2),(3,4));", "((1,3),(2,4));"),
            ("(((1,2),(3,4)),(5,6));", "(((1,5),(3,6)),(2,4));"),
            ("((1,2),(3,(4,5)));", "((3,(4,5)),(2,1));"),
        ];
        for (x, y) in pairs {
            let a = tree(x, &mut interner);
            let b = tree(y, &mut interner);
            let (low, high) = tbr_bounds(&a, &b).unwrap();
            let d = tbr_distance(&a, &b).unwrap();
            assert!(low <= d, "lower bound {low} above distance {d}");
            assert!(d <= high, "upper bound {high} below distance {d}");
        }
    }

    #[test]
    fn identical_trees_have_tight_bounds() {
        let mut interner = LabelInterner::new();
        let a = tree("((1,2),(3,(4,5)));", &mut interner);
        assert_eq!(tbr_bounds(&a, &a).unwrap(), (0, 0));
    }

    #[test]
    fn maf_enumeration_finds_at_least_one_witness() {
        let mut interner = LabelInterner::new();
        let a = tree("((1,2),(3,4));", &mut interner);
        let b = tree("((1,3),(2,4));", &mut interner);
        let (d, mafs) = tbr_mafs(&a, &b).unwrap();
        assert_eq!(d, 1);
        assert!(!mafs.is_empty());
        for maf in &mafs {
            assert_eq!(maf.canonical_form().split(' ').count(), 2);
        }
    }

    #[test]
    fn maf_witnesses_render_with_leaf_names() {
        let mut interner = LabelInterner::new();
        let a = tree("((a,b),(c,d));", &mut interner);
        let b = tree("((a,c),(b,d));", &mut interner);
        let (_, mafs) = tbr_mafs(&a, &b).unwrap();
        for maf in &mafs {
            let rendered = maf.str(Some(interner.names()));
            assert!(["a", "b", "c", "d"].iter().all(|l| rendered.contains(l)));
        }
    }

    #[test]
    fn identical_trees_have_one_agreement_forest() {
        let mut interner = LabelInterner::new();
        let a = tree("((1,2),(3,4));", &mut interner);
        let b = tree("((3,4),(2,1));", &mut interner);
        let (d, count) = tbr_count_mafs(&a, &b).unwrap();
        assert_eq!((d, count), (0, 1));
    }

    #[test]
    fn mismatched_leaf_sets_are_rejected() {
        let mut interner = LabelInterner::new();
        let a = tree("((1,2),(3,4));", &mut interner);
        let b = tree("((1,2),(3,5));", &mut interner);
        assert!(matches!(
            tbr_distance(&a, &b),
            Err(Error::DisjointLeafSets)
        ));
    }

    #[test]
    fn pendant_walk_lists_offpath_edges() {
        let mut interner = LabelInterner::new();
        let mut t = tree("((1,2),(3,4));", &mut interner);
        t.normalize_order();
        t.reset_reduction_state();
        let l3 = t.node_with_label(interner.get("3").unwrap()).unwrap();
        let l4 = t.node_with_label(interner.get("4").unwrap()).unwrap();
        let (deep, shallow) = order_by_depth(&t, l3, l4);
        let pendants = find_pendants(&t, deep, shallow).unwrap();
        // Path between two leaves of a quartet passes one interior node on
        // the way up and joins at their shared attachment.
        assert!(!pendants.is_empty());
        for (u, v) in pendants {
            assert!(t.neighbors(u).contains(&v));
        }
    }
}
