//! Best-first search for the uSPR and replug distances.
//!
//! States are canonical forms (carried together with their forest, so they
//! are never re-parsed) ordered by `cost + estimate`. Estimates escalate
//! lazily through tiers: a freshly enqueued state carries a unit estimate
//! (the BFS tier); when it reaches the front of the queue it is re-estimated
//! one tier tighter and re-enqueued, and only a state whose estimate is
//! already at the final tier is expanded through the neighborhood
//! enumerator. Ties in `cost + estimate` prefer the more precise tier, so
//! expansion happens only once the cheapest candidate has been vetted by the
//! strongest enabled estimator. Every estimator is a lower bound on the true
//! remaining distance, so the first time the target is generated its cost is
//! optimal.
//!
//! The replug distance runs the same engine over forest states with the
//! extended move set from [`crate::neighbors::replug_neighbors`] and with
//! exact TBR as its strongest estimator tier.
//!
//! Before searching, both trees are normalized and common cherries are
//! collapsed to a fixed point; a pair that becomes canonically equal is done
//! at distance zero without touching the frontier.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet};

use crate::error::Error;
use crate::forest::Forest;
use crate::neighbors::{replug_neighbors, spr_neighbors};
use crate::tbr::{tbr_bounds, tbr_distance};

/// Which estimator tiers the searches may use. All default to on; disabling
/// a tier trades tighter pruning for cheaper per-state work.
#[derive(Clone, Copy, Debug)]
pub struct SearchConfig {
    pub use_bound_estimate: bool,
    pub use_tbr_estimate: bool,
    pub use_replug_estimate: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            use_bound_estimate: true,
            use_tbr_estimate: true,
            use_replug_estimate: true,
        }
    }
}

/// Estimator tiers, most precise first; the derived order makes the tighter
/// tier win ties in the frontier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Estimator {
    Replug,
    Tbr,
    Bound,
    Bfs,
}

impl Estimator {
    fn enabled(self, cfg: SearchConfig) -> bool {
        match self {
            Estimator::Replug => cfg.use_replug_estimate,
            Estimator::Tbr => cfg.use_tbr_estimate,
            Estimator::Bound => cfg.use_bound_estimate,
            Estimator::Bfs => true,
        }
    }
}

struct FrontierEntry {
    sum: usize,
    estimator: Estimator,
    cost: usize,
    key: String,
    state: Forest,
}

impl FrontierEntry {
    fn order_key(&self) -> (usize, Estimator, usize, &str) {
        (self.sum, self.estimator, self.cost, &self.key)
    }
}

impl PartialEq for FrontierEntry {
    fn eq(&self, other: &Self) -> bool {
        self.order_key() == other.order_key()
    }
}

impl Eq for FrontierEntry {}

impl PartialOrd for FrontierEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FrontierEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.order_key().cmp(&other.order_key())
    }
}

#[derive(Clone, Copy)]
enum MoveSet {
    Spr,
    Replug,
}

/// The coarsest enabled tier strictly tighter than `current`, never tighter
/// than the search's final tier.
fn next_tier(current: Estimator, cfg: SearchConfig, final_tier: Estimator) -> Estimator {
    for tier in [Estimator::Bound, Estimator::Tbr, Estimator::Replug] {
        if tier < current && tier >= final_tier && tier.enabled(cfg) {
            return tier;
        }
    }
    final_tier
}

fn estimate(
    tier: Estimator,
    state: &Forest,
    target: &Forest,
    cfg: SearchConfig,
) -> Result<usize, Error> {
    Ok(match tier {
        Estimator::Bound => tbr_bounds(state, target)?.0,
        Estimator::Tbr => tbr_distance(state, target)?,
        Estimator::Replug => replug_distance_config(state, target, cfg)?,
        Estimator::Bfs => 1,
    })
}

fn best_first(
    start: &Forest,
    target: &Forest,
    cfg: SearchConfig,
    moves: MoveSet,
    final_tier: Estimator,
) -> Result<usize, Error> {
    let mut t1 = start.clone();
    let mut t2 = target.clone();
    t1.normalize_order();
    t2.normalize_order();
    leaf_reduction(&mut t1, &mut t2)?;
    let target_key = t2.canonical_form();
    let start_key = t1.canonical_form();
    if start_key == target_key {
        return Ok(0);
    }

    let mut visited: HashSet<String> = HashSet::from([start_key.clone()]);
    let mut frontier = BinaryHeap::new();
    frontier.push(Reverse(FrontierEntry {
        sum: 1,
        estimator: Estimator::Bfs,
        cost: 0,
        key: start_key,
        state: t1,
    }));

    while let Some(Reverse(entry)) = frontier.pop() {
        if entry.estimator != final_tier {
            let tier = next_tier(entry.estimator, cfg, final_tier);
            let est = estimate(tier, &entry.state, &t2, cfg)?;
            frontier.push(Reverse(FrontierEntry {
                sum: entry.cost + est,
                estimator: tier,
                cost: entry.cost,
                key: entry.key,
                state: entry.state,
            }));
            continue;
        }
        let mut state = entry.state;
        let neighbors = match moves {
            MoveSet::Spr => spr_neighbors(&mut state, &visited)?,
            MoveSet::Replug => replug_neighbors(&mut state, &visited)?,
        };
        for (key, next) in neighbors {
            if key == target_key {
                return Ok(entry.cost + 1);
            }
            visited.insert(key.clone());
            frontier.push(Reverse(FrontierEntry {
                sum: entry.cost + 2,
                estimator: Estimator::Bfs,
                cost: entry.cost + 1,
                key,
                state: next,
            }));
        }
    }
    Err(Error::SearchExhausted)
}

/// Exact uSPR distance between two unrooted binary trees.
pub fn uspr_distance(t1: &Forest, t2: &Forest) -> Result<usize, Error> {
    uspr_distance_config(t1, t2, SearchConfig::default())
}

pub fn uspr_distance_config(
    t1: &Forest,
    t2: &Forest,
    cfg: SearchConfig,
) -> Result<usize, Error> {
    let final_tier = if cfg.use_replug_estimate {
        Estimator::Replug
    } else if cfg.use_tbr_estimate {
        Estimator::Tbr
    } else if cfg.use_bound_estimate {
        Estimator::Bound
    } else {
        Estimator::Bfs
    };
    best_first(t1, t2, cfg, MoveSet::Spr, final_tier)
}

/// Exact replug distance: the relaxation of uSPR whose intermediate states
/// may be forests (an edge may be unplugged in one move and the stranded
/// component plugged back anywhere in a later one). Sits between the TBR
/// and uSPR distances and serves as the tightest uSPR estimator.
pub fn replug_distance(t1: &Forest, t2: &Forest) -> Result<usize, Error> {
    replug_distance_config(t1, t2, SearchConfig::default())
}

pub fn replug_distance_config(
    t1: &Forest,
    t2: &Forest,
    cfg: SearchConfig,
) -> Result<usize, Error> {
    let final_tier = if cfg.use_tbr_estimate {
        Estimator::Tbr
    } else if cfg.use_bound_estimate {
        Estimator::Bound
    } else {
        Estimator::Bfs
    };
    best_first(t1, t2, cfg, MoveSet::Replug, final_tier)
}

/// Collapse cherries common to both trees until none remain: when the same
/// two labels form a cherry in each tree, the larger label is deleted from
/// both. The rearrangement distances are invariant under this reduction and
/// the search space shrinks sharply.
pub fn leaf_reduction(f1: &mut Forest, f2: &mut Forest) -> Result<(), Error> {
    loop {
        let mut collapsed = false;
        'scan: for x in f1.node_ids() {
            if !f1.is_alive(x) || f1.label(x).is_none() {
                continue;
            }
            let Some(&p) = f1.neighbors(x).first() else {
                continue;
            };
            for &sib in f1.neighbors(p) {
                if sib == x || !f1.is_alive(sib) || f1.label(sib).is_none() {
                    continue;
                }
                let (lx, ls) = match (f1.label(x), f1.label(sib)) {
                    (Some(a), Some(b)) => (a, b),
                    _ => continue,
                };
                let (Some(x2), Some(s2)) = (f2.node_with_label(lx), f2.node_with_label(ls))
                else {
                    continue;
                };
                let shared = match (f2.neighbors(x2).first(), f2.neighbors(s2).first()) {
                    (Some(&a), Some(&b)) => a == b && f2.label(a).is_none(),
                    _ => false,
                };
                if !shared {
                    continue;
                }
                let drop_label = lx.max(ls);
                let drop1 = if lx > ls { x } else { sib };
                let drop2 = f2.node_with_label(drop_label).ok_or(Error::UnmappedNode)?;
                f1.remove_leaf(drop1)?;
                f2.remove_leaf(drop2)?;
                collapsed = true;
                break 'scan;
            }
        }
        if !collapsed {
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{LabelInterner, forest_from_newick};

    fn tree(newick: &str, interner: &mut LabelInterner) -> Forest {
        forest_from_newick(newick, interner).unwrap()
    }

    #[test]
    fn identical_trees_are_at_distance_zero() {
        let mut interner = LabelInterner::new();
        let a = tree("((1,2),(3,(4,5)));", &mut interner);
        let b = tree("((3,(4,5)),(2,1));", &mut interner);
        assert_eq!(uspr_distance(&a, &b).unwrap(), 0);
        assert_eq!(replug_distance(&a, &b).unwrap(), 0);
    }

    #[test]
    fn quartet_swap_is_one_move_for_every_metric() {
        let mut interner = LabelInterner::new();
        let a = tree("((1,2),(3,4));", &mut interner);
        let b = tree("((1,3),(2,4));", &mut interner);
        assert_eq!(uspr_distance(&a, &b).unwrap(), 1);
        assert_eq!(replug_distance(&a, &b).unwrap(), 1);
    }

    #[test]
    fn estimator_configuration_does_not_change_the_answer() {
        let mut interner = LabelInterner::new();
        let a = tree("(((1,2),(3,4)),(5,6));", &mut interner);
        let b = tree("(((1,5),3),((2,6),4));", &mut interner);
        let reference = uspr_distance(&a, &b).unwrap();
        let configs = [
            SearchConfig {
                use_replug_estimate: false,
                ..SearchConfig::default()
            },
            SearchConfig {
                use_replug_estimate: false,
                use_tbr_estimate: false,
                ..SearchConfig::default()
            },
            SearchConfig {
                use_bound_estimate: false,
                use_tbr_estimate: false,
                use_replug_estimate: false,
            },
        ];
        for cfg in configs {
            assert_eq!(uspr_distance_config(&a, &b, cfg).unwrap(), reference);
        }
    }

    #[test]
    fn independent_swaps_cost_two_moves() {
        let mut interner = LabelInterner::new();
        let a = tree("(((1,2),(3,4)),((5,6),(7,8)));", &mut interner);
        let b = tree("(((1,3),(2,4)),((5,7),(6,8)));", &mut interner);
        assert_eq!(uspr_distance(&a, &b).unwrap(), 2);
    }

    #[test]
    fn metric_sandwich_holds() {
        let mut interner = LabelInterner::new();
        let a = tree("(((1,2),(3,4)),(5,6));", &mut interner);
        let b = tree("(((1,5),(3,6)),(2,4));", &mut interner);
        let tbr = crate::tbr::tbr_distance(&a, &b).unwrap();
        let replug = replug_distance(&a, &b).unwrap();
        let uspr = uspr_distance(&a, &b).unwrap();
        assert!(tbr <= replug, "tbr {tbr} > replug {replug}");
        assert!(replug <= uspr, "replug {replug} > uspr {uspr}");
    }

    #[test]
    fn common_cherries_are_collapsed_identically() {
        let mut interner = LabelInterner::new();
        let mut a = tree("(((1,2),(3,4)),(5,6));", &mut interner);
        let mut b = tree("(((1,3),(2,4)),(5,6));", &mut interner);
        leaf_reduction(&mut a, &mut b).unwrap();
        assert_eq!(a.leaf_labels(), b.leaf_labels());
        assert!(a.leaf_labels().len() < 6);
    }

    #[test]
    fn leaf_reduction_preserves_the_distance() {
        let mut interner = LabelInterner::new();
        let a = tree("(((1,2),(3,4)),(5,6));", &mut interner);
        let b = tree("(((1,3),(2,4)),(5,6));", &mut interner);
        let full = uspr_distance(&a, &b).unwrap();
        // The reduction drops the shared cherry's larger leaf (6) and
        // nothing else, so the reduced pair must give the same distance.
        let a_small = tree("(((1,2),(3,4)),5);", &mut interner);
        let b_small = tree("(((1,3),(2,4)),5);", &mut interner);
        assert_eq!(full, uspr_distance(&a_small, &b_small).unwrap());
    }
}
