//! Error taxonomy for tree construction and distance computation.
//!
//! Malformed input (duplicate leaves, non-binary nodes, disconnected trees)
//! fails fast and is never silently repaired. Structural lookups that cannot
//! fail in a correct reduction (`NoThirdNeighbor`, `UnmappedNode`) are still
//! surfaced as errors so a driver can abort cleanly instead of corrupting a
//! forest mid-search. Budget exhaustion inside a single branch-and-bound
//! attempt is *not* an error; it drives iterative deepening and is represented
//! as `Option::None` internally.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Two leaves in one input tree carry the same name.
    #[error("duplicate leaf label: {0}")]
    DuplicateLeaf(String),

    /// A leaf node has no name; labels are required to match trees.
    #[error("tree contains an unnamed leaf")]
    UnnamedLeaf,

    /// An internal node has a degree other than 3 after suppressing the
    /// artificial root of a rooted newick string.
    #[error("tree is not unrooted binary: internal node of degree {degree}")]
    NotBinary { degree: usize },

    /// The input contained no nodes at all.
    #[error("empty tree")]
    EmptyTree,

    /// A single input tree was not connected.
    #[error("input tree is disconnected")]
    Disconnected,

    /// The two trees being compared do not share the same leaf label set.
    #[error("trees have different leaf sets")]
    DisjointLeafSets,

    /// `get_neighbor_not` was asked for the third neighbor of a node whose
    /// degree does not admit a unique one. Indicates a defect in the caller's
    /// reduction logic.
    #[error("node has no unique third neighbor")]
    NoThirdNeighbor,

    /// `cut_edge` or `rotate` was given two nodes that are not adjacent.
    #[error("nodes are not adjacent")]
    NotAdjacent,

    /// A node-correspondence lookup missed a node that must be mapped.
    #[error("node has no twin in the correspondence map")]
    UnmappedNode,

    /// The best-first search emptied its frontier without reaching the
    /// target. Cannot happen for two finite trees over the same leaf set
    /// unless the estimator configuration (or the implementation) is broken.
    #[error("search frontier exhausted without reaching the target tree")]
    SearchExhausted,

    /// The underlying newick parser rejected the input.
    #[error("newick parse error: {0}")]
    Newick(String),

    #[error("i/o error")]
    Io(#[from] std::io::Error),
}
