//! Crate root: lightweight module orchestration and public re-exports.
//!
//! Modules:
//! - `forest`: arena-backed unrooted binary trees and forests.
//! - `mapping`: node correspondence between the two forests of a reduction.
//! - `tbr`: exact TBR distance, agreement forests, and the greedy bounds.
//! - `neighbors`: SPR and replug neighborhood enumeration.
//! - `search`: best-first search for the uSPR and replug distances.
//! - `io`: Newick input, label interning, TSV matrix output.
//! - `api`: Python bindings via `pyo3` (gated behind "python" feature).
//!
//! Public API kept stable by re-exporting key items from the modules.

pub mod error;
pub mod forest;
pub mod io;
pub mod mapping;
pub mod neighbors;
pub mod search;
pub mod tbr;

#[cfg(feature = "python")]
pub mod api;

// Re-export frequently used types & functions
pub use error::Error;
pub use forest::{Forest, NodeId};
pub use io::{LabelInterner, forest_from_newick, read_newick_trees, write_matrix_tsv};
pub use search::{
    SearchConfig, leaf_reduction, replug_distance, replug_distance_config, uspr_distance,
    uspr_distance_config,
};
pub use tbr::{tbr_bounds, tbr_count_mafs, tbr_distance, tbr_distance_maf, tbr_mafs};
