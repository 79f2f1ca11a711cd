//! Python binding layer for rearrangement distance calculations.
//!
//! Provides Python functions for computing pairwise TBR, replug, and uSPR
//! distances from Newick tree files.

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use rayon::prelude::*;
use std::fs;

use crate::error::Error;
use crate::forest::Forest;
use crate::io::{LabelInterner, forest_from_newick};
use crate::search::{replug_distance, uspr_distance};
use crate::tbr::tbr_distance;

/// Compute pairwise TBR distances from multiple Newick tree files.
///
/// Args:
///     paths: List of file paths to Newick tree files (one tree per line)
///
/// Returns:
///     A tuple of (tree_names, distance_matrix) where:
///     - tree_names is a list of tree identifiers
///     - distance_matrix is a 2D list of TBR distances
///
/// Raises:
///     ValueError: If no trees are found, trees have different leaf sets,
///     or a tree fails to parse
#[pyfunction]
fn pairwise_tbr(paths: Vec<String>) -> PyResult<(Vec<String>, Vec<Vec<usize>>)> {
    let (names, trees) = read_all_trees(&paths)?;
    sanity_check_trees(&trees)?;
    pairwise_matrix(names, &trees, tbr_distance)
}

/// Compute pairwise replug distances from multiple Newick tree files.
///
/// The replug distance relaxes uSPR by letting intermediate states be
/// forests; it sits between the TBR and uSPR distances.
///
/// Args, Returns, Raises: as for `pairwise_tbr`.
#[pyfunction]
fn pairwise_replug(paths: Vec<String>) -> PyResult<(Vec<String>, Vec<Vec<usize>>)> {
    let (names, trees) = read_all_trees(&paths)?;
    sanity_check_trees(&trees)?;
    pairwise_matrix(names, &trees, replug_distance)
}

/// Compute pairwise uSPR distances from multiple Newick tree files.
///
/// Args, Returns, Raises: as for `pairwise_tbr`.
#[pyfunction]
fn pairwise_uspr(paths: Vec<String>) -> PyResult<(Vec<String>, Vec<Vec<usize>>)> {
    let (names, trees) = read_all_trees(&paths)?;
    sanity_check_trees(&trees)?;
    pairwise_matrix(names, &trees, uspr_distance)
}

fn pairwise_matrix(
    names: Vec<String>,
    trees: &[Forest],
    dist: fn(&Forest, &Forest) -> Result<usize, Error>,
) -> PyResult<(Vec<String>, Vec<Vec<usize>>)> {
    let n = trees.len();
    let pairs: Vec<Result<(usize, usize, usize), Error>> = (0..n)
        .into_par_iter()
        .flat_map_iter(|i| (i + 1..n).map(move |j| (i, j)))
        .map(|(i, j)| dist(&trees[i], &trees[j]).map(|d| (i, j, d)))
        .collect();

    let mut matrix = vec![vec![0usize; n]; n];
    for pair in pairs {
        let (i, j, d) =
            pair.map_err(|e| PyValueError::new_err(format!("Failed to compute distance: {e}")))?;
        matrix[i][j] = d;
        matrix[j][i] = d;
    }
    Ok((names, matrix))
}

/// Helper function to read trees from multiple files. One interner is shared
/// across all files so equal leaf names get equal labels everywhere.
fn read_all_trees(paths: &[String]) -> PyResult<(Vec<String>, Vec<Forest>)> {
    let mut interner = LabelInterner::new();
    let mut all_tree_names = Vec::new();
    let mut all_trees = Vec::new();

    for (file_idx, path) in paths.iter().enumerate() {
        let content = fs::read_to_string(path)
            .map_err(|e| PyValueError::new_err(format!("Failed to read '{}': {}", path, e)))?;
        let before = all_trees.len();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let forest = forest_from_newick(line, &mut interner).map_err(|e| {
                PyValueError::new_err(format!("Failed to parse tree in '{}': {}", path, e))
            })?;
            all_tree_names.push(format!("file{}_tree_{}", file_idx, all_trees.len() - before));
            all_trees.push(forest);
        }
        if all_trees.len() == before {
            return Err(PyValueError::new_err(format!(
                "No trees found in file '{}'",
                path
            )));
        }
    }

    if all_trees.is_empty() {
        return Err(PyValueError::new_err(
            "No trees found in any of the provided files",
        ));
    }

    Ok((all_tree_names, all_trees))
}

/// Perform sanity checks on trees
fn sanity_check_trees(trees: &[Forest]) -> PyResult<()> {
    if trees.len() < 2 {
        return Err(PyValueError::new_err(
            "Need at least 2 trees to compute pairwise distances",
        ));
    }

    let first_labels = trees[0].leaf_labels();
    for (idx, tree) in trees.iter().enumerate().skip(1) {
        let labels = tree.leaf_labels();
        if labels.len() != first_labels.len() {
            return Err(PyValueError::new_err(format!(
                "Tree {} has {} leaves, but tree 0 has {} leaves. All trees must have the same number of leaves.",
                idx,
                labels.len(),
                first_labels.len()
            )));
        }
        if labels != first_labels {
            return Err(PyValueError::new_err(format!(
                "Tree {} has different leaf set than tree 0. All trees must have the same taxa.",
                idx
            )));
        }
    }

    Ok(())
}

/// Python module definition
#[pymodule]
fn tree_rearrangements(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(pairwise_tbr, m)?)?;
    m.add_function(wrap_pyfunction!(pairwise_replug, m)?)?;
    m.add_function(wrap_pyfunction!(pairwise_uspr, m)?)?;
    Ok(())
}
