//! Newick input and matrix output.
//!
//! Trees arrive as plain Newick, one per line. Parsing goes through
//! `phylotree` and the rooted parse is then rebuilt as an unrooted arena
//! forest: leaf names are interned to dense integer labels shared across all
//! trees of a run, the artificial degree-2 root is suppressed, and the result
//! is validated as binary and connected.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use flate2::Compression;
use flate2::write::GzEncoder;
use phylotree::tree::Tree as PhyloTree;

use crate::error::Error;
use crate::forest::{Forest, Label, NodeId};

/// Dense string-to-integer interning of leaf names.
///
/// One interner is shared by every tree of a run, so equal names mean equal
/// labels and the solvers never touch strings.
#[derive(Clone, Debug, Default)]
pub struct LabelInterner {
    ids: HashMap<String, Label>,
    names: Vec<String>,
}

impl LabelInterner {
    pub fn new() -> Self {
        LabelInterner::default()
    }

    pub fn intern(&mut self, name: &str) -> Label {
        if let Some(&id) = self.ids.get(name) {
            return id;
        }
        let id = self.names.len();
        self.ids.insert(name.to_string(), id);
        self.names.push(name.to_string());
        id
    }

    pub fn get(&self, name: &str) -> Option<Label> {
        self.ids.get(name).copied()
    }

    pub fn name(&self, label: Label) -> Option<&str> {
        self.names.get(label).map(String::as_str)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Parse one Newick string into an unrooted binary [`Forest`].
///
/// Leaf names are interned through `interner`; internal node names (support
/// values and the like) are ignored. Duplicate or missing leaf names and
/// non-binary shapes are rejected.
pub fn forest_from_newick(newick: &str, interner: &mut LabelInterner) -> Result<Forest, Error> {
    let phylo = PhyloTree::from_newick(newick.trim()).map_err(|e| Error::Newick(e.to_string()))?;
    let root = phylo.get_root().map_err(|e| Error::Newick(e.to_string()))?;

    let mut forest = Forest::new();
    let mut seen: HashSet<Label> = HashSet::new();
    let mut stack: Vec<(usize, Option<NodeId>)> = vec![(root, None)];
    while let Some((id, parent)) = stack.pop() {
        let node = phylo.get(&id).map_err(|e| Error::Newick(e.to_string()))?;
        let here = if node.children.is_empty() {
            let name = node
                .name
                .as_deref()
                .filter(|n| !n.is_empty())
                .ok_or(Error::UnnamedLeaf)?;
            let label = interner.intern(name);
            if !seen.insert(label) {
                return Err(Error::DuplicateLeaf(name.to_string()));
            }
            forest.add_leaf(label)
        } else {
            forest.add_internal()
        };
        if let Some(p) = parent {
            forest.add_edge(p, here);
        }
        for &child in &node.children {
            stack.push((child, Some(here)));
        }
    }

    // The parse is rooted; splice out the artificial root and any unary
    // chain hanging off it.
    loop {
        let mut changed = false;
        for v in forest.node_ids() {
            if forest.is_alive(v)
                && forest.label(v).is_none()
                && matches!(forest.degree(v), 1 | 2)
            {
                forest.suppress_if_degree_two(v);
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    forest.finish()?;
    Ok(forest)
}

/// Read a file of Newick trees, one per line. Blank lines and lines starting
/// with `#` are skipped. All trees share one interner.
pub fn read_newick_trees<P: AsRef<Path>>(
    path: P,
) -> Result<(LabelInterner, Vec<(String, Forest)>), Error> {
    let content = fs::read_to_string(path.as_ref())?;
    let base_name = path
        .as_ref()
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("input");

    let mut interner = LabelInterner::new();
    let mut trees = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let forest = forest_from_newick(line, &mut interner)?;
        trees.push((format!("{base_name}_tree_{}", trees.len()), forest));
    }
    Ok((interner, trees))
}

/// Write a labeled square matrix as TSV.
/// A path of `-` writes to stdout; a path ending in `.gz` is gzip-compressed.
pub fn write_matrix_tsv<P: AsRef<Path>, T: std::fmt::Display>(
    path: P,
    names: &[String],
    mat: &[Vec<T>],
) -> io::Result<()> {
    let p = path.as_ref();
    let mut out: Box<dyn Write> = if p.as_os_str() == "-" {
        Box::new(BufWriter::new(io::stdout().lock()))
    } else if p.to_string_lossy().ends_with(".gz") {
        let f = File::create(p)?;
        Box::new(BufWriter::new(GzEncoder::new(f, Compression::default())))
    } else {
        Box::new(BufWriter::new(File::create(p)?))
    };

    write!(&mut out, "\t")?;
    for (k, name) in names.iter().enumerate() {
        if k > 0 {
            write!(&mut out, "\t")?;
        }
        write!(&mut out, "{}", name)?;
    }
    writeln!(&mut out)?;

    for (i, row) in mat.iter().enumerate() {
        write!(&mut out, "{}", names[i])?;
        for val in row {
            write!(&mut out, "\t{}", val)?;
        }
        writeln!(&mut out)?;
    }

    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::process;

    fn scratch_path(name: &str) -> std::path::PathBuf {
        env::temp_dir().join(format!("tree_rearrangements_{}_{}", process::id(), name))
    }

    #[test]
    fn interner_is_stable_and_dense() {
        let mut interner = LabelInterner::new();
        let a = interner.intern("alpha");
        let b = interner.intern("beta");
        assert_eq!(interner.intern("alpha"), a);
        assert_ne!(a, b);
        assert_eq!(interner.get("beta"), Some(b));
        assert_eq!(interner.get("gamma"), None);
        assert_eq!(interner.name(a), Some("alpha"));
        assert_eq!(interner.len(), 2);
    }

    #[test]
    fn rooted_newick_becomes_an_unrooted_binary_forest() {
        let mut interner = LabelInterner::new();
        let f = forest_from_newick("(((1,2),3),4);", &mut interner).unwrap();
        assert_eq!(f.leaves().count(), 4);
        for x in f.node_ids() {
            if f.is_alive(x) {
                match f.label(x) {
                    Some(_) => assert_eq!(f.degree(x), 1),
                    None => assert_eq!(f.degree(x), 3),
                }
            }
        }
    }

    #[test]
    fn leaf_order_in_the_string_does_not_matter() {
        let mut interner = LabelInterner::new();
        let f1 = forest_from_newick("((1,2),(3,4));", &mut interner).unwrap();
        let f2 = forest_from_newick("((4,3),(2,1));", &mut interner).unwrap();
        assert_eq!(f1.canonical_form(), f2.canonical_form());
    }

    #[test]
    fn duplicate_leaf_names_are_rejected() {
        let mut interner = LabelInterner::new();
        let err = forest_from_newick("((a,b),(a,c));", &mut interner).unwrap_err();
        assert!(matches!(err, Error::DuplicateLeaf(name) if name == "a"));
    }

    #[test]
    fn trees_are_read_one_per_line_with_a_shared_interner() {
        let path = scratch_path("read.nwk");
        fs::write(&path, "((1,2),(3,4));\n\n# comment\n((1,3),(2,4));\n").unwrap();
        let (interner, trees) = read_newick_trees(&path).unwrap();
        fs::remove_file(&path).unwrap();
        assert_eq!(trees.len(), 2);
        assert_eq!(interner.len(), 4);
        assert!(trees[0].0.ends_with("_tree_0"));
        assert!(trees[1].0.ends_with("_tree_1"));
        assert_ne!(trees[0].1.canonical_form(), trees[1].1.canonical_form());
    }

    #[test]
    fn matrix_rows_carry_their_names() {
        let path = scratch_path("matrix.tsv");
        let names = vec!["t0".to_string(), "t1".to_string()];
        let mat = vec![vec![0usize, 2], vec![2, 0]];
        write_matrix_tsv(&path, &names, &mat).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        fs::remove_file(&path).unwrap();
        assert!(content.starts_with("\tt0\tt1\n"));
        assert!(content.contains("t0\t0\t2\n"));
        assert!(content.contains("t1\t2\t0\n"));
    }
}
