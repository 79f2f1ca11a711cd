use clap::{Parser, ValueEnum};
use rayon::prelude::*;
use std::path::PathBuf;
use std::time::Instant;

use tree_rearrangements::error::Error;
use tree_rearrangements::forest::Forest;
use tree_rearrangements::io::{read_newick_trees, write_matrix_tsv};
use tree_rearrangements::search::{SearchConfig, replug_distance_config, uspr_distance_config};
use tree_rearrangements::tbr::{tbr_bounds, tbr_distance, tbr_mafs};

/// Compute pairwise rearrangement distances between unrooted binary trees
/// read from a Newick file (one tree per line) and write a labeled distance
/// matrix (TSV) where row/column names are tree names.
#[derive(Parser, Debug)]
#[command(
    name = "tree-rearrangements",
    version,
    about = "Pairwise TBR / replug / uSPR distance matrix for unrooted binary trees"
)]
struct Args {
    /// Path to a file of Newick trees, one per line
    #[arg(short = 'i', long = "input")]
    input: PathBuf,

    /// Output path for the TSV matrix ("-" for stdout, ".gz" to compress)
    #[arg(short = 'o', long = "output")]
    output: PathBuf,

    /// Distance metric to compute: tbr | replug | uspr | tbr-approx
    #[arg(long = "metric", value_enum, default_value_t = MetricArg::Tbr)]
    metric: MetricArg,

    /// With --metric tbr, report the number of maximum agreement forests
    /// instead of the distance
    #[arg(long = "count-mafs", default_value_t = false)]
    count_mafs: bool,

    /// With --metric tbr, print every maximum agreement forest per pair
    /// on stdout before the matrix is written
    #[arg(long = "print-mafs", default_value_t = false)]
    print_mafs: bool,

    /// Disable the greedy lower-bound estimator tier
    #[arg(long = "no-bound-estimate", default_value_t = false)]
    no_bound_estimate: bool,

    /// Disable the exact-TBR estimator tier
    #[arg(long = "no-tbr-estimate", default_value_t = false)]
    no_tbr_estimate: bool,

    /// Disable the replug estimator tier (uspr only)
    #[arg(long = "no-replug-estimate", default_value_t = false)]
    no_replug_estimate: bool,

    /// Quiet mode: suppresses progress messages on stdout
    #[arg(short = 'q', long = "quiet", default_value_t = false)]
    quiet: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, ValueEnum)]
enum MetricArg {
    Tbr,
    Replug,
    Uspr,
    TbrApprox,
}

fn cell(
    metric: MetricArg,
    count_mafs: bool,
    print_mafs: bool,
    cfg: SearchConfig,
    labels: &[String],
    a: &Forest,
    b: &Forest,
) -> Result<(String, Vec<String>), Error> {
    Ok(match metric {
        MetricArg::Tbr if count_mafs || print_mafs => {
            let (d, mafs) = tbr_mafs(a, b)?;
            let value = if count_mafs {
                mafs.len().to_string()
            } else {
                d.to_string()
            };
            let rendered = if print_mafs {
                mafs.iter().map(|m| m.str(Some(labels))).collect()
            } else {
                Vec::new()
            };
            (value, rendered)
        }
        MetricArg::Tbr => (tbr_distance(a, b)?.to_string(), Vec::new()),
        MetricArg::Replug => (replug_distance_config(a, b, cfg)?.to_string(), Vec::new()),
        MetricArg::Uspr => (uspr_distance_config(a, b, cfg)?.to_string(), Vec::new()),
        MetricArg::TbrApprox => {
            let (low, high) = tbr_bounds(a, b)?;
            (format!("{low}..{high}"), Vec::new())
        }
    })
}

fn main() {
    let args = Args::parse();

    if args.count_mafs && args.metric != MetricArg::Tbr {
        eprintln!("--count-mafs is only meaningful with --metric tbr");
        std::process::exit(2);
    }
    if args.print_mafs && args.metric != MetricArg::Tbr {
        eprintln!("--print-mafs is only meaningful with --metric tbr");
        std::process::exit(2);
    }

    let t0 = Instant::now();
    let (interner, named_trees) = match read_newick_trees(&args.input) {
        Ok(parsed) => parsed,
        Err(e) => {
            eprintln!("Failed to read {:?}: {e}", args.input);
            std::process::exit(2);
        }
    };
    if named_trees.len() < 2 {
        eprintln!(
            "Need at least 2 trees to compute pairwise distances, found {} in {:?}.",
            named_trees.len(),
            args.input
        );
        std::process::exit(2);
    }
    let read_s = t0.elapsed().as_secs_f64();
    log_if(!args.quiet, format!("Reading newick trees {read_s:.3}s"));
    log_if(
        !args.quiet,
        format!(
            "Read in {} taxa for {} trees",
            interner.len(),
            named_trees.len()
        ),
    );
    let (names, trees): (Vec<String>, Vec<_>) = named_trees.into_iter().unzip();

    let cfg = SearchConfig {
        use_bound_estimate: !args.no_bound_estimate,
        use_tbr_estimate: !args.no_tbr_estimate,
        use_replug_estimate: !args.no_replug_estimate,
    };
    let metric_label = match args.metric {
        MetricArg::Tbr if args.count_mafs => "MAF count",
        MetricArg::Tbr => "TBR",
        MetricArg::Replug => "replug",
        MetricArg::Uspr => "uSPR",
        MetricArg::TbrApprox => "TBR bounds",
    };

    let t1 = Instant::now();
    let n = names.len();
    log_if(
        !args.quiet,
        format!(
            "Determining distances using {metric_label} for {} combinations",
            n * (n - 1) / 2
        ),
    );

    let labels = interner.names();
    let pairs: Vec<Result<(usize, usize, String, Vec<String>), Error>> = (0..n)
        .into_par_iter()
        .flat_map_iter(|i| (i + 1..n).map(move |j| (i, j)))
        .map(|(i, j)| {
            cell(
                args.metric,
                args.count_mafs,
                args.print_mafs,
                cfg,
                labels,
                &trees[i],
                &trees[j],
            )
            .map(|(d, mafs)| (i, j, d, mafs))
        })
        .collect();

    let diagonal = match args.metric {
        MetricArg::Tbr if args.count_mafs => "1",
        MetricArg::TbrApprox => "0..0",
        _ => "0",
    };
    let mut mat = vec![vec![diagonal.to_string(); n]; n];
    for pair in pairs {
        match pair {
            Ok((i, j, d, mafs)) => {
                for maf in &mafs {
                    println!("MAF {} vs {}: {maf}", names[i], names[j]);
                }
                mat[i][j] = d.clone();
                mat[j][i] = d;
            }
            Err(e) => {
                eprintln!("Failed to compute {metric_label} distances: {e}");
                std::process::exit(3);
            }
        }
    }
    let comp_s = t1.elapsed().as_secs_f64();
    log_if(
        !args.quiet,
        format!("Determining distances using {metric_label} {comp_s:.3}s"),
    );

    let t2 = Instant::now();
    if let Err(e) = write_matrix_tsv(&args.output, &names, &mat) {
        eprintln!("Failed to write output {:?}: {e}", args.output);
        std::process::exit(4);
    }
    let write_s = t2.elapsed().as_secs_f64();
    log_write_done(!args.quiet, &args.output, write_s);
}

fn log_if(show: bool, msg: String) {
    if show {
        println!("{}", msg);
    }
}

fn log_write_done(show: bool, output: &PathBuf, secs: f64) {
    if !show {
        return;
    }
    if output.as_os_str() == "-" {
        println!("Writing to stdout {secs:.3}s");
    } else {
        println!("Writing to output {secs:.3}s");
    }
}
