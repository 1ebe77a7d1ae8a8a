//! kglove CLI: graph embeddings from bookmark coloring.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use miette::{IntoDiagnostic, Result};
use serde::Serialize;

use kglove::config::EmbeddingConfig;
use kglove::embedding::EmbeddingRecord;
use kglove::engine::EmbeddingEngine;
use kglove::graph::{EdgeWeighting, GraphDocument, GraphView, InputGraph};
use kglove::optimize::OptimizationReport;

#[derive(Parser)]
#[command(name = "kglove", version, about = "Graph embeddings via bookmark coloring and GloVe")]
struct Cli {
    /// TOML configuration file; missing keys take their defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Worker threads (overrides the configuration file).
    #[arg(long, global = true)]
    threads: Option<usize>,

    /// Edge weighting applied when building the graph.
    #[arg(long, global = true, value_enum, default_value = "manual")]
    weighting: WeightingArg,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Color the graph, factorize, and write the embedding as JSON.
    Embed {
        /// Path to the JSON triple document.
        #[arg(long)]
        graph: PathBuf,

        /// Output file; stdout when omitted.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Embedding dimension (overrides the configuration file).
        #[arg(long)]
        dimension: Option<usize>,

        /// Root seed (overrides the configuration file).
        #[arg(long)]
        seed: Option<u64>,

        /// Also print the nearest neighbors of this label.
        #[arg(long)]
        neighbors_of: Option<String>,

        /// Number of neighbors printed with `--neighbors-of`.
        #[arg(long, default_value = "10")]
        top_k: usize,
    },

    /// Run bookmark coloring only and print matrix statistics.
    Cooccur {
        /// Path to the JSON triple document.
        #[arg(long)]
        graph: PathBuf,

        /// Also dump every triplet as JSON.
        #[arg(long)]
        triplets: bool,
    },

    /// Print the default configuration as TOML.
    Config,
}

#[derive(Clone, Copy, ValueEnum)]
enum WeightingArg {
    Manual,
    Uniform,
    PredicateFrequency,
    InversePredicateFrequency,
    Pagerank,
}

impl WeightingArg {
    fn into_weighting(self) -> EdgeWeighting {
        match self {
            WeightingArg::Manual => EdgeWeighting::Manual,
            WeightingArg::Uniform => EdgeWeighting::Uniform,
            WeightingArg::PredicateFrequency => EdgeWeighting::PredicateFrequency,
            WeightingArg::InversePredicateFrequency => EdgeWeighting::InversePredicateFrequency,
            WeightingArg::Pagerank => EdgeWeighting::PageRank {
                damping: 0.85,
                iterations: 50,
            },
        }
    }
}

#[derive(Serialize)]
struct EmbeddingOutput<'a> {
    dimension: usize,
    report: &'a OptimizationReport,
    entities: Vec<EmbeddingRecord<'a>>,
}

#[derive(Serialize)]
struct LabeledTriplet<'a> {
    focus: &'a str,
    context: &'a str,
    value: f64,
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path).into_diagnostic()?;
            EmbeddingConfig::from_toml_str(&text)?
        }
        None => EmbeddingConfig::default(),
    };
    if let Some(threads) = cli.threads {
        config.threads = threads;
    }
    let weighting = cli.weighting.into_weighting();

    match cli.command {
        Commands::Embed {
            graph,
            output,
            dimension,
            seed,
            neighbors_of,
            top_k,
        } => {
            if let Some(dimension) = dimension {
                config.dimension = dimension;
            }
            if let Some(seed) = seed {
                config.seed = seed;
            }
            let graph = load_graph(&graph, &weighting)?;
            let engine = EmbeddingEngine::new(config)?;
            eprintln!("{}", engine.info());

            let run = engine.run(&graph)?;
            if run.coloring.failed_jobs > 0 || run.optimization.failed_blocks > 0 {
                eprintln!(
                    "warning: {} coloring jobs and {} optimizer blocks failed",
                    run.coloring.failed_jobs, run.optimization.failed_blocks
                );
            }

            let document = EmbeddingOutput {
                dimension: run.embedding.dimension(),
                report: &run.optimization,
                entities: run.embedding.records(),
            };
            let json = serde_json::to_string_pretty(&document).into_diagnostic()?;
            match output {
                Some(path) => {
                    std::fs::write(&path, json).into_diagnostic()?;
                    eprintln!(
                        "Wrote {} vectors to {} ({} epochs, converged: {})",
                        run.embedding.size(),
                        path.display(),
                        run.optimization.epochs,
                        run.optimization.converged
                    );
                }
                None => println!("{json}"),
            }

            if let Some(label) = neighbors_of {
                match run.embedding.most_similar(&label, top_k) {
                    Some(near) => {
                        eprintln!("Nearest to \"{label}\" (top {top_k}):");
                        for (rank, n) in near.iter().enumerate() {
                            eprintln!("  {:>3}. {:<40} {:.4}", rank + 1, n.key, n.score);
                        }
                    }
                    None => miette::bail!("\"{label}\" is not a focus vertex"),
                }
            }
        }

        Commands::Cooccur { graph, triplets } => {
            let graph = load_graph(&graph, &weighting)?;
            let engine = EmbeddingEngine::new(config)?;
            let (matrix, report) = engine.color(&graph)?;

            println!("Co-occurrence matrix:");
            println!("  focus vectors:   {}", matrix.focus_count());
            println!("  context vectors: {}", matrix.context_count());
            println!("  non-zero:        {}", matrix.non_zero_count());
            println!("  max value:       {}", matrix.max());
            println!("  failed jobs:     {}", report.failed_jobs);
            println!("  memo hits:       {}", report.memo_hits);
            if triplets {
                let focus = graph.focus_vertices();
                let labeled: Vec<LabeledTriplet<'_>> = matrix
                    .iter()
                    .map(|t| LabeledTriplet {
                        focus: graph.label(focus[t.row as usize]),
                        context: context_label(&graph, t.col),
                        value: t.value,
                    })
                    .collect();
                let json = serde_json::to_string_pretty(&labeled).into_diagnostic()?;
                println!("{json}");
            }
        }

        Commands::Config => {
            print!("{}", config.to_toml_string()?);
        }
    }

    Ok(())
}

/// Columns past the vertices are relation contexts.
fn context_label(graph: &InputGraph, col: u32) -> &str {
    let vertices = graph.vertex_count() as u32;
    if col < vertices {
        graph.label(col)
    } else {
        graph.relation_label(col - vertices)
    }
}

fn load_graph(path: &Path, weighting: &EdgeWeighting) -> Result<InputGraph> {
    let text = std::fs::read_to_string(path).into_diagnostic()?;
    let document = GraphDocument::from_json_str(&text).into_diagnostic()?;
    let graph = document.build(weighting)?;
    tracing::info!(
        path = %path.display(),
        vertices = graph.vertex_count(),
        edges = graph.edge_count(),
        focus = graph.focus_vertices().len(),
        "loaded graph"
    );
    Ok(graph)
}
