use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use droidscope_coverage::batch::run_batch_directory;
use droidscope_coverage::{BatchConfig, CoverageRecorder, ReportWriter, SamplingMode};
use droidscope_graph::{ClassIndex, InteractionGraph};
use droidscope_trace::lines::read_log_lines;
use droidscope_trace::update::merge_lines;
use droidscope_trace::LineClassifier;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Coverage measurement for instrumented Android apps")]
struct Cli {
    /// Interaction graph exported by static analysis (JSON)
    #[arg(short, long, value_name = "FILE")]
    graph: PathBuf,

    /// Class and method symbols of the app (JSON)
    #[arg(short, long, value_name = "FILE")]
    symbols: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add vertices and edges discovered in a captured log to the graph
    Merge {
        /// Captured log file
        log: PathBuf,

        /// Where to write the updated graph; defaults to overwriting --graph
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Record coverage of a single traversal log
    Coverage {
        /// Traversal log file
        log: PathBuf,

        /// Report directory; defaults to the log's directory
        #[arg(short, long, value_name = "DIR")]
        out: Option<PathBuf>,

        /// Merge the log into the graph before scoring it
        #[arg(long)]
        merge: bool,

        /// Only record the terminal sample
        #[arg(long)]
        terminal_only: bool,
    },

    /// Process a directory of Test_<n> monkey runs
    Batch {
        /// Directory holding the Test_<n> subdirectories
        dir: PathBuf,

        /// Batch settings (JSON); flags below override it
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Number of Test_<n> directories expected
        #[arg(long)]
        expected: Option<u32>,

        /// Use existing traversal logs instead of converting logcats
        #[arg(long)]
        no_convert: bool,

        /// Write the merged graph here
        #[arg(long, value_name = "FILE")]
        save_graph: Option<PathBuf>,
    },
}

fn load_graph(path: &Path) -> Result<InteractionGraph> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read graph {}", path.display()))?;
    InteractionGraph::from_json(&json).with_context(|| format!("Invalid graph {}", path.display()))
}

fn save_graph(graph: &InteractionGraph, path: &Path) -> Result<()> {
    fs::write(path, graph.to_json()?)
        .with_context(|| format!("Failed to write graph {}", path.display()))
}

fn load_classifier(path: &Path) -> Result<LineClassifier> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read symbols {}", path.display()))?;
    let index = ClassIndex::from_json(&json)
        .with_context(|| format!("Invalid symbols {}", path.display()))?;
    tracing::info!("Loaded {} classes", index.len());
    Ok(LineClassifier::new(Arc::new(index)))
}

fn read_lines(path: &Path) -> Result<Vec<String>> {
    read_log_lines(path).with_context(|| format!("Failed to read log {}", path.display()))
}

fn merge(graph: &mut InteractionGraph, classifier: &LineClassifier, log: &Path) -> Result<()> {
    let before = graph.composition();
    let summary = merge_lines(graph, classifier, read_lines(log)?);
    let after = graph.composition();

    tracing::info!(
        "Merged {}: {} lines, {} skipped, {} edges dropped",
        log.display(),
        summary.lines,
        summary.skipped,
        summary.edges_dropped
    );
    println!(
        "vertices +{} controls {} edges +{} listeners {}",
        after.vertices - before.vertices,
        after.controls,
        after.edges - before.edges,
        after.listeners
    );
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut graph = load_graph(&cli.graph)?;
    let classifier = load_classifier(&cli.symbols)?;
    let composition = graph.composition();
    tracing::info!(
        "Graph has {} methods, {} controls and {} edges",
        composition.methods,
        composition.controls,
        composition.edges
    );

    match cli.command {
        Commands::Merge { log, output } => {
            merge(&mut graph, &classifier, &log)?;
            save_graph(&graph, output.as_deref().unwrap_or(cli.graph.as_path()))?;
        }

        Commands::Coverage {
            log,
            out,
            merge: merge_first,
            terminal_only,
        } => {
            if merge_first {
                merge(&mut graph, &classifier, &log)?;
            }

            let mode = if terminal_only {
                SamplingMode::TerminalOnly
            } else {
                SamplingMode::PerInteraction
            };
            let mut recorder = CoverageRecorder::new(mode);
            let series = recorder.record_log_file(0, &log, &mut graph, &classifier)?;

            let dir = out
                .or_else(|| log.parent().map(Path::to_path_buf))
                .unwrap_or_default();
            let written = ReportWriter::new(dir).write_run(None, series, &graph.visit_status())?;
            for path in written {
                tracing::info!("Wrote {}", path.display());
            }
            println!("Traversal Coverage Results: {}", recorder.overview()?);
        }

        Commands::Batch {
            dir,
            config,
            expected,
            no_convert,
            save_graph: graph_out,
        } => {
            let mut batch = match config {
                Some(path) => {
                    let json = fs::read_to_string(&path)
                        .with_context(|| format!("Failed to read config {}", path.display()))?;
                    serde_json::from_str::<BatchConfig>(&json)
                        .with_context(|| format!("Invalid config {}", path.display()))?
                }
                None => BatchConfig::default(),
            };
            if let Some(expected) = expected {
                batch.expected_tests = expected;
            }
            if no_convert {
                batch.convert_monkey_logs = false;
            }

            let report = run_batch_directory(&dir, &batch, &mut graph, &classifier)?;
            for (test, err) in &report.outcome.failed {
                tracing::error!("Test {test} failed: {err}");
            }
            if let Some(path) = graph_out {
                save_graph(&graph, &path)?;
            }
            match report.overview() {
                Some(overview) => println!("Coverage Results: {overview}"),
                None => anyhow::bail!("No test in {} could be recorded", dir.display()),
            }
        }
    }

    Ok(())
}
