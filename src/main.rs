use std::path::{Path, PathBuf};
use anyhow::Result;
use clap::{Parser, Subcommand};
use cada_anomaly::anomaly::Cada;
use cada_anomaly::community::Algorithm;
use cada_anomaly::config::{Config, DetectionConfig, EvaluationConfig};
use cada_anomaly::graph::GraphStatistics;
use cada_anomaly::storage::Selection;
use cada_anomaly::{data, evaluation, storage, viz};

#[derive(Parser, Debug)]
#[clap(
    name = "cada-anomaly",
    about = "Community-aware anomaly detection on attributed graphs"
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,

    /// Number of worker threads (0 = use all available cores)
    #[clap(long, default_value = "0", global = true)]
    threads: usize,

    /// Verbose logging
    #[clap(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Detect communities and score every node of a dataset
    Score {
        /// Dataset directory containing network.parquet
        #[clap(long)]
        input: PathBuf,

        /// Community detection algorithm (louvain, infomap, label_propagation, leiden)
        #[clap(long, default_value = "louvain")]
        algorithm: String,

        /// Resolution for louvain and leiden
        #[clap(long, default_value = "0.1")]
        resolution: f64,

        /// Edge attribute to use as weight
        #[clap(long, default_value = "weight")]
        weight_attribute: String,

        /// Ignore edge weights
        #[clap(long, conflicts_with = "weight_attribute")]
        unweighted: bool,

        /// Report nodes scoring strictly above this value
        #[clap(long, conflicts_with = "top_k")]
        threshold: Option<f64>,

        /// Report the k highest scoring nodes
        #[clap(long)]
        top_k: Option<usize>,

        /// Seed for randomised detectors
        #[clap(long, default_value = "42")]
        seed: u64,

        /// Output directory for results
        #[clap(long, default_value = "cada_results")]
        output_dir: String,

        /// Also write graph.graphml to the output directory
        #[clap(long)]
        graphml: bool,
    },

    /// Evaluate scores against ground-truth labels
    Evaluate {
        /// JSON evaluation config; the benchmark datasets are used if omitted
        #[clap(long)]
        config: Option<PathBuf>,

        /// Override the number of runs per dataset
        #[clap(long)]
        runs: Option<usize>,

        /// Output directory for results
        #[clap(long, default_value = "cada_results")]
        output_dir: String,
    },

    /// Print descriptive statistics of a dataset
    Stats {
        /// Dataset directory containing network.parquet
        #[clap(long)]
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Cli::parse();

    // Configure logging
    let log_level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp_millis()
        .init();

    // Set number of threads
    let num_threads = if args.threads > 0 {
        args.threads
    } else {
        // If threads = 0, use all available cores
        num_cpus::get()
    };

    log::info!("Using {} worker threads", num_threads);
    rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build_global()?;

    match args.command {
        Command::Score {
            input,
            algorithm,
            resolution,
            weight_attribute,
            unweighted,
            threshold,
            top_k,
            seed,
            output_dir,
            graphml,
        } => {
            let defaults = Config::default();
            let config = Config {
                detection: DetectionConfig {
                    algorithm: algorithm.parse::<Algorithm>()?,
                    resolution,
                    weight_attribute: (!unweighted).then_some(weight_attribute),
                    seed,
                    ..DetectionConfig::default()
                },
                threshold: threshold.unwrap_or(defaults.threshold),
                top_k: top_k.unwrap_or(defaults.top_k),
            };
            config.validate()?;

            let selection = match top_k {
                Some(k) => Selection::TopK(k),
                None => Selection::Threshold(config.threshold),
            };
            run_score(&input, &config, selection, &output_dir, graphml)
        }
        Command::Evaluate { config, runs, output_dir } => {
            let mut config = match config {
                Some(path) => EvaluationConfig::from_file(&path)?,
                None => EvaluationConfig::default(),
            };
            if let Some(runs) = runs {
                config.runs = runs;
            }
            run_evaluate(&config, &output_dir)
        }
        Command::Stats { input } => {
            let graph = data::load_dataset(&input)?;
            let stats = GraphStatistics::compute(&graph);
            stats.log_summary(&input.display().to_string());
            println!("{}", serde_json::to_string_pretty(&stats)?);
            Ok(())
        }
    }
}

fn run_score(
    input: &Path,
    config: &Config,
    selection: Selection,
    output_dir: &str,
    graphml: bool,
) -> Result<()> {
    log::info!("Starting anomaly scoring");
    log::info!("Input: {}", input.display());
    log::info!("Output: {}", output_dir);

    // 1. Load data
    let graph = data::load_dataset(input)?;

    // 2. Detect communities and score
    let cada = Cada::run(&graph, &config.detection)?;

    // 3. Report
    let anomalies = selection.select(&cada);
    log::info!("Found {} anomalies", anomalies.len());
    for &node in anomalies.iter().take(10) {
        log::info!(
            "  {} score {:.4}",
            graph.node_name(node),
            cada.scores().score_of(node).unwrap_or_default()
        );
    }

    // 4. Save results
    storage::save_results(&cada, &graph, selection, output_dir)?;

    if graphml {
        let path = Path::new(output_dir).join("graph.graphml");
        viz::export_graphml(&graph, cada.partition(), cada.scores(), &path)?;
    }

    log::info!("Analysis complete. Results saved to {}", output_dir);

    Ok(())
}

fn run_evaluate(config: &EvaluationConfig, output_dir: &str) -> Result<()> {
    log::info!(
        "Evaluating {} datasets with {} ({} runs each)",
        config.datasets.len(),
        config.detection.algorithm,
        config.runs
    );

    let evaluations = evaluation::evaluate_all(config, |dataset| data::load_dataset(&dataset.path))?;
    storage::save_evaluation(&evaluations, output_dir)?;

    log::info!("Evaluation complete. Results saved to {}", output_dir);

    Ok(())
}
