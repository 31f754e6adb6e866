use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use clustx::{
    load_dataset, Algorithm, AlgorithmRequest, ClusteringOutcome, Config, CovarianceType,
    Dataset, FileRunStore, Linkage, Pipeline, RunStore,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use uuid::Uuid;

/// Automatic clustering for tabular data
#[derive(Parser, Debug)]
#[command(name = "clustx")]
#[command(about = "Cluster CSV and JSON data and explain the clusters", long_about = None)]
struct Cli {
    /// Log level
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// TOML file with heuristics and insight settings
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Cluster a dataset and print labels, metrics and projection
    Run {
        /// CSV, JSON or JSON Lines file
        input: PathBuf,

        #[command(flatten)]
        algorithm: AlgorithmArgs,

        /// Directory to save the run in
        #[arg(long)]
        store: Option<PathBuf>,

        /// Write JSON here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Explain the clusters of a dataset
    Analyze {
        input: PathBuf,

        /// Stored run to explain instead of clustering again
        #[arg(long, requires = "store")]
        run: Option<Uuid>,

        #[arg(long)]
        store: Option<PathBuf>,

        /// Details of a single cluster
        #[arg(long, conflicts_with = "noise")]
        cluster: Option<i32>,

        /// Every noise record with the reasons it was left out
        #[arg(long)]
        noise: bool,

        #[command(flatten)]
        algorithm: AlgorithmArgs,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show the features a dataset would be clustered on
    Features {
        input: PathBuf,

        #[command(flatten)]
        algorithm: AlgorithmArgs,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct AlgorithmArgs {
    /// kmeans, dbscan, hdbscan, hierarchical or gmm (chosen from the row count when omitted)
    #[arg(long)]
    algorithm: Option<Algorithm>,

    #[arg(long)]
    n_clusters: Option<usize>,

    #[arg(long)]
    eps: Option<f64>,

    #[arg(long)]
    min_samples: Option<usize>,

    #[arg(long)]
    min_cluster_size: Option<usize>,

    /// ward, complete, average or single
    #[arg(long)]
    linkage: Option<Linkage>,

    /// full or diag
    #[arg(long)]
    covariance: Option<CovarianceType>,
}

impl AlgorithmArgs {
    fn request(&self) -> anyhow::Result<Option<AlgorithmRequest>> {
        let Some(algorithm) = self.algorithm else {
            let has_params = self.n_clusters.is_some()
                || self.eps.is_some()
                || self.min_samples.is_some()
                || self.min_cluster_size.is_some()
                || self.linkage.is_some()
                || self.covariance.is_some();
            if has_params {
                bail!("algorithm parameters need --algorithm");
            }
            return Ok(None);
        };

        Ok(Some(AlgorithmRequest {
            algorithm,
            n_clusters: self.n_clusters,
            eps: self.eps,
            min_samples: self.min_samples,
            min_cluster_size: self.min_cluster_size,
            linkage: self.linkage,
            covariance_type: self.covariance,
        }))
    }
}

#[derive(Serialize)]
struct RunOutput<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    run_id: Option<Uuid>,
    #[serde(flatten)]
    outcome: &'a ClusteringOutcome,
}

fn main() {
    let cli = Cli::parse();

    let log_level = match cli.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // Logs go to stderr so JSON on stdout stays parseable
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to install logger: {}", e);
    }

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => Config::default(),
    };
    let pipeline = Pipeline::new(config);

    match cli.command {
        Command::Run {
            input,
            algorithm,
            store,
            output,
        } => {
            let dataset = load(&input)?;
            let request = algorithm.request()?;
            let outcome = pipeline.run_clustering(&dataset, request.as_ref())?;

            let run_id = match store {
                Some(dir) => {
                    let store = FileRunStore::new(&dir)?;
                    let run = store.save(outcome.clone().into_run(dataset_name(&dataset)))?;
                    info!("Run saved as {}", run.id);
                    Some(run.id)
                }
                None => None,
            };

            let result = RunOutput {
                run_id,
                outcome: &outcome,
            };
            write_json(&result, output.as_deref())
        }
        Command::Analyze {
            input,
            run,
            store,
            cluster,
            noise,
            algorithm,
            output,
        } => {
            let dataset = load(&input)?;
            let (labels, metrics) = match (run, store) {
                (Some(id), Some(dir)) => {
                    let store = FileRunStore::new(&dir)?;
                    let Some(run) = store.load(id)? else {
                        bail!("run {} not found in {}", id, dir.display());
                    };
                    (run.labels, run.metrics)
                }
                _ => {
                    let request = algorithm.request()?;
                    let outcome = pipeline.run_clustering(&dataset, request.as_ref())?;
                    (outcome.labels, outcome.metrics)
                }
            };

            if let Some(cluster_id) = cluster {
                let Some(details) = pipeline.cluster_details(&dataset, &labels, cluster_id)? else {
                    bail!("cluster {} not found", cluster_id);
                };
                return write_json(&details, output.as_deref());
            }
            if noise {
                let explanation = pipeline.noise_points(&dataset, &labels)?;
                return write_json(&explanation, output.as_deref());
            }

            let analysis = pipeline.analyze(&dataset, &labels, &metrics)?;
            write_json(&analysis, output.as_deref())
        }
        Command::Features {
            input,
            algorithm,
            output,
        } => {
            let dataset = load(&input)?;
            let request = algorithm.request()?;
            let report = pipeline.feature_report(&dataset, request.as_ref())?;
            write_json(&report, output.as_deref())
        }
    }
}

fn load(path: &Path) -> anyhow::Result<Dataset> {
    let dataset =
        load_dataset(path).with_context(|| format!("failed to load {}", path.display()))?;
    info!(
        "Loaded {} rows x {} columns from {}",
        dataset.n_rows(),
        dataset.n_columns(),
        path.display()
    );
    Ok(dataset)
}

fn dataset_name(dataset: &Dataset) -> String {
    dataset.name().unwrap_or("dataset").to_string()
}

fn write_json<T: Serialize>(value: &T, output: Option<&Path>) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!("Wrote {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}
