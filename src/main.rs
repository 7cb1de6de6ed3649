use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use ndarray::array;
use planar_kmeans::{
    generate, io, ClusterEngine, ConvergenceMeasure, EmptyClusterPolicy, Error,
};
use rand::SeedableRng;
use rand_isaac::Isaac64Rng;
use structopt::StructOpt;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Lloyd's k-means for points of the plane
#[derive(Debug, StructOpt)]
#[structopt(name = "planar-kmeans")]
struct Options {
    #[structopt(short = "v", long = "verbose")]
    /// Log every iteration
    verbose: bool,
    #[structopt(subcommand)]
    command: Command,
}

#[derive(Debug, StructOpt)]
enum Command {
    /// Cluster the points of a `index,x,y` file
    Cluster(ClusterOptions),
    /// Write a synthetic `index,x,y` file made of five gaussian blobs
    Generate(GenerateOptions),
}

#[derive(Debug, StructOpt)]
struct ClusterOptions {
    #[structopt(short = "i", long = "input", default_value = "./data.txt", parse(from_os_str))]
    input: PathBuf,
    #[structopt(short = "o", long = "output", default_value = "./result.txt", parse(from_os_str))]
    /// Where to write one `pointIndex, clusterIndex` line per point
    output: PathBuf,
    #[structopt(short = "k", long = "clusters", default_value = "5")]
    n_clusters: usize,
    #[structopt(long = "tolerance", default_value = "0.001")]
    tolerance: f64,
    #[structopt(long = "max-iterations", default_value = "300")]
    max_n_iterations: u64,
    #[structopt(long = "seed")]
    /// Seed of the random source, taken from the OS when missing
    seed: Option<u64>,
    #[structopt(long = "empty-cluster", default_value = "reseed", possible_values = &["reseed", "retain"])]
    empty_cluster: EmptyClusterPolicy,
    #[structopt(long = "measure", default_value = "relative", possible_values = &["relative", "mixed"])]
    measure: ConvergenceMeasure,
}

#[derive(Debug, StructOpt)]
struct GenerateOptions {
    #[structopt(short = "n", long = "blob-size", default_value = "100")]
    /// Number of points around each of the five centroids
    blob_size: usize,
    #[structopt(long = "seed")]
    seed: Option<u64>,
    #[structopt(short = "o", long = "output", default_value = "./data.txt", parse(from_os_str))]
    output: PathBuf,
}

fn rng_from(seed: Option<u64>) -> Isaac64Rng {
    match seed {
        Some(seed) => Isaac64Rng::seed_from_u64(seed),
        None => Isaac64Rng::from_entropy(),
    }
}

fn cluster_points(opt: ClusterOptions) -> anyhow::Result<()> {
    let points = io::read_points(&opt.input)
        .with_context(|| format!("failed to read points from {}", opt.input.display()))?;
    info!(n_points = points.nrows(), n_clusters = opt.n_clusters, "loaded points");

    let start = Instant::now();
    let mut engine = ClusterEngine::params_with_rng(opt.n_clusters, rng_from(opt.seed))
        .tolerance(opt.tolerance)
        .max_n_iterations(opt.max_n_iterations)
        .empty_cluster(opt.empty_cluster)
        .convergence(opt.measure)
        .build(&points)?;
    match engine.run() {
        Ok(summary) => info!(
            n_iterations = summary.n_iterations,
            displacement = summary.displacement,
            "converged"
        ),
        Err(Error::NotConverged {
            n_iterations,
            displacement,
        }) => warn!(n_iterations, displacement, "stopped before converging"),
        Err(err) => return Err(err.into()),
    }
    let elapsed = start.elapsed();

    println!("Detected centroid:");
    for (index, centroid) in engine.centroids().rows().into_iter().enumerate() {
        println!("Centroid {}: {:.4}, {:.4}", index, centroid[0], centroid[1]);
    }
    println!("Total Elapsed time: {:.3} sec", elapsed.as_secs_f64());

    if let Some(memberships) = engine.memberships() {
        io::write_assignments(&opt.output, &memberships)
            .with_context(|| format!("failed to write {}", opt.output.display()))?;
    }
    Ok(())
}

fn generate_points(opt: GenerateOptions) -> anyhow::Result<()> {
    let mut rng = rng_from(opt.seed);
    let centroids = array![[1., 1.], [1., 4.5], [3., 3.], [4.5, 1.], [4.5, 4.5]];
    let points = generate::blobs_with_distribution(
        opt.blob_size,
        &centroids,
        ndarray_rand::rand_distr::Normal::new(0., 0.3)?,
        &mut rng,
    );
    io::write_points(&opt.output, &points)
        .with_context(|| format!("failed to write {}", opt.output.display()))?;
    info!(n_points = points.nrows(), output = %opt.output.display(), "generated points");
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let opt = Options::from_args();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(if opt.verbose { Level::DEBUG } else { Level::INFO })
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match opt.command {
        Command::Cluster(opt) => cluster_points(opt),
        Command::Generate(opt) => generate_points(opt),
    }
}
