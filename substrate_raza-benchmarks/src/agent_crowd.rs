use substrate_raza::prelude::*;

use clap::{Parser, Subcommand};
use kdam::BarExt;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Eq, Deserialize, PartialEq, Serialize)]
struct SimSettings {
    n_agents: usize,
    n_threads: std::num::NonZeroUsize,
    backend: String,
    /// Number of voxels along every axis
    n_voxels: usize,
    n_steps: u64,
}

const VOXEL_SIZE: f64 = 20.0;

fn setup_agents(n_agents: usize, domain_size: f64) -> Result<AgentSubstrateStore, IndexError> {
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    let mut agents = AgentSubstrateStore::new(3, 2);
    for _ in 0..n_agents {
        let position = (0..3).map(|_| rng.gen_range(0.0..domain_size)).collect();
        let agent = AgentSubstrateState::new(position, rng.gen_range(1000.0..3000.0), 2)
            .with_uptake(0, rng.gen_range(0.0..10.0))
            .with_secretion(1, rng.gen_range(0.0..1.0), 10.0);
        agents.add_agent(agent)?;
    }
    Ok(agents)
}

fn run_simulation(sim_settings: &SimSettings) -> Result<(), SolverError> {
    let domain_size = sim_settings.n_voxels as f64 * VOXEL_SIZE;
    let env = MicroenvironmentBuilder::new()
        .bounding_box([0.0; 3], [domain_size; 3], [VOXEL_SIZE; 3], 3)
        .timestep(0.01)
        .substrate(SubstrateConfig::new("oxygen", 1e5, 0.1, 38.0))
        .substrate(SubstrateConfig::new("signal", 1e3, 0.4, 0.0))
        .dirichlet_boundary("oxygen", Axis::Z, Face::Min, 38.0)
        .track_internalized_substrates(true)
        .build()?;
    let agents = setup_agents(sim_settings.n_agents, domain_size)?;
    let settings = Settings {
        n_threads: sim_settings.n_threads,
        backend: sim_settings.backend.clone(),
        show_progressbar: false,
        storage_location: None,
    };
    let mut simulation = SubstrateSimulation::new(env, settings, &BackendRegistry::with_defaults())?;
    let mut time = FixedStepsize::from_partial_save_steps(
        0.0,
        0.01,
        sim_settings.n_steps,
        sim_settings.n_steps + 1,
    )?;
    simulation.run(Some(&agents as &dyn AgentData), &mut time, ReductionMode::Reuse)?;
    Ok(())
}

#[derive(Clone, Debug, Deserialize, Serialize)]
struct BenchmarkResult {
    simulation_settings: SimSettings,
    /// Duration of every sample in nanoseconds
    times: Vec<u128>,
}

impl BenchmarkResult {
    fn mean_millis(&self) -> f64 {
        self.times.iter().sum::<u128>() as f64 * 1e-6 / self.times.len().max(1) as f64
    }
}

/// Writes all results of one subcommand into `<output_directory>/<name>/<save_prefix>.json`
fn store_results(
    args: &CLIArgs,
    results: &[BenchmarkResult],
    save_prefix: &str,
) -> Result<std::path::PathBuf, Box<dyn std::error::Error>> {
    let directory = std::path::Path::new(&args.output_directory).join(&args.name);
    std::fs::create_dir_all(&directory)?;
    let path = directory.join(format!("{save_prefix}.json"));
    serde_json::to_writer_pretty(std::fs::File::create(&path)?, results)?;
    Ok(path)
}

fn run_sim(
    args: &CLIArgs,
    settings: Vec<SimSettings>,
    describe: impl Fn(&SimSettings) -> String,
    save_prefix: &str,
) -> Result<Vec<BenchmarkResult>, Box<dyn std::error::Error>> {
    let mut bar = (!args.no_output).then(|| {
        kdam::tqdm!(
            total = settings.len() * (args.sample_size + 1),
            position = 0
        )
    });
    let mut results = Vec::with_capacity(settings.len());
    for setting in settings {
        // The first run is a warmup and not measured
        let mut times = Vec::with_capacity(args.sample_size);
        for n_sample in 0..=args.sample_size {
            if let Some(bar) = bar.as_mut() {
                bar.set_description(format!("{} Sample: {}", describe(&setting), n_sample));
            }
            let now = std::time::Instant::now();
            std::hint::black_box(run_simulation(&setting))?;
            if n_sample > 0 {
                times.push(now.elapsed().as_nanos());
            }
            if let Some(bar) = bar.as_mut() {
                bar.update(1)?;
            }
        }
        results.push(BenchmarkResult {
            simulation_settings: setting,
            times,
        });
    }
    if !args.no_save {
        let path = store_results(args, &results, save_prefix)?;
        #[cfg(feature = "tracing")]
        tracing::info!(path = %path.display(), "Stored benchmark results");
        #[cfg(not(feature = "tracing"))]
        let _ = path;
    }
    Ok(results)
}

fn problem_size_scaling(
    args: &CLIArgs,
    problem_sizes: Vec<usize>,
    n_threads: usize,
) -> Result<Vec<BenchmarkResult>, Box<dyn std::error::Error>> {
    let n_threads = n_threads.try_into()?;
    let simulation_settings: Vec<_> = problem_sizes
        .into_iter()
        .map(|n_voxels| SimSettings {
            // Roughly two agents per voxel
            n_agents: 2 * n_voxels.pow(3),
            n_threads,
            backend: args.backend.clone(),
            n_voxels,
            n_steps: 20,
        })
        .collect();
    run_sim(
        args,
        simulation_settings,
        |setting| format!("Voxels: {}^3", setting.n_voxels),
        "sim-size",
    )
}

fn thread_scaling(
    args: &CLIArgs,
    threads: Vec<usize>,
) -> Result<Vec<BenchmarkResult>, Box<dyn std::error::Error>> {
    let simulation_settings = threads
        .into_iter()
        .map(|n_threads| {
            Ok(SimSettings {
                n_agents: 50_000,
                n_threads: n_threads.try_into()?,
                backend: args.backend.clone(),
                n_voxels: 40,
                n_steps: 10,
            })
        })
        .collect::<Result<Vec<_>, std::num::TryFromIntError>>()?;
    run_sim(
        args,
        simulation_settings,
        |setting| format!("Threads: {}", setting.n_threads),
        "thread-scaling",
    )
}

#[derive(Subcommand, Debug)]
enum SubCommand {
    /// Thread scaling benchmark
    Threads {
        /// List of thread configurations to benchmark
        threads: Vec<usize>,
    },
    /// Simulation Size scaling benchmark
    SimSize {
        /// Number of voxels along every axis
        problem_sizes: Vec<usize>,
        #[arg(short, default_value_t = 1)]
        n_threads: usize,
    },
}

/// Measures diffusion together with secretion and uptake of randomly placed agents
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct CLIArgs {
    /// Name of the current runs such as name of the device to be benchmarked
    #[arg(required = true)]
    name: String,

    /// Output directory of benchmark results
    #[arg(short, long, default_value_t = format!("benchmark_results"))]
    output_directory: String,

    #[command(subcommand)]
    commands: Option<SubCommand>,

    /// Solver backend
    #[arg(short, long, default_value_t = format!("rayon"))]
    backend: String,

    /// Number of samples to be generated for each measurement
    #[arg(short, long, default_value_t = 5)]
    sample_size: usize,

    /// Do not save results
    #[arg(long, default_value_t = false)]
    no_save: bool,

    /// Disables output
    #[arg(long, default_value_t = false)]
    no_output: bool,
}

#[cfg(feature = "tracing")]
fn init_tracing() {
    use tracing_subscriber::{filter, prelude::*};
    let stdout_log = tracing_subscriber::fmt::layer()
        .pretty()
        .with_line_number(true)
        .with_level(true);
    tracing_subscriber::registry()
        .with(stdout_log.with_filter(filter::LevelFilter::INFO))
        .init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(feature = "tracing")]
    init_tracing();
    let args = CLIArgs::parse();

    if let Some(command) = &args.commands {
        if !args.no_output {
            println!("Generating Results for device {}", args.name);
        }
        let results = match command {
            SubCommand::Threads { threads } => thread_scaling(&args, threads.clone())?,
            SubCommand::SimSize {
                problem_sizes,
                n_threads,
            } => problem_size_scaling(&args, problem_sizes.clone(), *n_threads)?,
        };
        #[cfg(feature = "tracing")]
        tracing::info!(n_results = results.len(), "Finished benchmarks");
        if !args.no_output {
            for result in results {
                println!(
                    "{:?} mean {:.3} ms",
                    result.simulation_settings,
                    result.mean_millis()
                );
            }
        }
    }
    Ok(())
}
