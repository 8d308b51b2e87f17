//! ksvm Command Line Interface
//!
//! Trains a binary kernel SVM on LibSVM-format data and reports accuracy
//! on the training set and, optionally, a held-out test set.

use clap::{Args, Parser, Subcommand, ValueEnum};
use env_logger::Env;
use log::{error, info, warn};
use ksvm::api::{TrainedModel, SVM};
use ksvm::core::{
    CacheSize, Dataset, Result, SVMError, SolverType, SvmConfig, WorkingSetStrategy,
};
use ksvm::distance::EuclideanDistance;
use ksvm::kernel::{CauchyKernel, Kernel, LinearKernel, PolynomialKernel, RBFKernel};
use ksvm::LibSVMDataset;
use std::path::{Path, PathBuf};
use std::process;

#[derive(Parser)]
#[command(name = "ksvm")]
#[command(about = "Kernel SVM training with an SMO solver")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a model and report accuracy
    Train(TrainArgs),
    /// Print the default training configuration as JSON
    Config,
}

#[derive(Args)]
struct TrainArgs {
    /// Training data file (LibSVM format)
    #[arg(long)]
    data: PathBuf,

    /// Test data file (LibSVM format)
    #[arg(long)]
    test: Option<PathBuf>,

    /// Kernel function
    #[arg(short, long, default_value = "cauchy")]
    kernel: CliKernel,

    /// Cauchy kernel scale
    #[arg(long, default_value = "1.0")]
    sigma: f64,

    /// RBF/polynomial gamma (default: 1 / number of features)
    #[arg(long)]
    gamma: Option<f64>,

    /// Polynomial degree
    #[arg(long, default_value = "3")]
    degree: u32,

    /// Polynomial coef0
    #[arg(long, default_value = "0.0")]
    coef0: f64,

    /// JSON configuration file; flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Dual formulation
    #[arg(long)]
    solver: Option<CliSolver>,

    /// Regularization parameter C
    #[arg(short = 'C', long)]
    c: Option<f64>,

    /// nu for nu-SVC, in (0, 1]
    #[arg(long)]
    nu: Option<f64>,

    /// Convergence tolerance
    #[arg(short, long)]
    epsilon: Option<f64>,

    /// Maximum iterations
    #[arg(short, long)]
    max_iterations: Option<usize>,

    /// Kernel cache size in MB
    #[arg(long)]
    cache_size: Option<usize>,

    /// Disable the shrinking heuristic
    #[arg(long)]
    no_shrinking: bool,

    /// Working set selection strategy
    #[arg(long)]
    working_set_strategy: Option<CliWorkingSetStrategy>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum CliKernel {
    Cauchy,
    Rbf,
    Linear,
    Poly,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum CliSolver {
    #[value(name = "c-svc")]
    CSvc,
    #[value(name = "nu-svc")]
    NuSvc,
}

impl From<CliSolver> for SolverType {
    fn from(cli_solver: CliSolver) -> Self {
        match cli_solver {
            CliSolver::CSvc => SolverType::CSvc,
            CliSolver::NuSvc => SolverType::NuSvc,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum CliWorkingSetStrategy {
    /// Maximal violating pair (first order)
    #[value(name = "mvp")]
    MaximalViolatingPair,
    /// Second-order partner selection (default)
    #[value(name = "second-order")]
    SecondOrder,
}

impl From<CliWorkingSetStrategy> for WorkingSetStrategy {
    fn from(cli_strategy: CliWorkingSetStrategy) -> Self {
        match cli_strategy {
            CliWorkingSetStrategy::MaximalViolatingPair => WorkingSetStrategy::MaximalViolatingPair,
            CliWorkingSetStrategy::SecondOrder => WorkingSetStrategy::SecondOrder,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else {
        "warn"
    };

    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    let result = match cli.command {
        Commands::Train(args) => train_command(args),
        Commands::Config => config_command(),
    };

    if let Err(e) = result {
        error!("Error: {e}");
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn config_command() -> Result<()> {
    let json = serde_json::to_string_pretty(&SvmConfig::default())
        .map_err(|e| SVMError::ParseError(e.to_string()))?;
    println!("{json}");
    Ok(())
}

fn load_config(path: &Path) -> Result<SvmConfig> {
    let text = std::fs::read_to_string(path)?;
    serde_json::from_str(&text)
        .map_err(|e| SVMError::ParseError(format!("invalid config {}: {e}", path.display())))
}

/// Config file (or defaults) with command-line overrides applied
fn build_config(args: &TrainArgs) -> Result<SvmConfig> {
    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => SvmConfig::default(),
    };

    if let Some(solver) = args.solver {
        config.solver_type = solver.into();
    }
    if let Some(c) = args.c {
        config.c = c;
    }
    if let Some(nu) = args.nu {
        config.nu = nu;
        if args.solver.is_none() {
            config.solver_type = SolverType::NuSvc;
        }
    }
    if let Some(epsilon) = args.epsilon {
        config.epsilon = epsilon;
    }
    if let Some(max_iterations) = args.max_iterations {
        config.max_iterations = max_iterations;
    }
    if let Some(mb) = args.cache_size {
        config.cache_size = CacheSize::Bytes(mb * 1024 * 1024);
    }
    if args.no_shrinking {
        config.shrinking = false;
    }
    if let Some(strategy) = args.working_set_strategy {
        config.working_set_strategy = strategy.into();
    }

    config.validate()?;
    Ok(config)
}

fn train_command(args: TrainArgs) -> Result<()> {
    let config = build_config(&args)?;
    info!("Loading training data from {:?}", args.data);
    let train = LibSVMDataset::from_file(&args.data)?;
    let test = args
        .test
        .as_ref()
        .map(LibSVMDataset::from_file)
        .transpose()?;

    info!(
        "Loaded {} samples with {} dimensions",
        train.len(),
        train.dim()
    );
    let gamma = args.gamma.unwrap_or(1.0 / train.dim().max(1) as f64);

    match args.kernel {
        CliKernel::Cauchy => {
            let kernel = CauchyKernel::new(args.sigma, EuclideanDistance::sparse())?;
            run_training(kernel, config, &train, test.as_ref())
        }
        CliKernel::Rbf => run_training(RBFKernel::new(gamma)?, config, &train, test.as_ref()),
        CliKernel::Linear => run_training(LinearKernel::new(), config, &train, test.as_ref()),
        CliKernel::Poly => {
            let kernel = PolynomialKernel::new(args.degree, gamma, args.coef0)?;
            run_training(kernel, config, &train, test.as_ref())
        }
    }
}

fn run_training<K: Kernel + Clone>(
    kernel: K,
    config: SvmConfig,
    train: &LibSVMDataset,
    test: Option<&LibSVMDataset>,
) -> Result<()> {
    info!("Training {} with {:?}", kernel.name(), config.solver_type);
    let model = SVM::with_kernel(kernel).with_config(config).train(train)?;

    if !model.is_converged() {
        warn!(
            "Model is approximate: solver stopped with {:?}",
            model.status()
        );
    }

    let info = model.info();
    println!("Solver status: {:?}", info.status);
    println!("Iterations: {}", info.iterations);
    println!("Support vectors: {}", info.n_support_vectors);
    println!("Bias: {:.6}", info.bias);
    println!("Objective: {:.6}", info.objective);

    report("Training", &model, train)?;
    if let Some(test) = test {
        report("Test", &model, test)?;
    }
    Ok(())
}

fn report<K: Kernel + Clone>(label: &str, model: &TrainedModel<K>, dataset: &LibSVMDataset) -> Result<()> {
    let metrics = model.evaluate_detailed(dataset)?;
    println!("{label} accuracy: {:.2}%", metrics.accuracy() * 100.0);
    println!(
        "{label} precision: {:.4}, recall: {:.4}, F1: {:.4}",
        metrics.precision(),
        metrics.recall(),
        metrics.f1_score()
    );
    Ok(())
}
