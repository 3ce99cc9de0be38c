//! CirGraph CLI - build, mutate and simulate circuits from the command line.

use anyhow::{bail, Context, Result};
use cirgraph::{
    Analysis, CirGraphConfig, CirGraphCore, Circuit, Evaluation, LogDecoder, LtspiceRunner,
    MeasurementRecord, Mutator, NetlistWriter, RemovalStrategy, SimulationRunner,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::process;
use tracing::Level;

#[derive(Parser)]
#[command(name = "cirgraph")]
#[command(about = "Circuit graph mutation and SPICE netlist tool", long_about = None)]
#[command(version)]
struct Cli {
    /// JSON config file
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a circuit's netlist, or export it to the work directory
    Netlist {
        /// Circuit file (.json or .cir)
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Write {DIR}/Circuit{id}/Circuit{id}.cir instead of printing
        #[arg(long, value_name = "DIR")]
        export: Option<PathBuf>,
    },

    /// Describe every component of a circuit
    Describe {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "human")]
        format: OutputFormat,
    },

    /// Apply gaussian mutation to every component parameter
    Mutate {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Standard deviation of each step
        #[arg(long)]
        sigma: Option<f64>,

        /// Probability each parameter is resampled
        #[arg(long)]
        p_mutate: Option<f64>,

        /// RNG seed for a reproducible run
        #[arg(long)]
        seed: Option<u64>,

        /// Where to save the result (.json or .cir); printed when omitted
        #[arg(short, long, value_name = "OUT")]
        output: Option<PathBuf>,
    },

    /// Remove a component, shorting or opening it to keep nodes connected
    Remove {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Component name or index
        #[arg(short, long)]
        component: String,

        /// Where to save the result (.json or .cir)
        #[arg(short, long, value_name = "OUT")]
        output: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "human")]
        format: OutputFormat,
    },

    /// Decode a simulator log into measurements
    Decode {
        /// Log file (UTF-16LE or UTF-8)
        #[arg(value_name = "LOG")]
        log: PathBuf,

        #[command(flatten)]
        analysis: AnalysisArgs,

        /// Netlist the log came from (needed for operating-point power)
        #[arg(long, value_name = "FILE")]
        netlist: Option<PathBuf>,

        /// Write transient samples as CSV
        #[arg(long, value_name = "OUT")]
        csv: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "human")]
        format: OutputFormat,
    },

    /// Simulate a circuit with LTspice and decode the results
    Simulate {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        #[command(flatten)]
        analysis: AnalysisArgs,

        /// Simulator executable
        #[arg(long, value_name = "PATH")]
        executable: Option<PathBuf>,

        /// Root of the per-circuit scratch directories
        #[arg(long, value_name = "DIR")]
        work_dir: Option<PathBuf>,

        /// Keep the simulator log after decoding
        #[arg(long)]
        keep_artifacts: bool,

        /// Stage transient samples as Circuit{id}trans.csv in the work directory
        #[arg(long)]
        csv: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value = "human")]
        format: OutputFormat,
    },
}

#[derive(Args)]
struct AnalysisArgs {
    /// Analysis kind
    #[arg(short, long, value_enum, default_value = "transient")]
    analysis: AnalysisKind,

    /// Drive frequency in Hz
    #[arg(long, default_value_t = 1000.0)]
    frequency: f64,

    /// Node the drive source couples into
    #[arg(long, value_name = "NODE")]
    input: Option<String>,

    /// Node the measurements probe
    #[arg(long, value_name = "NODE")]
    output: Option<String>,
}

impl AnalysisArgs {
    fn to_analysis(&self, require_nodes: bool) -> Result<Analysis> {
        let node = |value: &Option<String>, flag: &str| -> Result<String> {
            match value {
                Some(node) => Ok(node.clone()),
                None if require_nodes => bail!("--{} is required for {:?} analysis", flag, self.analysis),
                None => Ok(String::new()),
            }
        };

        Ok(match self.analysis {
            AnalysisKind::Transient => Analysis::Transient {
                frequency: self.frequency,
                input_node: node(&self.input, "input")?,
                output_node: node(&self.output, "output")?,
            },
            AnalysisKind::Ac => Analysis::Ac {
                frequency: self.frequency,
                input_node: node(&self.input, "input")?,
                output_node: node(&self.output, "output")?,
            },
            AnalysisKind::Op => Analysis::OperatingPoint,
        })
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum AnalysisKind {
    Transient,
    Ac,
    Op,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let exit_code = match run(cli) {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            1
        }
    };

    process::exit(exit_code);
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let config = CirGraphConfig::load_or_default(cli.config.as_deref())?;

    match cli.command {
        Commands::Netlist { file, export } => handle_netlist(&file, export.as_deref()),
        Commands::Describe { file, format } => handle_describe(&file, format),
        Commands::Mutate {
            file,
            sigma,
            p_mutate,
            seed,
            output,
        } => {
            let params = config.mutation.with_overrides(sigma, p_mutate)?;
            handle_mutate(&file, params, seed.or(config.seed), output.as_deref())
        }
        Commands::Remove {
            file,
            component,
            output,
            format,
        } => handle_remove(&file, &component, output.as_deref(), format),
        Commands::Decode {
            log,
            analysis,
            netlist,
            csv,
            format,
        } => handle_decode(&log, &analysis, netlist.as_deref(), csv.as_deref(), format),
        Commands::Simulate {
            file,
            analysis,
            executable,
            work_dir,
            keep_artifacts,
            csv,
            format,
        } => {
            let mut simulator = config.simulator;
            if let Some(executable) = executable {
                simulator.executable = executable;
            }
            if let Some(work_dir) = work_dir {
                simulator.work_dir = work_dir;
            }
            simulator.keep_artifacts |= keep_artifacts;
            handle_simulate(&file, &analysis, LtspiceRunner::new(simulator), csv, format)
        }
    }
}

fn load(file: &Path) -> Result<Circuit> {
    CirGraphCore::load_circuit(file).with_context(|| format!("loading {}", file.display()))
}

fn save_or_print(circuit: &Circuit, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            CirGraphCore::save_circuit(circuit, path)?;
            eprintln!("Wrote {}", path.display());
        }
        None => print!("{}", circuit.to_netlist()),
    }
    Ok(())
}

fn handle_netlist(file: &Path, export: Option<&Path>) -> Result<()> {
    let circuit = load(file)?;
    match export {
        Some(root) => {
            let path = NetlistWriter::export(&circuit, root)?;
            println!("{}", path.display());
        }
        None => print!("{}", circuit.to_netlist()),
    }
    Ok(())
}

fn handle_describe(file: &Path, format: OutputFormat) -> Result<()> {
    let circuit = load(file)?;
    match format {
        OutputFormat::Human => {
            println!("Circuit {}", circuit.id());
            println!("{}", "─".repeat(60));
            print!("{}", circuit.describe());
            println!("\n  Components: {}", circuit.len());
            println!(
                "  Nodes:      {}",
                circuit.nodes().iter().cloned().collect::<Vec<_>>().join(", ")
            );
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&circuit)?),
    }
    Ok(())
}

fn handle_mutate(
    file: &Path,
    params: cirgraph::MutationParams,
    seed: Option<u64>,
    output: Option<&Path>,
) -> Result<()> {
    let mut circuit = load(file)?;
    let mut mutator = Mutator::new(params, seed);
    mutator.mutate_circuit(&mut circuit);
    save_or_print(&circuit, output)
}

fn handle_remove(file: &Path, target: &str, output: Option<&Path>, format: OutputFormat) -> Result<()> {
    let mut circuit = load(file)?;
    let index = match circuit.find(target) {
        Some((index, _)) => index,
        None => target
            .parse::<usize>()
            .with_context(|| format!("no component named '{}' in circuit {}", target, circuit.id()))?,
    };

    let removal = circuit.remove_component(index)?;
    if let Some(path) = output {
        CirGraphCore::save_circuit(&circuit, path)?;
    }

    match format {
        OutputFormat::Human => {
            match &removal.strategy {
                RemovalStrategy::Open => println!("Removed {} (open)", removal.component.name()),
                RemovalStrategy::Short { kept, merged } => println!(
                    "Removed {} (short: {} merged into {})",
                    removal.component.name(),
                    merged,
                    kept
                ),
            }
            if output.is_none() {
                print!("{}", circuit.to_netlist());
            }
        }
        OutputFormat::Json => {
            let report = serde_json::json!({
                "removed": removal.component,
                "strategy": removal.strategy,
                "circuit": circuit,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }
    Ok(())
}

fn handle_decode(
    log: &Path,
    args: &AnalysisArgs,
    netlist: Option<&Path>,
    csv: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    let analysis = args.to_analysis(false)?;
    let bytes = std::fs::read(log).with_context(|| format!("reading {}", log.display()))?;
    let netlist = match netlist {
        Some(path) => std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?,
        None => String::new(),
    };

    let record = LogDecoder::decode_bytes(&bytes, &analysis, &netlist)?;
    if let (Some(path), MeasurementRecord::Transient(t)) = (csv, &record) {
        std::fs::write(path, t.trace().to_csv())?;
    }

    match format {
        OutputFormat::Human => print_record(&log.display().to_string(), &record),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&record)?),
    }
    Ok(())
}

fn handle_simulate(
    file: &Path,
    args: &AnalysisArgs,
    runner: LtspiceRunner,
    csv: bool,
    format: OutputFormat,
) -> Result<()> {
    let circuit = load(file)?;
    let analysis = args.to_analysis(true)?;

    let runtime = tokio::runtime::Runtime::new()?;
    let evaluation: Evaluation = runtime.block_on(async {
        if !runner.is_available().await {
            tracing::warn!(
                "{} not found at {}",
                runner.name(),
                runner.config().executable.display()
            );
        }
        CirGraphCore::evaluate(&circuit, &runner, &analysis).await
    })?;

    if let (true, MeasurementRecord::Transient(t)) = (csv, &evaluation.record) {
        let path = CirGraphCore::write_transient_csv(&runner.config().work_dir, circuit.id(), &t.trace())?;
        eprintln!("Wrote {}", path.display());
    }

    match format {
        OutputFormat::Human => print_record(&format!("Circuit {}", evaluation.circuit_id), &evaluation.record),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&evaluation)?),
    }
    Ok(())
}

fn print_record(title: &str, record: &MeasurementRecord) {
    println!("\n{} ({})", title, record.analysis_name());
    println!("{}", "─".repeat(60));
    for (name, value) in record.metrics() {
        match value {
            Some(v) => println!("  {:<18} {}", name, v),
            None => println!("  {:<18} n/a", name),
        }
    }
    if let MeasurementRecord::Transient(t) = record {
        println!("\n  Samples: {}", t.samples.len());
    }
}
