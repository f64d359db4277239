use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

use sp_project::{ProjectError, ScenarioDef};
use sp_sim::{SimError, SimRecord, run_closed_loop, write_csv};

#[derive(Parser)]
#[command(name = "sp-cli")]
#[command(about = "Smith predictor closed-loop simulation tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a scenario file
    Validate {
        /// Path to the scenario YAML or JSON file
        scenario_path: PathBuf,
    },
    /// Run a closed-loop simulation and emit CSV
    Run {
        /// Path to the scenario YAML or JSON file
        scenario_path: PathBuf,
        /// Output CSV file path (optional, defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Time step in seconds, overriding the scenario
        #[arg(long)]
        dt: Option<f64>,
        /// End time in seconds, overriding the scenario
        #[arg(long)]
        t_end: Option<f64>,
    },
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error(transparent)]
    Project(#[from] ProjectError),

    #[error(transparent)]
    Sim(#[from] SimError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

type CliResult<T> = Result<T, CliError>;

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { scenario_path } => cmd_validate(&scenario_path),
        Commands::Run {
            scenario_path,
            output,
            dt,
            t_end,
        } => cmd_run(&scenario_path, output.as_deref(), dt, t_end),
    }
}

fn cmd_validate(scenario_path: &Path) -> CliResult<()> {
    println!("Validating scenario: {}", scenario_path.display());
    let scenario = sp_project::load(scenario_path)?;
    println!(
        "✓ Scenario '{}' is valid (model order {}, delay {} s)",
        scenario.name, scenario.plant.model_order, scenario.plant.delay_s
    );
    Ok(())
}

fn cmd_run(
    scenario_path: &Path,
    output: Option<&Path>,
    dt: Option<f64>,
    t_end: Option<f64>,
) -> CliResult<()> {
    let mut scenario = sp_project::load(scenario_path)?;
    apply_overrides(&mut scenario, dt, t_end);
    sp_project::validate_scenario(&scenario).map_err(ProjectError::from)?;

    info!(
        scenario = %scenario.name,
        dt = scenario.run.dt_s,
        t_end = scenario.run.t_end_s,
        "running closed loop"
    );
    let record = run_closed_loop(&scenario)?;

    match output {
        Some(path) => {
            write_csv(&record, BufWriter::new(File::create(path)?))?;
            println!(
                "✓ Exported {} data points to {}",
                record.len(),
                path.display()
            );
            print_summary(&scenario, &record);
        }
        None => write_csv(&record, io::stdout().lock())?,
    }
    Ok(())
}

fn apply_overrides(scenario: &mut ScenarioDef, dt: Option<f64>, t_end: Option<f64>) {
    if let Some(dt) = dt {
        scenario.run.dt_s = dt;
    }
    if let Some(t_end) = t_end {
        scenario.run.t_end_s = t_end;
    }
}

fn print_summary(scenario: &ScenarioDef, record: &SimRecord) {
    let Some((t, last)) = record.last() else {
        return;
    };
    println!("Scenario: {}", scenario.name);
    println!("  Final time:        {:.3} s", t);
    println!("  Final command:     {:.4}", last.command);
    println!("  Final measured:    {:.4}", last.measured);
    println!("  Final prediction:  {:.4}", last.model_prediction);
    if let Some(peak) = record.peak_measured() {
        println!("  Peak measured:     {:.4}", peak);
    }
}
