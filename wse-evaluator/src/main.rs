// Copyright (c) 2026 Graphcore Ltd. All rights reserved.

//! A simple front-end for evaluating workloads on a wafer
//!
//! For example, run using:
//!   cargo run --bin wse-eval -- --wafer demos/wafer.yaml --mapping
//! demos/mapping.yaml --stdout --stdout-level debug latency --workload
//! demos/workload.yaml

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use serde::Serialize;
use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode};
use wse_evaluator::build_evaluator;
use wse_evaluator::config::{EvaluatorConfig, EvaluatorKind};
use wse_evaluator::lp::LpEvaluator;
use wse_evaluator::task::Workload;
use wse_hardware::ResourceGraph;
use wse_hardware::builder::build_wafer_graph;
use wse_hardware::mapper::StaticMapper;
use wse_hardware::types::WaferConfig;

/// Command-line arguments.
#[derive(Parser)]
#[command(about = "Application to estimate the throughput of a workload on a wafer-scale engine")]
struct Cli {
    /// Enable logging to the console.
    #[arg(long, default_value = "false")]
    stdout: bool,

    /// Level of log message to display.
    #[arg(long, default_value = "Info")]
    stdout_level: log::Level,

    /// Wafer file
    #[arg(long, default_value = "wafer.yaml")]
    wafer: PathBuf,

    /// Placement of virtual reticles and DRAM ports
    #[arg(long, default_value = "mapping.yaml")]
    mapping: PathBuf,

    /// Evaluator settings (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Evaluator to use, overriding the settings.
    #[arg(long)]
    evaluator: Option<EvaluatorKind>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the bottleneck frequency and the total latency
    Latency {
        #[arg(long)]
        workload: PathBuf,
    },

    /// Print the utilisation of every resource
    Utilization {
        #[arg(long)]
        workload: PathBuf,
    },

    /// Print the total demand on each class of resource
    Payload {
        #[arg(long)]
        workload: PathBuf,
    },

    /// Write the heterogeneous graph of all used resources
    HeteroGraph {
        #[arg(long)]
        workload: PathBuf,

        /// YAML output file, defaults to the console
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Write one training sample per task on the hottest link of each workload
    Samples {
        #[arg(long, required = true)]
        workload: Vec<PathBuf>,

        /// YAML output file, defaults to the console
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn setup_logging(args: &Cli) -> Result<()> {
    if args.stdout {
        let config = ConfigBuilder::new().set_time_level(log::LevelFilter::Off).build();
        TermLogger::init(
            args.stdout_level.to_level_filter(),
            config,
            TerminalMode::Stderr,
            ColorChoice::Auto,
        )?;
    }
    Ok(())
}

fn write_yaml<T: Serialize>(value: &T, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Unable to create {}", path.display()))?;
            serde_yaml::to_writer(file, value)?;
            info!("Written {}", path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            serde_yaml::to_writer(&mut stdout, value)?;
            stdout.flush()?;
        }
    }
    Ok(())
}

fn load_workload(path: &Path) -> Result<Workload> {
    let workload = Workload::from_file(path)?;
    info!(
        "Loaded workload {} with {} tasks",
        path.display(),
        workload.tasks.len()
    );
    Ok(workload)
}

fn main() -> Result<()> {
    let args = Cli::parse();
    setup_logging(&args)?;

    let mut config = EvaluatorConfig::load(args.config.as_deref())?;
    if let Some(kind) = args.evaluator {
        config.evaluator = kind;
    }

    let wafer = WaferConfig::from_file(&args.wafer)?;
    let graph: ResourceGraph = build_wafer_graph(&wafer)?;
    info!("Loaded wafer:\n{graph}");
    info!(
        "Bisection bandwidth {:e} B/s, total DRAM bandwidth {:e} B/s",
        wafer.bisection_bandwidth(),
        wafer.total_dram_bandwidth()
    );
    let mapper = StaticMapper::from_file(&args.mapping, &wafer)?;

    match &args.command {
        Command::Latency { workload } => {
            let workload = load_workload(workload)?;
            let evaluator = build_evaluator(&config, &graph, &mapper, &workload, None)?;
            let frequency = evaluator.bottleneck_frequency()?;
            let latency = evaluator.total_latency()?;
            println!("Evaluator: {}", evaluator.name());
            println!("Bottleneck frequency: {frequency:e}/s");
            println!(
                "Total latency: {latency:e}s ({} repetitions)",
                workload.repeated_times()
            );
        }
        Command::Utilization { workload } => {
            let workload = load_workload(workload)?;
            let evaluator = LpEvaluator::new(&graph, &mapper, &workload)?;
            println!("{}", evaluator.utilization_report()?);
        }
        Command::Payload { workload } => {
            let workload = load_workload(workload)?;
            let evaluator = LpEvaluator::new(&graph, &mapper, &workload)?;
            println!("{}", evaluator.payload_report()?);
        }
        Command::HeteroGraph { workload, output } => {
            let workload = load_workload(workload)?;
            let evaluator = LpEvaluator::new(&graph, &mapper, &workload)?;
            write_yaml(&evaluator.hetero_graph()?, output.as_deref())?;
        }
        Command::Samples { workload, output } => {
            let progress_bar = ProgressBar::new(workload.len() as u64);
            progress_bar.set_style(ProgressStyle::with_template(
                "{bar:40} {pos}/{len} workloads {msg}",
            )?);

            let mut samples = Vec::new();
            for path in workload {
                progress_bar.set_message(path.display().to_string());
                let loaded = load_workload(path)?;
                let evaluator = LpEvaluator::new(&graph, &mapper, &loaded)?
                    .with_tolerance(config.consistency_tolerance);
                let extracted = evaluator
                    .training_samples()
                    .with_context(|| format!("Extracting samples from {}", path.display()))?;
                samples.extend(extracted);
                progress_bar.inc(1);
            }
            progress_bar.finish_with_message(format!("{} samples", samples.len()));

            write_yaml(&samples, output.as_deref())?;
        }
    }

    Ok(())
}
