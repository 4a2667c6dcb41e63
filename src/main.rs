use clap::{Parser, Subcommand};

mod config;
mod data;
mod output;
mod process;
mod sweep;

use anyhow::Context;
use chrono::Local;
use std::fs;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

pub type Result<T> = anyhow::Result<T>;

#[derive(Parser)]
#[command(name = "jitbench")]
#[command(about = "Benchmark a JIT against reference builds", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the benchmark suites of one front-end and collect CSV results.
    Run {
        /// Front-end whose suites are run.
        #[arg(short = 'f', long = "front-end")]
        front_end: String,

        /// The JIT to benchmark.
        #[arg(short = 'j', long)]
        jit: Option<PathBuf>,

        /// Back-end used in the JIT; selects its argument sets and metric columns.
        #[arg(short = 'b', long = "back-end")]
        back_end: Option<String>,

        /// Also run the reference implementations.
        #[arg(short = 'e', long)]
        reference: bool,

        /// Benchmark root; suite paths in the manifest are relative to it.
        #[arg(long, default_value = ".")]
        root: PathBuf,

        /// Manifest file [default: <root>/bench.json].
        #[arg(long)]
        config: Option<PathBuf>,

        /// Only run this suite (repeatable).
        #[arg(long = "suite")]
        suites: Vec<String>,

        /// Leave the accumulated CSV files in the root instead of moving them into data/.
        #[arg(long)]
        no_persist: bool,
    },

    /// Reduce the data lines of a captured stdout (checks instrumentation output).
    Extract {
        #[arg(long)]
        log: PathBuf,

        /// Only this origin; default prints front-end, whole, then back-end.
        #[arg(long, value_enum)]
        origin: Option<data::Origin>,

        /// Pad each origin to this many columns.
        #[arg(long, default_value_t = 0)]
        columns: usize,
    },
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.cmd {
        Commands::Run {
            front_end,
            jit,
            back_end,
            reference,
            root,
            config: manifest_path,
            suites,
            no_persist,
        } => {
            let selection = config::Selection {
                front_end,
                jit,
                back_end,
                reference,
                suites,
            };
            run_benchmarks(root, manifest_path, selection, !no_persist)?;
        }
        Commands::Extract {
            log,
            origin,
            columns,
        } => {
            let text = fs::read_to_string(&log)
                .with_context(|| format!("read captured output {}", log.display()))?;
            let origins = match origin {
                Some(o) => vec![o],
                None => vec![data::Origin::FrontEnd, data::Origin::Whole, data::Origin::BackEnd],
            };
            for origin in origins {
                for column in data::extract(&text, origin, columns)? {
                    println!("{}\t{}", origin, column);
                }
            }
        }
    }

    Ok(())
}

fn run_benchmarks(
    root: PathBuf,
    manifest_path: Option<PathBuf>,
    selection: config::Selection,
    persist: bool,
) -> Result<()> {
    let root = fs::canonicalize(&root)
        .with_context(|| format!("benchmark root {}", root.display()))?;
    let manifest_path = manifest_path.unwrap_or_else(|| root.join("bench.json"));

    // 1) Validate everything before the first launch.
    let manifest = config::Manifest::load(&manifest_path)?.validate_and_build()?;
    let plan = config::RunPlan::resolve(&manifest, &selection)?;
    let timer = process::Timer::new(manifest.timer)?;

    // 2) Sweep each suite, accumulating its files into the root.
    let accumulator = output::Accumulator::new(&root);
    accumulator.reset()?;

    for entry in &plan.suites {
        info!(suite = %entry.name, "started suite");
        let suite_dir = root.join(&entry.path);
        let prefix = format!(
            "{}/{}",
            plan.front_end.prefix.trim_end_matches('/'),
            entry.name
        );
        let jit = match (&plan.jit, &plan.back_end) {
            (Some(binary), Some(back_end)) => Some(sweep::JitSweep {
                binary: binary.as_path(),
                front_end_args: &plan.front_end.args,
                back_end_args: &back_end.args,
                front_end_columns: plan.front_end.columns,
                back_end_columns: back_end.columns,
            }),
            _ => None,
        };
        let driver = sweep::SweepDriver {
            hooks: &entry.suite,
            suite_dir: &suite_dir,
            prefix: &prefix,
            repeats: plan.repeats,
            timer: &timer,
            jit,
        };
        driver
            .run(plan.component)
            .with_context(|| format!("suite {}", entry.name))?;
        accumulator.collect(&suite_dir, plan.component)?;
        info!(suite = %entry.name, "finished suite");
    }

    // 3) Persist under a timestamped name.
    if persist {
        let stamp = Local::now().format("%Y.%m.%d.%H.%M.%S").to_string();
        accumulator.persist(
            plan.component,
            &plan.front_end.name,
            plan.back_end.as_ref().map(|b| b.name.as_str()),
            &stamp,
        )?;
    }

    Ok(())
}

/// Compact stderr logging; `RUST_LOG` overrides the default `info` level.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}
