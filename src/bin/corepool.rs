//! corepool CLI: drive the engine with a synthetic workload and inspect
//! effective configuration.

use clap::{Parser, Subcommand};
use corepool::config::Config;
use corepool::telemetry::{TelemetryConfig, init_telemetry};
use corepool::{Engine, EngineConfig, Task};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

#[derive(Parser)]
#[command(name = "corepool", about = "Bounded task queue on a growing, core-pinned thread pool")]
struct Cli {
    /// TOML file with an [engine] table; environment overrides it
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a synthetic workload through an engine and report
    Run {
        /// Number of tasks to submit
        #[arg(long, default_value_t = 1000)]
        tasks: u64,
        /// Milliseconds each task sleeps
        #[arg(long, default_value_t = 5)]
        task_ms: u64,
        /// Make every K-th task return an error
        #[arg(long)]
        fail_every: Option<u64>,
        /// Print the final report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the effective engine configuration as TOML
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Command::Run {
            tasks,
            task_ms,
            fail_every,
            json,
        } => cmd_run(config, tasks, task_ms, fail_every, json).await,
        Command::Config => {
            print!("{}", config.engine.to_toml()?);
            Ok(())
        }
    }
}

async fn cmd_run(
    config: Config,
    tasks: u64,
    task_ms: u64,
    fail_every: Option<u64>,
    json: bool,
) -> anyhow::Result<()> {
    let guard = init_telemetry(TelemetryConfig {
        endpoint: config.otel_endpoint.clone(),
        service_name: "corepool".to_string(),
        log_level: config.log_level.clone(),
    })?;

    let interrupted = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&interrupted);
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        flag.store(true, Ordering::Relaxed);
    });

    let engine_config = config.engine;
    let report = tokio::task::spawn_blocking(move || {
        run_workload(engine_config, tasks, task_ms, fail_every, &interrupted)
    })
    .await??;

    guard.force_flush();

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Submitted:  {}", report.stats.submitted);
        println!("Completed:  {}", report.stats.completed);
        println!("Failed:     {}", report.stats.failed);
        println!("Panicked:   {}", report.stats.panicked);
        println!("Timed out:  {}", report.stats.deadline_exceeded);
        println!(
            "Workers:    {} (max {})",
            report.workers, report.max_workers
        );
        println!("Scale-ups:  {}", report.scale_history.len());
        for event in &report.scale_history {
            println!(
                "  #{:<3} {} -> {}  ({}, {})",
                event.seq,
                event.from,
                event.to,
                event.trigger,
                event.at.format("%H:%M:%S%.3f")
            );
        }
        println!("Elapsed:    {}ms", report.elapsed_ms);
        if report.interrupted {
            println!("(interrupted: submission stopped early, queue drained)");
        }
    }

    Ok(())
}

#[derive(serde::Serialize)]
struct RunReport {
    stats: corepool::stats::StatsSnapshot,
    workers: usize,
    max_workers: usize,
    scale_history: Vec<corepool::event::ScaleEvent>,
    elapsed_ms: u64,
    interrupted: bool,
}

fn run_workload(
    config: EngineConfig,
    tasks: u64,
    task_ms: u64,
    fail_every: Option<u64>,
    interrupted: &AtomicBool,
) -> anyhow::Result<RunReport> {
    let engine = Engine::new(config)?;
    let start = Instant::now();
    engine.start()?;

    let sleep = Duration::from_millis(task_ms);
    for n in 1..=tasks {
        if interrupted.load(Ordering::Relaxed) {
            break;
        }
        let fails = fail_every.is_some_and(|k| k > 0 && n % k == 0);
        engine.add_task(Task::new(move |token| {
            std::thread::sleep(sleep);
            if token.is_cancelled() {
                anyhow::bail!("task {n} ran past its deadline");
            }
            if fails {
                anyhow::bail!("synthetic failure for task {n}");
            }
            Ok(())
        }))?;
    }

    engine.stop()?;

    Ok(RunReport {
        stats: engine.stats(),
        workers: engine.worker_count(),
        max_workers: engine.max_workers(),
        scale_history: engine.scale_history(),
        elapsed_ms: start.elapsed().as_millis() as u64,
        interrupted: interrupted.load(Ordering::Relaxed),
    })
}
