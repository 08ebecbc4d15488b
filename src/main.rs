//! Tickflow - CLI
//!
//! Runs a demonstration host loop over the scheduler.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tickflow::runtime::{HostLoop, PhaseId, RoutineOptions, Scheduler, Sequence};
use tickflow::util::config::{self, TickflowConfig};
use tickflow::util::logger::{self, LogLevel};
use tickflow::{NAME, VERSION};
use tracing::{info, warn};

/// Cooperative routine scheduler
#[derive(Parser, Debug)]
#[command(name = "tickflow")]
#[command(author = "Tickflow Team")]
#[command(version = VERSION)]
#[command(about = NAME, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to ~/.config/tickflow/config.toml)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the demonstration routines
    Demo {
        /// Maximum number of ticks
        #[arg(long)]
        ticks: Option<u64>,

        /// Milliseconds between ticks
        #[arg(long)]
        tick_ms: Option<u64>,

        /// Time-scale factor for scaled delays
        #[arg(long)]
        time_scale: Option<f64>,
    },

    /// Print the effective configuration
    Config,

    /// Print version information
    Version,
}

fn load(args: &Args) -> Result<TickflowConfig> {
    let mut config = match &args.config {
        Some(path) => config::load_config(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => config::load_user_config().context("Failed to load user config")?,
    };
    config.apply_env()?;
    if args.verbose {
        config.log.level = LogLevel::Debug;
    }
    Ok(config)
}

fn main() -> Result<()> {
    let args = Args::parse();
    let mut config = load(&args)?;
    logger::init_with_level(config.log.level);

    match args.command {
        Commands::Demo {
            ticks,
            tick_ms,
            time_scale,
        } => {
            if let Some(ticks) = ticks {
                config.host.max_ticks = ticks;
            }
            if let Some(tick_ms) = tick_ms {
                config.host.tick_interval_ms = tick_ms;
            }
            if let Some(scale) = time_scale {
                config.scheduler.time_scale = scale;
            }
            config.validate()?;
            run_demo(&config)?;
        }
        Commands::Config => {
            let text = toml::to_string_pretty(&config).context("Failed to render config")?;
            println!("{}", text);
        }
        Commands::Version => {
            println!("{} {}", NAME, VERSION);
        }
    }

    Ok(())
}

fn run_demo(config: &TickflowConfig) -> Result<()> {
    let scheduler = Scheduler::with_config(config.scheduler.clone())?;
    let phases = config.host.phase_ids()?;
    let end_phase = phases.last().cloned();
    let mut host = HostLoop::new(scheduler, phases, config.host.tick_interval());

    let asset_ready = Arc::new(AtomicBool::new(false));
    let flag = asset_ready.clone();

    let scheduler = host.scheduler_mut();
    let loader = scheduler.start_with(
        Sequence::named("loader")
            .run(|cx| {
                info!(tick = cx.tick(), "loading asset");
                Ok(())
            })
            .wait(Duration::from_millis(200))
            .run(move |cx| {
                flag.store(true, Ordering::Release);
                info!(tick = cx.tick(), "asset loaded");
                Ok(())
            }),
        RoutineOptions::new().name("loader").unique(),
    );

    scheduler.start_with(
        Sequence::named("presenter")
            .wait_until(asset_ready)
            .run(|cx| {
                info!(tick = cx.tick(), "presenting asset");
                Ok(())
            })
            .then_yield(move |_| match end_phase {
                Some(phase) => tickflow::Directive::PhaseBarrier(phase),
                None => tickflow::Directive::Continue,
            })
            .run(|cx| {
                let phase = cx.phase().map(PhaseId::as_str).unwrap_or("ordinary");
                info!(phase, "presented");
                Ok(())
            }),
        RoutineOptions::new().name("presenter"),
    );

    scheduler.start_with(
        Sequence::named("flaky")
            .call(|| Sequence::named("fetch").yield_now().fail("connection reset"))
            .run(|_| {
                info!("flaky routine continued after its fetch failed");
                Ok(())
            }),
        RoutineOptions::new()
            .name("flaky")
            .on_failure(|error| warn!(%error, "routine failure")),
    );

    scheduler.start_with(
        Sequence::named("follower")
            .wait_for(loader)
            .wait_realtime(Duration::from_millis(50))
            .run(|_| {
                info!("follower done");
                Ok(())
            }),
        RoutineOptions::new().name("follower"),
    );

    let ran = host.run_until_idle(config.host.max_ticks);
    let stats = host.scheduler().stats();
    info!(
        ticks = ran,
        started = stats.started,
        completed = stats.completed,
        aborted = stats.aborted,
        failed = stats.failed,
        "demo finished"
    );
    if !host.scheduler().is_empty() {
        warn!(live = host.scheduler().len(), "stopping routines still running");
        host.scheduler_mut().stop_all();
        host.scheduler_mut().sweep();
    }
    Ok(())
}
