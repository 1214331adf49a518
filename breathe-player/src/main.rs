//! Breathing exercise player (breathe-player) - Main entry point
//!
//! Loads a plan file and plays it in the terminal. Sound cues are logged.
//! Commands are read from stdin, one per line:
//! - `p` pause after the current phase
//! - `r` resume
//! - `u` reload the plan file and resume with it
//! - `s` skip the current hold
//! - `q` stop

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use breathe_common::config::ConfigResolver;
use breathe_common::events::BreathEvent;
use breathe_common::human_time::format_duration_ms;
use breathe_common::PlayStatus;
use breathe_player::plan::{ExercisePlan, RandomVariation, SeededVariation, VariationSource};
use breathe_player::playback::{LogSoundPlayer, NoopWakeLock};
use breathe_player::PlaybackController;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

/// Command-line arguments for breathe-player
#[derive(Parser, Debug)]
#[command(name = "breathe-player")]
#[command(about = "Guided breathing exercise player")]
#[command(version)]
struct Args {
    /// Exercise plan file (.toml or .json)
    plan: PathBuf,

    /// Configuration file (overrides BREATHE_CONFIG)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,

    /// Seed for reproducible hold variation
    #[arg(long)]
    seed: Option<u64>,

    /// Print the generated phases without playing them
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let (config, config_source) = ConfigResolver::new(args.config.clone())
        .load_with_source()
        .context("Failed to load configuration")?;

    // Initialize tracing
    let level = args
        .log_level
        .clone()
        .unwrap_or_else(|| config.logging.level.clone());
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("breathe_player={level},breathe_common={level}").into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
    config_source.log();

    let plan = ExercisePlan::load(&args.plan)
        .with_context(|| format!("Failed to load plan {}", args.plan.display()))?;
    info!(
        "Loaded plan '{}' from {} ({} repetitions, ~{})",
        plan.name(),
        args.plan.display(),
        plan.repetitions(),
        format_duration_ms(plan.nominal_duration_ms())
    );

    if args.dry_run {
        print_preview(&plan, variation_source(args.seed));
        return Ok(());
    }

    let controller = Arc::new(PlaybackController::new(
        Arc::new(LogSoundPlayer),
        Arc::new(NoopWakeLock),
        config.playback.clone(),
    ));
    let mut events = controller.subscribe();
    let run_id = controller
        .start_with_source(plan, variation_source(args.seed))
        .await;

    tokio::spawn(read_commands(Arc::clone(&controller), args.plan.clone()));

    let ctrl_c = signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            result = &mut ctrl_c => {
                if let Err(e) = result {
                    error!("Failed to listen for Ctrl+C: {}", e);
                }
                info!("Received Ctrl+C, stopping");
                controller.stop().await;
                break;
            }
            event = events.recv() => match event {
                Ok(event) => {
                    if report_event(&event, run_id) {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Event listener lagged, {} events dropped", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    }

    info!("Exercise finished");
    Ok(())
}

fn variation_source(seed: Option<u64>) -> Box<dyn VariationSource> {
    match seed {
        Some(seed) => Box::new(SeededVariation::new(seed)),
        None => Box::new(RandomVariation::new()),
    }
}

/// Print one line per event; true once run `run_id` has ended
fn report_event(event: &BreathEvent, run_id: Uuid) -> bool {
    if event.run_id() != run_id {
        return false;
    }

    match event {
        BreathEvent::PhaseStarted { phase, .. } => {
            let rep = phase.repetition();
            println!(
                "[{}/{}] {:<16} {}",
                rep.current_repetition,
                rep.total_repetitions,
                phase.kind().to_string(),
                format_duration_ms(phase.duration_ms())
            );
            false
        }
        BreathEvent::PlayStatusChanged { new_status, .. } => {
            if *new_status != PlayStatus::Playing {
                println!("-- {}", new_status);
            }
            *new_status == PlayStatus::Stopped
        }
        BreathEvent::ExerciseCompleted { phases_played, .. } => {
            println!("-- completed after {} phases", phases_played);
            false
        }
    }
}

async fn read_commands(controller: Arc<PlaybackController>, plan_path: PathBuf) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                error!("Failed to read command: {}", e);
                break;
            }
        };

        let result = match line.trim() {
            "p" => controller.pause().await,
            "r" => controller.resume(None).await,
            "u" => match ExercisePlan::load(&plan_path) {
                Ok(plan) => controller.resume(Some(plan)).await,
                Err(e) => Err(e),
            },
            "s" => controller.skip().await,
            "q" => {
                controller.stop().await;
                Ok(())
            }
            "" => Ok(()),
            other => {
                warn!(
                    "Unknown command '{}' (p=pause r=resume u=reload s=skip q=stop)",
                    other
                );
                Ok(())
            }
        };

        if let Err(e) = result {
            warn!("Command failed: {}", e);
        }
    }
}

fn print_preview(plan: &ExercisePlan, mut source: Box<dyn VariationSource>) {
    println!(
        "{} - {} repetitions, sound '{}'",
        plan.name(),
        plan.repetitions(),
        plan.sound_choice()
    );

    let mut total_ms = 0;
    for repetition in 1..=plan.repetitions() {
        let Some(phases) = plan.steps_for_repetition(repetition, source.as_mut()) else {
            break;
        };
        for phase in phases {
            let rep = phase.repetition();
            total_ms += phase.duration_ms();
            println!(
                "  {:>3}/{:<3} part {} ({}/{})  {:<16} {}",
                rep.current_repetition,
                rep.total_repetitions,
                rep.current_part_index,
                rep.current_part_repetition,
                rep.total_part_repetitions,
                phase.kind().to_string(),
                format_duration_ms(phase.duration_ms())
            );
        }
    }

    println!(
        "Total {} (nominal {})",
        format_duration_ms(total_ms),
        format_duration_ms(plan.nominal_duration_ms())
    );
}
