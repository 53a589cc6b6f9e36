//! dialeval CLI - run automatic dialogue metrics over model outputs.

mod cli;
mod display;
mod format;

use anyhow::{bail, Context, Result};
use clap::Parser;
use dialeval_core::{MetricRegistry, RunConfig};
use dialeval_runner::{parse_config, Engine, Exporter, Interrupt, ScoreStore};
use display::ProgressRenderer;
use std::path::Path;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Args::parse();

    // Validate arguments
    if let Err(e) = args.validate() {
        bail!("{}", e);
    }

    // Initialize logging
    let level = if args.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let registry = dialeval_metrics::default_registry();
    if args.list_metrics {
        list_metrics(&registry);
        return Ok(());
    }

    match &args.config {
        Some(path) => run_evaluation(&args, path, &registry).await,
        None => {
            // validate() guarantees an output directory here
            let dir = args
                .output_dir
                .as_deref()
                .context("--summary needs --output-dir")?;
            report_scores(&args, dir)
        }
    }
}

fn list_metrics(registry: &MetricRegistry) {
    for name in registry.list() {
        println!("{}", name);
    }
}

async fn run_evaluation(args: &cli::Args, path: &Path, registry: &MetricRegistry) -> Result<()> {
    let config = RunConfig::from_file(path)
        .with_context(|| format!("Failed to load config {}", path.display()))?;
    let plan = parse_config(&config, registry).context("Invalid configuration")?;
    let output_dir = args.output_dir(&config).context(
        "No output directory: pass --output-dir or set output_dir in the configuration",
    )?;
    let exporter = Exporter::new(&output_dir).with_layout(args.layout.into());

    if args.dry_run {
        println!("{} unit(s):", plan.len());
        for unit in plan.units() {
            println!("  {} -> {}", unit, exporter.output_path(unit).display());
        }
        return Ok(());
    }

    // Set up interrupt handling
    // 1 = discard the unit being computed, 2+ = force exit
    let interrupt = Interrupt::new();
    let signal_interrupt = interrupt.clone();
    tokio::spawn(async move {
        loop {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::warn!("Cannot listen for Ctrl+C: {}", e);
                return;
            }

            if signal_interrupt.raise() == 1 {
                eprintln!("\nInterrupt received - discarding the current unit...");
                eprintln!("   (Press Ctrl+C again to exit immediately)\n");
            } else {
                eprintln!("\nForce exit requested");
                std::process::exit(130); // Standard exit code for SIGINT
            }
        }
    });

    let mut engine =
        Engine::new(plan, exporter, args.engine_config(&config)).with_interrupt(interrupt);

    // The engine is synchronous; keep it off the runtime threads
    let summary = tokio::task::spawn_blocking(move || {
        let renderer = ProgressRenderer::new();
        let result = engine.run_with_progress(|event| renderer.on_progress(&event));
        renderer.finish();
        result
    })
    .await
    .context("Evaluation task failed")?
    .context("Evaluation aborted")?;

    summary.print_summary();

    if let Some(path) = &args.report {
        summary
            .write_json(path)
            .with_context(|| format!("Failed to write run report {}", path.display()))?;
        log::info!("Run report written to {}", path.display());
    }

    if args.wants_scores() {
        report_scores(args, &output_dir)?;
    }
    Ok(())
}

/// Print and/or export the system scores recorded under `dir`.
fn report_scores(args: &cli::Args, dir: &Path) -> Result<()> {
    let store = ScoreStore::open(dir)
        .with_context(|| format!("Failed to read scores from {}", dir.display()))?;
    let table = store.summary();

    if let Some(path) = &args.summary_csv {
        std::fs::write(path, table.to_csv())
            .with_context(|| format!("Failed to write {}", path.display()))?;
        log::info!("Score table written to {}", path.display());
    }

    if !args.summary {
        return Ok(());
    }
    if store.is_empty() {
        println!("No score files in {}", dir.display());
        return Ok(());
    }

    println!();
    println!("=== System Scores ({} record(s)) ===", store.len());
    print!("{}", table);
    Ok(())
}
