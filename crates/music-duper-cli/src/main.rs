mod commands;
mod logging;
mod progress;
mod prompt;

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use colored::*;
use commands::{Cli, Commands};
use dotenv::dotenv;
use music_duper_core::organize::SkipReason;
use music_duper_core::{AppConfig, Engine, KeepFirst, SilentReporter};
use progress::CliReporter;
use prompt::{prompt_confirm, TerminalChooser};
use tracing::{error, info, warn};

fn main() -> ExitCode {
    dotenv().ok();

    let _guard = logging::init_logger();

    let mut config = match music_duper_core::config::load_configuration() {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            return ExitCode::from(1);
        }
    };

    let args = Cli::parse();
    if let Some(db) = args.db {
        config.db_path = db;
    }
    if let Some(readers) = args.readers {
        config.readers = readers;
    }

    let command = match args.command {
        Some(command) => command,
        None => {
            let _ = Cli::command().print_long_help();
            return ExitCode::SUCCESS;
        }
    };

    match run(command, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("Error: {:#}", err);
            let inconsistent = err
                .downcast_ref::<music_duper_core::Error>()
                .map(|e| e.is_inconsistency())
                .unwrap_or(false);
            if inconsistent {
                ExitCode::from(2)
            } else {
                ExitCode::from(1)
            }
        }
    }
}

fn run(command: Commands, config: AppConfig) -> Result<()> {
    if let Commands::PrintConfig = command {
        println!("Configuration: {:?}", config);
        return Ok(());
    }

    let engine = Engine::open(config).context("opening the index")?;

    match command {
        Commands::Assemble { path } => run_assemble(&engine, &path),
        Commands::Analyze { auto } => run_analyze(&engine, auto),
        Commands::DupNuke { yes } => run_dup_nuke(&engine, yes),
        Commands::Move { dest, dry_run } => run_move(&engine, &dest, dry_run),
        Commands::Status => run_status(&engine),
        Commands::TruncateDb => {
            if prompt_confirm(
                "Are you SURE you want to COMPLETELY DELETE the index?",
                Some(false),
            )? {
                engine.truncate()?;
                println!("All tables truncated");
            }
            Ok(())
        }
        Commands::PrintConfig => Ok(()),
    }
}

fn run_assemble(engine: &Engine, path: &Path) -> Result<()> {
    let reporter = CliReporter::new();
    let report = engine.assemble(path, &reporter)?;

    println!();
    info!(
        "{} indexed, {} failed, {} ignored in {}",
        format!("{}", report.indexed).green(),
        format!("{}", report.failures.len()).red(),
        format!("{}", report.ignored).yellow(),
        format!("{:.2}s", report.duration.as_secs_f64()).green(),
    );
    info!(
        "Rejected {} non-music and {} untagged files",
        format!("{}", report.classification.not_music).red(),
        format!("{}", report.classification.missing_tags).red(),
    );
    for failure in &report.failures {
        warn!("Not indexed: {} ({})", failure.path, failure.reason);
    }
    Ok(())
}

fn run_analyze(engine: &Engine, auto: bool) -> Result<()> {
    let (exact, semantic) = if auto {
        engine.analyze(&mut KeepFirst, &CliReporter::new())?
    } else {
        // no progress bars while prompting
        engine.analyze(&mut TerminalChooser, &SilentReporter)?
    };

    for pass in [exact, semantic] {
        info!(
            "{} pass: {} clusters, {} auto, {} chosen, {} skipped, {} pruned",
            pass.pass.to_string().cyan(),
            pass.clusters,
            format!("{}", pass.auto_resolved).green(),
            format!("{}", pass.chosen).green(),
            format!("{}", pass.skipped).yellow(),
            format!("{}", pass.pruned).red(),
        );
    }
    Ok(())
}

fn run_dup_nuke(engine: &Engine, yes: bool) -> Result<()> {
    let pending = engine.index().pending_duplicates()?.len();
    if pending == 0 {
        info!("No duplicates waiting to be deleted");
        return Ok(());
    }
    let prompt = format!("Delete {} duplicate file(s) from disk?", pending);
    if !yes && !prompt_confirm(&prompt, Some(false))? {
        return Ok(());
    }

    let report = engine.dup_nuke()?;
    info!(
        "{} deleted, {} already gone, {} failed",
        format!("{}", report.deleted).red(),
        format!("{}", report.missing).yellow(),
        format!("{}", report.failed).red(),
    );
    Ok(())
}

fn run_move(engine: &Engine, dest: &Path, dry_run: bool) -> Result<()> {
    let report = engine.place(dest, dry_run, &CliReporter::new())?;

    if dry_run {
        for planned in &report.moved {
            println!("{} {} {}", planned.source, "->".dimmed(), planned.destination.green());
        }
    }
    info!(
        "{} {}, {} skipped ({} format, {} tags, {} gone, {} exists), {} failed",
        format!("{}", report.moved.len()).green(),
        if dry_run { "would move" } else { "moved" },
        format!("{}", report.skipped.len()).yellow(),
        report.skipped_for(SkipReason::UnknownFormat),
        report.skipped_for(SkipReason::MissingTags),
        report.skipped_for(SkipReason::SourceMissing),
        report.skipped_for(SkipReason::DestinationExists),
        format!("{}", report.failed).red(),
    );
    Ok(())
}

fn run_status(engine: &Engine) -> Result<()> {
    let summary = engine.summary()?;
    println!("{}", engine.config().db_path.bold());
    println!("  active            {}", summary.active.to_string().green());
    println!("  rejected (music)  {}", summary.rejected_not_music);
    println!("  rejected (tags)   {}", summary.rejected_missing_tags);
    println!(
        "  duplicates        {} ({} nuked)",
        summary.duplicates.to_string().red(),
        summary.duplicates_nuked
    );
    println!("  originals         {}", summary.originals);
    println!("  moved             {}", summary.moved.to_string().cyan());
    Ok(())
}
