//! Convert command CLI handler.

use super::batch::{plan_jobs, resolve_target, BatchSummary, Job, Target};
use super::ConvertArgs;
use crate::config::Config;
use crate::error::Error;
use crate::input::Compression;
use crate::pipeline::{self, RunConfig, RunReport};
use std::path::{Path, PathBuf};

pub fn run(args: ConvertArgs) -> anyhow::Result<()> {
    let settings = build_settings(&args)?;
    let target = resolve_target(&args.file)?;

    if args.json && args.output.is_none() && !args.dry_run {
        anyhow::bail!("--json needs --output or --dry-run so the report does not mix with SQL on stdout");
    }

    match target {
        Target::Single(file) => run_single(&args, file, settings),
        Target::Batch(files) => {
            let Some(output_dir) = &args.output else {
                anyhow::bail!(
                    "Output directory required when using glob patterns. Use --output <dir>"
                );
            };
            let jobs = plan_jobs(files, output_dir, args.stage_dir.as_deref(), &settings.passes)?;
            run_batch(&args, jobs, output_dir, settings)
        }
    }
}

/// Load the config file (if any) and apply command-line overrides
fn build_settings(args: &ConvertArgs) -> anyhow::Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)
            .map_err(|e| anyhow::anyhow!("failed to load config {}: {}", path.display(), e))?,
        None => Config::default(),
    };

    if let Some(passes) = &args.passes {
        config.passes = passes.parse().map_err(|e: String| anyhow::anyhow!(e))?;
    }
    if let Some(schemas) = &args.schemas {
        config.schemas = split_list(schemas);
    }
    if let Some(mode) = &args.boolean_mode {
        config.booleans.mode = mode.parse().map_err(|e: String| anyhow::anyhow!(e))?;
    }
    if let Some(strategy) = &args.role_strategy {
        config.roles.strategy = strategy.parse().map_err(|e: String| anyhow::anyhow!(e))?;
    }
    if let Some(tables) = &args.role_tables {
        config.roles.tables = split_list(tables);
    }
    if let Some(column) = &args.role_column {
        config.roles.column = column.trim().to_string();
    }
    if let Some(policy) = &args.on_unterminated {
        config.unterminated = policy.parse().map_err(|e: String| anyhow::anyhow!(e))?;
    }

    config.validate()?;
    Ok(config)
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn run_single(args: &ConvertArgs, file: PathBuf, settings: Config) -> anyhow::Result<()> {
    announce(&file, args);

    let report = pipeline::run(RunConfig {
        input: file,
        output: args.output.clone(),
        stage_dir: args.stage_dir.clone(),
        dry_run: args.dry_run,
        progress: args.progress && !args.json,
        settings,
    })?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_stats(&report, args.progress || args.output.is_some(), args.dry_run);
    }

    if args.strict && report.warning_count > 0 {
        return Err(Error::Strict(report.warning_count).into());
    }

    Ok(())
}

fn run_batch(
    args: &ConvertArgs,
    jobs: Vec<Job>,
    output_dir: &Path,
    settings: Config,
) -> anyhow::Result<()> {
    let mut summary = BatchSummary::new(jobs.len());
    let mut reports = Vec::new();

    if !args.dry_run {
        std::fs::create_dir_all(output_dir)?;
    }

    eprintln!("Converting {} dumps ({})...\n", jobs.len(), settings.passes);

    for (idx, job) in jobs.iter().enumerate() {
        eprintln!("[{}/{}] Converting: {}", idx + 1, summary.total, job.input.display());

        let run_config = RunConfig {
            input: job.input.clone(),
            output: Some(job.output.clone()),
            stage_dir: args.stage_dir.clone(),
            dry_run: args.dry_run,
            progress: false,
            settings: settings.clone(),
        };

        match pipeline::run(run_config) {
            Ok(report) => {
                let warning_str = if report.warning_count == 0 {
                    String::new()
                } else {
                    format!(" ({} warnings)", report.warning_count)
                };
                let inserts = report
                    .stats
                    .convert
                    .as_ref()
                    .map(|c| c.rows_converted)
                    .unwrap_or(0);
                eprintln!(
                    "  {:.2} MB → {} INSERTs, {} roles replaced{}",
                    report.bytes_in as f64 / (1024.0 * 1024.0),
                    inserts,
                    report.stats.roles_replaced,
                    warning_str
                );
                if !args.dry_run {
                    eprintln!("  → {}", job.output.display());
                }
                eprintln!();

                if args.strict && report.warning_count > 0 {
                    summary.failures.push((
                        job.input.clone(),
                        format!("{} warnings in strict mode", report.warning_count),
                    ));
                } else {
                    summary.succeeded += 1;
                }
                reports.push(report);
            }
            Err(e) => {
                eprintln!("  Error: {}\n", e);
                summary.failures.push((job.input.clone(), e.to_string()));
            }
        }

        if args.fail_fast && summary.has_failures() {
            break;
        }
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    }

    eprintln!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    eprintln!("Conversion Summary:");
    eprintln!("  Total files: {}", summary.total);
    eprintln!("  Succeeded: {}", summary.succeeded);
    eprintln!("  Failed: {}", summary.failed());

    if summary.has_failures() {
        eprintln!();
        eprintln!("Failed files:");
        for (path, error) in &summary.failures {
            eprintln!("  - {}: {}", path.display(), error);
        }
        anyhow::bail!("{} of {} dumps failed", summary.failed(), summary.total);
    }

    Ok(())
}

fn announce(file: &Path, args: &ConvertArgs) {
    if args.json || !(args.progress || args.dry_run) {
        return;
    }
    let compression = Compression::from_path(file);
    if compression != Compression::None {
        eprintln!("Detected compression: {}", compression);
    }
    eprintln!("Converting: {}", file.display());
}

fn print_stats(report: &RunReport, verbose: bool, dry_run: bool) {
    if verbose || dry_run {
        let stats = &report.stats;
        eprintln!();
        eprintln!("Conversion Statistics:");
        eprintln!("  Passes: {}", report.passes);
        if let Some(c) = &stats.convert {
            eprintln!("  Lines read: {}", c.lines_read);
            eprintln!("  COPY blocks converted: {}", c.blocks_converted);
            eprintln!("  COPY blocks aborted: {}", c.blocks_aborted);
            eprintln!("  INSERT statements: {}", c.rows_converted);
            eprintln!("  Lines passed through: {}", c.lines_passed_through);
            eprintln!("  Lines dropped: {}", c.lines_dropped);
        }
        eprintln!("  Schema prefixes stripped: {}", stats.identifiers_stripped);
        eprintln!("  Boolean literals rewritten: {}", stats.booleans_rewritten);
        eprintln!(
            "  Role values replaced: {} of {}",
            stats.roles_replaced, stats.roles_checked
        );
        for path in &report.stage_files {
            eprintln!("  Stage: {}", path.display());
        }
    }

    if report.warning_count > 0 {
        eprintln!();
        eprintln!("Warnings ({}):", report.warning_count);
        for warning in &report.warnings {
            eprintln!("  ⚠ {}", warning);
        }
        if report.warnings_truncated {
            eprintln!("  ... (additional warnings truncated)");
        }
    }

    if dry_run {
        eprintln!();
        eprintln!("(Dry run - no output written)");
    }
}
