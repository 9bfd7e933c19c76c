//! The composed conversion pipeline.
//!
//! `Pipeline::run` is a pure text-to-text function over a whole dump;
//! `run` adds file handling (decompression, output, stage files, progress).

use crate::config::Config;
use crate::convert::{self, ConvertStats, ConvertWarning, WarningCollector};
use crate::error::{Error, Result};
use crate::input::{dump_stem, is_same_file, read_dump};
use crate::passes::{BooleanNormalizer, IdentifierCleaner, Pass, PassOutcome, PassSet, RoleRepair};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// Statistics across all passes
#[derive(Debug, Default, Clone, Serialize)]
pub struct PipelineStats {
    /// Convert pass counters (absent when the pass did not run)
    pub convert: Option<ConvertStats>,
    pub identifiers_stripped: u64,
    pub booleans_rewritten: u64,
    pub roles_checked: u64,
    pub roles_replaced: u64,
}

/// Output of one pass, kept when stage output is requested
#[derive(Debug, Clone)]
pub struct StageOutput {
    pub pass: Pass,
    pub sql: String,
}

#[derive(Debug)]
pub struct PipelineOutput {
    pub sql: String,
    pub stages: Vec<StageOutput>,
    pub stats: PipelineStats,
    pub warnings: WarningCollector,
}

pub struct Pipeline {
    config: Config,
    identifiers: IdentifierCleaner,
    roles: RoleRepair,
    keep_stages: bool,
}

impl Pipeline {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let identifiers = IdentifierCleaner::new(&config.schemas)?;
        let roles = RoleRepair::new(&config.roles);
        Ok(Self {
            config,
            identifiers,
            roles,
            keep_stages: false,
        })
    }

    /// Keep a copy of every intermediate stage in the output
    pub fn with_stages(mut self, keep: bool) -> Self {
        self.keep_stages = keep;
        self
    }

    /// Run the selected passes over `input`, in canonical order.
    pub fn run(&self, input: &str) -> PipelineOutput {
        self.run_with_progress(input, |_| {})
    }

    /// Like [`Pipeline::run`], calling `on_pass` before each pass starts.
    pub fn run_with_progress<F: FnMut(Pass)>(&self, input: &str, mut on_pass: F) -> PipelineOutput {
        let mut stats = PipelineStats::default();
        let mut warnings = WarningCollector::new();
        let mut stages = Vec::new();
        let mut sql = input.to_string();

        for pass in self.config.passes.iter() {
            on_pass(pass);
            let outcome = self.run_pass(pass, &sql, &mut stats);
            info!(
                pass = %pass,
                rewritten = outcome.rewritten,
                warnings = outcome.warnings.len(),
                "pass complete"
            );
            warnings.extend(outcome.warnings);
            sql = outcome.sql;

            if self.keep_stages {
                stages.push(StageOutput {
                    pass,
                    sql: sql.clone(),
                });
            }
        }

        PipelineOutput {
            sql,
            stages,
            stats,
            warnings,
        }
    }

    fn run_pass(&self, pass: Pass, sql: &str, stats: &mut PipelineStats) -> PassOutcome {
        match pass {
            Pass::Convert => {
                let out = convert::convert_dump(sql, self.config.unterminated);
                let rewritten = out.stats.rows_converted;
                stats.convert = Some(out.stats);
                PassOutcome {
                    sql: out.sql,
                    rewritten,
                    checked: 0,
                    warnings: out.warnings,
                }
            }
            Pass::Identifiers => {
                let out = self.identifiers.clean(sql);
                stats.identifiers_stripped = out.rewritten;
                out
            }
            Pass::Booleans => {
                let out = BooleanNormalizer::new(&self.config.booleans).normalize(sql);
                stats.booleans_rewritten = out.rewritten;
                out
            }
            Pass::Roles => {
                let out = self.roles.repair(sql);
                stats.roles_checked = out.checked;
                stats.roles_replaced = out.rewritten;
                out
            }
        }
    }
}

/// Configuration for a file-level run
#[derive(Debug, Default)]
pub struct RunConfig {
    /// Input dump file (may be compressed)
    pub input: PathBuf,
    /// Output SQL file (None for stdout)
    pub output: Option<PathBuf>,
    /// Directory receiving one file per pass
    pub stage_dir: Option<PathBuf>,
    /// Dry run mode
    pub dry_run: bool,
    /// Show progress
    pub progress: bool,
    pub settings: Config,
}

/// Summary of a file-level run
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub input: PathBuf,
    pub output: Option<PathBuf>,
    pub passes: String,
    pub bytes_in: u64,
    pub bytes_out: u64,
    pub stats: PipelineStats,
    pub warning_count: usize,
    /// More warnings were raised than `warnings` holds
    pub warnings_truncated: bool,
    pub warnings: Vec<ConvertWarning>,
    pub stage_files: Vec<PathBuf>,
}

/// Stage file for the `idx`-th pass (0-based) of `input`
pub fn stage_path(dir: &Path, input: &Path, idx: usize, pass: Pass) -> PathBuf {
    dir.join(format!("{}.{}-{}.sql", dump_stem(input), idx + 1, pass))
}

/// Stage files written for `input` when running `passes`
pub fn stage_paths(dir: &Path, input: &Path, passes: &PassSet) -> Vec<PathBuf> {
    passes
        .iter()
        .enumerate()
        .map(|(idx, pass)| stage_path(dir, input, idx, pass))
        .collect()
}

/// Read `config.input`, run the pipeline, write the result.
///
/// Fails before reading anything when the output would replace the input.
pub fn run(config: RunConfig) -> Result<RunReport> {
    let passes = config.settings.passes.to_string();

    if let Some(output) = &config.output {
        if is_same_file(output, &config.input) {
            return Err(Error::OverwritesInput(output.clone()));
        }
    }
    let stage_files_planned = match &config.stage_dir {
        Some(dir) => stage_paths(dir, &config.input, &config.settings.passes),
        None => Vec::new(),
    };

    let pipeline = Pipeline::new(config.settings).map(|p| p.with_stages(config.stage_dir.is_some()))?;

    let progress_bar = if config.progress {
        let total = fs::metadata(&config.input).map(|m| m.len()).unwrap_or(0);
        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
        );
        pb.set_message("Reading...");
        Some(pb)
    } else {
        None
    };

    let input = match &progress_bar {
        Some(pb) => {
            let pb = pb.clone();
            read_dump(&config.input, Some(move |n| pb.set_position(n)))?
        }
        None => read_dump(&config.input, None::<fn(u64)>)?,
    };
    info!(input = %config.input.display(), bytes = input.len(), passes = %passes, "dump loaded");

    let output = pipeline.run_with_progress(&input, |pass| {
        if let Some(pb) = &progress_bar {
            pb.set_message(format!("Running {} pass...", pass));
        }
    });

    let mut stage_files = Vec::new();
    if let (Some(dir), false) = (&config.stage_dir, config.dry_run) {
        fs::create_dir_all(dir)?;
        for (path, stage) in stage_files_planned.into_iter().zip(&output.stages) {
            fs::write(&path, &stage.sql)?;
            stage_files.push(path);
        }
    }

    if !config.dry_run {
        let mut writer: Box<dyn Write> = match &config.output {
            Some(path) => {
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent)?;
                }
                Box::new(BufWriter::with_capacity(256 * 1024, File::create(path)?))
            }
            None => Box::new(BufWriter::new(std::io::stdout())),
        };
        writer.write_all(output.sql.as_bytes())?;
        writer.flush()?;
    }

    if let Some(pb) = progress_bar {
        pb.finish_with_message(format!("Applied passes: {}", passes));
    }

    Ok(RunReport {
        input: config.input,
        output: config.output,
        passes,
        bytes_in: input.len() as u64,
        bytes_out: output.sql.len() as u64,
        stats: output.stats,
        warning_count: output.warnings.count(),
        warnings_truncated: output.warnings.is_truncated(),
        warnings: output.warnings.into_warnings(),
        stage_files,
    })
}
