//! Input resolution and output planning for `convert`.
//!
//! A literal path is converted on its own; a glob such as
//! `dumps/**/*.sql.gz` becomes a batch writing `<out>/<stem>.sql` per dump.
//! A batch is planned up front so that no output or stage file can land on
//! a dump being read, or on another dump's output.

use crate::input::dump_stem;
use crate::passes::PassSet;
use crate::pipeline::stage_paths;
use ahash::{AHashMap, AHashSet};
use std::fs;
use std::path::{Path, PathBuf};

/// What the positional argument resolved to
#[derive(Debug, PartialEq, Eq)]
pub enum Target {
    Single(PathBuf),
    Batch(Vec<PathBuf>),
}

fn has_glob_chars(path: &str) -> bool {
    path.contains(['*', '?', '['])
}

pub fn resolve_target(arg: &Path) -> anyhow::Result<Target> {
    let pattern = arg.to_string_lossy();

    if !has_glob_chars(&pattern) {
        anyhow::ensure!(arg.is_file(), "dump file does not exist: {}", arg.display());
        return Ok(Target::Single(arg.to_path_buf()));
    }

    let matches = glob::glob(&pattern)
        .map_err(|e| anyhow::anyhow!("invalid glob pattern '{}': {}", pattern, e))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| anyhow::anyhow!("cannot read {}: {}", e.path().display(), e.error()))?;

    let mut files: Vec<PathBuf> = matches.into_iter().filter(|p| p.is_file()).collect();
    anyhow::ensure!(!files.is_empty(), "no dump files match pattern: {}", pattern);
    files.sort();

    Ok(Target::Batch(files))
}

/// One dump of a batch and where its SQL goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub input: PathBuf,
    pub output: PathBuf,
}

/// Output file for `input` inside a batch output directory
pub fn output_path_for(output_dir: &Path, input: &Path) -> PathBuf {
    output_dir.join(format!("{}.sql", dump_stem(input)))
}

/// Plan a batch. Fails when two dumps share an output name, or when an
/// output or stage file would replace one of the dumps.
pub fn plan_jobs(
    inputs: Vec<PathBuf>,
    output_dir: &Path,
    stage_dir: Option<&Path>,
    passes: &PassSet,
) -> anyhow::Result<Vec<Job>> {
    let mut claimed: AHashMap<PathBuf, PathBuf> = AHashMap::new();
    let mut collisions = Vec::new();

    for input in &inputs {
        let output = output_path_for(output_dir, input);
        if let Some(first) = claimed.get(&output) {
            collisions.push(format!(
                "{} and {} both map to {}",
                first.display(),
                input.display(),
                output.display()
            ));
        } else {
            claimed.insert(output, input.clone());
        }
    }
    if !collisions.is_empty() {
        anyhow::bail!(
            "batch outputs collide (rename the dumps or convert them separately):\n  {}",
            collisions.join("\n  ")
        );
    }

    let sources: AHashSet<PathBuf> = inputs
        .iter()
        .filter_map(|p| fs::canonicalize(p).ok())
        .collect();

    let jobs: Vec<Job> = inputs
        .into_iter()
        .map(|input| Job {
            output: output_path_for(output_dir, &input),
            input,
        })
        .collect();

    for job in &jobs {
        let mut targets = vec![job.output.clone()];
        if let Some(dir) = stage_dir {
            targets.extend(stage_paths(dir, &job.input, passes));
        }
        if let Some(clobbered) = targets
            .iter()
            .find(|t| fs::canonicalize(t).is_ok_and(|c| sources.contains(&c)))
        {
            anyhow::bail!(
                "refusing to overwrite input dump {} while converting {}",
                clobbered.display(),
                job.input.display()
            );
        }
    }

    Ok(jobs)
}

/// Outcome of a batch run
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failures: Vec<(PathBuf, String)>,
}

impl BatchSummary {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn names(files: &[PathBuf]) -> Vec<String> {
        files
            .iter()
            .map(|f| f.file_name().unwrap().to_string_lossy().to_string())
            .collect()
    }

    #[test]
    fn test_literal_path() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("dump.sql");
        fs::write(&file, "").unwrap();

        assert_eq!(resolve_target(&file).unwrap(), Target::Single(file));
    }

    #[test]
    fn test_missing_literal_path() {
        let err = resolve_target(Path::new("/nonexistent/dump.sql")).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn test_glob_sorted_files_only() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.sql"), "").unwrap();
        fs::write(dir.path().join("a.sql"), "").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();
        fs::create_dir(dir.path().join("dir.sql")).unwrap();

        match resolve_target(&dir.path().join("*.sql")).unwrap() {
            Target::Batch(files) => assert_eq!(names(&files), vec!["a.sql", "b.sql"]),
            other => panic!("expected a batch, got {:?}", other),
        }
    }

    #[test]
    fn test_glob_with_single_match_is_still_a_batch() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("only.sql"), "").unwrap();

        let target = resolve_target(&dir.path().join("o*.sql")).unwrap();
        assert!(matches!(target, Target::Batch(files) if files.len() == 1));
    }

    #[test]
    fn test_glob_without_matches() {
        let dir = TempDir::new().unwrap();
        let err = resolve_target(&dir.path().join("*.sql")).unwrap_err();
        assert!(err.to_string().contains("no dump files match"));
    }

    #[test]
    fn test_output_path_for() {
        let out = output_path_for(Path::new("out"), Path::new("dumps/prod.sql.gz"));
        assert_eq!(out, PathBuf::from("out/prod.sql"));
    }

    #[test]
    fn test_plan_jobs() {
        let jobs = plan_jobs(
            vec![PathBuf::from("in/a.sql"), PathBuf::from("in/b.sql.gz")],
            Path::new("out"),
            None,
            &PassSet::all(),
        )
        .unwrap();
        assert_eq!(jobs[0].output, PathBuf::from("out/a.sql"));
        assert_eq!(jobs[1].output, PathBuf::from("out/b.sql"));
    }

    #[test]
    fn test_plan_rejects_shared_output_names() {
        let err = plan_jobs(
            vec![PathBuf::from("x/d.sql"), PathBuf::from("y/d.sql.gz")],
            Path::new("out"),
            None,
            &PassSet::all(),
        )
        .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("x/d.sql and y/d.sql.gz both map to out/d.sql"));
    }

    #[test]
    fn test_plan_rejects_output_over_input() {
        let dir = TempDir::new().unwrap();
        let dump = dir.path().join("a.sql");
        fs::write(&dump, "").unwrap();

        let err = plan_jobs(vec![dump], dir.path(), None, &PassSet::all()).unwrap_err();
        assert!(err.to_string().contains("refusing to overwrite"));
    }

    #[test]
    fn test_plan_rejects_stage_file_over_other_input() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.sql");
        let staged_name = dir.path().join("a.1-convert.sql");
        fs::write(&a, "").unwrap();
        fs::write(&staged_name, "").unwrap();
        let out = dir.path().join("out");

        let err = plan_jobs(vec![a, staged_name], &out, Some(dir.path()), &PassSet::all())
            .unwrap_err();
        assert!(err.to_string().contains("a.1-convert.sql"));
    }

    #[test]
    fn test_batch_summary() {
        let mut summary = BatchSummary::new(3);
        summary.succeeded = 2;
        summary
            .failures
            .push((PathBuf::from("bad.sql"), "unreadable".to_string()));
        assert_eq!(summary.failed(), 1);
        assert!(summary.has_failures());
    }
}
