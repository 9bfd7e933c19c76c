mod batch;
mod convert;

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pgdump2mysql")]
#[command(version)]
#[command(about = "Convert PostgreSQL COPY dumps into MySQL INSERT statements", long_about = None)]
pub struct Cli {
    /// Diagnostic log level: error, warn, info, debug, trace
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// Input dump file or glob pattern (e.g., dump.sql, dumps/*.sql.gz)
    /// Supports .gz, .bz2, .xz, .zst compression
    pub file: PathBuf,

    /// Output SQL file or directory (default: stdout for single file, required for glob)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Passes to run, comma-separated: convert, identifiers, booleans, roles (default: all)
    #[arg(long)]
    pub passes: Option<String>,

    /// YAML config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Schema qualifiers to strip (comma-separated, default: public)
    #[arg(long)]
    pub schemas: Option<String>,

    /// How boolean columns are found: infer, columns, legacy
    #[arg(long)]
    pub boolean_mode: Option<String>,

    /// How the role value is located: column, first-quoted
    #[arg(long)]
    pub role_strategy: Option<String>,

    /// Tables holding the role column (comma-separated, default: user)
    #[arg(long)]
    pub role_tables: Option<String>,

    /// Name of the role column (default: role)
    #[arg(long)]
    pub role_column: Option<String>,

    /// Rows of a COPY block without terminator: flush, discard
    #[arg(long)]
    pub on_unterminated: Option<String>,

    /// Write the output of every pass into this directory
    #[arg(long)]
    pub stage_dir: Option<PathBuf>,

    /// Strict mode: fail if any warning is produced
    #[arg(long)]
    pub strict: bool,

    /// Show progress during conversion
    #[arg(short, long)]
    pub progress: bool,

    /// Preview without writing files (dry run)
    #[arg(long)]
    pub dry_run: bool,

    /// Print the run report as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// Stop on first file that fails (for glob patterns)
    #[arg(long)]
    pub fail_fast: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert a PostgreSQL dump and apply the cleanup passes
    Convert(ConvertArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

pub fn run(cli: Cli) -> anyhow::Result<()> {
    crate::logging::init(&cli.log_level).map_err(|e| anyhow::anyhow!(e))?;

    match cli.command {
        Commands::Convert(args) => convert::run(args),
        Commands::Completions { shell } => {
            generate(shell, &mut Cli::command(), "pgdump2mysql", &mut io::stdout());
            Ok(())
        }
    }
}
