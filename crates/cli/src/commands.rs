use clap::{Args, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Process an input file and write every record to the configured sink
    Run {
        #[command(flatten)]
        job: JobArgs,

        #[arg(long, value_enum, help = "Record store to write to")]
        sink: Option<SinkKind>,

        #[arg(long, help = "Directory of the sled store (with --sink sled)")]
        sled_path: Option<PathBuf>,

        #[arg(long, help = "Postgres connection string (with --sink postgres)")]
        pg_url: Option<String>,

        #[arg(long, help = "Records per chunk")]
        chunk_size: Option<usize>,

        #[arg(long, help = "Attempts per chunk before the partition fails")]
        max_attempts: Option<usize>,

        #[arg(long, help = "Abort a chunk attempt after this many milliseconds")]
        chunk_timeout_ms: Option<u64>,

        #[arg(long, value_enum, default_value_t = TransformKind::Enrich)]
        transform: TransformKind,

        #[arg(long, help = "Print the job result as JSON instead of a table")]
        json: bool,
    },
    /// Print the partition plan for an input file without processing it
    Partition {
        #[command(flatten)]
        job: JobArgs,

        #[arg(long, help = "Print the plan as JSON")]
        json: bool,
    },
}

#[derive(Args)]
pub struct JobArgs {
    #[arg(long, help = "Input CSV file (id,payload,createdAt; no header)")]
    pub input: PathBuf,

    #[arg(long, help = "Engine settings file (TOML)")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Number of partitions and concurrent workers")]
    pub grid_size: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SinkKind {
    Memory,
    Sled,
    Postgres,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TransformKind {
    /// Wrap payloads in the processed envelope
    Enrich,
    /// Write records unchanged
    PassThrough,
}
