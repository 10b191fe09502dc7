use crate::{
    commands::{Commands, JobArgs, SinkKind, TransformKind},
    error::CliError,
    shutdown::{ExitCode, ShutdownCoordinator},
};
use clap::Parser;
use engine_config::settings::{EngineSettings, SinkSettings, overrides::SettingsOverrides};
use engine_core::{
    metrics::Metrics,
    observer::{LoggingObserver, MetricsObserver, ObserverChain},
    sink::{
        RecordSink, memory::MemoryRecordStore, postgres::PostgresRecordStore,
        sled_store::SledRecordStore,
    },
};
use engine_processing::transform::{PassThrough, Transformer, enrich::PayloadEnricher};
use engine_runtime::execution::orchestrator::Orchestrator;
use model::execution::params::JobParameters;
use std::{sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod commands;
mod error;
mod output;
mod shutdown;

#[derive(Parser)]
#[command(
    name = "bulkhead",
    version,
    about = "Partitioned, fault-tolerant batch record processor"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let shutdown = ShutdownCoordinator::new(CancellationToken::new());
    shutdown.register_handlers();

    let code = match execute(cli.command, &shutdown).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "bulkhead failed");
            ExitCode::GeneralError
        }
    };
    std::process::exit(code.as_i32());
}

async fn execute(command: Commands, shutdown: &ShutdownCoordinator) -> Result<ExitCode, CliError> {
    match command {
        Commands::Run {
            job,
            sink,
            sled_path,
            pg_url,
            chunk_size,
            max_attempts,
            chunk_timeout_ms,
            transform,
            json,
        } => {
            let mut overrides = base_overrides(&job);
            if let Some(kind) = sink {
                overrides = overrides.sink(sink_settings(kind, sled_path, pg_url)?);
            }
            if let Some(chunk_size) = chunk_size {
                overrides = overrides.chunk_size(chunk_size);
            }
            if let Some(max_attempts) = max_attempts {
                overrides = overrides.max_attempts(max_attempts);
            }
            if let Some(ms) = chunk_timeout_ms {
                overrides = overrides.per_chunk_timeout(Duration::from_millis(ms));
            }
            let settings = EngineSettings::load(job.config.as_deref(), overrides)?;

            let store = open_sink(&settings.sink).await?;
            let transformer: Arc<dyn Transformer> = match transform {
                TransformKind::Enrich => Arc::new(PayloadEnricher),
                TransformKind::PassThrough => Arc::new(PassThrough),
            };

            let metrics = Metrics::new();
            let observers = ObserverChain::new()
                .with(Arc::new(LoggingObserver))
                .with(Arc::new(MetricsObserver::new(metrics.clone())));
            let orchestrator = Orchestrator::new(settings, store.clone(), transformer)
                .with_metrics(metrics.clone())
                .with_observers(observers)
                .with_cancel_token(shutdown.cancel_token());

            let result = orchestrator.run(JobParameters::new(&job.input)).await?;
            output::print_job_result(&result, json)?;

            let snapshot = metrics.snapshot();
            info!(
                sink = store.name(),
                records_processed = snapshot.records_processed,
                chunks_committed = snapshot.chunks_committed,
                failure_count = snapshot.failure_count,
                retry_count = snapshot.retry_count,
                mean_step_ms = snapshot.step_duration.mean().as_millis(),
                "Metrics"
            );

            Ok(if shutdown.is_shutdown_requested() {
                ExitCode::ShutdownRequested
            } else if result.status.is_success() {
                ExitCode::Success
            } else {
                ExitCode::JobFailed
            })
        }
        Commands::Partition { job, json } => {
            let settings = EngineSettings::load(job.config.as_deref(), base_overrides(&job))?;
            let orchestrator = Orchestrator::new(
                settings,
                Arc::new(MemoryRecordStore::new()),
                Arc::new(PassThrough),
            );
            let plan = orchestrator.plan(&JobParameters::new(&job.input)).await?;
            output::print_plan(&plan, json)?;
            Ok(ExitCode::Success)
        }
    }
}

fn base_overrides(job: &JobArgs) -> SettingsOverrides {
    match job.grid_size {
        Some(grid_size) => SettingsOverrides::new().grid_size(grid_size),
        None => SettingsOverrides::new(),
    }
}

fn sink_settings(
    kind: SinkKind,
    sled_path: Option<std::path::PathBuf>,
    pg_url: Option<String>,
) -> Result<SinkSettings, CliError> {
    Ok(match kind {
        SinkKind::Memory => SinkSettings::Memory,
        SinkKind::Sled => SinkSettings::Sled {
            path: sled_path.ok_or(CliError::MissingArgument("--sled-path"))?,
        },
        SinkKind::Postgres => SinkSettings::Postgres {
            url: pg_url.ok_or(CliError::MissingArgument("--pg-url"))?,
        },
    })
}

async fn open_sink(settings: &SinkSettings) -> Result<Arc<dyn RecordSink>, CliError> {
    let sink: Arc<dyn RecordSink> = match settings {
        SinkSettings::Memory => Arc::new(MemoryRecordStore::new()),
        SinkSettings::Sled { path } => Arc::new(SledRecordStore::open(path)?),
        SinkSettings::Postgres { url } => Arc::new(PostgresRecordStore::connect(url).await?),
    };
    info!(sink = sink.name(), "Record store ready");
    Ok(sink)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sink_flags_require_their_location() {
        let err = sink_settings(SinkKind::Sled, None, None).unwrap_err();
        assert!(matches!(err, CliError::MissingArgument("--sled-path")));

        let settings =
            sink_settings(SinkKind::Postgres, None, Some("postgres://localhost/db".into())).unwrap();
        assert_eq!(
            settings,
            SinkSettings::Postgres {
                url: "postgres://localhost/db".into()
            }
        );
    }

    #[test]
    fn cli_parses_run_arguments() {
        let cli = Cli::try_parse_from([
            "bulkhead",
            "run",
            "--input",
            "records.csv",
            "--grid-size",
            "8",
            "--sink",
            "sled",
            "--sled-path",
            "/tmp/store",
            "--transform",
            "pass-through",
        ])
        .unwrap();

        let Commands::Run {
            job,
            sink,
            transform,
            ..
        } = cli.command
        else {
            panic!("expected run");
        };
        assert_eq!(job.grid_size, Some(8));
        assert_eq!(sink, Some(SinkKind::Sled));
        assert_eq!(transform, TransformKind::PassThrough);
    }

    #[tokio::test]
    async fn opens_memory_sink_by_default() {
        let sink = open_sink(&SinkSettings::default()).await.unwrap();
        assert_eq!(sink.count().await.unwrap(), 0);
    }
}
