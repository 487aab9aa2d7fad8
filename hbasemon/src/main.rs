use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Context;
use clap::Parser;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use hbasemon::capture::{self, CaptureLimits, Pipeline};
use hbasemon::cli::Cli;
use hbasemon::error::HbasemonError;
use hbasemon::evict::Evictor;
use hbasemon::sink::{LogSink, Sink, table::TableSink};
use hbasemon::source::Source;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(error) => {
            // --help and --version land here too; only real argument
            // errors exit nonzero.
            let is_error = error.use_stderr();
            let _ = error.print();
            return if is_error {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            error!("{error:#}");
            ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let ports = cli.ports();
    let limits = CaptureLimits {
        count: cli.count,
        duration: cli.duration(),
    };
    let mut sink = make_sink(&cli)?;
    let files = cli.files.clone();
    let interface = cli.interface.clone();

    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = Arc::clone(&cancel);
        tokio::spawn(async move {
            if signal::ctrl_c().await.is_ok() {
                info!("interrupt received, stopping capture");
                cancel.store(true, Ordering::Relaxed);
            }
        });
    }

    // The capture loop is synchronous and blocking by design; it runs on a
    // blocking thread and observes the cancel flag on every read timeout.
    tokio::task::spawn_blocking(move || -> Result<(), HbasemonError> {
        let evictor = Evictor::new();
        if files.is_empty() {
            let mut source = Source::live(interface.as_deref(), &ports)?;
            let mut pipeline = Pipeline::new(ports.iter().copied());
            capture::run(
                &mut source,
                &mut pipeline,
                sink.as_mut(),
                &evictor,
                limits,
                &cancel,
            )?;
        } else {
            for file in &files {
                let mut source = Source::offline(file, &ports)?;
                let mut pipeline = Pipeline::new(ports.iter().copied());
                capture::run(
                    &mut source,
                    &mut pipeline,
                    sink.as_mut(),
                    &evictor,
                    limits,
                    &cancel,
                )?;
                if cancel.load(Ordering::Relaxed) {
                    break;
                }
            }
        }
        sink.close()?;
        Ok(())
    })
    .await
    .context("capture task panicked")??;

    Ok(())
}

fn make_sink(cli: &Cli) -> anyhow::Result<Box<dyn Sink + Send>> {
    if let Some(kafka) = cli.kafka()? {
        #[cfg(feature = "kafka")]
        {
            use hbasemon::sink::kafka::KafkaSink;
            return Ok(Box::new(KafkaSink::new(&kafka.servers, &kafka.topic)?));
        }
        #[cfg(not(feature = "kafka"))]
        {
            let _ = kafka;
            anyhow::bail!("this build has no kafka support; rebuild with --features kafka");
        }
    }
    if cli.verbose {
        Ok(Box::new(LogSink))
    } else {
        Ok(Box::new(TableSink::new()))
    }
}
