//! fs-workqueue - filesystem work queue administration
//!
//! Entry point for the CLI application.

use anyhow::{Context, Result};
use clap::Parser;
use fs_workqueue::config::{
    CliArgs, Command, OutputFormat, PathSource, PopulateConfig, StatusConfig,
};
use fs_workqueue::index::IndexStore;
use fs_workqueue::progress::{print_header, print_populate_summary, print_status, ProgressReporter};
use fs_workqueue::queue::{LocalWorkQueue, WorkQueue};
use fs_workqueue::status::WorkspaceStatus;
use fs_workqueue::workspace::Workspace;
use std::fs::File;
use std::io::BufReader;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    // Parse CLI arguments
    let args = CliArgs::parse();

    // Setup logging
    setup_logging(args.verbose, args.quiet)?;

    let workspace = args
        .workspace
        .clone()
        .context("No workspace given: pass --workspace or set WORKQUEUE_WORKSPACE")?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    match args.command {
        Command::Populate {
            input,
            group_size,
            exclude_patterns,
            compression_level,
        } => {
            let config = PopulateConfig::from_populate_args(
                &workspace,
                &input,
                group_size,
                &exclude_patterns,
                compression_level,
                args.quiet,
            )
            .context("Invalid configuration")?;
            runtime.block_on(run_populate(config, &input))
        }

        Command::Status {
            watch,
            interval,
            format,
            lease_timeout,
        } => {
            let config =
                StatusConfig::from_status_args(&workspace, watch, interval, format, lease_timeout);
            runtime.block_on(run_status(config))
        }
    }
}

async fn run_populate(config: PopulateConfig, input: &str) -> Result<()> {
    let start = Instant::now();

    if config.show_progress {
        print_header(&config.queue.workspace, input, config.group_size);
    }

    let reporter = config.show_progress.then(ProgressReporter::new);
    if let Some(ref reporter) = reporter {
        reporter.set_status("Reading paths...");
    }

    let (paths, excluded) = match &config.source {
        PathSource::Stdin => config.collect_paths(std::io::stdin().lock())?,
        PathSource::File(path) => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open path list '{}'", path.display()))?;
            config.collect_paths(BufReader::new(file))?
        }
    };
    info!("Read {} paths ({} excluded)", paths.len(), excluded);

    if let Some(ref reporter) = reporter {
        reporter.set_status(&format!("Grouping {} paths...", paths.len()));
    }

    let queue = LocalWorkQueue::with_config(&config.queue)?;
    let result = queue.populate(paths, config.group_size).await;

    if let Some(reporter) = reporter {
        reporter.finish_and_clear();
    }
    let summary = result?;

    if config.show_progress {
        print_populate_summary(
            &summary,
            excluded,
            start.elapsed(),
            queue.index_store().size_on_disk(),
        );
    }

    Ok(())
}

async fn run_status(config: StatusConfig) -> Result<()> {
    // Ctrl+C only matters while watching
    let shutdown = Arc::new(AtomicBool::new(false));
    if config.watch {
        let shutdown_clone = shutdown.clone();
        ctrlc::set_handler(move || {
            if shutdown_clone.load(Ordering::Relaxed) {
                eprintln!("\nForce shutdown!");
                std::process::exit(130);
            }
            shutdown_clone.store(true, Ordering::SeqCst);
        })?;
    }

    let workspace = Workspace::at(&config.workspace);
    let store = IndexStore::new(workspace.index_path());

    loop {
        let status =
            WorkspaceStatus::gather(workspace.clone(), store.clone(), config.lease_timeout).await?;

        match config.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&status)?),
            OutputFormat::Text => print_status(&status, config.watch),
        }

        if !config.watch || wait_or_shutdown(config.interval, &shutdown).await {
            break;
        }
    }

    Ok(())
}

/// Sleep for `interval`; true if shutdown was requested meanwhile
async fn wait_or_shutdown(interval: Duration, shutdown: &AtomicBool) -> bool {
    let deadline = Instant::now() + interval;
    while Instant::now() < deadline {
        if shutdown.load(Ordering::Relaxed) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    shutdown.load(Ordering::Relaxed)
}

fn setup_logging(verbose: bool, quiet: bool) -> Result<()> {
    let directive = if verbose {
        "fs_workqueue=debug"
    } else if quiet {
        "fs_workqueue=warn"
    } else {
        "fs_workqueue=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(directive.parse()?))
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    Ok(())
}
