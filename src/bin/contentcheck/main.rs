use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::thread;

use anyhow::Result;
use clap::Parser;
use spdlog::{debug, info, warn};

use contentcheck::config::DEFAULT_POSTS_DIR;
use contentcheck::logger::configure_logger;
use contentcheck::report::EXIT_FATAL;
use contentcheck::{load_all_concurrent, Cancellation, LoadOptions, Report, ReportFormat};

use crate::config::open_config;

mod config;

const CFG_FILE_NAME: &str = "contentcheck.toml";

/// Checks front matter and cross links of a markdown posts directory
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Posts directory. Defaults to paths.posts_dir from the config, then content/posts
    root_dir: Option<PathBuf>,

    /// Report format
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    format: ReportFormat,

    /// Config path
    #[arg(short, long)]
    config_path: Option<PathBuf>,

    /// Regex matching the marker between posts bundled in one file
    #[arg(short, long)]
    separator: Option<String>,

    /// Number of files parsed in parallel
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Fail the run on warnings too
    #[arg(long)]
    deny_warnings: bool,
}

fn default_jobs() -> usize {
    thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

async fn run(args: Args) -> Result<i32> {
    let (mut config, config_path) = open_config(args.config_path)?;

    if let Err(err) = configure_logger(config.log.as_ref()) {
        eprintln!("Error creating logger sinks. Using defaults instead. Desc={}", err);
    }

    match config_path {
        Some(path) => info!("Configuration read from {}", path.display()),
        None => debug!("No configuration file found, using defaults"),
    }

    if let Some(separator) = args.separator {
        config.separator.pattern = separator;
    }

    let root = args.root_dir
        .or_else(|| config.paths.posts_dir.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_POSTS_DIR));
    let options = LoadOptions::from_config(&config)?;
    let jobs = args.jobs.or(config.run.jobs).unwrap_or_else(default_jobs);

    info!("Checking {} with {} workers", root.display(), jobs);

    let cancel = Cancellation::default();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, finishing files in progress");
            on_interrupt.cancel();
        }
    });

    let outcome = load_all_concurrent(&root, Arc::new(options), jobs, cancel).await?;
    let report = Report::build(&root, outcome);

    let rendered = report.render(args.format)?;
    println!("{}", rendered.trim_end());

    Ok(report.exit_code(args.deny_warnings))
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    match run(args).await {
        Ok(code) => ExitCode::from(code as u8),
        Err(err) => {
            eprintln!("{:#}", err);
            eprintln!("Please run contentcheck --help");
            ExitCode::from(EXIT_FATAL as u8)
        }
    }
}
