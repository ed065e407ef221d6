use bagcap::config::Config;
use bagcap::{process_files, reader};
use clap::Parser;
use env_logger::Env;
use indicatif::MultiProgress;
use log::{error, info, warn};
use std::sync::atomic::AtomicBool;
use std::{env, fs, path::PathBuf, process::exit, sync::Arc};

#[derive(Parser, Debug)]
#[command(version, about, long_about = "Extract sensor topics from robot log files.")]
struct Cli {
    /// Input MCAP file, or a directory holding MCAP files. Defaults to the
    /// current directory.
    input: Option<PathBuf>,

    /// Output directory path. Defaults to a per-file directory next to each input.
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Skip camera topics entirely.
    #[arg(long, default_value_t = false)]
    skip_cameras: bool,

    /// Mirror extracted rows into this SQLite database instead of per-topic files.
    #[arg(long)]
    database: Option<PathBuf>,

    /// Number of files processed in parallel. 0 means one worker per CPU core.
    #[arg(short, long, default_value_t = 0)]
    jobs: usize,
}

/// Resolve the input argument: a single file is taken as-is, a directory is
/// scanned for MCAP files, sorted by name.
fn find_inputs(input: &Option<PathBuf>) -> Result<Vec<PathBuf>, String> {
    let input_dir = match input {
        Some(path) if path.is_file() => return Ok(vec![path.clone()]),
        Some(dir) => dir.clone(),
        None => env::current_dir().map_err(|e| format!("Failed to get current dir: {}", e))?,
    };
    if !input_dir.exists() {
        return Err(format!("Input directory not found: {}", input_dir.display()));
    }

    let entries =
        fs::read_dir(&input_dir).map_err(|e| format!("Failed to read directory: {}", e))?;
    let mut files: Vec<PathBuf> = entries
        .filter_map(|f| f.ok().map(|f| f.path()))
        .filter(|f| f.is_file() && f.extension().is_some_and(|f| f.eq("mcap")))
        .collect();
    files.sort();
    Ok(files)
}

fn main() {
    // Logger setup
    let log_env = Env::default().filter_or("LOG_LEVEL", "info");
    env_logger::init_from_env(log_env);

    // Catch SIGINT
    let sigint = Arc::new(AtomicBool::new(false));
    let handler_sigint = sigint.clone();
    ctrlc::set_handler(move || {
        warn!("received Ctrl+C! Mission aborted by user.");
        handler_sigint.store(true, std::sync::atomic::Ordering::Relaxed);
    })
    .expect("Error setting Ctrl-C handler");

    // Parse user args
    let cli = Cli::parse();

    // Prepare inputs
    let files = match find_inputs(&cli.input) {
        Ok(f) => f,
        Err(e) => {
            error!("{}", e);
            exit(1);
        }
    };
    if files.is_empty() {
        error!("No MCAP files found.");
        exit(1);
    }
    info!("Found MCAP files: {}", files.len());
    for f in files.iter() {
        info!("- {}", f.display());
    }

    // Summary this job, this will log useful info such as topics for user.
    match reader::summary(&files) {
        Ok(topics) => {
            info!("Found topics: {}", topics.len());
            for topic in topics.iter() {
                info!("- {}", topic);
            }
        }
        Err(e) => {
            error!("{}", e);
            exit(1);
        }
    }

    let cfg = Config {
        parse_cameras: !cli.skip_cameras,
        database: cli.database,
        output_dir: cli.output_dir,
        jobs: cli.jobs,
        ..Config::default()
    };

    // Process
    info!("Extracting...");
    let bars = MultiProgress::new();
    let outcomes = process_files(&files, &cfg, sigint, &bars);

    // Take aways
    let mut failures = 0;
    for outcome in outcomes.iter() {
        match &outcome.result {
            Ok(report) => {
                info!(
                    "{}: {} records, {} bad, {} topics skipped",
                    outcome.file.display(),
                    report.records,
                    report.bad_records,
                    report.skipped.len()
                );
            }
            Err(e) => {
                error!("{}: {}", outcome.file.display(), e);
                failures += 1;
            }
        }
    }
    if failures > 0 {
        warn!("Sorry, job failed for {} of {} files.", failures, outcomes.len());
        exit(1);
    }
    info!("Done.");
}
