use crate::config::Config;
use crate::dispatch::{routing_table, output_name, TopicClass};
use crate::extract::{
    CameraExtractor, CloudMetaExtractor, CloudPacketExtractor, Extractor, GenericExtractor,
    LaserExtractor,
};
use crate::record::LogReader;
use crate::sink::{DbSink, FsSink, RowSink, SinkError};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::{info, warn};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

pub mod config;
pub mod decoder;
pub mod dispatch;
pub mod extract;
pub mod flatten;
pub mod reader;
pub mod record;
pub mod sink;
pub mod storage;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Failed to read summary info: {0}")]
    NoSummary(String),
    #[error("Failed to read statistics info: {0}")]
    NoStatistics(String),
    #[error("McapError. {0}")]
    Mcap(#[from] mcap::McapError),
    #[error("IO error. {0}")]
    Io(#[from] std::io::Error),
    #[error("Sink error. {0}")]
    Sink(#[from] SinkError),
    /// Recoverable, per-record: the topic loop logs these and moves on.
    #[error("Failed to decode record. {0}")]
    Decode(String),
    #[error("Worker pool error. {0}")]
    Pool(String),
    #[error("Interrupted")]
    Interrupted,
}

/// What happened to one log file.
#[derive(Debug, Default)]
pub struct FileReport {
    pub extracted: Vec<String>,
    pub skipped: Vec<String>,
    pub records: u64,
    pub bad_records: u64,
}

pub struct FileOutcome {
    pub file: PathBuf,
    pub result: Result<FileReport, Error>,
}

fn progress_style() -> ProgressStyle {
    ProgressStyle::with_template("[{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} {msg}")
        .expect("Progress template should be valid")
        .progress_chars("##-")
}

/// Extract every routed topic of one log into `out_dir`.
///
/// A topic whose output file already exists is skipped outright; that file's
/// existence is the only resumability marker, its content is never checked.
pub fn extract_log(
    reader: &dyn LogReader,
    out_dir: &Path,
    cfg: &Config,
    sink: &mut dyn RowSink,
    sigint: &AtomicBool,
    bars: &MultiProgress,
) -> Result<FileReport, Error> {
    fs::create_dir_all(out_dir)?;
    let mut report = FileReport::default();

    let topics = reader.topics()?;
    let routed = routing_table(cfg, &topics);
    info!("{} of {} topics routed for extraction", routed.len(), topics.len());

    for (topic, class) in routed {
        if sigint.load(Ordering::Relaxed) {
            return Err(Error::Interrupted);
        }

        let path = out_dir.join(output_name(&topic, class));
        if path.exists() {
            info!("Already extracted, skipping: {}", path.display());
            report.skipped.push(topic);
            continue;
        }

        let mut extractor: Box<dyn Extractor> = match class {
            TopicClass::Laser => Box::new(LaserExtractor::new(&topic, path)),
            TopicClass::CloudMeta => Box::new(CloudMetaExtractor::new(
                &topic,
                path,
                out_dir.join("velodyne_info.txt"),
            )),
            TopicClass::CloudPacket => {
                let Some(factory) = &cfg.cloud_decoder else {
                    warn!("No packet decoder configured, skipping: {}", topic);
                    report.skipped.push(topic);
                    continue;
                };
                Box::new(CloudPacketExtractor::new(
                    &topic,
                    path,
                    out_dir.join("velodyne_pointcloud"),
                    factory.create(),
                ))
            }
            TopicClass::Camera => Box::new(CameraExtractor::new(
                &topic,
                path,
                out_dir,
                cfg.rotation_for(&topic),
            )),
            TopicClass::Generic => Box::new(GenericExtractor::new(&topic, path)),
        };

        let bar = bars.add(ProgressBar::new(reader.message_count(&topic).unwrap_or(0)));
        bar.set_style(progress_style());
        bar.set_message(topic.clone());

        for item in reader.read_topic(&topic)? {
            if sigint.load(Ordering::Relaxed) {
                return Err(Error::Interrupted);
            }
            let step = item.and_then(|record| extractor.step(&record, sink));
            match step {
                Ok(()) => report.records += 1,
                Err(Error::Decode(e)) => {
                    // One bad record must not void the topic.
                    warn!("Bad record on {}: {}", topic, e);
                    report.bad_records += 1;
                }
                Err(e) => return Err(e),
            }
            bar.inc(1);
        }
        extractor.finish(sink)?;
        bar.finish_and_clear();
        report.extracted.push(topic);
    }

    Ok(report)
}

/// Open one log file, pick the configured sink, and extract it into its own
/// output directory (`{file stem}/` next to the input, or under
/// `cfg.output_dir`).
pub fn process_one(
    file: &Path,
    cfg: &Config,
    sigint: &AtomicBool,
    bars: &MultiProgress,
) -> Result<FileReport, Error> {
    let started = Instant::now();
    let reader = reader::McapReader::open(file)?;

    let out_dir = match (&cfg.output_dir, file.file_stem()) {
        (Some(base), Some(stem)) => base.join(stem),
        _ => file.with_extension(""),
    };

    let mut sink: Box<dyn RowSink> = match &cfg.database {
        Some(db) => Box::new(DbSink::open(db)?),
        None => Box::new(FsSink::new()),
    };

    let report = extract_log(&reader, &out_dir, cfg, sink.as_mut(), sigint, bars)?;
    sink.finish()?;

    info!(
        "Finished {} in {:.1}s: {} topics extracted, {} skipped",
        file.display(),
        started.elapsed().as_secs_f32(),
        report.extracted.len(),
        report.skipped.len()
    );
    Ok(report)
}

/// Worker count for the file-level fan-out. SQLite allows a single writer
/// and every worker holds a file-long write transaction, so database runs
/// are forced onto one worker.
fn worker_count(cfg: &Config) -> usize {
    if cfg.database.is_some() {
        if cfg.jobs != 1 {
            info!("Database output allows one writer, processing files sequentially");
        }
        return 1;
    }
    cfg.jobs
}

/// Fan out over the input files with a bounded worker pool. Each file is
/// owned by exactly one worker; every file gets its own outcome so one
/// failure never swallows the rest of the batch.
pub fn process_files(
    files: &[PathBuf],
    cfg: &Config,
    sigint: Arc<AtomicBool>,
    bars: &MultiProgress,
) -> Vec<FileOutcome> {
    let pool = match rayon::ThreadPoolBuilder::new()
        .num_threads(worker_count(cfg))
        .build()
    {
        Ok(pool) => pool,
        Err(e) => {
            return files
                .iter()
                .map(|f| FileOutcome {
                    file: f.clone(),
                    result: Err(Error::Pool(e.to_string())),
                })
                .collect()
        }
    };

    pool.install(|| {
        files
            .par_iter()
            .map(|file| FileOutcome {
                file: file.clone(),
                result: process_one(file, cfg, &sigint, bars),
            })
            .collect()
    })
}
