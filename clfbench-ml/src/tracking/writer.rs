//! File-backed tracking sink: one `run_<timestamp>` directory per run.

use crate::error::MlError;
use crate::tracking::{Figure, TrackingSink};
use chrono::{Local, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub const SCALARS_FILE: &str = "scalars.jsonl";
pub const FIGURES_FILE: &str = "figures.jsonl";
pub const FIGURES_DIR: &str = "figures";

/// One line of `scalars.jsonl`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalarRecord {
    pub tag: String,
    pub step: u64,
    pub value: f64,
    /// Seconds since the Unix epoch.
    pub wall_time: f64,
}

/// One line of `figures.jsonl`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FigureRecord {
    pub tag: String,
    pub step: u64,
    pub title: String,
    /// Path of the SVG file relative to the run directory.
    pub path: PathBuf,
    pub wall_time: f64,
}

fn wall_time() -> f64 {
    Utc::now().timestamp_millis() as f64 / 1000.0
}

/// `Confusion_Matrix/Naive Bayes` -> `Confusion_Matrix_Naive_Bayes`.
fn sanitize_tag(tag: &str) -> String {
    tag.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}

/// Writes scalars and figures of one run below `<log_dir>/run_<YYYYmmdd-HHMMSS>`.
pub struct RunWriter {
    dir: PathBuf,
    scalars: BufWriter<File>,
    figures: BufWriter<File>,
    closed: bool,
}

impl RunWriter {
    /// Create a fresh run directory under `log_dir`. A numeric suffix is added
    /// when a run with the same timestamp already exists.
    pub fn create(log_dir: &Path) -> Result<Self, MlError> {
        std::fs::create_dir_all(log_dir)?;
        let base = format!("run_{}", Local::now().format("%Y%m%d-%H%M%S"));

        let mut dir = log_dir.join(&base);
        let mut attempt = 1;
        loop {
            match std::fs::create_dir(&dir) {
                Ok(()) => break,
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    dir = log_dir.join(format!("{base}_{attempt}"));
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
        std::fs::create_dir(dir.join(FIGURES_DIR))?;

        let open = |name: &str| -> Result<BufWriter<File>, MlError> {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(dir.join(name))?;
            Ok(BufWriter::new(file))
        };
        let scalars = open(SCALARS_FILE)?;
        let figures = open(FIGURES_FILE)?;

        tracing::info!(run_dir = %dir.display(), "Created tracking run directory");
        Ok(Self {
            dir,
            scalars,
            figures,
            closed: false,
        })
    }

    /// The run directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn ensure_open(&self) -> Result<(), MlError> {
        if self.closed {
            return Err(MlError::tracking(format!(
                "run {} is closed",
                self.dir.display()
            )));
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), MlError> {
        self.scalars.flush()?;
        self.figures.flush()?;
        Ok(())
    }
}

impl TrackingSink for RunWriter {
    fn add_scalar(&mut self, tag: &str, value: f64, step: u64) -> Result<(), MlError> {
        self.ensure_open()?;
        let record = ScalarRecord {
            tag: tag.to_string(),
            step,
            value,
            wall_time: wall_time(),
        };
        serde_json::to_writer(&mut self.scalars, &record)?;
        self.scalars.write_all(b"\n")?;
        Ok(())
    }

    fn add_figure(&mut self, tag: &str, figure: &Figure, step: u64) -> Result<(), MlError> {
        self.ensure_open()?;
        let relative = Path::new(FIGURES_DIR).join(format!("{}_step{step}.svg", sanitize_tag(tag)));
        std::fs::write(self.dir.join(&relative), figure.svg())?;

        let record = FigureRecord {
            tag: tag.to_string(),
            step,
            title: figure.title.clone(),
            path: relative,
            wall_time: wall_time(),
        };
        serde_json::to_writer(&mut self.figures, &record)?;
        self.figures.write_all(b"\n")?;
        Ok(())
    }

    fn close(&mut self) -> Result<(), MlError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.flush()?;
        tracing::debug!(run_dir = %self.dir.display(), "Closed tracking run");
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Drop for RunWriter {
    fn drop(&mut self) {
        if !self.closed {
            let _ = self.flush();
        }
    }
}

/// Read every scalar record of a run directory.
pub fn read_scalars(run_dir: &Path) -> Result<Vec<ScalarRecord>, MlError> {
    read_jsonl(&run_dir.join(SCALARS_FILE))
}

/// Read every figure record of a run directory.
pub fn read_figures(run_dir: &Path) -> Result<Vec<FigureRecord>, MlError> {
    read_jsonl(&run_dir.join(FIGURES_FILE))
}

fn read_jsonl<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>, MlError> {
    let content = std::fs::read_to_string(path)?;
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).map_err(MlError::from))
        .collect()
}
