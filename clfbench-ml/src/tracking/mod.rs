//! Experiment-tracking sinks and figure rendering.
//!
//! A run streams scalar metrics and figures, each keyed by a tag and a step
//! index, to a [`TrackingSink`]. [`RunWriter`] persists them under a
//! run-scoped directory; [`MemorySink`] keeps them in memory.

pub mod figure;
pub mod writer;

pub use figure::{Figure, RendererConfig, render_confusion_matrix};
pub use writer::RunWriter;

use crate::error::MlError;

/// Destination for per-step scalars and figures of one run.
pub trait TrackingSink {
    fn add_scalar(&mut self, tag: &str, value: f64, step: u64) -> Result<(), MlError>;

    fn add_figure(&mut self, tag: &str, figure: &Figure, step: u64) -> Result<(), MlError>;

    /// Flush and release the sink. Later writes fail with [`MlError::Tracking`].
    fn close(&mut self) -> Result<(), MlError>;

    fn is_closed(&self) -> bool;
}

/// One recorded tracking event.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackingEvent {
    Scalar { tag: String, value: f64, step: u64 },
    Figure { tag: String, figure: Figure, step: u64 },
}

impl TrackingEvent {
    pub fn tag(&self) -> &str {
        match self {
            Self::Scalar { tag, .. } | Self::Figure { tag, .. } => tag,
        }
    }

    pub fn step(&self) -> u64 {
        match self {
            Self::Scalar { step, .. } | Self::Figure { step, .. } => *step,
        }
    }
}

/// In-memory sink (always available).
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Vec<TrackingEvent>,
    close_count: usize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[TrackingEvent] {
        &self.events
    }

    /// Value of the first scalar logged under `tag`.
    pub fn scalar(&self, tag: &str) -> Option<f64> {
        self.events.iter().find_map(|e| match e {
            TrackingEvent::Scalar { tag: t, value, .. } if t == tag => Some(*value),
            _ => None,
        })
    }

    pub fn figure(&self, tag: &str) -> Option<&Figure> {
        self.events.iter().find_map(|e| match e {
            TrackingEvent::Figure { tag: t, figure, .. } if t == tag => Some(figure),
            _ => None,
        })
    }

    /// How many times `close` was called.
    pub fn close_count(&self) -> usize {
        self.close_count
    }

    fn ensure_open(&self) -> Result<(), MlError> {
        if self.close_count > 0 {
            return Err(MlError::tracking("sink is closed"));
        }
        Ok(())
    }
}

impl TrackingSink for MemorySink {
    fn add_scalar(&mut self, tag: &str, value: f64, step: u64) -> Result<(), MlError> {
        self.ensure_open()?;
        self.events.push(TrackingEvent::Scalar {
            tag: tag.to_string(),
            value,
            step,
        });
        Ok(())
    }

    fn add_figure(&mut self, tag: &str, figure: &Figure, step: u64) -> Result<(), MlError> {
        self.ensure_open()?;
        self.events.push(TrackingEvent::Figure {
            tag: tag.to_string(),
            figure: figure.clone(),
            step,
        });
        Ok(())
    }

    fn close(&mut self) -> Result<(), MlError> {
        self.close_count += 1;
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.close_count > 0
    }
}
