//! Cooperative cancellation and progress reporting.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::{Duration, Instant},
};

use crate::error::{PaintError, Result};

/// Items processed between two suspension points.
pub const CHECKPOINT_INTERVAL: usize = 100;
/// Time slice for stages that report on elapsed time.
pub const TIME_SLICE: Duration = Duration::from_millis(500);

/// Shared cancellation flag of one pipeline run.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Suspension point handle handed to every stage.
pub struct Progress<'a> {
    token: Option<&'a CancellationToken>,
    on_update: Option<&'a mut dyn FnMut(f64)>,
    slice_started: Instant,
}

impl<'a> Progress<'a> {
    pub fn new(
        token: Option<&'a CancellationToken>,
        on_update: Option<&'a mut dyn FnMut(f64)>,
    ) -> Self {
        Self {
            token,
            on_update,
            slice_started: Instant::now(),
        }
    }

    /// No cancellation, no reporting.
    pub fn silent() -> Progress<'static> {
        Progress {
            token: None,
            on_update: None,
            slice_started: Instant::now(),
        }
    }

    pub fn check_cancelled(&self) -> Result<()> {
        match self.token {
            Some(token) if token.is_cancelled() => Err(PaintError::Cancelled),
            _ => Ok(()),
        }
    }

    /// Reports `fraction` and checks for cancellation.
    pub fn report(&mut self, fraction: f64) -> Result<()> {
        if let Some(on_update) = self.on_update.as_deref_mut() {
            on_update(fraction.clamp(0.0, 1.0));
        }
        self.check_cancelled()
    }

    /// Suspension point every [`CHECKPOINT_INTERVAL`] items.
    pub fn checkpoint(&mut self, done: usize, total: usize) -> Result<()> {
        if done % CHECKPOINT_INTERVAL == 0 {
            let fraction = if total == 0 {
                0.0
            } else {
                done as f64 / total as f64
            };
            self.report(fraction)?;
        }
        Ok(())
    }

    /// True once per elapsed [`TIME_SLICE`], restarting the slice.
    pub fn slice_elapsed(&mut self) -> bool {
        if self.slice_started.elapsed() >= TIME_SLICE {
            self.slice_started = Instant::now();
            true
        } else {
            false
        }
    }

    pub fn complete(&mut self) -> Result<()> {
        self.report(1.0)
    }
}
