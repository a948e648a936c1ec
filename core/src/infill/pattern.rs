//! Lazy replication of base tools across the tile grid.

use super::{GridCell, InfillError, TileGridSpec};
use crate::kernel::{GeometryKernel, KernelResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Cooperative cancellation flag shared between a caller and a running
/// lattice.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Receiver of lattice progress. `message` may contain `%v` (current value)
/// and `%m` (maximum).
pub trait ProgressSink {
    fn start(&mut self, title: &str, message: &str, max: usize);
    fn update(&mut self, value: usize);
    fn finish(&mut self);
}

/// Expand the `%v` / `%m` placeholders of a progress message.
pub fn format_progress(template: &str, value: usize, max: usize) -> String {
    template
        .replace("%v", &value.to_string())
        .replace("%m", &max.to_string())
}

/// Discards all progress.
#[derive(Debug, Default)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn start(&mut self, _title: &str, _message: &str, _max: usize) {}
    fn update(&mut self, _value: usize) {}
    fn finish(&mut self) {}
}

/// Emits progress as tracing events, at most every `every` steps.
#[derive(Debug)]
pub struct LogProgress {
    every: usize,
    message: String,
    max: usize,
}

impl LogProgress {
    pub fn new(every: usize) -> Self {
        Self {
            every: every.max(1),
            message: String::new(),
            max: 0,
        }
    }
}

impl Default for LogProgress {
    fn default() -> Self {
        Self::new(100)
    }
}

impl ProgressSink for LogProgress {
    fn start(&mut self, title: &str, message: &str, max: usize) {
        self.message = message.to_string();
        self.max = max;
        info!(title, max, "progress started");
    }

    fn update(&mut self, value: usize) {
        if value % self.every == 0 || value == self.max {
            debug!("{}", format_progress(&self.message, value, self.max));
        }
    }

    fn finish(&mut self) {
        debug!("progress finished");
    }
}

/// One translated tool, owned by whoever pulled it from the pattern.
#[derive(Debug, Clone)]
pub struct ToolCopy<S> {
    pub cell: GridCell,
    /// Index of the base tool this copy was made from.
    pub base: usize,
    pub solid: S,
}

/// Result of driving a lattice to completion or cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternOutcome {
    pub applied: usize,
    pub total: usize,
    pub cancelled: bool,
}

/// Every base tool at every grid cell, produced one copy at a time.
pub struct LatticePattern<'a, K: GeometryKernel> {
    kernel: &'a K,
    bases: &'a [K::Solid],
    grid: &'a TileGridSpec,
    next: usize,
}

impl<'a, K: GeometryKernel> LatticePattern<'a, K> {
    pub fn new(kernel: &'a K, bases: &'a [K::Solid], grid: &'a TileGridSpec) -> Self {
        Self {
            kernel,
            bases,
            grid,
            next: 0,
        }
    }

    /// Number of tool copies the full lattice produces.
    pub fn total(&self) -> usize {
        self.grid.cell_count().saturating_mul(self.bases.len())
    }

    /// Feed every copy to `apply`, checking `cancel` before each one.
    ///
    /// A cancelled run stops after the last applied copy and is not an
    /// error. A failing translation or `apply` stops the run with
    /// [`InfillError::LatticeFailed`].
    pub fn run<F>(
        mut self,
        cancel: &CancellationToken,
        progress: &mut dyn ProgressSink,
        mut apply: F,
    ) -> Result<PatternOutcome, InfillError>
    where
        F: FnMut(ToolCopy<K::Solid>) -> KernelResult<()>,
    {
        let total = self.total();
        progress.start("Infill", "Cutting tool %v of %m", total);

        let mut applied = 0;
        let mut cancelled = false;
        let result = loop {
            if cancel.is_cancelled() {
                cancelled = true;
                break Ok(());
            }
            let Some(copy) = self.next() else {
                break Ok(());
            };
            if let Err(source) = copy.and_then(&mut apply) {
                break Err(InfillError::LatticeFailed { applied, total, source });
            }
            applied += 1;
            progress.update(applied);
        };
        progress.finish();
        result?;

        if cancelled {
            info!(applied, total, "lattice cancelled");
        }
        Ok(PatternOutcome {
            applied,
            total,
            cancelled,
        })
    }
}

impl<K: GeometryKernel> Iterator for LatticePattern<'_, K> {
    type Item = KernelResult<ToolCopy<K::Solid>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.bases.is_empty() {
            return None;
        }
        let index = self.next;
        let cell = self.grid.cell(index / self.bases.len())?;
        let base = index % self.bases.len();
        self.next += 1;

        Some(
            self.kernel
                .translate(&self.bases[base], cell.translation)
                .map(|solid| ToolCopy { cell, base, solid }),
        )
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.total().saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}
