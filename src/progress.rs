// SPDX-License-Identifier: AGPL-3.0-or-later
//! Cancellable progress reporting threaded through the rasteriser and
//! pathfinder. A trait rather than a bare closure so the orchestrator can
//! hand the same sink to several pipeline stages without re-wrapping it.

use crossbeam_channel::Sender;
use std::sync::atomic::{AtomicBool, Ordering};

pub trait ProgressSink: Sync {
    /// `fraction` is in `[0, 1]`.
    fn report(&self, fraction: f64);
    fn is_cancelled(&self) -> bool;
}

/// A sink that discards progress and is never cancelled, for tests and for
/// callers that don't care about incremental feedback.
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn report(&self, _fraction: f64) {}
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// One update emitted on the orchestrator's progress channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressEvent {
    pub stage: PipelineStage,
    pub fraction: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Rasterising,
    TracingContours,
    BuildingVoronoiDiagram,
    Retracting,
    SearchingGraph,
}

/// Shares a [`crossbeam_channel::Sender`] and a cancellation flag across
/// the pipeline; cloned cheaply into every worker closure.
#[derive(Clone)]
pub struct ChannelProgress {
    stage: PipelineStage,
    sender: Sender<ProgressEvent>,
    cancel: std::sync::Arc<AtomicBool>,
}

impl ChannelProgress {
    pub fn new(
        stage: PipelineStage,
        sender: Sender<ProgressEvent>,
        cancel: std::sync::Arc<AtomicBool>,
    ) -> Self {
        Self {
            stage,
            sender,
            cancel,
        }
    }

    pub fn for_stage(&self, stage: PipelineStage) -> Self {
        Self {
            stage,
            sender: self.sender.clone(),
            cancel: self.cancel.clone(),
        }
    }
}

impl ProgressSink for ChannelProgress {
    fn report(&self, fraction: f64) {
        let _ = self.sender.send(ProgressEvent {
            stage: self.stage,
            fraction,
        });
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }
}

/// A `Clone`+`Send` handle callers use to request cancellation mid-pipeline.
#[derive(Clone, Default)]
pub struct CancellationToken(std::sync::Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self(std::sync::Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    pub(crate) fn inner(&self) -> std::sync::Arc<AtomicBool> {
        self.0.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_token_is_observed_after_cancel() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
        token.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn channel_progress_forwards_events() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let token = CancellationToken::new();
        let sink = ChannelProgress::new(PipelineStage::Rasterising, tx, token.inner());
        sink.report(0.5);
        let ev = rx.recv().unwrap();
        assert_eq!(ev.stage, PipelineStage::Rasterising);
        assert!((ev.fraction - 0.5).abs() < 1e-12);
    }
}
