//! Parallel validation of independent inputs.
//!
//! Work is handed to a fixed set of scoped worker threads over a
//! `crossbeam-channel` queue. Each input gets its own `Result`, so one
//! undecodable document never aborts the rest.

use crate::checker::Checker;
use crate::report::Report;
use aipcheck_common_core::Result;
use aipcheck_common_log::spans::{batch_item_span, record_error};
use serde_json::Value;
use std::num::NonZeroUsize;
use std::thread;
use tracing::{debug, warn};

/// One document to validate.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchInput {
    /// Status payload, bare or enveloped.
    Status(Value),
    /// Revision instance or list of revisions.
    Revision(Value),
    /// Revision schema description.
    Schema(Value),
}

impl BatchInput {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Status(_) => "status",
            Self::Revision(_) => "revision",
            Self::Schema(_) => "revision_schema",
        }
    }

    fn check(&self, checker: &Checker) -> Result<Report> {
        match self {
            Self::Status(value) => checker.check_status_json(value, None),
            Self::Revision(value) => checker.check_revision_json(value),
            Self::Schema(value) => checker.check_revision_schema_json(value),
        }
    }
}

/// Fans a batch out over worker threads.
pub struct BatchRunner<'c> {
    checker: &'c Checker,
    workers: usize,
}

impl<'c> BatchRunner<'c> {
    /// One worker per available core.
    pub fn new(checker: &'c Checker) -> Self {
        let workers = thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1);
        Self { checker, workers }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    fn check_one(&self, index: usize, input: &BatchInput) -> Result<Report> {
        let span = batch_item_span(index, input.kind());
        let _guard = span.enter();
        let result = input.check(self.checker);
        if let Err(e) = &result {
            record_error(e);
        }
        result
    }

    /// Validate every input. Results are in input order.
    pub fn run(&self, inputs: &[BatchInput]) -> Vec<Result<Report>> {
        if inputs.is_empty() {
            return Vec::new();
        }
        let workers = self.workers.min(inputs.len());

        let (task_tx, task_rx) = crossbeam_channel::unbounded::<(usize, &BatchInput)>();
        let (result_tx, result_rx) = crossbeam_channel::unbounded::<(usize, Result<Report>)>();
        for task in inputs.iter().enumerate() {
            // The receiver is held below, so the queue cannot be disconnected.
            let _ = task_tx.send(task);
        }
        drop(task_tx);

        thread::scope(|scope| {
            for worker in 0..workers {
                let rx = task_rx.clone();
                let tx = result_tx.clone();
                let spawned = thread::Builder::new()
                    .name(format!("aipcheck-worker-{worker}"))
                    .spawn_scoped(scope, move || {
                        for (index, input) in rx.iter() {
                            if tx.send((index, self.check_one(index, input))).is_err() {
                                break;
                            }
                        }
                    });
                if let Err(e) = spawned {
                    warn!(worker, error = %e, "failed to spawn batch worker");
                }
            }
        });

        // Anything left over had no worker to run it.
        for (index, input) in task_rx.try_iter() {
            let _ = result_tx.send((index, self.check_one(index, input)));
        }
        drop(result_tx);

        let mut results: Vec<(usize, Result<Report>)> = result_rx.iter().collect();
        results.sort_by_key(|(index, _)| *index);
        debug!(inputs = inputs.len(), workers, "batch completed");
        results.into_iter().map(|(_, result)| result).collect()
    }
}
