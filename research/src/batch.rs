//! Concurrent fan-out of research sessions across components.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use chrono::{Local, SecondsFormat};
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, instrument, warn};

use crate::core::output::ComponentResult;
use crate::session::Researcher;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Completed,
    Failed,
}

/// What a session produced: its result record, or why it produced none.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EntryOutcome {
    Completed(ComponentResult),
    Failed { component: String, error: String },
}

/// One component's line in the batch report.
///
/// The outcome is flattened, so a completed entry carries every field of
/// the result record next to the batch bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchEntry {
    pub processing_time: f64,
    pub status: EntryStatus,
    pub timestamp: String,
    pub termination_reason: Option<String>,
    #[serde(flatten)]
    pub outcome: EntryOutcome,
}

impl BatchEntry {
    pub fn component(&self) -> &str {
        match &self.outcome {
            EntryOutcome::Completed(result) => &result.component,
            EntryOutcome::Failed { component, .. } => component,
        }
    }

    fn failed(component: String, error: String, processing_time: f64) -> Self {
        Self {
            processing_time,
            status: EntryStatus::Failed,
            timestamp: now_rfc3339(),
            termination_reason: None,
            outcome: EntryOutcome::Failed { component, error },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchMetadata {
    pub total_components: usize,
    pub successful: usize,
    pub failed: usize,
    pub processing_time: f64,
    pub timestamp: String,
}

/// Batch summary plus per-component entries in input order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport {
    pub batch_metadata: BatchMetadata,
    pub results: Vec<BatchEntry>,
}

/// Research every component with at most `max_concurrent` sessions in flight.
///
/// A permit is taken before each session is spawned and dropped when the
/// session ends. A failing or panicking session only affects its own entry.
#[instrument(skip_all, fields(components = components.len(), max_concurrent = max_concurrent))]
pub async fn run_batch(
    researcher: Arc<Researcher>,
    components: Vec<String>,
    max_concurrent: usize,
) -> Result<BatchReport> {
    if max_concurrent == 0 {
        bail!("max_concurrent must be > 0");
    }
    let started = Instant::now();
    let semaphore = Arc::new(Semaphore::new(max_concurrent));
    let mut tasks = JoinSet::new();

    for (index, component) in components.iter().cloned().enumerate() {
        let permit = semaphore
            .clone()
            .acquire_owned()
            .await
            .context("acquire session permit")?;
        let researcher = researcher.clone();
        tasks.spawn(async move {
            let _permit = permit;
            (index, run_entry(&researcher, component).await)
        });
    }

    let mut slots: Vec<Option<BatchEntry>> = vec![None; components.len()];
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, entry)) => slots[index] = Some(entry),
            Err(err) => error!(error = %err, "session task did not complete"),
        }
    }

    let results: Vec<BatchEntry> = slots
        .into_iter()
        .zip(components)
        .map(|(slot, component)| {
            slot.unwrap_or_else(|| {
                BatchEntry::failed(component, "session task panicked".to_string(), 0.0)
            })
        })
        .collect();

    let successful = results
        .iter()
        .filter(|entry| entry.status == EntryStatus::Completed)
        .count();
    let batch_metadata = BatchMetadata {
        total_components: results.len(),
        successful,
        failed: results.len() - successful,
        processing_time: started.elapsed().as_secs_f64(),
        timestamp: now_rfc3339(),
    };
    info!(
        successful,
        failed = batch_metadata.failed,
        "batch finished"
    );
    Ok(BatchReport {
        batch_metadata,
        results,
    })
}

async fn run_entry(researcher: &Researcher, component: String) -> BatchEntry {
    let started = Instant::now();
    match researcher.research(&component).await {
        Ok(state) => {
            let termination_reason = state.termination_reason().map(ToString::to_string);
            match state.output() {
                Some(output) => BatchEntry {
                    processing_time: started.elapsed().as_secs_f64(),
                    status: EntryStatus::Completed,
                    timestamp: now_rfc3339(),
                    termination_reason,
                    outcome: EntryOutcome::Completed(output.clone()),
                },
                None => BatchEntry {
                    termination_reason,
                    ..BatchEntry::failed(
                        component,
                        "No output generated".to_string(),
                        started.elapsed().as_secs_f64(),
                    )
                },
            }
        }
        Err(err) => {
            warn!(component = %component, error = %err, "session failed");
            BatchEntry::failed(component, err.to_string(), started.elapsed().as_secs_f64())
        }
    }
}

fn now_rfc3339() -> String {
    Local::now().to_rfc3339_opts(SecondsFormat::Secs, false)
}
