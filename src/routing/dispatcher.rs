//! Mapping notification batches onto per-date processing jobs.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::event::S3Event;
use super::key::{parse_key, FileType, StorageEventDescriptor};
use crate::config::RoutingConfig;
use crate::error::Result;

/// A unit of downstream work derived from one or more notification records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobTarget {
    pub file_type: FileType,
    pub logical_date: NaiveDate,
    pub season: String,
    /// First key in the batch that mapped to this target
    pub trigger_key: String,
}

impl JobTarget {
    fn from_descriptor(descriptor: &StorageEventDescriptor) -> Self {
        Self {
            file_type: descriptor.file_type().clone(),
            logical_date: descriptor.logical_date(),
            season: descriptor.season().to_string(),
            trigger_key: descriptor.original_key().to_string(),
        }
    }
}

/// Downstream work run for a logical date.
#[async_trait]
pub trait ProcessingJob: Send + Sync {
    async fn run(&self, target: &JobTarget) -> Result<()>;
}

/// A job that only logs what would run.
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunJob;

#[async_trait]
impl ProcessingJob for DryRunJob {
    async fn run(&self, target: &JobTarget) -> Result<()> {
        info!(
            file_type = %target.file_type,
            date = %target.logical_date,
            season = %target.season,
            trigger_key = %target.trigger_key,
            "Would run processing job"
        );
        Ok(())
    }
}

/// A record whose job did not complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordFailure {
    pub key: String,
    pub error: String,
}

/// Outcome of dispatching one notification batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub total_records: usize,
    pub dispatched: Vec<JobTarget>,
    pub skipped: Vec<String>,
    pub failures: Vec<RecordFailure>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failed_records(&self) -> usize {
        self.failures.len()
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_success() {
            write!(
                f,
                "{} notification records processed ({} jobs dispatched, {} skipped)",
                self.total_records,
                self.dispatched.len(),
                self.skipped.len()
            )
        } else {
            write!(
                f,
                "{} of {} notification records failed to process",
                self.failed_records(),
                self.total_records
            )
        }
    }
}

/// Jobs planned for a batch, before anything runs.
#[derive(Debug, Clone, Default)]
pub struct DispatchPlan {
    /// Distinct targets in first-seen order, with every key that mapped to each
    pub targets: Vec<(JobTarget, Vec<String>)>,
    /// Keys that trigger nothing
    pub skipped: Vec<String>,
}

/// Routes notification batches to a [`ProcessingJob`].
pub struct Dispatcher<J: ProcessingJob> {
    job: J,
    config: RoutingConfig,
}

impl<J: ProcessingJob> Dispatcher<J> {
    pub fn new(job: J, config: RoutingConfig) -> Self {
        Self { job, config }
    }

    pub fn job(&self) -> &J {
        &self.job
    }

    /// Whether a descriptor should trigger the job under the routing filter.
    ///
    /// Markers always pass the entity allow-list.
    pub fn accepts(&self, descriptor: &StorageEventDescriptor) -> bool {
        match descriptor.file_type() {
            FileType::SilverReadyMarker => true,
            FileType::Entity(_) if self.config.require_marker => false,
            FileType::Entity(name) => {
                self.config.entity_types.is_empty()
                    || self.config.entity_types.iter().any(|t| t == name)
            }
        }
    }

    /// Group a batch into distinct `(file_type, logical_date)` targets.
    pub fn plan(&self, event: &S3Event) -> DispatchPlan {
        let mut plan = DispatchPlan::default();
        let mut index: HashMap<(FileType, NaiveDate), usize> = HashMap::new();

        for record in &event.records {
            let key = record.object_key();

            if !record.event_name.starts_with(&self.config.event_prefix) {
                debug!(key = %key, event_name = %record.event_name, "Ignoring event type");
                plan.skipped.push(key);
                continue;
            }

            let Some(descriptor) = parse_key(&key) else {
                debug!(key = %key, "Key not recognized");
                plan.skipped.push(key);
                continue;
            };

            if !self.accepts(&descriptor) {
                debug!(key = %key, file_type = %descriptor.file_type(), "Filtered out");
                plan.skipped.push(key);
                continue;
            }

            let group = (descriptor.file_type().clone(), descriptor.logical_date());
            match index.get(&group) {
                Some(&i) => plan.targets[i].1.push(key),
                None => {
                    index.insert(group, plan.targets.len());
                    plan.targets
                        .push((JobTarget::from_descriptor(&descriptor), vec![key]));
                }
            }
        }

        plan
    }

    /// Run the job once per distinct target, collecting failures per record.
    pub async fn dispatch(&self, event: &S3Event) -> BatchReport {
        let span = info_span!(
            "dispatch",
            run_id = %Uuid::new_v4(),
            records = event.records.len()
        );

        async {
            let plan = self.plan(event);
            let mut report = BatchReport {
                total_records: event.records.len(),
                skipped: plan.skipped,
                ..Default::default()
            };

            for (target, keys) in plan.targets {
                match self.job.run(&target).await {
                    Ok(()) => {
                        debug!(
                            file_type = %target.file_type,
                            date = %target.logical_date,
                            records = keys.len(),
                            "Job completed"
                        );
                        report.dispatched.push(target);
                    }
                    Err(err) => {
                        warn!(
                            file_type = %target.file_type,
                            date = %target.logical_date,
                            error = %err,
                            "Job failed"
                        );
                        let error = err.to_string();
                        report.failures.extend(keys.into_iter().map(|key| RecordFailure {
                            key,
                            error: error.clone(),
                        }));
                    }
                }
            }

            if report.is_success() {
                info!(
                    dispatched = report.dispatched.len(),
                    skipped = report.skipped.len(),
                    "{}",
                    report
                );
            } else {
                warn!(failed = report.failed_records(), "{}", report);
            }
            report
        }
        .instrument(span)
        .await
    }
}
