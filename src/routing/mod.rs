//! Storage event routing: key classification and job dispatch.

mod dispatcher;
mod event;
mod key;
mod season;

pub use dispatcher::{
    BatchReport, DispatchPlan, Dispatcher, DryRunJob, JobTarget, ProcessingJob, RecordFailure,
};
pub use event::{decode_object_key, S3Bucket, S3Entity, S3Event, S3EventRecord, S3Object};
pub use key::{parse_key, FileType, StorageEventDescriptor, MARKER_FILE_TYPE};
pub use season::{ParseSeasonError, Season, SEASON_START_MONTH};
