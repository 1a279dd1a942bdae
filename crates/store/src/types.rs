// crates/store/src/types.rs
//! Types for the data-job registry.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a job.
///
/// The nil UUID stands for "no id supplied"; [`crate::JobStore::create`]
/// replaces it with a fresh v4 id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    /// Generate a fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// The "absent" id.
    pub const fn nil() -> Self {
        Self(Uuid::nil())
    }

    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }
}

impl From<Uuid> for JobId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Lifecycle status of a job.
///
/// Variants are declared in lifecycle order so the derived `Ord` gives
/// `New < Processing < Completed`. Transition checks compare on that order.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum JobStatus {
    #[default]
    New,
    Processing,
    Completed,
}

impl JobStatus {
    pub const ALL: [JobStatus; 3] = [JobStatus::New, JobStatus::Processing, JobStatus::Completed];

    /// The status that follows this one, if any.
    pub fn next(self) -> Option<JobStatus> {
        match self {
            JobStatus::New => Some(JobStatus::Processing),
            JobStatus::Processing => Some(JobStatus::Completed),
            JobStatus::Completed => None,
        }
    }

    /// Whether a job currently in `self` may be moved to `to` without
    /// regressing or skipping a state.
    pub fn can_advance_to(self, to: JobStatus) -> bool {
        to == self || self.next() == Some(to)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::New => "New",
            JobStatus::Processing => "Processing",
            JobStatus::Completed => "Completed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown status name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown job status: {0}")]
pub struct ParseStatusError(pub String);

impl FromStr for JobStatus {
    type Err = ParseStatusError;

    /// Case-insensitive; also accepts the numeric ordinal (`0`, `1`, `2`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "new" | "0" => Ok(JobStatus::New),
            "processing" | "1" => Ok(JobStatus::Processing),
            "completed" | "2" => Ok(JobStatus::Completed),
            _ => Err(ParseStatusError(s.to_string())),
        }
    }
}

/// Hypermedia descriptor attached to a job. Opaque to the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    #[serde(default)]
    pub rel: String,
    #[serde(default)]
    pub href: String,
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub types: Vec<String>,
}

/// A unit of trackable work referencing a file to process.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    #[serde(default)]
    pub id: JobId,
    #[serde(default)]
    pub name: String,
    #[serde(default, alias = "filePathToProcess")]
    pub file_path: String,
    #[serde(default)]
    pub status: JobStatus,
    #[serde(default)]
    pub results: Vec<String>,
    #[serde(default)]
    pub links: Vec<Link>,
}

impl Job {
    /// A new job with no id; the store assigns one on create.
    pub fn new(name: impl Into<String>, file_path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            file_path: file_path.into(),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: JobId) -> Self {
        self.id = id;
        self
    }
}
