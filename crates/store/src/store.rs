// crates/store/src/store.rs
//! The dual-indexed job registry.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::StoreConfig;
use crate::dispatcher::BackgroundDispatcher;
use crate::error::{StoreError, StoreResult};
use crate::lock::{ExclusiveGuard, LockCoordinator, SharedGuard};
use crate::processor::FileProcessor;
use crate::types::{Job, JobId, JobStatus};

/// Identifies one processing run of a job. Only the run recorded for a job
/// may complete it.
pub(crate) type RunId = u64;

/// Both indices, only ever touched through the store's lock.
///
/// Jobs live once in `by_id`; buckets hold ids in insertion order. `runs`
/// holds the current processing run per job and is cleared on delete.
#[derive(Debug, Default)]
struct Indices {
    by_id: HashMap<JobId, Job>,
    by_status: HashMap<JobStatus, Vec<JobId>>,
    runs: HashMap<JobId, RunId>,
    last_run: RunId,
}

impl Indices {
    fn begin_run(&mut self, id: JobId) -> RunId {
        self.last_run += 1;
        self.runs.insert(id, self.last_run);
        self.last_run
    }

    /// Append to the bucket for `status`, creating it on first use.
    fn push_to_bucket(&mut self, status: JobStatus, id: JobId) {
        self.by_status.entry(status).or_default().push(id);
    }

    fn remove_from_bucket(&mut self, status: JobStatus, id: JobId) -> StoreResult<()> {
        let bucket = self
            .by_status
            .get_mut(&status)
            .ok_or_else(|| corrupt(id, status))?;
        let pos = bucket
            .iter()
            .position(|member| *member == id)
            .ok_or_else(|| corrupt(id, status))?;
        bucket.remove(pos);
        Ok(())
    }

    fn bucket_snapshot(&self, status: JobStatus) -> StoreResult<Vec<Job>> {
        let Some(bucket) = self.by_status.get(&status) else {
            return Ok(Vec::new());
        };
        bucket
            .iter()
            .map(|id| match self.by_id.get(id) {
                Some(job) if job.status == status => Ok(job.clone()),
                _ => Err(corrupt(*id, status)),
            })
            .collect()
    }
}

fn corrupt(id: JobId, status: JobStatus) -> StoreError {
    tracing::error!(job_id = %id, status = %status, "Status index inconsistent with identity index");
    StoreError::StatusIndexCorrupt { id, status }
}

/// Number of jobs per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobCounts {
    pub new: usize,
    pub processing: usize,
    pub completed: usize,
}

impl JobCounts {
    pub fn total(&self) -> usize {
        self.new + self.processing + self.completed
    }
}

/// In-memory registry of jobs, indexed by id and by status.
///
/// Every read takes the shared side of the lock and returns independent
/// copies; every mutation takes the exclusive side. Background processing
/// started by [`JobStore::start_background_process`] runs with no lock held
/// and re-enters the store through a fresh exclusive acquisition when it
/// finishes.
///
/// Construct once and share the returned `Arc` with every caller.
pub struct JobStore {
    indices: LockCoordinator<Indices>,
    config: StoreConfig,
    dispatcher: BackgroundDispatcher,
}

impl JobStore {
    pub fn new(processor: Arc<dyn FileProcessor>, config: StoreConfig) -> Arc<Self> {
        Arc::new(Self {
            indices: LockCoordinator::new(Indices::default()),
            config,
            dispatcher: BackgroundDispatcher::new(processor),
        })
    }

    async fn read(&self) -> StoreResult<SharedGuard<'_, Indices>> {
        Ok(self
            .indices
            .acquire_shared(self.config.shared_lock_timeout)
            .await?)
    }

    async fn write(&self) -> StoreResult<ExclusiveGuard<'_, Indices>> {
        Ok(self
            .indices
            .acquire_exclusive(self.config.exclusive_lock_timeout)
            .await?)
    }

    // -- Reads ----------------------------------------------------------------

    /// Snapshot of every job, in no particular order.
    pub async fn list_all(&self) -> StoreResult<Vec<Job>> {
        let indices = self.read().await?;
        Ok(indices.by_id.values().cloned().collect())
    }

    /// Snapshot of the jobs currently in `status`, in the order they entered it.
    pub async fn list_by_status(&self, status: JobStatus) -> StoreResult<Vec<Job>> {
        let indices = self.read().await?;
        indices.bucket_snapshot(status)
    }

    pub async fn get(&self, id: JobId) -> StoreResult<Job> {
        let indices = self.read().await?;
        indices
            .by_id
            .get(&id)
            .cloned()
            .ok_or(StoreError::JobNotFound(id))
    }

    pub async fn get_status(&self, id: JobId) -> StoreResult<JobStatus> {
        let indices = self.read().await?;
        indices
            .by_id
            .get(&id)
            .map(|job| job.status)
            .ok_or(StoreError::JobNotFound(id))
    }

    /// Results recorded at completion; empty until then.
    pub async fn get_results(&self, id: JobId) -> StoreResult<Vec<String>> {
        let indices = self.read().await?;
        indices
            .by_id
            .get(&id)
            .map(|job| job.results.clone())
            .ok_or(StoreError::JobNotFound(id))
    }

    pub async fn counts(&self) -> StoreResult<JobCounts> {
        let indices = self.read().await?;
        let len = |status: JobStatus| indices.by_status.get(&status).map_or(0, Vec::len);
        Ok(JobCounts {
            new: len(JobStatus::New),
            processing: len(JobStatus::Processing),
            completed: len(JobStatus::Completed),
        })
    }

    /// Verify that both indices agree: every job sits exactly once in the
    /// bucket for its status, and buckets hold nothing else.
    pub async fn check_consistency(&self) -> StoreResult<()> {
        let indices = self.read().await?;

        for (status, bucket) in &indices.by_status {
            for id in bucket {
                match indices.by_id.get(id) {
                    Some(job) if job.status == *status => {}
                    _ => return Err(corrupt(*id, *status)),
                }
            }
        }

        for (id, job) in &indices.by_id {
            let occurrences = indices
                .by_status
                .get(&job.status)
                .map_or(0, |bucket| bucket.iter().filter(|member| *member == id).count());
            if occurrences != 1 {
                return Err(corrupt(*id, job.status));
            }
        }

        Ok(())
    }

    // -- Mutations ------------------------------------------------------------

    /// Insert a new job. A nil id is replaced by a fresh one; the job always
    /// starts as `New` with no results.
    pub async fn create(&self, mut job: Job) -> StoreResult<Job> {
        let mut indices = self.write().await?;

        if indices.by_id.contains_key(&job.id) {
            tracing::warn!(job_id = %job.id, "Rejected create for existing job id");
            return Err(StoreError::DuplicateJob(job.id));
        }
        if job.id.is_nil() {
            job.id = JobId::new();
        }
        job.status = JobStatus::New;
        job.results.clear();

        indices.push_to_bucket(job.status, job.id);
        indices.by_id.insert(job.id, job.clone());
        drop(indices);

        metrics::counter!("jobs_created_total").increment(1);
        tracing::info!(job_id = %job.id, name = %job.name, file_path = %job.file_path, "Job created");
        Ok(job)
    }

    /// Overwrite every mutable field of an existing job.
    ///
    /// The status may stay the same or advance by exactly one step.
    pub async fn update(&self, job: Job) -> StoreResult<Job> {
        let mut indices = self.write().await?;

        let current = indices
            .by_id
            .get(&job.id)
            .map(|stored| stored.status)
            .ok_or(StoreError::JobNotFound(job.id))?;

        if !current.can_advance_to(job.status) {
            return Err(StoreError::InvalidTransition {
                id: job.id,
                from: current,
                to: job.status,
            });
        }
        if current != job.status {
            indices.remove_from_bucket(current, job.id)?;
            indices.push_to_bucket(job.status, job.id);
        }

        let stored = indices
            .by_id
            .get_mut(&job.id)
            .ok_or(StoreError::JobNotFound(job.id))?;
        stored.name = job.name;
        stored.file_path = job.file_path;
        stored.status = job.status;
        stored.results = job.results;
        stored.links = job.links;
        let updated = stored.clone();
        drop(indices);

        metrics::counter!("jobs_updated_total").increment(1);
        tracing::debug!(job_id = %updated.id, from = %current, to = %updated.status, "Job updated");
        Ok(updated)
    }

    pub async fn delete(&self, id: JobId) -> StoreResult<()> {
        let mut indices = self.write().await?;

        let status = indices
            .by_id
            .get(&id)
            .map(|job| job.status)
            .ok_or(StoreError::JobNotFound(id))?;
        indices.remove_from_bucket(status, id)?;
        indices.by_id.remove(&id);
        indices.runs.remove(&id);
        drop(indices);

        metrics::counter!("jobs_deleted_total").increment(1);
        tracing::info!(job_id = %id, status = %status, "Job deleted");
        Ok(())
    }

    /// Move a `New` job to `Processing` and hand it to the dispatcher.
    ///
    /// Returns `false`, changing nothing, if the job was already started or
    /// finished. Returns as soon as the bookkeeping is done; processing
    /// continues in the background.
    pub async fn start_background_process(self: &Arc<Self>, id: JobId) -> StoreResult<bool> {
        let (file_path, run) = {
            let mut indices = self.write().await?;

            let status = indices
                .by_id
                .get(&id)
                .map(|job| job.status)
                .ok_or(StoreError::JobNotFound(id))?;
            if status > JobStatus::New {
                tracing::debug!(job_id = %id, status = %status, "Job already started");
                return Ok(false);
            }

            indices.remove_from_bucket(JobStatus::New, id)?;
            indices.push_to_bucket(JobStatus::Processing, id);
            let job = indices
                .by_id
                .get_mut(&id)
                .ok_or(StoreError::JobNotFound(id))?;
            job.status = JobStatus::Processing;
            let file_path = job.file_path.clone();
            (file_path, indices.begin_run(id))
        };

        // Lock released above; processing never runs under it.
        metrics::counter!("jobs_started_total").increment(1);
        tracing::info!(job_id = %id, run, file_path = %file_path, "Job processing started");

        let store = Arc::clone(self);
        self.dispatcher
            .dispatch(id, file_path, move |results| async move {
                if let Err(e) = store.finalize_completion(id, run, results).await {
                    tracing::warn!(job_id = %id, run, error = %e, "Could not finalize processed job");
                }
            });

        Ok(true)
    }

    /// Record results and mark the job `Completed`. Only the dispatcher's
    /// completion path calls this, with the run it was started for.
    ///
    /// A run that is no longer current belongs to a job that was deleted,
    /// possibly re-created under the same id since. It fails with
    /// `JobNotFound` and changes nothing.
    pub(crate) async fn finalize_completion(
        &self,
        id: JobId,
        run: RunId,
        results: Vec<String>,
    ) -> StoreResult<()> {
        let mut indices = self.write().await?;

        let status = indices
            .by_id
            .get(&id)
            .map(|job| job.status)
            .ok_or(StoreError::JobNotFound(id))?;
        if indices.runs.get(&id) != Some(&run) {
            tracing::debug!(job_id = %id, run, "Dropping completion of a stale run");
            return Err(StoreError::JobNotFound(id));
        }
        indices.remove_from_bucket(status, id)?;
        indices.push_to_bucket(JobStatus::Completed, id);
        indices.runs.remove(&id);

        let job = indices
            .by_id
            .get_mut(&id)
            .ok_or(StoreError::JobNotFound(id))?;
        job.status = JobStatus::Completed;
        job.results = results;
        let result_count = job.results.len();
        drop(indices);

        metrics::counter!("jobs_completed_total").increment(1);
        tracing::info!(job_id = %id, result_count, "Job completed");
        Ok(())
    }

    // -- Background work ------------------------------------------------------

    /// Number of processing tasks still running.
    pub fn in_flight(&self) -> usize {
        self.dispatcher.in_flight()
    }

    /// Wait for every processing task started so far to finish.
    pub async fn drain(&self) {
        self.dispatcher.drain().await;
    }

    /// Cancel in-flight processing and wait for it to stop. Cancelled jobs
    /// stay in `Processing`.
    pub async fn shutdown(&self) {
        self.dispatcher.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::SimulatedFileProcessor;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn test_store() -> Arc<JobStore> {
        JobStore::new(
            Arc::new(SimulatedFileProcessor::new(Duration::from_millis(5))),
            StoreConfig::with_lock_timeout(Duration::from_millis(100)),
        )
    }

    /// Move a job to Processing by hand and record a run for it, without
    /// dispatching anything.
    async fn mark_processing(store: &JobStore, job: &Job) -> RunId {
        let mut processing = job.clone();
        processing.status = JobStatus::Processing;
        store.update(processing).await.unwrap();
        store.write().await.unwrap().begin_run(job.id)
    }

    #[tokio::test]
    async fn test_create_assigns_id_and_new_status() {
        let store = test_store();
        let job = store.create(Job::new("A", "/a.txt")).await.unwrap();

        assert!(!job.id.is_nil());
        assert_eq!(job.status, JobStatus::New);
        assert_eq!(store.get(job.id).await.unwrap(), job);
        store.check_consistency().await.unwrap();
    }

    #[tokio::test]
    async fn test_create_keeps_supplied_id_and_resets_status() {
        let store = test_store();
        let id = JobId::new();
        let mut job = Job::new("A", "/a.txt").with_id(id);
        job.status = JobStatus::Completed;
        job.results = vec!["stale".into()];

        let created = store.create(job).await.unwrap();
        assert_eq!(created.id, id);
        assert_eq!(created.status, JobStatus::New);
        assert!(created.results.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_create_leaves_store_unchanged() {
        let store = test_store();
        let first = store.create(Job::new("A", "/a.txt")).await.unwrap();

        let err = store
            .create(Job::new("B", "/b.txt").with_id(first.id))
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::DuplicateJob(first.id));

        let all = store.list_all().await.unwrap();
        assert_eq!(all, vec![first]);
    }

    #[tokio::test]
    async fn test_update_overwrites_fields_and_reindexes() {
        let store = test_store();
        let created = store.create(Job::new("A", "/a.txt")).await.unwrap();

        let mut changed = created.clone();
        changed.name = "A2".into();
        changed.file_path = "/a2.txt".into();
        changed.status = JobStatus::Processing;
        let updated = store.update(changed).await.unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.name, "A2");
        assert!(store.list_by_status(JobStatus::New).await.unwrap().is_empty());
        assert_eq!(
            store.list_by_status(JobStatus::Processing).await.unwrap(),
            vec![updated]
        );
        store.check_consistency().await.unwrap();
    }

    #[tokio::test]
    async fn test_update_rejects_regression_and_skips() {
        let store = test_store();
        let created = store.create(Job::new("A", "/a.txt")).await.unwrap();

        let mut skip = created.clone();
        skip.status = JobStatus::Completed;
        assert!(matches!(
            store.update(skip).await,
            Err(StoreError::InvalidTransition { from: JobStatus::New, to: JobStatus::Completed, .. })
        ));

        let run = mark_processing(&store, &created).await;
        store.finalize_completion(created.id, run, vec![]).await.unwrap();
        let mut back = created.clone();
        back.status = JobStatus::New;
        assert!(matches!(
            store.update(back).await,
            Err(StoreError::InvalidTransition { .. })
        ));
        assert_eq!(store.get_status(created.id).await.unwrap(), JobStatus::Completed);
    }

    #[tokio::test]
    async fn test_delete_removes_from_both_indices() {
        let store = test_store();
        let job = store.create(Job::new("A", "/a.txt")).await.unwrap();

        store.delete(job.id).await.unwrap();
        assert_eq!(store.get(job.id).await, Err(StoreError::JobNotFound(job.id)));
        assert!(store.list_by_status(JobStatus::New).await.unwrap().is_empty());
        assert_eq!(store.delete(job.id).await, Err(StoreError::JobNotFound(job.id)));
    }

    #[tokio::test]
    async fn test_finalize_moves_to_completed() {
        let store = test_store();
        let job = store.create(Job::new("A", "/a.txt")).await.unwrap();
        let run = mark_processing(&store, &job).await;

        store
            .finalize_completion(job.id, run, vec!["r1".into()])
            .await
            .unwrap();
        assert_eq!(store.get_status(job.id).await.unwrap(), JobStatus::Completed);
        assert_eq!(store.get_results(job.id).await.unwrap(), vec!["r1"]);
        assert_eq!(
            store.counts().await.unwrap(),
            JobCounts {
                new: 0,
                processing: 0,
                completed: 1
            }
        );
        store.check_consistency().await.unwrap();
    }

    #[tokio::test]
    async fn test_finalize_deleted_job_is_not_found() {
        let store = test_store();
        let job = store.create(Job::new("A", "/a.txt")).await.unwrap();
        let run = mark_processing(&store, &job).await;
        store.delete(job.id).await.unwrap();

        assert_eq!(
            store.finalize_completion(job.id, run, vec![]).await,
            Err(StoreError::JobNotFound(job.id))
        );
    }

    #[tokio::test]
    async fn test_finalize_rejects_job_that_never_started() {
        let store = test_store();
        let job = store.create(Job::new("A", "/a.txt")).await.unwrap();

        assert_eq!(
            store.finalize_completion(job.id, 1, vec!["late".into()]).await,
            Err(StoreError::JobNotFound(job.id))
        );
        assert_eq!(store.get(job.id).await.unwrap(), job);
        store.check_consistency().await.unwrap();
    }

    #[tokio::test]
    async fn test_finalize_rejects_run_of_deleted_predecessor() {
        let store = test_store();
        let old = store.create(Job::new("A", "/old.txt")).await.unwrap();
        let old_run = mark_processing(&store, &old).await;
        store.delete(old.id).await.unwrap();

        let new = store
            .create(Job::new("A", "/new.txt").with_id(old.id))
            .await
            .unwrap();
        let new_run = mark_processing(&store, &new).await;
        assert_ne!(old_run, new_run);

        assert_eq!(
            store.finalize_completion(old.id, old_run, vec!["/old.txt".into()]).await,
            Err(StoreError::JobNotFound(old.id))
        );
        assert_eq!(store.get_status(new.id).await.unwrap(), JobStatus::Processing);
        assert!(store.get_results(new.id).await.unwrap().is_empty());

        store
            .finalize_completion(new.id, new_run, vec!["/new.txt".into()])
            .await
            .unwrap();
        assert_eq!(store.get_results(new.id).await.unwrap(), vec!["/new.txt"]);

        // A run completes at most once.
        assert_eq!(
            store.finalize_completion(new.id, new_run, vec!["again".into()]).await,
            Err(StoreError::JobNotFound(new.id))
        );
        assert_eq!(store.get_results(new.id).await.unwrap(), vec!["/new.txt"]);
    }

    #[tokio::test]
    async fn test_missing_bucket_is_reported_as_corrupt() {
        let store = test_store();
        let job = store.create(Job::new("A", "/a.txt")).await.unwrap();
        let running = store.create(Job::new("B", "/b.txt")).await.unwrap();
        let run = mark_processing(&store, &running).await;
        store.write().await.unwrap().by_status.clear();

        let corrupt = StoreError::StatusIndexCorrupt {
            id: job.id,
            status: JobStatus::New,
        };
        assert_eq!(store.delete(job.id).await, Err(corrupt.clone()));
        assert_eq!(store.start_background_process(job.id).await, Err(corrupt.clone()));

        let mut changed = job.clone();
        changed.name = "A2".into();
        changed.status = JobStatus::Processing;
        assert_eq!(store.update(changed).await, Err(corrupt));

        assert_eq!(
            store.finalize_completion(running.id, run, vec!["r1".into()]).await,
            Err(StoreError::StatusIndexCorrupt {
                id: running.id,
                status: JobStatus::Processing,
            })
        );

        assert!(matches!(
            store.check_consistency().await,
            Err(StoreError::StatusIndexCorrupt { .. })
        ));
        // None of the failed mutations touched the stored jobs.
        assert_eq!(store.get(job.id).await.unwrap(), job);
        let stored = store.get(running.id).await.unwrap();
        assert_eq!(stored.status, JobStatus::Processing);
        assert!(stored.results.is_empty());
    }

    #[tokio::test]
    async fn test_lock_timeout_surfaces_as_retryable() {
        let store = test_store();
        let held = store.write().await.unwrap();

        let err = store.list_all().await.unwrap_err();
        assert!(err.is_retryable());
        let err = store.create(Job::new("A", "/a.txt")).await.unwrap_err();
        assert!(matches!(err, StoreError::LockTimeout(_)));
        drop(held);

        assert!(store.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_results_empty_until_completion() {
        let store = test_store();
        let job = store.create(Job::new("A", "/a.txt")).await.unwrap();
        assert!(store.get_results(job.id).await.unwrap().is_empty());
    }
}
