//! In-memory tracker for asynchronous scrape jobs.
//!
//! Jobs live only in this process; a restart forgets them. Callers poll
//! `GET /api/jobs/{id}` until the job settles.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobProgress {
    pub stage: String,
    pub percentage: u8,
}

#[derive(Debug, Clone, Serialize)]
pub struct Job {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub progress: JobProgress,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct JobCounts {
    pub active_jobs: usize,
    pub completed_jobs: usize,
    pub failed_jobs: usize,
    pub total_jobs: usize,
}

#[derive(Default)]
pub struct JobTracker {
    jobs: Mutex<HashMap<Uuid, Job>>,
}

impl JobTracker {
    /// Register a new pending job and return its id.
    pub async fn create(&self) -> Uuid {
        let job_id = Uuid::new_v4();
        let job = Job {
            job_id,
            status: JobStatus::Pending,
            created_at: Utc::now(),
            progress: JobProgress {
                stage: "queued".to_string(),
                percentage: 0,
            },
            result: None,
            error: None,
        };
        self.jobs.lock().await.insert(job_id, job);
        job_id
    }

    /// Mark a job running and record its current stage.
    pub async fn set_progress(&self, job_id: Uuid, stage: &str, percentage: u8) {
        if let Some(job) = self.jobs.lock().await.get_mut(&job_id) {
            job.status = JobStatus::Running;
            job.progress = JobProgress {
                stage: stage.to_string(),
                percentage,
            };
        }
    }

    pub async fn complete(&self, job_id: Uuid, result: serde_json::Value) {
        if let Some(job) = self.jobs.lock().await.get_mut(&job_id) {
            job.status = JobStatus::Completed;
            job.progress = JobProgress {
                stage: "completed".to_string(),
                percentage: 100,
            };
            job.result = Some(result);
        }
    }

    pub async fn fail(&self, job_id: Uuid, error: String) {
        if let Some(job) = self.jobs.lock().await.get_mut(&job_id) {
            job.status = JobStatus::Failed;
            job.error = Some(error);
        }
    }

    pub async fn get(&self, job_id: Uuid) -> Option<Job> {
        self.jobs.lock().await.get(&job_id).cloned()
    }

    pub async fn counts(&self) -> JobCounts {
        let jobs = self.jobs.lock().await;
        let mut counts = JobCounts {
            active_jobs: 0,
            completed_jobs: 0,
            failed_jobs: 0,
            total_jobs: jobs.len(),
        };
        for job in jobs.values() {
            match job.status {
                JobStatus::Pending | JobStatus::Running => counts.active_jobs += 1,
                JobStatus::Completed => counts.completed_jobs += 1,
                JobStatus::Failed => counts.failed_jobs += 1,
            }
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn job_lifecycle_pending_to_completed() {
        let tracker = JobTracker::default();
        let id = tracker.create().await;

        let job = tracker.get(id).await.unwrap();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.progress.percentage, 0);

        tracker.set_progress(id, "scraping", 30).await;
        let job = tracker.get(id).await.unwrap();
        assert_eq!(job.status, JobStatus::Running);
        assert_eq!(job.progress.stage, "scraping");

        tracker.complete(id, serde_json::json!({"ok": true})).await;
        let job = tracker.get(id).await.unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.progress.percentage, 100);
        assert!(job.result.is_some());
    }

    #[tokio::test]
    async fn failed_job_keeps_error() {
        let tracker = JobTracker::default();
        let id = tracker.create().await;
        tracker.fail(id, "upstream died".to_string()).await;

        let job = tracker.get(id).await.unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error.as_deref(), Some("upstream died"));
    }

    #[tokio::test]
    async fn counts_bucket_by_status() {
        let tracker = JobTracker::default();
        let a = tracker.create().await;
        let b = tracker.create().await;
        let _c = tracker.create().await;

        tracker.complete(a, serde_json::json!({})).await;
        tracker.fail(b, "boom".to_string()).await;

        let counts = tracker.counts().await;
        assert_eq!(counts.total_jobs, 3);
        assert_eq!(counts.active_jobs, 1);
        assert_eq!(counts.completed_jobs, 1);
        assert_eq!(counts.failed_jobs, 1);
    }

    #[tokio::test]
    async fn unknown_job_is_none() {
        let tracker = JobTracker::default();
        assert!(tracker.get(Uuid::new_v4()).await.is_none());
    }
}
