//! Background-job progress tracking and cooperative cancellation.
//!
//! One [`JobTracker`] exists per job kind (filesystem import, Roon import,
//! enrichment). The running job is the only writer; any number of callers
//! may read a [`Progress`] snapshot or request cancellation at any time.
//!
//! # Lifecycle
//!
//! `Idle -> Starting -> Running -> {Done | Cancelled | Error}`
//!
//! [`JobTracker::begin`] performs a checked transition: it rejects a new
//! start while a job is Starting or Running, and otherwise replaces the
//! whole record with a fresh one. Terminal records stay readable until the
//! next accepted start. Cancellation is a flag the job observes at the top
//! of its per-unit loop; side effects of already-processed units are kept.

use parking_lot::Mutex;
use serde::Serialize;

/// Maximum number of error messages retained per job (most recent kept).
pub const MAX_ERRORS: usize = 50;

/// The three job kinds that can run in the background.
///
/// At most one job per kind may be running at a time; different kinds may
/// run concurrently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    FilesystemImport,
    LibraryImport,
    Enrichment,
}

impl JobKind {
    /// Short human-readable name used in logs and rejection messages.
    pub fn name(&self) -> &'static str {
        match self {
            JobKind::FilesystemImport => "file import",
            JobKind::LibraryImport => "Roon import",
            JobKind::Enrichment => "enrichment",
        }
    }
}

/// Job lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    #[default]
    Idle,
    Starting,
    Running,
    Done,
    Cancelled,
    Error,
}

impl JobStatus {
    /// Whether the job has reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Cancelled | JobStatus::Error)
    }
}

/// Snapshot of a job's progress.
///
/// Cheap to clone; handed out to pollers while the job keeps mutating the
/// tracked original.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Progress {
    pub status: JobStatus,
    /// Units discovered up front (progress denominator)
    pub total: u64,
    /// Units processed so far, including skipped and errored ones
    pub done: u64,
    /// Units that created a new album
    pub imported: u64,
    /// Units that updated an existing album (enrichment: albums enriched)
    pub updated: u64,
    /// Units skipped (no usable data)
    pub skipped: u64,
    /// Units that failed
    pub errors: u64,
    /// Most recent error messages, bounded at [`MAX_ERRORS`]
    pub error_list: Vec<String>,
    /// Label of the unit currently being processed (for UI display)
    pub current: Option<String>,
    /// Whether cancellation has been requested
    pub cancel_requested: bool,
}

impl Progress {
    fn fresh() -> Self {
        Self {
            status: JobStatus::Starting,
            ..Default::default()
        }
    }
}

/// Rejection reasons for a start request.
///
/// These are detected before any job record is created and surfaced
/// synchronously to the caller.
#[derive(Debug, thiserror::Error)]
pub enum StartError {
    #[error("a {0} job is already in progress")]
    AlreadyRunning(&'static str),

    #[error("directory not found or not accessible: {0}")]
    BadPath(String),

    #[error("Roon Core not authorized — connect and approve the extension first")]
    NotAuthorized,
}

/// Progress tracker for one job kind.
///
/// All mutation goes through `&self` methods; the running job is the only
/// caller of the mutating ones by construction (enforced by [`begin`]).
///
/// [`begin`]: JobTracker::begin
#[derive(Debug, Default)]
pub struct JobTracker {
    kind_name: &'static str,
    inner: Mutex<Progress>,
}

impl JobTracker {
    pub fn new(kind: JobKind) -> Self {
        Self {
            kind_name: kind.name(),
            inner: Mutex::new(Progress::default()),
        }
    }

    /// Accept a new job start, replacing the previous record wholesale.
    ///
    /// Rejects if a job of this kind is currently Starting or Running.
    pub fn begin(&self) -> Result<(), StartError> {
        let mut inner = self.inner.lock();
        if matches!(inner.status, JobStatus::Starting | JobStatus::Running) {
            return Err(StartError::AlreadyRunning(self.kind_name));
        }
        *inner = Progress::fresh();
        Ok(())
    }

    /// Read a snapshot of the current progress.
    pub fn snapshot(&self) -> Progress {
        self.inner.lock().clone()
    }

    /// Request cooperative cancellation. Best-effort: the running job
    /// observes the flag at its next unit boundary.
    pub fn request_cancel(&self) {
        self.inner.lock().cancel_requested = true;
    }

    /// Whether cancellation has been requested.
    pub fn cancel_requested(&self) -> bool {
        self.inner.lock().cancel_requested
    }

    /// Apply a mutation to the live record. Job-internal use only.
    pub fn update(&self, f: impl FnOnce(&mut Progress)) {
        f(&mut self.inner.lock());
    }

    /// Count a per-unit failure and append its message, dropping the
    /// oldest messages beyond [`MAX_ERRORS`].
    pub fn push_error(&self, message: impl Into<String>) {
        let mut inner = self.inner.lock();
        inner.errors += 1;
        push_bounded(&mut inner.error_list, message.into());
    }

    /// Transition to a terminal status and clear the current-unit label.
    pub fn finish(&self, status: JobStatus) {
        debug_assert!(status.is_terminal());
        let mut inner = self.inner.lock();
        inner.status = status;
        inner.current = None;
    }

    /// Record a job-fatal error: append the message and transition to
    /// Error. Does not touch the per-unit error counter.
    pub fn fail(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::error!("{} crashed: {}", self.kind_name, message);
        let mut inner = self.inner.lock();
        push_bounded(&mut inner.error_list, message);
        inner.status = JobStatus::Error;
        inner.current = None;
    }
}

fn push_bounded(list: &mut Vec<String>, message: String) {
    if list.len() >= MAX_ERRORS {
        let overflow = list.len() + 1 - MAX_ERRORS;
        list.drain(..overflow);
    }
    list.push(message);
}

/// The process-wide set of job trackers, one per kind.
#[derive(Debug)]
pub struct Jobs {
    filesystem: JobTracker,
    library: JobTracker,
    enrichment: JobTracker,
}

impl Jobs {
    pub fn new() -> Self {
        Self {
            filesystem: JobTracker::new(JobKind::FilesystemImport),
            library: JobTracker::new(JobKind::LibraryImport),
            enrichment: JobTracker::new(JobKind::Enrichment),
        }
    }

    pub fn tracker(&self, kind: JobKind) -> &JobTracker {
        match kind {
            JobKind::FilesystemImport => &self.filesystem,
            JobKind::LibraryImport => &self.library,
            JobKind::Enrichment => &self.enrichment,
        }
    }

    /// Progress snapshot for the given job kind.
    pub fn progress(&self, kind: JobKind) -> Progress {
        self.tracker(kind).snapshot()
    }

    /// Request cancellation of the given job kind. Best-effort.
    pub fn request_cancel(&self, kind: JobKind) {
        tracing::info!("cancellation requested for {}", kind.name());
        self.tracker(kind).request_cancel();
    }
}

impl Default for Jobs {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_rejects_while_running() {
        let tracker = JobTracker::new(JobKind::FilesystemImport);
        tracker.begin().unwrap();
        tracker.update(|p| p.status = JobStatus::Running);

        let err = tracker.begin().unwrap_err();
        assert!(matches!(err, StartError::AlreadyRunning(_)));
    }

    #[test]
    fn test_begin_rejects_while_starting() {
        let tracker = JobTracker::new(JobKind::Enrichment);
        tracker.begin().unwrap();
        assert!(tracker.begin().is_err());
    }

    #[test]
    fn test_begin_replaces_terminal_record() {
        let tracker = JobTracker::new(JobKind::LibraryImport);
        tracker.begin().unwrap();
        tracker.update(|p| {
            p.status = JobStatus::Running;
            p.total = 10;
            p.done = 10;
        });
        tracker.finish(JobStatus::Done);

        tracker.begin().unwrap();
        let snap = tracker.snapshot();
        assert_eq!(snap.status, JobStatus::Starting);
        assert_eq!(snap.total, 0);
        assert_eq!(snap.done, 0);
        assert!(snap.error_list.is_empty());
    }

    #[test]
    fn test_error_list_bounded_at_50_most_recent() {
        let tracker = JobTracker::new(JobKind::FilesystemImport);
        tracker.begin().unwrap();

        for i in 0..60 {
            tracker.push_error(format!("failure {}", i));
        }

        let snap = tracker.snapshot();
        assert_eq!(snap.errors, 60);
        assert_eq!(snap.error_list.len(), MAX_ERRORS);
        assert_eq!(snap.error_list.first().unwrap(), "failure 10");
        assert_eq!(snap.error_list.last().unwrap(), "failure 59");
    }

    #[test]
    fn test_cancel_flag_visible_to_job() {
        let tracker = JobTracker::new(JobKind::Enrichment);
        tracker.begin().unwrap();
        assert!(!tracker.cancel_requested());

        tracker.request_cancel();
        assert!(tracker.cancel_requested());

        // A new start clears the flag
        tracker.finish(JobStatus::Cancelled);
        tracker.begin().unwrap();
        assert!(!tracker.cancel_requested());
    }

    #[test]
    fn test_fail_sets_error_status_and_message() {
        let tracker = JobTracker::new(JobKind::LibraryImport);
        tracker.begin().unwrap();
        tracker.fail("connection dropped");

        let snap = tracker.snapshot();
        assert_eq!(snap.status, JobStatus::Error);
        assert_eq!(snap.error_list, vec!["connection dropped".to_string()]);
        assert_eq!(snap.errors, 0);
    }

    #[test]
    fn test_kinds_are_independent() {
        let jobs = Jobs::new();
        jobs.tracker(JobKind::FilesystemImport).begin().unwrap();
        jobs.tracker(JobKind::FilesystemImport)
            .update(|p| p.status = JobStatus::Running);

        // Same kind rejected, other kinds accepted
        assert!(jobs.tracker(JobKind::FilesystemImport).begin().is_err());
        assert!(jobs.tracker(JobKind::LibraryImport).begin().is_ok());
        assert!(jobs.tracker(JobKind::Enrichment).begin().is_ok());
    }

    #[test]
    fn test_snapshot_is_detached() {
        let tracker = JobTracker::new(JobKind::FilesystemImport);
        tracker.begin().unwrap();
        let snap = tracker.snapshot();
        tracker.update(|p| p.done = 5);
        assert_eq!(snap.done, 0);
        assert_eq!(tracker.snapshot().done, 5);
    }
}
