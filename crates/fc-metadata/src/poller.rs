//! Submit a job and poll it until the server reports it done.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::job::{Job, JobKind};

/// Default first wait between submission and the first status check.
pub const DEFAULT_INITIAL_INTERVAL: Duration = Duration::from_millis(1000);

/// Default growth of the wait between status checks.
pub const DEFAULT_BACKOFF_FACTOR: f64 = 1.3;

/// Poll intervals: the initial interval, then each one `factor` times the
/// previous. Never ends and has no upper bound.
#[derive(Debug, Clone)]
pub struct Backoff {
    next_millis: f64,
    factor: f64,
}

impl Backoff {
    pub fn new(initial: Duration, factor: f64) -> Self {
        Self {
            next_millis: initial.as_secs_f64() * 1000.0,
            factor,
        }
    }

    /// The next interval, rounded to whole milliseconds.
    pub fn next_interval(&mut self) -> Duration {
        let current = self.next_millis;
        self.next_millis = current * self.factor;
        Duration::from_millis(current.round() as u64)
    }
}

impl Iterator for Backoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        Some(self.next_interval())
    }
}

/// Drives a job from submission to a terminal status.
///
/// A job that ends with [`TRANSIENT_JOB_ERROR`](crate::TRANSIENT_JOB_ERROR)
/// is submitted again from scratch, with a new id and a fresh backoff. There
/// is no limit on polls or resubmissions.
#[derive(Debug, Clone)]
pub struct JobPoller {
    initial_interval: Duration,
    backoff_factor: f64,
}

impl Default for JobPoller {
    fn default() -> Self {
        Self {
            initial_interval: DEFAULT_INITIAL_INTERVAL,
            backoff_factor: DEFAULT_BACKOFF_FACTOR,
        }
    }
}

impl JobPoller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_initial_interval(mut self, interval: Duration) -> Self {
        self.initial_interval = interval;
        self
    }

    pub fn with_backoff_factor(mut self, factor: f64) -> Self {
        self.backoff_factor = factor;
        self
    }

    pub fn backoff(&self) -> Backoff {
        Backoff::new(self.initial_interval, self.backoff_factor)
    }

    /// Submit with `submit`, which yields the job id, then call `status`
    /// until it returns a job with `done` set.
    ///
    /// The returned job may have failed; callers check [`Job::success`].
    pub async fn submit_and_await<S, SF, P, PF>(
        &self,
        kind: JobKind,
        mut submit: S,
        mut status: P,
    ) -> Result<Job>
    where
        S: FnMut() -> SF,
        SF: Future<Output = Result<String>>,
        P: FnMut(String) -> PF,
        PF: Future<Output = Result<Job>>,
    {
        loop {
            let id = submit().await?;
            info!(%kind, id = %id, "Job submitted");

            let mut backoff = self.backoff();
            let job = loop {
                let interval = backoff.next_interval();
                debug!(id = %id, ?interval, "Waiting");
                sleep(interval).await;

                let current = status(id.clone()).await?;
                debug!(id = %id, status = ?current.status_text, done = current.done, "Job status");
                if current.done {
                    break current;
                }
            };

            if job.needs_resubmit() {
                warn!(
                    %kind,
                    id = %job.id,
                    message = job.error_message.as_deref().unwrap_or_default(),
                    "Job failed with a transient server error, submitting again"
                );
                continue;
            }
            return Ok(job);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, ErrorKind};
    use forcecmd_xml::{XmlObject, XmlValue};
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use tokio::time::Instant;

    fn status(id: &str, done: bool, error_code: Option<&str>) -> Job {
        let mut result = XmlObject::new()
            .with("done", done)
            .with("id", id)
            .with("success", done && error_code.is_none());
        if let Some(code) = error_code {
            result.insert("errorStatusCode", code);
        }
        Job::from_xml(JobKind::Retrieve, XmlValue::Object(result))
    }

    /// Scripted server: submissions hand out ids in order, status checks pop
    /// the next scripted status and record when they happened.
    #[derive(Clone)]
    struct Script {
        ids: Arc<Mutex<VecDeque<&'static str>>>,
        statuses: Arc<Mutex<VecDeque<Job>>>,
        checks: Arc<Mutex<Vec<(String, Duration)>>>,
        start: Instant,
    }

    impl Script {
        fn new(ids: Vec<&'static str>, statuses: Vec<Job>) -> Self {
            Self {
                ids: Arc::new(Mutex::new(ids.into())),
                statuses: Arc::new(Mutex::new(statuses.into())),
                checks: Arc::default(),
                start: Instant::now(),
            }
        }

        async fn run(&self, poller: &JobPoller) -> Result<Job> {
            poller
                .submit_and_await(
                    JobKind::Retrieve,
                    || {
                        let id = self.ids.lock().unwrap().pop_front();
                        async move {
                            id.map(str::to_string)
                                .ok_or_else(|| Error::new(ErrorKind::Other("no more ids".into())))
                        }
                    },
                    |id| {
                        self.checks.lock().unwrap().push((id, self.start.elapsed()));
                        let next = self.statuses.lock().unwrap().pop_front();
                        async move { Ok(next.expect("unexpected status check")) }
                    },
                )
                .await
        }

        fn checks(&self) -> Vec<(String, Duration)> {
            self.checks.lock().unwrap().clone()
        }
    }

    fn millis(checks: &[(String, Duration)]) -> Vec<u128> {
        checks.iter().map(|(_, at)| at.as_millis()).collect()
    }

    #[test]
    fn test_backoff_grows_by_factor() {
        let intervals: Vec<u128> = JobPoller::new().backoff().take(5).map(|d| d.as_millis()).collect();
        assert_eq!(intervals, vec![1000, 1300, 1690, 2197, 2856]);
    }

    #[test]
    fn test_backoff_has_no_cap() {
        let last = JobPoller::new().backoff().nth(40).unwrap();
        assert!(last > Duration::from_secs(3600));
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_until_done() {
        let script = Script::new(
            vec!["J1"],
            vec![
                status("J1", false, None),
                status("J1", false, None),
                status("J1", true, None),
            ],
        );

        let job = script.run(&JobPoller::new()).await.unwrap();

        assert!(job.done);
        assert!(job.success);
        let checks = script.checks();
        assert!(checks.iter().all(|(id, _)| id == "J1"));
        // Cumulative: 1000, 1000 + 1300, 1000 + 1300 + 1690.
        assert_eq!(millis(&checks), vec![1000, 2300, 3990]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_job_is_returned() {
        let script = Script::new(
            vec!["J1"],
            vec![status("J1", true, Some("INVALID_CROSS_REFERENCE_KEY"))],
        );

        let job = script.run(&JobPoller::new()).await.unwrap();
        assert!(!job.success);
        assert_eq!(job.error_code.as_deref(), Some("INVALID_CROSS_REFERENCE_KEY"));
        assert_eq!(script.checks().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failure_resubmits_with_fresh_backoff() {
        let script = Script::new(
            vec!["J1", "J2"],
            vec![
                status("J1", false, None),
                status("J1", true, Some("UNKNOWN_EXCEPTION")),
                status("J2", false, None),
                status("J2", true, None),
            ],
        );

        let job = script.run(&JobPoller::new()).await.unwrap();

        assert_eq!(job.id, "J2");
        assert!(job.success);
        let checks = script.checks();
        let ids: Vec<&str> = checks.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["J1", "J1", "J2", "J2"]);
        // The second cycle starts again at 1000 ms after the first one ended.
        assert_eq!(millis(&checks), vec![1000, 2300, 3300, 4600]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_error_propagates() {
        let script = Script::new(vec![], vec![]);
        let err = script.run(&JobPoller::new()).await.unwrap_err();
        assert_eq!(err.to_string(), "no more ids");
        assert!(script.checks().is_empty());
    }
}
