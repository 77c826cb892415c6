//! Task polling client.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};
use vcd_core::{Error, Session};

use crate::models::{Task, TaskStatus, TasksList};
use crate::Result;

/// Client that observes tasks until they finish.
///
/// It only reads task documents; it never asks the server to cancel a task.
#[derive(Debug, Clone)]
pub struct TaskClient {
    session: Session,
    poll_interval: Duration,
}

impl TaskClient {
    /// Create a client using the session's poll interval.
    #[must_use]
    pub fn new(session: Session) -> Self {
        let poll_interval = session.task_poll_interval();
        Self {
            session,
            poll_interval,
        }
    }

    /// Override the poll interval.
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// The fixed interval between polls.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Fetch a task by HREF.
    pub async fn get_task(&self, href: &str) -> Result<Task> {
        if href.is_empty() {
            return Err(Error::InvalidRequest("task has no HREF".to_string()));
        }
        let doc = self.session.transport().fetch(href, None).await?;
        Task::from_document(doc)
    }

    /// Fetch a fresh snapshot of `task`.
    pub async fn refresh(&self, task: &Task) -> Result<Task> {
        self.get_task(&task.href).await
    }

    /// List the tasks at an organization's task-list HREF.
    pub async fn get_task_list(&self, href: &str) -> Result<TasksList> {
        self.session.fetch_as(href, None).await
    }

    /// Poll `task` until it reaches a terminal status.
    ///
    /// Returns the successful snapshot. Fails with [`Error::TaskFailed`] for
    /// `error` or `aborted`, and with [`Error::Cancelled`] if `cancel` fires
    /// first. There is no overall timeout.
    pub async fn wait_until_complete(
        &self,
        task: &Task,
        cancel: Option<&CancellationToken>,
    ) -> Result<Task> {
        self.wait_inspect(task, cancel, |_| {}).await
    }

    /// Like [`TaskClient::wait_until_complete`], calling `inspect` with every
    /// snapshot fetched.
    pub async fn wait_inspect<F>(
        &self,
        task: &Task,
        cancel: Option<&CancellationToken>,
        mut inspect: F,
    ) -> Result<Task>
    where
        F: FnMut(&Task),
    {
        let never = CancellationToken::new();
        let cancel = cancel.unwrap_or(&never);
        let mut polls: u64 = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(cancelled(task, polls));
            }

            let current = self.refresh(task).await?;
            polls += 1;
            inspect(&current);
            trace!(href = %current.href, status = %current.status, polls, "task polled");

            match current.status {
                TaskStatus::Success => {
                    debug!(href = %current.href, polls, "task succeeded");
                    return Ok(current);
                }
                TaskStatus::Error | TaskStatus::Aborted => {
                    debug!(href = %current.href, status = %current.status, polls, "task failed");
                    return Err(Error::TaskFailed {
                        message: current.failure_message(),
                    });
                }
                _ => {}
            }

            tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(cancelled(task, polls)),
                () = tokio::time::sleep(self.poll_interval) => {}
            }
        }
    }
}

fn cancelled(task: &Task, polls: u64) -> Error {
    debug!(href = %task.href, polls, "task wait cancelled");
    Error::Cancelled(format!("wait for task {} cancelled after {polls} polls", task.href))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mockall::mock;
    use reqwest::Method;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Instant;
    use vcd_core::{ApiVersion, Transport};

    mock! {
        pub Transport {}

        #[async_trait]
        impl Transport for Transport {
            async fn fetch(&self, href: &str, version: Option<ApiVersion>) -> vcd_core::Result<Value>;
            async fn send(
                &self,
                method: Method,
                href: &str,
                version: Option<ApiVersion>,
                body: Option<Value>,
            ) -> vcd_core::Result<Value>;
        }
    }

    const TASK_HREF: &str = "https://vcd.example.com/api/task/1";

    fn task_doc(status: &str) -> Value {
        json!({"href": TASK_HREF, "status": status})
    }

    fn initial_task() -> Task {
        Task::from_document(task_doc("queued")).unwrap()
    }

    /// Transport that answers task polls from a fixed script and counts them.
    fn scripted(script: Vec<Value>, expected_polls: usize) -> (MockTransport, Arc<AtomicUsize>) {
        let polls = Arc::new(AtomicUsize::new(0));
        let counter = polls.clone();
        let mut mock = MockTransport::new();
        mock.expect_fetch()
            .withf(|href, _| href == TASK_HREF)
            .times(expected_polls)
            .returning(move |_, _| {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                Ok(script[n.min(script.len() - 1)].clone())
            });
        (mock, polls)
    }

    fn client(mock: MockTransport, interval: Duration) -> TaskClient {
        let session = Session::builder(Arc::new(mock)).build();
        TaskClient::new(session).with_poll_interval(interval)
    }

    #[tokio::test]
    async fn succeeds_after_exactly_n_polls() {
        let script = vec![
            task_doc("queued"),
            task_doc("running"),
            task_doc("running"),
            task_doc("success"),
        ];
        let (mock, polls) = scripted(script, 4);
        let client = client(mock, Duration::from_millis(1));

        let done = client
            .wait_until_complete(&initial_task(), None)
            .await
            .unwrap();
        assert_eq!(done.status, TaskStatus::Success);
        assert_eq!(polls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn error_status_carries_server_message() {
        let script = vec![
            task_doc("running"),
            json!({
                "href": TASK_HREF,
                "status": "error",
                "error": {"message": "The VDC is busy"}
            }),
        ];
        let (mock, polls) = scripted(script, 2);
        let client = client(mock, Duration::from_millis(1));

        let err = client
            .wait_until_complete(&initial_task(), None)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            Error::TaskFailed {
                message: "The VDC is busy".to_string()
            }
        );
        assert_eq!(polls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn aborted_is_a_failure() {
        let (mock, _) = scripted(vec![task_doc("aborted")], 1);
        let client = client(mock, Duration::from_millis(1));

        let err = client
            .wait_until_complete(&initial_task(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::TaskFailed { .. }));
    }

    #[tokio::test]
    async fn unknown_statuses_keep_polling() {
        let script = vec![task_doc("paused"), task_doc("preRunning"), task_doc("success")];
        let (mock, polls) = scripted(script, 3);
        let client = client(mock, Duration::from_millis(1));

        client
            .wait_until_complete(&initial_task(), None)
            .await
            .unwrap();
        assert_eq!(polls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn cancellation_returns_within_one_interval() {
        let mut mock = MockTransport::new();
        mock.expect_fetch()
            .returning(|_, _| Ok(task_doc("running")));
        let client = client(mock, Duration::from_secs(3600));

        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let err = tokio::time::timeout(
            Duration::from_secs(5),
            client.wait_until_complete(&initial_task(), Some(&token)),
        )
        .await
        .expect("wait should observe cancellation")
        .unwrap_err();

        assert!(matches!(err, Error::Cancelled(_)));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn cancelled_before_start_does_not_poll() {
        let mut mock = MockTransport::new();
        mock.expect_fetch().times(0);
        let client = client(mock, Duration::from_millis(1));

        let token = CancellationToken::new();
        token.cancel();
        let err = client
            .wait_until_complete(&initial_task(), Some(&token))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled(_)));
    }

    #[tokio::test]
    async fn no_total_timeout_without_cancellation() {
        let mut mock = MockTransport::new();
        mock.expect_fetch()
            .returning(|_, _| Ok(task_doc("running")));
        let client = client(mock, Duration::from_millis(5));

        let outcome = tokio::time::timeout(
            Duration::from_millis(200),
            client.wait_until_complete(&initial_task(), None),
        )
        .await;
        assert!(outcome.is_err(), "wait must still be pending");
    }

    #[tokio::test]
    async fn transport_errors_propagate() {
        let mut mock = MockTransport::new();
        mock.expect_fetch()
            .times(1)
            .returning(|_, _| Err(Error::ServerError("boom".into())));
        let client = client(mock, Duration::from_millis(1));

        let err = client
            .wait_until_complete(&initial_task(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ServerError(_)));
    }

    #[tokio::test]
    async fn wait_inspect_sees_every_snapshot() {
        let script = vec![
            json!({"href": TASK_HREF, "status": "running", "progress": 10}),
            json!({"href": TASK_HREF, "status": "running", "progress": 60}),
            json!({"href": TASK_HREF, "status": "success", "progress": 100}),
        ];
        let (mock, _) = scripted(script, 3);
        let client = client(mock, Duration::from_millis(1));

        let mut seen = Vec::new();
        client
            .wait_inspect(&initial_task(), None, |task| seen.push(task.progress))
            .await
            .unwrap();
        assert_eq!(seen, vec![Some(10), Some(60), Some(100)]);
    }

    #[tokio::test]
    async fn independent_waits_run_concurrently() {
        let mut mock = MockTransport::new();
        let counts = Arc::new(AtomicUsize::new(0));
        let counter = counts.clone();
        mock.expect_fetch().returning(move |href, _| {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            let status = if href.ends_with("/a") || n >= 4 { "success" } else { "running" };
            Ok(json!({"href": href, "status": status}))
        });
        let client = client(mock, Duration::from_millis(1));

        let a = Task::from_document(json!({"href": "task/a", "status": "queued"})).unwrap();
        let b = Task::from_document(json!({"href": "task/b", "status": "queued"})).unwrap();
        let (ra, rb) = tokio::join!(
            client.wait_until_complete(&a, None),
            client.wait_until_complete(&b, None)
        );
        assert_eq!(ra.unwrap().href, "task/a");
        assert_eq!(rb.unwrap().href, "task/b");
    }

    #[tokio::test]
    async fn empty_href_is_rejected() {
        let mut mock = MockTransport::new();
        mock.expect_fetch().times(0);
        let client = client(mock, Duration::from_millis(1));

        let task = Task::from_document(json!({"href": "", "status": "queued"})).unwrap();
        let err = client.wait_until_complete(&task, None).await.unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
    }
}
