use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use vcd_core::client::ServiceClientBuilder;
use vcd_core::{Error, Session};
use vcd_task::{CancellationToken, Task, TaskClient, TaskStatus};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn task_client(server: &MockServer) -> TaskClient {
    let client = ServiceClientBuilder::new(format!("{}/api", server.uri()))
        .unwrap()
        .build()
        .unwrap();
    let session = Session::builder(Arc::new(client))
        .with_task_poll_interval(Duration::from_millis(5))
        .build();
    TaskClient::new(session)
}

fn queued(server: &MockServer) -> Task {
    Task::from_document(json!({
        "href": format!("{}/api/task/42", server.uri()),
        "status": "queued"
    }))
    .unwrap()
}

#[tokio::test]
async fn waits_over_http_until_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/task/42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "href": format!("{}/api/task/42", server.uri()),
            "status": "running",
            "progress": 50
        })))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/task/42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "href": format!("{}/api/task/42", server.uri()),
            "status": "success",
            "progress": 100,
            "endTime": "2024-05-01T10:05:00Z"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = task_client(&server);
    let done = client
        .wait_until_complete(&queued(&server), None)
        .await
        .unwrap();
    assert_eq!(done.status, TaskStatus::Success);
    assert_eq!(done.progress, Some(100));
    assert!(done.end_time.is_some());
}

#[tokio::test]
async fn server_error_message_is_reported_verbatim() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/task/42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "href": format!("{}/api/task/42", server.uri()),
            "status": "error",
            "error": {"message": "[ 1b2c ] Unable to power on VM: insufficient memory"}
        })))
        .mount(&server)
        .await;

    let err = task_client(&server)
        .wait_until_complete(&queued(&server), None)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        Error::TaskFailed {
            message: "[ 1b2c ] Unable to power on VM: insufficient memory".to_string()
        }
    );
}

#[tokio::test]
async fn cancellation_leaves_server_task_alone() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/task/42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "href": format!("{}/api/task/42", server.uri()),
            "status": "running"
        })))
        .mount(&server)
        .await;
    // No cancel request may ever reach the server.
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;

    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        trigger.cancel();
    });

    let err = task_client(&server)
        .wait_until_complete(&queued(&server), Some(&token))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Cancelled(_)));
}

#[tokio::test]
async fn task_list_is_decoded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tasksList/acme"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "task": [
                {"href": "https://vcd.example.com/api/task/1", "status": "success"},
                {"href": "https://vcd.example.com/api/task/2", "status": "running"}
            ]
        })))
        .mount(&server)
        .await;

    let list = task_client(&server)
        .get_task_list("tasksList/acme")
        .await
        .unwrap();
    assert_eq!(list.task.len(), 2);
    assert!(list.task[0].is_terminal());
    assert!(!list.task[1].is_terminal());
}
