//! REST adapter tests against a mock engine

use ofh_client::{ClientConfig, XlReleaseClient};
use ofh_core::{
    Comment, EngineError, PhaseMutator, ReleaseDirectory, TaskDraft, TaskKind, TaskMutator,
    TaskStatus, Variable, VariableRegistrar,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{basic_auth, body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> XlReleaseClient {
    XlReleaseClient::new(
        ClientConfig::new(server.uri(), "onFailure_user")
            .with_password("secret")
            .with_timeout(Duration::from_secs(5)),
    )
    .unwrap()
}

#[tokio::test]
async fn fetches_release_with_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/releases/Applications/Rel1"))
        .and(basic_auth("onFailure_user", "secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "Applications/Rel1",
            "title": "Rel1",
            "phases": [
                { "id": "Applications/Rel1/Phase1", "title": "Deploy", "status": "FAILED",
                  "tasks": [
                      { "id": "Applications/Rel1/Phase1/Task1", "type": "xlrelease.ScriptTask",
                        "title": "Deploy", "status": "FAILED" }
                  ] },
                { "id": "Applications/Rel1/Phase2", "title": "onFailure", "status": "PLANNED",
                  "tasks": [] }
            ],
            "variables": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let release = client_for(&server).get_release("Applications/Rel1").await.unwrap();

    assert_eq!(release.id, "Applications/Rel1");
    assert!(release.has_failed_phase());
    assert!(release.phase_titled("onFailure").is_some());
    assert_eq!(release.phases[0].tasks[0].status, TaskStatus::Failed);
}

#[tokio::test]
async fn missing_release_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/releases/Applications/Nope"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .get_release("Applications/Nope")
        .await
        .unwrap_err();

    assert!(err.is_not_found());
}

#[tokio::test]
async fn server_error_is_rejected_with_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/tasks/Applications/Rel1/Phase1/Task1/skip"))
        .respond_with(ResponseTemplate::new(500).set_body_string("task is locked"))
        .expect(1)
        .mount(&server)
        .await;

    let err = client_for(&server)
        .skip_task("Applications/Rel1/Phase1/Task1", &Comment::new("x"))
        .await
        .unwrap_err();

    match err {
        EngineError::Rejected {
            operation,
            status,
            message,
        } => {
            assert_eq!(operation, "skip task");
            assert_eq!(status, 500);
            assert_eq!(message, "task is locked");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn malformed_release_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
        .mount(&server)
        .await;

    let err = client_for(&server).get_release("Applications/Rel1").await.unwrap_err();

    assert!(matches!(err, EngineError::Decode(_)));
}

#[tokio::test]
async fn unreachable_engine_is_transport_error() {
    let client = XlReleaseClient::new(
        ClientConfig::new("http://127.0.0.1:9", "onFailure_user")
            .with_timeout(Duration::from_secs(2)),
    )
    .unwrap();

    let err = client.get_release("Applications/Rel1").await.unwrap_err();

    assert!(matches!(err, EngineError::Transport(_)));
}

#[tokio::test]
async fn adds_placeholder_at_position() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/phases/Applications/Rel1/Phase1/tasks"))
        .and(query_param("position", "1"))
        .and(body_json(json!({
            "type": "xlrelease.Task",
            "title": "Skip to Fallback",
            "description": "Automatically added by onFailure handler",
            "owner": "ops1"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "Applications/Rel1/Phase1/Task2",
            "type": "xlrelease.Task",
            "title": "Skip to Fallback",
            "status": "PLANNED",
            "owner": "ops1"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let draft = TaskDraft::manual("Skip to Fallback")
        .with_description("Automatically added by onFailure handler")
        .with_owner("ops1");
    let task = client_for(&server)
        .add_task("Applications/Rel1/Phase1", &draft, 1)
        .await
        .unwrap();

    assert_eq!(task.id, "Applications/Rel1/Phase1/Task2");
    assert_eq!(task.kind, TaskKind::Manual);
    assert!(task.is_planned());
}

#[tokio::test]
async fn assigns_and_skips_with_comment() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/tasks/Applications/Rel1/Phase2/Task1/assign/ops1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/tasks/Applications/Rel1/Phase2/Task1/skip"))
        .and(body_json(json!({ "comment": "Skipped by onFailure handler" })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client
        .assign_task("Applications/Rel1/Phase2/Task1", "ops1")
        .await
        .unwrap();
    client
        .skip_task(
            "Applications/Rel1/Phase2/Task1",
            &Comment::new("Skipped by onFailure handler"),
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn creates_boolean_marker_variable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/releases/Applications/Rel1/variables"))
        .and(body_json(json!({
            "key": "releaseFailed",
            "type": "xlrelease.BooleanVariable",
            "value": true,
            "requiresValue": false,
            "label": "Has this release failed?",
            "description": "Automatically set by onFailure handler"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "v1" })))
        .expect(1)
        .mount(&server)
        .await;

    let marker = Variable::boolean("releaseFailed", true)
        .with_label("Has this release failed?")
        .with_description("Automatically set by onFailure handler");

    client_for(&server)
        .create_variable("Applications/Rel1", &marker)
        .await
        .unwrap();
}

#[tokio::test]
async fn user_name_is_a_single_encoded_segment() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/tasks/Applications/Rel1/Phase1/Task1/assign/ops%231"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(
            "/api/v1/tasks/Applications/Rel1/Phase1/Task1/assign/..%2F..%2F..%2Freleases%2FApplications%2FOther%2Fvariables",
        ))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client
        .assign_task("Applications/Rel1/Phase1/Task1", "ops#1")
        .await
        .unwrap();
    client
        .assign_task(
            "Applications/Rel1/Phase1/Task1",
            "../../../releases/Applications/Other/variables",
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn query_characters_in_ids_stay_in_the_path() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/releases/Applications/Rel1%3Fx=1"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let err = client_for(&server)
        .get_release("Applications/Rel1?x=1")
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].url.query(), None);
}

#[tokio::test]
async fn traversal_in_ids_is_refused_before_sending() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = client_for(&server)
        .skip_task("Applications/Rel1/../Other/Task1", &Comment::new("x"))
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::InvalidInput(_)));
}
