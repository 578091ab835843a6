//! Student face enrollment against an in-process attendance service

mod support;

use std::sync::Arc;

use common::{ClientError, MemoryCredentialStore, Role};
use portal::{
    AuthService, CaptureQueue, Frame, Gateway, HttpTransport, LoginForm, QUORUM,
    ScriptedFrameSource, models::CaptureOutcome,
};

async fn signed_in_student(url: String) -> Gateway {
    let config = common::ClientConfig {
        api_url: url,
        credential_path: "unused.json".into(),
        request_timeout_secs: 5,
    };
    let gateway = Gateway::new(
        Arc::new(HttpTransport::new(&config).unwrap()),
        Arc::new(MemoryCredentialStore::new()),
    );
    AuthService::new(gateway.clone())
        .login(&LoginForm {
            username: support::STUDENT.to_string(),
            password: support::PASSWORD.to_string(),
            scope: Role::Student,
        })
        .await
        .unwrap();
    gateway
}

fn frames(count: usize) -> ScriptedFrameSource {
    ScriptedFrameSource::new(
        (0..count).map(|i| Frame::from_jpeg(format!("sample-{}", i).as_bytes())),
    )
}

#[tokio::test]
async fn test_quorum_gates_submission() {
    let (service, url) = support::spawn().await;
    let queue = CaptureQueue::new(signed_in_student(url).await);
    let source = frames(QUORUM);

    queue.capture_from(&source);
    queue.capture_from(&source);
    let result = queue.submit().await;

    assert!(matches!(result, Err(ClientError::Validation(_))));
    assert_eq!(service.capture_calls(), 0);
    assert_eq!(queue.len(), 2);

    queue.capture_from(&source);
    let outcome = queue.submit().await.unwrap();

    assert!(matches!(outcome, CaptureOutcome::Stored { samples: 3, .. }));
    assert_eq!(service.capture_calls(), 1);
    assert!(queue.is_empty());
    let enrollment = queue.enrollment().unwrap();
    assert!(enrollment.enrolled);
    assert_eq!(enrollment.samples, 3);
}

#[tokio::test]
async fn test_failed_submission_keeps_samples_for_retry() {
    let (service, url) = support::spawn().await;
    let queue = CaptureQueue::new(signed_in_student(url).await);
    let source = frames(QUORUM);
    while queue.capture_from(&source).is_some() {}
    service.fail_capture(true);

    let result = queue.submit().await;

    assert_eq!(
        result.unwrap_err(),
        ClientError::Remote {
            status: 503,
            message: "Face service unavailable".to_string(),
        }
    );
    assert_eq!(queue.len(), QUORUM);
    assert!(queue.status().unwrap().is_error());
    assert_eq!(service.capture_calls(), 1);

    service.fail_capture(false);
    queue.submit().await.unwrap();
    assert!(queue.is_empty());
    assert_eq!(service.capture_calls(), 2);
}
