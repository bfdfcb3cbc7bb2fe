//! S3 storage client against a mock object store

use std::time::Duration;
use assert_matches::assert_matches;
use tokio_test::{assert_err, assert_ok};
use wiremock::{
    matchers::{body_bytes, header, method, path},
    Mock, MockServer, ResponseTemplate,
};
use scholardesk::storage::{DocumentStorage, RetryPolicy, S3Storage};
use scholardesk::utils::errors::StorageError;

fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        base_delay: Duration::from_millis(5),
    }
}

async fn storage() -> (MockServer, S3Storage) {
    let server = MockServer::start().await;
    let store = S3Storage::new(&server.uri(), "docs").with_retry(fast_retry());
    (server, store)
}

#[tokio::test]
async fn test_put_sends_body_and_content_type() {
    let (server, store) = storage().await;

    Mock::given(method("PUT"))
        .and(path("/docs/uploads/applicants/4/passport/scan.pdf"))
        .and(header("content-type", "application/pdf"))
        .and(body_bytes(b"%PDF".to_vec()))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    assert_ok!(
        store
            .put("uploads/applicants/4/passport/scan.pdf", b"%PDF".to_vec(), "application/pdf")
            .await
    );
}

#[tokio::test]
async fn test_bearer_token_is_sent() {
    let server = MockServer::start().await;
    let store = S3Storage::new(&server.uri(), "docs")
        .with_retry(fast_retry())
        .with_bearer_token(Some("secret-token".to_string()));

    Mock::given(method("HEAD"))
        .and(path("/docs/a.pdf"))
        .and(header("authorization", "Bearer secret-token"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    assert!(store.exists("a.pdf").await.unwrap());
}

#[tokio::test]
async fn test_get_and_missing_objects() {
    let (server, store) = storage().await;

    Mock::given(method("GET"))
        .and(path("/docs/present.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"content".to_vec()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/docs/absent.pdf"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/docs/absent.pdf"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    assert_eq!(store.get("present.pdf").await.unwrap(), b"content".to_vec());
    assert_matches!(store.get("absent.pdf").await, Err(StorageError::NotFound(_)));
    assert!(!store.exists("absent.pdf").await.unwrap());
    assert_err!(store.get("absent.pdf").await);
}

#[tokio::test]
async fn test_delete_missing_is_ok() {
    let (server, store) = storage().await;

    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    assert_ok!(store.delete("gone.pdf").await);
}

#[tokio::test]
async fn test_server_errors_are_retried() {
    let (server, store) = storage().await;

    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    assert_matches!(
        store.put("flaky.pdf", b"x".to_vec(), "application/pdf").await,
        Err(StorageError::RequestFailed(_))
    );
}

#[tokio::test]
async fn test_client_errors_fail_fast() {
    let (server, store) = storage().await;

    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;

    assert_matches!(
        store.put("denied.pdf", b"x".to_vec(), "application/pdf").await,
        Err(StorageError::Rejected { status: 403, .. })
    );
}
