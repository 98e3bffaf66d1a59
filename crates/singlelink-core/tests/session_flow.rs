//! End-to-end session lifecycle against a mock Singlelink API.

use mockito::{Matcher, Server};
use serde_json::json;
use singlelink_core::{
    AccountDirectory, ApiClient, CookieJar, Credential, FileCookieJar, HistoryRouter,
    SessionManager, SignInError, ApiError, ACCOUNT_ROUTE, ROOT_ROUTE, TOKEN_COOKIE,
    USER_ID_COOKIE,
};

fn manager(server: &Server, dir: &std::path::Path) -> SessionManager<ApiClient, FileCookieJar, HistoryRouter> {
    let api = ApiClient::new(&server.url()).expect("mock server URL is valid");
    let jar = FileCookieJar::open(dir).expect("cookie dir is writable");
    SessionManager::new(api, jar, HistoryRouter::new())
}

#[tokio::test]
async fn test_sign_in_then_restore_after_restart() {
    let mut server = Server::new_async().await;
    let login = server
        .mock("POST", "/login")
        .match_body(Matcher::Json(json!({"email": "a@b.com", "password": "pw"})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"token":"T1","user":{"id":"42"}}"#)
        .expect(1)
        .create_async()
        .await;
    let account = server
        .mock("GET", "/accounts/42")
        .match_header("authorization", "Bearer T1")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id":"42","name":"Ada","email":"a@b.com"}"#)
        .expect(2)
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();

    let session = manager(&server, dir.path());
    let outcome = session.sign_in(&Credential::new("a@b.com", "pw")).await;
    assert!(outcome.is_signed_in());
    assert_eq!(session.cookies().get(TOKEN_COOKIE).as_deref(), Some("T1"));
    assert_eq!(session.cookies().get(USER_ID_COOKIE).as_deref(), Some("42"));
    assert_eq!(session.authorization().as_deref(), Some("Bearer T1"));
    assert_eq!(session.router().current().as_deref(), Some(ACCOUNT_ROUTE));
    assert_eq!(session.user().and_then(|u| u.name), Some("Ada".to_string()));
    drop(session);

    // A fresh process picks the session back up from disk
    let restored = manager(&server, dir.path());
    assert!(!restored.is_authenticated());
    assert!(restored.bootstrap().await);
    assert_eq!(restored.user().map(|u| u.id), Some("42".to_string()));
    assert!(restored.is_authenticated());

    login.assert_async().await;
    account.assert_async().await;
}

#[tokio::test]
async fn test_rejected_login_leaves_no_trace() {
    let mut server = Server::new_async().await;
    let _login = server
        .mock("POST", "/login")
        .with_status(401)
        .with_body(r#"{"message":"Invalid credentials"}"#)
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let session = manager(&server, dir.path());

    let outcome = session.sign_in(&Credential::new("a@b.com", "bad")).await;

    assert!(matches!(
        outcome.error(),
        Some(SignInError::Rejected(ApiError::Unauthorized))
    ));
    assert!(!session.is_authenticated());
    assert_eq!(session.cookies().get(TOKEN_COOKIE), None);
    assert!(!session.cookies().path().exists());
    assert!(session.router().history().is_empty());
}

#[tokio::test]
async fn test_authorized_client_follows_session_token() {
    let mut server = Server::new_async().await;
    let _login = server
        .mock("POST", "/login")
        .with_status(200)
        .with_body(r#"{"token":"T9","user":{"id":5}}"#)
        .create_async()
        .await;
    let lookup = server
        .mock("GET", "/accounts/5")
        .match_header("authorization", "Bearer T9")
        .with_status(200)
        .with_body(r#"{"id":5}"#)
        .expect(2)
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let session = manager(&server, dir.path());
    assert!(session.authorized_client().is_none());

    session.sign_in(&Credential::new("x@y.z", "pw")).await;
    let client = session.authorized_client().expect("signed in");
    assert_eq!(client.get_account_by_id("5", None).await.unwrap().id, "5");
    lookup.assert_async().await;

    session.sign_out();
    assert!(session.authorized_client().is_none());
    assert_eq!(session.router().current().as_deref(), Some(ROOT_ROUTE));
    assert_eq!(session.cookies().get(USER_ID_COOKIE).as_deref(), Some("5"));
    assert!(session.is_authenticated());
}
