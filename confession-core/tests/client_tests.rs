use confession_core::{
    AdminUser, ApiClient, ApiError, AuthEvent, ImageAttachment, SessionStore, ValidationError,
};
use reqwest::{Client, StatusCode};
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer, session: SessionStore) -> ApiClient {
    ApiClient::with_http(Client::new(), &format!("{}/api", server.uri()), session).unwrap()
}

async fn logged_in(token: &str) -> SessionStore {
    let session = SessionStore::in_memory();
    session
        .store(
            token.into(),
            AdminUser {
                username: "admin".into(),
                extra: Default::default(),
            },
        )
        .await;
    session
}

#[tokio::test]
async fn get_confessions_accepts_wrapped_and_bare_bodies() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/confessions"))
        .and(query_param("limit", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "confessions": [{"id": "1_2", "fullId": "#ES_1", "content": "hi"}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/confessions"))
        .and(query_param("limit", "500"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "1_2", "content": "hi"},
            {"id": 3, "content": "there", "esId": 3}
        ])))
        .mount(&server)
        .await;

    let client = client_for(&server, SessionStore::in_memory());
    let wrapped = client.get_confessions(100).await.unwrap();
    assert_eq!(wrapped.len(), 1);
    assert_eq!(wrapped[0].display_id(), "#ES_1");

    let bare = client.get_confessions(500).await.unwrap();
    assert_eq!(bare.len(), 2);
    assert_eq!(bare[1].id, "3");
}

#[tokio::test]
async fn stored_token_is_sent_as_bearer() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/admin/stats"))
        .and(header("authorization", "Bearer tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "website": 2, "google_sheets": 3, "total": 5
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, logged_in("tok-1").await);
    let stats = client.get_stats().await.unwrap();
    assert_eq!(stats.total, 5);
    assert_eq!(stats.google_sheets, 3);
}

#[tokio::test]
async fn overlong_content_is_rejected_without_network() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/confessions/submit"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = client_for(&server, SessionStore::in_memory());
    let err = client
        .submit_confession(&"a".repeat(1001), &[])
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ApiError::Validation(ValidationError::ContentTooLong { len: 1001, max: 1000 })
    ));
}

#[tokio::test]
async fn six_images_are_rejected_without_network() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/confessions/submit"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let images: Vec<ImageAttachment> = (0..6)
        .map(|i| ImageAttachment::new(format!("{i}.png"), "image/png", vec![1u8, 2, 3]))
        .collect();
    let client = client_for(&server, SessionStore::in_memory());
    let err = client.submit_confession("hello", &images).await.unwrap_err();
    assert!(matches!(
        err,
        ApiError::Validation(ValidationError::TooManyImages { count: 6, max: 5 })
    ));
}

#[tokio::test]
async fn submission_is_sent_as_multipart() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/confessions/submit"))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({"message": "queued", "id": 77})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, SessionStore::in_memory());
    let images = vec![
        ImageAttachment::new("a.png", "image/png", vec![1u8, 2, 3]),
        ImageAttachment::new("b.jpg", "image/jpeg", vec![4u8, 5]),
    ];
    let receipt = client.submit_confession("hello there", &images).await.unwrap();
    assert_eq!(receipt.id.as_deref(), Some("77"));

    let requests = server.received_requests().await.unwrap();
    let content_type = requests[0]
        .headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.starts_with("multipart/form-data; boundary="));
    let body = String::from_utf8_lossy(&requests[0].body);
    assert!(body.contains("name=\"content\""));
    assert_eq!(body.matches("name=\"images\"").count(), 2);
}

#[tokio::test]
async fn forbidden_admin_call_clears_session_and_prompts_login_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/admin/pending"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({"error": "expired"})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/admin/approve/1_2"))
        .respond_with(ResponseTemplate::new(401))
        .expect(0)
        .mount(&server)
        .await;

    let session = logged_in("stale").await;
    let client = client_for(&server, session.clone());
    let mut events = client.auth_events();

    let err = client
        .get_pending(Default::default(), 1, 10)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ApiError::Auth {
            status: Some(StatusCode::FORBIDDEN)
        }
    ));
    assert!(session.token().await.is_none());

    // Credential is gone, so this fails locally and must not prompt again.
    let err = client.approve("1_2", None).await.unwrap_err();
    assert!(err.is_auth());

    assert_eq!(events.try_recv().ok(), Some(AuthEvent::LoginRequired));
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn login_stores_session_and_rearms_prompt() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/admin/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "fresh",
            "user": {"username": "admin", "role": "owner"}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/admin/stats"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let session = SessionStore::in_memory();
    let client = client_for(&server, session.clone());
    let mut events = client.auth_events();

    assert!(client.get_stats().await.unwrap_err().is_auth());
    assert_eq!(events.try_recv().ok(), Some(AuthEvent::LoginRequired));

    let response = client.login("admin", "secret").await.unwrap();
    assert_eq!(response.user.extra.get("role"), Some(&json!("owner")));
    assert_eq!(session.token().await.as_deref(), Some("fresh"));

    assert!(client.get_stats().await.unwrap_err().is_auth());
    assert_eq!(events.try_recv().ok(), Some(AuthEvent::LoginRequired));
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn rejected_login_is_an_inline_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/admin/login"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"error": "Invalid credentials"})),
        )
        .mount(&server)
        .await;

    let client = client_for(&server, SessionStore::in_memory());
    let mut events = client.auth_events();
    let err = client.login("admin", "wrong").await.unwrap_err();
    assert_eq!(err.user_message(), "Invalid credentials");
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn backend_error_without_message_uses_generic_text() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/confessions"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let client = client_for(&server, SessionStore::in_memory());
    let err = client.get_confessions(100).await.unwrap_err();
    match &err {
        ApiError::Api { status, message } => {
            assert_eq!(*status, StatusCode::BAD_GATEWAY);
            assert!(message.is_none());
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.user_message(), confession_core::error::GENERIC_FAILURE);
}
