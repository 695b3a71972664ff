use confession_core::{
    ApiClient, Batch, FeedConfig, FeedEvent, FeedViewModel, LoadState, SessionStore,
};
use reqwest::Client;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn confessions(n: usize) -> Value {
    let items: Vec<Value> = (1..=n)
        .map(|i| json!({"id": format!("100_{i}"), "fullId": format!("#ES_{i}"), "content": format!("post {i}")}))
        .collect();
    json!({ "confessions": items })
}

async fn mount_batch(server: &MockServer, limit: &str, template: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path("/api/confessions"))
        .and(query_param("limit", limit))
        .respond_with(template)
        .expect(1)
        .mount(server)
        .await;
}

fn client_for(server: &MockServer) -> ApiClient {
    ApiClient::with_http(
        Client::new(),
        &format!("{}/api", server.uri()),
        SessionStore::in_memory(),
    )
    .unwrap()
}

#[tokio::test]
async fn larger_full_batch_replaces_first_batch() {
    let server = MockServer::start().await;
    mount_batch(&server, "100", ResponseTemplate::new(200).set_body_json(confessions(3))).await;
    mount_batch(&server, "500", ResponseTemplate::new(200).set_body_json(confessions(30))).await;

    let mut feed = FeedViewModel::new(12);
    feed.load(&client_for(&server), &FeedConfig::default()).await;
    assert_eq!(feed.state(), &LoadState::Ready);
    assert_eq!(feed.all().len(), 30);
    assert_eq!(feed.total_pages(), 3);
}

#[tokio::test]
async fn failed_full_batch_keeps_first_batch() {
    let server = MockServer::start().await;
    mount_batch(&server, "100", ResponseTemplate::new(200).set_body_json(confessions(5))).await;
    mount_batch(&server, "500", ResponseTemplate::new(500)).await;

    let mut feed = FeedViewModel::new(12);
    feed.load(&client_for(&server), &FeedConfig::default()).await;
    assert_eq!(feed.state(), &LoadState::Ready);
    assert_eq!(feed.all().len(), 5);
}

#[tokio::test]
async fn failed_first_batch_skips_full_batch() {
    let server = MockServer::start().await;
    mount_batch(&server, "100", ResponseTemplate::new(503)).await;
    Mock::given(method("GET"))
        .and(path("/api/confessions"))
        .and(query_param("limit", "500"))
        .respond_with(ResponseTemplate::new(200).set_body_json(confessions(9)))
        .expect(0)
        .mount(&server)
        .await;

    let mut feed = FeedViewModel::new(12);
    feed.load(&client_for(&server), &FeedConfig::default()).await;
    assert!(matches!(feed.state(), LoadState::Failed(_)));
    assert!(feed.all().is_empty());
}

#[tokio::test]
async fn background_load_publishes_first_batch_before_full_batch() {
    let server = MockServer::start().await;
    mount_batch(&server, "100", ResponseTemplate::new(200).set_body_json(confessions(2))).await;
    mount_batch(
        &server,
        "500",
        ResponseTemplate::new(200)
            .set_body_json(confessions(4))
            .set_delay(std::time::Duration::from_millis(200)),
    )
    .await;

    let (tx, mut rx) = mpsc::channel(4);
    let mut feed = FeedViewModel::new(12);
    let handle = feed.start_load(client_for(&server), FeedConfig::default(), tx);
    assert!(feed.is_loading());

    let first = rx.recv().await.expect("first batch");
    assert!(matches!(first.batch, Batch::First(Ok(_))));
    feed.apply(first);
    assert_eq!(feed.all().len(), 2);
    assert_eq!(feed.state(), &LoadState::Ready);

    let full: FeedEvent = rx.recv().await.expect("full batch");
    feed.apply(full);
    assert_eq!(feed.all().len(), 4);

    handle.await.unwrap();
}
