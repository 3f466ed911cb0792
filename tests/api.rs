//! Named API operations against a mock server.

use convore::{Client, CreateGroup, Error, GroupKind, ParameterError, Reply};
use serde::Deserialize;
use serde_json::json;
use tokio_test::assert_ok;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> Client {
    Client::builder()
        .credentials("alice", "s3cret")
        .base_url(server.uri())
        .build()
        .unwrap()
}

#[tokio::test]
async fn invalid_ids_never_reach_the_network() {
    let server = MockServer::start().await;
    let client = client_for(&server);

    let err = client.groups().get(0).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Parameter(ParameterError::InvalidId { param: "group_id" })
    ));

    let err = client.topics().create_message(4, "   ").await.unwrap_err();
    assert!(matches!(
        err,
        Error::Parameter(ParameterError::Empty { param: "message" })
    ));

    let err = client.messages().star(0).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Parameter(ParameterError::InvalidId { param: "message_id" })
    ));

    let err = client.groups().topics(3, Some(0)).await.unwrap_err();
    assert!(err.is_local());

    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn create_topic_posts_name() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/groups/3/topics/create.json"))
        .and(body_json(json!({"name": "release planning"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"topic": {"id": 11}})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let reply = assert_ok!(client.groups().create_topic(3, "release planning").await);
    assert_eq!(reply, Reply::Success(json!({"topic": {"id": 11}})));
}

#[tokio::test]
async fn create_group_sends_optional_fields() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/groups/create.json"))
        .and(body_json(
            json!({"name": "rust", "kind": "private", "slug": "rust-club"}),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"group": {"id": 5}})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let group = CreateGroup::new("rust", GroupKind::Private)
        .unwrap()
        .slug("rust-club");
    assert_ok!(client.groups().create(group).await);
}

#[tokio::test]
async fn topic_messages_page_with_until_id() {
    #[derive(Deserialize)]
    struct Page {
        messages: Vec<serde_json::Value>,
    }

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/topics/8/messages.json"))
        .and(query_param("until_id", "120"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"messages": [{"id": 119}]})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let reply = assert_ok!(client.topics().messages(8, Some(120)).await);
    let page: Page = assert_ok!(reply.json());
    assert_eq!(page.messages.len(), 1);
}

#[tokio::test]
async fn verify_uses_supplied_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/account/verify.json"))
        // base64("bob:hunter2")
        .and(header("authorization", "Basic Ym9iOmh1bnRlcjI="))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"username": "bob"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let reply = assert_ok!(client.account().verify("bob", "hunter2").await);
    assert_eq!(reply, Reply::Success(json!({"username": "bob"})));
}

#[tokio::test]
async fn unauthorized_reply_converts_to_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/account/mark_read.json"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let reply = assert_ok!(client.account().mark_read().await);
    assert!(!reply.is_success());

    let err = reply.into_result().unwrap_err();
    assert!(err.is_auth_error());
}

#[tokio::test]
async fn group_actions_post_to_their_paths() {
    let server = MockServer::start().await;
    for action in ["join", "request", "leave", "mark_read"] {
        Mock::given(method("POST"))
            .and(path(format!("/api/groups/7/{}.json", action)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;
    }

    let client = client_for(&server);
    let groups = client.groups();
    assert_ok!(groups.join(7).await);
    assert_ok!(groups.request(7).await);
    assert_ok!(groups.leave(7).await);
    assert_ok!(groups.mark_read(7).await);
}
