//! Integration tests for `GeocodeClient` against a local `wiremock` server.

use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tripscout_reviews::{GeocodeClient, HttpOptions, ProviderError};

fn test_client(server: &MockServer) -> GeocodeClient {
    let options = HttpOptions {
        timeout_secs: 5,
        user_agent: "tripscout-test/0.1".to_owned(),
        max_retries: 0,
        backoff_base_ms: 1,
    };
    GeocodeClient::with_base_url("geo-secret", &server.uri(), &options)
        .expect("failed to build test GeocodeClient")
}

fn portland() -> serde_json::Value {
    json!([
        {
            "display_name": "Portland, Multnomah County, Oregon, USA",
            "lat": "45.5202471",
            "lon": "-122.674194"
        },
        {
            "display_name": "Portland, Cumberland County, Maine, USA",
            "lat": "43.6610277",
            "lon": "-70.2548596"
        }
    ])
}

#[tokio::test]
async fn search_sends_key_query_and_format() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search.php"))
        .and(query_param("key", "geo-secret"))
        .and(query_param("q", "Portland"))
        .and(query_param("format", "json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(portland()))
        .expect(1)
        .mount(&server)
        .await;

    let places = test_client(&server).search("Portland").await.unwrap();

    assert_eq!(places.len(), 2);
    assert!(places[1].display_name.contains("Maine"));
}

#[tokio::test]
async fn locate_returns_first_match_coordinates() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search.php"))
        .respond_with(ResponseTemplate::new(200).set_body_json(portland()))
        .mount(&server)
        .await;

    let point = test_client(&server)
        .locate("Portland")
        .await
        .unwrap()
        .expect("a match");

    assert!((point.latitude - 45.520_247_1).abs() < 1e-9);
    assert!((point.longitude - -122.674_194).abs() < 1e-9);
    assert!(point.formatted_query.starts_with("Portland, Multnomah"));
}

#[tokio::test]
async fn no_match_404_is_an_empty_result() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search.php"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({ "error": "Unable to geocode" })),
        )
        .mount(&server)
        .await;

    let client = test_client(&server);
    assert!(client.search("Atlantis").await.unwrap().is_empty());
    assert!(client.locate("Atlantis").await.unwrap().is_none());
}

#[tokio::test]
async fn server_error_does_not_leak_api_key() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search.php"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = test_client(&server).search("Portland").await.unwrap_err();

    assert!(matches!(
        err,
        ProviderError::UnexpectedStatus { status: 500, .. }
    ));
    assert!(
        !err.to_string().contains("geo-secret"),
        "error message leaked the key: {err}"
    );
}

#[tokio::test]
async fn truncated_body_error_does_not_leak_api_key() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = [0u8; 4096];
        let _ = socket.read(&mut request).await.unwrap();
        socket
            .write_all(
                b"HTTP/1.1 200 OK\r\n\
                  Content-Type: application/json\r\n\
                  Content-Length: 100\r\n\
                  \r\n\
                  [{\"display_name\": \"Port",
            )
            .await
            .unwrap();
        socket.shutdown().await.unwrap();
    });

    let options = HttpOptions {
        timeout_secs: 5,
        user_agent: "tripscout-test/0.1".to_owned(),
        max_retries: 0,
        backoff_base_ms: 1,
    };
    let client =
        GeocodeClient::with_base_url("geo-secret", &format!("http://{addr}"), &options).unwrap();
    let err = client.search("Portland").await.unwrap_err();
    server.await.unwrap();

    assert!(matches!(err, ProviderError::Http(_)), "got: {err:?}");
    assert!(!err.to_string().contains("geo-secret"), "leaked: {err}");
    assert!(!format!("{err:?}").contains("geo-secret"), "leaked: {err:?}");
}
