//! Integration tests for the HTTP transport against a mock search cluster

use catalog_search::{HttpTransport, SearchError, SearchTarget, SearchTransport};
use mockito::{Matcher, Server};
use serde_json::json;

#[tokio::test]
async fn test_search_posts_to_index_endpoint() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/catalog/_search")
        .match_header("content-type", "application/json")
        .match_body(Matcher::PartialJson(json!({ "size": 0 })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"took": 2, "hits": {"total": {"value": 11}, "hits": []}}"#)
        .create_async()
        .await;

    let transport = HttpTransport::new(&server.url(), 5).unwrap();
    let response = transport
        .search(&SearchTarget::new("catalog"), &json!({ "size": 0 }))
        .await
        .unwrap();

    assert_eq!(response["hits"]["total"]["value"], 11);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_document_type_is_part_of_the_path() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/catalog/product/_termvectors")
        .with_status(200)
        .with_body(r#"{"found": true, "term_vectors": {}}"#)
        .create_async()
        .await;

    let transport = HttpTransport::new(&server.url(), 5).unwrap();
    let target = SearchTarget::new("catalog").with_document_type("product");
    let response = transport
        .term_vectors(&target, &json!({ "doc": { "spelling_en": "red" } }))
        .await
        .unwrap();

    assert_eq!(response["found"], true);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_count_reads_the_count() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/catalog/_count")
        .with_status(200)
        .with_body(r#"{"count": 1234, "_shards": {"total": 1}}"#)
        .create_async()
        .await;

    let transport = HttpTransport::new(&server.url(), 5).unwrap();
    let count = transport
        .count(&SearchTarget::new("catalog"), &json!({ "query": { "match_all": {} } }))
        .await
        .unwrap();
    assert_eq!(count, 1234);
}

#[tokio::test]
async fn test_error_status_maps_to_engine_error() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/catalog/_search")
        .with_status(400)
        .with_body(r#"{"error": {"type": "parsing_exception", "reason": "unknown query [mach]"}, "status": 400}"#)
        .create_async()
        .await;

    let transport = HttpTransport::new(&server.url(), 5).unwrap();
    let err = transport
        .search(&SearchTarget::new("catalog"), &json!({}))
        .await
        .unwrap_err();

    match err {
        SearchError::Engine { status, reason } => {
            assert_eq!(status, Some(400));
            assert_eq!(reason, "unknown query [mach]");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_plain_text_error_body_is_the_reason() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/missing/_search")
        .with_status(503)
        .with_body("cluster unavailable")
        .create_async()
        .await;

    let transport = HttpTransport::new(&server.url(), 5).unwrap();
    let err = transport
        .search(&SearchTarget::new("missing"), &json!({}))
        .await
        .unwrap_err();

    assert_eq!(err.error_code(), "ENGINE_ERROR");
    assert!(err.to_string().contains("cluster unavailable"));
    assert!(!err.is_configuration());
}

#[tokio::test]
async fn test_non_json_success_is_malformed() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/catalog/_search")
        .with_status(200)
        .with_body("<html>proxy</html>")
        .create_async()
        .await;

    let transport = HttpTransport::new(&server.url(), 5).unwrap();
    let err = transport
        .search(&SearchTarget::new("catalog"), &json!({}))
        .await
        .unwrap_err();
    assert!(matches!(err, SearchError::MalformedResponse(_)));
}

#[tokio::test]
async fn test_unreachable_cluster_is_a_transport_error() {
    // Nothing listens on the discard port
    let transport = HttpTransport::new("http://127.0.0.1:9", 1).unwrap();
    let err = transport
        .search(&SearchTarget::new("catalog"), &json!({}))
        .await
        .unwrap_err();
    assert!(matches!(err, SearchError::Transport(_) | SearchError::Timeout(_)));
}
