//! Integration tests for configured score optimizers

mod common;

use catalog_search::relevance::Operator;
use catalog_search::{Config, Rule, SearchError, SortDirection};
use common::{search_response, service_with, store, MockTransport};
use serde_json::json;
use std::sync::Arc;

const OPTIMIZERS: &str = r#"
[[optimizers]]
name = "boost_new"
query_types = ["fulltext"]

[optimizers.rule]
type = "condition"
attribute = "is_new"
operator = "eq"
value = true

[optimizers.model]
type = "constant_score"
boost_percent = 50.0

[[optimizers]]
name = "bestsellers"

[optimizers.model]
type = "popularity"
event_type = "order"
window_size = 100
"#;

fn transport() -> Arc<MockTransport> {
    Arc::new(
        MockTransport::new()
            .with_term("red", 40, 30)
            .with_term("shoes", 60, 50),
    )
}

fn config() -> Config {
    Config::from_toml_str(OPTIMIZERS).unwrap()
}

fn new_products_filter() -> serde_json::Value {
    let rule = Rule::condition("is_new", Operator::Eq, true);
    json!({ "query_string": { "query": rule.render().unwrap() } })
}

#[tokio::test]
async fn test_optimizers_are_loaded_in_name_order() {
    let service = service_with(transport(), config());
    assert_eq!(service.composer().names(), vec!["bestsellers", "boost_new"]);
}

#[tokio::test]
async fn test_fulltext_search_is_optimized() {
    let transport = transport();
    let service = service_with(transport.clone(), config());

    let mut builder = service.query_builder(&store()).unwrap();
    builder.set_fulltext_query("red shoes");
    builder.search().await.unwrap();

    let document = transport.last_search();
    let function_score = &document["query"]["function_score"];
    assert_eq!(
        function_score["functions"],
        json!([{ "filter": new_products_filter(), "weight": 1.5 }])
    );
    assert_eq!(function_score["boost_mode"], "multiply");
    assert!(function_score["query"]["bool"]["filter"][0]["common"].is_object());

    let rescore = &document["rescore"][0];
    assert_eq!(rescore["window_size"], 100);
    assert_eq!(
        rescore["query"]["rescore_query"]["has_child"]["type"],
        "order"
    );
}

#[tokio::test]
async fn test_optimizers_follow_query_type() {
    let transport = transport();
    let service = service_with(transport.clone(), config());

    // Category browsing: the fulltext-only boost stays out
    let mut builder = service.query_builder(&store()).unwrap();
    builder.set_category(Some(12));
    builder.search().await.unwrap();

    let document = transport.last_search();
    assert_eq!(document["query"], json!({ "match_all": {} }));
    assert!(document["rescore"].is_array());
}

#[tokio::test]
async fn test_count_is_not_optimized() {
    let transport = Arc::new(
        MockTransport::new()
            .with_term("red", 40, 30)
            .with_term("shoes", 60, 50)
            .with_default_response(search_response(9, &[])),
    );
    let service = service_with(transport.clone(), config());

    let mut builder = service.query_builder(&store()).unwrap();
    builder.set_fulltext_query("red shoes");
    assert_eq!(builder.count().await.unwrap(), 9);

    let document = transport.last_search();
    assert!(document["query"].get("function_score").is_none());
    assert!(document.get("rescore").is_none());
}

#[tokio::test]
async fn test_field_sort_skips_rescoring() {
    let transport = transport();
    let service = service_with(transport.clone(), config());

    let mut builder = service.query_builder(&store()).unwrap();
    builder
        .set_fulltext_query("red shoes")
        .add_sort_order("price", SortDirection::Asc);
    builder.search().await.unwrap();

    let document = transport.last_search();
    assert!(document.get("rescore").is_none());
    assert!(document["query"]["function_score"].is_object());
}

#[tokio::test]
async fn test_matching_optimizers_for_a_product() {
    let transport = transport();
    transport.push_response(json!({
        "took": 1,
        "hits": { "total": { "value": 1, "relation": "eq" }, "hits": [] },
        "aggregations": {
            "optimizers": {
                "buckets": {
                    "bestsellers": { "doc_count": 1 },
                    "boost_new": { "doc_count": 0 }
                }
            }
        }
    }));
    let service = service_with(transport.clone(), config());

    let matching = service.optimizer_matcher().matching_optimizers(42).await.unwrap();
    assert_eq!(matching, vec!["bestsellers".to_string()]);

    let document = transport.last_search();
    assert_eq!(document["size"], 0);
    assert_eq!(document["query"], json!({ "ids": { "values": ["42"] } }));
    assert_eq!(
        document["aggs"]["optimizers"]["filters"]["filters"]["boost_new"],
        new_products_filter()
    );
    assert_eq!(
        document["aggs"]["optimizers"]["filters"]["filters"]["bestsellers"],
        json!({ "match_all": {} })
    );
}

#[tokio::test]
async fn test_matching_without_optimizers_skips_the_engine() {
    let transport = transport();
    let service = service_with(transport.clone(), Config::default());

    let matching = service.optimizer_matcher().matching_optimizers(42).await.unwrap();
    assert!(matching.is_empty());
    assert!(transport.searches().is_empty());
}

#[tokio::test]
async fn test_matching_surfaces_engine_errors() {
    let transport = transport();
    transport.push_error(SearchError::Transport("connection refused".into()));
    let service = service_with(transport, config());

    let err = service
        .optimizer_matcher()
        .matching_optimizers(42)
        .await
        .unwrap_err();
    assert!(matches!(err, SearchError::Transport(_)));
}
