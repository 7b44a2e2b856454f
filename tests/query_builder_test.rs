//! Integration tests for query assembly, dispatch and response parsing

mod common;

use catalog_search::query::TermsOrder;
use catalog_search::{
    Config, FacetKind, FacetScope, FilterClause, QueryState, QueryType, SearchError,
    SearchResponse, SortDirection, SpellingType,
};
use common::{search_response, service, service_with, store, with_aggregation, MockTransport};
use serde_json::json;
use std::sync::Arc;

fn shoe_transport() -> MockTransport {
    MockTransport::new()
        .with_term("red", 40, 30)
        .with_term("shoes", 60, 50)
        .with_term("running", 20, 0)
        .with_term("the", 900, 900)
        .with_term("a", 950, 950)
        .with_term("of", 920, 920)
}

#[tokio::test]
async fn test_red_shoes_search() {
    let transport = Arc::new(shoe_transport());
    let raw = search_response(2, &[31, 4]);
    let raw = with_aggregation(
        raw,
        "color",
        json!({
            "doc_count_error_upper_bound": 0,
            "sum_other_doc_count": 0,
            "buckets": [{ "key": 4, "doc_count": 2 }, { "key": 9, "doc_count": 1 }]
        }),
    );
    let raw = with_aggregation(
        raw,
        "price",
        json!({ "count": 2, "min": 19.9, "max": 89.0, "avg": 54.45, "sum": 108.9 }),
    );
    transport.push_response(raw);

    let service = service(transport.clone());
    let mut builder = service.query_builder(&store()).unwrap();
    builder
        .set_fulltext_query("red shoes")
        .add_global_filter(FilterClause::term("category", 12))
        .add_facet("color", FacetKind::terms("color"))
        .add_facet("price", FacetKind::stats("price_0_1"));

    let response = builder.search().await.unwrap();

    assert_eq!(builder.state(), QueryState::Parsed);
    assert_eq!(builder.query_type(), QueryType::Fulltext);
    assert_eq!(response.total_count, 2);
    assert_eq!(response.entity_ids(), vec![31, 4]);
    assert_eq!(response.spelling_type, Some(SpellingType::Exact));
    assert!(!response.is_spellchecked);

    let color = response.facet("color").unwrap();
    assert_eq!(color.count("4"), Some(2));
    assert_eq!(color.count("9"), Some(1));
    assert!(!color.has_others());

    let price = response.facet("price").unwrap().stats.clone().unwrap();
    assert_eq!(price.min, Some(19.9));
    assert_eq!(price.max, Some(89.0));

    let document = transport.last_search();
    assert_eq!(
        document["query"]["bool"]["filter"][0],
        json!({ "terms": { "category": [12] } })
    );
    let fulltext = &document["query"]["bool"]["must"][0];
    assert!(fulltext["bool"]["filter"][0]["common"]["search_en"].is_object());
    assert_eq!(
        fulltext["bool"]["must"][0]["multi_match"]["query"],
        "red shoes"
    );
    assert_eq!(document["aggs"]["color"]["filter"], json!({ "match_all": {} }));
    assert_eq!(document["aggs"]["price"]["aggs"]["price"]["stats"]["field"], "price_0_1");
    assert!(document.get("post_filter").is_none());
    assert!(document.get("suggest").is_none());
    assert_eq!(document["track_total_hits"], true);
}

#[tokio::test]
async fn test_drill_down_isolation() {
    let transport = Arc::new(MockTransport::new());
    let service = service(transport.clone());
    let mut builder = service.query_builder(&store()).unwrap();
    builder
        .add_facet("color", FacetKind::terms("color"))
        .add_facet("size", FacetKind::terms_with("size", 5, TermsOrder::Term))
        .add_facet("weight", FacetKind::histogram("weight", Some(5.0)))
        .add_filter(FacetScope::facet("color"), FilterClause::term("color", 4))
        .add_filter(FacetScope::facet("size"), FilterClause::terms("size", ["m", "l"]));

    let document = builder.assemble().await.unwrap();
    assert_eq!(builder.state(), QueryState::Assembled);

    let color = json!({ "terms": { "color": [4] } });
    let size = json!({ "terms": { "size": ["m", "l"] } });

    // Hits see every scoped filter
    assert_eq!(document["query"], json!({ "match_all": {} }));
    assert_eq!(document["post_filter"]["bool"]["filter"], json!([color, size]));

    // A facet ignores its own filter and sees the others
    assert_eq!(document["aggs"]["color"]["filter"]["bool"]["filter"], json!([size]));
    assert_eq!(document["aggs"]["size"]["filter"]["bool"]["filter"], json!([color]));
    assert_eq!(
        document["aggs"]["weight"]["filter"]["bool"]["filter"],
        json!([color, size])
    );
    assert_eq!(document["aggs"]["size"]["aggs"]["size"]["terms"]["order"], json!({ "_key": "asc" }));
    assert_eq!(document["aggs"]["weight"]["aggs"]["weight"]["histogram"]["interval"], 5.0);
}

#[tokio::test]
async fn test_pagination() {
    let transport = Arc::new(MockTransport::new());
    let service = service(transport.clone());
    let mut builder = service.query_builder(&store()).unwrap();

    let document = builder.set_page_params(3, 12).assemble().await.unwrap();
    assert_eq!(document["from"], 24);
    assert_eq!(document["size"], 12);

    let document = builder.set_page_params(0, -5).assemble().await.unwrap();
    assert_eq!(document["from"], 0);
    assert_eq!(document["size"], 1);
}

#[tokio::test]
async fn test_default_page_size_comes_from_config() {
    let transport = Arc::new(MockTransport::new());
    let mut config = Config::default();
    config.pagination.default_page_size = 36;
    let service = service_with(transport, config);

    let document = service.query_builder(&store()).unwrap().assemble().await.unwrap();
    assert_eq!(document["size"], 36);
}

#[tokio::test]
async fn test_sort_rewriting() {
    let transport = Arc::new(MockTransport::new());
    let service = service(transport.clone());
    let store = store().with_customer_group(2);

    // Position without a category falls back to the score, reversed
    let mut builder = service.query_builder(&store).unwrap();
    builder.add_sort_order("position", SortDirection::Asc);
    let document = builder.assemble().await.unwrap();
    assert_eq!(document["sort"], json!([{ "_score": { "order": "desc" } }]));

    // Price follows the customer group and website, score breaks ties
    let mut builder = service.query_builder(&store).unwrap();
    builder
        .add_sort_order("price", SortDirection::Desc)
        .add_sort_order("name", SortDirection::Asc);
    let document = builder.assemble().await.unwrap();
    assert_eq!(
        document["sort"],
        json!([
            { "price_2_1": { "order": "desc", "missing": "_last" } },
            { "sort_by_name_en": { "order": "asc", "missing": "_last" } },
            { "_score": { "order": "desc" } },
        ])
    );

    // Position inside a category sorts on the nested positions
    let mut builder = service.query_builder(&store).unwrap();
    builder
        .set_category(Some(7))
        .add_sort_order("position", SortDirection::Asc);
    let document = builder.assemble().await.unwrap();
    let position = &document["sort"][0]["category.position"];
    assert_eq!(position["order"], "asc");
    assert_eq!(position["nested"]["filter"]["term"]["category.category_id"], 7);
}

#[tokio::test]
async fn test_pure_stopwords_require_every_term() {
    let transport = Arc::new(shoe_transport());
    let config = Config::from_toml_str("[relevance]\nminimum_should_match = \"75%\"\n").unwrap();
    let service = service_with(transport.clone(), config);

    let mut builder = service.query_builder(&store()).unwrap();
    builder.set_fulltext_query("the a of");
    let response = builder.search().await.unwrap();

    assert_eq!(response.spelling_type, Some(SpellingType::PureStopwords));
    assert!(!response.is_spellchecked);

    let document = transport.last_search();
    assert_eq!(document["query"]["multi_match"]["minimum_should_match"], "100%");
    assert!(document["query"]["multi_match"]["fields"]
        .as_array()
        .unwrap()
        .contains(&json!("name_en.whitespace^10")));
}

#[tokio::test]
async fn test_transport_error_degrades_to_empty_response() {
    let transport = Arc::new(shoe_transport());
    transport.push_error(SearchError::Transport("connection reset".into()));

    let service = service(transport.clone());
    let mut builder = service.query_builder(&store()).unwrap();
    builder
        .set_fulltext_query("red shoes")
        .add_facet("color", FacetKind::terms("color"));

    let response = builder.search().await.unwrap();
    assert_eq!(response.total_count, 0);
    assert!(response.hits.is_empty());
    assert!(response.facets.is_empty());
    assert_eq!(builder.state(), QueryState::Failed);
    assert!(matches!(builder.last_error(), Some(SearchError::Transport(_))));
}

#[tokio::test]
async fn test_engine_error_document_degrades() {
    let transport = Arc::new(MockTransport::new());
    transport.push_response(json!({
        "error": { "type": "search_phase_execution_exception", "reason": "all shards failed" },
        "status": 400
    }));

    let service = service(transport.clone());
    let mut builder = service.query_builder(&store()).unwrap();

    let response = builder.search().await.unwrap();
    assert_eq!(response.total_count, 0);
    match builder.last_error() {
        Some(SearchError::Engine { status, reason }) => {
            assert_eq!(*status, Some(400));
            assert!(reason.contains("all shards failed"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_timeout_degrades_to_empty_response() {
    let transport = Arc::new(shoe_transport());
    transport.push_error(SearchError::Timeout("5s elapsed".into()));

    let service = service(transport.clone());
    let mut builder = service.query_builder(&store()).unwrap();
    builder
        .set_fulltext_query("red shoes")
        .add_facet("color", FacetKind::terms("color"));

    let response = builder.search().await.unwrap();
    assert_eq!(response, SearchResponse::empty());
    assert_eq!(builder.state(), QueryState::Failed);
    assert!(matches!(builder.last_error(), Some(SearchError::Timeout(_))));
    assert_eq!(transport.searches().len(), 1);
}

#[tokio::test]
async fn test_debug_mode_surfaces_runtime_errors() {
    let transport = Arc::new(MockTransport::new());
    transport.push_error(SearchError::Timeout("5s elapsed".into()));

    let mut config = Config::default();
    config.engine.debug = true;
    let service = service_with(transport, config);

    let mut builder = service.query_builder(&store()).unwrap();
    let err = builder.search().await.unwrap_err();
    assert!(matches!(err, SearchError::Timeout(_)));
    assert_eq!(builder.state(), QueryState::Failed);
}

#[tokio::test]
async fn test_configuration_errors_are_returned() {
    let transport = Arc::new(MockTransport::new());
    let service = service(transport.clone());

    let mut builder = service.query_builder(&store()).unwrap();
    builder.add_global_filter(FilterClause::terms("color", Vec::<i64>::new()));
    let err = builder.search().await.unwrap_err();
    assert!(err.is_configuration());
    assert_eq!(builder.state(), QueryState::Failed);

    let mut builder = service.query_builder(&store()).unwrap();
    builder.add_sort_order("sku", SortDirection::Asc);
    assert!(builder.search().await.unwrap_err().is_configuration());

    let mut builder = service.query_builder(&store()).unwrap();
    builder.add_facet("color", FacetKind::terms_with("color", 0, TermsOrder::Count));
    assert!(builder.search().await.unwrap_err().is_configuration());

    // Nothing reached the engine
    assert!(transport.searches().is_empty());
}

#[tokio::test]
async fn test_mutation_after_search_starts_over() {
    let transport = Arc::new(MockTransport::new());
    let service = service(transport.clone());
    let mut builder = service.query_builder(&store()).unwrap();

    builder.search().await.unwrap();
    assert_eq!(builder.state(), QueryState::Parsed);

    builder.add_sort_order("relevance", SortDirection::Desc);
    assert_eq!(builder.state(), QueryState::Configuring);

    builder.search().await.unwrap();
    assert_eq!(transport.searches().len(), 2);
}

#[tokio::test]
async fn test_count_ignores_paging_sort_and_facets() {
    let transport = Arc::new(MockTransport::new().with_default_response(search_response(57, &[])));
    let service = service(transport.clone());
    let mut builder = service.query_builder(&store()).unwrap();
    builder
        .add_global_filter(FilterClause::term("category", 12))
        .add_facet("color", FacetKind::terms("color"))
        .add_sort_order("price", SortDirection::Asc)
        .set_page_params(4, 10);

    assert_eq!(builder.count().await.unwrap(), 57);

    let document = transport.last_search();
    assert_eq!(document["size"], 0);
    assert_eq!(document["from"], 0);
    assert!(document.get("aggs").is_none());
    assert!(document.get("sort").is_none());
    assert_eq!(document["query"]["bool"]["filter"][0], json!({ "terms": { "category": [12] } }));

    // The builder keeps its own configuration
    assert_eq!(builder.request().facets.len(), 1);
    assert_eq!(builder.request().page.size(), 10);
}

#[tokio::test]
async fn test_count_degrades_to_zero() {
    let transport = Arc::new(MockTransport::new());
    transport.push_error(SearchError::Transport("connection refused".into()));
    let service = service(transport);

    let builder = service.query_builder(&store()).unwrap();
    assert_eq!(builder.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_spellchecked_search_asks_for_suggestions() {
    let transport = Arc::new(shoe_transport());
    let mut raw = search_response(1, &[8]);
    raw["suggest"] = json!({
        "did_you_mean": [{
            "text": "red shoos",
            "offset": 0,
            "length": 9,
            "options": [{ "text": "red shoes", "score": 0.8 }]
        }]
    });
    transport.push_response(raw);

    let service = service(transport.clone());
    let mut builder = service.query_builder(&store()).unwrap();
    builder.set_fulltext_query("red shoos");
    let response = builder.search().await.unwrap();

    assert_eq!(response.spelling_type, Some(SpellingType::MostlyFuzzy));
    assert!(response.is_spellchecked);
    assert_eq!(response.suggestions, vec!["red shoes".to_string()]);

    let document = transport.last_search();
    assert_eq!(
        document["suggest"]["did_you_mean"]["phrase"]["field"],
        "spelling_en.whitespace"
    );
    assert_eq!(document["suggest"]["did_you_mean"]["text"], "red shoos");
}

#[tokio::test]
async fn test_suggestions_can_be_disabled() {
    let transport = Arc::new(shoe_transport());
    let mut config = Config::default();
    config.relevance.enable_suggestions = false;
    let service = service_with(transport.clone(), config);

    let mut builder = service.query_builder(&store()).unwrap();
    builder.set_fulltext_query("running shoes");
    let response = builder.search().await.unwrap();

    assert_eq!(response.spelling_type, Some(SpellingType::MostlyExact));
    assert!(transport.last_search().get("suggest").is_none());
}

#[tokio::test]
async fn test_grouped_facet_is_demultiplexed() {
    let transport = Arc::new(MockTransport::new());
    let raw = search_response(15, &[1, 2, 3]);
    let raw = with_aggregation(raw, "price_ranges__cheap", json!({ "doc_count": 12 }));
    let raw = with_aggregation(raw, "price_ranges__premium", json!({ "doc_count": 3 }));
    transport.push_response(raw);

    let service = service(transport.clone());
    let mut builder = service.query_builder(&store()).unwrap();
    builder.add_facet(
        "price_ranges",
        FacetKind::query_group([
            ("cheap", "price_0_1:[0 TO 50]"),
            ("premium", "price_0_1:[50 TO *]"),
        ]),
    );

    let response = builder.search().await.unwrap();
    let ranges = response.facet("price_ranges").unwrap();
    assert_eq!(ranges.count("cheap"), Some(12));
    assert_eq!(ranges.count("premium"), Some(3));
    assert_eq!(response.facets.len(), 3);
    assert_eq!(response.facet("price_ranges__cheap").unwrap().count("cheap"), Some(12));
    assert_eq!(
        response.facet("price_ranges__premium").unwrap().buckets.len(),
        1
    );

    let document = transport.last_search();
    assert_eq!(
        document["aggs"]["price_ranges__cheap"]["aggs"]["price_ranges__cheap"]["filter"]
            ["query_string"]["query"],
        "price_0_1:[0 TO 50]"
    );
}

#[tokio::test]
async fn test_terms_facet_reports_other_values() {
    let transport = Arc::new(MockTransport::new());
    let raw = with_aggregation(
        search_response(40, &[]),
        "color",
        json!({
            "sum_other_doc_count": 7,
            "buckets": [{ "key": 4, "doc_count": 20 }, { "key": 9, "doc_count": 13 }]
        }),
    );
    transport.push_response(raw);

    let service = service(transport);
    let mut builder = service.query_builder(&store()).unwrap();
    builder.add_facet("color", FacetKind::terms_with("color", 2, TermsOrder::Count));

    let response = builder.search().await.unwrap();
    assert!(response.facet("color").unwrap().has_others());
}

#[tokio::test]
async fn test_structured_query_skips_spelling() {
    let transport = Arc::new(MockTransport::new());
    let service = service(transport.clone());
    let mut builder = service.query_builder(&store()).unwrap();

    let fields = serde_json::from_value(json!({ "sku": "ABC-1" })).unwrap();
    builder.set_fulltext_query(catalog_search::FulltextQuery::Structured(fields));
    let response = builder.search().await.unwrap();

    assert_eq!(response.spelling_type, None);
    assert_eq!(builder.query_type(), QueryType::LayeredNavigation);
    assert_eq!(transport.probe_count(), 0);
    assert_eq!(transport.count_calls(), 0);
    assert_eq!(
        transport.last_search()["query"],
        json!({ "bool": { "must": [{ "match": { "sku": "ABC-1" } }] } })
    );
}
