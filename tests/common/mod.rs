//! Shared test utilities: an in-process recording transport and catalog fixtures.

#![allow(dead_code)]

use async_trait::async_trait;
use catalog_search::catalog::{AttributeDefinition, StaticAttributeCatalog, StaticStoreContext};
use catalog_search::{Config, Result, SearchError, SearchService, SearchTarget, SearchTransport};
use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Transport answering from canned documents and recording every request
pub struct MockTransport {
    responses: Mutex<VecDeque<Result<Value>>>,
    default_response: Value,
    /// token -> (stemmed doc freq, verbatim doc freq)
    vocabulary: HashMap<String, (u64, u64)>,
    doc_count: u64,
    fail_probes: bool,
    searches: Mutex<Vec<Value>>,
    probes: AtomicUsize,
    counts: AtomicUsize,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            default_response: search_response(0, &[]),
            vocabulary: HashMap::new(),
            doc_count: 1000,
            fail_probes: false,
            searches: Mutex::new(Vec::new()),
            probes: AtomicUsize::new(0),
            counts: AtomicUsize::new(0),
        }
    }

    /// Known vocabulary of the spelling field
    pub fn with_term(mut self, token: &str, standard_doc_freq: u64, exact_doc_freq: u64) -> Self {
        self.vocabulary
            .insert(token.to_string(), (standard_doc_freq, exact_doc_freq));
        self
    }

    pub fn with_doc_count(mut self, doc_count: u64) -> Self {
        self.doc_count = doc_count;
        self
    }

    pub fn with_failing_probes(mut self) -> Self {
        self.fail_probes = true;
        self
    }

    /// Response of every search not answered by a queued one
    pub fn with_default_response(mut self, response: Value) -> Self {
        self.default_response = response;
        self
    }

    pub fn push_response(&self, response: Value) {
        self.responses.lock().push_back(Ok(response));
    }

    pub fn push_error(&self, error: SearchError) {
        self.responses.lock().push_back(Err(error));
    }

    /// Search documents received so far
    pub fn searches(&self) -> Vec<Value> {
        self.searches.lock().clone()
    }

    pub fn last_search(&self) -> Value {
        self.searches
            .lock()
            .last()
            .cloned()
            .expect("no search was dispatched")
    }

    /// Term vector probes received so far
    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    /// Document count requests received so far
    pub fn count_calls(&self) -> usize {
        self.counts.load(Ordering::SeqCst)
    }

    fn field_vector(&self, text: &str, exact: bool) -> Value {
        let mut terms = Map::new();
        for (position, token) in text.split_whitespace().enumerate() {
            let token = token.to_lowercase();
            let (standard, verbatim) = self.vocabulary.get(&token).copied().unwrap_or((0, 0));
            let doc_freq = if exact { verbatim } else { standard };
            terms.insert(
                token,
                json!({
                    "doc_freq": doc_freq,
                    "term_freq": 1,
                    "tokens": [{ "position": position }]
                }),
            );
        }
        json!({ "terms": terms })
    }
}

#[async_trait]
impl SearchTransport for MockTransport {
    async fn search(&self, _target: &SearchTarget, body: &Value) -> Result<Value> {
        self.searches.lock().push(body.clone());
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(self.default_response.clone()))
    }

    async fn term_vectors(&self, _target: &SearchTarget, body: &Value) -> Result<Value> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        if self.fail_probes {
            return Err(SearchError::Transport("connection refused".into()));
        }

        let (field, text) = body["doc"]
            .as_object()
            .and_then(|doc| doc.iter().next())
            .map(|(field, text)| (field.clone(), text.as_str().unwrap_or_default().to_string()))
            .expect("probe document has a field");

        Ok(json!({
            "found": true,
            "term_vectors": {
                field.clone(): self.field_vector(&text, false),
                format!("{}.whitespace", field): self.field_vector(&text, true),
            }
        }))
    }

    async fn count(&self, _target: &SearchTarget, _body: &Value) -> Result<u64> {
        self.counts.fetch_add(1, Ordering::SeqCst);
        if self.fail_probes {
            return Err(SearchError::Transport("connection refused".into()));
        }
        Ok(self.doc_count)
    }
}

/// Search response with the given total and hit ids
pub fn search_response(total: u64, ids: &[u64]) -> Value {
    let hits: Vec<Value> = ids
        .iter()
        .enumerate()
        .map(|(rank, id)| json!({ "_id": id.to_string(), "_score": 10.0 - rank as f64 }))
        .collect();
    json!({
        "took": 3,
        "timed_out": false,
        "hits": { "total": { "value": total, "relation": "eq" }, "hits": hits }
    })
}

/// Add an aggregation wrapped the way facets are requested
pub fn with_aggregation(mut response: Value, name: &str, body: Value) -> Value {
    let aggregations = response
        .as_object_mut()
        .expect("response is an object")
        .entry("aggregations")
        .or_insert_with(|| json!({}));
    aggregations[name] = json!({ "doc_count": 0, name: body });
    response
}

pub fn catalog() -> StaticAttributeCatalog {
    StaticAttributeCatalog::new(vec![
        AttributeDefinition::text("name").localized().searchable(10.0).sortable(),
        AttributeDefinition::text("sku").searchable(5.0),
        AttributeDefinition::text("description").localized().searchable(1.0),
        AttributeDefinition::integer("color").filterable(),
        AttributeDefinition::integer("category").filterable(),
        AttributeDefinition::decimal("weight").filterable().sortable(),
    ])
}

pub fn store() -> StaticStoreContext {
    StaticStoreContext::new(1, 1, "en_US").with_customer_group(0)
}

pub fn service_with(transport: Arc<MockTransport>, config: Config) -> SearchService {
    SearchService::new(config, transport, Arc::new(catalog())).expect("valid test service")
}

pub fn service(transport: Arc<MockTransport>) -> SearchService {
    service_with(transport, Config::default())
}
