//! Fake datasheet backend for integration tests
//!
//! One axum app answers every path with AITable-style envelopes, records
//! each request, and can be told to fail in specific ways.

#![allow(dead_code)]

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header::AUTHORIZATION, HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use stockroom_client::cache::CacheStore;

/// One request as the backend saw it
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub method: String,
    pub path: String,
    pub query: HashMap<String, String>,
    pub authorization: Option<String>,
    pub body: Option<Value>,
}

impl SeenRequest {
    /// Number of records in a create/update body
    pub fn record_count(&self) -> usize {
        self.body
            .as_ref()
            .and_then(|b| b["records"].as_array())
            .map(Vec::len)
            .unwrap_or(0)
    }
}

#[derive(Default)]
pub struct FakeState {
    pub records: Mutex<Vec<Value>>,
    pub requests: Mutex<Vec<SeenRequest>>,
    next_id: AtomicUsize,
    post_calls: AtomicUsize,
    /// 1-based POST call that answers `success: false` (0 = none)
    pub fail_post_call: AtomicUsize,
    pub fail_reads: AtomicBool,
    pub fail_updates: AtomicBool,
    /// Answer with an HTML error page instead of JSON
    pub non_json: AtomicBool,
    /// Answer lists with a top-level `records` array using `id` keys
    pub legacy_shape: AtomicBool,
}

pub struct FakeBackend {
    pub base_url: String,
    pub state: Arc<FakeState>,
}

impl FakeBackend {
    pub async fn start() -> Self {
        let state = Arc::new(FakeState::default());
        let app = Router::new().fallback(handle).with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
        }
    }

    /// Preload remote rows as `(recordId, fields)`
    pub fn seed(&self, rows: Vec<(&str, Value)>) {
        let mut records = self.state.records.lock().unwrap();
        for (id, fields) in rows {
            records.push(json!({ "recordId": id, "fields": fields }));
        }
    }

    pub fn requests(&self) -> Vec<SeenRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    pub fn requests_with(&self, method: &str) -> Vec<SeenRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method)
            .collect()
    }

    pub fn record_fields(&self, id: &str) -> Option<Value> {
        self.state
            .records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r["recordId"] == id)
            .map(|r| r["fields"].clone())
    }

    pub fn record_count(&self) -> usize {
        self.state.records.lock().unwrap().len()
    }
}

fn failure(status: StatusCode, code: u16, message: &str) -> Response {
    (
        status,
        Json(json!({ "success": false, "code": code, "message": message })),
    )
        .into_response()
}

fn success(data: Value) -> Response {
    Json(json!({ "success": true, "code": 200, "message": "SUCCESS", "data": data })).into_response()
}

async fn handle(
    State(state): State<Arc<FakeState>>,
    method: Method,
    uri: Uri,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = uri.path().to_string();
    let body: Option<Value> = serde_json::from_slice(&body).ok();

    state.requests.lock().unwrap().push(SeenRequest {
        method: method.to_string(),
        path: path.clone(),
        query,
        authorization: headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body: body.clone(),
    });

    if state.non_json.load(Ordering::SeqCst) {
        return (StatusCode::BAD_GATEWAY, "<html><body>502 Bad Gateway</body></html>").into_response();
    }

    if method == Method::GET && path.ends_with("/fields") {
        return success(json!({ "fields": [
            { "id": "fld1", "name": "SKU", "type": "SingleText" },
            { "id": "fld2", "name": "status", "type": "SingleSelect" }
        ]}));
    }

    if method == Method::GET {
        if state.fail_reads.load(Ordering::SeqCst) {
            return failure(StatusCode::INTERNAL_SERVER_ERROR, 500, "server exploded");
        }
        let records = state.records.lock().unwrap().clone();
        if state.legacy_shape.load(Ordering::SeqCst) {
            let records: Vec<Value> = records
                .iter()
                .map(|r| json!({ "id": r["recordId"], "fields": r["fields"] }))
                .collect();
            return Json(json!({ "records": records })).into_response();
        }
        return success(json!({ "total": records.len(), "records": records }));
    }

    let incoming: Vec<Value> = body
        .as_ref()
        .and_then(|b| b["records"].as_array().cloned())
        .unwrap_or_default();

    if method == Method::POST {
        let call = state.post_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if state.fail_post_call.load(Ordering::SeqCst) == call {
            return failure(StatusCode::OK, 400, "chunk rejected");
        }

        let mut records = state.records.lock().unwrap();
        let created: Vec<Value> = incoming
            .iter()
            .map(|r| {
                let id = format!("rec{}", state.next_id.fetch_add(1, Ordering::SeqCst) + 1);
                json!({ "recordId": id, "fields": r["fields"] })
            })
            .collect();
        records.extend(created.iter().cloned());
        return success(json!({ "records": created }));
    }

    if method == Method::PATCH {
        if state.fail_updates.load(Ordering::SeqCst) {
            return failure(StatusCode::OK, 301, "field status is read-only");
        }

        let mut records = state.records.lock().unwrap();
        let mut updated = Vec::new();
        for change in &incoming {
            let id = change["recordId"].clone();
            if let Some(existing) = records.iter_mut().find(|r| r["recordId"] == id) {
                if let (Some(target), Some(fields)) =
                    (existing["fields"].as_object_mut(), change["fields"].as_object())
                {
                    for (name, value) in fields {
                        target.insert(name.clone(), value.clone());
                    }
                }
                updated.push(existing.clone());
            } else {
                updated.push(json!({ "recordId": id, "fields": change["fields"] }));
            }
        }
        return success(json!({ "records": updated }));
    }

    if method == Method::DELETE {
        return Json(json!({ "success": true, "code": 200, "message": "SUCCESS", "data": true }))
            .into_response();
    }

    failure(StatusCode::METHOD_NOT_ALLOWED, 405, "method not allowed")
}

/// Field map from a JSON object literal
pub fn fields(value: Value) -> stockroom_client::Fields {
    value.as_object().cloned().unwrap()
}

/// On-disk cache in a fresh temporary directory
pub async fn temp_cache() -> (tempfile::TempDir, CacheStore) {
    let dir = tempfile::tempdir().unwrap();
    let cache = CacheStore::open(&dir.path().join("stockroom.db")).await.unwrap();
    (dir, cache)
}
