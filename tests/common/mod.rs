#![allow(dead_code)]

use jimeng::{GenerateOptions, JimengClient, PollOptions};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

pub const TOKEN: &str = "test_session_token";
pub const ASSET_URI: &str = "tos-cn-i-test/asset-1";

/// A client pointed at the mock server for both the API and the
/// object-storage endpoint.
pub fn client(server: &MockServer) -> JimengClient {
    let mut client = JimengClient::new_with_url(TOKEN.to_string(), &server.uri()).unwrap();
    client.imagex_endpoint = server.uri();
    client
}

/// Default options with a short poll interval so tests do not sleep for real.
pub fn fast_options() -> GenerateOptions {
    GenerateOptions {
        poll: PollOptions {
            interval: Duration::from_millis(10),
            ..PollOptions::default()
        },
        ..GenerateOptions::default()
    }
}

pub async fn mock_credit(server: &MockServer, gift_credit: i64) {
    Mock::given(method("POST"))
        .and(path("/commerce/v1/benefits/user_credit"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "credit": {
                "gift_credit": gift_credit,
                "purchase_credit": 0,
                "vip_credit": 0
            }
        })))
        .mount(server)
        .await;
}

pub async fn mock_submit(server: &MockServer, history_id: &str) {
    Mock::given(method("POST"))
        .and(path("/mweb/v1/aigc_draft/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "aigc_data": {
                    "history_record_id": history_id
                }
            }
        })))
        .mount(server)
        .await;
}

pub async fn mock_upload_token(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/mweb/v1/get_upload_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "access_key_id": "AKID_TEST",
                "secret_access_key": "SK_TEST",
                "session_token": "STS_TEST"
            }
        })))
        .mount(server)
        .await;
}

pub async fn mock_apply_upload(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/"))
        .and(query_param("Action", "ApplyImageUpload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Result": {
                "UploadAddress": {
                    "UploadHosts": [server.uri()],
                    "StoreInfos": [
                        {
                            "StoreUri": ASSET_URI,
                            "Auth": "store-auth-token"
                        }
                    ],
                    "SessionKey": "session-key-1"
                }
            }
        })))
        .mount(server)
        .await;
}

pub async fn mock_store_upload(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(format!("/upload/v1/{ASSET_URI}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 2000,
            "message": "success"
        })))
        .mount(server)
        .await;
}

pub async fn mock_commit_upload(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/"))
        .and(query_param("Action", "CommitImageUpload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Result": {
                "Results": [
                    { "Uri": ASSET_URI }
                ]
            }
        })))
        .mount(server)
        .await;
}

/// Mounts the whole three-phase upload flow: token, apply, store, commit.
pub async fn mock_upload_flow(server: &MockServer) {
    mock_upload_token(server).await;
    mock_apply_upload(server).await;
    mock_store_upload(server).await;
    mock_commit_upload(server).await;
}

/// Responds to history queries with a fixed sequence of records, repeating
/// the last one once the sequence is exhausted.
pub struct HistorySequence {
    history_id: String,
    records: Vec<Value>,
    calls: AtomicUsize,
}

impl HistorySequence {
    pub fn new(history_id: &str, records: Vec<Value>) -> Self {
        assert!(!records.is_empty());
        Self {
            history_id: history_id.to_string(),
            records,
            calls: AtomicUsize::new(0),
        }
    }
}

impl wiremock::Respond for HistorySequence {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let index = self
            .calls
            .fetch_add(1, Ordering::SeqCst)
            .min(self.records.len() - 1);

        let mut data = serde_json::Map::new();
        data.insert(self.history_id.clone(), self.records[index].clone());
        ResponseTemplate::new(200).set_body_json(json!({ "data": data }))
    }
}

pub fn pending_record() -> Value {
    json!({ "status": 20, "fail_code": null, "item_list": [] })
}

pub fn done_record(urls: &[&str]) -> Value {
    let items: Vec<Value> = urls
        .iter()
        .map(|url| {
            json!({
                "image": {
                    "large_images": [ { "image_url": url } ]
                }
            })
        })
        .collect();
    json!({ "status": 50, "fail_code": null, "item_list": items })
}

pub fn failed_record(fail_code: &str) -> Value {
    json!({ "status": 30, "fail_code": fail_code, "item_list": [] })
}
