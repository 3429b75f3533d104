#![allow(dead_code)]

use photodesk_core::auth::{MemoryTokenStorage, TokenStorage};
use photodesk_core::{ApiClient, Config, CredentialStore, PhotoDesk};
use serde_json::{json, Value};
use wiremock::MockServer;

pub fn user_json() -> Value {
    json!({
        "id": "u-1",
        "name": "Olena",
        "email": "olena@example.com",
        "created_at": "2024-05-01T09:30:00.123456"
    })
}

pub fn project_json(id: &str, name: &str) -> Value {
    json!({
        "id": id,
        "user_id": "u-1",
        "name": name,
        "description": null,
        "created_at": "2024-05-02T10:00:00",
        "photo_count": 2
    })
}

pub fn photo_json(id: &str) -> Value {
    json!({
        "id": id,
        "original_name": format!("{}.jpg", id),
        "mime": "image/jpeg",
        "size": 2048,
        "created_at": "2024-05-03T11:00:00"
    })
}

pub fn config(server: &MockServer) -> Config {
    Config {
        api_base_url: server.uri(),
        ..Config::default()
    }
}

pub fn desk(server: &MockServer, storage: Box<dyn TokenStorage>) -> PhotoDesk {
    PhotoDesk::with_storage(config(server), storage).expect("desk")
}

pub fn client(server: &MockServer, token: Option<&str>) -> (ApiClient, CredentialStore) {
    let storage = match token {
        Some(t) => MemoryTokenStorage::with_token(t),
        None => MemoryTokenStorage::default(),
    };
    let store = CredentialStore::open(Box::new(storage));
    let api = ApiClient::new(&server.uri(), store.clone()).expect("client");
    (api, store)
}

/// Authorization header of every request the server saw, in order.
pub async fn auth_headers(server: &MockServer) -> Vec<Option<String>> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|r| {
            r.headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        })
        .collect()
}
