//! Wire format of `HttpApi` against a local axum server.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::{get, patch};
use axum::{Json, Router};
use ntlive_client::{ApiError, ClientConfig, HttpApi, LiveApi};
use serde_json::{json, Value};

#[derive(Debug, Clone, PartialEq)]
struct Recorded {
    path: &'static str,
    query: HashMap<String, String>,
    body: Value,
}

type Log = Arc<Mutex<Vec<Recorded>>>;

async fn list_rooms(State(log): State<Log>, Query(query): Query<HashMap<String, String>>) -> Json<Value> {
    log.lock().unwrap().push(Recorded {
        path: "/api/room",
        query,
        body: Value::Null,
    });
    Json(json!({
        "rooms": [
            { "name": "a", "numParticipants": 0 },
            { "name": "b", "numParticipants": 3 }
        ]
    }))
}

async fn list_users() -> Json<Value> {
    Json(json!({
        "users": [
            { "id": "u1", "name": "Alice", "point": 30, "link": "" },
            { "id": "u2", "name": "Bob" }
        ]
    }))
}

async fn update_point(
    State(log): State<Log>,
    Query(query): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> StatusCode {
    log.lock().unwrap().push(Recorded {
        path: "/api/users",
        query,
        body,
    });
    StatusCode::OK
}

async fn update_link(
    State(log): State<Log>,
    Query(query): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> StatusCode {
    log.lock().unwrap().push(Recorded {
        path: "/api/link",
        query,
        body,
    });
    StatusCode::OK
}

async fn serve(app: Router) -> HttpApi {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let config = ClientConfig {
        api_base: format!("http://{addr}/"),
        ..ClientConfig::default()
    };
    HttpApi::new(&config).unwrap()
}

async fn recording_server() -> (HttpApi, Log) {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new()
        .route("/api/room", get(list_rooms))
        .route("/api/users", get(list_users).patch(update_point))
        .route("/api/link", patch(update_link))
        .with_state(log.clone());
    (serve(app).await, log)
}

fn query(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[tokio::test]
async fn test_list_rooms_sends_user_query() {
    let (api, log) = recording_server().await;

    let rooms = api.list_rooms("Alice Chen").await.unwrap();
    assert_eq!(rooms.len(), 2);
    assert_eq!(rooms[1].name, "b");
    assert_eq!(rooms[1].num_participants, 3);

    let log = log.lock().unwrap();
    assert_eq!(log[0].query, query(&[("user", "Alice Chen")]));
}

#[tokio::test]
async fn test_list_users_fills_missing_fields() {
    let (api, _log) = recording_server().await;

    let users = api.list_users().await.unwrap();
    assert_eq!(users.len(), 2);
    assert_eq!(users[0].point, 30);
    assert_eq!(users[1].point, 0);
    assert_eq!(users[1].link, "");
}

#[tokio::test]
async fn test_update_point_sends_query_and_body() {
    let (api, log) = recording_server().await;

    api.update_point("u1", 20).await.unwrap();

    let log = log.lock().unwrap();
    assert_eq!(
        log[0],
        Recorded {
            path: "/api/users",
            query: query(&[("id", "u1"), ("point", "20")]),
            body: json!({ "id": "u1", "point": "20" }),
        }
    );
}

#[tokio::test]
async fn test_update_link_sends_query_and_body() {
    let (api, log) = recording_server().await;

    api.update_link("owner", "uid-y").await.unwrap();
    api.update_link("owner", "").await.unwrap();

    let log = log.lock().unwrap();
    assert_eq!(log[0].path, "/api/link");
    assert_eq!(log[0].query, query(&[("id", "owner"), ("link", "uid-y")]));
    assert_eq!(log[0].body, json!({ "id": "owner", "link": "uid-y" }));
    assert_eq!(log[1].query, query(&[("id", "owner"), ("link", "")]));
    assert_eq!(log[1].body, json!({ "id": "owner", "link": "" }));
}

#[tokio::test]
async fn test_error_status_maps_to_api_error() {
    let app = Router::new()
        .route("/api/users", get(|| async { StatusCode::INTERNAL_SERVER_ERROR }))
        .route("/api/link", patch(|| async { StatusCode::NOT_FOUND }));
    let api = serve(app).await;

    match api.list_users().await {
        Err(ApiError::Status { method, status, .. }) => {
            assert_eq!(method, "GET");
            assert_eq!(status, 500);
        }
        other => panic!("expected status error, got {other:?}"),
    }

    match api.update_link("owner", "x").await {
        Err(ApiError::Status { method, status, url }) => {
            assert_eq!(method, "PATCH");
            assert_eq!(status, 404);
            assert!(url.contains("/api/link"));
        }
        other => panic!("expected status error, got {other:?}"),
    }
}
