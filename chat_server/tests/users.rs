use chat_server::{
    api::{build_router, AppState},
    config::Config,
};
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::net::{SocketAddr, TcpListener};
use tokio::task::JoinHandle;

async fn spawn_server() -> (SocketAddr, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    listener.set_nonblocking(true).unwrap();

    let config = Config {
        bind: addr.to_string(),
        database: None,
        logging_enabled: false,
    };
    let state = AppState::new(&config).await.unwrap();
    let app = build_router(state);
    let server = tokio::spawn(async move {
        axum::Server::from_tcp(listener)
            .unwrap()
            .serve(app.into_make_service())
            .await
            .unwrap();
    });
    (addr, server)
}

#[tokio::test]
async fn health_and_user_directory() {
    let (addr, server) = spawn_server().await;
    let client = reqwest::Client::new();

    let body = client
        .get(format!("http://{}/api/health", addr))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(body, "ok");

    for name in ["alice", "bob"] {
        let resp = client
            .post(format!("http://{}/api/users", addr))
            .json(&json!({ "username": name }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    let resp = client
        .post(format!("http://{}/api/users", addr))
        .json(&json!({ "username": "Alice" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    assert_eq!(resp.json::<Value>().await.unwrap()["error"], "duplicate_user");

    let resp = client
        .post(format!("http://{}/api/users", addr))
        .json(&json!({ "username": "  " }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let users: Vec<Value> = client
        .get(format!("http://{}/api/users", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(
        users,
        vec![
            json!({ "id": 1, "username": "alice" }),
            json!({ "id": 2, "username": "bob" })
        ]
    );

    server.abort();
}
