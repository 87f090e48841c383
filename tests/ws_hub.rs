//! End-to-end tests: real server, real HTTP and WebSocket clients.

#![allow(clippy::panic)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use forum_hub::app_state::AppState;
use forum_hub::auth::credentials::MIN_HASH_COST;
use forum_hub::hub::{BroadcastPolicy, Hub};
use forum_hub::persistence::SqliteStore;
use forum_hub::server;
use forum_hub::ws::ForumHub;

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const WAIT: Duration = Duration::from_secs(5);

struct TestServer {
    addr: SocketAddr,
    hub: Arc<ForumHub>,
    http: reqwest::Client,
    stop: Option<oneshot::Sender<()>>,
}

impl TestServer {
    async fn start() -> Self {
        let Ok(store) = SqliteStore::in_memory().await else {
            panic!("in-memory database");
        };
        let hub = Arc::new(Hub::new(
            BroadcastPolicy::IncludeSender,
            Duration::from_secs(1),
        ));
        let state = AppState::new(
            Arc::new(store),
            Arc::clone(&hub),
            MIN_HASH_COST,
            Duration::from_secs(300),
            "session_id",
        );

        let Ok(listener) = tokio::net::TcpListener::bind("127.0.0.1:0").await else {
            panic!("bind");
        };
        let Ok(addr) = listener.local_addr() else {
            panic!("local addr");
        };
        let (stop, stopped) = oneshot::channel::<()>();
        tokio::spawn(server::serve(listener, state, async move {
            let _ = stopped.await;
        }));

        Self {
            addr,
            hub,
            http: reqwest::Client::new(),
            stop: Some(stop),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    async fn post(&self, path: &str, body: Value) -> (u16, Value) {
        let Ok(response) = self.http.post(self.url(path)).json(&body).send().await else {
            panic!("POST {path} failed");
        };
        let status = response.status().as_u16();
        let body = response.json::<Value>().await.unwrap_or(Value::Null);
        (status, body)
    }

    /// Registers a user and logs in, returning the session token.
    async fn login_as(&self, nickname: &str) -> String {
        let (status, _) = self
            .post(
                "/register",
                json!({
                    "nickname": nickname,
                    "age": 20,
                    "email": format!("{nickname}@forum.test"),
                    "password": "correct-horse",
                }),
            )
            .await;
        assert_eq!(status, 201);

        let (status, body) = self
            .post(
                "/login",
                json!({ "username": nickname, "password": "correct-horse" }),
            )
            .await;
        assert_eq!(status, 200);
        let Some(token) = body.get("session_token").and_then(Value::as_str) else {
            panic!("login response without token: {body}");
        };
        token.to_string()
    }

    async fn connect(&self, token: &str) -> Result<Client, tungstenite::Error> {
        let Ok(mut request) = format!("ws://{}/ws", self.addr).into_client_request() else {
            panic!("client request");
        };
        let Ok(cookie) = HeaderValue::from_str(&format!("session_id={token}")) else {
            panic!("cookie header");
        };
        request.headers_mut().insert("cookie", cookie);
        tokio_tungstenite::connect_async(request)
            .await
            .map(|(stream, _)| stream)
    }

    async fn connect_with_query(&self, token: &str) -> Result<Client, tungstenite::Error> {
        tokio_tungstenite::connect_async(format!("ws://{}/ws?token={token}", self.addr))
            .await
            .map(|(stream, _)| stream)
    }

    async fn wait_for_connections(&self, expected: usize) {
        let deadline = tokio::time::Instant::now() + WAIT;
        while self.hub.len().await != expected {
            if tokio::time::Instant::now() > deadline {
                panic!(
                    "hub never reached {expected} connections (has {})",
                    self.hub.len().await
                );
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
    }
}

async fn next_text(client: &mut Client) -> String {
    loop {
        let Ok(frame) = tokio::time::timeout(WAIT, client.next()).await else {
            panic!("timed out waiting for a frame");
        };
        match frame {
            Some(Ok(Message::Text(text))) => return text.as_str().to_string(),
            Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
            other => panic!("unexpected frame: {other:?}"),
        }
    }
}

async fn assert_silent(client: &mut Client) {
    let result = tokio::time::timeout(Duration::from_millis(200), client.next()).await;
    assert!(result.is_err(), "expected no frame, got {result:?}");
}

#[tokio::test]
async fn hello_world_relay() {
    let server = TestServer::start().await;
    let token_a = server.login_as("alice").await;
    let token_b = server.login_as("bob").await;

    let Ok(mut a) = server.connect(&token_a).await else {
        panic!("alice could not connect");
    };
    let Ok(mut b) = server.connect(&token_b).await else {
        panic!("bob could not connect");
    };
    server.wait_for_connections(2).await;

    let Ok(()) = a.send(Message::text("hello")).await else {
        panic!("send hello");
    };
    assert_eq!(next_text(&mut a).await, "hello");
    assert_eq!(next_text(&mut b).await, "hello");
    assert_silent(&mut a).await;
    assert_silent(&mut b).await;

    let _ = b.close(None).await;
    server.wait_for_connections(1).await;

    let Ok(()) = a.send(Message::text("world")).await else {
        panic!("send world");
    };
    assert_eq!(next_text(&mut a).await, "world");
    assert_eq!(server.hub.len().await, 1);
}

#[tokio::test]
async fn binary_frames_are_relayed_as_binary() {
    let server = TestServer::start().await;
    let token = server.login_as("carol").await;
    let Ok(mut c) = server.connect(&token).await else {
        panic!("carol could not connect");
    };
    server.wait_for_connections(1).await;

    let Ok(()) = c.send(Message::binary(vec![0u8, 1, 2, 255])).await else {
        panic!("send binary");
    };
    let Ok(Some(Ok(frame))) = tokio::time::timeout(WAIT, c.next()).await else {
        panic!("no frame");
    };
    assert_eq!(frame, Message::binary(vec![0u8, 1, 2, 255]));
}

#[tokio::test]
async fn invalid_session_is_rejected_before_upgrade() {
    let server = TestServer::start().await;

    match server.connect("no-such-session").await {
        Err(tungstenite::Error::Http(response)) => assert_eq!(response.status().as_u16(), 401),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("connection should have been refused"),
    }
    match server.connect("").await {
        Err(tungstenite::Error::Http(response)) => assert_eq!(response.status().as_u16(), 401),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("connection should have been refused"),
    }
    assert!(server.hub.is_empty().await);
}

#[tokio::test]
async fn logged_out_token_cannot_connect() {
    let server = TestServer::start().await;
    let token = server.login_as("dave").await;

    let (status, body) = server
        .post("/logout", json!({ "session_token": token }))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body.get("logged_out"), Some(&Value::Bool(true)));

    assert!(server.connect(&token).await.is_err());
    assert!(server.hub.is_empty().await);
}

#[tokio::test]
async fn shutdown_closes_live_connections() {
    let server = TestServer::start().await;
    let token = server.login_as("erin").await;
    let Ok(mut e) = server.connect(&token).await else {
        panic!("erin could not connect");
    };
    server.wait_for_connections(1).await;

    assert_eq!(server.hub.shutdown().await, 1);
    let Ok(frame) = tokio::time::timeout(WAIT, e.next()).await else {
        panic!("client never saw the close");
    };
    assert!(matches!(frame, Some(Ok(Message::Close(_))) | None | Some(Err(_))));

    assert!(server.connect(&token).await.is_err());
}

#[tokio::test]
async fn query_token_admits_cookieless_client() {
    let server = TestServer::start().await;
    let token_f = server.login_as("frank").await;
    let token_g = server.login_as("grace").await;

    let Ok(mut f) = server.connect_with_query(&token_f).await else {
        panic!("frank could not connect with a query token");
    };
    let Ok(mut g) = server.connect(&token_g).await else {
        panic!("grace could not connect");
    };
    server.wait_for_connections(2).await;

    let Ok(()) = f.send(Message::text("via query")).await else {
        panic!("send");
    };
    assert_eq!(next_text(&mut f).await, "via query");
    assert_eq!(next_text(&mut g).await, "via query");

    assert!(server.connect_with_query("").await.is_err());
    assert_eq!(server.hub.len().await, 2);
}
