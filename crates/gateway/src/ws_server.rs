//! WebSocket and health endpoints using Axum.

use crate::auth::{bearer_token, AuthError, TokenVerifier};
use crate::consumer::ConsumerState;
use crate::error::{http_status_for, GatewayError, Result};
use crate::protocol::{ClientMessage, ServerMessage};
use crate::registry::{ClientConnection, ConnectionRegistry, CLIENT_CHANNEL_BUFFER_SIZE};
use crate::services::Services;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use futures::{SinkExt, StreamExt};
use metrics::{counter, gauge};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::{debug, info, warn};

/// Interval between server-sent WebSocket pings.
pub const PING_INTERVAL: Duration = Duration::from_secs(30);

/// How long a closing connection may take to flush its Close frame.
const CLOSE_GRACE: Duration = Duration::from_secs(1);

/// Shared application state.
pub struct AppState {
    pub registry: Arc<ConnectionRegistry>,
    pub consumer_state: watch::Receiver<ConsumerState>,
    pub verifier: TokenVerifier,
    pub services: Services,
}

/// Create the HTTP router.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health_handler))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

/// Health check handler. Unhealthy once the consumer has stopped for good.
async fn health_handler(State(state): State<Arc<AppState>>) -> Response {
    let consumer = *state.consumer_state.borrow();
    let (status, label) = match consumer {
        ConsumerState::Closed => (StatusCode::SERVICE_UNAVAILABLE, "unavailable"),
        _ => (StatusCode::OK, "ok"),
    };
    let body = json!({
        "status": label,
        "connections": state.registry.len(),
        "consumer": consumer,
    });
    (status, Json(body)).into_response()
}

#[derive(Debug, Default, Deserialize)]
struct WsParams {
    token: Option<String>,
}

/// WebSocket upgrade handler. Authenticates before upgrading.
async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(params): Query<WsParams>,
    headers: HeaderMap,
) -> Response {
    let principal = match authenticate(&state, &headers, params.token.as_deref()).await {
        Ok(principal) => principal,
        Err(response) => return response,
    };
    ws.on_upgrade(move |socket| handle_socket(socket, state, principal))
}

/// Resolve the caller's principal from the `Authorization` header or the
/// `token` query parameter, and confirm it with the identity service.
async fn authenticate(
    state: &AppState,
    headers: &HeaderMap,
    query_token: Option<&str>,
) -> std::result::Result<String, Response> {
    let header = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
    let token = match (header, query_token.filter(|t| !t.is_empty())) {
        (None, Some(token)) => token,
        (header, _) => bearer_token(header).map_err(unauthorized)?,
    };

    let principal = state.verifier.verify(token).map_err(unauthorized)?;

    if let Err(status) = state.services.auth.get_user_by_id(&principal).await {
        let (code, message) = http_status_for(status.code());
        warn!("Rejecting upgrade for {}: {}", principal, status);
        return Err((code, Json(json!({ "message": message }))).into_response());
    }

    Ok(principal)
}

fn unauthorized(e: AuthError) -> Response {
    debug!("Rejecting upgrade: {}", e);
    (StatusCode::UNAUTHORIZED, Json(json!({ "message": e.to_string() }))).into_response()
}

/// Handle an authenticated WebSocket connection.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>, principal: String) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    // Bounded so one slow client cannot grow memory without limit.
    let (tx, mut rx) = mpsc::channel::<Message>(CLIENT_CHANNEL_BUFFER_SIZE);

    let conn = Arc::new(ClientConnection::new(principal, tx));
    if let Some(displaced) = state.registry.add(conn.clone()) {
        displaced.close();
    }

    counter!("gateway_connections_total").increment(1);
    gauge!("gateway_active_connections").set(state.registry.len() as f64);

    info!("Client {} connected as {}", conn.id, conn.principal_id);

    // Forward queued frames to the socket; a Close frame ends the writer.
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let closing = matches!(msg, Message::Close(_));
            if ws_tx.send(msg).await.is_err() || closing {
                break;
            }
        }
    });

    let mut ping_interval = interval(PING_INTERVAL);
    ping_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;

            _ = conn.closed() => {
                info!("Client {} closed by server", conn.id);
                break;
            }

            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(msg)) => {
                        // Backend calls may retry for a while; a server-side
                        // close must not wait for them.
                        let handled = tokio::select! {
                            biased;
                            _ = conn.closed() => None,
                            result = handle_message(&state, &conn, msg) => Some(result),
                        };
                        match handled {
                            None => {
                                info!("Client {} closed by server during request", conn.id);
                                break;
                            }
                            Some(Err(e)) => {
                                warn!("Error handling message from {}: {}", conn.id, e);
                                let _ = conn.send(&error_frame(&e));
                            }
                            Some(Ok(())) => {}
                        }
                    }
                    Some(Err(e)) => {
                        warn!("WebSocket error for {}: {}", conn.id, e);
                        break;
                    }
                    None => break,
                }
            }

            _ = ping_interval.tick() => {
                if conn.try_send_raw(Message::Ping(vec![].into())).is_err() {
                    warn!("Client {} is not draining its queue, disconnecting", conn.id);
                    break;
                }
            }
        }
    }

    // Cleanup
    state.registry.remove(&conn);
    conn.close();
    let _ = conn.try_send_raw(Message::Close(None));
    if tokio::time::timeout(CLOSE_GRACE, &mut send_task).await.is_err() {
        send_task.abort();
    }

    gauge!("gateway_active_connections").set(state.registry.len() as f64);

    info!("Client {} disconnected", conn.id);
}

/// Handle a single WebSocket frame.
async fn handle_message(state: &AppState, conn: &ClientConnection, msg: Message) -> Result<()> {
    conn.touch();
    match msg {
        Message::Text(text) => {
            let client_msg: ClientMessage = serde_json::from_str(&text)?;
            handle_client_message(state, conn, client_msg).await
        }
        Message::Binary(data) => {
            let client_msg: ClientMessage = serde_json::from_slice(&data)?;
            handle_client_message(state, conn, client_msg).await
        }
        // Pong replies are sent by the socket itself.
        Message::Ping(_) | Message::Pong(_) => Ok(()),
        Message::Close(_) => Ok(()),
    }
}

/// Handle a parsed client message.
async fn handle_client_message(
    state: &AppState,
    conn: &ClientConnection,
    msg: ClientMessage,
) -> Result<()> {
    match msg {
        ClientMessage::Ping => conn.send(&ServerMessage::Pong),
        ClientMessage::MarkRead { notification_id } => {
            state
                .services
                .notifications
                .mark_notification_as_read(&conn.principal_id, &notification_id)
                .await?;
            conn.send(&ServerMessage::MarkedRead { notification_id })
        }
        ClientMessage::ReadAll => {
            state
                .services
                .notifications
                .read_all_notifications(&conn.principal_id)
                .await?;
            conn.send(&ServerMessage::AllRead)
        }
    }
}

fn error_frame(e: &GatewayError) -> ServerMessage {
    let (message, code) = match e {
        GatewayError::Json(e) => (format!("invalid message: {}", e), "INVALID_MESSAGE"),
        GatewayError::Status(status) => (http_status_for(status.code()).1.to_string(), "BACKEND_ERROR"),
        other => (other.to_string(), "PROCESSING_ERROR"),
    };
    ServerMessage::Error {
        message,
        code: code.to_string(),
    }
}

/// Periodically close connections idle for longer than `idle_timeout`.
pub fn spawn_stale_sweeper(
    registry: Arc<ConnectionRegistry>,
    idle_timeout: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut sweep = interval((idle_timeout / 3).max(Duration::from_secs(1)));
        sweep.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = sweep.tick() => {
                    let closed = registry.close_stale(idle_timeout);
                    if closed > 0 {
                        info!("Closed {} stale connections", closed);
                        gauge!("gateway_active_connections").set(registry.len() as f64);
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Claims;
    use crate::proto::{notifications, sso, Empty};
    use crate::protocol::{NotificationEvent, NotificationKind};
    use crate::services::testing::{reply, services, FakeBackend};
    use async_trait::async_trait;
    use bytes::Bytes;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use rpc_client::{RpcCall, Transport};
    use std::net::SocketAddr;
    use tokio::net::{TcpListener, TcpStream};
    use tokio_tungstenite::tungstenite::client::IntoClientRequest;
    use tokio_tungstenite::tungstenite::{self, Message as WsMessage};
    use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

    const SECRET: &str = "e2e-secret";

    type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

    fn token(user: &str) -> String {
        encode(
            &Header::default(),
            &Claims {
                user_id: user.to_string(),
                exp: None,
            },
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    fn backend() -> Arc<FakeBackend> {
        FakeBackend::new(|method, _| match method {
            sso::GET_USER_BY_ID => reply(&sso::GetUserResponse {
                user_id: "alice".to_string(),
                username: "alice".to_string(),
                ..Default::default()
            }),
            notifications::MARK_NOTIFICATION_AS_READ => reply(&Empty {}),
            notifications::READ_ALL_NOTIFICATIONS => {
                Err(tonic::Status::unavailable("notifications down"))
            }
            other => panic!("unexpected call {}", other),
        })
    }

    /// Never answers `stalled`; everything else goes to `inner`.
    struct StallingBackend {
        inner: Arc<FakeBackend>,
        stalled: &'static str,
    }

    #[async_trait]
    impl Transport for StallingBackend {
        async fn unary(&self, call: RpcCall) -> std::result::Result<Bytes, tonic::Status> {
            if call.method == self.stalled {
                futures::future::pending::<()>().await;
            }
            self.inner.unary(call).await
        }
    }

    fn app_state(backend: Arc<dyn Transport>, consumer: ConsumerState) -> (Arc<AppState>, watch::Sender<ConsumerState>) {
        let (state_tx, state_rx) = watch::channel(consumer);
        let state = Arc::new(AppState {
            registry: Arc::new(ConnectionRegistry::new()),
            consumer_state: state_rx,
            verifier: TokenVerifier::new(SECRET),
            services: services(backend),
        });
        (state, state_tx)
    }

    async fn serve(state: Arc<AppState>) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, create_router(state)).await.unwrap();
        });
        addr
    }

    async fn wait_for(registry: &ConnectionRegistry, principal: &str, present: bool) {
        for _ in 0..200 {
            if registry.lookup(principal).is_some() == present {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("registry never reached expected state for {}", principal);
    }

    /// Next JSON frame, skipping keepalives. `None` once the server closes.
    async fn next_frame(client: &mut Client) -> Option<ServerMessage> {
        loop {
            let msg = tokio::time::timeout(Duration::from_secs(5), client.next())
                .await
                .expect("timed out waiting for frame")?;
            match msg {
                Ok(WsMessage::Text(text)) => return Some(serde_json::from_str(text.as_str()).unwrap()),
                Ok(WsMessage::Close(_)) | Err(_) => return None,
                Ok(_) => continue,
            }
        }
    }

    #[tokio::test]
    async fn test_notification_reaches_authenticated_client() {
        let (state, _consumer) = app_state(backend(), ConsumerState::Consuming);
        let addr = serve(state.clone()).await;

        let mut request = format!("ws://{}/ws", addr).into_client_request().unwrap();
        request
            .headers_mut()
            .insert("Authorization", format!("Bearer {}", token("alice")).parse().unwrap());
        let (mut client, _) = connect_async(request).await.unwrap();
        wait_for(&state.registry, "alice", true).await;

        let event = NotificationEvent::decode(
            br#"{"recipient_id":"alice","sender_id":"bob","kind":"new_subscriber"}"#,
        )
        .unwrap();
        state
            .registry
            .lookup("alice")
            .unwrap()
            .send(&ServerMessage::Notification(event.clone()))
            .unwrap();

        match next_frame(&mut client).await {
            Some(ServerMessage::Notification(got)) => {
                assert_eq!(got, event);
                assert_eq!(got.kind, NotificationKind::NewSubscriber);
            }
            other => panic!("unexpected frame {:?}", other),
        }

        client.close(None).await.unwrap();
        wait_for(&state.registry, "alice", false).await;
    }

    #[tokio::test]
    async fn test_client_frames() {
        let backend = backend();
        let (state, _consumer) = app_state(backend.clone(), ConsumerState::Consuming);
        let addr = serve(state.clone()).await;

        let url = format!("ws://{}/ws?token={}", addr, token("alice"));
        let (mut client, _) = connect_async(url).await.unwrap();

        client.send(WsMessage::text(r#"{"type":"ping"}"#)).await.unwrap();
        assert_eq!(next_frame(&mut client).await, Some(ServerMessage::Pong));

        client
            .send(WsMessage::text(r#"{"type":"mark_read","notification_id":"n1"}"#))
            .await
            .unwrap();
        assert_eq!(
            next_frame(&mut client).await,
            Some(ServerMessage::MarkedRead {
                notification_id: "n1".to_string()
            })
        );
        let sent: notifications::MarkNotificationAsReadRequest = backend.request(1);
        assert_eq!(sent.user_id, "alice");
        assert_eq!(sent.notification_id, "n1");

        client.send(WsMessage::text(r#"{"type":"read_all"}"#)).await.unwrap();
        match next_frame(&mut client).await {
            Some(ServerMessage::Error { code, message }) => {
                assert_eq!(code, "BACKEND_ERROR");
                assert_eq!(message, "service unavailable");
            }
            other => panic!("unexpected frame {:?}", other),
        }

        client.send(WsMessage::text("{nonsense")).await.unwrap();
        match next_frame(&mut client).await {
            Some(ServerMessage::Error { code, .. }) => assert_eq!(code, "INVALID_MESSAGE"),
            other => panic!("unexpected frame {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_server_close_interrupts_pending_request() {
        let backend = Arc::new(StallingBackend {
            inner: backend(),
            stalled: notifications::READ_ALL_NOTIFICATIONS,
        });
        let (state, _consumer) = app_state(backend, ConsumerState::Consuming);
        let addr = serve(state.clone()).await;

        let url = format!("ws://{}/ws?token={}", addr, token("alice"));
        let (mut client, _) = connect_async(url).await.unwrap();
        wait_for(&state.registry, "alice", true).await;

        client.send(WsMessage::text(r#"{"type":"read_all"}"#)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        state.registry.close_all();

        assert_eq!(next_frame(&mut client).await, None);
        wait_for(&state.registry, "alice", false).await;
    }

    #[tokio::test]
    async fn test_second_connection_replaces_first() {
        let (state, _consumer) = app_state(backend(), ConsumerState::Consuming);
        let addr = serve(state.clone()).await;
        let url = format!("ws://{}/ws?token={}", addr, token("alice"));

        let (mut first, _) = connect_async(url.clone()).await.unwrap();
        wait_for(&state.registry, "alice", true).await;
        let first_id = state.registry.lookup("alice").unwrap().id;

        let (_second, _) = connect_async(url).await.unwrap();
        for _ in 0..200 {
            if state.registry.lookup("alice").map(|c| c.id) != Some(first_id) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert_eq!(next_frame(&mut first).await, None);
        let current = state.registry.lookup("alice").unwrap();
        assert_ne!(current.id, first_id);
        assert_eq!(state.registry.len(), 1);
    }

    #[tokio::test]
    async fn test_upgrade_requires_valid_token() {
        let (state, _consumer) = app_state(backend(), ConsumerState::Consuming);
        let addr = serve(state.clone()).await;

        for url in [
            format!("ws://{}/ws", addr),
            format!("ws://{}/ws?token=garbage", addr),
        ] {
            match connect_async(url).await {
                Err(tungstenite::Error::Http(response)) => {
                    assert_eq!(response.status(), StatusCode::UNAUTHORIZED)
                }
                other => panic!("expected 401, got {:?}", other.map(|_| ())),
            }
        }
        assert!(state.registry.is_empty());
    }

    #[tokio::test]
    async fn test_upgrade_rejected_when_user_unknown() {
        let backend = FakeBackend::new(|_, _| Err(tonic::Status::not_found("no such user")));
        let (state, _consumer) = app_state(backend, ConsumerState::Consuming);
        let addr = serve(state).await;

        let url = format!("ws://{}/ws?token={}", addr, token("ghost"));
        match connect_async(url).await {
            Err(tungstenite::Error::Http(response)) => {
                assert_eq!(response.status(), StatusCode::NOT_FOUND)
            }
            other => panic!("expected 404, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_health_reflects_consumer_state() {
        let (state, consumer) = app_state(backend(), ConsumerState::Consuming);

        let response = health_handler(State(state.clone())).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["consumer"], "consuming");
        assert_eq!(json["connections"], 0);

        consumer.send_replace(ConsumerState::Closed);
        let response = health_handler(State(state)).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_stale_sweeper_stops_on_shutdown() {
        let registry = Arc::new(ConnectionRegistry::new());
        let shutdown = CancellationToken::new();
        let handle = spawn_stale_sweeper(registry, Duration::from_secs(90), shutdown.clone());
        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
