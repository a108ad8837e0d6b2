//! WebSocket transport: accept loop and per-connection pump between the
//! socket and the gateway.

use std::net::SocketAddr;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_async, WebSocketStream};

use crate::gateway::RelayGateway;
use crate::protocol::ClientMessage;
use crate::session::SessionStore;

/// Accept connections forever, one task per peer.
pub async fn serve<S: SessionStore>(listener: TcpListener, gateway: RelayGateway<S>) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let gateway = gateway.clone();
                tokio::spawn(async move {
                    match accept_async(stream).await {
                        Ok(ws) => handle_connection(ws, addr, gateway).await,
                        Err(e) => {
                            tracing::warn!(peer = %addr, error = %e, "WS handshake failed");
                        }
                    }
                });
            }
            Err(e) => {
                tracing::warn!(error = %e, "TCP accept error");
            }
        }
    }
}

/// Handle a single WebSocket connection until either side closes it.
pub async fn handle_connection<S: SessionStore>(
    ws: WebSocketStream<TcpStream>,
    addr: SocketAddr,
    gateway: RelayGateway<S>,
) {
    let (mut sink, mut stream) = ws.split();
    let (conn, mut outbox) = gateway.connect().await;

    tracing::info!(peer = %addr, conn = %conn.short(), "Client connected");

    loop {
        tokio::select! {
            // Gateway → this client's WebSocket. `None` means the gateway
            // evicted this connection.
            msg = outbox.recv() => {
                let Some(msg) = msg else {
                    tracing::info!(peer = %addr, conn = %conn.short(), "Evicted by gateway");
                    let _ = sink.close().await;
                    break;
                };
                let json = match msg.to_json() {
                    Ok(json) => json,
                    Err(e) => {
                        tracing::error!(conn = %conn.short(), error = %e, "Failed to encode message");
                        continue;
                    }
                };
                if sink.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }

            // This client's WebSocket → gateway
            frame = stream.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => match ClientMessage::parse(text.as_str()) {
                        Ok(msg) => gateway.handle(&conn, msg).await,
                        Err(e) => {
                            tracing::warn!(conn = %conn.short(), error = %e, "Invalid message");
                            gateway.reject(&conn, format!("invalid message: {e}")).await;
                        }
                    },
                    Some(Ok(Message::Ping(data))) => {
                        gateway.touch(&conn).await;
                        let _ = sink.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Pong(_))) => {
                        gateway.touch(&conn).await;
                    }
                    Some(Ok(Message::Binary(_))) => {
                        tracing::debug!(conn = %conn.short(), "Ignoring binary frame");
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!(peer = %addr, error = %e, "WS error");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    tracing::info!(peer = %addr, conn = %conn.short(), "Client disconnected");
    gateway.disconnect(&conn).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ServerMessage;
    use crate::session::MemorySessionStore;
    use tokio_tungstenite::connect_async;
    use tokio_tungstenite::tungstenite::Message;

    type Client = WebSocketStream<tokio_tungstenite::MaybeTlsStream<TcpStream>>;

    async fn start() -> (SocketAddr, RelayGateway) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let gateway = RelayGateway::new(MemorySessionStore::default());
        tokio::spawn(serve(listener, gateway.clone()));
        (addr, gateway)
    }

    async fn client(addr: SocketAddr) -> Client {
        let (ws, _) = connect_async(format!("ws://{addr}")).await.unwrap();
        ws
    }

    async fn send(ws: &mut Client, json: &str) {
        ws.send(Message::Text(json.to_string().into())).await.unwrap();
    }

    async fn recv(ws: &mut Client) -> ServerMessage {
        loop {
            let frame = tokio::time::timeout(std::time::Duration::from_secs(5), ws.next())
                .await
                .expect("timed out waiting for frame")
                .unwrap()
                .unwrap();
            if let Message::Text(text) = frame {
                return serde_json::from_str(text.as_str()).unwrap();
            }
        }
    }

    #[tokio::test]
    async fn pairs_and_relays_over_websocket() {
        let (addr, gateway) = start().await;
        let mut producer = client(addr).await;
        let mut consumer = client(addr).await;

        send(&mut producer, r#"{"type":"request-create"}"#).await;
        let code = match recv(&mut producer).await {
            ServerMessage::CreateResult {
                success: true,
                code: Some(code),
                ..
            } => code,
            other => panic!("unexpected reply: {other:?}"),
        };

        let join = format!(r#"{{"type":"request-join","code":"{}"}}"#, code.to_lowercase());
        send(&mut consumer, &join).await;
        assert_eq!(recv(&mut consumer).await, ServerMessage::joined(&code));
        assert_eq!(
            recv(&mut producer).await,
            ServerMessage::PeerConnected { code: code.clone() }
        );

        for p in ["a", "b", "c"] {
            send(
                &mut producer,
                &format!(r#"{{"type":"payload-update","payload":"{p}"}}"#),
            )
            .await;
        }
        for p in ["a", "b", "c"] {
            match recv(&mut consumer).await {
                ServerMessage::PayloadUpdate { payload, delivered_at } => {
                    assert_eq!(payload, p);
                    assert!(delivered_at > 0);
                }
                other => panic!("unexpected message: {other:?}"),
            }
        }

        consumer.close(None).await.unwrap();
        assert_eq!(recv(&mut producer).await, ServerMessage::PeerDisconnected);
        assert_eq!(gateway.session_count().await, 1);
    }

    #[tokio::test]
    async fn producer_close_ends_session_for_consumer() {
        let (addr, gateway) = start().await;
        let mut producer = client(addr).await;
        let mut consumer = client(addr).await;

        send(&mut producer, r#"{"type":"request-create"}"#).await;
        let code = match recv(&mut producer).await {
            ServerMessage::CreateResult { code: Some(code), .. } => code,
            other => panic!("unexpected reply: {other:?}"),
        };
        send(
            &mut consumer,
            &format!(r#"{{"type":"request-join","code":"{code}"}}"#),
        )
        .await;
        assert_eq!(recv(&mut consumer).await, ServerMessage::joined(&code));

        drop(producer);
        match recv(&mut consumer).await {
            ServerMessage::SessionEnded { .. } => {}
            other => panic!("unexpected message: {other:?}"),
        }
        assert_eq!(gateway.session_count().await, 0);
    }

    #[tokio::test]
    async fn ping_refreshes_session_activity() {
        let (addr, gateway) = start().await;
        let mut producer = client(addr).await;

        send(&mut producer, r#"{"type":"request-create"}"#).await;
        recv(&mut producer).await;

        tokio::time::sleep(std::time::Duration::from_millis(300)).await;
        producer.send(Message::Ping(Vec::new().into())).await.unwrap();
        loop {
            let frame = producer.next().await.unwrap().unwrap();
            if matches!(frame, Message::Pong(_)) {
                break;
            }
        }

        // Created 300ms ago but pinged just now.
        assert_eq!(
            gateway
                .reap_idle(std::time::Duration::from_millis(200))
                .await,
            0
        );
        assert_eq!(gateway.session_count().await, 1);
    }

    #[tokio::test]
    async fn malformed_frame_gets_error_reply() {
        let (addr, gateway) = start().await;
        let mut peer = client(addr).await;

        send(&mut peer, "{not json").await;
        match recv(&mut peer).await {
            ServerMessage::Error { message } => assert!(message.starts_with("invalid message")),
            other => panic!("unexpected message: {other:?}"),
        }

        send(&mut peer, r#"{"type":"request-join"}"#).await;
        assert_eq!(
            recv(&mut peer).await,
            ServerMessage::join_failed(&companion_common::RelayError::InvalidRequest(
                String::new()
            ))
        );
        assert_eq!(gateway.session_count().await, 0);
    }
}
