// SPDX-License-Identifier: MIT
//! The Connection Handler: one WebSocket session ↔ one language-server
//! subprocess.
//!
//! On upgrade the handler spawns the configured language server and enters a
//! select loop: client text frames are decoded and framed onto the
//! subprocess stdin; decoded subprocess messages are sent back as one text
//! frame each. Both directions preserve their own ordering; nothing is
//! interpreted in between.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::lsp::{LanguageServer, RelayError};
use crate::AppContext;

// JSON-RPC 2.0 error codes used on the client-facing side.
const PARSE_ERROR: i32 = -32700;
const INTERNAL_ERROR: i32 = -32603;

pub async fn ws_upgrade(ws: WebSocketUpgrade, State(ctx): State<Arc<AppContext>>) -> Response {
    ws.on_upgrade(move |socket| handle_session(socket, ctx))
}

async fn handle_session(socket: WebSocket, ctx: Arc<AppContext>) {
    let (mut sink, mut stream) = socket.split();

    // Launch failure rejects the connection with one diagnostic frame — the
    // client is not left guessing why the socket dropped. No retry.
    let (mut server, mut inbound) =
        match LanguageServer::spawn(&ctx.config.server_command, ctx.config.max_frame_bytes) {
            Ok(pair) => pair,
            Err(e) => {
                warn!(err = %e, "language server launch failed — rejecting connection");
                let _ = sink
                    .send(Message::Text(
                        error_frame(INTERNAL_ERROR, &e.to_string()).into(),
                    ))
                    .await;
                let _ = sink.close().await;
                return;
            }
        };

    info!(pid = ?server.pid(), "relay session started");

    loop {
        tokio::select! {
            // Client → subprocess
            frame = stream.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        let message: Value = match serde_json::from_str(text.as_str()) {
                            Ok(m) => m,
                            Err(e) => {
                                // Per-message failure: answer with a parse
                                // error and keep the session alive.
                                let e = RelayError::MessageDecode(e);
                                debug!(err = %e, "undecodable client frame");
                                if sink
                                    .send(Message::Text(
                                        error_frame(PARSE_ERROR, "Parse error").into(),
                                    ))
                                    .await
                                    .is_err()
                                {
                                    break;
                                }
                                continue;
                            }
                        };
                        if let Err(e) = server.write(&message).await {
                            warn!(err = %e, "relay write failed — closing session");
                            break;
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let _ = sink.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        warn!(err = %e, "ws error");
                        break;
                    }
                    _ => {}
                }
            }
            // Subprocess → client
            delivered = inbound.recv() => {
                match delivered {
                    Some(Ok(message)) => {
                        let text = serde_json::to_string(&message).unwrap_or_default();
                        if let Err(e) = sink.send(Message::Text(text.into())).await {
                            warn!(err = %e, "send error");
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        warn!(err = %e, "inbound frame error — closing session");
                        let _ = sink
                            .send(Message::Text(
                                error_frame(INTERNAL_ERROR, &e.to_string()).into(),
                            ))
                            .await;
                        break;
                    }
                    None => {
                        debug!("language server stream ended");
                        break;
                    }
                }
            }
        }
    }

    // Every exit path tears the subprocess down — sessions never leak
    // children.
    let _ = sink.close().await;
    server.shutdown().await;
    info!("relay session ended");
}

fn error_frame(code: i32, message: &str) -> String {
    json!({
        "jsonrpc": "2.0",
        "id": Value::Null,
        "error": { "code": code, "message": message }
    })
    .to_string()
}
