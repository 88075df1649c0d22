// SPDX-License-Identifier: MIT
//! LSP 3.17 base-protocol framing: a header block terminated by an empty
//! line, then exactly `Content-Length` bytes of UTF-8 JSON.
//!
//! Wire form: `Content-Length: <N>\r\n\r\n<payload>`

use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::lsp::error::RelayError;

const CONTENT_LENGTH: &str = "content-length";

/// Serialize `message` compactly and write it as one frame.
///
/// Safe to call repeatedly on the same writer; each call emits exactly one
/// complete frame and flushes.
pub async fn write_message<W>(writer: &mut W, message: &Value) -> Result<(), RelayError>
where
    W: AsyncWrite + Unpin,
{
    let payload = serde_json::to_vec(message)
        .map_err(|e| RelayError::Write(std::io::Error::other(e)))?;
    let header = format!("Content-Length: {}\r\n\r\n", payload.len());

    writer
        .write_all(header.as_bytes())
        .await
        .map_err(RelayError::Write)?;
    writer
        .write_all(&payload)
        .await
        .map_err(RelayError::Write)?;
    writer.flush().await.map_err(RelayError::Write)
}

/// Read one frame and decode its payload.
///
/// Returns `Ok(None)` on a clean end-of-stream (no partial header consumed).
/// A stream that ends mid-frame, a non-numeric or missing `Content-Length`,
/// a declared length above `max_frame_bytes`, or an undecodable payload all
/// fail with [`RelayError::FrameDecode`]. Unknown header fields (e.g.
/// `Content-Type`) are skipped.
pub async fn read_message<R>(
    reader: &mut R,
    max_frame_bytes: usize,
) -> Result<Option<Value>, RelayError>
where
    R: AsyncBufRead + Unpin,
{
    let mut content_length: Option<usize> = None;
    let mut first_line = true;

    // Header block: one `Name: value` per line, blank line terminates.
    loop {
        let mut line = String::new();
        let n = reader
            .read_line(&mut line)
            .await
            .map_err(|e| RelayError::FrameDecode(e.to_string()))?;

        if n == 0 {
            if first_line {
                // Clean EOF between frames.
                return Ok(None);
            }
            return Err(RelayError::FrameDecode(
                "stream closed inside a frame header".into(),
            ));
        }
        first_line = false;

        let line = line.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            break;
        }

        let Some((name, value)) = line.split_once(':') else {
            return Err(RelayError::FrameDecode(format!(
                "header line without separator: {line:?}"
            )));
        };
        if name.trim().eq_ignore_ascii_case(CONTENT_LENGTH) {
            let len: usize = value.trim().parse().map_err(|_| {
                RelayError::FrameDecode(format!("non-numeric Content-Length: {:?}", value.trim()))
            })?;
            content_length = Some(len);
        }
    }

    let len = content_length.ok_or_else(|| {
        RelayError::FrameDecode("header block without Content-Length".into())
    })?;
    if len > max_frame_bytes {
        return Err(RelayError::FrameDecode(format!(
            "declared frame length {len} exceeds cap {max_frame_bytes}"
        )));
    }

    // Payload: exactly `len` bytes — never dispatch a partial frame.
    let mut payload = vec![0u8; len];
    reader
        .read_exact(&mut payload)
        .await
        .map_err(|e| RelayError::FrameDecode(format!("short payload read: {e}")))?;

    serde_json::from_slice(&payload)
        .map(Some)
        .map_err(|e| RelayError::FrameDecode(format!("payload is not valid JSON: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Cursor;
    use tokio::io::BufReader;

    const MAX: usize = 16 * 1024 * 1024;

    async fn encode(message: &Value) -> Vec<u8> {
        let mut buf = Vec::new();
        write_message(&mut buf, message).await.unwrap();
        buf
    }

    async fn decode(bytes: &[u8]) -> Result<Option<Value>, RelayError> {
        let mut reader = BufReader::new(Cursor::new(bytes.to_vec()));
        read_message(&mut reader, MAX).await
    }

    #[tokio::test]
    async fn round_trip_preserves_message() {
        let msg = json!({"jsonrpc": "2.0", "method": "initialize", "id": 1,
                         "params": {"rootUri": "file:///tmp", "nested": [1, 2, 3]}});
        let bytes = encode(&msg).await;
        let back = decode(&bytes).await.unwrap().unwrap();
        assert_eq!(back, msg);
    }

    #[tokio::test]
    async fn header_declares_exact_payload_byte_count() {
        let msg: Value =
            serde_json::from_str(r#"{"jsonrpc":"2.0","method":"initialize","id":1}"#).unwrap();
        let bytes = encode(&msg).await;

        let sep = bytes.windows(4).position(|w| w == b"\r\n\r\n").unwrap();
        let header = std::str::from_utf8(&bytes[..sep]).unwrap();
        let payload = &bytes[sep + 4..];

        assert_eq!(header, format!("Content-Length: {}", payload.len()));
        // Key order may differ after re-serialization, but the byte count of
        // this particular message does not.
        assert_eq!(payload.len(), 46);
    }

    #[tokio::test]
    async fn multiple_frames_decode_in_write_order() {
        let m1 = json!({"id": 1});
        let m2 = json!({"id": 2});
        let m3 = json!({"id": 3});
        let mut buf = Vec::new();
        for m in [&m1, &m2, &m3] {
            write_message(&mut buf, m).await.unwrap();
        }

        let mut reader = BufReader::new(Cursor::new(buf));
        assert_eq!(read_message(&mut reader, MAX).await.unwrap(), Some(m1));
        assert_eq!(read_message(&mut reader, MAX).await.unwrap(), Some(m2));
        assert_eq!(read_message(&mut reader, MAX).await.unwrap(), Some(m3));
        assert_eq!(read_message(&mut reader, MAX).await.unwrap(), None);
    }

    #[tokio::test]
    async fn clean_eof_returns_none() {
        assert!(decode(b"").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn partial_payload_is_never_dispatched() {
        let (client, mut server) = tokio::io::duplex(1024);
        let mut reader = BufReader::new(client);

        let read = tokio::spawn(async move { read_message(&mut reader, MAX).await });

        // Header plus only 5 of the 13 payload bytes.
        server
            .write_all(b"Content-Length: 13\r\n\r\n{\"ok\"")
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(!read.is_finished(), "reader dispatched a partial frame");

        server.write_all(b":true}").await.unwrap();
        server.flush().await.unwrap();
        // Total so far: 5 + 6 = 11 bytes — still short of 13.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(!read.is_finished(), "reader dispatched a partial frame");

        server.write_all(b"  ").await.unwrap();
        let msg = read.await.unwrap().unwrap().unwrap();
        assert_eq!(msg, json!({"ok": true}));
    }

    #[tokio::test]
    async fn non_numeric_length_is_a_frame_error() {
        let err = decode(b"Content-Length: forty\r\n\r\n{}").await.unwrap_err();
        assert!(matches!(err, RelayError::FrameDecode(_)));
    }

    #[tokio::test]
    async fn missing_content_length_is_a_frame_error() {
        let err = decode(b"Content-Type: application/json\r\n\r\n{}")
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::FrameDecode(_)));
    }

    #[tokio::test]
    async fn header_line_without_separator_is_a_frame_error() {
        let err = decode(b"garbage header\r\n\r\n").await.unwrap_err();
        assert!(matches!(err, RelayError::FrameDecode(_)));
    }

    #[tokio::test]
    async fn truncated_stream_inside_header_is_a_frame_error() {
        let err = decode(b"Content-Length: 2\r\n").await.unwrap_err();
        assert!(matches!(err, RelayError::FrameDecode(_)));
    }

    #[tokio::test]
    async fn truncated_payload_is_a_frame_error() {
        let err = decode(b"Content-Length: 100\r\n\r\n{\"short\":true}")
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::FrameDecode(_)));
    }

    #[tokio::test]
    async fn oversized_declared_length_is_rejected_before_reading() {
        let mut reader = BufReader::new(Cursor::new(b"Content-Length: 17\r\n\r\n".to_vec()));
        let err = read_message(&mut reader, 16).await.unwrap_err();
        assert!(matches!(err, RelayError::FrameDecode(_)));
    }

    #[tokio::test]
    async fn content_type_header_is_skipped() {
        let body = br#"{"ok":true}"#;
        let mut buf = Vec::new();
        buf.extend_from_slice(
            format!(
                "Content-Length: {}\r\nContent-Type: application/vscode-jsonrpc; charset=utf-8\r\n\r\n",
                body.len()
            )
            .as_bytes(),
        );
        buf.extend_from_slice(body);
        let msg = decode(&buf).await.unwrap().unwrap();
        assert_eq!(msg, json!({"ok": true}));
    }
}
