// SPDX-License-Identifier: MIT

/// Failure modes of the client ↔ language-server relay.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// The language server executable could not be spawned.
    #[error("failed to launch language server: {0}")]
    Launch(#[source] std::io::Error),
    /// Writing a frame to the language server stdin failed.
    #[error("failed to write to language server: {0}")]
    Write(#[source] std::io::Error),
    /// The language server emitted a malformed header or payload.
    #[error("malformed frame from language server: {0}")]
    FrameDecode(String),
    /// The client sent a text frame that is not valid JSON.
    #[error("client message is not valid JSON: {0}")]
    MessageDecode(#[source] serde_json::Error),
}
