//! SSE stream parsing for provider chat-completion endpoints.
//!
//! Consume SSE lines, ignoring comment/blank lines; `data:`-prefixed frames
//! carry JSON except the terminal `data: [DONE]`. `delta.content` (when
//! present) becomes a content chunk; a non-empty `finish_reason` becomes
//! the stop reason. The caller's handler is invoked once per content chunk
//! and once more with the final `done` chunk.

use crate::error::RouterError;
use crate::types::{ChatResponse, StreamChunk, Usage};
use serde::Deserialize;
use tokio_stream::StreamExt;

#[derive(Debug, Deserialize)]
struct SseFrame {
    choices: Vec<SseChoice>,
    #[serde(default)]
    usage: Option<SseUsage>,
}

#[derive(Debug, Deserialize)]
struct SseChoice {
    delta: SseDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SseDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SseUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

/// Consume a byte stream of SSE data, invoking `handler` for every chunk and
/// returning the accumulated content, stop reason, and best-effort usage.
pub async fn consume_sse<S, F>(mut byte_stream: S, mut handler: F) -> Result<ChatResponse, RouterError>
where
    S: futures_util::Stream<Item = Result<bytes::Bytes, reqwest::Error>> + Unpin,
    F: FnMut(StreamChunk),
{
    let mut buffer = String::new();
    let mut content = String::new();
    let mut stop_reason = None;
    let mut usage = Usage::default();

    while let Some(chunk) = byte_stream.next().await {
        let chunk = chunk.map_err(|e| RouterError::Transport(e.to_string()))?;
        buffer.push_str(&String::from_utf8_lossy(&chunk));

        while let Some(newline_pos) = buffer.find('\n') {
            let line = buffer[..newline_pos].trim_end_matches('\r').to_string();
            buffer.drain(..=newline_pos);

            if line.is_empty() || line.starts_with(':') {
                continue;
            }
            let Some(data) = line.strip_prefix("data:") else {
                continue;
            };
            let data = data.trim();

            if data == "[DONE]" {
                handler(StreamChunk::done());
                return Ok(ChatResponse { content, stop_reason, usage });
            }

            let Ok(frame) = serde_json::from_str::<SseFrame>(data) else {
                continue;
            };
            if let Some(u) = frame.usage {
                usage.tokens_in = u.prompt_tokens;
                usage.tokens_out = u.completion_tokens;
                usage.is_estimated = false;
            }
            for choice in frame.choices {
                if let Some(text) = choice.delta.content {
                    if !text.is_empty() {
                        content.push_str(&text);
                        handler(StreamChunk::content(text));
                    }
                }
                if let Some(reason) = choice.finish_reason {
                    if !reason.is_empty() {
                        stop_reason = Some(reason);
                    }
                }
            }
        }
    }

    if usage.tokens_in == 0 && usage.tokens_out == 0 {
        usage.is_estimated = true;
    }
    handler(StreamChunk::done());
    Ok(ChatResponse { content, stop_reason, usage })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    fn byte_stream(s: &str) -> impl futures_util::Stream<Item = Result<bytes::Bytes, reqwest::Error>> + Unpin {
        stream::iter(vec![Ok(bytes::Bytes::from(s.to_string()))])
    }

    #[tokio::test]
    async fn parses_content_and_done_frames() {
        let sse = "data: {\"choices\":[{\"delta\":{\"content\":\"Hello\"}}]}\n\n\
                   data: {\"choices\":[{\"delta\":{\"content\":\" world\"},\"finish_reason\":\"stop\"}]}\n\n\
                   data: [DONE]\n\n";
        let mut chunks = Vec::new();
        let response = consume_sse(byte_stream(sse), |c| chunks.push(c)).await.unwrap();

        assert_eq!(response.content, "Hello world");
        assert_eq!(response.stop_reason.as_deref(), Some("stop"));
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].content.as_deref(), Some("Hello"));
        assert_eq!(chunks[1].content.as_deref(), Some(" world"));
        assert!(chunks[2].done);
    }

    #[tokio::test]
    async fn ignores_comments_and_blank_lines() {
        let sse = ": keep-alive\n\n\ndata: {\"choices\":[{\"delta\":{\"content\":\"hi\"}}]}\n\ndata: [DONE]\n\n";
        let response = consume_sse(byte_stream(sse), |_| {}).await.unwrap();
        assert_eq!(response.content, "hi");
    }

    #[tokio::test]
    async fn missing_usage_is_estimated() {
        let sse = "data: {\"choices\":[{\"delta\":{\"content\":\"x\"}}]}\n\ndata: [DONE]\n\n";
        let response = consume_sse(byte_stream(sse), |_| {}).await.unwrap();
        assert!(response.usage.is_estimated);
    }
}
