//! Byte stream framing
//!
//! Providers stream either Server-Sent Events (`data: {...}` lines) or
//! newline-delimited JSON. Network chunks can split a line, or a multi-byte
//! character, anywhere, so bytes are buffered until a full line is seen.

use assistant_core::{AgentError, Result};
use futures::Stream;

use crate::error::ProviderError;

/// Accumulates raw bytes and hands out complete lines
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a chunk and return every line it completes, without terminators
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            let text = String::from_utf8_lossy(&line);
            lines.push(text.trim_end_matches(['\n', '\r']).to_string());
        }
        lines
    }

    /// Trailing data left when the transport closed without a newline
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.buf);
        let text = String::from_utf8_lossy(&rest).trim().to_string();
        (!text.is_empty()).then_some(text)
    }
}

/// Split a byte stream into lines
pub fn lines<S, B, E>(bytes: S) -> impl Stream<Item = Result<String>> + Send
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send,
    E: Into<ProviderError> + Send,
{
    async_stream::try_stream! {
        let mut buffer = LineBuffer::new();
        for await chunk in bytes {
            let chunk = chunk.map_err(|e| {
                let e: ProviderError = e.into();
                AgentError::from(e)
            })?;
            for line in buffer.push(chunk.as_ref()) {
                yield line;
            }
        }
        if let Some(line) = buffer.finish() {
            yield line;
        }
    }
}

/// Payloads of SSE `data:` lines. Stops at `[DONE]`; comments, event names
/// and blank keep-alive lines are skipped.
pub fn sse_data<S>(lines: S) -> impl Stream<Item = Result<String>> + Send
where
    S: Stream<Item = Result<String>> + Send + 'static,
{
    async_stream::try_stream! {
        for await line in lines {
            let line = line?;
            let Some(data) = line.strip_prefix("data:") else {
                continue;
            };
            let data = data.trim();
            if data == "[DONE]" {
                break;
            }
            if !data.is_empty() {
                yield data.to_string();
            }
        }
    }
}

/// SSE payloads of an HTTP response body
pub fn sse_events(response: reqwest::Response) -> impl Stream<Item = Result<String>> + Send {
    sse_data(lines(response.bytes_stream()))
}

/// Non-empty NDJSON lines of an HTTP response body
pub fn ndjson_lines(response: reqwest::Response) -> impl Stream<Item = Result<String>> + Send {
    let lines = lines(response.bytes_stream());
    async_stream::try_stream! {
        for await line in lines {
            let line = line?;
            if !line.trim().is_empty() {
                yield line;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::{StreamExt, stream};

    fn chunks(parts: &[&[u8]]) -> impl Stream<Item = std::result::Result<Vec<u8>, ProviderError>> + Send + 'static {
        let owned: Vec<_> = parts.iter().map(|p| Ok(p.to_vec())).collect();
        stream::iter(owned)
    }

    #[test]
    fn test_line_buffer_split_across_pushes() {
        let mut buf = LineBuffer::new();
        assert!(buf.push(b"data: {\"a\"").is_empty());
        assert_eq!(buf.push(b":1}\r\ndata: x\n"), vec!["data: {\"a\":1}", "data: x"]);
        assert_eq!(buf.finish(), None);
    }

    #[test]
    fn test_line_buffer_keeps_split_utf8_intact() {
        let text = "pod ✓ ready\n".as_bytes();
        let mut buf = LineBuffer::new();
        assert!(buf.push(&text[..5]).is_empty());
        assert_eq!(buf.push(&text[5..]), vec!["pod ✓ ready"]);
    }

    #[tokio::test]
    async fn test_sse_data_handles_chunk_boundaries() {
        let body = chunks(&[
            b": keep-alive\n\nda",
            b"ta: {\"n\":1}\n",
            b"\nevent: ping\ndata: {\"n\":2}",
            b"\n\ndata: [DONE]\n\ndata: {\"n\":3}\n",
        ]);
        let payloads: Vec<_> = sse_data(lines(body)).collect().await;
        let payloads: Vec<String> = payloads.into_iter().map(|p| p.unwrap()).collect();
        assert_eq!(payloads, vec!["{\"n\":1}", "{\"n\":2}"]);
    }

    #[tokio::test]
    async fn test_trailing_line_without_newline() {
        let body = chunks(&[b"{\"done\":false}\n{\"done\":", b"true}"]);
        let got: Vec<_> = lines(body).collect().await;
        let got: Vec<String> = got.into_iter().map(|l| l.unwrap()).collect();
        assert_eq!(got, vec!["{\"done\":false}", "{\"done\":true}"]);
    }

    #[tokio::test]
    async fn test_transport_error_surfaces_as_provider_error() {
        let body = stream::iter(vec![
            Ok(b"data: {}\n".to_vec()),
            Err(ProviderError::Decode("reset".into())),
        ]);
        let got: Vec<_> = lines(body).collect().await;
        assert!(got[0].is_ok());
        assert!(matches!(got[1], Err(AgentError::Provider(_))));
    }
}
