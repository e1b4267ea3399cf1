// src/core/body.rs

//! Size-capped reading of response bodies.
//!
//! The cap is enforced on the bytes actually received, never on a declared
//! `Content-Length`, so a hostile server cannot push more than `max_bytes`
//! into memory.

use async_trait::async_trait;
use tracing::{debug, warn};

/// A source of body chunks. Implemented for `reqwest::Response`; tests use
/// synthetic streams.
#[async_trait]
pub trait BodyChunks: Send {
    /// Next chunk, `Ok(None)` at end of stream.
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, String>;
}

#[async_trait]
impl BodyChunks for reqwest::Response {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, String> {
        self.chunk()
            .await
            .map(|c| c.map(|bytes| bytes.to_vec()))
            .map_err(|e| e.to_string())
    }
}

/// Reads at most `max_bytes` of `body` and decodes it as UTF-8.
///
/// Never fails: a read error returns what was received so far, and on
/// overflow the last chunk is trimmed, reading stops and the stream is
/// dropped (which releases the connection).
pub async fn read_bounded<B: BodyChunks>(mut body: B, max_bytes: usize) -> String {
    let mut buf: Vec<u8> = Vec::new();

    loop {
        match body.next_chunk().await {
            Ok(Some(chunk)) => {
                let room = max_bytes.saturating_sub(buf.len());
                if chunk.len() > room {
                    buf.extend_from_slice(&chunk[..room]);
                    debug!(max_bytes, "Body exceeded size cap, truncating.");
                    drop(body);
                    return decode_prefix(&buf);
                }
                buf.extend_from_slice(&chunk);
            }
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, received = buf.len(), "Body stream failed, keeping partial content.");
                break;
            }
        }
    }

    decode_prefix(&buf)
}

/// Decodes bytes as UTF-8. A multi-byte sequence cut by truncation at the
/// end is dropped; invalid bytes elsewhere become U+FFFD.
fn decode_prefix(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(e) if e.error_len().is_none() => {
            String::from_utf8_lossy(&bytes[..e.valid_up_to()]).into_owned()
        }
        Err(_) => {
            let end = trailing_incomplete_start(bytes);
            String::from_utf8_lossy(&bytes[..end]).into_owned()
        }
    }
}

// Start index of an incomplete UTF-8 sequence at the very end, or len.
fn trailing_incomplete_start(bytes: &[u8]) -> usize {
    let len = bytes.len();
    for back in 1..=3.min(len) {
        let b = bytes[len - back];
        if b & 0b1100_0000 != 0b1000_0000 {
            let needed = if b >= 0xF0 {
                4
            } else if b >= 0xE0 {
                3
            } else if b >= 0xC0 {
                2
            } else {
                1
            };
            return if needed > back { len - back } else { len };
        }
    }
    len
}
