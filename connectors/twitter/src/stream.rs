//! Twitter filtered stream reader.
//!
//! The stream endpoint answers with one JSON object per line over a single
//! long-lived response, separated by `\r\n` keep-alives while idle. Objects
//! are decoded as soon as their line is complete; the body is never buffered
//! as a whole.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::{Buf, Bytes, BytesMut};
use futures_util::stream::{BoxStream, Stream};
use pin_project_lite::pin_project;
use serde::Deserialize;
use tracing::{debug, info, trace};

use crate::{
    client::TwitterApiClient,
    error::{TwitterError, TwitterResult},
    event::StreamEvent,
    types::{StreamTweet, TwitterApiError},
};

/// Opens filtered stream connections.
#[derive(Debug, Clone)]
pub struct FilteredStream {
    client: Arc<TwitterApiClient>,
    max_line_bytes: usize,
}

impl FilteredStream {
    #[must_use]
    pub const fn new(client: Arc<TwitterApiClient>, max_line_bytes: usize) -> Self {
        Self {
            client,
            max_line_bytes,
        }
    }

    /// Connect and return the lazy event sequence.
    ///
    /// Fails with [`TwitterError::Stream`] when the server answers anything
    /// but 200. Each call opens a fresh connection.
    pub async fn open(&self, params: &[(String, String)]) -> TwitterResult<EventStream> {
        let response = self.client.connect_stream(params).await?;
        info!("Filtered stream connected");

        Ok(EventStream::new(
            Box::pin(response.bytes_stream()),
            self.max_line_bytes,
        ))
    }
}

/// Stream-level error object, sent instead of a tweet before a disconnect.
#[derive(Debug, Deserialize)]
struct StreamErrorObject {
    errors: Vec<TwitterApiError>,
}

/// Splits the byte stream into lines and decodes one event per line.
#[derive(Debug)]
struct LineDecoder {
    buffer: BytesMut,
    /// Bytes of `buffer` already known to contain no newline.
    scanned: usize,
    max_line_bytes: usize,
}

impl LineDecoder {
    fn new(max_line_bytes: usize) -> Self {
        Self {
            buffer: BytesMut::new(),
            scanned: 0,
            max_line_bytes,
        }
    }

    fn push(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    fn check_len(&self, size: usize) -> TwitterResult<()> {
        if size > self.max_line_bytes {
            return Err(TwitterError::BufferOverflow {
                size,
                limit: self.max_line_bytes,
            });
        }
        Ok(())
    }

    /// Next complete event in the buffer, skipping keep-alive lines.
    fn next_event(&mut self) -> Option<TwitterResult<StreamEvent>> {
        loop {
            let newline = self.buffer[self.scanned..].iter().position(|&b| b == b'\n');
            let Some(offset) = newline else {
                self.scanned = self.buffer.len();
                return self.check_len(self.buffer.len()).err().map(Err);
            };

            let line = self.buffer.split_to(self.scanned + offset);
            self.buffer.advance(1);
            self.scanned = 0;

            if let Err(e) = self.check_len(line.len()) {
                return Some(Err(e));
            }
            if let Some(result) = decode_line(&line) {
                return Some(result);
            }
            trace!("Keep-alive");
        }
    }

    /// Decode whatever is left once the connection has closed.
    fn finish(&mut self) -> Option<TwitterResult<StreamEvent>> {
        let rest = self.buffer.split();
        self.scanned = 0;
        if let Err(e) = self.check_len(rest.len()) {
            return Some(Err(e));
        }
        decode_line(&rest)
    }
}

/// `None` for blank lines. Invalid UTF-8 is a decode error.
fn decode_line(line: &[u8]) -> Option<TwitterResult<StreamEvent>> {
    let line = line.trim_ascii();
    if line.is_empty() {
        return None;
    }

    Some(match serde_json::from_slice::<StreamTweet>(line) {
        Ok(tweet) => {
            debug!(tweet_id = %tweet.data.id, "Received stream tweet");
            Ok(StreamEvent::from(tweet))
        }
        Err(source) => match serde_json::from_slice::<StreamErrorObject>(line) {
            Ok(object) if !object.errors.is_empty() => Err(TwitterError::Stream(
                object
                    .errors
                    .iter()
                    .map(TwitterApiError::message)
                    .collect::<Vec<_>>()
                    .join("; "),
            )),
            _ => Err(TwitterError::Decode {
                source,
                line: String::from_utf8_lossy(line).into_owned(),
            }),
        },
    })
}

pin_project! {
    /// Lazy, unbounded sequence of stream events in wire order.
    ///
    /// Ends with `None` when the server closes the connection cleanly. The
    /// first error (transport, decode or stream error object) is yielded once
    /// and the sequence is then finished.
    pub struct EventStream {
        #[pin]
        inner: BoxStream<'static, Result<Bytes, reqwest::Error>>,
        decoder: LineDecoder,
        done: bool,
    }
}

impl EventStream {
    /// Wrap any chunked byte source.
    pub fn new(
        inner: BoxStream<'static, Result<Bytes, reqwest::Error>>,
        max_line_bytes: usize,
    ) -> Self {
        Self {
            inner,
            decoder: LineDecoder::new(max_line_bytes),
            done: false,
        }
    }
}

impl Stream for EventStream {
    type Item = TwitterResult<StreamEvent>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        if *this.done {
            return Poll::Ready(None);
        }

        loop {
            if let Some(result) = this.decoder.next_event() {
                if result.is_err() {
                    *this.done = true;
                }
                return Poll::Ready(Some(result));
            }

            match this.inner.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(chunk))) => this.decoder.push(&chunk),
                Poll::Ready(Some(Err(e))) => {
                    *this.done = true;
                    return Poll::Ready(Some(Err(TwitterError::Stream(format!(
                        "connection failed mid-read: {e}"
                    )))));
                }
                Poll::Ready(None) => {
                    *this.done = true;
                    return Poll::Ready(this.decoder.finish());
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
