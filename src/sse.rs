//! Decoding of streamed chat responses.
//!
//! The backend answers `/chat` and `/edit` with a body of `data: <json>` lines
//! separated by blank lines.  [`process_sse`] turns the raw byte stream of such
//! a response into a stream of [`StreamRecord`]s.

use bytes::{Bytes, BytesMut};
use futures::stream::{self, Stream, StreamExt};
use tokio_util::codec::{Decoder, LinesCodec};

use crate::observability::{STREAM_BYTES, STREAM_ERRORS, STREAM_RECORDS};
use crate::{Error, Result, StreamRecord};

struct RecordDecoder<S> {
    stream: S,
    buffer: BytesMut,
    codec: LinesCodec,
    finished: bool,
}

/// Process a stream of bytes into a stream of records.
///
/// Lines are only decoded once complete, so a record or a multi-byte
/// character split across network chunks is reassembled.  Blank lines and
/// lines without a `data:` prefix are skipped.  A malformed record yields an
/// error item and decoding continues with the next line.
///
/// ```
/// use bytes::Bytes;
/// use futures::StreamExt;
/// use luna::sse::process_sse;
///
/// # tokio_test::block_on(async {
/// let chunks = vec![
///     Ok::<_, reqwest::Error>(Bytes::from_static(b"data: {\"chunk\":\"Hel")),
///     Ok(Bytes::from_static(b"lo\"}\n\n")),
/// ];
/// let records: Vec<_> = process_sse(futures::stream::iter(chunks)).collect().await;
/// assert_eq!(records.len(), 1);
/// assert_eq!(records[0].as_ref().unwrap().text(), Some("Hello"));
/// # });
/// ```
pub fn process_sse<S>(byte_stream: S) -> impl Stream<Item = Result<StreamRecord>>
where
    S: Stream<Item = std::result::Result<Bytes, reqwest::Error>> + Unpin + 'static,
{
    let stream = byte_stream.map(|result| {
        result
            .map_err(|e| Error::streaming(format!("Error in HTTP stream: {e}"), Some(Box::new(e))))
    });
    let state = RecordDecoder {
        stream,
        buffer: BytesMut::new(),
        codec: LinesCodec::new(),
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            let line = if state.finished {
                state.codec.decode_eof(&mut state.buffer)
            } else {
                state.codec.decode(&mut state.buffer)
            };
            match line {
                Ok(Some(line)) => {
                    if let Some(record) = parse_line(&line) {
                        return Some((record, state));
                    }
                    continue;
                }
                Ok(None) if state.finished => return None,
                Ok(None) => {}
                Err(e) => {
                    // The codec has already consumed the bad line.
                    STREAM_ERRORS.click();
                    return Some((
                        Err(Error::encoding(
                            format!("Invalid line in stream: {e}"),
                            Some(Box::new(e)),
                        )),
                        state,
                    ));
                }
            }

            match state.stream.next().await {
                Some(Ok(bytes)) => {
                    STREAM_BYTES.count(bytes.len() as u64);
                    state.buffer.extend_from_slice(&bytes);
                }
                Some(Err(e)) => {
                    STREAM_ERRORS.click();
                    return Some((Err(e), state));
                }
                None => state.finished = true,
            }
        }
    })
}

/// Parse one line of the body.  Returns `None` for lines that carry no record.
fn parse_line(line: &str) -> Option<Result<StreamRecord>> {
    let payload = line.strip_prefix("data:")?.trim();
    if payload.is_empty() {
        return None;
    }
    match serde_json::from_str::<StreamRecord>(payload) {
        Ok(record) => {
            STREAM_RECORDS.click();
            Some(Ok(record))
        }
        Err(e) => {
            STREAM_ERRORS.click();
            Some(Err(Error::serialization(
                format!("Malformed stream record '{payload}': {e}"),
                Some(Box::new(e)),
            )))
        }
    }
}
