//! Newline-delimited framing over HTTP byte streams

use bytes::Bytes;
use futures_util::stream::{self, BoxStream, Stream};
use futures_util::StreamExt;
use std::pin::Pin;

use crate::error::{Error, Result};

struct LineState<S> {
    inner: Pin<Box<S>>,
    buffer: Vec<u8>,
    finished: bool,
}

/// Re-frame a byte stream into lines, independent of how the body was chunked
///
/// Line terminators (`\n` or `\r\n`) are stripped. A final line without a
/// terminator is still emitted. The stream ends after the first error.
pub(crate) fn byte_lines<S, E>(bytes: S) -> BoxStream<'static, Result<String>>
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Send + 'static,
    E: Into<Error> + Send + 'static,
{
    let state = LineState {
        inner: Box::pin(bytes),
        buffer: Vec::new(),
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(pos) = state.buffer.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = state.buffer.drain(..=pos).collect();
                return Some((Ok(decode_line(&line)), state));
            }

            if state.finished {
                if state.buffer.is_empty() {
                    return None;
                }
                let rest = std::mem::take(&mut state.buffer);
                return Some((Ok(decode_line(&rest)), state));
            }

            match state.inner.next().await {
                Some(Ok(chunk)) => state.buffer.extend_from_slice(&chunk),
                Some(Err(e)) => {
                    state.finished = true;
                    state.buffer.clear();
                    return Some((Err(e.into()), state));
                }
                None => state.finished = true,
            }
        }
    })
    .boxed()
}

fn decode_line(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw)
        .trim_end_matches(&['\r', '\n'][..])
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunks(parts: &[&'static str]) -> Vec<std::result::Result<Bytes, std::io::Error>> {
        parts.iter().map(|p| Ok(Bytes::from_static(p.as_bytes()))).collect()
    }

    #[tokio::test]
    async fn test_lines_split_across_chunks() {
        let input = stream::iter(chunks(&["{\"a\":1}\n{\"b\"", ":2}\r\n\ntail"]));
        let lines: Vec<String> = byte_lines(input)
            .map(|line| line.unwrap())
            .collect()
            .await;

        assert_eq!(lines, vec!["{\"a\":1}", "{\"b\":2}", "", "tail"]);
    }

    #[tokio::test]
    async fn test_stops_after_error() {
        let input = stream::iter(vec![
            Ok(Bytes::from_static(b"first\npartial")),
            Err(std::io::Error::new(std::io::ErrorKind::Other, "reset")),
            Ok(Bytes::from_static(b"never\n")),
        ]);
        let results: Vec<Result<String>> = byte_lines(input).collect().await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].as_ref().unwrap(), "first");
        assert!(matches!(results[1], Err(Error::Io(_))));
    }
}
