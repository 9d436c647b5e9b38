use axum::body::{Body, BodyDataStream};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Request body shared between the multipart parser and the drain step.
///
/// The parser reads through [`InboundBody::stream`]. When parsing fails
/// early the caller drains whatever is left so the peer is not left blocked
/// on a half-read request.
#[derive(Clone)]
pub struct InboundBody {
    state: Arc<Mutex<BodyState>>,
}

struct BodyState {
    stream: BodyDataStream,
    finished: bool,
    bytes_read: u64,
}

impl BodyState {
    async fn next_chunk(&mut self) -> Option<Result<Bytes, axum::Error>> {
        if self.finished {
            return None;
        }

        match self.stream.next().await {
            Some(Ok(chunk)) => {
                self.bytes_read += chunk.len() as u64;
                Some(Ok(chunk))
            }
            Some(Err(err)) => {
                self.finished = true;
                Some(Err(err))
            }
            None => {
                self.finished = true;
                None
            }
        }
    }
}

impl InboundBody {
    pub fn new(body: Body) -> Self {
        Self {
            state: Arc::new(Mutex::new(BodyState {
                stream: body.into_data_stream(),
                finished: false,
                bytes_read: 0,
            })),
        }
    }

    /// Byte stream view for the parser. Every clone reads from the same body.
    pub fn stream(&self) -> impl Stream<Item = Result<Bytes, axum::Error>> + Send + 'static {
        futures::stream::unfold(self.state.clone(), |state| async move {
            let chunk = state.lock().await.next_chunk().await;
            chunk.map(|chunk| (chunk, state))
        })
    }

    /// `false` once the body has ended or failed.
    pub async fn is_readable(&self) -> bool {
        !self.state.lock().await.finished
    }

    pub async fn bytes_read(&self) -> u64 {
        self.state.lock().await.bytes_read
    }

    /// Reads and discards the rest of the body. Returns the number of
    /// bytes discarded.
    pub async fn drain(&self) -> u64 {
        let mut state = self.state.lock().await;
        let mut drained = 0u64;

        while let Some(chunk) = state.next_chunk().await {
            match chunk {
                Ok(chunk) => drained += chunk.len() as u64,
                Err(err) => {
                    debug!(error = %err, "request body failed while draining");
                    break;
                }
            }
        }

        drained
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stream_counts_bytes_and_finishes() {
        let inbound = InboundBody::new(Body::from("hello world"));
        let collected: Vec<Bytes> = inbound
            .stream()
            .map(|chunk| chunk.unwrap())
            .collect()
            .await;

        assert_eq!(collected.concat(), b"hello world");
        assert_eq!(inbound.bytes_read().await, 11);
        assert!(!inbound.is_readable().await);
    }

    #[tokio::test]
    async fn test_drain_consumes_remaining_bytes() {
        let inbound = InboundBody::new(Body::from(vec![b'.'; 4096]));
        assert!(inbound.is_readable().await);

        let drained = inbound.drain().await;

        assert_eq!(drained, 4096);
        assert!(!inbound.is_readable().await);
        assert_eq!(inbound.drain().await, 0);
    }

    #[tokio::test]
    async fn test_drain_after_partial_read() {
        let chunks = vec![
            Ok::<_, std::io::Error>(Bytes::from_static(b"abc")),
            Ok(Bytes::from_static(b"defg")),
        ];
        let inbound = InboundBody::new(Body::from_stream(futures::stream::iter(chunks)));

        let mut stream = Box::pin(inbound.stream());
        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(&first[..], b"abc");

        assert_eq!(inbound.drain().await, 4);
        assert_eq!(inbound.bytes_read().await, 7);
        assert!(stream.next().await.is_none());
    }
}
