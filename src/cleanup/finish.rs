use axum::body::Body;
use bytes::Bytes;
use http_body::{Body as HttpBody, Frame, SizeHint};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

/// Sending half of the response-finished signal. Fires at most once, at the
/// latest when dropped.
#[derive(Debug)]
pub struct FinishSignal(Option<oneshot::Sender<()>>);

/// Receiving half; resolves once the response has finished.
#[derive(Debug)]
pub struct Finished(oneshot::Receiver<()>);

pub fn finish_signal() -> (FinishSignal, Finished) {
    let (tx, rx) = oneshot::channel();
    (FinishSignal(Some(tx)), Finished(rx))
}

impl FinishSignal {
    pub fn fire(&mut self) {
        if let Some(tx) = self.0.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for FinishSignal {
    fn drop(&mut self) {
        self.fire();
    }
}

impl Finished {
    pub async fn wait(self) {
        // A dropped sender means the response went away; that is a finish too.
        let _ = self.0.await;
    }
}

/// Response body that fires a [`FinishSignal`] when it has been fully
/// written, has failed, or has been dropped by the server.
pub struct NotifyOnFinish {
    inner: Body,
    signal: FinishSignal,
}

impl NotifyOnFinish {
    pub fn new(inner: Body, signal: FinishSignal) -> Self {
        Self { inner, signal }
    }
}

impl HttpBody for NotifyOnFinish {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        let polled = Pin::new(&mut this.inner).poll_frame(cx);

        if matches!(polled, Poll::Ready(None) | Poll::Ready(Some(Err(_)))) {
            this.signal.fire();
        }

        polled
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}
