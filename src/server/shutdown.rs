use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

pub(crate) fn shutdown_signal() -> (ApplyLoopShutdownHandle, ApplyLoopShutdownSignal) {
    let (tx, rx) = oneshot::channel();

    (ApplyLoopShutdownHandle { _tx: tx }, ApplyLoopShutdownSignal { rx })
}

/// Dropping the handle resolves the signal and stops the apply loop.
pub(crate) struct ApplyLoopShutdownHandle {
    _tx: oneshot::Sender<()>,
}

pub(crate) struct ApplyLoopShutdownSignal {
    rx: oneshot::Receiver<()>,
}

impl Future for ApplyLoopShutdownSignal {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let rx = Pin::new(&mut self.rx);

        match rx.poll(cx) {
            Poll::Pending => Poll::Pending,
            // We don't care if oneshot Sender sent value or dropped
            Poll::Ready(_) => Poll::Ready(()),
        }
    }
}
