use std::pin::Pin;
use std::task::{Context, Poll};
use futures::Stream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// # ItemStream
///
/// An asynchronous stream wrapper around a Tokio unbounded channel receiver.
///
/// `ItemStream` implements the `Stream` trait from the `futures` crate,
/// allowing it to be used with stream combinators and async iteration.
///
/// ## Implementation Details
///
/// The stream is backed by a Tokio unbounded channel receiver, which means:
/// - It will return `None` when the producing task finishes and drops its sender
/// - It has no backpressure mechanism; the producer may run ahead of the consumer
///
/// The stream owns the producing task, and aborts it when dropped so that an
/// abandoned epoch stops collating batches.
pub struct ItemStream<T> {
    /// The underlying channel receiver
    receiver: mpsc::UnboundedReceiver<T>,

    /// The task feeding `receiver`
    producer: Option<JoinHandle<()>>,
}

impl<T> ItemStream<T> {
    /// Creates a new `ItemStream` from a channel receiver and the task that feeds it.
    pub fn new(receiver: mpsc::UnboundedReceiver<T>, producer: JoinHandle<()>) -> Self {
        Self {
            receiver,
            producer: Some(producer),
        }
    }
}

impl<T> Stream for ItemStream<T> {
    type Item = T;
    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.get_mut().receiver).poll_recv(cx)
    }
}

impl<T> Drop for ItemStream<T> {
    fn drop(&mut self) {
        if let Some(handle) = self.producer.take() {
            handle.abort();
        }
    }
}
