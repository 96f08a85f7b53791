//! One streaming chat request, end to end.
//!
//! [`StreamReassembler::run`] opens the transport, then spawns a task that
//! reads the body, feeds the [`Reassembler`], and pushes snapshots into a
//! bounded channel. The caller consumes them through a [`SnapshotStream`].
//!
//! Exit paths:
//! - end of stream → one `Complete` snapshot
//! - cancellation → one `Complete` snapshot of what was accumulated
//! - transport failure → one `Err`, no completion snapshot
//!
//! The response body is released on every path before the terminal item is
//! sent.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, ready};

use crownwell_core::error::TransportError;
use crownwell_core::message::ChatMessage;
use crownwell_core::model::SupportedModel;
use crownwell_core::snapshot::{Snapshot, SnapshotStatus};
use crownwell_core::transport::{ChatRequest, ChatTransport, ResponseBody};
use futures::Stream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::reassembler::Reassembler;

const DEFAULT_CHANNEL_CAPACITY: usize = 64;

type Item = Result<Snapshot, TransportError>;

/// What travels from the producer to the consumer. The last envelope of a
/// request carries the terminal state the producer actually reached.
#[derive(Debug)]
pub struct Envelope {
    pub item: Item,
    pub terminal: Option<RequestState>,
}

impl Envelope {
    fn running(snapshot: Snapshot) -> Self {
        Self {
            item: Ok(snapshot),
            terminal: None,
        }
    }

    fn terminal(item: Item, state: RequestState) -> Self {
        Self {
            item,
            terminal: Some(state),
        }
    }
}

/// Lifecycle of a single request: `Idle → Streaming → {Completed | Cancelled | Failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Idle,
    Streaming,
    Completed,
    Cancelled,
    Failed,
}

impl RequestState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }
}

/// Drives chat requests over a transport.
pub struct StreamReassembler {
    transport: Arc<dyn ChatTransport>,
    channel_capacity: usize,
}

impl StreamReassembler {
    pub fn new(transport: Arc<dyn ChatTransport>) -> Self {
        Self {
            transport,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    /// Bound the number of snapshots buffered ahead of a slow consumer.
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    /// Start a request.
    ///
    /// Errors from opening the transport (non-success status, unreachable
    /// backend) are returned here and no snapshot is ever produced.
    /// Cancelling while the request is still being opened yields a stream
    /// holding a single empty `Complete` snapshot.
    pub async fn run(
        &self,
        history: &[ChatMessage],
        model: SupportedModel,
        cancel: CancellationToken,
    ) -> Result<SnapshotStream, TransportError> {
        let request = ChatRequest::from_history(history, model);
        let (tx, rx) = mpsc::channel(self.channel_capacity);

        let opened = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            opened = self.transport.open(request) => Some(opened?),
        };

        let Some(mut body) = opened else {
            info!(transport = self.transport.name(), "Chat request cancelled before streaming began");
            let _ = tx.try_send(Envelope::terminal(
                Ok(Snapshot::build("", &[], SnapshotStatus::Complete)),
                RequestState::Cancelled,
            ));
            return Ok(SnapshotStream::new(rx, cancel));
        };

        let transport = self.transport.name().to_string();
        let task_cancel = cancel.clone();
        tokio::spawn(async move {
            let state = drive(body.as_mut(), &tx, &task_cancel).await;
            info!(%transport, ?state, "Chat request finished");
        });

        Ok(SnapshotStream::new(rx, cancel))
    }
}

enum Exit {
    EndOfStream,
    Cancelled,
    ConsumerGone,
    Failed(TransportError),
}

/// Read `body` to a terminal state, sending snapshots on `tx`.
///
/// Cancellation is observed at each chunk read and at each send to a full
/// channel. A dropped receiver is treated like cancellation. Returns the
/// terminal state reached, which is also attached to the last envelope.
pub async fn drive(
    body: &mut dyn ResponseBody,
    tx: &mpsc::Sender<Envelope>,
    cancel: &CancellationToken,
) -> RequestState {
    let mut reassembler = Reassembler::new();
    let exit = pump(&mut reassembler, body, tx, cancel).await;

    if let Err(e) = body.release() {
        debug!(error = %e, "Response body already released");
    }

    match exit {
        Exit::EndOfStream => {
            let complete = reassembler.snapshot(SnapshotStatus::Complete);
            let _ = tx
                .send(Envelope::terminal(Ok(complete), RequestState::Completed))
                .await;
            RequestState::Completed
        }
        Exit::Cancelled => {
            debug!("Stream cancelled by caller");
            let complete = reassembler.snapshot(SnapshotStatus::Complete);
            let _ = tx
                .send(Envelope::terminal(Ok(complete), RequestState::Cancelled))
                .await;
            RequestState::Cancelled
        }
        Exit::ConsumerGone => {
            debug!("Snapshot receiver dropped; stopping stream");
            RequestState::Cancelled
        }
        Exit::Failed(e) => {
            warn!(error = %e, "Chat stream failed");
            let _ = tx.send(Envelope::terminal(Err(e), RequestState::Failed)).await;
            RequestState::Failed
        }
    }
}

/// Hand one running snapshot to the consumer, giving up if the request is
/// cancelled while the channel is full.
async fn forward(
    tx: &mpsc::Sender<Envelope>,
    cancel: &CancellationToken,
    snapshot: Snapshot,
) -> Result<(), Exit> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Exit::Cancelled),
        sent = tx.send(Envelope::running(snapshot)) => sent.map_err(|_| Exit::ConsumerGone),
    }
}

async fn pump(
    reassembler: &mut Reassembler,
    body: &mut dyn ResponseBody,
    tx: &mpsc::Sender<Envelope>,
    cancel: &CancellationToken,
) -> Exit {
    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Exit::Cancelled,
            next = body.next_chunk() => next,
        };

        let snapshots = match next {
            Some(Ok(bytes)) => reassembler.push_chunk(&bytes),
            Some(Err(e)) => return Exit::Failed(e),
            None => {
                for snapshot in reassembler.finish() {
                    if let Err(exit) = forward(tx, cancel, snapshot).await {
                        return exit;
                    }
                }
                return Exit::EndOfStream;
            }
        };

        for snapshot in snapshots {
            if let Err(exit) = forward(tx, cancel, snapshot).await {
                return exit;
            }
        }
    }
}

/// The consumer side of a request.
///
/// Yields running snapshots, then exactly one terminal item: a `Complete`
/// snapshot or an error. Nothing is yielded after the terminal item.
pub struct SnapshotStream {
    rx: mpsc::Receiver<Envelope>,
    cancel: CancellationToken,
    state: RequestState,
}

impl SnapshotStream {
    fn new(rx: mpsc::Receiver<Envelope>, cancel: CancellationToken) -> Self {
        Self {
            rx,
            cancel,
            state: RequestState::Idle,
        }
    }

    /// Where the request is in its lifecycle, as observed by the consumer.
    pub fn state(&self) -> RequestState {
        self.state
    }

    /// Ask the producer to stop. The final `Complete` snapshot still arrives.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Receive the next item.
    pub async fn recv(&mut self) -> Option<Item> {
        if self.state.is_terminal() {
            return None;
        }
        let envelope = self.rx.recv().await;
        self.observe(envelope.as_ref());
        envelope.map(|e| e.item)
    }

    /// Drain the stream and return the terminal snapshot.
    pub async fn final_snapshot(mut self) -> Result<Snapshot, TransportError> {
        let mut last = None;
        while let Some(item) = self.recv().await {
            last = Some(item?);
        }
        last.filter(Snapshot::is_complete).ok_or_else(|| {
            TransportError::StreamInterrupted("stream ended without a completion snapshot".into())
        })
    }

    fn observe(&mut self, envelope: Option<&Envelope>) {
        self.state = match envelope {
            Some(Envelope {
                terminal: Some(state),
                ..
            }) => *state,
            Some(_) => RequestState::Streaming,
            // Producer vanished without a terminal item.
            None => RequestState::Failed,
        };
    }
}

impl Stream for SnapshotStream {
    type Item = Item;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.state.is_terminal() {
            return Poll::Ready(None);
        }
        let envelope = ready!(self.rx.poll_recv(cx));
        self.observe(envelope.as_ref());
        Poll::Ready(envelope.map(|e| e.item))
    }
}
