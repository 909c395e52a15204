use crate::models::types::ConnectionId;
use crate::net::protocol::ServerMessage;
use crate::net::sink::ClientSink;
use crate::net::sink::websocket::WebSocketSink;
use axum::extract::ws::{Message, WebSocket};
use futures::stream::SplitSink;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

/// Slots kept free for frames that are never re-sent (welcome, world, session end).
const ONE_SHOT_HEADROOM: usize = 2;

pub enum OutEvent {
    /// A complete server frame with sequence number
    Frame(Arc<ServerMessage>, u64),
}

/// Write side of one connection, held by the engine.
#[derive(Clone, Debug)]
pub struct OutputHandle {
    conn: ConnectionId,
    /// Sender for output events
    tx: mpsc::Sender<OutEvent>,
    /// Next sequence number for output frames
    next_seq: Arc<AtomicU64>,
    /// Free slots below which snapshots are skipped
    headroom: usize,
}

impl OutputHandle {
    pub fn new(conn: ConnectionId, tx: mpsc::Sender<OutEvent>) -> Self {
        let headroom = ONE_SHOT_HEADROOM.min(tx.max_capacity().saturating_sub(1));
        Self {
            conn,
            tx,
            next_seq: Arc::new(AtomicU64::new(1)),
            headroom,
        }
    }

    pub fn conn(&self) -> ConnectionId {
        self.conn
    }

    #[inline]
    pub fn next_seq(&self) -> u64 {
        self.next_seq.fetch_add(1, Ordering::Relaxed)
    }

    /// Queues a frame without waiting. Returns `false` when the connection
    /// must be dropped: it is closed, or a frame that is never re-sent found
    /// no room.
    ///
    /// Snapshots are skipped once the queue is down to its headroom; the next
    /// one catches a slow reader up.
    pub fn send(&self, msg: Arc<ServerMessage>) -> bool {
        if self.tx.is_closed() {
            return false;
        }
        if msg.is_droppable() && self.tx.capacity() <= self.headroom {
            warn!(conn = %self.conn, kind = msg.kind(), "output buffer full, snapshot skipped");
            return true;
        }

        match self.tx.try_send(OutEvent::Frame(msg, self.next_seq())) {
            Ok(()) => true,
            Err(TrySendError::Full(OutEvent::Frame(msg, seq))) => {
                warn!(conn = %self.conn, seq, kind = msg.kind(), "output buffer full, evicting connection");
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

pub struct SessionOut {
    rx: mpsc::Receiver<OutEvent>,
}

impl SessionOut {
    pub fn new(rx: mpsc::Receiver<OutEvent>) -> Self {
        Self { rx }
    }

    pub async fn run<C>(mut self, mut client: C) -> anyhow::Result<()>
    where
        C: ClientSink,
    {
        while let Some(event) = self.rx.recv().await {
            match event {
                OutEvent::Frame(frame, seq_nr) => client.send_frame(&frame, seq_nr).await?,
            }
        }

        // Every handle is gone: the engine dropped this connection.
        client.close().await
    }

    /// Next queued frame; used where no sink task drains the queue.
    pub async fn recv(&mut self) -> Option<(Arc<ServerMessage>, u64)> {
        match self.rx.recv().await? {
            OutEvent::Frame(frame, seq) => Some((frame, seq)),
        }
    }
}

pub fn channel(conn: ConnectionId, buffer: usize) -> (OutputHandle, SessionOut) {
    let (tx, rx) = mpsc::channel::<OutEvent>(buffer.max(1));
    (OutputHandle::new(conn, tx), SessionOut::new(rx))
}

pub fn init_output_for_websocket(
    conn: ConnectionId,
    buffer: usize,
    websocket_writer: SplitSink<WebSocket, Message>,
) -> OutputHandle {
    let (output_handle, session_out) = channel(conn, buffer);
    let sink = WebSocketSink::new(websocket_writer);

    tokio::spawn(async move {
        if let Err(e) = session_out.run(sink).await {
            debug!(conn = %conn, error = %e, "session output closed");
        }
    });

    output_handle
}
