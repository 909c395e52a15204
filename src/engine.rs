use crate::config::Config;
use crate::error::{AppResult, InfraError};
use crate::models::types::{ConnectionId, Position};
use crate::models::zone_request::ExpiryTicket;
use crate::net::output::OutputHandle;
use crate::net::protocol::{ClientEvent, ServerMessage};
use crate::services::{Delivery, ExpiryOrder, Hub, Outcome};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, info, warn};

const ENGINE_QUEUE: usize = 256;

/// Everything the engine reacts to. Jobs are processed one at a time, in
/// arrival order, so no two state transitions ever interleave.
#[derive(Debug)]
pub enum EngineJob {
    Connected {
        conn: ConnectionId,
        output: OutputHandle,
    },
    Inbound {
        conn: ConnectionId,
        event: ClientEvent,
    },
    Disconnected {
        conn: ConnectionId,
    },
    DenialExpired {
        participant: ConnectionId,
        ticket: ExpiryTicket,
    },
}

#[derive(Clone, Debug)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineJob>,
}

impl EngineHandle {
    pub async fn connect(&self, output: OutputHandle) -> AppResult<()> {
        self.push(EngineJob::Connected {
            conn: output.conn(),
            output,
        })
        .await
    }

    pub async fn submit(&self, conn: ConnectionId, event: ClientEvent) -> AppResult<()> {
        self.push(EngineJob::Inbound { conn, event }).await
    }

    pub async fn disconnect(&self, conn: ConnectionId) -> AppResult<()> {
        self.push(EngineJob::Disconnected { conn }).await
    }

    async fn push(&self, job: EngineJob) -> AppResult<()> {
        self.tx
            .send(job)
            .await
            .map_err(|_| InfraError::Net("engine stopped".into()))?;
        Ok(())
    }
}

/// One cancellable timer per participant with a fresh denial.
struct ExpiryTasks {
    delay: Duration,
    jobs: mpsc::WeakSender<EngineJob>,
    tasks: HashMap<ConnectionId, (ExpiryTicket, AbortHandle)>,
}

impl ExpiryTasks {
    fn new(delay: Duration, jobs: mpsc::WeakSender<EngineJob>) -> Self {
        Self {
            delay,
            jobs,
            tasks: HashMap::new(),
        }
    }

    fn schedule(&mut self, participant: ConnectionId, ticket: ExpiryTicket) {
        self.cancel(participant);

        let delay = self.delay;
        let jobs = self.jobs.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Engine gone: nothing left to expire.
            if let Some(tx) = jobs.upgrade() {
                let _ = tx.send(EngineJob::DenialExpired { participant, ticket }).await;
            }
        });
        self.tasks.insert(participant, (ticket, task.abort_handle()));
    }

    fn cancel(&mut self, participant: ConnectionId) {
        if let Some((ticket, task)) = self.tasks.remove(&participant) {
            debug!(participant = %participant, %ticket, "denial expiry cancelled");
            task.abort();
        }
    }

    fn cancel_all(&mut self) {
        for (_, (_, task)) in self.tasks.drain() {
            task.abort();
        }
    }

    /// The timer for `ticket` fired; forget it unless a newer one replaced it.
    fn fired(&mut self, participant: ConnectionId, ticket: ExpiryTicket) {
        if self.tasks.get(&participant).is_some_and(|(t, _)| *t == ticket) {
            self.tasks.remove(&participant);
        }
    }

    fn apply(&mut self, order: ExpiryOrder) {
        match order {
            ExpiryOrder::Schedule { participant, ticket } => self.schedule(participant, ticket),
            ExpiryOrder::Cancel(participant) => self.cancel(participant),
            ExpiryOrder::CancelAll => self.cancel_all(),
        }
    }
}

struct Engine {
    hub: Hub,
    outputs: HashMap<ConnectionId, OutputHandle>,
    expiry: ExpiryTasks,
}

impl Engine {
    fn process(&mut self, job: EngineJob) {
        match job {
            EngineJob::Connected { conn, output } => {
                info!(conn = %conn, "connection opened");
                self.outputs.insert(conn, output);
                let out = self.hub.connected(conn);
                self.apply(out);
            }
            EngineJob::Inbound { conn, event } => {
                let result = self.dispatch(conn, event);
                self.settle(conn, result);
            }
            EngineJob::Disconnected { conn } => {
                info!(conn = %conn, "connection closed");
                self.outputs.remove(&conn);
                let result = self.hub.disconnect(conn);
                self.settle(conn, result);
            }
            EngineJob::DenialExpired { participant, ticket } => {
                self.expiry.fired(participant, ticket);
                let result = self.hub.expire_denial(participant, ticket);
                self.settle(participant, result);
            }
        }
    }

    fn dispatch(&mut self, conn: ConnectionId, event: ClientEvent) -> AppResult<Outcome> {
        match event {
            ClientEvent::SubmitWorld(data) => self.hub.submit_world(conn, data),
            ClientEvent::Join(req) => self.hub.join(conn, req),
            ClientEvent::Move { x, y } => self.hub.move_to(conn, Position::new(x, y)),
            ClientEvent::ResolveRequest {
                participant_id,
                zone_id,
                approved,
            } => self.hub.resolve_request(conn, participant_id, zone_id, approved),
        }
    }

    fn settle(&mut self, conn: ConnectionId, result: AppResult<Outcome>) {
        match result {
            Ok(out) => self.apply(out),
            Err(e) if e.is_refusal() => debug!(conn = %conn, reason = %e, "event ignored"),
            Err(e) => warn!(conn = %conn, error = %e, "event failed"),
        }
    }

    fn apply(&mut self, out: Outcome) {
        for order in out.expiry {
            self.expiry.apply(order);
        }

        for delivery in out.deliveries {
            match delivery {
                Delivery::Broadcast(notice) => {
                    let msg = Arc::new(ServerMessage::from(notice));
                    self.outputs.retain(|conn, output| {
                        let open = output.send(msg.clone());
                        if !open {
                            debug!(conn = %conn, "dropping output");
                        }
                        open
                    });
                }
                Delivery::Direct(conn, notice) => {
                    let msg = Arc::new(ServerMessage::from(notice));
                    let open = self.outputs.get(&conn).is_some_and(|output| output.send(msg));
                    if !open && self.outputs.remove(&conn).is_some() {
                        debug!(conn = %conn, "dropping output");
                    }
                }
            }
        }
    }
}

/// Spawns the session engine. It runs until every [`EngineHandle`] is dropped.
pub fn start_engine(cfg: &Config) -> (EngineHandle, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel::<EngineJob>(ENGINE_QUEUE);

    let mut engine = Engine {
        hub: Hub::new(),
        outputs: HashMap::new(),
        expiry: ExpiryTasks::new(cfg.denial_expiry(), tx.downgrade()),
    };
    info!(denial_expiry = ?cfg.denial_expiry(), "session engine started");

    let jh = tokio::spawn(async move {
        while let Some(job) = rx.recv().await {
            engine.process(job);
        }
        engine.expiry.cancel_all();
        info!("session engine stopped");
    });

    (EngineHandle { tx }, jh)
}
