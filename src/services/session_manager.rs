use crate::error::{AppResult, DomainError};
use crate::models::participant::{JoinRequest, Participant, Role};
use crate::models::types::{ConnectionId, Position, ZoneId};
use crate::models::world::{World, WorldData};
use crate::models::zone_request::{ExpiryTicket, ZoneRequest};
use crate::services::broadcaster::{StateSnapshot, snapshot};
use crate::services::zone_access::{self, MoveOutcome, Resolution};
use crate::state::session::Session;
use tracing::{debug, info};

/// What connections are told. The transport decides how it is framed.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    /// Identity of a freshly opened connection
    Welcome(ConnectionId),
    World(WorldData),
    State(StateSnapshot),
    Ended { reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    /// Every open connection
    Broadcast(Notice),
    /// A single connection
    Direct(ConnectionId, Notice),
}

/// Bookkeeping for the denial-expiry task table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryOrder {
    Schedule {
        participant: ConnectionId,
        ticket: ExpiryTicket,
    },
    Cancel(ConnectionId),
    CancelAll,
}

/// Side effects of one processed event, applied by the event loop in order.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Outcome {
    pub deliveries: Vec<Delivery>,
    pub expiry: Vec<ExpiryOrder>,
}

impl Outcome {
    fn broadcast(msg: Notice) -> Self {
        Self {
            deliveries: vec![Delivery::Broadcast(msg)],
            expiry: Vec::new(),
        }
    }

    fn state(session: &Session) -> Self {
        Self::broadcast(Notice::State(snapshot(session)))
    }

    fn direct(&mut self, conn: ConnectionId, msg: Notice) {
        self.deliveries.push(Delivery::Direct(conn, msg));
    }

    /// A denial that was just replaced or cleared must not fire later.
    fn cancel_stale(&mut self, id: ConnectionId, prev: Option<ZoneRequest>) {
        if prev.is_some_and(|r| r.ticket.is_some()) {
            self.expiry.push(ExpiryOrder::Cancel(id));
        }
    }

    pub fn is_empty(&self) -> bool {
        self.deliveries.is_empty() && self.expiry.is_empty()
    }
}

/// Owner of the (at most one) active session.
///
/// All methods are synchronous and run to completion; the caller serializes
/// calls. A refused action returns an error and leaves every piece of state
/// untouched.
#[derive(Debug, Default)]
pub struct Hub {
    session: Option<Session>,
}

impl Hub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// A connection opened: tell it who it is, and hand it the world if one exists.
    pub fn connected(&self, conn: ConnectionId) -> Outcome {
        let mut out = Outcome::default();
        out.direct(conn, Notice::Welcome(conn));
        if let Some(session) = &self.session {
            out.direct(conn, Notice::World(session.world().data().clone()));
        }
        out
    }

    pub fn submit_world(&mut self, conn: ConnectionId, data: WorldData) -> AppResult<Outcome> {
        if self.session.is_some() {
            return Err(DomainError::UnauthorizedAction("a session is already active"));
        }

        let world = World::new(data)?;
        info!(host = %conn, rows = world.rows(), cols = world.cols(), "session created");

        let session = Session::new(conn, world);
        let mut out = Outcome::broadcast(Notice::World(session.world().data().clone()));
        out.deliveries.push(Delivery::Broadcast(Notice::State(snapshot(&session))));
        self.session = Some(session);

        Ok(out)
    }

    pub fn join(&mut self, conn: ConnectionId, req: JoinRequest) -> AppResult<Outcome> {
        let session = self.session.as_mut().ok_or(DomainError::NoActiveSession)?;
        let role = if session.authorizes_host(conn) { Role::Host } else { Role::User };

        let (world, players, requests) = session.parts_mut();
        let participant = Participant::spawn(conn, req.into(), role, world);
        debug!(
            conn = %conn,
            name = %participant.appearance().name,
            ?role,
            at = %participant.position(),
            "participant joined"
        );
        if players.insert(participant).is_some() {
            debug!(conn = %conn, "participant re-spawned");
        }
        let cleared = requests.clear(&conn);

        let mut out = Outcome::state(session);
        out.cancel_stale(conn, cleared);
        Ok(out)
    }

    pub fn move_to(&mut self, conn: ConnectionId, target: Position) -> AppResult<Outcome> {
        let session = self.session.as_mut().ok_or(DomainError::NoActiveSession)?;
        let moved = zone_access::attempt_move(session, conn, target)?;

        let mut out = Outcome::state(session);
        match moved {
            MoveOutcome::Committed { zone, cleared } => {
                debug!(conn = %conn, %zone, at = %target, "move committed");
                out.cancel_stale(conn, cleared);
            }
            MoveOutcome::RequestOpened { zone, superseded } => {
                debug!(
                    conn = %conn,
                    %zone,
                    access = ?zone_access::access_state(session, conn),
                    "zone request opened"
                );
                out.cancel_stale(conn, superseded);
            }
        }
        Ok(out)
    }

    pub fn resolve_request(
        &mut self,
        conn: ConnectionId,
        participant: ConnectionId,
        zone: ZoneId,
        approved: bool,
    ) -> AppResult<Outcome> {
        let session = self.session.as_mut().ok_or(DomainError::NoActiveSession)?;
        let resolution = zone_access::resolve_request(session, conn, participant, zone, approved)?;

        let mut out = Outcome::state(session);
        match resolution {
            Resolution::Approved { cleared, .. } => {
                debug!(participant = %participant, %zone, "zone request approved");
                out.cancel_stale(participant, cleared);
            }
            Resolution::Denied { ticket, superseded, .. } => {
                debug!(participant = %participant, %zone, %ticket, "zone request denied");
                out.cancel_stale(participant, superseded);
                out.expiry.push(ExpiryOrder::Schedule { participant, ticket });
            }
        }
        Ok(out)
    }

    /// A scheduled denial expiry fired.
    pub fn expire_denial(&mut self, participant: ConnectionId, ticket: ExpiryTicket) -> AppResult<Outcome> {
        let session = self.session.as_mut().ok_or(DomainError::NoActiveSession)?;
        if !zone_access::expire_denial(session, participant, ticket) {
            return Err(DomainError::InvalidTransition("denial already superseded"));
        }

        debug!(participant = %participant, %ticket, "denial expired");
        Ok(Outcome::state(session))
    }

    pub fn disconnect(&mut self, conn: ConnectionId) -> AppResult<Outcome> {
        let session = self.session.as_mut().ok_or(DomainError::NoActiveSession)?;
        if session.authorizes_host(conn) {
            return Ok(self.end_session(DomainError::HostLoss.to_string()));
        }

        let (_, players, requests) = session.parts_mut();
        if players.remove(&conn).is_none() {
            return Err(DomainError::UnknownParticipant);
        }
        let cleared = requests.clear(&conn);
        debug!(conn = %conn, "participant left");

        let mut out = Outcome::state(session);
        out.cancel_stale(conn, cleared);
        Ok(out)
    }

    /// Drops the whole session and tells every remaining connection why.
    pub fn end_session(&mut self, reason: impl Into<String>) -> Outcome {
        let Some(session) = self.session.take() else {
            return Outcome::default();
        };
        let reason = reason.into();
        info!(
            host = %session.host_id(),
            participants = session.players().len(),
            uptime = ?session.uptime(),
            %reason,
            "session ended"
        );

        Outcome {
            deliveries: vec![Delivery::Broadcast(Notice::Ended { reason })],
            expiry: vec![ExpiryOrder::CancelAll],
        }
    }
}
