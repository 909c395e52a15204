use crate::models::types::ConnectionId;
use crate::models::world::World;
use crate::state::registry::PlayerRegistry;
use crate::state::requests::RequestTable;
use std::time::{Duration, Instant};

/// The single active world, its host and everyone in it.
#[derive(Debug)]
pub struct Session {
    // When the world was submitted
    started: Instant,
    world: World,
    host: ConnectionId,
    players: PlayerRegistry,
    requests: RequestTable,
}

impl Session {
    pub fn new(host: ConnectionId, world: World) -> Self {
        Self {
            started: Instant::now(),
            world,
            host,
            players: PlayerRegistry::new(),
            requests: RequestTable::new(),
        }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn host_id(&self) -> ConnectionId {
        self.host
    }

    /// The host's authority is exactly the identity of the connection that
    /// submitted the world; nothing else grants it.
    pub fn authorizes_host(&self, conn: ConnectionId) -> bool {
        conn == self.host
    }

    pub fn players(&self) -> &PlayerRegistry {
        &self.players
    }

    pub fn requests(&self) -> &RequestTable {
        &self.requests
    }

    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }

    pub(crate) fn parts_mut(&mut self) -> (&World, &mut PlayerRegistry, &mut RequestTable) {
        (&self.world, &mut self.players, &mut self.requests)
    }
}
