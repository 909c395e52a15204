use crate::models::participant::Participant;
use crate::models::types::ConnectionId;
use std::collections::BTreeMap;

/// Authoritative map of admitted participants.
///
/// Readable by anyone holding the session; mutation is crate-private so that
/// position, zone and permissions only change through the session manager and
/// the zone access controller.
#[derive(Debug, Default)]
pub struct PlayerRegistry {
    players: BTreeMap<ConnectionId, Participant>,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &ConnectionId) -> Option<&Participant> {
        self.players.get(id)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Participant> {
        self.players.values()
    }

    pub(crate) fn insert(&mut self, participant: Participant) -> Option<Participant> {
        self.players.insert(participant.id(), participant)
    }

    pub(crate) fn remove(&mut self, id: &ConnectionId) -> Option<Participant> {
        self.players.remove(id)
    }

    pub(crate) fn get_mut(&mut self, id: &ConnectionId) -> Option<&mut Participant> {
        self.players.get_mut(id)
    }
}
