use crate::models::types::{ConnectionId, ZoneId};
use crate::models::zone_request::{ExpiryTicket, ZoneRequest};
use std::collections::BTreeMap;

/// At most one zone request per participant.
#[derive(Debug, Default)]
pub struct RequestTable {
    requests: BTreeMap<ConnectionId, ZoneRequest>,
    next_ticket: u64,
}

impl RequestTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &ConnectionId) -> Option<&ZoneRequest> {
        self.requests.get(id)
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ConnectionId, &ZoneRequest)> {
        self.requests.iter()
    }

    /// Replaces whatever was there with a pending request; returns the replaced one.
    pub(crate) fn open_pending(&mut self, id: ConnectionId, zone: ZoneId) -> Option<ZoneRequest> {
        self.requests.insert(id, ZoneRequest::pending(zone))
    }

    /// Records a denial under a fresh ticket; returns the ticket and the replaced request.
    pub(crate) fn deny(&mut self, id: ConnectionId, zone: ZoneId) -> (ExpiryTicket, Option<ZoneRequest>) {
        self.next_ticket += 1;
        let ticket = ExpiryTicket(self.next_ticket);
        let prev = self.requests.insert(id, ZoneRequest::denied(zone, ticket));
        (ticket, prev)
    }

    pub(crate) fn clear(&mut self, id: &ConnectionId) -> Option<ZoneRequest> {
        self.requests.remove(id)
    }

    /// Clears the request only if it is still the denial issued under `ticket`.
    pub(crate) fn expire(&mut self, id: &ConnectionId, ticket: ExpiryTicket) -> bool {
        let current = self
            .requests
            .get(id)
            .is_some_and(|r| r.is_denied() && r.ticket == Some(ticket));
        if current {
            self.requests.remove(id);
        }
        current
    }
}
