use crate::models::participant::{MemberSummary, Participant};
use crate::models::types::{ConnectionId, ZoneId};
use crate::models::zone_request::ZoneRequest;
use crate::state::registry::PlayerRegistry;
use crate::state::session::Session;
use serde::Serialize;
use std::collections::BTreeMap;

/// Complete outward view of the session, pushed after every accepted mutation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    pub participants: BTreeMap<ConnectionId, Participant>,
    pub zone_roster: BTreeMap<ZoneId, Vec<MemberSummary>>,
    pub host_id: Option<ConnectionId>,
    pub zone_requests: BTreeMap<ConnectionId, ZoneRequest>,
}

pub fn snapshot(session: &Session) -> StateSnapshot {
    StateSnapshot {
        participants: session.players().iter().map(|p| (p.id(), p.clone())).collect(),
        zone_roster: zone_roster(session.players()),
        host_id: Some(session.host_id()),
        zone_requests: session.requests().iter().map(|(id, r)| (*id, *r)).collect(),
    }
}

/// Members per zone. Participants standing outside every zone (or on a wall)
/// are left out.
pub fn zone_roster(players: &PlayerRegistry) -> BTreeMap<ZoneId, Vec<MemberSummary>> {
    let mut roster: BTreeMap<ZoneId, Vec<MemberSummary>> = BTreeMap::new();
    for p in players.iter() {
        let Some(zone) = p.zone().filter(|z| !z.is_wall()) else {
            continue;
        };
        roster.entry(zone).or_default().push(p.summary());
    }
    roster
}
