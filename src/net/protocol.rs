use crate::models::participant::JoinRequest;
use crate::models::types::{ConnectionId, ZoneId};
use crate::models::world::WorldData;
use crate::services::Notice;
use crate::services::broadcaster::StateSnapshot;
use serde::{Deserialize, Serialize};

/// Client → server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientEvent {
    SubmitWorld(WorldData),
    Join(JoinRequest),
    Move {
        x: f64,
        y: f64,
    },
    #[serde(rename_all = "camelCase")]
    ResolveRequest {
        participant_id: ConnectionId,
        zone_id: ZoneId,
        approved: bool,
    },
}

/// Server → client.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    #[serde(rename_all = "camelCase")]
    Welcome { connection_id: ConnectionId },
    WorldData(WorldData),
    StateUpdate(StateSnapshot),
    SessionEnded { reason: String },
}

impl ServerMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            ServerMessage::Welcome { .. } => "welcome",
            ServerMessage::WorldData(_) => "worldData",
            ServerMessage::StateUpdate(_) => "stateUpdate",
            ServerMessage::SessionEnded { .. } => "sessionEnded",
        }
    }

    /// Only whole snapshots may be skipped; the next one supersedes them.
    pub fn is_droppable(&self) -> bool {
        matches!(self, ServerMessage::StateUpdate(_))
    }
}

impl From<Notice> for ServerMessage {
    fn from(notice: Notice) -> Self {
        match notice {
            Notice::Welcome(connection_id) => ServerMessage::Welcome { connection_id },
            Notice::World(data) => ServerMessage::WorldData(data),
            Notice::State(snapshot) => ServerMessage::StateUpdate(snapshot),
            Notice::Ended { reason } => ServerMessage::SessionEnded { reason },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_client_events() {
        let ev: ClientEvent = serde_json::from_str(r#"{"type":"submitWorld","map":[[1,2]]}"#).unwrap();
        assert_eq!(ev, ClientEvent::SubmitWorld(WorldData::from_rows(&[&[1, 2]])));

        let ev: ClientEvent = serde_json::from_str(r#"{"type":"join"}"#).unwrap();
        assert_eq!(ev, ClientEvent::Join(JoinRequest::default()));

        let ev: ClientEvent = serde_json::from_str(r#"{"type":"join","name":"Ada","hair":"long"}"#).unwrap();
        let ClientEvent::Join(req) = ev else { panic!("expected join") };
        assert_eq!(req.name.as_deref(), Some("Ada"));
        assert_eq!(req.hair.as_deref(), Some("long"));

        let ev: ClientEvent = serde_json::from_str(r#"{"type":"move","x":16.5,"y":40}"#).unwrap();
        assert_eq!(ev, ClientEvent::Move { x: 16.5, y: 40.0 });

        let id = ConnectionId::new();
        let raw = format!(r#"{{"type":"resolveRequest","participantId":"{id}","zoneId":3,"approved":false}}"#);
        let ev: ClientEvent = serde_json::from_str(&raw).unwrap();
        assert_eq!(
            ev,
            ClientEvent::ResolveRequest {
                participant_id: id,
                zone_id: ZoneId(3),
                approved: false
            }
        );
    }

    #[test]
    fn rejects_unknown_or_malformed_events() {
        assert!(serde_json::from_str::<ClientEvent>(r#"{"type":"teleport"}"#).is_err());
        assert!(serde_json::from_str::<ClientEvent>(r#"{"type":"move","x":"left"}"#).is_err());
        assert!(serde_json::from_str::<ClientEvent>(r#"{"x":1,"y":2}"#).is_err());
    }

    #[test]
    fn server_messages_are_tagged() {
        let msg = ServerMessage::SessionEnded { reason: "bye".into() };
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            serde_json::json!({"type": "sessionEnded", "reason": "bye"})
        );

        let id = ConnectionId::new();
        let json = serde_json::to_value(ServerMessage::Welcome { connection_id: id }).unwrap();
        assert_eq!(json["type"], "welcome");
        assert_eq!(json["connectionId"], id.to_string());
        assert_eq!(ServerMessage::Welcome { connection_id: id }.kind(), "welcome");
    }

    #[test]
    fn only_snapshots_are_droppable() {
        let id = ConnectionId::new();
        let msg = ServerMessage::from(Notice::Welcome(id));
        assert_eq!(msg, ServerMessage::Welcome { connection_id: id });
        assert!(!msg.is_droppable());

        let ended = ServerMessage::from(Notice::Ended { reason: "bye".into() });
        assert!(!ended.is_droppable());
        assert!(!ServerMessage::from(Notice::World(WorldData::from_rows(&[&[1]]))).is_droppable());
        assert!(ServerMessage::from(Notice::State(StateSnapshot::default())).is_droppable());
    }
}
