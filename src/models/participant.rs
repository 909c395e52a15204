use crate::models::types::{ConnectionId, Position, ZoneId};
use crate::models::world::World;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeSet;

const DEFAULT_NAME: &str = "Anonymous";
const DEFAULT_COLOR: &str = "#3182ce";
const DEFAULT_STYLE: &str = "casual";
const DEFAULT_HAIR: &str = "short";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Host,
    User,
}

/// Zones a participant may occupy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Permissions {
    /// Host: every zone, no explicit set.
    Unrestricted,
    Zones(BTreeSet<ZoneId>),
}

impl Permissions {
    pub fn for_role(role: Role) -> Self {
        match role {
            Role::Host => Permissions::Unrestricted,
            Role::User => Permissions::Zones(BTreeSet::from([ZoneId::COMMON])),
        }
    }

    pub fn allows(&self, zone: ZoneId) -> bool {
        match self {
            Permissions::Unrestricted => true,
            Permissions::Zones(zones) => zones.contains(&zone),
        }
    }

    pub(crate) fn grant(&mut self, zone: ZoneId) {
        if let Permissions::Zones(zones) = self {
            zones.insert(zone);
        }
    }

    /// The explicit set; empty for the host.
    pub fn explicit(&self) -> Vec<ZoneId> {
        match self {
            Permissions::Unrestricted => Vec::new(),
            Permissions::Zones(zones) => zones.iter().copied().collect(),
        }
    }
}

// Host → null, user → sorted list of zone ids.
impl Serialize for Permissions {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Permissions::Unrestricted => serializer.serialize_none(),
            Permissions::Zones(zones) => serializer.collect_seq(zones),
        }
    }
}

/// Display attributes supplied at join time. Opaque to the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub style: Option<String>,
    #[serde(default)]
    pub hair: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Appearance {
    pub name: String,
    pub color: String,
    pub style: String,
    pub hair: String,
}

impl From<JoinRequest> for Appearance {
    fn from(req: JoinRequest) -> Self {
        fn or_default(v: Option<String>, default: &str) -> String {
            v.filter(|s| !s.is_empty()).unwrap_or_else(|| default.to_string())
        }

        Self {
            name: or_default(req.name, DEFAULT_NAME),
            color: or_default(req.color, DEFAULT_COLOR),
            style: or_default(req.style, DEFAULT_STYLE),
            hair: or_default(req.hair, DEFAULT_HAIR),
        }
    }
}

/// Last position that satisfied the permission invariant; the rollback target on denial.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AllowedPosition {
    pub position: Position,
    pub zone: Option<ZoneId>,
}

/// Roster entry for one participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberSummary {
    pub id: ConnectionId,
    #[serde(flatten)]
    pub appearance: Appearance,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    id: ConnectionId,
    #[serde(flatten)]
    appearance: Appearance,
    #[serde(flatten)]
    position: Position,
    zone_id: Option<ZoneId>,
    role: Role,
    permissions: Permissions,
    #[serde(skip)]
    last_allowed: AllowedPosition,
}

impl Participant {
    /// Places a newly admitted participant on the world's spawn point.
    ///
    /// A user spawned inside a restricted zone (only possible through the
    /// fallback cell) is granted that zone so the permission invariant holds.
    pub(crate) fn spawn(id: ConnectionId, appearance: Appearance, role: Role, world: &World) -> Self {
        let position = world.spawn_point();
        let zone = world.lookup_zone(position);

        let mut permissions = Permissions::for_role(role);
        if let Some(z) = zone.filter(|z| z.is_restricted()) {
            permissions.grant(z);
        }

        Self {
            id,
            appearance,
            position,
            zone_id: zone,
            role,
            permissions,
            last_allowed: AllowedPosition { position, zone },
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn appearance(&self) -> &Appearance {
        &self.appearance
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn zone(&self) -> Option<ZoneId> {
        self.zone_id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn is_host(&self) -> bool {
        self.role == Role::Host
    }

    pub fn permissions(&self) -> &Permissions {
        &self.permissions
    }

    pub fn last_allowed(&self) -> AllowedPosition {
        self.last_allowed
    }

    pub fn summary(&self) -> MemberSummary {
        MemberSummary {
            id: self.id,
            appearance: self.appearance.clone(),
            role: self.role,
        }
    }

    pub(crate) fn commit_move(&mut self, position: Position, zone: ZoneId) {
        self.position = position;
        self.zone_id = Some(zone);
        self.last_allowed = AllowedPosition {
            position,
            zone: Some(zone),
        };
    }

    pub(crate) fn roll_back(&mut self) {
        self.position = self.last_allowed.position;
        self.zone_id = self.last_allowed.zone;
    }

    pub(crate) fn grant(&mut self, zone: ZoneId) {
        self.permissions.grant(zone);
    }
}
