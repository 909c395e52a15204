use crate::models::types::ZoneId;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Denied,
}

/// Identifies one scheduled denial expiry. A firing expiry only acts when its
/// ticket still matches the participant's current denial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExpiryTicket(pub u64);

impl core::fmt::Display for ExpiryTicket {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneRequest {
    pub zone_id: ZoneId,
    pub status: RequestStatus,
    #[serde(skip)]
    pub ticket: Option<ExpiryTicket>,
}

impl ZoneRequest {
    pub fn pending(zone_id: ZoneId) -> Self {
        Self {
            zone_id,
            status: RequestStatus::Pending,
            ticket: None,
        }
    }

    pub fn denied(zone_id: ZoneId, ticket: ExpiryTicket) -> Self {
        Self {
            zone_id,
            status: RequestStatus::Denied,
            ticket: Some(ticket),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == RequestStatus::Pending
    }

    pub fn is_denied(&self) -> bool {
        self.status == RequestStatus::Denied
    }
}
