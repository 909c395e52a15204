//! Zone access control.
//!
//! Every participant is, at any moment, in one derived access state towards
//! the zone it last tried to reach:
//!
//! - `Unrestricted`: the host, who may go anywhere;
//! - `Granted(z)`: z is in the participant's permission set;
//! - `Pending(z)`: a request for z is waiting on the host;
//! - `Denied(z)`: the host refused z recently; the denial expires on its own.
//!
//! The states are read from the registry and the request table rather than
//! stored. Moves are validated for collision first; nothing here mutates
//! state on a refused move.

use crate::error::{AppResult, DomainError};
use crate::models::types::{ConnectionId, Position, ZoneId};
use crate::models::zone_request::{ExpiryTicket, ZoneRequest};
use crate::services::movement::{PLAYER_RADIUS, can_occupy};
use crate::state::session::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessState {
    Unrestricted,
    Granted(ZoneId),
    Pending(ZoneId),
    Denied(ZoneId),
}

/// What a successful move attempt changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Position and zone were updated; any open request was cleared.
    Committed {
        zone: ZoneId,
        cleared: Option<ZoneRequest>,
    },
    /// The move was held back and a pending request for `zone` was opened.
    RequestOpened {
        zone: ZoneId,
        superseded: Option<ZoneRequest>,
    },
}

/// What a host decision changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Approved {
        zone: ZoneId,
        cleared: Option<ZoneRequest>,
    },
    Denied {
        zone: ZoneId,
        ticket: ExpiryTicket,
        superseded: Option<ZoneRequest>,
    },
}

/// Access state of a participant towards the zone it stands in or is asking for.
pub fn access_state(session: &Session, id: ConnectionId) -> Option<AccessState> {
    let participant = session.players().get(&id)?;
    if participant.is_host() {
        return Some(AccessState::Unrestricted);
    }

    if let Some(req) = session.requests().get(&id) {
        return Some(if req.is_pending() {
            AccessState::Pending(req.zone_id)
        } else {
            AccessState::Denied(req.zone_id)
        });
    }

    participant.zone().map(AccessState::Granted)
}

/// Drives one move attempt of participant `id` towards `target`.
pub fn attempt_move(session: &mut Session, id: ConnectionId, target: Position) -> AppResult<MoveOutcome> {
    let (world, players, requests) = session.parts_mut();
    let participant = players.get_mut(&id).ok_or(DomainError::UnknownParticipant)?;

    if !can_occupy(world, target, PLAYER_RADIUS) {
        return Err(DomainError::InvalidTransition("footprint blocked"));
    }

    let zone = world
        .lookup_zone(target)
        .ok_or(DomainError::InvalidTransition("outside the world"))?;

    if participant.permissions().allows(zone) {
        participant.commit_move(target, zone);
        let cleared = requests.clear(&id);
        return Ok(MoveOutcome::Committed { zone, cleared });
    }

    if !zone.is_restricted() {
        return Err(DomainError::InvalidTransition("wall or common zone"));
    }

    match requests.get(&id) {
        Some(req) if req.is_pending() => Err(DomainError::InvalidTransition("request already pending")),
        Some(req) if req.zone_id == zone => Err(DomainError::StaleDenial(zone)),
        _ => {
            let superseded = requests.open_pending(id, zone);
            Ok(MoveOutcome::RequestOpened { zone, superseded })
        }
    }
}

/// Applies the host's decision on `target`'s access to `zone`.
pub fn resolve_request(
    session: &mut Session,
    issuer: ConnectionId,
    target: ConnectionId,
    zone: ZoneId,
    approved: bool,
) -> AppResult<Resolution> {
    if !session.authorizes_host(issuer) {
        return Err(DomainError::UnauthorizedAction("only the host resolves zone requests"));
    }
    if !zone.is_restricted() {
        return Err(DomainError::InvalidTransition("only restricted zones need approval"));
    }

    let (_, players, requests) = session.parts_mut();
    let participant = players.get_mut(&target).ok_or(DomainError::UnknownParticipant)?;
    if participant.is_host() {
        return Err(DomainError::InvalidTransition("the host needs no approval"));
    }

    if approved {
        participant.grant(zone);
        let cleared = requests.clear(&target);
        Ok(Resolution::Approved { zone, cleared })
    } else {
        let (ticket, superseded) = requests.deny(target, zone);
        participant.roll_back();
        Ok(Resolution::Denied {
            zone,
            ticket,
            superseded,
        })
    }
}

/// Clears a denial whose expiry fired; `false` if it was superseded meanwhile.
pub fn expire_denial(session: &mut Session, id: ConnectionId, ticket: ExpiryTicket) -> bool {
    let (_, _, requests) = session.parts_mut();
    requests.expire(&id, ticket)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::participant::{JoinRequest, Participant, Role};
    use crate::models::world::{World, WorldData};
    use crate::models::zone_request::RequestStatus;

    struct Fixture {
        session: Session,
        host: ConnectionId,
        user: ConnectionId,
    }

    fn fixture(rows: &[&[u32]]) -> Fixture {
        let host = ConnectionId::new();
        let user = ConnectionId::new();
        let mut session = Session::new(host, World::new(WorldData::from_rows(rows)).unwrap());
        {
            let (world, players, _) = session.parts_mut();
            players.insert(Participant::spawn(host, JoinRequest::default().into(), Role::Host, world));
            players.insert(Participant::spawn(user, JoinRequest::default().into(), Role::User, world));
        }
        Fixture { session, host, user }
    }

    // Row 0: common, common, wall. Row 1: zone 2, zone 2, zone 3.
    const LAYOUT: &[&[u32]] = &[&[1, 1, 0], &[2, 2, 3]];
    const IN_TWO: Position = Position::new(16.0, 48.0);
    const IN_THREE: Position = Position::new(80.0, 48.0);

    #[test]
    fn permitted_move_commits_and_updates_zone() {
        let mut f = fixture(LAYOUT);
        let out = attempt_move(&mut f.session, f.user, Position::new(40.0, 16.0)).unwrap();

        assert_eq!(out, MoveOutcome::Committed { zone: ZoneId(1), cleared: None });
        let p = f.session.players().get(&f.user).unwrap();
        assert_eq!(p.position(), Position::new(40.0, 16.0));
        assert_eq!(p.last_allowed().position, Position::new(40.0, 16.0));
    }

    #[test]
    fn host_commits_anywhere_open() {
        let mut f = fixture(LAYOUT);
        let out = attempt_move(&mut f.session, f.host, IN_THREE).unwrap();

        assert!(matches!(out, MoveOutcome::Committed { zone: ZoneId(3), .. }));
        assert_eq!(access_state(&f.session, f.host), Some(AccessState::Unrestricted));
    }

    #[test]
    fn blocked_footprint_changes_nothing() {
        let mut f = fixture(LAYOUT);
        let err = attempt_move(&mut f.session, f.user, Position::new(80.0, 16.0)).unwrap_err();

        assert!(matches!(err, DomainError::InvalidTransition(_)));
        assert!(f.session.requests().is_empty());
        assert_eq!(f.session.players().get(&f.user).unwrap().position(), Position::new(16.0, 16.0));
    }

    #[test]
    fn restricted_zone_opens_a_single_pending_request() {
        let mut f = fixture(LAYOUT);

        let out = attempt_move(&mut f.session, f.user, IN_TWO).unwrap();
        assert_eq!(out, MoveOutcome::RequestOpened { zone: ZoneId(2), superseded: None });
        assert_eq!(access_state(&f.session, f.user), Some(AccessState::Pending(ZoneId(2))));

        for target in [IN_TWO, IN_THREE, Position::new(48.0, 48.0)] {
            let err = attempt_move(&mut f.session, f.user, target).unwrap_err();
            assert!(matches!(err, DomainError::InvalidTransition(_)));
        }
        assert_eq!(f.session.requests().len(), 1);
        assert_eq!(f.session.requests().get(&f.user), Some(&ZoneRequest::pending(ZoneId(2))));
        assert_eq!(f.session.players().get(&f.user).unwrap().zone(), Some(ZoneId(1)));
    }

    #[test]
    fn approval_grants_zone_permanently() {
        let mut f = fixture(LAYOUT);
        attempt_move(&mut f.session, f.user, IN_TWO).unwrap();

        let res = resolve_request(&mut f.session, f.host, f.user, ZoneId(2), true).unwrap();
        assert!(matches!(res, Resolution::Approved { zone: ZoneId(2), cleared: Some(_) }));
        assert!(f.session.requests().is_empty());

        for _ in 0..3 {
            let out = attempt_move(&mut f.session, f.user, IN_TWO).unwrap();
            assert!(matches!(out, MoveOutcome::Committed { zone: ZoneId(2), .. }));
            attempt_move(&mut f.session, f.user, Position::new(16.0, 16.0)).unwrap();
        }
    }

    #[test]
    fn denial_rolls_back_and_blocks_resubmission() {
        let mut f = fixture(LAYOUT);
        attempt_move(&mut f.session, f.user, Position::new(40.0, 20.0)).unwrap();
        attempt_move(&mut f.session, f.user, IN_TWO).unwrap();

        let res = resolve_request(&mut f.session, f.host, f.user, ZoneId(2), false).unwrap();
        let Resolution::Denied { ticket, .. } = res else {
            panic!("expected denial, got {res:?}");
        };

        let p = f.session.players().get(&f.user).unwrap();
        assert_eq!(p.position(), Position::new(40.0, 20.0));
        assert_eq!(p.zone(), Some(ZoneId(1)));
        assert_eq!(f.session.requests().get(&f.user).map(|r| r.status), Some(RequestStatus::Denied));

        let err = attempt_move(&mut f.session, f.user, IN_TWO).unwrap_err();
        assert!(matches!(err, DomainError::StaleDenial(ZoneId(2))));

        assert!(expire_denial(&mut f.session, f.user, ticket));
        let out = attempt_move(&mut f.session, f.user, IN_TWO).unwrap();
        assert!(matches!(out, MoveOutcome::RequestOpened { zone: ZoneId(2), superseded: None }));
    }

    #[test]
    fn request_for_another_zone_supersedes_a_denial() {
        let mut f = fixture(LAYOUT);
        attempt_move(&mut f.session, f.host, IN_THREE).unwrap();
        resolve_request(&mut f.session, f.host, f.user, ZoneId(3), false).unwrap();

        let out = attempt_move(&mut f.session, f.user, IN_TWO).unwrap();
        let MoveOutcome::RequestOpened { superseded: Some(prev), .. } = out else {
            panic!("expected superseded denial, got {out:?}");
        };
        assert!(prev.is_denied());
        assert_eq!(prev.zone_id, ZoneId(3));
    }

    #[test]
    fn only_the_host_connection_may_resolve() {
        let mut f = fixture(LAYOUT);
        attempt_move(&mut f.session, f.user, IN_TWO).unwrap();

        let stranger = ConnectionId::new();
        for issuer in [f.user, stranger] {
            let err = resolve_request(&mut f.session, issuer, f.user, ZoneId(2), true).unwrap_err();
            assert!(matches!(err, DomainError::UnauthorizedAction(_)));
        }
        assert_eq!(access_state(&f.session, f.user), Some(AccessState::Pending(ZoneId(2))));
    }

    #[test]
    fn resolution_targets_must_be_restricted_users() {
        let mut f = fixture(LAYOUT);

        for (target, zone) in [(f.user, ZoneId(1)), (f.user, ZoneId(0)), (f.host, ZoneId(2))] {
            let err = resolve_request(&mut f.session, f.host, target, zone, true).unwrap_err();
            assert!(matches!(err, DomainError::InvalidTransition(_)));
        }
        let err = resolve_request(&mut f.session, f.host, ConnectionId::new(), ZoneId(2), true).unwrap_err();
        assert!(matches!(err, DomainError::UnknownParticipant));
    }

    #[test]
    fn zone_always_matches_position() {
        let mut f = fixture(&[&[1, 1, 1, 2], &[1, 0, 1, 2], &[3, 3, 1, 1]]);
        resolve_request(&mut f.session, f.host, f.user, ZoneId(3), true).unwrap();

        let mut y = 0.0;
        while y < 100.0 {
            let mut x = 0.0;
            while x < 130.0 {
                for id in [f.host, f.user] {
                    let _ = attempt_move(&mut f.session, id, Position::new(x, y));
                    let p = f.session.players().get(&id).unwrap();
                    assert_eq!(p.zone(), f.session.world().lookup_zone(p.position()));
                    if !p.is_host() {
                        assert!(p.zone().is_some_and(|z| p.permissions().allows(z)));
                    }
                }
                x += 5.0;
            }
            y += 7.0;
        }
    }
}
