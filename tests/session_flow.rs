use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use zonemeet::config::Config;
use zonemeet::models::participant::JoinRequest;
use zonemeet::models::types::{ConnectionId, ZoneId};
use zonemeet::models::world::WorldData;
use zonemeet::models::zone_request::RequestStatus;
use zonemeet::net::output::{SessionOut, channel};
use zonemeet::net::protocol::{ClientEvent, ServerMessage};
use zonemeet::services::broadcaster::StateSnapshot;
use zonemeet::{EngineHandle, start_engine};

struct Client {
    id: ConnectionId,
    out: SessionOut,
}

impl Client {
    async fn connect(engine: &EngineHandle) -> Self {
        let id = ConnectionId::new();
        let (handle, out) = channel(id, 64);
        engine.connect(handle).await.unwrap();
        let mut client = Self { id, out };
        assert!(matches!(*client.next().await, ServerMessage::Welcome { connection_id } if connection_id == id));
        client
    }

    async fn next(&mut self) -> Arc<ServerMessage> {
        let (msg, _) = tokio::time::timeout(Duration::from_secs(10), self.out.recv())
            .await
            .expect("frame within timeout")
            .expect("output open");
        msg
    }

    async fn next_state(&mut self) -> StateSnapshot {
        loop {
            if let ServerMessage::StateUpdate(s) = &*self.next().await {
                return s.clone();
            }
        }
    }

    /// Nothing else arrives, even after every pending timer had its chance.
    async fn assert_quiet(&mut self) {
        let next = tokio::time::timeout(Duration::from_secs(5), self.out.recv()).await;
        assert!(next.is_err(), "unexpected frame: {next:?}");
    }

    async fn send(&self, engine: &EngineHandle, event: ClientEvent) {
        engine.submit(self.id, event).await.unwrap();
    }
}

fn office() -> WorldData {
    // Row 0: common, common, wall. Row 1: zone 2, zone 2, zone 3.
    WorldData::from_rows(&[&[1, 1, 0], &[2, 2, 3]])
}

async fn session_with_guest(engine: &EngineHandle) -> (Client, Client) {
    let mut host = Client::connect(engine).await;
    let mut guest = Client::connect(engine).await;

    host.send(engine, ClientEvent::SubmitWorld(office())).await;
    assert!(matches!(*host.next().await, ServerMessage::WorldData(_)));
    host.next_state().await;
    assert!(matches!(*guest.next().await, ServerMessage::WorldData(_)));
    guest.next_state().await;

    host.send(engine, ClientEvent::Join(JoinRequest::default())).await;
    host.next_state().await;
    guest.next_state().await;

    guest.send(engine, ClientEvent::Join(JoinRequest::default())).await;
    host.next_state().await;
    guest.next_state().await;

    (host, guest)
}

#[tokio::test(start_paused = true)]
async fn denial_expires_after_the_configured_delay() {
    let (engine, _jh) = start_engine(&Config::default());
    let (mut host, mut guest) = session_with_guest(&engine).await;

    guest.send(&engine, ClientEvent::Move { x: 16.0, y: 48.0 }).await;
    let snap = host.next_state().await;
    assert_eq!(snap.zone_requests[&guest.id].status, RequestStatus::Pending);
    guest.next_state().await;

    host.send(
        &engine,
        ClientEvent::ResolveRequest {
            participant_id: guest.id,
            zone_id: ZoneId(2),
            approved: false,
        },
    )
    .await;
    let denied_at = Instant::now();
    let snap = guest.next_state().await;
    assert_eq!(snap.zone_requests[&guest.id].status, RequestStatus::Denied);
    assert_eq!(snap.participants[&guest.id].zone(), Some(ZoneId(1)));
    host.next_state().await;

    let snap = guest.next_state().await;
    assert!(snap.zone_requests.is_empty());
    assert!(denied_at.elapsed() >= Duration::from_millis(2000));
}

#[tokio::test(start_paused = true)]
async fn superseded_denial_never_clears_the_newer_request() {
    let (engine, _jh) = start_engine(&Config::default());
    let (mut host, mut guest) = session_with_guest(&engine).await;

    host.send(
        &engine,
        ClientEvent::ResolveRequest {
            participant_id: guest.id,
            zone_id: ZoneId(2),
            approved: false,
        },
    )
    .await;
    guest.next_state().await;
    host.next_state().await;

    // zone 3 sits at row 1 / col 2; the guest may ask for it while zone 2 is denied
    guest.send(&engine, ClientEvent::Move { x: 80.0, y: 48.0 }).await;
    let snap = guest.next_state().await;
    assert_eq!(snap.zone_requests[&guest.id].zone_id, ZoneId(3));
    assert_eq!(snap.zone_requests[&guest.id].status, RequestStatus::Pending);
    host.next_state().await;

    tokio::time::sleep(Duration::from_millis(5000)).await;

    // nothing fired; the next frame is the one caused by approval
    host.send(
        &engine,
        ClientEvent::ResolveRequest {
            participant_id: guest.id,
            zone_id: ZoneId(3),
            approved: true,
        },
    )
    .await;
    let snap = guest.next_state().await;
    assert!(snap.zone_requests.is_empty());
    assert_eq!(snap.participants[&guest.id].permissions().explicit(), vec![ZoneId(1), ZoneId(3)]);
}

#[tokio::test(start_paused = true)]
async fn host_loss_ends_the_session_for_everyone() {
    let (engine, _jh) = start_engine(&Config::default());
    let (host, mut guest) = session_with_guest(&engine).await;

    guest.send(&engine, ClientEvent::Move { x: 16.0, y: 48.0 }).await;
    guest.next_state().await;

    engine.disconnect(host.id).await.unwrap();
    match &*guest.next().await {
        ServerMessage::SessionEnded { reason } => assert_eq!(reason, "Host left the meeting"),
        other => panic!("expected sessionEnded, got {other:?}"),
    }
    guest.assert_quiet().await;

    // a later connection sees no world; the former guest may host a new one
    let mut late = Client::connect(&engine).await;
    guest.send(&engine, ClientEvent::SubmitWorld(office())).await;
    assert!(matches!(*late.next().await, ServerMessage::WorldData(_)));
    let snap = late.next_state().await;
    assert_eq!(snap.host_id, Some(guest.id));
    assert!(snap.participants.is_empty());
    assert!(snap.zone_requests.is_empty());
}

#[tokio::test(start_paused = true)]
async fn refused_actions_broadcast_nothing() {
    let (engine, _jh) = start_engine(&Config::default());
    let (mut host, mut guest) = session_with_guest(&engine).await;

    // into the wall, then a resolve from a non-host, then a second world
    guest.send(&engine, ClientEvent::Move { x: 80.0, y: 16.0 }).await;
    guest
        .send(
            &engine,
            ClientEvent::ResolveRequest {
                participant_id: guest.id,
                zone_id: ZoneId(2),
                approved: true,
            },
        )
        .await;
    guest.send(&engine, ClientEvent::SubmitWorld(WorldData::from_rows(&[&[1]]))).await;

    // a legitimate move is the very next frame anyone sees
    host.send(&engine, ClientEvent::Move { x: 48.0, y: 16.0 }).await;
    let frame = guest.next().await;
    let ServerMessage::StateUpdate(snap) = &*frame else {
        panic!("expected stateUpdate, got {frame:?}");
    };
    assert_eq!(snap.participants[&host.id].position().x, 48.0);
    assert_eq!(snap.participants[&guest.id].position().x, 16.0);
    assert!(snap.zone_requests.is_empty());
    host.next_state().await;
}

#[tokio::test(start_paused = true)]
async fn approval_inside_the_denial_window_cancels_the_expiry() {
    let (engine, _jh) = start_engine(&Config::default());
    let (mut host, mut guest) = session_with_guest(&engine).await;

    guest.send(&engine, ClientEvent::Move { x: 16.0, y: 48.0 }).await;
    guest.next_state().await;
    host.next_state().await;

    let guest_id = guest.id;
    let decide = move |approved| ClientEvent::ResolveRequest {
        participant_id: guest_id,
        zone_id: ZoneId(2),
        approved,
    };
    host.send(&engine, decide(false)).await;
    guest.next_state().await;
    host.next_state().await;

    tokio::time::sleep(Duration::from_millis(500)).await;
    host.send(&engine, decide(true)).await;
    let snap = guest.next_state().await;
    assert!(snap.zone_requests.is_empty());
    assert!(snap.participants[&guest.id].permissions().allows(ZoneId(2)));
    host.next_state().await;

    // the 2000 ms mark passes without a further broadcast
    guest.assert_quiet().await;
    host.assert_quiet().await;
}

#[tokio::test(start_paused = true)]
async fn slow_reader_still_learns_the_session_ended() {
    let (engine, _jh) = start_engine(&Config::default());
    let mut host = Client::connect(&engine).await;

    // a reader that never drains its three-frame queue
    let slow = ConnectionId::new();
    let (handle, mut slow_out) = channel(slow, 3);
    engine.connect(handle).await.unwrap();

    host.send(&engine, ClientEvent::SubmitWorld(office())).await;
    host.next_state().await;
    host.send(&engine, ClientEvent::Join(JoinRequest::default())).await;
    host.next_state().await;
    engine.disconnect(host.id).await.unwrap();

    let mut kinds = Vec::new();
    while let Ok(Some((msg, _))) = tokio::time::timeout(Duration::from_secs(5), slow_out.recv()).await {
        kinds.push(msg.kind());
    }
    assert_eq!(kinds, ["welcome", "worldData", "sessionEnded"]);
}
