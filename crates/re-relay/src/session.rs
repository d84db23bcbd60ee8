//! The relay session manager.
//!
//! One [`Relay`] owns the mirrored world and the upstream link. Every
//! downstream attaches through [`Relay::connect`], which walks the session
//! through attaching, snapshot replay and live forwarding until either side
//! goes away.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use re_proto::packets::{id, Serverbound};
use re_proto::{Packet, PacketWriter};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc, watch, Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::error::RelayError;
use crate::remap::Remapper;
use crate::world::{IngestStats, WorldState};

/// Tuning knobs for attached sessions.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Delay between login success and snapshot replay. Gives the client
    /// time to switch into the play state.
    pub attach_grace: Duration,
    /// Live packets buffered per downstream before it is considered lagged.
    pub feed_capacity: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            attach_grace: Duration::from_millis(100),
            feed_capacity: 4096,
        }
    }
}

/// The upstream player's profile, handed to every downstream on login.
#[derive(Debug, Clone)]
pub struct Identity {
    /// Dashed UUID string exactly as the upstream sent it.
    pub uuid: String,
    pub username: String,
}

/// Channel ends of an attached downstream connection. Whatever sits behind
/// them (socket, framing) is up to the caller.
#[derive(Debug)]
pub struct Downstream {
    /// Packets to the downstream client. Sends wait for capacity.
    pub tx: mpsc::Sender<Packet>,
    /// Packets from the downstream client, already decoded.
    pub rx: mpsc::Receiver<Packet>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Attaching,
    Replaying,
    Live,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Attaching => "attaching",
            Self::Replaying => "replaying",
            Self::Live => "live",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

struct Shared {
    state: Mutex<WorldState>,
    upstream_tx: mpsc::Sender<Packet>,
    feed: broadcast::Sender<Packet>,
    shutdown: watch::Sender<bool>,
    identity: Identity,
    config: RelayConfig,
}

/// Cloneable handle to the relay.
#[derive(Clone)]
pub struct Relay {
    shared: Arc<Shared>,
}

impl Relay {
    /// `upstream_tx` carries packets to the upstream server.
    pub fn new(identity: Identity, config: RelayConfig, upstream_tx: mpsc::Sender<Packet>) -> Self {
        let (feed, _) = broadcast::channel(config.feed_capacity.max(1));
        let (shutdown, _) = watch::channel(false);
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(WorldState::new()),
                upstream_tx,
                feed,
                shutdown,
                identity,
                config,
            }),
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.shared.identity
    }

    /// Lock the world state. Ingestion waits while the guard is held.
    pub async fn state(&self) -> MutexGuard<'_, WorldState> {
        self.shared.state.lock().await
    }

    pub async fn stats(&self) -> IngestStats {
        self.state().await.stats()
    }

    /// Apply one upstream packet and publish it to attached downstreams.
    ///
    /// Publishing happens under the state lock, so a downstream that takes
    /// its snapshot sees every packet exactly once: either folded into the
    /// snapshot or on its live feed.
    pub async fn ingest(&self, packet: Packet) -> Result<(), RelayError> {
        let reply = {
            let mut state = self.shared.state.lock().await;
            let reply = state.ingest(&packet);
            // No receivers just means nobody is attached.
            let _ = self.shared.feed.send(packet);
            reply
        };
        if let Some(reply) = reply {
            self.shared
                .upstream_tx
                .send(reply)
                .await
                .map_err(|_| RelayError::UpstreamClosed)?;
        }
        Ok(())
    }

    /// Ingest the upstream packet stream until it ends or the relay is
    /// closed, then close the relay.
    pub async fn run_upstream(&self, mut rx: mpsc::Receiver<Packet>) -> Result<(), RelayError> {
        let result = loop {
            tokio::select! {
                packet = rx.recv() => match packet {
                    Some(packet) => {
                        if let Err(e) = self.ingest(packet).await {
                            break Err(e);
                        }
                    }
                    None => break Ok(()),
                },
                _ = self.closed() => {
                    debug!("Relay closed, no longer reading upstream");
                    break Ok(());
                }
            }
        };
        info!("Upstream connection ended");
        self.close();
        result
    }

    /// End every attached session.
    pub fn close(&self) {
        self.shared.shutdown.send_replace(true);
    }

    pub fn is_closed(&self) -> bool {
        *self.shared.shutdown.borrow() || self.shared.upstream_tx.is_closed()
    }

    /// Resolves once [`close`](Self::close) has been called.
    pub async fn closed(&self) {
        let mut shutdown = self.shared.shutdown.subscribe();
        // The sender lives as long as `self`, so this only returns on close.
        let _ = shutdown.wait_for(|closed| *closed).await;
    }

    /// Attach a downstream and serve it until the session ends.
    ///
    /// The downstream is told it is entity `client_eid`, or the upstream's own
    /// id if `None`. Returns `Ok` when the downstream hangs up or the relay
    /// closes, and an error if the upstream is already gone, the downstream
    /// stops accepting packets, or it falls too far behind the live feed.
    pub async fn connect(
        &self,
        downstream: Downstream,
        client_eid: Option<i32>,
    ) -> Result<(), RelayError> {
        let mut shutdown = self.shared.shutdown.subscribe();
        if self.is_closed() {
            return Err(RelayError::UpstreamClosed);
        }
        let Downstream { tx, mut rx } = downstream;
        let mut session = SessionState::Attaching;
        debug!("Downstream session {session}");

        let identity = &self.shared.identity;
        let mut w = PacketWriter::new(id::login::LOGIN_SUCCESS);
        w.write_string(&identity.uuid).write_string(&identity.username);
        send(&tx, w.finish()).await?;

        if !self.shared.config.attach_grace.is_zero() {
            tokio::time::sleep(self.shared.config.attach_grace).await;
        }

        let (remap, snapshot, mut feed) = {
            let state = self.shared.state.lock().await;
            let remap = Remapper::new(client_eid.unwrap_or(state.self_eid));
            let snapshot: Vec<Packet> = state
                .snapshot(true)
                .iter()
                .map(|packet| remap.clientbound(&state, packet))
                .collect();
            (remap, snapshot, self.shared.feed.subscribe())
        };

        session = transition(session, SessionState::Replaying);
        info!(
            "Replaying {} packets to downstream as entity {}",
            snapshot.len(),
            remap.client_eid
        );
        for packet in snapshot {
            send(&tx, packet).await?;
        }

        session = transition(session, SessionState::Live);
        let result = loop {
            tokio::select! {
                live = feed.recv() => match live {
                    Ok(packet) => {
                        let packet = {
                            let state = self.shared.state.lock().await;
                            remap.clientbound(&state, &packet)
                        };
                        if let Err(e) = send(&tx, packet).await {
                            break Err(e);
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Downstream lagged {skipped} packets behind, dropping it");
                        break Err(RelayError::Lagged { skipped });
                    }
                    Err(RecvError::Closed) => break Ok(()),
                },
                inbound = rx.recv() => match inbound {
                    Some(packet) => {
                        // Upstream answers these on its own.
                        if packet.id == Serverbound::TeleportConfirm.id()
                            || packet.id == Serverbound::KeepAlive.id()
                        {
                            continue;
                        }
                        let packet = {
                            let mut state = self.shared.state.lock().await;
                            remap.serverbound(&mut state, &packet)
                        };
                        if self.shared.upstream_tx.send(packet).await.is_err() {
                            break Err(RelayError::UpstreamClosed);
                        }
                    }
                    None => break Ok(()),
                },
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break Ok(());
                    }
                }
            }
        };

        transition(session, SessionState::Closed);
        result
    }
}

fn transition(from: SessionState, to: SessionState) -> SessionState {
    debug!("Downstream session {from} -> {to}");
    to
}

async fn send(tx: &mpsc::Sender<Packet>, packet: Packet) -> Result<(), RelayError> {
    tx.send(packet)
        .await
        .map_err(|_| RelayError::DownstreamClosed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;
    use re_proto::packets::Clientbound;

    struct Client {
        from_relay: mpsc::Receiver<Packet>,
        to_relay: mpsc::Sender<Packet>,
    }

    fn relay(feed_capacity: usize) -> (Relay, mpsc::Receiver<Packet>) {
        let (upstream_tx, upstream_rx) = mpsc::channel(16);
        let identity = Identity {
            uuid: "069a79f4-44e9-4726-a5be-fca90e38aaf5".into(),
            username: "Notch".into(),
        };
        let config = RelayConfig {
            attach_grace: Duration::ZERO,
            feed_capacity,
        };
        (Relay::new(identity, config, upstream_tx), upstream_rx)
    }

    fn downstream(capacity: usize) -> (Downstream, Client) {
        let (tx, from_relay) = mpsc::channel(capacity);
        let (to_relay, rx) = mpsc::channel(capacity);
        (Downstream { tx, rx }, Client { from_relay, to_relay })
    }

    async fn recv(client: &mut Client) -> Packet {
        client.from_relay.recv().await.unwrap()
    }

    #[tokio::test]
    async fn attach_replays_then_goes_live() {
        let (relay, mut upstream) = relay(64);
        relay.ingest(join_game(5)).await.unwrap();

        let (down, mut client) = downstream(64);
        let session = tokio::spawn({
            let relay = relay.clone();
            async move { relay.connect(down, Some(9)).await }
        });

        let login = recv(&mut client).await;
        assert_eq!(login.id, id::login::LOGIN_SUCCESS);
        let mut r = login.reader();
        assert_eq!(r.read_string().unwrap(), "069a79f4-44e9-4726-a5be-fca90e38aaf5");
        assert_eq!(r.read_string().unwrap(), "Notch");

        let join = recv(&mut client).await;
        assert_eq!(join.id, Clientbound::JoinGame.id());
        assert_eq!(join.reader().read_i32().unwrap(), 9);
        for expected in [0x2F, 0x2E, 0x14] {
            assert_eq!(recv(&mut client).await.id, expected);
        }

        relay.ingest(velocity(5, 1, 1, 1)).await.unwrap();
        let live = recv(&mut client).await;
        assert_eq!(live.id, Clientbound::EntityVelocity.id());
        assert_eq!(live.reader().read_varint().unwrap(), 9);

        relay.ingest(keep_alive(42)).await.unwrap();
        let reply = upstream.recv().await.unwrap();
        assert_eq!(reply.id, Serverbound::KeepAlive.id());
        assert_eq!(recv(&mut client).await.id, Clientbound::KeepAlive.id());

        relay.close();
        assert!(session.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn downstream_input_reaches_upstream() {
        let (relay, mut upstream) = relay(64);
        relay.ingest(join_game(5)).await.unwrap();

        let (down, mut client) = downstream(64);
        let session = tokio::spawn({
            let relay = relay.clone();
            async move { relay.connect(down, Some(9)).await }
        });
        for _ in 0..5 {
            recv(&mut client).await;
        }

        let mut w = PacketWriter::new(Serverbound::KeepAlive.id());
        w.write_i64(1);
        client.to_relay.send(w.finish()).await.unwrap();

        let mut w = PacketWriter::new(Serverbound::EntityAction.id());
        w.write_varint(9).write_varint(1).write_varint(0);
        client.to_relay.send(w.finish()).await.unwrap();

        let mut w = PacketWriter::new(Serverbound::PlayerPosition.id());
        w.write_f64(3.0).write_f64(4.0).write_f64(5.0).write_bool(true);
        client.to_relay.send(w.finish()).await.unwrap();

        let action = upstream.recv().await.unwrap();
        assert_eq!(action.id, Serverbound::EntityAction.id());
        assert_eq!(action.reader().read_varint().unwrap(), 5);
        assert_eq!(upstream.recv().await.unwrap().id, Serverbound::PlayerPosition.id());
        assert_eq!(relay.state().await.position.x, 3.0);

        drop(client);
        assert!(session.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn default_client_eid_is_the_upstream_one() {
        let (relay, _upstream) = relay(64);
        relay.ingest(join_game(5)).await.unwrap();

        let (down, mut client) = downstream(64);
        let session = tokio::spawn({
            let relay = relay.clone();
            async move { relay.connect(down, None).await }
        });
        recv(&mut client).await;
        assert_eq!(recv(&mut client).await.reader().read_i32().unwrap(), 5);

        relay.close();
        assert!(session.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn attach_fails_once_upstream_is_gone() {
        let (relay, upstream) = relay(64);
        drop(upstream);
        let (down, _client) = downstream(8);
        assert!(matches!(
            relay.connect(down, None).await,
            Err(RelayError::UpstreamClosed)
        ));

        let (relay, _upstream) = relay_closed();
        let (down, _client) = downstream(8);
        assert!(matches!(
            relay.connect(down, None).await,
            Err(RelayError::UpstreamClosed)
        ));
    }

    fn relay_closed() -> (Relay, mpsc::Receiver<Packet>) {
        let (relay, upstream) = relay(64);
        relay.close();
        (relay, upstream)
    }

    #[tokio::test]
    async fn upstream_end_closes_sessions() {
        let (relay, _upstream) = relay(64);
        let (feed_tx, feed_rx) = mpsc::channel(8);
        let runner = tokio::spawn({
            let relay = relay.clone();
            async move { relay.run_upstream(feed_rx).await }
        });
        feed_tx.send(join_game(5)).await.unwrap();

        let (down, mut client) = downstream(64);
        let session = tokio::spawn({
            let relay = relay.clone();
            async move { relay.connect(down, Some(9)).await }
        });
        for _ in 0..5 {
            recv(&mut client).await;
        }

        drop(feed_tx);
        assert!(runner.await.unwrap().is_ok());
        assert!(relay.is_closed());
        assert!(session.await.unwrap().is_ok());
        assert_eq!(relay.stats().await.packets, 1);
    }

    #[tokio::test]
    async fn close_stops_the_upstream_reader() {
        let (relay, _upstream) = relay(64);
        let (feed_tx, feed_rx) = mpsc::channel(8);
        let runner = tokio::spawn({
            let relay = relay.clone();
            async move { relay.run_upstream(feed_rx).await }
        });
        feed_tx.send(join_game(5)).await.unwrap();

        relay.close();
        let finished = tokio::time::timeout(Duration::from_millis(500), runner).await;
        assert!(matches!(finished, Ok(Ok(Ok(())))));
        assert!(relay.is_closed());
        // held until here so the reader never saw its channel end
        drop(feed_tx);
    }

    #[tokio::test]
    async fn slow_downstream_is_dropped() {
        let (relay, _upstream) = relay(1);
        relay.ingest(join_game(5)).await.unwrap();

        let (down, mut client) = downstream(1);
        let session = tokio::spawn({
            let relay = relay.clone();
            async move { relay.connect(down, Some(9)).await }
        });
        recv(&mut client).await;
        // The join packet is only sent after the live feed is subscribed.
        recv(&mut client).await;

        for _ in 0..4 {
            relay.ingest(Packet::new(0x47, vec![0u8; 16])).await.unwrap();
        }
        while client.from_relay.recv().await.is_some() {}

        assert!(matches!(
            session.await.unwrap(),
            Err(RelayError::Lagged { skipped: 3 })
        ));
    }

    #[tokio::test]
    async fn vanished_downstream_is_an_error() {
        let (relay, _upstream) = relay(64);
        relay.ingest(join_game(5)).await.unwrap();
        let (down, client) = downstream(64);
        let Client { from_relay, to_relay: _to_relay } = client;
        drop(from_relay);
        assert!(matches!(
            relay.connect(down, Some(9)).await,
            Err(RelayError::DownstreamClosed)
        ));
    }
}
