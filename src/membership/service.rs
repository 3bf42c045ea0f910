use anyhow::Result;
use dashmap::DashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::sync::RwLock;

use super::types::{GossipMessage, Member, MemberId, MemberState};
use super::view::MemberView;

const GOSSIP_INTERVAL: Duration = Duration::from_millis(500);
const FAILURE_DETECTION_INTERVAL: Duration = Duration::from_secs(2);
const SUSPECT_TIMEOUT: Duration = Duration::from_secs(5);
const DEAD_TIMEOUT: Duration = Duration::from_secs(10);

pub struct MembershipService {
    pub local_member: Member,
    pub members: Arc<DashMap<MemberId, Member>>,
    socket: Arc<UdpSocket>,
    incarnation: Arc<RwLock<u64>>,
}

impl MembershipService {
    /// Binds the gossip socket and announces this replica to every seed.
    ///
    /// `http_addr` is advertised to peers so that partition ownership can be
    /// translated into a queryable host.
    pub async fn new(
        gossip_addr: SocketAddr,
        http_addr: SocketAddr,
        seeds: Vec<SocketAddr>,
    ) -> Result<Arc<Self>> {
        let socket = UdpSocket::bind(gossip_addr).await?;
        let gossip_addr = socket.local_addr()?;

        let local_member = Member::gossiping(gossip_addr, http_addr);
        let members = Arc::new(DashMap::new());
        members.insert(local_member.id.clone(), local_member.clone());

        if !seeds.is_empty() {
            tracing::info!("Joining cluster via {} seed replica(s)", seeds.len());

            let encoded = bincode::serialize(&GossipMessage::Join {
                member: local_member.clone(),
            })?;
            for seed in seeds.iter() {
                socket.send_to(&encoded, seed).await?;
                tracing::info!("Sent join request to {}", seed);
            }
        }

        Ok(Arc::new(Self {
            local_member,
            members,
            socket: Arc::new(socket),
            incarnation: Arc::new(RwLock::new(1)),
        }))
    }

    pub async fn start(self: Arc<Self>) {
        tracing::info!("Starting membership service...");

        tokio::spawn(self.clone().gossip_loop());
        tokio::spawn(self.clone().receive_loop());
        tokio::spawn(self.clone().failure_detection_loop());

        tracing::info!("Membership background tasks started");
    }

    pub fn get_alive_members(&self) -> Vec<Member> {
        self.members
            .iter()
            .filter(|entry| entry.value().is_alive())
            .map(|entry| entry.value().clone())
            .collect()
    }

    async fn gossip_loop(self: Arc<Self>) {
        let mut interval = tokio::time::interval(GOSSIP_INTERVAL);

        loop {
            interval.tick().await;

            let peers: Vec<Member> = self
                .members
                .iter()
                .filter(|entry| {
                    entry.value().id != self.local_member.id && entry.value().is_alive()
                })
                .map(|entry| entry.value().clone())
                .collect();

            if peers.is_empty() {
                continue;
            }

            let target = {
                use rand::Rng;
                let idx = rand::thread_rng().gen_range(0..peers.len());
                peers[idx].clone()
            };

            let msg = GossipMessage::Ping {
                from: self.local_member.id.clone(),
                incarnation: *self.incarnation.read().await,
            };

            match bincode::serialize(&msg) {
                Ok(encoded) => {
                    if let Err(e) = self.socket.send_to(&encoded, target.gossip_addr).await {
                        tracing::warn!("Failed to send ping to {:?}: {}", target.id, e);
                    }
                }
                Err(e) => tracing::error!("Failed to serialize ping: {}", e),
            }
        }
    }

    async fn receive_loop(self: Arc<Self>) {
        let mut buf = vec![0u8; 65536];

        loop {
            match self.socket.recv_from(&mut buf).await {
                Ok((len, src)) => match bincode::deserialize::<GossipMessage>(&buf[..len]) {
                    Ok(msg) => {
                        if let Err(e) = self.handle_message(msg, src).await {
                            tracing::error!("Error handling gossip from {}: {}", src, e);
                        }
                    }
                    Err(e) => {
                        tracing::warn!("Failed to deserialize gossip from {}: {}", src, e);
                    }
                },
                Err(e) => {
                    tracing::error!("Failed to receive UDP packet: {}", e);
                    tokio::time::sleep(Duration::from_millis(100)).await;
                }
            }
        }
    }

    pub(crate) async fn handle_message(&self, msg: GossipMessage, src: SocketAddr) -> Result<()> {
        match msg {
            GossipMessage::Ping { from, incarnation } => {
                self.handle_ping(from, incarnation, src).await?
            }
            GossipMessage::Ack {
                from,
                incarnation,
                members,
            } => self.handle_ack(from, incarnation, members),
            GossipMessage::Join { member } => self.handle_join(member),
            GossipMessage::Suspect {
                member_id,
                incarnation,
            } => self.handle_suspect(member_id, incarnation).await,
            GossipMessage::Alive {
                member_id,
                incarnation,
            } => self.handle_alive(member_id, incarnation),
        }

        Ok(())
    }

    async fn handle_ping(&self, from: MemberId, incarnation: u64, src: SocketAddr) -> Result<()> {
        match self.members.get_mut(&from) {
            Some(mut member) => {
                member.last_seen = Some(Instant::now());
                if incarnation > member.incarnation {
                    member.incarnation = incarnation;
                }
            }
            None => {
                // The HTTP address is unknown until the next ack carries the full record.
                tracing::debug!("Ping from unknown replica {:?} at {}", from, src);
            }
        }

        let reply = GossipMessage::Ack {
            from: self.local_member.id.clone(),
            incarnation: *self.incarnation.read().await,
            members: self.members.iter().map(|e| e.value().clone()).collect(),
        };

        let encoded = bincode::serialize(&reply)?;
        self.socket.send_to(&encoded, src).await?;

        Ok(())
    }

    fn handle_ack(&self, from: MemberId, incarnation: u64, members: Vec<Member>) {
        if let Some(mut member) = self.members.get_mut(&from) {
            member.last_seen = Some(Instant::now());
            if incarnation > member.incarnation {
                member.incarnation = incarnation;
            }
        }

        for member in members {
            self.merge_member(member);
        }
    }

    pub(crate) fn merge_member(&self, incoming: Member) {
        match self.members.get_mut(&incoming.id) {
            Some(mut existing) => {
                if incoming.incarnation > existing.incarnation {
                    tracing::debug!(
                        "Updating {:?}: inc {} -> {}",
                        incoming.id,
                        existing.incarnation,
                        incoming.incarnation
                    );
                    existing.state = incoming.state;
                    existing.incarnation = incoming.incarnation;
                    existing.last_seen = Some(Instant::now());
                } else if incoming.incarnation == existing.incarnation
                    && incoming.state == MemberState::Alive
                    && existing.state == MemberState::Suspect
                {
                    tracing::info!("{:?} refuted suspicion", incoming.id);
                    existing.state = MemberState::Alive;
                    existing.last_seen = Some(Instant::now());
                }
            }
            None => {
                tracing::info!(
                    "Discovered replica {:?} (gossip={}, http={})",
                    incoming.id,
                    incoming.gossip_addr,
                    incoming.http_addr
                );
                let mut member = incoming;
                member.last_seen = Some(Instant::now());
                self.members.insert(member.id.clone(), member);
            }
        }
    }

    async fn handle_suspect(&self, member_id: MemberId, incarnation: u64) {
        if member_id == self.local_member.id {
            let refuted = {
                let mut inc = self.incarnation.write().await;
                if incarnation < *inc {
                    return;
                }
                *inc = incarnation + 1;
                *inc
            };
            tracing::info!("Refuting suspicion about this replica (inc={})", refuted);

            if let Some(mut me) = self.members.get_mut(&member_id) {
                me.incarnation = refuted;
                me.state = MemberState::Alive;
            }
            self.broadcast_message(GossipMessage::Alive {
                member_id,
                incarnation: refuted,
            })
            .await;
            return;
        }

        match self.members.get_mut(&member_id) {
            Some(mut existing) if incarnation >= existing.incarnation => {
                if existing.state == MemberState::Alive {
                    tracing::info!("Replica {:?} at {} suspected", existing.id, existing.http_addr);
                    existing.state = MemberState::Suspect;
                }
                existing.incarnation = incarnation;
            }
            Some(_) => {}
            None => tracing::debug!("Suspected replica {:?} is unknown", member_id),
        }
    }

    fn handle_alive(&self, member_id: MemberId, incarnation: u64) {
        match self.members.get_mut(&member_id) {
            Some(mut existing) => {
                if incarnation > existing.incarnation
                    || (incarnation == existing.incarnation
                        && existing.state == MemberState::Suspect)
                {
                    tracing::info!(
                        "Replica {:?} at {} is alive (inc={})",
                        existing.id,
                        existing.http_addr,
                        incarnation
                    );
                    existing.state = MemberState::Alive;
                    existing.incarnation = incarnation;
                    existing.last_seen = Some(Instant::now());
                }
            }
            None => tracing::debug!("Alive message for unknown replica {:?}", member_id),
        }
    }

    pub(crate) fn handle_join(&self, mut member: Member) {
        tracing::info!(
            "Replica {:?} joining cluster (http={})",
            member.id,
            member.http_addr
        );

        member.last_seen = Some(Instant::now());
        self.members.insert(member.id.clone(), member);

        tracing::info!("Cluster size now: {}", self.members.len());
    }

    async fn failure_detection_loop(self: Arc<Self>) {
        let mut interval = tokio::time::interval(FAILURE_DETECTION_INTERVAL);

        loop {
            interval.tick().await;
            let now = Instant::now();
            let mut to_broadcast = Vec::new();

            for mut entry in self.members.iter_mut() {
                let member = entry.value_mut();
                if member.id == self.local_member.id {
                    continue;
                }

                let Some(last_seen) = member.last_seen else {
                    member.last_seen = Some(now);
                    continue;
                };
                let elapsed = now.duration_since(last_seen);

                match member.state {
                    MemberState::Alive if elapsed > SUSPECT_TIMEOUT => {
                        tracing::warn!(
                            "Replica {:?} suspected (no contact for {:?})",
                            member.id,
                            elapsed
                        );
                        member.state = MemberState::Suspect;
                        to_broadcast.push(GossipMessage::Suspect {
                            member_id: member.id.clone(),
                            incarnation: member.incarnation,
                        });
                    }
                    MemberState::Suspect if elapsed > DEAD_TIMEOUT => {
                        tracing::info!(
                            "Replica {:?} declared dead (no contact for {:?})",
                            member.id,
                            elapsed
                        );
                        member.state = MemberState::Dead;
                    }
                    _ => {}
                }
            }

            for msg in to_broadcast {
                self.broadcast_message(msg).await;
            }
        }
    }

    async fn broadcast_message(&self, msg: GossipMessage) {
        let Ok(encoded) = bincode::serialize(&msg) else {
            tracing::error!("Failed to serialize gossip broadcast");
            return;
        };

        let targets: Vec<SocketAddr> = self
            .members
            .iter()
            .filter(|e| e.value().id != self.local_member.id)
            .filter(|e| e.value().is_alive())
            .map(|e| e.value().gossip_addr)
            .collect();

        for addr in targets {
            if let Err(e) = self.socket.send_to(&encoded, addr).await {
                tracing::warn!("Failed to broadcast to {}: {}", addr, e);
            }
        }
    }
}

impl MemberView for MembershipService {
    fn local_member(&self) -> Member {
        self.local_member.clone()
    }

    fn alive_members(&self) -> Vec<Member> {
        self.get_alive_members()
    }
}
