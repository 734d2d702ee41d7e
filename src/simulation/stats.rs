//! Network-wide statistics and per-message route inspection.

use serde::Serialize;

use super::geometry::node_distance;
use super::network::Network;
use super::signal_calculations::{calculate_path_loss, calculate_rssi, calculate_snr, can_receive};
use super::types::{Destination, MessageId, NodeId, PortNum, TransmissionRecord};

/// Aggregate view over the nodes and the whole message history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkStats {
    pub nodes: usize,
    /// Originated data messages (ACKs excluded).
    pub data_messages: usize,
    pub acks: usize,
    /// History records, relays included.
    pub transmissions: usize,
    /// Sum of receivers over all records.
    pub receptions: usize,
    /// Mean number of receivers per record.
    pub average_reach: f64,
    /// Percentage of ordered node pairs whose link budget meets the modem sensitivity.
    pub coverage: f64,
    /// Percentage of receptions not lost to a collision.
    pub success_rate: f64,
    pub collisions: usize,
}

impl NetworkStats {
    pub fn collect(network: &Network) -> Self {
        let records = network.history().records();
        let origins: Vec<&TransmissionRecord> = records.iter().filter(|r| r.hop == 0).collect();
        let acks = origins.iter().filter(|r| r.message.is_ack).count();
        let receptions: usize = records.iter().map(|r| r.receptions.len()).sum();
        let collisions: usize = records.iter().map(|r| r.collisions).sum();

        let average_reach = if records.is_empty() { 0.0 } else { receptions as f64 / records.len() as f64 };
        let success_rate = if receptions == 0 {
            0.0
        } else {
            receptions.saturating_sub(collisions) as f64 / receptions as f64 * 100.0
        };

        Self {
            nodes: network.node_count(),
            data_messages: origins.len() - acks,
            acks,
            transmissions: records.len(),
            receptions,
            average_reach,
            coverage: coverage(network),
            success_rate,
            collisions,
        }
    }
}

impl std::fmt::Display for NetworkStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Nodes: {}", self.nodes)?;
        writeln!(f, "Messages: {} (+{} ACKs, {} transmissions)", self.data_messages, self.acks, self.transmissions)?;
        writeln!(f, "Avg reach: {:.1} nodes", self.average_reach)?;
        writeln!(f, "Coverage: {:.1}%", self.coverage)?;
        writeln!(f, "Success: {:.1}%", self.success_rate)?;
        write!(f, "Collisions: {}", self.collisions)
    }
}

fn coverage(network: &Network) -> f64 {
    let nodes: Vec<_> = network.nodes().collect();
    let total_pairs = nodes.len() * nodes.len().saturating_sub(1);
    if total_pairs == 0 {
        return 0.0;
    }
    let frequency = network.config().frequency;
    let sensitivity = network.modem().sensitivity;

    let mut reachable = 0;
    for tx in &nodes {
        for rx in &nodes {
            if tx.node_id == rx.node_id {
                continue;
            }
            let path_loss = calculate_path_loss(node_distance(tx, rx), frequency, tx.height, rx.height);
            if can_receive(calculate_rssi(tx.tx_power, tx.antenna_gain, path_loss), sensitivity) {
                reachable += 1;
            }
        }
    }
    reachable as f64 / total_pairs as f64 * 100.0
}

/// What a single reception edge represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HopKind {
    /// The originator's own transmission.
    Original,
    /// A relay of a broadcast.
    Rebroadcast,
    /// A relay of a unicast message.
    Forwarding,
    /// An explicit acknowledgement.
    Ack,
    /// A relay heard back by the originator.
    ImplicitAck,
}

impl std::fmt::Display for HopKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            HopKind::Original => "Original message",
            HopKind::Rebroadcast => "Rebroadcast",
            HopKind::Forwarding => "Forwarding message",
            HopKind::Ack => "Real ACK",
            HopKind::ImplicitAck => "Implicit ACK",
        };
        f.write_str(name)
    }
}

/// One sender→receiver edge in the route of a message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteHop {
    pub message_id: MessageId,
    pub from: NodeId,
    pub to: NodeId,
    pub kind: HopKind,
    pub destination: Destination,
    pub port: PortNum,
    /// Hop budget left on the transmission.
    pub hop_limit: u8,
    pub rssi: f64,
    pub snr: f64,
    pub collided: bool,
}

/// Every reception edge of `message_id` and of the ACKs answering it,
/// in transmission order.
pub fn route_of(network: &Network, message_id: MessageId) -> Vec<RouteHop> {
    let noise_floor = network.config().noise_floor;
    network
        .history()
        .records()
        .iter()
        .filter(|r| r.message.id == message_id || r.message.original_msg_id == Some(message_id))
        .flat_map(|record| {
            record.receptions.iter().map(move |reception| RouteHop {
                message_id: record.message.id,
                from: record.sender,
                to: reception.node_id,
                kind: hop_kind(record, reception.node_id),
                destination: record.message.destination,
                port: record.message.port,
                hop_limit: record.message.hop_limit,
                rssi: reception.rssi,
                snr: calculate_snr(reception.rssi, noise_floor),
                collided: record.packet.collided_at(reception.node_id),
            })
        })
        .collect()
}

fn hop_kind(record: &TransmissionRecord, receiver: NodeId) -> HopKind {
    let message = &record.message;
    if message.is_ack {
        HopKind::Ack
    } else if record.hop == 0 {
        HopKind::Original
    } else if receiver == message.sender {
        // Meshtastic's implicit ACK: the originator hearing its message relayed.
        // Route viewers that only know explicit ACKs show this edge as a plain
        // rebroadcast or forward instead.
        HopKind::ImplicitAck
    } else if message.is_broadcast() {
        HopKind::Rebroadcast
    } else {
        HopKind::Forwarding
    }
}
