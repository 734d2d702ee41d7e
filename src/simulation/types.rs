//! Type definitions for the simulation.
//!
//! Contains all data structures shared across the simulation including:
//! - Node records (position, radio parameters, routing state)
//! - Logical messages and their physical-layer packets
//! - Transmission records stored in the message history

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Identifier of a mesh participant. Stable for the node's lifetime.
pub type NodeId = u32;

/// Identifier of a logical message. Assigned when the message is created.
pub type MessageId = u32;

/// Minimum RSSI dominance (dB) for the capture effect. When two overlapping
/// packets arrive at a receiver closer than this, neither one captures.
pub const CAPTURE_THRESHOLD: f64 = 6.0;

/// RSSI assumed for a packet that never reached a given receiver.
pub const MISSING_RSSI: f64 = -200.0;

/// Simple 2D point in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Role of a node in the mesh. Relay eligibility is a pure function of the tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Role {
    #[default]
    Client,
    Router,
    Repeater,
}

impl Role {
    /// Routers and repeaters rebroadcast what they hear; clients never do.
    pub fn can_relay(self) -> bool {
        matches!(self, Role::Router | Role::Repeater)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Role::Client => "Client",
            Role::Router => "Router",
            Role::Repeater => "Repeater",
        };
        f.write_str(name)
    }
}

/// A mesh participant together with its routing state.
#[derive(Debug, Clone)]
pub struct Node {
    pub node_id: NodeId,
    pub position: Point,
    /// Antenna height above ground in meters.
    pub height: f64,
    /// Antenna gain in dB.
    pub antenna_gain: f64,
    /// Transmit power in dBm.
    pub tx_power: f64,
    pub role: Role,
    /// Hop limit stamped on messages this node originates.
    pub hop_limit: u8,
    /// Message ids this node has already received (dedup set).
    pub received_messages: BTreeSet<MessageId>,
    /// Ids of messages this node originated, ACKs included, in send order.
    pub sent_messages: Vec<MessageId>,
    pub total_rx: u64,
    /// Every transmission this node made, relays and ACKs included.
    pub total_tx: u64,
    pub total_relayed: u64,
    /// Accumulated time on air in milliseconds.
    pub airtime_ms: u64,
}

impl Node {
    pub fn new(node_id: NodeId, position: Point, height: f64, antenna_gain: f64, tx_power: f64, role: Role, hop_limit: u8) -> Self {
        Self {
            node_id,
            position,
            height,
            antenna_gain,
            tx_power,
            role,
            hop_limit,
            received_messages: BTreeSet::new(),
            sent_messages: Vec::new(),
            total_rx: 0,
            total_tx: 0,
            total_relayed: 0,
            airtime_ms: 0,
        }
    }

    pub fn has_received(&self, message_id: MessageId) -> bool {
        self.received_messages.contains(&message_id)
    }

    /// Mark a message as received. Returns false (and leaves counters alone)
    /// if the node had already seen it.
    pub fn mark_received(&mut self, message_id: MessageId) -> bool {
        if self.received_messages.insert(message_id) {
            self.total_rx += 1;
            true
        } else {
            false
        }
    }
}

/// Addressing of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Destination {
    Broadcast,
    Node(NodeId),
}

impl Destination {
    pub fn is_broadcast(self) -> bool {
        matches!(self, Destination::Broadcast)
    }

    pub fn node(self) -> Option<NodeId> {
        match self {
            Destination::Broadcast => None,
            Destination::Node(id) => Some(id),
        }
    }
}

impl std::fmt::Display for Destination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Destination::Broadcast => f.write_str("BROADCAST"),
            Destination::Node(id) => write!(f, "node {}", id),
        }
    }
}

/// Application port a message is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PortNum {
    #[default]
    TextMessage,
    Traceroute,
    /// Pings and acknowledgements.
    Routing,
}

impl std::fmt::Display for PortNum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PortNum::TextMessage => "TEXT_MESSAGE_APP",
            PortNum::Traceroute => "TRACEROUTE_APP",
            PortNum::Routing => "ROUTING_APP",
        };
        f.write_str(name)
    }
}

/// A logical application-level datagram.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: MessageId,
    pub sender: NodeId,
    pub destination: Destination,
    /// Remaining relay budget.
    pub hop_limit: u8,
    /// Nodes already traversed, originator first. Never holds a node twice.
    pub path: Vec<NodeId>,
    pub is_ack: bool,
    /// Set only on ACKs: the message being acknowledged.
    pub original_msg_id: Option<MessageId>,
    pub request_ack: bool,
    pub port: PortNum,
    pub text: String,
    /// Logical clock (ms) at creation.
    pub timestamp: u64,
}

impl Message {
    pub fn is_broadcast(&self) -> bool {
        self.destination.is_broadcast()
    }

    /// Append a node to the path unless it is already present.
    pub fn extend_path(&mut self, node_id: NodeId) {
        if !self.path.contains(&node_id) {
            self.path.push(node_id);
        }
    }
}

/// Physical-layer framing of one transmission attempt of a message.
#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    /// Equal to the id of the carried message.
    pub packet_id: MessageId,
    pub tx_node_id: NodeId,
    pub spreading_factor: u8,
    /// Channel bandwidth in Hz.
    pub bandwidth: u32,
    /// Carrier frequency in Hz.
    pub frequency: f64,
    pub tx_power: f64,
    pub payload_length: u32,
    pub preamble_symbols: u32,
    /// Logical start time (ms).
    pub start_time: u64,
    /// Logical end time (ms), start plus airtime.
    pub end_time: u64,
    pub rssi_at_rx: BTreeMap<NodeId, f64>,
    pub collision_at_rx: BTreeMap<NodeId, bool>,
    pub is_ack: bool,
    pub original_msg_id: Option<MessageId>,
}

impl Packet {
    pub fn rssi_at(&self, node_id: NodeId) -> f64 {
        self.rssi_at_rx.get(&node_id).copied().unwrap_or(MISSING_RSSI)
    }

    pub fn collided_at(&self, node_id: NodeId) -> bool {
        self.collision_at_rx.get(&node_id).copied().unwrap_or(false)
    }

    pub fn airtime_ms(&self) -> u64 {
        self.end_time - self.start_time
    }
}

/// One successful reception of a transmission.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reception {
    pub node_id: NodeId,
    pub distance: f64,
    pub rssi: f64,
    pub snr: f64,
}

/// Index of a record in the message history.
pub type TransmissionId = usize;

/// Result of one Transmission Engine call. Appended to the message history.
#[derive(Debug, Clone)]
pub struct TransmissionRecord {
    /// Snapshot of the message as it was put on air.
    pub message: Message,
    pub sender: NodeId,
    pub sender_position: Point,
    /// Relay depth: 0 for the originating transmission.
    pub hop: u8,
    pub receptions: Vec<Reception>,
    /// Mean RSSI over receivers, 0.0 when nobody received.
    pub average_rssi: f64,
    /// Receivers at which this packet lost a capture evaluation.
    pub collisions: usize,
    pub airtime_ms: u64,
    pub packet: Packet,
}

impl TransmissionRecord {
    pub fn receivers(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.receptions.iter().map(|r| r.node_id)
    }

    pub fn rssi_values(&self) -> impl Iterator<Item = f64> + '_ {
        self.receptions.iter().map(|r| r.rssi)
    }

    pub fn was_received_by(&self, node_id: NodeId) -> bool {
        self.receptions.iter().any(|r| r.node_id == node_id)
    }

    pub fn is_success(&self) -> bool {
        !self.receptions.is_empty()
    }
}
