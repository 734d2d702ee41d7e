//! The transmission engine: owns the nodes, the logical clock, the message
//! history and the in-flight packet window.
//!
//! One call to [`Network::simulate`] runs a complete relay tree:
//! 1) validate sender and destination before anything is mutated,
//! 2) put the packet on air and compute its reception set through the
//!    link-budget model,
//! 3) run collision detection against the in-flight window,
//! 4) append a [`TransmissionRecord`] and let the mesh router decide which
//!    receivers rebroadcast (see `router.rs`).
//!
//! The clock only moves forward: each packet starts at the current clock
//! (unless an explicit start is given) and the clock advances to its end.

use std::collections::BTreeMap;

use super::collision::check_collisions;
use super::config::{ModemProfile, SimConfig, validate_hop_limit};
use super::error::{SimError, SimResult};
use super::geometry::{distance_2d, distance_3d};
use super::registry::{InFlightRegistry, MessageHistory};
use super::signal_calculations::{calculate_air_time, calculate_path_loss, calculate_rssi, calculate_snr, can_receive, estimate_max_range};
use super::types::{Destination, Message, MessageId, Node, NodeId, Packet, Point, PortNum, Reception, Role, TransmissionId, TransmissionRecord};

/// Summary of a caller-facing send operation.
#[derive(Debug, Clone, PartialEq)]
pub struct SendOutcome {
    pub message_id: MessageId,
    /// At least one node received the originating transmission.
    pub delivered: bool,
    /// The unicast destination received the message on any hop.
    pub destination_reached: bool,
    /// Id of the ACK sent back, if the destination heard the first transmission.
    pub ack_message_id: Option<MessageId>,
    /// Records appended to the history by this operation, ACK included.
    pub transmissions: usize,
}

pub struct Network {
    config: SimConfig,
    modem: ModemProfile,
    nodes: BTreeMap<NodeId, Node>,
    next_node_id: NodeId,
    pub(super) history: MessageHistory,
    pub(super) in_flight: InFlightRegistry,
    sim_time: u64,
    last_message_id: MessageId,
}

impl Network {
    /// Build an empty network. Fails if the configuration does not validate.
    pub fn new(config: SimConfig) -> SimResult<Self> {
        config.validate()?;
        let modem = config.active_modem()?.clone();
        let in_flight = InFlightRegistry::new(config.in_flight_window_ms);
        log::info!(
            "Network created: modem {} (SF{}, {} kHz, sensitivity {} dBm), {} MHz",
            modem.name,
            modem.spreading_factor,
            modem.bandwidth / 1000,
            modem.sensitivity,
            config.frequency / 1e6
        );
        Ok(Self {
            config,
            modem,
            nodes: BTreeMap::new(),
            next_node_id: 0,
            history: MessageHistory::new(),
            in_flight,
            sim_time: 0,
            last_message_id: 0,
        })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn modem(&self) -> &ModemProfile {
        &self.modem
    }

    /// Current logical time in milliseconds.
    pub fn sim_time(&self) -> u64 {
        self.sim_time
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.nodes.values()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn node(&self, node_id: NodeId) -> Option<&Node> {
        self.nodes.get(&node_id)
    }

    pub fn history(&self) -> &MessageHistory {
        &self.history
    }

    pub fn record(&self, id: TransmissionId) -> Option<&TransmissionRecord> {
        self.history.get(id)
    }

    /// Number of packets currently eligible for collision checks.
    pub fn in_flight_len(&self) -> usize {
        self.in_flight.len()
    }

    /// Place a node with the configured defaults. Ids are handed out in order.
    pub fn add_node(&mut self, position: Point) -> SimResult<NodeId> {
        let node_id = self.next_node_id;
        let next_node_id = next_id_after(node_id)?;
        let node = Node::new(
            node_id,
            position,
            self.config.default_height,
            self.config.antenna_gain,
            self.config.tx_power,
            self.config.default_role,
            self.config.default_hop_limit,
        );
        log::info!(
            "Node {} added at ({:.0}, {:.0}), role {}, tx power {} dBm, max range {:.0} m",
            node_id,
            position.x,
            position.y,
            node.role,
            node.tx_power,
            self.estimate_max_range()
        );
        self.nodes.insert(node_id, node);
        self.next_node_id = next_node_id;
        Ok(node_id)
    }

    /// Insert a fully specified node, e.g. from a scene file.
    pub fn insert_node(&mut self, node: Node) -> SimResult<()> {
        if self.nodes.contains_key(&node.node_id) {
            return Err(SimError::DuplicateNode(node.node_id));
        }
        validate_hop_limit(node.hop_limit)?;
        if !(node.height.is_finite() && node.height > 0.0) {
            return Err(SimError::InvalidConfig(format!("node {} height must be positive", node.node_id)));
        }
        if !node.tx_power.is_finite() || !node.antenna_gain.is_finite() {
            return Err(SimError::InvalidConfig(format!("node {} radio parameters must be finite", node.node_id)));
        }
        self.next_node_id = self.next_node_id.max(next_id_after(node.node_id)?);
        self.nodes.insert(node.node_id, node);
        Ok(())
    }

    pub fn set_role(&mut self, node_id: NodeId, role: Role) -> SimResult<()> {
        let node = self.nodes.get_mut(&node_id).ok_or(SimError::InvalidNode(node_id))?;
        node.role = role;
        Ok(())
    }

    /// The node closest to `point` in the plane, if it lies within `max_distance`.
    pub fn nearest_node(&self, point: &Point, max_distance: f64) -> Option<NodeId> {
        self.nodes
            .values()
            .map(|n| (n.node_id, distance_2d(&n.position, point)))
            .filter(|(_, d)| *d <= max_distance)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id)
    }

    /// Display range of a node with the configured defaults on the active modem.
    pub fn estimate_max_range(&self) -> f64 {
        estimate_max_range(
            self.config.tx_power,
            self.config.antenna_gain,
            self.modem.sensitivity,
            self.config.frequency,
            self.config.default_height,
            self.config.default_height,
        )
    }

    /// Create a message originating at `sender`, allocating a fresh id.
    ///
    /// The message starts with the sender's hop limit and a single-element
    /// path. Unicast messages request an acknowledgement.
    pub fn create_message(&mut self, sender: NodeId, destination: Destination, port: PortNum) -> SimResult<Message> {
        let sender_node = self.nodes.get(&sender).ok_or(SimError::InvalidNode(sender))?;
        let hop_limit = sender_node.hop_limit;
        if let Destination::Node(dest) = destination {
            if !self.nodes.contains_key(&dest) {
                return Err(SimError::InvalidNode(dest));
            }
            if dest == sender {
                return Err(SimError::SelfTarget(sender));
            }
        }

        let id = self.next_message_id();
        let text = match (destination, port) {
            (Destination::Broadcast, _) => format!("Broadcast {}", id),
            (Destination::Node(dest), PortNum::TextMessage) => format!("DM: {}→{}", sender, dest),
            (Destination::Node(dest), PortNum::Traceroute) => format!("Traceroute: {}→{}", sender, dest),
            (Destination::Node(dest), PortNum::Routing) => format!("Ping: {}→{}", sender, dest),
        };

        Ok(Message {
            id,
            sender,
            destination,
            hop_limit,
            path: vec![sender],
            is_ack: false,
            original_msg_id: None,
            request_ack: !destination.is_broadcast(),
            port,
            text,
            timestamp: self.sim_time,
        })
    }

    /// Transmit `message` from `sender` at relay depth `hop`, then run the
    /// relay tree it triggers to completion.
    ///
    /// Broadcast and ACK handling follow the message's `destination` and
    /// `is_ack`. Returns whether anyone received the first transmission.
    pub fn simulate(&mut self, message: Message, sender: NodeId, hop: u8) -> SimResult<bool> {
        let start_time = self.sim_time;
        self.simulate_at(message, sender, hop, start_time)
    }

    /// Like [`Network::simulate`], with the first packet starting at
    /// `start_time`. An earlier start than the clock models a transmitter
    /// keying up while other packets are still on air.
    pub fn simulate_at(&mut self, message: Message, sender: NodeId, hop: u8, start_time: u64) -> SimResult<bool> {
        self.check_actors(&message, sender, hop)?;
        self.run_relay_tree(message, sender, hop, start_time)
    }

    /// Broadcast a fresh text message from `sender`.
    pub fn send_broadcast(&mut self, sender: NodeId) -> SimResult<SendOutcome> {
        let message = self.create_message(sender, Destination::Broadcast, PortNum::TextMessage)?;
        let message_id = message.id;
        let records_before = self.history.len();
        let delivered = self.simulate(message, sender, 0)?;
        Ok(SendOutcome {
            message_id,
            delivered,
            destination_reached: false,
            ack_message_id: None,
            transmissions: self.history.len() - records_before,
        })
    }

    /// Send a unicast message and, if the destination heard the first
    /// transmission, the acknowledgement back to the sender.
    pub fn send_direct(&mut self, sender: NodeId, destination: NodeId, port: PortNum) -> SimResult<SendOutcome> {
        let message = self.create_message(sender, Destination::Node(destination), port)?;
        let message_id = message.id;
        let request_ack = message.request_ack;
        let records_before = self.history.len();

        let delivered = self.simulate(message, sender, 0)?;

        let heard_directly = self.history.origin_of(message_id).is_some_and(|r| r.was_received_by(destination));
        let destination_reached = self.history.transmissions_of(message_id).any(|r| r.was_received_by(destination));

        let ack_message_id = if request_ack && delivered && heard_directly {
            Some(self.send_ack(destination, sender, message_id)?.message_id)
        } else {
            None
        };

        Ok(SendOutcome {
            message_id,
            delivered,
            destination_reached,
            ack_message_id,
            transmissions: self.history.len() - records_before,
        })
    }

    pub fn send_dm(&mut self, sender: NodeId, destination: NodeId) -> SimResult<SendOutcome> {
        self.send_direct(sender, destination, PortNum::TextMessage)
    }

    pub fn send_traceroute(&mut self, sender: NodeId, destination: NodeId) -> SimResult<SendOutcome> {
        self.send_direct(sender, destination, PortNum::Traceroute)
    }

    pub fn send_ping(&mut self, sender: NodeId, destination: NodeId) -> SimResult<SendOutcome> {
        self.send_direct(sender, destination, PortNum::Routing)
    }

    /// Remove every node, record and in-flight packet, and rewind the clock
    /// and id counters. Configuration is kept.
    pub fn reset(&mut self) {
        self.nodes.clear();
        self.history.clear();
        self.in_flight.clear();
        self.next_node_id = 0;
        self.sim_time = 0;
        self.last_message_id = 0;
        log::info!("Network reset");
    }

    pub(super) fn next_message_id(&mut self) -> MessageId {
        self.last_message_id += 1;
        self.last_message_id
    }

    /// Preconditions of a transmission, checked before any mutation.
    fn check_actors(&self, message: &Message, sender: NodeId, hop: u8) -> SimResult<()> {
        if !self.nodes.contains_key(&sender) {
            return Err(SimError::InvalidNode(sender));
        }
        if let Destination::Node(dest) = message.destination {
            if !self.nodes.contains_key(&dest) {
                return Err(SimError::InvalidNode(dest));
            }
            // A relaying destination may rebroadcast; only the originator is barred.
            if dest == message.sender || (hop == 0 && dest == sender) {
                return Err(SimError::SelfTarget(dest));
            }
        }
        Ok(())
    }

    /// Put one packet on air and record its outcome.
    ///
    /// Every other node that has not yet seen the message gets an RSSI entry
    /// in the packet; those at or above the modem sensitivity receive it.
    pub(super) fn transmit(&mut self, message: &Message, sender_id: NodeId, hop: u8, start_time: u64) -> SimResult<TransmissionId> {
        let sender = self.nodes.get(&sender_id).ok_or(SimError::InvalidNode(sender_id))?;
        let sender_position = sender.position;
        let sender_height = sender.height;
        let sender_tx_power = sender.tx_power;
        let sender_gain = sender.antenna_gain;

        let airtime_ms = calculate_air_time(
            self.config.payload_length,
            self.modem.spreading_factor,
            self.modem.bandwidth,
            self.modem.coding_rate,
            self.config.preamble_symbols,
            self.config.header_length,
        );

        let mut packet = Packet {
            packet_id: message.id,
            tx_node_id: sender_id,
            spreading_factor: self.modem.spreading_factor,
            bandwidth: self.modem.bandwidth,
            frequency: self.config.frequency,
            tx_power: sender_tx_power,
            payload_length: self.config.payload_length,
            preamble_symbols: self.config.preamble_symbols,
            start_time,
            end_time: start_time + airtime_ms,
            rssi_at_rx: BTreeMap::new(),
            collision_at_rx: BTreeMap::new(),
            is_ack: message.is_ack,
            original_msg_id: message.original_msg_id,
        };
        self.sim_time = self.sim_time.max(packet.end_time);

        log::info!(
            "Message #{} from node {} at ({:.0}, {:.0}){}{}: {} | hop limit {} | airtime {} ms",
            message.id,
            sender_id,
            sender_position.x,
            sender_position.y,
            if hop > 0 { format!(" [hop {}]", hop) } else { String::new() },
            if message.is_ack { " [ACK]" } else { "" },
            message.destination,
            message.hop_limit,
            airtime_ms
        );

        let mut receptions = Vec::new();
        for node in self.nodes.values_mut() {
            if node.node_id == sender_id || node.has_received(message.id) {
                continue;
            }

            let distance = distance_3d(&sender_position, sender_height, &node.position, node.height);
            let path_loss = calculate_path_loss(distance, self.config.frequency, sender_height, node.height);
            let rssi = calculate_rssi(sender_tx_power, sender_gain, path_loss);
            packet.rssi_at_rx.insert(node.node_id, rssi);
            packet.collision_at_rx.insert(node.node_id, false);

            if can_receive(rssi, self.modem.sensitivity) {
                let snr = calculate_snr(rssi, self.config.noise_floor);
                node.mark_received(message.id);
                receptions.push(Reception {
                    node_id: node.node_id,
                    distance,
                    rssi,
                    snr,
                });
                log::debug!("  received by node {}: {:.0} m, RSSI {:.1} dBm, SNR {:.1} dB", node.node_id, distance, rssi, snr);
            } else {
                log::debug!(
                    "  out of range: node {} (RSSI {:.1} dBm < {} dBm)",
                    node.node_id,
                    rssi,
                    self.modem.sensitivity
                );
            }
        }

        let collisions = check_collisions(&mut packet, self.in_flight.packets_mut(&mut self.history));
        if collisions > 0 {
            log::warn!("Message #{} from node {} collided at {} receiver(s)", message.id, sender_id, collisions);
        }

        let average_rssi = if receptions.is_empty() {
            log::warn!("Message #{} from node {}: no node received the transmission", message.id, sender_id);
            0.0
        } else {
            let avg = receptions.iter().map(|r| r.rssi).sum::<f64>() / receptions.len() as f64;
            log::info!("Message #{} received by {} node(s), average RSSI {:.1} dBm", message.id, receptions.len(), avg);
            avg
        };

        if let Some(sender) = self.nodes.get_mut(&sender_id) {
            sender.total_tx += 1;
            sender.airtime_ms += airtime_ms;
            if hop > 0 {
                sender.total_relayed += 1;
            } else if message.sender == sender_id {
                sender.sent_messages.push(message.id);
            }
        }

        let id = self.history.push(TransmissionRecord {
            message: message.clone(),
            sender: sender_id,
            sender_position,
            hop,
            receptions,
            average_rssi,
            collisions,
            airtime_ms: packet.airtime_ms(),
            packet,
        });
        self.in_flight.insert(id);
        self.in_flight.evict(self.sim_time, &self.history);
        Ok(id)
    }
}

/// The id `add_node` hands out after `node_id`. `NodeId::MAX` is never assigned.
fn next_id_after(node_id: NodeId) -> SimResult<NodeId> {
    node_id
        .checked_add(1)
        .ok_or_else(|| SimError::InvalidConfig(format!("node id {} leaves no room for further ids", node_id)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn network() -> Network {
        Network::new(SimConfig::default()).unwrap()
    }

    fn line(network: &mut Network, xs: &[f64]) -> Vec<NodeId> {
        xs.iter().map(|&x| network.add_node(Point::new(x, 0.0)).unwrap()).collect()
    }

    #[test]
    fn broadcast_reaches_nodes_in_range_only() {
        let mut net = network();
        let ids = line(&mut net, &[0.0, 500.0, 1000.0, 5000.0]);

        let outcome = net.send_broadcast(ids[0]).unwrap();

        assert!(outcome.delivered);
        let record = net.history().origin_of(outcome.message_id).unwrap();
        let receivers: Vec<NodeId> = record.receivers().collect();
        assert_eq!(receivers, vec![ids[1], ids[2]]);
        assert_eq!(record.collisions, 0);
        assert_eq!(record.airtime_ms, 681);
        // The far node still gets an RSSI entry, it just cannot demodulate.
        assert!(record.packet.rssi_at_rx.contains_key(&ids[3]));
        assert!(record.packet.rssi_at(ids[3]) < -131.5);
        assert!(!net.node(ids[3]).unwrap().has_received(outcome.message_id));
    }

    #[test]
    fn record_carries_rssi_snr_and_average() {
        let mut net = network();
        let ids = line(&mut net, &[0.0, 500.0, 1000.0]);
        let outcome = net.send_broadcast(ids[0]).unwrap();
        let record = net.history().origin_of(outcome.message_id).unwrap();

        let rssi: Vec<f64> = record.rssi_values().collect();
        assert!((rssi[0] - (30.0 - calculate_path_loss(500.0, 915e6, 1.0, 1.0))).abs() < 1e-9);
        assert!((record.average_rssi - (rssi[0] + rssi[1]) / 2.0).abs() < 1e-9);
        for reception in &record.receptions {
            assert!((reception.snr - (reception.rssi + 119.25)).abs() < 1e-9);
        }
    }

    #[test]
    fn clock_advances_by_airtime() {
        let mut net = network();
        let ids = line(&mut net, &[0.0, 500.0]);
        net.send_broadcast(ids[0]).unwrap();
        assert_eq!(net.sim_time(), 681);
        net.send_broadcast(ids[1]).unwrap();
        assert_eq!(net.sim_time(), 1362);
        let starts: Vec<u64> = net.history().records().iter().map(|r| r.packet.start_time).collect();
        assert_eq!(starts, vec![0, 681]);
    }

    #[test]
    fn isolated_sender_reports_failure() {
        let mut net = network();
        let ids = line(&mut net, &[0.0, 8000.0]);
        let outcome = net.send_broadcast(ids[0]).unwrap();
        assert!(!outcome.delivered);
        let record = net.history().origin_of(outcome.message_id).unwrap();
        assert_eq!(record.average_rssi, 0.0);
        assert!(!record.is_success());
    }

    #[test]
    fn unknown_sender_fails_without_mutation() {
        let mut net = network();
        let ids = line(&mut net, &[0.0, 500.0]);
        let message = net.create_message(ids[0], Destination::Broadcast, PortNum::TextMessage).unwrap();

        assert_eq!(net.simulate(message, 42, 0), Err(SimError::InvalidNode(42)));
        assert!(net.history().is_empty());
        assert_eq!(net.sim_time(), 0);
        assert_eq!(net.node(ids[1]).unwrap().total_rx, 0);
    }

    #[test]
    fn unknown_destination_is_rejected() {
        let mut net = network();
        let ids = line(&mut net, &[0.0, 500.0]);
        assert_eq!(net.send_dm(ids[0], 99), Err(SimError::InvalidNode(99)));
        assert!(net.history().is_empty());
    }

    #[test]
    fn unicast_to_self_is_rejected() {
        let mut net = network();
        let ids = line(&mut net, &[0.0, 500.0]);
        assert_eq!(net.send_dm(ids[0], ids[0]), Err(SimError::SelfTarget(ids[0])));

        let mut message = net.create_message(ids[0], Destination::Node(ids[1]), PortNum::TextMessage).unwrap();
        message.destination = Destination::Node(ids[0]);
        assert_eq!(net.simulate(message, ids[0], 0), Err(SimError::SelfTarget(ids[0])));
        assert!(net.history().is_empty());
    }

    #[test]
    fn message_ids_increase_at_creation() {
        let mut net = network();
        let ids = line(&mut net, &[0.0, 500.0]);
        let first = net.create_message(ids[0], Destination::Broadcast, PortNum::TextMessage).unwrap();
        let second = net.create_message(ids[1], Destination::Node(ids[0]), PortNum::Traceroute).unwrap();
        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(first.path, vec![ids[0]]);
        assert!(second.request_ack);
        assert_eq!(second.text, "Traceroute: 1→0");
        assert_eq!(second.hop_limit, 3);
    }

    #[test]
    fn counters_track_sent_and_received() {
        let mut net = network();
        let ids = line(&mut net, &[0.0, 500.0]);
        let outcome = net.send_broadcast(ids[0]).unwrap();

        let sender = net.node(ids[0]).unwrap();
        assert_eq!(sender.total_tx, 1);
        assert_eq!(sender.sent_messages, vec![outcome.message_id]);
        assert_eq!(sender.airtime_ms, 681);
        let receiver = net.node(ids[1]).unwrap();
        assert_eq!(receiver.total_rx, 1);
        assert!(receiver.has_received(outcome.message_id));
    }

    #[test]
    fn already_received_nodes_are_skipped() {
        let mut net = network();
        let ids = line(&mut net, &[0.0, 500.0]);
        let message = net.create_message(ids[0], Destination::Broadcast, PortNum::TextMessage).unwrap();

        assert!(net.simulate(message.clone(), ids[0], 0).unwrap());
        assert!(!net.simulate(message.clone(), ids[0], 0).unwrap());

        assert_eq!(net.node(ids[1]).unwrap().total_rx, 1);
        let second = &net.history().records()[1];
        assert!(!second.packet.rssi_at_rx.contains_key(&ids[1]));
    }

    #[test]
    fn concurrent_packets_collide_at_shared_receiver() {
        // Two senders equidistant from a receiver key up at the same time.
        let mut net = network();
        let a = net.add_node(Point::new(-500.0, 0.0)).unwrap();
        let rx = net.add_node(Point::new(0.0, 0.0)).unwrap();
        let b = net.add_node(Point::new(500.0, 0.0)).unwrap();

        let first = net.create_message(a, Destination::Broadcast, PortNum::TextMessage).unwrap();
        let second = net.create_message(b, Destination::Broadcast, PortNum::TextMessage).unwrap();
        net.simulate_at(first, a, 0, 0).unwrap();
        net.simulate_at(second, b, 0, 0).unwrap();

        let records = net.history().records();
        assert!(records[0].packet.collided_at(rx));
        assert!(records[1].packet.collided_at(rx));
        assert!(records[1].collisions >= 1);
        // Collision is a statistic: the receiver still counts both receptions.
        assert!(records[0].was_received_by(rx));
        assert!(records[1].was_received_by(rx));
        assert_eq!(net.sim_time(), 681);
    }

    #[test]
    fn sequential_packets_do_not_collide() {
        let mut net = network();
        let a = net.add_node(Point::new(-500.0, 0.0)).unwrap();
        net.add_node(Point::new(0.0, 0.0)).unwrap();
        let b = net.add_node(Point::new(500.0, 0.0)).unwrap();

        net.send_broadcast(a).unwrap();
        net.send_broadcast(b).unwrap();

        assert!(net.history().records().iter().all(|r| r.collisions == 0));
    }

    #[test]
    fn in_flight_window_is_bounded() {
        let config = SimConfig {
            in_flight_window_ms: 1000,
            ..SimConfig::default()
        };
        let mut net = Network::new(config).unwrap();
        let ids = line(&mut net, &[0.0, 500.0]);
        for _ in 0..10 {
            net.send_broadcast(ids[0]).unwrap();
        }
        assert_eq!(net.history().len(), 10);
        // 681 ms packets: only those ending within the last second survive.
        assert!(net.in_flight_len() <= 2);
    }

    #[test]
    fn reset_clears_everything() {
        let mut net = network();
        let ids = line(&mut net, &[0.0, 500.0]);
        net.send_broadcast(ids[0]).unwrap();

        net.reset();

        assert_eq!(net.node_count(), 0);
        assert!(net.history().is_empty());
        assert_eq!(net.in_flight_len(), 0);
        assert_eq!(net.sim_time(), 0);
        assert_eq!(net.add_node(Point::new(0.0, 0.0)).unwrap(), 0);
        let id = net.add_node(Point::new(10.0, 0.0)).unwrap();
        assert_eq!(net.create_message(id, Destination::Broadcast, PortNum::TextMessage).unwrap().id, 1);
    }

    #[test]
    fn insert_node_rejects_duplicates_and_bad_hop_limits() {
        let mut net = network();
        let id = net.add_node(Point::new(0.0, 0.0)).unwrap();
        let duplicate = Node::new(id, Point::new(1.0, 1.0), 1.0, 0.0, 30.0, Role::Client, 3);
        assert_eq!(net.insert_node(duplicate), Err(SimError::DuplicateNode(id)));

        let runaway = Node::new(9, Point::new(1.0, 1.0), 1.0, 0.0, 30.0, Role::Router, 40);
        assert!(matches!(net.insert_node(runaway), Err(SimError::InvalidConfig(_))));

        let placed = Node::new(9, Point::new(1.0, 1.0), 1.0, 0.0, 30.0, Role::Router, 3);
        net.insert_node(placed).unwrap();
        assert_eq!(net.add_node(Point::new(2.0, 2.0)).unwrap(), 10);
    }

    #[test]
    fn id_space_exhaustion_is_an_error() {
        let mut net = network();
        let reserved = Node::new(NodeId::MAX, Point::new(0.0, 0.0), 1.0, 0.0, 30.0, Role::Client, 3);
        assert!(matches!(net.insert_node(reserved), Err(SimError::InvalidConfig(_))));
        assert_eq!(net.node_count(), 0);

        let last = Node::new(NodeId::MAX - 1, Point::new(0.0, 0.0), 1.0, 0.0, 30.0, Role::Client, 3);
        net.insert_node(last).unwrap();
        assert!(matches!(net.add_node(Point::new(5.0, 0.0)), Err(SimError::InvalidConfig(_))));
        assert_eq!(net.node_count(), 1);
    }

    #[test]
    fn non_finite_node_parameters_are_rejected() {
        let mut net = network();
        let nan_height = Node::new(1, Point::new(0.0, 0.0), f64::NAN, 0.0, 30.0, Role::Client, 3);
        assert!(matches!(net.insert_node(nan_height), Err(SimError::InvalidConfig(_))));
        let nan_power = Node::new(2, Point::new(0.0, 0.0), 1.0, 0.0, f64::NAN, Role::Client, 3);
        assert!(matches!(net.insert_node(nan_power), Err(SimError::InvalidConfig(_))));
        let infinite_gain = Node::new(3, Point::new(0.0, 0.0), 1.0, f64::INFINITY, 30.0, Role::Client, 3);
        assert!(matches!(net.insert_node(infinite_gain), Err(SimError::InvalidConfig(_))));
        assert_eq!(net.node_count(), 0);
    }

    #[test]
    fn nearest_node_within_click_radius() {
        let mut net = network();
        let ids = line(&mut net, &[0.0, 500.0]);
        assert_eq!(net.nearest_node(&Point::new(480.0, 30.0), 100.0), Some(ids[1]));
        assert_eq!(net.nearest_node(&Point::new(250.0, 0.0), 100.0), None);
    }

    #[test]
    fn heights_change_the_link_budget() {
        let mut net = network();
        let low = net.add_node(Point::new(0.0, 0.0)).unwrap();
        let tall = Node::new(5, Point::new(1500.0, 0.0), 10.0, 0.0, 30.0, Role::Client, 3);
        net.insert_node(tall).unwrap();
        let ground = net.add_node(Point::new(-1500.0, 0.0)).unwrap();

        net.send_broadcast(low).unwrap();

        let record = &net.history().records()[0];
        assert!(record.packet.rssi_at(5) != record.packet.rssi_at(ground));
    }
}
