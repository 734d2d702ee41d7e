//! Acknowledgements for unicast messages.

use super::error::{SimError, SimResult};
use super::network::{Network, SendOutcome};
use super::types::{Destination, Message, MessageId, NodeId, PortNum};

impl Network {
    /// Send the ACK for `original_msg_id` from `ack_sender` back to `destination`.
    ///
    /// The ACK is a new message with its own id on the routing port. It is
    /// transmitted once and never relayed.
    pub fn send_ack(&mut self, ack_sender: NodeId, destination: NodeId, original_msg_id: MessageId) -> SimResult<SendOutcome> {
        if self.history.origin_of(original_msg_id).is_none() {
            return Err(SimError::UnknownMessage(original_msg_id));
        }
        let hop_limit = self.node(ack_sender).ok_or(SimError::InvalidNode(ack_sender))?.hop_limit;
        if self.node(destination).is_none() {
            return Err(SimError::InvalidNode(destination));
        }
        if ack_sender == destination {
            return Err(SimError::SelfTarget(ack_sender));
        }

        let message = Message {
            id: self.next_message_id(),
            sender: ack_sender,
            destination: Destination::Node(destination),
            hop_limit,
            path: vec![ack_sender],
            is_ack: true,
            original_msg_id: Some(original_msg_id),
            request_ack: false,
            port: PortNum::Routing,
            text: format!("ACK: {}→{}", ack_sender, destination),
            timestamp: self.sim_time(),
        };
        let message_id = message.id;
        log::info!("Node {} acknowledges message #{} to node {} with ACK #{}", ack_sender, original_msg_id, destination, message_id);

        let records_before = self.history.len();
        let delivered = self.simulate(message, ack_sender, 0)?;
        let destination_reached = self.history.origin_of(message_id).is_some_and(|r| r.was_received_by(destination));
        if !destination_reached {
            log::warn!("ACK #{} for message #{} did not reach node {}", message_id, original_msg_id, destination);
        }

        Ok(SendOutcome {
            message_id,
            delivered,
            destination_reached,
            ack_message_id: None,
            transmissions: self.history.len() - records_before,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::simulation::config::SimConfig;
    use crate::simulation::error::SimError;
    use crate::simulation::network::Network;
    use crate::simulation::types::{NodeId, Point, PortNum, Role};

    fn pair(distance: f64) -> (Network, NodeId, NodeId) {
        let mut net = Network::new(SimConfig::default()).unwrap();
        let a = net.add_node(Point::new(0.0, 0.0)).unwrap();
        let b = net.add_node(Point::new(distance, 0.0)).unwrap();
        (net, a, b)
    }

    #[test]
    fn direct_message_in_range_is_acknowledged() {
        let (mut net, a, b) = pair(500.0);

        let outcome = net.send_dm(a, b).unwrap();

        assert!(outcome.delivered);
        assert!(outcome.destination_reached);
        assert_eq!(outcome.transmissions, 2);
        let ack_id = outcome.ack_message_id.unwrap();
        assert_eq!(ack_id, outcome.message_id + 1);

        let records = net.history().records();
        assert_eq!(records.len(), 2);
        let ack = &records[1];
        assert!(ack.message.is_ack);
        assert_eq!(ack.message.id, ack_id);
        assert_eq!(ack.message.original_msg_id, Some(outcome.message_id));
        assert_eq!(ack.message.port, PortNum::Routing);
        assert_eq!(ack.message.path, vec![b]);
        assert_eq!(ack.sender, b);
        assert!(ack.was_received_by(a));
        assert!(ack.packet.is_ack);
        assert_eq!(net.history().acks_for(outcome.message_id).count(), 1);
    }

    #[test]
    fn out_of_range_destination_gets_no_ack() {
        let (mut net, a, b) = pair(5000.0);

        let outcome = net.send_dm(a, b).unwrap();

        assert!(!outcome.delivered);
        assert!(!outcome.destination_reached);
        assert_eq!(outcome.ack_message_id, None);
        assert_eq!(net.history().len(), 1);
    }

    #[test]
    fn ack_is_never_relayed() {
        let (mut net, a, b) = pair(500.0);
        let relay = net.add_node(Point::new(250.0, 300.0)).unwrap();
        net.set_role(relay, Role::Router).unwrap();

        let outcome = net.send_dm(a, b).unwrap();

        let ack_id = outcome.ack_message_id.unwrap();
        let ack_records: Vec<_> = net.history().transmissions_of(ack_id).collect();
        assert_eq!(ack_records.len(), 1);
        // The router heard the ACK but did not rebroadcast it.
        assert!(ack_records[0].was_received_by(relay));
        // The original unicast was relayed by the router though.
        assert!(net.history().transmissions_of(outcome.message_id).any(|r| r.sender == relay));
    }

    #[test]
    fn destination_reached_only_through_a_relay_gets_no_ack() {
        let mut net = Network::new(SimConfig::default()).unwrap();
        let a = net.add_node(Point::new(0.0, 0.0)).unwrap();
        let router = net.add_node(Point::new(1800.0, 0.0)).unwrap();
        let b = net.add_node(Point::new(3600.0, 0.0)).unwrap();
        net.set_role(router, Role::Router).unwrap();

        let outcome = net.send_dm(a, b).unwrap();

        assert!(outcome.delivered);
        assert!(outcome.destination_reached);
        assert!(!net.history().origin_of(outcome.message_id).unwrap().was_received_by(b));
        assert_eq!(outcome.ack_message_id, None);
        assert_eq!(net.history().acks_for(outcome.message_id).count(), 0);
    }

    #[test]
    fn ping_and_traceroute_use_their_ports() {
        let (mut net, a, b) = pair(500.0);
        let ping = net.send_ping(a, b).unwrap();
        let trace = net.send_traceroute(b, a).unwrap();

        assert_eq!(net.history().origin_of(ping.message_id).unwrap().message.port, PortNum::Routing);
        assert_eq!(net.history().origin_of(trace.message_id).unwrap().message.port, PortNum::Traceroute);
        assert!(ping.ack_message_id.is_some());
        assert!(trace.ack_message_id.is_some());
    }

    #[test]
    fn ack_for_unknown_message_is_rejected() {
        let (mut net, a, b) = pair(500.0);
        assert_eq!(net.send_ack(b, a, 77).unwrap_err(), SimError::UnknownMessage(77));
        assert!(net.history().is_empty());
    }

    #[test]
    fn ack_counts_as_sent_by_the_destination() {
        let (mut net, a, b) = pair(500.0);
        let outcome = net.send_dm(a, b).unwrap();
        let ack_id = outcome.ack_message_id.unwrap();

        let responder = net.node(b).unwrap();
        assert_eq!(responder.sent_messages, vec![ack_id]);
        assert_eq!(responder.total_tx, 1);
        assert!(net.node(a).unwrap().has_received(ack_id));
    }
}
