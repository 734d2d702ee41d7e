//! Managed-flooding mesh router.
//!
//! After a transmission, every receiver whose role allows relaying and that
//! is not yet on the message's path rebroadcasts it with one hop less. The
//! relay tree is walked breadth first from a work queue, so every job owns
//! its own copy of the message: sibling relays never share a hop budget or
//! a path.
//!
//! Termination: each relay strictly lowers `hop_limit`, and a relayed
//! message is only heard by nodes that have not received it before.

use std::collections::VecDeque;

use super::error::SimResult;
use super::network::Network;
use super::types::{Message, NodeId, Role, TransmissionRecord};

/// A pending rebroadcast.
#[derive(Debug, Clone, PartialEq)]
pub struct RelayJob {
    pub message: Message,
    pub sender: NodeId,
    pub hop: u8,
    /// Explicit start for the first job, `None` to start at the clock.
    pub start_time: Option<u64>,
}

/// Decide who rebroadcasts after `message` was put on air by `sender` at
/// depth `hop` and heard by `receivers` (id and role of each).
///
/// ACKs are never relayed, and neither is a message whose hop budget is spent.
pub fn plan_relays(message: &Message, sender: NodeId, hop: u8, receivers: &[(NodeId, Role)]) -> Vec<RelayJob> {
    if message.is_ack || message.hop_limit == 0 || receivers.is_empty() {
        return Vec::new();
    }

    let mut relayed = message.clone();
    relayed.hop_limit -= 1;
    relayed.extend_path(sender);

    let mut jobs = Vec::new();
    for &(node_id, role) in receivers {
        if !role.can_relay() {
            continue;
        }
        if relayed.path.contains(&node_id) {
            log::debug!("  node {} already on the path of message #{}, not relaying", node_id, message.id);
            continue;
        }
        jobs.push(RelayJob {
            message: relayed.clone(),
            sender: node_id,
            hop: hop.saturating_add(1),
            start_time: None,
        });
    }
    jobs
}

impl Network {
    /// Transmit `message` and then every rebroadcast it triggers.
    /// Returns whether the first transmission reached anyone.
    pub(super) fn run_relay_tree(&mut self, message: Message, sender: NodeId, hop: u8, start_time: u64) -> SimResult<bool> {
        let mut queue = VecDeque::from([RelayJob {
            message,
            sender,
            hop,
            start_time: Some(start_time),
        }]);
        let mut root_success = None;

        while let Some(job) = queue.pop_front() {
            let start = job.start_time.unwrap_or_else(|| self.sim_time());
            if job.hop > hop {
                log::info!("Node {} relays message #{} [hop {}, {} left]", job.sender, job.message.id, job.hop, job.message.hop_limit);
            }
            let id = self.transmit(&job.message, job.sender, job.hop, start)?;
            let Some(record) = self.history.get(id) else {
                continue;
            };
            root_success.get_or_insert(record.is_success());

            let receivers = self.receiver_roles(record);
            queue.extend(plan_relays(&job.message, job.sender, job.hop, &receivers));
        }

        Ok(root_success.unwrap_or(false))
    }

    fn receiver_roles(&self, record: &TransmissionRecord) -> Vec<(NodeId, Role)> {
        record.receivers().filter_map(|id| self.node(id).map(|n| (id, n.role))).collect()
    }
}
