//! Collision detection between packets sharing simulated airtime.
//!
//! Two packets collide at a receiver only when all of the following hold:
//! - their carriers are within the guard band for the wider channel
//! - they use the same spreading factor
//! - the second packet is still on air when the first one's receiver has
//!   locked onto its preamble
//!
//! The capture test then decides which of them is lost at that receiver.
//! Collision is reported as a statistic; it does not undo reception.

use std::collections::BTreeSet;

use super::signal_calculations::symbol_time_ms;
use super::types::{CAPTURE_THRESHOLD, NodeId, Packet};

/// Preamble symbols a receiver needs before it is locked onto a packet.
const PREAMBLE_LOCK_MARGIN: u32 = 5;

/// Outcome of a capture evaluation at one receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Casualties {
    /// Neither packet dominates: both are lost.
    Both,
    /// The first packet is weaker and lost; the second captures.
    First,
    /// The second packet is weaker and lost; the first captures.
    Second,
}

impl Casualties {
    pub fn includes_first(self) -> bool {
        matches!(self, Casualties::Both | Casualties::First)
    }

    pub fn includes_second(self) -> bool {
        matches!(self, Casualties::Both | Casualties::Second)
    }
}

/// Carriers closer than the guard band interfere. The band is widest when
/// either packet uses a 500 kHz channel.
pub fn frequency_collision(p1: &Packet, p2: &Packet) -> bool {
    let offset = (p1.frequency - p2.frequency).abs();
    let either = |bw: u32| p1.bandwidth == bw || p2.bandwidth == bw;
    if either(500_000) {
        offset <= 120.0
    } else if either(250_000) {
        offset <= 60.0
    } else {
        offset <= 30.0
    }
}

/// LoRa spreading factors are quasi-orthogonal; only equal SFs interfere.
pub fn sf_collision(p1: &Packet, p2: &Packet) -> bool {
    p1.spreading_factor == p2.spreading_factor
}

/// Whether `p2` is still on air when a receiver synchronizing to `p1` has
/// passed its carrier-sense window (`preamble − 5` symbols after `p1` starts).
pub fn timing_collision(p1: &Packet, p2: &Packet) -> bool {
    let lock_symbols = p1.preamble_symbols.saturating_sub(PREAMBLE_LOCK_MARGIN) as f64;
    let carrier_sense_end = p1.start_time as f64 + symbol_time_ms(p1.spreading_factor, p1.bandwidth) * lock_symbols;
    carrier_sense_end < p2.end_time as f64
}

/// Capture evaluation at `rx_node_id`. Packets within [`CAPTURE_THRESHOLD`]
/// of each other are both lost, otherwise only the weaker one.
pub fn power_collision(p1: &Packet, p2: &Packet, rx_node_id: NodeId) -> Casualties {
    let rssi1 = p1.rssi_at(rx_node_id);
    let rssi2 = p2.rssi_at(rx_node_id);

    if (rssi1 - rssi2).abs() < CAPTURE_THRESHOLD {
        Casualties::Both
    } else if rssi1 < rssi2 {
        Casualties::First
    } else {
        Casualties::Second
    }
}

/// Evaluate a new packet against one packet already in flight.
///
/// Every receiver present in both RSSI maps is evaluated. Casualties get
/// `collision_at_rx[node] = true`, on either packet. Returns the receivers at
/// which `new_packet` was lost.
pub fn evaluate_pair(new_packet: &mut Packet, existing: &mut Packet) -> BTreeSet<NodeId> {
    let mut lost_at = BTreeSet::new();

    if !(frequency_collision(new_packet, existing) && sf_collision(new_packet, existing) && timing_collision(new_packet, existing)) {
        return lost_at;
    }

    let shared: Vec<NodeId> = new_packet.rssi_at_rx.keys().filter(|id| existing.rssi_at_rx.contains_key(id)).copied().collect();

    for rx_node_id in shared {
        let casualties = power_collision(new_packet, existing, rx_node_id);
        if casualties.includes_first() {
            new_packet.collision_at_rx.insert(rx_node_id, true);
            lost_at.insert(rx_node_id);
        }
        if casualties.includes_second() {
            existing.collision_at_rx.insert(rx_node_id, true);
        }
    }

    lost_at
}

/// Check a new packet against everything in flight.
///
/// Returns the number of distinct receivers at which the new packet lost a
/// capture evaluation; zero means it did not collide.
pub fn check_collisions<'a>(new_packet: &mut Packet, in_flight: impl IntoIterator<Item = &'a mut Packet>) -> usize {
    let mut lost_at = BTreeSet::new();
    for existing in in_flight {
        let lost = evaluate_pair(new_packet, existing);
        if !lost.is_empty() {
            log::debug!(
                "Packet {} from node {} collides with packet {} from node {} at nodes {:?}",
                new_packet.packet_id,
                new_packet.tx_node_id,
                existing.packet_id,
                existing.tx_node_id,
                lost
            );
        }
        lost_at.extend(lost);
    }
    lost_at.len()
}
