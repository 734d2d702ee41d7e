//! Message history and the in-flight packet window.
//!
//! The history owns every [`TransmissionRecord`] and with it every packet.
//! The in-flight registry only holds history indices of packets that may
//! still overlap a new transmission, so collision marks made on an old
//! packet land directly in its history record.

use std::collections::VecDeque;

use super::types::{MessageId, Packet, TransmissionId, TransmissionRecord};

/// Append-only log of all transmissions in the current session.
#[derive(Debug, Default)]
pub struct MessageHistory {
    records: Vec<TransmissionRecord>,
}

impl MessageHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: TransmissionRecord) -> TransmissionId {
        self.records.push(record);
        self.records.len() - 1
    }

    pub fn get(&self, id: TransmissionId) -> Option<&TransmissionRecord> {
        self.records.get(id)
    }

    pub fn records(&self) -> &[TransmissionRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Every transmission of a message, relays included, in order.
    pub fn transmissions_of(&self, message_id: MessageId) -> impl Iterator<Item = &TransmissionRecord> + '_ {
        self.records.iter().filter(move |r| r.message.id == message_id)
    }

    /// ACK transmissions acknowledging `message_id`.
    pub fn acks_for(&self, message_id: MessageId) -> impl Iterator<Item = &TransmissionRecord> + '_ {
        self.records.iter().filter(move |r| r.message.is_ack && r.message.original_msg_id == Some(message_id))
    }

    /// First transmission of a message, i.e. the one its originator made.
    pub fn origin_of(&self, message_id: MessageId) -> Option<&TransmissionRecord> {
        self.transmissions_of(message_id).find(|r| r.hop == 0)
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}

/// Sliding window over the history of packets that may still collide.
///
/// Entries whose end time falls more than `window_ms` behind the logical
/// clock are evicted, keeping memory bounded for long sessions.
#[derive(Debug)]
pub struct InFlightRegistry {
    entries: VecDeque<TransmissionId>,
    window_ms: u64,
}

impl InFlightRegistry {
    pub fn new(window_ms: u64) -> Self {
        Self {
            entries: VecDeque::new(),
            window_ms,
        }
    }

    pub fn insert(&mut self, id: TransmissionId) {
        self.entries.push_back(id);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Mutable access to every in-flight packet stored in `history`.
    pub fn packets_mut<'a>(&'a self, history: &'a mut MessageHistory) -> Vec<&'a mut Packet> {
        let mut packets = Vec::with_capacity(self.entries.len());
        let Some(&first) = self.entries.iter().min() else {
            return packets;
        };
        for (offset, record) in history.records.iter_mut().skip(first).enumerate() {
            if self.entries.contains(&(first + offset)) {
                packets.push(&mut record.packet);
            }
        }
        packets
    }

    /// Drop packets that ended before `now − window_ms`. Returns how many were evicted.
    pub fn evict(&mut self, now: u64, history: &MessageHistory) -> usize {
        let horizon = now.saturating_sub(self.window_ms);
        let before = self.entries.len();
        self.entries.retain(|&id| history.get(id).is_some_and(|r| r.packet.end_time >= horizon));
        let evicted = before - self.entries.len();
        if evicted > 0 {
            log::trace!("Evicted {} packets from the in-flight window (horizon {} ms)", evicted, horizon);
        }
        evicted
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
