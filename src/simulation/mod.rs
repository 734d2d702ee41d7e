//! LoRa mesh simulation core.
//!
//! The pieces, leaf first:
//! - `geometry`, `signal_calculations`: the link-budget model
//! - `collision`: frequency/SF/timing overlap and the capture effect
//! - `registry`: message history and the in-flight packet window
//! - `network`: the transmission engine and caller-facing send operations
//! - `router`: managed-flooding relays over a breadth-first work queue
//! - `ack`: acknowledgements of unicast messages
//! - `stats`: network statistics and route inspection
//!
//! Everything runs on a logical millisecond clock; there is no wall-clock
//! time and no randomness, so a scenario always produces the same history.

pub mod ack;
pub mod collision;
pub mod config;
pub mod error;
pub mod geometry;
pub mod network;
pub mod registry;
pub mod router;
pub mod signal_calculations;
pub mod stats;
pub mod types;

pub use config::{ModemProfile, SimConfig};
pub use error::{SimError, SimResult};
pub use network::{Network, SendOutcome};
pub use stats::{HopKind, NetworkStats, RouteHop, route_of};
pub use types::{Destination, Message, MessageId, Node, NodeId, Packet, Point, PortNum, Role, TransmissionRecord};
