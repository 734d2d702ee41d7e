//! Deterministic LoRa mesh simulation.
//!
//! Models radio propagation between nodes, packet collisions on a shared
//! channel, and Meshtastic-style managed flooding with acknowledgements.
//!
//! ```no_run
//! use lora_mesh_sim::simulation::{Network, Point, Role, SimConfig};
//!
//! let mut network = Network::new(SimConfig::default())?;
//! let a = network.add_node(Point::new(0.0, 0.0))?;
//! let b = network.add_node(Point::new(500.0, 0.0))?;
//! network.set_role(b, Role::Router)?;
//! let outcome = network.send_dm(a, b)?;
//! assert!(outcome.ack_message_id.is_some());
//! # Ok::<(), lora_mesh_sim::simulation::SimError>(())
//! ```

pub mod common;
pub mod logging;
pub mod simulation;

pub use logging::init_logging;
