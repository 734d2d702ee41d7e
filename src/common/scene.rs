//! Scene loading, parsing, and validation logic.
//!
//! A scene is a JSON file holding an optional simulation configuration and
//! the node placements to start from:
//!
//! ```json
//! {
//!   "config": { "modem": "LongFast", "default_hop_limit": 3 },
//!   "nodes": [
//!     { "node_id": 0, "position": { "x": 0.0, "y": 0.0 } },
//!     { "node_id": 1, "position": { "x": 500.0, "y": 0.0 }, "role": "Router" }
//!   ]
//! }
//! ```
//!
//! Per-node fields left out fall back to the configuration defaults.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::simulation::config::{MAX_HOP_LIMIT, SimConfig};
use crate::simulation::error::SimResult;
use crate::simulation::network::Network;
use crate::simulation::types::{Node, NodeId, Point, Role};

/// Error type for scene loading failures.
#[derive(Debug, Error)]
pub enum SceneLoadError {
    #[error("Failed to read file: {0}")]
    FileReadError(String),
    #[error("Failed to parse JSON: {0}")]
    ParseError(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// Placement of one node. Optional fields override the configuration defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodePlacement {
    pub node_id: NodeId,
    pub position: Point,
    /// Antenna height in meters.
    #[serde(default)]
    pub height: Option<f64>,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub hop_limit: Option<u8>,
    /// Transmit power in dBm.
    #[serde(default)]
    pub tx_power: Option<f64>,
    /// Antenna gain in dB.
    #[serde(default)]
    pub antenna_gain: Option<f64>,
}

/// Root structure representing the entire scene.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scene {
    #[serde(default)]
    pub config: SimConfig,
    pub nodes: Vec<NodePlacement>,
}

impl Scene {
    /// Build a ready-to-run network with every placed node inserted.
    pub fn build_network(&self) -> SimResult<Network> {
        let mut network = Network::new(self.config.clone())?;
        for placement in &self.nodes {
            network.insert_node(Node::new(
                placement.node_id,
                placement.position,
                placement.height.unwrap_or(self.config.default_height),
                placement.antenna_gain.unwrap_or(self.config.antenna_gain),
                placement.tx_power.unwrap_or(self.config.tx_power),
                placement.role.unwrap_or(self.config.default_role),
                placement.hop_limit.unwrap_or(self.config.default_hop_limit),
            ))?;
        }
        log::info!("Scene network built with {} nodes", network.node_count());
        Ok(network)
    }
}

/// Load and parse a scene from a file.
///
/// # Parameters
///
/// * `path` - Path to the scene JSON file
///
/// # Returns
///
/// Parsed and validated Scene or an error.
pub fn load_scene(path: &Path) -> Result<Scene, SceneLoadError> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))
        .map_err(|e| SceneLoadError::FileReadError(e.to_string()))?;

    let scene: Scene = serde_json::from_str(&data)
        .context("Invalid JSON format")
        .map_err(|e| SceneLoadError::ParseError(format!("{:#}", e)))?;

    validate_scene(&scene).map_err(SceneLoadError::ValidationError)?;

    log::debug!("Loaded scene {} ({} nodes, modem {})", path.display(), scene.nodes.len(), scene.config.modem);
    Ok(scene)
}

/// Validate a parsed scene.
///
/// # Returns
///
/// `Ok(())` if validation passes, `Err(String)` with error description otherwise.
pub fn validate_scene(scene: &Scene) -> Result<(), String> {
    const MAX_WORLD_COORD: f64 = 100_000.0;
    const MAX_NODES: usize = 10000;
    const MIN_TX_POWER: f64 = -50.0;
    const MAX_TX_POWER: f64 = 50.0;

    scene.config.validate().map_err(|e| e.to_string())?;

    if scene.nodes.is_empty() {
        return Err("Scene must contain at least one node".to_string());
    }
    if scene.nodes.len() > MAX_NODES {
        return Err(format!("Node count {} exceeds maximum of {}", scene.nodes.len(), MAX_NODES));
    }

    let mut node_ids = HashSet::new();
    for node in &scene.nodes {
        if node.node_id == NodeId::MAX {
            return Err(format!("node_id {} is reserved", node.node_id));
        }
        if !node_ids.insert(node.node_id) {
            return Err(format!("Duplicate node_id found: {}", node.node_id));
        }
    }

    for node in &scene.nodes {
        let Point { x, y } = node.position;
        if !x.is_finite() || !y.is_finite() || x.abs() > MAX_WORLD_COORD || y.abs() > MAX_WORLD_COORD {
            return Err(format!(
                "Node {} position ({}, {}) exceeds world bounds (±{})",
                node.node_id, x, y, MAX_WORLD_COORD
            ));
        }
        if let Some(height) = node.height.filter(|h| !(h.is_finite() && *h > 0.0)) {
            return Err(format!("Node {} height {} must be positive", node.node_id, height));
        }
        if let Some(tx_power) = node.tx_power.filter(|p| !(MIN_TX_POWER..=MAX_TX_POWER).contains(p)) {
            return Err(format!(
                "Node {} tx_power {} dBm outside realistic range ({} to {} dBm)",
                node.node_id, tx_power, MIN_TX_POWER, MAX_TX_POWER
            ));
        }
        if let Some(gain) = node.antenna_gain.filter(|g| !g.is_finite()) {
            return Err(format!("Node {} antenna_gain {} must be finite", node.node_id, gain));
        }
        if let Some(hop_limit) = node.hop_limit.filter(|h| *h == 0 || *h > MAX_HOP_LIMIT) {
            return Err(format!("Node {} hop_limit {} must be 1-{}", node.node_id, hop_limit, MAX_HOP_LIMIT));
        }
    }

    Ok(())
}
