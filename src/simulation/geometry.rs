//! Geometry calculations for the propagation model.
//!
//! Contains helper functions for:
//! - 3D Euclidean distance between antennas (ground position plus height)
//! - Squared distance for comparisons that do not need the square root

use super::types::{Node, Point};

/// Smallest distance handed to the path loss model. Keeps `log10` finite when
/// two antennas share the same position.
pub const MIN_DISTANCE: f64 = 0.001;

/// Squared 3D distance in meters (avoids a sqrt when only comparing).
pub fn distance2_3d(a: &Point, a_height: f64, b: &Point, b_height: f64) -> f64 {
    let dx = a.x - b.x;
    let dy = a.y - b.y;
    let dz = a_height - b_height;
    dx * dx + dy * dy + dz * dz
}

/// 3D Euclidean distance between two antennas, clamped to [`MIN_DISTANCE`].
///
/// # Parameters
///
/// * `a`, `a_height` - Ground position and antenna height of the first antenna
/// * `b`, `b_height` - Ground position and antenna height of the second antenna
///
/// # Returns
///
/// The distance in meters, never below [`MIN_DISTANCE`].
pub fn distance_3d(a: &Point, a_height: f64, b: &Point, b_height: f64) -> f64 {
    distance2_3d(a, a_height, b, b_height).sqrt().max(MIN_DISTANCE)
}

/// Distance between the antennas of two nodes.
pub fn node_distance(a: &Node, b: &Node) -> f64 {
    distance_3d(&a.position, a.height, &b.position, b.height)
}

/// Planar distance, used to pick the node nearest to a point.
pub fn distance_2d(a: &Point, b: &Point) -> f64 {
    let dx = a.x - b.x;
    let dy = a.y - b.y;
    (dx * dx + dy * dy).sqrt()
}
