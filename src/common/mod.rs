//! Inputs shared by embedders of the simulation: scene files.

pub mod scene;

pub use scene::{NodePlacement, Scene, SceneLoadError, load_scene, validate_scene};
