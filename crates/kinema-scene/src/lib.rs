//! # kinema-scene
//!
//! The reactive substrate of the Kinema engine: a signal graph of source
//! and derived property cells with dirty invalidation, and a scene tree of
//! nodes whose properties are backed by signals.
//!
//! Everything here is single-threaded and step-driven; mutation happens
//! only from the evaluation thread that the playback clock drives.

pub mod node;
pub mod signal;

pub use node::{NodeId, NodeInit, SceneTree, PROP_HEIGHT, PROP_OPACITY, PROP_WIDTH, PROP_X, PROP_Y};
pub use signal::{SignalGraph, SignalId};
