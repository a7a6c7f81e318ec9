//! # kinema-core
//!
//! Core types and primitives for the Kinema animation engine.
//! This crate contains foundational types shared across all Kinema crates:
//! durations, easing curves, colors, points, dynamically typed property
//! values with interpolation, playback configuration, and error types.

pub mod color;
pub mod config;
pub mod easing;
pub mod error;
pub mod math;
pub mod time;
pub mod value;

pub use color::Color;
pub use config::PlaybackConfig;
pub use easing::Easing;
pub use error::{EngineError, EngineResult};
pub use math::Point2D;
pub use time::{Duration, Timestamp};
pub use value::{Value, ValueKind};
