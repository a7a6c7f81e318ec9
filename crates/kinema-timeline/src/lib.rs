//! # kinema-timeline
//!
//! The Kinema timeline engine: animations as resumable tasks with
//! elapsed/duration state, combinators to run them in sequence, in
//! parallel, after a delay, or as raw per-frame sampling functions, and a
//! deterministic fixed-step clock that drives them.
//!
//! There is no language-level suspension and no wall-clock time: every
//! task is an explicit state machine advanced once per tick, so a given
//! timeline produces bit-identical output for a given sequence of ticks.

pub mod clock;
pub mod task;
pub mod timeline;

pub use clock::Clock;
pub use task::{animate_to, chain, delay, parallel, sample, sequential, Task, TaskState};
pub use timeline::Timeline;
