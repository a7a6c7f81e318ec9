use kinema_core::{EngineError, EngineResult};
use kinema_scene::SignalGraph;
use tracing::{debug, trace};

use crate::clock::Clock;
use crate::task::{Task, TaskState};

/// The live combinator tree of a scene, driven by the clock.
///
/// At most one timeline is live per logical scene; the scene is in a
/// terminal state once the root task completes. A tick steps every
/// active task before control returns, so a renderer reading signals
/// between ticks never observes a frame mid-update.
#[derive(Debug)]
pub struct Timeline {
    root: Task,
}

impl Timeline {
    /// Wrap a root task (usually a combinator) into a drivable timeline.
    pub fn new(root: Task) -> Self {
        Self { root }
    }

    /// Advance the clock one fixed step and step the whole task tree by
    /// it. Returns `true` while the timeline is still running.
    ///
    /// A task error aborts this tick's evaluation and propagates before
    /// any render read happens.
    pub fn tick(&mut self, graph: &mut SignalGraph, clock: &mut Clock) -> EngineResult<bool> {
        if self.root.is_complete() {
            return Ok(false);
        }
        let dt = clock.step().as_seconds();
        let now = clock.tick();
        trace!(tick = clock.ticks(), time = %now, "timeline tick");
        self.root.step(graph, dt)?;
        if self.root.is_complete() {
            debug!(ticks = clock.ticks(), time = %now, state = ?self.root.state(), "timeline complete");
            return Ok(false);
        }
        Ok(true)
    }

    /// Synchronously drain the timeline, for headless and test use.
    ///
    /// Returns the number of ticks consumed. Fails rather than spinning
    /// forever if `max_ticks` elapse without completion.
    pub fn run_to_completion(
        &mut self,
        graph: &mut SignalGraph,
        clock: &mut Clock,
        max_ticks: u64,
    ) -> EngineResult<u64> {
        let start = clock.ticks();
        while self.tick(graph, clock)? {
            if clock.ticks() - start >= max_ticks {
                return Err(EngineError::Timeline(format!(
                    "timeline did not complete within {max_ticks} ticks"
                )));
            }
        }
        Ok(clock.ticks() - start)
    }

    /// Whether the root task reached a terminal state.
    pub fn is_complete(&self) -> bool {
        self.root.is_complete()
    }

    /// Cancel the whole task tree; completion state reads as cancelled.
    pub fn cancel(&mut self) {
        debug!("timeline cancelled");
        self.root.cancel();
    }

    /// The state of the root task.
    pub fn state(&self) -> TaskState {
        self.root.state()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{animate_to, delay, parallel, sequential};
    use kinema_core::{Duration, Easing, Value};

    fn test_clock(step: f64) -> Clock {
        Clock::new(Duration::from_seconds(step)).unwrap()
    }

    #[test]
    fn test_timeline_runs_to_completion() {
        let mut graph = SignalGraph::new();
        let mut clock = test_clock(0.1);
        let mut timeline = Timeline::new(sequential(vec![
            delay(Duration::from_seconds(0.3)),
            delay(Duration::from_seconds(0.6)),
        ]));
        let ticks = timeline
            .run_to_completion(&mut graph, &mut clock, 1_000)
            .unwrap();
        assert_eq!(ticks, 9, "0.9s at 0.1s per tick");
        assert_eq!(timeline.state(), TaskState::Finished);
        assert!(!timeline.tick(&mut graph, &mut clock).unwrap());
    }

    #[test]
    fn test_timeline_tick_cap() {
        let mut graph = SignalGraph::new();
        let mut clock = test_clock(0.1);
        let mut timeline = Timeline::new(delay(Duration::from_seconds(100.0)));
        assert!(matches!(
            timeline.run_to_completion(&mut graph, &mut clock, 10),
            Err(EngineError::Timeline(_))
        ));
    }

    #[test]
    fn test_timeline_animates_signal_to_target() {
        let mut graph = SignalGraph::new();
        let mut clock = test_clock(1.0 / 60.0);
        let s = graph.source(0.0);
        let task = animate_to(
            &mut graph,
            s,
            42.0,
            Duration::from_seconds(0.5),
            Easing::CubicInOut,
        )
        .unwrap();
        let mut timeline = Timeline::new(task);
        timeline
            .run_to_completion(&mut graph, &mut clock, 1_000)
            .unwrap();
        // Exact landing regardless of duration and curve.
        assert_eq!(graph.read(s).unwrap(), Value::Number(42.0));
    }

    #[test]
    fn test_timeline_cancel_is_terminal() {
        let mut graph = SignalGraph::new();
        let mut clock = test_clock(0.1);
        let s = graph.source(0.0);
        let task = animate_to(
            &mut graph,
            s,
            100.0,
            Duration::from_seconds(1.0),
            Easing::Linear,
        )
        .unwrap();
        let mut timeline = Timeline::new(parallel(vec![task]));
        timeline.tick(&mut graph, &mut clock).unwrap();
        timeline.cancel();
        assert_eq!(timeline.state(), TaskState::Cancelled);
        assert!(!timeline.tick(&mut graph, &mut clock).unwrap());
        // Value stays where cancellation left it.
        let v = graph.read(s).unwrap().as_number().unwrap();
        assert!((v - 10.0).abs() < 1e-9);
    }
}
