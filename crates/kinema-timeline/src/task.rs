use std::fmt;

use kinema_core::{Duration, Easing, EngineResult, Value};
use kinema_scene::{SignalGraph, SignalId};
use tracing::trace;

/// Completion tolerance for accumulated fixed-step time, so a task whose
/// duration is an exact multiple of the frame interval completes on the
/// expected tick despite float accumulation error.
const TIME_EPSILON: f64 = 1e-9;

/// Lifecycle of a task. `Finished` and `Cancelled` are both terminal;
/// observers use the distinction to tell natural completion from
/// cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Never stepped.
    Pending,
    /// At least one step consumed.
    Running,
    /// Ran to the end of its duration.
    Finished,
    /// Cancelled before natural completion; no further steps run.
    Cancelled,
}

impl TaskState {
    /// Whether the task is in a terminal state.
    pub fn is_complete(&self) -> bool {
        matches!(self, TaskState::Finished | TaskState::Cancelled)
    }

    fn cancel(&mut self) {
        if !self.is_complete() {
            *self = TaskState::Cancelled;
        }
    }
}

/// A resumable unit of timed work, advanced once per tick.
///
/// Combinators are logical composition only: all child steps for a frame
/// run to completion synchronously on the evaluation thread.
#[derive(Debug)]
pub enum Task {
    Tween(Tween),
    Delay(Delay),
    Sample(Sample),
    Sequential(Sequential),
    Parallel(Parallel),
}

impl Task {
    /// Total duration of the task: children sum for sequences, children
    /// max for parallel groups.
    pub fn duration(&self) -> Duration {
        Duration::from_seconds(self.duration_seconds())
    }

    /// Current lifecycle state.
    pub fn state(&self) -> TaskState {
        match self {
            Task::Tween(t) => t.state,
            Task::Delay(t) => t.state,
            Task::Sample(t) => t.state,
            Task::Sequential(t) => t.state,
            Task::Parallel(t) => t.state,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.state().is_complete()
    }

    /// Advance the task by `dt` seconds of simulated time. Stepping a
    /// complete task is a no-op.
    pub fn step(&mut self, graph: &mut SignalGraph, dt: f64) -> EngineResult<()> {
        match self {
            Task::Tween(t) => t.step(graph, dt),
            Task::Delay(t) => t.step(dt),
            Task::Sample(t) => t.step(graph, dt),
            Task::Sequential(t) => t.step(graph, dt),
            Task::Parallel(t) => t.step(graph, dt),
        }
    }

    /// Mark the task and all its incomplete children as cancelled; no
    /// further steps run and no value snaps to its target.
    pub fn cancel(&mut self) {
        match self {
            Task::Tween(t) => t.state.cancel(),
            Task::Delay(t) => t.state.cancel(),
            Task::Sample(t) => t.state.cancel(),
            Task::Sequential(t) => {
                t.state.cancel();
                for child in &mut t.children {
                    child.cancel();
                }
            }
            Task::Parallel(t) => {
                t.state.cancel();
                for child in &mut t.children {
                    child.cancel();
                }
            }
        }
    }

    fn duration_seconds(&self) -> f64 {
        match self {
            Task::Tween(t) => t.duration,
            Task::Delay(t) => t.duration,
            Task::Sample(t) => t.duration,
            Task::Sequential(t) => t.children.iter().map(Task::duration_seconds).sum(),
            Task::Parallel(t) => t
                .children
                .iter()
                .map(Task::duration_seconds)
                .fold(0.0, f64::max),
        }
    }

    fn elapsed(&self) -> f64 {
        match self {
            Task::Tween(t) => t.elapsed,
            Task::Delay(t) => t.elapsed,
            Task::Sample(t) => t.elapsed,
            Task::Sequential(t) => t.elapsed,
            Task::Parallel(t) => t.elapsed,
        }
    }
}

fn reached(elapsed: f64, duration: f64) -> bool {
    elapsed + TIME_EPSILON >= duration
}

/// Drives one source signal toward a target value.
///
/// The starting value is captured at the first step, not at construction,
/// so a tween scheduled late in a sequence picks up wherever the signal
/// is by then. The tween holds the signal's tween epoch from creation
/// time; if a newer tween claims the signal, this one completes as
/// cancelled without writing.
#[derive(Debug)]
pub struct Tween {
    signal: SignalId,
    target: Value,
    duration: f64,
    easing: Easing,
    epoch: u64,
    from: Option<Value>,
    elapsed: f64,
    state: TaskState,
}

impl Tween {
    fn step(&mut self, graph: &mut SignalGraph, dt: f64) -> EngineResult<()> {
        if self.state.is_complete() {
            return Ok(());
        }
        if graph.tween_epoch(self.signal)? != self.epoch {
            trace!(signal = %self.signal, "tween superseded, completing as cancelled");
            self.state = TaskState::Cancelled;
            return Ok(());
        }
        let from = match &self.from {
            Some(v) => v.clone(),
            None => {
                let v = graph.read(self.signal)?;
                self.from = Some(v.clone());
                v
            }
        };
        self.state = TaskState::Running;
        self.elapsed += dt;
        if reached(self.elapsed, self.duration) {
            // Land on the target exactly; no overshoot or undershoot.
            graph.write(self.signal, self.target.clone())?;
            self.state = TaskState::Finished;
        } else {
            let progress = self.elapsed / self.duration;
            let value = from.interpolate(&self.target, progress, self.easing)?;
            graph.write(self.signal, value)?;
        }
        Ok(())
    }
}

/// Performs no mutation until its duration elapses, then completes.
#[derive(Debug)]
pub struct Delay {
    duration: f64,
    elapsed: f64,
    state: TaskState,
}

impl Delay {
    fn step(&mut self, dt: f64) -> EngineResult<()> {
        if self.state.is_complete() {
            return Ok(());
        }
        self.state = TaskState::Running;
        self.elapsed += dt;
        if reached(self.elapsed, self.duration) {
            self.state = TaskState::Finished;
        }
        Ok(())
    }
}

type SampleFn = Box<dyn FnMut(&mut SignalGraph, f64) -> EngineResult<()>>;

/// A raw per-frame sampling task: calls back with eased-free progress in
/// [0, 1] every step, used for free-form motion such as arcing paths.
pub struct Sample {
    duration: f64,
    elapsed: f64,
    state: TaskState,
    callback: SampleFn,
}

impl Sample {
    fn step(&mut self, graph: &mut SignalGraph, dt: f64) -> EngineResult<()> {
        if self.state.is_complete() {
            return Ok(());
        }
        self.state = TaskState::Running;
        self.elapsed += dt;
        let progress = if self.duration <= TIME_EPSILON {
            1.0
        } else {
            (self.elapsed / self.duration).clamp(0.0, 1.0)
        };
        (self.callback)(graph, progress)?;
        if reached(self.elapsed, self.duration) {
            self.state = TaskState::Finished;
        }
        Ok(())
    }
}

impl fmt::Debug for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sample")
            .field("duration", &self.duration)
            .field("elapsed", &self.elapsed)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Runs children one after another. Child N starts once the combinator's
/// local elapsed time passes the summed durations of children 0..N; a
/// zero-duration child never delays its successor.
#[derive(Debug)]
pub struct Sequential {
    children: Vec<Task>,
    elapsed: f64,
    state: TaskState,
}

impl Sequential {
    fn step(&mut self, graph: &mut SignalGraph, dt: f64) -> EngineResult<()> {
        if self.state.is_complete() {
            return Ok(());
        }
        self.state = TaskState::Running;
        self.elapsed += dt;
        let mut offset = 0.0;
        for child in &mut self.children {
            if child.is_complete() {
                offset += child.duration_seconds();
                continue;
            }
            // Local time of this child is the combinator's elapsed time
            // minus everything scheduled before it; a negative remainder
            // means the child has not started this frame.
            let slice = (self.elapsed - offset) - child.elapsed();
            if slice < 0.0 {
                break;
            }
            child.step(graph, slice)?;
            if !child.is_complete() {
                break;
            }
            offset += child.duration_seconds();
        }
        if self.children.iter().all(Task::is_complete) {
            self.state = TaskState::Finished;
        }
        Ok(())
    }
}

/// Runs children simultaneously; completes when all children complete.
/// Logical composition only, not thread-level concurrency.
#[derive(Debug)]
pub struct Parallel {
    children: Vec<Task>,
    elapsed: f64,
    state: TaskState,
}

impl Parallel {
    fn step(&mut self, graph: &mut SignalGraph, dt: f64) -> EngineResult<()> {
        if self.state.is_complete() {
            return Ok(());
        }
        self.state = TaskState::Running;
        self.elapsed += dt;
        for child in &mut self.children {
            if !child.is_complete() {
                child.step(graph, dt)?;
            }
        }
        if self.children.iter().all(Task::is_complete) {
            self.state = TaskState::Finished;
        }
        Ok(())
    }
}

/// Animate a source signal toward `target` over `duration`.
///
/// Claims the signal's tween slot immediately, cancelling any in-flight
/// tween at its current value. A zero duration (negative durations clamp
/// to zero) applies the target on the tween's first step and completes
/// the same frame.
pub fn animate_to(
    graph: &mut SignalGraph,
    signal: SignalId,
    target: impl Into<Value>,
    duration: Duration,
    easing: Easing,
) -> EngineResult<Task> {
    let epoch = graph.claim_tween(signal)?;
    Ok(Task::Tween(Tween {
        signal,
        target: target.into(),
        duration: duration.as_seconds(),
        easing,
        epoch,
        from: None,
        elapsed: 0.0,
        state: TaskState::Pending,
    }))
}

/// Run `tasks` one after another; total duration is the sum.
pub fn sequential(tasks: Vec<Task>) -> Task {
    Task::Sequential(Sequential {
        children: tasks,
        elapsed: 0.0,
        state: TaskState::Pending,
    })
}

/// Run `tasks` simultaneously; total duration is the max.
pub fn parallel(tasks: Vec<Task>) -> Task {
    Task::Parallel(Parallel {
        children: tasks,
        elapsed: 0.0,
        state: TaskState::Pending,
    })
}

/// Wait for `duration` without mutating anything.
pub fn delay(duration: Duration) -> Task {
    Task::Delay(Delay {
        duration: duration.as_seconds(),
        elapsed: 0.0,
        state: TaskState::Pending,
    })
}

/// Call `callback` with clamped progress in [0, 1] once per frame for
/// `duration`. The callback may write any source signals it likes.
pub fn sample(
    duration: Duration,
    callback: impl FnMut(&mut SignalGraph, f64) -> EngineResult<()> + 'static,
) -> Task {
    Task::Sample(Sample {
        duration: duration.as_seconds(),
        elapsed: 0.0,
        state: TaskState::Pending,
        callback: Box::new(callback),
    })
}

/// Staggered fan-out: a sequence of delays, parallel groups and sampling
/// tasks. Semantically a `sequential`, named separately to keep scene
/// code readable.
pub fn chain(tasks: Vec<Task>) -> Task {
    sequential(tasks)
}
