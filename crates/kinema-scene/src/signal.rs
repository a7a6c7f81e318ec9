use std::fmt;

use kinema_core::{EngineError, EngineResult, Value};
use tracing::{debug, trace};

/// Handle to a cell in a [`SignalGraph`].
///
/// Ids are only meaningful within the graph that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SignalId(u32);

impl fmt::Display for SignalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "signal #{}", self.0)
    }
}

/// Pure recomputation function of a derived signal. Receives the current
/// values of the declared dependencies, in declaration order.
pub type ComputeFn = Box<dyn Fn(&[Value]) -> Value>;

struct Derivation {
    deps: Vec<SignalId>,
    compute: ComputeFn,
    dirty: bool,
}

struct Cell {
    value: Value,
    version: u64,
    derivation: Option<Derivation>,
    /// Reverse edges: derived signals that declared this cell as a dependency.
    dependents: Vec<SignalId>,
    /// Epoch of the at-most-one in-flight tween driving this cell. A tween
    /// holding a stale epoch has been superseded and must not write.
    tween_epoch: u64,
    retired: bool,
}

/// Arena of reactive property cells.
///
/// Source cells hold externally written values; derived cells recompute
/// lazily from their dependencies on read, with dirty invalidation
/// propagated along reverse edges on every write. All access goes through
/// the single evaluation thread driven by the playback clock.
#[derive(Default)]
pub struct SignalGraph {
    cells: Vec<Cell>,
}

impl SignalGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cells ever created (retired cells included).
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Create a source signal holding `value`.
    pub fn source(&mut self, value: impl Into<Value>) -> SignalId {
        let id = SignalId(self.cells.len() as u32);
        self.cells.push(Cell {
            value: value.into(),
            version: 0,
            derivation: None,
            dependents: Vec::new(),
            tween_epoch: 0,
            retired: false,
        });
        id
    }

    /// Create a derived (read-only) signal computed from `deps`.
    ///
    /// The computation runs lazily on first read and again whenever a
    /// dependency changes.
    pub fn derived(
        &mut self,
        deps: Vec<SignalId>,
        compute: impl Fn(&[Value]) -> Value + 'static,
    ) -> EngineResult<SignalId> {
        for dep in &deps {
            self.cell(*dep)?;
        }
        let id = SignalId(self.cells.len() as u32);
        self.cells.push(Cell {
            // Placeholder until the first read settles the cell.
            value: Value::Number(0.0),
            version: 0,
            derivation: Some(Derivation {
                deps: deps.clone(),
                compute: Box::new(compute),
                dirty: true,
            }),
            dependents: Vec::new(),
            tween_epoch: 0,
            retired: false,
        });
        self.register_deps(id, &deps);
        Ok(id)
    }

    /// Convert an existing signal into a derived one.
    ///
    /// Cancels any in-flight tween on the signal. Rebinding is what makes
    /// runtime dependency cycles possible; they are detected at the first
    /// read that would recurse, not here.
    pub fn bind(
        &mut self,
        id: SignalId,
        deps: Vec<SignalId>,
        compute: impl Fn(&[Value]) -> Value + 'static,
    ) -> EngineResult<()> {
        for dep in &deps {
            self.cell(*dep)?;
        }
        let cell = self.cell(id)?;
        if cell.retired {
            return Err(EngineError::invalid_input(format!("{id} was retired")));
        }
        let old_deps = cell
            .derivation
            .as_ref()
            .map(|d| d.deps.clone())
            .unwrap_or_default();
        self.unregister_deps(id, &old_deps);

        debug!(signal = %id, deps = deps.len(), "binding signal to derivation");
        let cell = self.cell_mut(id)?;
        cell.tween_epoch += 1;
        cell.derivation = Some(Derivation {
            deps: deps.clone(),
            compute: Box::new(compute),
            dirty: true,
        });
        self.register_deps(id, &deps);
        self.mark_dependents_dirty(id);
        Ok(())
    }

    /// Whether the signal is derived (and therefore read-only).
    pub fn is_derived(&self, id: SignalId) -> EngineResult<bool> {
        Ok(self.cell(id)?.derivation.is_some())
    }

    /// Read the current value, recomputing stale derivations depth-first.
    ///
    /// After a read every settled cell is consistent with the source
    /// values as of this pass; memoization prevents re-derivation within
    /// the pass.
    pub fn read(&mut self, id: SignalId) -> EngineResult<Value> {
        let mut stack = Vec::new();
        self.settle(id, &mut stack)?;
        Ok(self.cell(id)?.value.clone())
    }

    /// Write a source signal and invalidate its transitive dependents.
    pub fn write(&mut self, id: SignalId, value: impl Into<Value>) -> EngineResult<()> {
        let cell = self.cell(id)?;
        if cell.derivation.is_some() {
            return Err(EngineError::IllegalWrite(format!(
                "{id} is derived and cannot be written directly"
            )));
        }
        if cell.retired {
            return Err(EngineError::invalid_input(format!("{id} was retired")));
        }
        let cell = self.cell_mut(id)?;
        cell.value = value.into();
        cell.version += 1;
        self.mark_dependents_dirty(id);
        Ok(())
    }

    /// Claim the tween slot of a source signal, cancelling any in-flight
    /// tween at its current (not target) value. Returns the epoch the new
    /// tween must present on every step.
    pub fn claim_tween(&mut self, id: SignalId) -> EngineResult<u64> {
        let cell = self.cell(id)?;
        if cell.derivation.is_some() {
            return Err(EngineError::IllegalWrite(format!(
                "{id} is derived and cannot be animated"
            )));
        }
        if cell.retired {
            return Err(EngineError::invalid_input(format!("{id} was retired")));
        }
        let cell = self.cell_mut(id)?;
        cell.tween_epoch += 1;
        trace!(signal = %id, epoch = cell.tween_epoch, "tween slot claimed");
        Ok(cell.tween_epoch)
    }

    /// The current tween epoch of a signal.
    pub fn tween_epoch(&self, id: SignalId) -> EngineResult<u64> {
        Ok(self.cell(id)?.tween_epoch)
    }

    /// Cancel any in-flight tween without starting a new one.
    pub fn cancel_tween(&mut self, id: SignalId) -> EngineResult<()> {
        self.cell_mut(id)?.tween_epoch += 1;
        Ok(())
    }

    /// Retire a cell: cancel its tween and drop its derivation.
    ///
    /// Used when a scene node is removed. The last value stays readable
    /// for derivations that still reference the cell, but writes and new
    /// tweens are rejected.
    pub fn retire(&mut self, id: SignalId) -> EngineResult<()> {
        let old_deps = self
            .cell(id)?
            .derivation
            .as_ref()
            .map(|d| d.deps.clone())
            .unwrap_or_default();
        self.unregister_deps(id, &old_deps);
        let cell = self.cell_mut(id)?;
        cell.tween_epoch += 1;
        cell.derivation = None;
        cell.retired = true;
        debug!(signal = %id, "signal retired");
        Ok(())
    }

    fn settle(&mut self, id: SignalId, stack: &mut Vec<SignalId>) -> EngineResult<()> {
        let cell = self.cell(id)?;
        let deps = match &cell.derivation {
            None => return Ok(()),
            Some(d) if !d.dirty => return Ok(()),
            Some(d) => d.deps.clone(),
        };
        if stack.contains(&id) {
            return Err(EngineError::DependencyCycle(format!(
                "{id} transitively depends on itself"
            )));
        }
        stack.push(id);
        let mut inputs = Vec::with_capacity(deps.len());
        for dep in &deps {
            self.settle(*dep, stack)?;
            inputs.push(self.cell(*dep)?.value.clone());
        }
        stack.pop();

        let value = match &self.cell(id)?.derivation {
            Some(d) => (d.compute)(&inputs),
            None => return Ok(()),
        };
        let cell = self.cell_mut(id)?;
        cell.value = value;
        cell.version += 1;
        if let Some(d) = cell.derivation.as_mut() {
            d.dirty = false;
        }
        Ok(())
    }

    fn mark_dependents_dirty(&mut self, id: SignalId) {
        let mut work = vec![id];
        while let Some(current) = work.pop() {
            let dependents = match self.cell(current) {
                Ok(cell) => cell.dependents.clone(),
                Err(_) => continue,
            };
            for dep_id in dependents {
                if let Ok(cell) = self.cell_mut(dep_id) {
                    if let Some(d) = cell.derivation.as_mut() {
                        if !d.dirty {
                            d.dirty = true;
                            work.push(dep_id);
                        }
                    }
                }
            }
        }
    }

    fn register_deps(&mut self, id: SignalId, deps: &[SignalId]) {
        for dep in deps {
            if let Ok(cell) = self.cell_mut(*dep) {
                if !cell.dependents.contains(&id) {
                    cell.dependents.push(id);
                }
            }
        }
    }

    fn unregister_deps(&mut self, id: SignalId, deps: &[SignalId]) {
        for dep in deps {
            if let Ok(cell) = self.cell_mut(*dep) {
                cell.dependents.retain(|d| *d != id);
            }
        }
    }

    fn cell(&self, id: SignalId) -> EngineResult<&Cell> {
        self.cells
            .get(id.0 as usize)
            .ok_or_else(|| EngineError::invalid_input(format!("unknown {id}")))
    }

    fn cell_mut(&mut self, id: SignalId) -> EngineResult<&mut Cell> {
        self.cells
            .get_mut(id.0 as usize)
            .ok_or_else(|| EngineError::invalid_input(format!("unknown {id}")))
    }
}

impl fmt::Debug for SignalGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalGraph")
            .field("cells", &self.cells.len())
            .finish()
    }
}
