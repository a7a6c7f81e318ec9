use std::collections::BTreeMap;
use std::fmt;

use kinema_core::{EngineError, EngineResult, Value};
use tracing::debug;

use crate::signal::{SignalGraph, SignalId};

/// Standard property names every node carries.
pub const PROP_X: &str = "x";
pub const PROP_Y: &str = "y";
pub const PROP_WIDTH: &str = "width";
pub const PROP_HEIGHT: &str = "height";
pub const PROP_OPACITY: &str = "opacity";

/// Handle to a node in a [`SceneTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node #{}", self.0)
    }
}

/// Initial property values for a node.
///
/// Every node gets the standard `x`, `y`, `width`, `height` and `opacity`
/// source signals; extra named properties can be added on top.
#[derive(Debug, Clone)]
pub struct NodeInit {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
    opacity: f64,
    extra: Vec<(String, Value)>,
}

impl NodeInit {
    /// A node at the origin with zero size and full opacity.
    pub fn new() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 0.0,
            opacity: 1.0,
            extra: Vec::new(),
        }
    }

    /// Builder: set position.
    pub fn with_position(mut self, x: f64, y: f64) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    /// Builder: set size.
    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Builder: set opacity.
    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = opacity;
        self
    }

    /// Builder: add a custom property.
    pub fn with_prop(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.push((name.into(), value.into()));
        self
    }
}

impl Default for NodeInit {
    fn default() -> Self {
        Self::new()
    }
}

struct Node {
    parent: Option<NodeId>,
    /// Insertion order is the paint/traversal order.
    children: Vec<NodeId>,
    props: BTreeMap<String, SignalId>,
    alive: bool,
}

/// Hierarchical ownership of scene nodes.
///
/// Nodes own their children; the parent link is a non-owning
/// back-reference used only to resolve parent-relative derived
/// properties. The tree is kept acyclic by checking ancestry on attach.
#[derive(Default)]
pub struct SceneTree {
    nodes: Vec<Node>,
}

impl SceneTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a detached node, allocating its property signals in `graph`.
    pub fn spawn(&mut self, graph: &mut SignalGraph, init: NodeInit) -> NodeId {
        let mut props = BTreeMap::new();
        props.insert(PROP_X.to_string(), graph.source(init.x));
        props.insert(PROP_Y.to_string(), graph.source(init.y));
        props.insert(PROP_WIDTH.to_string(), graph.source(init.width));
        props.insert(PROP_HEIGHT.to_string(), graph.source(init.height));
        props.insert(PROP_OPACITY.to_string(), graph.source(init.opacity));
        for (name, value) in init.extra {
            props.insert(name, graph.source(value));
        }
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            parent: None,
            children: Vec::new(),
            props,
            alive: true,
        });
        id
    }

    /// Attach `child` under `parent`, at the end of the paint order.
    ///
    /// Fails with [`EngineError::TreeCycle`] if `child` is `parent` or one
    /// of its ancestors; nothing is mutated on failure.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> EngineResult<()> {
        self.node(parent)?;
        let child_node = self.node(child)?;
        if child_node.parent.is_some() {
            return Err(EngineError::invalid_input(format!(
                "{child} is already attached"
            )));
        }
        if parent == child || self.is_ancestor(child, parent)? {
            return Err(EngineError::TreeCycle(format!(
                "{child} cannot become a descendant of itself"
            )));
        }
        self.node_mut(child)?.parent = Some(parent);
        self.node_mut(parent)?.children.push(child);
        Ok(())
    }

    /// Detach `child` from `parent` and destroy the subtree.
    ///
    /// All signals owned by removed nodes are retired, which cancels any
    /// tween driving them.
    pub fn remove_child(
        &mut self,
        graph: &mut SignalGraph,
        parent: NodeId,
        child: NodeId,
    ) -> EngineResult<()> {
        if self.node(child)?.parent != Some(parent) {
            return Err(EngineError::invalid_input(format!(
                "{child} is not a child of {parent}"
            )));
        }
        self.node_mut(parent)?.children.retain(|c| *c != child);
        self.node_mut(child)?.parent = None;
        self.destroy(graph, child)?;
        debug!(node = %child, "subtree removed");
        Ok(())
    }

    /// The parent of a node, if attached.
    pub fn parent(&self, node: NodeId) -> EngineResult<Option<NodeId>> {
        Ok(self.node(node)?.parent)
    }

    /// The children of a node in paint order.
    pub fn children(&self, node: NodeId) -> EngineResult<&[NodeId]> {
        Ok(&self.node(node)?.children)
    }

    /// Whether the node is still part of the scene.
    pub fn is_alive(&self, node: NodeId) -> bool {
        self.node(node).map(|n| n.alive).unwrap_or(false)
    }

    /// The signal backing a property, so callers can read it or redirect
    /// animation through it.
    pub fn prop(&self, node: NodeId, name: &str) -> EngineResult<SignalId> {
        self.node(node)?
            .props
            .get(name)
            .copied()
            .ok_or_else(|| EngineError::invalid_input(format!("{node} has no property {name:?}")))
    }

    /// Read the current value of a property.
    pub fn read_prop(
        &self,
        graph: &mut SignalGraph,
        node: NodeId,
        name: &str,
    ) -> EngineResult<Value> {
        let signal = self.prop(node, name)?;
        graph.read(signal)
    }

    /// Add (or replace) a custom property after creation.
    pub fn insert_prop(
        &mut self,
        graph: &mut SignalGraph,
        node: NodeId,
        name: impl Into<String>,
        value: impl Into<Value>,
    ) -> EngineResult<SignalId> {
        let signal = graph.source(value);
        self.node_mut(node)?.props.insert(name.into(), signal);
        Ok(signal)
    }

    /// Bind a node property to a function of the parent's property, e.g.
    /// "my width is my parent's width minus 4".
    ///
    /// Fails with [`EngineError::Unattached`] if the node has no parent at
    /// bind time; attach first, then derive.
    pub fn derive_from_parent(
        &mut self,
        graph: &mut SignalGraph,
        node: NodeId,
        prop: &str,
        parent_prop: &str,
        f: impl Fn(&Value) -> Value + 'static,
    ) -> EngineResult<()> {
        let parent = self.node(node)?.parent.ok_or_else(|| {
            EngineError::Unattached(format!(
                "{node} has no parent to resolve {parent_prop:?} against"
            ))
        })?;
        let parent_signal = self.prop(parent, parent_prop)?;
        let own_signal = self.prop(node, prop)?;
        graph.bind(own_signal, vec![parent_signal], move |vals| match vals.first() {
            Some(v) => f(v),
            None => Value::Number(0.0),
        })
    }

    /// Depth-first traversal in paint order, starting at `root`.
    pub fn paint_order(&self, root: NodeId) -> EngineResult<Vec<NodeId>> {
        let mut order = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let node = self.node(id)?;
            if !node.alive {
                continue;
            }
            order.push(id);
            // Reverse so the first child is visited first.
            for child in node.children.iter().rev() {
                stack.push(*child);
            }
        }
        Ok(order)
    }

    fn is_ancestor(&self, candidate: NodeId, of: NodeId) -> EngineResult<bool> {
        let mut current = self.node(of)?.parent;
        while let Some(id) = current {
            if id == candidate {
                return Ok(true);
            }
            current = self.node(id)?.parent;
        }
        Ok(false)
    }

    fn destroy(&mut self, graph: &mut SignalGraph, node: NodeId) -> EngineResult<()> {
        let children = self.node(node)?.children.clone();
        for child in children {
            self.destroy(graph, child)?;
        }
        let signals: Vec<SignalId> = self.node(node)?.props.values().copied().collect();
        for signal in signals {
            graph.retire(signal)?;
        }
        let n = self.node_mut(node)?;
        n.alive = false;
        n.children.clear();
        n.parent = None;
        Ok(())
    }

    fn node(&self, id: NodeId) -> EngineResult<&Node> {
        self.nodes
            .get(id.0 as usize)
            .ok_or_else(|| EngineError::invalid_input(format!("unknown {id}")))
    }

    fn node_mut(&mut self, id: NodeId) -> EngineResult<&mut Node> {
        self.nodes
            .get_mut(id.0 as usize)
            .ok_or_else(|| EngineError::invalid_input(format!("unknown {id}")))
    }
}

impl fmt::Debug for SceneTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SceneTree")
            .field("nodes", &self.nodes.len())
            .finish()
    }
}
