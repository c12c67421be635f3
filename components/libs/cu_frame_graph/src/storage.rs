//! Storage for the transform graph: a petgraph stable graph holding the frames as vertices
//! and the transforms as edges, plus the label index from frame ids to vertices.
//!
//! The graph and the index are only ever mutated together, after every precondition of the
//! operation has been checked, so a failed operation leaves both untouched.
//!
//! Removing an element never renumbers the other handles (this is a `StableDiGraph`), and the
//! freed slot is reused by the next insertion. Every element gets a stamp at insertion, that
//! the handles carry: a handle kept past the removal of its element never designates the
//! newer element living in the same slot, it is reported as not found.

use crate::error::{FrameGraphError, FrameGraphResult};
use crate::frame::Frame;
use crate::transform::Transform;
use crate::FrameId;
use log::{debug, trace};
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::HashMap;
use std::fmt;
use std::fmt::Display;

/// Index type of the underlying petgraph graph.
pub type GraphIndex = u32;

type Stamp = u64;

/// Opaque handle on a vertex (a frame) of the graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexHandle {
    index: NodeIndex<GraphIndex>,
    stamp: Stamp,
}

/// Opaque handle on an edge (a transform) of the graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeHandle {
    index: EdgeIndex<GraphIndex>,
    stamp: Stamp,
}

impl VertexHandle {
    /// Storage slot of the vertex. Slots are reused, two handles can share one.
    pub fn index(&self) -> usize {
        self.index.index()
    }
}

impl EdgeHandle {
    pub fn index(&self) -> usize {
        self.index.index()
    }
}

impl Display for VertexHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.index.index())
    }
}

impl Display for EdgeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.index.index())
    }
}

/// A graph weight with the stamp it was inserted with.
#[derive(Debug)]
struct Stamped<T> {
    stamp: Stamp,
    value: T,
}

/// Directed graph of frames with a label index.
#[derive(Debug, Default)]
pub struct LabeledGraph {
    graph: StableDiGraph<Stamped<Frame>, Stamped<Transform>, GraphIndex>,
    labels: HashMap<FrameId, VertexHandle>,
    next_stamp: Stamp,
}

impl LabeledGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn stamp(&mut self) -> Stamp {
        let stamp = self.next_stamp;
        self.next_stamp += 1;
        stamp
    }

    fn vertex_handle(&self, index: NodeIndex<GraphIndex>) -> VertexHandle {
        VertexHandle {
            index,
            stamp: self.graph[index].stamp,
        }
    }

    fn edge_handle(&self, index: EdgeIndex<GraphIndex>) -> EdgeHandle {
        EdgeHandle {
            index,
            stamp: self.graph[index].stamp,
        }
    }

    fn node(&self, vertex: VertexHandle) -> Option<&Stamped<Frame>> {
        self.graph
            .node_weight(vertex.index)
            .filter(|node| node.stamp == vertex.stamp)
    }

    fn node_mut(&mut self, vertex: VertexHandle) -> Option<&mut Stamped<Frame>> {
        self.graph
            .node_weight_mut(vertex.index)
            .filter(|node| node.stamp == vertex.stamp)
    }

    fn link(&self, edge: EdgeHandle) -> Option<&Stamped<Transform>> {
        self.graph
            .edge_weight(edge.index)
            .filter(|link| link.stamp == edge.stamp)
    }

    fn link_mut(&mut self, edge: EdgeHandle) -> Option<&mut Stamped<Transform>> {
        self.graph
            .edge_weight_mut(edge.index)
            .filter(|link| link.stamp == edge.stamp)
    }

    pub fn num_vertices(&self) -> usize {
        self.graph.node_count()
    }

    pub fn num_edges(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn contains_vertex(&self, vertex: VertexHandle) -> bool {
        self.node(vertex).is_some()
    }

    pub fn contains_edge(&self, from: VertexHandle, to: VertexHandle) -> bool {
        self.edge(from, to).is_some()
    }

    fn check_vertex(&self, vertex: VertexHandle) -> FrameGraphResult<()> {
        if self.contains_vertex(vertex) {
            Ok(())
        } else {
            Err(FrameGraphError::VertexNotFound(vertex))
        }
    }

    /// Adds a vertex carrying `frame`.
    /// Fails with `DuplicateLabel` if a frame with the same id is already there.
    pub fn add_vertex(&mut self, frame: Frame) -> FrameGraphResult<VertexHandle> {
        if self.labels.contains_key(frame.frame_id()) {
            return Err(FrameGraphError::DuplicateLabel(frame.frame_id().clone()));
        }
        Ok(self.insert_labeled(frame))
    }

    // Caller guarantees the label is free.
    pub(crate) fn insert_labeled(&mut self, frame: Frame) -> VertexHandle {
        let id = frame.frame_id().clone();
        let stamp = self.stamp();
        let index = self.graph.add_node(Stamped {
            stamp,
            value: frame,
        });
        let vertex = VertexHandle { index, stamp };
        debug!("added frame '{}' as {}", id, vertex);
        self.labels.insert(id, vertex);
        vertex
    }

    pub fn vertex_by_label(&self, id: &str) -> Option<VertexHandle> {
        self.labels.get(id).copied()
    }

    pub fn label(&self, vertex: VertexHandle) -> FrameGraphResult<&str> {
        self.frame(vertex).map(Frame::id)
    }

    /// Adds an edge from `from` to `to` carrying `transform`.
    ///
    /// There is at most one edge per ordered pair of vertices: if the edge already exists,
    /// its transform is replaced and the returned flag is `false`.
    pub fn add_edge(
        &mut self,
        from: VertexHandle,
        to: VertexHandle,
        transform: Transform,
    ) -> FrameGraphResult<(EdgeHandle, bool)> {
        self.check_vertex(from)?;
        self.check_vertex(to)?;

        if let Some(index) = self.graph.find_edge(from.index, to.index) {
            trace!("updating transform {} -> {}", from, to);
            self.graph[index].value = transform;
            return Ok((self.edge_handle(index), false));
        }

        let stamp = self.stamp();
        let index = self.graph.add_edge(
            from.index,
            to.index,
            Stamped {
                stamp,
                value: transform,
            },
        );
        let edge = EdgeHandle { index, stamp };
        debug!("added edge {} ({} -> {})", edge, from, to);
        Ok((edge, true))
    }

    pub fn edge(&self, from: VertexHandle, to: VertexHandle) -> Option<EdgeHandle> {
        if !self.contains_vertex(from) || !self.contains_vertex(to) {
            return None;
        }
        self.graph
            .find_edge(from.index, to.index)
            .map(|index| self.edge_handle(index))
    }

    /// Removes the vertex, every edge going in or out of it and its label.
    pub fn remove_vertex(&mut self, vertex: VertexHandle) -> FrameGraphResult<Frame> {
        self.check_vertex(vertex)?;
        let frame = self
            .graph
            .remove_node(vertex.index)
            .ok_or(FrameGraphError::VertexNotFound(vertex))?
            .value;
        self.labels.remove(frame.frame_id());
        debug!("removed frame '{}' ({})", frame.id(), vertex);
        Ok(frame)
    }

    pub fn remove_edge(
        &mut self,
        from: VertexHandle,
        to: VertexHandle,
    ) -> FrameGraphResult<Transform> {
        self.check_vertex(from)?;
        self.check_vertex(to)?;
        let index = self
            .graph
            .find_edge(from.index, to.index)
            .ok_or_else(|| FrameGraphError::EdgeNotFound {
                from: self.graph[from.index].value.id().to_string(),
                to: self.graph[to.index].value.id().to_string(),
            })?;
        let edge = self.edge_handle(index);
        let transform = self
            .graph
            .remove_edge(index)
            .ok_or(FrameGraphError::EdgeHandleNotFound(edge))?
            .value;
        debug!("removed edge {} -> {}", from, to);
        Ok(transform)
    }

    /// Removes everything, labels included. Stamps keep increasing so older handles stay
    /// invalid.
    pub fn clear(&mut self) {
        self.graph.clear();
        self.labels.clear();
    }

    /// Removes every vertex but `keep`, and so every edge.
    pub fn retain_only(&mut self, keep: VertexHandle) {
        self.graph.retain_nodes(|_, node| node == keep.index);
        self.labels.retain(|_, vertex| *vertex == keep);
        debug!("cleared graph down to {}", keep);
    }

    pub fn frame(&self, vertex: VertexHandle) -> FrameGraphResult<&Frame> {
        self.node(vertex)
            .map(|node| &node.value)
            .ok_or(FrameGraphError::VertexNotFound(vertex))
    }

    /// Mutable access to a frame and its items.
    /// The id is not reachable from here so the label index cannot go stale.
    pub fn frame_mut(&mut self, vertex: VertexHandle) -> FrameGraphResult<&mut Frame> {
        self.node_mut(vertex)
            .map(|node| &mut node.value)
            .ok_or(FrameGraphError::VertexNotFound(vertex))
    }

    pub fn transform(&self, edge: EdgeHandle) -> FrameGraphResult<&Transform> {
        self.link(edge)
            .map(|link| &link.value)
            .ok_or(FrameGraphError::EdgeHandleNotFound(edge))
    }

    pub fn transform_mut(&mut self, edge: EdgeHandle) -> FrameGraphResult<&mut Transform> {
        self.link_mut(edge)
            .map(|link| &mut link.value)
            .ok_or(FrameGraphError::EdgeHandleNotFound(edge))
    }

    pub fn set_transform(&mut self, edge: EdgeHandle, transform: Transform) -> FrameGraphResult<()> {
        *self.transform_mut(edge)? = transform;
        Ok(())
    }

    pub fn endpoints(&self, edge: EdgeHandle) -> FrameGraphResult<(VertexHandle, VertexHandle)> {
        self.link(edge)
            .and_then(|_| self.graph.edge_endpoints(edge.index))
            .map(|(source, target)| (self.vertex_handle(source), self.vertex_handle(target)))
            .ok_or(FrameGraphError::EdgeHandleNotFound(edge))
    }

    pub fn source(&self, edge: EdgeHandle) -> FrameGraphResult<VertexHandle> {
        self.endpoints(edge).map(|(source, _)| source)
    }

    pub fn target(&self, edge: EdgeHandle) -> FrameGraphResult<VertexHandle> {
        self.endpoints(edge).map(|(_, target)| target)
    }

    /// All the vertices, in storage order.
    pub fn vertices(&self) -> impl Iterator<Item = VertexHandle> + '_ {
        self.graph
            .node_indices()
            .map(move |index| self.vertex_handle(index))
    }

    /// All the edges, in storage order.
    pub fn edges(&self) -> impl Iterator<Item = EdgeHandle> + '_ {
        self.graph
            .edge_indices()
            .map(move |index| self.edge_handle(index))
    }

    // A stale handle has no neighborhood.
    fn live_index(&self, vertex: VertexHandle) -> Option<NodeIndex<GraphIndex>> {
        self.contains_vertex(vertex).then_some(vertex.index)
    }

    /// Vertices reached by an edge going out of `vertex`.
    pub fn children(&self, vertex: VertexHandle) -> impl Iterator<Item = VertexHandle> + '_ {
        self.live_index(vertex)
            .into_iter()
            .flat_map(move |index| self.graph.neighbors_directed(index, Direction::Outgoing))
            .map(move |index| self.vertex_handle(index))
    }

    /// Vertices with an edge coming into `vertex`.
    pub fn parents(&self, vertex: VertexHandle) -> impl Iterator<Item = VertexHandle> + '_ {
        self.live_index(vertex)
            .into_iter()
            .flat_map(move |index| self.graph.neighbors_directed(index, Direction::Incoming))
            .map(move |index| self.vertex_handle(index))
    }

    pub fn out_edges(&self, vertex: VertexHandle) -> impl Iterator<Item = EdgeHandle> + '_ {
        self.live_index(vertex)
            .into_iter()
            .flat_map(move |index| self.graph.edges_directed(index, Direction::Outgoing))
            .map(move |edge| self.edge_handle(edge.id()))
    }

    pub fn in_edges(&self, vertex: VertexHandle) -> impl Iterator<Item = EdgeHandle> + '_ {
        self.live_index(vertex)
            .into_iter()
            .flat_map(move |index| self.graph.edges_directed(index, Direction::Incoming))
            .map(move |edge| self.edge_handle(edge.id()))
    }

    pub fn out_degree(&self, vertex: VertexHandle) -> usize {
        self.out_edges(vertex).count()
    }

    pub fn in_degree(&self, vertex: VertexHandle) -> usize {
        self.in_edges(vertex).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph_with(ids: &[&str]) -> (LabeledGraph, Vec<VertexHandle>) {
        let mut graph = LabeledGraph::new();
        let vertices = ids
            .iter()
            .map(|id| graph.add_vertex(Frame::new(*id)).unwrap())
            .collect();
        (graph, vertices)
    }

    #[test]
    fn test_label_index() {
        let (graph, v) = graph_with(&["root", "child_0", "child_1"]);
        assert_eq!(graph.num_vertices(), 3);
        assert_eq!(graph.vertex_by_label("child_0"), Some(v[1]));
        assert_eq!(graph.vertex_by_label("child_1"), Some(v[2]));
        assert_ne!(v[1], v[2]);
        assert_eq!(graph.label(v[1]).unwrap(), "child_0");
        assert!(graph.vertex_by_label("nope").is_none());
    }

    #[test]
    fn test_duplicate_label_rejected() {
        let (mut graph, v) = graph_with(&["root", "child_0"]);
        let result = graph.add_vertex(Frame::new("child_0"));
        assert!(matches!(result, Err(FrameGraphError::DuplicateLabel(ref id)) if id.as_str() == "child_0"));
        assert_eq!(graph.num_vertices(), 2);
        assert_eq!(graph.vertex_by_label("child_0"), Some(v[1]));
    }

    #[test]
    fn test_add_edge_updates_existing_pair() {
        let (mut graph, v) = graph_with(&["root", "child_0"]);
        let first = Transform::from_translation(1.0, 0.0, 0.0);
        let second = Transform::from_translation(2.0, 0.0, 0.0);

        let (edge, inserted) = graph.add_edge(v[1], v[0], first).unwrap();
        assert!(inserted);
        assert_eq!(graph.num_edges(), 1);

        let (same_edge, inserted) = graph.add_edge(v[1], v[0], second).unwrap();
        assert!(!inserted);
        assert_eq!(same_edge, edge);
        assert_eq!(graph.num_edges(), 1);
        assert_eq!(graph.transform(edge).unwrap(), &second);

        // the opposite direction is a different pair
        let (_, inserted) = graph.add_edge(v[0], v[1], first).unwrap();
        assert!(inserted);
        assert_eq!(graph.num_edges(), 2);
    }

    #[test]
    fn test_add_edge_on_missing_vertex() {
        let (mut graph, v) = graph_with(&["root", "child_0"]);
        graph.remove_vertex(v[1]).unwrap();
        let result = graph.add_edge(v[0], v[1], Transform::default());
        assert!(matches!(result, Err(FrameGraphError::VertexNotFound(vertex)) if vertex == v[1]));
        assert_eq!(graph.num_edges(), 0);
    }

    #[test]
    fn test_remove_vertex_removes_incident_edges() {
        let (mut graph, v) = graph_with(&["root", "a", "b", "c"]);
        graph.add_edge(v[0], v[1], Transform::default()).unwrap();
        graph.add_edge(v[1], v[2], Transform::default()).unwrap();
        graph.add_edge(v[3], v[1], Transform::default()).unwrap();
        graph.add_edge(v[0], v[3], Transform::default()).unwrap();

        let frame = graph.remove_vertex(v[1]).unwrap();
        assert_eq!(frame.id(), "a");
        assert_eq!(graph.num_vertices(), 3);
        assert_eq!(graph.num_edges(), 1);
        assert!(graph.vertex_by_label("a").is_none());
        for edge in graph.edges() {
            let (source, target) = graph.endpoints(edge).unwrap();
            assert_ne!(source, v[1]);
            assert_ne!(target, v[1]);
        }

        // other handles are still valid after the removal
        assert_eq!(graph.label(v[2]).unwrap(), "b");
        assert_eq!(graph.label(v[3]).unwrap(), "c");
        assert!(graph.contains_edge(v[0], v[3]));

        assert!(matches!(
            graph.remove_vertex(v[1]),
            Err(FrameGraphError::VertexNotFound(_))
        ));
    }

    #[test]
    fn test_remove_edge() {
        let (mut graph, v) = graph_with(&["root", "a"]);
        let tf = Transform::from_translation(0.0, 1.0, 0.0);
        graph.add_edge(v[1], v[0], tf).unwrap();
        assert_eq!(graph.remove_edge(v[1], v[0]).unwrap(), tf);
        assert_eq!(graph.num_edges(), 0);

        match graph.remove_edge(v[1], v[0]) {
            Err(FrameGraphError::EdgeNotFound { from, to }) => {
                assert_eq!(from, "a");
                assert_eq!(to, "root");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_accessors() {
        let (mut graph, v) = graph_with(&["root", "a"]);
        let (edge, _) = graph.add_edge(v[0], v[1], Transform::default()).unwrap();
        assert_eq!(graph.source(edge).unwrap(), v[0]);
        assert_eq!(graph.target(edge).unwrap(), v[1]);

        let tf = Transform::from_translation(3.0, 2.0, 1.0);
        graph.set_transform(edge, tf).unwrap();
        assert_eq!(graph.transform(edge).unwrap(), &tf);
        graph.transform_mut(edge).unwrap().translation[0] = 5.0;
        assert_eq!(graph.transform(edge).unwrap().translation, [5.0, 2.0, 1.0]);

        graph.frame_mut(v[1]).unwrap().push_item(42u32);
        assert_eq!(graph.frame(v[1]).unwrap().item_count(), 1);

        assert_eq!(graph.children(v[0]).collect::<Vec<_>>(), vec![v[1]]);
        assert_eq!(graph.parents(v[1]).collect::<Vec<_>>(), vec![v[0]]);
        assert_eq!(graph.out_degree(v[0]), 1);
        assert_eq!(graph.in_degree(v[0]), 0);

        graph.remove_edge(v[0], v[1]).unwrap();
        assert!(matches!(
            graph.transform(edge),
            Err(FrameGraphError::EdgeHandleNotFound(_))
        ));
    }

    #[test]
    fn test_iteration_is_restartable() {
        let (graph, _) = graph_with(&["root", "a", "b"]);
        let first: Vec<_> = graph.vertices().collect();
        let second: Vec<_> = graph.vertices().collect();
        assert_eq!(first.len(), 3);
        assert_eq!(first, second);
        assert_eq!(graph.edges().count(), 0);
    }

    #[test]
    fn test_clear() {
        let (mut graph, v) = graph_with(&["root", "a"]);
        graph.add_edge(v[0], v[1], Transform::default()).unwrap();
        graph.clear();
        assert_eq!(graph.num_vertices(), 0);
        assert_eq!(graph.num_edges(), 0);
        assert!(graph.vertex_by_label("root").is_none());
        graph.add_vertex(Frame::new("root")).unwrap();
    }

    #[test]
    fn test_stale_vertex_handle_after_slot_reuse() {
        let (mut graph, v) = graph_with(&["root", "a"]);
        graph.remove_vertex(v[1]).unwrap();
        let b = graph.add_vertex(Frame::new("b")).unwrap();
        // same slot, different vertex
        assert_eq!(b.index(), v[1].index());
        assert_ne!(b, v[1]);

        assert!(!graph.contains_vertex(v[1]));
        assert!(graph.contains_vertex(b));
        assert!(matches!(
            graph.frame(v[1]),
            Err(FrameGraphError::VertexNotFound(vertex)) if vertex == v[1]
        ));
        assert!(matches!(
            graph.add_edge(v[0], v[1], Transform::default()),
            Err(FrameGraphError::VertexNotFound(_))
        ));
        assert!(matches!(
            graph.remove_vertex(v[1]),
            Err(FrameGraphError::VertexNotFound(_))
        ));
        assert_eq!(graph.children(v[1]).count(), 0);
        assert_eq!(graph.num_edges(), 0);
        assert_eq!(graph.label(b).unwrap(), "b");
    }

    #[test]
    fn test_stale_edge_handle_after_slot_reuse() {
        let (mut graph, v) = graph_with(&["root", "a", "b"]);
        let (old, _) = graph.add_edge(v[0], v[1], Transform::default()).unwrap();
        graph.remove_edge(v[0], v[1]).unwrap();
        let tf = Transform::from_translation(1.0, 1.0, 1.0);
        let (new, inserted) = graph.add_edge(v[0], v[2], tf).unwrap();
        assert!(inserted);
        assert_eq!(new.index(), old.index());
        assert_ne!(new, old);

        assert!(matches!(
            graph.transform(old),
            Err(FrameGraphError::EdgeHandleNotFound(_))
        ));
        assert!(matches!(
            graph.set_transform(old, Transform::default()),
            Err(FrameGraphError::EdgeHandleNotFound(_))
        ));
        assert!(graph.endpoints(old).is_err());
        assert_eq!(graph.transform(new).unwrap(), &tf);
        assert_eq!(graph.edge(v[0], v[2]), Some(new));
    }

    #[test]
    fn test_handles_do_not_survive_clear() {
        let (mut graph, v) = graph_with(&["root"]);
        graph.clear();
        let root = graph.add_vertex(Frame::new("root")).unwrap();
        assert_ne!(root, v[0]);
        assert!(!graph.contains_vertex(v[0]));
    }

    #[test]
    fn test_retain_only() {
        let (mut graph, v) = graph_with(&["root", "a", "b"]);
        graph.add_edge(v[0], v[1], Transform::default()).unwrap();
        graph.add_edge(v[2], v[0], Transform::default()).unwrap();
        graph.retain_only(v[0]);
        assert_eq!(graph.num_vertices(), 1);
        assert_eq!(graph.num_edges(), 0);
        assert_eq!(graph.vertex_by_label("root"), Some(v[0]));
        assert!(graph.vertex_by_label("a").is_none());
    }
}
