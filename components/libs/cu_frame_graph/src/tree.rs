use crate::config::FrameTreeConfig;
use crate::error::{FrameGraphError, FrameGraphResult};
use crate::events::{
    FrameAddedEvent, FrameEvent, FrameEventPublisher, FrameRootAddedEvent, SharedSubscriber,
    SubscriptionId,
};
use crate::frame::Frame;
use crate::graph::TransformGraph;
use crate::storage::{EdgeHandle, VertexHandle};
use crate::transform::Transform;
use log::{debug, warn};
use std::ops::Deref;

/// Frame id of the root created by [`TransformTree::new`].
pub const DEFAULT_ROOT_FRAME: &str = "root";

/// A transform graph anchored on a root frame that exists for the whole life of the tree.
///
/// Frames are attached below a parent with [`add_frame`](Self::add_frame) or as the root of a
/// new subtree with [`add_root_frame`](Self::add_root_frame); both publish a [`FrameEvent`] to
/// the subscribers once the tree is updated.
///
/// Read access to the underlying [`TransformGraph`] goes through `Deref`. Mutations go through
/// the tree so the root can never be removed.
#[derive(Debug)]
pub struct TransformTree {
    graph: TransformGraph,
    root: VertexHandle,
    publisher: FrameEventPublisher,
}

impl Deref for TransformTree {
    type Target = TransformGraph;

    fn deref(&self) -> &Self::Target {
        &self.graph
    }
}

impl Default for TransformTree {
    fn default() -> Self {
        Self::new()
    }
}

impl TransformTree {
    /// Create a tree with a single root frame named "root".
    pub fn new() -> Self {
        Self::with_root(Frame::new(DEFAULT_ROOT_FRAME))
    }

    pub fn with_root(root: Frame) -> Self {
        let (graph, root) = TransformGraph::with_root(root);
        Self {
            graph,
            root,
            publisher: FrameEventPublisher::new(),
        }
    }

    /// Build a tree from its configuration. Frames are added in declaration order, so a parent
    /// must be declared before its children. No subscriber exists yet, no event is lost.
    pub fn from_config(config: &FrameTreeConfig) -> FrameGraphResult<Self> {
        let mut tree = Self::with_root(Frame::new(config.root.as_str()));
        for frame in &config.frames {
            let transform = frame.transform.unwrap_or_default();
            match &frame.parent {
                Some(parent) => {
                    tree.add_frame_by_label(Frame::new(frame.id.as_str()), parent, transform)?;
                }
                None => {
                    tree.add_root_frame(Frame::new(frame.id.as_str()))?;
                }
            }
        }
        debug!(
            "built transform tree from config: {} frames, {} transforms",
            tree.num_vertices(),
            tree.num_edges()
        );
        Ok(tree)
    }

    /// The root frame. It cannot be removed so this handle is always valid.
    pub fn root_node(&self) -> VertexHandle {
        self.root
    }

    pub fn is_root(&self, vertex: VertexHandle) -> bool {
        vertex == self.root
    }

    /// Borrow the underlying graph.
    pub fn graph(&self) -> &TransformGraph {
        &self.graph
    }

    pub fn subscribe(&mut self, subscriber: SharedSubscriber) -> SubscriptionId {
        self.publisher.subscribe(subscriber)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.publisher.unsubscribe(id)
    }

    pub fn subscriber_count(&self) -> usize {
        self.publisher.subscriber_count()
    }

    /// Adds `frame` below `parent`, linked by the edge `parent -> frame` carrying `transform`,
    /// then publishes a `FrameAdded` event.
    ///
    /// Nothing is changed if the parent does not exist or the frame id is taken.
    /// If a subscriber fails, the frame stays in the tree and the failure is returned.
    pub fn add_frame(
        &mut self,
        frame: Frame,
        parent: VertexHandle,
        transform: Transform,
    ) -> FrameGraphResult<VertexHandle> {
        if !self.graph.contains_vertex(parent) {
            return Err(FrameGraphError::VertexNotFound(parent));
        }
        let vertex = self.graph.add_vertex(frame)?;
        let (_, inserted) = self.graph.add_edge(parent, vertex, transform)?;
        debug_assert!(inserted, "a new vertex has no edge yet");
        self.publisher
            .notify(&FrameEvent::FrameAdded(FrameAddedEvent {
                parent,
                frame: vertex,
                transform,
            }))?;
        Ok(vertex)
    }

    pub fn add_frame_by_label(
        &mut self,
        frame: Frame,
        parent: &str,
        transform: Transform,
    ) -> FrameGraphResult<VertexHandle> {
        let parent = self
            .graph
            .vertex_by_label(parent)
            .ok_or_else(|| FrameGraphError::UnknownFrame(parent.into()))?;
        self.add_frame(frame, parent, transform)
    }

    /// Adds `frame` without connecting it to anything, making it the root of a new subtree,
    /// then publishes a `FrameRootAdded` event.
    pub fn add_root_frame(&mut self, frame: Frame) -> FrameGraphResult<VertexHandle> {
        let vertex = self.graph.add_vertex(frame)?;
        self.publisher
            .notify(&FrameEvent::FrameRootAdded(FrameRootAddedEvent { frame: vertex }))?;
        Ok(vertex)
    }

    pub fn add_edge(
        &mut self,
        from: VertexHandle,
        to: VertexHandle,
        transform: Transform,
    ) -> FrameGraphResult<(EdgeHandle, bool)> {
        self.graph.add_edge(from, to, transform)
    }

    pub fn add_edge_by_label(
        &mut self,
        from: &str,
        to: &str,
        transform: Transform,
    ) -> FrameGraphResult<(EdgeHandle, bool)> {
        self.graph.add_edge_by_label(from, to, transform)
    }

    fn check_not_root(&self, vertex: VertexHandle) -> FrameGraphResult<()> {
        if self.is_root(vertex) {
            warn!("refusing to remove the root frame");
            return Err(FrameGraphError::InvariantViolation(
                "the root frame cannot be removed".to_string(),
            ));
        }
        Ok(())
    }

    /// Removes a frame and every transform going in or out of it. The root is off limits.
    pub fn remove_vertex(&mut self, vertex: VertexHandle) -> FrameGraphResult<Frame> {
        self.check_not_root(vertex)?;
        self.graph.remove_vertex(vertex)
    }

    pub fn remove_frame_by_label(&mut self, id: &str) -> FrameGraphResult<Frame> {
        let vertex = self
            .graph
            .vertex_by_label(id)
            .ok_or_else(|| FrameGraphError::UnknownFrame(id.into()))?;
        self.remove_vertex(vertex)
    }

    pub fn remove_edge(
        &mut self,
        from: VertexHandle,
        to: VertexHandle,
    ) -> FrameGraphResult<Transform> {
        self.graph.remove_edge(from, to)
    }

    pub fn remove_edge_by_label(&mut self, from: &str, to: &str) -> FrameGraphResult<Transform> {
        self.graph.remove_edge_by_label(from, to)
    }

    /// Removes every frame but the root. The root keeps its handle and items, subscriptions
    /// are kept.
    pub fn clear(&mut self) {
        self.graph.retain_only(self.root);
    }

    pub fn frame_mut(&mut self, vertex: VertexHandle) -> FrameGraphResult<&mut Frame> {
        self.graph.frame_mut(vertex)
    }

    pub fn transform_mut(&mut self, edge: EdgeHandle) -> FrameGraphResult<&mut Transform> {
        self.graph.transform_mut(edge)
    }

    pub fn set_transform(&mut self, edge: EdgeHandle, transform: Transform) -> FrameGraphResult<()> {
        self.graph.set_transform(edge, transform)
    }

    pub fn set_transform_by_label(
        &mut self,
        from: &str,
        to: &str,
        transform: Transform,
    ) -> FrameGraphResult<()> {
        self.graph.set_transform_by_label(from, to, transform)
    }
}
