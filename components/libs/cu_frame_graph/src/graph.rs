//! The transform graph: label based operations on top of the storage.
//! No tree assumption is made here, any directed topology (cycles included) is accepted.

use crate::error::{FrameGraphError, FrameGraphResult};
use crate::frame::Frame;
use crate::storage::{EdgeHandle, LabeledGraph, VertexHandle};
use crate::transform::Transform;
use crate::FrameId;
use serde::{Serialize, Serializer};
use std::ops::Deref;

#[derive(Debug, Default)]
pub struct TransformGraph {
    storage: LabeledGraph,
}

impl Deref for TransformGraph {
    type Target = LabeledGraph;

    fn deref(&self) -> &Self::Target {
        &self.storage
    }
}

impl TransformGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// A graph holding `root` only. An empty graph has no label to clash with.
    pub(crate) fn with_root(root: Frame) -> (Self, VertexHandle) {
        let mut storage = LabeledGraph::new();
        let root = storage.insert_labeled(root);
        (Self { storage }, root)
    }

    fn resolve(&self, id: &str) -> FrameGraphResult<VertexHandle> {
        self.storage
            .vertex_by_label(id)
            .ok_or_else(|| FrameGraphError::UnknownFrame(FrameId::from(id)))
    }

    pub fn add_vertex(&mut self, frame: Frame) -> FrameGraphResult<VertexHandle> {
        self.storage.add_vertex(frame)
    }

    /// See [`LabeledGraph::add_edge`]: an existing edge is updated, never duplicated.
    pub fn add_edge(
        &mut self,
        from: VertexHandle,
        to: VertexHandle,
        transform: Transform,
    ) -> FrameGraphResult<(EdgeHandle, bool)> {
        self.storage.add_edge(from, to, transform)
    }

    /// Adds or updates the edge between the frames named `from` and `to`.
    pub fn add_edge_by_label(
        &mut self,
        from: &str,
        to: &str,
        transform: Transform,
    ) -> FrameGraphResult<(EdgeHandle, bool)> {
        let from = self.resolve(from)?;
        let to = self.resolve(to)?;
        self.storage.add_edge(from, to, transform)
    }

    pub fn edge_by_label(&self, from: &str, to: &str) -> FrameGraphResult<Option<EdgeHandle>> {
        Ok(self.storage.edge(self.resolve(from)?, self.resolve(to)?))
    }

    pub fn remove_vertex(&mut self, vertex: VertexHandle) -> FrameGraphResult<Frame> {
        self.storage.remove_vertex(vertex)
    }

    pub fn remove_vertex_by_label(&mut self, id: &str) -> FrameGraphResult<Frame> {
        let vertex = self.resolve(id)?;
        self.storage.remove_vertex(vertex)
    }

    pub fn remove_edge(
        &mut self,
        from: VertexHandle,
        to: VertexHandle,
    ) -> FrameGraphResult<Transform> {
        self.storage.remove_edge(from, to)
    }

    pub fn remove_edge_by_label(&mut self, from: &str, to: &str) -> FrameGraphResult<Transform> {
        let from = self.resolve(from)?;
        let to = self.resolve(to)?;
        self.storage.remove_edge(from, to)
    }

    pub fn frame_by_label(&self, id: &str) -> FrameGraphResult<&Frame> {
        self.storage.frame(self.resolve(id)?)
    }

    pub fn frame_mut(&mut self, vertex: VertexHandle) -> FrameGraphResult<&mut Frame> {
        self.storage.frame_mut(vertex)
    }

    pub fn frame_by_label_mut(&mut self, id: &str) -> FrameGraphResult<&mut Frame> {
        let vertex = self.resolve(id)?;
        self.storage.frame_mut(vertex)
    }

    pub fn transform_mut(&mut self, edge: EdgeHandle) -> FrameGraphResult<&mut Transform> {
        self.storage.transform_mut(edge)
    }

    pub fn set_transform(&mut self, edge: EdgeHandle, transform: Transform) -> FrameGraphResult<()> {
        self.storage.set_transform(edge, transform)
    }

    /// Transform of the edge `from -> to`, `EdgeNotFound` if the frames are not connected
    /// in that direction.
    pub fn transform_by_label(&self, from: &str, to: &str) -> FrameGraphResult<&Transform> {
        let edge = self
            .edge_by_label(from, to)?
            .ok_or_else(|| FrameGraphError::EdgeNotFound {
                from: from.to_string(),
                to: to.to_string(),
            })?;
        self.storage.transform(edge)
    }

    /// Replaces the transform of the existing edge `from -> to`.
    /// Unlike `add_edge_by_label`, this never creates the edge.
    pub fn set_transform_by_label(
        &mut self,
        from: &str,
        to: &str,
        transform: Transform,
    ) -> FrameGraphResult<()> {
        let edge = self
            .edge_by_label(from, to)?
            .ok_or_else(|| FrameGraphError::EdgeNotFound {
                from: from.to_string(),
                to: to.to_string(),
            })?;
        self.storage.set_transform(edge, transform)
    }

    pub fn clear(&mut self) {
        self.storage.clear();
    }

    pub(crate) fn retain_only(&mut self, keep: VertexHandle) {
        self.storage.retain_only(keep);
    }
}

#[derive(Serialize)]
struct FrameRepresentation<'a> {
    id: &'a str,
    items: usize,
}

#[derive(Serialize)]
struct EdgeRepresentation<'a> {
    src: &'a str,
    dst: &'a str,
    transform: &'a Transform,
}

#[derive(Serialize)]
struct TransformGraphRepresentation<'a> {
    frames: Vec<FrameRepresentation<'a>>,
    edges: Vec<EdgeRepresentation<'a>>,
}

impl Serialize for TransformGraph {
    /// This is a custom serialization to make this implementation independent of petgraph.
    /// Frames are summarized by their id and item count, edges refer to frames by id.
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let frames = self
            .vertices()
            .filter_map(|vertex| self.frame(vertex).ok())
            .map(|frame| FrameRepresentation {
                id: frame.id(),
                items: frame.item_count(),
            })
            .collect();

        let edges = self
            .edges()
            .filter_map(|edge| {
                let (source, target) = self.endpoints(edge).ok()?;
                Some(EdgeRepresentation {
                    src: self.label(source).ok()?,
                    dst: self.label(target).ok()?,
                    transform: self.transform(edge).ok()?,
                })
            })
            .collect();

        TransformGraphRepresentation { frames, edges }.serialize(serializer)
    }
}
