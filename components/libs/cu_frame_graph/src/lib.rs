//! A directed graph of coordinate frames linked by transforms.
//!
//! Frames are vertices looked up by their id, transforms are edges with at most one edge per
//! ordered pair of frames. [`TransformTree`] anchors the graph on a root frame and notifies
//! subscribers of every frame added to it.

pub mod config;
pub mod error;
pub mod events;
pub mod frame;
pub mod graph;
pub mod storage;
pub mod transform;
pub mod tree;

use compact_str::CompactString;

/// Frame identifier strings
pub type FrameId = CompactString;

pub use config::{read_configuration, read_configuration_str, FrameConfig, FrameTreeConfig};
pub use error::{FrameGraphError, FrameGraphResult};
pub use events::{
    FrameAddedEvent, FrameEvent, FrameEventDispatcher, FrameEventPublisher, FrameEventSubscriber,
    FrameRootAddedEvent, SharedSubscriber, SubscriptionId,
};
pub use frame::{Frame, Item, ItemRef};
pub use graph::TransformGraph;
pub use storage::{EdgeHandle, LabeledGraph, VertexHandle};
pub use transform::{Covariance, Transform};
pub use tree::{TransformTree, DEFAULT_ROOT_FRAME};

pub use cu29_clock::CuTime;
