//! Structural change notifications.
//!
//! A [`TransformTree`](crate::TransformTree) publishes a [`FrameEvent`] after each frame
//! insertion. Events are delivered synchronously, on the thread doing the mutation, to every
//! subscriber in subscription order. They are emitted once the mutation is complete: the
//! graph already reflects the change when a subscriber sees the event.

use crate::error::{FrameGraphError, FrameGraphResult};
use crate::storage::VertexHandle;
use crate::transform::Transform;
use log::trace;
use std::sync::{Arc, Mutex};

/// A frame was added below `parent`, connected by `parent -> frame` carrying `transform`.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameAddedEvent {
    pub parent: VertexHandle,
    pub frame: VertexHandle,
    pub transform: Transform,
}

/// A frame was added without any connection to the rest of the graph.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameRootAddedEvent {
    pub frame: VertexHandle,
}

#[derive(Clone, Debug, PartialEq)]
pub enum FrameEvent {
    FrameAdded(FrameAddedEvent),
    FrameRootAdded(FrameRootAddedEvent),
}

/// Anything that wants to be told about structural changes.
///
/// An error returned from here is handed back to whoever triggered the event, but the change
/// itself is not rolled back.
pub trait FrameEventSubscriber {
    fn notify_frame_event(&mut self, event: &FrameEvent) -> anyhow::Result<()>;
}

/// Per event kind callbacks, all defaulting to doing nothing.
/// Implement only the ones you care about; every `FrameEventDispatcher` is a
/// [`FrameEventSubscriber`].
pub trait FrameEventDispatcher {
    fn frame_added(&mut self, _event: &FrameAddedEvent) -> anyhow::Result<()> {
        Ok(())
    }

    fn frame_root_added(&mut self, _event: &FrameRootAddedEvent) -> anyhow::Result<()> {
        Ok(())
    }
}

impl<D: FrameEventDispatcher> FrameEventSubscriber for D {
    fn notify_frame_event(&mut self, event: &FrameEvent) -> anyhow::Result<()> {
        match event {
            FrameEvent::FrameAdded(e) => self.frame_added(e),
            FrameEvent::FrameRootAdded(e) => self.frame_root_added(e),
        }
    }
}

pub type SharedSubscriber = Arc<Mutex<dyn FrameEventSubscriber + Send>>;

/// Identifies a subscription so it can be cancelled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Default)]
pub struct FrameEventPublisher {
    subscribers: Vec<(SubscriptionId, SharedSubscriber)>,
    next_id: u64,
}

impl FrameEventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, subscriber: SharedSubscriber) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, subscriber));
        id
    }

    /// Returns false if the subscription was not (or no longer) active.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        self.subscribers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Delivers `event` to every subscriber in subscription order.
    /// Stops at the first subscriber failing and reports it as a `SubscriberFailure`.
    pub fn notify(&self, event: &FrameEvent) -> FrameGraphResult<()> {
        trace!("notifying {} subscribers of {:?}", self.subscribers.len(), event);
        for (id, subscriber) in &self.subscribers {
            let mut subscriber = subscriber.lock().map_err(|_| {
                FrameGraphError::SubscriberFailure(anyhow::anyhow!(
                    "subscriber {id:?} lock is poisoned"
                ))
            })?;
            subscriber
                .notify_frame_event(event)
                .map_err(FrameGraphError::SubscriberFailure)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for FrameEventPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameEventPublisher")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}
