//! Frames are the vertices of the transform graph.
//! A frame is identified by its id and carries an ordered list of items that are shared
//! with whoever else holds them: attaching an item to a frame never copies it.

use crate::error::{FrameGraphError, FrameGraphResult};
use crate::FrameId;
use std::any::Any;
use std::fmt;
use std::fmt::{Debug, Display};
use std::sync::Arc;

/// Opaque payload attached to a frame (point clouds, maps, sensor descriptions...).
/// Anything `Debug + Send + Sync + 'static` is an item.
pub trait Item: Any + Debug + Send + Sync {
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Any + Debug + Send + Sync> Item for T {
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// Shared handle on an item.
pub type ItemRef = Arc<dyn Item>;

#[derive(Clone, Debug)]
pub struct Frame {
    id: FrameId,
    items: Vec<ItemRef>,
}

impl Frame {
    pub fn new(id: impl Into<FrameId>) -> Self {
        Self {
            id: id.into(),
            items: Vec::new(),
        }
    }

    pub fn with_items(id: impl Into<FrameId>, items: Vec<ItemRef>) -> Self {
        Self {
            id: id.into(),
            items,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn frame_id(&self) -> &FrameId {
        &self.id
    }

    pub fn items(&self) -> &[ItemRef] {
        &self.items
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Attach an already shared item; the frame keeps one more reference on it.
    pub fn add_item(&mut self, item: ItemRef) {
        self.items.push(item);
    }

    /// Attach a freshly built item and return the shared handle on it.
    pub fn push_item<T: Item>(&mut self, item: T) -> Arc<T> {
        let item = Arc::new(item);
        self.items.push(item.clone());
        item
    }

    pub fn remove_item(&mut self, index: usize) -> Option<ItemRef> {
        if index < self.items.len() {
            Some(self.items.remove(index))
        } else {
            None
        }
    }

    pub fn clear_items(&mut self) {
        self.items.clear();
    }

    /// Typed view of the item at `index`.
    pub fn item_as<T: Item>(&self, index: usize) -> FrameGraphResult<Arc<T>> {
        let mismatch = || FrameGraphError::ItemTypeMismatch {
            frame: self.id.clone(),
            index,
            expected: std::any::type_name::<T>(),
        };
        let item = self.items.get(index).ok_or_else(mismatch)?;
        item.clone().into_any().downcast::<T>().map_err(|_| mismatch())
    }

    /// All the items of type `T`, in attachment order.
    pub fn items_of<T: Item>(&self) -> impl Iterator<Item = Arc<T>> + '_ {
        self.items
            .iter()
            .filter_map(|item| item.clone().into_any().downcast::<T>().ok())
    }
}

/// Two frames are equal if they have the same id and share the very same items.
impl PartialEq for Frame {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.items.len() == other.items.len()
            && self
                .items
                .iter()
                .zip(other.items.iter())
                .all(|(a, b)| Arc::ptr_eq(a, b))
    }
}

impl Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{} items]", self.id, self.items.len())
    }
}
