//! Placeholder registry for two-phase upload-handle resolution.
//!
//! The tree builder is value-type-agnostic, so file parts enter the tree as
//! integer placeholder ids. The registry owns every handle during the build
//! phase; resolving the tree transfers each handle into the leaf that
//! references it, exactly once.

use crate::error::ParseError;
use crate::tree::Node;

/// Arena of upload handles keyed by the integer placeholder ids handed out
/// at registration.
#[derive(Debug)]
pub struct UploadRegistry<H> {
    slots: Vec<Option<H>>,
}

impl<H> UploadRegistry<H> {
    pub fn new() -> Self {
        Self { slots: Vec::new() }
    }

    /// Stores a handle and returns the fresh placeholder id referencing it.
    pub fn register(&mut self, handle: H) -> u64 {
        self.slots.push(Some(handle));
        (self.slots.len() - 1) as u64
    }

    /// Removes and returns the handle for an id; `None` when the id was
    /// never issued or the handle was already taken.
    pub fn take(&mut self, id: u64) -> Option<H> {
        self.slots.get_mut(id as usize).and_then(Option::take)
    }

    /// Number of handles still held by the registry.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Consumes the registry and a placeholder tree, substituting every
    /// leaf id with its registered handle.
    ///
    /// An id without a handle means classification and registration fell
    /// out of sync; that invariant violation surfaces as
    /// [`ParseError::DanglingPlaceholder`] instead of being ignored.
    pub fn resolve(mut self, tree: Node<u64>) -> Result<Node<H>, ParseError> {
        tree.try_map_values(&mut |id| self.take(id).ok_or(ParseError::DanglingPlaceholder(id)))
    }
}

impl<H> Default for UploadRegistry<H> {
    fn default() -> Self {
        Self::new()
    }
}
