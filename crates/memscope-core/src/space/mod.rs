//! Address spaces.
//!
//! An address space is the only way the engine touches memory. Backends
//! (raw images, page-table translated spaces, crash dumps) live outside of
//! this crate and only need to implement [`AddressSpace`].

mod buffer;

use std::rc::Rc;

pub use self::buffer::BufferSpace;
use crate::{MemscopeError, Pa};

/// A named, read-only, byte-addressable space.
pub trait AddressSpace {
    /// Returns the name of the address space.
    ///
    /// Names are informational, e.g. `"Kernel AS"` or `"Process 4"`.
    fn name(&self) -> &str;

    /// Reads up to `length` bytes starting at `offset`.
    ///
    /// The returned buffer is shorter than `length` when only a prefix of
    /// the range is available. Reading an unavailable range is not an error;
    /// it simply returns an empty buffer.
    fn read(&self, offset: u64, length: usize) -> Vec<u8>;

    /// Checks whether the byte at `offset` can be read.
    fn is_valid_address(&self, offset: u64) -> bool;

    /// Returns the end of the space: no address at or above it is readable.
    ///
    /// Addresses below it may still be unavailable; scanners use it to know
    /// when to stop skipping over holes.
    fn size(&self) -> u64;

    /// Returns the translation root of this space, if it has one.
    fn translation_root(&self) -> Option<Pa> {
        None
    }

    /// Creates a sibling address space named `name` over the same backing
    /// layer, using a different translation root (e.g. a process page
    /// directory).
    fn with_translation_root(
        &self,
        name: &str,
        root: Pa,
    ) -> Result<Rc<dyn AddressSpace>, MemscopeError> {
        let _ = (name, root);
        Err(MemscopeError::NotSupported)
    }

    /// Reads exactly `length` bytes, or returns `None` on a short read.
    fn read_exact(&self, offset: u64, length: usize) -> Option<Vec<u8>> {
        let data = self.read(offset, length);

        if data.len() != length {
            tracing::trace!(
                space = self.name(),
                offset = %crate::Hex(offset),
                length,
                available = data.len(),
                "short read"
            );

            return None;
        }

        Some(data)
    }
}

impl std::fmt::Debug for dyn AddressSpace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AddressSpace")
            .field("name", &self.name())
            .field("root", &self.translation_root())
            .finish()
    }
}
