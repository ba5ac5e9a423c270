use memscope_core::{Hex, NoneObject, Object};
use once_cell::unsync::OnceCell;

use crate::iter::HandleTableEntryIterator;

/// A Windows handle table.
///
/// A handle table in Windows tracks handles to kernel objects
/// for a specific process.
///
/// # Implementation Details
///
/// Corresponds to `_HANDLE_TABLE`.
pub struct WindowsHandleTable {
    object: Object,

    /// Corresponds to `_HANDLE_TABLE.TableCode`.
    table_code: OnceCell<Result<u64, NoneObject>>,
}

impl WindowsHandleTable {
    /// Creates a new Windows handle table.
    pub fn new(object: Object) -> Self {
        Self {
            object,
            table_code: OnceCell::new(),
        }
    }

    /// Returns the underlying `_HANDLE_TABLE` object.
    pub fn object(&self) -> &Object {
        &self.object
    }

    /// Returns the table code of the handle table.
    ///
    /// The low bits encode the number of table levels, the rest is the
    /// address of the top-level table.
    ///
    /// # Implementation Details
    ///
    /// Corresponds to `_HANDLE_TABLE.TableCode`.
    pub fn table_code(&self) -> Result<u64, NoneObject> {
        self.table_code
            .get_or_init(|| self.object.m("TableCode")?.value())
            .clone()
    }

    /// Returns the number of handles recorded in the table header.
    ///
    /// # Implementation Details
    ///
    /// Corresponds to `_HANDLE_TABLE.HandleCount`.
    pub fn handle_count(&self) -> Result<u64, NoneObject> {
        self.object.m("HandleCount")?.value()
    }

    /// Returns an iterator over the valid entries of the table.
    pub fn iter(&self) -> HandleTableEntryIterator {
        match self.table_code() {
            Ok(table_code) => HandleTableEntryIterator::new(&self.object, table_code),
            Err(err) => {
                tracing::debug!(table = %Hex(self.object.offset()), %err, "no table code");
                HandleTableEntryIterator::empty()
            }
        }
    }
}
