use memscope_core::{Hex, NoneObject, Object};

use super::read_unicode_string;

/// A loaded kernel module or user-mode image.
///
/// # Implementation Details
///
/// Corresponds to `_LDR_DATA_TABLE_ENTRY`.
pub struct WindowsModule {
    object: Object,
}

impl WindowsModule {
    /// Creates a new Windows module.
    pub fn new(object: Object) -> Self {
        Self { object }
    }

    /// Returns the underlying `_LDR_DATA_TABLE_ENTRY` object.
    pub fn object(&self) -> &Object {
        &self.object
    }

    /// Returns the base address of the module.
    ///
    /// # Implementation Details
    ///
    /// Corresponds to `_LDR_DATA_TABLE_ENTRY.DllBase`.
    pub fn base_address(&self) -> Result<u64, NoneObject> {
        self.object.m("DllBase")?.value()
    }

    /// Returns the entry point of the module.
    ///
    /// # Implementation Details
    ///
    /// Corresponds to `_LDR_DATA_TABLE_ENTRY.EntryPoint`.
    pub fn entry_point(&self) -> Result<u64, NoneObject> {
        self.object.m("EntryPoint")?.value()
    }

    /// Returns the size of the module image.
    ///
    /// # Implementation Details
    ///
    /// Corresponds to `_LDR_DATA_TABLE_ENTRY.SizeOfImage`.
    pub fn size(&self) -> Result<u64, NoneObject> {
        self.object.m("SizeOfImage")?.value()
    }

    /// Returns the full path of the module.
    ///
    /// # Implementation Details
    ///
    /// Corresponds to `_LDR_DATA_TABLE_ENTRY.FullDllName`.
    pub fn full_name(&self) -> Result<String, NoneObject> {
        read_unicode_string(&self.object.m("FullDllName")?)
    }

    /// Returns the file name of the module.
    ///
    /// # Implementation Details
    ///
    /// Corresponds to `_LDR_DATA_TABLE_ENTRY.BaseDllName`.
    pub fn name(&self) -> Result<String, NoneObject> {
        read_unicode_string(&self.object.m("BaseDllName")?)
    }
}

impl std::fmt::Debug for WindowsModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowsModule")
            .field("offset", &Hex(self.object.offset()))
            .field("base_address", &self.base_address().ok().map(Hex))
            .field("name", &self.name().ok())
            .finish()
    }
}
