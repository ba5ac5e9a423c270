use memscope_core::{Hex, MaybeObject, NoneObject, Object, ObjectArgs, ObjectChain};

use super::read_unicode_string;

/// An open handle.
///
/// # Implementation Details
///
/// Corresponds to `_HANDLE_TABLE_ENTRY` together with the `_OBJECT_HEADER`
/// it refers to.
pub struct WindowsHandleTableEntry {
    handle: u64,
    entry: Object,
    header: Object,
}

impl WindowsHandleTableEntry {
    /// Creates a new handle table entry.
    pub fn new(handle: u64, entry: Object, header: Object) -> Self {
        Self {
            handle,
            entry,
            header,
        }
    }

    /// Returns the handle value.
    pub fn handle(&self) -> u64 {
        self.handle
    }

    /// Returns the `_HANDLE_TABLE_ENTRY` object.
    pub fn entry(&self) -> &Object {
        &self.entry
    }

    /// Returns the `_OBJECT_HEADER` object.
    pub fn header(&self) -> &Object {
        &self.header
    }

    /// Returns the granted access mask.
    ///
    /// # Implementation Details
    ///
    /// Corresponds to `_HANDLE_TABLE_ENTRY.GrantedAccess`.
    pub fn granted_access(&self) -> Result<u64, NoneObject> {
        self.entry.m("GrantedAccess")?.value()
    }

    /// Returns the name of the object type, e.g. `File` or `Key`.
    ///
    /// # Implementation Details
    ///
    /// Corresponds to `_OBJECT_HEADER.Type->Name`.
    pub fn type_name(&self) -> Result<String, NoneObject> {
        read_unicode_string(&self.header.m("Type").m("Name")?)
    }

    /// Returns the address of the object body.
    pub fn body(&self) -> Result<u64, NoneObject> {
        Ok(self.header.m("Body")?.offset())
    }

    /// Returns the object body as `type_name`.
    pub fn object_as(&self, type_name: &str) -> MaybeObject {
        self.header.m("Body")?.cast(type_name)
    }

    /// Returns the name of the file a `File` handle refers to.
    ///
    /// # Implementation Details
    ///
    /// Corresponds to `_FILE_OBJECT.FileName` of the body.
    pub fn file_name(&self) -> Result<String, NoneObject> {
        read_unicode_string(&self.object_as("_FILE_OBJECT")?.m("FileName")?)
    }

    /// Returns the object name, or an empty string for unnamed objects.
    ///
    /// # Implementation Details
    ///
    /// The `_OBJECT_HEADER_NAME_INFO` precedes the header by
    /// `_OBJECT_HEADER.NameInfoOffset` bytes.
    pub fn object_name(&self) -> Result<String, NoneObject> {
        let offset = self.header.m("NameInfoOffset")?.value()?;
        if offset == 0 {
            return Ok(String::new());
        }

        let address = self.header.offset().wrapping_sub(offset);
        let args = ObjectArgs::new(address, self.header.vm().clone()).with_parent(&self.header);
        let name_info = self
            .header
            .profile()
            .object_with(&"_OBJECT_HEADER_NAME_INFO".into(), args)?;

        read_unicode_string(&name_info.m("Name")?)
    }
}

impl std::fmt::Debug for WindowsHandleTableEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowsHandleTableEntry")
            .field("handle", &Hex(self.handle))
            .field("header", &Hex(self.header.offset()))
            .field("type_name", &self.type_name().ok())
            .finish()
    }
}
