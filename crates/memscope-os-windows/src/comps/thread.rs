use memscope_core::{Hex, MaybeObject, NoneObject, Object, ObjectChain};

/// A Windows thread.
///
/// # Implementation Details
///
/// Corresponds to `_ETHREAD`.
pub struct WindowsThread {
    object: Object,
}

impl WindowsThread {
    /// Creates a new Windows thread.
    pub fn new(object: Object) -> Self {
        Self { object }
    }

    /// Returns the underlying `_ETHREAD` object.
    pub fn object(&self) -> &Object {
        &self.object
    }

    /// Returns the thread ID.
    ///
    /// # Implementation Details
    ///
    /// Corresponds to `_ETHREAD.Cid.UniqueThread`.
    pub fn id(&self) -> Result<u32, NoneObject> {
        Ok(self.object.m("Cid").m("UniqueThread").value()? as u32)
    }

    /// Returns the service descriptor table the thread dispatches system
    /// calls through.
    ///
    /// # Implementation Details
    ///
    /// Corresponds to `_KTHREAD.ServiceTable`, read as a
    /// `_SERVICE_DESCRIPTOR_TABLE`.
    pub fn service_table(&self) -> MaybeObject {
        self.object
            .m("Tcb")
            .m("ServiceTable")
            .dereference_as("_SERVICE_DESCRIPTOR_TABLE")
    }
}

impl std::fmt::Debug for WindowsThread {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowsThread")
            .field("offset", &Hex(self.object.offset()))
            .field("id", &self.id().ok())
            .finish()
    }
}
