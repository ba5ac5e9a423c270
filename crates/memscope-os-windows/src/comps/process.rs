use std::rc::Rc;

use chrono::{DateTime, Utc};
use memscope_core::{
    AddressSpace, Hex, MaybeObject, NoneObject, Object, ObjectArgs, ObjectChain, ObjectClass, Pa,
};
use once_cell::unsync::OnceCell;

use super::{WindowsHandleTable, WindowsModule, WindowsRegion, WindowsThread, read_timestamp};
use crate::iter::{HandleTableEntryIterator, ListEntryIterator, VadTreeIterator};

/// Class of `_EPROCESS`.
///
/// `Peb` lives in the process address space, so it is provided through
/// [`WindowsProcess::peb`] instead of the type table.
pub struct ProcessClass;

impl ObjectClass for ProcessClass {
    fn member(&self, object: &Object, name: &str) -> Option<MaybeObject> {
        match name {
            "Peb" => Some(WindowsProcess::new(object.clone()).peb()),
            _ => None,
        }
    }
}

/// A Windows process.
///
/// # Implementation Details
///
/// Corresponds to `_EPROCESS`.
pub struct WindowsProcess {
    /// The `_EPROCESS` object in the kernel address space.
    object: Object,

    /// The process address space, built on first use.
    address_space: OnceCell<Result<Rc<dyn AddressSpace>, NoneObject>>,
}

impl WindowsProcess {
    /// Creates a new Windows process.
    pub fn new(object: Object) -> Self {
        Self {
            object,
            address_space: OnceCell::new(),
        }
    }

    /// Returns the underlying `_EPROCESS` object.
    pub fn object(&self) -> &Object {
        &self.object
    }

    /// Returns the address of the `_EPROCESS` structure.
    pub fn offset(&self) -> u64 {
        self.object.offset()
    }

    /// Returns the process ID.
    ///
    /// # Implementation Details
    ///
    /// Corresponds to `_EPROCESS.UniqueProcessId`.
    pub fn id(&self) -> Result<u32, NoneObject> {
        Ok(self.object.m("UniqueProcessId")?.value()? as u32)
    }

    /// Returns the parent process ID.
    ///
    /// # Implementation Details
    ///
    /// Corresponds to `_EPROCESS.InheritedFromUniqueProcessId`.
    pub fn parent_id(&self) -> Result<u32, NoneObject> {
        Ok(self.object.m("InheritedFromUniqueProcessId")?.value()? as u32)
    }

    /// Returns the short image name.
    ///
    /// # Implementation Details
    ///
    /// Corresponds to `_EPROCESS.ImageFileName`.
    pub fn name(&self) -> Result<String, NoneObject> {
        self.object.m("ImageFileName")?.string()
    }

    /// Returns the creation time, or `None` if it was never set.
    pub fn create_time(&self) -> Result<Option<DateTime<Utc>>, NoneObject> {
        read_timestamp(&self.object.m("CreateTime")?)
    }

    /// Returns the exit time, or `None` for a running process.
    pub fn exit_time(&self) -> Result<Option<DateTime<Utc>>, NoneObject> {
        read_timestamp(&self.object.m("ExitTime")?)
    }

    /// Returns the number of active threads.
    pub fn active_threads(&self) -> Result<u64, NoneObject> {
        self.object.m("ActiveThreads")?.value()
    }

    /// Returns the base of the page directory.
    ///
    /// # Implementation Details
    ///
    /// Corresponds to `_KPROCESS.DirectoryTableBase[0]`.
    pub fn directory_table_base(&self) -> Result<Pa, NoneObject> {
        self.object
            .m("Pcb")
            .m("DirectoryTableBase")
            .index(0)
            .value()
            .map(Pa)
    }

    /// Returns the address space of the process.
    ///
    /// The space is derived from the kernel address space with the
    /// process's page directory and cached for the lifetime of this
    /// wrapper.
    pub fn address_space(&self) -> Result<Rc<dyn AddressSpace>, NoneObject> {
        self.address_space
            .get_or_init(|| self.build_address_space())
            .clone()
    }

    fn build_address_space(&self) -> Result<Rc<dyn AddressSpace>, NoneObject> {
        let unavailable = || NoneObject::new("Unable to get process AS");

        let dtb = match self.directory_table_base() {
            Ok(dtb) => dtb,
            Err(err) => {
                tracing::debug!(process = %Hex(self.offset()), %err, "no directory table base");
                return Err(unavailable());
            }
        };

        let name = match self.id() {
            Ok(pid) => format!("Process {pid}"),
            Err(_) => format!("Process @ {}", Hex(self.offset())),
        };

        self.object
            .vm()
            .with_translation_root(&name, dtb)
            .map_err(|err| {
                tracing::debug!(process = %Hex(self.offset()), %dtb, %err, "unable to get process AS");
                unavailable()
            })
    }

    /// Returns the process environment block.
    ///
    /// The `_PEB` is instantiated in the process address space.
    pub fn peb(&self) -> MaybeObject {
        let vm = self.address_space()?;
        let address = self.object.member("Peb")?.value()?;

        let args = ObjectArgs::new(address, vm)
            .with_parent(&self.object)
            .with_name("Peb");

        match self.object.profile().object_with(&"_PEB".into(), args) {
            Ok(peb) if peb.is_valid() => Ok(peb),
            _ => Err(NoneObject::new("Peb not found")),
        }
    }

    /// Returns the handle table.
    ///
    /// # Implementation Details
    ///
    /// Corresponds to `_EPROCESS.ObjectTable`.
    pub fn handle_table(&self) -> Result<WindowsHandleTable, NoneObject> {
        self.object
            .m("ObjectTable")
            .dereference()
            .map(WindowsHandleTable::new)
    }

    /// Returns an iterator over the open handles.
    pub fn handles(&self) -> HandleTableEntryIterator {
        match self.handle_table() {
            Ok(table) => table.iter(),
            Err(err) => {
                tracing::debug!(process = %Hex(self.offset()), %err, "no handle table");
                HandleTableEntryIterator::empty()
            }
        }
    }

    /// Returns the root of the VAD tree.
    ///
    /// # Implementation Details
    ///
    /// Corresponds to `_EPROCESS.VadRoot`.
    pub fn vad_root(&self) -> MaybeObject {
        self.object.m("VadRoot").dereference()
    }

    /// Returns an iterator over the memory regions, in VAD tree pre-order.
    pub fn regions(&self) -> impl Iterator<Item = WindowsRegion> + use<> {
        VadTreeIterator::new(self.vad_root().ok()).map(WindowsRegion::new)
    }

    /// Returns an iterator over the threads.
    ///
    /// # Implementation Details
    ///
    /// Walks `_EPROCESS.ThreadListHead` through `_ETHREAD.ThreadListEntry`.
    pub fn threads(&self) -> impl Iterator<Item = WindowsThread> + use<> {
        ListEntryIterator::from_head(self.object.m("ThreadListHead"), "_ETHREAD", "ThreadListEntry")
            .map(WindowsThread::new)
    }

    /// Returns an iterator over the loaded modules, in load order.
    ///
    /// # Implementation Details
    ///
    /// Walks `_PEB.Ldr.InLoadOrderModuleList` in the process address space.
    pub fn modules(&self) -> impl Iterator<Item = WindowsModule> + use<> {
        let head = self.peb().m("Ldr").m("InLoadOrderModuleList");
        ListEntryIterator::from_head(head, "_LDR_DATA_TABLE_ENTRY", "InLoadOrderLinks")
            .map(WindowsModule::new)
    }
}

impl std::fmt::Debug for WindowsProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowsProcess")
            .field("offset", &Hex(self.offset()))
            .field("id", &self.id().ok())
            .field("name", &self.name().ok())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use memscope_core::Config;

    use super::*;
    use crate::{WindowsKernel, fixture};

    fn process(kernel: &WindowsKernel, pid: u32) -> WindowsProcess {
        kernel.find_process(pid).unwrap().unwrap()
    }

    #[test]
    fn peb_lives_in_process_address_space() {
        let kernel = fixture::kernel(Config::default());
        let smss = process(&kernel, 368);

        let vm = smss.address_space().unwrap();
        assert_eq!(vm.name(), "Process 368");
        assert_eq!(vm.translation_root(), Some(Pa(fixture::SMSS_DTB)));

        let peb = smss.peb().unwrap();
        assert_eq!(peb.offset(), fixture::PEB);
        assert_eq!(peb.m("ImageBaseAddress").value(), Ok(0x4858_0000));

        // The same PEB through the class member hook.
        assert_eq!(smss.object().m("Peb").map(|peb| peb.offset()), Ok(fixture::PEB));

        let modules = smss
            .modules()
            .map(|module| module.name())
            .collect::<Result<Vec<_>, _>>();
        assert_eq!(modules, Ok(vec![String::from("smss.exe")]));
    }

    #[test]
    fn kernel_process_has_no_peb() {
        let kernel = fixture::kernel(Config::default());
        let system = process(&kernel, 4);

        assert_eq!(system.peb().unwrap_err().reason(), "Peb not found");
        assert_eq!(system.modules().count(), 0);
        assert_eq!(system.regions().count(), 0);
        assert_eq!(system.handles().count(), 0);
    }

    #[test]
    fn threads() {
        let kernel = fixture::kernel(Config::default());

        let threads = process(&kernel, 4).threads().collect::<Vec<_>>();
        assert_eq!(threads.len(), 1);
        assert_eq!(threads[0].object().offset(), fixture::SYSTEM_THREAD);
        assert_eq!(threads[0].id(), Ok(8));
        assert_eq!(
            threads[0].service_table().map(|table| table.offset()),
            Ok(fixture::SERVICE_DESCRIPTOR_TABLE)
        );

        assert_eq!(process(&kernel, 368).threads().count(), 0);
    }
}
