use std::rc::Rc;

use memscope_arch_x86::X86PagedSpace;
use memscope_core::{
    AddressSpace, Config, Hex, MaybeObject, NoneObject, ObjectChain, Pa, Profile,
    magic::MAGIC_NAMESPACE,
};

use crate::{
    WindowsError,
    comps::{WindowsModule, WindowsProcess},
    iter::ListEntryIterator,
};

/// A Windows kernel: a profile bound to the kernel virtual address space.
///
/// This is where plugins start. Global structures are located either from
/// the configuration or through the processor control region:
/// `_KPCR.KdVersionBlock -> DebuggerDataList -> _KDDEBUGGER_DATA64`.
pub struct WindowsKernel {
    profile: Rc<Profile>,
    vm: Rc<dyn AddressSpace>,
}

impl WindowsKernel {
    /// Creates a kernel over an already translated address space.
    pub fn new(profile: Rc<Profile>, vm: Rc<dyn AddressSpace>) -> Self {
        Self { profile, vm }
    }

    /// Creates a kernel from physical memory.
    ///
    /// The kernel DTB is taken from the `DTB` magic value, which is either
    /// configured or found by scanning `physical`.
    pub fn from_physical(
        profile: Rc<Profile>,
        physical: Rc<dyn AddressSpace>,
    ) -> Result<Self, WindowsError> {
        if profile.config().dtb.is_none() {
            profile.config().scan_block_size()?;
        }

        let dtb = profile
            .object(MAGIC_NAMESPACE, 0, &physical)
            .m("DTB")
            .value()?;

        tracing::debug!(dtb = %Hex(dtb), "kernel directory table base");

        let vm = X86PagedSpace::new("Kernel AS", physical, Pa(dtb))?;
        Ok(Self::new(profile, Rc::new(vm)))
    }

    /// Returns the profile.
    pub fn profile(&self) -> &Rc<Profile> {
        &self.profile
    }

    /// Returns the kernel address space.
    pub fn vm(&self) -> &Rc<dyn AddressSpace> {
        &self.vm
    }

    /// Returns the configuration.
    pub fn config(&self) -> &Config {
        self.profile.config()
    }

    /// Returns an integer magic value.
    pub fn magic(&self, name: &str) -> Result<u64, NoneObject> {
        self.profile
            .object(MAGIC_NAMESPACE, 0, &self.vm)
            .m(name)
            .value()
    }

    /// Returns the kernel processor control region.
    pub fn kpcr(&self) -> MaybeObject {
        let address = self.magic("KPCR")?;
        self.profile.object("_KPCR", address, &self.vm)
    }

    /// Returns the kernel debugger data block.
    ///
    /// # Implementation Details
    ///
    /// Follows `_KPCR.KdVersionBlock->DebuggerDataList`, which points to a
    /// pointer to the `_KDDEBUGGER_DATA64`.
    pub fn kdbg(&self) -> MaybeObject {
        self.kpcr()
            .m("KdVersionBlock")
            .m("DebuggerDataList")
            .dereference()
            .dereference_as("_KDDEBUGGER_DATA64")
    }

    /// Returns the head of the active process list.
    pub fn ps_active_process_head(&self) -> MaybeObject {
        match self.config().ps_active_process_head {
            Some(address) => self.profile.object("_LIST_ENTRY", address, &self.vm),
            None => self.kdbg().m("PsActiveProcessHead").dereference(),
        }
    }

    /// Returns the head of the loaded module list.
    pub fn ps_loaded_module_list(&self) -> MaybeObject {
        match self.config().ps_loaded_module_list {
            Some(address) => self.profile.object("_LIST_ENTRY", address, &self.vm),
            None => self.kdbg().m("PsLoadedModuleList").dereference(),
        }
    }

    /// Returns an iterator over the active processes.
    ///
    /// Fails only when the process list head cannot be located.
    pub fn processes(
        &self,
    ) -> Result<impl Iterator<Item = WindowsProcess> + use<>, WindowsError> {
        let head = self.ps_active_process_head()?;
        Ok(ListEntryIterator::new(&head, "_EPROCESS", "ActiveProcessLinks").map(WindowsProcess::new))
    }

    /// Returns an iterator over the loaded kernel modules.
    ///
    /// Fails only when the module list head cannot be located.
    pub fn modules(&self) -> Result<impl Iterator<Item = WindowsModule> + use<>, WindowsError> {
        let head = self.ps_loaded_module_list()?;
        Ok(ListEntryIterator::new(&head, "_LDR_DATA_TABLE_ENTRY", "InLoadOrderLinks")
            .map(WindowsModule::new))
    }

    /// Finds an active process by ID.
    pub fn find_process(&self, pid: u32) -> Result<Option<WindowsProcess>, WindowsError> {
        Ok(self.processes()?.find(|process| process.id() == Ok(pid)))
    }
}

impl std::fmt::Debug for WindowsKernel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowsKernel")
            .field("profile", &self.profile.name())
            .field("vm", &self.vm.name())
            .finish()
    }
}
