use crate::{WindowsError, WindowsKernel, comps::WindowsModule};

/// A row of the kernel module listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleInfo {
    /// Virtual address of the `_LDR_DATA_TABLE_ENTRY`.
    pub offset: u64,

    /// Base name of the image.
    pub name: Option<String>,

    /// Full path of the image.
    pub path: Option<String>,

    /// Base address of the image.
    pub base: Option<u64>,

    /// Size of the image.
    pub size: Option<u64>,
}

impl From<&WindowsModule> for ModuleInfo {
    fn from(module: &WindowsModule) -> Self {
        Self {
            offset: module.object().offset(),
            name: module.name().ok(),
            path: module.full_name().ok(),
            base: module.base_address().ok(),
            size: module.size().ok(),
        }
    }
}

/// Lists the loaded kernel modules in load order.
pub fn modules(kernel: &WindowsKernel) -> Result<Vec<ModuleInfo>, WindowsError> {
    Ok(kernel
        .modules()?
        .map(|module| ModuleInfo::from(&module))
        .collect())
}

/// Kernel modules sorted by base address, for address lookups.
#[derive(Debug, Default)]
pub struct ModuleMap {
    modules: Vec<ModuleInfo>,
}

impl ModuleMap {
    /// Creates a map from a module listing.
    ///
    /// Modules whose base or size could not be read are left out.
    pub fn new(modules: impl IntoIterator<Item = ModuleInfo>) -> Self {
        let mut modules = modules
            .into_iter()
            .filter(|module| module.base.is_some() && module.size.is_some())
            .collect::<Vec<_>>();

        modules.sort_by_key(|module| module.base);
        Self { modules }
    }

    /// Returns the module whose image contains `address`.
    pub fn find_module(&self, address: u64) -> Option<&ModuleInfo> {
        let index = self
            .modules
            .partition_point(|module| module.base.is_some_and(|base| base <= address));

        let module = self.modules.get(index.checked_sub(1)?)?;
        let base = module.base?;
        let size = module.size?;

        (address - base < size).then_some(module)
    }

    /// Returns the number of modules.
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Checks if the map is empty.
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}
