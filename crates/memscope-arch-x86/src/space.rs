use std::rc::Rc;

use memscope_core::{AddressSpace, Hex, MemscopeError, Pa, Va};

use crate::X86;

/// A virtual address space translated through 32-bit page tables.
///
/// Reads are split at page boundaries and stop at the first page that is
/// not mapped or whose backing physical memory is unavailable.
pub struct X86PagedSpace {
    name: String,
    base: Rc<dyn AddressSpace>,
    dtb: Pa,
}

impl X86PagedSpace {
    /// Creates a space translated through the page directory at `dtb`.
    ///
    /// The DTB must be non-zero, page aligned and readable in `base`.
    pub fn new(
        name: impl Into<String>,
        base: Rc<dyn AddressSpace>,
        dtb: Pa,
    ) -> Result<Self, MemscopeError> {
        if dtb.is_null() || dtb.offset_in(X86::PAGE_SIZE) != 0 || dtb.0 > u64::from(u32::MAX) {
            return Err(MemscopeError::InvalidTranslationRoot(dtb));
        }

        if !base.is_valid_address(dtb.0) {
            tracing::debug!(%dtb, space = base.name(), "page directory not readable");
            return Err(MemscopeError::InvalidTranslationRoot(dtb));
        }

        Ok(Self {
            name: name.into(),
            base,
            dtb,
        })
    }

    /// Returns the page directory base.
    pub fn dtb(&self) -> Pa {
        self.dtb
    }

    /// Returns the physical address space.
    pub fn base(&self) -> &Rc<dyn AddressSpace> {
        &self.base
    }

    /// Translates a virtual address.
    pub fn translate(&self, va: Va) -> Option<Pa> {
        X86::translation(self.base.as_ref(), va, self.dtb).pa()
    }

    /// Translates a virtual address and returns the number of bytes that
    /// remain in its page.
    fn translate_chunk(&self, va: Va) -> Option<(Pa, u64)> {
        let translation = X86::translation(self.base.as_ref(), va, self.dtb);
        Some((translation.pa()?, translation.remaining()?))
    }
}

impl AddressSpace for X86PagedSpace {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&self, offset: u64, length: usize) -> Vec<u8> {
        let mut result = Vec::new();

        while result.len() < length {
            let va = Va(offset.wrapping_add(result.len() as u64));
            if va.0 > u64::from(u32::MAX) {
                break;
            }

            let Some((pa, remaining)) = self.translate_chunk(va) else {
                break;
            };

            let wanted = (length - result.len()).min(remaining as usize);
            let data = self.base.read(pa.0, wanted);
            let complete = data.len() == wanted;
            result.extend_from_slice(&data);

            if !complete {
                break;
            }
        }

        result
    }

    fn is_valid_address(&self, offset: u64) -> bool {
        if offset > u64::from(u32::MAX) {
            return false;
        }

        match self.translate(Va(offset)) {
            Some(pa) => self.base.is_valid_address(pa.0),
            None => false,
        }
    }

    fn size(&self) -> u64 {
        1 << 32
    }

    fn translation_root(&self) -> Option<Pa> {
        Some(self.dtb)
    }

    fn with_translation_root(
        &self,
        name: &str,
        root: Pa,
    ) -> Result<Rc<dyn AddressSpace>, MemscopeError> {
        tracing::trace!(name, root = %Hex(root.0), "deriving address space");
        Ok(Rc::new(Self::new(name, self.base.clone(), root)?))
    }
}
