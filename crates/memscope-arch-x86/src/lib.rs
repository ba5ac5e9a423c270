//! 32-bit x86 (non-PAE) paging.
//!
//! Provides [`X86PagedSpace`], a virtual address space translated through
//! two-level page tables on top of any physical [`AddressSpace`].

mod paging;
mod space;
mod translation;

use memscope_core::{AddressSpace, Gfn, Pa, Va};
use zerocopy::FromBytes;

pub use self::{
    paging::{PageTableEntry, PageTableFlags, PageTableLevel},
    space::X86PagedSpace,
    translation::{VaTranslation, WalkStep},
};

/// 32-bit x86 architecture without PAE.
#[derive(Debug)]
pub struct X86;

impl X86 {
    /// The size of a page in bytes.
    pub const PAGE_SIZE: u64 = 0x1000;

    /// The number of bits to shift to get the page number.
    pub const PAGE_SHIFT: u64 = 12;

    /// Converts a physical address to a frame number.
    pub fn gfn_from_pa(pa: Pa) -> Gfn {
        pa.gfn(Self::PAGE_SHIFT)
    }

    /// Converts a frame number to a physical address.
    pub fn pa_from_gfn(gfn: Gfn) -> Pa {
        gfn.pa(Self::PAGE_SHIFT)
    }

    /// Returns the offset of `va` within a page mapped at `level`.
    pub fn va_offset_for(va: Va, level: PageTableLevel) -> u64 {
        va.offset_in(Self::page_size_for(level))
    }

    /// Returns the index of the entry for `va` in the table at `level`.
    pub fn va_index_for(va: Va, level: PageTableLevel) -> u64 {
        match level {
            PageTableLevel::Pt => (va.0 >> 12) & 0x3ff,
            PageTableLevel::Pd => (va.0 >> 22) & 0x3ff,
        }
    }

    /// Returns the size of a page mapped at `level`.
    pub fn page_size_for(level: PageTableLevel) -> u64 {
        match level {
            PageTableLevel::Pt => Self::PAGE_SIZE,
            PageTableLevel::Pd => 0x400000,
        }
    }

    /// Walks the page tables rooted at `root` for `va`.
    ///
    /// Page tables are read from `physical`. The walk stops at the first
    /// entry that is not present or cannot be read.
    pub fn translation(physical: &dyn AddressSpace, va: Va, root: Pa) -> VaTranslation {
        let mut translation = VaTranslation::new(va);
        let mut table = root;
        let mut level = Some(PageTableLevel::Pd);

        while let Some(current) = level {
            let index = Self::va_index_for(va, current);
            let address = table + index * size_of::<PageTableEntry>() as u64;

            let Some(entry) = Self::read_entry(physical, address) else {
                break;
            };

            let step = translation.push(current, entry, address);
            if !entry.present() || step.maps_page() {
                break;
            }

            table = Self::pa_from_gfn(entry.pfn());
            level = current.next();
        }

        translation
    }

    fn read_entry(physical: &dyn AddressSpace, pa: Pa) -> Option<PageTableEntry> {
        let data = physical.read_exact(pa.0, size_of::<PageTableEntry>())?;
        PageTableEntry::read_from_bytes(&data).ok()
    }
}
