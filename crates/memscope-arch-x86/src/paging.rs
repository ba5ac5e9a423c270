use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::Gfn;

/// The levels in the 32-bit (non-PAE) page table hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum PageTableLevel {
    /// Page table, whose entries map 4 KiB pages.
    Pt,

    /// Page directory, whose entries map a page table or a 4 MiB page.
    Pd,
}

impl PageTableLevel {
    /// Returns the level below this one, if any.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Pt => None,
            Self::Pd => Some(Self::Pt),
        }
    }
}

bitflags::bitflags! {
    /// Flags of a 32-bit page table entry.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PageTableFlags: u32 {
        /// The entry is present.
        const PRESENT = 1 << 0;

        /// The page is writable.
        const WRITE = 1 << 1;

        /// The page is accessible in user mode.
        const USER = 1 << 2;

        /// Write-through caching is enabled.
        const WRITE_THROUGH = 1 << 3;

        /// Caching is disabled.
        const CACHE_DISABLE = 1 << 4;

        /// The page has been accessed.
        const ACCESSED = 1 << 5;

        /// The page has been written to.
        const DIRTY = 1 << 6;

        /// The PDE maps a 4MB page.
        const LARGE = 1 << 7;

        /// The page is global.
        const GLOBAL = 1 << 8;

        /// Windows: the entry is a transition or prototype PTE.
        const TRANSITION = 1 << 11;
    }
}

/// A 32-bit page table entry.
#[repr(transparent)]
#[derive(Default, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct PageTableEntry(pub u32);

impl PageTableEntry {
    /// Returns the flags of the entry.
    pub fn flags(self) -> PageTableFlags {
        PageTableFlags::from_bits_truncate(self.0)
    }

    /// Checks the present bit.
    pub fn present(self) -> bool {
        self.flags().contains(PageTableFlags::PRESENT)
    }

    /// Checks the page size bit of a page directory entry.
    pub fn large(self) -> bool {
        self.flags().contains(PageTableFlags::LARGE)
    }

    /// Returns the frame of the 4 KiB page or page table.
    pub fn pfn(self) -> Gfn {
        Gfn::new(u64::from(self.0 >> 12))
    }

    /// Returns the first 4 KiB frame of a 4 MiB page.
    pub fn large_pfn(self) -> Gfn {
        Gfn::new(u64::from(self.0 >> 22) << 10)
    }
}

impl std::fmt::Debug for PageTableEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("PageTableEntry")
            .field("flags", &self.flags())
            .field("pfn", &self.pfn())
            .finish()
    }
}
