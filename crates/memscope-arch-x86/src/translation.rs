use memscope_core::{Pa, Va};
use smallvec::SmallVec;

use crate::{PageTableEntry, PageTableLevel, X86};

/// A page table entry read while walking the tables for an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkStep {
    /// Level of the table the entry was read from.
    pub level: PageTableLevel,

    /// The entry.
    pub entry: PageTableEntry,

    /// Physical address of the entry.
    pub address: Pa,
}

impl WalkStep {
    /// Checks whether the entry maps a page rather than a lower table.
    pub fn maps_page(&self) -> bool {
        self.entry.present() && (self.level == PageTableLevel::Pt || self.entry.large())
    }
}

/// The page table walk of a single virtual address.
///
/// Records every entry that was read, so a failed walk still tells at which
/// level the address stopped being mapped.
#[derive(Debug)]
pub struct VaTranslation {
    va: Va,
    steps: SmallVec<[WalkStep; 2]>,
}

impl VaTranslation {
    pub(crate) fn new(va: Va) -> Self {
        Self {
            va,
            steps: SmallVec::new(),
        }
    }

    pub(crate) fn push(
        &mut self,
        level: PageTableLevel,
        entry: PageTableEntry,
        address: Pa,
    ) -> WalkStep {
        let step = WalkStep {
            level,
            entry,
            address,
        };

        self.steps.push(step);
        step
    }

    /// Returns the translated virtual address.
    pub fn va(&self) -> Va {
        self.va
    }

    /// Returns the entries read during the walk, top level first.
    pub fn steps(&self) -> &[WalkStep] {
        &self.steps
    }

    /// Returns the entry that maps the page, if the walk reached one.
    pub fn leaf(&self) -> Option<&WalkStep> {
        self.steps.last().filter(|step| step.maps_page())
    }

    /// Returns the physical address, if the address is mapped.
    pub fn pa(&self) -> Option<Pa> {
        let leaf = self.leaf()?;
        let frame = match leaf.level {
            PageTableLevel::Pd => leaf.entry.large_pfn(),
            PageTableLevel::Pt => leaf.entry.pfn(),
        };

        Some(X86::pa_from_gfn(frame) + X86::va_offset_for(self.va, leaf.level))
    }

    /// Returns the number of bytes between the address and the end of its
    /// page, if the address is mapped.
    pub fn remaining(&self) -> Option<u64> {
        let leaf = self.leaf()?;
        Some(X86::page_size_for(leaf.level) - X86::va_offset_for(self.va, leaf.level))
    }
}
