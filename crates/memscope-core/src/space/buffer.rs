use std::collections::HashMap;

use super::AddressSpace;

const PAGE_SIZE: u64 = 0x1000;

/// A sparse, in-memory address space.
///
/// Memory is kept in 4 KiB pages; bytes in pages that were never written are
/// unavailable, so reads spanning them come back short. This makes the space
/// useful both as a physical layer for translated spaces and as a fixture
/// for exercising degradation paths.
#[derive(Default)]
pub struct BufferSpace {
    name: String,
    pages: HashMap<u64, Box<[u8; PAGE_SIZE as usize]>>,
}

impl BufferSpace {
    /// Creates an empty address space.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pages: HashMap::new(),
        }
    }

    /// Creates an address space whose first bytes are `data`.
    pub fn from_bytes(name: impl Into<String>, data: &[u8]) -> Self {
        let mut space = Self::new(name);
        space.write(0, data);
        space
    }

    /// Copies `data` into the space at `offset`, mapping pages as needed.
    pub fn write(&mut self, offset: u64, data: &[u8]) {
        for (index, byte) in data.iter().enumerate() {
            let address = offset.wrapping_add(index as u64);
            let page = self
                .pages
                .entry(address / PAGE_SIZE)
                .or_insert_with(|| Box::new([0u8; PAGE_SIZE as usize]));

            page[(address % PAGE_SIZE) as usize] = *byte;
        }
    }

    /// Writes a little-endian `u32` at `offset`.
    pub fn write_u32(&mut self, offset: u64, value: u32) {
        self.write(offset, &value.to_le_bytes());
    }

    /// Writes a little-endian `u64` at `offset`.
    pub fn write_u64(&mut self, offset: u64, value: u64) {
        self.write(offset, &value.to_le_bytes());
    }

    /// Unmaps the page containing `offset`.
    pub fn unmap(&mut self, offset: u64) {
        self.pages.remove(&(offset / PAGE_SIZE));
    }
}

impl AddressSpace for BufferSpace {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&self, offset: u64, length: usize) -> Vec<u8> {
        let mut result = Vec::new();
        let mut address = offset;

        while result.len() < length {
            let page = match self.pages.get(&(address / PAGE_SIZE)) {
                Some(page) => page,
                None => break,
            };

            let start = (address % PAGE_SIZE) as usize;
            let count = (PAGE_SIZE as usize - start).min(length - result.len());
            result.extend_from_slice(&page[start..start + count]);

            address = match address.checked_add(count as u64) {
                Some(address) => address,
                None => break,
            };
        }

        result
    }

    fn is_valid_address(&self, offset: u64) -> bool {
        self.pages.contains_key(&(offset / PAGE_SIZE))
    }

    fn size(&self) -> u64 {
        self.pages
            .keys()
            .max()
            .map_or(0, |page| (page + 1).saturating_mul(PAGE_SIZE))
    }
}
