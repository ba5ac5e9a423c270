//! Discovery of the kernel directory table base.

use std::collections::VecDeque;

use memchr::memmem;
use memscope_core::{Hex, MagicProvider, MagicValue, Object, ObjectChain};

use crate::comps::WindowsProcess;

/// Name under which [`DtbScanner`] is registered.
pub const DTB_SCANNER: &str = "VolatilityDTB";

/// Name under which the well-known KPCR address is registered.
pub const KPCR_DEFAULT: &str = "WellKnownKPCR";

/// Granularity at which the scanner skips over unreadable memory.
const HOLE_SKIP: u64 = 0x1000;

/// Suggests a single address known in advance.
///
/// Unlike a fixed magic value, a suggestion can be overridden by the
/// configuration.
pub struct WellKnownAddress(pub u64);

impl MagicProvider for WellKnownAddress {
    fn suggestions<'a>(&'a self, _magic: &'a Object) -> Box<dyn Iterator<Item = MagicValue> + 'a> {
        Box::new(std::iter::once(MagicValue::Int(self.0)))
    }
}

/// Suggests kernel DTBs by scanning physical memory for the idle process.
///
/// Every `_EPROCESS` starts with a dispatcher header of a known shape. The
/// scanner searches the address space of the magic namespace for that
/// signature, instantiates a process at each hit, and suggests the page
/// directory of the one named `Idle`.
pub struct DtbScanner {
    signature: Vec<u8>,
}

impl DtbScanner {
    /// Creates a scanner with a fallback signature.
    ///
    /// The `DTBSignature` magic value of the namespace takes precedence.
    pub fn new(signature: Vec<u8>) -> Self {
        Self { signature }
    }
}

impl MagicProvider for DtbScanner {
    fn suggestions<'a>(&'a self, magic: &'a Object) -> Box<dyn Iterator<Item = MagicValue> + 'a> {
        let signature = magic
            .parent()
            .and_then(|namespace| namespace.m("DTBSignature").ok())
            .and_then(|signature| signature.magic_value().ok())
            .and_then(|signature| signature.as_bytes().map(<[u8]>::to_vec))
            .unwrap_or_else(|| self.signature.clone());

        let block_size = match magic.profile().config().scan_block_size() {
            Ok(block_size) => block_size,
            Err(err) => {
                tracing::warn!(%err, "not scanning for the kernel DTB");
                return Box::new(std::iter::empty());
            }
        };

        Box::new(DtbCandidates::new(magic.clone(), signature, block_size))
    }
}

/// Lazily scans for signature hits and turns them into DTB suggestions.
struct DtbCandidates {
    /// Object whose profile and address space are scanned.
    origin: Object,
    signature: Vec<u8>,
    block_size: u64,

    /// Start of the next block.
    offset: u64,

    /// Hits at or before this offset were already reported.
    scanned: u64,

    pending: VecDeque<u64>,
    done: bool,
}

impl DtbCandidates {
    fn new(origin: Object, signature: Vec<u8>, block_size: u64) -> Self {
        let done = signature.is_empty() || block_size < signature.len() as u64;

        Self {
            origin,
            signature,
            block_size,
            offset: 0,
            scanned: 0,
            pending: VecDeque::new(),
            done,
        }
    }

    /// Reads the next block and queues its hits.
    ///
    /// Complete blocks overlap by the signature length minus one, so a
    /// signature that straddles two blocks is still found. After a short
    /// read the scan resumes at the next page past the hole.
    fn scan_block(&mut self) {
        let size = self.origin.vm().size();
        if self.offset >= size {
            self.done = true;
            return;
        }

        let wanted = self.block_size.min(size - self.offset);
        let data = self.origin.vm().read(self.offset, wanted as usize);

        for position in memmem::find_iter(&data, &self.signature) {
            let hit = self.offset + position as u64;
            if hit >= self.scanned {
                self.pending.push_back(hit);
            }
        }

        let end = self.offset + data.len() as u64;

        if data.len() as u64 == wanted {
            self.scanned = end.saturating_sub(self.signature.len() as u64 - 1);
            self.offset = if end >= size { end } else { self.scanned };
            return;
        }

        tracing::trace!(hole = %Hex(end), "skipping unreadable memory");
        self.scanned = end;
        self.offset = (end / HOLE_SKIP + 1) * HOLE_SKIP;
    }

    fn candidate(&self, hit: u64) -> Option<u64> {
        let process = self
            .origin
            .profile()
            .object("_EPROCESS", hit, self.origin.vm())
            .ok()?;

        let name = process.m("ImageFileName").string().ok()?;
        if !name.contains("Idle") {
            return None;
        }

        let dtb = WindowsProcess::new(process).directory_table_base().ok()?;
        tracing::debug!(process = %Hex(hit), %dtb, "found idle process");
        Some(dtb.0)
    }
}

impl Iterator for DtbCandidates {
    type Item = MagicValue;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            while let Some(hit) = self.pending.pop_front() {
                if let Some(dtb) = self.candidate(hit) {
                    return Some(MagicValue::Int(dtb));
                }
            }

            if self.done {
                return None;
            }

            self.scan_block();
        }
    }
}
