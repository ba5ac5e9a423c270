use std::{iter::FusedIterator, rc::Rc};

use memscope_core::{AddressSpace, Hex, Object, ObjectArgs, ObjectChain, Profile, TypeSpec};

use crate::{
    comps::{WindowsHandleTableEntry, read_unicode_string},
    profile::{
        HANDLE_LEAF_ENTRIES, HANDLE_MID_ENTRIES, HANDLE_OBJECT_MASK, HANDLE_TABLE_LEVEL_MASK,
        HANDLE_TABLE_MAX_LEVEL,
    },
};

/// Handle table geometry, taken from the profile constants.
#[derive(Debug, Clone, Copy)]
struct Geometry {
    level_mask: u64,
    max_level: u64,
    object_mask: u64,
    leaf_entries: u64,
    mid_entries: u64,
}

impl Geometry {
    fn from_profile(profile: &Profile) -> Option<Self> {
        Some(Self {
            level_mask: profile.constant(HANDLE_TABLE_LEVEL_MASK)?,
            max_level: profile.constant(HANDLE_TABLE_MAX_LEVEL)?,
            object_mask: profile.constant(HANDLE_OBJECT_MASK)?,
            leaf_entries: profile.constant(HANDLE_LEAF_ENTRIES)?,
            mid_entries: profile.constant(HANDLE_MID_ENTRIES)?,
        })
    }

    /// Number of handles covered by one entry of a table at `level`, or
    /// `None` if it does not fit in 64 bits.
    fn span(&self, level: u64) -> Option<u64> {
        match level {
            0 => Some(1),
            _ => (1..level).try_fold(self.leaf_entries, |span, _| {
                span.checked_mul(self.mid_entries)
            }),
        }
    }
}

/// A table being walked.
struct Frame {
    /// The table, as an array of entries.
    table: Object,

    /// Remaining levels below this table; 0 is a leaf table.
    level: u64,

    /// Index of the next entry.
    index: u64,

    /// Index of the first handle covered by this table.
    first: u64,
}

/// An iterator over the valid entries of a handle table.
///
/// Tables are walked depth first with an explicit stack. Each step down
/// decrements the level encoded in the table code, so the depth is bounded
/// even when entries point back at their own table. Entries whose object
/// header is unreadable or has no type name are skipped.
pub struct HandleTableEntryIterator {
    profile: Option<Rc<Profile>>,
    vm: Option<Rc<dyn AddressSpace>>,
    geometry: Option<Geometry>,
    stack: Vec<Frame>,
}

impl HandleTableEntryIterator {
    /// Creates an iterator over the table described by `table_code`.
    pub fn new(handle_table: &Object, table_code: u64) -> Self {
        let profile = handle_table.profile().clone();

        let Some(geometry) = Geometry::from_profile(&profile) else {
            tracing::debug!(profile = profile.name(), "profile has no handle table geometry");
            return Self::empty();
        };

        let mut result = Self {
            vm: Some(handle_table.vm().clone()),
            profile: Some(profile),
            geometry: Some(geometry),
            stack: Vec::new(),
        };

        let level = table_code & geometry.level_mask;
        let base = table_code & !geometry.level_mask;
        if level > geometry.max_level {
            tracing::debug!(table_code = %Hex(table_code), level, "handle table level out of range");
            return Self::empty();
        }

        result.descend(base, level, 0);
        result
    }

    /// Creates an iterator that yields nothing.
    pub fn empty() -> Self {
        Self {
            profile: None,
            vm: None,
            geometry: None,
            stack: Vec::new(),
        }
    }

    /// Pushes the table at `base`.
    fn descend(&mut self, base: u64, level: u64, first: u64) {
        let (Some(profile), Some(vm), Some(geometry)) = (&self.profile, &self.vm, &self.geometry)
        else {
            return;
        };

        let spec = match level {
            0 => TypeSpec::array(geometry.leaf_entries, "_HANDLE_TABLE_ENTRY"),
            _ => TypeSpec::array(geometry.mid_entries, "address"),
        };

        match profile.object_with(&spec, ObjectArgs::new(base, vm.clone())) {
            Ok(table) => self.stack.push(Frame {
                table,
                level,
                index: 0,
                first,
            }),
            Err(err) => tracing::trace!(table = %Hex(base), level, %err, "invalid handle table"),
        }
    }

    /// Instantiates the object header an entry refers to.
    fn header(&self, entry: &Object) -> Option<Object> {
        let profile = self.profile.as_ref()?;
        let geometry = self.geometry.as_ref()?;

        let address = entry.m("Object").value().ok()? & geometry.object_mask;
        if address == 0 {
            return None;
        }

        let args = ObjectArgs::new(address, entry.vm().clone()).with_parent(entry);
        let header = profile
            .object_with(&"_OBJECT_HEADER".into(), args)
            .ok()?;

        match header.m("Type").m("Name").and_then(|name| read_unicode_string(&name)) {
            Ok(name) if !name.is_empty() => Some(header),
            _ => {
                tracing::trace!(header = %Hex(address), "invalid object header");
                None
            }
        }
    }
}

impl Iterator for HandleTableEntryIterator {
    type Item = WindowsHandleTableEntry;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let frame = self.stack.last_mut()?;
            let index = frame.index;

            if index >= frame.table.count().unwrap_or(0) {
                self.stack.pop();
                continue;
            }

            frame.index += 1;

            let (level, first) = (frame.level, frame.first);
            let Ok(entry) = frame.table.index(index) else {
                self.stack.pop();
                continue;
            };

            if level > 0 {
                let Ok(child) = entry.value() else {
                    self.stack.pop();
                    continue;
                };

                if child == 0 {
                    continue;
                }

                let child_first = self
                    .geometry
                    .as_ref()
                    .and_then(|geometry| geometry.span(level))
                    .and_then(|span| index.checked_mul(span))
                    .and_then(|offset| first.checked_add(offset));

                match child_first {
                    Some(child_first) => self.descend(child, level - 1, child_first),
                    None => tracing::trace!(level, index, "handle index out of range"),
                }

                continue;
            }

            let Some(handle) = first.checked_add(index).and_then(|slot| slot.checked_mul(4)) else {
                self.stack.pop();
                continue;
            };

            if let Some(header) = self.header(&entry) {
                return Some(WindowsHandleTableEntry::new(handle, entry, header));
            }
        }
    }
}

impl FusedIterator for HandleTableEntryIterator {}
