use std::{collections::HashSet, iter::FusedIterator, rc::Rc};

use memscope_core::{
    AddressSpace, Hex, MaybeObject, Object, ObjectArgs, ObjectChain, Profile, TypeSpec,
};

/// An iterator for traversing list entries.
///
/// Iterates over the structures linked through a `_LIST_ENTRY` member,
/// starting at a list head that is not itself part of a structure.
///
/// The walk ends at the head, at a NULL or unreadable link, or at an entry
/// that was already visited.
pub struct ListEntryIterator {
    state: Option<ListState>,
}

struct ListState {
    profile: Rc<Profile>,
    vm: Rc<dyn AddressSpace>,
    head: Object,

    /// Type of the containing structure.
    target: TypeSpec,

    /// Offset of the `_LIST_ENTRY` member in the containing structure.
    ///
    /// The offset is subtracted from the entry address to get the containing
    /// structure, similar to the `CONTAINING_RECORD` macro in the Windows
    /// kernel.
    offset: u64,

    /// Address of the next `_LIST_ENTRY` to visit.
    next: Option<u64>,

    visited: HashSet<u64>,
}

impl ListEntryIterator {
    /// Creates an iterator over the `type_name` structures linked through
    /// their `member` field to `head`.
    pub fn new(head: &Object, type_name: &str, member: &str) -> Self {
        let profile = head.profile().clone();

        let offset = match profile.offset_of(type_name, member) {
            Ok(offset) => offset,
            Err(err) => {
                tracing::debug!(type_name, member, %err, "cannot walk list");
                return Self::empty();
            }
        };

        Self {
            state: Some(ListState {
                vm: head.vm().clone(),
                next: head.m("Flink").value().ok(),
                target: TypeSpec::named(type_name),
                visited: HashSet::from([head.offset()]),
                head: head.clone(),
                profile,
                offset,
            }),
        }
    }

    /// Creates an iterator from a possibly invalid list head.
    ///
    /// An invalid head yields nothing.
    pub fn from_head(head: MaybeObject, type_name: &str, member: &str) -> Self {
        match head {
            Ok(head) => Self::new(&head, type_name, member),
            Err(err) => {
                tracing::debug!(type_name, member, %err, "invalid list head");
                Self::empty()
            }
        }
    }

    /// Creates an iterator that yields nothing.
    pub fn empty() -> Self {
        Self { state: None }
    }
}

impl ListState {
    fn next(&mut self) -> Option<Object> {
        let entry = self.next.take()?;

        if entry == 0 || entry == self.head.offset() {
            return None;
        }

        if !self.visited.insert(entry) {
            tracing::debug!(entry = %Hex(entry), "list cycle");
            return None;
        }

        let link = self
            .profile
            .object_with(&"_LIST_ENTRY".into(), ObjectArgs::new(entry, self.vm.clone()))
            .ok()?;

        self.next = link.m("Flink").value().ok();

        let args = ObjectArgs::new(entry.wrapping_sub(self.offset), self.vm.clone())
            .with_parent(&self.head);

        match self.profile.object_with(&self.target, args) {
            Ok(object) => Some(object),
            Err(err) => {
                tracing::trace!(entry = %Hex(entry), %err, "invalid list element");
                self.next = None;
                None
            }
        }
    }
}

impl Iterator for ListEntryIterator {
    type Item = Object;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.state.as_mut()?.next();
        if item.is_none() {
            self.state = None;
        }
        item
    }
}

impl FusedIterator for ListEntryIterator {}

#[cfg(test)]
mod tests {
    use memscope_core::{BufferSpace, TypeDef};

    use super::*;

    fn profile() -> Rc<Profile> {
        memscope_core::ProfileBuilder::new("test")
            .vtypes([
                (
                    "_LIST_ENTRY",
                    TypeDef::new(8)
                        .field("Flink", 0, TypeSpec::pointer("_LIST_ENTRY"))
                        .field("Blink", 4, TypeSpec::pointer("_LIST_ENTRY")),
                ),
                (
                    "_ITEM",
                    TypeDef::new(0x10)
                        .field("Id", 0, "unsigned long")
                        .field("Links", 8, "_LIST_ENTRY"),
                ),
            ])
            .build()
    }

    fn ids(iter: ListEntryIterator) -> Vec<u64> {
        iter.map(|item| item.m("Id").value().unwrap()).collect()
    }

    #[test]
    fn walks_until_head() {
        let mut space = BufferSpace::new("test");

        // head -> A(1) -> B(2) -> head
        space.write_u32(0x100, 0x1008);
        space.write_u32(0x1000, 1);
        space.write_u32(0x1008, 0x2008);
        space.write_u32(0x2000, 2);
        space.write_u32(0x2008, 0x100);

        let vm: Rc<dyn AddressSpace> = Rc::new(space);
        let head = profile().object("_LIST_ENTRY", 0x100, &vm).unwrap();

        assert_eq!(ids(ListEntryIterator::new(&head, "_ITEM", "Links")), [1, 2]);
    }

    #[test]
    fn stops_at_cycle_null_and_unreadable() {
        let mut space = BufferSpace::new("test");

        // head -> A(1) -> B(2) -> A
        space.write_u32(0x100, 0x1008);
        space.write_u32(0x1000, 1);
        space.write_u32(0x1008, 0x2008);
        space.write_u32(0x2000, 2);
        space.write_u32(0x2008, 0x1008);

        // head -> C(3) -> NULL
        space.write_u32(0x200, 0x3008);
        space.write_u32(0x3000, 3);
        space.write_u32(0x3008, 0);

        // head -> D(4) -> unmapped
        space.write_u32(0x300, 0x4008);
        space.write_u32(0x4000, 4);
        space.write_u32(0x4008, 0x9008);

        let vm: Rc<dyn AddressSpace> = Rc::new(space);
        let profile = profile();

        let head = profile.object("_LIST_ENTRY", 0x100, &vm).unwrap();
        assert_eq!(ids(ListEntryIterator::new(&head, "_ITEM", "Links")), [1, 2]);

        let head = profile.object("_LIST_ENTRY", 0x200, &vm).unwrap();
        assert_eq!(ids(ListEntryIterator::new(&head, "_ITEM", "Links")), [3]);

        let head = profile.object("_LIST_ENTRY", 0x300, &vm).unwrap();
        assert_eq!(ids(ListEntryIterator::new(&head, "_ITEM", "Links")), [4]);

        let missing = profile.object("_LIST_ENTRY", 0x9000, &vm);
        assert_eq!(ListEntryIterator::from_head(missing, "_ITEM", "Links").count(), 0);
        assert_eq!(ListEntryIterator::new(&head, "_ITEM", "Missing").count(), 0);
    }
}
