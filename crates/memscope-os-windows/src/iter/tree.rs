use std::{collections::HashSet, iter::FusedIterator};

use memscope_core::{Hex, Object};

/// An iterator for traversing the VAD tree.
///
/// Nodes are visited in pre-order: node, left subtree, right subtree.
/// Every node is visited at most once, so corrupt trees with cycles
/// terminate.
pub struct VadTreeIterator {
    stack: Vec<Object>,
    visited: HashSet<u64>,
}

impl VadTreeIterator {
    /// Creates a new VAD tree iterator.
    pub fn new(root: Option<Object>) -> Self {
        Self {
            stack: root.into_iter().collect(),
            visited: HashSet::new(),
        }
    }
}

impl Iterator for VadTreeIterator {
    type Item = Object;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(node) = self.stack.pop() {
            if !self.visited.insert(node.offset()) {
                tracing::debug!(node = %Hex(node.offset()), "VAD already visited");
                continue;
            }

            for child in ["RightChild", "LeftChild"] {
                match node.m(child).and_then(|pointer| pointer.dereference()) {
                    Ok(child) => self.stack.push(child),
                    Err(err) => {
                        tracing::trace!(node = %Hex(node.offset()), child, %err, "no VAD child")
                    }
                }
            }

            return Some(node);
        }

        None
    }
}

impl FusedIterator for VadTreeIterator {}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use memscope_core::{AddressSpace, BufferSpace, Config};

    use super::*;
    use crate::xp_sp2_x86;

    fn vad(space: &mut BufferSpace, offset: u64, tag: &[u8; 4], vpn: u32, left: u32, right: u32) {
        space.write(offset - 4, tag);
        space.write(offset, &[0; 0x34]);
        space.write_u32(offset, vpn);
        space.write_u32(offset + 4, vpn + 0xf);
        space.write_u32(offset + 0xc, left);
        space.write_u32(offset + 0x10, right);
    }

    #[test]
    fn visits_cyclic_tree_once() {
        let mut space = BufferSpace::new("test");

        // A -> (B, C); B -> (-, A); C has an unknown tag.
        vad(&mut space, 0x1008, b"VadS", 0x10, 0x2008, 0x3008);
        vad(&mut space, 0x2008, b"Vad ", 0x20, 0, 0x1008);
        vad(&mut space, 0x3008, b"XXXX", 0x30, 0, 0);

        let vm: Rc<dyn AddressSpace> = Rc::new(space);
        let profile = xp_sp2_x86(Config::default());
        let root = profile.object("_MMVAD", 0x1008, &vm).unwrap();
        assert_eq!(root.type_name(), "_MMVAD_SHORT");

        let nodes = VadTreeIterator::new(Some(root)).collect::<Vec<_>>();
        let offsets = nodes.iter().map(Object::offset).collect::<Vec<_>>();
        assert_eq!(offsets, [0x1008, 0x2008]);
        assert_eq!(nodes[1].type_name(), "_MMVAD_LONG");
        assert_eq!(nodes[1].tag(), Some(&b"Vad "[..]));
    }

    #[test]
    fn pre_order() {
        let mut space = BufferSpace::new("test");

        //      A
        //    B   E
        //   C D
        vad(&mut space, 0x1008, b"VadS", 0xa, 0x2008, 0x5008);
        vad(&mut space, 0x2008, b"VadS", 0xb, 0x3008, 0x4008);
        vad(&mut space, 0x3008, b"VadF", 0xc, 0, 0);
        vad(&mut space, 0x4008, b"Vadl", 0xd, 0, 0);
        vad(&mut space, 0x5008, b"VadS", 0xe, 0, 0);

        let vm: Rc<dyn AddressSpace> = Rc::new(space);
        let profile = xp_sp2_x86(Config::default());
        let root = profile.object("_MMVAD", 0x1008, &vm).ok();

        let vpns = VadTreeIterator::new(root)
            .map(|node| node.m("StartingVpn").and_then(|vpn| vpn.value()).unwrap())
            .collect::<Vec<_>>();
        assert_eq!(vpns, [0xa, 0xb, 0xc, 0xd, 0xe]);

        assert_eq!(VadTreeIterator::new(None).count(), 0);
    }

    #[test]
    fn unknown_tag_is_invalid() {
        let mut space = BufferSpace::new("test");
        vad(&mut space, 0x1008, b"Vad?", 0x10, 0, 0);

        let vm: Rc<dyn AddressSpace> = Rc::new(space);
        let profile = xp_sp2_x86(Config::default());
        let err = profile.object("_MMVAD", 0x1008, &vm).unwrap_err();
        assert!(err.reason().starts_with("Unknown VAD tag"));
    }
}
