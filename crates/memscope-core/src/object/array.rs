use std::iter::FusedIterator;

use super::{MaybeObject, Object};

/// An iterator over the elements of an array.
///
/// Elements are instantiated lazily. An element at an unreadable offset is
/// yielded as an invalid object; iteration continues with the next one.
pub struct ArrayIter {
    array: Object,
    index: u64,
    count: u64,
}

impl ArrayIter {
    pub(super) fn new(array: Object, count: u64) -> Self {
        Self {
            array,
            index: 0,
            count,
        }
    }
}

impl Iterator for ArrayIter {
    type Item = MaybeObject;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.count {
            return None;
        }

        let element = self.array.index(self.index);
        self.index += 1;
        Some(element)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = usize::try_from(self.count - self.index).unwrap_or(usize::MAX);
        (remaining, Some(remaining))
    }
}

impl FusedIterator for ArrayIter {}
