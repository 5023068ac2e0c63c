/// A simple slab allocator.
///
/// A `Slab` stores values in a contiguous vector and hands out small
/// indices that are reused after removal. The merge point of `flat_map`
/// keeps its live inner subscribers in one, so cancelling every sibling is
/// a single pass.
pub(crate) struct Slab<T> {
    /// Storage; `None` marks a free slot.
    items: Vec<Option<T>>,
    /// Stack of free indices that can be reused.
    free: Vec<usize>,
    len: usize,
}

impl<T> Slab<T> {
    /// Creates a slab with `size` free slots.
    pub(crate) fn new(size: usize) -> Self {
        let items = (0..size).map(|_| None).collect();
        let free = (0..size).rev().collect();

        Self {
            items,
            free,
            len: 0,
        }
    }

    /// Index the next [`insert`](Self::insert) will use.
    pub(crate) fn vacant_key(&self) -> usize {
        self.free.last().copied().unwrap_or(self.items.len())
    }

    /// Inserts a value and returns its index.
    pub(crate) fn insert(&mut self, item: T) -> usize {
        let index = match self.free.pop() {
            Some(index) => {
                self.items[index] = Some(item);
                index
            }
            None => {
                self.items.push(Some(item));
                self.items.len() - 1
            }
        };

        self.len += 1;
        index
    }

    /// Removes and returns the value stored at `index`, if any.
    pub(crate) fn remove(&mut self, index: usize) -> Option<T> {
        let item = self.items.get_mut(index)?.take()?;

        self.free.push(index);
        self.len -= 1;

        Some(item)
    }

    /// Removes every value, leaving all slots free.
    pub(crate) fn drain(&mut self) -> Vec<T> {
        let drained: Vec<T> = self.items.iter_mut().filter_map(Option::take).collect();

        self.free = (0..self.items.len()).rev().collect();
        self.len = 0;

        drained
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vacant_key_matches_insert() {
        let mut slab = Slab::new(2);

        for value in 0..5 {
            let key = slab.vacant_key();
            assert_eq!(slab.insert(value), key);
        }

        assert_eq!(slab.len(), 5);
    }

    #[test]
    fn removed_slots_are_reused() {
        let mut slab = Slab::new(0);
        let a = slab.insert("a");
        let _b = slab.insert("b");

        assert_eq!(slab.remove(a), Some("a"));
        assert_eq!(slab.remove(a), None);
        assert_eq!(slab.insert("c"), a);
    }

    #[test]
    fn drain_empties_the_slab() {
        let mut slab = Slab::new(4);
        slab.insert(1);
        slab.insert(2);

        let mut drained = slab.drain();
        drained.sort();

        assert_eq!(drained, vec![1, 2]);
        assert!(slab.is_empty());
        assert_eq!(slab.vacant_key(), 0);
    }
}
