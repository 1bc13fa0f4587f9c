/// Key returned by [`Slab::insert`].
///
/// A key carries the generation of the slot it was issued for, so a stale
/// key never removes a value inserted later into the same reused slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct SlabKey {
    index: usize,
    generation: u64,
}

struct Entry<T> {
    generation: u64,
    value: Option<T>,
}

/// A small slab used as a subscriber registry.
///
/// `Slab` stores values in a contiguous vector and hands out keys that stay
/// valid until the value is removed. Freed slots are reused by later
/// insertions. [`drain`](Self::drain) yields the remaining values in the
/// order they were inserted, which is the order subscribers are notified in.
pub(crate) struct Slab<T> {
    /// Storage for values, `None` for free slots.
    entries: Vec<Entry<T>>,
    /// Stack of free indices that can be reused.
    free: Vec<usize>,
    /// Monotonic counter, also used as insertion order.
    next_generation: u64,
    len: usize,
}

impl<T> Slab<T> {
    /// Creates an empty slab with room for `capacity` values.
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            free: Vec::new(),
            next_generation: 0,
            len: 0,
        }
    }

    /// Inserts a value and returns its key.
    ///
    /// If a free slot is available it is reused, otherwise the slab grows.
    pub(crate) fn insert(&mut self, value: T) -> SlabKey {
        let generation = self.next_generation;
        self.next_generation += 1;

        let index = match self.free.pop() {
            Some(index) => {
                self.entries[index] = Entry {
                    generation,
                    value: Some(value),
                };
                index
            }
            None => {
                self.entries.push(Entry {
                    generation,
                    value: Some(value),
                });
                self.entries.len() - 1
            }
        };

        self.len += 1;

        SlabKey { index, generation }
    }

    /// Removes and returns the value stored under `key`.
    ///
    /// Returns `None` if the value was already removed or drained.
    pub(crate) fn remove(&mut self, key: SlabKey) -> Option<T> {
        let entry = self.entries.get_mut(key.index)?;

        if entry.generation != key.generation {
            return None;
        }

        let value = entry.value.take()?;
        self.free.push(key.index);
        self.len -= 1;

        Some(value)
    }

    /// Removes every value, returning them in insertion order.
    pub(crate) fn drain(&mut self) -> Vec<T> {
        let mut taken: Vec<(u64, T)> = Vec::with_capacity(self.len);

        for (index, entry) in self.entries.iter_mut().enumerate() {
            if let Some(value) = entry.value.take() {
                taken.push((entry.generation, value));
                self.free.push(index);
            }
        }

        self.len = 0;
        taken.sort_by_key(|(generation, _)| *generation);
        taken.into_iter().map(|(_, value)| value).collect()
    }

    /// Clones every value, in insertion order, leaving the slab untouched.
    pub(crate) fn values(&self) -> Vec<T>
    where
        T: Clone,
    {
        let mut live: Vec<(u64, T)> = self
            .entries
            .iter()
            .filter_map(|entry| entry.value.clone().map(|value| (entry.generation, value)))
            .collect();

        live.sort_by_key(|(generation, _)| *generation);
        live.into_iter().map(|(_, value)| value).collect()
    }

    /// Number of values currently stored.
    pub(crate) fn len(&self) -> usize {
        self.len
    }
}

impl<T> Default for Slab<T> {
    fn default() -> Self {
        Self::with_capacity(0)
    }
}
