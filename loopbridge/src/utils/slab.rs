use std::mem::MaybeUninit;

/// A slab of values addressed by small, reusable indices.
///
/// The event loop hands slab indices out as tokens (for armed watches) and
/// as hook identifiers. A freed index may be handed out again by a later
/// [`insert`](Self::insert), so holders must stop using an index once they
/// have removed it.
///
/// Internally, it keeps track of:
/// - initialized slots,
/// - free indices,
/// - and uninitialized memory using [`MaybeUninit`].
///
/// Unlike a plain `Vec<Option<T>>`, lookups through a stale index never
/// panic: [`get_mut`](Self::get_mut) and [`remove`](Self::remove) return
/// `None` for slots that are not currently in use.
pub(crate) struct Slab<T> {
    /// Storage for items (may contain uninitialized slots).
    items: Vec<MaybeUninit<T>>,
    /// Stack of free indices that can be reused.
    free: Vec<usize>,
    /// Marks whether a slot is currently initialized.
    used: Vec<bool>,
    /// Number of initialized slots.
    len: usize,
}

impl<T> Slab<T> {
    /// Creates a new `Slab` with `size` preallocated free slots.
    pub(crate) fn new(size: usize) -> Self {
        let items = (0..size).map(|_| MaybeUninit::<T>::uninit()).collect();
        // Reversed so that the lowest index is handed out first.
        let free = (0..size).rev().collect();
        let used = vec![false; size];

        Self {
            items,
            free,
            used,
            len: 0,
        }
    }

    /// Inserts a value and returns its index.
    ///
    /// A free slot is reused when available; otherwise the slab doubles.
    pub(crate) fn insert(&mut self, item: T) -> usize {
        let index = match self.free.pop() {
            Some(i) => i,
            None => {
                let len = self.items.len();
                let new_len = if len == 0 { 1 } else { 2 * len };

                self.items
                    .extend((len..new_len).map(|_| MaybeUninit::<T>::uninit()));
                self.free.extend(((len + 1)..new_len).rev());
                self.used.resize(new_len, false);

                len
            }
        };

        self.items[index] = MaybeUninit::new(item);
        self.used[index] = true;
        self.len += 1;

        index
    }

    /// Removes and returns the value stored at `index`, if any.
    pub(crate) fn remove(&mut self, index: usize) -> Option<T> {
        if !self.contains(index) {
            return None;
        }

        self.free.push(index);
        self.used[index] = false;
        self.len -= 1;

        // SAFETY: `used[index]` was set, so the slot is initialized, and it
        // is marked unused before anyone can observe it again.
        let item = unsafe { self.items[index].assume_init_read() };

        Some(item)
    }

    /// Returns whether `index` currently holds a value.
    pub(crate) fn contains(&self, index: usize) -> bool {
        self.used.get(index).copied().unwrap_or(false)
    }

    /// Returns a shared reference to the value at `index`, if any.
    pub(crate) fn get(&self, index: usize) -> Option<&T> {
        if !self.contains(index) {
            return None;
        }

        // SAFETY: checked above that the slot is initialized.
        Some(unsafe { self.items[index].assume_init_ref() })
    }

    /// Returns a mutable reference to the value at `index`, if any.
    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        if !self.contains(index) {
            return None;
        }

        // SAFETY: checked above that the slot is initialized.
        Some(unsafe { self.items[index].assume_init_mut() })
    }

    /// Number of values currently stored.
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` when no slot is in use.
    pub(crate) fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Indices of every slot in use, in ascending order.
    pub(crate) fn indices(&self) -> Vec<usize> {
        self.used
            .iter()
            .enumerate()
            .filter_map(|(i, &used)| used.then_some(i))
            .collect()
    }
}

impl<T> Drop for Slab<T> {
    /// Drops all initialized elements stored in the slab.
    fn drop(&mut self) {
        for (slot, &used) in self.items.iter_mut().zip(self.used.iter()) {
            if used {
                // SAFETY: `used` marks initialized slots.
                unsafe {
                    slot.assume_init_drop();
                }
            }
        }
    }
}
