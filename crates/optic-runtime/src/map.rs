use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

pub const MAP_ELEMENT_EMPTY: u8 = 0;
pub const MAP_ELEMENT_FULL: u8 = 1;
/// Tombstone: the slot held an element that was removed. Probe chains walk
/// through it; inserts may reuse it.
pub const MAP_ELEMENT_USED: u8 = 2;

pub const MAP_GROW_MULTIPLIER: usize = 2;
pub const MIN_MAP_SIZE: usize = 16;
pub const MAP_MAX_CAPACITY: f64 = 0.8;

enum Slot<K, V> {
    Empty,
    Full(K, V),
    Used,
}

impl<K, V> Slot<K, V> {
    fn state(&self) -> u8 {
        match self {
            Slot::Empty => MAP_ELEMENT_EMPTY,
            Slot::Full(..) => MAP_ELEMENT_FULL,
            Slot::Used => MAP_ELEMENT_USED,
        }
    }
}

/// Open-addressed hash map with tombstones.
///
/// Linear probing with a deterministic hasher, so probe sequences (and
/// therefore rehash behavior) are reproducible. Iteration order is
/// unspecified but stable between mutations. Shared maps are wrapped in
/// `Rc` by their owners.
pub struct RtMap<K, V> {
    slots: Vec<Slot<K, V>>,
    count: usize,
}

impl<K, V> Default for RtMap<K, V> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            count: 0,
        }
    }
}

impl<K: Hash + Eq, V> RtMap<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of FULL elements; tombstones do not count.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    fn hash_key(key: &K) -> u64 {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        hasher.finish()
    }

    fn probe_start(&self, key: &K) -> usize {
        (Self::hash_key(key) % self.slots.len() as u64) as usize
    }

    /// Index of the FULL slot holding `key`, walking through tombstones.
    fn find(&self, key: &K) -> Option<usize> {
        if self.slots.is_empty() {
            return None;
        }
        let start = self.probe_start(key);
        for step in 0..self.slots.len() {
            let i = (start + step) % self.slots.len();
            match &self.slots[i] {
                Slot::Empty => return None,
                Slot::Full(k, _) if k == key => return Some(i),
                Slot::Full(..) | Slot::Used => {}
            }
        }
        None
    }

    pub fn contains(&self, key: &K) -> bool {
        self.find(key).is_some()
    }

    pub fn lookup(&self, key: &K) -> Option<&V> {
        self.find(key).map(|i| match &self.slots[i] {
            Slot::Full(_, v) => v,
            _ => unreachable!(),
        })
    }

    /// Pointer to the value slot for `key`.
    ///
    /// With `create`, an absent key is inserted with `V::default()`; without
    /// it, absence yields `None`.
    pub fn index(&mut self, key: K, create: bool) -> Option<&mut V>
    where
        V: Default,
    {
        if !create {
            return match self.find(&key) {
                Some(i) => match &mut self.slots[i] {
                    Slot::Full(_, v) => Some(v),
                    _ => unreachable!(),
                },
                None => None,
            };
        }

        let i = self.slot_for_insert(&key);
        if self.slots[i].state() != MAP_ELEMENT_FULL {
            self.slots[i] = Slot::Full(key, V::default());
            self.count += 1;
        }
        match &mut self.slots[i] {
            Slot::Full(_, v) => Some(v),
            _ => unreachable!(),
        }
    }

    pub fn insert(&mut self, key: K, value: V) {
        let i = self.slot_for_insert(&key);
        if let Slot::Full(_, v) = &mut self.slots[i] {
            *v = value;
        } else {
            self.slots[i] = Slot::Full(key, value);
            self.count += 1;
        }
    }

    /// Removes `key`, leaving a tombstone so probe chains stay intact.
    pub fn remove(&mut self, key: &K) -> bool {
        match self.find(key) {
            Some(i) => {
                self.slots[i] = Slot::Used;
                self.count -= 1;
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = Slot::Empty;
        }
        self.count = 0;
    }

    /// FULL elements in ascending slot order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.slots.iter().filter_map(|slot| match slot {
            Slot::Full(k, v) => Some((k, v)),
            _ => None,
        })
    }

    pub(crate) fn slot_state(&self, i: usize) -> u8 {
        self.slots[i].state()
    }

    /// Target slot for inserting `key`: the FULL slot already holding it,
    /// the first reusable tombstone on its probe chain, or the terminating
    /// EMPTY slot. Grows first when the insert would cross the load limit.
    fn slot_for_insert(&mut self, key: &K) -> usize {
        if self.slots.is_empty()
            || (self.count + 1) as f64 >= self.slots.len() as f64 * MAP_MAX_CAPACITY
        {
            self.grow();
        }

        loop {
            let start = self.probe_start(key);
            let mut reusable = None;
            for step in 0..self.slots.len() {
                let i = (start + step) % self.slots.len();
                match &self.slots[i] {
                    Slot::Empty => return reusable.unwrap_or(i),
                    Slot::Full(k, _) if k == key => return i,
                    Slot::Full(..) => {}
                    Slot::Used => {
                        if reusable.is_none() {
                            reusable = Some(i);
                        }
                    }
                }
            }
            // The chain wrapped without finding EMPTY: the key is absent.
            if let Some(i) = reusable {
                return i;
            }
            // Tombstones have saturated the table; rehash discards them.
            self.grow();
        }
    }

    fn grow(&mut self) {
        let new_capacity = if self.slots.is_empty() {
            MIN_MAP_SIZE
        } else {
            self.slots.len() * MAP_GROW_MULTIPLIER
        };

        let old = std::mem::replace(
            &mut self.slots,
            (0..new_capacity).map(|_| Slot::Empty).collect(),
        );
        for slot in old {
            if let Slot::Full(k, v) = slot {
                let mut i = self.probe_start(&k);
                while self.slots[i].state() != MAP_ELEMENT_EMPTY {
                    i = (i + 1) % self.slots.len();
                }
                self.slots[i] = Slot::Full(k, v);
            }
        }
    }
}
