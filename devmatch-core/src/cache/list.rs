use std::time::Instant;

const NIL: usize = usize::MAX;

#[derive(Debug)]
struct Slot<K> {
    key: Option<K>,
    prev: usize,
    next: usize,
    touched: Instant,
}

/// Doubly linked recency list stored in an arena of slots.
///
/// The head is the most recently used key, the tail the least recently
/// used one. Slots are addressed by index and recycled through a free list,
/// so a slot index handed out earlier may point to another key later on:
/// [`RecencyList::touch`] checks the key for that reason.
#[derive(Debug)]
pub(super) struct RecencyList<K> {
    slots: Vec<Slot<K>>,
    free: Vec<usize>,
    head: usize,
    tail: usize,
    len: usize,
}

impl<K: Eq> RecencyList<K> {
    pub(super) fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            head: NIL,
            tail: NIL,
            len: 0,
        }
    }

    pub(super) fn len(&self) -> usize {
        self.len
    }

    /// Insert the key at the head, returning its slot.
    pub(super) fn push_front(&mut self, key: K, now: Instant) -> usize {
        let slot = Slot {
            key: Some(key),
            prev: NIL,
            next: self.head,
            touched: now,
        };
        let idx = match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = slot;
                idx
            }
            None => {
                self.slots.push(slot);
                self.slots.len() - 1
            }
        };
        if self.head != NIL {
            self.slots[self.head].prev = idx;
        }
        self.head = idx;
        if self.tail == NIL {
            self.tail = idx;
        }
        self.len += 1;
        idx
    }

    /// Move the slot to the head, if it still holds `key`.
    pub(super) fn touch(&mut self, idx: usize, key: &K, now: Instant) -> bool {
        match self.slots.get(idx) {
            Some(slot) if slot.key.as_ref() == Some(key) => (),
            _ => return false,
        }
        self.slots[idx].touched = now;
        if self.head != idx {
            self.unlink(idx);
            self.link_front(idx);
        }
        true
    }

    /// Remove and return the least recently used key.
    pub(super) fn pop_back(&mut self) -> Option<K> {
        if self.tail == NIL {
            return None;
        }
        let idx = self.tail;
        self.unlink(idx);
        self.len -= 1;
        self.free.push(idx);
        self.slots[idx].key.take()
    }

    /// Last access time of the least recently used key.
    pub(super) fn back_touched(&self) -> Option<Instant> {
        self.slots.get(self.tail).map(|slot| slot.touched)
    }

    pub(super) fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.head = NIL;
        self.tail = NIL;
        self.len = 0;
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = (self.slots[idx].prev, self.slots[idx].next);
        if prev == NIL {
            self.head = next;
        } else {
            self.slots[prev].next = next;
        }
        if next == NIL {
            self.tail = prev;
        } else {
            self.slots[next].prev = prev;
        }
        self.slots[idx].prev = NIL;
        self.slots[idx].next = NIL;
    }

    fn link_front(&mut self, idx: usize) {
        self.slots[idx].next = self.head;
        self.slots[idx].prev = NIL;
        if self.head != NIL {
            self.slots[self.head].prev = idx;
        }
        self.head = idx;
        if self.tail == NIL {
            self.tail = idx;
        }
    }
}
