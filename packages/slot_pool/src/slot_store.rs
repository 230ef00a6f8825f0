use std::fmt;
use std::num::NonZero;
use std::ptr::{self, NonNull};
use std::sync::atomic::{AtomicPtr, Ordering};

use crate::metrics::CLAIM_SCAN_LENGTH;

/// Outcome of [`SlotStore::release()`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Release {
    /// The value was placed into a previously empty slot and is now owned by the store.
    Stored,

    /// The same pointer is already resident in the store. Nothing was changed.
    Duplicate,

    /// Every slot was occupied. Ownership of the value stays with the caller.
    Full,
}

/// A fixed-length array of slots, each holding either nothing or a pointer to one item.
///
/// Slots are claimed and filled with single-word compare-and-swap operations, so no operation
/// ever blocks: a claim either takes an occupied slot or reports the store as empty, a release
/// either fills an empty slot or reports the store as full. Both scan the slots left to right,
/// which makes them O(N) in the number of slots.
///
/// The store does not own the pointees. It never dereferences the pointers it holds and never
/// frees them. Whoever puts a pointer in is responsible for what happens to it after it is
/// taken back out via [`claim()`][Self::claim] or [`drain()`][Self::drain]. Pointers that are
/// still resident when the store is dropped are simply forgotten.
///
/// # Duplicate detection
///
/// [`release()`][Self::release] refuses a pointer that is already resident. The check is not
/// atomic with the subsequent placement: two threads releasing the same pointer at the same time
/// can both pass the check and end up placing it in two slots. Callers that hand out uniquely
/// owned values never release the same pointer twice, so the check is a best-effort guard rather
/// than a guarantee.
///
/// Zero-sized values are exempt. Every pointer to a zero-sized value may share the same dangling
/// address, so an address match says nothing about whether two values are the same one.
pub(crate) struct SlotStore<T> {
    slots: Box<[AtomicPtr<T>]>,
}

// SAFETY: The store only moves pointers between threads and never dereferences them. Moving
// the store to another thread moves the right to take the pointed-to items out on that thread,
// which is only sound if the items themselves are Send.
unsafe impl<T: Send> Send for SlotStore<T> {}

// SAFETY: Shared access only permits atomic claim/release of whole pointers. Every pointer can be
// claimed by at most one thread, which then has exclusive access to the item. Exclusive access
// from another thread is equivalent to a move, so T: Send is sufficient.
unsafe impl<T: Send> Sync for SlotStore<T> {}

impl<T> SlotStore<T> {
    pub(crate) fn new(capacity: NonZero<usize>) -> Self {
        let slots = (0..capacity.get())
            .map(|_| AtomicPtr::new(ptr::null_mut()))
            .collect();

        Self { slots }
    }

    /// The number of slots in the store. Fixed at creation.
    pub(crate) fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Counts the occupied slots.
    ///
    /// This is a snapshot taken slot by slot, so under concurrent use it may not correspond to
    /// any single moment in time. It never exceeds [`capacity()`][Self::capacity].
    pub(crate) fn len(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| !slot.load(Ordering::Relaxed).is_null())
            .count()
    }

    /// Takes a value out of the first occupied slot that can be claimed.
    ///
    /// Returns `None` if a full scan did not succeed in claiming any slot. This is not an error,
    /// the store may simply be empty or other threads may have claimed the values first.
    pub(crate) fn claim(&self) -> Option<NonNull<T>> {
        for (index, slot) in self.slots.iter().enumerate() {
            let current = slot.load(Ordering::Relaxed);

            if current.is_null() {
                continue;
            }

            // Acquire on success pairs with the Release in `release()`, so we see every write
            // the previous owner made to the item before handing it to us.
            if slot
                .compare_exchange(
                    current,
                    ptr::null_mut(),
                    Ordering::Acquire,
                    Ordering::Relaxed,
                )
                .is_ok()
            {
                CLAIM_SCAN_LENGTH.with(|e| e.observe(index.wrapping_add(1)));

                return NonNull::new(current);
            }
        }

        None
    }

    /// Places a value into the first empty slot.
    ///
    /// On [`Release::Stored`] the store takes over the pointer. On any other outcome the
    /// caller still owns it.
    pub(crate) fn release(&self, value: NonNull<T>) -> Release {
        if size_of::<T>() != 0 && self.contains(value) {
            return Release::Duplicate;
        }

        for slot in &self.slots {
            // Skip the exchange for slots that are visibly occupied, to avoid taking exclusive
            // ownership of cache lines that other threads are reading.
            if !slot.load(Ordering::Relaxed).is_null() {
                continue;
            }

            // Release on success publishes the item's state to whichever thread claims it next.
            if slot
                .compare_exchange(
                    ptr::null_mut(),
                    value.as_ptr(),
                    Ordering::Release,
                    Ordering::Relaxed,
                )
                .is_ok()
            {
                return Release::Stored;
            }
        }

        Release::Full
    }

    /// Whether the pointer is currently resident in any slot. Compared by address only.
    pub(crate) fn contains(&self, value: NonNull<T>) -> bool {
        self.slots
            .iter()
            .any(|slot| ptr::eq(slot.load(Ordering::Relaxed), value.as_ptr()))
    }

    /// Empties every slot, yielding the values that were resident.
    ///
    /// Values released concurrently with the drain may or may not be yielded.
    pub(crate) fn drain(&self) -> impl Iterator<Item = NonNull<T>> + '_ {
        self.slots
            .iter()
            .filter_map(|slot| NonNull::new(slot.swap(ptr::null_mut(), Ordering::Acquire)))
    }
}

impl<T> fmt::Debug for SlotStore<T> {
    #[cfg_attr(test, mutants::skip)] // No API contract for the debug output.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotStore")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .finish()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::sync::Barrier;
    use std::thread;

    use new_zealand::nz;
    use static_assertions::{assert_impl_all, assert_not_impl_any};

    use super::*;

    assert_impl_all!(SlotStore<u32>: Send, Sync);
    assert_not_impl_any!(SlotStore<std::rc::Rc<u32>>: Send, Sync);

    #[test]
    fn new_store_is_empty() {
        let store = SlotStore::<u32>::new(nz!(4));

        assert_eq!(store.capacity(), 4);
        assert_eq!(store.len(), 0);
        assert!(store.claim().is_none());
    }

    #[test]
    fn release_then_claim_yields_same_pointer() {
        let mut value = 42_u32;
        let ptr = NonNull::from(&mut value);

        let store = SlotStore::new(nz!(2));

        assert_eq!(store.release(ptr), Release::Stored);
        assert_eq!(store.len(), 1);
        assert!(store.contains(ptr));

        assert_eq!(store.claim(), Some(ptr));
        assert_eq!(store.len(), 0);
        assert!(!store.contains(ptr));
    }

    #[test]
    fn release_same_pointer_twice_is_duplicate() {
        let mut value = 1_u32;
        let ptr = NonNull::from(&mut value);

        let store = SlotStore::new(nz!(3));

        assert_eq!(store.release(ptr), Release::Stored);
        assert_eq!(store.release(ptr), Release::Duplicate);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn zero_sized_values_are_never_duplicates() {
        let store = SlotStore::<()>::new(nz!(2));
        let ptr = NonNull::<()>::dangling();

        assert_eq!(store.release(ptr), Release::Stored);
        assert_eq!(store.release(ptr), Release::Stored);
        assert_eq!(store.release(ptr), Release::Full);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn release_into_full_store_reports_full() {
        let mut a = 1_u32;
        let mut b = 2_u32;

        let store = SlotStore::new(nz!(1));

        assert_eq!(store.release(NonNull::from(&mut a)), Release::Stored);
        assert_eq!(store.release(NonNull::from(&mut b)), Release::Full);
        assert_eq!(store.len(), 1);
        assert_eq!(store.claim(), Some(NonNull::from(&mut a)));
    }

    #[test]
    fn claim_scans_past_empty_slots() {
        let mut values = [1_u32, 2, 3];
        let [a, b, c] = values.each_mut().map(NonNull::from);

        let store = SlotStore::new(nz!(3));

        store.release(a);
        store.release(b);
        store.release(c);

        // Free the first two slots so the only remaining value sits at the end.
        assert_eq!(store.claim(), Some(a));
        assert_eq!(store.claim(), Some(b));
        assert_eq!(store.claim(), Some(c));
        assert!(store.claim().is_none());
    }

    #[test]
    fn release_fills_first_empty_slot() {
        let mut values = [1_u32, 2, 3];
        let [a, b, c] = values.each_mut().map(NonNull::from);

        let store = SlotStore::new(nz!(2));

        store.release(a);
        store.release(b);
        assert_eq!(store.claim(), Some(a));

        // The slot vacated by `a` is the only empty one.
        assert_eq!(store.release(c), Release::Stored);
        assert_eq!(store.claim(), Some(c));
        assert_eq!(store.claim(), Some(b));
    }

    #[test]
    fn drain_empties_every_slot() {
        let mut values = [1_u32, 2, 3];
        let [a, b, c] = values.each_mut().map(NonNull::from);

        let store = SlotStore::new(nz!(4));

        store.release(a);
        store.release(b);
        store.release(c);

        let drained = store.drain().collect::<Vec<_>>();

        assert_eq!(drained, vec![a, b, c]);
        assert_eq!(store.len(), 0);
        assert_eq!(store.drain().count(), 0);
    }

    #[cfg_attr(miri, ignore)] // Too slow under Miri.
    #[test]
    fn concurrent_claims_never_share_a_value() {
        const THREADS: usize = 4;
        const ITERATIONS: usize = 1000;

        let mut values = [0_u64; 8];
        let store = SlotStore::new(nz!(8));

        for value in &mut values {
            store.release(NonNull::from(value));
        }

        let barrier = Barrier::new(THREADS);

        thread::scope(|s| {
            for _ in 0..THREADS {
                s.spawn(|| {
                    barrier.wait();

                    for _ in 0..ITERATIONS {
                        let Some(mut claimed) = store.claim() else {
                            continue;
                        };

                        // SAFETY: The claim gave this thread exclusive access to the value until
                        // it is released again, and the backing array outlives the scope.
                        let value = unsafe { claimed.as_mut() };

                        let before = *value;
                        *value = before.wrapping_add(1);
                        thread::yield_now();
                        assert_eq!(*value, before.wrapping_add(1));

                        assert_eq!(store.release(claimed), Release::Stored);
                    }
                });
            }
        });

        assert_eq!(store.len(), 8);
        assert_eq!(store.drain().count(), 8);
    }
}
