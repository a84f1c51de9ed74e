// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.
use crate::util::Spinlock;
use std::cell::Cell;
use std::mem::ManuallyDrop;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::resolver::context::{DeserializationContext, SerializationContext};

/// Number of segments in the pool.
const NUM_SEGMENTS: usize = 16;

static THREAD_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

thread_local! {
    /// Segment of the current thread, assigned round-robin on first use.
    static SEGMENT_INDEX: Cell<usize> = Cell::new(
        (THREAD_ID_COUNTER.fetch_add(1, Ordering::Relaxed) as usize) % NUM_SEGMENTS
    );
}

/// State that can be returned to its fresh form.
pub trait Resettable {
    fn reset(&mut self);
}

/// Marks types that hold nothing tied to a thread once reset.
///
/// # Safety
///
/// After [`Resettable::reset`] the value must be safe to move to another
/// thread, even if it is not `Send` while in use.
pub unsafe trait SendWhenReset: Resettable {}

impl Resettable for SerializationContext {
    fn reset(&mut self) {
        SerializationContext::reset(self);
    }
}

impl Resettable for DeserializationContext {
    fn reset(&mut self) {
        DeserializationContext::reset(self);
    }
}

// SAFETY: every field of a serialization context is `Send`.
unsafe impl SendWhenReset for SerializationContext {}

// SAFETY: the only non-`Send` state is the table of shells read during a
// session, which reset empties.
unsafe impl SendWhenReset for DeserializationContext {}

/// A reset item parked in the pool.
struct Idle<T>(T);

// SAFETY: only reset items are wrapped, see `SendWhenReset`.
unsafe impl<T: SendWhenReset> Send for Idle<T> {}

struct Segment<T> {
    items: Spinlock<Vec<Idle<T>>>,
}

impl<T> Segment<T> {
    fn new() -> Self {
        Segment {
            items: Spinlock::new(Vec::new()),
        }
    }
}

/// A segmented pool of session contexts.
///
/// Each thread is assigned a segment, so concurrent sessions typically hit
/// different locks. A claimed item is reset before it is handed out and
/// again when its [`Claimed`] guard drops, however the session ended.
pub struct ContextPool<T: SendWhenReset> {
    segments: [Segment<T>; NUM_SEGMENTS],
    factory: Box<dyn Fn() -> T + Send + Sync>,
}

impl<T: SendWhenReset> ContextPool<T> {
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        ContextPool {
            segments: std::array::from_fn(|_| Segment::new()),
            factory: Box::new(factory),
        }
    }

    pub fn claim(&self) -> Claimed<'_, T> {
        let segment = SEGMENT_INDEX.with(|idx| idx.get());
        let parked = self.segments[segment].items.lock().pop();
        let mut item = match parked {
            Some(Idle(item)) => item,
            None => (self.factory)(),
        };
        item.reset();
        Claimed {
            item: ManuallyDrop::new(item),
            pool: self,
            segment,
        }
    }

    /// Claims an item for the duration of `handler`.
    #[inline(always)]
    pub fn borrow_mut<R>(&self, handler: impl FnOnce(&mut T) -> R) -> R {
        let mut claimed = self.claim();
        handler(&mut claimed)
    }

    /// Items currently parked across all segments.
    pub fn idle_count(&self) -> usize {
        self.segments.iter().map(|s| s.items.lock().len()).sum()
    }

    fn release(&self, segment: usize, mut item: T) {
        item.reset();
        self.segments[segment].items.lock().push(Idle(item));
    }
}

/// An item claimed from a [`ContextPool`]; returns to the pool on drop.
pub struct Claimed<'a, T: SendWhenReset> {
    item: ManuallyDrop<T>,
    pool: &'a ContextPool<T>,
    segment: usize,
}

impl<T: SendWhenReset> Deref for Claimed<'_, T> {
    type Target = T;
    fn deref(&self) -> &T {
        &self.item
    }
}

impl<T: SendWhenReset> DerefMut for Claimed<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.item
    }
}

impl<T: SendWhenReset> Drop for Claimed<'_, T> {
    fn drop(&mut self) {
        // SAFETY: `item` is never used again after this point.
        let item = unsafe { ManuallyDrop::take(&mut self.item) };
        self.pool.release(self.segment, item);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Counter {
        value: u32,
        resets: u32,
    }

    impl Resettable for Counter {
        fn reset(&mut self) {
            self.value = 0;
            self.resets += 1;
        }
    }

    unsafe impl SendWhenReset for Counter {}

    #[test]
    fn items_are_reset_and_reused() {
        let pool = ContextPool::new(Counter::default);
        {
            let mut c = pool.claim();
            assert_eq!(c.resets, 1);
            c.value = 42;
        }
        assert_eq!(pool.idle_count(), 1);
        let c = pool.claim();
        assert_eq!(c.value, 0);
        // reset on release, then on claim
        assert_eq!(c.resets, 3);
        assert_eq!(pool.idle_count(), 0);
    }

    #[test]
    fn released_on_panic() {
        let pool = ContextPool::new(Counter::default);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            pool.borrow_mut(|c| {
                c.value = 1;
                panic!("session failed");
            })
        }));
        assert!(result.is_err());
        assert_eq!(pool.idle_count(), 1);
    }
}
