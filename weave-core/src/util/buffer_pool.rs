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

//! Size-classed pool of byte buffers for bulk primitive-array transfer.

use std::ops::{Deref, DerefMut};

use super::sync::Spinlock;

/// Smallest size class.
pub const MIN_BUFFER_SIZE: usize = 256;
/// Buffers with a larger capacity are dropped on free instead of retained.
pub const MAX_RETAINED_SIZE: usize = 1 << 20;
/// Free buffers kept per size class.
const MAX_FREE_PER_CLASS: usize = 8;

const CLASS_COUNT: usize =
    (MAX_RETAINED_SIZE.trailing_zeros() - MIN_BUFFER_SIZE.trailing_zeros() + 1) as usize;

/// Pool of power-of-two sized buffers, one free list per size class.
pub struct BufferPool {
    classes: [Spinlock<Vec<Vec<u8>>>; CLASS_COUNT],
}

static GLOBAL: BufferPool = BufferPool::new();

impl Default for BufferPool {
    fn default() -> Self {
        BufferPool::new()
    }
}

impl BufferPool {
    pub const fn new() -> Self {
        BufferPool {
            classes: [const { Spinlock::new(Vec::new()) }; CLASS_COUNT],
        }
    }

    /// The process-wide pool.
    pub fn global() -> &'static BufferPool {
        &GLOBAL
    }

    /// Size class capacity used for a request of `min_len` bytes.
    pub fn class_size(min_len: usize) -> usize {
        min_len.max(MIN_BUFFER_SIZE).next_power_of_two()
    }

    fn class_index(size: usize) -> Option<usize> {
        if size > MAX_RETAINED_SIZE || !size.is_power_of_two() || size < MIN_BUFFER_SIZE {
            return None;
        }
        Some((size.trailing_zeros() - MIN_BUFFER_SIZE.trailing_zeros()) as usize)
    }

    /// Claims an empty buffer with capacity for at least `min_len` bytes.
    pub fn claim(&self, min_len: usize) -> PooledBuffer<'_> {
        let size = Self::class_size(min_len);
        let buf = Self::class_index(size)
            .and_then(|idx| self.classes[idx].lock().pop())
            .unwrap_or_else(|| Vec::with_capacity(size));
        PooledBuffer { buf, pool: self }
    }

    fn free(&self, mut buf: Vec<u8>) {
        let Some(idx) = Self::class_index(buf.capacity()) else {
            return;
        };
        buf.clear();
        let mut free = self.classes[idx].lock();
        if free.len() < MAX_FREE_PER_CLASS {
            free.push(buf);
        }
    }

    /// Number of free buffers held for the class serving `min_len`.
    pub fn free_count(&self, min_len: usize) -> usize {
        Self::class_index(Self::class_size(min_len))
            .map(|idx| self.classes[idx].lock().len())
            .unwrap_or(0)
    }
}

/// A claimed buffer; returns itself to the pool when dropped.
pub struct PooledBuffer<'a> {
    buf: Vec<u8>,
    pool: &'a BufferPool,
}

impl Deref for PooledBuffer<'_> {
    type Target = Vec<u8>;
    fn deref(&self) -> &Vec<u8> {
        &self.buf
    }
}

impl DerefMut for PooledBuffer<'_> {
    fn deref_mut(&mut self) -> &mut Vec<u8> {
        &mut self.buf
    }
}

impl Drop for PooledBuffer<'_> {
    fn drop(&mut self) {
        self.pool.free(std::mem::take(&mut self.buf));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_round_up_to_power_of_two() {
        assert_eq!(BufferPool::class_size(0), 256);
        assert_eq!(BufferPool::class_size(256), 256);
        assert_eq!(BufferPool::class_size(257), 512);
        assert_eq!(BufferPool::class_size(5000), 8192);
    }

    #[test]
    fn released_buffers_are_reused() {
        let pool = BufferPool::new();
        {
            let mut buf = pool.claim(300);
            assert!(buf.capacity() >= 512);
            buf.extend_from_slice(&[1, 2, 3]);
        }
        assert_eq!(pool.free_count(300), 1);
        let buf = pool.claim(400);
        assert!(buf.is_empty());
        assert_eq!(pool.free_count(300), 0);
    }

    #[test]
    fn oversized_buffers_are_not_retained() {
        let pool = BufferPool::new();
        drop(pool.claim(MAX_RETAINED_SIZE + 1));
        assert_eq!(pool.free_count(MAX_RETAINED_SIZE + 1), 0);
        drop(pool.claim(MAX_RETAINED_SIZE));
        assert_eq!(pool.free_count(MAX_RETAINED_SIZE), 1);
    }
}
