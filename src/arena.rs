// Copyright 2022 Ryan Seipp
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! A growable, single-producer/single-consumer byte buffer with a read
//! cursor and a write cursor.
//!
//! `ByteArena` sits between raw socket I/O and the framing layer: the
//! reactor writes into the tail returned by [`ByteArena::reserve`], the
//! framer reads the populated region returned by [`ByteArena::data`] and
//! consumes what it has turned into frames.

use std::io::Write;

/// A growable byte buffer with independent read and write cursors.
///
/// Invariants: `write_cursor <= storage.len()` and
/// `read_cursor <= write_cursor`. Cursors never move backwards except via
/// [`ByteArena::consume`] resetting both to zero once drained, or
/// [`ByteArena::compact`] moving the populated region to offset zero.
#[derive(Debug, Default)]
pub struct ByteArena {
    storage: Vec<u8>,
    read_cursor: usize,
    write_cursor: usize,
}

impl ByteArena {
    /// Creates an empty arena that has not yet allocated.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates an arena with at least `capacity` bytes pre-allocated.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            storage: Vec::with_capacity(capacity),
            read_cursor: 0,
            write_cursor: 0,
        }
    }

    /// The populated, not-yet-consumed region. Zero-length if empty.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.storage[self.read_cursor..self.write_cursor]
    }

    /// Number of unconsumed bytes currently available to read.
    #[inline]
    pub fn len(&self) -> usize {
        self.write_cursor - self.read_cursor
    }

    /// True if there is no unconsumed data.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.read_cursor == self.write_cursor
    }

    /// Ensures at least `n` contiguous bytes are available beyond the write
    /// cursor, growing storage if needed, and returns the writable tail.
    /// The returned slice's length may exceed `n`.
    pub fn reserve(&mut self, n: usize) -> &mut [u8] {
        let needed = self.write_cursor + n;
        if needed > self.storage.len() {
            self.storage.resize(needed.max(self.storage.len() * 2), 0);
        }
        &mut self.storage[self.write_cursor..]
    }

    /// Extends the populated region by `k` bytes. Precondition: `k` does not
    /// exceed the length of the slice most recently returned by `reserve`.
    pub fn advance_write(&mut self, k: usize) {
        self.write_cursor += k;
        debug_assert!(self.write_cursor <= self.storage.len());
    }

    /// Advances the read cursor by `k` bytes, consuming them. Precondition:
    /// `k <= data().len()`. Resets both cursors to zero if this empties the
    /// arena.
    pub fn consume(&mut self, k: usize) {
        debug_assert!(k <= self.len());
        self.read_cursor += k;
        if self.read_cursor == self.write_cursor {
            self.read_cursor = 0;
            self.write_cursor = 0;
        }
    }

    /// Reserves and copies `other`'s populated data onto the tail of this
    /// arena.
    pub fn append(&mut self, other: &ByteArena) {
        let src = other.data();
        if src.is_empty() {
            return;
        }
        let dst = self.reserve(src.len());
        dst[..src.len()].copy_from_slice(src);
        self.advance_write(src.len());
    }

    /// Compacts the populated region to offset zero by memmove. Idempotent:
    /// calling it twice in a row leaves the same observable state as one
    /// call.
    pub fn compact(&mut self) {
        if self.read_cursor == 0 {
            return;
        }
        self.storage.copy_within(self.read_cursor..self.write_cursor, 0);
        self.write_cursor -= self.read_cursor;
        self.read_cursor = 0;
    }

    /// Current backing capacity.
    pub fn capacity(&self) -> usize {
        self.storage.len()
    }
}

impl Write for ByteArena {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let dst = self.reserve(buf.len());
        dst[..buf.len()].copy_from_slice(buf);
        self.advance_write(buf.len());
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_arena_has_no_data() {
        let arena = ByteArena::new();
        assert!(arena.data().is_empty());
        assert!(arena.is_empty());
    }

    #[test]
    fn reserve_then_advance_exposes_written_bytes() {
        let mut arena = ByteArena::new();
        let tail = arena.reserve(5);
        tail[..5].copy_from_slice(b"hello");
        arena.advance_write(5);
        assert_eq!(arena.data(), b"hello");
    }

    #[test]
    fn consume_advances_read_cursor_and_resets_when_drained() {
        let mut arena = ByteArena::new();
        arena.write_all(b"hello world").unwrap();
        arena.consume(6);
        assert_eq!(arena.data(), b"world");
        arena.consume(5);
        assert!(arena.is_empty());
        // cursors reset to zero, so a subsequent reserve starts at offset 0
        let tail = arena.reserve(4);
        assert!(tail.len() >= 4);
    }

    #[test]
    fn partial_consume_leaves_remainder_readable() {
        let mut arena = ByteArena::new();
        arena.write_all(b"abcdef").unwrap();
        arena.consume(2);
        assert_eq!(arena.data(), b"cdef");
    }

    #[test]
    fn append_copies_source_data() {
        let mut a = ByteArena::new();
        let mut b = ByteArena::new();
        a.write_all(b"foo").unwrap();
        b.write_all(b"bar").unwrap();
        a.append(&b);
        assert_eq!(a.data(), b"foobar");
    }

    #[test]
    fn compact_is_idempotent() {
        let mut arena = ByteArena::new();
        arena.write_all(b"abcdef").unwrap();
        arena.consume(3);
        arena.compact();
        let after_first = arena.data().to_vec();
        let cap_after_first = arena.capacity();
        arena.compact();
        assert_eq!(arena.data(), &after_first[..]);
        assert_eq!(arena.capacity(), cap_after_first);
    }

    #[test]
    fn byte_conservation_across_reserve_consume_cycles() {
        let mut arena = ByteArena::new();
        let mut total_written = 0usize;
        let mut total_consumed = 0usize;

        for chunk in [b"abc".as_slice(), b"defgh".as_slice(), b"ij".as_slice()] {
            arena.write_all(chunk).unwrap();
            total_written += chunk.len();
        }

        while !arena.is_empty() {
            let take = arena.len().min(3);
            arena.consume(take);
            total_consumed += take;
        }

        assert_eq!(total_written, total_consumed);
        assert!(arena.is_empty());
    }

    #[test]
    fn grows_to_accommodate_large_reserve() {
        let mut arena = ByteArena::with_capacity(4);
        let tail = arena.reserve(1024);
        assert!(tail.len() >= 1024);
    }
}
