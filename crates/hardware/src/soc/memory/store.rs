//! Shared byte storage for memory regions.
//!
//! Region backings are shared between the main step loop and the video
//! device's render thread, so the bytes are relaxed atomics rather than a
//! plain array. On every current platform a relaxed byte load or store
//! compiles to the plain instruction, and torn multi-byte views are exactly
//! the tolerated behavior of the original hardware's asynchronous refresh.

use std::sync::atomic::{AtomicU8, Ordering};

/// A fixed-size byte array with interior mutability.
///
/// Shared through an `Arc` between the memory space and any device that reads
/// the same region concurrently.
#[derive(Debug)]
pub struct ByteStore {
    bytes: Box<[AtomicU8]>,
}

impl ByteStore {
    /// Allocates a zeroed store of the given size.
    pub fn new(len: usize) -> Self {
        let bytes = (0..len).map(|_| AtomicU8::new(0)).collect::<Vec<_>>();
        Self {
            bytes: bytes.into_boxed_slice(),
        }
    }

    /// Size of the store in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the store holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Reads one byte.
    ///
    /// # Panics
    ///
    /// Panics if `offset` is out of bounds; callers resolve region bounds
    /// before getting here.
    pub fn get(&self, offset: usize) -> u8 {
        assert!(offset < self.bytes.len(), "byte store read out of bounds");
        self.bytes[offset].load(Ordering::Relaxed)
    }

    /// Writes one byte.
    ///
    /// # Panics
    ///
    /// Panics if `offset` is out of bounds.
    pub fn set(&self, offset: usize, value: u8) {
        assert!(offset < self.bytes.len(), "byte store write out of bounds");
        self.bytes[offset].store(value, Ordering::Relaxed);
    }

    /// Copies `data` into the store starting at offset zero.
    ///
    /// # Panics
    ///
    /// Panics if `data` is longer than the store; image size is validated at
    /// construction.
    pub fn fill_from(&self, data: &[u8]) {
        assert!(data.len() <= self.bytes.len(), "byte store fill too large");
        for (slot, byte) in self.bytes.iter().zip(data) {
            slot.store(*byte, Ordering::Relaxed);
        }
    }

    /// Copies out up to `len` bytes starting at `offset`.
    ///
    /// The copy is byte-by-byte and unsynchronized with concurrent writers;
    /// readers get some interleaving of old and new bytes.
    pub fn snapshot(&self, offset: usize, len: usize) -> Vec<u8> {
        let end = offset.saturating_add(len).min(self.bytes.len());
        let start = offset.min(end);
        self.bytes[start..end]
            .iter()
            .map(|slot| slot.load(Ordering::Relaxed))
            .collect()
    }
}
