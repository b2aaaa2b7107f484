// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
Aligned host memory.

A [HostBlock] owns one contiguous, 16-byte-aligned allocation.  It is the host half of every
buffer in this crate: typed data is written here first, and uploads read from here.

The block is built out of aligned chunks rather than a raw allocator call, so the alignment
guarantee falls out of `Vec`'s own element alignment and we never have to pair an `alloc` with
a `dealloc` ourselves.

```
use typed_buffers::host::{HostBlock, ALIGNMENT};

let mut block = HostBlock::zeroed(10);
block.as_mut_slice()[3] = 7;
assert_eq!(block.len(), 10);
assert_eq!(block.as_ptr() as usize % ALIGNMENT, 0);

// resizing keeps the prefix
block.resize(32);
assert_eq!(block.as_slice()[3], 7);
assert_eq!(block.as_slice()[31], 0);
```
*/

use std::fmt::{Debug, Formatter};

/// Alignment guaranteed for the start of every [HostBlock], matching common SIMD load requirements.
pub const ALIGNMENT: usize = 16;

#[repr(C, align(16))]
#[derive(Clone, Copy)]
struct Chunk([u8; ALIGNMENT]);

const ZERO_CHUNK: Chunk = Chunk([0; ALIGNMENT]);

/// An owned, aligned block of host bytes.
#[derive(Clone)]
pub struct HostBlock {
    chunks: Vec<Chunk>,
    len: usize,
}

impl HostBlock {
    /// Allocates a zero-filled block of `len` bytes.
    pub fn zeroed(len: usize) -> Self {
        Self {
            chunks: vec![ZERO_CHUNK; len.div_ceil(ALIGNMENT)],
            len,
        }
    }

    /// Allocates a block holding a copy of `bytes`.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut block = Self::zeroed(bytes.len());
        block.as_mut_slice().copy_from_slice(bytes);
        block
    }

    /// Size of the block in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /**
    Changes the size of the block.

    The first `min(old, new)` bytes are preserved; any newly exposed bytes are zero.
    The block may move, so addresses taken before the resize are invalid afterwards.
    */
    pub fn resize(&mut self, new_len: usize) {
        if new_len < self.len {
            //clear the tail so a later grow exposes zeros rather than stale bytes
            let old_len = self.len;
            self.as_mut_slice_with_len(old_len)[new_len..].fill(0);
        }
        self.chunks.resize(new_len.div_ceil(ALIGNMENT), ZERO_CHUNK);
        self.len = new_len;
    }

    pub fn as_slice(&self) -> &[u8] {
        assert!(
            self.len <= self.chunks.len() * ALIGNMENT,
            "HostBlock invariant violated"
        );
        //safe because Chunk is repr(C) over plain bytes, every byte is initialized,
        //and we only expose `len` of them
        unsafe { std::slice::from_raw_parts(self.chunks.as_ptr() as *const u8, self.len) }
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        let len = self.len;
        self.as_mut_slice_with_len(len)
    }

    fn as_mut_slice_with_len(&mut self, len: usize) -> &mut [u8] {
        assert!(
            len <= self.chunks.len() * ALIGNMENT,
            "HostBlock invariant violated"
        );
        //safe for the same reasons as as_slice, and we hold &mut self
        unsafe { std::slice::from_raw_parts_mut(self.chunks.as_mut_ptr() as *mut u8, len) }
    }

    /// Address of the first byte.
    pub fn as_ptr(&self) -> *const u8 {
        self.chunks.as_ptr() as *const u8
    }
}

impl Debug for HostBlock {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostBlock")
            .field("len", &self.len)
            .field("aligned", &(self.as_ptr() as usize).is_multiple_of(ALIGNMENT))
            .finish()
    }
}

impl PartialEq for HostBlock {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}
