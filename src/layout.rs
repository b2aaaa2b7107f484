// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
Strided item copies.

Every data movement in this crate goes through [copy].  A side of a copy is described by a
[Strided] layout: how wide each item is, how far apart consecutive items start, and where the
first item begins (in bytes).

Two code paths exist:

* **bulk**: when both sides are dense and their items are the same width, the whole run is one
  contiguous `count * item_size` byte copy.
* **per item**: otherwise, each item is copied individually, with the source and destination
  cursors advancing by their own strides.

The bulk path is far faster and covers the common whole-buffer case; the per-item path handles
interleaving, sub-ranges and heterogeneous layouts.  Both produce identical bytes wherever both
apply.

A source item narrower than its destination item fills the leading bytes of the destination item
and leaves the rest untouched.  The opposite (wider source) is rejected with
[Error::ItemTooLarge].

```
use typed_buffers::layout::{copy, Strided};

// de-interleave every other 2-byte item
let src = [1u8, 2, 0, 0, 3, 4, 0, 0];
let mut dst = [0u8; 4];
copy(&mut dst, Strided::dense(2), &src, Strided::dense(2).with_stride(4), 2).unwrap();
assert_eq!(dst, [1, 2, 3, 4]);
```
*/

use crate::error::Error;

/// The layout of one side of a copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Strided {
    /// Width of each item in bytes.
    pub item_size: usize,
    /// Distance between the starts of consecutive items.  `None` means densely packed.
    pub stride: Option<usize>,
    /// Byte offset of the first item.
    pub offset: usize,
}

impl Strided {
    /// Densely packed items starting at byte 0.
    pub const fn dense(item_size: usize) -> Self {
        Self {
            item_size,
            stride: None,
            offset: 0,
        }
    }

    pub const fn with_stride(mut self, stride: usize) -> Self {
        self.stride = Some(stride);
        self
    }

    pub const fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// The effective stride.
    pub const fn stride(&self) -> usize {
        match self.stride {
            Some(stride) => stride,
            None => self.item_size,
        }
    }

    pub const fn is_dense(&self) -> bool {
        self.stride() == self.item_size
    }

    /// Bytes spanned by `count` items, from `offset` to the end of the last item.
    fn extent(&self, count: usize) -> Option<usize> {
        if count == 0 {
            return Some(self.offset);
        }
        (count - 1)
            .checked_mul(self.stride())?
            .checked_add(self.item_size)?
            .checked_add(self.offset)
    }

    fn validate(&self, count: usize, available: usize) -> Result<(), Error> {
        if self.item_size == 0 {
            return Err(Error::InvalidLayout("item size must be nonzero"));
        }
        if self.stride() < self.item_size {
            return Err(Error::InvalidLayout("stride is narrower than the item"));
        }
        match self.extent(count) {
            Some(needed) if needed <= available => Ok(()),
            Some(needed) => Err(Error::RangeExceedsBuffer { needed, available }),
            None => Err(Error::RangeExceedsBuffer {
                needed: usize::MAX,
                available,
            }),
        }
    }
}

/// Which code path [copy_with_path] takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyPath {
    /// Bulk when eligible, per item otherwise.
    Auto,
    /// Always per item.
    PerItem,
}

/**
Copies `count` items from `src` to `dst`.

All validation happens before the first byte moves, so on error `dst` is unchanged.
*/
pub fn copy(
    dst: &mut [u8],
    dst_layout: Strided,
    src: &[u8],
    src_layout: Strided,
    count: usize,
) -> Result<(), Error> {
    copy_with_path(dst, dst_layout, src, src_layout, count, CopyPath::Auto)
}

/// [copy], with the code path pinned.  Useful for comparing the two paths.
pub fn copy_with_path(
    dst: &mut [u8],
    dst_layout: Strided,
    src: &[u8],
    src_layout: Strided,
    count: usize,
    path: CopyPath,
) -> Result<(), Error> {
    if src_layout.item_size > dst_layout.item_size {
        return Err(Error::ItemTooLarge {
            src: src_layout.item_size,
            dst: dst_layout.item_size,
        });
    }
    src_layout.validate(count, src.len())?;
    dst_layout.validate(count, dst.len())?;
    if count == 0 {
        return Ok(());
    }

    let bulk = path == CopyPath::Auto
        && src_layout.item_size == dst_layout.item_size
        && src_layout.is_dense()
        && dst_layout.is_dense();
    if bulk {
        let len = count * src_layout.item_size;
        logwise::trace_sync!(
            "layout::copy bulk {len} bytes",
            len = logwise::privacy::LogIt(&len)
        );
        dst[dst_layout.offset..dst_layout.offset + len]
            .copy_from_slice(&src[src_layout.offset..src_layout.offset + len]);
    } else {
        logwise::trace_sync!(
            "layout::copy per-item {count} items",
            count = logwise::privacy::LogIt(&count)
        );
        let width = src_layout.item_size;
        let src_stride = src_layout.stride();
        let dst_stride = dst_layout.stride();
        let mut s = src_layout.offset;
        let mut d = dst_layout.offset;
        for _ in 0..count {
            dst[d..d + width].copy_from_slice(&src[s..s + width]);
            s += src_stride;
            d += dst_stride;
        }
    }
    Ok(())
}
