// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
Buffers of fixed-size items.

An [ItemBuffer] is a [BufferResource] whose size is always a whole number of items.  The item
size is fixed at construction; every size change is expressed as an item count.
*/

use crate::device::{AccessMode, Device};
use crate::error::Error;
use crate::host::HostBlock;
use crate::layout::{self, Strided};
use crate::resource::BufferResource;
use crate::usage::BufferConfig;
use std::ops::Deref;
use std::sync::Arc;

#[derive(Debug)]
pub struct ItemBuffer {
    resource: BufferResource,
    item_size: usize,
}

impl ItemBuffer {
    /// Creates an unallocated buffer of `item_size`-byte items.
    pub fn new(item_size: usize, config: BufferConfig<'_>) -> Result<Self, Error> {
        if item_size == 0 {
            return Err(Error::InvalidLayout("item size must be nonzero"));
        }
        Ok(Self {
            resource: BufferResource::new(config),
            item_size,
        })
    }

    pub fn item_size(&self) -> usize {
        self.item_size
    }

    pub fn item_count(&self) -> usize {
        self.resource.size() / self.item_size
    }

    pub fn resource(&self) -> &BufferResource {
        &self.resource
    }

    /// Dense layout of this buffer's items.
    pub fn layout(&self) -> Strided {
        Strided::dense(self.item_size)
    }

    fn bytes_for(&self, count: usize) -> Result<usize, Error> {
        count
            .checked_mul(self.item_size)
            .ok_or(Error::RangeExceedsBuffer {
                needed: usize::MAX,
                available: isize::MAX as usize,
            })
    }

    /// Discards the host block and allocates a zeroed one of `count` items.
    pub fn allocate_items(&mut self, count: usize) -> Result<(), Error> {
        let size = self.bytes_for(count)?;
        self.resource.allocate(size)
    }

    /**
    Allocates `count` items and fills them through `fill`.

    The new block is only installed if `fill` succeeds, so a failure leaves the buffer as it was.
    */
    pub(crate) fn replace_items_with<F>(&mut self, count: usize, fill: F) -> Result<(), Error>
    where
        F: FnOnce(&mut [u8]) -> Result<(), Error>,
    {
        if self.resource.is_mapped() {
            return Err(Error::AlreadyMapped);
        }
        let mut block = HostBlock::zeroed(self.bytes_for(count)?);
        fill(block.as_mut_slice())?;
        self.resource.replace_host(block)
    }

    /// Declares a device-side size of `count` items without allocating host memory.
    pub fn reserve_items(&mut self, count: usize) -> Result<(), Error> {
        let size = self.bytes_for(count)?;
        self.resource.reserve(size)
    }

    /// Resizes to `count` items, keeping existing items.
    pub fn resize_items(&mut self, count: usize) -> Result<(), Error> {
        let size = self.bytes_for(count)?;
        self.resource.resize(size)
    }

    /**
    Copies `count` items from `src` into this buffer's host block.

    `dst` describes where they land within this buffer's bytes.  If the host block was disposed
    after upload it is read back first.
    */
    pub fn copy_in(
        &mut self,
        dst: Strided,
        src: &[u8],
        src_layout: Strided,
        count: usize,
    ) -> Result<(), Error> {
        if !self.resource.has_host_block() {
            self.resource.read_back()?;
        }
        if self.resource.is_mapped() {
            return Err(Error::AlreadyMapped);
        }
        let Some(bytes) = self.resource.host_bytes_mut() else {
            return Err(Error::RangeExceedsBuffer {
                needed: dst.offset + dst.item_size,
                available: 0,
            });
        };
        layout::copy(bytes, dst, src, src_layout, count)
    }

    /// Copies `count` items out of this buffer into `dst`.
    pub fn copy_out(
        &self,
        dst: &mut [u8],
        dst_layout: Strided,
        src_layout: Strided,
        count: usize,
    ) -> Result<(), Error> {
        let contents = self.resource.contents()?;
        layout::copy(dst, dst_layout, &contents, src_layout, count)
    }

    /// Overwrites whole items starting at `first_item`, in every block that exists.
    pub fn write_item_bytes(&mut self, first_item: usize, bytes: &[u8]) -> Result<(), Error> {
        if bytes.len() % self.item_size != 0 {
            return Err(Error::InvalidLayout("write is not a whole number of items"));
        }
        let offset = self.bytes_for(first_item)?;
        self.resource.write_bytes(offset, bytes)
    }

    pub fn upload(&mut self, device: &Arc<dyn Device>) -> Result<(), Error> {
        self.resource.upload(device)
    }

    pub fn ensure_uploaded(&mut self, device: &Arc<dyn Device>) -> Result<(), Error> {
        self.resource.ensure_uploaded(device)
    }

    pub fn recreate(&mut self, device: &Arc<dyn Device>) -> Result<(), Error> {
        self.resource.recreate(device)
    }

    pub fn read_back(&mut self) -> Result<(), Error> {
        self.resource.read_back()
    }

    pub fn map(&mut self, mode: AccessMode) -> Result<&mut [u8], Error> {
        self.resource.map(mode)
    }

    pub fn mapped_bytes(&mut self) -> Result<&mut [u8], Error> {
        self.resource.mapped_bytes()
    }

    pub fn unmap(&mut self) -> Result<(), Error> {
        self.resource.unmap()
    }
}

impl Deref for ItemBuffer {
    type Target = BufferResource;
    fn deref(&self) -> &Self::Target {
        &self.resource
    }
}
