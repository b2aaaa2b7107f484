// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
A single logical buffer with a host half and a device half.

[BufferResource] owns at most one [HostBlock] and at most one device block.  The device block is
either a real buffer on a [Device] that supports them, or an *emulated* block: a second host
allocation standing in for hardware without buffer objects.

Which halves exist is a property of the storage state, not of a pair of nullable fields:

| State                | host block | device block           |
|----------------------|------------|------------------------|
| unallocated          | no         | no                     |
| host only            | yes        | no                     |
| device               | optional   | real, on a [Device]    |
| emulated device      | optional   | emulated, in host memory |

Moving between states is how ownership moves.  In particular, when a disposable host block is
uploaded to an emulated device, the block itself *becomes* the device block, so the same
allocation is never owned twice and never freed twice.

# Mapping

At most one mapping is outstanding.  A mapping covers the host block when there is one, the
emulated block when that is all there is, and otherwise a window negotiated with the device.

```
use std::sync::Arc;
use typed_buffers::device::{AccessMode, Device};
use typed_buffers::device::software::SoftwareDevice;
use typed_buffers::resource::BufferResource;
use typed_buffers::usage::BufferConfig;

let device: Arc<dyn Device> = Arc::new(SoftwareDevice::new());
let mut buffer = BufferResource::new(BufferConfig::new("example"));
buffer.allocate(8).unwrap();
buffer.map(AccessMode::Write).unwrap().copy_from_slice(&[1; 8]);
buffer.unmap().unwrap();
buffer.upload(&device).unwrap();

// static-draw buffers drop their host copy after upload
assert!(!buffer.has_host_block());
assert_eq!(&*buffer.contents().unwrap(), &[1; 8]);
```
*/

use crate::device::{AccessMode, Device, DeviceHandle, MappedWindow};
use crate::error::Error;
use crate::host::HostBlock;
use crate::usage::{BufferConfig, BufferUsage};
use std::borrow::Cow;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

enum Storage {
    Unallocated {
        //size declared by reserve(), for buffers whose data is produced on the device
        reserved: usize,
    },
    HostOnly(HostBlock),
    Device {
        device: Arc<dyn Device>,
        handle: DeviceHandle,
        size: usize,
        host: Option<HostBlock>,
    },
    Emulated {
        block: HostBlock,
        host: Option<HostBlock>,
    },
}

impl Debug for Storage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Storage::Unallocated { reserved } => {
                f.debug_struct("Unallocated").field("reserved", reserved).finish()
            }
            Storage::HostOnly(block) => f.debug_tuple("HostOnly").field(block).finish(),
            Storage::Device {
                handle, size, host, ..
            } => f
                .debug_struct("Device")
                .field("handle", handle)
                .field("size", size)
                .field("host", host)
                .finish(),
            Storage::Emulated { block, host } => f
                .debug_struct("Emulated")
                .field("block", block)
                .field("host", host)
                .finish(),
        }
    }
}

#[derive(Debug)]
enum Mapping {
    Unmapped,
    /// Direct access to the host block.
    Host(AccessMode),
    /// Direct access to an emulated device block that has no host block beside it.
    Emulated(AccessMode),
    /// A window negotiated with the device.
    Window(MappedWindow),
}

/// Where the live bytes of a buffer currently reside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Residency {
    Unallocated,
    HostOnly,
    /// On a device with real buffer objects; `host_copy` tells whether the host block was kept.
    Device { host_copy: bool },
    /// In an emulated device block; `host_copy` tells whether the host block was kept.
    Emulated { host_copy: bool },
}

pub struct BufferResource {
    storage: Storage,
    mapping: Mapping,
    usage: BufferUsage,
    auto_dispose: bool,
    debug_name: String,
}

impl BufferResource {
    /// Creates an unallocated buffer.
    pub fn new(config: BufferConfig<'_>) -> Self {
        Self {
            storage: Storage::Unallocated { reserved: 0 },
            mapping: Mapping::Unmapped,
            usage: config.usage,
            auto_dispose: config.auto_dispose(),
            debug_name: config.debug_name.to_string(),
        }
    }

    pub fn debug_name(&self) -> &str {
        &self.debug_name
    }

    pub fn usage(&self) -> BufferUsage {
        self.usage
    }

    pub fn auto_dispose(&self) -> bool {
        self.auto_dispose
    }

    /// A configuration that reproduces this buffer's settings.
    pub fn config(&self) -> BufferConfig<'_> {
        BufferConfig::new(&self.debug_name)
            .with_usage(self.usage)
            .with_auto_dispose(self.auto_dispose)
    }

    /**
    Logical size in bytes.

    While a host block exists this is the host block's size; afterwards it is the size of the
    device block.
    */
    pub fn size(&self) -> usize {
        match &self.storage {
            Storage::Unallocated { reserved } => *reserved,
            Storage::HostOnly(block) => block.len(),
            Storage::Device {
                host: Some(host), ..
            }
            | Storage::Emulated {
                host: Some(host), ..
            } => host.len(),
            Storage::Device {
                host: None, size, ..
            } => *size,
            Storage::Emulated { block, host: None } => block.len(),
        }
    }

    /// Size of the device block, if one exists.
    pub fn device_size(&self) -> Option<usize> {
        match &self.storage {
            Storage::Device { size, .. } => Some(*size),
            Storage::Emulated { block, .. } => Some(block.len()),
            _ => None,
        }
    }

    pub fn residency(&self) -> Residency {
        match &self.storage {
            Storage::Unallocated { .. } => Residency::Unallocated,
            Storage::HostOnly(_) => Residency::HostOnly,
            Storage::Device { host, .. } => Residency::Device {
                host_copy: host.is_some(),
            },
            Storage::Emulated { host, .. } => Residency::Emulated {
                host_copy: host.is_some(),
            },
        }
    }

    pub fn has_host_block(&self) -> bool {
        self.host_block().is_some()
    }

    pub fn has_device_block(&self) -> bool {
        matches!(
            self.storage,
            Storage::Device { .. } | Storage::Emulated { .. }
        )
    }

    pub fn device_handle(&self) -> Option<DeviceHandle> {
        match &self.storage {
            Storage::Device { handle, .. } => Some(*handle),
            _ => None,
        }
    }

    pub fn is_mapped(&self) -> bool {
        !matches!(self.mapping, Mapping::Unmapped)
    }

    fn host_block(&self) -> Option<&HostBlock> {
        match &self.storage {
            Storage::HostOnly(block) => Some(block),
            Storage::Device { host, .. } | Storage::Emulated { host, .. } => host.as_ref(),
            Storage::Unallocated { .. } => None,
        }
    }

    fn host_block_mut(&mut self) -> Option<&mut HostBlock> {
        match &mut self.storage {
            Storage::HostOnly(block) => Some(block),
            Storage::Device { host, .. } | Storage::Emulated { host, .. } => host.as_mut(),
            Storage::Unallocated { .. } => None,
        }
    }

    /// Host bytes, when a host block exists.
    pub fn host_bytes(&self) -> Option<&[u8]> {
        self.host_block().map(HostBlock::as_slice)
    }

    /// Mutable host bytes, when a host block exists.
    ///
    /// Changes made here reach the device on the next [BufferResource::upload].
    pub fn host_bytes_mut(&mut self) -> Option<&mut [u8]> {
        self.host_block_mut().map(HostBlock::as_mut_slice)
    }

    fn ensure_unmapped(&self) -> Result<(), Error> {
        if self.is_mapped() {
            Err(Error::AlreadyMapped)
        } else {
            Ok(())
        }
    }

    /**
    Discards any host block and allocates a new zeroed one of `size` bytes.

    Host addresses obtained earlier are invalid afterwards.  An existing device block is kept
    as-is until the next upload.
    */
    pub fn allocate(&mut self, size: usize) -> Result<(), Error> {
        self.replace_host(HostBlock::zeroed(size))
    }

    /// Installs `block` as the host block, discarding any previous one.
    pub(crate) fn replace_host(&mut self, block: HostBlock) -> Result<(), Error> {
        self.ensure_unmapped()?;
        match &mut self.storage {
            Storage::Unallocated { .. } | Storage::HostOnly(_) => {
                self.storage = Storage::HostOnly(block);
            }
            Storage::Device { host, .. } | Storage::Emulated { host, .. } => {
                *host = Some(block);
            }
        }
        Ok(())
    }

    /**
    Declares a size without allocating host memory.

    Used for buffers whose contents are produced on the device, so that [BufferResource::upload]
    knows how large a device block to create.
    */
    pub fn reserve(&mut self, size: usize) -> Result<(), Error> {
        self.ensure_unmapped()?;
        match &mut self.storage {
            Storage::Unallocated { reserved } => {
                *reserved = size;
                Ok(())
            }
            _ => Err(Error::InvalidLayout(
                "reserve is only meaningful on an unallocated buffer",
            )),
        }
    }

    /**
    Resizes the host block, keeping the first `min(old, new)` bytes.

    If the host block was disposed, the device contents are read back first.
    */
    pub fn resize(&mut self, size: usize) -> Result<(), Error> {
        self.ensure_unmapped()?;
        if matches!(self.storage, Storage::Unallocated { .. }) {
            return self.allocate(size);
        }
        self.read_back()?;
        if let Some(block) = self.host_block_mut() {
            block.resize(size);
        }
        Ok(())
    }

    /**
    Pushes the host block to the device.

    On a device with buffer objects, the device block is created on first upload and updated in
    place afterwards.  On a device without them, an emulated block is created instead: a copy of
    the host block, or the host block itself when the buffer disposes its host copy anyway.

    When the dispose-after-upload policy is in effect, the host block is released afterwards.
    */
    pub fn upload(&mut self, device: &Arc<dyn Device>) -> Result<(), Error> {
        self.ensure_unmapped()?;
        let _upload = logwise::perfwarn_begin!("BufferResource::upload");
        match &mut self.storage {
            Storage::Unallocated { reserved } => {
                if self.usage.host_sourced() {
                    return Err(Error::UnsupportedDevice(
                        "host-sourced buffer has no host data to upload",
                    ));
                }
                let size = *reserved;
                if device.supports_buffers() {
                    let handle = device.create_buffer(size, None)?;
                    self.storage = Storage::Device {
                        device: device.clone(),
                        handle,
                        size,
                        host: None,
                    };
                } else {
                    self.storage = Storage::Emulated {
                        block: HostBlock::zeroed(size),
                        host: None,
                    };
                }
                logwise::info_sync!(
                    "{name}: created empty device block of {size} bytes",
                    name = logwise::privacy::LogIt(&self.debug_name),
                    size = logwise::privacy::LogIt(&size)
                );
                return Ok(());
            }
            Storage::HostOnly(block) => {
                if device.supports_buffers() {
                    let handle = device.create_buffer(block.len(), Some(block.as_slice()))?;
                    let size = block.len();
                    let host = self.take_host_only();
                    self.storage = Storage::Device {
                        device: device.clone(),
                        handle,
                        size,
                        host: if self.auto_dispose { None } else { Some(host) },
                    };
                    logwise::info_sync!(
                        "{name}: uploaded {size} bytes to device buffer",
                        name = logwise::privacy::LogIt(&self.debug_name),
                        size = logwise::privacy::LogIt(&size)
                    );
                } else {
                    let host = self.take_host_only();
                    if self.auto_dispose {
                        logwise::info_sync!(
                            "{name}: transferring host block to emulated device",
                            name = logwise::privacy::LogIt(&self.debug_name)
                        );
                        self.storage = Storage::Emulated {
                            block: host,
                            host: None,
                        };
                    } else {
                        logwise::info_sync!(
                            "{name}: copying host block to emulated device",
                            name = logwise::privacy::LogIt(&self.debug_name)
                        );
                        self.storage = Storage::Emulated {
                            block: host.clone(),
                            host: Some(host),
                        };
                    }
                }
            }
            Storage::Device {
                device: owner,
                handle,
                size,
                host,
            } => {
                let Some(block) = host else {
                    //nothing newer than what the device already holds
                    return Ok(());
                };
                if block.len() > *size {
                    return Err(Error::RangeExceedsBuffer {
                        needed: block.len(),
                        available: *size,
                    });
                }
                owner.upload_sub_data(*handle, 0, block.as_slice())?;
                if self.auto_dispose {
                    *host = None;
                }
            }
            Storage::Emulated { block, host } => {
                let Some(source) = host else {
                    return Ok(());
                };
                if source.len() > block.len() {
                    return Err(Error::RangeExceedsBuffer {
                        needed: source.len(),
                        available: block.len(),
                    });
                }
                block.as_mut_slice()[..source.len()].copy_from_slice(source.as_slice());
                if self.auto_dispose {
                    *host = None;
                }
            }
        }
        Ok(())
    }

    //only valid in the HostOnly state
    fn take_host_only(&mut self) -> HostBlock {
        match std::mem::replace(&mut self.storage, Storage::Unallocated { reserved: 0 }) {
            Storage::HostOnly(block) => block,
            _ => unreachable!("take_host_only outside HostOnly"),
        }
    }

    /// Uploads only if no device block exists yet, as when a buffer is first bound.
    pub fn ensure_uploaded(&mut self, device: &Arc<dyn Device>) -> Result<(), Error> {
        if self.has_device_block() {
            Ok(())
        } else {
            self.upload(device)
        }
    }

    /**
    Releases the device block and uploads again from the host block.

    This is the only way the size of an existing device block changes.  If the host block had
    been disposed it is read back first, so contents survive the round trip.
    */
    pub fn recreate(&mut self, device: &Arc<dyn Device>) -> Result<(), Error> {
        self.ensure_unmapped()?;
        self.read_back()?;
        let previous = std::mem::replace(&mut self.storage, Storage::Unallocated { reserved: 0 });
        let host = match previous {
            Storage::Device {
                device: owner,
                handle,
                host,
                ..
            } => {
                owner.delete_buffer(handle);
                host
            }
            Storage::Emulated { host, .. } => host,
            Storage::HostOnly(block) => Some(block),
            Storage::Unallocated { reserved } => {
                self.storage = Storage::Unallocated { reserved };
                return self.upload(device);
            }
        };
        //read_back guarantees a host block for every state that had a device block
        self.storage = match host {
            Some(block) => Storage::HostOnly(block),
            None => Storage::Unallocated { reserved: 0 },
        };
        self.upload(device)
    }

    /// Restores the host block from the device block, if it was disposed.
    pub fn read_back(&mut self) -> Result<(), Error> {
        self.ensure_unmapped()?;
        match &mut self.storage {
            Storage::Device {
                device,
                handle,
                size,
                host,
            } if host.is_none() => {
                let _readback = logwise::perfwarn_begin!("BufferResource::read_back");
                let mut block = HostBlock::zeroed(*size);
                device.readback(*handle, 0, block.as_mut_slice())?;
                *host = Some(block);
            }
            Storage::Emulated { block, host } if host.is_none() => {
                *host = Some(block.clone());
            }
            _ => {}
        }
        Ok(())
    }

    /**
    The buffer's current bytes, from whichever block holds them.

    Borrows the host or emulated block when possible; reads the device block back into a
    temporary otherwise.
    */
    pub fn contents(&self) -> Result<Cow<'_, [u8]>, Error> {
        if let Some(host) = self.host_block() {
            return Ok(Cow::Borrowed(host.as_slice()));
        }
        match &self.storage {
            Storage::Emulated { block, .. } => Ok(Cow::Borrowed(block.as_slice())),
            Storage::Device {
                device,
                handle,
                size,
                ..
            } => {
                let mut bytes = vec![0; *size];
                device.readback(*handle, 0, &mut bytes)?;
                Ok(Cow::Owned(bytes))
            }
            _ => Ok(Cow::Borrowed(&[])),
        }
    }

    /**
    Writes `bytes` at `offset` into every block that exists.

    The host block is updated in place, and the same range is pushed to the device block.
    */
    pub fn write_bytes(&mut self, offset: usize, bytes: &[u8]) -> Result<(), Error> {
        self.ensure_unmapped()?;
        let end = offset.checked_add(bytes.len()).ok_or(Error::RangeExceedsBuffer {
            needed: usize::MAX,
            available: self.size(),
        })?;
        let mut limit = self.size();
        if let Some(device_size) = self.device_size() {
            limit = limit.min(device_size);
        }
        if end > limit {
            return Err(Error::RangeExceedsBuffer {
                needed: end,
                available: limit,
            });
        }
        match &mut self.storage {
            Storage::Device {
                device, handle, ..
            } => {
                device.upload_sub_data(*handle, offset, bytes)?;
            }
            Storage::Emulated { block, .. } => {
                block.as_mut_slice()[offset..end].copy_from_slice(bytes);
            }
            _ => {}
        }
        if let Some(host) = self.host_block_mut() {
            host.as_mut_slice()[offset..end].copy_from_slice(bytes);
        }
        Ok(())
    }

    /**
    Maps the buffer and returns the mapped bytes.

    Fails with [Error::AlreadyMapped] if a mapping is outstanding.
    */
    pub fn map(&mut self, mode: AccessMode) -> Result<&mut [u8], Error> {
        self.ensure_unmapped()?;
        self.mapping = if self.has_host_block() {
            Mapping::Host(mode)
        } else {
            match &self.storage {
                Storage::Device {
                    device, handle, ..
                } => Mapping::Window(device.map_buffer(*handle, mode)?),
                Storage::Emulated { .. } => Mapping::Emulated(mode),
                //an unallocated buffer maps to an empty range
                _ => Mapping::Host(mode),
            }
        };
        self.mapped_bytes()
    }

    /// The bytes covered by the outstanding mapping.
    pub fn mapped_bytes(&mut self) -> Result<&mut [u8], Error> {
        match &mut self.mapping {
            Mapping::Unmapped => Err(Error::NotMapped),
            Mapping::Window(window) => Ok(window.bytes_mut()),
            Mapping::Emulated(_) => match &mut self.storage {
                Storage::Emulated { block, .. } => Ok(block.as_mut_slice()),
                _ => unreachable!("emulated mapping without an emulated block"),
            },
            Mapping::Host(_) => match &mut self.storage {
                Storage::HostOnly(block)
                | Storage::Device {
                    host: Some(block), ..
                }
                | Storage::Emulated {
                    host: Some(block), ..
                } => Ok(block.as_mut_slice()),
                //an unallocated buffer maps to an empty range
                _ => Ok(&mut []),
            },
        }
    }

    /**
    Releases the outstanding mapping.

    A writable host mapping on a buffer that also has a device block pushes the host block to the
    device.  A device window is handed back to the device; if the device invalidated it in the
    meantime, this fails with [Error::Corrupted] and the window's contents are lost.
    */
    pub fn unmap(&mut self) -> Result<(), Error> {
        match std::mem::replace(&mut self.mapping, Mapping::Unmapped) {
            Mapping::Unmapped => Err(Error::NotMapped),
            Mapping::Emulated(_) => Ok(()),
            Mapping::Window(window) => {
                let Storage::Device {
                    device, handle, ..
                } = &self.storage
                else {
                    unreachable!("device window without a device block");
                };
                if device.unmap_buffer(*handle, window)? {
                    Ok(())
                } else {
                    logwise::error_sync!(
                        "{name}: device invalidated the mapped window",
                        name = logwise::privacy::LogIt(&self.debug_name)
                    );
                    Err(Error::Corrupted)
                }
            }
            Mapping::Host(mode) => {
                if !mode.writes() {
                    return Ok(());
                }
                match &mut self.storage {
                    Storage::Device {
                        device,
                        handle,
                        size,
                        host: Some(host),
                    } => {
                        let len = host.len().min(*size);
                        device.upload_sub_data(*handle, 0, &host.as_slice()[..len])?;
                    }
                    Storage::Emulated {
                        block,
                        host: Some(host),
                    } => {
                        let len = host.len().min(block.len());
                        block.as_mut_slice()[..len].copy_from_slice(&host.as_slice()[..len]);
                    }
                    _ => {}
                }
                Ok(())
            }
        }
    }
}

impl Debug for BufferResource {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferResource")
            .field("debug_name", &self.debug_name)
            .field("storage", &self.storage)
            .field("mapping", &self.mapping)
            .field("usage", &self.usage)
            .finish()
    }
}

impl Drop for BufferResource {
    fn drop(&mut self) {
        if self.is_mapped() && !std::thread::panicking() {
            logwise::error_sync!(
                "{name}: dropped while mapped",
                name = logwise::privacy::LogIt(&self.debug_name)
            );
            panic!("BufferResource {} dropped while mapped", self.debug_name);
        }
        //emulated blocks and host blocks are plain owned values and drop on their own;
        //only a real device block needs to be handed back
        if let Storage::Device {
            device, handle, ..
        } = &self.storage
        {
            if let Mapping::Window(_) = self.mapping {
                //unwinding with a window out; the device still owns the mapping, so leave the
                //buffer to it
                return;
            }
            device.delete_buffer(*handle);
        }
    }
}
