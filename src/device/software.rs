// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
An in-process device.

[SoftwareDevice] keeps its "device memory" in ordinary host allocations.  It can be built with
buffer support ([SoftwareDevice::new]) or without it ([SoftwareDevice::without_buffers]); the
latter forces the transfer layer onto its emulated path.

```
use std::sync::Arc;
use typed_buffers::device::Device;
use typed_buffers::device::software::SoftwareDevice;

let device = Arc::new(SoftwareDevice::new());
let handle = device.create_buffer(4, Some(&[1, 2, 3, 4])).unwrap();
let mut out = [0u8; 2];
device.readback(handle, 2, &mut out).unwrap();
assert_eq!(out, [3, 4]);
```
*/

use crate::device::{AccessMode, Device, DeviceError, DeviceHandle, MappedWindow};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug)]
struct Slot {
    bytes: Vec<u8>,
    //generation of the outstanding mapping, if any
    mapped: Option<u64>,
}

#[derive(Debug, Default)]
struct Inner {
    next_handle: u64,
    generation: u64,
    buffers: HashMap<u64, Slot>,
    uploads: usize,
}

#[derive(Debug)]
pub struct SoftwareDevice {
    supports_buffers: bool,
    inner: Mutex<Inner>,
}

impl SoftwareDevice {
    /// A device with real buffer objects.
    pub fn new() -> Self {
        Self {
            supports_buffers: true,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// A device that reports no buffer support.
    pub fn without_buffers() -> Self {
        Self {
            supports_buffers: false,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Number of buffers currently alive on the device.
    pub fn live_buffers(&self) -> usize {
        self.inner.lock().unwrap().buffers.len()
    }

    /// Number of create/sub-data uploads performed so far.
    pub fn upload_count(&self) -> usize {
        self.inner.lock().unwrap().uploads
    }

    /// Copy of a buffer's device-side contents.
    pub fn contents(&self, handle: DeviceHandle) -> Option<Vec<u8>> {
        self.inner
            .lock()
            .unwrap()
            .buffers
            .get(&handle.0)
            .map(|slot| slot.bytes.clone())
    }

    /**
    Invalidates every outstanding mapping, as a device would on context loss.

    Windows handed out before this call are reported as corrupted when they are unmapped, and
    their contents are discarded.
    */
    pub fn invalidate_mappings(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.generation += 1;
        logwise::warn_sync!("SoftwareDevice: all mappings invalidated");
    }
}

impl Default for SoftwareDevice {
    fn default() -> Self {
        Self::new()
    }
}

fn check_range(offset: usize, len: usize, size: usize) -> Result<(), DeviceError> {
    match offset.checked_add(len) {
        Some(end) if end <= size => Ok(()),
        _ => Err(DeviceError::OutOfRange { offset, len, size }),
    }
}

impl Device for SoftwareDevice {
    fn supports_buffers(&self) -> bool {
        self.supports_buffers
    }

    fn create_buffer(
        &self,
        size: usize,
        initial: Option<&[u8]>,
    ) -> Result<DeviceHandle, DeviceError>  {
        if !self.supports_buffers {
            return Err(DeviceError::BuffersUnsupported);
        }
        let bytes = match initial {
            Some(initial) => {
                check_range(0, initial.len(), size)?;
                let mut bytes = initial.to_vec();
                bytes.resize(size, 0);
                bytes
            }
            None => vec![0; size],
        };
        let mut inner = self.inner.lock().unwrap();
        inner.next_handle += 1;
        let handle = inner.next_handle;
        if initial.is_some() {
            inner.uploads += 1;
        }
        inner.buffers.insert(handle, Slot { bytes, mapped: None });
        Ok(DeviceHandle(handle))
    }

    fn upload_sub_data(
        &self,
        handle: DeviceHandle,
        offset: usize,
        bytes: &[u8],
    ) -> Result<(), DeviceError>  {
        let mut inner = self.inner.lock().unwrap();
        let slot = inner
            .buffers
            .get_mut(&handle.0)
            .ok_or(DeviceError::NoSuchBuffer(handle))?;
        check_range(offset, bytes.len(), slot.bytes.len())?;
        slot.bytes[offset..offset + bytes.len()].copy_from_slice(bytes);
        inner.uploads += 1;
        Ok(())
    }

    fn map_buffer(
        &self,
        handle: DeviceHandle,
        mode: AccessMode,
    ) -> Result<MappedWindow, DeviceError>  {
        let mut inner = self.inner.lock().unwrap();
        let generation = inner.generation;
        let slot = inner
            .buffers
            .get_mut(&handle.0)
            .ok_or(DeviceError::NoSuchBuffer(handle))?;
        if slot.mapped.is_some_and(|g| g == generation) {
            return Err(DeviceError::AlreadyMapped(handle));
        }
        slot.mapped = Some(generation);
        let bytes = if mode.reads() {
            slot.bytes.clone().into_boxed_slice()
        } else {
            vec![0; slot.bytes.len()].into_boxed_slice()
        };
        Ok(MappedWindow::new(bytes, mode, generation))
    }

    fn unmap_buffer(
        &self,
        handle: DeviceHandle,
        window: MappedWindow,
    ) -> Result<bool, DeviceError>  {
        let mut inner = self.inner.lock().unwrap();
        let generation = inner.generation;
        let slot = inner
            .buffers
            .get_mut(&handle.0)
            .ok_or(DeviceError::NoSuchBuffer(handle))?;
        let Some(mapped) = slot.mapped.take() else {
            return Err(DeviceError::NotMapped(handle));
        };
        if mapped != generation || window.generation() != generation {
            return Ok(false);
        }
        if window.mode().writes() {
            let bytes = window.into_bytes();
            check_range(0, bytes.len(), slot.bytes.len())?;
            slot.bytes[..bytes.len()].copy_from_slice(&bytes);
        }
        Ok(true)
    }

    fn readback(
        &self,
        handle: DeviceHandle,
        offset: usize,
        dst: &mut [u8],
    ) -> Result<(), DeviceError>  {
        let inner = self.inner.lock().unwrap();
        let slot = inner
            .buffers
            .get(&handle.0)
            .ok_or(DeviceError::NoSuchBuffer(handle))?;
        check_range(offset, dst.len(), slot.bytes.len())?;
        dst.copy_from_slice(&slot.bytes[offset..offset + dst.len()]);
        Ok(())
    }

    fn delete_buffer(&self, handle: DeviceHandle) {
        let removed = self.inner.lock().unwrap().buffers.remove(&handle.0);
        if removed.is_none() {
            logwise::warn_sync!(
                "SoftwareDevice: delete of unknown buffer {handle}",
                handle = logwise::privacy::LogIt(&handle)
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_without_support_fails() {
        let device = SoftwareDevice::without_buffers();
        assert!(!device.supports_buffers());
        assert_eq!(
            device.create_buffer(4, None),
            Err(DeviceError::BuffersUnsupported)
        );
    }

    #[test]
    fn sub_data_and_readback() {
        let device = SoftwareDevice::new();
        let handle = device.create_buffer(8, None).unwrap();
        device.upload_sub_data(handle, 4, &[1, 2, 3, 4]).unwrap();
        assert_eq!(device.contents(handle).unwrap(), vec![0, 0, 0, 0, 1, 2, 3, 4]);
        assert!(matches!(
            device.upload_sub_data(handle, 6, &[1, 2, 3]),
            Err(DeviceError::OutOfRange { .. })
        ));
    }

    #[test]
    fn write_window_is_written_through() {
        let device = SoftwareDevice::new();
        let handle = device.create_buffer(3, Some(&[1, 2, 3])).unwrap();
        let mut window = device.map_buffer(handle, AccessMode::ReadWrite).unwrap();
        assert_eq!(window.bytes(), &[1, 2, 3]);
        window.bytes_mut()[0] = 9;
        assert_eq!(device.unmap_buffer(handle, window), Ok(true));
        assert_eq!(device.contents(handle).unwrap(), vec![9, 2, 3]);
    }

    #[test]
    fn invalidated_window_reports_corruption() {
        let device = SoftwareDevice::new();
        let handle = device.create_buffer(2, Some(&[5, 6])).unwrap();
        let mut window = device.map_buffer(handle, AccessMode::Write).unwrap();
        window.bytes_mut().copy_from_slice(&[0, 0]);
        device.invalidate_mappings();
        assert_eq!(device.unmap_buffer(handle, window), Ok(false));
        assert_eq!(device.contents(handle).unwrap(), vec![5, 6]);
    }

    #[test]
    fn delete_releases() {
        let device = SoftwareDevice::new();
        let handle = device.create_buffer(2, None).unwrap();
        assert_eq!(device.live_buffers(), 1);
        device.delete_buffer(handle);
        assert_eq!(device.live_buffers(), 0);
    }
}
