// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
The device collaborator.

This crate does not talk to any graphics API directly.  Instead, a backend implements [Device],
which exposes the handful of buffer entry points the transfer layer needs.  Backends that have no
real buffer objects report that through [Device::supports_buffers], and the transfer layer then
keeps an *emulated* device block in host memory instead.

All entry points are synchronous from the caller's point of view.

The [software] module provides an in-process implementation, which is useful for testing and for
hosts with no GPU at all.
*/

pub mod software;

use std::fmt::Debug;

/// Opaque name of a buffer owned by a [Device].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceHandle(pub u64);

/// How a mapping will be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessMode {
    Read,
    Write,
    ReadWrite,
}

impl AccessMode {
    pub fn reads(self) -> bool {
        matches!(self, AccessMode::Read | AccessMode::ReadWrite)
    }
    pub fn writes(self) -> bool {
        matches!(self, AccessMode::Write | AccessMode::ReadWrite)
    }
}

/**
A window onto device memory negotiated through [Device::map_buffer].

Devices hand out an owned staging copy rather than a raw pointer; the window is given back
through [Device::unmap_buffer], which writes it through if the mode allows.
*/
#[derive(Debug)]
pub struct MappedWindow {
    pub(crate) bytes: Box<[u8]>,
    pub(crate) mode: AccessMode,
    pub(crate) generation: u64,
}

impl MappedWindow {
    /// Creates a window.  `generation` lets the device recognize stale windows on unmap.
    pub fn new(bytes: Box<[u8]>, mode: AccessMode, generation: u64) -> Self {
        Self {
            bytes,
            mode,
            generation,
        }
    }
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }
    pub fn mode(&self) -> AccessMode {
        self.mode
    }
    pub fn generation(&self) -> u64 {
        self.generation
    }
    pub fn into_bytes(self) -> Box<[u8]> {
        self.bytes
    }
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DeviceError {
    #[error("no device buffer named {0:?}")]
    NoSuchBuffer(DeviceHandle),
    #[error("range {offset}+{len} exceeds device buffer of {size} bytes")]
    OutOfRange { offset: usize, len: usize, size: usize },
    #[error("device does not support buffer objects")]
    BuffersUnsupported,
    #[error("device buffer {0:?} is already mapped")]
    AlreadyMapped(DeviceHandle),
    #[error("device buffer {0:?} is not mapped")]
    NotMapped(DeviceHandle),
}

/**
Buffer entry points a backend supplies.

The transfer layer only calls the buffer entry points when [Device::supports_buffers] is true.
*/
pub trait Device: Debug + Send + Sync {
    /// Whether the device has real buffer objects.
    fn supports_buffers(&self) -> bool;

    /// Creates a buffer of `size` bytes, optionally initialized from `initial`.
    ///
    /// When `initial` is provided it is exactly `size` bytes long.
    fn create_buffer(
        &self,
        size: usize,
        initial: Option<&[u8]>,
    ) -> Result<DeviceHandle, DeviceError>;

    /// Writes `bytes` into the buffer starting at `offset`.
    fn upload_sub_data(
        &self,
        handle: DeviceHandle,
        offset: usize,
        bytes: &[u8],
    ) -> Result<(), DeviceError>;

    /// Maps the whole buffer.
    fn map_buffer(
        &self,
        handle: DeviceHandle,
        mode: AccessMode,
    ) -> Result<MappedWindow, DeviceError>;

    /// Releases a mapping.  Returns `false` if the device invalidated it while it was outstanding.
    fn unmap_buffer(&self, handle: DeviceHandle, window: MappedWindow) -> Result<bool, DeviceError>;

    /// Reads `dst.len()` bytes starting at `offset` into `dst`.
    fn readback(
        &self,
        handle: DeviceHandle,
        offset: usize,
        dst: &mut [u8],
    ) -> Result<(), DeviceError>;

    fn delete_buffer(&self, handle: DeviceHandle);
}
