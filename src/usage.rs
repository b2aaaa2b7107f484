// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Usage declarations for buffers.
//!
//! A buffer declares up front how often its contents will change and who produces them.  The
//! transfer layer uses this to decide whether the host copy is still needed once the data has
//! reached the device.
//!
//! # Examples
//!
//! ```
//! use typed_buffers::usage::{Access, BufferConfig, BufferUsage, Frequency};
//!
//! // Mesh geometry: written once by the host, drawn many times
//! let usage = BufferUsage::new(Frequency::Static, Access::Draw);
//! assert!(usage.disposes_after_upload());
//!
//! // Per-frame uniforms keep their host copy around for the next write
//! let config = BufferConfig::new("uniforms").with_usage(BufferUsage::new(Frequency::Dynamic, Access::Draw));
//! assert!(!config.auto_dispose());
//! ```

/// How often the contents change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Frequency {
    /// Written once, used many times.
    Static,
    /// Written repeatedly, used many times between writes.
    Dynamic,
    /// Written once, used a few times.
    Stream,
}

/// Who produces and who consumes the contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Access {
    /// The host writes; the device reads.
    ///
    /// This is the only access pattern where the host is the sole source of the data, so a
    /// buffer with this access cannot be uploaded without host contents.
    Draw,
    /// The device writes; the host reads back.
    Read,
    /// The device both writes and reads.
    Copy,
}

/// Combined usage hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferUsage {
    pub frequency: Frequency,
    pub access: Access,
}

impl BufferUsage {
    pub const STATIC_DRAW: BufferUsage = BufferUsage::new(Frequency::Static, Access::Draw);
    pub const DYNAMIC_DRAW: BufferUsage = BufferUsage::new(Frequency::Dynamic, Access::Draw);
    pub const STREAM_DRAW: BufferUsage = BufferUsage::new(Frequency::Stream, Access::Draw);

    pub const fn new(frequency: Frequency, access: Access) -> Self {
        Self { frequency, access }
    }

    /// Whether the host copy is dead weight once the device has it.
    pub const fn disposes_after_upload(&self) -> bool {
        matches!(self.frequency, Frequency::Static) && matches!(self.access, Access::Draw)
    }

    /// Whether the data originates on the host.
    pub const fn host_sourced(&self) -> bool {
        matches!(self.access, Access::Draw)
    }
}

impl Default for BufferUsage {
    fn default() -> Self {
        Self::STATIC_DRAW
    }
}

/// Configuration for a new buffer.
#[derive(Debug, Clone)]
pub struct BufferConfig<'a> {
    pub usage: BufferUsage,
    /// Name used in diagnostics.
    pub debug_name: &'a str,
    /// Overrides the dispose-after-upload policy implied by [BufferConfig::usage].
    pub auto_dispose: Option<bool>,
}

impl<'a> BufferConfig<'a> {
    pub fn new(debug_name: &'a str) -> Self {
        Self {
            usage: BufferUsage::default(),
            debug_name,
            auto_dispose: None,
        }
    }

    pub fn with_usage(mut self, usage: BufferUsage) -> Self {
        self.usage = usage;
        self
    }

    pub fn with_auto_dispose(mut self, auto_dispose: bool) -> Self {
        self.auto_dispose = Some(auto_dispose);
        self
    }

    /// The effective dispose-after-upload policy.
    pub fn auto_dispose(&self) -> bool {
        self.auto_dispose
            .unwrap_or_else(|| self.usage.disposes_after_upload())
    }
}
