// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
Errors reported by the transfer layer.

Every variant describes a contract violation that was detected before any byte
was moved, so a buffer that returns one of these is left exactly as it was.
*/

use crate::device::DeviceError;
use crate::item_type::ScalarKind;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// An item size was zero, or a stride was narrower than the item it steps over.
    #[error("invalid layout: {0}")]
    InvalidLayout(&'static str),

    /// The source item is wider than the destination item.
    #[error("source item of {src} bytes does not fit a destination item of {dst} bytes")]
    ItemTooLarge { src: usize, dst: usize },

    #[error("incompatible item layouts: {0}")]
    IncompatibleLayout(LayoutMismatch),

    /// A layout conversion whose component totals don't divide evenly.
    #[error("{total} components cannot be regrouped into items of {per_item} components")]
    ComponentCountMismatch { total: usize, per_item: usize },

    /// A gather index, or the index window itself, is out of range.
    #[error("index {index} is out of bounds (limit {limit})")]
    IndexOutOfBounds { index: usize, limit: usize },

    /// A polygon size list mixes degenerate and real polygons.
    #[error("polygon set mixes degenerate sizes with triangulable ones")]
    AmbiguousPolygonSet,

    #[error("buffer is already mapped")]
    AlreadyMapped,

    #[error("buffer is not mapped")]
    NotMapped,

    /// The device invalidated a mapping before it was released.
    #[error("mapped device window was corrupted")]
    Corrupted,

    #[error("device cannot satisfy upload: {0}")]
    UnsupportedDevice(&'static str),

    /// A copy window or sub-range write reaches past the end of its storage.
    #[error("range needs {needed} bytes but only {available} are available")]
    RangeExceedsBuffer { needed: usize, available: usize },

    #[error(transparent)]
    Device(#[from] DeviceError),
}

/// Why two item layouts could not be used together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutMismatch {
    /// The item types do not share a scalar kind.
    Scalar { ours: ScalarKind, theirs: ScalarKind },
    /// The requested item is wider than the buffer's items.
    Width { requested: usize, available: usize },
}

impl std::fmt::Display for LayoutMismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LayoutMismatch::Scalar { ours, theirs } => {
                write!(f, "scalar kind {ours:?} vs {theirs:?}")
            }
            LayoutMismatch::Width {
                requested,
                available,
            } => write!(
                f,
                "requested {requested}-byte items from a buffer of {available}-byte items"
            ),
        }
    }
}
