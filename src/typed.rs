// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
Typed buffers.

A [TypedBuffer] is an [ItemBuffer] whose items have a known [ItemType].  On top of plain item
storage it provides:

* population from, and materialization into, strongly-typed host arrays ([TypedBuffer::populate],
  [TypedBuffer::materialize]);
* gather copies that reorder the items of another buffer through an index list
  ([TypedBuffer::gather_copy]);
* gather copies that re-tessellate polygons into a flat triangle list
  ([TypedBuffer::gather_copy_triangulated]);
* layout conversion, which regroups the raw component stream into items of a different shape
  ([TypedBuffer::convert_layout]).

Host types only need to be *base-compatible* with the buffer (same scalar kind) and no wider
than its items.  A narrower host item fills the leading components of each buffer item; for
example `[f32; 3]` positions can populate an `F32X4` buffer.

# Examples

```
use typed_buffers::item_type::ItemType;
use typed_buffers::typed::TypedBuffer;
use typed_buffers::usage::BufferConfig;

let corners = [[0.0f32, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];
let source = TypedBuffer::from_slice(&corners, BufferConfig::new("corners")).unwrap();

// one quad, split into two triangles
let mut triangles = TypedBuffer::new(ItemType::F32X2, BufferConfig::new("triangles"));
triangles
    .gather_copy_triangulated(&source, &[0u16, 1, 2, 3], &[4], 0, 1)
    .unwrap();
let out: Vec<[f32; 2]> = triangles.to_vec().unwrap();
assert_eq!(
    out,
    vec![corners[0], corners[1], corners[2], corners[0], corners[2], corners[3]]
);
```
*/

use crate::device::{AccessMode, Device};
use crate::error::{Error, LayoutMismatch};
use crate::item_type::{self, Item, ItemType};
use crate::items::ItemBuffer;
use crate::layout::{self, Strided};
use crate::usage::BufferConfig;
use std::ops::Deref;
use std::sync::Arc;

mod sealed {
    pub trait Sealed {}
}

/// Element types accepted in index lists.
pub trait IndexElement: sealed::Sealed + Copy {
    fn to_index(self) -> usize;
}

macro_rules! index_elements {
    ($($ty:ty),*) => {
        $(
            impl sealed::Sealed for $ty {}
            impl IndexElement for $ty {
                fn to_index(self) -> usize {
                    self as usize
                }
            }
        )*
    };
}

index_elements!(u8, u16, u32, usize);

/// How a list of polygon sizes will be copied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PolygonPlan {
    /// Every polygon has at least 3 vertices and is triangulated.
    Triangulate,
    /// Every entry is the same sub-3 size (a list of points or lines); vertices pass through.
    Passthrough,
}

fn plan_polygons(sizes: &[usize]) -> Result<PolygonPlan, Error> {
    let degenerate = sizes.iter().any(|&n| n < 3);
    let real = sizes.iter().any(|&n| n >= 3);
    if degenerate && real {
        return Err(Error::AmbiguousPolygonSet);
    }
    if !degenerate {
        return Ok(PolygonPlan::Triangulate);
    }
    //all sub-3: only a uniform list of points or lines is meaningful
    match sizes.first() {
        Some(&first) if first > 0 && sizes.iter().all(|&n| n == first) => {
            Ok(PolygonPlan::Passthrough)
        }
        _ => Err(Error::AmbiguousPolygonSet),
    }
}

/// Number of triangle-list vertices produced by a polygon of `n` vertices.
const fn triangulated_vertices(n: usize) -> usize {
    (n - 2) * 3
}

/**
Appends the triangle list for one polygon, given as positions into the index window.

Quads use the fixed split `(0,1,2),(0,2,3)`.  Larger polygons fan around vertex 0, with
triangle `k` being `(0, k+2, k+1)`.  The trailing pair is reversed relative to a naive fan, and
front-face winding depends on it.
*/
fn triangulate_polygon(first: usize, n: usize, out: &mut Vec<usize>) {
    match n {
        3 => out.extend_from_slice(&[first, first + 1, first + 2]),
        4 => out.extend_from_slice(&[
            first,
            first + 1,
            first + 2,
            first,
            first + 2,
            first + 3,
        ]),
        _ => {
            for k in 0..n - 2 {
                out.extend_from_slice(&[first, first + k + 2, first + k + 1]);
            }
        }
    }
}

#[derive(Debug)]
pub struct TypedBuffer {
    items: ItemBuffer,
    item_type: ItemType,
}

impl TypedBuffer {
    /// Creates an unallocated buffer of `item_type` items.
    pub fn new(item_type: ItemType, config: BufferConfig<'_>) -> Self {
        let items = match ItemBuffer::new(item_type.byte_size(), config) {
            Ok(items) => items,
            //every ItemType has a nonzero size
            Err(_) => unreachable!("item type {item_type} has zero size"),
        };
        Self { items, item_type }
    }

    /// Creates a buffer whose item type is `T`'s and populates it with `data`.
    pub fn from_slice<T: Item>(data: &[T], config: BufferConfig<'_>) -> Result<Self, Error> {
        let mut buffer = Self::new(ItemType::of::<T>(), config);
        buffer.populate(data)?;
        Ok(buffer)
    }

    pub fn item_type(&self) -> ItemType {
        self.item_type
    }

    pub fn items(&self) -> &ItemBuffer {
        &self.items
    }

    /// Mutable access to the underlying item storage.
    pub fn items_mut(&mut self) -> &mut ItemBuffer {
        &mut self.items
    }

    fn check_base(&self, other: ItemType) -> Result<(), Error> {
        if self.item_type.is_base_compatible(&other) {
            Ok(())
        } else {
            Err(Error::IncompatibleLayout(LayoutMismatch::Scalar {
                ours: self.item_type.scalar(),
                theirs: other.scalar(),
            }))
        }
    }

    /// Checks that host type `T` can stand for this buffer's items.
    fn check_host_type<T: Item>(&self) -> Result<(), Error> {
        let theirs = ItemType::of::<T>();
        self.check_base(theirs)?;
        if theirs.byte_size() > self.items.item_size() {
            return Err(Error::IncompatibleLayout(LayoutMismatch::Width {
                requested: theirs.byte_size(),
                available: self.items.item_size(),
            }));
        }
        Ok(())
    }

    /**
    Replaces the contents with `data`, one item per element.

    `T` must share this buffer's scalar kind and be no wider than its items.
    */
    pub fn populate<T: Item>(&mut self, data: &[T]) -> Result<(), Error> {
        self.check_host_type::<T>()?;
        let src = item_type::as_bytes(data);
        let dst_layout = self.items.layout();
        let src_layout = Strided::dense(std::mem::size_of::<T>());
        self.items.replace_items_with(data.len(), |dst| {
            layout::copy(dst, dst_layout, src, src_layout, data.len())
        })
    }

    /**
    Copies the first `count` items out as a host array of `T`.

    `T` must share this buffer's scalar kind and be no wider than its items; when it is narrower,
    each element receives the leading components of its item.
    */
    pub fn materialize<T: Item>(&self, count: usize) -> Result<Vec<T>, Error> {
        self.check_host_type::<T>()?;
        if count > self.items.item_count() {
            return Err(Error::IndexOutOfBounds {
                index: count,
                limit: self.items.item_count(),
            });
        }
        let mut out = vec![T::default(); count];
        let width = std::mem::size_of::<T>();
        self.items.copy_out(
            item_type::as_bytes_mut(&mut out),
            Strided::dense(width),
            Strided::dense(width).with_stride(self.items.item_size()),
            count,
        )?;
        Ok(out)
    }

    /// Every item as a host array of `T`.
    pub fn to_vec<T: Item>(&self) -> Result<Vec<T>, Error> {
        self.materialize(self.items.item_count())
    }

    /// One item as `T`.
    pub fn get<T: Item>(&self, index: usize) -> Result<T, Error> {
        self.check_host_type::<T>()?;
        if index >= self.items.item_count() {
            return Err(Error::IndexOutOfBounds {
                index,
                limit: self.items.item_count(),
            });
        }
        let mut out = [T::default()];
        let width = std::mem::size_of::<T>();
        self.items.copy_out(
            item_type::as_bytes_mut(&mut out),
            Strided::dense(width),
            Strided::dense(width).with_offset(index * self.items.item_size()),
            1,
        )?;
        Ok(out[0])
    }

    /**
    Overwrites items starting at `first_item` with `data`.

    Unlike [TypedBuffer::populate] this keeps the buffer's size, and the change reaches the
    device block immediately if there is one.
    */
    pub fn write_items<T: Item>(&mut self, first_item: usize, data: &[T]) -> Result<(), Error> {
        self.check_host_type::<T>()?;
        let item_size = self.items.item_size();
        let end = first_item
            .checked_add(data.len())
            .filter(|end| *end <= self.items.item_count())
            .ok_or(Error::IndexOutOfBounds {
                index: first_item.saturating_add(data.len()),
                limit: self.items.item_count(),
            })?;
        //start from the current bytes so trailing components of wider items survive
        let contents = self.items.contents()?;
        let mut staged = contents[first_item * item_size..end * item_size].to_vec();
        drop(contents);
        layout::copy(
            &mut staged,
            self.items.layout(),
            item_type::as_bytes(data),
            Strided::dense(std::mem::size_of::<T>()),
            data.len(),
        )?;
        self.items.write_item_bytes(first_item, &staged)
    }

    fn check_source(&self, source: &TypedBuffer) -> Result<(), Error> {
        self.check_base(source.item_type)?;
        if source.items.item_size() > self.items.item_size() {
            return Err(Error::ItemTooLarge {
                src: source.items.item_size(),
                dst: self.items.item_size(),
            });
        }
        Ok(())
    }

    /// Resolves index window positions into source item indices, validating every one.
    fn resolve<I: IndexElement>(
        source: &TypedBuffer,
        indices: &[I],
        positions: impl Iterator<Item = usize>,
        offset: usize,
        stride: usize,
    ) -> Result<Vec<usize>, Error> {
        let limit = source.items.item_count();
        positions
            .map(|position| {
                let slot = position
                    .checked_mul(stride)
                    .and_then(|s| s.checked_add(offset))
                    .filter(|slot| *slot < indices.len())
                    .ok_or(Error::IndexOutOfBounds {
                        index: offset.saturating_add(position.saturating_mul(stride)),
                        limit: indices.len(),
                    })?;
                let index = indices[slot].to_index();
                if index >= limit {
                    return Err(Error::IndexOutOfBounds { index, limit });
                }
                Ok(index)
            })
            .collect()
    }

    /// Replaces the contents with the listed items of `source`, in order.
    fn gather_items(&mut self, source: &TypedBuffer, picks: &[usize]) -> Result<(), Error> {
        let src = source.items.contents()?;
        let src_size = source.items.item_size();
        let dst_size = self.items.item_size();
        self.items.replace_items_with(picks.len(), |dst| {
            for (i, &pick) in picks.iter().enumerate() {
                layout::copy(
                    dst,
                    Strided::dense(dst_size).with_offset(i * dst_size),
                    &src,
                    Strided::dense(src_size).with_offset(pick * src_size),
                    1,
                )?;
            }
            Ok(())
        })
    }

    /**
    Replaces the contents with `count` items of `source`, picked through an index list.

    Item `i` of the result is item `indices[offset + i * stride]` of `source`.  Fails with
    [Error::IndexOutOfBounds] if the index window runs past the end of `indices` or an index
    names an item `source` doesn't have; nothing is changed in that case.
    */
    pub fn gather_copy<I: IndexElement>(
        &mut self,
        source: &TypedBuffer,
        indices: &[I],
        count: usize,
        offset: usize,
        stride: usize,
    ) -> Result<(), Error> {
        self.check_source(source)?;
        let picks = Self::resolve(source, indices, 0..count, offset, stride)?;
        self.gather_items(source, &picks)
    }

    /**
    Replaces the contents with a triangle list built from polygons of `source` items.

    `polygon_sizes` lists the vertex count of each polygon.  Polygon vertices are read from the
    index window in sequence: vertex `j` of the whole set is `indices[offset + j * stride]`.

    Triangles have 3 vertices and are copied as they are; quads become `(0,1,2),(0,2,3)`;
    larger polygons become a fan of `n - 2` triangles `(0, k+2, k+1)`.

    A list that mixes sizes below 3 with sizes of 3 or more fails with
    [Error::AmbiguousPolygonSet].  A list made entirely of one sub-3 size (all points, or all
    lines) has nothing to triangulate and is gathered vertex for vertex; any other sub-3 list
    is ambiguous as well.
    */
    pub fn gather_copy_triangulated<I: IndexElement>(
        &mut self,
        source: &TypedBuffer,
        indices: &[I],
        polygon_sizes: &[usize],
        offset: usize,
        stride: usize,
    ) -> Result<(), Error> {
        self.check_source(source)?;
        let plan = plan_polygons(polygon_sizes)?;
        let vertices = polygon_sizes.iter().try_fold(0usize, |sum, &n| sum.checked_add(n)).ok_or(
            Error::IndexOutOfBounds {
                index: usize::MAX,
                limit: indices.len(),
            },
        )?;
        //resolving every vertex up front validates the whole window before anything is allocated
        let window = Self::resolve(source, indices, 0..vertices, offset, stride)?;
        let picks = match plan {
            PolygonPlan::Passthrough => window,
            PolygonPlan::Triangulate => {
                let total: usize = polygon_sizes.iter().map(|&n| triangulated_vertices(n)).sum();
                let mut positions = Vec::with_capacity(total);
                let mut first = 0;
                for &n in polygon_sizes {
                    triangulate_polygon(first, n, &mut positions);
                    first += n;
                }
                debug_assert_eq!(positions.len(), total);
                positions.into_iter().map(|p| window[p]).collect()
            }
        };
        logwise::trace_sync!(
            "gather_copy_triangulated: {polygons} polygons -> {vertices} vertices",
            polygons = logwise::privacy::LogIt(&polygon_sizes.len()),
            vertices = logwise::privacy::LogIt(&picks.len())
        );
        self.gather_items(source, &picks)
    }

    /**
    Returns a new buffer holding the same component stream regrouped as `new_type` items.

    The scalar kinds must match.  The total number of components must divide evenly into items
    of the new shape, otherwise this fails with [Error::ComponentCountMismatch].
    */
    pub fn convert_layout(&self, new_type: ItemType) -> Result<TypedBuffer, Error> {
        self.check_base(new_type)?;
        let total = self.items.item_count() * self.item_type.components_per_item();
        let per_item = new_type.components_per_item();
        if total % per_item != 0 {
            return Err(Error::ComponentCountMismatch { total, per_item });
        }
        let count = total / per_item;
        let contents = self.items.contents()?;
        let mut converted = TypedBuffer::new(new_type, self.items.config());
        let layout = converted.items.layout();
        converted.items.replace_items_with(count, |dst| {
            layout::copy(dst, layout, &contents, layout, count)
        })?;
        Ok(converted)
    }

    pub fn upload(&mut self, device: &Arc<dyn Device>) -> Result<(), Error> {
        self.items.upload(device)
    }

    pub fn ensure_uploaded(&mut self, device: &Arc<dyn Device>) -> Result<(), Error> {
        self.items.ensure_uploaded(device)
    }

    pub fn map(&mut self, mode: AccessMode) -> Result<&mut [u8], Error> {
        self.items.map(mode)
    }

    pub fn unmap(&mut self) -> Result<(), Error> {
        self.items.unmap()
    }
}

impl Deref for TypedBuffer {
    type Target = ItemBuffer;
    fn deref(&self) -> &Self::Target {
        &self.items
    }
}
