/*! typed_buffers is a layout-aware transfer layer for moving typed item data between host memory
and GPU buffers.

It sits underneath vertex, index and uniform data handling: callers describe their data as items of
a known shape, and this crate takes care of where the bytes live, how they get to the device, and
how they are reshaped along the way.

# Layers

| Layer                      | Type            | Responsibility                                                         |
|----------------------------|-----------------|------------------------------------------------------------------------|
| Buffer resource            | [BufferResource] | Host block, device block, upload strategy, mapping, readback           |
| Item buffer                | [ItemBuffer]     | Fixed-size items, strided copies in and out                            |
| Typed buffer               | [TypedBuffer]    | Typed population, materialization, gather, triangulation, conversion   |

Every data movement bottoms out in [layout::copy], which picks a single bulk copy when both sides
are densely packed and the same width, and copies item by item otherwise.

# Devices

The device side is abstracted behind the [device::Device] trait.  A device may provide true
device buffers, or may lack buffer support entirely, in which case resources fall back to an
*emulated* device block in host memory with the same observable behavior.
[device::software::SoftwareDevice] is a complete in-memory implementation, suitable for tests and
for platforms without GPU buffers.

# Usage hints

Each resource carries a [usage::BufferUsage].  Static draw data is uploaded once, and by default
its host copy is released afterwards; it is read back from the device on demand.  Dynamic and
stream data keep their host copy so that mapping for write stays cheap.

# Examples

```
use std::sync::Arc;
use typed_buffers::device::Device;
use typed_buffers::device::software::SoftwareDevice;
use typed_buffers::{BufferConfig, ItemType, TypedBuffer};

let device: Arc<dyn Device> = Arc::new(SoftwareDevice::new());

let quads = [[0.0f32, 0.0, 0.0, 1.0], [1.0, 0.0, 0.0, 1.0], [1.0, 1.0, 0.0, 1.0]];
let mut positions = TypedBuffer::from_slice(&quads, BufferConfig::new("positions")).unwrap();
positions.upload(&device).unwrap();

// regroup the 12 components into 4 three-component items
let regrouped = positions.convert_layout(ItemType::F32X3).unwrap();
assert_eq!(regrouped.item_count(), 4);
let second: [f32; 3] = regrouped.get(1).unwrap();
assert_eq!(second, [1.0, 1.0, 0.0]);
```
*/

pub mod device;
pub mod error;
pub mod host;
pub mod item_type;
pub mod items;
pub mod layout;
pub mod resource;
pub mod typed;
pub mod usage;

pub use error::Error;
pub use item_type::{Item, ItemType, ScalarKind};
pub use items::ItemBuffer;
pub use resource::BufferResource;
pub use typed::TypedBuffer;
pub use usage::{BufferConfig, BufferUsage};
