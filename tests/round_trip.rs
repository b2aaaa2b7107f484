// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
use proptest::prelude::*;
use std::sync::Arc;
use typed_buffers::device::Device;
use typed_buffers::device::software::SoftwareDevice;
use typed_buffers::item_type::f16;
use typed_buffers::{BufferConfig, Item, TypedBuffer};

fn round_trip<T: Item>(data: &[T]) -> Vec<T> {
    let buffer = TypedBuffer::from_slice(data, BufferConfig::new("round trip")).unwrap();
    buffer.materialize(data.len()).unwrap()
}

fn round_trip_through_device<T: Item>(data: &[T], device: &Arc<dyn Device>) -> Vec<T> {
    let mut buffer = TypedBuffer::from_slice(data, BufferConfig::new("round trip")).unwrap();
    buffer.upload(device).unwrap();
    buffer.to_vec().unwrap()
}

proptest! {
    #[test]
    fn u8_vectors(data in prop::collection::vec(any::<[u8; 4]>(), 1..64)) {
        prop_assert_eq!(round_trip(&data), data);
    }

    #[test]
    fn i16_scalars(data in prop::collection::vec(any::<i16>(), 1..64)) {
        prop_assert_eq!(round_trip(&data), data);
    }

    #[test]
    fn u32_vec3(data in prop::collection::vec(any::<[u32; 3]>(), 1..64)) {
        prop_assert_eq!(round_trip(&data), data);
    }

    #[test]
    fn f32_matrices(data in prop::collection::vec(any::<[[i32; 4]; 4]>(), 1..16)) {
        //integer-valued floats compare exactly
        let data: Vec<[[f32; 4]; 4]> = data
            .iter()
            .map(|m| m.map(|column| column.map(|x| (x % 1_000_000) as f32)))
            .collect();
        prop_assert_eq!(round_trip(&data), data);
    }

    #[test]
    fn f16_vectors(bits in prop::collection::vec(any::<[u8; 2]>(), 1..64)) {
        let data: Vec<[f16; 2]> = bits
            .iter()
            .map(|b| [f16::from_f32(b[0] as f32), f16::from_f32(b[1] as f32)])
            .collect();
        prop_assert_eq!(round_trip(&data), data);
    }

    #[test]
    fn f64_through_devices(
        data in prop::collection::vec(-1.0e9f64..1.0e9, 1..64),
        emulated in any::<bool>(),
    ) {
        let device: Arc<dyn Device> = if emulated {
            Arc::new(SoftwareDevice::without_buffers())
        } else {
            Arc::new(SoftwareDevice::new())
        };
        prop_assert_eq!(round_trip_through_device(&data, &device), data);
    }
}
