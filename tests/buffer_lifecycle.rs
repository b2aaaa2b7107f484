// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
use std::sync::Arc;
use typed_buffers::device::software::SoftwareDevice;
use typed_buffers::device::{AccessMode, Device};
use typed_buffers::resource::Residency;
use typed_buffers::usage::{Access, Frequency};
use typed_buffers::{BufferConfig, BufferResource, BufferUsage, Error, ItemType, TypedBuffer};

fn software() -> (Arc<SoftwareDevice>, Arc<dyn Device>) {
    let software = Arc::new(SoftwareDevice::new());
    let device: Arc<dyn Device> = software.clone();
    (software, device)
}

#[cfg_attr(target_arch = "wasm32", wasm_bindgen_test::wasm_bindgen_test)]
#[test]
fn mapping_is_exclusive() {
    let mut buffer = BufferResource::new(BufferConfig::new("exclusive"));
    buffer.allocate(4).unwrap();
    assert!(matches!(buffer.unmap(), Err(Error::NotMapped)));
    buffer.map(AccessMode::Write).unwrap();
    assert!(matches!(buffer.map(AccessMode::Read), Err(Error::AlreadyMapped)));
    buffer.unmap().unwrap();
    assert!(matches!(buffer.unmap(), Err(Error::NotMapped)));
}

#[cfg_attr(target_arch = "wasm32", wasm_bindgen_test::wasm_bindgen_test)]
#[test]
fn mapped_buffer_refuses_transfers() {
    let (_software, device) = software();
    let mut buffer = TypedBuffer::from_slice(&[1u32, 2], BufferConfig::new("busy")).unwrap();
    buffer.map(AccessMode::Read).unwrap();
    assert!(matches!(buffer.upload(&device), Err(Error::AlreadyMapped)));
    assert!(matches!(buffer.populate(&[3u32]), Err(Error::AlreadyMapped)));
    buffer.unmap().unwrap();
    assert_eq!(buffer.to_vec::<u32>().unwrap(), vec![1, 2]);
}

#[cfg_attr(target_arch = "wasm32", wasm_bindgen_test::wasm_bindgen_test)]
#[test]
fn static_buffer_reads_back_after_upload() {
    let (software, device) = software();
    let data = [[1.0f32, 2.0, 3.0], [4.0, 5.0, 6.0]];
    let mut buffer = TypedBuffer::from_slice(&data, BufferConfig::new("mesh")).unwrap();
    buffer.upload(&device).unwrap();
    assert_eq!(buffer.residency(), Residency::Device { host_copy: false });
    assert_eq!(software.live_buffers(), 1);
    assert_eq!(buffer.to_vec::<[f32; 3]>().unwrap(), data.to_vec());
    drop(buffer);
    assert_eq!(software.live_buffers(), 0);
}

#[cfg_attr(target_arch = "wasm32", wasm_bindgen_test::wasm_bindgen_test)]
#[test]
fn ensure_uploaded_only_uploads_once() {
    let (software, device) = software();
    let mut buffer = TypedBuffer::from_slice(
        &[1u8, 2, 3],
        BufferConfig::new("bind").with_usage(BufferUsage::DYNAMIC_DRAW),
    )
    .unwrap();
    buffer.ensure_uploaded(&device).unwrap();
    let handle = buffer.device_handle().unwrap();
    buffer.ensure_uploaded(&device).unwrap();
    assert_eq!(buffer.device_handle(), Some(handle));
    assert_eq!(software.live_buffers(), 1);
}

#[cfg_attr(target_arch = "wasm32", wasm_bindgen_test::wasm_bindgen_test)]
#[test]
fn emulated_device_behaves_like_a_device() {
    let device: Arc<dyn Device> = Arc::new(SoftwareDevice::without_buffers());
    let mut buffer =
        TypedBuffer::from_slice(&[10u16, 20, 30], BufferConfig::new("emulated")).unwrap();
    buffer.upload(&device).unwrap();
    assert_eq!(buffer.residency(), Residency::Emulated { host_copy: false });
    assert_eq!(buffer.device_handle(), None);
    assert_eq!(buffer.to_vec::<u16>().unwrap(), vec![10, 20, 30]);

    let mapped = buffer.map(AccessMode::ReadWrite).unwrap();
    mapped[0] = 11;
    buffer.unmap().unwrap();
    assert_eq!(buffer.get::<u16>(0).unwrap(), 11);
}

#[cfg_attr(target_arch = "wasm32", wasm_bindgen_test::wasm_bindgen_test)]
#[test]
fn writable_host_mapping_writes_back() {
    let (software, device) = software();
    let mut buffer = TypedBuffer::from_slice(
        &[0u8; 4],
        BufferConfig::new("uniforms").with_usage(BufferUsage::DYNAMIC_DRAW),
    )
    .unwrap();
    buffer.upload(&device).unwrap();
    assert_eq!(buffer.residency(), Residency::Device { host_copy: true });
    let uploads = software.upload_count();

    buffer.map(AccessMode::Write).unwrap().copy_from_slice(&[1, 2, 3, 4]);
    buffer.unmap().unwrap();
    assert_eq!(software.upload_count(), uploads + 1);
    assert_eq!(
        software.contents(buffer.device_handle().unwrap()).unwrap(),
        vec![1, 2, 3, 4]
    );

    //read-only mappings push nothing
    buffer.map(AccessMode::Read).unwrap();
    buffer.unmap().unwrap();
    assert_eq!(software.upload_count(), uploads + 1);
}

#[cfg_attr(target_arch = "wasm32", wasm_bindgen_test::wasm_bindgen_test)]
#[test]
fn invalidated_window_reports_corruption() {
    let (software, device) = software();
    let mut buffer = TypedBuffer::from_slice(&[5u32; 4], BufferConfig::new("window")).unwrap();
    buffer.upload(&device).unwrap();
    buffer.map(AccessMode::Write).unwrap().fill(0);
    software.invalidate_mappings();
    assert!(matches!(buffer.unmap(), Err(Error::Corrupted)));
    //the write was lost
    assert_eq!(buffer.to_vec::<u32>().unwrap(), vec![5; 4]);
}

#[cfg_attr(target_arch = "wasm32", wasm_bindgen_test::wasm_bindgen_test)]
#[test]
fn draw_buffer_without_data_is_rejected() {
    let (software, device) = software();
    let mut buffer = TypedBuffer::new(ItemType::F32X4, BufferConfig::new("empty"));
    assert!(matches!(
        buffer.upload(&device),
        Err(Error::UnsupportedDevice(_))
    ));
    assert_eq!(software.live_buffers(), 0);
}

#[cfg_attr(target_arch = "wasm32", wasm_bindgen_test::wasm_bindgen_test)]
#[test]
fn device_produced_buffer_reserves_size() {
    let (software, device) = software();
    let mut buffer = TypedBuffer::new(
        ItemType::F32X4,
        BufferConfig::new("transform feedback")
            .with_usage(BufferUsage::new(Frequency::Stream, Access::Copy)),
    );
    buffer.items_mut().reserve_items(3).unwrap();
    buffer.upload(&device).unwrap();
    assert_eq!(buffer.device_size(), Some(48));
    assert_eq!(buffer.item_count(), 3);
    assert_eq!(
        software.contents(buffer.device_handle().unwrap()).unwrap(),
        vec![0; 48]
    );
}

#[cfg_attr(target_arch = "wasm32", wasm_bindgen_test::wasm_bindgen_test)]
#[test]
fn write_items_reaches_device() {
    let (software, device) = software();
    let mut buffer = TypedBuffer::from_slice(
        &[[1u8, 1, 1, 1], [2, 2, 2, 2]],
        BufferConfig::new("colors").with_usage(BufferUsage::DYNAMIC_DRAW),
    )
    .unwrap();
    buffer.upload(&device).unwrap();
    //narrower host type keeps the trailing component
    buffer.write_items(1, &[[9u8, 8, 7]]).unwrap();
    assert_eq!(
        software.contents(buffer.device_handle().unwrap()).unwrap(),
        vec![1, 1, 1, 1, 9, 8, 7, 2]
    );
    assert!(matches!(
        buffer.write_items(2, &[[0u8; 4]]),
        Err(Error::IndexOutOfBounds { index: 3, limit: 2 })
    ));
}

#[cfg_attr(target_arch = "wasm32", wasm_bindgen_test::wasm_bindgen_test)]
#[test]
fn recreate_grows_device_block() {
    let (software, device) = software();
    let mut buffer = TypedBuffer::from_slice(&[1u32, 2], BufferConfig::new("grow")).unwrap();
    buffer.upload(&device).unwrap();
    buffer.items_mut().resize_items(3).unwrap();
    assert_eq!(buffer.device_size(), Some(8));
    buffer.items_mut().recreate(&device).unwrap();
    assert_eq!(buffer.device_size(), Some(12));
    assert_eq!(software.live_buffers(), 1);
    assert_eq!(buffer.to_vec::<u32>().unwrap(), vec![1, 2, 0]);
}
