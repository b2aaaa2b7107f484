// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
use typed_buffers::layout::{copy, copy_with_path, CopyPath, Strided};
use typed_buffers::{BufferConfig, Error, ItemBuffer};

/// position (12 bytes) + color (4 bytes) per vertex
const VERTEX: usize = 16;

#[cfg_attr(target_arch = "wasm32", wasm_bindgen_test::wasm_bindgen_test)]
#[test]
fn interleave_attributes_into_one_buffer() {
    let positions: Vec<u8> = (0..36).collect();
    let colors: Vec<u8> = (200..212).collect();
    let mut vertices = ItemBuffer::new(VERTEX, BufferConfig::new("vertices")).unwrap();
    vertices.allocate_items(3).unwrap();
    vertices
        .copy_in(
            Strided::dense(12).with_stride(VERTEX),
            &positions,
            Strided::dense(12),
            3,
        )
        .unwrap();
    vertices
        .copy_in(
            Strided::dense(4).with_stride(VERTEX).with_offset(12),
            &colors,
            Strided::dense(4),
            3,
        )
        .unwrap();

    let bytes = vertices.host_bytes().unwrap();
    for v in 0..3 {
        assert_eq!(&bytes[v * VERTEX..v * VERTEX + 12], &positions[v * 12..v * 12 + 12]);
        assert_eq!(&bytes[v * VERTEX + 12..(v + 1) * VERTEX], &colors[v * 4..v * 4 + 4]);
    }

    //and back out again
    let mut out = vec![0u8; 12];
    vertices
        .copy_out(
            &mut out,
            Strided::dense(4),
            Strided::dense(4).with_stride(VERTEX).with_offset(12),
            3,
        )
        .unwrap();
    assert_eq!(out, colors);
}

#[cfg_attr(target_arch = "wasm32", wasm_bindgen_test::wasm_bindgen_test)]
#[test]
fn sub_range_copy() {
    let src: Vec<u8> = (1..=8).collect();
    let mut dst = [0u8; 8];
    //items 1 and 2 of src land at items 2 and 3 of dst
    copy(
        &mut dst,
        Strided::dense(2).with_offset(4),
        &src,
        Strided::dense(2).with_offset(2),
        2,
    )
    .unwrap();
    assert_eq!(dst, [0, 0, 0, 0, 3, 4, 5, 6]);
}

#[cfg_attr(target_arch = "wasm32", wasm_bindgen_test::wasm_bindgen_test)]
#[test]
fn forced_per_item_matches_bulk() {
    let src: Vec<u8> = (0..64).map(|i| i * 3).collect();
    let mut bulk = vec![0u8; 64];
    let mut per_item = vec![0u8; 64];
    copy_with_path(&mut bulk, Strided::dense(8), &src, Strided::dense(8), 8, CopyPath::Auto)
        .unwrap();
    copy_with_path(&mut per_item, Strided::dense(8), &src, Strided::dense(8), 8, CopyPath::PerItem)
        .unwrap();
    assert_eq!(bulk, per_item);
    assert_eq!(bulk, src);
}

#[cfg_attr(target_arch = "wasm32", wasm_bindgen_test::wasm_bindgen_test)]
#[test]
fn copy_in_beyond_buffer_changes_nothing() {
    let mut buffer = ItemBuffer::new(4, BufferConfig::new("small")).unwrap();
    buffer.allocate_items(2).unwrap();
    let r = buffer.copy_in(buffer.layout().with_offset(4), &[1; 8], Strided::dense(4), 2);
    assert!(matches!(
        r,
        Err(Error::RangeExceedsBuffer {
            needed: 12,
            available: 8
        })
    ));
    assert_eq!(buffer.host_bytes().unwrap(), &[0; 8]);
}

#[cfg_attr(target_arch = "wasm32", wasm_bindgen_test::wasm_bindgen_test)]
#[test]
fn wide_source_into_item_buffer_rejected() {
    let mut buffer = ItemBuffer::new(4, BufferConfig::new("narrow")).unwrap();
    buffer.allocate_items(1).unwrap();
    let r = buffer.copy_in(buffer.layout(), &[1; 8], Strided::dense(8), 1);
    assert!(matches!(r, Err(Error::ItemTooLarge { src: 8, dst: 4 })));
}
