// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//
// Compares the bulk and per-item paths of the strided copy on a dense vertex buffer.

#![cfg(target_arch = "wasm32")]

use std::time::Duration;
use typed_buffers::layout::{CopyPath, Strided, copy_with_path};
use wasm_bindgen_test::{Criterion, Instant, wasm_bindgen_bench};

wasm_bindgen_test::wasm_bindgen_test_configure!(run_in_browser);

const ITEM_SIZE: usize = 32;
const ITEMS: usize = 64 * 1024;

async fn bench_path(c: &mut Criterion, name: &'static str, path: CopyPath) {
    c.bench_async_function(name, move |b| {
        Box::pin(b.iter_custom_future(move |iters| async move {
            let src: Vec<u8> = (0..ITEM_SIZE * ITEMS).map(|i| i as u8).collect();
            let mut dst = vec![0u8; ITEM_SIZE * ITEMS];
            let layout = Strided::dense(ITEM_SIZE);
            let start = Instant::now();
            for _ in 0..iters {
                copy_with_path(&mut dst, layout, &src, layout, ITEMS, path)
                    .expect("dense copy fits");
            }
            let elapsed = start.elapsed();
            logwise::info_sync!(
                "{name}: {iters} iters in {elapsed_ms}ms",
                name = name,
                iters = iters,
                elapsed_ms = elapsed.as_millis()
            );
            elapsed
        }))
    })
    .await;
}

#[wasm_bindgen_bench]
async fn bench_copy_paths(c: &mut Criterion) {
    *c = std::mem::take(c).measurement_time(Duration::from_secs(5));
    bench_path(c, "copy_bulk", CopyPath::Auto).await;
    bench_path(c, "copy_per_item", CopyPath::PerItem).await;
}
