#![no_main]
use libfuzzer_sys::fuzz_target;
use lz4_block_decode::{decompress, decompress_bounded};

fuzz_target!(|data: &[u8]| {
    let compressed = lz4_flex::block::compress(data);
    let decompressed = decompress(&compressed, data.len()).expect("Could not decompress data compressed by lz4_flex");
    assert!(data == decompressed.as_slice(), "Decompression result did not match the original input");
    let decompressed = decompress_bounded(&compressed, data.len() + 64).expect("Could not decompress with slack");
    assert!(data == decompressed.as_slice());
});
