#![no_main]
use libfuzzer_sys::fuzz_target;
use lz4_block_decode::{decompress_fast, decompress_safe, decompress_safe_partial, decompress_safe_using_dict};

fuzz_target!(|data: &[u8]| {
    // we deliberately ignore errors here because random bytes from fuzzer
    // are not valid LZ4 data and so are expected to trigger non-fatal errors
    let mut output = vec![0u8; 4096];
    let _ = decompress_safe(data, &mut output);
    let _ = decompress_fast(data, &mut output[..data.len().min(4096)]);
    let _ = decompress_safe_partial(data, &mut output, data.len());
    let _ = decompress_safe_using_dict(data, &mut output, &data[data.len() / 2..]);
});
