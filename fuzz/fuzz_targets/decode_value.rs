#![no_main]
use libfuzzer_sys::fuzz_target;
use rawpack::Value;

fuzz_target!(|data: &[u8]| {
    if let Ok(value) = rawpack::unmarshal::<Value>(data) {
        let enc = rawpack::marshal(&value).expect("decoded values always re-encode");
        rawpack::unmarshal::<Value>(&enc).expect("re-encoded value decodes");
    }
});
