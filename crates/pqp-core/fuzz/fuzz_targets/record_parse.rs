#![no_main]
use libfuzzer_sys::fuzz_target;
use pqp_core::{ShadowRecord, TokenLayout};

fuzz_target!(|data: &[u8]| {
    let _ = ciborium::de::from_reader::<ShadowRecord, _>(data);
    if let Ok(rows) = serde_json::from_slice::<Vec<Vec<String>>>(data) {
        if let Ok(rec) = ShadowRecord::from_tokens(&rows, TokenLayout::Auto) {
            assert!(rec.num_qubits() > 0);
            assert!(rec.shots().iter().all(|s| s.len() == rec.num_qubits()));
        }
    }
});
