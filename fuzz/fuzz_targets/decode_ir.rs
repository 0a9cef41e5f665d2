#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(ir) = binir::Ir::from_bytes(data) {
        // Anything that decodes must encode again.
        let _ = ir.to_bytes();
    }
    let _ = binir::decode::<binir::Module>(data);
});
