#![no_main]
use libfuzzer_sys::fuzz_target;
use weigh_core::{ProtocolKind, parse_frame};

fuzz_target!(|data: &str| {
    // Decoding must be total over arbitrary device noise: never panic,
    // never return a negative or non-finite weight.
    for protocol in [ProtocolKind::LegacyPrefixed, ProtocolKind::StGsTagged] {
        if let Some(v) = parse_frame(data, protocol) {
            assert!(v.is_finite() && v >= 0.0);
        }
    }
});
