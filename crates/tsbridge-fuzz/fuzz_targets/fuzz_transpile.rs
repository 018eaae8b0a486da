#![no_main]
use std::ffi::CString;

use libfuzzer_sys::fuzz_target;
use tsbridge::ResultHandle;
use tsbridge::TsbridgeStats;
use tsbridge_core::marshal::STATUS_SUCCESS;

fuzz_target!(|data: &[u8]| {
    // The boundary only ever sees the bytes before the first NUL.
    let end = data.iter().position(|&b| b == 0).unwrap_or(data.len());
    let Ok(source) = CString::new(&data[..end]) else {
        return;
    };

    let live_before = TsbridgeStats::capture().live;
    {
        let handle = ResultHandle::transpile(&source).expect("allocation");
        let frame = handle.bytes();
        assert!(frame.len() >= 2);
        assert_eq!(frame.last(), Some(&0));
        assert!(!frame[1..frame.len() - 1].contains(&0));

        let outcome = handle.outcome().expect("well-formed frame");
        if handle.status() == STATUS_SUCCESS {
            assert!(std::str::from_utf8(&data[..end]).is_ok());
        } else {
            assert!(
                outcome.payload().starts_with("EncodingError: ")
                    || outcome.payload().starts_with("TranspileError: ")
            );
        }
    }
    assert_eq!(TsbridgeStats::capture().live, live_before);
});
