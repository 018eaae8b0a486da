#![no_main]
use libfuzzer_sys::fuzz_target;
use tsbridge_core::EngineError;
use tsbridge_core::strip::strip_types;

fuzz_target!(|data: &[u8]| {
    let Ok(src) = std::str::from_utf8(data) else {
        return;
    };
    let first = strip_types(src);
    if let Err(EngineError::Syntax(err)) = &first {
        assert!(err.offset <= src.len());
        assert!(err.line >= 1 && err.column >= 1);
    }
    assert_eq!(strip_types(src), first);
});
