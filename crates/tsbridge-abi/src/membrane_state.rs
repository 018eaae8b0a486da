//! Process-wide result arena.
//!
//! Every export allocates into and releases from this one arena, so a handle
//! produced through any context can be released through
//! `tsbridge_release_result`.

use std::sync::OnceLock;

use tsbridge_membrane::ResultArena;

pub(crate) fn arena() -> &'static ResultArena {
    static ARENA: OnceLock<ResultArena> = OnceLock::new();
    ARENA.get_or_init(ResultArena::new)
}
