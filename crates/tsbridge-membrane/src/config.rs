//! Runtime mode configuration.
//!
//! The runtime mode is set via the `TSBRIDGE_MODE` environment variable:
//! - `strict` (default): released buffers are verified (canary) and held in a
//!   bounded quarantine so a second release is classified, counted and refused.
//! - `hardened`: everything `strict` does, plus released payloads are poisoned
//!   before they sit in quarantine, so a host reading through a stale handle
//!   sees garbage instead of a plausible result.
//! - `off`: no canary verification and no quarantine. Benchmark baseline only;
//!   not reachable through the environment variable.

use std::sync::atomic::{AtomicU8, Ordering};

/// Runtime operating mode for the result arena.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SafetyLevel {
    /// Verify and quarantine released buffers.
    #[default]
    Strict,
    /// Strict plus poisoning of released payloads.
    Hardened,
    /// Release straight back to the allocator.
    Off,
}

impl SafetyLevel {
    /// Parse from string (case-insensitive).
    #[must_use]
    pub fn from_str_loose(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" | "default" => Self::Strict,
            "hardened" | "poison" | "paranoid" => Self::Hardened,
            "off" | "none" | "disabled" => Self::Off,
            _ => Self::Strict,
        }
    }

    /// Released payloads are overwritten before quarantine.
    #[must_use]
    pub const fn poisons_on_release(self) -> bool {
        matches!(self, Self::Hardened)
    }

    /// Canaries are checked and released buffers quarantined.
    #[must_use]
    pub const fn validation_enabled(self) -> bool {
        !matches!(self, Self::Off)
    }

    /// Stable lowercase name, as accepted by `TSBRIDGE_MODE`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Hardened => "hardened",
            Self::Off => "off",
        }
    }
}

// 0=unresolved, 1=Strict, 2=Hardened, 3=Off, 255=resolving.
static CACHED_LEVEL: AtomicU8 = AtomicU8::new(0);

const LEVEL_UNRESOLVED: u8 = 0;
const LEVEL_STRICT: u8 = 1;
const LEVEL_HARDENED: u8 = 2;
const LEVEL_OFF: u8 = 3;
const LEVEL_RESOLVING: u8 = 255;

/// Environment parsing is strict|hardened only; `off` falls back to strict.
fn parse_runtime_mode_env(raw: &str) -> SafetyLevel {
    match SafetyLevel::from_str_loose(raw) {
        SafetyLevel::Hardened => SafetyLevel::Hardened,
        _ => SafetyLevel::Strict,
    }
}

fn level_to_u8(level: SafetyLevel) -> u8 {
    match level {
        SafetyLevel::Strict => LEVEL_STRICT,
        SafetyLevel::Hardened => LEVEL_HARDENED,
        SafetyLevel::Off => LEVEL_OFF,
    }
}

fn u8_to_level(v: u8) -> SafetyLevel {
    match v {
        LEVEL_HARDENED => SafetyLevel::Hardened,
        LEVEL_OFF => SafetyLevel::Off,
        _ => SafetyLevel::Strict,
    }
}

/// Get the configured safety level (reads env var on first call, caches thereafter).
///
/// Concurrent first calls that lose the race observe `Strict` until the
/// winner has stored the resolved value.
#[must_use]
pub fn safety_level() -> SafetyLevel {
    let cached = CACHED_LEVEL.load(Ordering::Acquire);

    if cached != LEVEL_UNRESOLVED && cached != LEVEL_RESOLVING {
        return u8_to_level(cached);
    }

    if cached == LEVEL_RESOLVING {
        return SafetyLevel::Strict;
    }

    if CACHED_LEVEL
        .compare_exchange(
            LEVEL_UNRESOLVED,
            LEVEL_RESOLVING,
            Ordering::SeqCst,
            Ordering::Relaxed,
        )
        .is_err()
    {
        let v = CACHED_LEVEL.load(Ordering::Acquire);
        return if v != LEVEL_UNRESOLVED && v != LEVEL_RESOLVING {
            u8_to_level(v)
        } else {
            SafetyLevel::Strict
        };
    }

    let level = std::env::var("TSBRIDGE_MODE")
        .map(|v| parse_runtime_mode_env(&v))
        .unwrap_or_default();
    CACHED_LEVEL.store(level_to_u8(level), Ordering::Release);
    level
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_safety_levels() {
        assert_eq!(SafetyLevel::from_str_loose("strict"), SafetyLevel::Strict);
        assert_eq!(SafetyLevel::from_str_loose("STRICT"), SafetyLevel::Strict);
        assert_eq!(SafetyLevel::from_str_loose(" default "), SafetyLevel::Strict);
        assert_eq!(
            SafetyLevel::from_str_loose("hardened"),
            SafetyLevel::Hardened
        );
        assert_eq!(SafetyLevel::from_str_loose("poison"), SafetyLevel::Hardened);
        assert_eq!(SafetyLevel::from_str_loose("off"), SafetyLevel::Off);
        assert_eq!(SafetyLevel::from_str_loose("none"), SafetyLevel::Off);
        assert_eq!(SafetyLevel::from_str_loose("bogus"), SafetyLevel::Strict);
    }

    #[test]
    fn runtime_mode_parser_is_strict_or_hardened_only() {
        assert_eq!(parse_runtime_mode_env("strict"), SafetyLevel::Strict);
        assert_eq!(parse_runtime_mode_env("hardened"), SafetyLevel::Hardened);
        assert_eq!(parse_runtime_mode_env("off"), SafetyLevel::Strict);
        assert_eq!(parse_runtime_mode_env("bogus"), SafetyLevel::Strict);
    }

    #[test]
    fn mode_predicates() {
        assert!(SafetyLevel::Hardened.poisons_on_release());
        assert!(!SafetyLevel::Strict.poisons_on_release());
        assert!(SafetyLevel::Strict.validation_enabled());
        assert!(!SafetyLevel::Off.validation_enabled());
        assert_eq!(SafetyLevel::Hardened.as_str(), "hardened");
    }

    // One test touches the shared cache so parallel tests cannot interleave.
    #[test]
    fn cached_mode_is_sticky_and_resolving_reads_strict() {
        let previous = CACHED_LEVEL.swap(LEVEL_HARDENED, Ordering::SeqCst);
        assert_eq!(safety_level(), SafetyLevel::Hardened);
        assert_eq!(safety_level(), SafetyLevel::Hardened);

        CACHED_LEVEL.store(LEVEL_RESOLVING, Ordering::SeqCst);
        assert_eq!(safety_level(), SafetyLevel::Strict);

        CACHED_LEVEL.store(previous, Ordering::SeqCst);
    }
}
