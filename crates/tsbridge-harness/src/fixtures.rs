//! Fixture loading.
//!
//! A fixture file holds one family of cases:
//!
//! ```json
//! {
//!   "version": "v1",
//!   "family": "annotations",
//!   "cases": [
//!     { "name": "const_number", "source": "const x: number = 1;",
//!       "expect": { "status": "success", "output": "const x = 1;" } }
//!   ]
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::HarnessError;

/// Engine a case runs against.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineChoice {
    /// The built-in swc engine through the default context.
    #[default]
    Strip,
    /// The echo engine through an explicit context.
    Echo,
}

impl EngineChoice {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Strip => "strip",
            Self::Echo => "echo",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpectedStatus {
    Success,
    Failure,
}

/// What a case's result frame must look like.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expectation {
    pub status: ExpectedStatus,
    /// Exact payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    /// Diagnostic prefix, e.g. `EncodingError`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Substring the payload must contain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contains: Option<String>,
    /// Compare `output` with all whitespace removed from both sides.
    #[serde(default, skip_serializing_if = "is_false")]
    pub ignore_whitespace: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// A single fixture case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureCase {
    pub name: String,
    #[serde(default)]
    pub engine: EngineChoice,
    /// Source text. Ignored when `source_bytes` is present.
    #[serde(default)]
    pub source: String,
    /// Raw source bytes, for input that is not valid UTF-8.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_bytes: Option<Vec<u8>>,
    pub expect: Expectation,
}

impl FixtureCase {
    /// Bytes handed to the boundary, terminator excluded.
    #[must_use]
    pub fn source_bytes(&self) -> &[u8] {
        self.source_bytes
            .as_deref()
            .unwrap_or(self.source.as_bytes())
    }
}

/// A collection of fixture cases for one family.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureSet {
    pub version: String,
    pub family: String,
    pub cases: Vec<FixtureCase>,
}

impl FixtureSet {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_file(path: &Path) -> Result<Self, HarnessError> {
        let content = std::fs::read_to_string(path).map_err(|e| HarnessError::io(path, e))?;
        Self::from_json(&content).map_err(|source| HarnessError::Fixture {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load every `*.json` file in `dir`, sorted by file name.
    pub fn load_dir(dir: &Path) -> Result<Vec<Self>, HarnessError> {
        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
            .map_err(|e| HarnessError::io(dir, e))?
            .filter_map(|entry| entry.ok().map(|entry| entry.path()))
            .filter(|path| path.extension().and_then(|s| s.to_str()) == Some("json"))
            .collect();
        paths.sort();
        if paths.is_empty() {
            return Err(HarnessError::NoFixtures(dir.to_path_buf()));
        }
        paths.iter().map(|path| Self::from_file(path)).collect()
    }
}
