//! Built-in engine: TypeScript to JavaScript through swc.
//!
//! The source is parsed as TypeScript, swc's TypeScript pass erases the type
//! syntax (and lowers `enum`, runtime `namespace` and parameter properties),
//! and the program is printed back out. Layout of the output follows the
//! printer; comments are carried through.
//!
//! Parse errors become a located [`SyntaxError`]. Diagnostics raised by the
//! transform itself become [`EngineError::Message`].

use std::io::{self, Write};
use std::sync::Arc;

use parking_lot::Mutex;
use swc_core::common::comments::SingleThreadedComments;
use swc_core::common::errors::{HANDLER, Handler};
use swc_core::common::sync::Lrc;
use swc_core::common::{FileName, GLOBALS, Globals, Mark, SourceFile, SourceMap, Spanned};
use swc_core::ecma::ast::{EsVersion, Program};
use swc_core::ecma::codegen::to_code_default;
use swc_core::ecma::parser::error::Error as ParseError;
use swc_core::ecma::parser::{Syntax, TsSyntax, parse_file_as_program};
use swc_core::ecma::transforms::base::fixer::fixer;
use swc_core::ecma::transforms::base::hygiene::hygiene;
use swc_core::ecma::transforms::base::resolver;
use swc_core::ecma::transforms::typescript::{self as ts_pass, typescript};
use thiserror::Error;

use crate::engine::Engine;
use crate::error::EngineError;

/// Maximum bracket nesting handed to the parser.
///
/// The parser and the passes recurse per nesting level, and a stack overflow
/// aborts the process instead of unwinding.
pub const MAX_DEPTH: usize = 64;

/// Rejected source, located by 1-based line and column.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{line}:{column}: {message}")]
pub struct SyntaxError {
    pub line: usize,
    pub column: usize,
    /// Byte offset into the source.
    pub offset: usize,
    pub message: String,
}

impl SyntaxError {
    pub(crate) fn at(src: &str, offset: usize, message: impl Into<String>) -> Self {
        let (line, column) = line_col(src, offset);
        Self {
            line,
            column,
            offset,
            message: message.into(),
        }
    }

    fn from_parse(src: &str, fm: &SourceFile, err: &ParseError) -> Self {
        let offset = err.span().lo.0.saturating_sub(fm.start_pos.0) as usize;
        Self::at(src, offset.min(src.len()), err.kind().msg())
    }
}

/// 1-based line and column (in characters) of a byte offset.
pub(crate) fn line_col(src: &str, offset: usize) -> (usize, usize) {
    let before = src.get(..offset).unwrap_or(src);
    let line = before.bytes().filter(|&b| b == b'\n').count() + 1;
    let line_start = before.rfind('\n').map_or(0, |p| p + 1);
    (line, before[line_start..].chars().count() + 1)
}

/// Offset of the first bracket that opens level `MAX_DEPTH + 1`.
///
/// Brackets inside strings and comments are counted too.
fn too_deep(src: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (offset, byte) in src.bytes().enumerate() {
        match byte {
            b'(' | b'[' | b'{' => {
                depth += 1;
                if depth > MAX_DEPTH {
                    return Some(offset);
                }
            }
            b')' | b']' | b'}' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    None
}

/// Collects what the transform reports through swc's diagnostic handler.
#[derive(Clone, Default)]
struct DiagnosticSink(Arc<Mutex<Vec<u8>>>);

impl DiagnosticSink {
    /// First `error` line of the rendered diagnostics, without its label.
    fn first_error(&self) -> String {
        let text = String::from_utf8_lossy(&self.0.lock()).into_owned();
        text.lines()
            .find(|line| line.starts_with("error"))
            .and_then(|line| line.split_once(": "))
            .map_or_else(|| "typescript transform failed".to_owned(), |(_, msg)| msg.to_owned())
    }
}

impl Write for DiagnosticSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Compile TypeScript `source` to JavaScript.
///
/// A trailing newline in the source is kept; the printer's own trailing
/// newline is not.
pub fn strip_types(source: &str) -> Result<String, EngineError> {
    if source.is_empty() {
        return Ok(String::new());
    }
    if let Some(offset) = too_deep(source) {
        return Err(SyntaxError::at(
            source,
            offset,
            format!("nesting deeper than {MAX_DEPTH} levels"),
        )
        .into());
    }

    let cm: Lrc<SourceMap> = Lrc::default();
    let fm = cm.new_source_file(FileName::Anon.into(), source.to_owned());
    let comments = SingleThreadedComments::default();
    let syntax = Syntax::Typescript(TsSyntax {
        decorators: true,
        ..TsSyntax::default()
    });

    let mut recovered = Vec::new();
    let program = parse_file_as_program(
        &fm,
        syntax,
        EsVersion::latest(),
        Some(&comments),
        &mut recovered,
    )
    .map_err(|err| SyntaxError::from_parse(source, &fm, &err))?;
    if let Some(err) = recovered.first() {
        return Err(SyntaxError::from_parse(source, &fm, err).into());
    }

    let sink = DiagnosticSink::default();
    let handler = Handler::with_emitter_writer(Box::new(sink.clone()), Some(cm.clone()));
    let program = GLOBALS.set(&Globals::new(), || {
        HANDLER.set(&handler, || lower(program, &comments))
    });
    if handler.has_errors() {
        return Err(EngineError::Message(sink.first_error()));
    }

    let mut code = to_code_default(cm, Some(&comments), &program);
    code.truncate(code.trim_end_matches('\n').len());
    if source.ends_with('\n') && !code.is_empty() {
        code.push('\n');
    }
    Ok(code)
}

fn lower(program: Program, comments: &SingleThreadedComments) -> Program {
    let unresolved_mark = Mark::new();
    let top_level_mark = Mark::new();
    let config = ts_pass::Config {
        native_class_properties: true,
        ..ts_pass::Config::default()
    };
    program
        .apply(resolver(unresolved_mark, top_level_mark, true))
        .apply(typescript(config, unresolved_mark, top_level_mark))
        .apply(hygiene())
        .apply(fixer(Some(comments)))
}

/// The swc pipeline as an [`Engine`]. Every call builds its own source map
/// and globals, so it is reentrant.
#[derive(Debug, Clone, Copy, Default)]
pub struct StripEngine;

impl StripEngine {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Engine for StripEngine {
    fn name(&self) -> &str {
        "strip"
    }

    fn transpile(&self, source: &str) -> Result<String, EngineError> {
        strip_types(source)
    }
}
