//! Error types for the asset pipeline

use std::{io, num, path::PathBuf};

/// A malformed line in a geometry or material file.
///
/// Line numbers are 1-based and refer to the source text handed to the parser.
#[derive(thiserror::Error, Debug)]
pub enum ParseError {
    #[error("line {line}: `{token}` expects {expected} values, found {found}")]
    Arity {
        line: usize,
        token: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("line {line}: invalid number `{value}`")]
    Float {
        line: usize,
        value: String,
        #[source]
        source: num::ParseFloatError,
    },
    #[error("line {line}: invalid face corner `{corner}`")]
    Corner { line: usize, corner: String },
    #[error("line {line}: faces must be triangles, found {found} corners")]
    NotTriangulated { line: usize, found: usize },
    #[error("{stream} index {index} is out of range ({len} defined)")]
    IndexOutOfRange {
        stream: &'static str,
        index: i64,
        len: usize,
    },
    #[error("flat buffer lengths disagree: {positions} positions, {colors} colors, {texcoords} texcoords")]
    BufferLength {
        positions: usize,
        colors: usize,
        texcoords: usize,
    },
}

/// Failure to load an asset from disk.
#[derive(thiserror::Error, Debug)]
pub enum AssetError {
    #[error("can't load ({}): {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("can't parse ({}): {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },
}

pub type ParseResult<T> = Result<T, ParseError>;
