//! Error types for mesh loading and packing.

use std::{io, path::PathBuf};

use thiserror::Error;

use crate::mesh::MeshStats;

/// Attribute category referenced by a face corner.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Attribute {
    Position,
    Texcoord,
    Normal,
}

impl std::fmt::Display for Attribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Attribute::Position => "position",
            Attribute::Texcoord => "texcoord",
            Attribute::Normal => "normal",
        };
        f.write_str(name)
    }
}

/// What exactly went wrong on a rejected OBJ line.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    #[error("missing {0}")]
    MissingComponent(&'static str),
    #[error("invalid number '{0}'")]
    InvalidNumber(String),
    #[error("face corner '{0}' is not of the form v/vt/vn")]
    BadFaceCorner(String),
    #[error("face has {0} corners, expected 3 or 4")]
    UnsupportedCornerCount(usize),
    #[error("{attribute} index {index} out of range (1..={count})")]
    IndexOutOfRange {
        attribute: Attribute,
        index: u32,
        count: u32,
    },
}

#[derive(Debug, Error)]
pub enum MeshError {
    #[error("unable to open OBJ file {}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// Line 0 means the failure happened while seeking, before any line was read.
    #[error("failed to read OBJ data at line {line}")]
    Read {
        line: usize,
        #[source]
        source: io::Error,
    },
    #[error("OBJ parse error on line {line}: {kind}")]
    Parse { line: usize, kind: ParseErrorKind },
    #[error("OBJ data changed between passes: tallied {tallied:?}, parsed {parsed:?}")]
    Inconsistent { tallied: MeshStats, parsed: MeshStats },
    #[error("pack buffer holds {actual} floats, mesh needs {expected}")]
    BufferTooSmall { expected: usize, actual: usize },
}

impl MeshError {
    pub(crate) fn parse(line: usize, kind: ParseErrorKind) -> Self {
        MeshError::Parse { line, kind }
    }

    /// 1-based line number the error points at, if any.
    pub fn line(&self) -> Option<usize> {
        match self {
            MeshError::Parse { line, .. } => Some(*line),
            MeshError::Read { line, .. } if *line > 0 => Some(*line),
            _ => None,
        }
    }
}

pub type MeshResult<T> = Result<T, MeshError>;
