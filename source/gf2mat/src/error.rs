// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use miette::Diagnostic;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Diagnostic, Error)]
pub enum Error {
    #[error("{operation} expects matching shapes, got {left:?} and {right:?}")]
    #[diagnostic(code("Gf2.DimensionMismatch"))]
    DimensionMismatch {
        operation: &'static str,
        left: (usize, usize),
        right: (usize, usize),
    },
    #[error("column {column}: {message}")]
    #[diagnostic(code("Gf2.InvalidColumn"))]
    InvalidColumn { column: usize, message: String },
    #[error("line {line}: {message}")]
    #[diagnostic(code("Gf2.Parse"))]
    Parse { line: usize, message: String },
    #[error(transparent)]
    #[diagnostic(code("Gf2.Io"))]
    Io(#[from] std::io::Error),
    #[error("could not start worker threads: {0}")]
    #[diagnostic(code("Gf2.WorkGroup"))]
    WorkGroup(#[from] rayon::ThreadPoolBuildError),
}

impl Error {
    pub(crate) fn dimension_mismatch(
        operation: &'static str,
        left: (usize, usize),
        right: (usize, usize),
    ) -> Self {
        Error::DimensionMismatch {
            operation,
            left,
            right,
        }
    }

    pub(crate) fn invalid_column(column: usize, message: impl Into<String>) -> Self {
        Error::InvalidColumn {
            column,
            message: message.into(),
        }
    }

    pub(crate) fn parse(line: usize, message: impl Into<String>) -> Self {
        Error::Parse {
            line,
            message: message.into(),
        }
    }
}
