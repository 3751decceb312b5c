// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Elementary row and column operations and their one-line text form.


use std::fmt::{Display, Formatter};
use std::io::{BufRead, Write};
use std::str::FromStr;

use crate::matrix::{BinaryMatrix, parse_index};
use crate::{Error, Result};

/// An elementary operation on the rows or on the columns of a matrix.
/// Applying the same operation twice restores the matrix.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    Swap { first: usize, second: usize },
    /// Adds `source` into `target`.
    Add { source: usize, target: usize },
}

impl Operation {
    /// Translates both indexes by `offset`, moving an operation recorded on a
    /// trailing block into the coordinates of the enclosing matrix.
    #[must_use]
    pub fn shifted(self, offset: usize) -> Self {
        match self {
            Operation::Swap { first, second } => Operation::Swap {
                first: first + offset,
                second: second + offset,
            },
            Operation::Add { source, target } => Operation::Add {
                source: source + offset,
                target: target + offset,
            },
        }
    }

    pub fn apply_to_rows<Matrix: BinaryMatrix>(self, matrix: &mut Matrix) {
        match self {
            Operation::Swap { first, second } => matrix.swap_rows(first, second),
            Operation::Add { source, target } => matrix.add_row(source, target),
        }
    }

    pub fn apply_to_columns<Matrix: BinaryMatrix>(self, matrix: &mut Matrix) {
        match self {
            Operation::Swap { first, second } => matrix.swap_columns(first, second),
            Operation::Add { source, target } => matrix.add_column(source, target),
        }
    }

    fn parse_line(text: &str, line: usize) -> Result<Self> {
        let tokens: Vec<&str> = text.split_whitespace().collect();
        let [tag, first, second] = tokens.as_slice() else {
            return Err(Error::parse(
                line,
                format!("expected 3 fields, found {}", tokens.len()),
            ));
        };
        let index = |token: &str| parse_index(token, line);
        match *tag {
            "S" => Ok(Operation::Swap {
                first: index(*first)?,
                second: index(*second)?,
            }),
            "A" => Ok(Operation::Add {
                source: index(*first)?,
                target: index(*second)?,
            }),
            _ => Err(Error::parse(
                line,
                format!("expected S or A, found {tag:?}"),
            )),
        }
    }
}

/// `S <first> <second>` or `A <source> <target>`.
impl Display for Operation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Swap { first, second } => write!(f, "S {first} {second}"),
            Operation::Add { source, target } => write!(f, "A {source} {target}"),
        }
    }
}

impl FromStr for Operation {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self> {
        Self::parse_line(text, 1)
    }
}

/// Replays row operations, in order, on the identity of the given dimension.
/// The result `P` satisfies `P * M = M'` where `M'` is `M` after the operations.
pub fn replay_rows<Matrix: BinaryMatrix>(operations: &[Operation], dimension: usize) -> Matrix {
    let mut transform = Matrix::identity(dimension);
    for operation in operations {
        operation.apply_to_rows(&mut transform);
    }
    transform
}

/// Replays column operations, in order, on the identity of the given
/// dimension. The result `Q` satisfies `M * Q = M'`.
pub fn replay_columns<Matrix: BinaryMatrix>(
    operations: &[Operation],
    dimension: usize,
) -> Matrix {
    let mut transform = Matrix::identity(dimension);
    for operation in operations {
        operation.apply_to_columns(&mut transform);
    }
    transform
}

/// Reads one operation per line. Blank lines are skipped.
pub fn read_operations(reader: impl BufRead) -> Result<Vec<Operation>> {
    let mut operations = Vec::new();
    for (line_index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        operations.push(Operation::parse_line(&line, line_index + 1)?);
    }
    Ok(operations)
}

pub fn write_operations(operations: &[Operation], mut writer: impl Write) -> Result<()> {
    for operation in operations {
        writeln!(writer, "{operation}")?;
    }
    Ok(())
}
