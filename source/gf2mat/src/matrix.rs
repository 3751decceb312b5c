// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Binary matrices over GF(2).
//!
//! Two representations implement [`BinaryMatrix`]: [`DenseMatrix`], a
//! bit-packed column-major buffer, and [`SparseMatrix`], one sorted list of
//! row indexes per column. Both agree bit-for-bit on every operation, so
//! algorithms written against the trait may convert between them at any
//! point.


mod dense;
pub use dense::DenseMatrix;

mod sparse;
pub use sparse::{SparseMatrix, merge_drop};

use std::ops::Range;

use sorted_iter::SortedIterator;

use crate::vector::BinaryVector;
use crate::work_group::WorkGroup;
use crate::{Error, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Representation {
    Dense,
    Sparse,
}

pub trait BinaryMatrix: Clone + std::fmt::Debug + Send + Sync + Sized {
    const REPRESENTATION: Representation;

    fn zeros(rowcount: usize, columncount: usize) -> Self;

    fn rowcount(&self) -> usize;
    fn columncount(&self) -> usize;

    /// # Panics
    ///
    /// Will panic if index out of range
    fn get(&self, index: (usize, usize)) -> bool;

    /// # Panics
    ///
    /// Will panic if index out of range
    fn set(&mut self, index: (usize, usize), to: bool);

    /// Adds row `from_index` into row `to_index`.
    fn add_row(&mut self, from_index: usize, to_index: usize);

    /// Adds column `from_index` into column `to_index`.
    fn add_column(&mut self, from_index: usize, to_index: usize);

    fn swap_rows(&mut self, left_row_index: usize, right_row_index: usize);
    fn swap_columns(&mut self, left_column_index: usize, right_column_index: usize);

    /// Smallest row index `>= row` holding a one in `column`.
    fn scan_down(&self, row: usize, column: usize) -> Option<usize>;

    /// Row indexes of the ones of `column` that fall inside `rows`, ascending.
    fn column_support_within(
        &self,
        column: usize,
        rows: Range<usize>,
    ) -> impl SortedIterator<Item = usize> + '_;

    /// Number of ones of `column` at row `row` or below.
    fn weight_below(&self, row: usize, column: usize) -> usize;

    /// Adds column `from_column` of `source` into column `to_column`.
    /// Both matrices must have the same row count.
    fn add_column_from(&mut self, to_column: usize, source: &Self, from_column: usize);

    /// Copies the `rows` x `columns` block of `source`, one unit of work per
    /// destination column.
    fn extracted_from<Source: BinaryMatrix>(
        source: &Source,
        rows: Range<usize>,
        columns: Range<usize>,
    ) -> Self;

    fn transposed(&self) -> Self;

    /// Adds column `pivot` into every column right of it that has a one in
    /// row `pivot`, spreading the target columns over `group`.
    ///
    /// Returns the target columns in ascending order.
    fn clear_row_right_of(&mut self, pivot: usize, group: &WorkGroup) -> Vec<usize>;

    /// Clears every one of column `pivot` below row `pivot`, returning the
    /// cleared rows in ascending order.
    fn clear_column_below(&mut self, pivot: usize) -> Vec<usize> {
        let mut cleared = Vec::new();
        while let Some(row) = self.scan_down(pivot + 1, pivot) {
            self.set((row, pivot), false);
            cleared.push(row);
        }
        cleared
    }

    fn shape(&self) -> (usize, usize) {
        (self.rowcount(), self.columncount())
    }

    fn identity(dimension: usize) -> Self {
        let mut matrix = Self::zeros(dimension, dimension);
        for index in 0..dimension {
            matrix.set((index, index), true);
        }
        matrix
    }

    fn from_matrix<Source: BinaryMatrix>(source: &Source) -> Self {
        Self::extracted_from(source, 0..source.rowcount(), 0..source.columncount())
    }

    fn toggle(&mut self, index: (usize, usize)) {
        let value = self.get(index);
        self.set(index, !value);
    }

    fn column_support(&self, column: usize) -> impl SortedIterator<Item = usize> + '_ {
        self.column_support_within(column, 0..self.rowcount())
    }

    fn column_weight(&self, column: usize) -> usize {
        self.weight_below(0, column)
    }

    fn weight(&self) -> usize {
        (0..self.columncount())
            .map(|column| self.column_weight(column))
            .sum()
    }

    fn is_zero(&self) -> bool {
        (0..self.columncount()).all(|column| self.scan_down(0, column).is_none())
    }

    /// Fraction of ones in the block that starts at (`row`, `column`) and
    /// extends to the bottom-right corner.
    #[allow(clippy::cast_precision_loss)]
    fn density(&self, row: usize, column: usize) -> f64 {
        let height = self.rowcount().saturating_sub(row);
        let width = self.columncount().saturating_sub(column);
        if height == 0 || width == 0 {
            return 0.0;
        }
        let ones: usize = (column..self.columncount())
            .map(|index| self.weight_below(row, index))
            .sum();
        ones as f64 / (height * width) as f64
    }

    /// Equality across representations.
    fn equals<Other: BinaryMatrix>(&self, other: &Other) -> bool {
        self.shape() == other.shape()
            && (0..self.columncount()).all(|column| {
                itertools::equal(self.column_support(column), other.column_support(column))
            })
    }

    fn submatrix(&self, rows: Range<usize>, columns: Range<usize>) -> Self {
        Self::extracted_from(self, rows, columns)
    }

    fn dense_submatrix(&self, rows: Range<usize>, columns: Range<usize>) -> DenseMatrix {
        DenseMatrix::extracted_from(self, rows, columns)
    }

    fn to_dense(&self) -> DenseMatrix {
        DenseMatrix::from_matrix(self)
    }

    fn to_sparse(&self) -> SparseMatrix {
        SparseMatrix::from_matrix(self)
    }

    /// Returns `self * rhs`, accumulating for each column of `rhs` the columns
    /// of `self` selected by its support.
    fn multiply_right<Rhs: BinaryMatrix>(&self, rhs: &Rhs) -> Result<Self> {
        if self.columncount() != rhs.rowcount() {
            return Err(Error::dimension_mismatch(
                "multiply",
                self.shape(),
                rhs.shape(),
            ));
        }
        let mut product = Self::zeros(self.rowcount(), rhs.columncount());
        for column in 0..rhs.columncount() {
            for inner in rhs.column_support(column) {
                product.add_column_from(column, self, inner);
            }
        }
        Ok(product)
    }

    /// Returns `lhs * self`.
    fn multiply_left<Lhs: BinaryMatrix>(&self, lhs: &Lhs) -> Result<Self> {
        Self::from_matrix(lhs).multiply_right(self)
    }

    fn multiply_vector(&self, vector: &BinaryVector) -> Result<BinaryVector> {
        if self.columncount() != vector.len() {
            return Err(Error::dimension_mismatch(
                "multiply",
                self.shape(),
                (vector.len(), 1),
            ));
        }
        let mut product = BinaryVector::zeros(self.rowcount());
        for column in vector.support() {
            for row in self.column_support(column) {
                product.toggle(row);
            }
        }
        Ok(product)
    }

    /// Replaces the block of `self` whose top-left corner is (`row`, `column`)
    /// by `block`.
    fn overwrite<Block: BinaryMatrix>(
        &mut self,
        row: usize,
        column: usize,
        block: &Block,
    ) -> Result<()> {
        check_fits(self.shape(), row, column, block.shape())?;
        let rows = row..row + block.rowcount();
        for offset in 0..block.columncount() {
            let stale: Vec<usize> = self
                .column_support_within(column + offset, rows.clone())
                .collect();
            for index in stale {
                self.set((index, column + offset), false);
            }
            for index in block.column_support(offset) {
                self.set((row + index, column + offset), true);
            }
        }
        Ok(())
    }
}

/// Returns the rank of `matrix` when it is in diagonal form, that is when its
/// ones are exactly the entries (0, 0), ..., (rank - 1, rank - 1).
pub fn diagonal_rank<Matrix: BinaryMatrix>(matrix: &Matrix) -> Option<usize> {
    let mut rank = 0;
    for column in 0..matrix.columncount() {
        let mut support = matrix.column_support(column);
        match (support.next(), support.next()) {
            (None, _) => {}
            (Some(row), None) if row == column && rank == column => rank += 1,
            _ => return None,
        }
    }
    Some(rank)
}

/// Parses a row or column index. Only ASCII digits are accepted, so signs
/// and other forms `usize::from_str` tolerates are rejected.
pub(crate) fn parse_index(token: &str, line: usize) -> Result<usize> {
    let invalid = || Error::parse(line, format!("expected an index, found {token:?}"));
    if token.is_empty() || !token.bytes().all(|byte| byte.is_ascii_digit()) {
        return Err(invalid());
    }
    token.parse::<usize>().map_err(|_| invalid())
}

fn check_fits(
    shape: (usize, usize),
    row: usize,
    column: usize,
    block_shape: (usize, usize),
) -> Result<()> {
    if row + block_shape.0 > shape.0 || column + block_shape.1 > shape.1 {
        return Err(Error::dimension_mismatch("overwrite", shape, block_shape));
    }
    Ok(())
}

fn check_block(shape: (usize, usize), rows: &Range<usize>, columns: &Range<usize>) {
    assert!(
        rows.start <= rows.end && rows.end <= shape.0,
        "rows {rows:?} out of range for {shape:?}"
    );
    assert!(
        columns.start <= columns.end && columns.end <= shape.1,
        "columns {columns:?} out of range for {shape:?}"
    );
}
