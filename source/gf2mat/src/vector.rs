// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.


use std::fmt::{Display, Formatter};

use sorted_iter::SortedIterator;
use sorted_iter::assume::AssumeSortedByItemExt;

use crate::matrix::{BinaryMatrix, DenseMatrix, SparseMatrix};
use crate::{Error, Result};

/// A fixed-length sequence of bits, packed the same way as one column of a
/// [`DenseMatrix`].
#[must_use]
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct BinaryVector {
    bytes: Vec<u8>,
    len: usize,
}

impl BinaryVector {
    pub fn zeros(len: usize) -> Self {
        Self {
            bytes: vec![0u8; len.div_ceil(8)],
            len,
        }
    }

    pub fn from_support(len: usize, support: impl IntoIterator<Item = usize>) -> Self {
        let mut vector = Self::zeros(len);
        for index in support {
            vector.toggle(index);
        }
        vector
    }

    /// Copies column `column` of `matrix`.
    pub fn from_column<Matrix: BinaryMatrix>(matrix: &Matrix, column: usize) -> Self {
        Self::from_support(matrix.rowcount(), matrix.column_support(column))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// # Panics
    ///
    /// Will panic if index out of range
    #[must_use]
    pub fn get(&self, index: usize) -> bool {
        assert!(index < self.len, "index {index} out of range for {}", self.len);
        self.bytes[index / 8] & (1u8 << (index % 8)) != 0
    }

    pub fn set(&mut self, index: usize, to: bool) {
        if self.get(index) != to {
            self.toggle(index);
        }
    }

    pub fn toggle(&mut self, index: usize) {
        assert!(index < self.len, "index {index} out of range for {}", self.len);
        self.bytes[index / 8] ^= 1u8 << (index % 8);
    }

    #[must_use]
    pub fn weight(&self) -> usize {
        self.bytes.iter().map(|byte| byte.count_ones() as usize).sum()
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.bytes.iter().all(|&byte| byte == 0)
    }

    pub fn support(&self) -> impl SortedIterator<Item = usize> + '_ {
        self.bytes
            .iter()
            .enumerate()
            .filter(|(_, byte)| **byte != 0)
            .flat_map(|(index, &byte)| {
                (0..8)
                    .filter(move |bit| byte & (1u8 << bit) != 0)
                    .map(move |bit| index * 8 + bit)
            })
            .assume_sorted_by_item()
    }

    /// Sum over GF(2).
    pub fn add(&self, other: &BinaryVector) -> Result<BinaryVector> {
        if self.len != other.len {
            return Err(Error::dimension_mismatch(
                "add",
                (self.len, 1),
                (other.len, 1),
            ));
        }
        let bytes = self
            .bytes
            .iter()
            .zip(&other.bytes)
            .map(|(left, right)| left ^ right)
            .collect();
        Ok(Self {
            bytes,
            len: self.len,
        })
    }

    /// Keeps the entries whose index satisfies `predicate`, in order.
    pub fn project(&self, predicate: impl Fn(usize) -> bool) -> BinaryVector {
        let kept: Vec<usize> = (0..self.len).filter(|&index| predicate(index)).collect();
        let mut projected = Self::zeros(kept.len());
        for (position, &index) in kept.iter().enumerate() {
            if self.get(index) {
                projected.toggle(position);
            }
        }
        projected
    }

    pub fn to_column_matrix(&self) -> DenseMatrix {
        DenseMatrix::from_column_bytes(self.len, self.bytes.clone())
    }

    pub fn to_sparse_column(&self) -> SparseMatrix {
        let mut matrix = SparseMatrix::zeros(self.len, 0);
        matrix
            .append_column(self.support().collect())
            .expect("support of a vector is sorted and in range");
        matrix
    }
}

impl FromIterator<bool> for BinaryVector {
    fn from_iter<Bits: IntoIterator<Item = bool>>(bits: Bits) -> Self {
        let bits: Vec<bool> = bits.into_iter().collect();
        let support = bits
            .iter()
            .enumerate()
            .filter(|(_, bit)| **bit)
            .map(|(index, _)| index);
        Self::from_support(bits.len(), support)
    }
}

impl Display for BinaryVector {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for index in 0..self.len {
            write!(f, "{}", u8::from(self.get(index)))?;
        }
        Ok(())
    }
}
