// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::{Display, Formatter};
use std::ops::Range;
use std::str::FromStr;

use sorted_iter::SortedIterator;
use sorted_iter::assume::AssumeSortedByItemExt;

use super::{BinaryMatrix, Representation, check_block};
use crate::work_group::WorkGroup;
use crate::Error;

/// Bit-packed column-major matrix.
///
/// Column `j` occupies bytes `j * stride .. (j + 1) * stride` with
/// `stride = ceil(rowcount / 8)`; row `i` is bit `i % 8` of byte `i / 8`.
/// Bits past the last row are always zero.
#[must_use]
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct DenseMatrix {
    buffer: Vec<u8>,
    rowcount: usize,
    columncount: usize,
    stride: usize,
}

impl DenseMatrix {
    pub fn with_shape(rowcount: usize, columncount: usize) -> Self {
        Self::zeros(rowcount, columncount)
    }

    pub fn from_rows<Row, Rows>(rows: Rows, columncount: usize) -> Self
    where
        Row: IntoIterator<Item = bool>,
        Rows: IntoIterator<Item = Row>,
    {
        let rows: Vec<Vec<bool>> = rows
            .into_iter()
            .map(|row| row.into_iter().take(columncount).collect())
            .collect();
        let mut matrix = Self::zeros(rows.len(), columncount);
        for (row_index, row) in rows.iter().enumerate() {
            for (column_index, &value) in row.iter().enumerate() {
                if value {
                    matrix.set_unchecked((row_index, column_index));
                }
            }
        }
        matrix
    }

    pub(crate) fn from_column_bytes(rowcount: usize, bytes: Vec<u8>) -> Self {
        debug_assert_eq!(bytes.len(), stride_of(rowcount));
        Self {
            buffer: bytes,
            rowcount,
            columncount: 1,
            stride: stride_of(rowcount),
        }
    }

    /// Bytes of column `index`.
    #[must_use]
    pub fn column_bytes(&self, index: usize) -> &[u8] {
        &self.buffer[index * self.stride..(index + 1) * self.stride]
    }

    fn column_bytes_mut(&mut self, index: usize) -> &mut [u8] {
        &mut self.buffer[index * self.stride..(index + 1) * self.stride]
    }

    fn set_unchecked(&mut self, index: (usize, usize)) {
        let (byte, mask) = self.address_of(index);
        self.buffer[byte] |= mask;
    }

    fn address_of(&self, index: (usize, usize)) -> (usize, u8) {
        (index.1 * self.stride + index.0 / 8, 1u8 << (index.0 % 8))
    }

    fn check_index(&self, index: (usize, usize)) {
        assert!(
            index.0 < self.rowcount && index.1 < self.columncount,
            "index {index:?} out of range for {:?}",
            self.shape()
        );
    }

    /// Splits the buffer into the source column and the target column.
    fn column_pair_mut(&mut self, from_index: usize, to_index: usize) -> (&[u8], &mut [u8]) {
        debug_assert_ne!(from_index, to_index);
        let stride = self.stride;
        if from_index < to_index {
            let (head, tail) = self.buffer.split_at_mut(to_index * stride);
            (&head[from_index * stride..(from_index + 1) * stride], &mut tail[..stride])
        } else {
            let (head, tail) = self.buffer.split_at_mut(from_index * stride);
            (&tail[..stride], &mut head[to_index * stride..(to_index + 1) * stride])
        }
    }
}

fn stride_of(rowcount: usize) -> usize {
    rowcount.div_ceil(8)
}

fn xor_into(target: &mut [u8], source: &[u8]) {
    for (to, from) in target.iter_mut().zip(source) {
        *to ^= *from;
    }
}

impl BinaryMatrix for DenseMatrix {
    const REPRESENTATION: Representation = Representation::Dense;

    fn zeros(rowcount: usize, columncount: usize) -> Self {
        let stride = stride_of(rowcount);
        Self {
            buffer: vec![0u8; stride * columncount],
            rowcount,
            columncount,
            stride,
        }
    }

    fn rowcount(&self) -> usize {
        self.rowcount
    }

    fn columncount(&self) -> usize {
        self.columncount
    }

    fn get(&self, index: (usize, usize)) -> bool {
        self.check_index(index);
        let (byte, mask) = self.address_of(index);
        self.buffer[byte] & mask != 0
    }

    fn set(&mut self, index: (usize, usize), to: bool) {
        self.check_index(index);
        let (byte, mask) = self.address_of(index);
        if to {
            self.buffer[byte] |= mask;
        } else {
            self.buffer[byte] &= !mask;
        }
    }

    fn toggle(&mut self, index: (usize, usize)) {
        self.check_index(index);
        let (byte, mask) = self.address_of(index);
        self.buffer[byte] ^= mask;
    }

    fn add_row(&mut self, from_index: usize, to_index: usize) {
        assert!(from_index < self.rowcount && to_index < self.rowcount);
        let (from_byte, from_mask) = (from_index / 8, 1u8 << (from_index % 8));
        let (to_byte, to_mask) = (to_index / 8, 1u8 << (to_index % 8));
        for column in self.buffer.chunks_exact_mut(self.stride) {
            if column[from_byte] & from_mask != 0 {
                column[to_byte] ^= to_mask;
            }
        }
    }

    fn add_column(&mut self, from_index: usize, to_index: usize) {
        assert!(from_index < self.columncount && to_index < self.columncount);
        if from_index == to_index {
            self.column_bytes_mut(to_index).fill(0);
            return;
        }
        let (source, target) = self.column_pair_mut(from_index, to_index);
        xor_into(target, source);
    }

    fn swap_rows(&mut self, left_row_index: usize, right_row_index: usize) {
        assert!(left_row_index < self.rowcount && right_row_index < self.rowcount);
        if left_row_index == right_row_index {
            return;
        }
        let (left_byte, left_mask) = (left_row_index / 8, 1u8 << (left_row_index % 8));
        let (right_byte, right_mask) = (right_row_index / 8, 1u8 << (right_row_index % 8));
        for column in self.buffer.chunks_exact_mut(self.stride) {
            let left = column[left_byte] & left_mask != 0;
            let right = column[right_byte] & right_mask != 0;
            if left != right {
                column[left_byte] ^= left_mask;
                column[right_byte] ^= right_mask;
            }
        }
    }

    fn swap_columns(&mut self, left_column_index: usize, right_column_index: usize) {
        assert!(left_column_index < self.columncount && right_column_index < self.columncount);
        if left_column_index == right_column_index {
            return;
        }
        let (low, high) = if left_column_index < right_column_index {
            (left_column_index, right_column_index)
        } else {
            (right_column_index, left_column_index)
        };
        let stride = self.stride;
        let (head, tail) = self.buffer.split_at_mut(high * stride);
        head[low * stride..(low + 1) * stride].swap_with_slice(&mut tail[..stride]);
    }

    fn scan_down(&self, row: usize, column: usize) -> Option<usize> {
        assert!(column < self.columncount);
        if row >= self.rowcount {
            return None;
        }
        let bytes = self.column_bytes(column);
        let first = row / 8;
        let masked = bytes[first] & (0xFFu8 << (row % 8));
        if masked != 0 {
            return Some(first * 8 + masked.trailing_zeros() as usize);
        }
        bytes[first + 1..]
            .iter()
            .position(|&byte| byte != 0)
            .map(|offset| {
                let index = first + 1 + offset;
                index * 8 + bytes[index].trailing_zeros() as usize
            })
    }

    fn column_support_within(
        &self,
        column: usize,
        rows: Range<usize>,
    ) -> impl SortedIterator<Item = usize> + '_ {
        let end = rows.end.min(self.rowcount);
        let mut next = self
            .scan_down(rows.start, column)
            .filter(|&row| row < end);
        std::iter::from_fn(move || {
            let current = next?;
            next = self
                .scan_down(current + 1, column)
                .filter(|&row| row < end);
            Some(current)
        })
        .assume_sorted_by_item()
    }

    fn weight_below(&self, row: usize, column: usize) -> usize {
        assert!(column < self.columncount);
        if row >= self.rowcount {
            return 0;
        }
        let bytes = self.column_bytes(column);
        let first = row / 8;
        let head = (bytes[first] & (0xFFu8 << (row % 8))).count_ones() as usize;
        head + bytes[first + 1..]
            .iter()
            .map(|byte| byte.count_ones() as usize)
            .sum::<usize>()
    }

    fn add_column_from(&mut self, to_column: usize, source: &Self, from_column: usize) {
        assert_eq!(self.rowcount, source.rowcount);
        let stride = self.stride;
        xor_into(
            &mut self.buffer[to_column * stride..(to_column + 1) * stride],
            source.column_bytes(from_column),
        );
    }

    fn extracted_from<Source: BinaryMatrix>(
        source: &Source,
        rows: Range<usize>,
        columns: Range<usize>,
    ) -> Self {
        check_block(source.shape(), &rows, &columns);
        let mut extracted = Self::zeros(rows.len(), columns.len());
        if extracted.stride == 0 || columns.is_empty() {
            return extracted;
        }
        let mut targets: Vec<(usize, &mut [u8])> = columns
            .zip(extracted.buffer.chunks_exact_mut(extracted.stride))
            .collect();
        WorkGroup::global().process_batch(&mut targets, |(source_column, target)| {
            for row in source.column_support_within(*source_column, rows.clone()) {
                let offset = row - rows.start;
                target[offset / 8] |= 1u8 << (offset % 8);
            }
        });
        drop(targets);
        extracted
    }

    fn transposed(&self) -> Self {
        let mut transposed = Self::zeros(self.columncount, self.rowcount);
        for column in 0..self.columncount {
            for row in self.column_support(column) {
                transposed.set_unchecked((column, row));
            }
        }
        transposed
    }

    fn clear_row_right_of(&mut self, pivot: usize, group: &WorkGroup) -> Vec<usize> {
        assert!(pivot < self.rowcount && pivot < self.columncount);
        let stride = self.stride;
        let (byte, mask) = (pivot / 8, 1u8 << (pivot % 8));
        let (head, tail) = self.buffer.split_at_mut((pivot + 1) * stride);
        let pivot_column = &head[pivot * stride..];
        let mut targets: Vec<(usize, &mut [u8])> = (pivot + 1..self.columncount)
            .zip(tail.chunks_exact_mut(stride))
            .collect();
        group
            .map_batch(&mut targets, |(column, bytes)| {
                if bytes[byte] & mask == 0 {
                    return None;
                }
                xor_into(bytes, pivot_column);
                Some(*column)
            })
            .into_iter()
            .flatten()
            .collect()
    }
}

/// Rows of space-separated `0`/`1` tokens, one row per line.
impl Display for DenseMatrix {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for row_index in 0..self.rowcount {
            for column_index in 0..self.columncount {
                if column_index > 0 {
                    write!(f, " ")?;
                }
                write!(f, "{}", u8::from(self.get((row_index, column_index))))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Parses rows of whitespace-separated `0`/`1` tokens. Blank lines are skipped.
impl FromStr for DenseMatrix {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let mut rows = Vec::<Vec<bool>>::new();
        let mut columncount = None;
        for (line_index, line) in text.lines().enumerate() {
            let line_number = line_index + 1;
            let mut row = Vec::new();
            for token in line.split_whitespace() {
                match token {
                    "0" => row.push(false),
                    "1" => row.push(true),
                    _ => {
                        return Err(Error::parse(
                            line_number,
                            format!("expected 0 or 1, found {token:?}"),
                        ));
                    }
                }
            }
            if row.is_empty() {
                continue;
            }
            match columncount {
                None => columncount = Some(row.len()),
                Some(expected) if expected != row.len() => {
                    return Err(Error::parse(
                        line_number,
                        format!("expected {expected} entries, found {}", row.len()),
                    ));
                }
                Some(_) => {}
            }
            rows.push(row);
        }
        Ok(Self::from_rows(rows, columncount.unwrap_or(0)))
    }
}
