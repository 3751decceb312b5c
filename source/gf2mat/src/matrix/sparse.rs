// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::cmp::Ordering;
use std::fmt::{Display, Formatter};
use std::io::{BufRead, Write};
use std::ops::Range;
use std::str::FromStr;

use itertools::Itertools;
use sorted_iter::SortedIterator;
use sorted_iter::assume::AssumeSortedByItemExt;

use super::{BinaryMatrix, Representation, check_block, check_fits, parse_index};
use crate::work_group::WorkGroup;
use crate::{Error, Result};

/// Column-wise sparse matrix: column `j` is the strictly increasing list of
/// the rows holding a one in column `j`.
#[must_use]
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct SparseMatrix {
    columns: Vec<Vec<usize>>,
    rowcount: usize,
}

/// Replaces `target` by the symmetric difference of the sorted lists `target`
/// and `source`, in `O(|target| + |source|)`.
///
/// The merge runs from the back into the spare capacity of `target`, so the
/// column keeps its buffer.
pub fn merge_drop(target: &mut Vec<usize>, source: &[usize]) {
    if source.is_empty() {
        return;
    }
    let (mut unread_target, mut unread_source) = (target.len(), source.len());
    let total = unread_target + unread_source;
    target.resize(total, 0);
    // every write lands at or after the next unread target entry
    let mut write = total;
    while unread_target > 0 && unread_source > 0 {
        let (left, right) = (target[unread_target - 1], source[unread_source - 1]);
        match left.cmp(&right) {
            Ordering::Equal => {
                unread_target -= 1;
                unread_source -= 1;
                continue;
            }
            Ordering::Greater => {
                unread_target -= 1;
                write -= 1;
                target[write] = left;
            }
            Ordering::Less => {
                unread_source -= 1;
                write -= 1;
                target[write] = right;
            }
        }
    }
    while unread_source > 0 {
        unread_source -= 1;
        write -= 1;
        target[write] = source[unread_source];
    }
    while unread_target > 0 {
        unread_target -= 1;
        write -= 1;
        target[write] = target[unread_target];
    }
    target.copy_within(write.., 0);
    target.truncate(total - write);
}

fn toggle_in(column: &mut Vec<usize>, row: usize) {
    match column.binary_search(&row) {
        Ok(position) => {
            column.remove(position);
        }
        Err(position) => column.insert(position, row),
    }
}

fn validate_column(rowcount: usize, column_index: usize, column: &[usize]) -> Result<()> {
    if let Some(&last) = column.last() {
        if last >= rowcount {
            return Err(Error::invalid_column(
                column_index,
                format!("row {last} out of range for {rowcount} rows"),
            ));
        }
    }
    if let Some((previous, next)) = column.iter().tuple_windows().find(|(a, b)| a >= b) {
        return Err(Error::invalid_column(
            column_index,
            format!("rows must be strictly increasing, found {previous} before {next}"),
        ));
    }
    Ok(())
}

impl SparseMatrix {
    /// Builds a matrix from per-column row lists, which must be strictly
    /// increasing and below `rowcount`.
    pub fn with_columns(rowcount: usize, columns: Vec<Vec<usize>>) -> Result<Self> {
        for (index, column) in columns.iter().enumerate() {
            validate_column(rowcount, index, column)?;
        }
        Ok(Self { columns, rowcount })
    }

    #[must_use]
    pub fn column(&self, index: usize) -> &[usize] {
        &self.columns[index]
    }

    #[must_use]
    pub fn columns(&self) -> &[Vec<usize>] {
        &self.columns
    }

    #[must_use]
    pub fn nonzero_count(&self) -> usize {
        self.columns.iter().map(Vec::len).sum()
    }

    pub fn append_column(&mut self, column: Vec<usize>) -> Result<()> {
        validate_column(self.rowcount, self.columns.len(), &column)?;
        self.columns.push(column);
        Ok(())
    }

    pub fn append_columns(&mut self, other: &SparseMatrix) -> Result<()> {
        if self.rowcount != other.rowcount {
            return Err(Error::dimension_mismatch(
                "append",
                self.shape(),
                other.shape(),
            ));
        }
        self.columns.extend(other.columns.iter().cloned());
        Ok(())
    }

    pub fn unset(&mut self, index: (usize, usize)) {
        self.set(index, false);
    }

    /// Reads the text format: a `<rows> <cols>` header followed by one line
    /// per column listing its rows.
    pub fn read_from(reader: impl BufRead) -> Result<Self> {
        let mut lines = reader.lines();
        let header = lines
            .next()
            .transpose()?
            .ok_or_else(|| Error::parse(1, "missing header"))?;
        let header: Vec<&str> = header.split_whitespace().collect();
        let [rows, cols] = header.as_slice() else {
            return Err(Error::parse(
                1,
                format!("expected \"<rows> <cols>\", found {} fields", header.len()),
            ));
        };
        let rowcount = parse_index(rows, 1)?;
        let columncount = parse_index(cols, 1)?;

        let mut columns = Vec::with_capacity(columncount);
        for (line_index, line) in lines.enumerate() {
            let line_number = line_index + 2;
            let line = line?;
            if columns.len() == columncount {
                if line.trim().is_empty() {
                    continue;
                }
                return Err(Error::parse(
                    line_number,
                    format!("more than the declared {columncount} columns"),
                ));
            }
            let column = line
                .split_whitespace()
                .map(|token| parse_index(token, line_number))
                .collect::<Result<Vec<usize>>>()?;
            validate_column(rowcount, columns.len(), &column)
                .map_err(|error| Error::parse(line_number, error.to_string()))?;
            columns.push(column);
        }
        if columns.len() != columncount {
            return Err(Error::parse(
                columns.len() + 2,
                format!(
                    "declared {columncount} columns, found {}",
                    columns.len()
                ),
            ));
        }
        Ok(Self { columns, rowcount })
    }

    pub fn write_to(&self, mut writer: impl Write) -> Result<()> {
        write!(writer, "{self}")?;
        Ok(())
    }
}

impl BinaryMatrix for SparseMatrix {
    const REPRESENTATION: Representation = Representation::Sparse;

    fn zeros(rowcount: usize, columncount: usize) -> Self {
        Self {
            columns: vec![Vec::new(); columncount],
            rowcount,
        }
    }

    fn rowcount(&self) -> usize {
        self.rowcount
    }

    fn columncount(&self) -> usize {
        self.columns.len()
    }

    fn get(&self, index: (usize, usize)) -> bool {
        assert!(index.0 < self.rowcount, "row {} out of range", index.0);
        self.columns[index.1].binary_search(&index.0).is_ok()
    }

    fn set(&mut self, index: (usize, usize), to: bool) {
        assert!(index.0 < self.rowcount, "row {} out of range", index.0);
        let column = &mut self.columns[index.1];
        match (column.binary_search(&index.0), to) {
            (Err(position), true) => column.insert(position, index.0),
            (Ok(position), false) => {
                column.remove(position);
            }
            _ => {}
        }
    }

    fn toggle(&mut self, index: (usize, usize)) {
        assert!(index.0 < self.rowcount, "row {} out of range", index.0);
        toggle_in(&mut self.columns[index.1], index.0);
    }

    fn add_row(&mut self, from_index: usize, to_index: usize) {
        assert!(from_index < self.rowcount && to_index < self.rowcount);
        for column in &mut self.columns {
            if column.binary_search(&from_index).is_ok() {
                toggle_in(column, to_index);
            }
        }
    }

    fn add_column(&mut self, from_index: usize, to_index: usize) {
        if from_index == to_index {
            self.columns[to_index].clear();
            return;
        }
        let source = std::mem::take(&mut self.columns[from_index]);
        merge_drop(&mut self.columns[to_index], &source);
        self.columns[from_index] = source;
    }

    fn swap_rows(&mut self, left_row_index: usize, right_row_index: usize) {
        assert!(left_row_index < self.rowcount && right_row_index < self.rowcount);
        if left_row_index == right_row_index {
            return;
        }
        for column in &mut self.columns {
            let left = column.binary_search(&left_row_index).is_ok();
            let right = column.binary_search(&right_row_index).is_ok();
            if left != right {
                toggle_in(column, left_row_index);
                toggle_in(column, right_row_index);
            }
        }
    }

    fn swap_columns(&mut self, left_column_index: usize, right_column_index: usize) {
        self.columns.swap(left_column_index, right_column_index);
    }

    fn scan_down(&self, row: usize, column: usize) -> Option<usize> {
        let column = &self.columns[column];
        column.get(column.partition_point(|&index| index < row)).copied()
    }

    fn column_support_within(
        &self,
        column: usize,
        rows: Range<usize>,
    ) -> impl SortedIterator<Item = usize> + '_ {
        let column = &self.columns[column];
        let start = column.partition_point(|&index| index < rows.start);
        let end = rows.end;
        column[start..]
            .iter()
            .copied()
            .take_while(move |&index| index < end)
            .assume_sorted_by_item()
    }

    fn weight_below(&self, row: usize, column: usize) -> usize {
        let column = &self.columns[column];
        column.len() - column.partition_point(|&index| index < row)
    }

    fn add_column_from(&mut self, to_column: usize, source: &Self, from_column: usize) {
        assert_eq!(self.rowcount, source.rowcount);
        merge_drop(&mut self.columns[to_column], &source.columns[from_column]);
    }

    fn extracted_from<Source: BinaryMatrix>(
        source: &Source,
        rows: Range<usize>,
        columns: Range<usize>,
    ) -> Self {
        check_block(source.shape(), &rows, &columns);
        let mut source_columns: Vec<usize> = columns.collect();
        let columns = WorkGroup::global().map_batch(&mut source_columns, |source_column| {
            source
                .column_support_within(*source_column, rows.clone())
                .map(|row| row - rows.start)
                .collect()
        });
        Self {
            columns,
            rowcount: rows.len(),
        }
    }

    fn transposed(&self) -> Self {
        let mut transposed = Self::zeros(self.columncount(), self.rowcount);
        for (column_index, column) in self.columns.iter().enumerate() {
            for &row in column {
                transposed.columns[row].push(column_index);
            }
        }
        transposed
    }

    fn clear_row_right_of(&mut self, pivot: usize, group: &WorkGroup) -> Vec<usize> {
        assert!(pivot < self.rowcount && pivot < self.columncount());
        let (head, tail) = self.columns.split_at_mut(pivot + 1);
        let pivot_column = &head[pivot];
        let mut targets: Vec<(usize, &mut Vec<usize>)> =
            (pivot + 1..).zip(tail.iter_mut()).collect();
        group
            .map_batch(&mut targets, |(column_index, column)| {
                if column.binary_search(&pivot).is_err() {
                    return None;
                }
                merge_drop(column, pivot_column);
                Some(*column_index)
            })
            .into_iter()
            .flatten()
            .collect()
    }

    fn clear_column_below(&mut self, pivot: usize) -> Vec<usize> {
        let column = &mut self.columns[pivot];
        let start = column.partition_point(|&index| index <= pivot);
        column.split_off(start)
    }

    fn overwrite<Block: BinaryMatrix>(
        &mut self,
        row: usize,
        column: usize,
        block: &Block,
    ) -> Result<()> {
        check_fits(self.shape(), row, column, block.shape())?;
        let end = row + block.rowcount();
        for offset in 0..block.columncount() {
            let target = &mut self.columns[column + offset];
            let start = target.partition_point(|&index| index < row);
            let stop = target.partition_point(|&index| index < end);
            target.splice(
                start..stop,
                block.column_support(offset).map(|index| row + index),
            );
        }
        Ok(())
    }
}

/// The text format read by [`SparseMatrix::read_from`].
impl Display for SparseMatrix {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{} {}", self.rowcount, self.columns.len())?;
        for column in &self.columns {
            writeln!(f, "{}", column.iter().join(" "))?;
        }
        Ok(())
    }
}

impl FromStr for SparseMatrix {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self> {
        Self::read_from(text.as_bytes())
    }
}
