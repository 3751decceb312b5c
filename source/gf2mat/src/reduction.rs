// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Reduction of a binary matrix to diagonal form.
//!
//! [`DiagonalReducer::reduce`] applies row and column operations until the
//! ones of the matrix are exactly `(0, 0), ..., (rank - 1, rank - 1)`, the
//! GF(2) case of the Smith normal form. With `P` the row operations and `Q`
//! the column operations, `P * M * Q = D`. The last `columncount - rank`
//! columns of `Q` span the kernel of `M` and the first `rank` columns span a
//! complement of it.

#[cfg(test)]
mod tests;

use std::sync::OnceLock;
use std::time::{Duration, Instant};

use log::{debug, trace};

use crate::matrix::{BinaryMatrix, Representation, SparseMatrix};
use crate::operation::{Operation, replay_columns, replay_rows};
use crate::work_group::WorkGroup;

/// Tuning knobs of [`DiagonalReducer`]. None of them change the result.
#[derive(Clone, Debug)]
pub struct ReducerConfig {
    /// A sparse matrix is copied into a dense one once the unreduced block
    /// is denser than this.
    pub densify_threshold: f64,
    /// Blocks whose smaller side is below this stay sparse.
    pub densify_min_dimension: usize,
    /// Pivots between two density measurements, before self-tuning.
    pub initial_stat_interval: usize,
    /// Wall-clock time the stat interval is tuned towards.
    pub stat_period: Duration,
}

impl Default for ReducerConfig {
    fn default() -> Self {
        Self {
            densify_threshold: 0.05,
            densify_min_dimension: 512,
            initial_stat_interval: 64,
            stat_period: Duration::from_secs(1),
        }
    }
}

impl ReducerConfig {
    #[must_use]
    pub fn without_densification() -> Self {
        Self {
            densify_threshold: f64::INFINITY,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_densify_threshold(mut self, densify_threshold: f64) -> Self {
        self.densify_threshold = densify_threshold;
        self
    }

    #[must_use]
    pub fn with_densify_min_dimension(mut self, densify_min_dimension: usize) -> Self {
        self.densify_min_dimension = densify_min_dimension;
        self
    }

    #[must_use]
    pub fn with_initial_stat_interval(mut self, initial_stat_interval: usize) -> Self {
        self.initial_stat_interval = initial_stat_interval.max(1);
        self
    }

    #[must_use]
    pub fn with_stat_period(mut self, stat_period: Duration) -> Self {
        self.stat_period = stat_period;
        self
    }
}

#[derive(Clone, Debug)]
pub struct DiagonalReducer<'group> {
    group: &'group WorkGroup,
    config: ReducerConfig,
}

impl Default for DiagonalReducer<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl DiagonalReducer<'static> {
    /// A reducer running on [`WorkGroup::global`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_work_group(WorkGroup::global())
    }
}

impl<'group> DiagonalReducer<'group> {
    #[must_use]
    pub fn with_work_group(group: &'group WorkGroup) -> Self {
        Self {
            group,
            config: ReducerConfig::default(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: ReducerConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn config(&self) -> &ReducerConfig {
        &self.config
    }

    /// Brings `matrix` to diagonal form in place and returns the operations
    /// that did it.
    pub fn reduce<Matrix: BinaryMatrix>(&self, matrix: &mut Matrix) -> Reduction {
        let (rowcount, columncount) = matrix.shape();
        let mut logs = OperationLogs::default();
        let mut progress = Progress::new(&self.config);
        let mut rank = rowcount.min(columncount);

        for pivot in 0..rowcount.min(columncount) {
            if progress.is_due(pivot) && self.should_densify(matrix, pivot, &progress) {
                rank = pivot + self.reduce_densified(matrix, pivot, &mut logs);
                break;
            }
            let Some((pivot_row, pivot_column)) = find_pivot(matrix, pivot) else {
                rank = pivot;
                break;
            };
            if pivot_row != pivot {
                matrix.swap_rows(pivot, pivot_row);
                logs.rows.push(Operation::Swap {
                    first: pivot,
                    second: pivot_row,
                });
            }
            if pivot_column != pivot {
                matrix.swap_columns(pivot, pivot_column);
                logs.columns.push(Operation::Swap {
                    first: pivot,
                    second: pivot_column,
                });
            }
            let cleared_columns = matrix.clear_row_right_of(pivot, self.group);
            logs.columns.extend(
                cleared_columns
                    .into_iter()
                    .map(|target| Operation::Add { source: pivot, target }),
            );
            // row `pivot` is zero outside the pivot, so adding it only clears one entry
            let cleared_rows = matrix.clear_column_below(pivot);
            logs.rows.extend(
                cleared_rows
                    .into_iter()
                    .map(|target| Operation::Add { source: pivot, target }),
            );
        }

        debug!(
            "reduced {rowcount}x{columncount} matrix to rank {rank} with {} row and {} column operations",
            logs.rows.len(),
            logs.columns.len()
        );
        Reduction::new(rank, (rowcount, columncount), logs)
    }

    fn should_densify<Matrix: BinaryMatrix>(
        &self,
        matrix: &Matrix,
        pivot: usize,
        progress: &Progress,
    ) -> bool {
        if Matrix::REPRESENTATION == Representation::Dense {
            return false;
        }
        let remaining = (matrix.rowcount() - pivot).min(matrix.columncount() - pivot);
        if remaining < self.config.densify_min_dimension {
            return false;
        }
        let density = matrix.density(pivot, pivot);
        trace!(
            "pivot {pivot}: density {density:.4}, next check in {} pivots",
            progress.interval
        );
        density > self.config.densify_threshold
    }

    /// Reduces the trailing block starting at (`pivot`, `pivot`) as a dense
    /// matrix and splices the result back. Returns the rank of the block.
    fn reduce_densified<Matrix: BinaryMatrix>(
        &self,
        matrix: &mut Matrix,
        pivot: usize,
        logs: &mut OperationLogs,
    ) -> usize {
        let (rowcount, columncount) = matrix.shape();
        let mut block = matrix.dense_submatrix(pivot..rowcount, pivot..columncount);
        debug!(
            "densifying {}x{} block at pivot {pivot}",
            block.rowcount(),
            block.columncount()
        );
        let inner = self.reduce(&mut block);
        logs.rows
            .extend(inner.row_operations.iter().map(|operation| operation.shifted(pivot)));
        logs.columns.extend(
            inner
                .column_operations
                .iter()
                .map(|operation| operation.shifted(pivot)),
        );
        matrix
            .overwrite(pivot, pivot, &block)
            .expect("block should fit where it was extracted from");
        inner.rank
    }
}

fn find_pivot<Matrix: BinaryMatrix>(matrix: &Matrix, pivot: usize) -> Option<(usize, usize)> {
    (pivot..matrix.columncount())
        .find_map(|column| matrix.scan_down(pivot, column).map(|row| (row, column)))
}

#[derive(Default)]
struct OperationLogs {
    rows: Vec<Operation>,
    columns: Vec<Operation>,
}

/// Decides when to measure density, keeping the time between two
/// measurements close to the configured period.
struct Progress {
    interval: usize,
    next_check: usize,
    last_check: Instant,
    period: Duration,
}

impl Progress {
    fn new(config: &ReducerConfig) -> Self {
        let interval = config.initial_stat_interval.max(1);
        Self {
            interval,
            next_check: interval,
            last_check: Instant::now(),
            period: config.stat_period,
        }
    }

    fn is_due(&mut self, pivot: usize) -> bool {
        if pivot < self.next_check {
            return false;
        }
        let elapsed = self.last_check.elapsed();
        if elapsed < self.period / 2 {
            self.interval = self.interval.saturating_mul(2);
        } else if elapsed > self.period * 2 {
            self.interval = (self.interval / 2).max(1);
        }
        trace!("pivot {pivot}: {elapsed:?} since last check");
        self.last_check = Instant::now();
        self.next_check = pivot + self.interval;
        true
    }
}

/// Outcome of [`DiagonalReducer::reduce`]: the rank and the operation logs,
/// with the transforms and bases derived from them on first use.
#[derive(Debug)]
pub struct Reduction {
    rank: usize,
    shape: (usize, usize),
    row_operations: Vec<Operation>,
    column_operations: Vec<Operation>,
    row_transform: OnceLock<SparseMatrix>,
    column_transform: OnceLock<SparseMatrix>,
    kernel_basis: OnceLock<SparseMatrix>,
    coimage_basis: OnceLock<SparseMatrix>,
}

impl Reduction {
    fn new(rank: usize, shape: (usize, usize), logs: OperationLogs) -> Self {
        Self {
            rank,
            shape,
            row_operations: logs.rows,
            column_operations: logs.columns,
            row_transform: OnceLock::new(),
            column_transform: OnceLock::new(),
            kernel_basis: OnceLock::new(),
            coimage_basis: OnceLock::new(),
        }
    }

    #[must_use]
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Shape of the reduced matrix.
    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        self.shape
    }

    #[must_use]
    pub fn row_operations(&self) -> &[Operation] {
        &self.row_operations
    }

    #[must_use]
    pub fn column_operations(&self) -> &[Operation] {
        &self.column_operations
    }

    /// `P` with `P * M * Q = D`.
    pub fn row_transform(&self) -> &SparseMatrix {
        self.row_transform
            .get_or_init(|| replay_rows(&self.row_operations, self.shape.0))
    }

    /// `Q` with `P * M * Q = D`.
    pub fn column_transform(&self) -> &SparseMatrix {
        self.column_transform
            .get_or_init(|| replay_columns(&self.column_operations, self.shape.1))
    }

    /// Columns span the kernel of the matrix as it was before reduction.
    pub fn kernel_basis(&self) -> &SparseMatrix {
        self.kernel_basis.get_or_init(|| {
            let columncount = self.shape.1;
            self.column_transform()
                .submatrix(0..columncount, self.rank..columncount)
        })
    }

    /// Columns span a complement of the kernel; their images are independent.
    pub fn coimage_basis(&self) -> &SparseMatrix {
        self.coimage_basis.get_or_init(|| {
            self.column_transform()
                .submatrix(0..self.shape.1, 0..self.rank)
        })
    }

    #[must_use]
    pub fn into_operations(self) -> (Vec<Operation>, Vec<Operation>) {
        (self.row_operations, self.column_operations)
    }
}
